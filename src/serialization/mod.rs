//! File formats: trained weight tables and per-episode records.
//!
//! Weight files use a small checksummed binary layout (with readers for the
//! older headerless ones). Episode records are postcard-encoded.

mod records;
mod weights;

pub use records::{
    SerializationError,
    to_postcard_bytes,
    from_postcard_bytes,
    write_records_to_path,
    read_records_from_path,
};
pub use weights::{
    WeightsError,
    encode_weights,
    encode_bare_weights,
    encode_legacy_weights,
    parse_weights_bytes,
    parse_weights_with_sizes,
    write_weights_to_path,
    read_weights_from_path,
    read_weights_with_sizes,
};
