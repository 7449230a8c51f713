use std::fs;
use std::io;
use std::path::Path;

use crate::stats::EpisodeRecord;

#[derive(thiserror::Error, Debug)]
pub enum SerializationError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),
}

/// Encode episode records to postcard bytes.
pub fn to_postcard_bytes(records: &[EpisodeRecord]) -> Result<Vec<u8>, SerializationError> {
    Ok(postcard::to_allocvec(records)?)
}

/// Decode episode records from postcard bytes.
pub fn from_postcard_bytes(bytes: &[u8]) -> Result<Vec<EpisodeRecord>, SerializationError> {
    Ok(postcard::from_bytes(bytes)?)
}

pub fn write_records_to_path<P: AsRef<Path>>(path: P, records: &[EpisodeRecord]) -> Result<(), SerializationError> {
    let bytes = to_postcard_bytes(records)?;
    fs::write(path, bytes)?;
    Ok(())
}

pub fn read_records_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<EpisodeRecord>, SerializationError> {
    let bytes = fs::read(path)?;
    from_postcard_bytes(&bytes)
}
