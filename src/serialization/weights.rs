//! Weight table files.
//!
//! Versioned layout, all little-endian:
//!
//! ```text
//! magic "NTWT" | version u8 | endian u8 | tables u32 | len u64 * tables | f32 payload | crc32c u32
//! ```
//!
//! Two headerless layouts predate it, neither with a checksum:
//!
//! ```text
//! bare:     tables u32 | f32 payload                  (lengths come from the patterns)
//! prefixed: tables u32 | (len u64 | f32 * len) * tables
//! ```
//!
//! Readers tell versioned files apart by the magic. A headerless file is read
//! as bare when its size matches the expected table sizes exactly, and as
//! prefixed otherwise. Writers emit the versioned layout.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::ntuple::WeightTable;

const MAGIC: &[u8; 4] = b"NTWT";
const VERSION: u8 = 1;
const ENDIAN_LE: u8 = 0;
const HEADER_LEN: usize = 4 + 1 + 1 + 4;

#[derive(thiserror::Error, Debug)]
pub enum WeightsError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid magic or version")]
    MagicOrVersion,
    #[error("unsupported endianness")]
    Endianness,
    #[error("file too short or malformed")]
    Malformed,
    #[error("checksum mismatch")]
    Checksum,
}

#[inline]
fn read_u32_le(bytes: &[u8]) -> Option<u32> {
    Some(u32::from_le_bytes(bytes.get(..4)?.try_into().ok()?))
}

#[inline]
fn read_u64_le(bytes: &[u8]) -> Option<u64> {
    Some(u64::from_le_bytes(bytes.get(..8)?.try_into().ok()?))
}

fn read_f32s(bytes: &[u8]) -> Vec<f32> {
    bytes.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect()
}

fn push_f32s(buf: &mut Vec<u8>, values: &[f32]) {
    for v in values {
        buf.extend_from_slice(&v.to_le_bytes());
    }
}

fn table_count(tables: &[WeightTable]) -> u32 {
    // A network never holds anywhere near u32::MAX tables.
    u32::try_from(tables.len()).unwrap_or(u32::MAX)
}

pub fn encode_weights(tables: &[WeightTable]) -> Vec<u8> {
    let payload: usize = tables.iter().map(|t| t.len() * 4).sum();
    let mut buf = Vec::with_capacity(HEADER_LEN + tables.len() * 8 + payload + 4);

    buf.extend_from_slice(MAGIC);
    buf.push(VERSION);
    buf.push(ENDIAN_LE);
    buf.extend_from_slice(&table_count(tables).to_le_bytes());
    for t in tables {
        buf.extend_from_slice(&(t.len() as u64).to_le_bytes());
    }
    for t in tables {
        push_f32s(&mut buf, t.as_slice());
    }

    let checksum = crc32c::crc32c(&buf);
    buf.extend_from_slice(&checksum.to_le_bytes());
    buf
}

/// The bare headerless layout: table count, then the raw weights.
pub fn encode_bare_weights(tables: &[WeightTable]) -> Vec<u8> {
    let payload: usize = tables.iter().map(|t| t.len() * 4).sum();
    let mut buf = Vec::with_capacity(4 + payload);
    buf.extend_from_slice(&table_count(tables).to_le_bytes());
    for t in tables {
        push_f32s(&mut buf, t.as_slice());
    }
    buf
}

/// The length-prefixed headerless layout.
pub fn encode_legacy_weights(tables: &[WeightTable]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&table_count(tables).to_le_bytes());
    for t in tables {
        buf.extend_from_slice(&(t.len() as u64).to_le_bytes());
        push_f32s(&mut buf, t.as_slice());
    }
    buf
}

/// Decode a self-describing file: versioned or length-prefixed.
pub fn parse_weights_bytes(bytes: &[u8]) -> Result<Vec<WeightTable>, WeightsError> {
    if bytes.starts_with(MAGIC) {
        parse_versioned(bytes)
    } else {
        parse_legacy(bytes)
    }
}

/// Decode any layout, using `sizes` (one per pattern, in order) for bare
/// files.
pub fn parse_weights_with_sizes(bytes: &[u8], sizes: &[usize]) -> Result<Vec<WeightTable>, WeightsError> {
    if bytes.starts_with(MAGIC) {
        return parse_versioned(bytes);
    }
    match parse_bare(bytes, sizes) {
        Some(tables) => Ok(tables),
        None => parse_legacy(bytes),
    }
}

/// `None` unless the file is exactly a count and that many tables of the
/// expected sizes.
fn parse_bare(bytes: &[u8], sizes: &[usize]) -> Option<Vec<WeightTable>> {
    let count = read_u32_le(bytes)? as usize;
    let sizes = sizes.get(..count)?;
    let payload = sizes.iter().try_fold(0usize, |acc, &len| acc.checked_add(len.checked_mul(4)?))?;
    if bytes.len() - 4 != payload {
        return None;
    }
    let mut off = 4;
    Some(
        sizes
            .iter()
            .map(|&len| {
                let table = WeightTable::from_vec(read_f32s(&bytes[off..off + len * 4]));
                off += len * 4;
                table
            })
            .collect(),
    )
}

fn parse_versioned(bytes: &[u8]) -> Result<Vec<WeightTable>, WeightsError> {
    if bytes.len() < HEADER_LEN + 4 {
        return Err(WeightsError::Malformed);
    }
    let (content, trailer) = bytes.split_at(bytes.len() - 4);
    let file_crc = read_u32_le(trailer).ok_or(WeightsError::Malformed)?;
    if file_crc != crc32c::crc32c(content) {
        return Err(WeightsError::Checksum);
    }
    if content[4] != VERSION {
        return Err(WeightsError::MagicOrVersion);
    }
    if content[5] != ENDIAN_LE {
        return Err(WeightsError::Endianness);
    }

    let count = read_u32_le(&content[6..]).ok_or(WeightsError::Malformed)? as usize;
    let mut off = HEADER_LEN;
    let mut lens = Vec::with_capacity(count.min(content.len() / 8));
    for _ in 0..count {
        let len = read_u64_le(&content[off..]).ok_or(WeightsError::Malformed)?;
        lens.push(usize::try_from(len).map_err(|_| WeightsError::Malformed)?);
        off += 8;
    }

    let payload = lens
        .iter()
        .try_fold(0usize, |acc, &len| acc.checked_add(len.checked_mul(4)?))
        .ok_or(WeightsError::Malformed)?;
    if content.len() - off != payload {
        return Err(WeightsError::Malformed);
    }
    Ok(lens
        .into_iter()
        .map(|len| {
            let table = WeightTable::from_vec(read_f32s(&content[off..off + len * 4]));
            off += len * 4;
            table
        })
        .collect())
}

fn parse_legacy(bytes: &[u8]) -> Result<Vec<WeightTable>, WeightsError> {
    let count = read_u32_le(bytes).ok_or(WeightsError::Malformed)? as usize;
    let mut off = 4;
    let mut tables = Vec::with_capacity(count.min(bytes.len() / 8));
    for _ in 0..count {
        let len = read_u64_le(&bytes[off..]).ok_or(WeightsError::Malformed)?;
        off += 8;
        let end = usize::try_from(len)
            .ok()
            .and_then(|len| len.checked_mul(4))
            .and_then(|n| off.checked_add(n))
            .filter(|&end| end <= bytes.len())
            .ok_or(WeightsError::Malformed)?;
        tables.push(WeightTable::from_vec(read_f32s(&bytes[off..end])));
        off = end;
    }
    if off != bytes.len() {
        return Err(WeightsError::Malformed);
    }
    Ok(tables)
}

pub fn write_weights_to_path<P: AsRef<Path>>(path: P, tables: &[WeightTable]) -> Result<(), WeightsError> {
    let data = encode_weights(tables);
    let mut f = fs::File::create(path)?;
    f.write_all(&data)?;
    Ok(())
}

pub fn read_weights_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<WeightTable>, WeightsError> {
    let data = fs::read(path)?;
    parse_weights_bytes(&data)
}

pub fn read_weights_with_sizes<P: AsRef<Path>>(path: P, sizes: &[usize]) -> Result<Vec<WeightTable>, WeightsError> {
    let data = fs::read(path)?;
    parse_weights_with_sizes(&data, sizes)
}
