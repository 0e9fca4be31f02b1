//! Versioned, checksummed binary envelope
//!
//! Layout (bincode, fixed-width little endian):
//! `magic [4] | format_version u32 | checksum u64 | payload len u64 | payload`

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{Result, TrainerError};

pub const MAGIC: [u8; 4] = *b"CTRM";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    magic: [u8; 4],
    format_version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    magic: [u8; 4],
    format_version: u32,
    checksum: u64,
    payload: Vec<u8>,
}

/// XXH3 64-bit digest of the payload bytes
pub fn checksum(bytes: &[u8]) -> u64 {
    xxh3_64(bytes)
}

/// Wrap `value` in the envelope
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let payload = bincode::serialize(value)?;
    let envelope = Envelope {
        magic: MAGIC,
        format_version: FORMAT_VERSION,
        checksum: checksum(&payload),
        payload,
    };
    let bytes = bincode::serialize(&envelope)?;
    debug!(bytes = bytes.len(), "encoded envelope");
    Ok(bytes)
}

/// Unwrap a value, checking magic, format version and checksum in that order
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let header: Header = bincode::deserialize(bytes)
        .map_err(|e| TrainerError::SerializationError(format!("truncated envelope header: {}", e)))?;
    if header.magic != MAGIC {
        return Err(TrainerError::SerializationError(
            "not a caretrain model (bad magic)".to_string(),
        ));
    }
    if header.format_version != FORMAT_VERSION {
        return Err(TrainerError::IncompatibleVersionError {
            found: header.format_version,
            expected: FORMAT_VERSION,
        });
    }

    let envelope: Envelope = bincode::deserialize(bytes)?;
    if checksum(&envelope.payload) != envelope.checksum {
        return Err(TrainerError::SerializationError(
            "payload checksum mismatch".to_string(),
        ));
    }
    Ok(bincode::deserialize(&envelope.payload)?)
}
