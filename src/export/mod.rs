//! Model persistence
//!
//! Trained models are stored as a bincode payload inside a small envelope
//! carrying a magic tag, a format version and a checksum.

mod serializer;

pub use serializer::{checksum, decode, encode, FORMAT_VERSION, MAGIC};
