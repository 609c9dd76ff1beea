//! # Formats
//!
//! Byte-level encodings of the record store used by the file backend.

mod persistence;

pub use persistence::{
    MAX_PERSISTENCE_PAYLOAD_SIZE, PersistenceHeader, store_from_bytes, store_to_bytes,
};
