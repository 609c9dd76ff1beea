//! # Persistence Format
//!
//! Binary snapshot of a [`MemoryStore`] for the single-file backend.
//! File I/O stays in the app layer.
//!
//! Format: Header (5 bytes) + postcard-serialized tables.
//! - 4 bytes: Magic ("RTNE")
//! - 1 byte: Version
//!
//! Size and header are checked before the payload is decoded.

use crate::storage::MemoryStore;
use crate::{RoutineError, primitives};

/// Maximum accepted snapshot size.
pub const MAX_PERSISTENCE_PAYLOAD_SIZE: usize = 64 * 1024 * 1024; // 64 MB

const HEADER_SIZE: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The header that precedes every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), RoutineError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(RoutineError::SerializationError(
                "not a routine data file (bad magic bytes)".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(RoutineError::SerializationError(format!(
                "unsupported format version {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RoutineError> {
        let Some(header) = bytes.get(..HEADER_SIZE) else {
            return Err(RoutineError::SerializationError(
                "header too short".to_string(),
            ));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[..4]);
        Ok(Self {
            magic,
            version: header[4],
        })
    }
}

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a store to bytes (header + payload).
pub fn store_to_bytes(store: &MemoryStore) -> Result<Vec<u8>, RoutineError> {
    let payload =
        postcard::to_stdvec(store).map_err(|e| RoutineError::SerializationError(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(&PersistenceHeader::new().to_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Deserialize a store from bytes.
///
/// Rejects data that is shorter than the header, larger than
/// [`MAX_PERSISTENCE_PAYLOAD_SIZE`], or carries a foreign header.
pub fn store_from_bytes(bytes: &[u8]) -> Result<MemoryStore, RoutineError> {
    if bytes.len() > MAX_PERSISTENCE_PAYLOAD_SIZE {
        return Err(RoutineError::SerializationError(format!(
            "data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_PERSISTENCE_PAYLOAD_SIZE
        )));
    }

    let header = PersistenceHeader::from_bytes(bytes)?;
    header.validate()?;

    postcard::from_bytes(&bytes[HEADER_SIZE..]).map_err(|e| {
        RoutineError::SerializationError(format!("failed to decode routine data: {e}"))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::storage::{RecordRead, RecordStore};
    use crate::{GroupDraft, ItemRef, StepDraft, SystemName, assembly, composition, entities};

    fn sample_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .write(|t| {
                let a = entities::create_step(t, StepDraft::new("Coffee").estimated_time(5))?;
                let b = entities::create_step(t, StepDraft::new("News").tags("am,read"))?;
                let g = entities::create_group(t, GroupDraft::new("Wake up"))?;
                composition::set_group_steps(t, g.id, &[b.id, a.id])?;
                assembly::set_system_items(
                    t,
                    SystemName::Daily,
                    &[ItemRef::Group(g.id), ItemRef::Step(a.id)],
                )?;
                Ok(())
            })
            .unwrap();
        store
    }

    #[test]
    fn header_roundtrip() {
        let header = PersistenceHeader::new();
        let restored = PersistenceHeader::from_bytes(&header.to_bytes()).unwrap();
        assert_eq!(restored, header);
        assert!(restored.validate().is_ok());
    }

    #[test]
    fn save_load_save_is_bit_exact() {
        let store = sample_store();
        let first = store_to_bytes(&store).unwrap();
        let restored = store_from_bytes(&first).unwrap();
        let second = store_to_bytes(&restored).unwrap();

        assert_eq!(restored, store);
        assert_eq!(first, second);
        assert_eq!(restored.system_items(SystemName::Daily).unwrap().len(), 2);
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = store_to_bytes(&MemoryStore::new()).unwrap();
        bytes[..4].copy_from_slice(b"KREM");
        assert!(matches!(
            store_from_bytes(&bytes),
            Err(RoutineError::SerializationError(_))
        ));
    }

    #[test]
    fn future_version_rejected() {
        let mut bytes = store_to_bytes(&MemoryStore::new()).unwrap();
        bytes[4] = primitives::FORMAT_VERSION + 1;
        assert!(store_from_bytes(&bytes).is_err());
    }

    #[test]
    fn truncated_data_rejected() {
        assert!(store_from_bytes(b"RTN").is_err());

        let bytes = store_to_bytes(&sample_store()).unwrap();
        assert!(store_from_bytes(&bytes[..bytes.len() - 3]).is_err());
    }
}
