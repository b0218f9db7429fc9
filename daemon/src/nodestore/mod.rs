//! Content addressed storage for ledger nodes.
//!
//! Objects are stored under their hash. On disk an object is encoded as
//! eight reserved bytes, one type byte and the payload.

mod memory;
mod sled;

pub use self::sled::SledBackend;
pub use memory::MemoryBackend;

use std::sync::Arc;
use thiserror::Error;
use trackable_common::crypto::Hash256;

use crate::config::Section;

const RESERVED_PREFIX: usize = 8;

#[derive(Error, Debug)]
pub enum NodeStoreError {
    #[error("Unknown backend type '{0}'")]
    UnknownType(String),
    #[error("Missing path for backend '{0}'")]
    MissingPath(String),
    #[error("Backend is not open")]
    NotOpen,
    #[error("Object data is corrupt")]
    DataCorrupt,
    #[error(transparent)]
    Sled(#[from] ::sled::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeObjectType {
    Unknown = 0,
    Ledger = 1,
    AccountNode = 3,
    TransactionNode = 4,
}

impl NodeObjectType {
    pub const ALL: [NodeObjectType; 4] = [
        NodeObjectType::Unknown,
        NodeObjectType::Ledger,
        NodeObjectType::AccountNode,
        NodeObjectType::TransactionNode,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| *t as u8 == value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeObject {
    pub object_type: NodeObjectType,
    pub hash: Hash256,
    pub data: Vec<u8>,
}

impl NodeObject {
    pub fn new(object_type: NodeObjectType, hash: Hash256, data: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            object_type,
            hash,
            data,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut blob = Vec::with_capacity(RESERVED_PREFIX + 1 + self.data.len());
        blob.extend_from_slice(&[0u8; RESERVED_PREFIX]);
        blob.push(self.object_type as u8);
        blob.extend_from_slice(&self.data);
        blob
    }

    /// Rebuild an object from its encoded form. Blobs too short to hold the
    /// header or naming an unknown type are corrupt.
    pub fn decode(hash: Hash256, blob: &[u8]) -> Result<Arc<Self>, NodeStoreError> {
        if blob.len() < RESERVED_PREFIX + 1 {
            return Err(NodeStoreError::DataCorrupt);
        }
        let object_type =
            NodeObjectType::from_u8(blob[RESERVED_PREFIX]).ok_or(NodeStoreError::DataCorrupt)?;
        Ok(NodeObject::new(
            object_type,
            hash,
            blob[RESERVED_PREFIX + 1..].to_vec(),
        ))
    }
}

pub type Batch = Vec<Arc<NodeObject>>;

pub trait Backend: Send + Sync {
    fn name(&self) -> String;

    fn open(&mut self, create_if_missing: bool) -> Result<(), NodeStoreError>;

    fn close(&mut self) -> Result<(), NodeStoreError>;

    fn fetch(&self, hash: &Hash256) -> Result<Option<Arc<NodeObject>>, NodeStoreError>;

    fn fetch_batch(&self, hashes: &[Hash256]) -> Result<Vec<Option<Arc<NodeObject>>>, NodeStoreError> {
        hashes.iter().map(|hash| self.fetch(hash)).collect()
    }

    fn store(&self, object: &Arc<NodeObject>) -> Result<(), NodeStoreError>;

    fn store_batch(&self, batch: &[Arc<NodeObject>]) -> Result<(), NodeStoreError> {
        for object in batch {
            self.store(object)?;
        }
        Ok(())
    }

    /// File descriptors the backend needs while open.
    fn fd_required(&self) -> usize;
}

pub struct Manager;

impl Manager {
    /// Build the backend a `[node_db]` section asks for. The backend is
    /// returned open.
    pub fn make_backend(section: &Section) -> Result<Box<dyn Backend>, NodeStoreError> {
        let kind = section.backend.to_ascii_lowercase();
        let mut backend: Box<dyn Backend> = match kind.as_str() {
            "memory" => Box::new(MemoryBackend::new(section.path.clone().unwrap_or_default())),
            "sled" => {
                let path = section
                    .path
                    .clone()
                    .ok_or_else(|| NodeStoreError::MissingPath(kind.clone()))?;
                Box::new(SledBackend::new(path))
            }
            _ => return Err(NodeStoreError::UnknownType(section.backend.clone())),
        };
        backend.open(true)?;
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use trackable_common::crypto::hash;

    #[test]
    fn test_short_blob_is_corrupt() {
        assert!(matches!(
            NodeObject::decode(Hash256::zero(), &[0u8; 8]),
            Err(NodeStoreError::DataCorrupt)
        ));
    }

    #[test]
    fn test_unknown_type_is_corrupt() {
        let mut blob = vec![0u8; 8];
        blob.push(2);
        blob.extend_from_slice(b"payload");
        assert!(matches!(
            NodeObject::decode(Hash256::zero(), &blob),
            Err(NodeStoreError::DataCorrupt)
        ));
    }

    #[test]
    fn test_unknown_backend_type() {
        let section = Section::new("rocksdb", None);
        assert!(matches!(
            Manager::make_backend(&section),
            Err(NodeStoreError::UnknownType(kind)) if kind == "rocksdb"
        ));
    }

    proptest! {
        #[test]
        fn test_decode_inverts_encode(data in proptest::collection::vec(any::<u8>(), 0..512), kind in 0usize..4) {
            let object = NodeObject::new(NodeObjectType::ALL[kind], hash(&data), data);
            let decoded = NodeObject::decode(object.hash, &object.encode()).unwrap();
            prop_assert_eq!(decoded, object);
        }
    }
}
