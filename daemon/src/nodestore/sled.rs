use log::{debug, trace, warn};
use std::{path::PathBuf, sync::Arc};
use trackable_common::crypto::Hash256;

use super::{Backend, NodeObject, NodeStoreError};

/// Backend storing encoded objects in a sled database.
pub struct SledBackend {
    path: PathBuf,
    db: Option<sled::Db>,
}

impl SledBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path, db: None }
    }

    fn db(&self) -> Result<&sled::Db, NodeStoreError> {
        self.db.as_ref().ok_or(NodeStoreError::NotOpen)
    }
}

impl Backend for SledBackend {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn open(&mut self, create_if_missing: bool) -> Result<(), NodeStoreError> {
        if self.db.is_some() {
            return Ok(());
        }
        debug!("Opening sled node store at {}", self.path.display());
        let db = sled::Config::default()
            .path(&self.path)
            .create_new(false)
            .open()?;
        if !create_if_missing && db.is_empty() {
            warn!("Node store at {} is empty", self.path.display());
        }
        self.db = Some(db);
        Ok(())
    }

    fn close(&mut self) -> Result<(), NodeStoreError> {
        if let Some(db) = self.db.take() {
            db.flush()?;
        }
        Ok(())
    }

    fn fetch(&self, hash: &Hash256) -> Result<Option<Arc<NodeObject>>, NodeStoreError> {
        match self.db()?.get(hash.as_bytes())? {
            Some(blob) => NodeObject::decode(*hash, &blob).map(Some),
            None => Ok(None),
        }
    }

    fn store(&self, object: &Arc<NodeObject>) -> Result<(), NodeStoreError> {
        trace!("Storing {} on disk", object.hash);
        self.db()?.insert(object.hash.as_bytes(), object.encode())?;
        Ok(())
    }

    fn store_batch(&self, batch: &[Arc<NodeObject>]) -> Result<(), NodeStoreError> {
        let mut writes = sled::Batch::default();
        for object in batch {
            writes.insert(object.hash.as_bytes().as_slice(), object.encode());
        }
        self.db()?.apply_batch(writes)?;
        Ok(())
    }

    fn fd_required(&self) -> usize {
        // sled keeps its data file, snapshot and blob directory open
        3
    }
}

impl Drop for SledBackend {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to flush node store at {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodestore::NodeObjectType;

    #[test]
    fn test_objects_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let object = NodeObject::new(NodeObjectType::AccountNode, Hash256::new([3u8; 32]), vec![1, 2, 3]);

        let mut backend = SledBackend::new(dir.path().to_path_buf());
        backend.open(true).unwrap();
        assert_eq!(backend.fd_required(), 3);
        backend.store(&object).unwrap();
        backend.close().unwrap();
        assert!(matches!(backend.fetch(&object.hash), Err(NodeStoreError::NotOpen)));

        backend.open(false).unwrap();
        assert_eq!(backend.fetch(&object.hash).unwrap(), Some(object));
    }
}
