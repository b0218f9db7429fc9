use lazy_static::lazy_static;
use log::trace;
use parking_lot::{Mutex, RwLock};
use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
    sync::Arc,
};
use trackable_common::crypto::Hash256;

use super::{Backend, NodeObject, NodeStoreError};

type MemoryDb = Arc<RwLock<BTreeMap<Hash256, Arc<NodeObject>>>>;

lazy_static! {
    // Databases outlive their backends so a reopen sees earlier writes
    static ref MEMORY_DBS: Mutex<HashMap<PathBuf, MemoryDb>> = Mutex::new(HashMap::new());
}

fn open_db(path: &PathBuf) -> MemoryDb {
    MEMORY_DBS
        .lock()
        .entry(path.clone())
        .or_insert_with(|| Arc::new(RwLock::new(BTreeMap::new())))
        .clone()
}

/// Backend keeping objects in process memory, keyed by path.
pub struct MemoryBackend {
    path: PathBuf,
    db: Option<MemoryDb>,
}

impl MemoryBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path, db: None }
    }

    fn db(&self) -> Result<&MemoryDb, NodeStoreError> {
        self.db.as_ref().ok_or(NodeStoreError::NotOpen)
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn open(&mut self, _create_if_missing: bool) -> Result<(), NodeStoreError> {
        self.db = Some(open_db(&self.path));
        Ok(())
    }

    fn close(&mut self) -> Result<(), NodeStoreError> {
        self.db = None;
        Ok(())
    }

    fn fetch(&self, hash: &Hash256) -> Result<Option<Arc<NodeObject>>, NodeStoreError> {
        Ok(self.db()?.read().get(hash).cloned())
    }

    fn store(&self, object: &Arc<NodeObject>) -> Result<(), NodeStoreError> {
        trace!("Storing {} in memory", object.hash);
        self.db()?.write().insert(object.hash, object.clone());
        Ok(())
    }

    fn store_batch(&self, batch: &[Arc<NodeObject>]) -> Result<(), NodeStoreError> {
        let db = self.db()?;
        let mut db = db.write();
        for object in batch {
            db.insert(object.hash, object.clone());
        }
        Ok(())
    }

    fn fd_required(&self) -> usize {
        0
    }
}
