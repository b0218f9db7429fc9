// File: testing-framework/src/utilities/storage.rs
//
// Storage Utilities for Testing
//
// RAII temporary directories for on-disk node store backends, and the
// predictable object batches the backend scenarios store and reread.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use trackable_common::crypto::Hash256;
use trackable_daemon::{
    config::Section,
    nodestore::{Batch, NodeObject, NodeObjectType},
};

use crate::orchestrator::TestRng;

/// Largest payload `create_predictable_batch` generates.
pub const MAX_PAYLOAD_BYTES: usize = 2000;

/// RAII wrapper for a temporary node store directory.
///
/// The directory is deleted when the wrapper is dropped, including when the
/// test panics. Cleanup cannot happen on SIGKILL.
///
/// # Example
///
/// ```ignore
/// use trackable_testing_framework::utilities::TempNodeStore;
///
/// let temp = TempNodeStore::new()?;
/// let backend = Manager::make_backend(&temp.section("sled"))?;
/// ```
pub struct TempNodeStore {
    _temp_dir: TempDir,
    path: PathBuf,
}

impl TempNodeStore {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix("trackable_test_nodestore_")
            .tempdir()?;

        let path = temp_dir.path().to_path_buf();

        if log::log_enabled!(log::Level::Debug) {
            log::debug!("Created temporary node store at: {:?}", path);
        }

        Ok(Self {
            _temp_dir: temp_dir,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn path_buf(&self) -> PathBuf {
        self.path.clone()
    }

    /// A `node_db` section for `backend` rooted in this directory.
    pub fn section(&self, backend: &str) -> Section {
        Section::new(backend, Some(self.path_buf()))
    }
}

impl Drop for TempNodeStore {
    fn drop(&mut self) {
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("Cleaning up temporary node store at: {:?}", self.path);
        }
    }
}

/// Create a temporary directory with a custom prefix.
pub fn create_temp_dir(prefix: &str) -> Result<TempDir> {
    Ok(tempfile::Builder::new().prefix(prefix).tempdir()?)
}

/// Create one object whose type, hash and payload come from `rng`.
pub fn create_predictable_object(rng: &TestRng) -> std::sync::Arc<NodeObject> {
    let object_type = match rng.gen_range(0..3) {
        0 => NodeObjectType::Ledger,
        1 => NodeObjectType::AccountNode,
        _ => NodeObjectType::TransactionNode,
    };
    let mut hash = [0u8; 32];
    rng.fill_bytes(&mut hash);
    let mut data = vec![0u8; rng.gen_range(1..=MAX_PAYLOAD_BYTES)];
    rng.fill_bytes(&mut data);
    NodeObject::new(object_type, Hash256::new(hash), data)
}

/// Create `count` objects. The same seed always yields the same batch.
pub fn create_predictable_batch(count: usize, seed: u64) -> Batch {
    let rng = TestRng::with_seed(seed);
    (0..count).map(|_| create_predictable_object(&rng)).collect()
}

/// True when both batches hold the same objects in the same order.
pub fn are_batches_equal(lhs: &[std::sync::Arc<NodeObject>], rhs: &[std::sync::Arc<NodeObject>]) -> bool {
    lhs.len() == rhs.len() && lhs.iter().zip(rhs).all(|(a, b)| a == b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_temp_node_store_creation() {
        let temp = TempNodeStore::new().unwrap();
        let path = temp.path();

        assert!(path.exists());
        assert!(path.is_dir());

        let test_file = path.join("test.txt");
        fs::write(&test_file, b"test data").unwrap();
        assert!(test_file.exists());
    }

    #[test]
    fn test_temp_node_store_cleanup() {
        let path_clone;
        {
            let temp = TempNodeStore::new().unwrap();
            path_clone = temp.path_buf();
            assert!(path_clone.exists());
        }
        std::thread::sleep(std::time::Duration::from_millis(100));
        assert!(!path_clone.exists());
    }

    #[test]
    fn test_multiple_instances_are_unique() {
        let a = TempNodeStore::new().unwrap();
        let b = TempNodeStore::new().unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_create_temp_dir() {
        let temp_dir = create_temp_dir("test_custom_").unwrap();
        let dir_name = temp_dir.path().file_name().unwrap().to_str().unwrap();
        assert!(dir_name.starts_with("test_custom_"));
    }

    #[test]
    fn test_predictable_batch() {
        let a = create_predictable_batch(64, 50);
        let b = create_predictable_batch(64, 50);
        let c = create_predictable_batch(64, 51);
        assert!(are_batches_equal(&a, &b));
        assert!(!are_batches_equal(&a, &c));
        assert!(a.iter().all(|o| !o.data.is_empty() && o.data.len() <= MAX_PAYLOAD_BYTES));
    }

    #[test]
    #[should_panic(expected = "test panic")]
    fn test_cleanup_on_panic() {
        let _temp = TempNodeStore::new().unwrap();
        panic!("test panic");
    }
}
