//! An in-process [`KvStore`] implementation: a lock-guarded map of buckets,
//! each a map of keys to bytes. Gives the bucket-shaped data layout of
//! [`super::RemoteKvBackend`] without standing up a real distributed store;
//! intended for tests and for operators who want that shape locally.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::BasicDbError;

use super::KvStore;

#[derive(Default)]
pub struct LocalKvStore {
    buckets: RwLock<BTreeMap<String, BTreeMap<String, Vec<u8>>>>,
}

impl LocalKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for LocalKvStore {
    fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, BasicDbError> {
        Ok(self.buckets.read().unwrap().get(bucket).and_then(|b| b.get(key).cloned()))
    }

    fn put(&self, bucket: &str, key: &str, value: &[u8]) -> Result<(), BasicDbError> {
        self.buckets
            .write()
            .unwrap()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, bucket: &str, key: &str) -> Result<(), BasicDbError> {
        if let Some(b) = self.buckets.write().unwrap().get_mut(bucket) {
            b.remove(key);
        }
        Ok(())
    }

    fn list_keys(&self, bucket: &str) -> Result<Vec<String>, BasicDbError> {
        Ok(self
            .buckets
            .read()
            .unwrap()
            .get(bucket)
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default())
    }
}
