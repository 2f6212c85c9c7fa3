//! A backend built on a generic bucket/key/value store, modeled on the
//! original `RiakBackend`'s data layout: one master bucket mapping each
//! owner to a `{domain -> bucket_id}` directory, and one bucket per domain
//! mapping each item name to a JSON-encoded `{attr -> [values]}` document.
//!
//! The concrete store is abstracted behind [`KvStore`] so this module has no
//! network dependency of its own; a real deployment plugs in whatever KV
//! client it likes (an HTTP client to a managed store, `aws-sdk-dynamodb`,
//! etc.) at that seam.

pub mod local;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::BasicDbError;
use crate::model::AttributeMap;

use super::StorageBackend;

/// The minimal operations a remote key-value store must support for this
/// backend to sit on top of it. "Last write wins" conflict resolution is
/// assumed; no vector clocks or CRDT merge.
pub trait KvStore: Send + Sync {
    fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, BasicDbError>;
    fn put(&self, bucket: &str, key: &str, value: &[u8]) -> Result<(), BasicDbError>;
    fn delete(&self, bucket: &str, key: &str) -> Result<(), BasicDbError>;
    fn list_keys(&self, bucket: &str) -> Result<Vec<String>, BasicDbError>;
}

const MASTER_BUCKET: &str = "basicdb_master";

#[derive(Debug, Default, Serialize, Deserialize)]
struct OwnerRecord {
    domains: BTreeMap<String, String>,
}

pub struct RemoteKvBackend<S: KvStore> {
    store: S,
}

impl<S: KvStore> RemoteKvBackend<S> {
    pub fn new(store: S) -> Self {
        RemoteKvBackend { store }
    }

    fn owner_record(&self, owner: &str) -> Result<OwnerRecord, BasicDbError> {
        match self.store.get(MASTER_BUCKET, owner)? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(json_err),
            None => Ok(OwnerRecord::default()),
        }
    }

    fn put_owner_record(&self, owner: &str, record: &OwnerRecord) -> Result<(), BasicDbError> {
        let bytes = serde_json::to_vec(record).map_err(json_err)?;
        self.store.put(MASTER_BUCKET, owner, &bytes)
    }

    fn domain_bucket(&self, owner: &str, domain: &str) -> Result<Option<String>, BasicDbError> {
        Ok(self.owner_record(owner)?.domains.get(domain).cloned())
    }

    /// Returns the domain's bucket, creating it (and registering it in the
    /// owner record) if the domain was never explicitly created — mirroring
    /// `memory`'s auto-vivification and `filesystem`'s `create_dir_all` on
    /// the write path, so all three backends agree on writes against a
    /// domain that doesn't exist yet.
    fn ensure_domain_bucket(&self, owner: &str, domain: &str) -> Result<String, BasicDbError> {
        let mut record = self.owner_record(owner)?;
        if let Some(bucket) = record.domains.get(domain) {
            return Ok(bucket.clone());
        }
        let bucket = uuid::Uuid::new_v4().to_string();
        record.domains.insert(domain.to_string(), bucket.clone());
        self.put_owner_record(owner, &record)?;
        Ok(bucket)
    }

    fn item_record(&self, owner: &str, domain: &str, item: &str) -> Result<BTreeMap<String, Vec<String>>, BasicDbError> {
        let Some(bucket) = self.domain_bucket(owner, domain)? else {
            return Ok(BTreeMap::new());
        };
        match self.store.get(&bucket, item)? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(json_err),
            None => Ok(BTreeMap::new()),
        }
    }

    fn put_item_record(
        &self,
        owner: &str,
        domain: &str,
        item: &str,
        record: &BTreeMap<String, Vec<String>>,
    ) -> Result<(), BasicDbError> {
        if record.is_empty() {
            // A delete that leaves nothing behind is a no-op against a
            // domain that was never created, matching `memory`'s no-op
            // delete and `filesystem`'s `ignore_not_found`.
            return match self.domain_bucket(owner, domain)? {
                Some(bucket) => self.store.delete(&bucket, item),
                None => Ok(()),
            };
        }
        let bucket = self.ensure_domain_bucket(owner, domain)?;
        let bytes = serde_json::to_vec(record).map_err(json_err)?;
        self.store.put(&bucket, item, &bytes)
    }
}

fn json_err(e: serde_json::Error) -> BasicDbError {
    BasicDbError::Internal {
        message: format!("malformed remote-kv record: {e}"),
    }
}

impl<S: KvStore> StorageBackend for RemoteKvBackend<S> {
    fn create_domain(&self, owner: &str, domain: &str) -> Result<(), BasicDbError> {
        let mut record = self.owner_record(owner)?;
        if record.domains.contains_key(domain) {
            return Ok(());
        }
        record.domains.insert(domain.to_string(), uuid::Uuid::new_v4().to_string());
        self.put_owner_record(owner, &record)
    }

    fn delete_domain(&self, owner: &str, domain: &str) -> Result<(), BasicDbError> {
        let mut record = self.owner_record(owner)?;
        if record.domains.remove(domain).is_some() {
            self.put_owner_record(owner, &record)?;
        }
        Ok(())
    }

    fn list_domains(&self, owner: &str) -> Result<Vec<String>, BasicDbError> {
        Ok(self.owner_record(owner)?.domains.into_keys().collect())
    }

    fn list_items(&self, owner: &str, domain: &str) -> Result<Vec<String>, BasicDbError> {
        match self.domain_bucket(owner, domain)? {
            Some(bucket) => self.store.list_keys(&bucket),
            None => Ok(Vec::new()),
        }
    }

    fn get_attributes(&self, owner: &str, domain: &str, item: &str) -> Result<AttributeMap, BasicDbError> {
        let record = self.item_record(owner, domain, item)?;
        let mut attrs = AttributeMap::new();
        for (attr, values) in record {
            attrs.add_values(&attr, values);
        }
        Ok(attrs)
    }

    fn add_attribute_value(
        &self,
        owner: &str,
        domain: &str,
        item: &str,
        attr: &str,
        value: &str,
    ) -> Result<(), BasicDbError> {
        let mut record = self.item_record(owner, domain, item)?;
        let entry = record.entry(attr.to_string()).or_default();
        if !entry.contains(&value.to_string()) {
            entry.push(value.to_string());
        }
        self.put_item_record(owner, domain, item, &record)
    }

    fn delete_attribute_value(
        &self,
        owner: &str,
        domain: &str,
        item: &str,
        attr: &str,
        value: &str,
    ) -> Result<(), BasicDbError> {
        let mut record = self.item_record(owner, domain, item)?;
        if let Some(values) = record.get_mut(attr) {
            values.retain(|v| v != value);
            if values.is_empty() {
                record.remove(attr);
            }
        }
        self.put_item_record(owner, domain, item, &record)
    }

    fn delete_attribute_all(&self, owner: &str, domain: &str, item: &str, attr: &str) -> Result<(), BasicDbError> {
        let mut record = self.item_record(owner, domain, item)?;
        record.remove(attr);
        self.put_item_record(owner, domain, item, &record)
    }

    // `select` is left at its default: the generic `KvStore` can't evaluate
    // the WHERE expression server-side, so every query falls back to
    // fetching all items via `list_items`/`get_attributes` and running the
    // shared driver client-side.
}
