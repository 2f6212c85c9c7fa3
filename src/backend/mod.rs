//! The storage backend contract: a handful of required leaf operations plus
//! a layer of derived operations given default implementations in terms of
//! those leaves, mirroring the original `StorageBackend` base class. A
//! concrete backend only needs to implement the leaves; `put_attributes`,
//! `batch_put_attributes`, `select`, and friends come for free, and can be
//! overridden when a backend has a faster native path.

pub mod expectation;
pub mod filesystem;
pub mod memory;
pub mod remote_kv;

use std::collections::BTreeMap;

use crate::error::BasicDbError;
use crate::model::{AttributeMap, AttributeSet, ValueDeletion};
use crate::query::{self, ParsedSelect, SelectResult};

pub use expectation::Expectation;

/// Per-attribute value deletions for one item, as passed to
/// [`StorageBackend::delete_attributes`] / `batch_delete_attributes`.
pub type DeletionMap = BTreeMap<String, Vec<ValueDeletion>>;

/// Aggregate counters returned by `DomainMetadata` queries. Real SimpleDB
/// tracks these precisely per-domain; our backends compute them on demand
/// from the live item set rather than maintaining running counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainMetadata {
    pub item_count: u64,
    pub item_names_size_bytes: u64,
    pub attribute_name_count: u64,
    pub attribute_names_size_bytes: u64,
    pub attribute_value_count: u64,
    pub attribute_values_size_bytes: u64,
    pub timestamp: i64,
}

/// One item's full put request: values to add (union with existing) and
/// values to replace (clear then set), keyed the same way `AttributeMap`
/// is.
#[derive(Debug, Clone, Default)]
pub struct PutRequest {
    pub additions: AttributeMap,
    pub replacements: AttributeMap,
    pub expectations: Vec<Expectation>,
}

pub trait StorageBackend: Send + Sync {
    // ---- required leaves -------------------------------------------------

    fn create_domain(&self, owner: &str, domain: &str) -> Result<(), BasicDbError>;
    fn delete_domain(&self, owner: &str, domain: &str) -> Result<(), BasicDbError>;
    fn list_domains(&self, owner: &str) -> Result<Vec<String>, BasicDbError>;
    fn list_items(&self, owner: &str, domain: &str) -> Result<Vec<String>, BasicDbError>;
    fn get_attributes(&self, owner: &str, domain: &str, item: &str) -> Result<AttributeMap, BasicDbError>;
    fn add_attribute_value(
        &self,
        owner: &str,
        domain: &str,
        item: &str,
        attr: &str,
        value: &str,
    ) -> Result<(), BasicDbError>;
    fn delete_attribute_value(
        &self,
        owner: &str,
        domain: &str,
        item: &str,
        attr: &str,
        value: &str,
    ) -> Result<(), BasicDbError>;
    fn delete_attribute_all(&self, owner: &str, domain: &str, item: &str, attr: &str) -> Result<(), BasicDbError>;

    // ---- derived defaults --------------------------------------------------

    fn add_attribute(
        &self,
        owner: &str,
        domain: &str,
        item: &str,
        attr: &str,
        values: &AttributeSet,
    ) -> Result<(), BasicDbError> {
        for value in values {
            self.add_attribute_value(owner, domain, item, attr, value)?;
        }
        Ok(())
    }

    fn add_attributes(&self, owner: &str, domain: &str, item: &str, additions: &AttributeMap) -> Result<(), BasicDbError> {
        for (attr, values) in additions.iter() {
            self.add_attribute(owner, domain, item, attr, values)?;
        }
        Ok(())
    }

    fn replace_attribute(
        &self,
        owner: &str,
        domain: &str,
        item: &str,
        attr: &str,
        values: &AttributeSet,
    ) -> Result<(), BasicDbError> {
        self.delete_attribute_all(owner, domain, item, attr)?;
        self.add_attribute(owner, domain, item, attr, values)
    }

    fn replace_attributes(
        &self,
        owner: &str,
        domain: &str,
        item: &str,
        replacements: &AttributeMap,
    ) -> Result<(), BasicDbError> {
        for (attr, values) in replacements.iter() {
            self.replace_attribute(owner, domain, item, attr, values)?;
        }
        Ok(())
    }

    fn delete_attribute(
        &self,
        owner: &str,
        domain: &str,
        item: &str,
        attr: &str,
        deletions: &[ValueDeletion],
    ) -> Result<(), BasicDbError> {
        if deletions.iter().any(|d| matches!(d, ValueDeletion::All)) {
            return self.delete_attribute_all(owner, domain, item, attr);
        }
        for deletion in deletions {
            if let ValueDeletion::Specific(value) = deletion {
                self.delete_attribute_value(owner, domain, item, attr, value)?;
            }
        }
        Ok(())
    }

    fn delete_attributes(&self, owner: &str, domain: &str, item: &str, deletions: &DeletionMap) -> Result<(), BasicDbError> {
        for (attr, value_deletions) in deletions {
            self.delete_attribute(owner, domain, item, attr, value_deletions)?;
        }
        Ok(())
    }

    fn check_expectation(
        &self,
        owner: &str,
        domain: &str,
        item: &str,
        expectation: &Expectation,
    ) -> Result<bool, BasicDbError> {
        let attrs = self.get_attributes(owner, domain, item)?;
        Ok(expectation.check(&attrs))
    }

    fn check_expectations(
        &self,
        owner: &str,
        domain: &str,
        item: &str,
        expectations: &[Expectation],
    ) -> Result<bool, BasicDbError> {
        for expectation in expectations {
            if !self.check_expectation(owner, domain, item, expectation)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn put_attributes(&self, owner: &str, domain: &str, item: &str, request: &PutRequest) -> Result<(), BasicDbError> {
        if !request.expectations.is_empty() && !self.check_expectations(owner, domain, item, &request.expectations)? {
            return Err(BasicDbError::ConditionalCheckFailed);
        }
        self.add_attributes(owner, domain, item, &request.additions)?;
        self.replace_attributes(owner, domain, item, &request.replacements)?;
        Ok(())
    }

    fn batch_put_attributes(
        &self,
        owner: &str,
        domain: &str,
        requests: &[(String, PutRequest)],
    ) -> Result<(), BasicDbError> {
        for (item, request) in requests {
            self.put_attributes(owner, domain, item, request)?;
        }
        Ok(())
    }

    fn batch_delete_attributes(
        &self,
        owner: &str,
        domain: &str,
        deletions: &[(String, DeletionMap)],
    ) -> Result<(), BasicDbError> {
        for (item, item_deletions) in deletions {
            self.delete_attributes(owner, domain, item, item_deletions)?;
        }
        Ok(())
    }

    fn get_all_items(&self, owner: &str, domain: &str) -> Result<Vec<(String, AttributeMap)>, BasicDbError> {
        let names = self.list_items(owner, domain)?;
        names
            .into_iter()
            .map(|name| {
                let attrs = self.get_attributes(owner, domain, &name)?;
                Ok((name, attrs))
            })
            .collect()
    }

    fn domain_metadata(&self, owner: &str, domain: &str) -> Result<DomainMetadata, BasicDbError> {
        let items = self.get_all_items(owner, domain)?;
        let item_count = items.len() as u64;
        let item_names_size_bytes = items.iter().map(|(name, _)| name.len() as u64).sum();
        let mut attribute_name_count = 0u64;
        let mut attribute_names_size_bytes = 0u64;
        let mut attribute_value_count = 0u64;
        let mut attribute_values_size_bytes = 0u64;
        for (_, attrs) in &items {
            for (name, values) in attrs.iter() {
                attribute_name_count += 1;
                attribute_names_size_bytes += name.len() as u64;
                attribute_value_count += values.len() as u64;
                attribute_values_size_bytes += values.iter().map(|v| v.len() as u64).sum::<u64>();
            }
        }
        Ok(DomainMetadata {
            item_count,
            item_names_size_bytes,
            attribute_name_count,
            attribute_names_size_bytes,
            attribute_value_count,
            attribute_values_size_bytes,
            timestamp: chrono::Utc::now().timestamp(),
        })
    }

    fn select(&self, owner: &str, parsed: &ParsedSelect) -> Result<SelectResult, BasicDbError> {
        let items = self.get_all_items(owner, &parsed.table)?;
        query::driver::run(parsed, items)
    }
}
