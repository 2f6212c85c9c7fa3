//! An in-memory backend, grounded on the original `FakeBackend`: a nested
//! map kept behind a single `RwLock`, intended for tests and local
//! development rather than production durability.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::BasicDbError;
use crate::model::AttributeMap;

use super::StorageBackend;

type Domain = BTreeMap<String, AttributeMap>;
type Owner = BTreeMap<String, Domain>;

#[derive(Default)]
pub struct MemoryBackend {
    owners: RwLock<BTreeMap<String, Owner>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook mirroring the original backends' `_reset`: clears every
    /// owner's data. Scoped broader than `reset_owner` on purpose, for
    /// full-suite teardown between test cases.
    pub fn reset_all(&self) {
        self.owners.write().unwrap().clear();
    }

    /// Clears just one owner's domains, leaving other owners' data intact.
    pub fn reset_owner(&self, owner: &str) {
        self.owners.write().unwrap().remove(owner);
    }
}

impl StorageBackend for MemoryBackend {
    fn create_domain(&self, owner: &str, domain: &str) -> Result<(), BasicDbError> {
        let mut owners = self.owners.write().unwrap();
        owners
            .entry(owner.to_string())
            .or_default()
            .entry(domain.to_string())
            .or_default();
        Ok(())
    }

    fn delete_domain(&self, owner: &str, domain: &str) -> Result<(), BasicDbError> {
        if let Some(domains) = self.owners.write().unwrap().get_mut(owner) {
            domains.remove(domain);
        }
        Ok(())
    }

    fn list_domains(&self, owner: &str) -> Result<Vec<String>, BasicDbError> {
        let owners = self.owners.read().unwrap();
        Ok(owners
            .get(owner)
            .map(|domains| domains.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn list_items(&self, owner: &str, domain: &str) -> Result<Vec<String>, BasicDbError> {
        let owners = self.owners.read().unwrap();
        Ok(owners
            .get(owner)
            .and_then(|domains| domains.get(domain))
            .map(|items| items.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn get_attributes(&self, owner: &str, domain: &str, item: &str) -> Result<AttributeMap, BasicDbError> {
        let owners = self.owners.read().unwrap();
        Ok(owners
            .get(owner)
            .and_then(|domains| domains.get(domain))
            .and_then(|items| items.get(item))
            .cloned()
            .unwrap_or_default())
    }

    fn add_attribute_value(
        &self,
        owner: &str,
        domain: &str,
        item: &str,
        attr: &str,
        value: &str,
    ) -> Result<(), BasicDbError> {
        let mut owners = self.owners.write().unwrap();
        let item_attrs = owners
            .entry(owner.to_string())
            .or_default()
            .entry(domain.to_string())
            .or_default()
            .entry(item.to_string())
            .or_default();
        item_attrs.add_values(attr, [value.to_string()]);
        Ok(())
    }

    fn delete_attribute_value(
        &self,
        owner: &str,
        domain: &str,
        item: &str,
        attr: &str,
        value: &str,
    ) -> Result<(), BasicDbError> {
        let mut owners = self.owners.write().unwrap();
        if let Some(domain_items) = owners.get_mut(owner).and_then(|domains| domains.get_mut(domain)) {
            if let Some(item_attrs) = domain_items.get_mut(item) {
                item_attrs.delete_values(attr, [crate::model::ValueDeletion::Specific(value.to_string())]);
                if item_attrs.is_empty() {
                    domain_items.remove(item);
                }
            }
        }
        Ok(())
    }

    fn delete_attribute_all(&self, owner: &str, domain: &str, item: &str, attr: &str) -> Result<(), BasicDbError> {
        let mut owners = self.owners.write().unwrap();
        if let Some(domain_items) = owners.get_mut(owner).and_then(|domains| domains.get_mut(domain)) {
            if let Some(item_attrs) = domain_items.get_mut(item) {
                item_attrs.delete_values(attr, [crate::model::ValueDeletion::All]);
                if item_attrs.is_empty() {
                    domain_items.remove(item);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_single_value() {
        let backend = MemoryBackend::new();
        backend.create_domain("alice", "books").unwrap();
        backend.add_attribute_value("alice", "books", "b1", "Title", "Dune").unwrap();
        let attrs = backend.get_attributes("alice", "books", "b1").unwrap();
        assert!(attrs.get("Title").unwrap().contains("Dune"));
    }

    #[test]
    fn deleting_last_value_erases_the_attribute() {
        let backend = MemoryBackend::new();
        backend.create_domain("alice", "books").unwrap();
        backend.add_attribute_value("alice", "books", "b1", "Title", "Dune").unwrap();
        backend.delete_attribute_value("alice", "books", "b1", "Title", "Dune").unwrap();
        let attrs = backend.get_attributes("alice", "books", "b1").unwrap();
        assert!(!attrs.contains_attr("Title"));
    }

    #[test]
    fn owners_are_isolated() {
        let backend = MemoryBackend::new();
        backend.create_domain("alice", "books").unwrap();
        backend.add_attribute_value("alice", "books", "b1", "Title", "Dune").unwrap();
        let bob_attrs = backend.get_attributes("bob", "books", "b1").unwrap();
        assert!(bob_attrs.is_empty());
    }

    #[test]
    fn deleting_a_domain_removes_its_items() {
        let backend = MemoryBackend::new();
        backend.create_domain("alice", "books").unwrap();
        backend.add_attribute_value("alice", "books", "b1", "Title", "Dune").unwrap();
        backend.delete_domain("alice", "books").unwrap();
        assert!(backend.list_domains("alice").unwrap().is_empty());
    }

    #[test]
    fn deleting_last_value_of_only_attribute_removes_the_item() {
        let backend = MemoryBackend::new();
        backend.create_domain("alice", "books").unwrap();
        backend.add_attribute_value("alice", "books", "b1", "Title", "Dune").unwrap();
        backend.delete_attribute_value("alice", "books", "b1", "Title", "Dune").unwrap();
        assert!(backend.list_items("alice", "books").unwrap().is_empty());
    }

    #[test]
    fn reset_owner_does_not_disturb_other_owners() {
        let backend = MemoryBackend::new();
        backend.create_domain("alice", "books").unwrap();
        backend.create_domain("bob", "books").unwrap();
        backend.reset_owner("alice");
        assert!(backend.list_domains("alice").unwrap().is_empty());
        assert_eq!(backend.list_domains("bob").unwrap(), vec!["books".to_string()]);
    }
}
