//! Invariants every `StorageBackend` must satisfy, run against all three
//! concrete backends by the sibling test files in this directory. Each
//! function takes a fresh backend and a domain name unique to the calling
//! test, so the same backend instance can be reused across invariants
//! without cross-contamination.

use pretty_assertions::assert_eq;

use basicdb::backend::expectation::Expectation;
use basicdb::backend::{PutRequest, StorageBackend};
use basicdb::model::{AttributeMap, ValueDeletion};

pub fn put_get_round_trips(backend: &dyn StorageBackend, domain: &str) {
    backend.create_domain("alice", domain).unwrap();
    let mut additions = AttributeMap::new();
    additions.add_values("Title", ["Dune".to_string()]);
    additions.add_values("Author", ["Herbert".to_string()]);
    let request = PutRequest {
        additions,
        ..Default::default()
    };
    backend.put_attributes("alice", domain, "b1", &request).unwrap();

    let attrs = backend.get_attributes("alice", domain, "b1").unwrap();
    assert!(attrs.get("Title").unwrap().contains("Dune"));
    assert!(attrs.get("Author").unwrap().contains("Herbert"));
}

pub fn deleting_every_value_erases_the_attribute(backend: &dyn StorageBackend, domain: &str) {
    backend.create_domain("alice", domain).unwrap();
    backend.add_attribute_value("alice", domain, "b1", "Title", "Dune").unwrap();
    backend.delete_attribute_value("alice", domain, "b1", "Title", "Dune").unwrap();
    let attrs = backend.get_attributes("alice", domain, "b1").unwrap();
    assert!(!attrs.contains_attr("Title"));
}

pub fn replace_is_idempotent(backend: &dyn StorageBackend, domain: &str) {
    backend.create_domain("alice", domain).unwrap();
    backend.add_attribute_value("alice", domain, "b1", "Color", "Red").unwrap();
    backend.replace_attribute("alice", domain, "b1", "Color", &["Blue".to_string()].into_iter().collect()).unwrap();
    backend.replace_attribute("alice", domain, "b1", "Color", &["Blue".to_string()].into_iter().collect()).unwrap();
    let attrs = backend.get_attributes("alice", domain, "b1").unwrap();
    let colors = attrs.get("Color").unwrap();
    assert_eq!(colors.len(), 1);
    assert!(colors.contains("Blue"));
}

pub fn owners_are_isolated(backend: &dyn StorageBackend, domain: &str) {
    backend.create_domain("alice", domain).unwrap();
    backend.add_attribute_value("alice", domain, "b1", "Title", "Dune").unwrap();
    let bob_attrs = backend.get_attributes("bob", domain, "b1").unwrap();
    assert!(bob_attrs.is_empty());
    assert!(backend.list_domains("bob").unwrap().is_empty());
}

pub fn deleting_a_domain_cascades_to_its_items(backend: &dyn StorageBackend, domain: &str) {
    backend.create_domain("alice", domain).unwrap();
    backend.add_attribute_value("alice", domain, "b1", "Title", "Dune").unwrap();
    backend.delete_domain("alice", domain).unwrap();
    assert!(backend.list_domains("alice").unwrap().iter().all(|d| d != domain));
    assert!(backend.get_attributes("alice", domain, "b1").unwrap().is_empty());
}

pub fn expectation_gates_the_write(backend: &dyn StorageBackend, domain: &str) {
    backend.create_domain("alice", domain).unwrap();
    backend.add_attribute_value("alice", domain, "b1", "Price", "9.99").unwrap();

    let mut additions = AttributeMap::new();
    additions.add_values("Price", ["14.99".to_string()]);
    let blocked = PutRequest {
        additions: additions.clone(),
        expectations: vec![Expectation::Value("Price".to_string(), "0.00".to_string())],
        ..Default::default()
    };
    assert!(backend.put_attributes("alice", domain, "b1", &blocked).is_err());

    let allowed = PutRequest {
        additions,
        expectations: vec![Expectation::Value("Price".to_string(), "9.99".to_string())],
        ..Default::default()
    };
    backend.put_attributes("alice", domain, "b1", &allowed).unwrap();
    let prices = backend.get_attributes("alice", domain, "b1").unwrap();
    assert!(prices.get("Price").unwrap().contains("14.99"));
}

pub fn batch_delete_removes_selected_values_only(backend: &dyn StorageBackend, domain: &str) {
    backend.create_domain("alice", domain).unwrap();
    backend.add_attribute_value("alice", domain, "b1", "Tag", "sci-fi").unwrap();
    backend.add_attribute_value("alice", domain, "b1", "Tag", "classic").unwrap();

    let mut deletions = basicdb::backend::DeletionMap::new();
    deletions.insert("Tag".to_string(), vec![ValueDeletion::Specific("classic".to_string())]);
    backend.delete_attributes("alice", domain, "b1", &deletions).unwrap();

    let attrs = backend.get_attributes("alice", domain, "b1").unwrap();
    let tags = attrs.get("Tag").unwrap();
    assert!(tags.contains("sci-fi"));
    assert!(!tags.contains("classic"));
}

pub fn run_all(backend: &dyn StorageBackend, domain_prefix: &str) {
    put_get_round_trips(backend, &format!("{domain_prefix}_round_trip"));
    deleting_every_value_erases_the_attribute(backend, &format!("{domain_prefix}_erase"));
    replace_is_idempotent(backend, &format!("{domain_prefix}_replace"));
    owners_are_isolated(backend, &format!("{domain_prefix}_isolation"));
    deleting_a_domain_cascades_to_its_items(backend, &format!("{domain_prefix}_cascade"));
    expectation_gates_the_write(backend, &format!("{domain_prefix}_expectation"));
    batch_delete_removes_selected_values_only(backend, &format!("{domain_prefix}_batch_delete"));
}
