//! A filesystem backend, grounded on the original `FileSystemBackend`: each
//! attribute value is written to its own content-addressed file under a
//! directory tree keyed by owner/domain/item/attribute. The original named
//! value files by their MD5 digest; we use SHA-256 (already pulled in by the
//! rest of the dependency stack, and not broken the way MD5 is) and hex-encode
//! it for the filename.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::BasicDbError;
use crate::model::AttributeMap;

use super::StorageBackend;

pub struct FilesystemBackend {
    base_dir: PathBuf,
}

impl FilesystemBackend {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, BasicDbError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        Ok(FilesystemBackend { base_dir })
    }

    fn owner_dir(&self, owner: &str) -> PathBuf {
        self.base_dir.join(owner)
    }

    fn domain_dir(&self, owner: &str, domain: &str) -> PathBuf {
        self.owner_dir(owner).join(domain)
    }

    fn item_dir(&self, owner: &str, domain: &str, item: &str) -> PathBuf {
        self.domain_dir(owner, domain).join(item)
    }

    fn attr_dir(&self, owner: &str, domain: &str, item: &str, attr: &str) -> PathBuf {
        self.item_dir(owner, domain, item).join(attr)
    }

    fn value_file(&self, owner: &str, domain: &str, item: &str, attr: &str, value: &str) -> PathBuf {
        self.attr_dir(owner, domain, item, attr).join(digest_hex(value))
    }

    /// An item with no attribute directories left doesn't exist per the data
    /// model; drop its (now-empty) directory so `list_items` stops reporting
    /// it. A non-empty-dir error just means attributes remain, which is fine.
    fn remove_item_dir_if_empty(&self, owner: &str, domain: &str, item: &str) {
        let _ = fs::remove_dir(self.item_dir(owner, domain, item));
    }

    /// Top-level, single-depth directory names under `dir` (the `walkdir`
    /// equivalent of a single `readdir`), used to enumerate domains, items,
    /// and attribute names.
    fn child_names(dir: &Path) -> Result<Vec<String>, BasicDbError> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| BasicDbError::Io(e.into()))?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn digest_hex(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

/// A missing directory/file is not an error for reads: it just means the
/// attribute or item doesn't exist, mirroring the original's `errno.ENOENT`
/// handling.
fn ignore_not_found(result: std::io::Result<()>) -> Result<(), BasicDbError> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl StorageBackend for FilesystemBackend {
    fn create_domain(&self, owner: &str, domain: &str) -> Result<(), BasicDbError> {
        fs::create_dir_all(self.domain_dir(owner, domain))?;
        Ok(())
    }

    fn delete_domain(&self, owner: &str, domain: &str) -> Result<(), BasicDbError> {
        ignore_not_found(fs::remove_dir_all(self.domain_dir(owner, domain)))
    }

    fn list_domains(&self, owner: &str) -> Result<Vec<String>, BasicDbError> {
        Self::child_names(&self.owner_dir(owner))
    }

    fn list_items(&self, owner: &str, domain: &str) -> Result<Vec<String>, BasicDbError> {
        Self::child_names(&self.domain_dir(owner, domain))
    }

    fn get_attributes(&self, owner: &str, domain: &str, item: &str) -> Result<AttributeMap, BasicDbError> {
        let mut attrs = AttributeMap::new();
        for attr_name in Self::child_names(&self.item_dir(owner, domain, item))? {
            let attr_dir = self.attr_dir(owner, domain, item, &attr_name);
            let mut values = Vec::new();
            for entry in WalkDir::new(&attr_dir).min_depth(1).max_depth(1) {
                let entry = entry.map_err(|e| BasicDbError::Io(e.into()))?;
                values.push(fs::read_to_string(entry.path())?);
            }
            if !values.is_empty() {
                attrs.add_values(&attr_name, values);
            }
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
        fs::create_dir_all(self.attr_dir(owner, domain, item, attr))?;
        let mut file = fs::File::create(self.value_file(owner, domain, item, attr, value))?;
        file.write_all(value.as_bytes())?;
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
        let path = self.value_file(owner, domain, item, attr, value);
        ignore_not_found(fs::remove_file(&path))?;
        let attr_dir = self.attr_dir(owner, domain, item, attr);
        // Drop the now-possibly-empty attribute directory; a non-empty-dir
        // error just means other values remain, which is fine.
        let _ = fs::remove_dir(attr_dir);
        self.remove_item_dir_if_empty(owner, domain, item);
        Ok(())
    }

    fn delete_attribute_all(&self, owner: &str, domain: &str, item: &str, attr: &str) -> Result<(), BasicDbError> {
        ignore_not_found(fs::remove_dir_all(self.attr_dir(owner, domain, item, attr)))?;
        self.remove_item_dir_if_empty(owner, domain, item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> (FilesystemBackend, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path()).unwrap();
        (backend, dir)
    }

    #[test]
    fn round_trips_a_value_through_digest_named_files() {
        let (backend, _dir) = backend();
        backend.create_domain("alice", "books").unwrap();
        backend.add_attribute_value("alice", "books", "b1", "Title", "Dune").unwrap();
        let attrs = backend.get_attributes("alice", "books", "b1").unwrap();
        assert!(attrs.get("Title").unwrap().contains("Dune"));
    }

    #[test]
    fn deleting_last_value_removes_attribute_directory() {
        let (backend, dir) = backend();
        backend.create_domain("alice", "books").unwrap();
        backend.add_attribute_value("alice", "books", "b1", "Title", "Dune").unwrap();
        backend.delete_attribute_value("alice", "books", "b1", "Title", "Dune").unwrap();
        assert!(!backend.attr_dir("alice", "books", "b1", "Title").exists());
        let attrs = backend.get_attributes("alice", "books", "b1").unwrap();
        assert!(!attrs.contains_attr("Title"));
        drop(dir);
    }

    #[test]
    fn deleting_last_value_of_only_attribute_removes_the_item_directory() {
        let (backend, dir) = backend();
        backend.create_domain("alice", "books").unwrap();
        backend.add_attribute_value("alice", "books", "b1", "Title", "Dune").unwrap();
        backend.delete_attribute_value("alice", "books", "b1", "Title", "Dune").unwrap();
        assert!(backend.list_items("alice", "books").unwrap().is_empty());
        assert!(!backend.item_dir("alice", "books", "b1").exists());
        drop(dir);
    }

    #[test]
    fn list_domains_reflects_directory_contents() {
        let (backend, _dir) = backend();
        backend.create_domain("alice", "books").unwrap();
        backend.create_domain("alice", "movies").unwrap();
        let mut domains = backend.list_domains("alice").unwrap();
        domains.sort();
        assert_eq!(domains, vec!["books".to_string(), "movies".to_string()]);
    }

    #[test]
    fn get_attributes_on_missing_item_is_empty_not_an_error() {
        let (backend, _dir) = backend();
        backend.create_domain("alice", "books").unwrap();
        let attrs = backend.get_attributes("alice", "books", "ghost").unwrap();
        assert!(attrs.is_empty());
    }
}
