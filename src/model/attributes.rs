//! The canonical attribute-map shape every backend exposes its state as,
//! plus the union/replace/delete operations defined on it.

use std::collections::{BTreeMap, BTreeSet};

use super::ValueDeletion;

/// A set of distinct string values bound to one attribute name. Deduplicated
/// and unordered by construction; `BTreeSet` gives deterministic iteration
/// order for tests without promising anything to API callers.
pub type AttributeSet = BTreeSet<String>;

/// `attribute_name -> set of values`, the shape every item's attributes take
/// regardless of which backend produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap(BTreeMap<String, AttributeSet>);

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, attr: &str) -> Option<&AttributeSet> {
        self.0.get(attr)
    }

    pub fn contains_attr(&self, attr: &str) -> bool {
        self.0.contains_key(attr)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeSet)> {
        self.0.iter()
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn into_inner(self) -> BTreeMap<String, AttributeSet> {
        self.0
    }

    pub fn from_map(map: BTreeMap<String, AttributeSet>) -> Self {
        // An attribute with an empty value set does not exist: enforce that
        // invariant here too, so any caller constructing a map by hand can't
        // accidentally smuggle one in.
        Self(map.into_iter().filter(|(_, v)| !v.is_empty()).collect())
    }

    /// Union semantics: pre-existing values are preserved.
    pub fn add_values(&mut self, attr: &str, values: impl IntoIterator<Item = String>) {
        let entry = self.0.entry(attr.to_string()).or_default();
        for v in values {
            entry.insert(v);
        }
    }

    /// Clears the prior set for `attr` and inserts `values` in its place. If
    /// `values` is empty the attribute is removed entirely (empty sets don't
    /// exist).
    pub fn replace_values(&mut self, attr: &str, values: impl IntoIterator<Item = String>) {
        self.0.remove(attr);
        self.add_values(attr, values);
        if matches!(self.0.get(attr), Some(set) if set.is_empty()) {
            self.0.remove(attr);
        }
    }

    /// Removes the listed values (or the whole attribute, for
    /// [`ValueDeletion::All`]). Removes the attribute key entirely once its
    /// value set becomes empty.
    pub fn delete_values(&mut self, attr: &str, deletions: impl IntoIterator<Item = ValueDeletion>) {
        let mut remove_all = false;
        let mut specific = Vec::new();
        for d in deletions {
            match d {
                ValueDeletion::All => remove_all = true,
                ValueDeletion::Specific(v) => specific.push(v),
            }
        }

        if remove_all {
            self.0.remove(attr);
            return;
        }

        if let Some(set) = self.0.get_mut(attr) {
            for v in specific {
                set.remove(&v);
            }
            if set.is_empty() {
                self.0.remove(attr);
            }
        }
    }

    /// Keeps only the named attributes (projection); drops the rest.
    pub fn project(&self, names: &[String]) -> AttributeMap {
        AttributeMap(
            self.0
                .iter()
                .filter(|(k, _)| names.iter().any(|n| n == *k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl IntoIterator for AttributeMap {
    type Item = (String, AttributeSet);
    type IntoIter = std::collections::btree_map::IntoIter<String, AttributeSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
