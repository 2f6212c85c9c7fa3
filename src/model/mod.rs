//! The value model: owner-scoped domains of items, each a map from attribute
//! name to a set of string values.

mod attributes;

pub use attributes::{AttributeMap, AttributeSet};

/// One of the values a caller supplies when deleting attribute values: either
/// a specific value, or the "remove everything" marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueDeletion {
    Specific(String),
    All,
}
