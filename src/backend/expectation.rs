//! Conditional-update preconditions gating a `put_attributes` call, checked
//! against an item's current attributes before any write is applied.

use crate::model::AttributeMap;

/// One precondition. `PutAttributes`/`DeleteAttributes` accept a list of
/// these via `Expected.N.Name`/`Expected.N.Value`/`Expected.N.Exists`; the
/// write only proceeds if every one holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// `Expected.N.Name` + `Expected.N.Exists=true` (or a bare name with no
    /// `Exists`/`Value`, SimpleDB's historical default): the attribute must
    /// have at least one value.
    MustExist(String),
    /// `Expected.N.Name` + `Expected.N.Exists=false`: the attribute must not
    /// exist at all.
    MustNotExist(String),
    /// `Expected.N.Name` + `Expected.N.Value`: the attribute must contain
    /// exactly this value among its (possibly several) current values.
    Value(String, String),
}

impl Expectation {
    pub fn attribute(&self) -> &str {
        match self {
            Expectation::MustExist(name) | Expectation::MustNotExist(name) | Expectation::Value(name, _) => name,
        }
    }

    /// Evaluates this precondition against an item's current attributes.
    pub fn check(&self, attrs: &AttributeMap) -> bool {
        match self {
            Expectation::MustExist(name) => attrs.contains_attr(name),
            Expectation::MustNotExist(name) => !attrs.contains_attr(name),
            Expectation::Value(name, expected) => attrs.get(name).is_some_and(|set| set.contains(expected)),
        }
    }
}
