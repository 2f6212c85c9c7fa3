//! Extracts the numbered `Attribute.N.*`, `Expected.N.*`, and `Item.N.*`
//! parameter families from a flat list of decoded query/form pairs, grounded
//! on `basicdb/utils.py`'s `extract_numbered_args` and its three callers
//! (`extract_additions_and_replacements_from_query_params`,
//! `extract_expectations_from_query_params`,
//! `extract_deletions_from_query_params`).

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::backend::{DeletionMap, Expectation, PutRequest};
use crate::error::BasicDbError;
use crate::model::{AttributeMap, ValueDeletion};

/// The flat parameter list a request decodes to, in first-seen order
/// (duplicates are possible; only the first value for a scalar param like
/// `DomainName` is honored, matching typical form-decoding behavior).
pub type Params = Vec<(String, String)>;

static ATTRIBUTE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Attribute\.(\d+)\.(Name|Value|Replace)$").unwrap());
static EXPECTED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Expected\.(\d+)\.(Name|Value|Exists)$").unwrap());
static ITEM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Item\.(\d+)\.(.+)$").unwrap());
static ITEM_ATTRIBUTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Attribute\.(\d+)\.(Name|Value|Replace)$").unwrap());

pub fn get<'a>(params: &'a Params, name: &str) -> Option<&'a str> {
    params.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
}

pub fn require<'a>(params: &'a Params, name: &str) -> Result<&'a str, BasicDbError> {
    get(params, name).ok_or_else(|| BasicDbError::MissingParameter { name: name.to_string() })
}

/// Groups every `(key, value)` pair whose key matches `regex` by its
/// captured numeric index, into `index -> {field -> value}`.
fn extract_numbered(params: &Params, regex: &Regex) -> BTreeMap<String, BTreeMap<String, String>> {
    let mut groups: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    for (key, value) in params {
        if let Some(caps) = regex.captures(key) {
            let idx = caps.get(1).unwrap().as_str().to_string();
            let field = caps.get(2).unwrap().as_str().to_string();
            groups.entry(idx).or_default().insert(field, value.clone());
        }
    }
    groups
}

/// Builds the additions/replacements half of a `PutAttributes` (or one
/// item's share of a `BatchPutAttributes`) request from its `Attribute.N.*`
/// parameters.
pub fn build_attribute_map(params: &Params) -> (AttributeMap, AttributeMap) {
    let groups = extract_numbered(params, &ATTRIBUTE_RE);
    let mut additions = AttributeMap::new();
    let mut replacements = AttributeMap::new();
    for fields in groups.values() {
        let (Some(name), Some(value)) = (fields.get("Name"), fields.get("Value")) else {
            continue;
        };
        if fields.get("Replace").map(|v| v == "true").unwrap_or(false) {
            replacements.add_values(name, [value.clone()]);
        } else {
            additions.add_values(name, [value.clone()]);
        }
    }
    (additions, replacements)
}

/// Builds the `Expected.N.*` preconditions for `PutAttributes` /
/// `DeleteAttributes`.
pub fn build_expectations(params: &Params) -> Vec<Expectation> {
    let groups = extract_numbered(params, &EXPECTED_RE);
    let mut expectations = Vec::new();
    for fields in groups.values() {
        let Some(name) = fields.get("Name") else {
            continue;
        };
        if let Some(value) = fields.get("Value") {
            expectations.push(Expectation::Value(name.clone(), value.clone()));
        } else if let Some(exists) = fields.get("Exists") {
            if exists == "false" {
                expectations.push(Expectation::MustNotExist(name.clone()));
            } else {
                expectations.push(Expectation::MustExist(name.clone()));
            }
        } else {
            expectations.push(Expectation::MustExist(name.clone()));
        }
    }
    expectations
}

/// A full `PutAttributes` request: additions, replacements, and
/// preconditions read off the same parameter list.
pub fn build_put_request(params: &Params) -> PutRequest {
    let (additions, replacements) = build_attribute_map(params);
    PutRequest {
        additions,
        replacements,
        expectations: build_expectations(params),
    }
}

/// Builds the `Attribute.N.{Name,Value}` deletions for `DeleteAttributes`.
/// A name with no accompanying value deletes the whole attribute.
pub fn build_deletion_map(params: &Params) -> DeletionMap {
    let groups = extract_numbered(params, &ATTRIBUTE_RE);
    let mut deletions: DeletionMap = DeletionMap::new();
    for fields in groups.values() {
        let Some(name) = fields.get("Name") else {
            continue;
        };
        let deletion = match fields.get("Value") {
            Some(value) => ValueDeletion::Specific(value.clone()),
            None => ValueDeletion::All,
        };
        deletions.entry(name.clone()).or_default().push(deletion);
    }
    deletions
}

/// Splits a flat parameter list into per-item sublists for
/// `BatchPutAttributes`/`BatchDeleteAttributes`, each keyed by the item's
/// `Item.N.ItemName` value and holding that item's own `Attribute.M.*`
/// parameters renumbered as a standalone list (so `build_put_request`/
/// `build_deletion_map` can be reused unchanged per item).
pub fn split_batch_items(params: &Params) -> Vec<(String, Params)> {
    let mut by_index: BTreeMap<u64, (Option<String>, Params)> = BTreeMap::new();
    for (key, value) in params {
        let Some(caps) = ITEM_RE.captures(key) else { continue };
        let idx: u64 = caps.get(1).unwrap().as_str().parse().unwrap_or(0);
        let rest = caps.get(2).unwrap().as_str();
        let entry = by_index.entry(idx).or_insert((None, Vec::new()));
        if rest == "ItemName" {
            entry.0 = Some(value.clone());
        } else if ITEM_ATTRIBUTE_RE.is_match(rest) {
            entry.1.push((rest.to_string(), value.clone()));
        }
    }
    by_index
        .into_values()
        .filter_map(|(name, item_params)| name.map(|n| (n, item_params)))
        .collect()
}
