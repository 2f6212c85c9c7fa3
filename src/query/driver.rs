//! Drives a parsed SELECT over a domain's items: filter, order, dedup,
//! limit, then project.

use crate::error::BasicDbError;
use crate::model::AttributeMap;
use crate::query::eval;
use crate::query::select_parser::{OrderBy, ParsedSelect, Projection};

/// A matched row before projection: the item name plus its full attribute
/// map, so the projection step can pick `*`, a named subset, or nothing (for
/// `count(*)`).
pub type Item = (String, AttributeMap);

/// The final, ordered, limited, projected result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectResult {
    Count(usize),
    Items(Vec<Item>),
}

/// Runs `parsed` against `items` (already scoped to the right owner and
/// domain by the caller). `items` need not be pre-sorted.
pub fn run(parsed: &ParsedSelect, items: Vec<Item>) -> Result<SelectResult, BasicDbError> {
    if let (Some(order_by), Some(where_expr)) = (&parsed.order_by, &parsed.where_expr) {
        validate_sort_key(order_by, where_expr)?;
    } else if let Some(order_by) = &parsed.order_by {
        if order_by.key != "itemName()" {
            return Err(BasicDbError::InvalidSortExpression {
                key: order_by.key.clone(),
            });
        }
    }

    let mut matched = Vec::new();
    for (name, attrs) in items {
        let keep = match &parsed.where_expr {
            Some(expr) => eval::matches(expr, &name, &attrs)?,
            None => true,
        };
        if keep {
            matched.push((name, attrs));
        }
    }

    dedup_by_name(&mut matched);

    if let Some(order_by) = &parsed.order_by {
        matched = sort_by_key(matched, order_by);
    }

    if let Some(limit) = parsed.limit {
        matched.truncate(limit);
    }

    match &parsed.columns {
        Projection::Count => Ok(SelectResult::Count(matched.len())),
        Projection::Star => Ok(SelectResult::Items(matched)),
        Projection::Names(names) => {
            let projected = matched
                .into_iter()
                .map(|(name, attrs)| (name, attrs.project(names)))
                .collect();
            Ok(SelectResult::Items(projected))
        }
    }
}

/// An ORDER BY key must be `itemName()` or appear in the WHERE clause,
/// mirroring the original implementation's restriction (sorting on an
/// attribute SimpleDB never filtered on has no well-defined single value to
/// sort by, since attributes are multi-valued).
fn validate_sort_key(order_by: &OrderBy, where_expr: &crate::query::ast::Expr) -> Result<(), BasicDbError> {
    if order_by.key == "itemName()" {
        return Ok(());
    }
    if where_expr.identifiers().contains(&order_by.key) {
        return Ok(());
    }
    Err(BasicDbError::InvalidSortExpression {
        key: order_by.key.clone(),
    })
}

fn dedup_by_name(items: &mut Vec<Item>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|(name, _)| seen.insert(name.clone()));
}

/// Orders `items` by `order_by.key`. For `itemName()` this is a plain sort.
/// For an attribute key, the attribute is multi-valued, so there's no single
/// value to sort an item by: flatten to one `(value, item_name)` pair per
/// value the item holds, sort those pairs, then deduplicate item names
/// keeping the first occurrence — which is, per direction, the item's most
/// extreme (smallest ascending / largest descending) value.
fn sort_by_key(mut items: Vec<Item>, order_by: &OrderBy) -> Vec<Item> {
    if order_by.key == "itemName()" {
        items.sort_by(|(a, _), (b, _)| {
            let ord = a.cmp(b);
            if order_by.descending { ord.reverse() } else { ord }
        });
        return items;
    }

    let mut pairs: Vec<(&str, &str)> = Vec::new();
    for (name, attrs) in &items {
        match attrs.get(&order_by.key) {
            Some(set) if !set.is_empty() => {
                for v in set.iter() {
                    pairs.push((v.as_str(), name.as_str()));
                }
            }
            _ => pairs.push(("", name.as_str())),
        }
    }

    pairs.sort_by(|(va, na), (vb, nb)| {
        let ord = va.cmp(vb).then_with(|| na.cmp(nb));
        if order_by.descending { ord.reverse() } else { ord }
    });

    let mut seen = std::collections::HashSet::new();
    let mut order: Vec<String> = Vec::new();
    for (_, name) in pairs {
        if seen.insert(name.to_string()) {
            order.push(name.to_string());
        }
    }

    let mut by_name: std::collections::HashMap<String, AttributeMap> = items.into_iter().collect();
    order
        .into_iter()
        .filter_map(|name| by_name.remove(&name).map(|attrs| (name, attrs)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::select_parser;

    fn attrs(pairs: &[(&str, &[&str])]) -> AttributeMap {
        let mut m = AttributeMap::new();
        for (k, v) in pairs {
            m.add_values(k, v.iter().map(|s| s.to_string()));
        }
        m
    }

    #[test]
    fn filters_and_projects_star() {
        let parsed = select_parser::parse("select * from books where Genre = 'Sci-Fi'").unwrap();
        let items = vec![
            ("a".to_string(), attrs(&[("Genre", &["Sci-Fi"])])),
            ("b".to_string(), attrs(&[("Genre", &["Romance"])])),
        ];
        match run(&parsed, items).unwrap() {
            SelectResult::Items(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].0, "a");
            }
            other => panic!("expected Items, got {:?}", other),
        }
    }

    #[test]
    fn count_star_reports_match_count() {
        let parsed = select_parser::parse("select count(*) from books where Genre = 'Sci-Fi'").unwrap();
        let items = vec![
            ("a".to_string(), attrs(&[("Genre", &["Sci-Fi"])])),
            ("b".to_string(), attrs(&[("Genre", &["Sci-Fi"])])),
            ("c".to_string(), attrs(&[("Genre", &["Romance"])])),
        ];
        assert_eq!(run(&parsed, items).unwrap(), SelectResult::Count(2));
    }

    #[test]
    fn order_by_on_unreferenced_attribute_is_rejected() {
        let parsed =
            select_parser::parse("select * from books where Genre = 'Sci-Fi' order by Year").unwrap();
        let items = vec![("a".to_string(), attrs(&[("Genre", &["Sci-Fi"]), ("Year", &["1990"])]))];
        assert!(run(&parsed, items).is_err());
    }

    #[test]
    fn order_by_item_name_always_allowed() {
        let parsed = select_parser::parse("select * from books order by itemName() desc").unwrap();
        let items = vec![
            ("a".to_string(), AttributeMap::new()),
            ("b".to_string(), AttributeMap::new()),
        ];
        match run(&parsed, items).unwrap() {
            SelectResult::Items(rows) => {
                assert_eq!(rows[0].0, "b");
                assert_eq!(rows[1].0, "a");
            }
            other => panic!("expected Items, got {:?}", other),
        }
    }

    #[test]
    fn descending_sort_on_multivalued_attribute_uses_each_items_best_value() {
        // item "a" holds both a low and a high Year value; descending order
        // must rank it by its *highest* value (2020), not by whichever value
        // a naive single-pick would have chosen.
        let parsed =
            select_parser::parse("select * from books where Year is not null order by Year desc").unwrap();
        let items = vec![
            ("a".to_string(), attrs(&[("Year", &["1970", "2020"])])),
            ("b".to_string(), attrs(&[("Year", &["2000"])])),
        ];
        match run(&parsed, items).unwrap() {
            SelectResult::Items(rows) => {
                assert_eq!(rows.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
            }
            other => panic!("expected Items, got {:?}", other),
        }
    }

    #[test]
    fn limit_truncates_after_sort() {
        let parsed =
            select_parser::parse("select * from books order by itemName() asc limit 1").unwrap();
        let items = vec![
            ("b".to_string(), AttributeMap::new()),
            ("a".to_string(), AttributeMap::new()),
        ];
        match run(&parsed, items).unwrap() {
            SelectResult::Items(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].0, "a");
            }
            other => panic!("expected Items, got {:?}", other),
        }
    }
}
