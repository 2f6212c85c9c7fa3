//! Evaluates a parsed WHERE expression against one item's attributes.
//!
//! Attributes are multi-valued, so a bare identifier doesn't name a single
//! value: `Actor = 'Harrison Ford' AND Actor = 'Carrie Fisher'` is false even
//! for an item whose `Actor` attribute holds both names, because `AND`
//! shares one binding of `Actor` across both operands and no single value
//! equals both literals at once — only `INTERSECTION`, which checks each
//! side against its own independent binding, matches that item. We model
//! the shared-binding search as an existential search over a binding of each
//! referenced identifier to one candidate value, restricted to the
//! identifiers actually mentioned in the clause being evaluated (a Cartesian
//! product, not a global scan) rather than as a mutable global "current
//! value" the way the original lookup function worked. `every(attr)` opts
//! out of this binding search entirely and resolves to the whole raw value
//! set, for universal quantification.
//!
//! `INTERSECTION` is handled separately from `AND`: each side gets its own
//! independent binding search, rather than sharing one binding across both
//! sides the way `AND` does.

use std::collections::{BTreeSet, HashMap};

use regex::Regex;

use crate::error::BasicDbError;
use crate::model::AttributeMap;
use crate::query::ast::{CompareOp, Expr};

/// Evaluates `expr` against one item. `item_name` backs the `itemName()`
/// pseudo-column.
pub fn matches(expr: &Expr, item_name: &str, attrs: &AttributeMap) -> Result<bool, BasicDbError> {
    evaluate_clause(expr, item_name, attrs)
}

fn evaluate_clause(expr: &Expr, item_name: &str, attrs: &AttributeMap) -> Result<bool, BasicDbError> {
    if let Expr::Intersection(a, b) = expr {
        return Ok(evaluate_clause(a, item_name, attrs)? && evaluate_clause(b, item_name, attrs)?);
    }

    let mut idents = BTreeSet::new();
    collect_bound_identifiers(expr, &mut idents);
    let idents: Vec<String> = idents.into_iter().collect();

    if idents.is_empty() {
        return eval_bool(expr, item_name, attrs, &HashMap::new());
    }

    let candidate_lists: Vec<Vec<Option<String>>> = idents
        .iter()
        .map(|name| match attrs.get(name) {
            Some(set) if !set.is_empty() => set.iter().cloned().map(Some).collect(),
            _ => vec![None],
        })
        .collect();

    for combo in CartesianProduct::new(&candidate_lists) {
        let mut bindings = HashMap::new();
        for (name, value) in idents.iter().zip(combo.iter()) {
            if let Some(v) = value {
                bindings.insert(name.clone(), v.clone());
            }
        }
        if eval_bool(expr, item_name, attrs, &bindings)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn collect_bound_identifiers(expr: &Expr, out: &mut BTreeSet<String>) {
    match expr {
        Expr::Identifier(name) => {
            out.insert(name.clone());
        }
        Expr::Every(_) | Expr::Literal(_) | Expr::ValueList(_) | Expr::Null | Expr::ItemName | Expr::Count => {}
        Expr::Comparison { left, right, .. } => {
            collect_bound_identifiers(left, out);
            collect_bound_identifiers(right, out);
        }
        Expr::Between { operand, lo, hi } => {
            collect_bound_identifiers(operand, out);
            collect_bound_identifiers(lo, out);
            collect_bound_identifiers(hi, out);
        }
        Expr::And(a, b) | Expr::Or(a, b) | Expr::Intersection(a, b) => {
            collect_bound_identifiers(a, out);
            collect_bound_identifiers(b, out);
        }
        Expr::Not(a) => collect_bound_identifiers(a, out),
    }
}

fn eval_bool(
    expr: &Expr,
    item_name: &str,
    attrs: &AttributeMap,
    bindings: &HashMap<String, String>,
) -> Result<bool, BasicDbError> {
    match expr {
        Expr::And(a, b) => Ok(eval_bool(a, item_name, attrs, bindings)? && eval_bool(b, item_name, attrs, bindings)?),
        Expr::Or(a, b) => Ok(eval_bool(a, item_name, attrs, bindings)? || eval_bool(b, item_name, attrs, bindings)?),
        Expr::Not(a) => Ok(!eval_bool(a, item_name, attrs, bindings)?),
        Expr::Intersection(a, b) => {
            Ok(evaluate_clause(a, item_name, attrs)? && evaluate_clause(b, item_name, attrs)?)
        }
        Expr::Between { operand, lo, hi } => eval_between(operand, lo, hi, item_name, attrs, bindings),
        Expr::Comparison { op, left, right } => eval_comparison(*op, left, right, item_name, attrs, bindings),
        other => Err(BasicDbError::Internal {
            message: format!("{:?} is not a boolean expression", other),
        }),
    }
}

/// A resolved operand: a single (possibly absent) value, an explicit list
/// (the right side of `IN`), or the full raw set of an `every(attr)` term.
enum Operand {
    Scalar(Option<String>),
    List(Vec<String>),
    Universal(Vec<String>),
}

fn resolve(expr: &Expr, item_name: &str, attrs: &AttributeMap, bindings: &HashMap<String, String>) -> Operand {
    match expr {
        Expr::Literal(s) => Operand::Scalar(Some(s.clone())),
        Expr::Null => Operand::Scalar(None),
        Expr::Identifier(name) => Operand::Scalar(bindings.get(name).cloned()),
        Expr::ItemName => Operand::Scalar(Some(item_name.to_string())),
        Expr::Every(name) => Operand::Universal(
            attrs.get(name).map(|set| set.iter().cloned().collect()).unwrap_or_default(),
        ),
        Expr::ValueList(values) => Operand::List(values.clone()),
        other => {
            debug_assert!(false, "{:?} is not a value-producing term", other);
            Operand::Scalar(None)
        }
    }
}

fn eval_comparison(
    op: CompareOp,
    left_expr: &Expr,
    right_expr: &Expr,
    item_name: &str,
    attrs: &AttributeMap,
    bindings: &HashMap<String, String>,
) -> Result<bool, BasicDbError> {
    // `IN` is specified as universal over the left attribute's full value
    // set even without an explicit `every()` wrapper — a deliberate
    // divergence from the source implementation's plain existential
    // membership test, called out explicitly: the test passes iff every
    // value the attribute holds equals some listed literal.
    if op == CompareOp::In {
        let values = match left_expr {
            Expr::Identifier(name) | Expr::Every(name) => attrs
                .get(name)
                .map(|set| set.iter().cloned().collect::<Vec<_>>())
                .unwrap_or_default(),
            Expr::ItemName => vec![item_name.to_string()],
            Expr::Literal(s) => vec![s.clone()],
            _ => Vec::new(),
        };
        if values.is_empty() {
            return Ok(false);
        }
        let list = match resolve(right_expr, item_name, attrs, bindings) {
            Operand::List(values) => values,
            _ => return Ok(false),
        };
        return Ok(values.iter().all(|v| list.contains(v)));
    }

    let left = resolve(left_expr, item_name, attrs, bindings);
    let right = resolve(right_expr, item_name, attrs, bindings);

    match (&left, &right) {
        (Operand::Universal(values), other) => {
            if values.is_empty() {
                return Ok(false);
            }
            for v in values {
                if !compare_scalar_against(op, v, other)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (other, Operand::Universal(values)) => {
            if values.is_empty() {
                return Ok(false);
            }
            for v in values {
                if !compare_scalar_against(flip(op), v, other)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        _ => compare_pair(op, &left, &right),
    }
}

/// Swaps operand order for operators where `a OP b` equivalence under
/// swap requires flipping the relational direction.
fn flip(op: CompareOp) -> CompareOp {
    match op {
        CompareOp::Lt => CompareOp::Gt,
        CompareOp::Gt => CompareOp::Lt,
        CompareOp::Lte => CompareOp::Gte,
        CompareOp::Gte => CompareOp::Lte,
        other => other,
    }
}

fn compare_pair(op: CompareOp, left: &Operand, right: &Operand) -> Result<bool, BasicDbError> {
    match op {
        // `In` is resolved directly in `eval_comparison` (it needs the raw
        // attribute set, not a bound scalar) and never reaches here.
        CompareOp::In => Ok(false),
        CompareOp::Like => {
            let (value, pattern) = match (left, right) {
                (Operand::Scalar(Some(v)), Operand::Scalar(Some(p))) => (v, p),
                _ => return Ok(false),
            };
            Ok(like_regex(pattern)?.is_match(value))
        }
        CompareOp::Is | CompareOp::IsNot => {
            let eq = match (left, right) {
                (Operand::Scalar(a), Operand::Scalar(b)) => a == b,
                _ => false,
            };
            Ok(if op == CompareOp::Is { eq } else { !eq })
        }
        CompareOp::Eq | CompareOp::NotEq | CompareOp::Lt | CompareOp::Lte | CompareOp::Gt | CompareOp::Gte => {
            let (a, b) = match (left, right) {
                (Operand::Scalar(Some(a)), Operand::Scalar(Some(b))) => (a, b),
                _ => return Ok(false),
            };
            Ok(compare_strings(op, a, b))
        }
    }
}

/// Compares a single concrete value (drawn from an `every(attr)` set)
/// against the other, already-resolved side of a comparison.
fn compare_scalar_against(op: CompareOp, value: &str, other: &Operand) -> Result<bool, BasicDbError> {
    compare_pair(op, &Operand::Scalar(Some(value.to_string())), other)
}

fn compare_strings(op: CompareOp, a: &str, b: &str) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::NotEq => a != b,
        CompareOp::Lt => a < b,
        CompareOp::Lte => a <= b,
        CompareOp::Gt => a > b,
        CompareOp::Gte => a >= b,
        CompareOp::Is => a == b,
        CompareOp::IsNot => a != b,
        CompareOp::In | CompareOp::Like => false,
    }
}

fn eval_between(
    operand: &Expr,
    lo: &Expr,
    hi: &Expr,
    item_name: &str,
    attrs: &AttributeMap,
    bindings: &HashMap<String, String>,
) -> Result<bool, BasicDbError> {
    let operand = resolve(operand, item_name, attrs, bindings);
    let lo = resolve(lo, item_name, attrs, bindings);
    let hi = resolve(hi, item_name, attrs, bindings);
    let (v, l, h) = match (&operand, &lo, &hi) {
        (Operand::Scalar(Some(v)), Operand::Scalar(Some(l)), Operand::Scalar(Some(h))) => (v, l, h),
        _ => return Ok(false),
    };
    Ok(l.as_str() < v.as_str() && v.as_str() < h.as_str())
}

/// Translates a LIKE pattern to an anchored regex: `%` becomes `.*`, `_`
/// becomes `.`, a literal `*` is escaped (it has no special meaning in
/// BasicDB's LIKE dialect), and every other character is escaped verbatim.
fn like_regex(pattern: &str) -> Result<Regex, BasicDbError> {
    let mut re = String::from("^");
    for c in pattern.chars() {
        match c {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            '*' => re.push_str("\\*"),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).map_err(|e| BasicDbError::InvalidQueryExpression {
        message: format!("invalid LIKE pattern {:?}: {e}", pattern),
    })
}

/// Lazily materializes the Cartesian product of a list of candidate lists.
struct CartesianProduct<'a> {
    lists: &'a [Vec<Option<String>>],
    indices: Vec<usize>,
    done: bool,
}

impl<'a> CartesianProduct<'a> {
    fn new(lists: &'a [Vec<Option<String>>]) -> Self {
        let done = lists.iter().any(|l| l.is_empty());
        CartesianProduct {
            lists,
            indices: vec![0; lists.len()],
            done,
        }
    }
}

impl<'a> Iterator for CartesianProduct<'a> {
    type Item = Vec<Option<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item: Vec<Option<String>> = self
            .indices
            .iter()
            .zip(self.lists.iter())
            .map(|(&i, list)| list[i].clone())
            .collect();

        let mut carry = self.lists.len();
        loop {
            if carry == 0 {
                self.done = true;
                break;
            }
            carry -= 1;
            self.indices[carry] += 1;
            if self.indices[carry] < self.lists[carry].len() {
                break;
            }
            self.indices[carry] = 0;
            if carry == 0 {
                self.done = true;
                break;
            }
        }
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValueDeletion;
    use crate::query::select_parser as sp;

    fn attrs_from(pairs: &[(&str, &[&str])]) -> AttributeMap {
        let mut m = AttributeMap::new();
        for (k, values) in pairs {
            m.add_values(k, values.iter().map(|v| v.to_string()));
        }
        m
    }

    fn parse_where(src: &str) -> Expr {
        let full = format!("select * from t where {}", src);
        sp::parse(&full).unwrap().where_expr.unwrap()
    }

    #[test]
    fn simple_equality_matches_any_value() {
        let attrs = attrs_from(&[("Genre", &["Pop", "Rock"])]);
        let expr = parse_where("Genre = 'Rock'");
        assert!(matches(&expr, "item1", &attrs).unwrap());
    }

    #[test]
    fn and_shares_one_binding_so_two_literals_never_both_match() {
        let attrs = attrs_from(&[("Actor", &["Harrison Ford", "Carrie Fisher"])]);
        let expr = parse_where("Actor = 'Harrison Ford' AND Actor = 'Carrie Fisher'");
        assert!(!matches(&expr, "item1", &attrs).unwrap());

        let attrs_missing_one = attrs_from(&[("Actor", &["Harrison Ford"])]);
        assert!(!matches(&expr, "item1", &attrs_missing_one).unwrap());
    }

    #[test]
    fn intersection_checks_each_side_independently() {
        let attrs = attrs_from(&[("Keyword", &["Book", "Hardcover"])]);
        let expr = parse_where("Keyword = 'Book' intersection Keyword = 'Hardcover'");
        assert!(matches(&expr, "item1", &attrs).unwrap());
    }

    #[test]
    fn bare_in_is_universal_without_every() {
        // `attr IN (...)` is already universal over the attribute's value
        // set even without an explicit `every()` wrapper.
        let attrs = attrs_from(&[("Keyword", &["Book", "Hardcover"])]);
        let expr = parse_where("Keyword IN ('Book', 'Hardcover')");
        assert!(matches(&expr, "item1", &attrs).unwrap());

        let mixed = attrs_from(&[("Keyword", &["Book", "Paperback"])]);
        assert!(!matches(&expr, "item1", &mixed).unwrap());
    }

    #[test]
    fn every_requires_all_values_to_satisfy() {
        let attrs = attrs_from(&[("Keyword", &["Book", "Hardcover"])]);
        let expr = parse_where("every(Keyword) IN ('Book', 'Hardcover')");
        assert!(matches(&expr, "item1", &attrs).unwrap());

        let attrs2 = attrs_from(&[("Keyword", &["Book", "Paperback"])]);
        assert!(!matches(&expr, "item1", &attrs2).unwrap());
    }

    #[test]
    fn is_not_null_true_only_when_attribute_present() {
        let expr = parse_where("Author is not null");
        let present = attrs_from(&[("Author", &["Douglas Adams"])]);
        assert!(matches(&expr, "item1", &present).unwrap());

        let mut absent = AttributeMap::new();
        absent.add_values("Author", ["x".to_string()]);
        absent.delete_values("Author", [ValueDeletion::All]);
        assert!(!matches(&expr, "item1", &absent).unwrap());
    }

    #[test]
    fn between_is_strict() {
        let attrs = attrs_from(&[("Year", &["1990"])]);
        let expr = parse_where("Year BETWEEN '1975' AND '2008'");
        assert!(matches(&expr, "item1", &attrs).unwrap());

        let edge = attrs_from(&[("Year", &["1975"])]);
        assert!(!matches(&expr, "item1", &edge).unwrap());
    }

    #[test]
    fn like_translates_percent_and_underscore() {
        let attrs = attrs_from(&[("Title", &["The Right Stuff"])]);
        let expr = parse_where("Title LIKE 'The Right%'");
        assert!(matches(&expr, "item1", &attrs).unwrap());

        let expr2 = parse_where("Title LIKE 'The _ight Stuff'");
        assert!(matches(&expr2, "item1", &attrs).unwrap());
    }

    #[test]
    fn item_name_resolves_to_the_item_identifier() {
        let attrs = AttributeMap::new();
        let expr = parse_where("itemName() = 'B000A2KE5S'");
        assert!(matches(&expr, "B000A2KE5S", &attrs).unwrap());
    }
}
