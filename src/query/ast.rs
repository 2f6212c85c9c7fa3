//! The WHERE-expression AST: a tagged enum with a per-variant evaluator,
//! rather than a class hierarchy with virtual dispatch (see the REDESIGN
//! FLAGS in the spec's design notes).

use std::collections::BTreeSet;

/// A comparison operator appearing between a value-producing term and a
/// literal (or a value list, for `IN`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    Is,
    IsNot,
    In,
    Like,
}

/// A node of the parsed WHERE expression (or, for `Literal`/`Identifier`/
/// `ItemName`/`Every`/`ValueList`/`Null`, a value-producing sub-term used as
/// an operand of a comparison).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A single-quoted string literal.
    Literal(String),
    /// A parenthesized comma list of literals, the right side of `IN`.
    ValueList(Vec<String>),
    /// The untyped `NULL` sentinel.
    Null,
    /// A bare or backtick-quoted attribute name.
    Identifier(String),
    /// The `itemName()` pseudo-column.
    ItemName,
    /// `every(attr)`: resolves to the full raw value set for universal
    /// quantification, instead of a single existential binding.
    Every(String),
    /// `count(*)` — a projection marker, never produced by the WHERE-expr
    /// parser; only the result-column parser produces this.
    Count,
    /// `left OP right`.
    Comparison {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `operand BETWEEN lo AND hi` (strict: `lo < operand < hi`).
    Between {
        operand: Box<Expr>,
        lo: Box<Expr>,
        hi: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// Set-semantic AND: each sub-expression is matched independently
    /// against the whole item, not against the same value binding.
    Intersection(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// True if this node is a boolean expression (and thus a legal WHERE
    /// root), as opposed to a bare value-producing term.
    pub fn is_boolean(&self) -> bool {
        matches!(
            self,
            Expr::Comparison { .. }
                | Expr::Between { .. }
                | Expr::And(..)
                | Expr::Or(..)
                | Expr::Not(..)
                | Expr::Intersection(..)
        )
    }

    /// True if this node is a value-producing term (Literal/Identifier/
    /// ValueList/Null/ItemName/Every) rather than a boolean combinator.
    pub fn is_value_term(&self) -> bool {
        !self.is_boolean() && !matches!(self, Expr::Count)
    }

    /// The set of attribute names this expression (transitively) refers to,
    /// used to validate ORDER BY keys and to restrict the Cartesian-product
    /// evaluation in [`crate::query::eval`] to attributes actually
    /// referenced.
    pub fn identifiers(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Identifier(name) | Expr::Every(name) => {
                out.insert(name.clone());
            }
            Expr::Literal(_) | Expr::ValueList(_) | Expr::Null | Expr::ItemName | Expr::Count => {}
            Expr::Comparison { left, right, .. } => {
                left.collect_identifiers(out);
                right.collect_identifiers(out);
            }
            Expr::Between { operand, lo, hi } => {
                operand.collect_identifiers(out);
                lo.collect_identifiers(out);
                hi.collect_identifiers(out);
            }
            Expr::And(a, b) | Expr::Or(a, b) | Expr::Intersection(a, b) => {
                a.collect_identifiers(out);
                b.collect_identifiers(out);
            }
            Expr::Not(a) => a.collect_identifiers(out),
        }
    }
}
