//! Precedence-climbing parser for the WHERE expression grammar (spec §4.2):
//!
//! ```text
//! INTERSECTION  binary, left-assoc   (loosest)
//! AND           binary, left-assoc
//! OR            binary, left-assoc
//! BETWEEN/AND   ternary
//! =, ==, !=, <>, IS, IS NOT, IN, LIKE   binary
//! <, <=, >, >=                          binary
//! NOT           unary, right-assoc   (tightest)
//! ```
//!
//! Each precedence level is its own parse function that calls the next
//! tighter level for its operands, in the usual recursive-descent style.

use crate::error::BasicDbError;
use crate::query::ast::{CompareOp, Expr};
use crate::query::lexer::Token;

const KEYWORDS: &[&str] = &[
    "SELECT",
    "FROM",
    "WHERE",
    "AND",
    "OR",
    "NOT",
    "BETWEEN",
    "IS",
    "IN",
    "LIKE",
    "NULL",
    "ORDER",
    "BY",
    "ASC",
    "DESC",
    "LIMIT",
    "INTERSECTION",
];

fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

pub struct ExprParser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> ExprParser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        ExprParser { tokens, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Repositions the cursor, for callers (the SELECT statement parser)
    /// that interleave their own token consumption with WHERE-expression
    /// parsing over the same token stream.
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn peek_token(&self) -> &Token {
        self.peek()
    }

    pub fn advance_token(&mut self) -> Token {
        self.advance()
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if !matches!(tok, Token::Eof) {
            self.pos += 1;
        }
        tok
    }

    fn word_matches(&self, kw: &str) -> bool {
        matches!(self.peek(), Token::Word(w) if w.eq_ignore_ascii_case(kw))
    }

    fn eat_word(&mut self, kw: &str) -> bool {
        if self.word_matches(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_word(&mut self, kw: &str) -> Result<(), BasicDbError> {
        if self.eat_word(kw) {
            Ok(())
        } else {
            Err(BasicDbError::InvalidQueryExpression {
                message: format!("expected {:?}", kw),
            })
        }
    }

    /// Parses a full WHERE expression and validates that its root is
    /// boolean, per the "bare operand at WHERE root is rejected" rule.
    pub fn parse_where_expr(&mut self) -> Result<Expr, BasicDbError> {
        let expr = self.parse_intersection()?;
        if !expr.is_boolean() {
            return Err(BasicDbError::InvalidQueryExpression {
                message: "WHERE expression must be boolean".to_string(),
            });
        }
        Ok(expr)
    }

    fn parse_intersection(&mut self) -> Result<Expr, BasicDbError> {
        let mut left = self.parse_and()?;
        while self.eat_word("INTERSECTION") {
            let right = self.parse_and()?;
            left = Expr::Intersection(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, BasicDbError> {
        let mut left = self.parse_or()?;
        while self.eat_word("AND") {
            let right = self.parse_or()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr, BasicDbError> {
        let mut left = self.parse_between()?;
        while self.eat_word("OR") {
            let right = self.parse_between()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_between(&mut self) -> Result<Expr, BasicDbError> {
        let operand = self.parse_comparison()?;
        if self.eat_word("BETWEEN") {
            let lo = self.parse_comparison()?;
            self.expect_word("AND")?;
            let hi = self.parse_comparison()?;
            reject_same_shape(&operand, &lo)?;
            return Ok(Expr::Between {
                operand: Box::new(operand),
                lo: Box::new(lo),
                hi: Box::new(hi),
            });
        }
        Ok(operand)
    }

    fn parse_comparison(&mut self) -> Result<Expr, BasicDbError> {
        let left = self.parse_relational()?;

        if self.word_matches("IS") {
            self.advance();
            let is_not = self.eat_word("NOT");
            let right = self.parse_relational()?;
            reject_same_shape(&left, &right)?;
            let op = if is_not { CompareOp::IsNot } else { CompareOp::Is };
            return Ok(Expr::Comparison {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        if self.word_matches("IN") {
            self.advance();
            let right = self.parse_relational()?;
            reject_same_shape(&left, &right)?;
            return Ok(Expr::Comparison {
                op: CompareOp::In,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        if self.word_matches("LIKE") {
            self.advance();
            let right = self.parse_relational()?;
            reject_same_shape(&left, &right)?;
            return Ok(Expr::Comparison {
                op: CompareOp::Like,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        if let Token::Op(op) = self.peek().clone() {
            if let Some(compare_op) = match op.as_str() {
                "=" | "==" => Some(CompareOp::Eq),
                "!=" | "<>" => Some(CompareOp::NotEq),
                _ => None,
            } {
                self.advance();
                let right = self.parse_relational()?;
                reject_same_shape(&left, &right)?;
                return Ok(Expr::Comparison {
                    op: compare_op,
                    left: Box::new(left),
                    right: Box::new(right),
                });
            }
        }

        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, BasicDbError> {
        let left = self.parse_not()?;

        if let Token::Op(op) = self.peek().clone() {
            let compare_op = match op.as_str() {
                "<" => Some(CompareOp::Lt),
                "<=" => Some(CompareOp::Lte),
                ">" => Some(CompareOp::Gt),
                ">=" => Some(CompareOp::Gte),
                _ => None,
            };
            if let Some(compare_op) = compare_op {
                self.advance();
                let right = self.parse_not()?;
                reject_same_shape(&left, &right)?;
                return Ok(Expr::Comparison {
                    op: compare_op,
                    left: Box::new(left),
                    right: Box::new(right),
                });
            }
        }

        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, BasicDbError> {
        if self.eat_word("NOT") {
            let operand = self.parse_not()?;
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, BasicDbError> {
        match self.advance() {
            Token::Str(s) => Ok(Expr::Literal(s)),
            Token::QuotedIdent(name) => self.maybe_call(name),
            Token::Word(word) => {
                if word.eq_ignore_ascii_case("NULL") {
                    return Ok(Expr::Null);
                }
                self.maybe_call(word)
            }
            Token::LParen => {
                let values = self.parse_value_list_tail()?;
                Ok(Expr::ValueList(values))
            }
            other => Err(BasicDbError::InvalidQueryExpression {
                message: format!("unexpected token {:?}", other),
            }),
        }
    }

    /// Having consumed a bare word or quoted identifier, decides whether
    /// it's a plain identifier or a function-call form (`every(x)`,
    /// `itemName()`, or an unsupported function name).
    fn maybe_call(&mut self, name: String) -> Result<Expr, BasicDbError> {
        if !matches!(self.peek(), Token::LParen) {
            return Ok(Expr::Identifier(name));
        }
        self.advance(); // consume '('

        if name.eq_ignore_ascii_case("itemName") {
            self.expect_rparen()?;
            return Ok(Expr::ItemName);
        }
        if name.eq_ignore_ascii_case("every") {
            let arg = self.parse_identifier_arg()?;
            self.expect_rparen()?;
            return Ok(Expr::Every(arg));
        }

        Err(BasicDbError::InvalidQueryExpression {
            message: format!("unsupported function {:?} in WHERE expression", name),
        })
    }

    fn parse_identifier_arg(&mut self) -> Result<String, BasicDbError> {
        match self.advance() {
            Token::Word(w) if !is_keyword(&w) => Ok(w),
            Token::QuotedIdent(w) => Ok(w),
            other => Err(BasicDbError::InvalidQueryExpression {
                message: format!("expected identifier argument, found {:?}", other),
            }),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), BasicDbError> {
        if matches!(self.peek(), Token::RParen) {
            self.advance();
            Ok(())
        } else {
            Err(BasicDbError::InvalidQueryExpression {
                message: "expected )".to_string(),
            })
        }
    }

    /// Parses the remainder of `(v1, v2, ...)` after the opening paren has
    /// already been consumed.
    fn parse_value_list_tail(&mut self) -> Result<Vec<String>, BasicDbError> {
        let mut values = Vec::new();
        if matches!(self.peek(), Token::RParen) {
            self.advance();
            return Ok(values);
        }
        loop {
            match self.advance() {
                Token::Str(s) => values.push(s),
                other => {
                    return Err(BasicDbError::InvalidQueryExpression {
                        message: format!("expected string literal in value list, found {:?}", other),
                    })
                }
            }
            match self.advance() {
                Token::Comma => continue,
                Token::RParen => break,
                other => {
                    return Err(BasicDbError::InvalidQueryExpression {
                        message: format!("expected , or ) in value list, found {:?}", other),
                    })
                }
            }
        }
        Ok(values)
    }
}

/// Rejects comparisons between two literals or between two identifiers: the
/// operator must be literal-vs-identifier (in some order). `ValueList`/
/// `ItemName`/`Every` count on the "identifier side" of this check since
/// they resolve to a value drawn from the item, not a fixed literal; `Null`
/// counts as a literal so `x IS NOT NULL` is legal.
fn reject_same_shape(left: &Expr, right: &Expr) -> Result<(), BasicDbError> {
    let is_literal_like = |e: &Expr| matches!(e, Expr::Literal(_) | Expr::Null);
    let is_ident_like = |e: &Expr| {
        matches!(
            e,
            Expr::Identifier(_) | Expr::ItemName | Expr::Every(_) | Expr::ValueList(_)
        )
    };

    if is_literal_like(left) && is_literal_like(right) {
        return Err(BasicDbError::InvalidQueryExpression {
            message: "cannot compare two literals".to_string(),
        });
    }
    if is_ident_like(left) && is_ident_like(right) {
        return Err(BasicDbError::InvalidQueryExpression {
            message: "cannot compare two identifiers".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::lexer::Lexer;

    fn parse(src: &str) -> Result<Expr, BasicDbError> {
        let tokens = Lexer::tokenize(src)?;
        let mut parser = ExprParser::new(&tokens);
        parser.parse_where_expr()
    }

    #[test]
    fn parses_simple_equality() {
        let expr = parse("Title = 'The Right Stuff'").unwrap();
        assert!(matches!(expr, Expr::Comparison { op: CompareOp::Eq, .. }));
    }

    #[test]
    fn rejects_two_identifiers() {
        assert!(parse("a = b").is_err());
    }

    #[test]
    fn rejects_two_literals() {
        assert!(parse("'a' = 'b'").is_err());
    }

    #[test]
    fn rejects_bare_identifier_root() {
        assert!(parse("a").is_err());
    }

    #[test]
    fn parses_between() {
        let expr = parse("Year BETWEEN '1975' AND '2008'").unwrap();
        assert!(matches!(expr, Expr::Between { .. }));
    }

    #[test]
    fn parses_every_in() {
        let expr = parse("every(Keyword) IN ('Book', 'Paperback')").unwrap();
        match expr {
            Expr::Comparison { op: CompareOp::In, left, right } => {
                assert!(matches!(*left, Expr::Every(ref s) if s == "Keyword"));
                assert!(matches!(*right, Expr::ValueList(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parses_intersection() {
        let expr = parse("Keyword = 'Book' intersection Keyword = 'Hardcover'").unwrap();
        assert!(matches!(expr, Expr::Intersection(..)));
    }

    #[test]
    fn parses_is_not_null() {
        let expr = parse("Author is not null").unwrap();
        assert!(matches!(expr, Expr::Comparison { op: CompareOp::IsNot, .. }));
    }
}
