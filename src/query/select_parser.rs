//! Top-level `SELECT ... FROM ... [WHERE ...] [ORDER BY ...] [LIMIT ...]`
//! parser, built on top of [`crate::query::expr_parser`].

use crate::error::BasicDbError;
use crate::query::ast::Expr;
use crate::query::expr_parser::ExprParser;
use crate::query::lexer::{Lexer, Token};

/// What a SELECT projects: every attribute, a synthetic `count` column, or
/// a specific list of attribute names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Star,
    Count,
    Names(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub key: String,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSelect {
    pub columns: Projection,
    pub table: String,
    pub where_expr: Option<Expr>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

pub fn parse(src: &str) -> Result<ParsedSelect, BasicDbError> {
    let tokens = Lexer::tokenize(src)?;
    let mut p = ExprParser::new(&tokens);
    let parsed = parse_select_stmt(&mut p)?;
    if !matches!(p.peek_token(), Token::Eof) {
        return Err(BasicDbError::InvalidQueryExpression {
            message: "trailing input after SELECT statement".to_string(),
        });
    }
    Ok(parsed)
}

fn peek<'a>(p: &'a ExprParser) -> &'a Token {
    p.peek_token()
}

fn advance(p: &mut ExprParser) -> Token {
    p.advance_token()
}

fn word_matches(p: &ExprParser, kw: &str) -> bool {
    matches!(peek(p), Token::Word(w) if w.eq_ignore_ascii_case(kw))
}

fn eat_word(p: &mut ExprParser, kw: &str) -> bool {
    if word_matches(p, kw) {
        advance(p);
        true
    } else {
        false
    }
}

fn expect_word(p: &mut ExprParser, kw: &str) -> Result<(), BasicDbError> {
    if eat_word(p, kw) {
        Ok(())
    } else {
        Err(BasicDbError::InvalidQueryExpression {
            message: format!("expected {:?}", kw),
        })
    }
}

fn parse_select_stmt(p: &mut ExprParser) -> Result<ParsedSelect, BasicDbError> {
    expect_word(p, "SELECT")?;
    let columns = parse_result_column(p)?;
    expect_word(p, "FROM")?;
    let table = parse_table_name(p)?;

    let where_expr = if eat_word(p, "WHERE") {
        Some(p.parse_where_expr()?)
    } else {
        None
    };

    let order_by = if eat_word(p, "ORDER") {
        expect_word(p, "BY")?;
        let key = parse_order_key(p)?;
        let descending = if eat_word(p, "DESC") {
            true
        } else {
            eat_word(p, "ASC");
            false
        };
        Some(OrderBy { key, descending })
    } else {
        None
    };

    let limit = if eat_word(p, "LIMIT") {
        match advance(p) {
            Token::Int(n) if n >= 0 => Some(n as usize),
            other => {
                return Err(BasicDbError::InvalidQueryExpression {
                    message: format!("expected integer after LIMIT, found {:?}", other),
                })
            }
        }
    } else {
        None
    };

    Ok(ParsedSelect {
        columns,
        table,
        where_expr,
        order_by,
        limit,
    })
}

fn parse_result_column(p: &mut ExprParser) -> Result<Projection, BasicDbError> {
    if matches!(peek(p), Token::Star) {
        advance(p);
        return Ok(Projection::Star);
    }

    if word_matches(p, "count") {
        // Distinguish `count(*)` from a genuine attribute named `count`
        // followed by something else: only consume as Count when the very
        // next tokens are `( * )`.
        let save = p.pos();
        advance(p);
        if matches!(peek(p), Token::LParen) {
            advance(p);
            if matches!(peek(p), Token::Star) {
                advance(p);
                if matches!(peek(p), Token::RParen) {
                    advance(p);
                    return Ok(Projection::Count);
                }
            }
        }
        p.set_pos(save);
    }

    let mut names = Vec::new();
    loop {
        names.push(parse_column_ident(p)?);
        if matches!(peek(p), Token::Comma) {
            advance(p);
            continue;
        }
        break;
    }
    Ok(Projection::Names(names))
}

fn parse_column_ident(p: &mut ExprParser) -> Result<String, BasicDbError> {
    match advance(p) {
        Token::Word(w) => {
            if w.eq_ignore_ascii_case("itemName") && matches!(peek(p), Token::LParen) {
                advance(p);
                if !matches!(peek(p), Token::RParen) {
                    return Err(BasicDbError::InvalidQueryExpression {
                        message: "expected ) after itemName(".to_string(),
                    });
                }
                advance(p);
                return Ok("itemName()".to_string());
            }
            Ok(w)
        }
        Token::QuotedIdent(w) => Ok(w),
        other => Err(BasicDbError::InvalidQueryExpression {
            message: format!("expected column name, found {:?}", other),
        }),
    }
}

fn parse_table_name(p: &mut ExprParser) -> Result<String, BasicDbError> {
    match advance(p) {
        Token::Word(w) => Ok(w),
        Token::QuotedIdent(w) => Ok(w),
        other => Err(BasicDbError::InvalidQueryExpression {
            message: format!("expected table name, found {:?}", other),
        }),
    }
}

fn parse_order_key(p: &mut ExprParser) -> Result<String, BasicDbError> {
    if word_matches(p, "itemName") {
        advance(p);
        if matches!(peek(p), Token::LParen) {
            advance(p);
            if !matches!(peek(p), Token::RParen) {
                return Err(BasicDbError::InvalidQueryExpression {
                    message: "expected ) after itemName(".to_string(),
                });
            }
            advance(p);
        }
        return Ok("itemName()".to_string());
    }
    match advance(p) {
        Token::Word(w) => Ok(w),
        Token::QuotedIdent(w) => Ok(w),
        other => Err(BasicDbError::InvalidQueryExpression {
            message: format!("expected ORDER BY key, found {:?}", other),
        }),
    }
}
