#![forbid(unsafe_code)]

//! Boundary with the external concrete-syntax parser.
//!
//! The parser is a collaborator outside this repository; it hands over a
//! labeled tree with a fixed tag vocabulary (`skip`, `:=`, `;`, `if`,
//! `while`, `assert`, `array_init`, `array_update`, `array_access`, `id`,
//! `num`, `hole`, `num_list` and the binary operator tags). Lowering turns
//! that tree into the typed statement/expression enums; everything after the
//! boundary dispatches on variants, never on tag strings.
//!
//! Node shapes: an `if`/`while` node's first child is the condition and the
//! remaining children are the branches/body; `array_access` is
//! `[id, outer]` or `[id, outer, inner]`; `array_update` is
//! `[id, outer, value]` or `[id, outer, inner, value]`; a `num_list` node
//! holds either expression children (one row) or `num_list` children
//! (nested rows).

use thiserror::Error;

use crate::{BinOp, Expr, HoleId, Rows, Stmt};

#[derive(Clone, Debug, PartialEq)]
pub struct ParseTree {
    pub tag: String,
    pub children: Vec<ParseTree>,
}

impl ParseTree {
    pub fn new(tag: &str, children: Vec<ParseTree>) -> ParseTree {
        ParseTree {
            tag: tag.to_string(),
            children,
        }
    }

    pub fn leaf(tag: &str) -> ParseTree {
        ParseTree::new(tag, Vec::new())
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LowerError {
    #[error("unknown node tag `{0}`")]
    UnknownTag(String),
    #[error("`{0}` cannot appear in statement position")]
    NotAStatement(String),
    #[error("node `{tag}` has {got} children, expected {want}")]
    Arity {
        tag: String,
        got: usize,
        want: &'static str,
    },
    #[error("malformed `{0}` node")]
    Malformed(String),
}

fn arity(tag: &str, got: usize, want: &'static str) -> LowerError {
    LowerError::Arity {
        tag: tag.to_string(),
        got,
        want,
    }
}

fn ident(t: &ParseTree) -> Result<String, LowerError> {
    if t.tag != "id" {
        return Err(LowerError::Malformed("id".to_string()));
    }
    match t.children.as_slice() {
        [name] if name.children.is_empty() => Ok(name.tag.clone()),
        _ => Err(LowerError::Malformed("id".to_string())),
    }
}

fn number(t: &ParseTree) -> Result<i64, LowerError> {
    match t.children.as_slice() {
        [digits] if digits.children.is_empty() => digits
            .tag
            .parse()
            .map_err(|_| LowerError::Malformed("num".to_string())),
        _ => Err(LowerError::Malformed("num".to_string())),
    }
}

pub fn lower_stmt(t: &ParseTree) -> Result<Stmt, LowerError> {
    match t.tag.as_str() {
        "skip" => Ok(Stmt::Skip),
        ":=" => match t.children.as_slice() {
            [target, value] => Ok(Stmt::Assign {
                name: ident(target)?,
                value: lower_expr(value)?,
            }),
            _ => Err(arity(":=", t.children.len(), "2")),
        },
        "array_init" => match t.children.as_slice() {
            [target, list] => Ok(Stmt::ArrayInit {
                name: ident(target)?,
                value: rows(list)?,
            }),
            _ => Err(arity("array_init", t.children.len(), "2")),
        },
        "array_update" => match t.children.as_slice() {
            [target, outer, value] => Ok(Stmt::ArrayUpdate {
                array: ident(target)?,
                outer: lower_expr(outer)?,
                inner: None,
                value: lower_expr(value)?,
            }),
            [target, outer, inner, value] => Ok(Stmt::ArrayUpdate {
                array: ident(target)?,
                outer: lower_expr(outer)?,
                inner: Some(lower_expr(inner)?),
                value: lower_expr(value)?,
            }),
            _ => Err(arity("array_update", t.children.len(), "3 or 4")),
        },
        ";" => match t.children.as_slice() {
            [a, b] => Ok(Stmt::Seq(
                Box::new(lower_stmt(a)?),
                Box::new(lower_stmt(b)?),
            )),
            _ => Err(arity(";", t.children.len(), "2")),
        },
        "if" => match t.children.as_slice() {
            [cond, then_branch, else_branch] => Ok(Stmt::If {
                cond: lower_expr(cond)?,
                then_branch: Box::new(lower_stmt(then_branch)?),
                else_branch: Box::new(lower_stmt(else_branch)?),
            }),
            _ => Err(arity("if", t.children.len(), "3")),
        },
        "while" => match t.children.as_slice() {
            [cond, body] => Ok(Stmt::While {
                cond: lower_expr(cond)?,
                body: Box::new(lower_stmt(body)?),
            }),
            _ => Err(arity("while", t.children.len(), "2")),
        },
        "assert" => match t.children.as_slice() {
            [e] => Ok(Stmt::Assert(lower_expr(e)?)),
            _ => Err(arity("assert", t.children.len(), "1")),
        },
        tag if tag == "hole" || tag == "id" || tag == "num" || tag == "num_list" => {
            Err(LowerError::NotAStatement(tag.to_string()))
        }
        tag if BinOp::from_tag(tag).is_some() => Err(LowerError::NotAStatement(tag.to_string())),
        other => Err(LowerError::UnknownTag(other.to_string())),
    }
}

pub fn lower_expr(t: &ParseTree) -> Result<Expr, LowerError> {
    if let Some(op) = BinOp::from_tag(&t.tag) {
        return match t.children.as_slice() {
            [lhs, rhs] => Ok(Expr::bin(op, lower_expr(lhs)?, lower_expr(rhs)?)),
            _ => Err(arity(&t.tag, t.children.len(), "2")),
        };
    }
    match t.tag.as_str() {
        "num" => Ok(Expr::Literal(number(t)?)),
        "id" => Ok(Expr::Variable(ident(t)?)),
        "hole" => {
            if t.children.is_empty() {
                Ok(Expr::Hole(HoleId::default()))
            } else {
                Err(arity("hole", t.children.len(), "0"))
            }
        }
        "num_list" => Ok(Expr::ArrayLiteral(rows(t)?)),
        "array_access" => match t.children.as_slice() {
            [target, outer] => Ok(Expr::ArrayAccess {
                array: ident(target)?,
                outer: Box::new(lower_expr(outer)?),
                inner: None,
            }),
            [target, outer, inner] => Ok(Expr::ArrayAccess {
                array: ident(target)?,
                outer: Box::new(lower_expr(outer)?),
                inner: Some(Box::new(lower_expr(inner)?)),
            }),
            _ => Err(arity("array_access", t.children.len(), "2 or 3")),
        },
        other => Err(LowerError::UnknownTag(other.to_string())),
    }
}

fn rows(t: &ParseTree) -> Result<Rows, LowerError> {
    if t.tag != "num_list" {
        return Err(LowerError::Malformed("num_list".to_string()));
    }
    let nested = t.children.iter().any(|c| c.tag == "num_list");
    if nested {
        let mut out = Vec::with_capacity(t.children.len());
        for child in &t.children {
            if child.tag != "num_list" {
                return Err(LowerError::Malformed("num_list".to_string()));
            }
            let row = child
                .children
                .iter()
                .map(lower_expr)
                .collect::<Result<Vec<_>, _>>()?;
            out.push(row);
        }
        Ok(Rows::Nested(out))
    } else {
        let items = t
            .children
            .iter()
            .map(lower_expr)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Rows::Flat(items))
    }
}
