#![forbid(unsafe_code)]

//! Hole discovery, numbering, and filling.
//!
//! Discovery rebuilds the tree with fresh session-scoped identifiers in a
//! fixed left-to-right walk; filling rebuilds it again from an assignment
//! map. Trees are never mutated in place.

use std::collections::{BTreeMap, BTreeSet};

use caulk_ast::{Expr, HoleId, Rows, Stmt};

use crate::session::SynthesisSession;

/// Renumbers every hole leaf in discovery order with fresh session ids.
/// A tree without holes comes back unchanged, and the session counter stays
/// where it was.
pub fn detect_holes(session: &SynthesisSession, stmt: &Stmt) -> Stmt {
    match stmt {
        Stmt::Skip => Stmt::Skip,
        Stmt::Assign { name, value } => Stmt::Assign {
            name: name.clone(),
            value: detect_expr(session, value),
        },
        Stmt::ArrayInit { name, value } => Stmt::ArrayInit {
            name: name.clone(),
            value: detect_rows(session, value),
        },
        Stmt::ArrayUpdate {
            array,
            outer,
            inner,
            value,
        } => Stmt::ArrayUpdate {
            array: array.clone(),
            outer: detect_expr(session, outer),
            inner: inner.as_ref().map(|e| detect_expr(session, e)),
            value: detect_expr(session, value),
        },
        Stmt::Seq(a, b) => Stmt::Seq(
            Box::new(detect_holes(session, a)),
            Box::new(detect_holes(session, b)),
        ),
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => Stmt::If {
            cond: detect_expr(session, cond),
            then_branch: Box::new(detect_holes(session, then_branch)),
            else_branch: Box::new(detect_holes(session, else_branch)),
        },
        Stmt::While { cond, body } => Stmt::While {
            cond: detect_expr(session, cond),
            body: Box::new(detect_holes(session, body)),
        },
        Stmt::Assert(e) => Stmt::Assert(detect_expr(session, e)),
    }
}

fn detect_expr(session: &SynthesisSession, expr: &Expr) -> Expr {
    match expr {
        Expr::Literal(n) => Expr::Literal(*n),
        Expr::Variable(name) => Expr::Variable(name.clone()),
        Expr::Hole(_) => Expr::Hole(session.mint_hole()),
        Expr::BinaryOp { op, lhs, rhs } => Expr::BinaryOp {
            op: *op,
            lhs: Box::new(detect_expr(session, lhs)),
            rhs: Box::new(detect_expr(session, rhs)),
        },
        Expr::ArrayLiteral(rows) => Expr::ArrayLiteral(detect_rows(session, rows)),
        Expr::ArrayAccess {
            array,
            outer,
            inner,
        } => Expr::ArrayAccess {
            array: array.clone(),
            outer: Box::new(detect_expr(session, outer)),
            inner: inner.as_ref().map(|e| Box::new(detect_expr(session, e))),
        },
    }
}

fn detect_rows(session: &SynthesisSession, rows: &Rows) -> Rows {
    match rows {
        Rows::Flat(items) => Rows::Flat(items.iter().map(|e| detect_expr(session, e)).collect()),
        Rows::Nested(rows) => Rows::Nested(
            rows.iter()
                .map(|row| row.iter().map(|e| detect_expr(session, e)).collect())
                .collect(),
        ),
    }
}

/// The set of hole identifiers reachable in a subtree.
pub fn find_holes(stmt: &Stmt) -> BTreeSet<HoleId> {
    let mut out = BTreeSet::new();
    stmt_holes_into(stmt, &mut out);
    out
}

pub(crate) fn stmt_holes_into(stmt: &Stmt, out: &mut BTreeSet<HoleId>) {
    match stmt {
        Stmt::Skip => {}
        Stmt::Assign { value, .. } => expr_holes_into(value, out),
        Stmt::ArrayInit { value, .. } => rows_holes_into(value, out),
        Stmt::ArrayUpdate {
            outer,
            inner,
            value,
            ..
        } => {
            expr_holes_into(outer, out);
            if let Some(inner) = inner {
                expr_holes_into(inner, out);
            }
            expr_holes_into(value, out);
        }
        Stmt::Seq(a, b) => {
            stmt_holes_into(a, out);
            stmt_holes_into(b, out);
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            expr_holes_into(cond, out);
            stmt_holes_into(then_branch, out);
            stmt_holes_into(else_branch, out);
        }
        Stmt::While { cond, body } => {
            expr_holes_into(cond, out);
            stmt_holes_into(body, out);
        }
        Stmt::Assert(e) => expr_holes_into(e, out),
    }
}

pub(crate) fn expr_holes_into(expr: &Expr, out: &mut BTreeSet<HoleId>) {
    match expr {
        Expr::Literal(_) | Expr::Variable(_) => {}
        Expr::Hole(id) => {
            out.insert(*id);
        }
        Expr::BinaryOp { lhs, rhs, .. } => {
            expr_holes_into(lhs, out);
            expr_holes_into(rhs, out);
        }
        Expr::ArrayLiteral(rows) => rows_holes_into(rows, out),
        Expr::ArrayAccess { outer, inner, .. } => {
            expr_holes_into(outer, out);
            if let Some(inner) = inner {
                expr_holes_into(inner, out);
            }
        }
    }
}

fn rows_holes_into(rows: &Rows, out: &mut BTreeSet<HoleId>) {
    match rows {
        Rows::Flat(items) => {
            for e in items {
                expr_holes_into(e, out);
            }
        }
        Rows::Nested(rows) => {
            for e in rows.iter().flatten() {
                expr_holes_into(e, out);
            }
        }
    }
}

/// The set of free variable names reachable in a subtree, assignment targets
/// and array names included.
pub fn collect_vars(stmt: &Stmt) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    stmt_vars_into(stmt, &mut out);
    out
}

pub(crate) fn stmt_vars_into(stmt: &Stmt, out: &mut BTreeSet<String>) {
    match stmt {
        Stmt::Skip => {}
        Stmt::Assign { name, value } => {
            out.insert(name.clone());
            expr_vars_into(value, out);
        }
        Stmt::ArrayInit { name, value } => {
            out.insert(name.clone());
            rows_vars_into(value, out);
        }
        Stmt::ArrayUpdate {
            array,
            outer,
            inner,
            value,
        } => {
            out.insert(array.clone());
            expr_vars_into(outer, out);
            if let Some(inner) = inner {
                expr_vars_into(inner, out);
            }
            expr_vars_into(value, out);
        }
        Stmt::Seq(a, b) => {
            stmt_vars_into(a, out);
            stmt_vars_into(b, out);
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            expr_vars_into(cond, out);
            stmt_vars_into(then_branch, out);
            stmt_vars_into(else_branch, out);
        }
        Stmt::While { cond, body } => {
            expr_vars_into(cond, out);
            stmt_vars_into(body, out);
        }
        Stmt::Assert(e) => expr_vars_into(e, out),
    }
}

pub(crate) fn expr_vars_into(expr: &Expr, out: &mut BTreeSet<String>) {
    match expr {
        Expr::Literal(_) | Expr::Hole(_) => {}
        Expr::Variable(name) => {
            out.insert(name.clone());
        }
        Expr::BinaryOp { lhs, rhs, .. } => {
            expr_vars_into(lhs, out);
            expr_vars_into(rhs, out);
        }
        Expr::ArrayLiteral(rows) => rows_vars_into(rows, out),
        Expr::ArrayAccess {
            array,
            outer,
            inner,
        } => {
            out.insert(array.clone());
            expr_vars_into(outer, out);
            if let Some(inner) = inner {
                expr_vars_into(inner, out);
            }
        }
    }
}

fn rows_vars_into(rows: &Rows, out: &mut BTreeSet<String>) {
    match rows {
        Rows::Flat(items) => {
            for e in items {
                expr_vars_into(e, out);
            }
        }
        Rows::Nested(rows) => {
            for e in rows.iter().flatten() {
                expr_vars_into(e, out);
            }
        }
    }
}

/// Rebuilds the tree with every assigned hole replaced by its literal.
pub fn fill_holes(stmt: &Stmt, assignment: &BTreeMap<HoleId, i64>) -> Stmt {
    match stmt {
        Stmt::Skip => Stmt::Skip,
        Stmt::Assign { name, value } => Stmt::Assign {
            name: name.clone(),
            value: fill_expr(value, assignment),
        },
        Stmt::ArrayInit { name, value } => Stmt::ArrayInit {
            name: name.clone(),
            value: fill_rows(value, assignment),
        },
        Stmt::ArrayUpdate {
            array,
            outer,
            inner,
            value,
        } => Stmt::ArrayUpdate {
            array: array.clone(),
            outer: fill_expr(outer, assignment),
            inner: inner.as_ref().map(|e| fill_expr(e, assignment)),
            value: fill_expr(value, assignment),
        },
        Stmt::Seq(a, b) => Stmt::Seq(
            Box::new(fill_holes(a, assignment)),
            Box::new(fill_holes(b, assignment)),
        ),
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => Stmt::If {
            cond: fill_expr(cond, assignment),
            then_branch: Box::new(fill_holes(then_branch, assignment)),
            else_branch: Box::new(fill_holes(else_branch, assignment)),
        },
        Stmt::While { cond, body } => Stmt::While {
            cond: fill_expr(cond, assignment),
            body: Box::new(fill_holes(body, assignment)),
        },
        Stmt::Assert(e) => Stmt::Assert(fill_expr(e, assignment)),
    }
}

fn fill_expr(expr: &Expr, assignment: &BTreeMap<HoleId, i64>) -> Expr {
    match expr {
        Expr::Hole(id) => match assignment.get(id) {
            Some(v) => Expr::Literal(*v),
            None => Expr::Hole(*id),
        },
        Expr::Literal(n) => Expr::Literal(*n),
        Expr::Variable(name) => Expr::Variable(name.clone()),
        Expr::BinaryOp { op, lhs, rhs } => Expr::BinaryOp {
            op: *op,
            lhs: Box::new(fill_expr(lhs, assignment)),
            rhs: Box::new(fill_expr(rhs, assignment)),
        },
        Expr::ArrayLiteral(rows) => Expr::ArrayLiteral(fill_rows(rows, assignment)),
        Expr::ArrayAccess {
            array,
            outer,
            inner,
        } => Expr::ArrayAccess {
            array: array.clone(),
            outer: Box::new(fill_expr(outer, assignment)),
            inner: inner
                .as_ref()
                .map(|e| Box::new(fill_expr(e, assignment))),
        },
    }
}

fn fill_rows(rows: &Rows, assignment: &BTreeMap<HoleId, i64>) -> Rows {
    match rows {
        Rows::Flat(items) => Rows::Flat(items.iter().map(|e| fill_expr(e, assignment)).collect()),
        Rows::Nested(rows) => Rows::Nested(
            rows.iter()
                .map(|row| row.iter().map(|e| fill_expr(e, assignment)).collect())
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caulk_ast::{BinOp, Expr, Stmt};
    use crate::session::SynthesisSession;

    #[test]
    fn numbers_holes_in_discovery_order() {
        let session = SynthesisSession::new();
        // while x < ?? do x := x + ??
        let sketch = Stmt::while_do(
            Expr::bin(BinOp::Lt, Expr::var("x"), Expr::hole()),
            Stmt::assign("x", Expr::bin(BinOp::Add, Expr::var("x"), Expr::hole())),
        );
        let numbered = detect_holes(&session, &sketch);
        let holes: Vec<_> = find_holes(&numbered).into_iter().collect();
        assert_eq!(holes, vec![caulk_ast::HoleId(0), caulk_ast::HoleId(1)]);
        assert_eq!(session.holes_minted(), 2);
    }

    #[test]
    fn detection_is_idempotent_on_hole_free_trees() {
        let session = SynthesisSession::new();
        let program = Stmt::seq(vec![
            Stmt::assign("x", Expr::lit(1)),
            Stmt::assign("y", Expr::bin(BinOp::Add, Expr::var("x"), Expr::lit(2))),
        ]);
        let detected = detect_holes(&session, &program);
        assert_eq!(detected, program);
        assert_eq!(session.holes_minted(), 0);
    }

    #[test]
    fn collect_vars_sees_targets_and_references() {
        let program = Stmt::seq(vec![
            Stmt::array_init("a", caulk_ast::Rows::Flat(vec![Expr::lit(1)])),
            Stmt::assign("x", Expr::access("a", Expr::var("i"))),
        ]);
        let vars: Vec<_> = collect_vars(&program).into_iter().collect();
        assert_eq!(vars, vec!["a".to_string(), "i".to_string(), "x".to_string()]);
    }

    #[test]
    fn fill_replaces_only_assigned_holes() {
        let session = SynthesisSession::new();
        let sketch = Stmt::assign(
            "x",
            Expr::bin(BinOp::Add, Expr::hole(), Expr::hole()),
        );
        let numbered = detect_holes(&session, &sketch);
        let mut assignment = BTreeMap::new();
        assignment.insert(caulk_ast::HoleId(0), 7);
        let filled = fill_holes(&numbered, &assignment);
        assert_eq!(
            filled,
            Stmt::assign(
                "x",
                Expr::bin(BinOp::Add, Expr::lit(7), Expr::Hole(caulk_ast::HoleId(1))),
            )
        );
    }
}
