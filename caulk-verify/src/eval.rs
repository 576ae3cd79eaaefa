#![forbid(unsafe_code)]

use std::rc::Rc;

use caulk_ast::{BinOp, Expr, Rows};
use z3::Context;
use z3::ast::{Ast, Int};

use crate::array::{ArrayValue, Index};
use crate::env::{Env, Predicate, SymInt, Value};
use crate::error::SynthError;
use crate::session::SynthesisSession;

/// Evaluates an expression under an environment. `linv` is the currently
/// active loop invariant, consulted only to gate eager bounds checks.
pub fn eval_expr(
    session: &Rc<SynthesisSession>,
    expr: &Expr,
    env: &Env,
    linv: Option<&Predicate>,
) -> Result<Value, SynthError> {
    match expr {
        Expr::Literal(n) => Ok(Value::Int(*n)),
        Expr::Variable(name) => env.lookup(name),
        Expr::Hole(id) => Ok(Value::Sym(SymInt {
            term: session.hole_const(*id),
            holey: true,
        })),
        Expr::BinaryOp { op, lhs, rhs } => {
            let l = eval_expr(session, lhs, env, linv)?;
            let r = eval_expr(session, rhs, env, linv)?;
            apply_op(env.ctx(), *op, &l, &r)
        }
        Expr::ArrayLiteral(rows) => Ok(Value::Array(eval_rows(session, rows, env, linv)?)),
        Expr::ArrayAccess {
            array,
            outer,
            inner,
        } => {
            let arr = match env.lookup(array)? {
                Value::Array(a) => a,
                _ => return Err(SynthError::UnsupportedAccess),
            };
            let outer_ix = resolve_index(session, outer, env, linv)?;
            let inner_ix = inner
                .as_deref()
                .map(|e| resolve_index(session, e, env, linv))
                .transpose()?;
            arr.get(&outer_ix, inner_ix.as_ref(), env, linv)
        }
    }
}

/// Resolves an index expression. A hole-derived index is replaced by a fresh
/// bridge symbol whose defining equality becomes a standing obligation, so
/// the solver governs that access instead of an eager bounds check.
pub(crate) fn resolve_index(
    session: &Rc<SynthesisSession>,
    expr: &Expr,
    env: &Env,
    linv: Option<&Predicate>,
) -> Result<Index, SynthError> {
    match eval_expr(session, expr, env, linv)? {
        Value::Int(n) => Ok(Index::Concrete(n)),
        Value::Sym(s) if s.holey => Ok(Index::Symbolic {
            term: session.bridge_index(&s.term),
            holey: true,
        }),
        Value::Sym(s) => Ok(Index::Symbolic {
            term: s.term,
            holey: false,
        }),
        _ => Err(SynthError::TypeMismatch("integer")),
    }
}

/// Flattens an array literal into a length-tagged array value.
pub(crate) fn eval_rows(
    session: &Rc<SynthesisSession>,
    rows: &Rows,
    env: &Env,
    linv: Option<&Predicate>,
) -> Result<ArrayValue, SynthError> {
    let ctx = env.ctx();
    let elem = |e: &Expr| -> Result<SymInt, SynthError> {
        eval_expr(session, e, env, linv)?
            .int_term(ctx)
            .map_err(|_| SynthError::InvalidArrayInit)
    };
    match rows {
        Rows::Flat(items) => {
            let elems = items.iter().map(&elem).collect::<Result<Vec<_>, _>>()?;
            Ok(ArrayValue::flat(ctx, &elems))
        }
        Rows::Nested(rows) => {
            let rows = rows
                .iter()
                .map(|row| row.iter().map(&elem).collect::<Result<Vec<_>, _>>())
                .collect::<Result<Vec<_>, _>>()?;
            ArrayValue::nested(ctx, &rows)
        }
    }
}

fn floor_div(a: i64, b: i64) -> Result<Option<i64>, SynthError> {
    if b == 0 {
        return Err(SynthError::DivisionByZero);
    }
    let Some(q) = a.checked_div(b) else {
        return Ok(None);
    };
    if a % b != 0 && (a < 0) != (b < 0) {
        Ok(Some(q - 1))
    } else {
        Ok(Some(q))
    }
}

fn apply_op(
    ctx: &'static Context,
    op: BinOp,
    lhs: &Value,
    rhs: &Value,
) -> Result<Value, SynthError> {
    // Concrete operands stay concrete.
    if let (Some(a), Some(b)) = (lhs.concrete_int(), rhs.concrete_int()) {
        let concrete = match op {
            BinOp::Add => a.checked_add(b),
            BinOp::Sub => a.checked_sub(b),
            BinOp::Mul => a.checked_mul(b),
            BinOp::Div => floor_div(a, b)?,
            BinOp::Ne => return Ok(Value::Bool(a != b)),
            BinOp::Gt => return Ok(Value::Bool(a > b)),
            BinOp::Lt => return Ok(Value::Bool(a < b)),
            BinOp::Le => return Ok(Value::Bool(a <= b)),
            BinOp::Ge => return Ok(Value::Bool(a >= b)),
            BinOp::Eq => return Ok(Value::Bool(a == b)),
        };
        // Arithmetic that overflows the machine word falls through to the
        // unbounded solver integers.
        if let Some(v) = concrete {
            return Ok(Value::Int(v));
        }
    }

    let l = lhs.int_term(ctx)?;
    let r = rhs.int_term(ctx)?;
    let holey = l.holey || r.holey;

    let term = match op {
        BinOp::Ne => return Ok(Value::Pred(l.term._eq(&r.term).not().simplify())),
        BinOp::Gt => return Ok(Value::Pred(l.term.gt(&r.term).simplify())),
        BinOp::Lt => return Ok(Value::Pred(l.term.lt(&r.term).simplify())),
        BinOp::Le => return Ok(Value::Pred(l.term.le(&r.term).simplify())),
        BinOp::Ge => return Ok(Value::Pred(l.term.ge(&r.term).simplify())),
        BinOp::Eq => return Ok(Value::Pred(l.term._eq(&r.term).simplify())),
        BinOp::Add => Int::add(ctx, &[&l.term, &r.term]),
        BinOp::Sub => Int::sub(ctx, &[&l.term, &r.term]),
        BinOp::Mul => Int::mul(ctx, &[&l.term, &r.term]),
        BinOp::Div => l.term.div(&r.term),
    };
    let term = term.simplify();
    if !holey {
        if let Some(v) = term.as_i64() {
            return Ok(Value::Int(v));
        }
    }
    Ok(Value::Sym(SymInt { term, holey }))
}
