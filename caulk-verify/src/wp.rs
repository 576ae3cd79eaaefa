#![forbid(unsafe_code)]

//! The backward weakest-precondition transformer.
//!
//! `wp` composes one case per statement shape into a single backward-chained
//! obligation. Loops have two rules: the invariant form used for the final
//! validity check, and a bounded syntactic unrolling used only to extract
//! hole constraints from concrete examples.

use std::collections::BTreeSet;
use std::rc::Rc;

use caulk_ast::Stmt;
use z3::ast::{Ast, Bool, Int, forall_const};

use crate::array::ArrayValue;
use crate::env::{Env, Obligation, Predicate, SymInt, Value, lift};
use crate::error::SynthError;
use crate::eval::{eval_expr, eval_rows, resolve_index};
use crate::holes::{expr_vars_into, stmt_vars_into};
use crate::session::SynthesisSession;

pub fn wp(
    session: &Rc<SynthesisSession>,
    post: Obligation,
    stmt: &Stmt,
    linv: Option<Predicate>,
) -> Result<Obligation, SynthError> {
    match stmt {
        Stmt::Skip => Ok(post),

        Stmt::Assign { name, value } => {
            let session = session.clone();
            let name = name.clone();
            let value = value.clone();
            Ok(Rc::new(move |env: &Env| {
                let v = eval_expr(&session, &value, env, linv.as_ref())?;
                post(&env.update(&name, v))
            }))
        }

        Stmt::ArrayInit { name, value } => {
            let session = session.clone();
            let name = name.clone();
            let rows = value.clone();
            Ok(Rc::new(move |env: &Env| {
                let arr = eval_rows(&session, &rows, env, linv.as_ref())?;
                post(&env.update(&name, Value::Array(arr)))
            }))
        }

        Stmt::ArrayUpdate {
            array,
            outer,
            inner,
            value,
        } => {
            let session = session.clone();
            let array = array.clone();
            let outer = outer.clone();
            let inner = inner.clone();
            let value = value.clone();
            Ok(Rc::new(move |env: &Env| {
                let arr = match env.lookup(&array)? {
                    Value::Array(a) => a,
                    _ => return Err(SynthError::UnsupportedAccess),
                };
                let outer_ix = resolve_index(&session, &outer, env, linv.as_ref())?;
                let inner_ix = inner
                    .as_ref()
                    .map(|e| resolve_index(&session, e, env, linv.as_ref()))
                    .transpose()?;
                let val = eval_expr(&session, &value, env, linv.as_ref())?.int_term(env.ctx())?;
                let updated = arr.store(&outer_ix, inner_ix.as_ref(), &val, env, linv.as_ref())?;
                post(&env.update(&array, Value::Array(updated)))
            }))
        }

        Stmt::Seq(c1, c2) => {
            let right = wp(session, post, c2, linv.clone())?;
            wp(session, right, c1, linv)
        }

        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let when_true = wp(session, post.clone(), then_branch, linv.clone())?;
            let when_false = wp(session, post, else_branch, linv.clone())?;
            let session = session.clone();
            let cond = cond.clone();
            Ok(Rc::new(move |env: &Env| {
                let ctx = env.ctx();
                let c = eval_expr(&session, &cond, env, linv.as_ref())?.formula(ctx)?;
                let t = when_true(env)?;
                let f = when_false(env)?;
                // Disjunction of guarded branch preconditions, not an
                // implication-guarded conjunction.
                Ok(Bool::or(
                    ctx,
                    &[&Bool::and(ctx, &[&t, &c]), &Bool::and(ctx, &[&f, &c.not()])],
                ))
            }))
        }

        Stmt::Assert(e) => {
            let session = session.clone();
            let e = e.clone();
            Ok(Rc::new(move |env: &Env| {
                let ctx = env.ctx();
                let asserted = eval_expr(&session, &e, env, linv.as_ref())?.formula(ctx)?;
                let q = post(env)?;
                Ok(Bool::and(ctx, &[&asserted, &q]))
            }))
        }

        Stmt::While { cond, body } => {
            let Some(inv) = linv.clone() else {
                return Err(SynthError::MissingInvariant);
            };
            let mut names = BTreeSet::new();
            expr_vars_into(cond, &mut names);
            stmt_vars_into(body, &mut names);

            let body_wp = wp(session, lift(&inv), body, linv)?;
            let session = session.clone();
            let cond = cond.clone();
            Ok(Rc::new(move |env: &Env| {
                let ctx = env.ctx();

                // Quantified state: every variable free in the loop gets a
                // fresh symbol; arrays keep their entry length metadata but
                // the array term itself is quantified.
                let mut qenv = env.clone();
                let mut int_symbols = Vec::new();
                let mut array_symbols = Vec::new();
                for name in &names {
                    match env.get(name) {
                        Some(Value::Array(arr)) => {
                            let fresh = ArrayValue::fresh(
                                ctx,
                                &session.fresh_label(name),
                                arr.outer_len(),
                                arr.inner_len(),
                            );
                            array_symbols.push(fresh.term().clone());
                            qenv = qenv.update(name, Value::Array(fresh));
                        }
                        _ => {
                            let term = Int::new_const(ctx, session.fresh_label(name));
                            int_symbols.push(term.clone());
                            qenv = qenv.update(
                                name,
                                Value::Sym(SymInt {
                                    term,
                                    holey: false,
                                }),
                            );
                        }
                    }
                }

                let entry = inv(env);
                let cond_q = eval_expr(&session, &cond, &qenv, Some(&inv))?.formula(ctx)?;
                let inv_q = inv(&qenv);
                let body_q = body_wp(&qenv)?;
                let post_q = post(&qenv)?;

                let preserved = Bool::and(ctx, &[&inv_q, &cond_q]).implies(&body_q);
                let exits = Bool::and(ctx, &[&inv_q, &cond_q.not()]).implies(&post_q);
                let rule = Bool::and(ctx, &[&preserved, &exits]);

                let bound: Vec<&dyn Ast> = int_symbols
                    .iter()
                    .map(|t| t as &dyn Ast)
                    .chain(array_symbols.iter().map(|t| t as &dyn Ast))
                    .collect();
                let quantified = if bound.is_empty() {
                    rule
                } else {
                    forall_const(ctx, &bound, &[], &rule)
                };
                Ok(Bool::and(ctx, &[&entry, &quantified]))
            }))
        }
    }
}

/// Rewrites every while loop into `depth` nested guarded repetitions of its
/// body. This under-approximates the loop: examples that need more than
/// `depth` iterations cannot drive synthesis.
pub fn unroll_whiles(stmt: &Stmt, depth: usize) -> Stmt {
    match stmt {
        Stmt::While { cond, body } => {
            let body = unroll_whiles(body, depth);
            let mut unrolled = Stmt::If {
                cond: cond.clone(),
                then_branch: Box::new(body.clone()),
                else_branch: Box::new(Stmt::Skip),
            };
            for _ in 1..depth.max(1) {
                unrolled = Stmt::If {
                    cond: cond.clone(),
                    then_branch: Box::new(Stmt::Seq(Box::new(body.clone()), Box::new(unrolled))),
                    else_branch: Box::new(Stmt::Skip),
                };
            }
            unrolled
        }
        Stmt::Seq(a, b) => Stmt::Seq(
            Box::new(unroll_whiles(a, depth)),
            Box::new(unroll_whiles(b, depth)),
        ),
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => Stmt::If {
            cond: cond.clone(),
            then_branch: Box::new(unroll_whiles(then_branch, depth)),
            else_branch: Box::new(unroll_whiles(else_branch, depth)),
        },
        other => other.clone(),
    }
}
