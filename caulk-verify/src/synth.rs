#![forbid(unsafe_code)]

//! Example-driven constraint synthesis and the pipeline entry point.

use std::collections::BTreeMap;
use std::rc::Rc;

use caulk_ast::{HoleId, Stmt};
use z3::ast::{Ast, Bool, Int};

use crate::array::{ArrayValue, Index};
use crate::env::{Env, Obligation, Predicate, SymInt, Value};
use crate::error::SynthError;
use crate::holes::{detect_holes, fill_holes, find_holes};
use crate::session::SynthesisSession;
use crate::verify::verify;
use crate::wp::{unroll_whiles, wp};

/// A value at the pipeline boundary: scalars are integers, arrays are
/// rectangular nested integer sequences.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoundaryValue {
    Int(i64),
    Array(Vec<i64>),
    Array2(Vec<Vec<i64>>),
}

impl From<i64> for BoundaryValue {
    fn from(n: i64) -> BoundaryValue {
        BoundaryValue::Int(n)
    }
}

impl From<Vec<i64>> for BoundaryValue {
    fn from(vs: Vec<i64>) -> BoundaryValue {
        BoundaryValue::Array(vs)
    }
}

impl From<Vec<Vec<i64>>> for BoundaryValue {
    fn from(rows: Vec<Vec<i64>>) -> BoundaryValue {
        BoundaryValue::Array2(rows)
    }
}

/// One concrete regression the synthesized program must reproduce: partial
/// input bindings and expected output bindings. Unmentioned variables are
/// unconstrained.
#[derive(Clone, Debug, Default)]
pub struct Example {
    pub inputs: Vec<(String, BoundaryValue)>,
    pub outputs: Vec<(String, BoundaryValue)>,
}

impl Example {
    pub fn new() -> Example {
        Example::default()
    }

    pub fn input(mut self, name: &str, value: impl Into<BoundaryValue>) -> Example {
        self.inputs.push((name.to_string(), value.into()));
        self
    }

    pub fn output(mut self, name: &str, value: impl Into<BoundaryValue>) -> Example {
        self.outputs.push((name.to_string(), value.into()));
        self
    }
}

/// Outcome of a synthesis run: the filled program, the literal chosen for
/// each hole, and the verification verdict.
#[derive(Clone, Debug)]
pub struct Synthesis {
    pub program: Stmt,
    pub assignments: BTreeMap<HoleId, i64>,
    pub verified: bool,
}

fn concrete_row(ctx: &'static z3::Context, vs: &[i64]) -> Vec<SymInt> {
    vs.iter().map(|v| SymInt::concrete(ctx, *v)).collect()
}

fn input_env(session: &Rc<SynthesisSession>, example: &Example) -> Result<Env, SynthError> {
    let ctx = session.ctx();
    let mut env = Env::new(ctx);
    for (name, value) in &example.inputs {
        let bound = match value {
            BoundaryValue::Int(n) => Value::Int(*n),
            BoundaryValue::Array(vs) => Value::Array(ArrayValue::flat(ctx, &concrete_row(ctx, vs))),
            BoundaryValue::Array2(rows) => {
                let rows: Vec<_> = rows.iter().map(|r| concrete_row(ctx, r)).collect();
                Value::Array(ArrayValue::nested(ctx, &rows)?)
            }
        };
        env = env.update(name, bound);
    }
    Ok(env)
}

fn expected_binding(
    env: &Env,
    name: &str,
    expected: &BoundaryValue,
) -> Result<Bool<'static>, SynthError> {
    let ctx = env.ctx();
    match expected {
        BoundaryValue::Int(n) => {
            let actual = env.lookup(name)?.int_term(ctx)?;
            Ok(actual.term._eq(&Int::from_i64(ctx, *n)))
        }
        BoundaryValue::Array(vs) => {
            let Value::Array(arr) = env.lookup(name)? else {
                return Err(SynthError::TypeMismatch("array"));
            };
            if !arr.is_one_dimensional() || arr.outer_len() != vs.len() as i64 {
                return Ok(Bool::from_bool(ctx, false));
            }
            let mut parts = Vec::with_capacity(vs.len());
            for (i, v) in vs.iter().enumerate() {
                let got = arr.get(&Index::Concrete(i as i64), None, env, None)?;
                parts.push(got.int_term(ctx)?.term._eq(&Int::from_i64(ctx, *v)));
            }
            let refs: Vec<&Bool> = parts.iter().collect();
            Ok(Bool::and(ctx, &refs))
        }
        BoundaryValue::Array2(rows) => {
            let Value::Array(arr) = env.lookup(name)? else {
                return Err(SynthError::TypeMismatch("array"));
            };
            let width = rows.first().map(|r| r.len()).unwrap_or(0);
            let shape_matches = arr.inner_len() == Some(width as i64)
                && arr.outer_len() == rows.len() as i64
                && rows.iter().all(|r| r.len() == width);
            if !shape_matches {
                return Ok(Bool::from_bool(ctx, false));
            }
            let mut parts = Vec::new();
            for (i, row) in rows.iter().enumerate() {
                for (j, v) in row.iter().enumerate() {
                    let got = arr.get(
                        &Index::Concrete(i as i64),
                        Some(&Index::Concrete(j as i64)),
                        env,
                        None,
                    )?;
                    parts.push(got.int_term(ctx)?.term._eq(&Int::from_i64(ctx, *v)));
                }
            }
            let refs: Vec<&Bool> = parts.iter().collect();
            Ok(Bool::and(ctx, &refs))
        }
    }
}

/// The postcondition for one example: Q strengthened with one equality per
/// expected output binding.
fn example_post(q: &Predicate, example: &Example) -> Obligation {
    let q = q.clone();
    let outputs = example.outputs.clone();
    Rc::new(move |env: &Env| {
        let mut parts = vec![q(env)];
        for (name, expected) in &outputs {
            parts.push(expected_binding(env, name, expected)?);
        }
        let refs: Vec<&Bool> = parts.iter().collect();
        Ok(Bool::and(env.ctx(), &refs))
    })
}

/// Runs the bounded-unrolling wp over every example and records the
/// resulting formulas in the session's hole obligation set.
pub fn add_example_obligations(
    session: &Rc<SynthesisSession>,
    program: &Stmt,
    q: &Predicate,
    linv: Option<Predicate>,
    examples: &[Example],
) -> Result<(), SynthError> {
    if examples.is_empty() {
        return Ok(());
    }
    let unrolled = unroll_whiles(program, session.unroll_depth());
    for example in examples {
        let env = input_env(session, example)?;
        let post = example_post(q, example);
        let pre = wp(session, post, &unrolled, linv.clone())?;
        session.push_hole_obligation(pre(&env)?);
    }
    Ok(())
}

/// The public entry point: numbers the sketch's holes, fills them from the
/// examples, and proves the completed program's contract.
///
/// Returns `verified == true` iff the holes were filled and the triple was
/// proven valid; an unprovable contract is the `false` verdict, while an
/// unsatisfiable example set is the `Unsat` error.
pub fn synthesize_and_verify(
    session: &Rc<SynthesisSession>,
    sketch: &Stmt,
    p: &Predicate,
    q: &Predicate,
    linv: Option<Predicate>,
    examples: &[Example],
) -> Result<Synthesis, SynthError> {
    let numbered = detect_holes(session, sketch);
    let holes = find_holes(&numbered);
    add_example_obligations(session, &numbered, q, linv.clone(), examples)?;
    let assignments = session.solve_holes(&holes)?;
    let program = fill_holes(&numbered, &assignments);
    let verified = verify(session, &program, p, q, linv)?;
    Ok(Synthesis {
        program,
        assignments,
        verified,
    })
}
