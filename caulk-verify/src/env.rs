#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::rc::Rc;

use z3::Context;
use z3::ast::{Ast, Bool, Int};

use crate::array::ArrayValue;
use crate::error::SynthError;

/// A symbolic integer term. `holey` marks terms derived from unresolved
/// holes, which is what decides whether an array index needs a bridge symbol.
#[derive(Clone, Debug)]
pub struct SymInt {
    pub term: Int<'static>,
    pub holey: bool,
}

impl SymInt {
    pub fn concrete(ctx: &'static Context, n: i64) -> SymInt {
        SymInt {
            term: Int::from_i64(ctx, n),
            holey: false,
        }
    }
}

/// Runtime value of the evaluator. Concrete scalars stay concrete until an
/// operation mixes them with a symbolic operand; arrays carry their own
/// length metadata.
#[derive(Clone, Debug)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Sym(SymInt),
    Pred(Bool<'static>),
    Array(ArrayValue),
}

impl Value {
    pub fn concrete_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The value as an integer term, lifting concrete integers.
    pub fn int_term(&self, ctx: &'static Context) -> Result<SymInt, SynthError> {
        match self {
            Value::Int(n) => Ok(SymInt::concrete(ctx, *n)),
            Value::Sym(s) => Ok(s.clone()),
            Value::Bool(_) | Value::Pred(_) | Value::Array(_) => {
                Err(SynthError::TypeMismatch("integer"))
            }
        }
    }

    /// The value as a formula, lifting concrete booleans.
    pub fn formula(&self, ctx: &'static Context) -> Result<Bool<'static>, SynthError> {
        match self {
            Value::Bool(b) => Ok(Bool::from_bool(ctx, *b)),
            Value::Pred(p) => Ok(p.clone()),
            Value::Int(_) | Value::Sym(_) | Value::Array(_) => {
                Err(SynthError::TypeMismatch("boolean"))
            }
        }
    }
}

/// Immutable-by-convention mapping from variable name to value. `update`
/// returns a new environment; environments forked from a common ancestor
/// never share mutable state.
#[derive(Clone)]
pub struct Env {
    ctx: &'static Context,
    vars: HashMap<String, Value>,
}

impl Env {
    pub fn new(ctx: &'static Context) -> Env {
        Env {
            ctx,
            vars: HashMap::new(),
        }
    }

    pub fn ctx(&self) -> &'static Context {
        self.ctx
    }

    pub fn update(&self, name: &str, value: Value) -> Env {
        let mut next = self.clone();
        next.vars.insert(name.to_string(), value);
        next
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn lookup(&self, name: &str) -> Result<Value, SynthError> {
        self.vars
            .get(name)
            .cloned()
            .ok_or_else(|| SynthError::UnboundVariable(name.to_string()))
    }

    /// Integer term for `name`, for use inside contract predicates. Names the
    /// environment does not mention are unconstrained, so they become fresh
    /// symbols of their own name.
    pub fn int(&self, name: &str) -> Int<'static> {
        match self.vars.get(name) {
            Some(Value::Int(n)) => Int::from_i64(self.ctx, *n),
            Some(Value::Sym(s)) => s.term.clone(),
            _ => Int::new_const(self.ctx, name),
        }
    }

}

/// A contract predicate: precondition, postcondition, or loop invariant.
pub type Predicate = Rc<dyn Fn(&Env) -> Bool<'static>>;

/// A backward-chained postcondition. Unlike user predicates these can fail
/// when applied, because shape and bounds violations are raised eagerly
/// during evaluation.
pub type Obligation = Rc<dyn Fn(&Env) -> Result<Bool<'static>, SynthError>>;

pub fn predicate<F>(f: F) -> Predicate
where
    F: Fn(&Env) -> Bool<'static> + 'static,
{
    Rc::new(f)
}

pub fn mk_true() -> Predicate {
    Rc::new(|env| Bool::from_bool(env.ctx(), true))
}

pub fn lift(p: &Predicate) -> Obligation {
    let p = p.clone();
    Rc::new(move |env| Ok(p(env)))
}

/// Whether the gating invariant concretely holds in `env`. A missing
/// invariant gates nothing; a symbolic residue is not "true", so the eager
/// check is skipped and the access is left to the solver-side obligations.
pub(crate) fn invariant_holds(env: &Env, linv: Option<&Predicate>) -> bool {
    match linv {
        None => true,
        Some(p) => p(env).simplify().as_bool() == Some(true),
    }
}
