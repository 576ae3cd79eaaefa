#![forbid(unsafe_code)]

//! Caulk fills unspecified numeric parameters ("holes") in a sketch of a
//! small imperative while-language so that the completed program provably
//! satisfies a Hoare-style contract `{P} C {Q}`, optionally under a
//! user-supplied loop invariant, and reproduces a finite set of concrete
//! input/output examples.
//!
//! The pipeline: hole detection numbers the sketch's holes, each example is
//! pushed through the bounded-unrolling weakest-precondition transformer to
//! build solver obligations over the hole variables, a satisfying model
//! fills the tree, and the invariant-form transformer plus a refutation
//! check prove the completed triple. All mutable state lives in a per-run
//! [`SynthesisSession`].

pub mod array;
pub mod env;
pub mod error;
pub mod eval;
pub mod holes;
pub mod session;
pub mod synth;
pub mod verify;
pub mod wp;

pub use array::{ArrayValue, Index};
pub use env::{Env, Obligation, Predicate, SymInt, Value, lift, mk_true, predicate};
pub use error::SynthError;
pub use eval::eval_expr;
pub use holes::{collect_vars, detect_holes, fill_holes, find_holes};
pub use session::{SynthOptions, SynthesisSession};
pub use synth::{BoundaryValue, Example, Synthesis, add_example_obligations, synthesize_and_verify};
pub use verify::verify;
pub use wp::{unroll_whiles, wp};
