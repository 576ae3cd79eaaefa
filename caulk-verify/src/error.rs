#![forbid(unsafe_code)]

use miette::Diagnostic;
use thiserror::Error;

/// Failure taxonomy of the synthesis pipeline.
///
/// An unprovable contract is not in here: the verifier reports it as a
/// `false` verdict, and assertion failures inside the program only ever
/// surface through that verdict (or through `Unsat` during synthesis),
/// never as a direct error.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum SynthError {
    /// Array literal rows of unequal width.
    #[error("array initialization is not valid")]
    #[diagnostic(code(caulk::shape))]
    InvalidArrayInit,

    /// Index count does not match the array's dimensionality.
    #[error("unsupported array access")]
    #[diagnostic(code(caulk::shape))]
    UnsupportedAccess,

    /// Concrete index outside the valid range, observed while the governing
    /// invariant holds.
    #[error("Array access out of bounds")]
    #[diagnostic(code(caulk::bounds))]
    OutOfBounds,

    /// No hole assignment satisfies the examples.
    #[error("cannot fill holes")]
    #[diagnostic(code(caulk::unsat))]
    Unsat,

    /// A while loop was reached during invariant-form wp with no invariant
    /// supplied.
    #[error("missing loop invariant")]
    #[diagnostic(code(caulk::invariant))]
    MissingInvariant,

    /// A variable was read before any binding.
    #[error("unbound variable `{0}`")]
    #[diagnostic(code(caulk::unbound))]
    UnboundVariable(String),

    /// An operand of the wrong kind (e.g. an array where an integer is
    /// required, or a non-boolean condition).
    #[error("expected {0} value")]
    #[diagnostic(code(caulk::kind))]
    TypeMismatch(&'static str),

    /// Concrete division by zero during evaluation.
    #[error("division by zero")]
    #[diagnostic(code(caulk::arith))]
    DivisionByZero,

    /// The solver gave up on the hole constraints.
    #[error("solver returned unknown")]
    #[diagnostic(code(caulk::solver))]
    SolverUnknown,
}
