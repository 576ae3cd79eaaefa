#![forbid(unsafe_code)]

//! The final Hoare-triple validity check.

use std::rc::Rc;

use caulk_ast::Stmt;
use z3::ast::Int;

use crate::env::{Env, Predicate, SymInt, Value, lift};
use crate::error::SynthError;
use crate::holes::collect_vars;
use crate::session::SynthesisSession;
use crate::wp::wp;

/// Proves (or fails to prove) `{P} program {Q}` under a fresh fully symbolic
/// environment, refutation style: the negated implication joins the
/// session's validity set, and UNSAT over all free program variables and
/// array terms means the contract holds. A satisfiable negation is the soft
/// `false` verdict, not an error.
pub fn verify(
    session: &Rc<SynthesisSession>,
    program: &Stmt,
    p: &Predicate,
    q: &Predicate,
    linv: Option<Predicate>,
) -> Result<bool, SynthError> {
    let ctx = session.ctx();
    let mut env = Env::new(ctx);
    for name in collect_vars(program) {
        let term = Int::new_const(ctx, name.as_str());
        env = env.update(&name, Value::Sym(SymInt { term, holey: false }));
    }

    let pre = wp(session, lift(q), program, linv)?;
    let weakest = pre(&env)?;
    let goal = p(&env).implies(&weakest);
    session.push_validity_obligation(goal.not());
    Ok(session.prove_validity())
}
