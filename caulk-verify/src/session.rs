#![forbid(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use caulk_ast::HoleId;
use z3::ast::{Ast, Bool, Int};
use z3::{Config, Context, Params, SatResult, Solver};

use crate::error::SynthError;

#[derive(Clone, Copy, Debug)]
pub struct SynthOptions {
    /// How many guarded iterations the bounded-unrolling loop rule covers.
    /// Examples that need more iterations than this cannot drive synthesis.
    pub unroll_depth: usize,
}

impl Default for SynthOptions {
    fn default() -> Self {
        SynthOptions { unroll_depth: 10 }
    }
}

/// Per-run owner of all mutable synthesis state: the hole-id counter and the
/// two obligation sets (hole satisfiability, contract validity), plus the
/// bridge equalities minted for hole-derived array indices. Nothing here is
/// process-wide; concurrent runs each construct their own session.
pub struct SynthesisSession {
    ctx: &'static Context,
    opts: SynthOptions,
    next_hole: Cell<u32>,
    next_aux: Cell<u32>,
    bridge: RefCell<Vec<Bool<'static>>>,
    hole_set: RefCell<Vec<Bool<'static>>>,
    validity_set: RefCell<Vec<Bool<'static>>>,
}

impl SynthesisSession {
    pub fn new() -> Rc<SynthesisSession> {
        SynthesisSession::with_options(SynthOptions::default())
    }

    pub fn with_options(opts: SynthOptions) -> Rc<SynthesisSession> {
        let mut cfg = Config::new();
        cfg.set_model_generation(true);
        // Leak the context so solver terms can live inside the long-lived
        // predicate closures without self-referential lifetimes.
        let ctx: &'static Context = Box::leak(Box::new(Context::new(&cfg)));
        Rc::new(SynthesisSession {
            ctx,
            opts,
            next_hole: Cell::new(0),
            next_aux: Cell::new(0),
            bridge: RefCell::new(Vec::new()),
            hole_set: RefCell::new(Vec::new()),
            validity_set: RefCell::new(Vec::new()),
        })
    }

    pub fn ctx(&self) -> &'static Context {
        self.ctx
    }

    pub fn unroll_depth(&self) -> usize {
        self.opts.unroll_depth
    }

    /// How many hole identifiers this session has handed out.
    pub fn holes_minted(&self) -> u32 {
        self.next_hole.get()
    }

    pub(crate) fn mint_hole(&self) -> HoleId {
        let n = self.next_hole.get();
        self.next_hole.set(n + 1);
        HoleId(n)
    }

    pub(crate) fn hole_const(&self, id: HoleId) -> Int<'static> {
        Int::new_const(self.ctx, id.to_string())
    }

    pub(crate) fn fresh_label(&self, base: &str) -> String {
        let n = self.next_aux.get();
        self.next_aux.set(n + 1);
        format!("{base}!{n}")
    }

    /// Mints an auxiliary integer standing for a hole-derived index and
    /// records its defining equality as a standing obligation.
    pub(crate) fn bridge_index(&self, origin: &Int<'static>) -> Int<'static> {
        let aux = Int::new_const(self.ctx, self.fresh_label("caulk#ix"));
        self.bridge.borrow_mut().push(aux._eq(origin));
        aux
    }

    pub(crate) fn push_hole_obligation(&self, f: Bool<'static>) {
        self.hole_set.borrow_mut().push(f);
    }

    pub(crate) fn push_validity_obligation(&self, f: Bool<'static>) {
        self.validity_set.borrow_mut().push(f);
    }

    fn solver(&self) -> Solver<'static> {
        let solver = Solver::new(self.ctx);
        let mut params = Params::new(self.ctx);
        // Fixed seeds keep solving reproducible run to run. No timeout is
        // set: callers needing bounded latency wrap the run externally.
        params.set_u32("smt.random_seed", 0);
        params.set_u32("sat.random_seed", 0);
        solver.set_params(&params);
        solver
    }

    /// Discharges the hole obligation set and reads back one literal per
    /// registered hole. Model completion supplies the theory default (zero)
    /// for holes no example constrained; bridge symbols are never read, so
    /// they cannot surface as spurious assignments.
    pub fn solve_holes(
        &self,
        holes: &BTreeSet<HoleId>,
    ) -> Result<BTreeMap<HoleId, i64>, SynthError> {
        let solver = self.solver();
        for f in self.bridge.borrow().iter() {
            solver.assert(f);
        }
        for f in self.hole_set.borrow().iter() {
            solver.assert(f);
        }
        match solver.check() {
            SatResult::Unsat => Err(SynthError::Unsat),
            SatResult::Unknown => Err(SynthError::SolverUnknown),
            SatResult::Sat => {
                let model = solver.get_model().expect("model after sat");
                let mut assignment = BTreeMap::new();
                for id in holes {
                    let value = model
                        .eval(&self.hole_const(*id), true)
                        .and_then(|v| v.as_i64())
                        .expect("completed integer model value");
                    assignment.insert(*id, value);
                }
                Ok(assignment)
            }
        }
    }

    /// Discharges the validity obligation set, refutation style: the set
    /// holds negated goals, so UNSAT means every recorded goal is valid.
    pub fn prove_validity(&self) -> bool {
        let solver = self.solver();
        for f in self.bridge.borrow().iter() {
            solver.assert(f);
        }
        for f in self.validity_set.borrow().iter() {
            solver.assert(f);
        }
        matches!(solver.check(), SatResult::Unsat)
    }
}
