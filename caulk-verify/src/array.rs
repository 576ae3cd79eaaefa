#![forbid(unsafe_code)]

//! Rectangular 1-D/2-D integer arrays over the solver's array theory.
//!
//! A 2-D array is an array of arrays. Bounds are checked eagerly only for
//! concrete indices, and only while the governing loop invariant concretely
//! holds; symbolic (hole-derived) indices are constrained on the solver side
//! through the session's bridge obligations instead.

use z3::ast::{Array, Ast, Int};
use z3::{Context, Sort};

use crate::env::{Env, Predicate, SymInt, Value, invariant_holds};
use crate::error::SynthError;

/// A resolved array index: either a concrete integer or a symbolic term.
#[derive(Clone, Debug)]
pub enum Index {
    Concrete(i64),
    Symbolic { term: Int<'static>, holey: bool },
}

impl Index {
    pub fn term(&self, ctx: &'static Context) -> Int<'static> {
        match self {
            Index::Concrete(n) => Int::from_i64(ctx, *n),
            Index::Symbolic { term, .. } => term.clone(),
        }
    }

    pub fn holey(&self) -> bool {
        matches!(self, Index::Symbolic { holey: true, .. })
    }
}

/// An array term tagged with its length metadata. `inner_len` is `None` for
/// one-dimensional arrays; accesses and updates must match that shape.
#[derive(Clone, Debug)]
pub struct ArrayValue {
    term: Array<'static>,
    outer_len: i64,
    inner_len: Option<i64>,
    holey: bool,
}

fn int_sort(ctx: &'static Context) -> Sort<'static> {
    Sort::int(ctx)
}

fn row_term(ctx: &'static Context, elems: &[SymInt]) -> Array<'static> {
    let zero = Int::from_i64(ctx, 0);
    let mut term = Array::const_array(ctx, &int_sort(ctx), &zero);
    for (i, elem) in elems.iter().enumerate() {
        term = term.store(&Int::from_i64(ctx, i as i64), &elem.term);
    }
    term
}

impl ArrayValue {
    /// One-dimensional array from its element terms.
    pub fn flat(ctx: &'static Context, elems: &[SymInt]) -> ArrayValue {
        ArrayValue {
            term: row_term(ctx, elems),
            outer_len: elems.len() as i64,
            inner_len: None,
            holey: elems.iter().any(|e| e.holey),
        }
    }

    /// Two-dimensional array from its rows. All rows must have the same
    /// width.
    pub fn nested(ctx: &'static Context, rows: &[Vec<SymInt>]) -> Result<ArrayValue, SynthError> {
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != width) {
            return Err(SynthError::InvalidArrayInit);
        }
        let zero = Int::from_i64(ctx, 0);
        let zero_row = Array::const_array(ctx, &int_sort(ctx), &zero);
        let mut term = Array::const_array(ctx, &int_sort(ctx), &zero_row);
        for (i, row) in rows.iter().enumerate() {
            term = term.store(&Int::from_i64(ctx, i as i64), &row_term(ctx, row));
        }
        Ok(ArrayValue {
            term,
            outer_len: rows.len() as i64,
            inner_len: Some(width as i64),
            holey: rows.iter().flatten().any(|e| e.holey),
        })
    }

    /// A fully symbolic array with the given length metadata, for quantified
    /// loop environments.
    pub fn fresh(
        ctx: &'static Context,
        name: &str,
        outer_len: i64,
        inner_len: Option<i64>,
    ) -> ArrayValue {
        let ints = int_sort(ctx);
        let term = match inner_len {
            None => Array::new_const(ctx, name, &ints, &ints),
            Some(_) => Array::new_const(ctx, name, &ints, &Sort::array(ctx, &ints, &ints)),
        };
        ArrayValue {
            term,
            outer_len,
            inner_len,
            holey: false,
        }
    }

    pub fn term(&self) -> &Array<'static> {
        &self.term
    }

    pub fn outer_len(&self) -> i64 {
        self.outer_len
    }

    pub fn inner_len(&self) -> Option<i64> {
        self.inner_len
    }

    pub fn is_one_dimensional(&self) -> bool {
        self.inner_len.is_none()
    }

    fn check_shape(&self, has_inner: bool) -> Result<(), SynthError> {
        if self.inner_len.is_some() != has_inner {
            return Err(SynthError::UnsupportedAccess);
        }
        Ok(())
    }

    fn check_bounds(
        &self,
        outer: &Index,
        inner: Option<&Index>,
        env: &Env,
        linv: Option<&Predicate>,
    ) -> Result<(), SynthError> {
        match self.inner_len {
            None => {
                if let Index::Concrete(i) = outer {
                    if (*i < 0 || *i >= self.outer_len) && invariant_holds(env, linv) {
                        return Err(SynthError::OutOfBounds);
                    }
                }
            }
            Some(width) => {
                if let (Index::Concrete(i), Some(Index::Concrete(j))) = (outer, inner) {
                    let bad = *i < 0 || *i >= self.outer_len || *j < 0 || *j >= width;
                    if bad && invariant_holds(env, linv) {
                        return Err(SynthError::OutOfBounds);
                    }
                }
            }
        }
        Ok(())
    }

    /// Bounds-checked element read. Concrete results fold back to concrete
    /// integers so later bounds checks can still fire on them.
    pub fn get(
        &self,
        outer: &Index,
        inner: Option<&Index>,
        env: &Env,
        linv: Option<&Predicate>,
    ) -> Result<Value, SynthError> {
        self.check_shape(inner.is_some())?;
        self.check_bounds(outer, inner, env, linv)?;
        let ctx = env.ctx();
        let outer_term = outer.term(ctx);
        let elem = match inner {
            None => self
                .term
                .select(&outer_term)
                .as_int()
                .expect("integer element"),
            Some(ix) => {
                let row = self
                    .term
                    .select(&outer_term)
                    .as_array()
                    .expect("array row");
                row.select(&ix.term(ctx)).as_int().expect("integer element")
            }
        };
        let elem = elem.simplify();
        let holey = self.holey || outer.holey() || inner.is_some_and(Index::holey);
        if !holey {
            if let Some(v) = elem.as_i64() {
                return Ok(Value::Int(v));
            }
        }
        Ok(Value::Sym(SymInt { term: elem, holey }))
    }

    /// Bounds-checked element write; returns the updated array with the
    /// length metadata unchanged.
    pub fn store(
        &self,
        outer: &Index,
        inner: Option<&Index>,
        value: &SymInt,
        env: &Env,
        linv: Option<&Predicate>,
    ) -> Result<ArrayValue, SynthError> {
        self.check_shape(inner.is_some())?;
        self.check_bounds(outer, inner, env, linv)?;
        let ctx = env.ctx();
        let outer_term = outer.term(ctx);
        let term = match inner {
            None => self.term.store(&outer_term, &value.term),
            Some(ix) => {
                let row = self
                    .term
                    .select(&outer_term)
                    .as_array()
                    .expect("array row");
                let row = row.store(&ix.term(ctx), &value.term);
                self.term.store(&outer_term, &row)
            }
        };
        Ok(ArrayValue {
            term,
            outer_len: self.outer_len,
            inner_len: self.inner_len,
            holey: self.holey || value.holey || outer.holey() || inner.is_some_and(Index::holey),
        })
    }
}
