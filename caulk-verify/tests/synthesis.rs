//! End-to-end synthesis scenarios: hole filling from examples, assert-driven
//! constraints, arrays in one and two dimensions, loops under invariants,
//! and the failure taxonomy.

use caulk_ast::{BinOp, Expr, HoleId, ParseTree, Rows, Stmt, lower_stmt};
use caulk_verify::{
    Example, SynthError, SynthOptions, SynthesisSession, mk_true, predicate, synthesize_and_verify,
};
use z3::ast::{Ast, Bool, Int};

fn lits(values: &[i64]) -> Vec<Expr> {
    values.iter().map(|v| Expr::lit(*v)).collect()
}

#[test]
fn fills_a_basic_hole_from_one_example() {
    // x := ??  with Q: x == 8 and {} -> {x: 8}
    let session = SynthesisSession::new();
    let sketch = Stmt::assign("x", Expr::hole());
    let q = predicate(|env| env.int("x")._eq(&Int::from_i64(env.ctx(), 8)));
    let examples = [Example::new().output("x", 8)];

    let result =
        synthesize_and_verify(&session, &sketch, &mk_true(), &q, None, &examples).expect("fill");
    assert!(result.verified);
    assert_eq!(result.assignments.get(&HoleId(0)), Some(&8));
    assert_eq!(result.program, Stmt::assign("x", Expr::lit(8)));
}

#[test]
fn fills_a_hole_guarding_a_conditional() {
    // x := ??; if (y - x) > 10 then z := 5 else z := 6
    let session = SynthesisSession::new();
    let sketch = Stmt::seq(vec![
        Stmt::assign("x", Expr::hole()),
        Stmt::if_else(
            Expr::bin(
                BinOp::Gt,
                Expr::bin(BinOp::Sub, Expr::var("y"), Expr::var("x")),
                Expr::lit(10),
            ),
            Stmt::assign("z", Expr::lit(5)),
            Stmt::assign("z", Expr::lit(6)),
        ),
    ]);
    let q = predicate(|env| {
        let ctx = env.ctx();
        let gap = Int::sub(ctx, &[&env.int("y"), &env.int("x")]);
        let wide = gap.gt(&Int::from_i64(ctx, 10));
        Bool::and(
            ctx,
            &[
                &wide.implies(&env.int("z")._eq(&Int::from_i64(ctx, 5))),
                &wide.not().implies(&env.int("z")._eq(&Int::from_i64(ctx, 6))),
            ],
        )
    });
    let examples = [
        Example::new().input("y", 4).output("z", 6),
        Example::new().input("y", 13).output("z", 6),
        Example::new().input("y", 14).output("z", 5),
        Example::new().input("y", 115).output("z", 5),
    ];

    let result =
        synthesize_and_verify(&session, &sketch, &mk_true(), &q, None, &examples).expect("fill");
    assert!(result.verified);
    // y - x > 10 must hold exactly for y >= 14, so x = 3.
    assert_eq!(result.assignments.get(&HoleId(0)), Some(&3));
}

#[test]
fn fills_holes_in_loop_condition_and_body() {
    // while x < ?? do x := x + ??
    let session = SynthesisSession::new();
    let sketch = Stmt::while_do(
        Expr::bin(BinOp::Lt, Expr::var("x"), Expr::hole()),
        Stmt::assign("x", Expr::bin(BinOp::Add, Expr::var("x"), Expr::hole())),
    );
    let p = predicate(|env| {
        let ctx = env.ctx();
        Bool::and(
            ctx,
            &[
                &env.int("x").gt(&Int::from_i64(ctx, 6)),
                &env.int("x").lt(&Int::from_i64(ctx, 15)),
            ],
        )
    });
    let linv = predicate(|env| env.int("x").le(&Int::from_i64(env.ctx(), 15)));
    let q = predicate(|env| env.int("x").ge(&Int::from_i64(env.ctx(), 15)));
    let examples = [
        Example::new().input("x", 10).output("x", 15),
        Example::new().input("x", 13).output("x", 15),
    ];

    let result =
        synthesize_and_verify(&session, &sketch, &p, &q, Some(linv), &examples).expect("fill");
    assert!(result.verified);
    // Landing exactly on 15 from both 10 and 13 forces a step of 1 and a
    // bound of 15.
    assert_eq!(result.assignments.get(&HoleId(0)), Some(&15));
    assert_eq!(result.assignments.get(&HoleId(1)), Some(&1));
}

#[test]
fn vacuous_hole_assignment_is_rejected_by_the_validity_check() {
    // a := [[1,6,7],[3,4,8]]; x := a[??][??]; assert x = 17
    //
    // No example constrains the holes, so they fill with the theory default
    // (zero); no element of `a` equals 17, and the final check must say no.
    let session = SynthesisSession::new();
    let sketch = Stmt::seq(vec![
        Stmt::array_init(
            "a",
            Rows::Nested(vec![lits(&[1, 6, 7]), lits(&[3, 4, 8])]),
        ),
        Stmt::assign("x", Expr::access2("a", Expr::hole(), Expr::hole())),
        Stmt::Assert(Expr::bin(BinOp::Eq, Expr::var("x"), Expr::lit(17))),
    ]);

    let result =
        synthesize_and_verify(&session, &sketch, &mk_true(), &mk_true(), None, &[]).expect("run");
    assert!(!result.verified);
    assert_eq!(result.assignments.get(&HoleId(0)), Some(&0));
    assert_eq!(result.assignments.get(&HoleId(1)), Some(&0));
}

#[test]
fn unconstrained_hole_zero_fills_and_fails_verification() {
    // x := ??; assert x = 3 with no examples: nothing pins the hole, the
    // model completes it to zero, and verification rejects the result.
    let session = SynthesisSession::new();
    let sketch = Stmt::seq(vec![
        Stmt::assign("x", Expr::hole()),
        Stmt::Assert(Expr::bin(BinOp::Eq, Expr::var("x"), Expr::lit(3))),
    ]);

    let result =
        synthesize_and_verify(&session, &sketch, &mk_true(), &mk_true(), None, &[]).expect("run");
    assert!(!result.verified);
    assert_eq!(result.assignments.get(&HoleId(0)), Some(&0));
}

#[test]
fn contradictory_examples_cannot_be_filled() {
    let session = SynthesisSession::new();
    let sketch = Stmt::assign("x", Expr::hole());
    let examples = [
        Example::new().output("x", 1),
        Example::new().output("x", 2),
    ];
    let err = synthesize_and_verify(&session, &sketch, &mk_true(), &mk_true(), None, &examples)
        .unwrap_err();
    assert_eq!(err, SynthError::Unsat);
}

#[test]
fn hole_flows_through_later_arithmetic() {
    // x := ??; z := x + y with Q: z == x + y
    let session = SynthesisSession::new();
    let sketch = Stmt::seq(vec![
        Stmt::assign("x", Expr::hole()),
        Stmt::assign("z", Expr::bin(BinOp::Add, Expr::var("x"), Expr::var("y"))),
    ]);
    let q = predicate(|env| {
        let ctx = env.ctx();
        env.int("z")
            ._eq(&Int::add(ctx, &[&env.int("x"), &env.int("y")]))
    });
    let examples = [
        Example::new().input("y", 10).output("z", 11),
        Example::new().input("y", 13).output("z", 14),
    ];

    let result =
        synthesize_and_verify(&session, &sketch, &mk_true(), &q, None, &examples).expect("fill");
    assert!(result.verified);
    assert_eq!(result.assignments.get(&HoleId(0)), Some(&1));
}

#[test]
fn array_literal_with_holes_and_assert() {
    // hello := [?? + y, ??]; assert hello[0] = 13; x := hello[1]
    let session = SynthesisSession::new();
    let sketch = Stmt::seq(vec![
        Stmt::array_init(
            "hello",
            Rows::Flat(vec![
                Expr::bin(BinOp::Add, Expr::hole(), Expr::var("y")),
                Expr::hole(),
            ]),
        ),
        Stmt::Assert(Expr::bin(
            BinOp::Eq,
            Expr::access("hello", Expr::lit(0)),
            Expr::lit(13),
        )),
        Stmt::assign("x", Expr::access("hello", Expr::lit(1))),
    ]);
    let p = predicate(|env| env.int("y")._eq(&Int::from_i64(env.ctx(), 10)));
    let examples = [Example::new().input("y", 10).output("x", 4)];

    let result =
        synthesize_and_verify(&session, &sketch, &p, &mk_true(), None, &examples).expect("fill");
    assert!(result.verified);
    assert_eq!(result.assignments.get(&HoleId(0)), Some(&3));
    assert_eq!(result.assignments.get(&HoleId(1)), Some(&4));
}

#[test]
fn bridges_hole_derived_indices_through_the_solver() {
    // a := [9,0,2,4,1]; z := ??; x := 2; b := a[2 + ??]; assert a[z] = 9
    let session = SynthesisSession::new();
    let sketch = Stmt::seq(vec![
        Stmt::array_init("a", Rows::Flat(lits(&[9, 0, 2, 4, 1]))),
        Stmt::assign("z", Expr::hole()),
        Stmt::assign("x", Expr::lit(2)),
        Stmt::assign("b", Expr::access("a", Expr::bin(BinOp::Add, Expr::lit(2), Expr::hole()))),
        Stmt::Assert(Expr::bin(
            BinOp::Eq,
            Expr::access("a", Expr::var("z")),
            Expr::lit(9),
        )),
    ]);
    let q = predicate(|env| {
        let ctx = env.ctx();
        Bool::and(
            ctx,
            &[
                &env.int("b")._eq(&Int::from_i64(ctx, 4)),
                &env.int("x")._eq(&Int::from_i64(ctx, 2)),
            ],
        )
    });
    let examples = [Example::new().output("b", 4).output("x", 2)];

    let result =
        synthesize_and_verify(&session, &sketch, &mk_true(), &q, None, &examples).expect("fill");
    assert!(result.verified);
    // Only a[0] is 9 and only a[3] is 4.
    assert_eq!(result.assignments.get(&HoleId(0)), Some(&0));
    assert_eq!(result.assignments.get(&HoleId(1)), Some(&1));
}

#[test]
fn nested_array_reads_resolve_through_holes() {
    // a := [9,0,2,4,1]; z := ??; x := 2; b := [a[a[z + x]], 1]; y := b[0]
    let session = SynthesisSession::new();
    let sketch = Stmt::seq(vec![
        Stmt::array_init("a", Rows::Flat(lits(&[9, 0, 2, 4, 1]))),
        Stmt::assign("z", Expr::hole()),
        Stmt::assign("x", Expr::lit(2)),
        Stmt::array_init(
            "b",
            Rows::Flat(vec![
                Expr::access(
                    "a",
                    Expr::access("a", Expr::bin(BinOp::Add, Expr::var("z"), Expr::var("x"))),
                ),
                Expr::lit(1),
            ]),
        ),
        Stmt::assign("y", Expr::access("b", Expr::lit(0))),
    ]);
    let q = predicate(|env| env.int("y")._eq(&Int::from_i64(env.ctx(), 1)));
    let examples = [Example::new().output("y", 1)];

    let result =
        synthesize_and_verify(&session, &sketch, &mk_true(), &q, None, &examples).expect("fill");
    assert!(result.verified);
    // y = a[a[z + 2]] must be 1, so a[z + 2] = 4, so z + 2 = 3.
    assert_eq!(result.assignments.get(&HoleId(0)), Some(&1));
}

#[test]
fn two_dimensional_update_with_hole() {
    // arr := [[1,3,5],[4,8,9]]; arr[1][1] := ??; x := arr[1][1]
    let session = SynthesisSession::new();
    let sketch = Stmt::seq(vec![
        Stmt::array_init(
            "arr",
            Rows::Nested(vec![lits(&[1, 3, 5]), lits(&[4, 8, 9])]),
        ),
        Stmt::ArrayUpdate {
            array: "arr".to_string(),
            outer: Expr::lit(1),
            inner: Some(Expr::lit(1)),
            value: Expr::hole(),
        },
        Stmt::assign("x", Expr::access2("arr", Expr::lit(1), Expr::lit(1))),
    ]);
    let q = predicate(|env| env.int("x")._eq(&Int::from_i64(env.ctx(), 2)));
    let examples = [Example::new().output("x", 2)];

    let result =
        synthesize_and_verify(&session, &sketch, &mk_true(), &q, None, &examples).expect("fill");
    assert!(result.verified);
    assert_eq!(result.assignments.get(&HoleId(0)), Some(&2));
}

#[test]
fn mixed_dimension_reads_combine() {
    // arr1 := [[1,3,5],[4,8,9]]; arr2 := [2,7,11]; x := arr1[1][1] + arr2[2]
    let session = SynthesisSession::new();
    let sketch = Stmt::seq(vec![
        Stmt::array_init(
            "arr1",
            Rows::Nested(vec![lits(&[1, 3, 5]), lits(&[4, 8, 9])]),
        ),
        Stmt::array_init("arr2", Rows::Flat(lits(&[2, 7, 11]))),
        Stmt::assign(
            "x",
            Expr::bin(
                BinOp::Add,
                Expr::access2("arr1", Expr::lit(1), Expr::lit(1)),
                Expr::access("arr2", Expr::lit(2)),
            ),
        ),
    ]);
    let q = predicate(|env| env.int("x")._eq(&Int::from_i64(env.ctx(), 19)));

    let result =
        synthesize_and_verify(&session, &sketch, &mk_true(), &q, None, &[]).expect("run");
    assert!(result.verified);
}

#[test]
fn branch_chosen_hole_over_two_dimensional_updates() {
    // a := [[1,6,7],[3,8,9]];
    // if x < ?? then a[0][1] := x else a[1][0] := x;
    // y := a[0][1]; z := a[1][0]
    let session = SynthesisSession::new();
    let sketch = Stmt::seq(vec![
        Stmt::array_init(
            "a",
            Rows::Nested(vec![lits(&[1, 6, 7]), lits(&[3, 8, 9])]),
        ),
        Stmt::if_else(
            Expr::bin(BinOp::Lt, Expr::var("x"), Expr::hole()),
            Stmt::ArrayUpdate {
                array: "a".to_string(),
                outer: Expr::lit(0),
                inner: Some(Expr::lit(1)),
                value: Expr::var("x"),
            },
            Stmt::ArrayUpdate {
                array: "a".to_string(),
                outer: Expr::lit(1),
                inner: Some(Expr::lit(0)),
                value: Expr::var("x"),
            },
        ),
        Stmt::assign("y", Expr::access2("a", Expr::lit(0), Expr::lit(1))),
        Stmt::assign("z", Expr::access2("a", Expr::lit(1), Expr::lit(0))),
    ]);
    let q = predicate(|env| {
        let ctx = env.ctx();
        Bool::or(
            ctx,
            &[
                &env.int("x")._eq(&env.int("y")),
                &env.int("x")._eq(&env.int("z")),
            ],
        )
    });
    let examples = [
        Example::new().input("x", 10).output("y", 10).output("z", 3),
        Example::new().input("x", 11).output("y", 6).output("z", 11),
    ];

    let result =
        synthesize_and_verify(&session, &sketch, &mk_true(), &q, None, &examples).expect("fill");
    assert!(result.verified);
    // x = 10 must take the then branch and x = 11 the else branch.
    assert_eq!(result.assignments.get(&HoleId(0)), Some(&11));
}

#[test]
fn loop_over_array_verifies_under_inductive_invariant() {
    // a := [1,4,5]; x := 0; while x < 3 do (a[x] := a[x] + 1; x := x + 1)
    let session = SynthesisSession::new();
    let sketch = Stmt::seq(vec![
        Stmt::array_init("a", Rows::Flat(lits(&[1, 4, 5]))),
        Stmt::assign("x", Expr::lit(0)),
        Stmt::while_do(
            Expr::bin(BinOp::Lt, Expr::var("x"), Expr::lit(3)),
            Stmt::seq(vec![
                Stmt::ArrayUpdate {
                    array: "a".to_string(),
                    outer: Expr::var("x"),
                    inner: None,
                    value: Expr::bin(
                        BinOp::Add,
                        Expr::access("a", Expr::var("x")),
                        Expr::lit(1),
                    ),
                },
                Stmt::assign("x", Expr::bin(BinOp::Add, Expr::var("x"), Expr::lit(1))),
            ]),
        ),
    ]);
    let linv = predicate(|env| env.int("x").le(&Int::from_i64(env.ctx(), 3)));
    let q = predicate(|env| env.int("x")._eq(&Int::from_i64(env.ctx(), 3)));

    let result =
        synthesize_and_verify(&session, &sketch, &mk_true(), &q, Some(linv), &[]).expect("run");
    assert!(result.verified);
}

#[test]
fn weak_invariant_cannot_prove_the_contract() {
    // Same loop, but Q claims a value the invariant cannot justify.
    let session = SynthesisSession::new();
    let sketch = Stmt::seq(vec![
        Stmt::assign("x", Expr::lit(0)),
        Stmt::while_do(
            Expr::bin(BinOp::Lt, Expr::var("x"), Expr::lit(3)),
            Stmt::assign("x", Expr::bin(BinOp::Add, Expr::var("x"), Expr::lit(1))),
        ),
    ]);
    let linv = mk_true();
    let q = predicate(|env| env.int("x")._eq(&Int::from_i64(env.ctx(), 3)));

    let result =
        synthesize_and_verify(&session, &sketch, &mk_true(), &q, Some(linv), &[]).expect("run");
    assert!(!result.verified);
}

#[test]
fn while_without_invariant_is_a_hard_error() {
    let session = SynthesisSession::new();
    let sketch = Stmt::while_do(
        Expr::bin(BinOp::Lt, Expr::var("x"), Expr::lit(3)),
        Stmt::assign("x", Expr::bin(BinOp::Add, Expr::var("x"), Expr::lit(1))),
    );
    let err = synthesize_and_verify(&session, &sketch, &mk_true(), &mk_true(), None, &[])
        .unwrap_err();
    assert_eq!(err, SynthError::MissingInvariant);
}

#[test]
fn out_of_bounds_concrete_access_aborts() {
    // arr := [15,20,999,4,3]; x := arr[5]
    let session = SynthesisSession::new();
    let sketch = Stmt::seq(vec![
        Stmt::array_init("arr", Rows::Flat(lits(&[15, 20, 999, 4, 3]))),
        Stmt::assign("x", Expr::access("arr", Expr::lit(5))),
    ]);
    let err = synthesize_and_verify(
        &session,
        &sketch,
        &mk_true(),
        &mk_true(),
        Some(mk_true()),
        &[],
    )
    .unwrap_err();
    assert_eq!(err, SynthError::OutOfBounds);
}

#[test]
fn negative_concrete_update_index_aborts() {
    // arr := [15,20,999,4,3]; arr[-2] := 2
    let session = SynthesisSession::new();
    let sketch = Stmt::seq(vec![
        Stmt::array_init("arr", Rows::Flat(lits(&[15, 20, 999, 4, 3]))),
        Stmt::ArrayUpdate {
            array: "arr".to_string(),
            outer: Expr::lit(-2),
            inner: None,
            value: Expr::lit(2),
        },
    ]);
    let err = synthesize_and_verify(
        &session,
        &sketch,
        &mk_true(),
        &mk_true(),
        Some(mk_true()),
        &[],
    )
    .unwrap_err();
    assert_eq!(err, SynthError::OutOfBounds);
}

#[test]
fn ragged_literal_aborts_with_shape_error() {
    // a := [[1,6,7],[3]]
    let session = SynthesisSession::new();
    let sketch = Stmt::array_init("a", Rows::Nested(vec![lits(&[1, 6, 7]), lits(&[3])]));
    let err = synthesize_and_verify(&session, &sketch, &mk_true(), &mk_true(), None, &[])
        .unwrap_err();
    assert_eq!(err, SynthError::InvalidArrayInit);
}

#[test]
fn one_index_into_two_dimensional_array_aborts() {
    // arr := [[2,7],[11,10]]; x := arr[0]
    let session = SynthesisSession::new();
    let sketch = Stmt::seq(vec![
        Stmt::array_init("arr", Rows::Nested(vec![lits(&[2, 7]), lits(&[11, 10])])),
        Stmt::assign("x", Expr::access("arr", Expr::lit(0))),
    ]);
    let err = synthesize_and_verify(&session, &sketch, &mk_true(), &mk_true(), None, &[])
        .unwrap_err();
    assert_eq!(err, SynthError::UnsupportedAccess);
}

#[test]
fn parser_boundary_trees_flow_through_the_pipeline() {
    // The external parser hands over `x := ??` as a tagged tree.
    let tree = ParseTree::new(
        ":=",
        vec![
            ParseTree::new("id", vec![ParseTree::leaf("x")]),
            ParseTree::leaf("hole"),
        ],
    );
    let sketch = lower_stmt(&tree).expect("lower");

    let session = SynthesisSession::new();
    let q = predicate(|env| env.int("x")._eq(&Int::from_i64(env.ctx(), 8)));
    let examples = [Example::new().output("x", 8)];
    let result =
        synthesize_and_verify(&session, &sketch, &mk_true(), &q, None, &examples).expect("fill");
    assert!(result.verified);
    assert_eq!(result.program, Stmt::assign("x", Expr::lit(8)));
}

#[test]
fn unroll_depth_bounds_example_driven_synthesis() {
    // while x < ?? do x := x + 1 with {x:0} -> {x:5} needs five guarded
    // iterations.
    let sketch = Stmt::while_do(
        Expr::bin(BinOp::Lt, Expr::var("x"), Expr::hole()),
        Stmt::assign("x", Expr::bin(BinOp::Add, Expr::var("x"), Expr::lit(1))),
    );
    let examples = [Example::new().input("x", 0).output("x", 5)];

    let short = SynthesisSession::with_options(SynthOptions { unroll_depth: 3 });
    let err = synthesize_and_verify(&short, &sketch, &mk_true(), &mk_true(), None, &examples)
        .unwrap_err();
    assert_eq!(err, SynthError::Unsat);

    let session = SynthesisSession::new();
    let p = predicate(|env| env.int("x")._eq(&Int::from_i64(env.ctx(), 0)));
    let linv = predicate(|env| env.int("x").le(&Int::from_i64(env.ctx(), 5)));
    let q = predicate(|env| env.int("x").ge(&Int::from_i64(env.ctx(), 5)));
    let result = synthesize_and_verify(&session, &sketch, &p, &q, Some(linv), &examples)
        .expect("fill at the default depth");
    assert!(result.verified);
    assert_eq!(result.assignments.get(&HoleId(0)), Some(&5));
}

#[test]
fn sessions_number_holes_independently() {
    let sketch = Stmt::assign("x", Expr::hole());
    let a = SynthesisSession::new();
    let b = SynthesisSession::new();
    let _ = caulk_verify::detect_holes(&a, &sketch);
    let _ = caulk_verify::detect_holes(&a, &sketch);
    let numbered = caulk_verify::detect_holes(&b, &sketch);
    assert_eq!(a.holes_minted(), 2);
    assert_eq!(b.holes_minted(), 1);
    let holes: Vec<_> = caulk_verify::find_holes(&numbered).into_iter().collect();
    assert_eq!(holes, vec![HoleId(0)]);
}
