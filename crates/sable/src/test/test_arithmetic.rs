// Tests for arithmetic, logical and unary operators
use super::*;
use crate::ast::builder::*;

#[test]
fn test_precedence_is_tree_shape() {
    // 1 + 2 * 3
    let result = run_number(vec![ret(Some(add(num(1.0), mul(num(2.0), num(3.0)))))]);
    assert_eq!(result, 7.0);
}

#[test]
fn test_float_operators() {
    let cases = [
        (NodeKind::Divide, 7.0, 2.0, 3.5),
        (NodeKind::Modulo, 7.0, 3.0, 1.0),
        (NodeKind::Power, 2.0, 8.0, 256.0),
        (NodeKind::Subtract, 1.5, 4.0, -2.5),
    ];
    for (kind, a, b, expected) in cases {
        let result = run_number(vec![ret(Some(op(kind, num(a), num(b))))]);
        assert_eq!(result, expected, "{kind:?}");
    }
}

#[test]
fn test_compound_assignment() {
    let result = run_number(vec![
        let_("x", num(5.0)),
        compound(NodeKind::Add, ident("x"), num(3.0)),
        compound(NodeKind::Multiply, ident("x"), num(2.0)),
        ret(Some(ident("x"))),
    ]);
    assert_eq!(result, 16.0);
}

#[test]
fn test_unary_operators() {
    assert_eq!(run_number(vec![ret(Some(neg(num(4.0))))]), -4.0);
    assert_eq!(run_number(vec![ret(Some(not(num(0.0))))]), 1.0);
    assert_eq!(run_number(vec![ret(Some(not(num(2.0))))]), 0.0);
    assert_eq!(run_number(vec![ret(Some(not(nil())))]), 1.0);
}

#[test]
fn test_comparisons_yield_one_or_zero() {
    assert_eq!(run_number(vec![ret(Some(lt(num(1.0), num(2.0))))]), 1.0);
    assert_eq!(
        run_number(vec![ret(Some(op(NodeKind::GreaterEqual, num(1.0), num(2.0))))]),
        0.0
    );
    assert_eq!(run_number(vec![ret(Some(eq(num(3.0), num(3.0))))]), 1.0);
    assert_eq!(
        run_number(vec![ret(Some(op(NodeKind::NotEquals, num(3.0), num(3.0))))]),
        0.0
    );
}

#[test]
fn test_and_or_keep_deciding_operand() {
    assert_eq!(run_number(vec![ret(Some(or(nil(), num(4.0))))]), 4.0);
    assert_eq!(run_number(vec![ret(Some(or(num(2.0), num(4.0))))]), 2.0);
    assert_eq!(run_number(vec![ret(Some(and(num(0.0), num(4.0))))]), 0.0);
    assert_eq!(run_number(vec![ret(Some(and(num(1.0), num(4.0))))]), 4.0);
}

#[test]
fn test_and_short_circuits_the_right_operand() {
    let harness = Harness::new();
    harness
        .run(vec![
            and(num(0.0), call(ident("record"), vec![num(1.0)])),
            or(num(1.0), call(ident("record"), vec![num(2.0)])),
            and(num(1.0), call(ident("record"), vec![num(3.0)])),
        ])
        .unwrap();
    assert_eq!(harness.recorded_numbers(), vec![3.0]);
}

#[test]
fn test_number_plus_string_blames_the_string() {
    let harness = Harness::new();
    let err = run_runtime_error(&harness, vec![ret(Some(add(num(1.0), string("a"))))]);
    assert_eq!(
        err.runtime_kind(),
        Some(&RuntimeErrorKind::UnexpectedOperandType {
            operator: "Add",
            type_name: "String".into(),
        })
    );
}

#[test]
fn test_unoptimized_code_computes_the_same() {
    let harness = Harness::new();
    let program = vec![
        let_("a", num(2.0)),
        let_("b", add(ident("a"), num(40.0))),
        num(9.0),
        ret(Some(ident("b"))),
    ];
    let plain = harness
        .compile_with(program.clone(), &CompileOption::default().with_optimize(false))
        .unwrap();
    let optimized = harness.compile(program).unwrap();
    assert!(
        optimized.as_script().unwrap().instructions.len()
            < plain.as_script().unwrap().instructions.len()
    );
    assert_eq!(harness.context.execute(&plain).unwrap().as_number(), Some(42.0));
    assert_eq!(harness.context.execute(&optimized).unwrap().as_number(), Some(42.0));
}
