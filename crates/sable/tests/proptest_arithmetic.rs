//! Property-based tests for the arithmetic fast path, loop unrolling and
//! value equality.
//!
//! Tests the following properties:
//! - Number operators agree with f64 arithmetic
//! - Optimized and unoptimized code compute the same result
//! - Unrolled and rolled counted loops compute the same result
//! - Sequence equality is reflexive and stricter than identity

use std::sync::Arc;

use proptest::prelude::*;
use sable::ast::builder::*;
use sable::{AstNode, CompileOption, Context, NodeKind, Value, VmOption};

// =============================================================================
// Helpers
// =============================================================================

fn run(statements: Vec<AstNode>, option: &CompileOption) -> Value {
    let context: Arc<Context> = Context::new(VmOption::default());
    let function = context.compile(&block(statements), option).unwrap();
    context.execute(&function).unwrap()
}

fn arb_operand() -> impl Strategy<Value = f64> {
    prop_oneof![
        (-1_000_000i64..1_000_000i64).prop_map(|n| n as f64),
        (-1.0e6f64..1.0e6f64),
    ]
}

fn arb_operator() -> impl Strategy<Value = NodeKind> {
    prop_oneof![
        Just(NodeKind::Add),
        Just(NodeKind::Subtract),
        Just(NodeKind::Multiply),
    ]
}

fn apply(kind: NodeKind, a: f64, b: f64) -> f64 {
    match kind {
        NodeKind::Add => a + b,
        NodeKind::Subtract => a - b,
        _ => a * b,
    }
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A single operator on two numbers matches f64 arithmetic
    #[test]
    fn binary_operator_matches_f64(a in arb_operand(), b in arb_operand(), kind in arb_operator()) {
        let result = run(vec![ret(Some(op(kind, num(a), num(b))))], &CompileOption::default());
        prop_assert_eq!(result.as_number(), Some(apply(kind, a, b)));
    }

    /// Left fold over locals: optimized and plain code agree
    #[test]
    fn optimizer_preserves_results(
        values in prop::collection::vec(arb_operand(), 1..8),
        kinds in prop::collection::vec(arb_operator(), 8),
    ) {
        let mut program = vec![let_("acc", num(values[0]))];
        let mut expected = values[0];
        for (value, kind) in values.iter().skip(1).zip(kinds.iter()) {
            program.push(set("acc", op(*kind, ident("acc"), num(*value))));
            // Discarded expression statement
            program.push(num(*value));
            expected = apply(*kind, expected, *value);
        }
        program.push(ret(Some(ident("acc"))));

        let optimized = run(program.clone(), &CompileOption::default());
        let plain = run(program, &CompileOption::default().with_optimize(false));
        prop_assert_eq!(optimized.as_number(), Some(expected));
        prop_assert_eq!(plain.as_number(), Some(expected));
    }

    /// Counted loops give the same answer whether unrolled or not
    #[test]
    fn unrolling_preserves_results(count in 0usize..40, step in -5i64..5) {
        let program = vec![
            let_("acc", num(1.0)),
            loop_(
                num(count as f64),
                vec![set("acc", add(mul(ident("acc"), num(2.0)), num(step as f64)))],
            ),
            ret(Some(ident("acc"))),
        ];
        let unrolled = run(program.clone(), &CompileOption::default());
        let rolled = run(program, &CompileOption::default().with_max_unroll_bytes(0));
        prop_assert_eq!(unrolled.as_number(), rolled.as_number());
    }

    /// Integral numbers display like integers
    #[test]
    fn integral_display_matches_i64(n in -1_000_000_000i64..1_000_000_000i64) {
        prop_assert_eq!(Value::number(n as f64).to_string(), n.to_string());
    }

    /// An array sequence-equals a copy of itself but is not identical to it
    #[test]
    fn sequence_equality_is_reflexive(items in prop::collection::vec(arb_operand(), 0..10)) {
        let elements: Vec<Value> = items.iter().copied().map(Value::number).collect();
        let a = Value::new_array(elements.clone());
        let b = Value::new_array(elements);
        prop_assert!(a.sequence_equals(&a));
        prop_assert!(a.sequence_equals(&b));
        prop_assert!(!a.equals(&b));
        prop_assert!(a.equals(&a));
    }
}
