// Tests for if/else, while, counted loops and break
use super::*;
use crate::ast::builder::*;

fn count_opcode(function: &Function, opcode: OpCode) -> usize {
    function
        .as_script()
        .unwrap()
        .instructions
        .iter()
        .filter(|i| i.opcode == opcode)
        .count()
}

#[test]
fn test_if_else_takes_one_branch() {
    let harness = Harness::new();
    harness
        .run(vec![
            if_else(
                lt(num(1.0), num(2.0)),
                vec![call(ident("record"), vec![num(1.0)])],
                vec![call(ident("record"), vec![num(2.0)])],
            ),
            if_else(
                lt(num(2.0), num(1.0)),
                vec![call(ident("record"), vec![num(3.0)])],
                vec![call(ident("record"), vec![num(4.0)])],
            ),
            if_(nil(), vec![call(ident("record"), vec![num(5.0)])]),
        ])
        .unwrap();
    assert_eq!(harness.recorded_numbers(), vec![1.0, 4.0]);
}

#[test]
fn test_while_sums() {
    let result = run_number(vec![
        let_("i", num(0.0)),
        let_("sum", num(0.0)),
        while_(
            lt(ident("i"), num(5.0)),
            vec![
                set("sum", add(ident("sum"), ident("i"))),
                set("i", add(ident("i"), num(1.0))),
            ],
        ),
        ret(Some(ident("sum"))),
    ]);
    assert_eq!(result, 10.0);
}

#[test]
fn test_break_leaves_only_the_innermost_loop() {
    // while (1) { loop (10) { count += 1; if (count == 3) break; } outer += 1; break; }
    let result = run_number(vec![
        let_("count", num(0.0)),
        let_("outer", num(0.0)),
        while_(
            num(1.0),
            vec![
                loop_(
                    num(10.0),
                    vec![
                        compound(NodeKind::Add, ident("count"), num(1.0)),
                        if_(eq(ident("count"), num(3.0)), vec![break_()]),
                    ],
                ),
                compound(NodeKind::Add, ident("outer"), num(1.0)),
                break_(),
            ],
        ),
        ret(Some(add(mul(ident("outer"), num(100.0)), ident("count")))),
    ]);
    assert_eq!(result, 103.0);
}

#[test]
fn test_break_in_rolled_counted_loop() {
    let harness = Harness::new();
    let program = vec![
        let_("count", num(0.0)),
        loop_(
            num(50.0),
            vec![
                compound(NodeKind::Add, ident("count"), num(1.0)),
                if_(eq(ident("count"), num(7.0)), vec![break_()]),
            ],
        ),
        ret(Some(ident("count"))),
    ];
    let function = harness
        .compile_with(program, &CompileOption::default().with_max_unroll_bytes(0))
        .unwrap();
    assert_eq!(count_opcode(&function, OpCode::CountDown), 1);
    assert_eq!(harness.context.execute(&function).unwrap().as_number(), Some(7.0));
}

#[test]
fn test_small_constant_loop_is_unrolled() {
    let harness = Harness::new();
    let program = vec![
        let_("n", num(0.0)),
        loop_(num(100.0), vec![set("n", add(ident("n"), num(1.0)))]),
        ret(Some(ident("n"))),
    ];

    let unrolled = harness.compile(program.clone()).unwrap();
    assert_eq!(count_opcode(&unrolled, OpCode::CountDown), 0);
    assert_eq!(count_opcode(&unrolled, OpCode::Add), 100);

    let rolled = harness
        .compile_with(program, &CompileOption::default().with_max_unroll_bytes(0))
        .unwrap();
    assert_eq!(count_opcode(&rolled, OpCode::CountDown), 1);
    assert_eq!(count_opcode(&rolled, OpCode::Add), 1);

    assert_eq!(harness.context.execute(&unrolled).unwrap().as_number(), Some(100.0));
    assert_eq!(harness.context.execute(&rolled).unwrap().as_number(), Some(100.0));
}

#[test]
fn test_loop_over_budget_stays_rolled() {
    let harness = Harness::new();
    let program = vec![
        let_("n", num(0.0)),
        loop_(num(1000.0), vec![set("n", add(ident("n"), num(1.0)))]),
        ret(Some(ident("n"))),
    ];
    let function = harness
        .compile_with(program, &CompileOption::default().with_max_unroll_bytes(1024))
        .unwrap();
    assert_eq!(count_opcode(&function, OpCode::CountDown), 1);
    assert_eq!(harness.context.execute(&function).unwrap().as_number(), Some(1000.0));
}

#[test]
fn test_loop_count_from_variable() {
    let result = run_number(vec![
        let_("k", num(4.0)),
        let_("n", num(0.0)),
        loop_(ident("k"), vec![compound(NodeKind::Add, ident("n"), num(2.0))]),
        ret(Some(ident("n"))),
    ]);
    assert_eq!(result, 8.0);
}

#[test]
fn test_zero_count_loop_never_runs() {
    let harness = Harness::new();
    let program = vec![loop_(num(0.0), vec![call(ident("record"), vec![num(1.0)])])];
    for budget in [0, 1024] {
        let function = harness
            .compile_with(
                program.clone(),
                &CompileOption::default().with_max_unroll_bytes(budget),
            )
            .unwrap();
        harness.context.execute(&function).unwrap();
    }
    assert!(harness.recorded_numbers().is_empty());
}

#[test]
fn test_nan_or_negative_count_runs_zero_times() {
    let not_a_number = op(NodeKind::Divide, num(0.0), num(0.0));
    for count in [not_a_number, num(-3.0)] {
        let result = run_number(vec![
            let_("k", count),
            let_("n", num(0.0)),
            loop_(ident("k"), vec![compound(NodeKind::Add, ident("n"), num(1.0))]),
            ret(Some(ident("n"))),
        ]);
        assert_eq!(result, 0.0);
    }
}

#[test]
fn test_return_from_inside_loop() {
    let result = run_number(vec![
        let_("i", num(0.0)),
        while_(
            num(1.0),
            vec![
                set("i", add(ident("i"), num(1.0))),
                if_(eq(ident("i"), num(6.0)), vec![ret(Some(ident("i")))]),
            ],
        ),
    ]);
    assert_eq!(result, 6.0);
}
