// Tests for compile-time and runtime error reporting
use super::*;
use crate::ast::builder::*;

fn compile_error(statements: Vec<AstNode>) -> CompileErrorKind {
    let harness = Harness::new();
    match harness.compile(statements) {
        Ok(_) => panic!("expected a compile error"),
        Err(e) => e
            .compile_kind()
            .cloned()
            .unwrap_or_else(|| panic!("expected a compile error, got {e}")),
    }
}

#[test]
fn test_missing_arguments_reported_at_call_site() {
    let harness = Harness::new();
    let err = run_runtime_error(
        &harness,
        vec![
            let_(
                "f",
                function(&["a", "b"], vec![ret(Some(ident("a")))]).at(2, 1),
            ),
            call(ident("f"), vec![num(1.0)]).at(7, 3),
        ],
    );
    assert_eq!(
        err.runtime_kind(),
        Some(&RuntimeErrorKind::NotEnoughArguments {
            function: "f".into(),
            expected: 2,
            actual: 1,
        })
    );
    let location = err.location().unwrap();
    assert_eq!((location.line, location.column), (7, 3));
    assert_eq!(
        err.to_string(),
        "script:7:3: function 'f' expects 2 argument(s), got 1"
    );
}

#[test]
fn test_break_outside_loop() {
    assert_eq!(compile_error(vec![break_()]), CompileErrorKind::BreakOutsideLoop);
    // A function body does not inherit the loop it is defined in
    assert_eq!(
        compile_error(vec![while_(
            num(1.0),
            vec![let_("f", function(&[], vec![break_()]))],
        )]),
        CompileErrorKind::BreakOutsideLoop
    );
}

#[test]
fn test_condition_arity() {
    let two_conditions = AstNode::new(NodeKind::If, SourceLocation::new("script", 3, 1))
        .with_payload(Payload::List(vec![num(1.0), num(2.0)]))
        .with_branch(Branch::Body, block(vec![]));
    assert_eq!(
        compile_error(vec![two_conditions]),
        CompileErrorKind::ConditionArity {
            construct: "if",
            count: 2,
        }
    );

    let no_condition = AstNode::new(NodeKind::While, SourceLocation::new("script", 4, 1))
        .with_branch(Branch::Body, block(vec![]));
    assert_eq!(
        compile_error(vec![no_condition]),
        CompileErrorKind::ConditionArity {
            construct: "while",
            count: 0,
        }
    );
}

#[test]
fn test_control_flow_in_expression_position() {
    let kind = compile_error(vec![ret(Some(if_(num(1.0), vec![])))]);
    assert_eq!(kind, CompileErrorKind::ControlFlowNotAllowed { construct: "if" });
}

#[test]
fn test_break_as_call_argument() {
    let kind = compile_error(vec![while_(
        num(1.0),
        vec![call(ident("record"), vec![break_()])],
    )]);
    assert_eq!(kind, CompileErrorKind::ControlFlowNotAllowed { construct: "break" });
}

#[test]
fn test_missing_branch() {
    let broken = AstNode::new(NodeKind::Add, SourceLocation::new("script", 1, 1))
        .with_branch(Branch::Left, num(1.0));
    assert_eq!(
        compile_error(vec![ret(Some(broken))]),
        CompileErrorKind::MissingBranch {
            node: NodeKind::Add,
            branch: Branch::Right,
        }
    );
}

#[test]
fn test_not_indexable() {
    let harness = Harness::new();
    let err = run_runtime_error(&harness, vec![ret(Some(index(num(1.0), num(0.0))))]);
    assert_eq!(
        err.runtime_kind(),
        Some(&RuntimeErrorKind::NotIndexable {
            type_name: "Number".into(),
        })
    );
}

#[test]
fn test_index_out_of_range() {
    let harness = Harness::new();
    let err = run_runtime_error(
        &harness,
        vec![ret(Some(index(array(vec![num(1.0), num(2.0)]), num(2.0))))],
    );
    assert_eq!(
        err.runtime_kind(),
        Some(&RuntimeErrorKind::IndexOutOfRange {
            index: 2.0,
            length: 2,
        })
    );
}

#[test]
fn test_undefined_global() {
    let harness = Harness::new();
    let err = run_runtime_error(&harness, vec![ret(Some(ident("missing").at(5, 9)))]);
    assert_eq!(
        err.runtime_kind(),
        Some(&RuntimeErrorKind::UndefinedGlobal {
            name: "missing".into(),
        })
    );
    assert_eq!(err.location().map(|l| l.line), Some(5));
}

#[test]
fn test_calling_a_number() {
    let harness = Harness::new();
    let err = run_runtime_error(&harness, vec![call(num(3.0), vec![])]);
    assert_eq!(
        err.runtime_kind(),
        Some(&RuntimeErrorKind::NotCallable {
            type_name: "Number".into(),
        })
    );
}

#[test]
fn test_unbounded_recursion_hits_depth_limit() {
    let harness = Harness::with_option(VmOption {
        max_call_depth: 50,
        ..VmOption::default()
    });
    let err = run_runtime_error(
        &harness,
        vec![
            let_("f", function(&[], vec![ret(Some(call(ident("f"), vec![])))])),
            call(ident("f"), vec![]),
        ],
    );
    assert_eq!(
        err.runtime_kind(),
        Some(&RuntimeErrorKind::StackOverflow { limit: 50 })
    );
}

#[test]
fn test_recursion_through_coroutines_hits_depth_limit() {
    let harness = Harness::with_option(VmOption {
        max_call_depth: 40,
        ..VmOption::default()
    });
    let create = method_call(ident("coroutine"), "create", vec![ident("f")]);
    let programs = [
        // f = function() { coroutine.resume(coroutine.create(f)) }
        method_call(ident("coroutine"), "resume", vec![create.clone()]),
        // f = function() { coroutine.create(f)() }
        call(create, vec![]),
    ];
    for body in programs {
        let err = run_runtime_error(
            &harness,
            vec![
                let_("f", function(&[], vec![body])),
                call(ident("f"), vec![]),
            ],
        );
        assert_eq!(
            err.runtime_kind(),
            Some(&RuntimeErrorKind::StackOverflow { limit: 40 })
        );
    }
}

#[test]
fn test_interpreter_usable_after_error() {
    let harness = Harness::new();
    let failing = harness
        .compile(vec![ret(Some(ident("not_defined")))])
        .unwrap();
    let working = harness.compile(vec![ret(Some(num(1.0)))]).unwrap();

    let mut interpreter = Interpreter::new(harness.context.clone());
    assert!(interpreter.run_function(&failing, Vec::new()).is_err());
    assert_eq!(interpreter.call_depth(), 0);
    let value = interpreter.run_function(&working, Vec::new()).unwrap();
    assert_eq!(value.as_number(), Some(1.0));
}

#[test]
fn test_native_error_propagates() {
    let harness = Harness::new();
    harness.context.register_native("fail", 0, |_, location, _| {
        Err(RuntimeErrorKind::Host("boom".to_string()).at(location))
    });
    let err = run_runtime_error(&harness, vec![call(ident("fail"), vec![]).at(3, 2)]);
    assert_eq!(err.to_string(), "script:3:2: boom");
}
