// Tests for the thread library: spawn, wait and mutexes
use super::*;
use crate::ast::builder::*;
use crate::sable_vm::thread::{self, ThreadHandle};

fn thread_call(name: &str, args: Vec<AstNode>) -> AstNode {
    method_call(ident("thread"), name, args)
}

#[test]
fn test_spawn_and_wait_returns_result() {
    let result = run_number(vec![
        let_(
            "t",
            thread_call(
                "spawn",
                vec![
                    function(&["x"], vec![ret(Some(mul(ident("x"), num(2.0))))]),
                    num(21.0),
                ],
            ),
        ),
        ret(Some(thread_call("wait", vec![ident("t")]))),
    ]);
    assert_eq!(result, 42.0);
}

#[test]
fn test_mutex_guards_shared_global() {
    let worker_body = vec![loop_(
        num(100.0),
        vec![
            thread_call("lock", vec![ident("m")]),
            set("counter", add(ident("counter"), num(1.0))),
            thread_call("unlock", vec![ident("m")]),
        ],
    )];
    let result = run_number(vec![
        set("counter", num(0.0)),
        let_("m", thread_call("mutex", vec![])),
        let_("worker", function(&[], worker_body)),
        let_("a", thread_call("spawn", vec![ident("worker")])),
        let_("b", thread_call("spawn", vec![ident("worker")])),
        thread_call("wait", vec![ident("a")]),
        thread_call("wait", vec![ident("b")]),
        ret(Some(ident("counter"))),
    ]);
    assert_eq!(result, 200.0);
}

#[test]
fn test_wait_with_timeout_returns_nil() {
    let harness = Harness::new();
    harness
        .run(vec![
            let_("m", thread_call("mutex", vec![])),
            thread_call("lock", vec![ident("m")]),
            let_(
                "t",
                thread_call(
                    "spawn",
                    vec![function(
                        &[],
                        vec![
                            thread_call("lock", vec![ident("m")]),
                            thread_call("unlock", vec![ident("m")]),
                            ret(Some(num(1.0))),
                        ],
                    )],
                ),
            ),
            call(
                ident("record"),
                vec![thread_call("wait", vec![ident("t"), num(20.0)])],
            ),
            thread_call("unlock", vec![ident("m")]),
            call(ident("record"), vec![thread_call("wait", vec![ident("t")])]),
        ])
        .unwrap();
    let recorded = harness.recorded();
    assert!(recorded[0].is_nil());
    assert_eq!(recorded[1].as_number(), Some(1.0));
}

#[test]
fn test_lock_and_unlock_report_success() {
    let harness = Harness::new();
    let record = |value: AstNode| call(ident("record"), vec![value]);
    harness
        .run(vec![
            let_("m", thread_call("mutex", vec![])),
            record(thread_call("lock", vec![ident("m")])),
            record(thread_call("lock", vec![ident("m"), num(5.0)])),
            record(thread_call("unlock", vec![ident("m")])),
            record(thread_call("unlock", vec![ident("m")])),
        ])
        .unwrap();
    assert_eq!(harness.recorded_numbers(), vec![1.0, 0.0, 1.0, 0.0]);
}

#[test]
fn test_unbounded_timeouts_wait_forever() {
    let harness = Harness::new();
    let record = |value: AstNode| call(ident("record"), vec![value]);
    let infinity = op(NodeKind::Divide, num(1.0), num(0.0));
    harness
        .run(vec![
            let_(
                "t",
                thread_call("spawn", vec![function(&[], vec![ret(Some(num(7.0)))])]),
            ),
            record(thread_call("wait", vec![ident("t"), infinity])),
            let_("m", thread_call("mutex", vec![])),
            record(thread_call("lock", vec![ident("m"), num(1e300)])),
            record(thread_call("unlock", vec![ident("m")])),
        ])
        .unwrap();
    assert_eq!(harness.recorded_numbers(), vec![7.0, 1.0, 1.0]);
}

#[test]
fn test_thread_error_is_raised_by_wait() {
    let harness = Harness::new();
    let err = run_runtime_error(
        &harness,
        vec![
            let_(
                "t",
                thread_call(
                    "spawn",
                    vec![function(&[], vec![ret(Some(ident("nope")))])],
                ),
            ),
            thread_call("wait", vec![ident("t")]),
        ],
    );
    assert_eq!(
        err.runtime_kind(),
        Some(&RuntimeErrorKind::UndefinedGlobal { name: "nope".into() })
    );
}

#[test]
fn test_wrong_argument_to_wait() {
    let harness = Harness::new();
    let err = run_runtime_error(&harness, vec![thread_call("wait", vec![num(1.0)])]);
    assert_eq!(
        err.runtime_kind(),
        Some(&RuntimeErrorKind::Host(
            "bad argument #1 to 'thread.wait' (Thread expected, got Number)".to_string()
        ))
    );
}

#[test]
fn test_spawn_from_host() {
    let harness = Harness::new();
    let main = harness
        .compile(vec![ret(Some(function(
            &["a", "b"],
            vec![ret(Some(add(ident("a"), ident("b"))))],
        )))])
        .unwrap();
    let callee = harness.context.execute(&main).unwrap();
    let handle: ThreadHandle = thread::spawn(
        &harness.context,
        callee,
        vec![Value::number(2.0), Value::number(3.0)],
        &SourceLocation::default(),
    )
    .unwrap();
    let result = handle.wait(None).unwrap().unwrap();
    assert_eq!(result.as_number(), Some(5.0));
    assert!(handle.is_finished());
    assert!(handle.name().starts_with("sable-"));
}
