// Tests for coroutine library functions
use super::*;
use crate::ast::builder::*;

fn resume(co: &str) -> AstNode {
    method_call(ident("coroutine"), "resume", vec![ident(co)])
}

fn status(co: &str) -> AstNode {
    method_call(ident("coroutine"), "status", vec![ident(co)])
}

fn create(body: Vec<AstNode>) -> AstNode {
    method_call(ident("coroutine"), "create", vec![function(&[], body)])
}

#[test]
fn test_four_resumes_start_over_after_return() {
    let harness = Harness::new();
    harness
        .run(vec![
            let_(
                "co",
                create(vec![
                    yield_(Some(num(1.0))),
                    yield_(Some(num(2.0))),
                    ret(Some(num(3.0))),
                ]),
            ),
            call(ident("record"), vec![resume("co")]),
            call(ident("record"), vec![resume("co")]),
            call(ident("record"), vec![resume("co")]),
            call(ident("record"), vec![resume("co")]),
        ])
        .unwrap();
    assert_eq!(harness.recorded_numbers(), vec![1.0, 2.0, 3.0, 1.0]);
}

#[test]
fn test_status_transitions() {
    let harness = Harness::new();
    harness
        .run(vec![
            let_("co", create(vec![yield_(None)])),
            call(ident("record"), vec![status("co")]),
            resume("co"),
            call(ident("record"), vec![status("co")]),
            resume("co"),
            call(ident("record"), vec![status("co")]),
        ])
        .unwrap();
    let statuses: Vec<String> = harness
        .recorded()
        .iter()
        .map(|v| v.to_display_string())
        .collect();
    assert_eq!(statuses, vec!["ready", "yielded", "stopped"]);
}

#[test]
fn test_locals_survive_suspension() {
    let harness = Harness::new();
    harness
        .run(vec![
            let_(
                "co",
                create(vec![
                    let_("i", num(0.0)),
                    while_(
                        num(1.0),
                        vec![
                            set("i", add(ident("i"), num(1.0))),
                            yield_(Some(mul(ident("i"), num(10.0)))),
                        ],
                    ),
                ]),
            ),
            loop_(num(3.0), vec![call(ident("record"), vec![resume("co")])]),
        ])
        .unwrap();
    assert_eq!(harness.recorded_numbers(), vec![10.0, 20.0, 30.0]);
}

#[test]
fn test_yield_inside_nested_script_call() {
    // The body calls a helper that yields; the whole chain suspends.
    let harness = Harness::new();
    harness
        .run(vec![
            let_(
                "helper",
                function(&["x"], vec![yield_(Some(ident("x"))), ret(Some(num(0.0)))]),
            ),
            let_(
                "co",
                create(vec![
                    call(ident("helper"), vec![num(7.0)]),
                    call(ident("helper"), vec![num(8.0)]),
                    ret(Some(num(9.0))),
                ]),
            ),
            loop_(num(3.0), vec![call(ident("record"), vec![resume("co")])]),
        ])
        .unwrap();
    assert_eq!(harness.recorded_numbers(), vec![7.0, 8.0, 9.0]);
}

#[test]
fn test_calling_a_coroutine_resumes_it() {
    let harness = Harness::new();
    harness
        .run(vec![
            let_("co", create(vec![yield_(Some(num(5.0))), ret(Some(num(6.0)))])),
            call(ident("record"), vec![call(ident("co"), vec![])]),
            call(ident("record"), vec![call(ident("co"), vec![])]),
        ])
        .unwrap();
    assert_eq!(harness.recorded_numbers(), vec![5.0, 6.0]);
}

#[test]
fn test_yield_outside_coroutine_is_an_error() {
    let harness = Harness::new();
    let err = run_runtime_error(&harness, vec![yield_(Some(num(1.0)))]);
    assert_eq!(
        err.runtime_kind(),
        Some(&RuntimeErrorKind::YieldOutsideCoroutine)
    );
}

#[test]
fn test_resuming_a_running_coroutine_fails() {
    let harness = Harness::new();
    let err = run_runtime_error(
        &harness,
        vec![
            let_("co", create(vec![resume("co")])),
            resume("co"),
        ],
    );
    assert_eq!(err.runtime_kind(), Some(&RuntimeErrorKind::CoroutineRunning));
}

#[test]
fn test_coroutine_api_from_host() {
    let harness = Harness::new();
    let main = harness
        .compile(vec![ret(Some(function(
            &["start"],
            vec![
                yield_(Some(ident("start"))),
                ret(Some(add(ident("start"), num(1.0)))),
            ],
        )))])
        .unwrap();
    let body = harness.context.execute(&main).unwrap();
    let coroutine = Coroutine::new(body.as_function().unwrap().clone());
    let location = SourceLocation::default();

    assert_eq!(coroutine.status(), CoroutineStatus::Ready);
    let first = coroutine
        .resume(&harness.context, vec![Value::number(10.0)], &location)
        .unwrap();
    assert_eq!(first.as_number(), Some(10.0));
    assert_eq!(coroutine.status(), CoroutineStatus::Yielded);

    // Arguments to a continuing resume are ignored
    let second = coroutine
        .resume(&harness.context, vec![Value::number(99.0)], &location)
        .unwrap();
    assert_eq!(second.as_number(), Some(11.0));
    assert_eq!(coroutine.status(), CoroutineStatus::Stopped);
}
