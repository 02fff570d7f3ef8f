// Coroutine library
// Implements: create, resume, status

use crate::lib_registry::{LibraryModule, bad_argument, require_arg};
use crate::sable_value::Value;
use crate::sable_vm::{Coroutine, Interpreter, SableResult, SourceLocation};

pub fn create_coroutine_lib() -> LibraryModule {
    crate::lib_module!("coroutine", {
        "create" => (coroutine_create, 1),
        "resume" => (coroutine_resume, 1),
        "status" => (coroutine_status, 1),
    })
}

fn require_coroutine<'a>(
    args: &'a [Value],
    func_name: &str,
    location: &SourceLocation,
) -> SableResult<&'a std::sync::Arc<Coroutine>> {
    match require_arg(args, 0, func_name, location)? {
        Value::Coroutine(coroutine) => Ok(coroutine),
        other => Err(bad_argument(func_name, 0, "Coroutine", other, location)),
    }
}

/// coroutine.create(f) - wrap a function in a new coroutine
fn coroutine_create(
    _interp: &mut Interpreter,
    location: &SourceLocation,
    args: &[Value],
) -> SableResult<Value> {
    match require_arg(args, 0, "coroutine.create", location)? {
        Value::Function(function) => Ok(Value::Coroutine(Coroutine::new(function.clone()))),
        other => Err(bad_argument("coroutine.create", 0, "Function", other, location)),
    }
}

/// coroutine.resume(co, ...) - run until the next yield or return
fn coroutine_resume(
    interp: &mut Interpreter,
    location: &SourceLocation,
    args: &[Value],
) -> SableResult<Value> {
    let coroutine = require_coroutine(args, "coroutine.resume", location)?;
    coroutine.resume_from(interp, args[1..].to_vec(), location)
}

/// coroutine.status(co) - "ready", "running", "yielded" or "stopped"
fn coroutine_status(
    _interp: &mut Interpreter,
    location: &SourceLocation,
    args: &[Value],
) -> SableResult<Value> {
    let coroutine = require_coroutine(args, "coroutine.status", location)?;
    Ok(Value::string(coroutine.status().name()))
}
