// Thread library
// Implements: spawn, wait, mutex, lock, unlock
use std::time::Duration;

use crate::lib_registry::{LibraryModule, bad_argument, get_arg, require_arg};
use crate::sable_value::Value;
use crate::sable_vm::thread::{self, ScriptMutex, ThreadHandle};
use crate::sable_vm::{Interpreter, SableResult, SourceLocation};

pub fn create_thread_lib() -> LibraryModule {
    crate::lib_module!("thread", {
        "spawn" => (thread_spawn, 1),
        "wait" => (thread_wait, 1),
        "mutex" => (thread_mutex, 0),
        "lock" => (thread_lock, 1),
        "unlock" => (thread_unlock, 1),
    })
}

/// Optional timeout argument, in milliseconds. Nil, or a value too large
/// for a `Duration`, means wait forever.
fn timeout_arg(
    args: &[Value],
    index: usize,
    func_name: &str,
    location: &SourceLocation,
) -> SableResult<Option<Duration>> {
    match get_arg(args, index) {
        None | Some(Value::Nil) => Ok(None),
        Some(Value::Number(ms)) => Ok(Duration::try_from_secs_f64(ms.max(0.0) / 1000.0).ok()),
        Some(other) => Err(bad_argument(func_name, index, "Number", other, location)),
    }
}

fn require_mutex<'a>(
    args: &'a [Value],
    func_name: &str,
    location: &SourceLocation,
) -> SableResult<&'a ScriptMutex> {
    let value = require_arg(args, 0, func_name, location)?;
    value
        .as_host::<ScriptMutex>()
        .ok_or_else(|| bad_argument(func_name, 0, "Mutex", value, location))
}

/// thread.spawn(f, ...) - run f(...) on a new OS thread
fn thread_spawn(
    interp: &mut Interpreter,
    location: &SourceLocation,
    args: &[Value],
) -> SableResult<Value> {
    let callee = require_arg(args, 0, "thread.spawn", location)?.clone();
    let context = interp.context().clone();
    let handle = thread::spawn(&context, callee, args[1..].to_vec(), location)?;
    Ok(Value::host(handle))
}

/// thread.wait(t [, timeout_ms]) - the thread's result, or nil on timeout.
/// An error raised by the thread is raised again here.
fn thread_wait(
    _interp: &mut Interpreter,
    location: &SourceLocation,
    args: &[Value],
) -> SableResult<Value> {
    let value = require_arg(args, 0, "thread.wait", location)?;
    let handle = value
        .as_host::<ThreadHandle>()
        .ok_or_else(|| bad_argument("thread.wait", 0, "Thread", value, location))?;
    let timeout = timeout_arg(args, 1, "thread.wait", location)?;
    match handle.wait(timeout) {
        Some(result) => result,
        None => Ok(Value::Nil),
    }
}

/// thread.mutex() - a new unlocked mutex
fn thread_mutex(
    _interp: &mut Interpreter,
    _location: &SourceLocation,
    _args: &[Value],
) -> SableResult<Value> {
    Ok(Value::host(ScriptMutex::new()))
}

/// thread.lock(m [, timeout_ms]) - 1 when acquired, 0 on timeout
fn thread_lock(
    _interp: &mut Interpreter,
    location: &SourceLocation,
    args: &[Value],
) -> SableResult<Value> {
    let mutex = require_mutex(args, "thread.lock", location)?;
    let timeout = timeout_arg(args, 1, "thread.lock", location)?;
    Ok(Value::boolean(mutex.acquire(timeout)))
}

/// thread.unlock(m) - 1 when the mutex was held
fn thread_unlock(
    _interp: &mut Interpreter,
    location: &SourceLocation,
    args: &[Value],
) -> SableResult<Value> {
    let mutex = require_mutex(args, "thread.unlock", location)?;
    Ok(Value::boolean(mutex.release()))
}
