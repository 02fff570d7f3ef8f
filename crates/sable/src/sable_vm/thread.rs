// OS threads and the script mutex
// A spawned thread runs a callable on its own interpreter that shares the
// context (globals, method tables) with its parent. Nothing else is
// synchronized; scripts guard shared containers with ScriptMutex.
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use smol_str::SmolStr;
use tracing::debug;

use super::Context;
use super::interpreter::Interpreter;
use super::opcode::SourceLocation;
use super::sable_error::{RuntimeErrorKind, SableResult};
use crate::sable_value::{HostObject, Value};

static THREAD_COUNTER: AtomicUsize = AtomicUsize::new(1);

/// Deadline `timeout` from now. A timeout past the clock's range waits
/// forever.
fn deadline(timeout: Option<Duration>) -> Option<Instant> {
    timeout.and_then(|timeout| Instant::now().checked_add(timeout))
}

#[derive(Debug, Default)]
struct Completion {
    result: Mutex<Option<SableResult<Value>>>,
    finished: Condvar,
}

/// Handle to a spawned script thread.
#[derive(Debug)]
pub struct ThreadHandle {
    name: SmolStr,
    completion: Arc<Completion>,
}

impl ThreadHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.completion.result.lock().is_some()
    }

    /// Block until the thread finishes, or until `timeout` elapses.
    /// `None` means the timeout expired first.
    pub fn wait(&self, timeout: Option<Duration>) -> Option<SableResult<Value>> {
        let mut result = self.completion.result.lock();
        match deadline(timeout) {
            None => {
                while result.is_none() {
                    self.completion.finished.wait(&mut result);
                }
            }
            Some(deadline) => {
                while result.is_none() {
                    if self
                        .completion
                        .finished
                        .wait_until(&mut result, deadline)
                        .timed_out()
                    {
                        break;
                    }
                }
            }
        }
        result.clone()
    }
}

impl HostObject for ThreadHandle {
    fn type_name(&self) -> &str {
        "Thread"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn display(&self) -> String {
        format!("<thread {}>", self.name)
    }
}

/// Run `callee(args)` on a new OS thread.
pub fn spawn(
    context: &Arc<Context>,
    callee: Value,
    args: Vec<Value>,
    location: &SourceLocation,
) -> SableResult<ThreadHandle> {
    let name = SmolStr::new(format!(
        "sable-{}",
        THREAD_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    let completion = Arc::new(Completion::default());

    let thread_context = context.clone();
    let thread_completion = completion.clone();
    let thread_location = location.clone();
    let thread_name = name.clone();
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let mut interpreter = Interpreter::new(thread_context);
            let result = interpreter.call_value(&callee, args, &thread_location);
            debug!(thread = %thread_name, ok = result.is_ok(), "script thread finished");
            *thread_completion.result.lock() = Some(result);
            thread_completion.finished.notify_all();
        })
        .map_err(|e| RuntimeErrorKind::Host(format!("failed to spawn thread: {e}")).at(location))?;

    debug!(thread = %name, "spawned script thread");
    Ok(ThreadHandle { name, completion })
}

/// Mutual exclusion primitive exposed to scripts. Unlike a guard-based
/// lock it is released by an explicit call, possibly from another frame.
#[derive(Debug, Default)]
pub struct ScriptMutex {
    locked: Mutex<bool>,
    released: Condvar,
}

impl ScriptMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire, waiting at most `timeout` when given. Returns whether the
    /// mutex was acquired.
    pub fn acquire(&self, timeout: Option<Duration>) -> bool {
        let mut locked = self.locked.lock();
        match deadline(timeout) {
            None => {
                while *locked {
                    self.released.wait(&mut locked);
                }
            }
            Some(deadline) => {
                while *locked {
                    if self.released.wait_until(&mut locked, deadline).timed_out() && *locked {
                        return false;
                    }
                }
            }
        }
        *locked = true;
        true
    }

    /// Release the mutex. Returns whether it was held.
    pub fn release(&self) -> bool {
        let mut locked = self.locked.lock();
        let was_locked = *locked;
        *locked = false;
        drop(locked);
        self.released.notify_one();
        was_locked
    }

    pub fn is_locked(&self) -> bool {
        *self.locked.lock()
    }
}

impl HostObject for ScriptMutex {
    fn type_name(&self) -> &str {
        "Mutex"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
