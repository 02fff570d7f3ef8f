// Coroutines - resumable script functions
// A suspended coroutine keeps its frames and operand stack in a ResumePoint;
// every resume installs them in a fresh interpreter on the calling thread.
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::Context;
use super::interpreter::{ExecOutcome, Interpreter, ResumePoint};
use super::opcode::SourceLocation;
use super::sable_error::{RuntimeErrorKind, SableResult};
use crate::sable_value::{Function, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoroutineStatus {
    /// Not started, or about to be started again.
    Ready,
    /// A resume is executing the body.
    Running,
    /// Suspended at a yield.
    Yielded,
    /// Returned or failed; the next resume starts over.
    Stopped,
}

impl CoroutineStatus {
    pub fn name(self) -> &'static str {
        match self {
            CoroutineStatus::Ready => "ready",
            CoroutineStatus::Running => "running",
            CoroutineStatus::Yielded => "yielded",
            CoroutineStatus::Stopped => "stopped",
        }
    }
}

struct CoroutineState {
    status: CoroutineStatus,
    paused: Option<ResumePoint>,
}

pub struct Coroutine {
    function: Arc<Function>,
    state: Mutex<CoroutineState>,
}

impl Coroutine {
    pub fn new(function: Arc<Function>) -> Arc<Self> {
        Arc::new(Coroutine {
            function,
            state: Mutex::new(CoroutineState {
                status: CoroutineStatus::Ready,
                paused: None,
            }),
        })
    }

    pub fn function(&self) -> &Arc<Function> {
        &self.function
    }

    pub fn status(&self) -> CoroutineStatus {
        // The state lock is held for the whole of a resume.
        match self.state.try_lock() {
            Some(state) => state.status,
            None => CoroutineStatus::Running,
        }
    }

    /// Run the body until its next yield or its return.
    ///
    /// A `Ready` or `Stopped` coroutine starts at the first instruction with
    /// `args`; a `Yielded` one continues where it stopped and ignores `args`.
    pub fn resume(
        &self,
        context: &Arc<Context>,
        args: Vec<Value>,
        location: &SourceLocation,
    ) -> SableResult<Value> {
        self.resume_at(context, 0, args, location)
    }

    /// Resume from inside a running script. The body's calls count toward
    /// the caller's depth limit.
    pub(crate) fn resume_from(
        &self,
        caller: &Interpreter,
        args: Vec<Value>,
        location: &SourceLocation,
    ) -> SableResult<Value> {
        let context = caller.context().clone();
        self.resume_at(&context, caller.call_depth(), args, location)
    }

    fn resume_at(
        &self,
        context: &Arc<Context>,
        outer_depth: usize,
        args: Vec<Value>,
        location: &SourceLocation,
    ) -> SableResult<Value> {
        let Some(mut state) = self.state.try_lock() else {
            return Err(RuntimeErrorKind::CoroutineRunning.at(location));
        };

        let previous = state.status;
        state.status = CoroutineStatus::Running;
        trace!(function = %self.function.name, from = previous.name(), "resuming coroutine");

        let mut interpreter = Interpreter::for_coroutine(context.clone(), outer_depth);
        let outcome = match (previous, state.paused.take()) {
            (CoroutineStatus::Yielded, Some(point)) => {
                interpreter.restore(point);
                // The yield expression evaluates to nil
                interpreter.push(Value::Nil);
                interpreter.execute(0)
            }
            _ => interpreter.start(&self.function, args, location),
        };

        let result = match outcome {
            Ok(ExecOutcome::Yielded(value)) => {
                state.paused = Some(interpreter.suspend());
                state.status = CoroutineStatus::Yielded;
                Ok(value)
            }
            Ok(ExecOutcome::Returned(value)) => {
                state.status = CoroutineStatus::Stopped;
                Ok(value)
            }
            Err(e) => {
                state.status = CoroutineStatus::Stopped;
                Err(e)
            }
        };
        trace!(function = %self.function.name, to = state.status.name(), "coroutine suspended");
        result
    }
}

impl fmt::Debug for Coroutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coroutine")
            .field("function", &self.function.name)
            .field("status", &self.status())
            .finish()
    }
}

/// `Call` method of the Coroutine type: calling a coroutine resumes it.
pub(crate) fn resume_callee(
    interpreter: &mut Interpreter,
    location: &SourceLocation,
    args: &[Value],
) -> SableResult<Value> {
    match args.first() {
        Some(Value::Coroutine(coroutine)) => {
            coroutine.resume_from(interpreter, args[1..].to_vec(), location)
        }
        other => Err(RuntimeErrorKind::UnexpectedOperandType {
            operator: "Call",
            type_name: other.map(Value::type_name).unwrap_or_else(|| "Nil".into()),
        }
        .at(location)),
    }
}
