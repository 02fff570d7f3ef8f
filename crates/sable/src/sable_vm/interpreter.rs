// Interpreter - one operand stack plus a call-frame stack
use std::sync::Arc;

use parking_lot::Mutex;

use super::Context;
use super::opcode::SourceLocation;
use super::sable_error::{RuntimeErrorKind, SableResult};
use crate::sable_value::{Function, Locals, ScriptFunction, Value};

/// Activation record of a script function.
pub struct CallFrame {
    pub(crate) function: Arc<Function>,
    pub(crate) script: Arc<ScriptFunction>,
    pub(crate) pc: usize,
    pub(crate) locals: Locals,
    pub(crate) args: Vec<Value>,
    /// Operand stack height when the frame was entered.
    pub(crate) stack_base: usize,
}

/// Everything a suspended coroutine needs to continue.
pub(crate) struct ResumePoint {
    frames: Vec<CallFrame>,
    stack: Vec<Value>,
}

pub(crate) enum ExecOutcome {
    Returned(Value),
    Yielded(Value),
}

/// Result of starting a call: either a frame was pushed and the run loop
/// continues in it, or the callee was native and already produced a value.
pub(crate) enum Invoked {
    Frame,
    Value(Value),
}

pub struct Interpreter {
    pub(crate) context: Arc<Context>,
    pub(crate) stack: Vec<Value>,
    pub(crate) frames: Vec<CallFrame>,
    /// Set for interpreters driving a coroutine body; enables `Yield`.
    pub(crate) in_coroutine: bool,
    /// Call depth of the interpreter that resumed this one.
    pub(crate) outer_depth: usize,
}

impl Interpreter {
    pub fn new(context: Arc<Context>) -> Self {
        Interpreter {
            context,
            stack: Vec::with_capacity(64),
            frames: Vec::with_capacity(16),
            in_coroutine: false,
            outer_depth: 0,
        }
    }

    pub(crate) fn for_coroutine(context: Arc<Context>, outer_depth: usize) -> Self {
        let mut interpreter = Interpreter::new(context);
        interpreter.in_coroutine = true;
        interpreter.outer_depth = outer_depth;
        interpreter
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// Nested script calls, counting those of the interpreters that
    /// resumed this one.
    pub fn call_depth(&self) -> usize {
        self.outer_depth + self.frames.len()
    }

    /// The script function currently executing, if any.
    pub fn current_function(&self) -> Option<&Arc<Function>> {
        self.frames.last().map(|frame| &frame.function)
    }

    /// Call any callable value and run it to completion.
    ///
    /// On error the interpreter is unwound to the state it had before the
    /// call, so a host can keep using it.
    pub fn call_value(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        location: &SourceLocation,
    ) -> SableResult<Value> {
        let depth = self.frames.len();
        let height = self.stack.len();
        let result = match self.invoke(callee.clone(), args, location) {
            Ok(Invoked::Value(value)) => Ok(value),
            Ok(Invoked::Frame) => match self.execute(depth) {
                Ok(ExecOutcome::Returned(value)) => Ok(value),
                Ok(ExecOutcome::Yielded(_)) => Err(RuntimeErrorKind::YieldAcrossNative.at(location)),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.frames.truncate(depth);
            self.stack.truncate(height);
        }
        result
    }

    pub fn run_function(&mut self, function: &Arc<Function>, args: Vec<Value>) -> SableResult<Value> {
        let file = match function.as_script() {
            Some(script) => script.source_name.clone(),
            None => function.name.clone(),
        };
        let location = SourceLocation::new(file, 0, 0);
        self.call_value(&Value::Function(function.clone()), args, &location)
    }

    /// Enter `function` at instruction 0 and run until it returns or yields.
    pub(crate) fn start(
        &mut self,
        function: &Arc<Function>,
        args: Vec<Value>,
        location: &SourceLocation,
    ) -> SableResult<ExecOutcome> {
        match self.invoke_function(function, args, location)? {
            Invoked::Value(value) => Ok(ExecOutcome::Returned(value)),
            Invoked::Frame => self.execute(0),
        }
    }

    pub(crate) fn push_frame(
        &mut self,
        function: Arc<Function>,
        script: Arc<ScriptFunction>,
        args: Vec<Value>,
        location: &SourceLocation,
    ) -> SableResult<()> {
        let option = self.context.option();
        if self.call_depth() >= option.max_call_depth {
            return Err(RuntimeErrorKind::StackOverflow {
                limit: option.max_call_depth,
            }
            .at(location));
        }
        if self.stack.len() >= option.max_stack_size {
            return Err(RuntimeErrorKind::StackOverflow {
                limit: option.max_stack_size,
            }
            .at(location));
        }

        // Fresh locals for this activation, published to nested closures.
        let locals: Locals = Arc::new(Mutex::new(vec![Value::Nil; script.locals.len()]));
        script.scope.cache(locals.clone());

        self.frames.push(CallFrame {
            function,
            script,
            pc: 0,
            locals,
            args,
            stack_base: self.stack.len(),
        });
        Ok(())
    }

    /// Pop the current frame. Returns the value when control leaves
    /// `base_depth`, otherwise pushes it for the caller.
    pub(crate) fn return_from_frame(&mut self, value: Value, base_depth: usize) -> Option<Value> {
        if let Some(frame) = self.frames.pop() {
            self.stack.truncate(frame.stack_base);
        }
        if self.frames.len() <= base_depth {
            Some(value)
        } else {
            self.stack.push(value);
            None
        }
    }

    pub(crate) fn suspend(&mut self) -> ResumePoint {
        ResumePoint {
            frames: std::mem::take(&mut self.frames),
            stack: std::mem::take(&mut self.stack),
        }
    }

    /// Reinstall a suspended state. Each frame's locals become the visible
    /// activation of its function again.
    pub(crate) fn restore(&mut self, point: ResumePoint) {
        for frame in &point.frames {
            frame.script.scope.cache(frame.locals.clone());
        }
        self.frames = point.frames;
        self.stack = point.stack;
    }

    #[inline(always)]
    pub(crate) fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    #[inline]
    pub(crate) fn pop(&mut self, location: &SourceLocation) -> SableResult<Value> {
        self.stack.pop().ok_or_else(|| stack_underflow(location))
    }

    #[inline]
    pub(crate) fn peek(&self, location: &SourceLocation) -> SableResult<&Value> {
        self.stack.last().ok_or_else(|| stack_underflow(location))
    }

    #[inline]
    pub(crate) fn peek_mut(&mut self, location: &SourceLocation) -> SableResult<&mut Value> {
        self.stack.last_mut().ok_or_else(|| stack_underflow(location))
    }

    /// Pop the top `count` values, in push order.
    pub(crate) fn pop_n(&mut self, count: usize, location: &SourceLocation) -> SableResult<Vec<Value>> {
        if self.stack.len() < count {
            return Err(stack_underflow(location));
        }
        Ok(self.stack.split_off(self.stack.len() - count))
    }

    pub(crate) fn frame_mut(&mut self, location: &SourceLocation) -> SableResult<&mut CallFrame> {
        self.frames.last_mut().ok_or_else(|| {
            RuntimeErrorKind::InvalidInstruction("no active call frame".to_string()).at(location)
        })
    }
}

fn stack_underflow(location: &SourceLocation) -> super::sable_error::SableError {
    RuntimeErrorKind::InvalidInstruction("operand stack underflow".to_string()).at(location)
}
