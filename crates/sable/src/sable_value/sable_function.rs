// Functions: compiled script functions and host (native) callbacks
use std::fmt::{self, Write as _};
use std::sync::Arc;

use parking_lot::Mutex;
use smol_str::SmolStr;

use super::Value;
use crate::sable_vm::interpreter::Interpreter;
use crate::sable_vm::opcode::{Instruction, SourceLocation};
use crate::sable_vm::sable_error::SableResult;

/// One activation's locals array.
pub type Locals = Arc<Mutex<Vec<Value>>>;

/// Host callback: `(interpreter, call-site location, arguments) -> Value`.
pub type NativeCallback =
    Arc<dyn Fn(&mut Interpreter, &SourceLocation, &[Value]) -> SableResult<Value> + Send + Sync>;

/// Holds the locals array of the most recent activation of a script
/// function. Nested functions reach enclosing variables through this cell,
/// so re-entrant activations of the same function share what they see.
#[derive(Debug, Default)]
pub struct ScopeCell {
    cached: Mutex<Option<Locals>>,
}

impl ScopeCell {
    pub fn new() -> Arc<Self> {
        Arc::new(ScopeCell::default())
    }

    #[inline]
    pub fn cache(&self, locals: Locals) {
        *self.cached.lock() = Some(locals);
    }

    #[inline]
    pub fn cached(&self) -> Option<Locals> {
        self.cached.lock().clone()
    }
}

pub struct ScriptFunction {
    pub source_name: SmolStr,
    pub instructions: Vec<Instruction>,
    pub params: Vec<SmolStr>,
    pub locals: Vec<SmolStr>,
    /// This function's scope cell.
    pub scope: Arc<ScopeCell>,
    /// Scope cells of the lexically enclosing functions, nearest first.
    pub enclosing: Vec<Arc<ScopeCell>>,
}

pub struct NativeFunction {
    pub min_params: usize,
    pub callback: NativeCallback,
}

pub enum FunctionBody {
    Script(Arc<ScriptFunction>),
    Native(NativeFunction),
}

pub struct Function {
    pub name: SmolStr,
    pub body: FunctionBody,
}

impl Function {
    pub fn script(name: impl Into<SmolStr>, script: ScriptFunction) -> Arc<Self> {
        Arc::new(Function {
            name: name.into(),
            body: FunctionBody::Script(Arc::new(script)),
        })
    }

    pub fn native<F>(name: impl Into<SmolStr>, min_params: usize, callback: F) -> Arc<Self>
    where
        F: Fn(&mut Interpreter, &SourceLocation, &[Value]) -> SableResult<Value>
            + Send
            + Sync
            + 'static,
    {
        Arc::new(Function {
            name: name.into(),
            body: FunctionBody::Native(NativeFunction {
                min_params,
                callback: Arc::new(callback),
            }),
        })
    }

    pub fn as_script(&self) -> Option<&Arc<ScriptFunction>> {
        match &self.body {
            FunctionBody::Script(script) => Some(script),
            FunctionBody::Native(_) => None,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self.body, FunctionBody::Native(_))
    }

    /// Minimum number of arguments a call must supply.
    pub fn required_args(&self) -> usize {
        match &self.body {
            FunctionBody::Script(script) => script.params.len(),
            FunctionBody::Native(native) => native.min_params,
        }
    }

    /// Human readable listing of this function and every nested function.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        self.disassemble_into(&mut out, 0);
        out
    }

    fn disassemble_into(&self, out: &mut String, indent: usize) {
        let pad = "  ".repeat(indent);
        let Some(script) = self.as_script() else {
            let _ = writeln!(out, "{pad}native function {}", self.name);
            return;
        };
        let _ = writeln!(
            out,
            "{pad}function {} ({}) params: [{}] locals: [{}]",
            self.name,
            script.source_name,
            script.params.join(", "),
            script.locals.join(", ")
        );
        for (index, instruction) in script.instructions.iter().enumerate() {
            let _ = write!(
                out,
                "{pad}  {index:04} {:>4}:{:<3} {instruction}",
                instruction.location.line, instruction.location.column
            );
            if let Some(target) = instruction.jump_target(index) {
                let _ = write!(out, " -> {target:04}");
            }
            out.push('\n');
        }
        for instruction in &script.instructions {
            if let Value::Function(nested) = &instruction.operand {
                nested.disassemble_into(out, indent + 1);
            }
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            FunctionBody::Script(script) => f
                .debug_struct("Function")
                .field("name", &self.name)
                .field("params", &script.params)
                .field("locals", &script.locals)
                .field("instructions", &script.instructions.len())
                .finish(),
            FunctionBody::Native(native) => f
                .debug_struct("NativeFunction")
                .field("name", &self.name)
                .field("min_params", &native.min_params)
                .finish(),
        }
    }
}
