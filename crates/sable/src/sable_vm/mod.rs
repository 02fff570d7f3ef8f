// Sable virtual machine
// A Context holds everything interpreters share: globals, per-type method
// tables and host type decoders. Interpreters are created per top-level call,
// per coroutine resume and per spawned thread.
pub mod coroutine;
mod execute;
pub mod interpreter;
pub mod opcode;
pub mod safe_option;
pub mod sable_error;
pub mod sable_limits;
pub mod thread;

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use smol_str::SmolStr;

use crate::ast::AstNode;
use crate::compiler;
use crate::sable_value::chunk_serializer::{self, HostTypes};
use crate::sable_value::{
    Function, HostDecoder, TypeKey, TypeObject, Value, ValueKind,
};
pub use coroutine::{Coroutine, CoroutineStatus};
pub use execute::TmKind;
pub use interpreter::Interpreter;
pub use opcode::{Instruction, OpCode, SourceLocation};
pub use safe_option::{CompileOption, VmOption};
pub use sable_error::{
    BytecodeError, CompileError, CompileErrorKind, RuntimeError, RuntimeErrorKind, SableError,
    SableResult,
};

pub struct Context {
    option: VmOption,
    globals: RwLock<AHashMap<SmolStr, Value>>,
    methods: RwLock<AHashMap<TypeKey, AHashMap<SmolStr, Value>>>,
    host_decoders: RwLock<AHashMap<u16, HostDecoder>>,
}

impl Context {
    pub fn new(option: VmOption) -> Arc<Self> {
        let context = Context {
            option,
            globals: RwLock::new(AHashMap::new()),
            methods: RwLock::new(AHashMap::new()),
            host_decoders: RwLock::new(AHashMap::new()),
        };

        // Type objects for the built-in types
        for kind in ValueKind::BUILTIN {
            context.set_global(
                kind.name(),
                Value::host(TypeObject::new(TypeKey::Builtin(kind))),
            );
        }

        // Calling a coroutine resumes it
        context.register_method(
            TypeKey::Builtin(ValueKind::Coroutine),
            TmKind::Call.name(),
            Value::Function(Function::native("Call", 1, coroutine::resume_callee)),
        );

        Arc::new(context)
    }

    pub fn option(&self) -> &VmOption {
        &self.option
    }

    /// Install the `coroutine` and `thread` libraries.
    pub fn open_libs(self: &Arc<Self>) {
        crate::stdlib::open_libs(self);
    }

    pub fn set_global(&self, name: impl Into<SmolStr>, value: Value) {
        self.globals.write().insert(name.into(), value);
    }

    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.globals.read().get(name).cloned()
    }

    /// Bind a host callback to a global name.
    pub fn register_native<F>(&self, name: &str, min_params: usize, callback: F)
    where
        F: Fn(&mut Interpreter, &SourceLocation, &[Value]) -> SableResult<Value>
            + Send
            + Sync
            + 'static,
    {
        self.set_global(name, Value::Function(Function::native(name, min_params, callback)));
    }

    /// Register a named method (operator or ordinary) for a type.
    pub fn register_method(&self, key: TypeKey, name: impl Into<SmolStr>, method: Value) {
        self.methods
            .write()
            .entry(key)
            .or_default()
            .insert(name.into(), method);
    }

    pub fn get_method(&self, key: &TypeKey, name: &str) -> Option<Value> {
        self.methods.read().get(key)?.get(name).cloned()
    }

    /// Register a host type. Installs its type object as a global and, when
    /// `persistence` is given, the decoder used to load it from bytecode.
    pub fn register_host_type(
        &self,
        name: &str,
        persistence: Option<(u16, HostDecoder)>,
    ) -> Value {
        let type_object = Value::host(TypeObject::new(TypeKey::host(name)));
        self.set_global(name, type_object.clone());
        if let Some((type_id, decoder)) = persistence {
            self.host_decoders.write().insert(type_id, decoder);
        }
        type_object
    }

    pub fn compile(&self, ast: &AstNode, option: &CompileOption) -> SableResult<Arc<Function>> {
        Ok(compiler::compile(ast, option)?)
    }

    /// Run a function to completion on a fresh interpreter.
    pub fn execute(self: &Arc<Self>, function: &Arc<Function>) -> SableResult<Value> {
        Interpreter::new(self.clone()).run_function(function, Vec::new())
    }

    pub fn dump_bytecode(&self, function: &Function) -> SableResult<Vec<u8>> {
        Ok(chunk_serializer::serialize_function(function)?)
    }

    pub fn load_bytecode(&self, bytes: &[u8]) -> SableResult<Arc<Function>> {
        Ok(chunk_serializer::deserialize_function(bytes, self)?)
    }
}

impl HostTypes for Context {
    fn decode_host(&self, type_id: u16, bytes: &[u8]) -> Result<Value, BytecodeError> {
        let decoder = self
            .host_decoders
            .read()
            .get(&type_id)
            .cloned()
            .ok_or(BytecodeError::UnknownHostType(type_id))?;
        decoder(bytes).map_err(BytecodeError::HostDecode)
    }
}
