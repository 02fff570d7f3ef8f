// Sable Runtime
// An embeddable bytecode compiler and stack virtual machine with coroutines,
// OS threads, host-extensible operator dispatch and bytecode persistence.

#[cfg(test)]
mod test;

pub mod ast;
pub mod compiler;
pub mod lib_registry;
pub mod sable_value;
pub mod sable_vm;
pub mod stdlib;

#[cfg(feature = "serde")]
pub mod serde;

pub use ast::{AstNode, Branch, NodeKind, Payload};
pub use lib_registry::LibraryRegistry;
pub use sable_value::{Function, HostObject, SableTable, TypeKey, Value, ValueKind};
pub use sable_vm::{
    BytecodeError, CompileError, CompileErrorKind, CompileOption, Context, Coroutine,
    CoroutineStatus, Instruction, Interpreter, OpCode, RuntimeError, RuntimeErrorKind, SableError,
    SableResult, SourceLocation, TmKind, VmOption,
};
