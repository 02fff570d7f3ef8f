pub mod chunk_serializer;
mod host_object;
mod sable_function;
mod sable_table;
#[allow(clippy::module_inception)]
mod sable_value;

pub use host_object::{HostDecoder, HostObject, TypeKey, TypeObject};
pub use sable_function::{
    Function, FunctionBody, Locals, NativeCallback, NativeFunction, ScopeCell, ScriptFunction,
};
pub use sable_table::SableTable;
pub use sable_value::{ArrayRef, TableRef, Value, ValueKind};
