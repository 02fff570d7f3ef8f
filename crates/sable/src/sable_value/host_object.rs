// Host objects - values whose type lives outside the script language
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;

use super::{Value, ValueKind};
use crate::sable_vm::sable_error::RuntimeErrorKind;

/// Identity of a type in the method registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKey {
    Builtin(ValueKind),
    Host(SmolStr),
}

impl TypeKey {
    pub fn host(name: impl Into<SmolStr>) -> Self {
        TypeKey::Host(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            TypeKey::Builtin(kind) => kind.name(),
            TypeKey::Host(name) => name.as_str(),
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Capabilities a host type can expose to scripts.
///
/// Only `type_name` and `as_any` are required. Indexing answers `None` when
/// the type does not support it at all, so the VM can report a
/// not-indexable error; `Some(Err(..))` is a type-specific failure.
pub trait HostObject: Any + Send + Sync + fmt::Debug {
    /// Name used for method dispatch and error messages.
    fn type_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;

    fn index_get(&self, _key: &Value) -> Option<Result<Value, RuntimeErrorKind>> {
        None
    }

    fn index_set(&self, _key: &Value, _value: Value) -> Option<Result<(), RuntimeErrorKind>> {
        None
    }

    /// Persistent type id and payload, for types that can be written into
    /// bytecode.
    fn encode(&self) -> Option<(u16, Vec<u8>)> {
        None
    }

    fn display(&self) -> String {
        format!("<{}>", self.type_name())
    }
}

/// Decoder turning persisted bytes back into a host object.
pub type HostDecoder = Arc<dyn Fn(&[u8]) -> Result<Value, String> + Send + Sync>;

/// Script-visible handle for a type. Indexing it reads or installs the
/// type's methods in the context's registry.
#[derive(Debug, Clone)]
pub struct TypeObject {
    pub key: TypeKey,
}

impl TypeObject {
    pub fn new(key: TypeKey) -> Self {
        TypeObject { key }
    }
}

impl HostObject for TypeObject {
    fn type_name(&self) -> &str {
        "Type"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn display(&self) -> String {
        format!("<type {}>", self.key)
    }
}
