// Value - the tagged union every script datum lives in
// Containers are shared handles: cloning a Value never copies an array or a
// table, it produces another alias of the same storage.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::RwLock;
use smol_str::SmolStr;

use super::host_object::{HostObject, TypeKey};
use super::sable_function::Function;
use super::sable_table::SableTable;
use crate::sable_vm::coroutine::Coroutine;
use crate::sable_vm::sable_limits::MAX_INTEGRAL_DISPLAY;

pub type ArrayRef = Arc<RwLock<Vec<Value>>>;
pub type TableRef = Arc<RwLock<SableTable>>;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Number(f64),
    String(SmolStr),
    Array(ArrayRef),
    Table(TableRef),
    Function(Arc<Function>),
    Coroutine(Arc<Coroutine>),
    HostObject(Arc<dyn HostObject>),
}

/// The tag of a value, used for method dispatch and type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Nil,
    Number,
    String,
    Array,
    Table,
    Function,
    Coroutine,
    HostObject,
}

impl ValueKind {
    pub const BUILTIN: [ValueKind; 7] = [
        ValueKind::Nil,
        ValueKind::Number,
        ValueKind::String,
        ValueKind::Array,
        ValueKind::Table,
        ValueKind::Function,
        ValueKind::Coroutine,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Nil => "Nil",
            ValueKind::Number => "Number",
            ValueKind::String => "String",
            ValueKind::Array => "Array",
            ValueKind::Table => "Table",
            ValueKind::Function => "Function",
            ValueKind::Coroutine => "Coroutine",
            ValueKind::HostObject => "HostObject",
        }
    }
}

impl Value {
    #[inline(always)]
    pub fn nil() -> Self {
        Value::Nil
    }

    #[inline(always)]
    pub fn number(n: f64) -> Self {
        Value::Number(n)
    }

    /// Booleans are numbers: 1 for true, 0 for false.
    #[inline(always)]
    pub fn boolean(b: bool) -> Self {
        Value::Number(if b { 1.0 } else { 0.0 })
    }

    pub fn string(s: impl Into<SmolStr>) -> Self {
        Value::String(s.into())
    }

    pub fn new_array(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(RwLock::new(items)))
    }

    pub fn new_table(table: SableTable) -> Self {
        Value::Table(Arc::new(RwLock::new(table)))
    }

    pub fn host(object: impl HostObject) -> Self {
        Value::HostObject(Arc::new(object))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Nil => ValueKind::Nil,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Table(_) => ValueKind::Table,
            Value::Function(_) => ValueKind::Function,
            Value::Coroutine(_) => ValueKind::Coroutine,
            Value::HostObject(_) => ValueKind::HostObject,
        }
    }

    /// Key into the method registry.
    pub fn type_key(&self) -> TypeKey {
        match self {
            Value::HostObject(h) => TypeKey::Host(SmolStr::new(h.type_name())),
            other => TypeKey::Builtin(other.kind()),
        }
    }

    /// Name used in error messages.
    pub fn type_name(&self) -> SmolStr {
        match self {
            Value::HostObject(h) => SmolStr::new(h.type_name()),
            other => SmolStr::new_static(other.kind().name()),
        }
    }

    /// Nil and zero are false, everything else is true.
    #[inline(always)]
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Number(n) => *n != 0.0,
            _ => true,
        }
    }

    #[inline(always)]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    #[inline(always)]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Arc<Function>> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&TableRef> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Downcast a host object to its concrete type.
    pub fn as_host<T: HostObject>(&self) -> Option<&T> {
        match self {
            Value::HostObject(h) => h.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Reference identity for containers, value identity otherwise.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Table(a), Value::Table(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Coroutine(a), Value::Coroutine(b)) => Arc::ptr_eq(a, b),
            (Value::HostObject(a), Value::HostObject(b)) => host_ptr(a) == host_ptr(b),
            _ => false,
        }
    }

    /// Built-in `Equals`: numbers by IEEE value, strings by content,
    /// everything else by identity.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            _ => self.ptr_eq(other),
        }
    }

    /// Structural equality: arrays element by element, tables by key set and
    /// values. Stops at the first mismatch.
    pub fn sequence_equals(&self, other: &Value) -> bool {
        self.sequence_equals_in(other, &mut Vec::new())
    }

    // `comparing` holds the container pairs on the current path; meeting one
    // again means a cycle, which compares equal.
    fn sequence_equals_in(&self, other: &Value, comparing: &mut Vec<(usize, usize)>) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => {
                if Arc::ptr_eq(a, b) {
                    return true;
                }
                let pair = (Arc::as_ptr(a) as usize, Arc::as_ptr(b) as usize);
                if comparing.contains(&pair) {
                    return true;
                }
                let left = a.read().clone();
                let right = b.read().clone();
                comparing.push(pair);
                let equal = left.len() == right.len()
                    && left
                        .iter()
                        .zip(right.iter())
                        .all(|(x, y)| x.sequence_equals_in(y, comparing));
                comparing.pop();
                equal
            }
            (Value::Table(a), Value::Table(b)) => {
                if Arc::ptr_eq(a, b) {
                    return true;
                }
                let pair = (Arc::as_ptr(a) as usize, Arc::as_ptr(b) as usize);
                if comparing.contains(&pair) {
                    return true;
                }
                let left = a.read().clone();
                let right = b.read().clone();
                comparing.push(pair);
                let equal = left.len() == right.len()
                    && left.iter().all(|(key, value)| {
                        right
                            .get(key)
                            .is_some_and(|other| value.sequence_equals_in(other, comparing))
                    });
                comparing.pop();
                equal
            }
            _ => self.equals(other),
        }
    }

    /// String coercion used by `Concat` and display.
    pub fn to_display_string(&self) -> String {
        self.to_string()
    }
}

#[inline]
fn host_ptr(h: &Arc<dyn HostObject>) -> *const () {
    Arc::as_ptr(h) as *const ()
}

#[inline]
fn normalized_bits(n: f64) -> u64 {
    if n == 0.0 { 0 } else { n.to_bits() }
}

// Key semantics for tables: numbers by normalized bits (so 0 and -0 collide
// and NaN can be used as a key), strings by content, containers by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Number(a), Value::Number(b)) => normalized_bits(*a) == normalized_bits(*b),
            (Value::String(a), Value::String(b)) => a == b,
            _ => self.ptr_eq(other),
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Nil => {}
            Value::Number(n) => normalized_bits(*n).hash(state),
            Value::String(s) => s.hash(state),
            Value::Array(a) => (Arc::as_ptr(a) as usize).hash(state),
            Value::Table(t) => (Arc::as_ptr(t) as usize).hash(state),
            Value::Function(f) => (Arc::as_ptr(f) as usize).hash(state),
            Value::Coroutine(c) => (Arc::as_ptr(c) as usize).hash(state),
            Value::HostObject(h) => (host_ptr(h) as usize).hash(state),
        }
    }
}

fn format_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.fract() == 0.0 && n.abs() < MAX_INTEGRAL_DISPLAY {
        let mut buffer = itoa::Buffer::new();
        f.write_str(buffer.format(n as i64))
    } else {
        write!(f, "{}", n)
    }
}

// `printing` holds the containers on the current path; a container that
// contains itself prints as `[...]` or `{...}`.
fn write_value(value: &Value, f: &mut fmt::Formatter<'_>, printing: &mut Vec<usize>) -> fmt::Result {
    match value {
        Value::Nil => f.write_str("nil"),
        Value::Number(n) => format_number(*n, f),
        Value::String(s) => f.write_str(s),
        Value::Array(a) => {
            let ptr = Arc::as_ptr(a) as usize;
            if printing.contains(&ptr) {
                return f.write_str("[...]");
            }
            let items = a.read().clone();
            printing.push(ptr);
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_value(item, f, printing)?;
            }
            printing.pop();
            f.write_str("]")
        }
        Value::Table(t) => {
            let ptr = Arc::as_ptr(t) as usize;
            if printing.contains(&ptr) {
                return f.write_str("{...}");
            }
            let table = t.read().clone();
            printing.push(ptr);
            f.write_str("{")?;
            for (i, (key, item)) in table.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_value(key, f, printing)?;
                f.write_str(": ")?;
                write_value(item, f, printing)?;
            }
            printing.pop();
            f.write_str("}")
        }
        Value::Function(func) => write!(f, "function {}", func.name),
        Value::Coroutine(co) => write!(f, "coroutine {}", co.function().name),
        Value::HostObject(h) => f.write_str(&h.display()),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(self, f, &mut Vec::new())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s.as_str()),
            Value::HostObject(h) => write!(f, "{:?}", h),
            other => write!(f, "{}", other),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(SmolStr::new(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(SmolStr::from(s))
    }
}

impl From<SmolStr> for Value {
    fn from(s: SmolStr) -> Self {
        Value::String(s)
    }
}

impl From<Arc<Function>> for Value {
    fn from(f: Arc<Function>) -> Self {
        Value::Function(f)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::new_array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(Value::Number(-2.0).is_truthy());
        assert!(Value::string("").is_truthy());
        assert!(Value::new_array(vec![]).is_truthy());
    }

    #[test]
    fn test_number_display() {
        assert_eq!(Value::Number(42.0).to_string(), "42");
        assert_eq!(Value::Number(-3.0).to_string(), "-3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(1e20).to_string(), "100000000000000000000");
    }

    #[test]
    fn test_zero_keys_collide() {
        let mut table = SableTable::new();
        table.set(Value::Number(0.0), Value::string("zero"));
        assert_eq!(table.get(&Value::Number(-0.0)), Some(&Value::string("zero")));
    }

    #[test]
    fn test_array_display() {
        let array = Value::new_array(vec![1.0.into(), "x".into(), Value::Nil]);
        assert_eq!(array.to_string(), "[1, x, nil]");
    }

    #[test]
    fn test_self_containing_containers_display() {
        let array = Value::new_array(vec![1.0.into()]);
        array.as_array().unwrap().write().push(array.clone());
        assert_eq!(array.to_string(), "[1, [...]]");

        let table = Value::new_table(SableTable::new());
        table
            .as_table()
            .unwrap()
            .write()
            .set(Value::string("self"), table.clone());
        assert_eq!(table.to_string(), "{self: {...}}");
    }

    #[test]
    fn test_sequence_equals_on_cycles() {
        let cyclic = |head: f64| {
            let array = Value::new_array(vec![head.into()]);
            array.as_array().unwrap().write().push(array.clone());
            array
        };
        assert!(cyclic(1.0).sequence_equals(&cyclic(1.0)));
        assert!(!cyclic(1.0).sequence_equals(&cyclic(2.0)));
    }
}
