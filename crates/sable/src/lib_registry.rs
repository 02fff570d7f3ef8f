// Library registration system for built-in script libraries
// A library is a named table of native functions installed as a global.
use std::sync::Arc;

use crate::sable_value::{Function, SableTable, Value};
use crate::sable_vm::{Context, Interpreter, RuntimeErrorKind, SableResult, SourceLocation};

/// Signature of a library function.
pub type CFunction = fn(&mut Interpreter, &SourceLocation, &[Value]) -> SableResult<Value>;

/// Entry in a library module: a function with its minimum argument count.
pub struct LibraryEntry {
    pub function: CFunction,
    pub min_params: usize,
}

/// A library module containing multiple functions
pub struct LibraryModule {
    pub name: &'static str,
    pub entries: Vec<(&'static str, LibraryEntry)>,
}

impl LibraryModule {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Vec::new(),
        }
    }

    pub fn with_function(mut self, name: &'static str, function: CFunction, min_params: usize) -> Self {
        self.entries.push((
            name,
            LibraryEntry {
                function,
                min_params,
            },
        ));
        self
    }
}

/// Builder for creating library modules
///
/// ```ignore
/// lib_module!("coroutine", {
///     "create" => (coroutine_create, 1),
/// })
/// ```
#[macro_export]
macro_rules! lib_module {
    ($name:expr, {
        $($item_name:expr => ($item:expr, $min:expr)),* $(,)?
    }) => {{
        let mut module = $crate::lib_registry::LibraryModule::new($name);
        $(
            module.entries.push((
                $item_name,
                $crate::lib_registry::LibraryEntry { function: $item, min_params: $min },
            ));
        )*
        module
    }};
}

/// Registry for the built-in libraries
pub struct LibraryRegistry {
    modules: Vec<LibraryModule>, // Vec keeps installation order
}

impl LibraryRegistry {
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    pub fn register(&mut self, module: LibraryModule) {
        self.modules.push(module);
    }

    /// Install every registered library into a context.
    pub fn load_all(&self, context: &Arc<Context>) {
        for module in &self.modules {
            self.load_module(context, module);
        }
    }

    /// Install one module as a global table of functions.
    pub fn load_module(&self, context: &Arc<Context>, module: &LibraryModule) {
        let mut table = SableTable::with_capacity(module.entries.len());
        for (name, entry) in &module.entries {
            let qualified = format!("{}.{}", module.name, name);
            let function = entry.function;
            let native = Function::native(qualified, entry.min_params, move |interp, loc, args| {
                function(interp, loc, args)
            });
            table.set(Value::string(*name), Value::Function(native));
        }
        context.set_global(module.name, Value::new_table(table));
    }

    pub fn get_module(&self, name: &str) -> Option<&LibraryModule> {
        self.modules.iter().find(|m| m.name == name)
    }
}

impl Default for LibraryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with every built-in library.
pub fn create_standard_registry() -> LibraryRegistry {
    let mut registry = LibraryRegistry::new();
    registry.register(crate::stdlib::coroutine::create_coroutine_lib());
    registry.register(crate::stdlib::thread::create_thread_lib());
    registry
}

/// Argument `index` (0 based), if supplied.
#[inline(always)]
pub fn get_arg(args: &[Value], index: usize) -> Option<&Value> {
    args.get(index)
}

/// Argument `index` (0 based) or a host error naming the function.
#[inline]
pub fn require_arg<'a>(
    args: &'a [Value],
    index: usize,
    func_name: &str,
    location: &SourceLocation,
) -> SableResult<&'a Value> {
    args.get(index).ok_or_else(|| {
        RuntimeErrorKind::Host(format!("{}() requires argument {}", func_name, index + 1)).at(location)
    })
}

/// Host error for an argument of the wrong type.
pub fn bad_argument(
    func_name: &str,
    index: usize,
    expected: &str,
    found: &Value,
    location: &SourceLocation,
) -> crate::sable_vm::SableError {
    RuntimeErrorKind::Host(format!(
        "bad argument #{} to '{}' ({} expected, got {})",
        index + 1,
        func_name,
        expected,
        found.type_name()
    ))
    .at(location)
}
