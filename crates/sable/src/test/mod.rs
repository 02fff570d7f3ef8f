// Test module organization
pub mod test_arithmetic;
pub mod test_bytecode;
pub mod test_control_flow;
pub mod test_coroutine;
pub mod test_errors;
pub mod test_threads;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::ast::builder::block;
use crate::*;

/// A context with the built-in libraries and a `record(value)` global that
/// collects its argument.
pub(crate) struct Harness {
    pub context: Arc<Context>,
    recorded: Arc<Mutex<Vec<Value>>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_option(VmOption::default())
    }

    pub fn with_option(option: VmOption) -> Self {
        let context = Context::new(option);
        context.open_libs();
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = recorded.clone();
        context.register_native("record", 1, move |_, _, args| {
            sink.lock().push(args[0].clone());
            Ok(Value::Nil)
        });
        Harness { context, recorded }
    }

    pub fn compile(&self, statements: Vec<AstNode>) -> SableResult<Arc<Function>> {
        self.compile_with(statements, &CompileOption::default())
    }

    pub fn compile_with(
        &self,
        statements: Vec<AstNode>,
        option: &CompileOption,
    ) -> SableResult<Arc<Function>> {
        self.context.compile(&block(statements), option)
    }

    pub fn run(&self, statements: Vec<AstNode>) -> SableResult<Value> {
        let function = self.compile(statements)?;
        self.context.execute(&function)
    }

    pub fn recorded(&self) -> Vec<Value> {
        self.recorded.lock().clone()
    }

    pub fn recorded_numbers(&self) -> Vec<f64> {
        self.recorded
            .lock()
            .iter()
            .map(|v| v.as_number().unwrap_or(f64::NAN))
            .collect()
    }
}

/// Run a program and expect a number.
pub(crate) fn run_number(statements: Vec<AstNode>) -> f64 {
    let harness = Harness::new();
    match harness.run(statements) {
        Ok(value) => value
            .as_number()
            .unwrap_or_else(|| panic!("expected a number, got {value:?}")),
        Err(e) => panic!("program failed: {e}"),
    }
}

/// Run a program and expect a runtime error.
pub(crate) fn run_runtime_error(harness: &Harness, statements: Vec<AstNode>) -> SableError {
    match harness.run(statements) {
        Ok(value) => panic!("expected an error, got {value:?}"),
        Err(e) => e,
    }
}
