// Sable bytecode compiler - Main module
// Compiles a desugared AST into stack-machine bytecode, one Compiler per
// function literal.
mod code;
mod expr;
pub mod optimizer;
mod stmt;

use std::sync::Arc;

use smol_str::SmolStr;
use tracing::debug;

use crate::ast::{AstNode, NodeKind};
use crate::sable_value::{Function, ScopeCell, ScriptFunction};
use crate::sable_vm::opcode::{Instruction, OpCode, SourceLocation};
use crate::sable_vm::safe_option::CompileOption;
use crate::sable_vm::sable_error::{CompileError, CompileErrorKind};
use crate::sable_vm::sable_limits::LOCAL_SCOPE_STRIDE;

pub(crate) type CompileResult<T> = Result<T, CompileError>;

/// Locals of one lexically enclosing function, as visible when the nested
/// function literal was compiled.
#[derive(Clone)]
pub(crate) struct OuterScope {
    pub names: Vec<SmolStr>,
    pub cell: Arc<ScopeCell>,
}

/// Where an identifier lives.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Binding {
    Argument(usize),
    /// Packed `depth * LOCAL_SCOPE_STRIDE + slot`.
    Local(usize),
    Global(SmolStr),
}

/// Compiler state for one function
pub struct Compiler<'a> {
    pub(crate) option: &'a CompileOption,
    pub(crate) name: SmolStr,
    pub(crate) code: Vec<Instruction>,
    pub(crate) params: Vec<SmolStr>,
    pub(crate) locals: Vec<SmolStr>,
    pub(crate) scope: Arc<ScopeCell>,
    /// Enclosing functions, nearest first.
    pub(crate) outer: Vec<OuterScope>,
    /// Number of loops enclosing the current position.
    pub(crate) loop_depth: usize,
    pub(crate) location: SourceLocation,
}

/// Compile a top-level program into its main function.
pub fn compile(ast: &AstNode, option: &CompileOption) -> Result<Arc<Function>, CompileError> {
    let mut c = Compiler::new(option, "main", Vec::new(), Vec::new(), ast.location.clone());
    stmt::compile_statement(&mut c, ast)?;
    c.finish()
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(
        option: &'a CompileOption,
        name: impl Into<SmolStr>,
        params: Vec<SmolStr>,
        outer: Vec<OuterScope>,
        location: SourceLocation,
    ) -> Self {
        Compiler {
            option,
            name: name.into(),
            code: Vec::new(),
            params,
            locals: Vec::new(),
            scope: ScopeCell::new(),
            outer,
            loop_depth: 0,
            location,
        }
    }

    /// Compiler for a function literal nested in this one.
    pub(crate) fn child(
        &self,
        name: SmolStr,
        params: Vec<SmolStr>,
        location: SourceLocation,
    ) -> Compiler<'a> {
        let mut outer = Vec::with_capacity(self.outer.len() + 1);
        outer.push(OuterScope {
            names: self.locals.clone(),
            cell: self.scope.clone(),
        });
        outer.extend(self.outer.iter().cloned());
        Compiler::new(self.option, name, params, outer, location)
    }

    /// Resolve an identifier: parameters, then locals from the innermost
    /// function outward, then globals.
    pub(crate) fn resolve(&self, name: &str) -> Binding {
        if let Some(slot) = self.params.iter().position(|p| p == name) {
            return Binding::Argument(slot);
        }
        if let Some(slot) = self.locals.iter().position(|l| l == name) {
            return Binding::Local(slot);
        }
        for (depth, scope) in self.outer.iter().enumerate() {
            if let Some(slot) = scope.names.iter().position(|l| l == name) {
                return Binding::Local((depth + 1) * LOCAL_SCOPE_STRIDE + slot);
            }
        }
        Binding::Global(SmolStr::new(name))
    }

    /// Declare `name` in this function's local scope. Redeclaring reuses the
    /// slot; declaring a parameter's name binds the parameter.
    pub(crate) fn declare_local(&mut self, name: &SmolStr) -> Binding {
        if let Some(slot) = self.params.iter().position(|p| p == name) {
            return Binding::Argument(slot);
        }
        if let Some(slot) = self.locals.iter().position(|l| l == name) {
            return Binding::Local(slot);
        }
        self.locals.push(name.clone());
        Binding::Local(self.locals.len() - 1)
    }

    pub(crate) fn error(&self, kind: CompileErrorKind, node: &AstNode) -> CompileError {
        CompileError::new(kind, node.location.clone())
    }

    /// Append the implicit `return nil`, verify every break was patched,
    /// optionally optimize, and build the function.
    pub(crate) fn finish(mut self) -> CompileResult<Arc<Function>> {
        let location = self
            .code
            .last()
            .map(|i| i.location.clone())
            .unwrap_or_else(|| self.location.clone());
        code::emit(&mut self, OpCode::PushNil, location.clone());
        code::emit(&mut self, OpCode::Return, location);

        if let Some(stray) = self.code.iter().find(|i| i.opcode == OpCode::Break) {
            return Err(CompileError::new(
                CompileErrorKind::Internal(format!("unpatched break in function '{}'", self.name)),
                stray.location.clone(),
            ));
        }

        if self.option.optimize {
            optimizer::optimize(&mut self.code);
        }

        debug!(
            function = %self.name,
            instructions = self.code.len(),
            locals = self.locals.len(),
            "generated function"
        );

        Ok(Function::script(
            self.name,
            ScriptFunction {
                source_name: SmolStr::new(&self.option.source_name),
                instructions: self.code,
                params: self.params,
                locals: self.locals,
                scope: self.scope,
                enclosing: self.outer.into_iter().map(|o| o.cell).collect(),
            },
        ))
    }
}

/// Names of `Identifier` nodes in a parameter list.
pub(crate) fn param_names(c: &Compiler, nodes: &[AstNode]) -> CompileResult<Vec<SmolStr>> {
    nodes
        .iter()
        .map(|p| match (p.kind, p.name()) {
            (NodeKind::Identifier, Some(name)) => Ok(name),
            _ => Err(c.error(
                CompileErrorKind::NodeKindMismatch {
                    expected: "parameter identifier",
                    found: p.kind,
                },
                p,
            )),
        })
        .collect()
}
