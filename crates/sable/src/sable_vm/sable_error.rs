// Error types for the Sable toolchain
// Every error carries the source location of the construct that caused it and
// renders as `file:line:column: message`.

use smol_str::SmolStr;
use thiserror::Error;

use crate::ast::{Branch, NodeKind};
use crate::sable_vm::opcode::SourceLocation;

/// Error raised while generating bytecode from an AST.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{location}: {kind}")]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub location: SourceLocation,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, location: SourceLocation) -> Self {
        CompileError { kind, location }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileErrorKind {
    #[error("unexpected {found:?} node in {context}")]
    UnexpectedNode {
        found: NodeKind,
        context: &'static str,
    },
    #[error("expected {expected}, found {found:?} node")]
    NodeKindMismatch {
        expected: &'static str,
        found: NodeKind,
    },
    #[error("{node:?} node is missing its {branch:?} branch")]
    MissingBranch { node: NodeKind, branch: Branch },
    #[error("{node:?} node has a malformed payload, expected {expected}")]
    MalformedPayload {
        node: NodeKind,
        expected: &'static str,
    },
    #[error("'{construct}' requires exactly one condition expression, found {count}")]
    ConditionArity {
        construct: &'static str,
        count: usize,
    },
    #[error("'break' outside of a loop")]
    BreakOutsideLoop,
    #[error("'{construct}' is not allowed in this position")]
    ControlFlowNotAllowed { construct: &'static str },
    #[error("{node:?} does not produce a value")]
    StatementAsValue { node: NodeKind },
    #[error("internal code generator error: {0}")]
    Internal(String),
}

/// Error raised by the virtual machine. Aborts the running interpreter.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{location}: {kind}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub location: SourceLocation,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, location: SourceLocation) -> Self {
        RuntimeError { kind, location }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeErrorKind {
    #[error("function '{function}' expects {expected} argument(s), got {actual}")]
    NotEnoughArguments {
        function: SmolStr,
        expected: usize,
        actual: usize,
    },
    #[error("value of type {type_name} is not indexable")]
    NotIndexable { type_name: SmolStr },
    #[error("cannot index {target} with a value of type {index}")]
    WrongIndexType { target: SmolStr, index: SmolStr },
    #[error("index {index} is out of range for length {length}")]
    IndexOutOfRange { index: f64, length: usize },
    #[error("value of type {type_name} is not callable")]
    NotCallable { type_name: SmolStr },
    #[error("type {type_name} has no method '{method}'")]
    NoMethod { type_name: SmolStr, method: SmolStr },
    #[error("unexpected operand of type {type_name} for operator {operator}")]
    UnexpectedOperandType {
        operator: &'static str,
        type_name: SmolStr,
    },
    #[error("undefined global '{name}'")]
    UndefinedGlobal { name: SmolStr },
    #[error("enclosing scope {depth} level(s) out has no active locals")]
    InactiveScope { depth: usize },
    #[error("call depth exceeded the limit of {limit}")]
    StackOverflow { limit: usize },
    #[error("yield outside of a coroutine")]
    YieldOutsideCoroutine,
    #[error("cannot yield across a native call boundary")]
    YieldAcrossNative,
    #[error("coroutine is already running")]
    CoroutineRunning,
    #[error("invalid instruction: {0}")]
    InvalidInstruction(String),
    #[error("{0}")]
    Host(String),
}

impl RuntimeErrorKind {
    /// Attach a location, producing the umbrella error.
    pub fn at(self, location: &SourceLocation) -> SableError {
        SableError::Runtime(RuntimeError::new(self, location.clone()))
    }
}

/// Failure while encoding or decoding persisted bytecode.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BytecodeError {
    #[error("unexpected end of bytecode at offset {0}")]
    UnexpectedEof(usize),
    #[error("unsupported bytecode version {major}.{minor}.{build}")]
    UnsupportedVersion { major: u32, minor: u32, build: u32 },
    #[error("unknown opcode {0}")]
    UnknownOpcode(u16),
    #[error("unknown value tag {0}")]
    UnknownTag(u16),
    #[error("invalid utf-8 in string at offset {0}")]
    InvalidUtf8(usize),
    #[error("{0} cannot be serialized")]
    NotSerializable(SmolStr),
    #[error("no host type registered with id {0}")]
    UnknownHostType(u16),
    #[error("host type decoder failed: {0}")]
    HostDecode(String),
    #[error("{0} trailing bytes after the function record")]
    TrailingBytes(usize),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SableError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Bytecode(#[from] BytecodeError),
}

impl SableError {
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            SableError::Compile(e) => Some(&e.location),
            SableError::Runtime(e) => Some(&e.location),
            SableError::Bytecode(_) => None,
        }
    }

    pub fn runtime_kind(&self) -> Option<&RuntimeErrorKind> {
        match self {
            SableError::Runtime(e) => Some(&e.kind),
            _ => None,
        }
    }

    pub fn compile_kind(&self) -> Option<&CompileErrorKind> {
        match self {
            SableError::Compile(e) => Some(&e.kind),
            _ => None,
        }
    }
}

pub type SableResult<T> = Result<T, SableError>;
