use crate::sable_vm::sable_limits::{
    DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_STACK_SIZE, DEFAULT_MAX_UNROLL_BYTES,
};

/// Runtime limits for every interpreter created from a context.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct VmOption {
    pub max_call_depth: usize,
    pub max_stack_size: usize,
}

impl Default for VmOption {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_stack_size: DEFAULT_MAX_STACK_SIZE,
        }
    }
}

/// Code generation settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub struct CompileOption {
    /// Recorded as the source name of every generated function.
    pub source_name: String,
    /// Run the peephole optimizer on every generated function.
    pub optimize: bool,
    /// A constant counted loop is unrolled when `count * encoded body size`
    /// stays within this many bytes.
    pub max_unroll_bytes: usize,
}

impl Default for CompileOption {
    fn default() -> Self {
        Self {
            source_name: "script".to_string(),
            optimize: true,
            max_unroll_bytes: DEFAULT_MAX_UNROLL_BYTES,
        }
    }
}

impl CompileOption {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            ..Default::default()
        }
    }

    pub fn with_optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    pub fn with_max_unroll_bytes(mut self, bytes: usize) -> Self {
        self.max_unroll_bytes = bytes;
        self
    }
}
