// Limits and format constants for the Sable VM

/// Multiplier packing (scope depth, slot) into one local operand:
/// `operand = depth * LOCAL_SCOPE_STRIDE + slot`.
pub const LOCAL_SCOPE_STRIDE: usize = 1 << 20;

/// Maximum number of nested script calls per interpreter.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 200;

/// Maximum operand stack size per interpreter.
pub const DEFAULT_MAX_STACK_SIZE: usize = 1_000_000;

/// Encoded-bytes budget for unrolled counted loops.
pub const DEFAULT_MAX_UNROLL_BYTES: usize = 64 * 1024;

/// Bytecode format version written in every header (major, minor, build).
pub const BYTECODE_VERSION: (u32, u32, u32) = (0, 3, 0);

/// Numbers with a magnitude below this and no fraction print as integers.
pub const MAX_INTEGRAL_DISPLAY: f64 = 1e15;

/// Jump threading gives up after this many hops (guards jump cycles).
pub const MAX_JUMP_THREAD_HOPS: usize = 16;
