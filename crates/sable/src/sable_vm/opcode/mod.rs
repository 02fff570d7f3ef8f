mod instruction;

pub use instruction::{Instruction, SourceLocation};

/// Complete Sable opcode set.
///
/// The machine is stack based: every opcode pops its operands from the
/// operand stack and pushes at most one result. Jump opcodes carry a relative
/// offset (added to the already advanced program counter) as their operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum OpCode {
    // Stack housekeeping
    Nop = 0, // no effect, removed by the optimizer
    Pop,     // discard top
    Dup,     // duplicate top

    // Constants
    PushNil,      // push nil
    PushConst,    // push operand (number or string)
    PushFunction, // push operand function
    PushArray,    // push a fresh copy of the operand array

    // Containers
    NewArray,    // push []
    ArrayAppend, // v = pop; top.append(v)
    NewTable,    // push {}
    TableInsert, // v = pop; k = pop; top[k] = v

    // Variables
    LoadArg,     // push args[operand]
    StoreArg,    // args[operand] = pop
    LoadLocal,   // push locals(depth, slot), operand = depth * stride + slot
    StoreLocal,  // locals(depth, slot) = pop
    LoadGlobal,  // push globals[operand]
    StoreGlobal, // globals[operand] = pop

    // Indexing
    GetIndex, // i = pop; t = pop; push t[i]
    SetIndex, // v = pop; i = pop; t = pop; t[i] = v; push v

    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Negative,
    Not,
    Length,
    Concat,

    // Comparison
    Equals,
    NotEquals,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    SequenceEquals,
    Is,

    // Control flow
    Jump,            // pc += operand
    BranchIfFalse,   // if !pop then pc += operand
    BranchIfTrue,    // if pop then pc += operand
    JumpIfFalseKeep, // if !top then pc += operand else pop
    JumpIfTrueKeep,  // if top then pc += operand else pop
    CountDown,       // if top <= 0 then pc += operand else top -= 1
    Break,           // placeholder, rewritten by the enclosing loop

    // Calls
    Call,       // operand = argc; callee below the arguments
    CallMethod, // operand = [name, argc]; receiver below the arguments
    Return,     // return pop
    Yield,      // suspend the coroutine with pop; nil is pushed on resume
}

impl OpCode {
    pub const ALL: [OpCode; 48] = [
        OpCode::Nop,
        OpCode::Pop,
        OpCode::Dup,
        OpCode::PushNil,
        OpCode::PushConst,
        OpCode::PushFunction,
        OpCode::PushArray,
        OpCode::NewArray,
        OpCode::ArrayAppend,
        OpCode::NewTable,
        OpCode::TableInsert,
        OpCode::LoadArg,
        OpCode::StoreArg,
        OpCode::LoadLocal,
        OpCode::StoreLocal,
        OpCode::LoadGlobal,
        OpCode::StoreGlobal,
        OpCode::GetIndex,
        OpCode::SetIndex,
        OpCode::Add,
        OpCode::Subtract,
        OpCode::Multiply,
        OpCode::Divide,
        OpCode::Modulo,
        OpCode::Power,
        OpCode::Negative,
        OpCode::Not,
        OpCode::Length,
        OpCode::Concat,
        OpCode::Equals,
        OpCode::NotEquals,
        OpCode::LessThan,
        OpCode::LessEqual,
        OpCode::GreaterThan,
        OpCode::GreaterEqual,
        OpCode::SequenceEquals,
        OpCode::Is,
        OpCode::Jump,
        OpCode::BranchIfFalse,
        OpCode::BranchIfTrue,
        OpCode::JumpIfFalseKeep,
        OpCode::JumpIfTrueKeep,
        OpCode::CountDown,
        OpCode::Break,
        OpCode::Call,
        OpCode::CallMethod,
        OpCode::Return,
        OpCode::Yield,
    ];

    #[inline]
    pub fn from_u16(value: u16) -> Option<OpCode> {
        Self::ALL.get(value as usize).copied()
    }

    #[inline(always)]
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Opcodes whose operand is a relative jump offset.
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            OpCode::Jump
                | OpCode::BranchIfFalse
                | OpCode::BranchIfTrue
                | OpCode::JumpIfFalseKeep
                | OpCode::JumpIfTrueKeep
                | OpCode::CountDown
        )
    }

    /// Opcodes that push a compile-time constant and nothing else.
    pub fn is_immediate_push(self) -> bool {
        matches!(
            self,
            OpCode::PushNil | OpCode::PushConst | OpCode::PushFunction
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            OpCode::Nop => "NOP",
            OpCode::Pop => "POP",
            OpCode::Dup => "DUP",
            OpCode::PushNil => "PUSHNIL",
            OpCode::PushConst => "PUSHCONST",
            OpCode::PushFunction => "PUSHFUNCTION",
            OpCode::PushArray => "PUSHARRAY",
            OpCode::NewArray => "NEWARRAY",
            OpCode::ArrayAppend => "ARRAYAPPEND",
            OpCode::NewTable => "NEWTABLE",
            OpCode::TableInsert => "TABLEINSERT",
            OpCode::LoadArg => "LOADARG",
            OpCode::StoreArg => "STOREARG",
            OpCode::LoadLocal => "LOADLOCAL",
            OpCode::StoreLocal => "STORELOCAL",
            OpCode::LoadGlobal => "LOADGLOBAL",
            OpCode::StoreGlobal => "STOREGLOBAL",
            OpCode::GetIndex => "GETINDEX",
            OpCode::SetIndex => "SETINDEX",
            OpCode::Add => "ADD",
            OpCode::Subtract => "SUB",
            OpCode::Multiply => "MUL",
            OpCode::Divide => "DIV",
            OpCode::Modulo => "MOD",
            OpCode::Power => "POW",
            OpCode::Negative => "NEG",
            OpCode::Not => "NOT",
            OpCode::Length => "LEN",
            OpCode::Concat => "CONCAT",
            OpCode::Equals => "EQ",
            OpCode::NotEquals => "NE",
            OpCode::LessThan => "LT",
            OpCode::LessEqual => "LE",
            OpCode::GreaterThan => "GT",
            OpCode::GreaterEqual => "GE",
            OpCode::SequenceEquals => "SEQEQ",
            OpCode::Is => "IS",
            OpCode::Jump => "JMP",
            OpCode::BranchIfFalse => "BRFALSE",
            OpCode::BranchIfTrue => "BRTRUE",
            OpCode::JumpIfFalseKeep => "JMPFALSEKEEP",
            OpCode::JumpIfTrueKeep => "JMPTRUEKEEP",
            OpCode::CountDown => "COUNTDOWN",
            OpCode::Break => "BREAK",
            OpCode::Call => "CALL",
            OpCode::CallMethod => "CALLMETHOD",
            OpCode::Return => "RETURN",
            OpCode::Yield => "YIELD",
        }
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
