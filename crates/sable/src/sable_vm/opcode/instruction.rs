use std::fmt;

use smol_str::SmolStr;

use super::OpCode;
use crate::sable_value::Value;

/// Where an instruction (or an AST node, or an error) came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SourceLocation {
    pub file: SmolStr,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<SmolStr>, line: u32, column: u32) -> Self {
        SourceLocation {
            file: file.into(),
            line,
            column,
        }
    }

    /// Same file, different position.
    pub fn at(&self, line: u32, column: u32) -> Self {
        SourceLocation {
            file: self.file.clone(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// One bytecode instruction: opcode, immediate operand and origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: OpCode,
    pub operand: Value,
    pub location: SourceLocation,
}

impl Instruction {
    pub fn new(opcode: OpCode, location: SourceLocation) -> Self {
        Instruction {
            opcode,
            operand: Value::Nil,
            location,
        }
    }

    pub fn with_operand(opcode: OpCode, operand: Value, location: SourceLocation) -> Self {
        Instruction {
            opcode,
            operand,
            location,
        }
    }

    pub fn jump(opcode: OpCode, offset: isize, location: SourceLocation) -> Self {
        Instruction::with_operand(opcode, Value::Number(offset as f64), location)
    }

    /// Relative offset of a jump instruction.
    #[inline]
    pub fn jump_offset(&self) -> Option<isize> {
        if !self.opcode.is_jump() {
            return None;
        }
        match self.operand {
            Value::Number(n) if n.fract() == 0.0 => Some(n as isize),
            _ => None,
        }
    }

    /// Absolute target of the jump stored at `index`.
    #[inline]
    pub fn jump_target(&self, index: usize) -> Option<usize> {
        let target = index as isize + 1 + self.jump_offset()?;
        usize::try_from(target).ok()
    }

    pub fn set_jump_offset(&mut self, offset: isize) {
        self.operand = Value::Number(offset as f64);
    }

    /// Non-negative integral operand (slot index or argument count).
    #[inline]
    pub fn operand_index(&self) -> Option<usize> {
        match self.operand {
            Value::Number(n) if n >= 0.0 && n.fract() == 0.0 => Some(n as usize),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Value::Nil => write!(f, "{}", self.opcode),
            Value::String(s) => write!(f, "{:<14} {:?}", self.opcode.name(), s.as_str()),
            operand => write!(f, "{:<14} {}", self.opcode.name(), operand),
        }
    }
}
