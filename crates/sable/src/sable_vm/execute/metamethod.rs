// Operator methods: host- or script-registered per-type operator overloads
use crate::sable_value::{Value, ValueKind};
use crate::sable_vm::interpreter::Interpreter;
use crate::sable_vm::opcode::{OpCode, SourceLocation};
use crate::sable_vm::sable_error::{RuntimeErrorKind, SableResult};

/// Canonical operator method names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TmKind {
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
    Equals,
    SequenceEquals,
    Is,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Call,
}

impl TmKind {
    pub fn name(self) -> &'static str {
        match self {
            TmKind::Add => "Add",
            TmKind::Subtract => "Subtract",
            TmKind::Multiply => "Multiply",
            TmKind::Divide => "Divide",
            TmKind::Modulo => "Modulo",
            TmKind::Power => "Power",
            TmKind::Negative => "Negative",
            TmKind::Not => "Not",
            TmKind::Length => "Length",
            TmKind::Concat => "Concat",
            TmKind::Equals => "Equals",
            TmKind::SequenceEquals => "SequenceEquals",
            TmKind::Is => "Is",
            TmKind::LessThan => "LessThan",
            TmKind::LessEqual => "LessEqual",
            TmKind::GreaterThan => "GreaterThan",
            TmKind::GreaterEqual => "GreaterEqual",
            TmKind::Call => "Call",
        }
    }

    pub fn from_opcode(op: OpCode) -> Option<TmKind> {
        let tm = match op {
            OpCode::Add => TmKind::Add,
            OpCode::Subtract => TmKind::Subtract,
            OpCode::Multiply => TmKind::Multiply,
            OpCode::Divide => TmKind::Divide,
            OpCode::Modulo => TmKind::Modulo,
            OpCode::Power => TmKind::Power,
            OpCode::Negative => TmKind::Negative,
            OpCode::Not => TmKind::Not,
            OpCode::Length => TmKind::Length,
            OpCode::Concat => TmKind::Concat,
            OpCode::Equals | OpCode::NotEquals => TmKind::Equals,
            OpCode::SequenceEquals => TmKind::SequenceEquals,
            OpCode::Is => TmKind::Is,
            OpCode::LessThan => TmKind::LessThan,
            OpCode::LessEqual => TmKind::LessEqual,
            OpCode::GreaterThan => TmKind::GreaterThan,
            OpCode::GreaterEqual => TmKind::GreaterEqual,
            _ => return None,
        };
        Some(tm)
    }
}

impl Interpreter {
    /// Operator method registered for the value's type.
    pub(crate) fn find_method(&self, value: &Value, tm: TmKind) -> Option<Value> {
        self.context.get_method(&value.type_key(), tm.name())
    }

    /// Defer a binary operator to the left operand's type. Runs the method to
    /// completion before the calling instruction continues.
    pub(crate) fn dispatch_binary(
        &mut self,
        tm: TmKind,
        left: Value,
        right: Value,
        location: &SourceLocation,
    ) -> SableResult<Value> {
        match self.find_method(&left, tm) {
            Some(method) => self.call_value(&method, vec![left, right], location),
            None => {
                // A number on the left means the right operand is to blame.
                let offender = if left.kind() == ValueKind::Number {
                    right.type_name()
                } else {
                    left.type_name()
                };
                Err(RuntimeErrorKind::UnexpectedOperandType {
                    operator: tm.name(),
                    type_name: offender,
                }
                .at(location))
            }
        }
    }

    pub(crate) fn dispatch_unary(
        &mut self,
        tm: TmKind,
        operand: Value,
        location: &SourceLocation,
    ) -> SableResult<Value> {
        match self.find_method(&operand, tm) {
            Some(method) => self.call_value(&method, vec![operand], location),
            None => Err(RuntimeErrorKind::UnexpectedOperandType {
                operator: tm.name(),
                type_name: operand.type_name(),
            }
            .at(location)),
        }
    }
}
