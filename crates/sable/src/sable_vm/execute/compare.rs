// Relational and equality opcodes
use super::TmKind;
use crate::sable_value::{TypeObject, Value};
use crate::sable_vm::interpreter::Interpreter;
use crate::sable_vm::opcode::{OpCode, SourceLocation};
use crate::sable_vm::sable_error::{RuntimeErrorKind, SableResult};

impl Interpreter {
    pub(super) fn exec_compare(&mut self, op: OpCode, location: &SourceLocation) -> SableResult<()> {
        let right = self.pop(location)?;
        let left = self.pop(location)?;

        let result = if let (Value::Number(a), Value::Number(b)) = (&left, &right) {
            let holds = match op {
                OpCode::LessThan => a < b,
                OpCode::LessEqual => a <= b,
                OpCode::GreaterThan => a > b,
                _ => a >= b,
            };
            Value::boolean(holds)
        } else {
            let tm = TmKind::from_opcode(op).unwrap_or(TmKind::LessThan);
            self.dispatch_binary(tm, left, right, location)?
        };
        self.push(result);
        Ok(())
    }

    pub(super) fn exec_equals(&mut self, negate: bool, location: &SourceLocation) -> SableResult<()> {
        let right = self.pop(location)?;
        let left = self.pop(location)?;

        let equal = match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Number(_), _) => false,
            _ => match self.find_method(&left, TmKind::Equals) {
                Some(method) => self
                    .call_value(&method, vec![left.clone(), right.clone()], location)?
                    .is_truthy(),
                None => left.equals(&right),
            },
        };
        self.push(Value::boolean(equal != negate));
        Ok(())
    }

    pub(super) fn exec_sequence_equals(&mut self, location: &SourceLocation) -> SableResult<()> {
        let right = self.pop(location)?;
        let left = self.pop(location)?;

        let equal = match self.find_method(&left, TmKind::SequenceEquals) {
            Some(method) if !matches!(left, Value::Number(_)) => {
                self.call_value(&method, vec![left, right], location)?.is_truthy()
            }
            _ => left.sequence_equals(&right),
        };
        self.push(Value::boolean(equal));
        Ok(())
    }

    /// `value is Type`: a registered `Is` method, else a type object check.
    pub(super) fn exec_is(&mut self, location: &SourceLocation) -> SableResult<()> {
        let right = self.pop(location)?;
        let left = self.pop(location)?;

        let result = if let Some(method) = self.find_method(&left, TmKind::Is) {
            self.call_value(&method, vec![left, right], location)?
        } else if let Some(type_object) = right.as_host::<TypeObject>() {
            Value::boolean(left.type_key() == type_object.key)
        } else {
            return Err(RuntimeErrorKind::UnexpectedOperandType {
                operator: TmKind::Is.name(),
                type_name: right.type_name(),
            }
            .at(location));
        };
        self.push(result);
        Ok(())
    }
}
