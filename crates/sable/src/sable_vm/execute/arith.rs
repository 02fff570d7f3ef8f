// Arithmetic, unary and concatenation opcodes
use super::TmKind;
use crate::sable_value::Value;
use crate::sable_vm::interpreter::Interpreter;
use crate::sable_vm::opcode::{OpCode, SourceLocation};
use crate::sable_vm::sable_error::{RuntimeErrorKind, SableResult};

#[inline(always)]
fn apply_arith(op: OpCode, a: f64, b: f64) -> f64 {
    match op {
        OpCode::Add => a + b,
        OpCode::Subtract => a - b,
        OpCode::Multiply => a * b,
        OpCode::Divide => a / b,
        OpCode::Modulo => a % b,
        _ => a.powf(b),
    }
}

impl Interpreter {
    pub(super) fn exec_arith(&mut self, op: OpCode, location: &SourceLocation) -> SableResult<()> {
        let right = self.pop(location)?;
        let left = self.pop(location)?;

        // Fast path: both numbers
        if let (Value::Number(a), Value::Number(b)) = (&left, &right) {
            self.push(Value::Number(apply_arith(op, *a, *b)));
            return Ok(());
        }

        let tm = TmKind::from_opcode(op).unwrap_or(TmKind::Add);
        let result = self.dispatch_binary(tm, left, right, location)?;
        self.push(result);
        Ok(())
    }

    pub(super) fn exec_unary(&mut self, op: OpCode, location: &SourceLocation) -> SableResult<()> {
        let operand = self.pop(location)?;
        let native = match (op, &operand) {
            (OpCode::Negative, Value::Number(n)) => Some(Value::Number(-n)),
            (OpCode::Not, Value::Number(n)) => Some(Value::boolean(*n == 0.0)),
            (OpCode::Not, Value::Nil) => Some(Value::boolean(true)),
            (OpCode::Length, Value::Array(items)) => Some(Value::Number(items.read().len() as f64)),
            (OpCode::Length, Value::String(s)) => Some(Value::Number(s.chars().count() as f64)),
            (OpCode::Length, Value::Table(table)) => Some(Value::Number(table.read().len() as f64)),
            _ => None,
        };
        let result = match native {
            Some(value) => value,
            None => {
                let tm = TmKind::from_opcode(op).unwrap_or(TmKind::Negative);
                self.dispatch_unary(tm, operand, location)?
            }
        };
        self.push(result);
        Ok(())
    }

    /// Arrays append, tables merge (right wins), then a registered method,
    /// then string concatenation.
    pub(super) fn exec_concat(&mut self, location: &SourceLocation) -> SableResult<()> {
        let right = self.pop(location)?;
        let left = self.pop(location)?;

        let result = match (&left, &right) {
            (Value::Array(a), Value::Array(b)) => {
                let mut items = a.read().clone();
                items.extend(b.read().iter().cloned());
                Value::new_array(items)
            }
            (Value::Array(a), _) => {
                let mut items = a.read().clone();
                items.push(right.clone());
                Value::new_array(items)
            }
            (Value::Table(a), Value::Table(b)) => {
                let mut merged = a.read().clone();
                merged.merge_from(&b.read());
                Value::new_table(merged)
            }
            _ => match self.find_method(&left, TmKind::Concat) {
                Some(method) => self.call_value(&method, vec![left.clone(), right.clone()], location)?,
                None => {
                    let mut text = left.to_display_string();
                    text.push_str(&right.to_display_string());
                    Value::string(text)
                }
            },
        };
        self.push(result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_arith_matches_float_ops() {
        assert_eq!(apply_arith(OpCode::Add, 2.0, 3.0), 5.0);
        assert_eq!(apply_arith(OpCode::Modulo, -7.0, 3.0), -1.0);
        assert_eq!(apply_arith(OpCode::Power, 2.0, 10.0), 1024.0);
    }

    #[test]
    fn test_unknown_operand_error_message() {
        let kind = RuntimeErrorKind::UnexpectedOperandType {
            operator: "Add",
            type_name: "Table".into(),
        };
        assert_eq!(
            kind.to_string(),
            "unexpected operand of type Table for operator Add"
        );
    }
}
