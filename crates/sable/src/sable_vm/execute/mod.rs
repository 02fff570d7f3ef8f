// Main VM execution loop
mod arith;
mod call;
mod compare;
mod index;
mod metamethod;

pub use metamethod::TmKind;

use crate::sable_value::{SableTable, Value};
use crate::sable_vm::interpreter::{ExecOutcome, Interpreter, Invoked};
use crate::sable_vm::opcode::{Instruction, OpCode, SourceLocation};
use crate::sable_vm::sable_error::{RuntimeErrorKind, SableResult};
use crate::sable_vm::sable_limits::LOCAL_SCOPE_STRIDE;

fn invalid(message: impl Into<String>, location: &SourceLocation) -> crate::sable_vm::SableError {
    RuntimeErrorKind::InvalidInstruction(message.into()).at(location)
}

fn index_operand(instruction: &Instruction) -> SableResult<usize> {
    instruction.operand_index().ok_or_else(|| {
        invalid(
            format!("{} expects an index operand", instruction.opcode),
            &instruction.location,
        )
    })
}

impl Interpreter {
    /// Run frames until the frame stack drops back to `base_depth` or the
    /// coroutine body yields.
    pub(crate) fn execute(&mut self, base_depth: usize) -> SableResult<ExecOutcome> {
        loop {
            let (script, pc) = match self.frames.last_mut() {
                Some(frame) => {
                    let pc = frame.pc;
                    frame.pc += 1;
                    (frame.script.clone(), pc)
                }
                None => {
                    return Err(invalid("no active call frame", &SourceLocation::default()));
                }
            };

            // Running off the end returns nil
            let Some(instruction) = script.instructions.get(pc) else {
                if let Some(value) = self.return_from_frame(Value::Nil, base_depth) {
                    return Ok(ExecOutcome::Returned(value));
                }
                continue;
            };
            let location = &instruction.location;

            match instruction.opcode {
                OpCode::Nop => {}
                OpCode::Pop => {
                    self.pop(location)?;
                }
                OpCode::Dup => {
                    let top = self.peek(location)?.clone();
                    self.push(top);
                }

                OpCode::PushNil => self.push(Value::Nil),
                OpCode::PushConst | OpCode::PushFunction => self.push(instruction.operand.clone()),
                OpCode::PushArray => {
                    let Value::Array(items) = &instruction.operand else {
                        return Err(invalid("PUSHARRAY expects an array operand", location));
                    };
                    let copy = items.read().clone();
                    self.push(Value::new_array(copy));
                }

                OpCode::NewArray => self.push(Value::new_array(Vec::new())),
                OpCode::ArrayAppend => {
                    let value = self.pop(location)?;
                    match self.peek(location)? {
                        Value::Array(items) => items.write().push(value),
                        other => {
                            return Err(invalid(
                                format!("ARRAYAPPEND on {}", other.type_name()),
                                location,
                            ));
                        }
                    }
                }
                OpCode::NewTable => self.push(Value::new_table(SableTable::new())),
                OpCode::TableInsert => {
                    let value = self.pop(location)?;
                    let key = self.pop(location)?;
                    match self.peek(location)? {
                        Value::Table(table) => table.write().set(key, value),
                        other => {
                            return Err(invalid(
                                format!("TABLEINSERT on {}", other.type_name()),
                                location,
                            ));
                        }
                    }
                }

                OpCode::LoadArg => {
                    let slot = index_operand(instruction)?;
                    let frame = self.frame_mut(location)?;
                    let value = frame.args.get(slot).cloned().unwrap_or_default();
                    self.push(value);
                }
                OpCode::StoreArg => {
                    let slot = index_operand(instruction)?;
                    let value = self.pop(location)?;
                    let frame = self.frame_mut(location)?;
                    if slot >= frame.args.len() {
                        frame.args.resize(slot + 1, Value::Nil);
                    }
                    frame.args[slot] = value;
                }
                OpCode::LoadLocal => {
                    let packed = index_operand(instruction)?;
                    let value = self.read_local(packed, location)?;
                    self.push(value);
                }
                OpCode::StoreLocal => {
                    let packed = index_operand(instruction)?;
                    let value = self.pop(location)?;
                    self.write_local(packed, value, location)?;
                }
                OpCode::LoadGlobal => {
                    let Value::String(name) = &instruction.operand else {
                        return Err(invalid("LOADGLOBAL expects a name operand", location));
                    };
                    let value = self.context.get_global(name).ok_or_else(|| {
                        RuntimeErrorKind::UndefinedGlobal { name: name.clone() }.at(location)
                    })?;
                    self.push(value);
                }
                OpCode::StoreGlobal => {
                    let Value::String(name) = &instruction.operand else {
                        return Err(invalid("STOREGLOBAL expects a name operand", location));
                    };
                    let value = self.pop(location)?;
                    self.context.set_global(name.clone(), value);
                }

                OpCode::GetIndex => {
                    let index = self.pop(location)?;
                    let target = self.pop(location)?;
                    let value = self.index_get(&target, &index, location)?;
                    self.push(value);
                }
                OpCode::SetIndex => {
                    let value = self.pop(location)?;
                    let index = self.pop(location)?;
                    let target = self.pop(location)?;
                    self.index_set(&target, index, value.clone(), location)?;
                    self.push(value);
                }

                OpCode::Add
                | OpCode::Subtract
                | OpCode::Multiply
                | OpCode::Divide
                | OpCode::Modulo
                | OpCode::Power => self.exec_arith(instruction.opcode, location)?,
                OpCode::Negative | OpCode::Not | OpCode::Length => {
                    self.exec_unary(instruction.opcode, location)?
                }
                OpCode::Concat => self.exec_concat(location)?,

                OpCode::LessThan
                | OpCode::LessEqual
                | OpCode::GreaterThan
                | OpCode::GreaterEqual => self.exec_compare(instruction.opcode, location)?,
                OpCode::Equals | OpCode::NotEquals => {
                    self.exec_equals(instruction.opcode == OpCode::NotEquals, location)?
                }
                OpCode::SequenceEquals => self.exec_sequence_equals(location)?,
                OpCode::Is => self.exec_is(location)?,

                OpCode::Jump => self.jump(instruction, pc, location)?,
                OpCode::BranchIfFalse => {
                    if !self.pop(location)?.is_truthy() {
                        self.jump(instruction, pc, location)?;
                    }
                }
                OpCode::BranchIfTrue => {
                    if self.pop(location)?.is_truthy() {
                        self.jump(instruction, pc, location)?;
                    }
                }
                OpCode::JumpIfFalseKeep => {
                    if self.peek(location)?.is_truthy() {
                        self.pop(location)?;
                    } else {
                        self.jump(instruction, pc, location)?;
                    }
                }
                OpCode::JumpIfTrueKeep => {
                    if self.peek(location)?.is_truthy() {
                        self.jump(instruction, pc, location)?;
                    } else {
                        self.pop(location)?;
                    }
                }
                OpCode::CountDown => {
                    let done = match self.peek_mut(location)? {
                        Value::Number(n) if n.is_nan() || *n <= 0.0 => true,
                        Value::Number(n) => {
                            *n -= 1.0;
                            false
                        }
                        other => {
                            return Err(RuntimeErrorKind::UnexpectedOperandType {
                                operator: "loop",
                                type_name: other.type_name(),
                            }
                            .at(location));
                        }
                    };
                    if done {
                        self.jump(instruction, pc, location)?;
                    }
                }
                OpCode::Break => return Err(invalid("unpatched break", location)),

                OpCode::Call => {
                    let argc = index_operand(instruction)?;
                    let args = self.pop_n(argc, location)?;
                    let callee = self.pop(location)?;
                    if let Invoked::Value(value) = self.invoke(callee, args, location)? {
                        self.push(value);
                    }
                }
                OpCode::CallMethod => {
                    let (name, argc) = method_operand(instruction)?;
                    let args = self.pop_n(argc, location)?;
                    let receiver = self.pop(location)?;
                    if let Invoked::Value(value) = self.invoke_method(receiver, &name, args, location)? {
                        self.push(value);
                    }
                }
                OpCode::Return => {
                    let value = self.pop(location)?;
                    if let Some(value) = self.return_from_frame(value, base_depth) {
                        return Ok(ExecOutcome::Returned(value));
                    }
                }
                OpCode::Yield => {
                    let value = self.pop(location)?;
                    if !self.in_coroutine {
                        return Err(RuntimeErrorKind::YieldOutsideCoroutine.at(location));
                    }
                    if base_depth != 0 {
                        return Err(RuntimeErrorKind::YieldAcrossNative.at(location));
                    }
                    return Ok(ExecOutcome::Yielded(value));
                }
            }
        }
    }

    fn jump(&mut self, instruction: &Instruction, pc: usize, location: &SourceLocation) -> SableResult<()> {
        let target = instruction
            .jump_target(pc)
            .ok_or_else(|| invalid("malformed jump offset", location))?;
        let frame = self.frame_mut(location)?;
        if target > frame.script.instructions.len() {
            return Err(invalid(format!("jump target {target} out of range"), location));
        }
        frame.pc = target;
        Ok(())
    }

    /// Locals array addressed by the depth part of a packed operand.
    fn locals_for(
        &mut self,
        depth: usize,
        location: &SourceLocation,
    ) -> SableResult<crate::sable_value::Locals> {
        let frame = self.frame_mut(location)?;
        if depth == 0 {
            return Ok(frame.locals.clone());
        }
        let cell = frame
            .script
            .enclosing
            .get(depth - 1)
            .ok_or_else(|| invalid(format!("no enclosing scope at depth {depth}"), location))?;
        cell.cached()
            .ok_or_else(|| RuntimeErrorKind::InactiveScope { depth }.at(location))
    }

    fn read_local(&mut self, packed: usize, location: &SourceLocation) -> SableResult<Value> {
        let (depth, slot) = (packed / LOCAL_SCOPE_STRIDE, packed % LOCAL_SCOPE_STRIDE);
        let locals = self.locals_for(depth, location)?;
        let value = locals.lock().get(slot).cloned();
        value.ok_or_else(|| invalid(format!("local slot {slot} out of range"), location))
    }

    fn write_local(&mut self, packed: usize, value: Value, location: &SourceLocation) -> SableResult<()> {
        let (depth, slot) = (packed / LOCAL_SCOPE_STRIDE, packed % LOCAL_SCOPE_STRIDE);
        let locals = self.locals_for(depth, location)?;
        let mut locals = locals.lock();
        match locals.get_mut(slot) {
            Some(entry) => {
                *entry = value;
                Ok(())
            }
            None => Err(invalid(format!("local slot {slot} out of range"), location)),
        }
    }
}

fn method_operand(instruction: &Instruction) -> SableResult<(smol_str::SmolStr, usize)> {
    if let Value::Array(parts) = &instruction.operand {
        let parts = parts.read();
        if let [Value::String(name), Value::Number(argc)] = parts.as_slice() {
            if *argc >= 0.0 && argc.fract() == 0.0 {
                return Ok((name.clone(), *argc as usize));
            }
        }
    }
    Err(invalid(
        "CALLMETHOD expects a [name, argc] operand",
        &instruction.location,
    ))
}
