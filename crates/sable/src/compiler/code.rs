// Instruction emission and jump patching
use super::Compiler;
use crate::sable_value::Value;
use crate::sable_vm::opcode::{Instruction, OpCode, SourceLocation};

pub fn emit(c: &mut Compiler, op: OpCode, location: SourceLocation) -> usize {
    c.code.push(Instruction::new(op, location));
    c.code.len() - 1
}

pub fn emit_with(c: &mut Compiler, op: OpCode, operand: Value, location: SourceLocation) -> usize {
    c.code.push(Instruction::with_operand(op, operand, location));
    c.code.len() - 1
}

pub fn emit_index(c: &mut Compiler, op: OpCode, index: usize, location: SourceLocation) -> usize {
    emit_with(c, op, Value::Number(index as f64), location)
}

/// Emit a forward jump with an unknown target; patch it later.
pub fn jump(c: &mut Compiler, op: OpCode, location: SourceLocation) -> usize {
    c.code.push(Instruction::jump(op, 0, location));
    c.code.len() - 1
}

/// Emit a jump to an already generated position.
pub fn jump_back(c: &mut Compiler, op: OpCode, target: usize, location: SourceLocation) -> usize {
    let pc = c.code.len();
    c.code.push(Instruction::jump(op, target as isize - pc as isize - 1, location));
    pc
}

#[inline]
pub fn get_label(c: &Compiler) -> usize {
    c.code.len()
}

pub fn fix_jump(c: &mut Compiler, pc: usize, target: usize) {
    let offset = target as isize - pc as isize - 1;
    if let Some(instruction) = c.code.get_mut(pc) {
        instruction.set_jump_offset(offset);
    }
}

pub fn patch_to_here(c: &mut Compiler, pc: usize) {
    let here = get_label(c);
    fix_jump(c, pc, here);
}

/// Turn every break placeholder in `from..to` into a jump to `target`.
/// Breaks of nested loops have already been rewritten by those loops.
pub fn patch_breaks(c: &mut Compiler, from: usize, to: usize, target: usize) {
    for pc in from..to {
        if c.code[pc].opcode == OpCode::Break {
            c.code[pc].opcode = OpCode::Jump;
            fix_jump(c, pc, target);
        }
    }
}
