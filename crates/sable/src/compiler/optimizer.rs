// Peephole optimizer
// Works directly on a finished instruction stream. Every pass keeps relative
// jump offsets valid by remapping through the surviving instructions.

use tracing::trace;

use crate::sable_vm::opcode::{Instruction, OpCode};
use crate::sable_vm::sable_limits::MAX_JUMP_THREAD_HOPS;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeStats {
    pub removed: usize,
    pub threaded: usize,
}

/// Run all passes until nothing changes.
pub fn optimize(code: &mut Vec<Instruction>) -> OptimizeStats {
    let mut stats = OptimizeStats::default();
    loop {
        let threaded = thread_jumps(code);
        let removed = remove_dead_pairs(code);
        stats.threaded += threaded;
        stats.removed += removed;
        if threaded == 0 && removed == 0 {
            break;
        }
    }
    trace!(
        removed = stats.removed,
        threaded = stats.threaded,
        remaining = code.len(),
        "peephole pass finished"
    );
    stats
}

fn jump_targets(code: &[Instruction]) -> Vec<bool> {
    let mut targets = vec![false; code.len() + 1];
    for (pc, instruction) in code.iter().enumerate() {
        if let Some(target) = instruction.jump_target(pc) {
            if target < targets.len() {
                targets[target] = true;
            }
        }
    }
    targets
}

/// A jump landing on an unconditional jump goes straight to its final target.
fn thread_jumps(code: &mut [Instruction]) -> usize {
    let mut threaded = 0;
    for pc in 0..code.len() {
        let Some(mut target) = code[pc].jump_target(pc) else {
            continue;
        };
        let original = target;
        for _ in 0..MAX_JUMP_THREAD_HOPS {
            match code.get(target) {
                Some(next) if next.opcode == OpCode::Jump && target != pc => {
                    match next.jump_target(target) {
                        Some(next_target) if next_target != target => target = next_target,
                        _ => break,
                    }
                }
                _ => break,
            }
        }
        if target != original {
            code[pc].set_jump_offset(target as isize - pc as isize - 1);
            threaded += 1;
        }
    }
    threaded
}

/// Drop `NOP`, `JMP +0` and value pushes that are popped right away.
fn remove_dead_pairs(code: &mut Vec<Instruction>) -> usize {
    let targets = jump_targets(code);
    let mut removed = vec![false; code.len()];

    let mut pc = 0;
    while pc < code.len() {
        let instruction = &code[pc];
        let empty_jump = instruction.opcode == OpCode::Jump && instruction.jump_offset() == Some(0);
        if instruction.opcode == OpCode::Nop || empty_jump {
            removed[pc] = true;
            pc += 1;
            continue;
        }
        let pushes_only = instruction.opcode.is_immediate_push() || instruction.opcode == OpCode::Dup;
        if pushes_only
            && code.get(pc + 1).is_some_and(|next| next.opcode == OpCode::Pop)
            && !targets[pc + 1]
        {
            removed[pc] = true;
            removed[pc + 1] = true;
            pc += 2;
            continue;
        }
        pc += 1;
    }

    let count = removed.iter().filter(|r| **r).count();
    if count > 0 {
        compact(code, &removed);
    }
    count
}

/// Remove flagged instructions and rewrite every surviving jump. A jump to a
/// removed instruction lands on the next surviving one.
fn compact(code: &mut Vec<Instruction>, removed: &[bool]) {
    // new_pc[i] = number of kept instructions before i
    let mut new_pc = Vec::with_capacity(code.len() + 1);
    let mut kept = 0usize;
    for flag in removed {
        new_pc.push(kept);
        if !flag {
            kept += 1;
        }
    }
    new_pc.push(kept);

    let old = std::mem::take(code);
    code.reserve(kept);
    for (pc, mut instruction) in old.into_iter().enumerate() {
        if removed[pc] {
            continue;
        }
        if let Some(target) = instruction.jump_target(pc) {
            let target = new_pc[target.min(removed.len())];
            instruction.set_jump_offset(target as isize - new_pc[pc] as isize - 1);
        }
        code.push(instruction);
    }
}
