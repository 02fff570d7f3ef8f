// Statement compilation: blocks and control flow
use tracing::trace;

use super::code::{emit, fix_jump, get_label, jump, jump_back, patch_breaks, patch_to_here};
use super::expr::{compile_expr, compile_yield};
use super::{CompileResult, Compiler};
use crate::ast::{AstNode, Branch, NodeKind, Payload};
use crate::sable_value::Value;
use crate::sable_value::chunk_serializer::instruction_size;
use crate::sable_vm::opcode::{Instruction, OpCode};
use crate::sable_vm::sable_error::CompileErrorKind;

/// Compile a node in statement position; it leaves nothing on the stack.
/// Control flow is rejected in expression position by `compile_expr`.
pub fn compile_statement(c: &mut Compiler, node: &AstNode) -> CompileResult<()> {
    match node.kind {
        NodeKind::Block => compile_block(c, node),
        NodeKind::If => compile_if_stat(c, node),
        NodeKind::While => compile_while_stat(c, node),
        NodeKind::Loop => compile_loop_stat(c, node),
        NodeKind::Break => compile_break_stat(c, node),
        NodeKind::Return => compile_return_stat(c, node),
        NodeKind::Yield => compile_yield(c, node, false),
        _ => compile_expr(c, node, false),
    }
}

pub(crate) fn construct_name(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::If => "if",
        NodeKind::While => "while",
        NodeKind::Loop => "loop",
        NodeKind::Break => "break",
        NodeKind::Return => "return",
        NodeKind::Block => "block",
        _ => "statement",
    }
}

fn compile_block(c: &mut Compiler, node: &AstNode) -> CompileResult<()> {
    if matches!(node.payload, Payload::Literal(_)) {
        return Err(c.error(
            CompileErrorKind::MalformedPayload {
                node: node.kind,
                expected: "a list of statements",
            },
            node,
        ));
    }
    for statement in node.children() {
        compile_statement(c, statement)?;
    }
    Ok(())
}

/// The single condition (or count) of an `if`/`while`/`loop`.
fn single_condition<'n>(
    c: &Compiler,
    node: &'n AstNode,
    construct: &'static str,
) -> CompileResult<&'n AstNode> {
    if matches!(node.payload, Payload::None) {
        if let Some(condition) = node.branch(Branch::Condition) {
            return Ok(condition);
        }
    }
    match node.children() {
        [condition] => Ok(condition),
        other => Err(c.error(
            CompileErrorKind::ConditionArity {
                construct,
                count: other.len(),
            },
            node,
        )),
    }
}

pub(crate) fn required_branch<'n>(
    c: &Compiler,
    node: &'n AstNode,
    branch: Branch,
) -> CompileResult<&'n AstNode> {
    node.branch(branch).ok_or_else(|| {
        c.error(
            CompileErrorKind::MissingBranch {
                node: node.kind,
                branch,
            },
            node,
        )
    })
}

fn compile_loop_body(c: &mut Compiler, body: &AstNode) -> CompileResult<()> {
    c.loop_depth += 1;
    let result = compile_statement(c, body);
    c.loop_depth -= 1;
    result
}

fn compile_if_stat(c: &mut Compiler, node: &AstNode) -> CompileResult<()> {
    // Structure: if <cond> <body> [else <else>]
    let condition = single_condition(c, node, "if")?;
    let body = required_branch(c, node, Branch::Body)?;

    compile_expr(c, condition, true)?;
    let false_jump = jump(c, OpCode::BranchIfFalse, node.location.clone());
    compile_statement(c, body)?;

    match node.branch(Branch::Else) {
        Some(else_node) => {
            let end_jump = jump(c, OpCode::Jump, node.location.clone());
            patch_to_here(c, false_jump);
            compile_statement(c, else_node)?;
            patch_to_here(c, end_jump);
        }
        None => patch_to_here(c, false_jump),
    }
    Ok(())
}

fn compile_while_stat(c: &mut Compiler, node: &AstNode) -> CompileResult<()> {
    // Structure: while <cond> <body>
    let condition = single_condition(c, node, "while")?;
    let body = required_branch(c, node, Branch::Body)?;

    let loop_start = get_label(c);
    compile_expr(c, condition, true)?;
    let exit_jump = jump(c, OpCode::BranchIfFalse, node.location.clone());

    let body_start = get_label(c);
    compile_loop_body(c, body)?;
    jump_back(c, OpCode::Jump, loop_start, node.location.clone());

    let end = get_label(c);
    fix_jump(c, exit_jump, end);
    patch_breaks(c, body_start, end, end);
    Ok(())
}

/// Count of a `loop` that can be unrolled: a non-negative integer literal.
fn constant_count(node: &AstNode) -> Option<usize> {
    match (node.kind, node.literal()) {
        (NodeKind::Number, Some(Value::Number(n)))
            if *n >= 0.0 && n.fract() == 0.0 && *n <= u32::MAX as f64 =>
        {
            Some(*n as usize)
        }
        _ => None,
    }
}

fn compile_loop_stat(c: &mut Compiler, node: &AstNode) -> CompileResult<()> {
    // Structure: loop (<count>) <body>
    let count = single_condition(c, node, "loop")?;
    let body = required_branch(c, node, Branch::Body)?;
    let location = node.location.clone();

    // Count and body are generated up front (count first, so it resolves
    // names before the body declares any) and placed once the shape is known.
    let mark = get_label(c);
    compile_expr(c, count, true)?;
    let count_code = c.code.split_off(mark);
    compile_loop_body(c, body)?;
    let body_code = c.code.split_off(mark);

    if let Some(times) = constant_count(count) {
        let body_bytes: usize = body_code.iter().map(instruction_size).sum();
        let total = body_bytes.saturating_mul(times);
        if total <= c.option.max_unroll_bytes {
            trace!(times, bytes = total, "unrolling counted loop");
            unroll(c, &body_code, times);
            return Ok(());
        }
        trace!(
            times,
            bytes = total,
            budget = c.option.max_unroll_bytes,
            "counted loop over unroll budget"
        );
    }

    // count; L: COUNTDOWN -> P; body; JMP L; P: POP
    c.code.extend(count_code);
    let header = jump(c, OpCode::CountDown, location.clone());
    let body_start = get_label(c);
    c.code.extend(body_code);
    jump_back(c, OpCode::Jump, header, location.clone());
    let exit = emit(c, OpCode::Pop, location);
    fix_jump(c, header, exit);
    patch_breaks(c, body_start, exit, exit);
    Ok(())
}

/// Repeat `body` `times` times; a break in any copy leaves the whole block.
fn unroll(c: &mut Compiler, body: &[Instruction], times: usize) {
    let end = get_label(c) + body.len() * times;
    c.code.reserve(body.len() * times);
    for _ in 0..times {
        for instruction in body {
            let pc = get_label(c);
            let mut instruction = instruction.clone();
            if instruction.opcode == OpCode::Break {
                instruction.opcode = OpCode::Jump;
                instruction.set_jump_offset(end as isize - pc as isize - 1);
            }
            c.code.push(instruction);
        }
    }
}

fn compile_break_stat(c: &mut Compiler, node: &AstNode) -> CompileResult<()> {
    if c.loop_depth == 0 {
        return Err(c.error(CompileErrorKind::BreakOutsideLoop, node));
    }
    emit(c, OpCode::Break, node.location.clone());
    Ok(())
}

fn compile_return_stat(c: &mut Compiler, node: &AstNode) -> CompileResult<()> {
    match node.payload_node() {
        Some(value) => compile_expr(c, value, true)?,
        None => {
            emit(c, OpCode::PushNil, node.location.clone());
        }
    }
    emit(c, OpCode::Return, node.location.clone());
    Ok(())
}
