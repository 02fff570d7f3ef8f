// Expression compilation
use smol_str::SmolStr;

use super::code::{emit, emit_index, emit_with, get_label, jump, patch_to_here};
use super::stmt::{compile_statement, construct_name, required_branch};
use super::{Binding, CompileResult, Compiler, param_names};
use crate::ast::{AstNode, Branch, NodeKind, Payload};
use crate::sable_value::Value;
use crate::sable_vm::opcode::{OpCode, SourceLocation};
use crate::sable_vm::sable_error::CompileErrorKind;

/// Compile an expression. With `require_push` it leaves exactly one value on
/// the stack, otherwise nothing.
pub fn compile_expr(c: &mut Compiler, node: &AstNode, require_push: bool) -> CompileResult<()> {
    let location = node.location.clone();
    match node.kind {
        NodeKind::Nil => {
            if require_push {
                emit(c, OpCode::PushNil, location);
            }
        }
        NodeKind::Number | NodeKind::String => {
            let value = literal_of(c, node)?;
            if require_push {
                emit_with(c, OpCode::PushConst, value, location);
            }
        }
        NodeKind::Identifier => {
            compile_load(c, node)?;
            discard_unless(c, require_push, location);
        }
        NodeKind::NewLocal => {
            if require_push {
                return Err(c.error(CompileErrorKind::StatementAsValue { node: node.kind }, node));
            }
            // Bare declaration: the slot starts out nil.
            let name = name_of(c, node)?;
            c.declare_local(&name);
        }
        NodeKind::Assign => compile_assign(c, node, require_push)?,
        NodeKind::Index => {
            let target = required_branch(c, node, Branch::Left)?;
            let index = required_branch(c, node, Branch::Right)?;
            compile_expr(c, target, true)?;
            compile_expr(c, index, true)?;
            emit(c, OpCode::GetIndex, location.clone());
            discard_unless(c, require_push, location);
        }
        NodeKind::Call => {
            compile_call(c, node)?;
            discard_unless(c, require_push, location);
        }
        NodeKind::MethodCall => {
            compile_method_call(c, node)?;
            discard_unless(c, require_push, location);
        }
        NodeKind::And => compile_logical(c, node, OpCode::JumpIfFalseKeep, require_push)?,
        NodeKind::Or => compile_logical(c, node, OpCode::JumpIfTrueKeep, require_push)?,
        NodeKind::Negative | NodeKind::Not | NodeKind::Length => {
            let operand = node.payload_node().ok_or_else(|| {
                c.error(
                    CompileErrorKind::MalformedPayload {
                        node: node.kind,
                        expected: "an operand node",
                    },
                    node,
                )
            })?;
            compile_expr(c, operand, true)?;
            let op = match node.kind {
                NodeKind::Negative => OpCode::Negative,
                NodeKind::Not => OpCode::Not,
                _ => OpCode::Length,
            };
            emit(c, op, location.clone());
            discard_unless(c, require_push, location);
        }
        NodeKind::ArrayLiteral => {
            compile_array(c, node)?;
            discard_unless(c, require_push, location);
        }
        NodeKind::TableLiteral => {
            compile_table(c, node)?;
            discard_unless(c, require_push, location);
        }
        NodeKind::FunctionLiteral => {
            compile_function(c, node, None)?;
            discard_unless(c, require_push, location);
        }
        NodeKind::Yield => compile_yield(c, node, require_push)?,
        kind if kind.is_control_flow() => {
            return Err(c.error(
                CompileErrorKind::ControlFlowNotAllowed {
                    construct: construct_name(kind),
                },
                node,
            ));
        }
        NodeKind::Block | NodeKind::Return => {
            return Err(c.error(CompileErrorKind::StatementAsValue { node: node.kind }, node));
        }
        NodeKind::Pair => {
            return Err(c.error(
                CompileErrorKind::UnexpectedNode {
                    found: node.kind,
                    context: "expression position",
                },
                node,
            ));
        }
        kind => {
            let Some(op) = binary_opcode(kind) else {
                return Err(c.error(
                    CompileErrorKind::UnexpectedNode {
                        found: kind,
                        context: "expression position",
                    },
                    node,
                ));
            };
            let left = required_branch(c, node, Branch::Left)?;
            let right = required_branch(c, node, Branch::Right)?;
            compile_expr(c, left, true)?;
            compile_expr(c, right, true)?;
            emit(c, op, location.clone());
            discard_unless(c, require_push, location);
        }
    }
    Ok(())
}

fn binary_opcode(kind: NodeKind) -> Option<OpCode> {
    let op = match kind {
        NodeKind::Add => OpCode::Add,
        NodeKind::Subtract => OpCode::Subtract,
        NodeKind::Multiply => OpCode::Multiply,
        NodeKind::Divide => OpCode::Divide,
        NodeKind::Modulo => OpCode::Modulo,
        NodeKind::Power => OpCode::Power,
        NodeKind::Concat => OpCode::Concat,
        NodeKind::Equals => OpCode::Equals,
        NodeKind::NotEquals => OpCode::NotEquals,
        NodeKind::LessThan => OpCode::LessThan,
        NodeKind::LessEqual => OpCode::LessEqual,
        NodeKind::GreaterThan => OpCode::GreaterThan,
        NodeKind::GreaterEqual => OpCode::GreaterEqual,
        NodeKind::SequenceEquals => OpCode::SequenceEquals,
        NodeKind::Is => OpCode::Is,
        _ => return None,
    };
    Some(op)
}

#[inline]
fn discard_unless(c: &mut Compiler, require_push: bool, location: SourceLocation) {
    if !require_push {
        emit(c, OpCode::Pop, location);
    }
}

fn literal_of(c: &Compiler, node: &AstNode) -> CompileResult<Value> {
    match (node.kind, node.literal()) {
        (NodeKind::Number, Some(v @ Value::Number(_))) | (NodeKind::String, Some(v @ Value::String(_))) => {
            Ok(v.clone())
        }
        _ => Err(c.error(
            CompileErrorKind::MalformedPayload {
                node: node.kind,
                expected: "a literal of the node's type",
            },
            node,
        )),
    }
}

fn name_of(c: &Compiler, node: &AstNode) -> CompileResult<SmolStr> {
    node.name().ok_or_else(|| {
        c.error(
            CompileErrorKind::MalformedPayload {
                node: node.kind,
                expected: "a name",
            },
            node,
        )
    })
}

fn compile_load(c: &mut Compiler, node: &AstNode) -> CompileResult<()> {
    let name = name_of(c, node)?;
    let location = node.location.clone();
    match c.resolve(&name) {
        Binding::Argument(slot) => emit_index(c, OpCode::LoadArg, slot, location),
        Binding::Local(packed) => emit_index(c, OpCode::LoadLocal, packed, location),
        Binding::Global(name) => emit_with(c, OpCode::LoadGlobal, Value::String(name), location),
    };
    Ok(())
}

fn compile_store(c: &mut Compiler, binding: Binding, location: SourceLocation) {
    match binding {
        Binding::Argument(slot) => emit_index(c, OpCode::StoreArg, slot, location),
        Binding::Local(packed) => emit_index(c, OpCode::StoreLocal, packed, location),
        Binding::Global(name) => emit_with(c, OpCode::StoreGlobal, Value::String(name), location),
    };
}

/// Compile the right-hand side of a binding. A function literal takes the
/// name it is bound to.
fn compile_value(c: &mut Compiler, value: &AstNode, name: Option<SmolStr>) -> CompileResult<()> {
    if value.kind == NodeKind::FunctionLiteral {
        compile_function(c, value, name)
    } else {
        compile_expr(c, value, true)
    }
}

fn compile_assign(c: &mut Compiler, node: &AstNode, require_push: bool) -> CompileResult<()> {
    let target = required_branch(c, node, Branch::Left)?;
    let value = required_branch(c, node, Branch::Right)?;
    let location = node.location.clone();

    match target.kind {
        NodeKind::NewLocal | NodeKind::Identifier => {
            let name = name_of(c, target)?;
            // Declared before the value so a function can refer to itself.
            let binding = if target.kind == NodeKind::NewLocal {
                c.declare_local(&name)
            } else {
                c.resolve(&name)
            };
            compile_value(c, value, Some(name))?;
            if require_push {
                emit(c, OpCode::Dup, location.clone());
            }
            compile_store(c, binding, location);
        }
        NodeKind::Index => {
            let container = required_branch(c, target, Branch::Left)?;
            let index = required_branch(c, target, Branch::Right)?;
            compile_expr(c, container, true)?;
            compile_expr(c, index, true)?;
            let name = index.literal().and_then(|v| v.as_str()).map(SmolStr::new);
            compile_value(c, value, name)?;
            emit(c, OpCode::SetIndex, location.clone());
            discard_unless(c, require_push, location);
        }
        found => {
            return Err(c.error(
                CompileErrorKind::NodeKindMismatch {
                    expected: "assignment target",
                    found,
                },
                target,
            ));
        }
    }
    Ok(())
}

fn compile_call(c: &mut Compiler, node: &AstNode) -> CompileResult<()> {
    let callee = required_branch(c, node, Branch::Left)?;
    compile_expr(c, callee, true)?;
    let args = node.children();
    for arg in args {
        compile_expr(c, arg, true)?;
    }
    emit_index(c, OpCode::Call, args.len(), node.location.clone());
    Ok(())
}

fn compile_method_call(c: &mut Compiler, node: &AstNode) -> CompileResult<()> {
    let receiver = required_branch(c, node, Branch::Left)?;
    let method = required_branch(c, node, Branch::Right)?;
    let name = match (method.kind, method.name()) {
        (NodeKind::String, Some(name)) => name,
        (found, _) => {
            return Err(c.error(
                CompileErrorKind::NodeKindMismatch {
                    expected: "method name string",
                    found,
                },
                method,
            ));
        }
    };

    compile_expr(c, receiver, true)?;
    let args = node.children();
    for arg in args {
        compile_expr(c, arg, true)?;
    }
    let operand = Value::new_array(vec![Value::String(name), Value::Number(args.len() as f64)]);
    emit_with(c, OpCode::CallMethod, operand, node.location.clone());
    Ok(())
}

/// `a and b` / `a or b`, keeping whichever operand decided the result.
fn compile_logical(
    c: &mut Compiler,
    node: &AstNode,
    op: OpCode,
    require_push: bool,
) -> CompileResult<()> {
    let left = required_branch(c, node, Branch::Left)?;
    let right = required_branch(c, node, Branch::Right)?;
    compile_expr(c, left, true)?;
    let short_circuit = jump(c, op, node.location.clone());
    compile_expr(c, right, true)?;
    patch_to_here(c, short_circuit);
    discard_unless(c, require_push, node.location.clone());
    Ok(())
}

fn compile_array(c: &mut Compiler, node: &AstNode) -> CompileResult<()> {
    if !matches!(node.payload, Payload::List(_) | Payload::None) {
        return Err(c.error(
            CompileErrorKind::MalformedPayload {
                node: node.kind,
                expected: "a list of elements",
            },
            node,
        ));
    }

    let start = emit(c, OpCode::NewArray, node.location.clone());
    let mut constants = Some(Vec::new());
    for item in node.children() {
        let before = get_label(c);
        compile_expr(c, item, true)?;
        if let Some(values) = constants.as_mut() {
            let single = get_label(c) == before + 1 && c.code[before].opcode.is_immediate_push();
            if single {
                values.push(c.code[before].operand.clone());
            } else {
                constants = None;
            }
        }
        emit(c, OpCode::ArrayAppend, item.location.clone());
    }

    // Every element was a constant: one PUSHARRAY replaces the appends.
    if let Some(values) = constants {
        c.code.truncate(start);
        emit_with(c, OpCode::PushArray, Value::new_array(values), node.location.clone());
    }
    Ok(())
}

fn compile_table(c: &mut Compiler, node: &AstNode) -> CompileResult<()> {
    emit(c, OpCode::NewTable, node.location.clone());
    for pair in node.children() {
        if pair.kind != NodeKind::Pair {
            return Err(c.error(
                CompileErrorKind::NodeKindMismatch {
                    expected: "table pair",
                    found: pair.kind,
                },
                pair,
            ));
        }
        let key = required_branch(c, pair, Branch::Left)?;
        let value = required_branch(c, pair, Branch::Right)?;
        compile_expr(c, key, true)?;
        let name = key.literal().and_then(|v| v.as_str()).map(SmolStr::new);
        compile_value(c, value, name)?;
        emit(c, OpCode::TableInsert, pair.location.clone());
    }
    Ok(())
}

/// Compile a function literal in a child compiler and push it.
fn compile_function(c: &mut Compiler, node: &AstNode, name: Option<SmolStr>) -> CompileResult<()> {
    let params = param_names(c, node.children())?;
    let body = required_branch(c, node, Branch::Body)?;
    let name = name.unwrap_or_else(|| SmolStr::new_static("anonymous"));

    let mut child = c.child(name, params, node.location.clone());
    compile_statement(&mut child, body)?;
    let function = child.finish()?;

    emit_with(c, OpCode::PushFunction, Value::Function(function), node.location.clone());
    Ok(())
}

pub fn compile_yield(c: &mut Compiler, node: &AstNode, require_push: bool) -> CompileResult<()> {
    match node.payload_node() {
        Some(value) => compile_expr(c, value, true)?,
        None => {
            emit(c, OpCode::PushNil, node.location.clone());
        }
    }
    emit(c, OpCode::Yield, node.location.clone());
    // The resumed yield evaluates to nil.
    discard_unless(c, require_push, node.location.clone());
    Ok(())
}
