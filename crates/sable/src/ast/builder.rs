//! Helpers for building trees by hand, for hosts without a front end and
//! for tests. Every node starts at `script:1:1`; use [`AstNode::at`] to move it.

use super::{AstNode, Branch, NodeKind, Payload};
use crate::sable_value::Value;
use crate::sable_vm::opcode::SourceLocation;

fn node(kind: NodeKind) -> AstNode {
    AstNode::new(kind, SourceLocation::new("script", 1, 1))
}

fn literal(kind: NodeKind, value: Value) -> AstNode {
    node(kind).with_payload(Payload::Literal(value))
}

fn binary(kind: NodeKind, left: AstNode, right: AstNode) -> AstNode {
    node(kind)
        .with_branch(Branch::Left, left)
        .with_branch(Branch::Right, right)
}

fn unary(kind: NodeKind, operand: AstNode) -> AstNode {
    node(kind).with_payload(Payload::Node(Box::new(operand)))
}

pub fn nil() -> AstNode {
    literal(NodeKind::Nil, Value::Nil)
}

pub fn num(n: f64) -> AstNode {
    literal(NodeKind::Number, Value::Number(n))
}

pub fn string(s: &str) -> AstNode {
    literal(NodeKind::String, Value::string(s))
}

pub fn ident(name: &str) -> AstNode {
    literal(NodeKind::Identifier, Value::string(name))
}

pub fn new_local(name: &str) -> AstNode {
    literal(NodeKind::NewLocal, Value::string(name))
}

pub fn assign(target: AstNode, value: AstNode) -> AstNode {
    binary(NodeKind::Assign, target, value)
}

/// `let name = value`
pub fn let_(name: &str, value: AstNode) -> AstNode {
    assign(new_local(name), value)
}

/// `name = value`
pub fn set(name: &str, value: AstNode) -> AstNode {
    assign(ident(name), value)
}

/// `target op= value`, desugared to `target = target op value`.
pub fn compound(kind: NodeKind, target: AstNode, value: AstNode) -> AstNode {
    assign(target.clone(), binary(kind, target, value))
}

pub fn index(target: AstNode, index: AstNode) -> AstNode {
    binary(NodeKind::Index, target, index)
}

pub fn call(callee: AstNode, args: Vec<AstNode>) -> AstNode {
    node(NodeKind::Call)
        .with_branch(Branch::Left, callee)
        .with_payload(Payload::List(args))
}

pub fn method_call(receiver: AstNode, name: &str, args: Vec<AstNode>) -> AstNode {
    node(NodeKind::MethodCall)
        .with_branch(Branch::Left, receiver)
        .with_branch(Branch::Right, string(name))
        .with_payload(Payload::List(args))
}

pub fn op(kind: NodeKind, left: AstNode, right: AstNode) -> AstNode {
    binary(kind, left, right)
}

pub fn add(left: AstNode, right: AstNode) -> AstNode {
    binary(NodeKind::Add, left, right)
}

pub fn sub(left: AstNode, right: AstNode) -> AstNode {
    binary(NodeKind::Subtract, left, right)
}

pub fn mul(left: AstNode, right: AstNode) -> AstNode {
    binary(NodeKind::Multiply, left, right)
}

pub fn lt(left: AstNode, right: AstNode) -> AstNode {
    binary(NodeKind::LessThan, left, right)
}

pub fn eq(left: AstNode, right: AstNode) -> AstNode {
    binary(NodeKind::Equals, left, right)
}

pub fn and(left: AstNode, right: AstNode) -> AstNode {
    binary(NodeKind::And, left, right)
}

pub fn or(left: AstNode, right: AstNode) -> AstNode {
    binary(NodeKind::Or, left, right)
}

pub fn neg(operand: AstNode) -> AstNode {
    unary(NodeKind::Negative, operand)
}

pub fn not(operand: AstNode) -> AstNode {
    unary(NodeKind::Not, operand)
}

pub fn length(operand: AstNode) -> AstNode {
    unary(NodeKind::Length, operand)
}

pub fn array(items: Vec<AstNode>) -> AstNode {
    node(NodeKind::ArrayLiteral).with_payload(Payload::List(items))
}

pub fn table(pairs: Vec<(AstNode, AstNode)>) -> AstNode {
    let pairs = pairs
        .into_iter()
        .map(|(key, value)| binary(NodeKind::Pair, key, value))
        .collect();
    node(NodeKind::TableLiteral).with_payload(Payload::List(pairs))
}

pub fn function(params: &[&str], body: Vec<AstNode>) -> AstNode {
    node(NodeKind::FunctionLiteral)
        .with_payload(Payload::List(params.iter().map(|p| ident(p)).collect()))
        .with_branch(Branch::Body, block(body))
}

pub fn block(statements: Vec<AstNode>) -> AstNode {
    node(NodeKind::Block).with_payload(Payload::List(statements))
}

fn conditional(kind: NodeKind, condition: AstNode, body: Vec<AstNode>) -> AstNode {
    node(kind)
        .with_payload(Payload::List(vec![condition]))
        .with_branch(Branch::Body, block(body))
}

pub fn if_(condition: AstNode, then: Vec<AstNode>) -> AstNode {
    conditional(NodeKind::If, condition, then)
}

pub fn if_else(condition: AstNode, then: Vec<AstNode>, otherwise: Vec<AstNode>) -> AstNode {
    if_(condition, then).with_branch(Branch::Else, block(otherwise))
}

pub fn while_(condition: AstNode, body: Vec<AstNode>) -> AstNode {
    conditional(NodeKind::While, condition, body)
}

pub fn loop_(count: AstNode, body: Vec<AstNode>) -> AstNode {
    conditional(NodeKind::Loop, count, body)
}

pub fn break_() -> AstNode {
    node(NodeKind::Break)
}

pub fn ret(value: Option<AstNode>) -> AstNode {
    let n = node(NodeKind::Return);
    match value {
        Some(v) => n.with_payload(Payload::Node(Box::new(v))),
        None => n,
    }
}

pub fn yield_(value: Option<AstNode>) -> AstNode {
    let n = node(NodeKind::Yield);
    match value {
        Some(v) => n.with_payload(Payload::Node(Box::new(v))),
        None => n,
    }
}
