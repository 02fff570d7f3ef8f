// Desugared syntax tree consumed by the code generator
// The front end (scanner, parser, desugaring) lives outside this crate; it
// hands over trees whose shapes are listed on `NodeKind`.

pub mod builder;

use smol_str::SmolStr;

use crate::sable_value::Value;
use crate::sable_vm::opcode::SourceLocation;

/// Node kinds and their shapes.
///
/// | Kind | Shape |
/// |---|---|
/// | `Nil`, `Number`, `String` | literal payload |
/// | `Identifier`, `NewLocal` | literal string payload (the name) |
/// | `Assign` | `Left` target, `Right` value |
/// | `Index` | `Left` target, `Right` index |
/// | `Call` | `Left` callee, list payload of arguments |
/// | `MethodCall` | `Left` receiver, `Right` String name, list payload of arguments |
/// | binary operators | `Left`, `Right` |
/// | `Negative`, `Not`, `Length` | node payload |
/// | `ArrayLiteral`, `Block` | list payload |
/// | `TableLiteral` | list payload of `Pair` (`Left` key, `Right` value) |
/// | `FunctionLiteral` | list payload of Identifier params, `Body` |
/// | `If` | one condition (list payload or `Condition`), `Body`, optional `Else` |
/// | `While`, `Loop` | one condition or count (list payload or `Condition`), `Body` |
/// | `Return`, `Yield` | optional node payload |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Nil,
    Number,
    String,
    Identifier,
    NewLocal,
    Assign,
    Index,
    Call,
    MethodCall,

    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Concat,
    Equals,
    NotEquals,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    SequenceEquals,
    Is,
    And,
    Or,

    Negative,
    Not,
    Length,

    ArrayLiteral,
    TableLiteral,
    Pair,
    FunctionLiteral,

    Block,
    If,
    While,
    Loop,
    Break,
    Return,
    Yield,
}

impl NodeKind {
    pub fn is_control_flow(self) -> bool {
        matches!(
            self,
            NodeKind::If | NodeKind::While | NodeKind::Loop | NodeKind::Break
        )
    }
}

/// Named child slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    Left,
    Right,
    Condition,
    Body,
    Else,
}

#[derive(Debug, Clone, Default)]
pub enum Payload {
    #[default]
    None,
    Literal(Value),
    Node(Box<AstNode>),
    List(Vec<AstNode>),
}

#[derive(Debug, Clone)]
pub struct AstNode {
    pub kind: NodeKind,
    pub location: SourceLocation,
    pub branches: Vec<(Branch, AstNode)>,
    pub payload: Payload,
}

impl AstNode {
    pub fn new(kind: NodeKind, location: SourceLocation) -> Self {
        AstNode {
            kind,
            location,
            branches: Vec::new(),
            payload: Payload::None,
        }
    }

    pub fn with_branch(mut self, branch: Branch, node: AstNode) -> Self {
        self.branches.push((branch, node));
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Move this node to `line:column` in the same file.
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.location = self.location.at(line, column);
        self
    }

    pub fn branch(&self, branch: Branch) -> Option<&AstNode> {
        self.branches
            .iter()
            .find(|(b, _)| *b == branch)
            .map(|(_, node)| node)
    }

    pub fn literal(&self) -> Option<&Value> {
        match &self.payload {
            Payload::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// Name carried by `Identifier`, `NewLocal` and `String` nodes.
    pub fn name(&self) -> Option<SmolStr> {
        match &self.payload {
            Payload::Literal(Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    /// Payload as a list of nodes. A single node payload counts as a list of
    /// one and an absent payload as an empty list.
    pub fn children(&self) -> &[AstNode] {
        match &self.payload {
            Payload::List(nodes) => nodes,
            Payload::Node(node) => std::slice::from_ref(node.as_ref()),
            _ => &[],
        }
    }

    pub fn payload_node(&self) -> Option<&AstNode> {
        match &self.payload {
            Payload::Node(node) => Some(node),
            _ => None,
        }
    }
}
