//! Abstract syntax tree produced by the parser (§4.2, component B).
//!
//! Variable references are kept as plain names; resolution against locals,
//! slots, or globals happens at interpreter time following the naming rule,
//! not during parsing (see `interpreter.rs::resolve`).

use crate::error::Position;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Symbol(String),
}

/// How a message send resolves its method, beyond the ordinary "look up on
/// the receiver's class" rule (§4.5).
#[derive(Debug, Clone, PartialEq)]
pub enum SuperKind {
    /// `super foo`: restart lookup at the first superclass of the class
    /// defining the currently-executing method.
    Super,
    /// `super<Parent> foo`: restart lookup at `Parent`'s merged table.
    Scoped(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// A bare identifier read. `is_super` marks the pseudo-variable `self`'s
    /// sibling `super`; scoped super (`super<Parent>`) is carried on the
    /// enclosing `MessageSend` instead, since it only has meaning there.
    Identifier(String),
    Assign { name: String, value: Box<Expr>, position: Position },
    MessageSend {
        receiver: Box<Expr>,
        selector: String,
        args: Vec<Expr>,
        /// `super` or `super<Parent>` sends restart lookup above the
        /// defining class instead of at the receiver's class (§4.5).
        super_scope: Option<SuperKind>,
        /// Cascaded sends (`;`) to the same receiver as this one.
        cascades: Vec<Cascade>,
        position: Position,
    },
    Block(Block),
    Return { value: Box<Expr>, position: Position },
    ArrayLiteral(Vec<Expr>),
    TableLiteral(Vec<(Expr, Expr)>),
    /// `ClassExpr>>selector params [body]` sugar (§4.2 "Method definition
    /// sugar"), elaborated into an expression that installs the method.
    MethodDefinition { target_class: Box<Expr>, is_class_side: bool, method: MethodLiteral },
}

impl Expr {
    #[must_use]
    pub fn position(&self) -> Position {
        match self {
            Self::Assign { position, .. }
            | Self::MessageSend { position, .. }
            | Self::Return { position, .. } => *position,
            Self::Block(b) => b.position,
            Self::Literal(_) | Self::Identifier(_) | Self::ArrayLiteral(_) | Self::TableLiteral(_) => {
                Position::default()
            }
            Self::MethodDefinition { method, .. } => method.position,
        }
    }
}

/// A cascaded message: same receiver as the message it follows, new
/// selector/arguments (§4.2 "Cascades").
#[derive(Debug, Clone, PartialEq)]
pub struct Cascade {
    pub selector: String,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub params: Vec<String>,
    pub temporaries: Vec<String>,
    pub body: Vec<Expr>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodLiteral {
    pub selector: String,
    pub params: Vec<String>,
    pub temporaries: Vec<String>,
    pub body: Vec<Expr>,
    pub position: Position,
}

/// A whole source file: a sequence of top-level statements evaluated in
/// order (§6 "Source file format").
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Expr>,
}
