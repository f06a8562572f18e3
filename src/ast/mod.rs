//! # AST
//!
//! The node families produced by the parser: programs, statements,
//! expressions, commands, types, bindings, and string structure. Nodes own
//! their children; expression nodes carry an optional resolved type filled
//! in by the type checker.
//!
//! Every node can print itself as a stable S-expression (used by the `-p`
//! and `-t` CLI modes and the regression tests).

mod cmd;
mod expr;
mod stmt;
mod ty;

pub use cmd::*;
pub use expr::*;
pub use stmt::*;
pub use ty::*;

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The grammar's nonterminals. Grammar rules produce one of these, and the
/// GOTO table is keyed by them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum NodeKind {
    Prgm,
    Stmts,
    Stmt,
    Expr,
    Exprs,
    LValue,
    Binding,
    /// A lambda parameter. Structurally a binding, but a separate
    /// nonterminal so that `x: type` only parses inside parameter lists.
    Param,
    Params,
    Type,
    Types,
    String,
    Cmd,
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NodeKind::Prgm => "PRGM",
            NodeKind::Stmts => "STMTS",
            NodeKind::Stmt => "STMT",
            NodeKind::Expr => "EXPR",
            NodeKind::Exprs => "EXPRS",
            NodeKind::LValue => "LVALUE",
            NodeKind::Binding => "BINDING",
            NodeKind::Param => "PARAM",
            NodeKind::Params => "PARAMS",
            NodeKind::Type => "TYPE",
            NodeKind::Types => "TYPES",
            NodeKind::String => "STRING",
            NodeKind::Cmd => "CMD",
        };
        f.write_str(name)
    }
}

/// A parsed program: a sequence of statements.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

impl Program {
    pub fn sexp(&self, typed: bool) -> String {
        let stmts: Vec<_> = self.stmts.iter().map(|stmt| stmt.sexp(typed)).collect();
        format!("(Prgm {})", stmts.join(" "))
    }
}

/// One node of any family, as stored on the parse stack.
#[derive(Debug, Clone)]
pub enum AstNode {
    Program(Program),
    Stmts(Vec<Stmt>),
    Stmt(Stmt),
    Expr(Expr),
    Exprs(Vec<Expr>),
    LValue(LValue),
    Binding(Binding),
    Bindings(Vec<Binding>),
    Type(TypeNode),
    Types(Vec<TypeNode>),
    String(StringNode),
    Cmd(Cmd),
}

impl AstNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            AstNode::Program(_) => NodeKind::Prgm,
            AstNode::Stmts(_) => NodeKind::Stmts,
            AstNode::Stmt(_) => NodeKind::Stmt,
            AstNode::Expr(_) => NodeKind::Expr,
            AstNode::Exprs(_) => NodeKind::Exprs,
            AstNode::LValue(_) => NodeKind::LValue,
            AstNode::Binding(_) => NodeKind::Binding,
            AstNode::Bindings(_) => NodeKind::Params,
            AstNode::Type(_) => NodeKind::Type,
            AstNode::Types(_) => NodeKind::Types,
            AstNode::String(_) => NodeKind::String,
            AstNode::Cmd(_) => NodeKind::Cmd,
        }
    }
}
