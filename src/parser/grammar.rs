//! # Grammar
//!
//! The Conch grammar as an ordered list of rules. A rule's index is its
//! priority: earlier rules win conflicts, and on a shift/reduce conflict the
//! shift is retained when its priority is equal or lower. The ordering below
//! therefore encodes operator precedence (tightest first) and statement
//! disambiguation (`else` binds to the nearest `if`, statement-initial
//! identifiers resolve to commands).
//!
//! Each rule carries a reduction function that builds its AST node from the
//! matched parse-stack slice.

use once_cell::sync::Lazy;

use crate::ast::{
    AssignOp, AssignTarget, AstNode, BinOpKind, Binding, Cmd, CmdArg, Expr, ExprKind, LValue,
    LambdaExpr, NodeKind, Program, Stmt, StmtKind, StringNode, TypeNode, TypeNodeKind, UnOpKind,
};
use crate::lexer::TokenKind;

use super::{parse_interpolation, ParseError, ProductionItem};

/// One component of a grammar rule: a terminal or a nonterminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GrammarEntry {
    Token(TokenKind),
    Node(NodeKind),
}

/// A production: `result -> components`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GrammarRule {
    pub result: NodeKind,
    pub components: Vec<GrammarEntry>,
}

/// Builds the rule's AST node from the matched stack items.
pub type Reduction = fn(Vec<ProductionItem>) -> Result<AstNode, ParseError>;

pub struct Grammar {
    pub rules: Vec<GrammarRule>,
    pub reductions: Vec<Reduction>,
}

static GRAMMAR: Lazy<Grammar> = Lazy::new(define_grammar);

pub fn grammar() -> &'static Grammar {
    &GRAMMAR
}

fn t(kind: TokenKind) -> GrammarEntry {
    GrammarEntry::Token(kind)
}

fn n(kind: NodeKind) -> GrammarEntry {
    GrammarEntry::Node(kind)
}

fn take(items: &mut std::vec::IntoIter<ProductionItem>) -> ProductionItem {
    items
        .next()
        .unwrap_or_else(|| unreachable!("parse stack underflow during reduction"))
}

fn expr(items: &mut std::vec::IntoIter<ProductionItem>) -> Expr {
    match take(items).into_node() {
        AstNode::Expr(expr) => expr,
        node => unreachable!("expected expression on parse stack, found {:?}", node.kind()),
    }
}

fn exprs(items: &mut std::vec::IntoIter<ProductionItem>) -> Vec<Expr> {
    match take(items).into_node() {
        AstNode::Exprs(exprs) => exprs,
        node => unreachable!("expected expression list on parse stack, found {:?}", node.kind()),
    }
}

fn stmt(items: &mut std::vec::IntoIter<ProductionItem>) -> Stmt {
    match take(items).into_node() {
        AstNode::Stmt(stmt) => stmt,
        node => unreachable!("expected statement on parse stack, found {:?}", node.kind()),
    }
}

fn stmts(items: &mut std::vec::IntoIter<ProductionItem>) -> Vec<Stmt> {
    match take(items).into_node() {
        AstNode::Stmts(stmts) => stmts,
        node => unreachable!("expected statement list on parse stack, found {:?}", node.kind()),
    }
}

fn lvalue(items: &mut std::vec::IntoIter<ProductionItem>) -> LValue {
    match take(items).into_node() {
        AstNode::LValue(lvalue) => lvalue,
        node => unreachable!("expected lvalue on parse stack, found {:?}", node.kind()),
    }
}

fn binding(items: &mut std::vec::IntoIter<ProductionItem>) -> Binding {
    match take(items).into_node() {
        AstNode::Binding(binding) => binding,
        node => unreachable!("expected binding on parse stack, found {:?}", node.kind()),
    }
}

fn bindings(items: &mut std::vec::IntoIter<ProductionItem>) -> Vec<Binding> {
    match take(items).into_node() {
        AstNode::Bindings(bindings) => bindings,
        node => unreachable!("expected binding list on parse stack, found {:?}", node.kind()),
    }
}

fn type_node(items: &mut std::vec::IntoIter<ProductionItem>) -> TypeNode {
    match take(items).into_node() {
        AstNode::Type(ty) => ty,
        node => unreachable!("expected type on parse stack, found {:?}", node.kind()),
    }
}

fn type_nodes(items: &mut std::vec::IntoIter<ProductionItem>) -> Vec<TypeNode> {
    match take(items).into_node() {
        AstNode::Types(types) => types,
        node => unreachable!("expected type list on parse stack, found {:?}", node.kind()),
    }
}

fn string(items: &mut std::vec::IntoIter<ProductionItem>) -> StringNode {
    match take(items).into_node() {
        AstNode::String(string) => string,
        node => unreachable!("expected string on parse stack, found {:?}", node.kind()),
    }
}

fn cmd(items: &mut std::vec::IntoIter<ProductionItem>) -> Cmd {
    match take(items).into_node() {
        AstNode::Cmd(cmd) => cmd,
        node => unreachable!("expected command on parse stack, found {:?}", node.kind()),
    }
}

fn token(items: &mut std::vec::IntoIter<ProductionItem>) -> crate::lexer::Token {
    take(items).into_token()
}

fn skip(items: &mut std::vec::IntoIter<ProductionItem>) {
    take(items);
}

/// Append an argument to the rightmost basic command of a command tree.
fn push_arg(cmd: &mut Cmd, arg: CmdArg) {
    match cmd {
        Cmd::Basic { args, .. } => args.push(arg),
        Cmd::Pipe { right, .. } => push_arg(right, arg),
        Cmd::Async(inner) => push_arg(inner, arg),
    }
}

struct Rules {
    rules: Vec<GrammarRule>,
    reductions: Vec<Reduction>,
}

impl Rules {
    fn add(&mut self, result: NodeKind, components: Vec<GrammarEntry>, reduction: Reduction) {
        self.rules.push(GrammarRule { result, components });
        self.reductions.push(reduction);
    }
}

fn binop_rule(rules: &mut Rules, kind: TokenKind) {
    rules.add(
        NodeKind::Expr,
        vec![n(NodeKind::Expr), t(kind), n(NodeKind::Expr)],
        |items| {
            let mut items = items.into_iter();
            let lhs = expr(&mut items);
            let op_token = token(&mut items);
            let rhs = expr(&mut items);
            let op = match op_token.kind {
                TokenKind::Exponentiate => BinOpKind::Exponentiate,
                TokenKind::Multiply => BinOpKind::Multiply,
                TokenKind::Divide => BinOpKind::Divide,
                TokenKind::Modulo => BinOpKind::Modulo,
                TokenKind::Add => BinOpKind::Add,
                TokenKind::Minus => BinOpKind::Subtract,
                TokenKind::Lesser => BinOpKind::Lesser,
                TokenKind::LesserEqual => BinOpKind::LesserEqual,
                TokenKind::Greater => BinOpKind::Greater,
                TokenKind::GreaterEqual => BinOpKind::GreaterEqual,
                TokenKind::DoubleEquals => BinOpKind::Equal,
                TokenKind::NotEquals => BinOpKind::NotEqual,
                TokenKind::And => BinOpKind::And,
                TokenKind::Or => BinOpKind::Or,
                kind => unreachable!("token {kind} is not a binary operator"),
            };
            let position = lhs.position.clone();
            Ok(AstNode::Expr(Expr::new(
                ExprKind::BinOp {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                position,
            )))
        },
    );
}

fn compound_assign_rule(rules: &mut Rules, kind: TokenKind) {
    rules.add(
        NodeKind::Expr,
        vec![n(NodeKind::LValue), t(kind), n(NodeKind::Expr)],
        |items| {
            let mut items = items.into_iter();
            let target = lvalue(&mut items);
            let op_token = token(&mut items);
            let value = expr(&mut items);
            let op = match op_token.kind {
                TokenKind::Equals => AssignOp::Set,
                TokenKind::AddEquals => AssignOp::Add,
                TokenKind::MinusEquals => AssignOp::Subtract,
                TokenKind::MultiplyEquals => AssignOp::Multiply,
                TokenKind::DivideEquals => AssignOp::Divide,
                TokenKind::ModuloEquals => AssignOp::Modulo,
                TokenKind::ExponentiateEquals => AssignOp::Exponentiate,
                kind => unreachable!("token {kind} is not an assignment operator"),
            };
            let position = target.position().clone();
            Ok(AstNode::Expr(Expr::new(
                ExprKind::Assign {
                    target: AssignTarget::LValue(target),
                    op,
                    value: Box::new(value),
                },
                position,
            )))
        },
    );
}

#[allow(clippy::too_many_lines)]
fn define_grammar() -> Grammar {
    let mut rules = Rules {
        rules: vec![],
        reductions: vec![],
    };

    //  Parenthesized expressions. Listed first so that `(x)` stays a
    //  parenthesized expression instead of reducing to a one-element list.
    rules.add(
        NodeKind::Expr,
        vec![t(TokenKind::LParen), n(NodeKind::Expr), t(TokenKind::RParen)],
        |items| {
            let mut items = items.into_iter();
            skip(&mut items);
            Ok(AstNode::Expr(expr(&mut items)))
        },
    );

    //  Meta rules.
    rules.add(NodeKind::Prgm, vec![n(NodeKind::Stmts)], |items| {
        let mut items = items.into_iter();
        Ok(AstNode::Program(Program {
            stmts: stmts(&mut items),
        }))
    });
    rules.add(
        NodeKind::Stmts,
        vec![n(NodeKind::Stmts), n(NodeKind::Stmt)],
        |items| {
            let mut items = items.into_iter();
            let mut list = stmts(&mut items);
            list.push(stmt(&mut items));
            Ok(AstNode::Stmts(list))
        },
    );
    rules.add(NodeKind::Stmts, vec![n(NodeKind::Stmt)], |items| {
        let mut items = items.into_iter();
        Ok(AstNode::Stmts(vec![stmt(&mut items)]))
    });

    //  Statements. `if`/`else` before `if` so the shift wins and `else`
    //  binds to the nearest `if`.
    rules.add(
        NodeKind::Stmt,
        vec![
            t(TokenKind::If),
            t(TokenKind::LParen),
            n(NodeKind::Expr),
            t(TokenKind::RParen),
            n(NodeKind::Stmt),
            t(TokenKind::Else),
            n(NodeKind::Stmt),
        ],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            skip(&mut items);
            let cond = expr(&mut items);
            skip(&mut items);
            let then_body = stmt(&mut items);
            skip(&mut items);
            let else_body = stmt(&mut items);
            Ok(AstNode::Stmt(Stmt::new(
                StmtKind::If {
                    cond,
                    then_body: Box::new(then_body),
                    else_body: Some(Box::new(else_body)),
                },
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Stmt,
        vec![
            t(TokenKind::If),
            t(TokenKind::LParen),
            n(NodeKind::Expr),
            t(TokenKind::RParen),
            n(NodeKind::Stmt),
        ],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            skip(&mut items);
            let cond = expr(&mut items);
            skip(&mut items);
            let then_body = stmt(&mut items);
            Ok(AstNode::Stmt(Stmt::new(
                StmtKind::If {
                    cond,
                    then_body: Box::new(then_body),
                    else_body: None,
                },
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Stmt,
        vec![
            t(TokenKind::For),
            t(TokenKind::LParen),
            n(NodeKind::Expr),
            t(TokenKind::Semicolon),
            n(NodeKind::Expr),
            t(TokenKind::Semicolon),
            n(NodeKind::Expr),
            t(TokenKind::RParen),
            n(NodeKind::Stmt),
        ],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            skip(&mut items);
            let init = expr(&mut items);
            skip(&mut items);
            let cond = expr(&mut items);
            skip(&mut items);
            let update = expr(&mut items);
            skip(&mut items);
            let body = stmt(&mut items);
            Ok(AstNode::Stmt(Stmt::new(
                StmtKind::For {
                    init,
                    cond,
                    update,
                    body: Box::new(body),
                },
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Stmt,
        vec![
            t(TokenKind::While),
            t(TokenKind::LParen),
            n(NodeKind::Expr),
            t(TokenKind::RParen),
            n(NodeKind::Stmt),
        ],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            skip(&mut items);
            let cond = expr(&mut items);
            skip(&mut items);
            let body = stmt(&mut items);
            Ok(AstNode::Stmt(Stmt::new(
                StmtKind::While {
                    cond,
                    body: Box::new(body),
                },
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Stmt,
        vec![
            t(TokenKind::Do),
            n(NodeKind::Stmt),
            t(TokenKind::While),
            t(TokenKind::LParen),
            n(NodeKind::Expr),
            t(TokenKind::RParen),
            t(TokenKind::Semicolon),
        ],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            let body = stmt(&mut items);
            skip(&mut items);
            skip(&mut items);
            let cond = expr(&mut items);
            Ok(AstNode::Stmt(Stmt::new(
                StmtKind::DoWhile {
                    body: Box::new(body),
                    cond,
                },
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Stmt,
        vec![t(TokenKind::LCurly), n(NodeKind::Stmts), t(TokenKind::RCurly)],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            Ok(AstNode::Stmt(Stmt::new(
                StmtKind::Scope(stmts(&mut items)),
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Stmt,
        vec![t(TokenKind::LCurly), t(TokenKind::RCurly)],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            Ok(AstNode::Stmt(Stmt::new(StmtKind::Scope(vec![]), position)))
        },
    );
    rules.add(
        NodeKind::Stmt,
        vec![
            t(TokenKind::Timeout),
            t(TokenKind::LParen),
            n(NodeKind::Expr),
            t(TokenKind::RParen),
            n(NodeKind::Stmt),
            t(TokenKind::Else),
            n(NodeKind::Expr),
            t(TokenKind::Semicolon),
        ],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            skip(&mut items);
            let millis = expr(&mut items);
            skip(&mut items);
            let body = stmt(&mut items);
            skip(&mut items);
            let message = expr(&mut items);
            Ok(AstNode::Stmt(Stmt::new(
                StmtKind::Timeout {
                    millis,
                    body: Box::new(body),
                    message,
                },
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Stmt,
        vec![
            t(TokenKind::Assert),
            t(TokenKind::LParen),
            n(NodeKind::Expr),
            t(TokenKind::Comma),
            n(NodeKind::Expr),
            t(TokenKind::RParen),
            t(TokenKind::Semicolon),
        ],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            skip(&mut items);
            let cond = expr(&mut items);
            skip(&mut items);
            let message = expr(&mut items);
            Ok(AstNode::Stmt(Stmt::new(
                StmtKind::Assert { cond, message },
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Stmt,
        vec![t(TokenKind::Return), n(NodeKind::Expr), t(TokenKind::Semicolon)],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            Ok(AstNode::Stmt(Stmt::new(
                StmtKind::Return(Some(expr(&mut items))),
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Stmt,
        vec![t(TokenKind::Return), t(TokenKind::Semicolon)],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            Ok(AstNode::Stmt(Stmt::new(StmtKind::Return(None), position)))
        },
    );
    rules.add(
        NodeKind::Stmt,
        vec![t(TokenKind::Break), t(TokenKind::Semicolon)],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            Ok(AstNode::Stmt(Stmt::new(StmtKind::Break, position)))
        },
    );
    rules.add(
        NodeKind::Stmt,
        vec![t(TokenKind::Continue), t(TokenKind::Semicolon)],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            Ok(AstNode::Stmt(Stmt::new(StmtKind::Continue, position)))
        },
    );
    rules.add(
        NodeKind::Stmt,
        vec![t(TokenKind::Print), n(NodeKind::Expr), t(TokenKind::Semicolon)],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            Ok(AstNode::Stmt(Stmt::new(
                StmtKind::Print(expr(&mut items)),
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Stmt,
        vec![t(TokenKind::Println), n(NodeKind::Expr), t(TokenKind::Semicolon)],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            Ok(AstNode::Stmt(Stmt::new(
                StmtKind::Println(expr(&mut items)),
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Stmt,
        vec![
            t(TokenKind::Write),
            n(NodeKind::Expr),
            t(TokenKind::To),
            n(NodeKind::Expr),
            t(TokenKind::Semicolon),
        ],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            let content = expr(&mut items);
            skip(&mut items);
            let path = expr(&mut items);
            Ok(AstNode::Stmt(Stmt::new(
                StmtKind::Write { content, path },
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Stmt,
        vec![
            t(TokenKind::Alias),
            t(TokenKind::Variable),
            t(TokenKind::Equals),
            n(NodeKind::Cmd),
            t(TokenKind::Semicolon),
        ],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            let name = token(&mut items).lexeme;
            skip(&mut items);
            let cmd = cmd(&mut items);
            Ok(AstNode::Stmt(Stmt::new(
                StmtKind::Alias { name, cmd },
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Stmt,
        vec![t(TokenKind::Import), n(NodeKind::String), t(TokenKind::Semicolon)],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            Ok(AstNode::Stmt(Stmt::new(
                StmtKind::Import {
                    path: string(&mut items),
                    stmts: vec![],
                },
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Stmt,
        vec![
            t(TokenKind::Type),
            t(TokenKind::Variable),
            t(TokenKind::Equals),
            n(NodeKind::Type),
            t(TokenKind::Semicolon),
        ],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            let name = token(&mut items).lexeme;
            skip(&mut items);
            let ty = type_node(&mut items);
            Ok(AstNode::Stmt(Stmt::new(
                StmtKind::TypeAlias { name, ty },
                position,
            )))
        },
    );

    //  Commands. Listed before the expression statement rules so that a
    //  statement-initial identifier reduces to a command.
    rules.add(
        NodeKind::Cmd,
        vec![n(NodeKind::Cmd), t(TokenKind::CmdStringVal)],
        |items| {
            let mut items = items.into_iter();
            let mut command = cmd(&mut items);
            let word = token(&mut items);
            push_arg(&mut command, CmdArg::Word(word.lexeme, word.position));
            Ok(AstNode::Cmd(command))
        },
    );
    rules.add(
        NodeKind::Cmd,
        vec![n(NodeKind::Cmd), n(NodeKind::String)],
        |items| {
            let mut items = items.into_iter();
            let mut command = cmd(&mut items);
            push_arg(&mut command, CmdArg::Str(string(&mut items)));
            Ok(AstNode::Cmd(command))
        },
    );
    rules.add(
        NodeKind::Cmd,
        vec![n(NodeKind::Cmd), t(TokenKind::Variable)],
        |items| {
            let mut items = items.into_iter();
            let mut command = cmd(&mut items);
            let variable = token(&mut items);
            push_arg(
                &mut command,
                CmdArg::Var {
                    name: variable.lexeme,
                    position: variable.position,
                },
            );
            Ok(AstNode::Cmd(command))
        },
    );
    rules.add(
        NodeKind::Cmd,
        vec![n(NodeKind::Cmd), t(TokenKind::Pipe), n(NodeKind::Cmd)],
        |items| {
            let mut items = items.into_iter();
            let left = cmd(&mut items);
            skip(&mut items);
            let right = cmd(&mut items);
            Ok(AstNode::Cmd(Cmd::Pipe {
                left: Box::new(left),
                right: Box::new(right),
            }))
        },
    );
    rules.add(
        NodeKind::Cmd,
        vec![n(NodeKind::Cmd), t(TokenKind::Ampersand)],
        |items| {
            let mut items = items.into_iter();
            let command = cmd(&mut items);
            Ok(AstNode::Cmd(Cmd::Async(Box::new(command))))
        },
    );
    rules.add(NodeKind::Cmd, vec![t(TokenKind::CmdStringVal)], |items| {
        let mut items = items.into_iter();
        let word = token(&mut items);
        let position = word.position.clone();
        Ok(AstNode::Cmd(Cmd::Basic {
            args: vec![CmdArg::Word(word.lexeme, word.position)],
            position,
        }))
    });
    rules.add(NodeKind::Cmd, vec![n(NodeKind::String)], |items| {
        let mut items = items.into_iter();
        let string = string(&mut items);
        let position = string.position.clone();
        Ok(AstNode::Cmd(Cmd::Basic {
            args: vec![CmdArg::Str(string)],
            position,
        }))
    });
    rules.add(NodeKind::Cmd, vec![t(TokenKind::Variable)], |items| {
        let mut items = items.into_iter();
        let variable = token(&mut items);
        let position = variable.position.clone();
        Ok(AstNode::Cmd(Cmd::Basic {
            args: vec![CmdArg::Var {
                name: variable.lexeme,
                position: variable.position,
            }],
            position,
        }))
    });
    rules.add(
        NodeKind::Stmt,
        vec![n(NodeKind::Cmd), t(TokenKind::Semicolon)],
        |items| {
            let mut items = items.into_iter();
            let command = cmd(&mut items);
            let position = command.position().clone();
            Ok(AstNode::Stmt(Stmt::new(StmtKind::Cmd(command), position)))
        },
    );
    rules.add(
        NodeKind::Stmt,
        vec![n(NodeKind::Expr), t(TokenKind::Variable), t(TokenKind::Semicolon)],
        |items| {
            let mut items = items.into_iter();
            let lambda = expr(&mut items);
            let name = token(&mut items).lexeme;
            let position = lambda.position.clone();
            Ok(AstNode::Stmt(Stmt::new(
                StmtKind::Function { name, lambda },
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Stmt,
        vec![n(NodeKind::Expr), t(TokenKind::Semicolon)],
        |items| {
            let mut items = items.into_iter();
            let expr = expr(&mut items);
            let position = expr.position.clone();
            Ok(AstNode::Stmt(Stmt::new(StmtKind::Expr(expr), position)))
        },
    );

    //  Expressions, tightest first: calls, indexing, postfix, prefix,
    //  arithmetic, comparison, equality, logic, ternary, assignment.
    rules.add(
        NodeKind::Expr,
        vec![n(NodeKind::Expr), t(TokenKind::LParen), t(TokenKind::RParen)],
        |items| {
            let mut items = items.into_iter();
            let callee = expr(&mut items);
            let position = callee.position.clone();
            Ok(AstNode::Expr(Expr::new(
                ExprKind::Call {
                    callee: Box::new(callee),
                    args: vec![],
                },
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Expr,
        vec![
            n(NodeKind::Expr),
            t(TokenKind::LParen),
            n(NodeKind::Exprs),
            t(TokenKind::RParen),
        ],
        |items| {
            let mut items = items.into_iter();
            let callee = expr(&mut items);
            skip(&mut items);
            let args = exprs(&mut items);
            let position = callee.position.clone();
            Ok(AstNode::Expr(Expr::new(
                ExprKind::Call {
                    callee: Box::new(callee),
                    args,
                },
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Expr,
        vec![
            n(NodeKind::Expr),
            t(TokenKind::Dot),
            t(TokenKind::Variable),
            t(TokenKind::LParen),
            t(TokenKind::RParen),
        ],
        |items| {
            let mut items = items.into_iter();
            let receiver = expr(&mut items);
            skip(&mut items);
            let name = token(&mut items).lexeme;
            let position = receiver.position.clone();
            Ok(AstNode::Expr(Expr::new(
                ExprKind::ApiCall {
                    receiver: Box::new(receiver),
                    name,
                    args: vec![],
                },
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Expr,
        vec![
            n(NodeKind::Expr),
            t(TokenKind::Dot),
            t(TokenKind::Variable),
            t(TokenKind::LParen),
            n(NodeKind::Exprs),
            t(TokenKind::RParen),
        ],
        |items| {
            let mut items = items.into_iter();
            let receiver = expr(&mut items);
            skip(&mut items);
            let name = token(&mut items).lexeme;
            skip(&mut items);
            let args = exprs(&mut items);
            let position = receiver.position.clone();
            Ok(AstNode::Expr(Expr::new(
                ExprKind::ApiCall {
                    receiver: Box::new(receiver),
                    name,
                    args,
                },
                position,
            )))
        },
    );
    rules.add(
        NodeKind::LValue,
        vec![
            n(NodeKind::LValue),
            t(TokenKind::LSquare),
            n(NodeKind::Expr),
            t(TokenKind::RSquare),
        ],
        |items| {
            let mut items = items.into_iter();
            let target = lvalue(&mut items);
            skip(&mut items);
            let index = expr(&mut items);
            let position = target.position().clone();
            Ok(AstNode::LValue(LValue::Index {
                target: Box::new(target),
                index: Box::new(index),
                position,
            }))
        },
    );
    rules.add(
        NodeKind::Expr,
        vec![
            n(NodeKind::Expr),
            t(TokenKind::LSquare),
            n(NodeKind::Expr),
            t(TokenKind::RSquare),
        ],
        |items| {
            let mut items = items.into_iter();
            let target = expr(&mut items);
            skip(&mut items);
            let index = expr(&mut items);
            let position = target.position.clone();
            Ok(AstNode::Expr(Expr::new(
                ExprKind::Index {
                    target: Box::new(target),
                    index: Box::new(index),
                },
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Expr,
        vec![n(NodeKind::LValue), t(TokenKind::Increment)],
        |items| {
            let mut items = items.into_iter();
            let target = lvalue(&mut items);
            let position = target.position().clone();
            Ok(AstNode::Expr(Expr::new(
                ExprKind::UnOp {
                    op: UnOpKind::PostIncrement,
                    operand: Box::new(Expr::new(ExprKind::LValue(target), position.clone())),
                },
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Expr,
        vec![n(NodeKind::LValue), t(TokenKind::Decrement)],
        |items| {
            let mut items = items.into_iter();
            let target = lvalue(&mut items);
            let position = target.position().clone();
            Ok(AstNode::Expr(Expr::new(
                ExprKind::UnOp {
                    op: UnOpKind::PostDecrement,
                    operand: Box::new(Expr::new(ExprKind::LValue(target), position.clone())),
                },
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Expr,
        vec![t(TokenKind::Increment), n(NodeKind::LValue)],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            let target = lvalue(&mut items);
            let target_position = target.position().clone();
            Ok(AstNode::Expr(Expr::new(
                ExprKind::UnOp {
                    op: UnOpKind::PreIncrement,
                    operand: Box::new(Expr::new(ExprKind::LValue(target), target_position)),
                },
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Expr,
        vec![t(TokenKind::Decrement), n(NodeKind::LValue)],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            let target = lvalue(&mut items);
            let target_position = target.position().clone();
            Ok(AstNode::Expr(Expr::new(
                ExprKind::UnOp {
                    op: UnOpKind::PreDecrement,
                    operand: Box::new(Expr::new(ExprKind::LValue(target), target_position)),
                },
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Expr,
        vec![t(TokenKind::Not), n(NodeKind::Expr)],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            let operand = expr(&mut items);
            Ok(AstNode::Expr(Expr::new(
                ExprKind::UnOp {
                    op: UnOpKind::Not,
                    operand: Box::new(operand),
                },
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Expr,
        vec![t(TokenKind::Minus), n(NodeKind::Expr)],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            let operand = expr(&mut items);
            Ok(AstNode::Expr(Expr::new(
                ExprKind::UnOp {
                    op: UnOpKind::Negate,
                    operand: Box::new(operand),
                },
                position,
            )))
        },
    );

    binop_rule(&mut rules, TokenKind::Exponentiate);
    binop_rule(&mut rules, TokenKind::Multiply);
    binop_rule(&mut rules, TokenKind::Divide);
    binop_rule(&mut rules, TokenKind::Modulo);
    binop_rule(&mut rules, TokenKind::Add);
    binop_rule(&mut rules, TokenKind::Minus);
    binop_rule(&mut rules, TokenKind::Lesser);
    binop_rule(&mut rules, TokenKind::LesserEqual);
    binop_rule(&mut rules, TokenKind::Greater);
    binop_rule(&mut rules, TokenKind::GreaterEqual);
    binop_rule(&mut rules, TokenKind::DoubleEquals);
    binop_rule(&mut rules, TokenKind::NotEquals);
    binop_rule(&mut rules, TokenKind::And);
    binop_rule(&mut rules, TokenKind::Or);

    rules.add(
        NodeKind::Expr,
        vec![
            n(NodeKind::Expr),
            t(TokenKind::Question),
            n(NodeKind::Expr),
            t(TokenKind::Colon),
            n(NodeKind::Expr),
        ],
        |items| {
            let mut items = items.into_iter();
            let cond = expr(&mut items);
            skip(&mut items);
            let if_true = expr(&mut items);
            skip(&mut items);
            let if_false = expr(&mut items);
            let position = cond.position.clone();
            Ok(AstNode::Expr(Expr::new(
                ExprKind::Ternary {
                    cond: Box::new(cond),
                    if_true: Box::new(if_true),
                    if_false: Box::new(if_false),
                },
                position,
            )))
        },
    );

    compound_assign_rule(&mut rules, TokenKind::Equals);
    compound_assign_rule(&mut rules, TokenKind::AddEquals);
    compound_assign_rule(&mut rules, TokenKind::MinusEquals);
    compound_assign_rule(&mut rules, TokenKind::MultiplyEquals);
    compound_assign_rule(&mut rules, TokenKind::DivideEquals);
    compound_assign_rule(&mut rules, TokenKind::ModuloEquals);
    compound_assign_rule(&mut rules, TokenKind::ExponentiateEquals);

    //  Declarations: `int x = 5`, `const float f = 1.5`.
    rules.add(
        NodeKind::Expr,
        vec![n(NodeKind::Binding), t(TokenKind::Equals), n(NodeKind::Expr)],
        |items| {
            let mut items = items.into_iter();
            let target = binding(&mut items);
            skip(&mut items);
            let value = expr(&mut items);
            let position = target.position.clone();
            Ok(AstNode::Expr(Expr::new(
                ExprKind::Assign {
                    target: AssignTarget::Binding(target),
                    op: AssignOp::Set,
                    value: Box::new(value),
                },
                position,
            )))
        },
    );

    rules.add(
        NodeKind::Expr,
        vec![t(TokenKind::Backtick), n(NodeKind::Cmd), t(TokenKind::Backtick)],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            let command = cmd(&mut items);
            Ok(AstNode::Expr(Expr::new(
                ExprKind::CmdExpr(Box::new(command)),
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Expr,
        vec![t(TokenKind::Scan), n(NodeKind::Expr)],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            let prompt = expr(&mut items);
            Ok(AstNode::Expr(Expr::new(
                ExprKind::Scan(Box::new(prompt)),
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Expr,
        vec![t(TokenKind::Read), n(NodeKind::Expr)],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            let path = expr(&mut items);
            Ok(AstNode::Expr(Expr::new(
                ExprKind::Read(Box::new(path)),
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Expr,
        vec![t(TokenKind::LSquare), t(TokenKind::RSquare)],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            Ok(AstNode::Expr(Expr::new(ExprKind::Array(vec![]), position)))
        },
    );
    rules.add(
        NodeKind::Expr,
        vec![t(TokenKind::LSquare), n(NodeKind::Exprs), t(TokenKind::RSquare)],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            Ok(AstNode::Expr(Expr::new(
                ExprKind::Array(exprs(&mut items)),
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Expr,
        vec![t(TokenKind::LParen), n(NodeKind::Exprs), t(TokenKind::RParen)],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            Ok(AstNode::Expr(Expr::new(
                ExprKind::Tuple(exprs(&mut items)),
                position,
            )))
        },
    );

    //  Lambdas: `(params) -> type stmt` and `(params) stmt`.
    rules.add(
        NodeKind::Expr,
        vec![
            t(TokenKind::LParen),
            n(NodeKind::Params),
            t(TokenKind::RParen),
            t(TokenKind::Lambda),
            n(NodeKind::Type),
            n(NodeKind::Stmt),
        ],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            let params = bindings(&mut items);
            skip(&mut items);
            skip(&mut items);
            let ret = type_node(&mut items);
            let body = stmt(&mut items);
            Ok(AstNode::Expr(Expr::new(
                ExprKind::Lambda(LambdaExpr {
                    params,
                    ret: Some(ret),
                    body: Box::new(body),
                }),
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Expr,
        vec![
            t(TokenKind::LParen),
            n(NodeKind::Params),
            t(TokenKind::RParen),
            n(NodeKind::Stmt),
        ],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            let params = bindings(&mut items);
            skip(&mut items);
            let body = stmt(&mut items);
            Ok(AstNode::Expr(Expr::new(
                ExprKind::Lambda(LambdaExpr {
                    params,
                    ret: None,
                    body: Box::new(body),
                }),
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Expr,
        vec![
            t(TokenKind::LParen),
            t(TokenKind::RParen),
            t(TokenKind::Lambda),
            n(NodeKind::Type),
            n(NodeKind::Stmt),
        ],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            skip(&mut items);
            skip(&mut items);
            let ret = type_node(&mut items);
            let body = stmt(&mut items);
            Ok(AstNode::Expr(Expr::new(
                ExprKind::Lambda(LambdaExpr {
                    params: vec![],
                    ret: Some(ret),
                    body: Box::new(body),
                }),
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Expr,
        vec![t(TokenKind::LParen), t(TokenKind::RParen), n(NodeKind::Stmt)],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            skip(&mut items);
            let body = stmt(&mut items);
            Ok(AstNode::Expr(Expr::new(
                ExprKind::Lambda(LambdaExpr {
                    params: vec![],
                    ret: None,
                    body: Box::new(body),
                }),
                position,
            )))
        },
    );

    //  Literals.
    rules.add(NodeKind::Expr, vec![t(TokenKind::IntVal)], |items| {
        let mut items = items.into_iter();
        let literal = token(&mut items);
        let value = literal.lexeme.parse::<i64>().map_err(|_| {
            ParseError::at("Invalid integer literal", literal.position.clone())
        })?;
        Ok(AstNode::Expr(Expr::new(ExprKind::Int(value), literal.position)))
    });
    rules.add(NodeKind::Expr, vec![t(TokenKind::FloatVal)], |items| {
        let mut items = items.into_iter();
        let literal = token(&mut items);
        let value = literal.lexeme.parse::<f64>().map_err(|_| {
            ParseError::at("Invalid float literal", literal.position.clone())
        })?;
        Ok(AstNode::Expr(Expr::new(
            ExprKind::Float(value),
            literal.position,
        )))
    });
    rules.add(NodeKind::Expr, vec![t(TokenKind::True)], |items| {
        let mut items = items.into_iter();
        let literal = token(&mut items);
        Ok(AstNode::Expr(Expr::new(
            ExprKind::Bool(true),
            literal.position,
        )))
    });
    rules.add(NodeKind::Expr, vec![t(TokenKind::False)], |items| {
        let mut items = items.into_iter();
        let literal = token(&mut items);
        Ok(AstNode::Expr(Expr::new(
            ExprKind::Bool(false),
            literal.position,
        )))
    });
    rules.add(NodeKind::Expr, vec![n(NodeKind::String)], |items| {
        let mut items = items.into_iter();
        let string = string(&mut items);
        let position = string.position.clone();
        Ok(AstNode::Expr(Expr::new(ExprKind::Str(string), position)))
    });
    rules.add(NodeKind::Expr, vec![n(NodeKind::LValue)], |items| {
        let mut items = items.into_iter();
        let lvalue = lvalue(&mut items);
        let position = lvalue.position().clone();
        Ok(AstNode::Expr(Expr::new(ExprKind::LValue(lvalue), position)))
    });

    //  Lists.
    rules.add(
        NodeKind::Exprs,
        vec![n(NodeKind::Exprs), t(TokenKind::Comma), n(NodeKind::Expr)],
        |items| {
            let mut items = items.into_iter();
            let mut list = exprs(&mut items);
            skip(&mut items);
            list.push(expr(&mut items));
            Ok(AstNode::Exprs(list))
        },
    );
    rules.add(NodeKind::Exprs, vec![n(NodeKind::Expr)], |items| {
        let mut items = items.into_iter();
        Ok(AstNode::Exprs(vec![expr(&mut items)]))
    });
    rules.add(
        NodeKind::Params,
        vec![n(NodeKind::Params), t(TokenKind::Comma), n(NodeKind::Param)],
        |items| {
            let mut items = items.into_iter();
            let mut list = bindings(&mut items);
            skip(&mut items);
            list.push(binding(&mut items));
            Ok(AstNode::Bindings(list))
        },
    );
    rules.add(NodeKind::Params, vec![n(NodeKind::Param)], |items| {
        let mut items = items.into_iter();
        Ok(AstNode::Bindings(vec![binding(&mut items)]))
    });

    //  Lambda parameters. The `name: type` form only exists here; in open
    //  expression position it would collide with the ternary colon.
    rules.add(
        NodeKind::Param,
        vec![t(TokenKind::Variable), t(TokenKind::Colon), n(NodeKind::Type)],
        |items| {
            let mut items = items.into_iter();
            let name = token(&mut items);
            skip(&mut items);
            let ty = type_node(&mut items);
            Ok(AstNode::Binding(Binding {
                name: name.lexeme,
                ty: Some(ty),
                constant: false,
                position: name.position,
            }))
        },
    );
    rules.add(
        NodeKind::Param,
        vec![n(NodeKind::Type), t(TokenKind::Variable)],
        |items| {
            let mut items = items.into_iter();
            let ty = type_node(&mut items);
            let name = token(&mut items);
            let position = ty.position.clone();
            Ok(AstNode::Binding(Binding {
                name: name.lexeme,
                ty: Some(ty),
                constant: false,
                position,
            }))
        },
    );

    //  Declaration bindings.
    rules.add(
        NodeKind::Binding,
        vec![n(NodeKind::Type), t(TokenKind::Variable)],
        |items| {
            let mut items = items.into_iter();
            let ty = type_node(&mut items);
            let name = token(&mut items);
            let position = ty.position.clone();
            Ok(AstNode::Binding(Binding {
                name: name.lexeme,
                ty: Some(ty),
                constant: false,
                position,
            }))
        },
    );
    rules.add(
        NodeKind::Binding,
        vec![t(TokenKind::Const), n(NodeKind::Type), t(TokenKind::Variable)],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            let ty = type_node(&mut items);
            let name = token(&mut items);
            Ok(AstNode::Binding(Binding {
                name: name.lexeme,
                ty: Some(ty),
                constant: true,
                position,
            }))
        },
    );

    //  Variables. Outranks the type-alias rule below so that `(x)` is a
    //  parenthesized expression; annotation positions have no lvalue items,
    //  so alias references still resolve there.
    rules.add(NodeKind::LValue, vec![t(TokenKind::Variable)], |items| {
        let mut items = items.into_iter();
        let name = token(&mut items);
        Ok(AstNode::LValue(LValue::Variable {
            name: name.lexeme,
            position: name.position,
        }))
    });

    //  Types.
    rules.add(
        NodeKind::Types,
        vec![n(NodeKind::Types), t(TokenKind::Comma), n(NodeKind::Type)],
        |items| {
            let mut items = items.into_iter();
            let mut list = type_nodes(&mut items);
            skip(&mut items);
            list.push(type_node(&mut items));
            Ok(AstNode::Types(list))
        },
    );
    rules.add(NodeKind::Types, vec![n(NodeKind::Type)], |items| {
        let mut items = items.into_iter();
        Ok(AstNode::Types(vec![type_node(&mut items)]))
    });
    rules.add(NodeKind::Type, vec![t(TokenKind::Int)], |items| {
        let mut items = items.into_iter();
        let keyword = token(&mut items);
        Ok(AstNode::Type(TypeNode::new(TypeNodeKind::Int, keyword.position)))
    });
    rules.add(NodeKind::Type, vec![t(TokenKind::Float)], |items| {
        let mut items = items.into_iter();
        let keyword = token(&mut items);
        Ok(AstNode::Type(TypeNode::new(
            TypeNodeKind::Float,
            keyword.position,
        )))
    });
    rules.add(NodeKind::Type, vec![t(TokenKind::Bool)], |items| {
        let mut items = items.into_iter();
        let keyword = token(&mut items);
        Ok(AstNode::Type(TypeNode::new(TypeNodeKind::Bool, keyword.position)))
    });
    rules.add(NodeKind::Type, vec![t(TokenKind::String)], |items| {
        let mut items = items.into_iter();
        let keyword = token(&mut items);
        Ok(AstNode::Type(TypeNode::new(
            TypeNodeKind::String,
            keyword.position,
        )))
    });
    rules.add(
        NodeKind::Type,
        vec![n(NodeKind::Type), t(TokenKind::LSquare), t(TokenKind::RSquare)],
        |items| {
            let mut items = items.into_iter();
            let base = type_node(&mut items);
            let position = base.position.clone();
            Ok(AstNode::Type(TypeNode::new(
                TypeNodeKind::Array(Box::new(base)),
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Type,
        vec![
            t(TokenKind::LParen),
            n(NodeKind::Types),
            t(TokenKind::RParen),
            t(TokenKind::Lambda),
            n(NodeKind::Type),
        ],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            let params = type_nodes(&mut items);
            skip(&mut items);
            skip(&mut items);
            let ret = type_node(&mut items);
            Ok(AstNode::Type(TypeNode::new(
                TypeNodeKind::Function {
                    params,
                    ret: Box::new(ret),
                },
                position,
            )))
        },
    );
    rules.add(
        NodeKind::Type,
        vec![t(TokenKind::LParen), n(NodeKind::Types), t(TokenKind::RParen)],
        |items| {
            let mut items = items.into_iter();
            let position = token(&mut items).position;
            let parts = type_nodes(&mut items);
            Ok(AstNode::Type(TypeNode::new(
                TypeNodeKind::Tuple(parts),
                position,
            )))
        },
    );
    rules.add(NodeKind::Type, vec![t(TokenKind::Variable)], |items| {
        let mut items = items.into_iter();
        let name = token(&mut items);
        Ok(AstNode::Type(TypeNode::new(
            TypeNodeKind::Alias(name.lexeme),
            name.position,
        )))
    });

    //  Strings.
    rules.add(NodeKind::String, vec![t(TokenKind::StringVal)], |items| {
        let mut items = items.into_iter();
        let literal = token(&mut items);
        Ok(AstNode::String(parse_interpolation(&literal)?))
    });

    Grammar {
        rules: rules.rules,
        reductions: rules.reductions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_and_reduction_counts_match() {
        let grammar = grammar();
        assert_eq!(grammar.rules.len(), grammar.reductions.len());
    }

    #[test]
    fn test_first_rule_produces_expression() {
        // The parenthesized-expression rule outranks the list rules so that
        // `(x)` stays a parenthesized expression.
        let grammar = grammar();
        assert_eq!(grammar.rules[0].result, NodeKind::Expr);
        assert_eq!(
            grammar.rules[0].components,
            vec![
                GrammarEntry::Token(TokenKind::LParen),
                GrammarEntry::Node(NodeKind::Expr),
                GrammarEntry::Token(TokenKind::RParen),
            ]
        );
    }

    #[test]
    fn test_goal_is_program() {
        assert_eq!(
            grammar()
                .rules
                .iter()
                .filter(|rule| rule.result == NodeKind::Prgm)
                .count(),
            1
        );
    }
}
