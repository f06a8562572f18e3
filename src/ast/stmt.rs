use crate::lexer::FilePosition;

use super::{Cmd, Expr, StringNode, TypeNode};

/// A statement node.
#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub position: FilePosition,
}

impl Stmt {
    pub fn new(kind: StmtKind, position: FilePosition) -> Self {
        Self { kind, position }
    }

    pub fn sexp(&self, typed: bool) -> String {
        match &self.kind {
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => match else_body {
                Some(else_body) => format!(
                    "(If {} {} {})",
                    cond.sexp(typed),
                    then_body.sexp(typed),
                    else_body.sexp(typed)
                ),
                None => format!("(If {} {})", cond.sexp(typed), then_body.sexp(typed)),
            },
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => format!(
                "(For {} {} {} {})",
                init.sexp(typed),
                cond.sexp(typed),
                update.sexp(typed),
                body.sexp(typed)
            ),
            StmtKind::While { cond, body } => {
                format!("(While {} {})", cond.sexp(typed), body.sexp(typed))
            }
            StmtKind::DoWhile { body, cond } => {
                format!("(DoWhile {} {})", body.sexp(typed), cond.sexp(typed))
            }
            StmtKind::Return(Some(expr)) => format!("(Return {})", expr.sexp(typed)),
            StmtKind::Return(None) => "(Return)".to_string(),
            StmtKind::Break => "(Break)".to_string(),
            StmtKind::Continue => "(Continue)".to_string(),
            StmtKind::Scope(stmts) => {
                let stmts: Vec<_> = stmts.iter().map(|stmt| stmt.sexp(typed)).collect();
                format!("(Scope {})", stmts.join(" "))
            }
            StmtKind::Cmd(cmd) => format!("(CmdStmt {})", cmd.sexp(typed)),
            StmtKind::Expr(expr) => format!("(ExprStmt {})", expr.sexp(typed)),
            StmtKind::Alias { name, cmd } => format!("(Alias {name} {})", cmd.sexp(typed)),
            StmtKind::Import { path, .. } => format!("(Import {})", path.sexp(typed)),
            StmtKind::Print(expr) => format!("(Print {})", expr.sexp(typed)),
            StmtKind::Println(expr) => format!("(Println {})", expr.sexp(typed)),
            StmtKind::Write { content, path } => {
                format!("(Write {} {})", content.sexp(typed), path.sexp(typed))
            }
            StmtKind::Function { name, lambda } => {
                format!("(Function {name} {})", lambda.sexp(typed))
            }
            StmtKind::Timeout {
                millis,
                body,
                message,
            } => format!(
                "(Timeout {} {} {})",
                millis.sexp(typed),
                body.sexp(typed),
                message.sexp(typed)
            ),
            StmtKind::Assert { cond, message } => {
                format!("(Assert {} {})", cond.sexp(typed), message.sexp(typed))
            }
            StmtKind::TypeAlias { name, ty } => format!("(Type {name} {})", ty.sexp()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    If {
        cond: Expr,
        then_body: Box<Stmt>,
        else_body: Option<Box<Stmt>>,
    },
    For {
        init: Expr,
        cond: Expr,
        update: Expr,
        body: Box<Stmt>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Scope(Vec<Stmt>),
    Cmd(Cmd),
    Expr(Expr),
    Alias {
        name: String,
        cmd: Cmd,
    },
    /// The imported program's statements are spliced in at parse time; the
    /// interpreter simply evaluates them in the current scope.
    Import {
        path: StringNode,
        stmts: Vec<Stmt>,
    },
    Print(Expr),
    Println(Expr),
    Write {
        content: Expr,
        path: Expr,
    },
    /// A lambda given a name: `(x: int) -> int { … } square;`
    Function {
        name: String,
        lambda: Expr,
    },
    Timeout {
        millis: Expr,
        body: Box<Stmt>,
        message: Expr,
    },
    Assert {
        cond: Expr,
        message: Expr,
    },
    TypeAlias {
        name: String,
        ty: TypeNode,
    },
}
