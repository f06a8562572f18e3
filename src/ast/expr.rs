use std::fmt::Display;

use crate::lexer::FilePosition;
use crate::typechecker::Type;

use super::{Cmd, TypeNode};
use super::Stmt;

/// An expression node. `ty` is filled in by the type checker.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Option<Type>,
    pub position: FilePosition,
}

impl Expr {
    pub fn new(kind: ExprKind, position: FilePosition) -> Self {
        Self {
            kind,
            ty: None,
            position,
        }
    }

    pub fn sexp(&self, typed: bool) -> String {
        let body = match &self.kind {
            ExprKind::Int(value) => format!("Int {value}"),
            ExprKind::Float(value) => format!("Float {value}"),
            ExprKind::Bool(value) => format!("Bool {value}"),
            ExprKind::Str(string) => format!("String {}", string.sexp(typed)),
            ExprKind::LValue(lvalue) => return self.with_type(lvalue.sexp(typed), typed),
            ExprKind::Ternary {
                cond,
                if_true,
                if_false,
            } => format!(
                "Ternary {} {} {}",
                cond.sexp(typed),
                if_true.sexp(typed),
                if_false.sexp(typed)
            ),
            ExprKind::UnOp { op, operand } => {
                format!("UnOp {op} {}", operand.sexp(typed))
            }
            ExprKind::BinOp { op, lhs, rhs } => {
                format!("BinOp {op} {} {}", lhs.sexp(typed), rhs.sexp(typed))
            }
            ExprKind::Assign { target, op, value } => {
                format!("BinOp {op} {} {}", target.sexp(typed), value.sexp(typed))
            }
            ExprKind::Index { target, index } => {
                format!("Index {} {}", target.sexp(typed), index.sexp(typed))
            }
            ExprKind::Tuple(parts) => {
                let parts: Vec<_> = parts.iter().map(|part| part.sexp(typed)).collect();
                format!("Tuple {}", parts.join(" "))
            }
            ExprKind::Array(parts) => {
                let parts: Vec<_> = parts.iter().map(|part| part.sexp(typed)).collect();
                if parts.is_empty() {
                    "Array".to_string()
                } else {
                    format!("Array {}", parts.join(" "))
                }
            }
            ExprKind::Call { callee, args } => {
                let args: Vec<_> = args.iter().map(|arg| arg.sexp(typed)).collect();
                format!("Call {} {}", callee.sexp(typed), args.join(" "))
            }
            ExprKind::ApiCall {
                receiver,
                name,
                args,
            } => {
                let args: Vec<_> = args.iter().map(|arg| arg.sexp(typed)).collect();
                format!("ApiCall {} {name} {}", receiver.sexp(typed), args.join(" "))
            }
            ExprKind::Lambda(lambda) => {
                let params: Vec<_> = lambda
                    .params
                    .iter()
                    .map(|binding| binding.sexp(typed))
                    .collect();
                match &lambda.ret {
                    Some(ret) => format!(
                        "Lambda ({}) {} {}",
                        params.join(" "),
                        ret.sexp(),
                        lambda.body.sexp(typed)
                    ),
                    None => format!("Lambda ({}) {}", params.join(" "), lambda.body.sexp(typed)),
                }
            }
            ExprKind::CmdExpr(cmd) => format!("CmdExpr {}", cmd.sexp(typed)),
            ExprKind::Scan(prompt) => format!("Scan {}", prompt.sexp(typed)),
            ExprKind::Read(path) => format!("Read {}", path.sexp(typed)),
        };
        self.with_type(format!("({body})"), typed)
    }

    fn with_type(&self, body: String, typed: bool) -> String {
        match (&self.ty, typed) {
            (Some(ty), true) => {
                let inner = body
                    .strip_prefix('(')
                    .and_then(|rest| rest.strip_suffix(')'))
                    .unwrap_or(&body);
                format!("({inner} : {ty})")
            }
            _ => body,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(StringNode),
    LValue(LValue),
    Ternary {
        cond: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
    },
    UnOp {
        op: UnOpKind,
        operand: Box<Expr>,
    },
    BinOp {
        op: BinOpKind,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Assign {
        target: AssignTarget,
        op: AssignOp,
        value: Box<Expr>,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Tuple(Vec<Expr>),
    Array(Vec<Expr>),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    ApiCall {
        receiver: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
    Lambda(LambdaExpr),
    CmdExpr(Box<Cmd>),
    Scan(Box<Expr>),
    Read(Box<Expr>),
}

#[derive(Debug, Clone)]
pub struct LambdaExpr {
    pub params: Vec<Binding>,
    pub ret: Option<TypeNode>,
    pub body: Box<Stmt>,
}

/// A place an assignment can write to.
#[derive(Debug, Clone)]
pub enum LValue {
    Variable {
        name: String,
        position: FilePosition,
    },
    Index {
        target: Box<LValue>,
        index: Box<Expr>,
        position: FilePosition,
    },
}

impl LValue {
    pub fn position(&self) -> &FilePosition {
        match self {
            LValue::Variable { position, .. } => position,
            LValue::Index { position, .. } => position,
        }
    }

    pub fn sexp(&self, typed: bool) -> String {
        match self {
            LValue::Variable { name, .. } => format!("(Var {name})"),
            LValue::Index { target, index, .. } => {
                format!("(Index {} {})", target.sexp(typed), index.sexp(typed))
            }
        }
    }
}

/// The left side of an assignment: an existing place, or a fresh binding
/// (a declaration).
#[derive(Debug, Clone)]
pub enum AssignTarget {
    LValue(LValue),
    Binding(Binding),
}

impl AssignTarget {
    pub fn position(&self) -> &FilePosition {
        match self {
            AssignTarget::LValue(lvalue) => lvalue.position(),
            AssignTarget::Binding(binding) => &binding.position,
        }
    }

    pub fn sexp(&self, typed: bool) -> String {
        match self {
            AssignTarget::LValue(lvalue) => lvalue.sexp(typed),
            AssignTarget::Binding(binding) => binding.sexp(typed),
        }
    }
}

/// A name introduction, optionally typed, optionally constant.
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub ty: Option<TypeNode>,
    pub constant: bool,
    pub position: FilePosition,
}

impl Binding {
    pub fn sexp(&self, _typed: bool) -> String {
        match (&self.ty, self.constant) {
            (Some(ty), true) => format!("(Binding const {} {})", self.name, ty.sexp()),
            (Some(ty), false) => format!("(Binding {} {})", self.name, ty.sexp()),
            (None, _) => format!("(Binding {})", self.name),
        }
    }
}

/// One piece of a (possibly interpolated) string.
#[derive(Debug, Clone)]
pub enum StringPart {
    Literal(String),
    Expr(Expr),
}

/// A string: an ordered sequence of literal pieces and embedded expressions
/// whose concatenation produces the runtime value.
#[derive(Debug, Clone)]
pub struct StringNode {
    pub parts: Vec<StringPart>,
    pub position: FilePosition,
}

impl StringNode {
    /// The literal contents, if the string has no interpolation.
    pub fn as_literal(&self) -> Option<String> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                StringPart::Literal(literal) => out.push_str(literal),
                StringPart::Expr(_) => return None,
            }
        }
        Some(out)
    }

    pub fn sexp(&self, typed: bool) -> String {
        let parts: Vec<_> = self
            .parts
            .iter()
            .map(|part| match part {
                StringPart::Literal(literal) => format!("{literal:?}"),
                StringPart::Expr(expr) => expr.sexp(typed),
            })
            .collect();
        format!("({})", parts.join(" "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOpKind {
    Negate,
    Not,
    PreIncrement,
    PostIncrement,
    PreDecrement,
    PostDecrement,
}

impl Display for UnOpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UnOpKind::Negate => "NEGATE",
            UnOpKind::Not => "NOT",
            UnOpKind::PreIncrement => "PRE_INCREMENT",
            UnOpKind::PostIncrement => "POST_INCREMENT",
            UnOpKind::PreDecrement => "PRE_DECREMENT",
            UnOpKind::PostDecrement => "POST_DECREMENT",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpKind {
    Exponentiate,
    Multiply,
    Divide,
    Modulo,
    Add,
    Subtract,
    Lesser,
    LesserEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    And,
    Or,
}

impl BinOpKind {
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinOpKind::Exponentiate
                | BinOpKind::Multiply
                | BinOpKind::Divide
                | BinOpKind::Modulo
                | BinOpKind::Add
                | BinOpKind::Subtract
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOpKind::Lesser
                | BinOpKind::LesserEqual
                | BinOpKind::Greater
                | BinOpKind::GreaterEqual
        )
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, BinOpKind::Equal | BinOpKind::NotEqual)
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinOpKind::And | BinOpKind::Or)
    }
}

impl Display for BinOpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BinOpKind::Exponentiate => "EXPONENTIATE",
            BinOpKind::Multiply => "MULTIPLY",
            BinOpKind::Divide => "DIVIDE",
            BinOpKind::Modulo => "MODULO",
            BinOpKind::Add => "ADD",
            BinOpKind::Subtract => "SUBTRACT",
            BinOpKind::Lesser => "LESSER",
            BinOpKind::LesserEqual => "LESSER_EQUAL",
            BinOpKind::Greater => "GREATER",
            BinOpKind::GreaterEqual => "GREATER_EQUAL",
            BinOpKind::Equal => "EQUAL",
            BinOpKind::NotEqual => "NOT_EQUAL",
            BinOpKind::And => "AND",
            BinOpKind::Or => "OR",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Exponentiate,
}

impl AssignOp {
    /// The binary operator a compound assignment expands to: `x op= e` is
    /// `x = (x op e)`.
    pub fn desugared(&self) -> Option<BinOpKind> {
        match self {
            AssignOp::Set => None,
            AssignOp::Add => Some(BinOpKind::Add),
            AssignOp::Subtract => Some(BinOpKind::Subtract),
            AssignOp::Multiply => Some(BinOpKind::Multiply),
            AssignOp::Divide => Some(BinOpKind::Divide),
            AssignOp::Modulo => Some(BinOpKind::Modulo),
            AssignOp::Exponentiate => Some(BinOpKind::Exponentiate),
        }
    }
}

impl Display for AssignOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AssignOp::Set => "SET",
            AssignOp::Add => "ADD_EQUAL",
            AssignOp::Subtract => "SUBTRACT_EQUAL",
            AssignOp::Multiply => "MULTIPLY_EQUAL",
            AssignOp::Divide => "DIVIDE_EQUAL",
            AssignOp::Modulo => "MODULO_EQUAL",
            AssignOp::Exponentiate => "EXPONENTIATE_EQUAL",
        };
        f.write_str(name)
    }
}
