//! # Flow controller
//!
//! The tree-walking interpreter. Evaluates the typed AST over a chain of
//! runtime scopes, drives external commands through the job runner, and
//! implements the control-flow protocol: every statement yields `Normal`,
//! `Return`, `Break`, or `Continue`, and loops and function calls consume
//! the non-normal outcomes.

mod builtins;
mod ops;
mod scope;
mod value;

pub use scope::{Scope, ScopeRef};
pub use value::{LambdaValue, Value};

use std::collections::HashMap;
use std::error::Error;
use std::fmt::Display;
use std::fs;
use std::io::{self, BufRead, Write};
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::ast::{
    AssignTarget, Cmd, CmdArg, Expr, ExprKind, LValue, Program, Stmt, StmtKind, StringNode,
    StringPart, TypeNodeKind, UnOpKind,
};
use crate::jobs::{builtins as job_builtins, JobInfo, JobRunner, Process, ProcessKind};
use crate::lexer::FilePosition;
use crate::typechecker::builtins as builtin_signatures;
use crate::typechecker::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    General,
    AssertionFailed,
    TimeoutExpired,
}

#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub message: String,
    pub position: Option<FilePosition>,
}

impl RuntimeError {
    pub fn at(message: impl Into<String>, position: FilePosition) -> Self {
        Self {
            kind: RuntimeErrorKind::General,
            message: message.into(),
            position: Some(position),
        }
    }

    pub fn general(message: impl Into<String>) -> Self {
        Self {
            kind: RuntimeErrorKind::General,
            message: message.into(),
            position: None,
        }
    }
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.position {
            Some(position) => write!(f, "Runtime error at {position}: {}", self.message),
            None => write!(f, "Runtime error: {}", self.message),
        }
    }
}

impl Error for RuntimeError {}

/// The outcome of executing one statement.
#[derive(Debug)]
pub enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

pub struct FlowController {
    current: ScopeRef,
    out: Box<dyn Write>,
    runner: JobRunner,
    aliases: HashMap<String, Cmd>,
    deadline: Option<Instant>,
}

impl Default for FlowController {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowController {
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    pub fn with_output(out: Box<dyn Write>) -> Self {
        Self {
            current: Scope::root(),
            out,
            runner: JobRunner::new(),
            aliases: HashMap::new(),
            deadline: None,
        }
    }

    /// Execute a type-checked program.
    pub fn run(&mut self, program: &Program) -> Result<(), RuntimeError> {
        for stmt in &program.stmts {
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                Flow::Return(_) => {
                    return Err(RuntimeError::at(
                        "Return outside of a function",
                        stmt.position.clone(),
                    ));
                }
                Flow::Break | Flow::Continue => {
                    return Err(RuntimeError::at(
                        "Break or continue outside of a loop",
                        stmt.position.clone(),
                    ));
                }
            }
        }
        let _ = self.out.flush();
        Ok(())
    }

    fn push_scope(&mut self) {
        self.current = Scope::child(&self.current);
    }

    fn pop_scope(&mut self) {
        let parent = self.current.borrow().parent.clone();
        if let Some(parent) = parent {
            self.current = parent;
        }
    }

    /// Timeouts are observed cooperatively at loop back-edges and call
    /// boundaries.
    fn check_deadline(&self, position: &FilePosition) -> Result<(), RuntimeError> {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(RuntimeError {
                    kind: RuntimeErrorKind::TimeoutExpired,
                    message: "Timeout expired".to_string(),
                    position: Some(position.clone()),
                });
            }
        }
        Ok(())
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        let position = &stmt.position;
        match &stmt.kind {
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                if self.expect_bool(cond)? {
                    self.run_in_scope(then_body)
                } else if let Some(else_body) = else_body {
                    self.run_in_scope(else_body)
                } else {
                    Ok(Flow::Normal)
                }
            }
            StmtKind::While { cond, body } => {
                self.push_scope();
                let result = (|| {
                    loop {
                        self.check_deadline(position)?;
                        if !self.expect_bool(cond)? {
                            return Ok(Flow::Normal);
                        }
                        match self.exec_stmt(body)? {
                            Flow::Break => return Ok(Flow::Normal),
                            Flow::Return(value) => return Ok(Flow::Return(value)),
                            Flow::Normal | Flow::Continue => {}
                        }
                    }
                })();
                self.pop_scope();
                result
            }
            StmtKind::DoWhile { body, cond } => {
                self.push_scope();
                let result = (|| {
                    loop {
                        self.check_deadline(position)?;
                        match self.exec_stmt(body)? {
                            Flow::Break => return Ok(Flow::Normal),
                            Flow::Return(value) => return Ok(Flow::Return(value)),
                            Flow::Normal | Flow::Continue => {}
                        }
                        if !self.expect_bool(cond)? {
                            return Ok(Flow::Normal);
                        }
                    }
                })();
                self.pop_scope();
                result
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                self.push_scope();
                let result = (|| {
                    self.eval_expr(init)?;
                    loop {
                        self.check_deadline(position)?;
                        if !self.expect_bool(cond)? {
                            return Ok(Flow::Normal);
                        }
                        match self.exec_stmt(body)? {
                            Flow::Break => return Ok(Flow::Normal),
                            Flow::Return(value) => return Ok(Flow::Return(value)),
                            Flow::Normal | Flow::Continue => {}
                        }
                        self.eval_expr(update)?;
                    }
                })();
                self.pop_scope();
                result
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::unit(),
                };
                Ok(Flow::Return(value))
            }
            StmtKind::Break => Ok(Flow::Break),
            StmtKind::Continue => Ok(Flow::Continue),
            StmtKind::Scope(stmts) => {
                self.push_scope();
                let result = (|| {
                    for stmt in stmts {
                        match self.exec_stmt(stmt)? {
                            Flow::Normal => {}
                            other => return Ok(other),
                        }
                    }
                    Ok(Flow::Normal)
                })();
                self.pop_scope();
                result
            }
            StmtKind::Cmd(cmd) => {
                let process = self.build_process(cmd, false)?;
                self.run_process(&process, cmd.position())?;
                Ok(Flow::Normal)
            }
            StmtKind::Expr(expr) => {
                self.eval_expr(expr)?;
                Ok(Flow::Normal)
            }
            StmtKind::Alias { name, cmd } => {
                self.aliases.insert(name.clone(), cmd.clone());
                Ok(Flow::Normal)
            }
            StmtKind::Import { stmts, .. } => {
                for stmt in stmts {
                    match self.exec_stmt(stmt)? {
                        Flow::Normal => {}
                        other => return Ok(other),
                    }
                }
                Ok(Flow::Normal)
            }
            StmtKind::Print(expr) => {
                let value = self.eval_expr(expr)?;
                write!(self.out, "{}", value.string_repr())
                    .and_then(|_| self.out.flush())
                    .map_err(|error| RuntimeError::at(error.to_string(), position.clone()))?;
                Ok(Flow::Normal)
            }
            StmtKind::Println(expr) => {
                let value = self.eval_expr(expr)?;
                writeln!(self.out, "{}", value.string_repr())
                    .map_err(|error| RuntimeError::at(error.to_string(), position.clone()))?;
                Ok(Flow::Normal)
            }
            StmtKind::Write { content, path } => {
                let content = self.expect_string(content)?;
                let path = self.expect_string(path)?;
                fs::write(&path, content).map_err(|error| {
                    RuntimeError::at(format!("Failed to write '{path}': {error}"), position.clone())
                })?;
                Ok(Flow::Normal)
            }
            StmtKind::Function { name, lambda } => {
                let value = self.eval_expr(lambda)?;
                let Value::Lambda(inner) = value else {
                    return Err(RuntimeError::at(
                        "A function statement requires a lambda",
                        position.clone(),
                    ));
                };
                let prev = match Scope::get(&self.current, name) {
                    Some(Value::Lambda(existing)) => Some(existing),
                    _ => None,
                };
                let named = LambdaValue {
                    name: Some(name.clone()),
                    params: inner.params.clone(),
                    body: inner.body.clone(),
                    env: Rc::clone(&inner.env),
                    fn_type: inner.fn_type.clone(),
                    prev,
                };
                Scope::define(&self.current, name, Value::Lambda(Rc::new(named)));
                Ok(Flow::Normal)
            }
            StmtKind::Timeout {
                millis,
                body,
                message,
            } => {
                let millis = self.expect_int(millis)?.max(0) as u64;
                let requested = Instant::now() + Duration::from_millis(millis);
                let saved = self.deadline;
                self.deadline = Some(match saved {
                    Some(outer) => outer.min(requested),
                    None => requested,
                });
                let result = self.run_in_scope(body);
                self.deadline = saved;
                match result {
                    Err(error) if error.kind == RuntimeErrorKind::TimeoutExpired => {
                        // An enclosing timeout that has also expired keeps
                        // unwinding.
                        if saved.is_some_and(|outer| Instant::now() >= outer) {
                            return Err(error);
                        }
                        let text = self.expect_string(message)?;
                        writeln!(self.out, "{text}").map_err(|error| {
                            RuntimeError::at(error.to_string(), position.clone())
                        })?;
                        Ok(Flow::Normal)
                    }
                    other => other,
                }
            }
            StmtKind::Assert { cond, message } => {
                if self.expect_bool(cond)? {
                    return Ok(Flow::Normal);
                }
                let text = self.expect_string(message)?;
                writeln!(self.out, "{text}")
                    .and_then(|_| self.out.flush())
                    .map_err(|error| RuntimeError::at(error.to_string(), position.clone()))?;
                Err(RuntimeError {
                    kind: RuntimeErrorKind::AssertionFailed,
                    message: text,
                    position: Some(position.clone()),
                })
            }
            StmtKind::TypeAlias { .. } => Ok(Flow::Normal),
        }
    }

    fn run_in_scope(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        self.push_scope();
        let result = self.exec_stmt(stmt);
        self.pop_scope();
        result
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        let position = &expr.position;
        match &expr.kind {
            ExprKind::Int(value) => Ok(Value::Int(*value)),
            ExprKind::Float(value) => Ok(Value::Float(*value)),
            ExprKind::Bool(value) => Ok(Value::Bool(*value)),
            ExprKind::Str(string) => Ok(Value::String(self.eval_string(string)?)),
            ExprKind::LValue(lvalue) => self.read_lvalue(lvalue),
            ExprKind::Ternary {
                cond,
                if_true,
                if_false,
            } => {
                if self.expect_bool(cond)? {
                    self.eval_expr(if_true)
                } else {
                    self.eval_expr(if_false)
                }
            }
            ExprKind::UnOp { op, operand } => match op {
                UnOpKind::Negate => {
                    let value = self.eval_expr(operand)?;
                    ops::negate(&value, position)
                }
                UnOpKind::Not => {
                    let value = self.eval_expr(operand)?;
                    ops::not(&value, position)
                }
                UnOpKind::PreIncrement
                | UnOpKind::PostIncrement
                | UnOpKind::PreDecrement
                | UnOpKind::PostDecrement => {
                    let ExprKind::LValue(lvalue) = &operand.kind else {
                        return Err(RuntimeError::at(
                            "Increment and decrement require a variable or index",
                            position.clone(),
                        ));
                    };
                    let delta = match op {
                        UnOpKind::PreIncrement | UnOpKind::PostIncrement => 1,
                        _ => -1,
                    };
                    let old = self.read_lvalue(lvalue)?;
                    let new = ops::step(&old, delta, position)?;
                    self.write_lvalue(lvalue, new.clone())?;
                    match op {
                        UnOpKind::PostIncrement | UnOpKind::PostDecrement => Ok(old),
                        _ => Ok(new),
                    }
                }
            },
            ExprKind::BinOp { op, lhs, rhs } => {
                // && and || short-circuit.
                let lhs_value = self.eval_expr(lhs)?;
                match (op, &lhs_value) {
                    (crate::ast::BinOpKind::And, Value::Bool(false)) => Ok(Value::Bool(false)),
                    (crate::ast::BinOpKind::Or, Value::Bool(true)) => Ok(Value::Bool(true)),
                    _ => {
                        let rhs_value = self.eval_expr(rhs)?;
                        ops::binary(*op, &lhs_value, &rhs_value, position)
                    }
                }
            }
            ExprKind::Assign { target, op, value } => match target {
                AssignTarget::Binding(binding) => {
                    let new_value = self.eval_expr(value)?;
                    let new_value = coerce_to_annotation(new_value, binding.ty.as_ref());
                    Scope::define(&self.current, &binding.name, new_value.clone());
                    Ok(new_value)
                }
                AssignTarget::LValue(lvalue) => {
                    let new_value = match op.desugared() {
                        None => self.eval_expr(value)?,
                        Some(binop) => {
                            let current = self.read_lvalue(lvalue)?;
                            let rhs = self.eval_expr(value)?;
                            ops::binary(binop, &current, &rhs, position)?
                        }
                    };
                    self.write_lvalue(lvalue, new_value.clone())?;
                    Ok(new_value)
                }
            },
            ExprKind::Index { target, index } => {
                let container = self.eval_expr(target)?;
                let index = self.expect_int(index)?;
                index_value(&container, index, position)
            }
            ExprKind::Tuple(parts) => {
                let mut values = vec![];
                for part in parts {
                    values.push(self.eval_expr(part)?);
                }
                Ok(Value::Tuple(values))
            }
            ExprKind::Array(elements) => {
                let mut values = vec![];
                for element in elements {
                    values.push(self.eval_expr(element)?);
                }
                Ok(Value::array(values))
            }
            ExprKind::Call { callee, args } => {
                let mut values = vec![];
                for arg in args {
                    values.push(self.eval_expr(arg)?);
                }
                if let ExprKind::LValue(LValue::Variable { name, .. }) = &callee.kind {
                    match Scope::get(&self.current, name) {
                        Some(Value::Lambda(lambda)) => {
                            self.call_overloaded(&lambda, values, position)
                        }
                        Some(other) => Err(RuntimeError::at(
                            format!("'{name}' of type {} is not callable", other.type_of()),
                            position.clone(),
                        )),
                        None if builtin_signatures::is_builtin(name) => {
                            builtins::call(self, name, values, position)
                        }
                        None => Err(RuntimeError::at(
                            format!("Undefined variable '{name}'"),
                            position.clone(),
                        )),
                    }
                } else {
                    let callee_value = self.eval_expr(callee)?;
                    self.call_function_value(&callee_value, values, position)
                }
            }
            ExprKind::ApiCall {
                receiver,
                name,
                args,
            } => {
                let mut values = vec![self.eval_expr(receiver)?];
                for arg in args {
                    values.push(self.eval_expr(arg)?);
                }
                builtins::call(self, name, values, position)
            }
            ExprKind::Lambda(lambda) => {
                let fn_type = expr.ty.clone().unwrap_or(Type::Function {
                    params: vec![],
                    ret: Box::new(Type::unit()),
                });
                Ok(Value::Lambda(Rc::new(LambdaValue {
                    name: None,
                    params: lambda.params.clone(),
                    body: (*lambda.body).clone(),
                    env: Rc::clone(&self.current),
                    fn_type,
                    prev: None,
                })))
            }
            ExprKind::CmdExpr(cmd) => {
                let process = self.build_process(cmd, true)?;
                let info = self.run_process(&process, cmd.position())?;
                Ok(Value::String(info.stdout))
            }
            ExprKind::Scan(prompt) => {
                let prompt = self.expect_string(prompt)?;
                write!(self.out, "{prompt}")
                    .and_then(|_| self.out.flush())
                    .map_err(|error| RuntimeError::at(error.to_string(), position.clone()))?;
                let mut line = String::new();
                io::stdin()
                    .lock()
                    .read_line(&mut line)
                    .map_err(|error| RuntimeError::at(error.to_string(), position.clone()))?;
                Ok(Value::String(
                    line.trim_end_matches(['\n', '\r']).to_string(),
                ))
            }
            ExprKind::Read(path) => {
                let path = self.expect_string(path)?;
                fs::read_to_string(&path).map(Value::String).map_err(|_| {
                    RuntimeError::at(format!("File not found at {path}"), position.clone())
                })
            }
        }
    }

    /// Call a function value, trying each overload in the chain against the
    /// argument types.
    fn call_overloaded(
        &mut self,
        lambda: &Rc<LambdaValue>,
        args: Vec<Value>,
        position: &FilePosition,
    ) -> Result<Value, RuntimeError> {
        let arg_types: Vec<Type> = args.iter().map(Value::type_of).collect();
        let mut candidate = Some(Rc::clone(lambda));
        while let Some(current) = candidate {
            if overload_accepts(&current.fn_type, &arg_types) {
                return self.call_lambda(&current, args, position);
            }
            candidate = current.prev.clone();
        }
        // The type checker vetted the call; fall back to the newest overload.
        self.call_lambda(lambda, args, position)
    }

    /// Call any callable value. Used by builtins such as `map` and `filter`.
    fn call_function_value(
        &mut self,
        value: &Value,
        args: Vec<Value>,
        position: &FilePosition,
    ) -> Result<Value, RuntimeError> {
        match value {
            Value::Lambda(lambda) => self.call_overloaded(lambda, args, position),
            other => Err(RuntimeError::at(
                format!("{} is not callable", other.type_of()),
                position.clone(),
            )),
        }
    }

    fn call_lambda(
        &mut self,
        lambda: &Rc<LambdaValue>,
        args: Vec<Value>,
        position: &FilePosition,
    ) -> Result<Value, RuntimeError> {
        self.check_deadline(position)?;
        if args.len() != lambda.params.len() {
            return Err(RuntimeError::at(
                format!(
                    "Expected {} argument(s), got {}",
                    lambda.params.len(),
                    args.len()
                ),
                position.clone(),
            ));
        }
        let saved = Rc::clone(&self.current);
        self.current = Scope::child(&lambda.env);
        for (param, arg) in lambda.params.iter().zip(args) {
            let arg = coerce_to_annotation(arg, param.ty.as_ref());
            Scope::define(&self.current, &param.name, arg);
        }
        let result = self.exec_stmt(&lambda.body);
        self.current = saved;
        match result? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::unit()),
            Flow::Break | Flow::Continue => Err(RuntimeError::at(
                "Break or continue escaped a function body",
                position.clone(),
            )),
        }
    }

    fn read_lvalue(&mut self, lvalue: &LValue) -> Result<Value, RuntimeError> {
        match lvalue {
            LValue::Variable { name, position } => {
                Scope::get(&self.current, name).ok_or_else(|| {
                    RuntimeError::at(format!("Undefined variable '{name}'"), position.clone())
                })
            }
            LValue::Index {
                target,
                index,
                position,
            } => {
                let container = self.read_lvalue(target)?;
                let index = self.expect_int(index)?;
                index_value(&container, index, position)
            }
        }
    }

    fn write_lvalue(&mut self, lvalue: &LValue, value: Value) -> Result<(), RuntimeError> {
        match lvalue {
            LValue::Variable { name, position } => {
                if !Scope::assign(&self.current, name, value) {
                    return Err(RuntimeError::at(
                        format!("Undefined variable '{name}'"),
                        position.clone(),
                    ));
                }
                Ok(())
            }
            LValue::Index {
                target,
                index,
                position,
            } => {
                let container = self.read_lvalue(target)?;
                let index = self.expect_int(index)?;
                let Value::Array(elements) = container else {
                    return Err(RuntimeError::at(
                        "Only array elements can be assigned",
                        position.clone(),
                    ));
                };
                let length = elements.borrow().len();
                if index < 0 || index as usize >= length {
                    return Err(RuntimeError::at(
                        format!("Index {index} out of range"),
                        position.clone(),
                    ));
                }
                elements.borrow_mut()[index as usize] = value;
                Ok(())
            }
        }
    }

    fn eval_string(&mut self, string: &StringNode) -> Result<String, RuntimeError> {
        let mut out = String::new();
        for part in &string.parts {
            match part {
                StringPart::Literal(literal) => out.push_str(literal),
                StringPart::Expr(expr) => out.push_str(&self.eval_expr(expr)?.string_repr()),
            }
        }
        Ok(out)
    }

    fn expect_bool(&mut self, expr: &Expr) -> Result<bool, RuntimeError> {
        match self.eval_expr(expr)? {
            Value::Bool(value) => Ok(value),
            other => Err(RuntimeError::at(
                format!("Expected a bool, found {}", other.type_of()),
                expr.position.clone(),
            )),
        }
    }

    fn expect_int(&mut self, expr: &Expr) -> Result<i64, RuntimeError> {
        match self.eval_expr(expr)? {
            Value::Int(value) => Ok(value),
            other => Err(RuntimeError::at(
                format!("Expected an int, found {}", other.type_of()),
                expr.position.clone(),
            )),
        }
    }

    fn expect_string(&mut self, expr: &Expr) -> Result<String, RuntimeError> {
        match self.eval_expr(expr)? {
            Value::String(value) => Ok(value),
            other => Err(RuntimeError::at(
                format!("Expected a string, found {}", other.type_of()),
                expr.position.clone(),
            )),
        }
    }

    /// Translate a command tree into a process pipeline.
    fn build_process(&mut self, cmd: &Cmd, capture: bool) -> Result<Process, RuntimeError> {
        let mut node = cmd;
        let mut background = false;
        if let Cmd::Async(inner) = node {
            background = true;
            node = inner;
        }
        let mut stages = vec![];
        self.collect_stages(node, &mut stages)?;
        let mut head = Process::pipeline(stages).ok_or_else(|| {
            RuntimeError::at("Empty command", cmd.position().clone())
        })?;
        head.background = background;
        head.capture = capture;
        Ok(head)
    }

    fn collect_stages(&mut self, cmd: &Cmd, out: &mut Vec<Process>) -> Result<(), RuntimeError> {
        match cmd {
            Cmd::Pipe { left, right } => {
                self.collect_stages(left, out)?;
                self.collect_stages(right, out)
            }
            Cmd::Async(inner) => self.collect_stages(inner, out),
            Cmd::Basic { args, position } => {
                let mut argv = vec![];
                let mut remaining = args.iter();
                // The first word may name an alias, which is spliced in.
                if let Some(first) = args.first() {
                    let alias_name = match first {
                        CmdArg::Word(word, _) => Some(word.as_str()),
                        CmdArg::Var { name, .. } => Some(name.as_str()),
                        CmdArg::Str(_) => None,
                    };
                    if let Some(alias) =
                        alias_name.and_then(|name| self.aliases.get(name).cloned())
                    {
                        let Cmd::Basic {
                            args: alias_args, ..
                        } = &alias
                        else {
                            return Err(RuntimeError::at(
                                "An alias must name a simple command",
                                position.clone(),
                            ));
                        };
                        for arg in alias_args {
                            argv.push(self.cmd_arg_value(arg)?);
                        }
                        remaining.next();
                    }
                }
                for arg in remaining {
                    argv.push(self.cmd_arg_value(arg)?);
                }
                if argv.is_empty() {
                    return Err(RuntimeError::at("Empty command", position.clone()));
                }
                let kind = if job_builtins::is_builtin(&argv[0]) {
                    ProcessKind::Builtin
                } else {
                    ProcessKind::External
                };
                out.push(Process::new(argv, kind));
                Ok(())
            }
        }
    }

    fn cmd_arg_value(&mut self, arg: &CmdArg) -> Result<String, RuntimeError> {
        match arg {
            CmdArg::Word(word, _) => Ok(word.clone()),
            CmdArg::Str(string) => self.eval_string(string),
            CmdArg::Var { name, position } => Scope::get(&self.current, name)
                .map(|value| value.string_repr())
                .ok_or_else(|| {
                    RuntimeError::at(format!("Undefined variable '{name}'"), position.clone())
                }),
        }
    }

    fn run_process(
        &mut self,
        process: &Process,
        position: &FilePosition,
    ) -> Result<JobInfo, RuntimeError> {
        let _ = self.out.flush();
        self.runner
            .exec_with_deadline(process, self.deadline)
            .map_err(|error| RuntimeError {
                kind: if error.timed_out {
                    RuntimeErrorKind::TimeoutExpired
                } else {
                    RuntimeErrorKind::General
                },
                message: error.message,
                position: Some(position.clone()),
            })
    }
}

/// An int bound where a float annotation is written widens to a float.
fn coerce_to_annotation(value: Value, annotation: Option<&crate::ast::TypeNode>) -> Value {
    match (annotation, &value) {
        (Some(ty), Value::Int(int)) if matches!(ty.kind, TypeNodeKind::Float) => {
            Value::Float(*int as f64)
        }
        _ => value,
    }
}

fn overload_accepts(fn_type: &Type, args: &[Type]) -> bool {
    let Type::Function { params, .. } = fn_type else {
        return false;
    };
    params.len() == args.len()
        && params
            .iter()
            .zip(args)
            .all(|(param, arg)| param.accepts(arg))
}

fn index_value(
    container: &Value,
    index: i64,
    position: &FilePosition,
) -> Result<Value, RuntimeError> {
    match container {
        Value::Array(elements) => {
            let elements = elements.borrow();
            if index < 0 || index as usize >= elements.len() {
                return Err(RuntimeError::at(
                    format!("Index {index} out of range"),
                    position.clone(),
                ));
            }
            Ok(elements[index as usize].clone())
        }
        Value::Tuple(parts) => {
            if index < 0 || index as usize >= parts.len() {
                return Err(RuntimeError::at(
                    format!("Index {index} out of range"),
                    position.clone(),
                ));
            }
            Ok(parts[index as usize].clone())
        }
        other => Err(RuntimeError::at(
            format!("Cannot index into {}", other.type_of()),
            position.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize_source;
    use crate::parser::parse;
    use crate::typechecker::{typecheck, VariableTable};
    use std::cell::RefCell;

    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn run_program(source: &str) -> (String, Result<(), RuntimeError>) {
        let tokens = tokenize_source("test.cnch", source).unwrap();
        let mut program = parse(tokens).unwrap();
        let mut table = VariableTable::new();
        typecheck(&mut program, &mut table).unwrap();
        let buffer = Rc::new(RefCell::new(Vec::new()));
        let mut flow = FlowController::with_output(Box::new(SharedBuffer(Rc::clone(&buffer))));
        let result = flow.run(&program);
        drop(flow);
        let output = String::from_utf8(buffer.borrow().clone()).unwrap();
        (output, result)
    }

    fn stdout_of(source: &str) -> String {
        let (output, result) = run_program(source);
        result.unwrap();
        output
    }

    #[test]
    fn test_precedence() {
        assert_eq!(stdout_of("println 1 + 2 * 3;"), "7\n");
    }

    #[test]
    fn test_compound_assignment() {
        assert_eq!(stdout_of("int x = 5; x += 3; println x;"), "8\n");
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(stdout_of("string s = \"ab\" + \"cd\"; println s;"), "abcd\n");
    }

    #[test]
    fn test_for_loop() {
        assert_eq!(
            stdout_of("for (int i = 0; i < 3; i++) { println i; }"),
            "0\n1\n2\n"
        );
    }

    #[test]
    fn test_named_lambda() {
        assert_eq!(
            stdout_of("(x: int) -> int { return x*x; } f; println f(4);"),
            "16\n"
        );
    }

    #[test]
    fn test_assert_failure() {
        let (output, result) = run_program("assert(1 == 2, \"nope\");");
        assert_eq!(output, "nope\n");
        let error = result.unwrap_err();
        assert_eq!(error.kind, RuntimeErrorKind::AssertionFailed);
    }

    #[test]
    fn test_division_by_zero() {
        let (_, result) = run_program("println 5 / 0;");
        let error = result.unwrap_err();
        assert!(error.message.contains("Division by zero"));
    }

    #[test]
    fn test_while_break_continue() {
        let source = "int i = 0; int total = 0; \
                      while (true) { i++; if (i > 5) { break; } \
                      if (i % 2 == 0) { continue; } total += i; } println total;";
        assert_eq!(stdout_of(source), "9\n");
    }

    #[test]
    fn test_do_while_runs_once() {
        assert_eq!(stdout_of("int i = 10; do { println i; } while (i < 5);"), "10\n");
    }

    #[test]
    fn test_ternary_is_lazy() {
        assert_eq!(stdout_of("println true ? 1 : 1 / 0;"), "1\n");
    }

    #[test]
    fn test_closures_capture_definition_scope() {
        let source = "int base = 10; \
                      (x: int) -> int { return base + x; } addBase; \
                      { int base = 0; println addBase(5); }";
        assert_eq!(stdout_of(source), "15\n");
    }

    #[test]
    fn test_recursion() {
        let source = "(n: int) -> int { if (n < 2) { return 1; } return n * fact(n - 1); } fact; \
                      println fact(5);";
        assert_eq!(stdout_of(source), "120\n");
    }

    #[test]
    fn test_overload_dispatch() {
        let source = "(x: int) -> string { return \"int\"; } kind; \
                      (s: string) -> string { return \"string\"; } kind; \
                      println kind(1); println kind(\"a\");";
        assert_eq!(stdout_of(source), "int\nstring\n");
    }

    #[test]
    fn test_array_mutation_through_binding() {
        let source = "int[] xs = [1, 2]; int[] ys = xs; append(xs, 3); println ys;";
        assert_eq!(stdout_of(source), "[1, 2, 3]\n");
    }

    #[test]
    fn test_index_assignment() {
        assert_eq!(
            stdout_of("int[] xs = [1, 2, 3]; xs[1] = 9; println xs;"),
            "[1, 9, 3]\n"
        );
    }

    #[test]
    fn test_index_out_of_range() {
        let (_, result) = run_program("int[] xs = [1]; println xs[5];");
        assert!(result.unwrap_err().message.contains("out of range"));
    }

    #[test]
    fn test_string_interpolation() {
        assert_eq!(
            stdout_of("int x = 2; println \"x=${x * 2} ($x)\";"),
            "x=4 (2)\n"
        );
    }

    #[test]
    fn test_increments() {
        assert_eq!(
            stdout_of("int x = 1; println x++; println x; println ++x;"),
            "1\n2\n3\n"
        );
    }

    #[test]
    fn test_tuple_indexing() {
        assert_eq!(
            stdout_of("(int, string) t = (7, \"a\"); println t[0]; println t[1];"),
            "7\na\n"
        );
    }

    #[test]
    fn test_builtin_string_functions() {
        assert_eq!(
            stdout_of("println indexOf(\"hello\", \"ll\"); println indexOf(\"hello\", \"z\");"),
            "2\n-1\n"
        );
        assert_eq!(stdout_of("println startsWith(\"hello\", \"he\");"), "true\n");
        assert_eq!(
            stdout_of("println replace(\"aaa\", \"a\", \"b\"); println replaceAll(\"aaa\", \"a\", \"b\");"),
            "baa\nbbb\n"
        );
        assert_eq!(stdout_of("println split(\"a,b,c\", \",\");"), "[a, b, c]\n");
    }

    #[test]
    fn test_builtin_sort_filter_map() {
        let source = "int[] xs = [3, 1, 2]; println sort(xs); \
                      (x: int) -> bool { return x > 1; } big; \
                      println filter(xs, big); \
                      (x: int) -> int { return x * 10; } tens; \
                      println map(xs, tens);";
        assert_eq!(stdout_of(source), "[1, 2, 3]\n[2, 3]\n[10, 20, 30]\n");
    }

    #[test]
    fn test_float_declaration_coerces_int() {
        assert_eq!(stdout_of("float f = 1; println f;"), "1.0\n");
    }

    #[test]
    fn test_timeout_pure_loop() {
        let source = "timeout (50) { while (true) { int x = 1; } } else \"too slow\"; println \"after\";";
        assert_eq!(stdout_of(source), "too slow\nafter\n");
    }

    #[test]
    fn test_timeout_body_that_finishes() {
        assert_eq!(
            stdout_of("timeout (5000) { println 1; } else \"slow\";"),
            "1\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_captured_command() {
        assert_eq!(stdout_of("string s = `echo hi`; print s;"), "hi\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_pipeline_capture() {
        assert_eq!(
            stdout_of("string s = `printf b\\na\\n | sort`; print s;"),
            "a\nb\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_alias_expansion() {
        assert_eq!(
            stdout_of("alias greet = \"echo\" \"hello\"; string s = `$greet`; print s;"),
            "hello\n"
        );
    }
}
