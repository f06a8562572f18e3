//! # Type checker
//!
//! Walks the AST with a stack of lexically scoped variable tables, annotates
//! every expression with its resolved type, and rejects ill-typed programs.
//! The only implicit coercion is numeric promotion: an `int` widens to a
//! `float` where a `float` is expected.

pub mod builtins;
mod error;
mod scope;
mod types;

pub use error::TypeError;
pub use scope::{VarInfo, VariableTable};
pub use types::Type;

use crate::ast::{
    AssignOp, AssignTarget, BinOpKind, Cmd, CmdArg, Expr, ExprKind, LValue, LambdaExpr, Program,
    Stmt, StmtKind, StringNode, StringPart, TypeNode, TypeNodeKind, UnOpKind,
};
use crate::lexer::FilePosition;

/// Result of type checking a node within the AST.
type TResult<T> = Result<T, TypeError>;

/// Type check a program against (and extending) the given global table.
pub fn typecheck(program: &mut Program, table: &mut VariableTable) -> Result<(), TypeError> {
    let mut checker = Typechecker {
        table,
        loop_depth: 0,
        returns: vec![],
    };
    for stmt in &mut program.stmts {
        checker.check_stmt(stmt)?;
    }
    Ok(())
}

struct ReturnContext {
    declared: Option<Type>,
    inferred: Option<Type>,
}

struct Typechecker<'a> {
    table: &'a mut VariableTable,
    loop_depth: usize,
    returns: Vec<ReturnContext>,
}

impl Typechecker<'_> {
    fn check_stmt(&mut self, stmt: &mut Stmt) -> TResult<()> {
        let position = stmt.position.clone();
        match &mut stmt.kind {
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                self.expect_bool(cond, "if condition")?;
                self.table.push_scope();
                let then_result = self.check_stmt(then_body);
                self.table.pop_scope();
                then_result?;
                if let Some(else_body) = else_body {
                    self.table.push_scope();
                    let else_result = self.check_stmt(else_body);
                    self.table.pop_scope();
                    else_result?;
                }
                Ok(())
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                self.table.push_scope();
                let result = (|| {
                    self.check_expr(init)?;
                    self.expect_bool(cond, "for condition")?;
                    self.check_expr(update)?;
                    self.loop_depth += 1;
                    let body_result = self.check_stmt(body);
                    self.loop_depth -= 1;
                    body_result
                })();
                self.table.pop_scope();
                result
            }
            StmtKind::While { cond, body } => {
                self.expect_bool(cond, "while condition")?;
                self.table.push_scope();
                self.loop_depth += 1;
                let result = self.check_stmt(body);
                self.loop_depth -= 1;
                self.table.pop_scope();
                result
            }
            StmtKind::DoWhile { body, cond } => {
                self.table.push_scope();
                self.loop_depth += 1;
                let result = self.check_stmt(body);
                self.loop_depth -= 1;
                self.table.pop_scope();
                result?;
                self.expect_bool(cond, "do-while condition")
            }
            StmtKind::Return(value) => {
                if self.returns.is_empty() {
                    return Err(TypeError::at("Return outside of a function", position));
                }
                let value_ty = match value {
                    Some(expr) => self.check_expr(expr)?,
                    None => Type::unit(),
                };
                let context = self
                    .returns
                    .last_mut()
                    .unwrap_or_else(|| unreachable!("return context missing"));
                if let Some(declared) = &context.declared {
                    if !declared.accepts(&value_ty) {
                        return Err(TypeError::at(
                            format!("Cannot return {value_ty} from a function returning {declared}"),
                            position,
                        ));
                    }
                } else {
                    context.inferred = Some(match &context.inferred {
                        Some(existing) => existing.unify(&value_ty).ok_or_else(|| {
                            TypeError::at(
                                format!("Mismatched return types {existing} and {value_ty}"),
                                position.clone(),
                            )
                        })?,
                        None => value_ty,
                    });
                }
                Ok(())
            }
            StmtKind::Break => {
                if self.loop_depth == 0 {
                    return Err(TypeError::at("Break outside of a loop", position));
                }
                Ok(())
            }
            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    return Err(TypeError::at("Continue outside of a loop", position));
                }
                Ok(())
            }
            StmtKind::Scope(stmts) => {
                self.table.push_scope();
                let result = stmts.iter_mut().try_for_each(|stmt| self.check_stmt(stmt));
                self.table.pop_scope();
                result
            }
            StmtKind::Cmd(cmd) => self.check_cmd(cmd),
            StmtKind::Expr(expr) => self.check_expr(expr).map(|_| ()),
            StmtKind::Alias { name, cmd } => {
                self.check_cmd(cmd)?;
                self.table.define(name, VarInfo::Alias);
                Ok(())
            }
            StmtKind::Import { stmts, .. } => {
                stmts.iter_mut().try_for_each(|stmt| self.check_stmt(stmt))
            }
            StmtKind::Print(expr) | StmtKind::Println(expr) => self.check_expr(expr).map(|_| ()),
            StmtKind::Write { content, path } => {
                let content_ty = self.check_expr(content)?;
                if content_ty != Type::String {
                    return Err(TypeError::at(
                        format!("write expects a string, found {content_ty}"),
                        content.position.clone(),
                    ));
                }
                let path_ty = self.check_expr(path)?;
                if path_ty != Type::String {
                    return Err(TypeError::at(
                        format!("write target must be a string path, found {path_ty}"),
                        path.position.clone(),
                    ));
                }
                Ok(())
            }
            StmtKind::Function { name, lambda } => {
                let ExprKind::Lambda(inner) = &lambda.kind else {
                    return Err(TypeError::at(
                        "A function statement requires a lambda",
                        position,
                    ));
                };
                if inner.ret.is_some() {
                    // Fully annotated: register first so the body can recurse.
                    let mut params = vec![];
                    for binding in &inner.params {
                        let Some(node) = &binding.ty else {
                            return Err(TypeError::at(
                                format!("Parameter '{}' needs a type annotation", binding.name),
                                binding.position.clone(),
                            ));
                        };
                        params.push(self.resolve_type(node)?);
                    }
                    let ret = match &inner.ret {
                        Some(node) => self.resolve_type(node)?,
                        None => Type::unit(),
                    };
                    let signature = Type::Function {
                        params,
                        ret: Box::new(ret),
                    };
                    self.add_overload(name, signature, &position)?;
                    self.check_expr(lambda)?;
                } else {
                    let signature = self.check_expr(lambda)?;
                    self.add_overload(name, signature, &position)?;
                }
                Ok(())
            }
            StmtKind::Timeout {
                millis,
                body,
                message,
            } => {
                let millis_ty = self.check_expr(millis)?;
                if millis_ty != Type::Int {
                    return Err(TypeError::at(
                        format!("timeout expects milliseconds as int, found {millis_ty}"),
                        millis.position.clone(),
                    ));
                }
                self.table.push_scope();
                let result = self.check_stmt(body);
                self.table.pop_scope();
                result?;
                let message_ty = self.check_expr(message)?;
                if message_ty != Type::String {
                    return Err(TypeError::at(
                        format!("timeout message must be a string, found {message_ty}"),
                        message.position.clone(),
                    ));
                }
                Ok(())
            }
            StmtKind::Assert { cond, message } => {
                self.expect_bool(cond, "assert condition")?;
                let message_ty = self.check_expr(message)?;
                if message_ty != Type::String {
                    return Err(TypeError::at(
                        format!("assert message must be a string, found {message_ty}"),
                        message.position.clone(),
                    ));
                }
                Ok(())
            }
            StmtKind::TypeAlias { name, ty } => {
                let resolved = self.resolve_type(ty)?;
                if self.table.defined_in_current(name) {
                    return Err(TypeError::at(
                        format!("'{name}' is already defined"),
                        position,
                    ));
                }
                self.table.define(name, VarInfo::TypeAlias(resolved));
                Ok(())
            }
        }
    }

    fn expect_bool(&mut self, expr: &mut Expr, what: &str) -> TResult<()> {
        let ty = self.check_expr(expr)?;
        if ty != Type::Bool {
            return Err(TypeError::at(
                format!("The {what} must be a bool, found {ty}"),
                expr.position.clone(),
            ));
        }
        Ok(())
    }

    fn check_expr(&mut self, expr: &mut Expr) -> TResult<Type> {
        let ty = self.expr_type(expr)?;
        expr.ty = Some(ty.clone());
        Ok(ty)
    }

    fn expr_type(&mut self, expr: &mut Expr) -> TResult<Type> {
        let position = expr.position.clone();
        match &mut expr.kind {
            ExprKind::Int(_) => Ok(Type::Int),
            ExprKind::Float(_) => Ok(Type::Float),
            ExprKind::Bool(_) => Ok(Type::Bool),
            ExprKind::Str(string) => {
                self.check_string(string)?;
                Ok(Type::String)
            }
            ExprKind::LValue(lvalue) => self.lvalue_type(lvalue),
            ExprKind::Ternary {
                cond,
                if_true,
                if_false,
            } => {
                self.expect_bool(cond, "ternary condition")?;
                let true_ty = self.check_expr(if_true)?;
                let false_ty = self.check_expr(if_false)?;
                true_ty.unify(&false_ty).ok_or_else(|| {
                    TypeError::at(
                        format!("Ternary branches have types {true_ty} and {false_ty}"),
                        position,
                    )
                })
            }
            ExprKind::UnOp { op, operand } => {
                let operand_ty = self.check_expr(operand)?;
                match op {
                    UnOpKind::Negate => {
                        if !operand_ty.is_numeric() {
                            return Err(TypeError::at(
                                format!("Cannot negate {operand_ty}"),
                                position,
                            ));
                        }
                        Ok(operand_ty)
                    }
                    UnOpKind::Not => {
                        if operand_ty != Type::Bool {
                            return Err(TypeError::at(
                                format!("Cannot apply ! to {operand_ty}"),
                                position,
                            ));
                        }
                        Ok(Type::Bool)
                    }
                    UnOpKind::PreIncrement
                    | UnOpKind::PostIncrement
                    | UnOpKind::PreDecrement
                    | UnOpKind::PostDecrement => {
                        let ExprKind::LValue(lvalue) = &operand.kind else {
                            return Err(TypeError::at(
                                "Increment and decrement require a variable or index",
                                position,
                            ));
                        };
                        if let LValue::Variable { name, .. } = lvalue {
                            if let Some(VarInfo::Variable { constant: true, .. }) =
                                self.table.lookup(name)
                            {
                                return Err(TypeError::at(
                                    format!("Cannot modify constant '{name}'"),
                                    position,
                                ));
                            }
                        }
                        if !operand_ty.is_numeric() {
                            return Err(TypeError::at(
                                format!("Cannot increment or decrement {operand_ty}"),
                                position,
                            ));
                        }
                        Ok(operand_ty)
                    }
                }
            }
            ExprKind::BinOp { op, lhs, rhs } => {
                let lhs_ty = self.check_expr(lhs)?;
                let rhs_ty = self.check_expr(rhs)?;
                binop_result(*op, &lhs_ty, &rhs_ty, &position)
            }
            ExprKind::Assign { target, op, value } => {
                self.check_assign(target, *op, value, &position)
            }
            ExprKind::Index { target, index } => {
                let target_ty = self.check_expr(target)?;
                let literal_index = literal_int(index);
                let index_ty = self.check_expr(index)?;
                indexed_type(&target_ty, &index_ty, literal_index, &position)
            }
            ExprKind::Tuple(parts) => {
                let mut types = vec![];
                for part in parts {
                    types.push(self.check_expr(part)?);
                }
                Ok(Type::Tuple(types))
            }
            ExprKind::Array(elements) => {
                if elements.is_empty() {
                    return Err(TypeError::at(
                        "An empty array needs a type annotation",
                        position,
                    ));
                }
                let mut element_ty = self.check_expr(&mut elements[0])?;
                for element in elements.iter_mut().skip(1) {
                    let ty = self.check_expr(element)?;
                    element_ty = element_ty.unify(&ty).ok_or_else(|| {
                        TypeError::at(
                            format!("Array elements have types {element_ty} and {ty}"),
                            element.position.clone(),
                        )
                    })?;
                }
                Ok(Type::Array(Box::new(element_ty)))
            }
            ExprKind::Call { callee, args } => {
                let mut arg_types = vec![];
                for arg in args {
                    arg_types.push(self.check_expr(arg)?);
                }
                self.call_type(callee, &arg_types, &position)
            }
            ExprKind::ApiCall {
                receiver,
                name,
                args,
            } => {
                let mut arg_types = vec![self.check_expr(receiver)?];
                for arg in args {
                    arg_types.push(self.check_expr(arg)?);
                }
                if !builtins::is_builtin(name) {
                    return Err(TypeError::at(format!("Unknown builtin '{name}'"), position));
                }
                builtins::signature(name, &arg_types, &position)
            }
            ExprKind::Lambda(lambda) => self.lambda_type(lambda),
            ExprKind::CmdExpr(cmd) => {
                self.check_cmd(cmd)?;
                Ok(Type::String)
            }
            ExprKind::Scan(prompt) => {
                let prompt_ty = self.check_expr(prompt)?;
                if prompt_ty != Type::String {
                    return Err(TypeError::at(
                        format!("scan prompt must be a string, found {prompt_ty}"),
                        position,
                    ));
                }
                Ok(Type::String)
            }
            ExprKind::Read(path) => {
                self.check_expr(path)?;
                let is_literal = matches!(
                    &path.kind,
                    ExprKind::Str(string) if string.as_literal().is_some()
                );
                if !is_literal {
                    return Err(TypeError::at(
                        "read expects a string literal path",
                        position,
                    ));
                }
                Ok(Type::String)
            }
        }
    }

    fn check_assign(
        &mut self,
        target: &mut AssignTarget,
        op: AssignOp,
        value: &mut Expr,
        position: &FilePosition,
    ) -> TResult<Type> {
        match target {
            AssignTarget::Binding(binding) => {
                if op != AssignOp::Set {
                    return Err(TypeError::at(
                        "Compound assignment requires an existing variable",
                        position.clone(),
                    ));
                }
                if self.table.defined_in_current(&binding.name) {
                    return Err(TypeError::at(
                        format!("'{}' is already defined in this scope", binding.name),
                        binding.position.clone(),
                    ));
                }
                let annotated = match &binding.ty {
                    Some(node) => Some(self.resolve_type(node)?),
                    None => None,
                };
                // An empty array literal takes its element type from the
                // annotation.
                let value_ty = match (&annotated, &value.kind) {
                    (Some(annotation @ Type::Array(_)), ExprKind::Array(elements))
                        if elements.is_empty() =>
                    {
                        value.ty = Some(annotation.clone());
                        annotation.clone()
                    }
                    _ => self.check_expr(value)?,
                };
                let ty = match annotated {
                    Some(annotation) => {
                        if !annotation.accepts(&value_ty) {
                            return Err(TypeError::at(
                                format!("Cannot assign {value_ty} to '{}' of type {annotation}", binding.name),
                                position.clone(),
                            ));
                        }
                        annotation
                    }
                    None => value_ty,
                };
                self.table.define(
                    &binding.name,
                    VarInfo::Variable {
                        constant: binding.constant,
                        ty: ty.clone(),
                    },
                );
                Ok(ty)
            }
            AssignTarget::LValue(lvalue) => {
                if let LValue::Variable { name, .. } = &*lvalue {
                    match self.table.lookup(name) {
                        Some(VarInfo::Variable { constant: true, .. }) => {
                            return Err(TypeError::at(
                                format!("Cannot reassign constant '{name}'"),
                                position.clone(),
                            ));
                        }
                        Some(VarInfo::Function { .. } | VarInfo::TypeAlias(_) | VarInfo::Alias) => {
                            return Err(TypeError::at(
                                format!("'{name}' cannot be assigned"),
                                position.clone(),
                            ));
                        }
                        _ => {}
                    }
                }
                if let LValue::Index { target, .. } = &mut *lvalue {
                    let container_ty = self.lvalue_type(target)?;
                    if matches!(container_ty, Type::Tuple(_)) {
                        return Err(TypeError::at(
                            "Tuples are immutable",
                            position.clone(),
                        ));
                    }
                }
                let target_ty = self.lvalue_type(lvalue)?;
                let value_ty = self.check_expr(value)?;
                let effective_ty = match op.desugared() {
                    None => value_ty,
                    Some(binop) => binop_result(binop, &target_ty, &value_ty, position)?,
                };
                if !target_ty.accepts(&effective_ty) {
                    return Err(TypeError::at(
                        format!("Cannot assign {effective_ty} to a target of type {target_ty}"),
                        position.clone(),
                    ));
                }
                Ok(target_ty)
            }
        }
    }

    fn call_type(
        &mut self,
        callee: &mut Expr,
        arg_types: &[Type],
        position: &FilePosition,
    ) -> TResult<Type> {
        if let ExprKind::LValue(LValue::Variable { name, .. }) = &callee.kind {
            let name = name.clone();
            match self.table.lookup(&name).cloned() {
                Some(VarInfo::Function { overloads }) => {
                    let matching: Vec<&Type> = overloads
                        .iter()
                        .filter(|overload| overload_matches(overload, arg_types))
                        .collect();
                    match matching.len() {
                        1 => {
                            let chosen = matching[0].clone();
                            callee.ty = Some(chosen.clone());
                            let Type::Function { ret, .. } = chosen else {
                                unreachable!("function overloads hold function types");
                            };
                            Ok(*ret)
                        }
                        0 => {
                            let args: Vec<_> = arg_types.iter().map(Type::to_string).collect();
                            Err(TypeError::at(
                                format!(
                                    "No overload of '{name}' accepts ({})",
                                    args.join(", ")
                                ),
                                position.clone(),
                            ))
                        }
                        _ => Err(TypeError::at(
                            format!("Ambiguous call to '{name}'"),
                            position.clone(),
                        )),
                    }
                }
                Some(VarInfo::Variable { ty, .. }) => {
                    callee.ty = Some(ty.clone());
                    function_call_type(&ty, arg_types, &name, position)
                }
                Some(VarInfo::TypeAlias(_) | VarInfo::Alias) => Err(TypeError::at(
                    format!("'{name}' is not callable"),
                    position.clone(),
                )),
                None if builtins::is_builtin(&name) => {
                    let ret = builtins::signature(&name, arg_types, position)?;
                    callee.ty = Some(Type::Function {
                        params: arg_types.to_vec(),
                        ret: Box::new(ret.clone()),
                    });
                    Ok(ret)
                }
                None => Err(TypeError::at(
                    format!("Undeclared name '{name}'"),
                    position.clone(),
                )),
            }
        } else {
            let callee_ty = self.check_expr(callee)?;
            function_call_type(&callee_ty, arg_types, "expression", position)
        }
    }

    fn lambda_type(&mut self, lambda: &mut LambdaExpr) -> TResult<Type> {
        let mut params = vec![];
        for binding in &lambda.params {
            let Some(node) = &binding.ty else {
                return Err(TypeError::at(
                    format!("Parameter '{}' needs a type annotation", binding.name),
                    binding.position.clone(),
                ));
            };
            params.push(self.resolve_type(node)?);
        }
        let declared = match &lambda.ret {
            Some(node) => Some(self.resolve_type(node)?),
            None => None,
        };
        self.table.push_scope();
        for (binding, ty) in lambda.params.iter().zip(&params) {
            self.table.define(
                &binding.name,
                VarInfo::Variable {
                    constant: false,
                    ty: ty.clone(),
                },
            );
        }
        self.returns.push(ReturnContext {
            declared: declared.clone(),
            inferred: None,
        });
        let body_result = self.check_stmt(&mut lambda.body);
        let context = self
            .returns
            .pop()
            .unwrap_or_else(|| unreachable!("return context missing"));
        self.table.pop_scope();
        body_result?;
        let ret = declared.or(context.inferred).unwrap_or_else(Type::unit);
        Ok(Type::Function {
            params,
            ret: Box::new(ret),
        })
    }

    fn lvalue_type(&mut self, lvalue: &mut LValue) -> TResult<Type> {
        match lvalue {
            LValue::Variable { name, position } => match self.table.lookup(name) {
                Some(VarInfo::Variable { ty, .. }) => Ok(ty.clone()),
                Some(VarInfo::Function { overloads }) => {
                    if overloads.len() == 1 {
                        Ok(overloads[0].clone())
                    } else {
                        Err(TypeError::at(
                            format!("'{name}' has multiple overloads; the reference is ambiguous"),
                            position.clone(),
                        ))
                    }
                }
                Some(VarInfo::Alias) => Ok(Type::String),
                Some(VarInfo::TypeAlias(_)) => Err(TypeError::at(
                    format!("'{name}' is a type, not a value"),
                    position.clone(),
                )),
                None => Err(TypeError::at(
                    format!("Undeclared name '{name}'"),
                    position.clone(),
                )),
            },
            LValue::Index {
                target,
                index,
                position,
            } => {
                let target_ty = self.lvalue_type(target)?;
                let literal_index = literal_int(index);
                let index_ty = self.check_expr(index)?;
                indexed_type(&target_ty, &index_ty, literal_index, position)
            }
        }
    }

    fn check_cmd(&mut self, cmd: &mut Cmd) -> TResult<()> {
        match cmd {
            Cmd::Basic { args, .. } => {
                for arg in args {
                    match arg {
                        CmdArg::Word(_, _) => {}
                        CmdArg::Str(string) => self.check_string(string)?,
                        CmdArg::Var { name, position } => match self.table.lookup(name) {
                            Some(VarInfo::Variable { ty: Type::String, .. } | VarInfo::Alias) => {}
                            Some(VarInfo::Variable { ty, .. }) => {
                                return Err(TypeError::at(
                                    format!("Command argument '${name}' must be a string, found {ty}"),
                                    position.clone(),
                                ));
                            }
                            Some(_) => {
                                return Err(TypeError::at(
                                    format!("'{name}' cannot be used as a command argument"),
                                    position.clone(),
                                ));
                            }
                            None => {
                                return Err(TypeError::at(
                                    format!("Undeclared name '{name}'"),
                                    position.clone(),
                                ));
                            }
                        },
                    }
                }
                Ok(())
            }
            Cmd::Pipe { left, right } => {
                self.check_cmd(left)?;
                self.check_cmd(right)
            }
            Cmd::Async(inner) => self.check_cmd(inner),
        }
    }

    fn check_string(&mut self, string: &mut StringNode) -> TResult<()> {
        for part in &mut string.parts {
            if let StringPart::Expr(expr) = part {
                self.check_expr(expr)?;
            }
        }
        Ok(())
    }

    fn resolve_type(&self, node: &TypeNode) -> TResult<Type> {
        match &node.kind {
            TypeNodeKind::Int => Ok(Type::Int),
            TypeNodeKind::Float => Ok(Type::Float),
            TypeNodeKind::Bool => Ok(Type::Bool),
            TypeNodeKind::String => Ok(Type::String),
            TypeNodeKind::Array(base) => Ok(Type::Array(Box::new(self.resolve_type(base)?))),
            TypeNodeKind::Tuple(parts) => {
                let parts: Result<Vec<_>, _> =
                    parts.iter().map(|part| self.resolve_type(part)).collect();
                Ok(Type::Tuple(parts?))
            }
            TypeNodeKind::Function { params, ret } => {
                let params: Result<Vec<_>, _> =
                    params.iter().map(|param| self.resolve_type(param)).collect();
                Ok(Type::Function {
                    params: params?,
                    ret: Box::new(self.resolve_type(ret)?),
                })
            }
            TypeNodeKind::Alias(name) => match self.table.lookup(name) {
                Some(VarInfo::TypeAlias(ty)) => Ok(ty.clone()),
                _ => Err(TypeError::at(
                    format!("Unknown type '{name}'"),
                    node.position.clone(),
                )),
            },
        }
    }

    fn add_overload(
        &mut self,
        name: &str,
        signature: Type,
        position: &FilePosition,
    ) -> TResult<()> {
        if self.table.defined_in_current(name) {
            match self.table.lookup_mut(name) {
                Some(VarInfo::Function { overloads }) => {
                    let duplicate = overloads.iter().any(|existing| {
                        function_params(existing) == function_params(&signature)
                    });
                    if duplicate {
                        return Err(TypeError::at(
                            format!("'{name}' is already defined with these parameters"),
                            position.clone(),
                        ));
                    }
                    overloads.push(signature);
                    Ok(())
                }
                _ => Err(TypeError::at(
                    format!("'{name}' is already defined"),
                    position.clone(),
                )),
            }
        } else {
            self.table.define(
                name,
                VarInfo::Function {
                    overloads: vec![signature],
                },
            );
            Ok(())
        }
    }
}

fn function_params(ty: &Type) -> Option<&[Type]> {
    match ty {
        Type::Function { params, .. } => Some(params),
        _ => None,
    }
}

fn overload_matches(overload: &Type, args: &[Type]) -> bool {
    let Type::Function { params, .. } = overload else {
        return false;
    };
    params.len() == args.len()
        && params
            .iter()
            .zip(args)
            .all(|(param, arg)| param.accepts(arg))
}

fn function_call_type(
    ty: &Type,
    args: &[Type],
    what: &str,
    position: &FilePosition,
) -> TResult<Type> {
    let Type::Function { params, ret } = ty else {
        return Err(TypeError::at(
            format!("'{what}' of type {ty} is not callable"),
            position.clone(),
        ));
    };
    if params.len() != args.len() {
        return Err(TypeError::at(
            format!(
                "'{what}' expects {} argument(s), got {}",
                params.len(),
                args.len()
            ),
            position.clone(),
        ));
    }
    for (param, arg) in params.iter().zip(args) {
        if !param.accepts(arg) {
            return Err(TypeError::at(
                format!("Cannot pass {arg} where {param} is expected"),
                position.clone(),
            ));
        }
    }
    Ok((**ret).clone())
}

fn binop_result(
    op: BinOpKind,
    lhs: &Type,
    rhs: &Type,
    position: &FilePosition,
) -> TResult<Type> {
    if op.is_arithmetic() {
        if op == BinOpKind::Add && *lhs == Type::String && *rhs == Type::String {
            return Ok(Type::String);
        }
        return lhs.promote(rhs).ok_or_else(|| {
            TypeError::at(format!("Cannot apply {op} to {lhs} and {rhs}"), position.clone())
        });
    }
    if op.is_comparison() {
        if lhs.is_numeric() && rhs.is_numeric() {
            return Ok(Type::Bool);
        }
        return Err(TypeError::at(
            format!("Cannot compare {lhs} and {rhs}"),
            position.clone(),
        ));
    }
    if op.is_equality() {
        if lhs == rhs || (lhs.is_numeric() && rhs.is_numeric()) {
            return Ok(Type::Bool);
        }
        return Err(TypeError::at(
            format!("Cannot compare {lhs} and {rhs} for equality"),
            position.clone(),
        ));
    }
    // Logical operators.
    if *lhs == Type::Bool && *rhs == Type::Bool {
        return Ok(Type::Bool);
    }
    Err(TypeError::at(
        format!("Cannot apply {op} to {lhs} and {rhs}"),
        position.clone(),
    ))
}

fn indexed_type(
    target: &Type,
    index: &Type,
    literal_index: Option<i64>,
    position: &FilePosition,
) -> TResult<Type> {
    match target {
        Type::Array(element) => {
            if *index != Type::Int {
                return Err(TypeError::at(
                    format!("Array index must be an int, found {index}"),
                    position.clone(),
                ));
            }
            Ok((**element).clone())
        }
        Type::Tuple(parts) => {
            let Some(literal) = literal_index else {
                return Err(TypeError::at(
                    "Tuple index must be an integer literal",
                    position.clone(),
                ));
            };
            if literal < 0 || literal as usize >= parts.len() {
                return Err(TypeError::at(
                    format!("Tuple index {literal} out of range"),
                    position.clone(),
                ));
            }
            Ok(parts[literal as usize].clone())
        }
        _ => Err(TypeError::at(
            format!("Cannot index into {target}"),
            position.clone(),
        )),
    }
}

fn literal_int(expr: &Expr) -> Option<i64> {
    match expr.kind {
        ExprKind::Int(value) => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize_source;
    use crate::parser::parse;

    fn check(source: &str) -> Result<Program, TypeError> {
        let mut program = parse(tokenize_source("test.cnch", source).unwrap()).unwrap();
        let mut table = VariableTable::new();
        typecheck(&mut program, &mut table).map(|_| program)
    }

    fn check_error(source: &str) -> String {
        check(source).unwrap_err().message
    }

    #[test]
    fn test_declaration_annotates_types() {
        let program = check("int x = 5; println x + 1;").unwrap();
        let typed = program.sexp(true);
        assert!(typed.contains("(Int 5 : int)"), "{typed}");
        assert!(typed.contains(": int)"), "{typed}");
    }

    #[test]
    fn test_numeric_promotion_in_binop() {
        let program = check("float f = 1 + 2.5;").unwrap();
        assert!(program.sexp(true).contains("(BinOp ADD (Int 1 : int) (Float 2.5 : float) : float)"));
    }

    #[test]
    fn test_int_cannot_hold_float() {
        assert!(check_error("int x = 1.5;").contains("Cannot assign"));
    }

    #[test]
    fn test_float_accepts_int() {
        assert!(check("float f = 1;").is_ok());
    }

    #[test]
    fn test_string_plus_string() {
        assert!(check("string s = \"ab\" + \"cd\";").is_ok());
        assert!(check_error("string s = \"ab\" + 1;").contains("Cannot apply"));
    }

    #[test]
    fn test_undeclared_name() {
        assert!(check_error("println y;").contains("Undeclared name 'y'"));
    }

    #[test]
    fn test_constant_reassignment() {
        assert!(check_error("const int x = 1; x = 2;").contains("Cannot reassign constant"));
    }

    #[test]
    fn test_condition_must_be_bool() {
        assert!(check_error("if (1) { println 2; }").contains("must be a bool"));
    }

    #[test]
    fn test_compound_assign_expands() {
        assert!(check("int x = 1; x += 2;").is_ok());
        assert!(check_error("string s = \"a\"; s -= \"b\";").contains("Cannot apply"));
    }

    #[test]
    fn test_break_outside_loop() {
        assert!(check_error("break;").contains("outside of a loop"));
    }

    #[test]
    fn test_return_outside_function() {
        assert!(check_error("return 1;").contains("outside of a function"));
    }

    #[test]
    fn test_function_call_and_return_type() {
        assert!(check("(x: int) -> int { return x * x; } square; int y = square(4);").is_ok());
    }

    #[test]
    fn test_call_wrong_arity() {
        assert!(
            check_error("(x: int) -> int { return x; } id; id(1, 2);")
                .contains("No overload of 'id'")
        );
    }

    #[test]
    fn test_overload_resolution() {
        let source = "(x: int) -> int { return x; } f; \
                      (s: string) -> string { return s; } f; \
                      int y = f(3); string t = f(\"a\");";
        assert!(check(source).is_ok());
    }

    #[test]
    fn test_recursion_with_annotation() {
        let source = "(n: int) -> int { if (n < 2) { return 1; } return n * fact(n - 1); } fact; \
                      println fact(5);";
        assert!(check(source).is_ok());
    }

    #[test]
    fn test_lambda_return_inference() {
        assert!(check("(x: int) { return x + 1; } inc; int y = inc(1);").is_ok());
    }

    #[test]
    fn test_mismatched_inferred_returns() {
        assert!(check_error("(x: int) { if (x > 0) { return 1; } return \"a\"; } f;")
            .contains("Mismatched return types"));
    }

    #[test]
    fn test_empty_array_needs_annotation() {
        assert!(check("int[] xs = [];").is_ok());
        assert!(check_error("println [];").contains("empty array"));
    }

    #[test]
    fn test_array_element_unification() {
        assert!(check("float[] xs = [1, 2.5];").is_ok());
        assert!(check_error("int[] xs = [1, \"a\"];").contains("Array elements"));
    }

    #[test]
    fn test_tuple_index_must_be_literal_in_range() {
        assert!(check("(int, string) t = (1, \"a\"); string s = t[1];").is_ok());
        assert!(check_error("(int, string) t = (1, \"a\"); int i = 1; println t[i];")
            .contains("integer literal"));
        assert!(check_error("(int, string) t = (1, \"a\"); println t[2];")
            .contains("out of range"));
    }

    #[test]
    fn test_tuple_assignment_rejected() {
        assert!(
            check_error("(int, int) t = (1, 2); t[0] = 5;").contains("Tuples are immutable")
        );
    }

    #[test]
    fn test_array_index_assignment() {
        assert!(check("int[] xs = [1, 2]; xs[0] = 5;").is_ok());
    }

    #[test]
    fn test_type_alias() {
        assert!(check("type Id = int; (v: Id) -> Id { return v; } ident; println ident(3);").is_ok());
        assert!(check_error("(v: Missing) { return 1; } f;").contains("Unknown type 'Missing'"));
    }

    #[test]
    fn test_builtin_signatures_in_calls() {
        assert!(check("float r = sqrt(2); int l = length(\"abc\");").is_ok());
        assert!(check_error("sqrt(\"a\");").contains("sqrt"));
    }

    #[test]
    fn test_api_call_dispatches_builtins() {
        assert!(check("string s = \"hi\"; int l = s.length();").is_ok());
    }

    #[test]
    fn test_map_with_lambda() {
        let source = "int[] xs = [1, 2, 3]; \
                      (x: int) -> int { return x * 2; } double; \
                      int[] ys = map(xs, double);";
        assert!(check(source).is_ok());
    }

    #[test]
    fn test_shadowing_in_inner_scope() {
        assert!(check("int x = 1; { string x = \"a\"; println x; } println x;").is_ok());
    }

    #[test]
    fn test_redeclaration_in_same_scope() {
        assert!(check_error("int x = 1; int x = 2;").contains("already defined"));
    }

    #[test]
    fn test_command_argument_types() {
        assert!(check("string f = \"x.txt\"; \"cat\" $f;").is_ok());
        assert!(check_error("int n = 1; \"cat\" $n;").contains("must be a string"));
    }

    #[test]
    fn test_scan_and_read_types() {
        assert!(check("string s = scan \"? \";").is_ok());
        assert!(check("string s = read \"f.txt\";").is_ok());
        assert!(check_error("string s = read (\"a\" + \"b\");").contains("string literal"));
    }

    #[test]
    fn test_assert_types() {
        assert!(check("assert(1 == 1, \"ok\");").is_ok());
        assert!(check_error("assert(1, \"ok\");").contains("must be a bool"));
        assert!(check_error("assert(true, 3);").contains("must be a string"));
    }

    #[test]
    fn test_typecheck_idempotence() {
        let mut program =
            parse(tokenize_source("test.cnch", "int x = 1 + 2; println x;").unwrap()).unwrap();
        let mut table = VariableTable::new();
        typecheck(&mut program, &mut table).unwrap();
        let first = program.sexp(true);
        let mut second_table = VariableTable::new();
        typecheck(&mut program, &mut second_table).unwrap();
        assert_eq!(first, program.sexp(true));
    }
}
