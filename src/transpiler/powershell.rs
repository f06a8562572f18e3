//! PowerShell backend. Arithmetic maps to native operators (`**` through
//! `[math]::Pow`), control flow and functions map to their PowerShell
//! counterparts, and commands run through the call operator.

use crate::ast::{
    AssignTarget, BinOpKind, Cmd, CmdArg, Expr, ExprKind, LValue, LambdaExpr, Program, Stmt,
    StmtKind, StringNode, StringPart, UnOpKind,
};

use super::Emitter;

pub struct PowershellTranspiler {
    emitter: Emitter,
    lambda_counter: usize,
    hoisted: Vec<(String, LambdaExpr)>,
}

impl Default for PowershellTranspiler {
    fn default() -> Self {
        Self::new()
    }
}

impl PowershellTranspiler {
    pub fn new() -> Self {
        Self {
            emitter: Emitter::new(),
            lambda_counter: 0,
            hoisted: vec![],
        }
    }

    /// Emit a PowerShell script equivalent to the typed program.
    pub fn transpile(mut self, program: &Program) -> String {
        for stmt in &program.stmts {
            self.emit_stmt(stmt);
        }
        self.emitter.finish()
    }

    fn emit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                let cond = self.value(cond);
                self.flush_hoisted();
                self.emitter.line(&format!("if ({cond}) {{"));
                self.emitter.enter();
                self.emit_stmt(then_body);
                self.emitter.leave();
                match else_body {
                    Some(else_body) => {
                        self.emitter.line("} else {");
                        self.emitter.enter();
                        self.emit_stmt(else_body);
                        self.emitter.leave();
                        self.emitter.line("}");
                    }
                    None => self.emitter.line("}"),
                }
            }
            StmtKind::While { cond, body } => {
                let cond = self.value(cond);
                self.flush_hoisted();
                self.emitter.line(&format!("while ({cond}) {{"));
                self.emitter.enter();
                self.emit_stmt(body);
                self.emitter.leave();
                self.emitter.line("}");
            }
            StmtKind::DoWhile { body, cond } => {
                let cond = self.value(cond);
                self.flush_hoisted();
                self.emitter.line("do {");
                self.emitter.enter();
                self.emit_stmt(body);
                self.emitter.leave();
                self.emitter.line(&format!("}} while ({cond})"));
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                self.emit_expr_stmt(init);
                let cond = self.value(cond);
                self.flush_hoisted();
                self.emitter.line(&format!("while ({cond}) {{"));
                self.emitter.enter();
                self.emit_stmt(body);
                self.emit_expr_stmt(update);
                self.emitter.leave();
                self.emitter.line("}");
            }
            StmtKind::Return(value) => match value {
                Some(expr) => {
                    let value = self.value(expr);
                    self.flush_hoisted();
                    self.emitter.line(&format!("return {value}"));
                }
                None => self.emitter.line("return"),
            },
            StmtKind::Break => self.emitter.line("break"),
            StmtKind::Continue => self.emitter.line("continue"),
            StmtKind::Scope(stmts) => {
                for stmt in stmts {
                    self.emit_stmt(stmt);
                }
            }
            StmtKind::Cmd(cmd) => {
                let line = self.command_line(cmd);
                self.flush_hoisted();
                self.emitter.line(&line);
            }
            StmtKind::Expr(expr) => self.emit_expr_stmt(expr),
            StmtKind::Alias { name, cmd } => {
                let line = self.command_line(cmd);
                self.emitter
                    .line(&format!("function {name} {{ {line} @args }}"));
            }
            StmtKind::Import { path, stmts } => {
                self.emitter.line(&format!(
                    "# import {}",
                    path.as_literal().unwrap_or_default()
                ));
                for stmt in stmts {
                    self.emit_stmt(stmt);
                }
            }
            StmtKind::Print(expr) => {
                let value = self.value(expr);
                self.flush_hoisted();
                self.emitter
                    .line(&format!("Write-Host -NoNewline {value}"));
            }
            StmtKind::Println(expr) => {
                let value = self.value(expr);
                self.flush_hoisted();
                self.emitter.line(&format!("Write-Host {value}"));
            }
            StmtKind::Write { content, path } => {
                let content = self.value(content);
                let path = self.value(path);
                self.flush_hoisted();
                self.emitter
                    .line(&format!("Set-Content -Path {path} -Value {content}"));
            }
            StmtKind::Function { name, lambda } => {
                if let ExprKind::Lambda(lambda) = &lambda.kind {
                    self.emit_function(name, lambda);
                }
            }
            StmtKind::Timeout {
                millis,
                body,
                message,
            } => {
                let millis = self.value(millis);
                let message = self.value(message);
                self.flush_hoisted();
                self.emitter.line("$job = Start-Job -ScriptBlock {");
                self.emitter.enter();
                self.emit_stmt(body);
                self.emitter.leave();
                self.emitter.line("}");
                self.emitter.line(&format!(
                    "if (-not (Wait-Job $job -Timeout ({millis} / 1000))) {{"
                ));
                self.emitter.enter();
                self.emitter.line("Stop-Job $job");
                self.emitter.line(&format!("Write-Host {message}"));
                self.emitter.leave();
                self.emitter.line("}");
            }
            StmtKind::Assert { cond, message } => {
                let cond = self.value(cond);
                let message = self.value(message);
                self.flush_hoisted();
                self.emitter.line(&format!("if (-not ({cond})) {{"));
                self.emitter.enter();
                self.emitter.line(&format!("Write-Host {message}"));
                self.emitter.line("exit 1");
                self.emitter.leave();
                self.emitter.line("}");
            }
            StmtKind::TypeAlias { name, .. } => {
                self.emitter.line(&format!("# type alias {name}"));
            }
        }
    }

    fn emit_expr_stmt(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Assign { target, op, value } => {
                let rendered = self.value(value);
                let rendered = match (op.desugared(), target) {
                    // `**=` has no PowerShell operator; it goes through
                    // [math]::Pow like the binary `**` path.
                    (Some(BinOpKind::Exponentiate), AssignTarget::LValue(lvalue)) => {
                        let current = self.lvalue_value(lvalue);
                        format!("[math]::Pow({current}, {rendered})")
                    }
                    (Some(binop), AssignTarget::LValue(lvalue)) => {
                        let current = self.lvalue_value(lvalue);
                        format!("({current} {} {rendered})", powershell_operator(binop))
                    }
                    _ => rendered,
                };
                self.flush_hoisted();
                let target = match target {
                    AssignTarget::Binding(binding) => format!("${}", binding.name),
                    AssignTarget::LValue(lvalue) => self.lvalue_value(lvalue),
                };
                self.emitter.line(&format!("{target} = {rendered}"));
            }
            ExprKind::UnOp { op, operand }
                if matches!(
                    op,
                    UnOpKind::PreIncrement
                        | UnOpKind::PostIncrement
                        | UnOpKind::PreDecrement
                        | UnOpKind::PostDecrement
                ) =>
            {
                if let ExprKind::LValue(lvalue) = &operand.kind {
                    let target = self.lvalue_value(lvalue);
                    let step = match op {
                        UnOpKind::PreDecrement | UnOpKind::PostDecrement => "-",
                        _ => "+",
                    };
                    self.emitter
                        .line(&format!("{target} = {target} {step} 1"));
                }
            }
            _ => {
                let value = self.value(expr);
                self.flush_hoisted();
                self.emitter.line(&format!("$null = {value}"));
            }
        }
    }

    fn emit_function(&mut self, name: &str, lambda: &LambdaExpr) {
        let params: Vec<_> = lambda
            .params
            .iter()
            .map(|param| format!("${}", param.name))
            .collect();
        self.emitter.blank();
        self.emitter
            .line(&format!("function {name}({}) {{", params.join(", ")));
        self.emitter.enter();
        self.emit_stmt(&lambda.body);
        self.emitter.leave();
        self.emitter.line("}");
        self.emitter.blank();
    }

    fn flush_hoisted(&mut self) {
        let hoisted = std::mem::take(&mut self.hoisted);
        for (name, lambda) in hoisted {
            self.emit_function(&name, &lambda);
        }
    }

    fn value(&mut self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Int(value) => value.to_string(),
            ExprKind::Float(value) => format!("{value}"),
            ExprKind::Bool(value) => if *value { "$true" } else { "$false" }.to_string(),
            ExprKind::Str(string) => self.string_value(string),
            ExprKind::LValue(lvalue) => self.lvalue_value(lvalue),
            ExprKind::Ternary {
                cond,
                if_true,
                if_false,
            } => {
                let cond = self.value(cond);
                let if_true = self.value(if_true);
                let if_false = self.value(if_false);
                format!("$(if ({cond}) {{ {if_true} }} else {{ {if_false} }})")
            }
            ExprKind::UnOp { op, operand } => {
                let operand_value = self.value(operand);
                match op {
                    UnOpKind::Negate => format!("(-{operand_value})"),
                    UnOpKind::Not => format!("(-not {operand_value})"),
                    UnOpKind::PreIncrement | UnOpKind::PreDecrement => {
                        format!("(++{operand_value})")
                    }
                    UnOpKind::PostIncrement | UnOpKind::PostDecrement => {
                        format!("({operand_value}++)")
                    }
                }
            }
            ExprKind::BinOp { op, lhs, rhs } => {
                let lhs = self.value(lhs);
                let rhs = self.value(rhs);
                if *op == BinOpKind::Exponentiate {
                    return format!("[math]::Pow({lhs}, {rhs})");
                }
                format!("({lhs} {} {rhs})", powershell_operator(*op))
            }
            ExprKind::Assign { value, .. } => self.value(value),
            ExprKind::Index { target, index } => {
                let target = self.value(target);
                let index = self.value(index);
                format!("{target}[{index}]")
            }
            ExprKind::Tuple(parts) | ExprKind::Array(parts) => {
                let parts: Vec<_> = parts.iter().map(|part| self.value(part)).collect();
                format!("@({})", parts.join(", "))
            }
            ExprKind::Call { callee, args } => {
                let name = match &callee.kind {
                    ExprKind::LValue(LValue::Variable { name, .. }) => name.clone(),
                    _ => self.value(callee),
                };
                let args: Vec<_> = args.iter().map(|arg| self.value(arg)).collect();
                format!("$({name} {})", args.join(" "))
            }
            ExprKind::ApiCall {
                receiver,
                name,
                args,
            } => {
                let receiver = self.value(receiver);
                let args: Vec<_> = args.iter().map(|arg| self.value(arg)).collect();
                match (name.as_str(), args.len()) {
                    ("length", 0) => format!("{receiver}.Length"),
                    ("upper", 0) => format!("{receiver}.ToUpper()"),
                    ("lower", 0) => format!("{receiver}.ToLower()"),
                    ("trim", 0) => format!("{receiver}.Trim()"),
                    _ => format!("$({name} {receiver} {})", args.join(" ")),
                }
            }
            ExprKind::Lambda(lambda) => {
                self.lambda_counter += 1;
                let name = format!("__ConchLambda{}", self.lambda_counter);
                self.hoisted.push((name.clone(), lambda.clone()));
                name
            }
            ExprKind::CmdExpr(cmd) => {
                let line = self.command_line(cmd);
                format!("$({line} | Out-String)")
            }
            ExprKind::Scan(prompt) => {
                let prompt = self.value(prompt);
                format!("$(Read-Host -Prompt {prompt})")
            }
            ExprKind::Read(path) => {
                let path = self.value(path);
                format!("$(Get-Content -Raw {path})")
            }
        }
    }

    fn lvalue_value(&self, lvalue: &LValue) -> String {
        match lvalue {
            LValue::Variable { name, .. } => format!("${name}"),
            LValue::Index { target, index, .. } => {
                let index = match &index.kind {
                    ExprKind::Int(value) => value.to_string(),
                    ExprKind::LValue(LValue::Variable { name, .. }) => format!("${name}"),
                    _ => "0".to_string(),
                };
                format!("{}[{index}]", self.lvalue_value(target))
            }
        }
    }

    fn string_value(&mut self, string: &StringNode) -> String {
        let mut out = String::from("\"");
        for part in &string.parts {
            match part {
                StringPart::Literal(literal) => out.push_str(&escape_powershell(literal)),
                StringPart::Expr(expr) => {
                    let value = self.value(expr);
                    out.push_str(&format!("$({value})"));
                }
            }
        }
        out.push('"');
        out
    }

    fn command_line(&mut self, cmd: &Cmd) -> String {
        match cmd {
            Cmd::Basic { args, .. } => {
                let mut words = vec![];
                for (index, arg) in args.iter().enumerate() {
                    let word = match arg {
                        CmdArg::Word(word, _) => word.clone(),
                        CmdArg::Str(string) => self.string_value(string),
                        CmdArg::Var { name, .. } => format!("${name}"),
                    };
                    if index == 0 {
                        words.push(format!("& {word}"));
                    } else {
                        words.push(word);
                    }
                }
                words.join(" ")
            }
            Cmd::Pipe { left, right } => {
                format!("{} | {}", self.command_line(left), self.command_line(right))
            }
            Cmd::Async(inner) => {
                format!("Start-Job -ScriptBlock {{ {} }}", self.command_line(inner))
            }
        }
    }
}

fn powershell_operator(op: BinOpKind) -> &'static str {
    match op {
        // Callers special-case ** via [math]::Pow before reaching here.
        BinOpKind::Exponentiate => "*",
        BinOpKind::Multiply => "*",
        BinOpKind::Divide => "/",
        BinOpKind::Modulo => "%",
        BinOpKind::Add => "+",
        BinOpKind::Subtract => "-",
        BinOpKind::Lesser => "-lt",
        BinOpKind::LesserEqual => "-le",
        BinOpKind::Greater => "-gt",
        BinOpKind::GreaterEqual => "-ge",
        BinOpKind::Equal => "-eq",
        BinOpKind::NotEqual => "-ne",
        BinOpKind::And => "-and",
        BinOpKind::Or => "-or",
    }
}

fn escape_powershell(text: &str) -> String {
    let mut out = String::new();
    for c in text.chars() {
        match c {
            '"' => out.push_str("`\""),
            '`' => out.push_str("``"),
            '$' => out.push_str("`$"),
            '\n' => out.push_str("`n"),
            '\t' => out.push_str("`t"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize_source;
    use crate::parser::parse;
    use crate::typechecker::{typecheck, VariableTable};

    fn transpile(source: &str) -> String {
        let mut program = parse(tokenize_source("test.cnch", source).unwrap()).unwrap();
        let mut table = VariableTable::new();
        typecheck(&mut program, &mut table).unwrap();
        PowershellTranspiler::new().transpile(&program)
    }

    #[test]
    fn test_native_arithmetic() {
        let script = transpile("println 1 + 2 * 3;");
        assert!(script.contains("Write-Host (1 + (2 * 3))"), "{script}");
    }

    #[test]
    fn test_declaration_and_assignment() {
        let script = transpile("int x = 5; x += 3;");
        assert!(script.contains("$x = 5"), "{script}");
        assert!(script.contains("$x = ($x + 3)"), "{script}");
    }

    #[test]
    fn test_comparison_operators() {
        let script = transpile("if (1 < 2) { println 1; }");
        assert!(script.contains("if ((1 -lt 2)) {"), "{script}");
    }

    #[test]
    fn test_function_definition() {
        let script = transpile("(x: int) -> int { return x * x; } square; println square(4);");
        assert!(script.contains("function square($x) {"), "{script}");
        assert!(script.contains("return ($x * $x)"), "{script}");
        assert!(script.contains("Write-Host $(square 4)"), "{script}");
    }

    #[test]
    fn test_exponentiation_uses_math_pow() {
        let script = transpile("println 2 ** 10;");
        assert!(script.contains("[math]::Pow(2, 10)"), "{script}");
    }

    #[test]
    fn test_compound_exponentiation_uses_math_pow() {
        let script = transpile("int x = 2; x **= 3;");
        assert!(script.contains("$x = [math]::Pow($x, 3)"), "{script}");
    }

    #[test]
    fn test_command_uses_call_operator() {
        let script = transpile("\"ls\" -la;");
        assert!(script.contains("& \"ls\" -la"), "{script}");
    }

    #[test]
    fn test_assert() {
        let script = transpile("assert(1 == 2, \"nope\");");
        assert!(script.contains("if (-not ((1 -eq 2))) {"), "{script}");
        assert!(script.contains("exit 1"), "{script}");
    }
}
