//! Bash backend. Integer and boolean arithmetic uses `$(( … ))`, float
//! arithmetic is dispatched through `bc -l`, and captured commands become
//! command substitutions. Functions return their value on stdout, so a call
//! in value position is a command substitution.

use crate::ast::{
    AssignOp, AssignTarget, BinOpKind, Cmd, CmdArg, Expr, ExprKind, LValue, LambdaExpr, Program,
    Stmt, StmtKind, StringNode, StringPart, UnOpKind,
};
use crate::typechecker::Type;

use super::Emitter;

const PRELUDE: &str = r#"__conch_length() { printf '%s' "${#1}"; }
__conch_upper() { printf '%s' "$1" | tr '[:lower:]' '[:upper:]'; }
__conch_lower() { printf '%s' "$1" | tr '[:upper:]' '[:lower:]'; }
__conch_trim() { local s=$1; s=${s#"${s%%[![:space:]]*}"}; s=${s%"${s##*[![:space:]]}"}; printf '%s' "$s"; }
__conch_replace() { printf '%s' "${1/"$2"/$3}"; }
__conch_replaceAll() { printf '%s' "${1//"$2"/$3}"; }
__conch_charAt() { printf '%s' "${1:$2:1}"; }
__conch_substring() { printf '%s' "${1:$2:$(($3 - $2))}"; }
__conch_startsWith() { case $1 in "$2"*) printf 1 ;; *) printf 0 ;; esac; }
__conch_endsWith() { case $1 in *"$2") printf 1 ;; *) printf 0 ;; esac; }
__conch_includes() { case $1 in *"$2"*) printf 1 ;; *) printf 0 ;; esac; }
__conch_indexOf() { local rest=${1%%"$2"*}; if [ "$rest" = "$1" ]; then printf '%s' '-1'; else printf '%s' "${#rest}"; fi; }
__conch_toString() { printf '%s' "$1"; }
__conch_parseInt() { printf '%s' "${1%%.*}"; }
__conch_parseFloat() { printf '%s' "$1"; }
__conch_abs() { case $1 in *.*) printf '%s' "${1#-}" ;; -*) printf '%s' "$(( -$1 ))" ;; *) printf '%s' "$1" ;; esac; }
__conch_sqrt() { echo "sqrt($1)" | bc -l; }
__conch_floor() { echo "scale=0; x = $1; d = x / 1; if (d > x) d -= 1; d" | bc; }
__conch_time() { date +%s; }
__conch_sleep() { sleep "$(echo "$1 / 1000" | bc -l)"; }
__conch_random() { awk 'BEGIN { srand(); printf "%.17f", rand() }'; }"#;

pub struct BashTranspiler {
    emitter: Emitter,
    lambda_counter: usize,
    /// Function definitions hoisted out of expression position.
    hoisted: Vec<(String, LambdaExpr)>,
}

impl Default for BashTranspiler {
    fn default() -> Self {
        Self::new()
    }
}

impl BashTranspiler {
    pub fn new() -> Self {
        Self {
            emitter: Emitter::new(),
            lambda_counter: 0,
            hoisted: vec![],
        }
    }

    /// Emit a Bash script equivalent to the typed program.
    pub fn transpile(mut self, program: &Program) -> String {
        self.emitter.line("#!/bin/bash");
        self.emitter.blank();
        for line in PRELUDE.lines() {
            self.emitter.line(line);
        }
        self.emitter.blank();
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
                self.emitter.line(&format!("if [ {cond} -eq 1 ]; then"));
                self.emitter.enter();
                self.emit_stmt(then_body);
                self.emitter.leave();
                if let Some(else_body) = else_body {
                    self.emitter.line("else");
                    self.emitter.enter();
                    self.emit_stmt(else_body);
                    self.emitter.leave();
                }
                self.emitter.line("fi");
            }
            StmtKind::While { cond, body } => {
                let cond = self.value(cond);
                self.flush_hoisted();
                self.emitter.line(&format!("while [ {cond} -eq 1 ]; do"));
                self.emitter.enter();
                self.emit_stmt(body);
                self.emitter.leave();
                self.emitter.line("done");
            }
            StmtKind::DoWhile { body, cond } => {
                let cond = self.value(cond);
                self.flush_hoisted();
                self.emitter.line("while true; do");
                self.emitter.enter();
                self.emit_stmt(body);
                self.emitter.line(&format!("if [ {cond} -ne 1 ]; then break; fi"));
                self.emitter.leave();
                self.emitter.line("done");
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
                self.emitter.line(&format!("while [ {cond} -eq 1 ]; do"));
                self.emitter.enter();
                self.emit_stmt(body);
                self.emit_expr_stmt(update);
                self.emitter.leave();
                self.emitter.line("done");
            }
            StmtKind::Return(value) => match value {
                Some(expr) => {
                    let value = self.value(expr);
                    self.flush_hoisted();
                    self.emitter.line(&format!("printf '%s' {value}"));
                    self.emitter.line("return 0");
                }
                None => self.emitter.line("return 0"),
            },
            StmtKind::Break => self.emitter.line("break"),
            StmtKind::Continue => self.emitter.line("continue"),
            StmtKind::Scope(stmts) => {
                self.emitter.line("{");
                self.emitter.enter();
                if stmts.is_empty() {
                    self.emitter.line(":");
                }
                for stmt in stmts {
                    self.emit_stmt(stmt);
                }
                self.emitter.leave();
                self.emitter.line("}");
            }
            StmtKind::Cmd(cmd) => {
                let line = self.command_line(cmd);
                self.flush_hoisted();
                self.emitter.line(&line);
            }
            StmtKind::Expr(expr) => self.emit_expr_stmt(expr),
            StmtKind::Alias { name, cmd } => {
                let line = self.command_line(cmd);
                self.emitter.line(&format!("{name}() {{ {line} \"$@\"; }}"));
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
                self.emitter.line(&format!("printf '%s' {value}"));
            }
            StmtKind::Println(expr) => {
                let value = self.value(expr);
                self.flush_hoisted();
                self.emitter.line(&format!("printf '%s\\n' {value}"));
            }
            StmtKind::Write { content, path } => {
                let content = self.value(content);
                let path = self.value(path);
                self.flush_hoisted();
                self.emitter
                    .line(&format!("printf '%s' {content} > {path}"));
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
                self.emitter.line("(");
                self.emitter.enter();
                self.emit_stmt(body);
                self.emitter.leave();
                self.emitter.line(") & __conch_job=$!");
                self.emitter.line(&format!(
                    "( sleep \"$(echo \"{millis} / 1000\" | bc -l)\"; kill $__conch_job 2>/dev/null ) & __conch_watch=$!"
                ));
                self.emitter.line("if wait $__conch_job 2>/dev/null; then");
                self.emitter.enter();
                self.emitter.line("kill $__conch_watch 2>/dev/null");
                self.emitter.leave();
                self.emitter.line("else");
                self.emitter.enter();
                self.emitter.line(&format!("printf '%s\\n' {message}"));
                self.emitter.leave();
                self.emitter.line("fi");
            }
            StmtKind::Assert { cond, message } => {
                let cond = self.value(cond);
                let message = self.value(message);
                self.flush_hoisted();
                self.emitter.line(&format!("if [ {cond} -ne 1 ]; then"));
                self.emitter.enter();
                self.emitter.line(&format!("printf '%s\\n' {message}"));
                self.emitter.line("exit 1");
                self.emitter.leave();
                self.emitter.line("fi");
            }
            StmtKind::TypeAlias { name, .. } => {
                self.emitter.line(&format!("# type alias {name}"));
            }
        }
    }

    /// A statement-position expression: assignments and increments write
    /// variables directly, anything else is evaluated for its effects.
    fn emit_expr_stmt(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Assign { target, op, value } => {
                let rendered = match (target, &value.kind) {
                    (AssignTarget::Binding(_), ExprKind::Array(elements))
                    | (AssignTarget::Binding(_), ExprKind::Tuple(elements)) => {
                        let parts: Vec<_> =
                            elements.iter().map(|element| self.value(element)).collect();
                        format!("({})", parts.join(" "))
                    }
                    _ => self.value(value),
                };
                let rendered = match (op.desugared(), target) {
                    (Some(binop), AssignTarget::LValue(lvalue)) => self.binary_value(
                        binop,
                        &self.lvalue_value(lvalue),
                        &rendered,
                        expr.ty.as_ref(),
                    ),
                    _ => rendered,
                };
                self.flush_hoisted();
                match target {
                    AssignTarget::Binding(binding) => {
                        self.emitter.line(&format!("{}={rendered}", binding.name));
                    }
                    AssignTarget::LValue(LValue::Variable { name, .. }) => {
                        self.emitter.line(&format!("{name}={rendered}"));
                    }
                    AssignTarget::LValue(LValue::Index { target, index, .. }) => {
                        let index = self.value(index);
                        let name = lvalue_root(target);
                        self.emitter.line(&format!("{name}[{index}]={rendered}"));
                    }
                }
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
                if let ExprKind::LValue(LValue::Variable { name, .. }) = &operand.kind {
                    let sign = match op {
                        UnOpKind::PreDecrement | UnOpKind::PostDecrement => "-",
                        _ => "+",
                    };
                    self.emitter
                        .line(&format!("{name}=$(( {name} {sign} 1 ))"));
                }
            }
            ExprKind::Call { .. } | ExprKind::ApiCall { .. } => {
                let value = self.value(expr);
                self.flush_hoisted();
                // Strip the substitution so the call runs in place.
                let inner = value
                    .strip_prefix("\"$(")
                    .and_then(|rest| rest.strip_suffix(")\""))
                    .map(str::to_string)
                    .unwrap_or(value);
                self.emitter.line(&inner);
            }
            _ => {
                let value = self.value(expr);
                self.flush_hoisted();
                self.emitter.line(&format!(": {value}"));
            }
        }
    }

    fn emit_function(&mut self, name: &str, lambda: &LambdaExpr) {
        self.emitter.blank();
        self.emitter.line(&format!("{name}() {{"));
        self.emitter.enter();
        for (index, param) in lambda.params.iter().enumerate() {
            self.emitter
                .line(&format!("local {}=${}", param.name, index + 1));
        }
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

    /// Render an expression as a single Bash word.
    fn value(&mut self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Int(value) => value.to_string(),
            ExprKind::Float(value) => format!("{value}"),
            ExprKind::Bool(value) => if *value { "1" } else { "0" }.to_string(),
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
                format!(
                    "\"$(if [ {cond} -eq 1 ]; then printf '%s' {if_true}; else printf '%s' {if_false}; fi)\""
                )
            }
            ExprKind::UnOp { op, operand } => {
                let operand_value = self.value(operand);
                match op {
                    UnOpKind::Negate => {
                        if is_float(operand) {
                            format!("\"$(echo \"0 - {}\" | bc -l)\"", dequote(&operand_value))
                        } else {
                            format!("$(( -{} ))", dequote(&operand_value))
                        }
                    }
                    UnOpKind::Not => format!("$(( !{} ))", dequote(&operand_value)),
                    UnOpKind::PreIncrement | UnOpKind::PreDecrement => {
                        let name = operand_root(operand);
                        let sign = if *op == UnOpKind::PreIncrement { "+" } else { "-" };
                        format!("$(( {name} = {name} {sign} 1 ))")
                    }
                    UnOpKind::PostIncrement | UnOpKind::PostDecrement => {
                        let name = operand_root(operand);
                        let sign = if *op == UnOpKind::PostIncrement { "++" } else { "--" };
                        format!("$(( {name}{sign} ))")
                    }
                }
            }
            ExprKind::BinOp { op, lhs, rhs } => {
                let lhs_value = self.value(lhs);
                let rhs_value = self.value(rhs);
                if op.is_equality() && matches!(lhs.ty, Some(Type::String)) {
                    let test = if *op == BinOpKind::Equal { "=" } else { "!=" };
                    return format!(
                        "\"$(if [ {lhs_value} {test} {rhs_value} ]; then printf 1; else printf 0; fi)\""
                    );
                }
                let float = is_float(lhs) || is_float(rhs);
                self.binary_value(
                    *op,
                    &lhs_value,
                    &rhs_value,
                    if float { Some(&Type::Float) } else { expr.ty.as_ref() },
                )
            }
            ExprKind::Assign { value, .. } => self.value(value),
            ExprKind::Index { target, index } => {
                let index = self.value(index);
                match &target.kind {
                    ExprKind::LValue(LValue::Variable { name, .. }) => {
                        format!("\"${{{name}[{index}]}}\"")
                    }
                    _ => {
                        let target = self.value(target);
                        format!("\"$(printf '%s' {target} | cut -d' ' -f$(( {index} + 1 )))\"")
                    }
                }
            }
            ExprKind::Tuple(parts) | ExprKind::Array(parts) => {
                let parts: Vec<_> = parts.iter().map(|part| self.value(part)).collect();
                format!("({})", parts.join(" "))
            }
            ExprKind::Call { callee, args } => {
                let name = self.callee_name(callee);
                let args: Vec<_> = args.iter().map(|arg| self.value(arg)).collect();
                if args.is_empty() {
                    format!("\"$({name})\"")
                } else {
                    format!("\"$({name} {})\"", args.join(" "))
                }
            }
            ExprKind::ApiCall {
                receiver,
                name,
                args,
            } => {
                let mut rendered = vec![self.value(receiver)];
                rendered.extend(args.iter().map(|arg| self.value(arg)));
                format!("\"$({} {})\"", builtin_name(name), rendered.join(" "))
            }
            ExprKind::Lambda(lambda) => {
                self.lambda_counter += 1;
                let name = format!("__conch_lambda_{}", self.lambda_counter);
                self.hoisted.push((name.clone(), lambda.clone()));
                name
            }
            ExprKind::CmdExpr(cmd) => {
                let line = self.command_line(cmd);
                format!("\"$({line})\"")
            }
            ExprKind::Scan(prompt) => {
                let prompt = self.value(prompt);
                format!("\"$(read -r -p {prompt} REPLY; printf '%s' \"$REPLY\")\"")
            }
            ExprKind::Read(path) => {
                let path = self.value(path);
                format!("\"$(cat {path})\"")
            }
        }
    }

    fn binary_value(
        &self,
        op: BinOpKind,
        lhs: &str,
        rhs: &str,
        ty: Option<&Type>,
    ) -> String {
        let float = matches!(ty, Some(Type::Float));
        if op == BinOpKind::Add && matches!(ty, Some(Type::String)) {
            return format!("\"$(printf '%s%s' {lhs} {rhs})\"");
        }
        if float {
            let operator = match op {
                BinOpKind::Exponentiate => "^",
                BinOpKind::Multiply => "*",
                BinOpKind::Divide => "/",
                BinOpKind::Modulo => "%",
                BinOpKind::Add => "+",
                BinOpKind::Subtract => "-",
                BinOpKind::Lesser => "<",
                BinOpKind::LesserEqual => "<=",
                BinOpKind::Greater => ">",
                BinOpKind::GreaterEqual => ">=",
                BinOpKind::Equal => "==",
                BinOpKind::NotEqual => "!=",
                BinOpKind::And => "&&",
                BinOpKind::Or => "||",
            };
            return format!(
                "\"$(echo \"{} {operator} {}\" | bc -l)\"",
                dequote(lhs),
                dequote(rhs)
            );
        }
        if op == BinOpKind::Equal || op == BinOpKind::NotEqual {
            // String equality goes through test; numeric equality stays in
            // arithmetic context.
            if !looks_numeric(lhs) || !looks_numeric(rhs) {
                let test = if op == BinOpKind::Equal { "=" } else { "!=" };
                return format!("\"$(if [ {lhs} {test} {rhs} ]; then printf 1; else printf 0; fi)\"");
            }
        }
        let operator = match op {
            BinOpKind::Exponentiate => "**",
            BinOpKind::Multiply => "*",
            BinOpKind::Divide => "/",
            BinOpKind::Modulo => "%",
            BinOpKind::Add => "+",
            BinOpKind::Subtract => "-",
            BinOpKind::Lesser => "<",
            BinOpKind::LesserEqual => "<=",
            BinOpKind::Greater => ">",
            BinOpKind::GreaterEqual => ">=",
            BinOpKind::Equal => "==",
            BinOpKind::NotEqual => "!=",
            BinOpKind::And => "&&",
            BinOpKind::Or => "||",
        };
        // Quotes are not legal inside arithmetic expansion.
        format!("$(( {} {operator} {} ))", dequote(lhs), dequote(rhs))
    }

    fn lvalue_value(&self, lvalue: &LValue) -> String {
        match lvalue {
            LValue::Variable { name, .. } => format!("\"${{{name}}}\""),
            LValue::Index { target, index, .. } => {
                let name = lvalue_root(target);
                let index = index_literal(index);
                format!("\"${{{name}[{index}]}}\"")
            }
        }
    }

    fn callee_name(&mut self, callee: &Expr) -> String {
        match &callee.kind {
            ExprKind::LValue(LValue::Variable { name, .. }) => builtin_name(name),
            _ => dequote(&self.value(callee)),
        }
    }

    fn string_value(&mut self, string: &StringNode) -> String {
        let mut out = String::from("\"");
        for part in &string.parts {
            match part {
                StringPart::Literal(literal) => out.push_str(&escape_double(literal)),
                StringPart::Expr(expr) => {
                    let value = self.value(expr);
                    out.push_str(&dequote(&value));
                }
            }
        }
        out.push('"');
        out
    }

    fn command_line(&mut self, cmd: &Cmd) -> String {
        match cmd {
            Cmd::Basic { args, .. } => {
                let words: Vec<_> = args
                    .iter()
                    .map(|arg| match arg {
                        CmdArg::Word(word, _) => word.clone(),
                        CmdArg::Str(string) => self.string_value(string),
                        CmdArg::Var { name, .. } => format!("\"${{{name}}}\""),
                    })
                    .collect();
                words.join(" ")
            }
            Cmd::Pipe { left, right } => {
                format!("{} | {}", self.command_line(left), self.command_line(right))
            }
            Cmd::Async(inner) => format!("{} &", self.command_line(inner)),
        }
    }
}

fn builtin_name(name: &str) -> String {
    const MAPPED: &[&str] = &[
        "length",
        "upper",
        "lower",
        "trim",
        "replace",
        "replaceAll",
        "charAt",
        "substring",
        "startsWith",
        "endsWith",
        "includes",
        "indexOf",
        "toString",
        "parseInt",
        "parseFloat",
        "abs",
        "sqrt",
        "floor",
        "time",
        "sleep",
        "random",
    ];
    if MAPPED.contains(&name) {
        format!("__conch_{name}")
    } else {
        name.to_string()
    }
}

fn lvalue_root(lvalue: &LValue) -> String {
    match lvalue {
        LValue::Variable { name, .. } => name.clone(),
        LValue::Index { target, .. } => lvalue_root(target),
    }
}

fn operand_root(operand: &Expr) -> String {
    match &operand.kind {
        ExprKind::LValue(lvalue) => lvalue_root(lvalue),
        _ => String::new(),
    }
}

fn index_literal(index: &Expr) -> String {
    match &index.kind {
        ExprKind::Int(value) => value.to_string(),
        ExprKind::LValue(LValue::Variable { name, .. }) => format!("${name}"),
        _ => "0".to_string(),
    }
}

fn is_float(expr: &Expr) -> bool {
    matches!(expr.ty, Some(Type::Float))
}

fn looks_numeric(value: &str) -> bool {
    value.starts_with("$((")
        || value.starts_with("\"${")
        || value.chars().all(|c| c.is_ascii_digit() || c == '-')
}

fn dequote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

fn escape_double(text: &str) -> String {
    let mut out = String::new();
    for c in text.chars() {
        match c {
            '"' | '\\' | '$' | '`' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
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
        BashTranspiler::new().transpile(&program)
    }

    #[test]
    fn test_shebang_and_prelude() {
        let script = transpile("println 1;");
        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains("__conch_length()"));
    }

    #[test]
    fn test_integer_arithmetic_uses_arithmetic_expansion() {
        let script = transpile("println 1 + 2 * 3;");
        assert!(script.contains("printf '%s\\n' $(( 1 + $(( 2 * 3 )) ))"), "{script}");
    }

    #[test]
    fn test_float_arithmetic_uses_bc() {
        let script = transpile("println 1.5 + 2.5;");
        assert!(script.contains("bc -l"), "{script}");
    }

    #[test]
    fn test_declaration_and_reference() {
        let script = transpile("int x = 5; println x;");
        assert!(script.contains("x=5"), "{script}");
        assert!(script.contains("printf '%s\\n' \"${x}\""), "{script}");
    }

    #[test]
    fn test_if_statement() {
        let script = transpile("if (1 < 2) { println 1; }");
        assert!(script.contains("if [ $(( 1 < 2 )) -eq 1 ]; then"), "{script}");
        assert!(script.contains("fi"), "{script}");
    }

    #[test]
    fn test_for_loop_becomes_while() {
        let script = transpile("for (int i = 0; i < 3; i++) { println i; }");
        assert!(script.contains("i=0"), "{script}");
        assert!(script.contains("while [ $(( ${i} < 3 )) -eq 1 ]; do"), "{script}");
        assert!(script.contains("done"), "{script}");
    }

    #[test]
    fn test_function_definition_and_call() {
        let script = transpile("(x: int) -> int { return x * x; } square; println square(4);");
        assert!(script.contains("square() {"), "{script}");
        assert!(script.contains("local x=$1"), "{script}");
        assert!(script.contains("printf '%s\\n' \"$(square 4)\""), "{script}");
    }

    #[test]
    fn test_command_statement_passes_through() {
        let script = transpile("\"ls\" -la;");
        assert!(script.contains("\"ls\" -la"), "{script}");
    }

    #[test]
    fn test_pipeline() {
        let script = transpile("\"ls\" | \"wc\";");
        assert!(script.contains("\"ls\" | \"wc\""), "{script}");
    }

    #[test]
    fn test_assert() {
        let script = transpile("assert(1 == 2, \"nope\");");
        assert!(script.contains("exit 1"), "{script}");
        assert!(script.contains("printf '%s\\n' \"nope\""), "{script}");
    }

    #[test]
    fn test_compound_exponentiation() {
        let script = transpile("int x = 2; x **= 3;");
        assert!(script.contains("x=$(( ${x} ** 3 ))"), "{script}");
    }

    #[test]
    fn test_string_interpolation() {
        let script = transpile("int x = 1; println \"x is ${x}\";");
        assert!(script.contains("\"x is ${x}\""), "{script}");
    }
}
