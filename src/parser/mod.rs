//! # Parser
//!
//! Table-driven LR(1) parser. The grammar lives in [`grammar`], the ACTION
//! and GOTO tables are produced by the offline [`generator`] (and cached in
//! a `Lazy` for in-process use), and the driver in this module performs the
//! shift/reduce loop, invoking one reduction function per rule to build the
//! AST.

pub mod generator;
pub mod grammar;
pub mod table;

use std::error::Error;
use std::fmt::Display;

use crate::ast::{AstNode, Expr, Program, StmtKind, StringNode, StringPart};
use crate::lexer::{FilePosition, Token, TokenKind};

use self::grammar::grammar;
use self::table::{parse_table, Action};

#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub position: Option<FilePosition>,
}

impl ParseError {
    pub fn at(message: impl Into<String>, position: FilePosition) -> Self {
        Self {
            message: message.into(),
            position: Some(position),
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.position {
            Some(position) => write!(f, "Parse error at {position}: {}", self.message),
            None => write!(f, "Parse error: {}", self.message),
        }
    }
}

impl Error for ParseError {}

/// One entry of the parse stack: a shifted token or a reduced AST node.
#[derive(Debug, Clone)]
pub enum ProductionItem {
    Token(Token),
    Node(AstNode),
}

impl ProductionItem {
    pub fn position(&self) -> FilePosition {
        match self {
            ProductionItem::Token(token) => token.position.clone(),
            ProductionItem::Node(node) => node_position(node),
        }
    }

    pub fn into_token(self) -> Token {
        match self {
            ProductionItem::Token(token) => token,
            ProductionItem::Node(_) => unreachable!("parse stack held a node where a token was expected"),
        }
    }

    pub fn into_node(self) -> AstNode {
        match self {
            ProductionItem::Node(node) => node,
            ProductionItem::Token(_) => unreachable!("parse stack held a token where a node was expected"),
        }
    }
}

fn node_position(node: &AstNode) -> FilePosition {
    match node {
        AstNode::Expr(expr) => expr.position.clone(),
        AstNode::Stmt(stmt) => stmt.position.clone(),
        AstNode::LValue(lvalue) => lvalue.position().clone(),
        AstNode::Binding(binding) => binding.position.clone(),
        AstNode::Type(ty) => ty.position.clone(),
        AstNode::String(string) => string.position.clone(),
        AstNode::Cmd(cmd) => cmd.position().clone(),
        AstNode::Stmts(stmts) => stmts
            .first()
            .map(|stmt| stmt.position.clone())
            .unwrap_or_else(FilePosition::unknown),
        AstNode::Exprs(exprs) => exprs
            .first()
            .map(|expr| expr.position.clone())
            .unwrap_or_else(FilePosition::unknown),
        AstNode::Bindings(bindings) => bindings
            .first()
            .map(|binding| binding.position.clone())
            .unwrap_or_else(FilePosition::unknown),
        AstNode::Types(types) => types
            .first()
            .map(|ty| ty.position.clone())
            .unwrap_or_else(FilePosition::unknown),
        AstNode::Program(_) => FilePosition::unknown(),
    }
}

/// Parse a token list (as produced by the lexer) into a program.
pub fn parse(tokens: Vec<Token>) -> Result<Program, ParseError> {
    if tokens.iter().all(|token| token.kind == TokenKind::EndOfFile) {
        return Ok(Program::default());
    }

    let grammar = grammar();
    let table = parse_table();

    let mut states: Vec<usize> = vec![0];
    let mut stack: Vec<ProductionItem> = vec![];
    let mut next = 0usize;

    loop {
        let lookahead = &tokens[next];
        let state = *states.last().unwrap_or(&0);
        match table.action(state, lookahead.kind) {
            Some(Action::Shift(target)) => {
                stack.push(ProductionItem::Token(lookahead.clone()));
                states.push(target);
                next += 1;
            }
            Some(Action::Reduce(rule)) => {
                let size = grammar.rules[rule].components.len();
                let items = stack.split_off(stack.len() - size);
                states.truncate(states.len() - size);
                let node = (grammar.reductions[rule])(items)?;
                let state = *states.last().unwrap_or(&0);
                // The GOTO is on the rule's declared result, not on the
                // concrete node (parameter rules build binding nodes).
                let Some(target) = table.goto(state, grammar.rules[rule].result) else {
                    return Err(ParseError::at(
                        format!("Unexpected token {}", lookahead.kind),
                        lookahead.position.clone(),
                    ));
                };
                stack.push(ProductionItem::Node(node));
                states.push(target);
            }
            Some(Action::Accept) => {
                let Some(ProductionItem::Node(AstNode::Program(program))) = stack.pop() else {
                    return Err(ParseError::at(
                        "Parse accepted without a program on the stack",
                        lookahead.position.clone(),
                    ));
                };
                return Ok(program);
            }
            None => {
                return Err(ParseError::at(
                    format!("Unexpected token {}", lookahead.kind),
                    lookahead.position.clone(),
                ));
            }
        }
    }
}

/// Build the string structure of a `STRINGVAL` token: literal pieces stay
/// literal, and each run of tokens between them is parsed as one embedded
/// expression.
pub(crate) fn parse_interpolation(token: &Token) -> Result<StringNode, ParseError> {
    let mut parts = vec![];
    let mut run: Vec<Token> = vec![];
    for sub in &token.sub_tokens {
        if sub.kind == TokenKind::StringLiteral {
            if !run.is_empty() {
                parts.push(StringPart::Expr(parse_embedded(&std::mem::take(&mut run))?));
            }
            parts.push(StringPart::Literal(sub.lexeme.clone()));
        } else {
            run.push(sub.clone());
        }
    }
    if !run.is_empty() {
        parts.push(StringPart::Expr(parse_embedded(&run)?));
    }
    Ok(StringNode {
        parts,
        position: token.position.clone(),
    })
}

/// Parse an embedded token run as a single expression by wrapping it in
/// parentheses and a terminating semicolon and running the ordinary parser.
fn parse_embedded(run: &[Token]) -> Result<Expr, ParseError> {
    let position = run
        .first()
        .map(|token| token.position.clone())
        .unwrap_or_else(FilePosition::unknown);
    let mut tokens = Vec::with_capacity(run.len() + 4);
    tokens.push(Token::new(TokenKind::LParen, "(", position.clone()));
    tokens.extend_from_slice(run);
    tokens.push(Token::new(TokenKind::RParen, ")", position.clone()));
    tokens.push(Token::new(TokenKind::Semicolon, ";", position.clone()));
    tokens.push(Token::new(TokenKind::EndOfFile, "", position.clone()));

    let mut program = parse(tokens)?;
    if program.stmts.len() != 1 {
        return Err(ParseError::at("Invalid format expression", position));
    }
    match program.stmts.remove(0).kind {
        StmtKind::Expr(expr) => Ok(expr),
        _ => Err(ParseError::at("Invalid format expression", position)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize_source;

    fn parse_source(source: &str) -> Result<Program, ParseError> {
        parse(tokenize_source("test.cnch", source).unwrap())
    }

    fn sexp(source: &str) -> String {
        parse_source(source).unwrap().sexp(false)
    }

    #[test]
    fn test_empty_program() {
        assert_eq!(parse_source("").unwrap().stmts.len(), 0);
    }

    #[test]
    fn test_precedence_multiplication_binds_tighter() {
        assert_eq!(
            sexp("println 1 + 2 * 3;"),
            "(Prgm (Println (BinOp ADD (Int 1) (BinOp MULTIPLY (Int 2) (Int 3)))))"
        );
    }

    #[test]
    fn test_precedence_parens() {
        assert_eq!(
            sexp("println (1 + 2) * 3;"),
            "(Prgm (Println (BinOp MULTIPLY (BinOp ADD (Int 1) (Int 2)) (Int 3))))"
        );
    }

    #[test]
    fn test_comparison_below_arithmetic() {
        assert_eq!(
            sexp("println 1 + 2 < 4;"),
            "(Prgm (Println (BinOp LESSER (BinOp ADD (Int 1) (Int 2)) (Int 4))))"
        );
    }

    #[test]
    fn test_declaration() {
        assert_eq!(
            sexp("int x = 5;"),
            "(Prgm (ExprStmt (BinOp SET (Binding x (IntType)) (Int 5))))"
        );
    }

    #[test]
    fn test_const_declaration() {
        assert_eq!(
            sexp("const int x = 5;"),
            "(Prgm (ExprStmt (BinOp SET (Binding const x (IntType)) (Int 5))))"
        );
    }

    #[test]
    fn test_compound_assignment() {
        assert_eq!(
            sexp("x += 3;"),
            "(Prgm (ExprStmt (BinOp ADD_EQUAL (Var x) (Int 3))))"
        );
    }

    #[test]
    fn test_if_else_binds_to_nearest() {
        assert_eq!(
            sexp("if (a) if (b) break; else continue;"),
            "(Prgm (If (Var a) (If (Var b) (Break) (Continue))))"
        );
    }

    #[test]
    fn test_for_loop() {
        assert_eq!(
            sexp("for (int i = 0; i < 3; i++) { println i; }"),
            "(Prgm (For (BinOp SET (Binding i (IntType)) (Int 0)) \
             (BinOp LESSER (Var i) (Int 3)) (UnOp POST_INCREMENT (Var i)) \
             (Scope (Println (Var i)))))"
        );
    }

    #[test]
    fn test_lambda_function_statement() {
        assert_eq!(
            sexp("(x: int) -> int { return x * x; } square;"),
            "(Prgm (Function square (Lambda ((Binding x (IntType))) (IntType) \
             (Scope (Return (BinOp MULTIPLY (Var x) (Var x)))))))"
        );
    }

    #[test]
    fn test_call() {
        assert_eq!(
            sexp("println square(4);"),
            "(Prgm (Println (Call (Var square) (Int 4))))"
        );
    }

    #[test]
    fn test_array_literal_and_index() {
        assert_eq!(
            sexp("int[] xs = [1, 2]; println xs[0];"),
            "(Prgm (ExprStmt (BinOp SET (Binding xs (ArrayType (IntType))) \
             (Array (Int 1) (Int 2)))) (Println (Index (Var xs) (Int 0))))"
        );
    }

    #[test]
    fn test_index_assignment() {
        assert_eq!(
            sexp("xs[0] = 7;"),
            "(Prgm (ExprStmt (BinOp SET (Index (Var xs) (Int 0)) (Int 7))))"
        );
    }

    #[test]
    fn test_ternary() {
        assert_eq!(
            sexp("println a ? 1 : 2;"),
            "(Prgm (Println (Ternary (Var a) (Int 1) (Int 2))))"
        );
    }

    #[test]
    fn test_ternary_with_variable_branches() {
        // The colon here belongs to the ternary, not to a binding.
        assert_eq!(
            sexp("println c ? a : b;"),
            "(Prgm (Println (Ternary (Var c) (Var a) (Var b))))"
        );
    }

    #[test]
    fn test_parenthesized_variable_is_an_expression() {
        assert_eq!(
            sexp("println (x) * 2;"),
            "(Prgm (Println (BinOp MULTIPLY (Var x) (Int 2))))"
        );
    }

    #[test]
    fn test_tuple() {
        assert_eq!(
            sexp("println (1, 2.5);"),
            "(Prgm (Println (Tuple (Int 1) (Float 2.5))))"
        );
    }

    #[test]
    fn test_command_statement() {
        assert_eq!(sexp("\"ls\" -la;"), "(Prgm (CmdStmt (Cmd (String (\"ls\")) \"-la\")))");
    }

    #[test]
    fn test_pipeline() {
        assert_eq!(
            sexp("\"ls\" | \"wc\";"),
            "(Prgm (CmdStmt (Pipe (Cmd (String (\"ls\"))) (Cmd (String (\"wc\"))))))"
        );
    }

    #[test]
    fn test_background_command() {
        assert_eq!(
            sexp("\"sleep\" 10 &;"),
            "(Prgm (CmdStmt (Async (Cmd (String (\"sleep\")) \"10\"))))"
        );
    }

    #[test]
    fn test_captured_command_expression() {
        assert_eq!(
            sexp("string s = `ls -l`;"),
            "(Prgm (ExprStmt (BinOp SET (Binding s (StringType)) (CmdExpr (Cmd \"ls\" \"-l\")))))"
        );
    }

    #[test]
    fn test_string_interpolation_structure() {
        assert_eq!(
            sexp("println \"v=${1 + 2}!\";"),
            "(Prgm (Println (String (\"v=\" (BinOp ADD (Int 1) (Int 2)) \"!\"))))"
        );
    }

    #[test]
    fn test_assert_statement() {
        assert_eq!(
            sexp("assert(1 == 2, \"nope\");"),
            "(Prgm (Assert (BinOp EQUAL (Int 1) (Int 2)) (String (\"nope\"))))"
        );
    }

    #[test]
    fn test_timeout_statement() {
        assert_eq!(
            sexp("timeout (100) { println 1; } else \"slow\";"),
            "(Prgm (Timeout (Int 100) (Scope (Println (Int 1))) (String (\"slow\"))))"
        );
    }

    #[test]
    fn test_alias_statement() {
        assert_eq!(
            sexp("alias ll = \"ls\" -l;"),
            "(Prgm (Alias ll (Cmd (String (\"ls\")) \"-l\")))"
        );
    }

    #[test]
    fn test_type_alias_statement() {
        assert_eq!(sexp("type Id = int;"), "(Prgm (Type Id (IntType)))");
    }

    #[test]
    fn test_api_call() {
        assert_eq!(
            sexp("println s.length();"),
            "(Prgm (Println (ApiCall (Var s) length )))"
        );
    }

    #[test]
    fn test_syntax_error_position() {
        let error = parse_source("int x = ;").unwrap_err();
        assert!(error.message.contains("SEMICOLON"), "{}", error.message);
        let position = error.position.unwrap();
        assert_eq!(position.line, 1);
        assert_eq!(position.column, 9);
    }

    #[test]
    fn test_parse_determinism() {
        let a = sexp("int x = 1 + 2 * 3; println x;");
        let b = sexp("int x = 1 + 2 * 3; println x;");
        assert_eq!(a, b);
    }

    #[test]
    fn test_scan_and_read() {
        assert_eq!(
            sexp("string s = scan \"? \";"),
            "(Prgm (ExprStmt (BinOp SET (Binding s (StringType)) (Scan (String (\"? \"))))))"
        );
        assert_eq!(
            sexp("string s = read \"f.txt\";"),
            "(Prgm (ExprStmt (BinOp SET (Binding s (StringType)) (Read (String (\"f.txt\"))))))"
        );
    }

    #[test]
    fn test_import_statement() {
        assert_eq!(sexp("import \"lib.cnch\";"), "(Prgm (Import (\"lib.cnch\")))");
    }

    #[test]
    fn test_write_statement() {
        assert_eq!(
            sexp("write \"data\" to \"out.txt\";"),
            "(Prgm (Write (String (\"data\")) (String (\"out.txt\"))))"
        );
    }
}
