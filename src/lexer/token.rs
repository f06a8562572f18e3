use std::fmt::Display;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// A position in a source file. Lines and columns are 1-based, the index is a
/// 0-based offset into the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePosition {
    pub file: Rc<str>,
    pub line: usize,
    pub column: usize,
    pub index: usize,
}

impl FilePosition {
    pub fn start_of(file: &str) -> Self {
        Self {
            file: Rc::from(file),
            line: 1,
            column: 1,
            index: 0,
        }
    }

    /// Position for tokens that were synthesized rather than read from a file.
    pub fn unknown() -> Self {
        Self {
            file: Rc::from(""),
            line: 0,
            column: 0,
            index: 0,
        }
    }
}

impl Display for FilePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Every kind of token the lexer can produce.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum TokenKind {
    Add,
    AddEquals,
    Alias,
    Ampersand,
    And,
    Assert,
    Backtick,
    Bool,
    Break,
    CmdStringVal,
    Colon,
    Comma,
    Const,
    Continue,
    Decrement,
    Divide,
    DivideEquals,
    Do,
    Dot,
    DoubleEquals,
    Else,
    EndOfFile,
    Equals,
    Exponentiate,
    ExponentiateEquals,
    False,
    Float,
    FloatVal,
    For,
    Greater,
    GreaterEqual,
    If,
    Import,
    Increment,
    Int,
    IntVal,
    Lambda,
    LCurly,
    Lesser,
    LesserEqual,
    LParen,
    LSquare,
    Minus,
    MinusEquals,
    Modulo,
    ModuloEquals,
    Multiply,
    MultiplyEquals,
    Not,
    NotEquals,
    Or,
    Pipe,
    Print,
    Println,
    Question,
    RCurly,
    Read,
    Return,
    RParen,
    RSquare,
    Scan,
    Semicolon,
    String,
    StringLiteral,
    StringVal,
    Timeout,
    To,
    True,
    Type,
    Variable,
    While,
    Write,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use TokenKind::*;
        let name = match self {
            Add => "ADD",
            AddEquals => "ADD_EQUALS",
            Alias => "ALIAS",
            Ampersand => "AMPERSAND",
            And => "AND",
            Assert => "ASSERT",
            Backtick => "BACKTICK",
            Bool => "BOOL",
            Break => "BREAK",
            CmdStringVal => "CMDSTRINGVAL",
            Colon => "COLON",
            Comma => "COMMA",
            Const => "CONST",
            Continue => "CONTINUE",
            Decrement => "DECREMENT",
            Divide => "DIVIDE",
            DivideEquals => "DIVIDE_EQUALS",
            Do => "DO",
            Dot => "DOT",
            DoubleEquals => "DOUBLE_EQUALS",
            Else => "ELSE",
            EndOfFile => "END_OF_FILE",
            Equals => "EQUALS",
            Exponentiate => "EXPONENTIATE",
            ExponentiateEquals => "EXPONENTIATE_EQUALS",
            False => "FALSE",
            Float => "FLOAT",
            FloatVal => "FLOATVAL",
            For => "FOR",
            Greater => "GREATER",
            GreaterEqual => "GREATER_EQUAL",
            If => "IF",
            Import => "IMPORT",
            Increment => "INCREMENT",
            Int => "INT",
            IntVal => "INTVAL",
            Lambda => "LAMBDA",
            LCurly => "LCURLY",
            Lesser => "LESSER",
            LesserEqual => "LESSER_EQUAL",
            LParen => "LPAREN",
            LSquare => "LSQUARE",
            Minus => "MINUS",
            MinusEquals => "MINUS_EQUALS",
            Modulo => "MODULO",
            ModuloEquals => "MODULO_EQUALS",
            Multiply => "MULTIPLY",
            MultiplyEquals => "MULTIPLY_EQUALS",
            Not => "NOT",
            NotEquals => "NOT_EQUALS",
            Or => "OR",
            Pipe => "PIPE",
            Print => "PRINT",
            Println => "PRINTLN",
            Question => "QUESTION",
            RCurly => "RCURLY",
            Read => "READ",
            Return => "RETURN",
            RParen => "RPAREN",
            RSquare => "RSQUARE",
            Scan => "SCAN",
            Semicolon => "SEMICOLON",
            String => "STRING",
            StringLiteral => "STRINGLITERAL",
            StringVal => "STRINGVAL",
            Timeout => "TIMEOUT",
            To => "TO",
            True => "TRUE",
            Type => "TYPE",
            Variable => "VARIABLE",
            While => "WHILE",
            Write => "WRITE",
        };
        f.write_str(name)
    }
}

/// A single token. String tokens additionally carry an ordered list of
/// sub-tokens: literal pieces interleaved with the tokens of any interpolated
/// expressions.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub position: FilePosition,
    pub sub_tokens: Vec<Token>,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, position: FilePosition) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            position,
            sub_tokens: vec![],
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            TokenKind::EndOfFile => write!(f, "{}", self.kind),
            TokenKind::StringVal => {
                writeln!(f, "{}", self.kind)?;
                writeln!(f, "[")?;
                for token in &self.sub_tokens {
                    writeln!(f, "{token}")?;
                }
                write!(f, "]")
            }
            _ => write!(f, "{} '{}'", self.kind, self.lexeme),
        }
    }
}
