//! # Lexer
//!
//! Hand-written tokenizer for Conch source files. Produces a flat token list
//! terminated by `END_OF_FILE`, tracking file positions throughout. Strings
//! are lexed into a single `STRINGVAL` token carrying sub-tokens for literal
//! pieces and interpolated expressions.
//!
//! Statements whose first token is a string, a `$`-prefixed variable, or a
//! command bareword switch the lexer into command mode, where only command
//! token literals, strings, `$var`s, and barewords are recognized until the
//! terminating semicolon (or closing backtick).

mod token;

pub use token::*;

use std::error::Error;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub position: Option<FilePosition>,
}

impl LexError {
    fn at(message: impl Into<String>, position: FilePosition) -> Self {
        Self {
            message: message.into(),
            position: Some(position),
        }
    }
}

impl Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.position {
            Some(position) => write!(f, "Lex error at {position}: {}", self.message),
            None => write!(f, "Lex error: {}", self.message),
        }
    }
}

impl Error for LexError {}

pub type LexResult<T> = Result<T, LexError>;

/// Keyword lexemes and their token kinds.
const KEYWORDS: &[(&str, TokenKind)] = &[
    ("alias", TokenKind::Alias),
    ("assert", TokenKind::Assert),
    ("bool", TokenKind::Bool),
    ("break", TokenKind::Break),
    ("const", TokenKind::Const),
    ("continue", TokenKind::Continue),
    ("do", TokenKind::Do),
    ("else", TokenKind::Else),
    ("false", TokenKind::False),
    ("float", TokenKind::Float),
    ("for", TokenKind::For),
    ("if", TokenKind::If),
    ("import", TokenKind::Import),
    ("int", TokenKind::Int),
    ("print", TokenKind::Print),
    ("println", TokenKind::Println),
    ("read", TokenKind::Read),
    ("return", TokenKind::Return),
    ("scan", TokenKind::Scan),
    ("string", TokenKind::String),
    ("timeout", TokenKind::Timeout),
    ("to", TokenKind::To),
    ("true", TokenKind::True),
    ("type", TokenKind::Type),
    ("while", TokenKind::While),
    ("write", TokenKind::Write),
];

/// Non-keyword token literals, longest first so that greedy matching works.
const TOKEN_LITERALS: &[(&str, TokenKind)] = &[
    ("**=", TokenKind::ExponentiateEquals),
    ("->", TokenKind::Lambda),
    ("==", TokenKind::DoubleEquals),
    ("!=", TokenKind::NotEquals),
    ("<=", TokenKind::LesserEqual),
    (">=", TokenKind::GreaterEqual),
    ("&&", TokenKind::And),
    ("||", TokenKind::Or),
    ("**", TokenKind::Exponentiate),
    ("%=", TokenKind::ModuloEquals),
    ("/=", TokenKind::DivideEquals),
    ("*=", TokenKind::MultiplyEquals),
    ("-=", TokenKind::MinusEquals),
    ("+=", TokenKind::AddEquals),
    ("++", TokenKind::Increment),
    ("--", TokenKind::Decrement),
    ("+", TokenKind::Add),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Multiply),
    ("/", TokenKind::Divide),
    ("%", TokenKind::Modulo),
    (">", TokenKind::Greater),
    ("<", TokenKind::Lesser),
    ("!", TokenKind::Not),
    (":", TokenKind::Colon),
    (",", TokenKind::Comma),
    ("=", TokenKind::Equals),
    ("{", TokenKind::LCurly),
    ("[", TokenKind::LSquare),
    ("?", TokenKind::Question),
    ("}", TokenKind::RCurly),
    ("]", TokenKind::RSquare),
    (".", TokenKind::Dot),
];

/// Token literals that are also valid inside commands.
const COMMAND_TOKEN_LITERALS: &[(&str, TokenKind)] = &[
    ("`", TokenKind::Backtick),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("|", TokenKind::Pipe),
    ("&", TokenKind::Ampersand),
    (";", TokenKind::Semicolon),
];

/// Tokenize the file at `path`.
pub fn tokenize(path: &Path) -> LexResult<Vec<Token>> {
    let source = fs::read_to_string(path).map_err(|_| LexError {
        message: format!("File not found at {}", path.display()),
        position: None,
    })?;
    tokenize_source(&path.to_string_lossy(), &source)
}

/// Tokenize a source string, attributing positions to `file`.
pub fn tokenize_source(file: &str, source: &str) -> LexResult<Vec<Token>> {
    Lexer::new(file, source).lex()
}

struct Lexer {
    file: Rc<str>,
    src: Vec<char>,
    line: usize,
    column: usize,
    index: usize,
}

impl Lexer {
    fn new(file: &str, source: &str) -> Self {
        Self {
            file: Rc::from(file),
            src: source.chars().collect(),
            line: 1,
            column: 1,
            index: 0,
        }
    }

    fn position(&self) -> FilePosition {
        FilePosition {
            file: Rc::clone(&self.file),
            line: self.line,
            column: self.column,
            index: self.index,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.index).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.src.get(self.index + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.index += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn matches(&self, literal: &str) -> bool {
        literal
            .chars()
            .enumerate()
            .all(|(offset, c)| self.peek_at(offset) == Some(c))
    }

    fn take(&mut self, count: usize) -> String {
        (0..count).filter_map(|_| self.advance()).collect()
    }

    fn lex(mut self) -> LexResult<Vec<Token>> {
        let mut tokens = vec![];
        let mut is_command = false;
        let mut is_backtick_command = false;
        let mut is_first = true;
        let mut command_position = self.position();

        self.skip_whitespace()?;
        while self.peek().is_some() {
            let token = match self.lex_token(&mut is_command, is_first)? {
                Some(token) => token,
                None => {
                    let position = self.position();
                    let c = self.peek().unwrap();
                    if is_illegal_character(c) {
                        return Err(LexError::at(
                            format!("Illegal character (ascii {})", c as u32),
                            position,
                        ));
                    }
                    return Err(LexError::at("Unrecognized token", position));
                }
            };
            if token.kind == TokenKind::Semicolon {
                is_command = false;
                is_first = true;
            }
            if is_command && is_first {
                command_position = token.position.clone();
            }
            if token.kind == TokenKind::Backtick {
                if !is_command {
                    command_position = token.position.clone();
                    is_command = true;
                    is_backtick_command = true;
                } else if !is_backtick_command {
                    return Err(LexError::at(
                        "Cannot use backticks in command",
                        token.position.clone(),
                    ));
                } else {
                    is_command = false;
                    is_backtick_command = false;
                }
            }
            if is_first && token.kind != TokenKind::Semicolon {
                is_first = false;
            }
            tokens.push(token);
            self.skip_whitespace()?;
        }
        if is_command && is_backtick_command {
            return Err(LexError::at(
                "Command was not terminated with a backtick",
                command_position,
            ));
        }
        if is_command {
            return Err(LexError::at(
                "Command was not terminated with a semicolon",
                command_position,
            ));
        }
        tokens.push(Token::new(TokenKind::EndOfFile, "", self.position()));
        Ok(tokens)
    }

    /// Skip whitespace and comments. Line comments run to the end of the
    /// line; block comments do not nest and must be terminated.
    fn skip_whitespace(&mut self) -> LexResult<()> {
        let mut block_comment_position = self.position();
        let mut in_line_comment = false;
        let mut in_block_comment = false;
        while let Some(c) = self.peek() {
            if in_line_comment {
                if c == '\n' {
                    in_line_comment = false;
                }
                self.advance();
                continue;
            }
            if in_block_comment {
                if c == '*' && self.peek_at(1) == Some('/') {
                    in_block_comment = false;
                    self.take(2);
                } else {
                    self.advance();
                }
                continue;
            }
            if is_whitespace(c) {
                self.advance();
                continue;
            }
            if c == '/' && self.peek_at(1) == Some('/') {
                in_line_comment = true;
                self.take(2);
                continue;
            }
            if c == '/' && self.peek_at(1) == Some('*') {
                in_block_comment = true;
                block_comment_position = self.position();
                self.take(2);
                continue;
            }
            return Ok(());
        }
        if in_block_comment {
            return Err(LexError::at(
                "Unterminated block comment",
                block_comment_position,
            ));
        }
        Ok(())
    }

    /// Try every token class in order. Command mode disables normal token
    /// literals, keywords, numbers, and plain variables.
    fn lex_token(&mut self, is_command: &mut bool, is_first: bool) -> LexResult<Option<Token>> {
        if !*is_command {
            if let Some(token) = self.lex_token_literal() {
                return Ok(Some(token));
            }
        }
        if let Some(token) = self.lex_command_token_literal() {
            return Ok(Some(token));
        }
        if !*is_command {
            if let Some(token) = self.lex_keyword() {
                return Ok(Some(token));
            }
            if let Some(token) = self.lex_float() {
                return Ok(Some(token));
            }
            if let Some(token) = self.lex_int() {
                return Ok(Some(token));
            }
        }
        if let Some(token) = self.lex_string()? {
            if is_first && token.kind == TokenKind::StringVal {
                *is_command = true;
            }
            return Ok(Some(token));
        }
        if let Some(token) = self.lex_command_variable() {
            if is_first && token.kind == TokenKind::Variable {
                *is_command = true;
            }
            return Ok(Some(token));
        }
        if !*is_command {
            if let Some(token) = self.lex_variable() {
                return Ok(Some(token));
            }
        }
        if let Some(token) = self.lex_command_string() {
            if is_first && token.kind == TokenKind::CmdStringVal {
                *is_command = true;
            }
            return Ok(Some(token));
        }
        Ok(None)
    }

    fn lex_literal_from(&mut self, literals: &[(&str, TokenKind)]) -> Option<Token> {
        for (lexeme, kind) in literals {
            if self.matches(lexeme) {
                let position = self.position();
                self.take(lexeme.chars().count());
                return Some(Token::new(*kind, *lexeme, position));
            }
        }
        None
    }

    fn lex_token_literal(&mut self) -> Option<Token> {
        self.lex_literal_from(TOKEN_LITERALS)
    }

    fn lex_command_token_literal(&mut self) -> Option<Token> {
        self.lex_literal_from(COMMAND_TOKEN_LITERALS)
    }

    /// Keywords only match when not followed by another identifier character.
    fn lex_keyword(&mut self) -> Option<Token> {
        for (lexeme, kind) in KEYWORDS {
            let len = lexeme.chars().count();
            if !self.matches(lexeme) {
                continue;
            }
            if let Some(next) = self.peek_at(len) {
                if is_variable_character(next) {
                    continue;
                }
            }
            let position = self.position();
            self.take(len);
            return Some(Token::new(*kind, *lexeme, position));
        }
        None
    }

    /// Floats need a dot and at least one digit. No exponents, no signs.
    fn lex_float(&mut self) -> Option<Token> {
        let mut has_digit = false;
        let mut has_dot = false;
        let mut len = 0;
        while let Some(c) = self.peek_at(len) {
            if is_digit(c) {
                has_digit = true;
            } else if c == '.' && !has_dot {
                has_dot = true;
            } else {
                break;
            }
            len += 1;
        }
        if !(has_dot && has_digit) {
            return None;
        }
        let position = self.position();
        let lexeme = self.take(len);
        Some(Token::new(TokenKind::FloatVal, lexeme, position))
    }

    fn lex_int(&mut self) -> Option<Token> {
        if !self.peek().is_some_and(is_digit) {
            return None;
        }
        let position = self.position();
        let mut lexeme = String::new();
        while self.peek().is_some_and(is_digit) {
            lexeme.push(self.advance().unwrap());
        }
        Some(Token::new(TokenKind::IntVal, lexeme, position))
    }

    /// Lex a string literal, including `$"…"` / `$'…'` format strings and
    /// the interpolation forms inside double-quoted strings.
    fn lex_string(&mut self) -> LexResult<Option<Token>> {
        let is_format = self.peek() == Some('$');
        let quote_offset = usize::from(is_format);
        let is_single = self.peek_at(quote_offset) == Some('\'');
        let is_double = self.peek_at(quote_offset) == Some('"');
        if !is_single && !is_double {
            return Ok(None);
        }

        let mut token = Token::new(TokenKind::StringVal, "", self.position());
        self.take(quote_offset + 1);

        let mut terminated = false;
        let mut current = String::new();
        let mut current_position = self.position();
        while self.peek().is_some() {
            let char_position = self.position();
            let c = self.advance().unwrap();
            if is_illegal_character(c) {
                return Err(LexError::at(
                    format!("String contains illegal character (ascii {})", c as u32),
                    char_position,
                ));
            }
            if (is_single && c == '\'') || (is_double && c == '"') {
                terminated = true;
                if !current.is_empty() {
                    token
                        .sub_tokens
                        .push(Token::new(TokenKind::StringLiteral, current, current_position));
                }
                break;
            }
            if self.peek().is_none() {
                break;
            }
            if c == '\\' {
                let escape_position = self.position();
                let second = self.advance().unwrap();
                match second {
                    '{' | '}' if is_format => current.push(second),
                    '\\' => current.push('\\'),
                    '\'' if is_single => current.push('\''),
                    '"' if is_double => current.push('"'),
                    'n' if is_double => current.push('\n'),
                    't' if is_double => current.push('\t'),
                    'r' if is_double => current.push('\r'),
                    '$' if is_double => current.push('$'),
                    '\n' if is_double => {}
                    '\r' if is_double => {
                        // A CRLF after a backslash collapses to nothing.
                        if self.peek() == Some('\n') {
                            self.advance();
                        }
                    }
                    _ => {
                        return Err(LexError::at("Unknown escape sequence", escape_position));
                    }
                }
                continue;
            }
            // `$var` splices a variable into a double-quoted string.
            if c == '$'
                && is_double
                && !is_format
                && self.peek().is_some_and(is_first_variable_character)
            {
                if !current.is_empty() {
                    token.sub_tokens.push(Token::new(
                        TokenKind::StringLiteral,
                        std::mem::take(&mut current),
                        current_position.clone(),
                    ));
                }
                token.sub_tokens.push(self.lex_variable().unwrap());
                current_position = self.position();
                continue;
            }
            // `${…}` (plain double-quoted) or `{…}` (format string) re-enters
            // the main token loop until the matching close brace.
            let opens_format = (c == '$' && is_double && !is_format && self.peek() == Some('{'))
                || (c == '{' && is_format);
            if opens_format {
                if !is_format {
                    self.advance();
                }
                if !current.is_empty() {
                    token.sub_tokens.push(Token::new(
                        TokenKind::StringLiteral,
                        std::mem::take(&mut current),
                        current_position.clone(),
                    ));
                }
                self.lex_format_tokens(&mut token.sub_tokens, char_position)?;
                current_position = self.position();
                continue;
            }
            current.push(c);
        }
        if !terminated {
            return Err(LexError::at(
                format!(
                    "String wasn't terminated with {}",
                    if is_single { "'" } else { "\"" }
                ),
                token.position.clone(),
            ));
        }
        Ok(Some(token))
    }

    /// Lex the tokens of an embedded `${…}` expression into `out`, tracking
    /// brace depth explicitly and allowing nested backtick commands.
    fn lex_format_tokens(
        &mut self,
        out: &mut Vec<Token>,
        start_position: FilePosition,
    ) -> LexResult<()> {
        let mut depth = 1usize;
        let mut is_command = false;
        let mut command_position = self.position();
        self.skip_whitespace()?;
        while self.peek().is_some() {
            let token = match self.lex_token(&mut is_command, false)? {
                Some(token) => token,
                None => {
                    let position = self.position();
                    let c = self.peek().unwrap();
                    if is_illegal_character(c) {
                        return Err(LexError::at(
                            format!("Illegal character (ascii {})", c as u32),
                            position,
                        ));
                    }
                    return Err(LexError::at("Unrecognized token", position));
                }
            };
            match token.kind {
                TokenKind::Backtick => {
                    if !is_command {
                        command_position = token.position.clone();
                        is_command = true;
                    } else {
                        is_command = false;
                    }
                }
                TokenKind::LCurly => depth += 1,
                TokenKind::RCurly => {
                    depth -= 1;
                    if depth == 0 {
                        if is_command {
                            return Err(LexError::at(
                                "Command was not terminated with a backtick",
                                command_position,
                            ));
                        }
                        return Ok(());
                    }
                }
                _ => {}
            }
            out.push(token);
            self.skip_whitespace()?;
        }
        Err(LexError::at(
            "Unterminated format expression in string",
            start_position,
        ))
    }

    /// A `$`-prefixed variable, as used inside commands.
    fn lex_command_variable(&mut self) -> Option<Token> {
        if self.peek() != Some('$') {
            return None;
        }
        if !self.peek_at(1).is_some_and(is_first_variable_character) {
            return None;
        }
        self.advance();
        self.lex_variable()
    }

    fn lex_variable(&mut self) -> Option<Token> {
        if !self.peek().is_some_and(is_first_variable_character) {
            return None;
        }
        let position = self.position();
        let mut lexeme = String::new();
        while self.peek().is_some_and(is_variable_character) {
            lexeme.push(self.advance().unwrap());
        }
        Some(Token::new(TokenKind::Variable, lexeme, position))
    }

    /// A command bareword: anything up to whitespace or a command token.
    fn lex_command_string(&mut self) -> Option<Token> {
        let position = self.position();
        let mut lexeme = String::new();
        while let Some(c) = self.peek() {
            if is_whitespace(c)
                || is_illegal_character(c)
                || COMMAND_TOKEN_LITERALS
                    .iter()
                    .any(|(lexeme, _)| lexeme.chars().next() == Some(c))
            {
                break;
            }
            lexeme.push(self.advance().unwrap());
        }
        if lexeme.is_empty() {
            return None;
        }
        Some(Token::new(TokenKind::CmdStringVal, lexeme, position))
    }
}

fn is_first_variable_character(c: char) -> bool {
    is_variable_character(c) && !is_digit(c)
}

fn is_variable_character(c: char) -> bool {
    is_letter(c) || is_digit(c) || c == '_'
}

fn is_letter(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_lowercase()
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn is_whitespace(c: char) -> bool {
    c == '\n' || c == '\r' || c == '\t' || c == ' '
}

fn is_illegal_character(c: char) -> bool {
    !is_whitespace(c) && (c < ' ' || c > '~')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize_source("test.cnch", source)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn test_lex_declaration() {
        assert_eq!(
            kinds("int x = 5;"),
            vec![
                TokenKind::Int,
                TokenKind::Variable,
                TokenKind::Equals,
                TokenKind::IntVal,
                TokenKind::Semicolon,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn test_lex_positions() {
        let tokens = tokenize_source("test.cnch", "int x;\nx += 2;").unwrap();
        assert_eq!(tokens[0].position.line, 1);
        assert_eq!(tokens[0].position.column, 1);
        assert_eq!(tokens[3].position.line, 2);
        assert_eq!(tokens[3].position.column, 1);
        assert_eq!(tokens[4].kind, TokenKind::AddEquals);
    }

    #[test]
    fn test_keyword_boundary() {
        // `interval` starts with `int` but is a variable.
        assert_eq!(
            kinds("interval"),
            vec![TokenKind::Variable, TokenKind::EndOfFile]
        );
    }

    #[test]
    fn test_float_before_int() {
        let tokens = tokenize_source("test.cnch", "3.14 42 .5 5.").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::FloatVal);
        assert_eq!(tokens[0].lexeme, "3.14");
        assert_eq!(tokens[1].kind, TokenKind::IntVal);
        assert_eq!(tokens[2].kind, TokenKind::FloatVal);
        assert_eq!(tokens[2].lexeme, ".5");
        assert_eq!(tokens[3].kind, TokenKind::FloatVal);
        assert_eq!(tokens[3].lexeme, "5.");
    }

    #[test]
    fn test_command_mode_barewords() {
        // A statement starting with a string enters command mode, so `-la`
        // is a bareword rather than a minus token.
        assert_eq!(
            kinds("\"ls\" -la;"),
            vec![
                TokenKind::StringVal,
                TokenKind::CmdStringVal,
                TokenKind::Semicolon,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn test_command_mode_ends_at_semicolon() {
        assert_eq!(
            kinds("\"ls\" -la; int x = 1;"),
            vec![
                TokenKind::StringVal,
                TokenKind::CmdStringVal,
                TokenKind::Semicolon,
                TokenKind::Int,
                TokenKind::Variable,
                TokenKind::Equals,
                TokenKind::IntVal,
                TokenKind::Semicolon,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn test_backtick_command() {
        assert_eq!(
            kinds("string s = `ls -la`;"),
            vec![
                TokenKind::String,
                TokenKind::Variable,
                TokenKind::Equals,
                TokenKind::Backtick,
                TokenKind::CmdStringVal,
                TokenKind::CmdStringVal,
                TokenKind::Backtick,
                TokenKind::Semicolon,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn test_unterminated_backtick_command() {
        let result = tokenize_source("test.cnch", "string s = `ls;");
        assert!(result.is_err());
    }

    #[test]
    fn test_string_with_variable_interpolation() {
        let tokens = tokenize_source("test.cnch", "string s = \"hi $name!\";").unwrap();
        let string_token = &tokens[3];
        assert_eq!(string_token.kind, TokenKind::StringVal);
        let kinds: Vec<_> = string_token
            .sub_tokens
            .iter()
            .map(|token| token.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::StringLiteral,
                TokenKind::Variable,
                TokenKind::StringLiteral,
            ]
        );
        assert_eq!(string_token.sub_tokens[0].lexeme, "hi ");
        assert_eq!(string_token.sub_tokens[1].lexeme, "name");
        assert_eq!(string_token.sub_tokens[2].lexeme, "!");
    }

    #[test]
    fn test_string_with_format_expression() {
        let tokens = tokenize_source("test.cnch", "string s = \"a${1 + 2}b\";").unwrap();
        let string_token = &tokens[3];
        let kinds: Vec<_> = string_token
            .sub_tokens
            .iter()
            .map(|token| token.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::StringLiteral,
                TokenKind::IntVal,
                TokenKind::Add,
                TokenKind::IntVal,
                TokenKind::StringLiteral,
            ]
        );
    }

    #[test]
    fn test_format_string_braces() {
        let tokens = tokenize_source("test.cnch", "string s = $\"v = {x} \\{literal\\}\";").unwrap();
        let string_token = &tokens[3];
        let kinds: Vec<_> = string_token
            .sub_tokens
            .iter()
            .map(|token| token.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::StringLiteral,
                TokenKind::Variable,
                TokenKind::StringLiteral,
            ]
        );
        assert_eq!(string_token.sub_tokens[2].lexeme, " {literal}");
    }

    #[test]
    fn test_escapes() {
        let tokens = tokenize_source("test.cnch", "string s = \"a\\n\\t\\\"b\\$\";").unwrap();
        assert_eq!(tokens[3].sub_tokens[0].lexeme, "a\n\t\"b$");
    }

    #[test]
    fn test_unknown_escape() {
        assert!(tokenize_source("test.cnch", "string s = \"\\q\";").is_err());
    }

    #[test]
    fn test_line_continuation_in_double_quotes() {
        let tokens = tokenize_source("test.cnch", "string s = \"a\\\nb\";").unwrap();
        assert_eq!(tokens[3].sub_tokens[0].lexeme, "ab");
    }

    #[test]
    fn test_line_continuation_in_single_quotes_is_an_error() {
        // Single-quoted strings accept only \\ and \'.
        assert!(tokenize_source("test.cnch", "string s = 'a\\\nb';").is_err());
        assert!(tokenize_source("test.cnch", "string s = 'a\\nb';").is_err());
    }

    #[test]
    fn test_unterminated_string() {
        assert!(tokenize_source("test.cnch", "string s = \"abc").is_err());
    }

    #[test]
    fn test_unterminated_block_comment() {
        assert!(tokenize_source("test.cnch", "/* comment").is_err());
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            kinds("// line\n/* block */ 1;"),
            vec![TokenKind::IntVal, TokenKind::Semicolon, TokenKind::EndOfFile]
        );
    }

    #[test]
    fn test_illegal_character() {
        let result = tokenize_source("test.cnch", "int x = \u{7f};");
        assert!(result.is_err());
    }

    #[test]
    fn test_relex_token_stream_is_stable() {
        let source = "int x = 5; x += 3; println x;";
        let first: Vec<_> = tokenize_source("a.cnch", source)
            .unwrap()
            .iter()
            .map(|token| (token.kind, token.lexeme.clone()))
            .collect();
        let relexed_source = first
            .iter()
            .map(|(_, lexeme)| lexeme.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let second: Vec<_> = tokenize_source("b.cnch", &relexed_source)
            .unwrap()
            .iter()
            .map(|token| (token.kind, token.lexeme.clone()))
            .collect();
        assert_eq!(first, second);
    }
}
