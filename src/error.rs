//! One diagnostic taxonomy spans the whole toolchain. Errors are never
//! caught inside the core; they propagate to the driver, which prints the
//! diagnostic and exits 1. The REPL catches them per line instead.

use std::error::Error;
use std::fmt::Display;

use crate::interpreter::{RuntimeError, RuntimeErrorKind};
use crate::jobs::JobError;
use crate::lexer::LexError;
use crate::parser::ParseError;
use crate::typechecker::TypeError;

#[derive(Debug)]
pub enum Diagnostic {
    Lex(LexError),
    Parse(ParseError),
    Type(TypeError),
    Runtime(RuntimeError),
    Job(JobError),
}

impl Diagnostic {
    /// Assertion failures print their message themselves and exit 1 with no
    /// further diagnostic line.
    pub fn is_assertion_failure(&self) -> bool {
        matches!(
            self,
            Diagnostic::Runtime(RuntimeError {
                kind: RuntimeErrorKind::AssertionFailed,
                ..
            })
        )
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::Lex(error) => error.fmt(f),
            Diagnostic::Parse(error) => error.fmt(f),
            Diagnostic::Type(error) => error.fmt(f),
            Diagnostic::Runtime(error) => error.fmt(f),
            Diagnostic::Job(error) => error.fmt(f),
        }
    }
}

impl Error for Diagnostic {}

impl From<LexError> for Diagnostic {
    fn from(error: LexError) -> Self {
        Diagnostic::Lex(error)
    }
}

impl From<ParseError> for Diagnostic {
    fn from(error: ParseError) -> Self {
        Diagnostic::Parse(error)
    }
}

impl From<TypeError> for Diagnostic {
    fn from(error: TypeError) -> Self {
        Diagnostic::Type(error)
    }
}

impl From<RuntimeError> for Diagnostic {
    fn from(error: RuntimeError) -> Self {
        Diagnostic::Runtime(error)
    }
}

impl From<JobError> for Diagnostic {
    fn from(error: JobError) -> Self {
        Diagnostic::Job(error)
    }
}
