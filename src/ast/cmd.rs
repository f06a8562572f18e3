use crate::lexer::FilePosition;

use super::StringNode;

/// A command tree: basic argument lists, pipelines, and background jobs.
#[derive(Debug, Clone)]
pub enum Cmd {
    Basic {
        args: Vec<CmdArg>,
        position: FilePosition,
    },
    Pipe {
        left: Box<Cmd>,
        right: Box<Cmd>,
    },
    Async(Box<Cmd>),
}

impl Cmd {
    pub fn position(&self) -> &FilePosition {
        match self {
            Cmd::Basic { position, .. } => position,
            Cmd::Pipe { left, .. } => left.position(),
            Cmd::Async(cmd) => cmd.position(),
        }
    }

    pub fn sexp(&self, typed: bool) -> String {
        match self {
            Cmd::Basic { args, .. } => {
                let args: Vec<_> = args.iter().map(|arg| arg.sexp(typed)).collect();
                format!("(Cmd {})", args.join(" "))
            }
            Cmd::Pipe { left, right } => {
                format!("(Pipe {} {})", left.sexp(typed), right.sexp(typed))
            }
            Cmd::Async(cmd) => format!("(Async {})", cmd.sexp(typed)),
        }
    }
}

/// One argument of a basic command.
#[derive(Debug, Clone)]
pub enum CmdArg {
    /// A bareword, passed through as-is.
    Word(String, FilePosition),
    /// A (possibly interpolated) string.
    Str(StringNode),
    /// A `$variable` reference.
    Var {
        name: String,
        position: FilePosition,
    },
}

impl CmdArg {
    pub fn position(&self) -> &FilePosition {
        match self {
            CmdArg::Word(_, position) => position,
            CmdArg::Str(string) => &string.position,
            CmdArg::Var { position, .. } => position,
        }
    }

    pub fn sexp(&self, typed: bool) -> String {
        match self {
            CmdArg::Word(word, _) => format!("{word:?}"),
            CmdArg::Str(string) => format!("(String {})", string.sexp(typed)),
            CmdArg::Var { name, .. } => format!("(Var {name})"),
        }
    }
}
