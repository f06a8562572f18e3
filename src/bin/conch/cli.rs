//! # Cli
//!
//! Argument parsing for the `conch` driver binary.

use clap::{Parser, ValueEnum};

/// Struct containing the CLI configuration for Conch.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Interpret the file at this path. Without a file, start the REPL.
    #[arg(short, long)]
    pub file: Option<std::path::PathBuf>,

    /// Lex only: print one token per line, then exit.
    #[arg(short = 'l', long)]
    pub lex: bool,

    /// Lex + parse: print the program's S-expression, then exit.
    #[arg(short = 'p', long)]
    pub parse: bool,

    /// Lex + parse + type-check: print the annotated S-expression, then exit.
    #[arg(short = 't', long)]
    pub typecheck: bool,

    /// Transpile to Bash (written to --output or bash-out.sh).
    #[arg(short = 'b', long)]
    pub bash: bool,

    /// Transpile to PowerShell (written to --output or ps-out.ps1).
    #[arg(long)]
    pub powershell: bool,

    /// Output path for transpiled scripts.
    #[arg(short = 'o', long)]
    pub output: Option<std::path::PathBuf>,

    /// Specify the log level of the toolchain.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    pub verbosity: LogLevel,
}

impl Cli {
    pub fn init() -> Self {
        Cli::parse()
    }
}

/// Enum for specifying the log level of Conch.
#[derive(ValueEnum, Clone, Default, Debug)]
pub enum LogLevel {
    /// The default log level. Only critical errors will be logged.
    #[default]
    #[value(alias("0"))]
    Error,

    /// Also log warnings.
    #[value(alias("1"))]
    Warn,

    /// Also log information about the general state of the toolchain.
    #[value(alias("2"))]
    Info,

    /// Log everything which happens internally.
    #[value(alias("3"))]
    Debug,

    /// Log extra information, including per-node details.
    #[value(alias("4"))]
    Trace,
}

impl From<&LogLevel> for log::Level {
    fn from(value: &LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}
