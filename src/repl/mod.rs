//! # REPL
//!
//! Reads lines from a `LineSource`, splices each into a temporary file, and
//! feeds it through the ordinary pipeline (lex, parse, import resolution,
//! type check, interpret). The variable table and interpreter state persist
//! across lines; a failed line prints one diagnostic and is discarded.

use std::collections::HashSet;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use log::debug;

use crate::error::Diagnostic;
use crate::interpreter::FlowController;
use crate::lexer;
use crate::loader;
use crate::parser;
use crate::typechecker::{typecheck, VariableTable};

const PROMPT: &str = "conch> ";

/// Supplies lines of source text to the REPL. The terminal line editor is
/// one implementation; tests provide scripted ones.
pub trait LineSource {
    /// The next line, or `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

#[derive(Debug, Default)]
pub struct StdinLineSource;

impl LineSource for StdinLineSource {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()?;
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }
}

pub struct Repl<S: LineSource> {
    source: S,
    table: VariableTable,
    flow: FlowController,
}

impl Repl<StdinLineSource> {
    pub fn new() -> Self {
        Self::with_source(StdinLineSource)
    }
}

impl Default for Repl<StdinLineSource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: LineSource> Repl<S> {
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            table: VariableTable::new(),
            flow: FlowController::new(),
        }
    }

    pub fn with_source_and_output(source: S, out: Box<dyn Write>) -> Self {
        Self {
            source,
            table: VariableTable::new(),
            flow: FlowController::with_output(out),
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        while let Some(line) = self.source.read_line(PROMPT)? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed == "exit" {
                break;
            }
            if let Err(diagnostic) = self.eval_line(&line) {
                // Assertions printed their message already.
                if !diagnostic.is_assertion_failure() {
                    eprintln!("{diagnostic}");
                }
            }
        }
        Ok(())
    }

    fn eval_line(&mut self, line: &str) -> Result<(), Diagnostic> {
        let mut file = tempfile::Builder::new()
            .prefix("conch-repl-")
            .suffix(".cnch")
            .tempfile()
            .map_err(io_diagnostic)?;
        file.write_all(line.as_bytes()).map_err(io_diagnostic)?;
        file.flush().map_err(io_diagnostic)?;
        debug!("evaluating line via '{}'", file.path().display());

        let tokens = lexer::tokenize(file.path())?;
        let mut program = parser::parse(tokens)?;
        let base = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        loader::resolve_imports(&mut program.stmts, &base, &mut HashSet::new())?;
        typecheck(&mut program, &mut self.table)?;
        self.flow.run(&program)?;
        Ok(())
    }
}

fn io_diagnostic(error: io::Error) -> Diagnostic {
    Diagnostic::Runtime(crate::interpreter::RuntimeError::general(format!(
        "REPL i/o error: {error}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct ScriptedSource {
        lines: Vec<String>,
    }

    impl LineSource for ScriptedSource {
        fn read_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
            if self.lines.is_empty() {
                Ok(None)
            } else {
                Ok(Some(self.lines.remove(0)))
            }
        }
    }

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

    fn run_lines(lines: &[&str]) -> String {
        let buffer = Rc::new(RefCell::new(Vec::new()));
        let source = ScriptedSource {
            lines: lines.iter().map(|line| line.to_string()).collect(),
        };
        let mut repl =
            Repl::with_source_and_output(source, Box::new(SharedBuffer(Rc::clone(&buffer))));
        repl.run().unwrap();
        drop(repl);
        let output = buffer.borrow().clone();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_state_persists_between_lines() {
        let output = run_lines(&["int x = 2;", "x += 40;", "println x;"]);
        assert_eq!(output, "42\n");
    }

    #[test]
    fn test_failed_line_is_discarded() {
        let output = run_lines(&["int x = 1;", "string x = 2;", "println x;"]);
        assert_eq!(output, "1\n");
    }

    #[test]
    fn test_exit_stops_the_loop() {
        let output = run_lines(&["println 1;", "exit", "println 2;"]);
        assert_eq!(output, "1\n");
    }

    #[test]
    fn test_functions_survive_across_lines() {
        let output = run_lines(&[
            "(x: int) -> int { return x + 1; } inc;",
            "println inc(41);",
        ]);
        assert_eq!(output, "42\n");
    }
}
