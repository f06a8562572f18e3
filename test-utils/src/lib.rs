//! Helpers for the end-to-end scenario tests: run a source program through
//! the full pipeline (lex, parse, import resolution, type check, interpret)
//! with captured stdout, and assert on output and exit code.

use std::cell::RefCell;
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;

use conch_lang::error::Diagnostic;
use conch_lang::interpreter::FlowController;
use conch_lang::lexer;
use conch_lang::loader;
use conch_lang::parser;
use conch_lang::typechecker::{typecheck, VariableTable};

pub struct Expected<'a> {
    pub stdout: &'a str,
    pub exit: i32,
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

/// Run a source program; returns captured stdout, the exit code the CLI
/// would use, and the diagnostic if one was raised.
pub fn run_program(source: &str) -> (String, i32, Option<Diagnostic>) {
    let buffer = Rc::new(RefCell::new(Vec::new()));
    let result = (|| -> Result<(), Diagnostic> {
        let tokens = lexer::tokenize_source("scenario.cnch", source)?;
        let mut program = parser::parse(tokens)?;
        let mut table = VariableTable::new();
        typecheck(&mut program, &mut table)?;
        let mut flow = FlowController::with_output(Box::new(SharedBuffer(Rc::clone(&buffer))));
        flow.run(&program)?;
        Ok(())
    })();
    let stdout = String::from_utf8(buffer.borrow().clone()).unwrap_or_default();
    match result {
        Ok(()) => (stdout, 0, None),
        Err(diagnostic) => (stdout, 1, Some(diagnostic)),
    }
}

/// Run the program at `path` (with import resolution relative to it).
pub fn run_file(path: &Path) -> (String, i32, Option<Diagnostic>) {
    let buffer = Rc::new(RefCell::new(Vec::new()));
    let result = (|| -> Result<(), Diagnostic> {
        let mut program = loader::load_program(path)?;
        let mut table = VariableTable::new();
        typecheck(&mut program, &mut table)?;
        let mut flow = FlowController::with_output(Box::new(SharedBuffer(Rc::clone(&buffer))));
        flow.run(&program)?;
        Ok(())
    })();
    let stdout = String::from_utf8(buffer.borrow().clone()).unwrap_or_default();
    match result {
        Ok(()) => (stdout, 0, None),
        Err(diagnostic) => (stdout, 1, Some(diagnostic)),
    }
}

/// Assert that running `source` produces exactly the expected stdout and
/// exit code.
pub fn check_program(source: &str, expected: Expected) {
    let (stdout, exit, diagnostic) = run_program(source);
    assert_eq!(
        stdout, expected.stdout,
        "stdout mismatch (diagnostic: {diagnostic:?})"
    );
    assert_eq!(
        exit, expected.exit,
        "exit code mismatch (diagnostic: {diagnostic:?})"
    );
}
