//! # Conch
//!
//! The toolchain driver: interprets source files, prints token streams and
//! S-expressions, emits shell transpilations, and hosts the REPL. Exits 0 on
//! success and 1 on any diagnostic.

mod cli;

use cli::Cli;

use std::fs;
use std::path::Path;
use std::process;

use log::{error, info};

use conch_lang::error::Diagnostic;
use conch_lang::interpreter::FlowController;
use conch_lang::lexer;
use conch_lang::loader;
use conch_lang::parser;
use conch_lang::repl::Repl;
use conch_lang::transpiler::{BashTranspiler, PowershellTranspiler};
use conch_lang::typechecker::{typecheck, VariableTable};

fn main() {
    let args = Cli::init();

    simple_logger::init_with_level((&args.verbosity).into()).unwrap();

    process::exit(run(&args));
}

fn run(args: &Cli) -> i32 {
    let Some(file) = &args.file else {
        if args.lex || args.parse || args.typecheck || args.bash || args.powershell {
            error!("a source file is required (use -f <path>)");
            return 1;
        }
        return match Repl::new().run() {
            Ok(()) => 0,
            Err(error) => {
                error!("{error}");
                1
            }
        };
    };

    match pipeline(args, file) {
        Ok(()) => 0,
        Err(diagnostic) => {
            // Assertion failures already printed their message.
            if !diagnostic.is_assertion_failure() {
                eprintln!("{diagnostic}");
            }
            1
        }
    }
}

fn pipeline(args: &Cli, file: &Path) -> Result<(), Diagnostic> {
    let tokens = lexer::tokenize(file)?;
    if args.lex {
        for token in &tokens {
            println!("{token}");
        }
        return Ok(());
    }

    let mut program = parser::parse(tokens)?;
    let base = file
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut visited = std::collections::HashSet::new();
    visited.insert(fs::canonicalize(file).unwrap_or_else(|_| file.to_path_buf()));
    loader::resolve_imports(&mut program.stmts, base, &mut visited)?;

    if args.parse {
        println!("{}", program.sexp(false));
        return Ok(());
    }

    let mut table = VariableTable::new();
    typecheck(&mut program, &mut table)?;

    if args.typecheck {
        println!("{}", program.sexp(true));
        return Ok(());
    }

    if args.bash || args.powershell {
        if args.bash {
            let script = BashTranspiler::new().transpile(&program);
            let output = args
                .output
                .clone()
                .unwrap_or_else(|| "bash-out.sh".into());
            write_script(&output, &script)?;
        }
        if args.powershell {
            let script = PowershellTranspiler::new().transpile(&program);
            let output = args.output.clone().unwrap_or_else(|| "ps-out.ps1".into());
            write_script(&output, &script)?;
        }
        return Ok(());
    }

    FlowController::new().run(&program)?;
    Ok(())
}

fn write_script(path: &Path, script: &str) -> Result<(), Diagnostic> {
    fs::write(path, script).map_err(|error| {
        Diagnostic::Runtime(conch_lang::interpreter::RuntimeError::general(format!(
            "Failed to write '{}': {error}",
            path.display()
        )))
    })?;
    info!("wrote {}", path.display());
    Ok(())
}
