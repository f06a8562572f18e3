//! # Loader
//!
//! Reads source files and resolves `import` statements at parse time: each
//! imported file is lexed and parsed, its imports resolved recursively, and
//! its statement list spliced into the importing statement. A path set
//! detects import cycles.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::ast::{ExprKind, Program, Stmt, StmtKind};
use crate::error::Diagnostic;
use crate::lexer;
use crate::parser::{self, ParseError};

/// Lex, parse, and resolve imports for the program at `path`.
pub fn load_program(path: &Path) -> Result<Program, Diagnostic> {
    let canonical = canonicalize(path);
    let mut visited = HashSet::new();
    visited.insert(canonical.clone());
    debug!("loading program from '{}'", path.display());

    let tokens = lexer::tokenize(path)?;
    let mut program = parser::parse(tokens)?;
    let base = canonical
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    resolve_imports(&mut program.stmts, &base, &mut visited)?;
    Ok(program)
}

/// Resolve every `import` in the statement list (recursively through nested
/// statements), splicing the imported programs in place. `visited` holds the
/// canonical paths currently on the import stack.
pub fn resolve_imports(
    stmts: &mut [Stmt],
    base: &Path,
    visited: &mut HashSet<PathBuf>,
) -> Result<(), Diagnostic> {
    for stmt in stmts {
        resolve_stmt(stmt, base, visited)?;
    }
    Ok(())
}

fn resolve_stmt(
    stmt: &mut Stmt,
    base: &Path,
    visited: &mut HashSet<PathBuf>,
) -> Result<(), Diagnostic> {
    match &mut stmt.kind {
        StmtKind::Import { path, stmts } => {
            let Some(relative) = path.as_literal() else {
                return Err(ParseError::at(
                    "Import path must be a string literal",
                    path.position.clone(),
                )
                .into());
            };
            let target = base.join(&relative);
            let canonical = canonicalize(&target);
            if !visited.insert(canonical.clone()) {
                return Err(ParseError::at(
                    format!("Import cycle involving '{relative}'"),
                    path.position.clone(),
                )
                .into());
            }
            debug!("importing '{}'", target.display());
            let tokens = lexer::tokenize(&target)?;
            let mut imported = parser::parse(tokens)?;
            let imported_base = canonical
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| base.to_path_buf());
            resolve_imports(&mut imported.stmts, &imported_base, visited)?;
            visited.remove(&canonical);
            *stmts = imported.stmts;
            Ok(())
        }
        StmtKind::If {
            then_body,
            else_body,
            ..
        } => {
            resolve_stmt(then_body, base, visited)?;
            if let Some(else_body) = else_body {
                resolve_stmt(else_body, base, visited)?;
            }
            Ok(())
        }
        StmtKind::For { body, .. }
        | StmtKind::While { body, .. }
        | StmtKind::DoWhile { body, .. }
        | StmtKind::Timeout { body, .. } => resolve_stmt(body, base, visited),
        StmtKind::Scope(stmts) => resolve_imports(stmts, base, visited),
        StmtKind::Function { lambda, .. } => {
            if let ExprKind::Lambda(lambda) = &mut lambda.kind {
                resolve_stmt(&mut lambda.body, base, visited)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn canonicalize(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_import_splices_statements() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "lib.cnch", "int shared = 41;");
        let main = write_file(dir.path(), "main.cnch", "import \"lib.cnch\"; println shared;");
        let program = load_program(&main).unwrap();
        let StmtKind::Import { stmts, .. } = &program.stmts[0].kind else {
            panic!("expected an import statement");
        };
        assert_eq!(stmts.len(), 1);
    }

    #[test]
    fn test_import_cycle_detected() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.cnch", "import \"b.cnch\";");
        let b = write_file(dir.path(), "b.cnch", "import \"a.cnch\";");
        let error = load_program(&b).unwrap_err();
        assert!(error.to_string().contains("cycle"), "{error}");
    }

    #[test]
    fn test_missing_import_is_a_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let main = write_file(dir.path(), "main.cnch", "import \"absent.cnch\";");
        assert!(load_program(&main).is_err());
    }

    #[test]
    fn test_diamond_import_is_not_a_cycle() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "base.cnch", "int base = 1;");
        write_file(dir.path(), "left.cnch", "import \"base.cnch\";");
        write_file(dir.path(), "right.cnch", "import \"base.cnch\";");
        let main = write_file(
            dir.path(),
            "main.cnch",
            "import \"left.cnch\"; import \"right.cnch\";",
        );
        assert!(load_program(&main).is_ok());
    }
}
