//! Builtin commands executed by the job runner itself rather than by
//! spawning a child process.

use std::io::{self, BufRead, Write};

use super::JobError;

pub fn is_builtin(name: &str) -> bool {
    name == "scan"
}

/// Run a builtin. `input` is the piped-in text when the builtin is not the
/// first stage of a pipeline; output is written to `output`.
pub fn run(
    name: &str,
    _args: &[String],
    input: Option<&str>,
    output: &mut dyn Write,
) -> Result<i32, JobError> {
    match name {
        "scan" => {
            let line = match input {
                Some(text) => text.lines().next().unwrap_or("").to_string(),
                None => {
                    let mut line = String::new();
                    io::stdin()
                        .lock()
                        .read_line(&mut line)
                        .map_err(|error| JobError::new(format!("scan: {error}")))?;
                    line.trim_end_matches(['\n', '\r']).to_string()
                }
            };
            writeln!(output, "{line}").map_err(|error| JobError::new(format!("scan: {error}")))?;
            Ok(0)
        }
        _ => Err(JobError::new(format!("Unknown builtin '{name}'"))),
    }
}
