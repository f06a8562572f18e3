//! # Job runner
//!
//! Executes external commands and runner builtins: single processes,
//! pipelines, background jobs, and capture mode (stdout/stderr read into
//! strings). A deadline can be supplied, in which case the whole process
//! group of every stage is terminated once it passes (SIGTERM, then SIGKILL
//! after a short grace period).

pub mod builtins;
mod process;

pub use process::{Process, ProcessKind};

use std::error::Error;
use std::fmt::Display;
use std::io::{self, Read, Write};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::debug;

#[derive(Debug, Clone)]
pub struct JobError {
    pub message: String,
    pub timed_out: bool,
}

impl JobError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
        }
    }

    pub fn timeout() -> Self {
        Self {
            message: "Command timed out".to_string(),
            timed_out: true,
        }
    }
}

impl Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Job error: {}", self.message)
    }
}

impl Error for JobError {}

/// What `exec` reports back: captured output (empty unless capture mode was
/// requested) and the exit code of the last stage.
#[derive(Debug, Clone, Default)]
pub struct JobInfo {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

#[derive(Debug, Default)]
pub struct JobRunner;

/// What feeds a stage's stdin.
enum Carry {
    Inherit,
    Pipe(ChildStdout),
    Buffer(String),
}

impl JobRunner {
    pub fn new() -> Self {
        Self
    }

    pub fn exec(&self, process: &Process) -> Result<JobInfo, JobError> {
        self.exec_with_deadline(process, None)
    }

    pub fn exec_with_deadline(
        &self,
        process: &Process,
        deadline: Option<Instant>,
    ) -> Result<JobInfo, JobError> {
        if process.background {
            self.run_background(process)?;
            return Ok(JobInfo::default());
        }
        self.run_pipeline(process, deadline)
    }

    fn run_pipeline(
        &self,
        head: &Process,
        deadline: Option<Instant>,
    ) -> Result<JobInfo, JobError> {
        let stages = head.stages();
        let capture = head.capture;
        debug!("running {} stage(s), capture={capture}", stages.len());

        let mut carry = Carry::Inherit;
        let mut intermediates: Vec<Child> = vec![];
        let mut last_child: Option<Child> = None;
        let mut writer_threads: Vec<JoinHandle<()>> = vec![];
        let mut builtin_exit = 0;
        let mut builtin_output: Option<String> = None;

        let count = stages.len();
        for (index, stage) in stages.iter().enumerate() {
            let last = index + 1 == count;
            match stage.kind {
                ProcessKind::Builtin => {
                    let input = drain_carry(std::mem::replace(&mut carry, Carry::Inherit))?;
                    if last && !capture {
                        let mut stdout = io::stdout().lock();
                        builtin_exit = builtins::run(
                            &stage.name,
                            &stage.args,
                            input.as_deref(),
                            &mut stdout,
                        )?;
                    } else {
                        let mut buffer = Vec::new();
                        builtin_exit =
                            builtins::run(&stage.name, &stage.args, input.as_deref(), &mut buffer)?;
                        let text = String::from_utf8_lossy(&buffer).into_owned();
                        if last {
                            builtin_output = Some(text);
                        } else {
                            carry = Carry::Buffer(text);
                        }
                    }
                }
                ProcessKind::External => {
                    let mut command = Command::new(&stage.name);
                    command.args(&stage.args[1..]);
                    #[cfg(unix)]
                    {
                        use std::os::unix::process::CommandExt;
                        command.process_group(0);
                    }
                    let buffered_input = match std::mem::replace(&mut carry, Carry::Inherit) {
                        Carry::Inherit => {
                            command.stdin(Stdio::inherit());
                            None
                        }
                        Carry::Pipe(previous) => {
                            command.stdin(Stdio::from(previous));
                            None
                        }
                        Carry::Buffer(text) => {
                            command.stdin(Stdio::piped());
                            Some(text)
                        }
                    };
                    if !last || capture {
                        command.stdout(Stdio::piped());
                    }
                    if last && capture {
                        command.stderr(Stdio::piped());
                    }
                    let mut child = command.spawn().map_err(|error| {
                        JobError::new(format!("Failed to spawn '{}': {error}", stage.name))
                    })?;
                    if let Some(text) = buffered_input {
                        if let Some(mut stdin) = child.stdin.take() {
                            writer_threads.push(thread::spawn(move || {
                                let _ = stdin.write_all(text.as_bytes());
                            }));
                        }
                    }
                    if last {
                        last_child = Some(child);
                    } else {
                        let Some(stdout) = child.stdout.take() else {
                            return Err(JobError::new("Failed to create pipe between stages"));
                        };
                        carry = Carry::Pipe(stdout);
                        intermediates.push(child);
                    }
                }
            }
        }

        // Capture readers drain the last stage's pipes while we wait.
        let mut stdout_reader: Option<JoinHandle<Vec<u8>>> = None;
        let mut stderr_reader: Option<JoinHandle<Vec<u8>>> = None;
        if capture {
            if let Some(child) = last_child.as_mut() {
                if let Some(stdout) = child.stdout.take() {
                    stdout_reader = Some(spawn_reader(stdout));
                }
                if let Some(stderr) = child.stderr.take() {
                    stderr_reader = Some(spawn_reader(stderr));
                }
            }
        }

        let timed_out = wait_for_children(
            intermediates.iter_mut().chain(last_child.iter_mut()),
            deadline,
        );

        for child in &mut intermediates {
            let _ = child.wait();
        }
        let exit_code = match last_child.as_mut() {
            Some(child) => child
                .wait()
                .map_err(|error| JobError::new(format!("Failed to wait on child: {error}")))
                .map(|status| exit_code_of(&status))?,
            None => builtin_exit,
        };

        for writer in writer_threads {
            let _ = writer.join();
        }
        let stdout = match stdout_reader {
            Some(reader) => String::from_utf8_lossy(&reader.join().unwrap_or_default()).into_owned(),
            None => builtin_output.filter(|_| capture).unwrap_or_default(),
        };
        let stderr = match stderr_reader {
            Some(reader) => String::from_utf8_lossy(&reader.join().unwrap_or_default()).into_owned(),
            None => String::new(),
        };

        if timed_out {
            return Err(JobError::timeout());
        }
        Ok(JobInfo {
            stdout,
            stderr,
            exit_code,
        })
    }

    /// Detach a background job. On POSIX this is the classic double fork so
    /// that the job is reparented to init and never becomes a zombie.
    #[cfg(unix)]
    fn run_background(&self, process: &Process) -> Result<(), JobError> {
        unsafe {
            let pid = libc::fork();
            if pid < 0 {
                return Err(JobError::new("Failed to fork for background job"));
            }
            if pid == 0 {
                libc::setsid();
                let grandchild = libc::fork();
                if grandchild == 0 {
                    let mut detached = process.clone();
                    detached.background = false;
                    detached.capture = false;
                    let _ = self.run_pipeline(&detached, None);
                    libc::_exit(0);
                }
                libc::_exit(0);
            }
            let mut status = 0;
            libc::waitpid(pid, &mut status, 0);
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn run_background(&self, process: &Process) -> Result<(), JobError> {
        let mut command = Command::new(&process.name);
        command.args(&process.args[1..]);
        command
            .spawn()
            .map_err(|error| JobError::new(format!("Failed to spawn '{}': {error}", process.name)))?;
        Ok(())
    }
}

fn drain_carry(carry: Carry) -> Result<Option<String>, JobError> {
    match carry {
        Carry::Inherit => Ok(None),
        Carry::Buffer(text) => Ok(Some(text)),
        Carry::Pipe(mut previous) => {
            let mut text = String::new();
            previous
                .read_to_string(&mut text)
                .map_err(|error| JobError::new(format!("Failed to read pipe: {error}")))?;
            Ok(Some(text))
        }
    }
}

fn spawn_reader(mut source: impl Read + Send + 'static) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::with_capacity(2048);
        let _ = source.read_to_end(&mut buffer);
        buffer
    })
}

/// Wait for every child, honoring the deadline. Returns true if the deadline
/// fired and the children were killed.
fn wait_for_children<'a>(
    children: impl Iterator<Item = &'a mut Child>,
    deadline: Option<Instant>,
) -> bool {
    let mut children: Vec<&mut Child> = children.collect();
    let Some(deadline) = deadline else {
        return false;
    };
    loop {
        let all_done = children
            .iter_mut()
            .all(|child| matches!(child.try_wait(), Ok(Some(_))));
        if all_done {
            return false;
        }
        if Instant::now() >= deadline {
            terminate_children(&mut children);
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
}

#[cfg(unix)]
fn terminate_children(children: &mut [&mut Child]) {
    for child in children.iter() {
        kill_group(child.id(), libc::SIGTERM);
    }
    thread::sleep(Duration::from_millis(100));
    for child in children.iter() {
        kill_group(child.id(), libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn terminate_children(children: &mut [&mut Child]) {
    for child in children.iter_mut() {
        let _ = child.kill();
    }
}

#[cfg(unix)]
fn kill_group(pid: u32, signal: i32) {
    unsafe {
        libc::kill(-(pid as i32), signal);
    }
}

#[cfg(unix)]
fn exit_code_of(status: &std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}

#[cfg(not(unix))]
fn exit_code_of(status: &std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn external(args: &[&str]) -> Process {
        Process::new(
            args.iter().map(|arg| arg.to_string()).collect(),
            ProcessKind::External,
        )
    }

    #[test]
    fn test_capture_single_command() {
        let mut process = external(&["echo", "hello"]);
        process.capture = true;
        let info = JobRunner::new().exec(&process).unwrap();
        assert_eq!(info.stdout, "hello\n");
        assert_eq!(info.exit_code, 0);
    }

    #[test]
    fn test_exit_code_reported() {
        let mut process = external(&["sh", "-c", "exit 3"]);
        process.capture = true;
        let info = JobRunner::new().exec(&process).unwrap();
        assert_eq!(info.exit_code, 3);
    }

    #[test]
    fn test_pipeline_capture() {
        let mut pipeline = Process::pipeline(vec![
            external(&["printf", "b\\na\\n"]),
            external(&["sort"]),
        ])
        .unwrap();
        pipeline.capture = true;
        let info = JobRunner::new().exec(&pipeline).unwrap();
        assert_eq!(info.stdout, "a\nb\n");
    }

    #[test]
    fn test_three_stage_pipeline() {
        let mut pipeline = Process::pipeline(vec![
            external(&["printf", "one\\ntwo\\nthree\\n"]),
            external(&["grep", "t"]),
            external(&["wc", "-l"]),
        ])
        .unwrap();
        pipeline.capture = true;
        let info = JobRunner::new().exec(&pipeline).unwrap();
        assert_eq!(info.stdout.trim(), "2");
    }

    #[test]
    fn test_builtin_scan_in_pipeline() {
        let mut pipeline = Process::pipeline(vec![
            external(&["printf", "first\\nsecond\\n"]),
            Process::new(vec!["scan".to_string()], ProcessKind::Builtin),
        ])
        .unwrap();
        pipeline.capture = true;
        let info = JobRunner::new().exec(&pipeline).unwrap();
        assert_eq!(info.stdout, "first\n");
    }

    #[test]
    fn test_spawn_failure() {
        let process = external(&["definitely-not-a-real-command-xyz"]);
        assert!(JobRunner::new().exec(&process).is_err());
    }

    #[test]
    fn test_deadline_kills_long_command() {
        let mut process = external(&["sleep", "5"]);
        process.capture = true;
        let started = Instant::now();
        let result = JobRunner::new()
            .exec_with_deadline(&process, Some(Instant::now() + Duration::from_millis(100)));
        assert!(result.is_err());
        assert!(result.unwrap_err().timed_out);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_background_returns_immediately() {
        let mut process = external(&["sleep", "2"]);
        process.background = true;
        let started = Instant::now();
        let info = JobRunner::new().exec(&process).unwrap();
        assert_eq!(info.exit_code, 0);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
