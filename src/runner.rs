//! Child-process execution with captured output and an optional
//! wall-clock deadline.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// Captured outcome of one child-process invocation.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit status code; signal death maps to 128+N on Unix.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Both streams in real-time interleaving order.
    pub combined: String,
}

impl CommandResult {
    /// Exit status zero is the sole success criterion.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Ways an invocation can fail before producing an exit status.
///
/// A non-zero exit status is not an error here; it is data in
/// [`CommandResult::exit_code`], left to the caller to interpret.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("working directory does not exist: {0}")]
    MissingWorkDir(PathBuf),
    #[error("command not found on PATH: {0}")]
    NotFound(String),
    #[error("permission denied running {0}")]
    PermissionDenied(String),
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("i/o error running {program}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Which stream a line came from.
enum Source {
    Stdout,
    Stderr,
}

/// Extract an exit code from a process status, mapping signals to 128+N on Unix.
fn exit_code_from_status(status: std::process::ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status
            .code()
            .unwrap_or_else(|| status.signal().map_or(1, |s| 128 + s))
    }
    #[cfg(not(unix))]
    {
        status.code().unwrap_or(1)
    }
}

fn io_error(program: &str, source: std::io::Error) -> RunError {
    RunError::Io {
        program: program.to_string(),
        source,
    }
}

/// Poll the child until it exits or the deadline passes. On expiry the
/// child is killed and reaped; captured output is discarded.
fn wait_with_deadline(
    child: &mut Child,
    program: &str,
    timeout: Option<Duration>,
) -> Result<std::process::ExitStatus, RunError> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if let Some(limit) = timeout
                    && start.elapsed() >= limit
                {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(RunError::Timeout(limit));
                }
                thread::sleep(Duration::from_millis(10));
            }
            Err(e) => return Err(io_error(program, e)),
        }
    }
}

/// Run `program` with `args` in `cwd`, blocking until it exits or the
/// timeout elapses.
///
/// Stdout and stderr are read concurrently so `combined` preserves the
/// real-time interleaving order.
///
/// # Errors
///
/// Returns [`RunError::MissingWorkDir`] when `cwd` is not a directory,
/// [`RunError::NotFound`] / [`RunError::PermissionDenied`] when the
/// program cannot be resolved or started, [`RunError::Timeout`] when the
/// deadline passes before the child exits, and [`RunError::Io`] for any
/// other failure around the invocation.
pub fn execute(
    program: &str,
    args: &[&str],
    cwd: &Path,
    timeout: Option<Duration>,
) -> Result<CommandResult, RunError> {
    if !cwd.is_dir() {
        return Err(RunError::MissingWorkDir(cwd.to_path_buf()));
    }
    let resolved =
        which::which(program).map_err(|_| RunError::NotFound(program.to_string()))?;

    let mut child = Command::new(resolved)
        .args(args)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RunError::NotFound(program.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                RunError::PermissionDenied(program.to_string())
            }
            _ => io_error(program, e),
        })?;

    let stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| io_error(program, std::io::Error::other("stdout not captured")))?;
    let stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| io_error(program, std::io::Error::other("stderr not captured")))?;

    let (tx, rx) = mpsc::channel();
    let tx2 = tx.clone();

    let stdout_thread = thread::spawn(move || {
        let reader = BufReader::new(stdout_pipe);
        for line in reader.lines().map_while(Result::ok) {
            let _ = tx.send((Source::Stdout, line));
        }
    });

    let stderr_thread = thread::spawn(move || {
        let reader = BufReader::new(stderr_pipe);
        for line in reader.lines().map_while(Result::ok) {
            let _ = tx2.send((Source::Stderr, line));
        }
    });

    // On timeout the readers are abandoned; they unblock once the pipes
    // close and their sends fail against the dropped receiver.
    let status = wait_with_deadline(&mut child, program, timeout)?;

    if stdout_thread.join().is_err() || stderr_thread.join().is_err() {
        return Err(io_error(
            program,
            std::io::Error::other("output reader thread panicked"),
        ));
    }

    // All senders dropped → rx iteration will terminate
    let mut stdout_lines = Vec::new();
    let mut stderr_lines = Vec::new();
    let mut combined_lines = Vec::new();

    for (source, line) in rx {
        combined_lines.push(line.clone());
        match source {
            Source::Stdout => stdout_lines.push(line),
            Source::Stderr => stderr_lines.push(line),
        }
    }

    Ok(CommandResult {
        exit_code: exit_code_from_status(status),
        stdout: stdout_lines.join("\n"),
        stderr: stderr_lines.join("\n"),
        combined: combined_lines.join("\n"),
    })
}
