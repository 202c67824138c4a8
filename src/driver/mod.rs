//! Boundary adapter to the remote storage tool.
//!
//! A driver turns a [`CommandSpec`] into one blocking invocation and reports
//! either the captured output or a [`DriverError`]. Drivers hold no business
//! logic: no retries and no interpretation of output. Quoting is decided
//! here and nowhere else.

mod process;
mod shell;

pub use process::ProcessDriver;
pub use shell::ShellDriver;

use crate::config::HarnessConfig;
use crate::model::CommandSpec;
use serde::{Deserialize, Serialize};
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

const FAILURE_OUTPUT_MAX_CHARS: usize = 16 * 1024;
const LOG_PREVIEW_MAX_CHARS: usize = 320;
/// How long output is still collected once the command itself is gone.
const PIPE_GRACE: Duration = Duration::from_secs(2);

/// Output of a successful invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub duration: Duration,
}

impl Invocation {
    #[must_use]
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Output kept for diagnostics, lossily decoded and bounded in size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    #[must_use]
    pub fn from_bytes(stdout: &[u8], stderr: &[u8]) -> Self {
        Self {
            stdout: truncate_failure_output(String::from_utf8_lossy(stdout).into_owned()),
            stderr: truncate_failure_output(String::from_utf8_lossy(stderr).into_owned()),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stdout.trim().is_empty() && self.stderr.trim().is_empty()
    }
}

/// Remote invocation did not behave as required.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{command}' timed out after {}s", timeout.as_secs())]
    Timeout {
        command: String,
        timeout: Duration,
        output: CapturedOutput,
    },

    #[error("'{command}' failed with {status}")]
    NonZero {
        command: String,
        status: String,
        output: CapturedOutput,
    },

    #[error("I/O error while running '{command}': {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("'{command}' succeeded but was expected to fail")]
    UnexpectedSuccess {
        command: String,
        output: CapturedOutput,
    },

    #[error("Malformed listing from '{command}': {reason}")]
    MalformedListing { command: String, reason: String },
}

impl DriverError {
    /// Output captured before the failure, when there was any.
    #[must_use]
    pub const fn captured(&self) -> Option<&CapturedOutput> {
        match self {
            Self::Timeout { output, .. }
            | Self::NonZero { output, .. }
            | Self::UnexpectedSuccess { output, .. } => Some(output),
            Self::Spawn { .. } | Self::Io { .. } | Self::MalformedListing { .. } => None,
        }
    }

    /// Redacted rendering of the offending command.
    #[must_use]
    pub fn command(&self) -> &str {
        match self {
            Self::Spawn { program, .. } => program,
            Self::Timeout { command, .. }
            | Self::NonZero { command, .. }
            | Self::Io { command, .. }
            | Self::UnexpectedSuccess { command, .. }
            | Self::MalformedListing { command, .. } => command,
        }
    }
}

/// Issues commands against the remote tool.
pub trait CommandDriver {
    /// Run `spec` to completion.
    ///
    /// # Errors
    ///
    /// Returns a [`DriverError`] on launch failure, timeout, I/O failure or a
    /// non-zero completion status.
    fn invoke(&mut self, spec: &CommandSpec) -> Result<Invocation, DriverError>;
}

impl<D: CommandDriver + ?Sized> CommandDriver for Box<D> {
    fn invoke(&mut self, spec: &CommandSpec) -> Result<Invocation, DriverError> {
        (**self).invoke(spec)
    }
}

/// Build the driver selected by the configuration.
#[must_use]
pub fn build_driver(config: &HarnessConfig) -> Box<dyn CommandDriver> {
    let timeout = Duration::from_secs(config.timeout_secs);
    match &config.shell {
        Some(shell) => Box::new(ShellDriver::new(shell.clone(), config.workdir.clone(), timeout)),
        None => Box::new(ProcessDriver::new(
            config.command_prefix.clone(),
            config.workdir.clone(),
            timeout,
        )),
    }
}

/// Run `spec`, requiring it to fail.
///
/// # Errors
///
/// Returns [`DriverError::UnexpectedSuccess`] when the command completes
/// successfully.
pub fn expect_failure(
    driver: &mut dyn CommandDriver,
    spec: &CommandSpec,
) -> Result<CapturedOutput, DriverError> {
    match driver.invoke(spec) {
        Ok(invocation) => Err(DriverError::UnexpectedSuccess {
            command: spec.to_string(),
            output: CapturedOutput::from_bytes(&invocation.stdout, &invocation.stderr),
        }),
        Err(err) => {
            debug!(command = %spec, error = %err, "command failed as expected");
            Ok(err.captured().cloned().unwrap_or_default())
        }
    }
}

/// Run `spec` and ignore its completion status.
pub fn invoke_ignoring_status(driver: &mut dyn CommandDriver, spec: &CommandSpec) -> Option<Invocation> {
    match driver.invoke(spec) {
        Ok(invocation) => Some(invocation),
        Err(err) => {
            warn!(command = %spec, error = %err, "ignoring failed command");
            None
        }
    }
}

/// Start `command` in a process group of its own, so a timeout can stop
/// the wrapper scripts the tool ships as well as whatever they spawned.
pub(crate) fn isolate(command: &mut Command) -> &mut Command {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command
}

/// Kill `child` together with its process group.
pub(crate) fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        let group = format!("-{}", child.id());
        let signalled = Command::new("kill")
            .args(["-KILL", "--", &group])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if !matches!(signalled, Ok(status) if status.success()) {
            debug!(pid = child.id(), "could not signal the process group");
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

/// Wait for `child` under `timeout` while draining both pipes.
///
/// Pipe collection is bounded too: a descendant that outlives the command
/// and keeps its output open cannot stall the caller.
pub(crate) fn wait_with_timeout(
    mut child: Child,
    command: &str,
    timeout: Duration,
) -> Result<Invocation, DriverError> {
    let started = Instant::now();
    let stdout_reader = child.stdout.take().map(spawn_reader);
    let stderr_reader = child.stderr.take().map(spawn_reader);

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            kill_tree(&mut child);
            let deadline = Instant::now() + PIPE_GRACE;
            let output = CapturedOutput::from_bytes(
                &drain_until(stdout_reader.as_ref(), deadline),
                &drain_until(stderr_reader.as_ref(), deadline),
            );
            warn!(command, timeout_secs = timeout.as_secs(), "remote command timed out");
            return Err(DriverError::Timeout {
                command: command.to_string(),
                timeout,
                output,
            });
        }
        Err(source) => {
            kill_tree(&mut child);
            return Err(DriverError::Io {
                command: command.to_string(),
                source,
            });
        }
    };

    let deadline = Instant::now() + PIPE_GRACE;
    let stdout = drain_until(stdout_reader.as_ref(), deadline);
    let stderr = drain_until(stderr_reader.as_ref(), deadline);
    finish(command, status, stdout, stderr, started.elapsed())
}

fn finish(
    command: &str,
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    duration: Duration,
) -> Result<Invocation, DriverError> {
    let elapsed_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    if status.success() {
        debug!(command, elapsed_ms, "remote command succeeded");
        return Ok(Invocation {
            stdout,
            stderr,
            duration,
        });
    }

    let output = CapturedOutput::from_bytes(&stdout, &stderr);
    warn!(
        command,
        elapsed_ms,
        status = %status,
        stderr = %scrub_log_text(&output.stderr),
        stdout = %scrub_log_text(&output.stdout),
        "remote command failed"
    );
    Err(DriverError::NonZero {
        command: command.to_string(),
        status: status.to_string(),
        output,
    })
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut chunk = [0_u8; 8192];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(chunk[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(_) => break,
            }
        }
    });
    rx
}

/// Everything `reader` produced until its pipe closed or `deadline` passed.
fn drain_until(reader: Option<&Receiver<Vec<u8>>>, deadline: Instant) -> Vec<u8> {
    let mut buf = Vec::new();
    let Some(reader) = reader else {
        return buf;
    };
    loop {
        match reader.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(chunk) => buf.extend_from_slice(&chunk),
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                debug!(collected = buf.len(), "output pipe still held open; keeping what arrived");
                break;
            }
        }
    }
    buf
}

/// One-line log preview with secrets blanked out.
pub(crate) fn scrub_log_text(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }
    let mut out = String::new();
    for (idx, line) in raw.lines().enumerate() {
        if idx > 0 {
            out.push_str(" | ");
        }
        let lower = line.to_ascii_lowercase();
        if lower.contains("password") || lower.contains("secret") || lower.contains("session") {
            out.push_str("[redacted]");
        } else {
            out.push_str(line.trim());
        }
        if out.chars().count() >= LOG_PREVIEW_MAX_CHARS {
            let mut truncated: String = out.chars().take(LOG_PREVIEW_MAX_CHARS).collect();
            truncated.push('…');
            return truncated;
        }
    }
    out
}

fn truncate_failure_output(raw: String) -> String {
    if raw.chars().count() <= FAILURE_OUTPUT_MAX_CHARS {
        return raw;
    }
    let mut truncated: String = raw.chars().take(FAILURE_OUTPUT_MAX_CHARS).collect();
    truncated.push_str("… [truncated]");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CommandName;

    struct Scripted {
        succeed: bool,
    }

    impl CommandDriver for Scripted {
        fn invoke(&mut self, spec: &CommandSpec) -> Result<Invocation, DriverError> {
            if self.succeed {
                Ok(Invocation {
                    stdout: b"ok".to_vec(),
                    stderr: Vec::new(),
                    duration: Duration::ZERO,
                })
            } else {
                Err(DriverError::NonZero {
                    command: spec.to_string(),
                    status: "exit status: 1".to_string(),
                    output: CapturedOutput {
                        stdout: String::new(),
                        stderr: "Destination is not valid".to_string(),
                    },
                })
            }
        }
    }

    #[test]
    fn test_expect_failure_accepts_failure() {
        let spec = CommandSpec::new(CommandName::Put).args(["a", "b", "target.txt"]);
        let output = expect_failure(&mut Scripted { succeed: false }, &spec).unwrap();
        assert!(output.stderr.contains("Destination is not valid"));
    }

    #[test]
    fn test_expect_failure_rejects_success() {
        let spec = CommandSpec::new(CommandName::Put).arg("a");
        let err = expect_failure(&mut Scripted { succeed: true }, &spec).unwrap_err();
        assert!(matches!(err, DriverError::UnexpectedSuccess { .. }));
        assert_eq!(err.command(), "put a");
        assert_eq!(err.captured().unwrap().stdout, "ok");
    }

    #[test]
    fn test_invoke_ignoring_status() {
        let spec = CommandSpec::new(CommandName::Rm).flag("r").flag("f").arg("/*");
        assert!(invoke_ignoring_status(&mut Scripted { succeed: false }, &spec).is_none());
        assert!(invoke_ignoring_status(&mut Scripted { succeed: true }, &spec).is_some());
    }

    #[test]
    fn test_scrub_log_text_redacts_and_truncates() {
        let scrubbed = scrub_log_text("password: hunter2\nnot found");
        assert!(scrubbed.contains("[redacted]"));
        assert!(scrubbed.contains("not found"));
        assert!(!scrubbed.contains("hunter2"));
        assert!(scrub_log_text(&"x".repeat(500)).ends_with('…'));
    }

    #[test]
    fn test_truncate_failure_output() {
        let truncated = truncate_failure_output("y".repeat(20_000));
        assert!(truncated.ends_with("… [truncated]"));
        assert_eq!(truncate_failure_output("short".to_string()), "short");
    }
}
