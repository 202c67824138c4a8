use super::{CommandDriver, DriverError, Invocation, isolate, wait_with_timeout};
use crate::model::CommandSpec;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::debug;

/// Runs each command as its own executable, `<prefix><name>`.
///
/// Arguments are passed as an argument vector, so no quoting is involved
/// and whitespace inside a path reaches the tool untouched.
#[derive(Debug, Clone)]
pub struct ProcessDriver {
    prefix: String,
    workdir: PathBuf,
    timeout: Duration,
}

impl ProcessDriver {
    #[must_use]
    pub fn new(prefix: impl Into<String>, workdir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            prefix: prefix.into(),
            workdir: workdir.into(),
            timeout,
        }
    }

    #[must_use]
    pub fn program_for(&self, spec: &CommandSpec) -> String {
        format!("{}{}", self.prefix, spec.name.as_str())
    }

    /// The process that would run `spec`.
    #[must_use]
    pub fn command(&self, spec: &CommandSpec) -> Command {
        let mut command = Command::new(self.program_for(spec));
        isolate(&mut command)
            .args(spec.argv())
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

impl CommandDriver for ProcessDriver {
    fn invoke(&mut self, spec: &CommandSpec) -> Result<Invocation, DriverError> {
        let shown = spec.to_string();
        debug!(command = %shown, "running remote command");
        let child = self
            .command(spec)
            .spawn()
            .map_err(|source| DriverError::Spawn {
                program: self.program_for(spec),
                source,
            })?;
        wait_with_timeout(child, &shown, self.timeout)
    }
}
