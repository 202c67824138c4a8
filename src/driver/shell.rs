use super::{CommandDriver, DriverError, Invocation, isolate, kill_tree, wait_with_timeout};
use crate::model::CommandSpec;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::debug;

/// Feeds each command as one line to the interactive shell transport.
///
/// The shell tokenizes its input, so every argument is quoted here.
#[derive(Debug, Clone)]
pub struct ShellDriver {
    shell: PathBuf,
    workdir: PathBuf,
    timeout: Duration,
}

impl ShellDriver {
    #[must_use]
    pub fn new(shell: impl Into<PathBuf>, workdir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            shell: shell.into(),
            workdir: workdir.into(),
            timeout,
        }
    }

    /// The input line sent for `spec`, newline terminated.
    #[must_use]
    pub fn line_for(spec: &CommandSpec) -> String {
        let mut words = Vec::with_capacity(1 + spec.positional_args.len() + spec.flags.len());
        words.push(spec.name.as_str().to_string());
        words.extend(spec.argv());
        let mut line = shell_words::join(&words);
        line.push('\n');
        line
    }
}

impl CommandDriver for ShellDriver {
    fn invoke(&mut self, spec: &CommandSpec) -> Result<Invocation, DriverError> {
        let shown = spec.to_string();
        debug!(command = %shown, shell = %self.shell.display(), "running remote command through shell");
        let mut command = Command::new(&self.shell);
        let mut child = isolate(&mut command)
            .current_dir(&self.workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| DriverError::Spawn {
                program: self.shell.display().to_string(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let written = stdin
                .write_all(Self::line_for(spec).as_bytes())
                .and_then(|()| stdin.flush());
            if let Err(source) = written {
                kill_tree(&mut child);
                return Err(DriverError::Io {
                    command: shown,
                    source,
                });
            }
        }

        wait_with_timeout(child, &shown, self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CommandName;

    #[test]
    fn test_line_quotes_whitespace() {
        let spec = CommandSpec::new(CommandName::Rm).flag("r").flag("f").arg("ls 01");
        assert_eq!(ShellDriver::line_for(&spec), "rm -f -r 'ls 01'\n");
    }

    #[test]
    fn test_line_keeps_patterns_literal() {
        let spec = CommandSpec::new(CommandName::Rm).flag("r").flag("f").arg("/*");
        assert_eq!(ShellDriver::line_for(&spec), "rm -f -r '/*'\n");
    }

    #[test]
    fn test_line_survives_quotes_and_backslashes() {
        let awkward = ["it's here", r"back\slash dir", "plain"];
        let spec = CommandSpec::new(CommandName::Rm).flag("r").args(awkward);
        let line = ShellDriver::line_for(&spec);

        assert_eq!(line.matches('\n').count(), 1);
        let words = shell_words::split(&line).unwrap();
        assert_eq!(words, vec!["rm", "-r", "it's here", r"back\slash dir", "plain"]);
    }
}
