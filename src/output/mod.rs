//! Output routing for command results: plain text, JSON or nothing.
//!
//! Diagnostics go through `tracing` to stderr; this layer only handles
//! what a command prints as its result on stdout.

use crate::error::Result;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Plain text
    Plain,
    /// JSON output only
    Json,
    /// Minimal output (quiet mode)
    Quiet,
}

/// Central output coordinator that respects json/quiet modes.
#[derive(Debug, Clone, Copy)]
pub struct OutputContext {
    mode: OutputMode,
    verbose: bool,
}

impl OutputContext {
    /// Create from CLI-style flags. JSON wins over quiet.
    #[must_use]
    pub const fn from_flags(json: bool, quiet: bool, verbose: bool) -> Self {
        let mode = if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Plain
        };
        Self { mode, verbose }
    }

    #[must_use]
    pub const fn mode(&self) -> OutputMode {
        self.mode
    }

    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.mode == OutputMode::Quiet
    }

    /// Show snapshots for passing scenarios too.
    #[must_use]
    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    /// Print text in plain mode. A trailing newline in `content` is not
    /// doubled.
    pub fn print(&self, content: &str) {
        if self.mode == OutputMode::Plain {
            println!("{}", content.strip_suffix('\n').unwrap_or(content));
        }
    }

    /// Print text unless JSON output was requested; quiet mode included.
    /// Used for failure details, which are never suppressed.
    pub fn print_always(&self, content: &str) {
        if self.mode != OutputMode::Json {
            println!("{}", content.strip_suffix('\n').unwrap_or(content));
        }
    }

    /// Print `value` as one JSON document in JSON mode.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn json<T: Serialize>(&self, value: &T) -> Result<()> {
        if self.is_json() {
            let payload = serde_json::to_string(value)?;
            println!("{payload}");
        }
        Ok(())
    }

    /// Pretty JSON variant of [`Self::json`].
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn json_pretty<T: Serialize>(&self, value: &T) -> Result<()> {
        if self.is_json() {
            let payload = serde_json::to_string_pretty(value)?;
            println!("{payload}");
        }
        Ok(())
    }
}
