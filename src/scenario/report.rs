use super::ScenarioResult;
use crate::error::{Result, ResultExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Results of one scenario family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    pub suite: String,
    pub results: Vec<ScenarioResult>,
    /// The suite stopped early on a failure.
    pub halted: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SuiteReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        !self.halted && self.results.iter().all(|r| r.passed)
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }
}

/// Everything one `run` produced, serializable for `--report`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub tool_version: String,
    /// SHA-256 over the canonical fixture snapshot.
    pub fixture_fingerprint: String,
    pub suites: Vec<SuiteReport>,
    pub passed: bool,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    #[must_use]
    pub fn new(fixture_fingerprint: impl Into<String>) -> Self {
        Self {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            fixture_fingerprint: fixture_fingerprint.into(),
            suites: Vec::new(),
            passed: true,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn push(&mut self, suite: SuiteReport) {
        self.passed &= suite.passed();
        self.suites.push(suite);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    #[must_use]
    pub fn scenario_count(&self) -> usize {
        self.suites.iter().map(|s| s.results.len()).sum()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.suites.iter().map(SuiteReport::failed_count).sum()
    }

    /// # Errors
    ///
    /// Returns a serialization or I/O error.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let payload = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(path, payload).with_context(|| format!("writing report {}", path.display()))
    }
}

/// Human-readable outcome of one scenario.
///
/// A failure always carries the phase, the offending command and its
/// captured output, the difference and both canonical snapshots. `verbose`
/// adds the snapshots to passing scenarios too.
#[must_use]
pub fn render_result(result: &ScenarioResult, verbose: bool) -> String {
    let mut out = String::new();
    let outcome = if result.passed { "passed" } else { "FAILED" };
    let _ = write!(out, "scenario {} {outcome}: {}", result.scenario_id, result.description);
    if result.expect_failure {
        out.push_str(" (expected failure)");
    }
    out.push('\n');

    if let Some(diagnostic) = &result.diagnostic {
        let _ = writeln!(out, "  phase: {}", diagnostic.phase);
        let _ = writeln!(out, "  error: {} ({})", diagnostic.message, diagnostic.code.as_str());
        if let Some(command) = &diagnostic.command {
            let _ = writeln!(out, "  command: {command}");
        }
        if let Some(output) = diagnostic.output.as_ref().filter(|o| !o.is_empty()) {
            write_block(&mut out, "stdout", &output.stdout);
            write_block(&mut out, "stderr", &output.stderr);
        }
        if let Some(diff) = &diagnostic.diff {
            write_block(&mut out, "difference (remote vs expected)", &diff.render());
        }
    }

    if !result.passed || verbose {
        if let Some(remote) = &result.remote_snapshot {
            write_block(&mut out, "remote snapshot", &remote.render());
        }
        if let Some(local) = &result.local_snapshot {
            write_block(&mut out, "reference snapshot", &local.render());
        }
    }
    out
}

fn write_block(out: &mut String, title: &str, body: &str) {
    if body.trim().is_empty() {
        return;
    }
    let _ = writeln!(out, "  {title}:");
    for line in body.lines() {
        let _ = writeln!(out, "    {line}");
    }
}
