//! Scenario model and execution.
//!
//! A [`Scenario`] is a sequence of steps: remote operations (issued against
//! the remote tool and mirrored locally) and staging actions (local scratch
//! preparation that neither namespace sees). The [`ScenarioRunner`] drives
//! each scenario through its phases and collects [`ScenarioResult`]s.

mod report;
mod runner;
mod staging;

pub use report::{RunReport, SuiteReport, render_result};
pub use runner::ScenarioRunner;
pub use staging::{STAGING_DIR, Staging, StagingAction};

use crate::driver::{CapturedOutput, DriverError};
use crate::error::{ErrorCode, ParityError, StructuredError};
use crate::model::{Operation, SnapshotDiff, TreeSnapshot};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One unit of a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Remote(Operation),
    Stage(StagingAction),
}

/// A command-plus-verification unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub description: String,
    pub steps: Vec<Step>,
    /// The last remote step must fail; no comparison is made.
    pub expect_failure: bool,
}

impl Scenario {
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            steps: Vec::new(),
            expect_failure: false,
        }
    }

    #[must_use]
    pub fn remote(mut self, op: Operation) -> Self {
        self.steps.push(Step::Remote(op));
        self
    }

    #[must_use]
    pub fn stage(mut self, action: StagingAction) -> Self {
        self.steps.push(Step::Stage(action));
        self
    }

    #[must_use]
    pub const fn expecting_failure(mut self) -> Self {
        self.expect_failure = true;
        self
    }

    /// The last remote step and its index.
    #[must_use]
    pub fn last_remote(&self) -> Option<(usize, &Operation)> {
        self.steps.iter().enumerate().rev().find_map(|(idx, step)| match step {
            Step::Remote(op) => Some((idx, op)),
            Step::Stage(_) => None,
        })
    }
}

/// A scenario family sharing one baseline.
#[derive(Debug, Clone)]
pub struct Suite {
    pub name: String,
    /// Applied to both sides after every reset, before each scenario.
    pub baseline: Vec<Operation>,
    pub scenarios: Vec<Scenario>,
}

/// Run-wide state passed to the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    /// 1-based id of the next scenario.
    pub next_scenario_id: u32,
    /// Halt on the first failure instead of resetting and continuing.
    pub fail_fast: bool,
}

impl RunContext {
    #[must_use]
    pub const fn new(fail_fast: bool) -> Self {
        Self {
            next_scenario_id: 1,
            fail_fast,
        }
    }

    pub const fn advance(&mut self) {
        self.next_scenario_id += 1;
    }

    pub const fn reset_counter(&mut self) {
        self.next_scenario_id = 1;
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Scenario state machine phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Prepare,
    InvokeRemote,
    MirrorLocal,
    SnapshotBoth,
    Compare,
    Report,
    Reset,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Prepare => "prepare",
            Self::InvokeRemote => "invoke_remote",
            Self::MirrorLocal => "mirror_local",
            Self::SnapshotBoth => "snapshot_both",
            Self::Compare => "compare",
            Self::Report => "report",
            Self::Reset => "reset",
        };
        f.write_str(name)
    }
}

/// Why a scenario failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub phase: Phase,
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<CapturedOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<SnapshotDiff>,
}

impl Diagnostic {
    #[must_use]
    pub fn from_error(phase: Phase, err: &ParityError) -> Self {
        let structured = StructuredError::from_error(err);
        let (command, output) = match err {
            ParityError::Driver(inner) => driver_details(inner),
            _ => (None, None),
        };
        Self {
            phase,
            code: structured.code,
            message: structured.message,
            command,
            output,
            diff: None,
        }
    }

    #[must_use]
    pub fn mismatch(scenario_id: u32, diff: SnapshotDiff) -> Self {
        let err = ParityError::EquivalenceMismatch {
            scenario_id,
            unexpected: diff.unexpected.len(),
            missing: diff.missing.len(),
            kind_mismatches: diff.kind_mismatches.len(),
        };
        Self {
            diff: Some(diff),
            ..Self::from_error(Phase::Compare, &err)
        }
    }

    /// Attach `command` unless the failure already names its own.
    #[must_use]
    pub fn or_command(mut self, command: Option<&str>) -> Self {
        if self.command.is_none() {
            self.command = command.map(str::to_string);
        }
        self
    }
}

fn driver_details(err: &DriverError) -> (Option<String>, Option<CapturedOutput>) {
    (Some(err.command().to_string()), err.captured().cloned())
}

/// Outcome of one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_id: u32,
    pub description: String,
    pub passed: bool,
    pub expect_failure: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_snapshot: Option<TreeSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_snapshot: Option<TreeSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<Diagnostic>,
    pub duration_ms: u64,
}
