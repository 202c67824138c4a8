use super::{Diagnostic, Phase, RunContext, Scenario, ScenarioResult, Staging, Step, Suite, SuiteReport};
use crate::driver::{CommandDriver, expect_failure};
use crate::error::{ParityError, Result};
use crate::mirror::MirrorEngine;
use crate::model::{Operation, TreeSnapshot};
use crate::pattern::expand_local_glob;
use crate::reset;
use crate::snapshot::snapshot_remote;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Sequences scenarios through
/// PREPARE → INVOKE_REMOTE → MIRROR_LOCAL → SNAPSHOT_BOTH → COMPARE → REPORT → RESET.
///
/// Scenarios run strictly one after another against one remote namespace
/// and one reference tree.
pub struct ScenarioRunner<'a> {
    driver: &'a mut dyn CommandDriver,
    mirror: &'a mut MirrorEngine,
    staging: &'a Staging,
    workdir: PathBuf,
    /// Redacted rendering of the last remote command of the current scenario.
    last_command: Option<String>,
}

/// State carried between the phases of one scenario.
struct Attempt {
    result: ScenarioResult,
    started: Instant,
}

impl Attempt {
    fn new(id: u32, scenario: &Scenario) -> Self {
        Self {
            result: ScenarioResult {
                scenario_id: id,
                description: scenario.description.clone(),
                passed: false,
                expect_failure: scenario.expect_failure,
                remote_snapshot: None,
                local_snapshot: None,
                diagnostic: None,
                duration_ms: 0,
            },
            started: Instant::now(),
        }
    }

    fn fail(mut self, diagnostic: Diagnostic) -> ScenarioResult {
        self.result.diagnostic = Some(diagnostic);
        self.finish(false)
    }

    fn finish(mut self, passed: bool) -> ScenarioResult {
        self.result.passed = passed;
        self.result.duration_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.result
    }
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(
        driver: &'a mut dyn CommandDriver,
        mirror: &'a mut MirrorEngine,
        staging: &'a Staging,
        workdir: &Path,
    ) -> Self {
        Self {
            driver,
            mirror,
            staging,
            workdir: workdir.to_path_buf(),
            last_command: None,
        }
    }

    /// Run every scenario of `suite`, numbering them from 1.
    ///
    /// `on_result` sees each result as soon as it is decided. With
    /// `ctx.fail_fast`, the first failure halts the suite without a reset so
    /// the namespaces can be inspected; otherwise both sides are reset and
    /// the next scenario runs.
    ///
    /// # Errors
    ///
    /// Returns an error when a reset fails; results gathered so far are lost
    /// to the caller except through `on_result`.
    pub fn run_suite(
        &mut self,
        suite: &Suite,
        ctx: &mut RunContext,
        on_result: &mut dyn FnMut(&ScenarioResult),
    ) -> Result<SuiteReport> {
        ctx.reset_counter();
        let started_at = Utc::now();
        info!(suite = %suite.name, scenarios = suite.scenarios.len(), "starting suite");
        self.reset()?;

        let mut results = Vec::with_capacity(suite.scenarios.len());
        let mut halted = false;
        for scenario in &suite.scenarios {
            let result = self.run_scenario(suite, scenario, ctx.next_scenario_id);
            info!(
                suite = %suite.name,
                id = result.scenario_id,
                passed = result.passed,
                "REPORT"
            );
            on_result(&result);
            let passed = result.passed;
            results.push(result);

            if !passed && ctx.fail_fast {
                warn!(suite = %suite.name, id = ctx.next_scenario_id, "halting after failure");
                halted = true;
                break;
            }
            info!(id = ctx.next_scenario_id, "RESET");
            self.reset()?;
            ctx.advance();
        }

        Ok(SuiteReport {
            suite: suite.name.clone(),
            results,
            halted,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Run one scenario from PREPARE through COMPARE. Never resets.
    ///
    /// A failed result names the last remote command issued, whichever
    /// phase the failure was detected in.
    pub fn run_scenario(&mut self, suite: &Suite, scenario: &Scenario, id: u32) -> ScenarioResult {
        self.last_command = None;
        let attempt = Attempt::new(id, scenario);
        info!(suite = %suite.name, id, description = %scenario.description, "PREPARE");
        if let Err(err) = self.prepare(&suite.baseline) {
            return self.fail(attempt, Diagnostic::from_error(Phase::Prepare, &err));
        }

        if scenario.expect_failure {
            return self.run_expecting_failure(scenario, attempt);
        }

        let mut pending = None;
        for step in &scenario.steps {
            if let Err((phase, err)) = self.run_step(step) {
                pending = Some(Diagnostic::from_error(phase, &err));
                break;
            }
        }

        info!(id, "SNAPSHOT_BOTH");
        self.compare(attempt, pending)
    }

    fn run_expecting_failure(&mut self, scenario: &Scenario, attempt: Attempt) -> ScenarioResult {
        let Some((last, op)) = scenario.last_remote() else {
            let err = ParityError::invalid_operation("an expected-failure scenario needs a remote step");
            return self.fail(attempt, Diagnostic::from_error(Phase::Prepare, &err));
        };

        for step in &scenario.steps[..last] {
            if let Err((phase, err)) = self.run_step(step) {
                return self.fail(attempt, Diagnostic::from_error(phase, &err));
            }
        }

        let op = match self.expand_sources(op) {
            Ok(op) => op,
            Err(err) => return self.fail(attempt, Diagnostic::from_error(Phase::InvokeRemote, &err)),
        };
        info!(command = %op, "INVOKE_REMOTE (expecting failure)");
        let spec = op.command_spec();
        self.last_command = Some(spec.to_string());
        match expect_failure(self.driver, &spec) {
            Ok(output) => {
                info!(stderr = %output.stderr.trim(), "remote command failed as required");
                attempt.finish(true)
            }
            Err(err) => self.fail(
                attempt,
                Diagnostic::from_error(Phase::InvokeRemote, &ParityError::from(err)),
            ),
        }
    }

    /// One step. A remote operation is mirrored even when the remote side
    /// failed, so both snapshots stay meaningful for diagnosis.
    fn run_step(&mut self, step: &Step) -> std::result::Result<(), (Phase, ParityError)> {
        match step {
            Step::Stage(action) => self
                .staging
                .apply(action, self.mirror.root())
                .map_err(|err| (Phase::Prepare, err)),
            Step::Remote(op) => {
                let op = self.expand_sources(op).map_err(|err| (Phase::InvokeRemote, err))?;
                op.validate().map_err(|err| (Phase::InvokeRemote, err))?;
                info!(command = %op, "INVOKE_REMOTE");
                let spec = op.command_spec();
                self.last_command = Some(spec.to_string());
                let remote = self.driver.invoke(&spec);
                info!(op = op.label(), "MIRROR_LOCAL");
                let mirrored = self.mirror.apply(&op);
                remote.map_err(|err| (Phase::InvokeRemote, ParityError::from(err)))?;
                mirrored.map_err(|err| (Phase::MirrorLocal, err))
            }
        }
    }

    fn compare(&mut self, mut attempt: Attempt, pending: Option<Diagnostic>) -> ScenarioResult {
        let local = self.mirror.snapshot();
        let remote = snapshot_remote(self.driver);
        attempt.result.local_snapshot = local.as_ref().ok().cloned();
        attempt.result.remote_snapshot = remote.as_ref().ok().cloned();

        if let Some(diagnostic) = pending {
            return self.fail(attempt, diagnostic);
        }
        let (remote, local): (TreeSnapshot, TreeSnapshot) = match (remote, local) {
            (Ok(remote), Ok(local)) => (remote, local),
            (Err(err), _) => {
                let diagnostic = Diagnostic::from_error(Phase::SnapshotBoth, &ParityError::from(err));
                return self.fail(attempt, diagnostic);
            }
            (_, Err(err)) => return self.fail(attempt, Diagnostic::from_error(Phase::SnapshotBoth, &err)),
        };

        info!(id = attempt.result.scenario_id, entries = remote.len(), "COMPARE");
        let diff = remote.diff(&local);
        if diff.is_empty() {
            attempt.finish(true)
        } else {
            let id = attempt.result.scenario_id;
            self.fail(attempt, Diagnostic::mismatch(id, diff))
        }
    }

    fn fail(&self, attempt: Attempt, diagnostic: Diagnostic) -> ScenarioResult {
        attempt.fail(diagnostic.or_command(self.last_command.as_deref()))
    }

    /// Apply the suite baseline to both sides.
    fn prepare(&mut self, baseline: &[Operation]) -> Result<()> {
        for op in baseline {
            let op = self.expand_sources(op)?;
            let spec = op.command_spec();
            self.last_command = Some(spec.to_string());
            self.driver.invoke(&spec)?;
            self.mirror.apply(&op)?;
        }
        Ok(())
    }

    /// Return both namespaces to the empty baseline.
    ///
    /// # Errors
    ///
    /// Returns the reset failure.
    pub fn reset(&mut self) -> Result<()> {
        reset::reset(self.driver, self.mirror, self.staging)
    }

    /// Expand local wildcards in upload sources so the remote tool and the
    /// mirror receive the same concrete list.
    fn expand_sources(&self, op: &Operation) -> Result<Operation> {
        let Operation::Upload {
            sources,
            destination,
            create,
        } = op
        else {
            return Ok(op.clone());
        };

        let mut expanded = Vec::with_capacity(sources.len());
        for source in sources {
            let matches = expand_local_glob(&self.workdir, source)?;
            if matches.is_empty() {
                return Err(ParityError::invalid_operation(format!(
                    "upload source '{source}' matched nothing"
                )));
            }
            expanded.extend(matches);
        }
        Ok(Operation::Upload {
            sources: expanded,
            destination: destination.clone(),
            create: *create,
        })
    }
}
