//! Run command implementation.
//!
//! Full run: clean both sides, check the startup invariants, build the
//! fixture, then run each selected family with its own scenario numbering.

use crate::cli::RunArgs;
use crate::config::HarnessConfig;
use crate::driver::{CommandDriver, build_driver};
use crate::error::{ParityError, Result};
use crate::fixture::{FIXTURE_DIR, build_fixture};
use crate::mirror::MirrorEngine;
use crate::output::OutputContext;
use crate::reset::{check_preconditions, clean_all};
use crate::scenario::{RunContext, RunReport, ScenarioResult, ScenarioRunner, Staging, render_result};
use crate::session::Credentials;
use crate::suites;
use tracing::{info, warn};

/// Execute the run command.
///
/// # Errors
///
/// Returns a precondition or configuration error before any scenario runs,
/// [`ParityError::ScenarioFailed`] for the first failing scenario, or the
/// error of a reset that could not complete.
pub fn execute(args: &RunArgs, config: &HarnessConfig, ctx: &OutputContext) -> Result<()> {
    let credentials = config.credentials()?;
    config.ensure_workdir()?;
    let mut driver = build_driver(config);
    let report = run_suites(driver.as_mut(), config, args, &credentials, ctx)?;

    if let Some(path) = &args.report {
        report.write_json(path)?;
        info!(path = %path.display(), "wrote run report");
    }
    ctx.json_pretty(&report)?;
    if !ctx.is_json() {
        ctx.print(&format!(
            "{} scenarios, {} failed",
            report.scenario_count(),
            report.failed_count()
        ));
    }

    first_failure(&report).map_or(Ok(()), Err)
}

/// Run the selected families through `driver` and collect the report.
///
/// A halted family stops the run and leaves both namespaces as they are.
/// Otherwise both sides are cleaned at the end unless `--keep` asked to
/// keep them. Verbosity only changes what is printed.
///
/// # Errors
///
/// Returns startup failures and reset failures; scenario failures are
/// recorded in the report instead.
pub fn run_suites(
    driver: &mut dyn CommandDriver,
    config: &HarnessConfig,
    args: &RunArgs,
    credentials: &Credentials,
    ctx: &OutputContext,
) -> Result<RunReport> {
    let workdir = config.workdir.as_path();
    clean_all(driver, workdir, credentials)?;
    check_preconditions(workdir, driver)?;

    let fixture = build_fixture(&workdir.join(FIXTURE_DIR))?;
    info!(fingerprint = %fixture.fingerprint(), "fixture ready");
    let mut mirror = MirrorEngine::open(workdir)?;
    let staging = Staging::open(workdir)?;

    let mut report = RunReport::new(fixture.fingerprint());
    let mut run_ctx = RunContext::new(!config.continue_on_failure);
    let mut halted = false;
    {
        let mut runner = ScenarioRunner::new(driver, &mut mirror, &staging, workdir);
        let mut on_result = |result: &ScenarioResult| {
            let text = render_result(result, ctx.verbose());
            if result.passed {
                ctx.print(&text);
            } else {
                ctx.print_always(&text);
            }
        };
        for suite in suites::build(args.suite, &fixture) {
            ctx.print(&format!("== {} ==", suite.name));
            let suite_report = runner.run_suite(&suite, &mut run_ctx, &mut on_result)?;
            halted = suite_report.halted;
            report.push(suite_report);
            if halted {
                break;
            }
        }
    }
    report.finish();

    if halted {
        warn!("run halted; namespaces left in place for inspection");
    } else if args.keep {
        info!("keeping namespaces as requested");
    } else {
        clean_all(driver, workdir, credentials)?;
    }
    Ok(report)
}

fn first_failure(report: &RunReport) -> Option<ParityError> {
    report.suites.iter().find_map(|suite| {
        suite
            .results
            .iter()
            .find(|r| !r.passed)
            .map(|r| ParityError::ScenarioFailed {
                suite: suite.suite.clone(),
                scenario_id: r.scenario_id,
                description: r.description.clone(),
            })
    })
}
