//! `fixture` and `snapshot` command implementations.

use crate::error::Result;
use crate::fixture::build_fixture;
use crate::model::TreeSnapshot;
use crate::output::OutputContext;
use crate::snapshot::snapshot_local;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct TreeOutput<'a> {
    root: String,
    fingerprint: String,
    count: usize,
    entries: &'a TreeSnapshot,
}

fn emit(root: &Path, snapshot: &TreeSnapshot, ctx: &OutputContext) -> Result<()> {
    if ctx.is_json() {
        return ctx.json(&TreeOutput {
            root: root.display().to_string(),
            fingerprint: snapshot.fingerprint(),
            count: snapshot.len(),
            entries: snapshot,
        });
    }
    ctx.print(&snapshot.render());
    ctx.print(&format!("fingerprint: {}", snapshot.fingerprint()));
    Ok(())
}

/// Execute the fixture command: build the fixture under `dir`.
///
/// # Errors
///
/// Returns a precondition error when `dir` is not empty, or an I/O error.
pub fn execute_fixture(dir: &Path, ctx: &OutputContext) -> Result<()> {
    let fixture = build_fixture(dir)?;
    emit(fixture.root(), fixture.manifest(), ctx)
}

/// Execute the snapshot command on a local directory.
///
/// # Errors
///
/// Returns an I/O error when `dir` cannot be walked.
pub fn execute_snapshot(dir: &Path, ctx: &OutputContext) -> Result<()> {
    let snapshot = snapshot_local(dir)?;
    emit(dir, &snapshot, ctx)
}
