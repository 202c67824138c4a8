//! Returning both namespaces to a known baseline.

use crate::driver::{CommandDriver, invoke_ignoring_status};
use crate::error::{ParityError, Result, ResultExt};
use crate::fixture::FIXTURE_DIR;
use crate::mirror::{MirrorEngine, REFERENCE_DIR};
use crate::model::{CommandName, CommandSpec};
use crate::scenario::{STAGING_DIR, Staging};
use crate::session::{Credentials, ensure_session};
use crate::snapshot::remote_entry_count;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

fn remove_all(pattern: &str) -> CommandSpec {
    CommandSpec::new(CommandName::Rm).flag("r").flag("f").arg(pattern)
}

/// Empty the remote namespace, the reference tree and the staging area,
/// and return both sides to the root.
///
/// Removal statuses are ignored (an empty namespace makes the remove
/// command fail); the remote listing is checked afterwards instead, so the
/// call is idempotent.
///
/// # Errors
///
/// Returns [`ParityError::ResetIncomplete`] when remote entries remain, or
/// the error of the listing, change-directory or local cleanup.
pub fn reset(driver: &mut dyn CommandDriver, mirror: &mut MirrorEngine, staging: &Staging) -> Result<()> {
    invoke_ignoring_status(driver, &remove_all("/*"));
    let remaining = remote_entry_count(driver)?;
    if remaining > 0 {
        warn!(remaining, "remote namespace not empty after reset");
        return Err(ParityError::ResetIncomplete { remaining });
    }
    driver.invoke(&CommandSpec::new(CommandName::Cd).arg("/"))?;
    mirror.reset()?;
    staging.clear()?;
    debug!("both namespaces reset");
    Ok(())
}

/// Startup invariants: empty working area, empty remote namespace.
///
/// # Errors
///
/// Returns [`ParityError::Precondition`] when either side holds entries.
pub fn check_preconditions(workdir: &Path, driver: &mut dyn CommandDriver) -> Result<()> {
    let mut entries = fs::read_dir(workdir).with_context(|| format!("reading {}", workdir.display()))?;
    if entries.next().is_some() {
        return Err(ParityError::precondition(format!(
            "working area {} is not empty",
            workdir.display()
        )));
    }
    let remote = remote_entry_count(driver)?;
    if remote > 0 {
        return Err(ParityError::precondition(format!(
            "remote namespace is not empty ({remote} entries); clear it before starting"
        )));
    }
    Ok(())
}

/// Full cleanup of both sides: session check, remote contents and rubbish
/// bin, and the local working directories.
///
/// # Errors
///
/// Returns the login failure or a local I/O error. Remote removal statuses
/// are ignored.
pub fn clean_all(driver: &mut dyn CommandDriver, workdir: &Path, credentials: &Credentials) -> Result<()> {
    ensure_session(driver, credentials)?;
    invoke_ignoring_status(driver, &remove_all("*"));
    invoke_ignoring_status(driver, &remove_all("//bin/*"));
    for dir in [FIXTURE_DIR, REFERENCE_DIR, STAGING_DIR] {
        let path = workdir.join(dir);
        match fs::remove_dir_all(&path) {
            Ok(()) => debug!(path = %path.display(), "removed local directory"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err).with_context(|| format!("removing {}", path.display())),
        }
    }
    info!(workdir = %workdir.display(), "clean complete");
    Ok(())
}
