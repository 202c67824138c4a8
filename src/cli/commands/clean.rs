//! Clean command implementation.

use crate::config::HarnessConfig;
use crate::driver::build_driver;
use crate::error::Result;
use crate::output::OutputContext;
use crate::reset::clean_all;
use serde_json::json;

/// Remove everything from the remote namespace, its rubbish bin and the
/// working area.
///
/// # Errors
///
/// Returns [`crate::ParityError::MissingCredentials`], a login failure or a
/// local I/O error.
pub fn execute(config: &HarnessConfig, ctx: &OutputContext) -> Result<()> {
    let credentials = config.credentials()?;
    config.ensure_workdir()?;
    let mut driver = build_driver(config);
    clean_all(driver.as_mut(), &config.workdir, &credentials)?;

    if ctx.is_json() {
        return ctx.json(&json!({ "cleaned": true, "workdir": config.workdir.display().to_string() }));
    }
    ctx.print(&format!("cleaned remote namespace and {}", config.workdir.display()));
    Ok(())
}
