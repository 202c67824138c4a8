//! Remote session establishment.

use crate::driver::{CommandDriver, invoke_ignoring_status};
use crate::error::Result;
use crate::model::{CommandName, CommandSpec};
use std::fmt;
use tracing::{debug, info};

/// Identity used for the remote session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Make sure the remote tool is logged in as `credentials.email`.
///
/// A failing or mismatching identity check triggers a logout (whose status
/// is ignored) followed by a login that must succeed.
///
/// # Errors
///
/// Returns the driver error of a failed login.
pub fn ensure_session(driver: &mut dyn CommandDriver, credentials: &Credentials) -> Result<()> {
    let whoami = CommandSpec::new(CommandName::Whoami);
    let current = driver
        .invoke(&whoami)
        .map(|invocation| invocation.stdout_text().trim().to_string())
        .ok();
    if current.as_deref() == Some(credentials.email.as_str()) {
        debug!(email = %credentials.email, "session already established");
        return Ok(());
    }

    info!(email = %credentials.email, "establishing remote session");
    invoke_ignoring_status(driver, &CommandSpec::new(CommandName::Logout));
    let login = CommandSpec::new(CommandName::Login).args([
        credentials.email.clone(),
        credentials.password.clone(),
    ]);
    driver.invoke(&login)?;
    Ok(())
}
