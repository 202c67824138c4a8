#![allow(dead_code)]

use std::path::Path;
use std::sync::Once;
use std::time::Instant;
use tracing::info;
use tree_parity::config::{DEFAULT_COMMAND_PREFIX, HarnessConfig};
use tree_parity::session::Credentials;

pub mod cli;
pub mod fake_remote;

pub use fake_remote::{Defect, FakeRemote};

pub const TEST_EMAIL: &str = "oracle@example.com";

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        tree_parity::logging::init_test_logging();
    });
}

pub struct TestLogGuard {
    name: String,
    start: Instant,
}

impl TestLogGuard {
    fn new(name: &str) -> Self {
        init_test_logging();
        info!("{name}: starting");
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }
}

impl Drop for TestLogGuard {
    fn drop(&mut self) {
        info!(
            "{}: assertions passed (elapsed {:?})",
            self.name,
            self.start.elapsed()
        );
    }
}

pub fn test_log(name: &str) -> TestLogGuard {
    TestLogGuard::new(name)
}

pub fn test_credentials() -> Credentials {
    Credentials::new(TEST_EMAIL, "not-a-real-password")
}

/// Configuration pointing at `workdir`, with test credentials.
pub fn test_config(workdir: &Path) -> HarnessConfig {
    HarnessConfig {
        email: Some(TEST_EMAIL.to_string()),
        password: Some("not-a-real-password".to_string()),
        verbose: false,
        shell: None,
        command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
        timeout_secs: 30,
        workdir: workdir.to_path_buf(),
        continue_on_failure: false,
    }
}
