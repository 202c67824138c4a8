//! Built-in scenario families.
//!
//! Each family is plain data: a baseline re-applied after every reset and
//! an ordered list of scenarios. Sources are working-area relative paths
//! into the fixture or the staging area.

mod delete;
mod upload;

pub use delete::delete_suite;
pub use upload::upload_suite;

use crate::fixture::Fixture;
use crate::scenario::Suite;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which families a run executes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuiteSelection {
    Upload,
    Delete,
    #[default]
    All,
}

impl fmt::Display for SuiteSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Upload => "upload",
            Self::Delete => "delete",
            Self::All => "all",
        };
        f.write_str(name)
    }
}

/// Families for `selection`, in execution order.
#[must_use]
pub fn build(selection: SuiteSelection, fixture: &Fixture) -> Vec<Suite> {
    match selection {
        SuiteSelection::Upload => vec![upload_suite()],
        SuiteSelection::Delete => vec![delete_suite(fixture)],
        SuiteSelection::All => vec![upload_suite(), delete_suite(fixture)],
    }
}
