//! `tree_parity` - a correctness oracle for remote file-storage CLIs.
//!
//! Each scenario issues commands against the external tool, replays the
//! intended effect on an independently maintained local reference tree,
//! and compares canonical snapshots of both namespaces.

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod fixture;
pub mod logging;
pub mod mirror;
pub mod model;
pub mod output;
pub mod pattern;
pub mod reset;
pub mod scenario;
pub mod session;
pub mod snapshot;
pub mod suites;

pub use error::{ErrorCode, ParityError, Result, StructuredError};
