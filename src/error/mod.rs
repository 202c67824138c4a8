//! Error types and handling for `tree_parity`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Pattern and driver failures keep their own enums and fold in via `#[from]`
//! - Supports `anyhow` integration at the edges
//! - Provides recovery hints and exit codes through [`StructuredError`]

mod context;
mod structured;

pub use context::{OptionExt, ResultExt};
pub use structured::{ErrorCode, StructuredError};

use crate::driver::DriverError;
use crate::pattern::PatternError;
use thiserror::Error;

/// Primary error type for `tree_parity` operations.
#[derive(Error, Debug)]
pub enum ParityError {
    // === Startup invariants ===
    /// A startup invariant does not hold (non-empty working area, non-empty remote).
    #[error("Precondition failed: {reason}")]
    Precondition { reason: String },

    /// No identity configured for the remote session.
    #[error("Missing credentials: set MEGA_EMAIL and MEGA_PWD (use an empty account)")]
    MissingCredentials,

    // === Scenario-local failures ===
    /// Malformed path expression.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// Remote invocation did not behave as required.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Remote and reference snapshots differ.
    #[error(
        "Snapshots differ after scenario {scenario_id}: {unexpected} unexpected, {missing} missing, {kind_mismatches} kind mismatches"
    )]
    EquivalenceMismatch {
        scenario_id: u32,
        unexpected: usize,
        missing: usize,
        kind_mismatches: usize,
    },

    // === Mirror errors ===
    /// Upload destination cannot receive the given sources.
    #[error("Destination is not valid: {destination}: {reason}")]
    InvalidDestination { destination: String, reason: String },

    /// A path used as a working location is not a directory.
    #[error("Not a directory: {path}")]
    NotADirectory { path: String },

    /// Operation arguments are structurally invalid.
    #[error("Invalid operation: {reason}")]
    InvalidOperation { reason: String },

    // === Run control ===
    /// Reset left entries behind.
    #[error("Reset incomplete: {remaining} remote entries remain")]
    ResetIncomplete { remaining: usize },

    /// A scenario failed and the run stopped or finished unsuccessfully.
    #[error("Scenario {scenario_id} of suite '{suite}' failed: {description}")]
    ScenarioFailed {
        suite: String,
        scenario_id: u32,
        description: String,
    },

    // === Configuration Errors ===
    /// Configuration value or file error.
    #[error("Configuration error: {0}")]
    Config(String),

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Error with additional context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ParityError {
    /// Build a precondition failure.
    #[must_use]
    pub fn precondition(reason: impl Into<String>) -> Self {
        Self::Precondition {
            reason: reason.into(),
        }
    }

    /// Build an invalid-destination failure.
    #[must_use]
    pub fn invalid_destination(destination: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDestination {
            destination: destination.into(),
            reason: reason.into(),
        }
    }

    /// Build an invalid-operation failure.
    #[must_use]
    pub fn invalid_operation(reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            reason: reason.into(),
        }
    }

    /// Is this fatal before any scenario can run?
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition { .. } | Self::MissingCredentials)
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::MissingCredentials => Some("Export MEGA_EMAIL and MEGA_PWD for a dedicated empty account"),
            Self::Precondition { .. } => {
                Some("Run: tree-parity clean, then retry with an empty working area")
            }
            Self::ResetIncomplete { .. } => Some("Inspect the remote namespace and run: tree-parity clean"),
            Self::Pattern(_) => Some("Check the path expression and the selected pattern mode"),
            Self::ScenarioFailed { .. } | Self::EquivalenceMismatch { .. } => {
                Some("Compare the remote and local snapshots printed above")
            }
            _ => None,
        }
    }
}

/// Result type using `ParityError`.
pub type Result<T> = std::result::Result<T, ParityError>;
