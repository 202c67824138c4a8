//! Structured error output.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - Hints for self-correction
//! - Retryability flags
//! - Context for debugging
//!
//! Exit codes are grouped by category so wrapper scripts can tell a broken
//! environment apart from a detected defect in the remote tool.

use crate::driver::DriverError;
use crate::error::ParityError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === Precondition Errors (exit code 2) ===
    /// Startup invariant violated
    PreconditionFailed,
    /// Credentials missing
    MissingCredentials,

    // === Pattern Errors (exit code 3) ===
    /// Malformed path expression
    InvalidPattern,

    // === Driver Errors (exit code 4) ===
    /// Remote tool could not be launched
    DriverSpawnFailed,
    /// Remote tool exceeded the invocation timeout
    DriverTimeout,
    /// Remote tool reported failure
    DriverFailed,
    /// Remote tool succeeded where failure was required
    UnexpectedSuccess,
    /// Listing output could not be parsed
    MalformedListing,

    // === Equivalence Errors (exit code 5) ===
    /// Remote and reference snapshots differ
    EquivalenceMismatch,
    /// A scenario failed
    ScenarioFailed,
    /// Reset did not reach the empty baseline
    ResetIncomplete,

    // === Mirror Errors (exit code 6) ===
    /// Destination cannot receive the sources
    InvalidDestination,
    /// Working location is not a directory
    NotADirectory,
    /// Operation arguments are invalid
    InvalidOperation,

    // === Config Errors (exit code 7) ===
    /// Configuration error
    ConfigError,

    // === I/O Errors (exit code 8) ===
    /// File I/O error
    IoError,
    /// JSON serialization error
    JsonError,
    /// YAML parsing error
    YamlError,

    // === Internal Errors (exit code 1) ===
    /// Unexpected internal error
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PreconditionFailed => "PRECONDITION_FAILED",
            Self::MissingCredentials => "MISSING_CREDENTIALS",
            Self::InvalidPattern => "INVALID_PATTERN",
            Self::DriverSpawnFailed => "DRIVER_SPAWN_FAILED",
            Self::DriverTimeout => "DRIVER_TIMEOUT",
            Self::DriverFailed => "DRIVER_FAILED",
            Self::UnexpectedSuccess => "UNEXPECTED_SUCCESS",
            Self::MalformedListing => "MALFORMED_LISTING",
            Self::EquivalenceMismatch => "EQUIVALENCE_MISMATCH",
            Self::ScenarioFailed => "SCENARIO_FAILED",
            Self::ResetIncomplete => "RESET_INCOMPLETE",
            Self::InvalidDestination => "INVALID_DESTINATION",
            Self::NotADirectory => "NOT_A_DIRECTORY",
            Self::InvalidOperation => "INVALID_OPERATION",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::YamlError => "YAML_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether rerunning without changes might succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DriverTimeout | Self::DriverFailed | Self::ResetIncomplete
        )
    }

    /// Get the exit code for this error category.
    ///
    /// - 1: Internal/unknown errors
    /// - 2: Precondition errors
    /// - 3: Pattern errors
    /// - 4: Driver errors
    /// - 5: Equivalence / scenario failures
    /// - 6: Mirror errors
    /// - 7: Config errors
    /// - 8: I/O errors
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::PreconditionFailed | Self::MissingCredentials => 2,
            Self::InvalidPattern => 3,
            Self::DriverSpawnFailed
            | Self::DriverTimeout
            | Self::DriverFailed
            | Self::UnexpectedSuccess
            | Self::MalformedListing => 4,
            Self::EquivalenceMismatch | Self::ScenarioFailed | Self::ResetIncomplete => 5,
            Self::InvalidDestination | Self::NotADirectory | Self::InvalidOperation => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError | Self::YamlError => 8,
            Self::InternalError => 1,
        }
    }
}

/// Structured error for machine-parseable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
    /// Additional context data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl StructuredError {
    /// Create a new structured error from a `ParityError`.
    #[must_use]
    pub fn from_error(err: &ParityError) -> Self {
        let (code, context) = Self::extract_code_and_context(err);
        let hint = err.suggestion().map(str::to_string);

        Self {
            code,
            message: err.to_string(),
            hint,
            retryable: code.is_retryable(),
            context,
        }
    }

    /// Serialize to JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
                "context": self.context,
            }
        })
    }

    /// Format for human-readable output.
    #[must_use]
    pub fn to_human(&self, color: bool) -> String {
        let mut output = String::new();

        if color {
            output.push_str("\x1b[31mError:\x1b[0m ");
        } else {
            output.push_str("Error: ");
        }

        output.push_str(&self.message);

        if let Some(hint) = &self.hint {
            output.push('\n');
            if color {
                output.push_str("\x1b[33mHint:\x1b[0m ");
            } else {
                output.push_str("Hint: ");
            }
            output.push_str(hint);
        }

        output
    }

    fn extract_code_and_context(err: &ParityError) -> (ErrorCode, Option<Value>) {
        match err {
            ParityError::Precondition { reason } => (
                ErrorCode::PreconditionFailed,
                Some(json!({"reason": reason})),
            ),
            ParityError::MissingCredentials => (ErrorCode::MissingCredentials, None),
            ParityError::Pattern(inner) => (
                ErrorCode::InvalidPattern,
                Some(json!({"pattern": inner.pattern()})),
            ),
            ParityError::Driver(inner) => Self::driver_code_and_context(inner),
            ParityError::EquivalenceMismatch {
                scenario_id,
                unexpected,
                missing,
                kind_mismatches,
            } => (
                ErrorCode::EquivalenceMismatch,
                Some(json!({
                    "scenario_id": scenario_id,
                    "unexpected": unexpected,
                    "missing": missing,
                    "kind_mismatches": kind_mismatches,
                })),
            ),
            ParityError::InvalidDestination {
                destination,
                reason,
            } => (
                ErrorCode::InvalidDestination,
                Some(json!({"destination": destination, "reason": reason})),
            ),
            ParityError::NotADirectory { path } => {
                (ErrorCode::NotADirectory, Some(json!({"path": path})))
            }
            ParityError::InvalidOperation { reason } => {
                (ErrorCode::InvalidOperation, Some(json!({"reason": reason})))
            }
            ParityError::ResetIncomplete { remaining } => (
                ErrorCode::ResetIncomplete,
                Some(json!({"remaining": remaining})),
            ),
            ParityError::ScenarioFailed {
                suite,
                scenario_id,
                description,
            } => (
                ErrorCode::ScenarioFailed,
                Some(json!({
                    "suite": suite,
                    "scenario_id": scenario_id,
                    "description": description,
                })),
            ),
            ParityError::Config(_) => (ErrorCode::ConfigError, None),
            ParityError::Io(_) | ParityError::WithContext { .. } => (ErrorCode::IoError, None),
            ParityError::Json(_) => (ErrorCode::JsonError, None),
            ParityError::Yaml(_) => (ErrorCode::YamlError, None),
            ParityError::Other(_) => (ErrorCode::InternalError, None),
        }
    }

    fn driver_code_and_context(err: &DriverError) -> (ErrorCode, Option<Value>) {
        let code = match err {
            DriverError::Spawn { .. } => ErrorCode::DriverSpawnFailed,
            DriverError::Timeout { .. } => ErrorCode::DriverTimeout,
            DriverError::NonZero { .. } | DriverError::Io { .. } => ErrorCode::DriverFailed,
            DriverError::UnexpectedSuccess { .. } => ErrorCode::UnexpectedSuccess,
            DriverError::MalformedListing { .. } => ErrorCode::MalformedListing,
        };
        let context = err.captured().map(|captured| {
            json!({
                "command": err.command(),
                "stdout": captured.stdout,
                "stderr": captured.stderr,
            })
        });
        (code, context)
    }
}
