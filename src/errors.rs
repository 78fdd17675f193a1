//! Typed error hierarchy for the conductor.
//!
//! Three top-level enums cover the three error-bearing subsystems:
//! - `ArtifactError`: unreadable or malformed persisted project artifacts
//! - `VerdictError`: validator output that fails to parse into a verdict
//! - `SessionError`: session driver failures
//!
//! Guard denials are deliberately not errors: `guard::Verdict::Deny` is a
//! value the caller acts on, and is always recoverable.

use thiserror::Error;

/// Errors from reading or validating persisted project artifacts.
///
/// Per-file failures degrade (the file is treated as absent and a warning
/// is surfaced) rather than aborting the surrounding resolution.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to read {name} at {path}: {source}")]
    ReadFailed {
        name: &'static str,
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {name}: {message}")]
    ParseFailed { name: &'static str, message: String },

    #[error("{name}: missing required field '{field}' at index {index}")]
    MissingField {
        name: &'static str,
        field: &'static str,
        index: usize,
    },

    #[error("Feature {index} is blocked but has no blocked_reason")]
    BlockedWithoutReason { index: usize },

    #[error("Failed to write {name} at {path}: {source}")]
    WriteFailed {
        name: &'static str,
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Taxonomy of validator-verdict parse failures.
///
/// A parse failure is distinct from a rejected verdict: rejection is a
/// successful parse of an unfavorable outcome.
#[derive(Debug, Error)]
pub enum VerdictError {
    #[error("No JSON verdict block found in validator output")]
    MissingBlock,

    #[error("Verdict block is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Verdict block missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Unknown verdict value '{0}'")]
    InvalidVerdict(String),
}

/// Errors from the session driver.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Agent invocation failed in session {session}: {message}")]
    InvocationFailed { session: u32, message: String },

    #[error("Project is stalled: {0}")]
    Stalled(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
