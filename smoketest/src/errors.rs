//! Error types for the smoke-test harness.
//!
//! The taxonomy mirrors the lifecycle: creation and spec errors abort before
//! submission, submission and verification errors fail the verdict, and
//! cleanup errors are collected as warnings on the final report.

use crate::resources::ResourceKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// A fatal error that decides a test run's verdict.
#[derive(Debug, Clone, Error)]
pub enum SmokeTestError {
    /// A resource could not be provisioned.
    #[error("{0}")]
    ResourceCreation(#[from] ResourceCreationError),

    /// The pipeline description is malformed.
    #[error("{0}")]
    InvalidSpec(#[from] InvalidSpecError),

    /// The execution engine rejected the graph.
    #[error("{0}")]
    Submission(#[from] SubmissionError),

    /// Expected sink state was not observed in time.
    #[error("{0}")]
    VerificationTimeout(#[from] VerificationTimeoutError),

    /// Observed sink state contradicts the expectation.
    #[error("{0}")]
    VerificationMismatch(#[from] VerificationMismatchError),

    /// A collaborator misbehaved (e.g. panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SmokeTestError {
    /// Returns a stable code for reports and log fields.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ResourceCreation(_) => "RESOURCE-CREATION",
            Self::InvalidSpec(_) => "INVALID-SPEC",
            Self::Submission(_) => "SUBMISSION",
            Self::VerificationTimeout(_) => "VERIFICATION-TIMEOUT",
            Self::VerificationMismatch(_) => "VERIFICATION-MISMATCH",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

/// Failure reported by an external admin client.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "reason", rename_all = "snake_case")]
pub enum AdminError {
    /// The resource already exists.
    #[error("already exists")]
    AlreadyExists,

    /// The resource does not exist.
    #[error("not found")]
    NotFound,

    /// The backing service could not be reached.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The backing service refused the request.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Raised when setup fails for a reason other than "already exists".
#[derive(Debug, Clone, Error)]
#[error("Failed to create {kind} '{name}': {source}")]
pub struct ResourceCreationError {
    /// Kind of the resource.
    pub kind: ResourceKind,
    /// Name of the resource.
    pub name: String,
    /// Underlying admin failure.
    pub source: AdminError,
}

impl ResourceCreationError {
    /// Creates a new resource creation error.
    #[must_use]
    pub fn new(kind: ResourceKind, name: impl Into<String>, source: AdminError) -> Self {
        Self {
            kind,
            name: name.into(),
            source,
        }
    }
}

/// Raised when deleting one resource fails. Non-fatal; collected per run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Failed to delete {kind} '{name}': {source}")]
pub struct ResourceCleanupError {
    /// Kind of the resource.
    pub kind: ResourceKind,
    /// Name of the resource.
    pub name: String,
    /// Underlying admin failure.
    pub source: AdminError,
}

impl ResourceCleanupError {
    /// Creates a new resource cleanup error.
    #[must_use]
    pub fn new(kind: ResourceKind, name: impl Into<String>, source: AdminError) -> Self {
        Self {
            kind,
            name: name.into(),
            source,
        }
    }
}

/// Raised when a resource descriptor cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {kind} '{name}': {reason}")]
pub struct InvalidResourceError {
    /// Kind of the resource.
    pub kind: ResourceKind,
    /// Name of the resource.
    pub name: String,
    /// Why the descriptor was rejected.
    pub reason: String,
}

impl InvalidResourceError {
    /// Creates a new invalid resource error.
    #[must_use]
    pub fn new(kind: ResourceKind, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Raised when a pipeline spec violates its structural invariants.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct InvalidSpecError {
    /// Error code (e.g. "SPEC-UNKNOWN-INPUT").
    pub code: String,
    /// The offending stage, when one can be named.
    pub stage: Option<String>,
    /// Human-readable message.
    pub message: String,
    /// Hint for fixing the spec.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    pub context: HashMap<String, String>,
}

impl InvalidSpecError {
    /// Creates a new invalid spec error.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            stage: None,
            message: message.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the offending stage.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Converts to a JSON representation.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::json!({
            "code": self.code,
            "message": self.message,
        });
        if let Some(ref stage) = self.stage {
            value["stage"] = serde_json::json!(stage);
        }
        if let Some(ref hint) = self.fix_hint {
            value["fix_hint"] = serde_json::json!(hint);
        }
        if !self.context.is_empty() {
            value["context"] = serde_json::json!(self.context);
        }
        value
    }
}

/// Raised when the execution engine refuses a graph.
#[derive(Debug, Clone, Error)]
#[error("Submission of '{graph}' failed: {reason}")]
pub struct SubmissionError {
    /// Name of the graph.
    pub graph: String,
    /// Reason given by the engine.
    pub reason: String,
}

impl SubmissionError {
    /// Creates a new submission error.
    #[must_use]
    pub fn new(graph: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            graph: graph.into(),
            reason: reason.into(),
        }
    }
}

/// Raised when the expected state does not appear within the bound.
#[derive(Debug, Clone, Error)]
#[error("Verification timed out after {timeout:?} ({attempts} polls): {last_observation}")]
pub struct VerificationTimeoutError {
    /// The configured bound.
    pub timeout: Duration,
    /// How many times the store was polled.
    pub attempts: u32,
    /// Summary of the last observation.
    pub last_observation: String,
}

/// Raised when observed state can no longer converge on the expectation.
#[derive(Debug, Clone, Error)]
#[error("Verification mismatch: {}", differences.join("; "))]
pub struct VerificationMismatchError {
    /// One entry per differing row or column.
    pub differences: Vec<String>,
}

impl VerificationMismatchError {
    /// Creates a new mismatch error.
    #[must_use]
    pub fn new(differences: Vec<String>) -> Self {
        Self { differences }
    }
}

/// Errors raised by execution engines.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The engine refused the graph.
    #[error("graph rejected: {0}")]
    Rejected(String),

    /// The engine could not be reached.
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// No run with this ID is known to the engine.
    #[error("unknown run {0}")]
    UnknownRun(uuid::Uuid),
}

/// Errors raised while building or driving a connector adapter.
#[derive(Debug, Clone, Error)]
pub enum ConnectorError {
    /// The factory cannot build this component for the requested role.
    #[error("component '{component}' cannot run as a {role}")]
    Unsupported {
        /// Component type name.
        component: String,
        /// Requested role.
        role: crate::core::StageRole,
    },

    /// A staged input file does not exist.
    #[error("input file '{0}' not found")]
    MissingInput(String),

    /// A record lacks a field the component needs.
    #[error("record has no field '{0}'")]
    MissingField(String),

    /// The backing store failed.
    #[error("store error: {0}")]
    Store(#[from] AdminError),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config '{path}': {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_spec_error_builder() {
        let err = InvalidSpecError::new("SPEC-UNKNOWN-INPUT", "bad input")
            .with_stage("wordCount")
            .with_fix_hint("declare it first")
            .with_context_entry("input", "kafkaSpout");

        assert_eq!(err.code, "SPEC-UNKNOWN-INPUT");
        assert_eq!(err.stage.as_deref(), Some("wordCount"));
        assert_eq!(err.context.get("input"), Some(&"kafkaSpout".to_string()));

        let json = err.to_json();
        assert_eq!(json["stage"], "wordCount");
        assert_eq!(json["fix_hint"], "declare it first");
    }

    #[test]
    fn test_error_codes() {
        let err: SmokeTestError = SubmissionError::new("g", "rejected").into();
        assert_eq!(err.code(), "SUBMISSION");

        let err: SmokeTestError =
            ResourceCreationError::new(ResourceKind::Queue, "t", AdminError::NotFound).into();
        assert_eq!(err.code(), "RESOURCE-CREATION");
        assert!(err.to_string().contains("queue 't'"));
    }

    #[test]
    fn test_mismatch_display_joins_differences() {
        let err = VerificationMismatchError::new(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Verification mismatch: a; b");
    }

    #[test]
    fn test_cleanup_error_serializes() {
        let err = ResourceCleanupError::new(
            ResourceKind::Table,
            "WordCount",
            AdminError::Unavailable("down".into()),
        );
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "table");
        assert_eq!(json["source"]["type"], "unavailable");
    }
}
