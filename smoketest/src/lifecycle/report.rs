//! Final report of a test run.

use crate::core::LifecycleState;
use crate::errors::{ResourceCleanupError, SmokeTestError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verdict {
    /// The expected sink state was observed.
    Passed,
    /// A fatal error stopped the run.
    Failed {
        /// Stable error code.
        code: String,
        /// Error message.
        message: String,
    },
}

impl From<&SmokeTestError> for Verdict {
    fn from(err: &SmokeTestError) -> Self {
        Self::Failed {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    /// Run ID from the test context.
    pub run_id: Uuid,
    /// Scenario name.
    pub scenario: String,
    /// Every state the run passed through, in order.
    pub states: Vec<LifecycleState>,
    /// Pass or fail.
    pub verdict: Verdict,
    /// Resources that could not be deleted.
    pub cleanup_errors: Vec<ResourceCleanupError>,
    /// Non-fatal problems.
    pub warnings: Vec<String>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When cleanup finished.
    pub finished_at: DateTime<Utc>,
    /// Wall-clock duration.
    pub duration_ms: u64,
    /// The fatal error, if any.
    #[serde(skip)]
    pub failure: Option<SmokeTestError>,
}

impl TestReport {
    /// Returns true if the run passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Passed
    }

    /// Returns true if the run passed and every resource was deleted.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.passed() && self.cleanup_errors.is_empty()
    }

    /// Returns the last state reached.
    #[must_use]
    pub fn final_state(&self) -> Option<LifecycleState> {
        self.states.last().copied()
    }

    /// Returns true if the run went through the given state.
    #[must_use]
    pub fn reached(&self, state: LifecycleState) -> bool {
        self.states.contains(&state)
    }

    /// Converts to a JSON representation.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({
                "run_id": self.run_id,
                "error": format!("report serialization failed: {e}"),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SubmissionError;

    fn report(verdict: Verdict) -> TestReport {
        let now = Utc::now();
        TestReport {
            run_id: Uuid::new_v4(),
            scenario: "word-count".to_string(),
            states: vec![LifecycleState::Created, LifecycleState::CleanedUp],
            verdict,
            cleanup_errors: Vec::new(),
            warnings: Vec::new(),
            started_at: now,
            finished_at: now,
            duration_ms: 0,
            failure: None,
        }
    }

    #[test]
    fn test_verdict_from_error() {
        let err: SmokeTestError = SubmissionError::new("g", "no slots").into();
        let verdict = Verdict::from(&err);
        assert!(matches!(verdict, Verdict::Failed { ref code, .. } if code == "SUBMISSION"));
    }

    #[test]
    fn test_report_json_shape() {
        let report = report(Verdict::Failed {
            code: "INTERNAL".to_string(),
            message: "boom".to_string(),
        });
        let json = report.to_json();
        assert_eq!(json["verdict"]["status"], "failed");
        assert_eq!(json["verdict"]["code"], "INTERNAL");
        assert_eq!(json["states"][1], "cleaned_up");
        assert!(json.get("failure").is_none());
        assert!(!report.passed());
    }

    #[test]
    fn test_final_state() {
        let report = report(Verdict::Passed);
        assert!(report.is_clean());
        assert_eq!(report.final_state(), Some(LifecycleState::CleanedUp));
        assert!(!report.reached(LifecycleState::Verified));
    }
}
