//! Stage role, grouping and lifecycle state enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The position a stage occupies in a processing graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageRole {
    /// Emits records without consuming any (spout).
    Source,
    /// Consumes and emits records (bolt).
    Processor,
    /// Consumes records and writes them to an external store.
    Sink,
}

impl StageRole {
    /// Returns true if stages of this role must declare inputs.
    #[must_use]
    pub fn requires_inputs(&self) -> bool {
        !matches!(self, Self::Source)
    }
}

impl fmt::Display for StageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Processor => write!(f, "processor"),
            Self::Sink => write!(f, "sink"),
        }
    }
}

/// How records from an upstream stage are distributed to downstream instances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    /// Every downstream instance receives every record of every upstream instance.
    #[default]
    Broadcast,
}

impl fmt::Display for Grouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Broadcast => write!(f, "broadcast"),
        }
    }
}

/// States of a test run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Nothing has happened yet.
    #[default]
    Created,
    /// All resources exist.
    Provisioned,
    /// The graph is running on the engine.
    Submitted,
    /// The expected sink state was observed.
    Verified,
    /// A fatal error occurred; teardown is still pending.
    Failed,
    /// Teardown ran. The only terminal state.
    CleanedUp,
}

impl LifecycleState {
    /// Returns true if the state is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CleanedUp)
    }

    /// Returns true if `next` is a legal successor of this state.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        match (self, next) {
            (Self::CleanedUp, _) => false,
            (_, Self::CleanedUp) => true,
            (Self::Failed, _) => false,
            (_, Self::Failed) => true,
            (Self::Created, Self::Provisioned)
            | (Self::Provisioned, Self::Submitted)
            | (Self::Submitted, Self::Verified) => true,
            _ => false,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Provisioned => write!(f, "provisioned"),
            Self::Submitted => write!(f, "submitted"),
            Self::Verified => write!(f, "verified"),
            Self::Failed => write!(f, "failed"),
            Self::CleanedUp => write!(f, "cleaned_up"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_role_display() {
        assert_eq!(StageRole::Source.to_string(), "source");
        assert_eq!(StageRole::Processor.to_string(), "processor");
        assert_eq!(StageRole::Sink.to_string(), "sink");
    }

    #[test]
    fn test_stage_role_requires_inputs() {
        assert!(!StageRole::Source.requires_inputs());
        assert!(StageRole::Processor.requires_inputs());
        assert!(StageRole::Sink.requires_inputs());
    }

    #[test]
    fn test_happy_path_transitions() {
        use LifecycleState::*;
        assert!(Created.can_transition_to(Provisioned));
        assert!(Provisioned.can_transition_to(Submitted));
        assert!(Submitted.can_transition_to(Verified));
        assert!(Verified.can_transition_to(CleanedUp));
    }

    #[test]
    fn test_failure_and_cleanup_transitions() {
        use LifecycleState::*;
        for state in [Created, Provisioned, Submitted, Verified] {
            assert!(state.can_transition_to(Failed));
            assert!(state.can_transition_to(CleanedUp));
        }
        assert!(Failed.can_transition_to(CleanedUp));
        assert!(!Failed.can_transition_to(Submitted));
        assert!(!CleanedUp.can_transition_to(Failed));
        assert!(!Created.can_transition_to(Submitted));
    }

    #[test]
    fn test_only_cleaned_up_is_terminal() {
        assert!(LifecycleState::CleanedUp.is_terminal());
        assert!(!LifecycleState::Failed.is_terminal());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&LifecycleState::CleanedUp).unwrap();
        assert_eq!(json, "\"cleaned_up\"");
        let grouping: Grouping = serde_json::from_str("\"broadcast\"").unwrap();
        assert_eq!(grouping, Grouping::Broadcast);
    }
}
