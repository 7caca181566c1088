//! Execution engine interface.
//!
//! The harness never looks inside a running graph. It submits the graph,
//! observes sink state from the outside, and kills the run before teardown.

use crate::errors::EngineError;
use crate::pipeline::ExecutableGraph;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a submitted graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHandle {
    /// Engine-assigned run ID.
    pub id: Uuid,
    /// Name of the submitted graph.
    pub graph: String,
    /// When the engine accepted the graph.
    pub submitted_at: DateTime<Utc>,
}

impl RunHandle {
    /// Creates a handle for a freshly accepted graph.
    #[must_use]
    pub fn new(graph: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            graph: graph.into(),
            submitted_at: Utc::now(),
        }
    }
}

/// Runs assembled graphs.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Launches a graph.
    async fn submit(&self, graph: ExecutableGraph) -> Result<RunHandle, EngineError>;

    /// Stops a run and waits until its instances have exited.
    async fn kill(&self, handle: &RunHandle) -> Result<(), EngineError>;
}
