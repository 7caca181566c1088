//! Per-run configuration bundle shared by every collaborator.
//!
//! A [`TestContext`] is built once per test run and handed out behind an
//! `Arc`. It has no setters: anything that needs different endpoints builds
//! a new context.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Endpoints of the external systems a test run talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestContext {
    run_id: Uuid,
    queue_endpoint: String,
    compute_endpoint: String,
    file_store_endpoint: String,
    table_store_endpoint: String,
}

impl TestContext {
    /// Creates a context with a freshly generated run ID.
    #[must_use]
    pub fn new(
        queue_endpoint: impl Into<String>,
        compute_endpoint: impl Into<String>,
        file_store_endpoint: impl Into<String>,
        table_store_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            queue_endpoint: queue_endpoint.into(),
            compute_endpoint: compute_endpoint.into(),
            file_store_endpoint: file_store_endpoint.into(),
            table_store_endpoint: table_store_endpoint.into(),
        }
    }

    /// Creates a context pointing every endpoint at the in-process backend.
    #[must_use]
    pub fn local() -> Self {
        Self::new("local://queue", "local://compute", "local://files", "local://tables")
    }

    /// Wraps the context for sharing.
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Returns the run ID.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the message-queue endpoint (broker list).
    #[must_use]
    pub fn queue_endpoint(&self) -> &str {
        &self.queue_endpoint
    }

    /// Returns the execution-engine endpoint.
    #[must_use]
    pub fn compute_endpoint(&self) -> &str {
        &self.compute_endpoint
    }

    /// Returns the file-store endpoint.
    #[must_use]
    pub fn file_store_endpoint(&self) -> &str {
        &self.file_store_endpoint
    }

    /// Returns the table-store endpoint.
    #[must_use]
    pub fn table_store_endpoint(&self) -> &str {
        &self.table_store_endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_accessors() {
        let ctx = TestContext::new("broker:9092", "nimbus:6627", "hdfs://nn:8020", "hbase://zk:2181");

        assert_eq!(ctx.queue_endpoint(), "broker:9092");
        assert_eq!(ctx.compute_endpoint(), "nimbus:6627");
        assert_eq!(ctx.file_store_endpoint(), "hdfs://nn:8020");
        assert_eq!(ctx.table_store_endpoint(), "hbase://zk:2181");
    }

    #[test]
    fn test_each_context_has_its_own_run_id() {
        let a = TestContext::local();
        let b = TestContext::local();
        assert_ne!(a.run_id(), b.run_id());
    }
}
