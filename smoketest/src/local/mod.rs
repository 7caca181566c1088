//! In-process backend for running scenarios without external clusters.
//!
//! The stores implement the admin traits, so the provisioner, the engine and
//! the verifier all see the same state.

mod connectors;
mod engine;
mod files;
mod queue;
mod table;

pub use connectors::LocalConnectorFactory;
pub use engine::LocalEngine;
pub use files::{join, InMemoryFileStore};
pub use queue::InMemoryQueue;
pub use table::InMemoryTableStore;

use crate::resources::{ResourceDescriptor, ResourceKind, ResourceProvisioner, ResourceSet, TableReader};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The in-memory stores plus staged input files.
#[derive(Debug, Clone, Default)]
pub struct LocalBackend {
    queue: Arc<InMemoryQueue>,
    tables: Arc<InMemoryTableStore>,
    files: Arc<InMemoryFileStore>,
    inputs: BTreeMap<String, String>,
}

impl LocalBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages an input file for file sources.
    #[must_use]
    pub fn with_input(mut self, path: impl Into<String>, contents: impl Into<String>) -> Self {
        self.inputs.insert(path.into(), contents.into());
        self
    }

    /// Returns the queue store.
    #[must_use]
    pub fn queue(&self) -> &Arc<InMemoryQueue> {
        &self.queue
    }

    /// Returns the table store.
    #[must_use]
    pub fn tables(&self) -> &Arc<InMemoryTableStore> {
        &self.tables
    }

    /// Returns the file store.
    #[must_use]
    pub fn files(&self) -> &Arc<InMemoryFileStore> {
        &self.files
    }

    /// Builds a provisioner over the stores.
    #[must_use]
    pub fn provisioner(&self) -> ResourceProvisioner {
        ResourceProvisioner::new(self.queue.clone(), self.tables.clone(), self.files.clone())
    }

    /// Builds a connector factory with the staged inputs.
    #[must_use]
    pub fn connector_factory(&self) -> LocalConnectorFactory {
        self.inputs.iter().fold(
            LocalConnectorFactory::new(self.queue.clone(), self.tables.clone(), self.files.clone()),
            |factory, (path, contents)| factory.with_input(path.clone(), contents.clone()),
        )
    }

    /// Builds an engine over a fresh connector factory.
    #[must_use]
    pub fn engine(&self) -> LocalEngine {
        LocalEngine::new(Arc::new(self.connector_factory()))
    }

    /// Returns the table store as a verification reader.
    #[must_use]
    pub fn reader(&self) -> Arc<dyn TableReader> {
        self.tables.clone()
    }

    /// Returns the resources of a set that still exist.
    #[must_use]
    pub fn remaining<'a>(&self, resources: &'a ResourceSet) -> Vec<&'a ResourceDescriptor> {
        resources
            .iter()
            .filter(|resource| match resource.kind {
                ResourceKind::Queue => self.queue.topic_exists(&resource.name),
                ResourceKind::Table => self.tables.table_exists(&resource.name),
                ResourceKind::Directory => self.files.dir_exists(&resource.name),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TestContext;

    #[tokio::test]
    async fn test_provisioner_and_remaining_share_state() {
        let backend = LocalBackend::new();
        let resources = ResourceSet::new()
            .with(ResourceDescriptor::queue("topic"))
            .unwrap()
            .with(ResourceDescriptor::table("T", "cf"))
            .unwrap()
            .with(ResourceDescriptor::directory("/tmp/"))
            .unwrap();
        let ctx = TestContext::local();

        backend.provisioner().setup(&ctx, &resources).await.unwrap();
        backend.files().append("/tmp/out.txt", "x");
        assert_eq!(backend.remaining(&resources).len(), 3);

        let errors = backend.provisioner().cleanup(&ctx, &resources).await;
        assert!(errors.is_empty());
        assert!(backend.remaining(&resources).is_empty());
    }
}
