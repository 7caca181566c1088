//! Scripted collaborators for lifecycle tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};

use crate::engine::{ExecutionEngine, RunHandle};
use crate::errors::{AdminError, EngineError};
use crate::pipeline::ExecutableGraph;
use crate::resources::{FileStoreAdmin, QueueAdmin, ResourceKind, TableAdmin, TableReader, TableRows};

/// One recorded admin call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCall {
    /// A create request.
    Create(ResourceKind, String),
    /// A delete request.
    Delete(ResourceKind, String),
}

/// Admin client for every resource kind, backed by a set of names.
///
/// Creating an existing resource returns `AlreadyExists` and deleting a
/// missing one returns `NotFound`, like a real service would.
#[derive(Debug, Default)]
pub struct ScriptedAdmin {
    existing: Mutex<BTreeSet<(ResourceKind, String)>>,
    calls: Mutex<Vec<AdminCall>>,
    create_failures: Mutex<HashMap<(ResourceKind, String), AdminError>>,
    delete_failures: Mutex<HashMap<(ResourceKind, String), AdminError>>,
}

impl ScriptedAdmin {
    /// Creates an admin with no resources.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a resource as already present.
    pub fn preexisting(&self, kind: ResourceKind, name: impl Into<String>) {
        self.existing.lock().insert((kind, name.into()));
    }

    /// Makes every create of a resource fail.
    pub fn fail_create(&self, kind: ResourceKind, name: impl Into<String>, error: AdminError) {
        self.create_failures.lock().insert((kind, name.into()), error);
    }

    /// Makes every delete of a resource fail.
    pub fn fail_delete(&self, kind: ResourceKind, name: impl Into<String>, error: AdminError) {
        self.delete_failures.lock().insert((kind, name.into()), error);
    }

    /// Returns true if the resource currently exists.
    #[must_use]
    pub fn exists(&self, kind: ResourceKind, name: &str) -> bool {
        self.existing.lock().contains(&(kind, name.to_string()))
    }

    /// Returns the names of all existing resources.
    #[must_use]
    pub fn existing(&self) -> Vec<String> {
        self.existing.lock().iter().map(|(_, name)| name.clone()).collect()
    }

    /// Returns every call in order.
    #[must_use]
    pub fn calls(&self) -> Vec<AdminCall> {
        self.calls.lock().clone()
    }

    /// Returns how many deletes were requested for a name.
    #[must_use]
    pub fn delete_count(&self, name: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, AdminCall::Delete(_, n) if n == name))
            .count()
    }

    fn create(&self, kind: ResourceKind, name: &str) -> Result<(), AdminError> {
        self.calls.lock().push(AdminCall::Create(kind, name.to_string()));
        let key = (kind, name.to_string());
        if let Some(error) = self.create_failures.lock().get(&key) {
            return Err(error.clone());
        }
        if self.existing.lock().insert(key) {
            Ok(())
        } else {
            Err(AdminError::AlreadyExists)
        }
    }

    fn delete(&self, kind: ResourceKind, name: &str) -> Result<(), AdminError> {
        self.calls.lock().push(AdminCall::Delete(kind, name.to_string()));
        let key = (kind, name.to_string());
        if let Some(error) = self.delete_failures.lock().get(&key) {
            return Err(error.clone());
        }
        if self.existing.lock().remove(&key) {
            Ok(())
        } else {
            Err(AdminError::NotFound)
        }
    }
}

#[async_trait]
impl QueueAdmin for ScriptedAdmin {
    async fn create_topic(&self, name: &str) -> Result<(), AdminError> {
        self.create(ResourceKind::Queue, name)
    }

    async fn delete_topic(&self, name: &str) -> Result<(), AdminError> {
        self.delete(ResourceKind::Queue, name)
    }
}

#[async_trait]
impl TableAdmin for ScriptedAdmin {
    async fn create_table(&self, name: &str, _column_family: &str) -> Result<(), AdminError> {
        self.create(ResourceKind::Table, name)
    }

    async fn delete_table(&self, name: &str) -> Result<(), AdminError> {
        self.delete(ResourceKind::Table, name)
    }
}

#[async_trait]
impl FileStoreAdmin for ScriptedAdmin {
    async fn delete_directories(&self, paths: &[String]) -> Result<(), AdminError> {
        for path in paths {
            self.calls
                .lock()
                .push(AdminCall::Delete(ResourceKind::Directory, path.clone()));
            let key = (ResourceKind::Directory, path.clone());
            if let Some(error) = self.delete_failures.lock().get(&key) {
                return Err(error.clone());
            }
            self.existing.lock().remove(&key);
        }
        Ok(())
    }
}

/// What [`StubEngine::submit`] does.
#[derive(Debug, Clone, Default)]
pub enum SubmitBehavior {
    /// Accept every graph.
    #[default]
    Accept,
    /// Refuse with a reason.
    Reject(String),
    /// Panic inside submit.
    Panic,
}

/// Engine that runs nothing and records what it was asked to do.
#[derive(Debug, Default)]
pub struct StubEngine {
    behavior: SubmitBehavior,
    submitted: Mutex<Vec<String>>,
    killed: Mutex<Vec<RunHandle>>,
    fail_kill: bool,
}

impl StubEngine {
    /// Creates an engine with the given submit behavior.
    #[must_use]
    pub fn new(behavior: SubmitBehavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }

    /// Makes every kill fail.
    #[must_use]
    pub fn failing_kill(mut self) -> Self {
        self.fail_kill = true;
        self
    }

    /// Names of graphs passed to submit.
    #[must_use]
    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().clone()
    }

    /// Number of kill calls.
    #[must_use]
    pub fn kill_count(&self) -> usize {
        self.killed.lock().len()
    }
}

#[async_trait]
impl ExecutionEngine for StubEngine {
    async fn submit(&self, graph: ExecutableGraph) -> Result<RunHandle, EngineError> {
        self.submitted.lock().push(graph.name().to_string());
        match &self.behavior {
            SubmitBehavior::Accept => Ok(RunHandle::new(graph.name())),
            SubmitBehavior::Reject(reason) => Err(EngineError::Rejected(reason.clone())),
            SubmitBehavior::Panic => panic!("engine crashed while submitting '{}'", graph.name()),
        }
    }

    async fn kill(&self, handle: &RunHandle) -> Result<(), EngineError> {
        self.killed.lock().push(handle.clone());
        if self.fail_kill {
            return Err(EngineError::Unavailable("compute endpoint unreachable".to_string()));
        }
        Ok(())
    }
}

/// Reader that always returns the same rows.
#[derive(Debug, Default)]
pub struct StaticTableReader {
    rows: Mutex<TableRows>,
}

impl StaticTableReader {
    /// Creates a reader serving the given rows.
    #[must_use]
    pub fn new(rows: TableRows) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }

    /// Replaces the served rows.
    pub fn set_rows(&self, rows: TableRows) {
        *self.rows.lock() = rows;
    }
}

#[async_trait]
impl TableReader for StaticTableReader {
    async fn scan(&self, _table: &str, _column_family: &str) -> Result<TableRows, AdminError> {
        Ok(self.rows.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_admin_behaves_like_a_service() {
        let admin = ScriptedAdmin::new();
        admin.create_topic("t").await.unwrap();
        assert_eq!(admin.create_topic("t").await, Err(AdminError::AlreadyExists));
        admin.delete_topic("t").await.unwrap();
        assert_eq!(admin.delete_topic("t").await, Err(AdminError::NotFound));
        assert_eq!(admin.delete_count("t"), 2);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let admin = ScriptedAdmin::new();
        admin.fail_create(ResourceKind::Table, "T", AdminError::Unavailable("down".into()));
        assert!(matches!(
            admin.create_table("T", "cf").await,
            Err(AdminError::Unavailable(_))
        ));
        assert!(!admin.exists(ResourceKind::Table, "T"));
    }
}
