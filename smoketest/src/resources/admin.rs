//! Narrow interfaces to the external stores.
//!
//! Implementations must make `create_*` idempotent: creating a resource that
//! already exists either succeeds or fails with [`AdminError::AlreadyExists`].
//! The provisioner tolerates both.

use crate::errors::AdminError;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Rows of one column family: row key -> column -> value.
pub type TableRows = BTreeMap<String, BTreeMap<String, String>>;

/// Administers message-queue topics.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueAdmin: Send + Sync {
    /// Creates a topic.
    async fn create_topic(&self, name: &str) -> Result<(), AdminError>;

    /// Deletes a topic.
    async fn delete_topic(&self, name: &str) -> Result<(), AdminError>;
}

/// Administers wide-column tables.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TableAdmin: Send + Sync {
    /// Creates a table with a single column family.
    async fn create_table(&self, name: &str, column_family: &str) -> Result<(), AdminError>;

    /// Deletes a table.
    async fn delete_table(&self, name: &str) -> Result<(), AdminError>;
}

/// Administers file-store directories.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileStoreAdmin: Send + Sync {
    /// Recursively deletes directories.
    async fn delete_directories(&self, paths: &[String]) -> Result<(), AdminError>;
}

/// Reads back what sinks wrote into a table.
#[async_trait]
pub trait TableReader: Send + Sync {
    /// Returns every row of a column family.
    async fn scan(&self, table: &str, column_family: &str) -> Result<TableRows, AdminError>;
}
