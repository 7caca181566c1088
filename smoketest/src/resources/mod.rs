//! External resources a test run needs, and the provisioner that manages them.
//!
//! This module provides:
//! - Resource descriptors and per-run resource sets
//! - Admin traits for the queue, table and file stores
//! - The provisioner with idempotent setup and exhaustive cleanup

mod admin;
mod descriptor;
mod provisioner;

pub use admin::{FileStoreAdmin, QueueAdmin, TableAdmin, TableReader, TableRows};
#[cfg(test)]
pub use admin::{MockFileStoreAdmin, MockQueueAdmin, MockTableAdmin};
pub use descriptor::{ResourceDescriptor, ResourceKind, ResourceSet};
pub use provisioner::ResourceProvisioner;
