//! Resource descriptors.

use crate::errors::InvalidResourceError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

const COLUMN_FAMILY: &str = "column_family";
const MAX_TOPIC_NAME_LEN: usize = 249;

#[allow(clippy::expect_used)]
fn legal_name() -> &'static Regex {
    static LEGAL: OnceLock<Regex> = OnceLock::new();
    LEGAL.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("static pattern compiles"))
}

/// The kind of external resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A message-queue topic.
    Queue,
    /// A wide-column table.
    Table,
    /// A file-store directory. Created lazily by sinks; only deleted here.
    Directory,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queue => write!(f, "queue"),
            Self::Table => write!(f, "table"),
            Self::Directory => write!(f, "directory"),
        }
    }
}

/// A named external resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// The resource kind.
    pub kind: ResourceKind,
    /// The resource name (topic, table, or absolute directory path).
    pub name: String,
    /// Kind-specific parameters.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl ResourceDescriptor {
    /// Describes a queue topic.
    #[must_use]
    pub fn queue(name: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Queue,
            name: name.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Describes a table with one column family.
    #[must_use]
    pub fn table(name: impl Into<String>, column_family: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Table,
            name: name.into(),
            parameters: BTreeMap::new(),
        }
        .with_parameter(COLUMN_FAMILY, column_family)
    }

    /// Describes a file-store directory.
    #[must_use]
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Directory,
            name: path.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Returns the column family of a table.
    #[must_use]
    pub fn column_family(&self) -> Option<&str> {
        self.parameters.get(COLUMN_FAMILY).map(String::as_str)
    }

    /// Checks the name against what the backing store accepts.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, contains illegal characters,
    /// is too long for a topic, or a directory path is not absolute.
    pub fn validate(&self) -> Result<(), InvalidResourceError> {
        let reject = |reason: &str| Err(InvalidResourceError::new(self.kind, &self.name, reason));

        if self.name.is_empty() {
            return reject("name cannot be empty");
        }

        match self.kind {
            ResourceKind::Queue | ResourceKind::Table => {
                if !legal_name().is_match(&self.name) {
                    return reject("name may only contain ASCII alphanumerics, '.', '_' and '-'");
                }
                if self.kind == ResourceKind::Queue && self.name.len() > MAX_TOPIC_NAME_LEN {
                    return reject("topic names are limited to 249 characters");
                }
                if self.kind == ResourceKind::Table
                    && self.column_family().map_or(true, str::is_empty)
                {
                    return reject("tables need a column family");
                }
            }
            ResourceKind::Directory => {
                if !self.name.starts_with('/') {
                    return reject("directory paths must be absolute");
                }
            }
        }

        Ok(())
    }
}

/// The resources of one test run, in provisioning order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSet {
    resources: Vec<ResourceDescriptor>,
}

impl ResourceSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor is invalid or another resource of
    /// the same kind already uses the name.
    pub fn insert(&mut self, resource: ResourceDescriptor) -> Result<(), InvalidResourceError> {
        resource.validate()?;
        if self.get(resource.kind, &resource.name).is_some() {
            return Err(InvalidResourceError::new(
                resource.kind,
                resource.name,
                "name already used in this run",
            ));
        }
        self.resources.push(resource);
        Ok(())
    }

    /// Adds a resource, builder style.
    ///
    /// # Errors
    ///
    /// See [`ResourceSet::insert`].
    pub fn with(mut self, resource: ResourceDescriptor) -> Result<Self, InvalidResourceError> {
        self.insert(resource)?;
        Ok(self)
    }

    /// Looks up a resource by kind and name.
    #[must_use]
    pub fn get(&self, kind: ResourceKind, name: &str) -> Option<&ResourceDescriptor> {
        self.resources
            .iter()
            .find(|r| r.kind == kind && r.name == name)
    }

    /// Returns all resources of one kind, in provisioning order.
    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceDescriptor> {
        self.resources.iter().filter(move |r| r.kind == kind)
    }

    /// Iterates in provisioning order.
    pub fn iter(&self) -> std::slice::Iter<'_, ResourceDescriptor> {
        self.resources.iter()
    }

    /// Returns the number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl<'a> IntoIterator for &'a ResourceSet {
    type Item = &'a ResourceDescriptor;
    type IntoIter = std::slice::Iter<'a, ResourceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_descriptor_carries_column_family() {
        let table = ResourceDescriptor::table("WordCount", "columnFamily");
        assert_eq!(table.kind, ResourceKind::Table);
        assert_eq!(table.column_family(), Some("columnFamily"));
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_queue_name_rules() {
        assert!(ResourceDescriptor::queue("storm-smoke-test-tmp").validate().is_ok());
        assert!(ResourceDescriptor::queue("").validate().is_err());
        assert!(ResourceDescriptor::queue("bad topic").validate().is_err());
        assert!(ResourceDescriptor::queue("a".repeat(250)).validate().is_err());
    }

    #[test]
    fn test_directory_must_be_absolute() {
        assert!(ResourceDescriptor::directory("/tmp/").validate().is_ok());
        assert!(ResourceDescriptor::directory("tmp/").validate().is_err());
    }

    #[test]
    fn test_set_rejects_duplicate_name_per_kind() {
        let mut set = ResourceSet::new();
        set.insert(ResourceDescriptor::queue("words")).unwrap();

        let err = set.insert(ResourceDescriptor::queue("words")).unwrap_err();
        assert_eq!(err.kind, ResourceKind::Queue);

        // Same name, different kind is fine.
        set.insert(ResourceDescriptor::table("words", "cf")).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_set_preserves_order() {
        let set = ResourceSet::new()
            .with(ResourceDescriptor::queue("t"))
            .unwrap()
            .with(ResourceDescriptor::table("tbl", "cf"))
            .unwrap()
            .with(ResourceDescriptor::directory("/dest/"))
            .unwrap();

        let kinds: Vec<_> = set.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![ResourceKind::Queue, ResourceKind::Table, ResourceKind::Directory]
        );
        assert_eq!(set.of_kind(ResourceKind::Directory).count(), 1);
    }
}
