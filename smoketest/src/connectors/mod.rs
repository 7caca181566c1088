//! Connector configuration records and adapter interfaces.
//!
//! A [`ComponentSpec`] is pure configuration: building a graph only records
//! it. Engines turn it into a running adapter through a [`ConnectorFactory`]
//! when the graph is submitted, so any concrete connector implementation can
//! be swapped behind the factory.

use crate::context::TestContext;
use crate::core::{Record, StageRole};
use crate::errors::ConnectorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What a stage does, as configuration for a connector factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentSpec {
    /// Emits one record per whitespace-separated word of a staged file.
    FileSource {
        /// Path of the input file.
        path: String,
        /// Output field name.
        field: String,
    },
    /// Publishes records to a queue topic.
    QueuePublisher {
        /// Target topic.
        topic: String,
        /// Field used as the message key.
        key_field: String,
        /// Field used as the message body.
        message_field: String,
    },
    /// Tails a queue topic from the beginning.
    QueueSubscriber {
        /// Source topic.
        topic: String,
        /// Output field name for the message body.
        field: String,
    },
    /// Keeps a running count per distinct word.
    WordCounter {
        /// Input field holding the word.
        word_field: String,
        /// Output field holding the running count.
        count_field: String,
    },
    /// Appends records to files in a staging directory and rotates them.
    FileSink {
        /// Directory files are written into.
        source_dir: String,
        /// Directory rotated files are moved into.
        rotation_dir: String,
        /// Number of records per file before rotation.
        rotate_every: usize,
    },
    /// Writes records as table rows.
    TableSink {
        /// Target table.
        table: String,
        /// Column family receiving the columns.
        column_family: String,
        /// Field used as the row key.
        row_key_field: String,
        /// Fields written as columns.
        columns: Vec<String>,
    },
}

impl ComponentSpec {
    /// Creates a file source spec.
    #[must_use]
    pub fn file_source(path: impl Into<String>, field: impl Into<String>) -> Self {
        Self::FileSource {
            path: path.into(),
            field: field.into(),
        }
    }

    /// Creates a queue publisher spec.
    #[must_use]
    pub fn queue_publisher(
        topic: impl Into<String>,
        key_field: impl Into<String>,
        message_field: impl Into<String>,
    ) -> Self {
        Self::QueuePublisher {
            topic: topic.into(),
            key_field: key_field.into(),
            message_field: message_field.into(),
        }
    }

    /// Creates a queue subscriber spec.
    #[must_use]
    pub fn queue_subscriber(topic: impl Into<String>, field: impl Into<String>) -> Self {
        Self::QueueSubscriber {
            topic: topic.into(),
            field: field.into(),
        }
    }

    /// Creates a word counter spec.
    #[must_use]
    pub fn word_counter(word_field: impl Into<String>, count_field: impl Into<String>) -> Self {
        Self::WordCounter {
            word_field: word_field.into(),
            count_field: count_field.into(),
        }
    }

    /// Creates a file sink spec.
    #[must_use]
    pub fn file_sink(
        source_dir: impl Into<String>,
        rotation_dir: impl Into<String>,
        rotate_every: usize,
    ) -> Self {
        Self::FileSink {
            source_dir: source_dir.into(),
            rotation_dir: rotation_dir.into(),
            rotate_every,
        }
    }

    /// Creates a table sink spec.
    #[must_use]
    pub fn table_sink(
        table: impl Into<String>,
        column_family: impl Into<String>,
        row_key_field: impl Into<String>,
        columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::TableSink {
            table: table.into(),
            column_family: column_family.into(),
            row_key_field: row_key_field.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the component type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::FileSource { .. } => "file_source",
            Self::QueuePublisher { .. } => "queue_publisher",
            Self::QueueSubscriber { .. } => "queue_subscriber",
            Self::WordCounter { .. } => "word_counter",
            Self::FileSink { .. } => "file_sink",
            Self::TableSink { .. } => "table_sink",
        }
    }

    /// Returns true if the component can run in the given role.
    ///
    /// A queue publisher emits nothing downstream, so it may run as either a
    /// processor or a sink.
    #[must_use]
    pub fn supports_role(&self, role: StageRole) -> bool {
        match self {
            Self::FileSource { .. } | Self::QueueSubscriber { .. } => role == StageRole::Source,
            Self::WordCounter { .. } => role == StageRole::Processor,
            Self::QueuePublisher { .. } => role != StageRole::Source,
            Self::FileSink { .. } | Self::TableSink { .. } => role == StageRole::Sink,
        }
    }
}

/// A running source instance.
#[async_trait]
pub trait SourceAdapter: Send {
    /// Fetches the next batch.
    ///
    /// `Ok(Some(vec![]))` means nothing is available yet; `Ok(None)` means the
    /// source is exhausted for good.
    async fn poll(&mut self) -> Result<Option<Vec<Record>>, ConnectorError>;
}

/// A running processor or sink instance.
#[async_trait]
pub trait ProcessorAdapter: Send {
    /// Handles one record and returns what to emit downstream.
    async fn process(&mut self, record: Record) -> Result<Vec<Record>, ConnectorError>;
}

/// Builds adapters for graph nodes at submission time.
pub trait ConnectorFactory: Send + Sync {
    /// Builds one source instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the component cannot run as a source here.
    fn source(
        &self,
        ctx: &TestContext,
        stage: &str,
        instance: u32,
        component: &ComponentSpec,
    ) -> Result<Box<dyn SourceAdapter>, ConnectorError>;

    /// Builds one processor or sink instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the component cannot consume records here.
    fn processor(
        &self,
        ctx: &TestContext,
        stage: &str,
        instance: u32,
        component: &ComponentSpec,
    ) -> Result<Box<dyn ProcessorAdapter>, ConnectorError>;
}
