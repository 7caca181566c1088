//! Connector adapters bound to the in-memory stores.

use super::files::join;
use super::{InMemoryFileStore, InMemoryQueue, InMemoryTableStore};
use crate::connectors::{ComponentSpec, ConnectorFactory, ProcessorAdapter, SourceAdapter};
use crate::context::TestContext;
use crate::core::{Record, StageRole};
use crate::errors::ConnectorError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

const KEY_FIELD: &str = "key";
const MESSAGE_FIELD: &str = "message";
const DEFAULT_BATCH_SIZE: usize = 64;

/// Builds adapters that read and write the in-memory stores.
#[derive(Debug, Clone)]
pub struct LocalConnectorFactory {
    queue: Arc<InMemoryQueue>,
    tables: Arc<InMemoryTableStore>,
    files: Arc<InMemoryFileStore>,
    inputs: HashMap<String, String>,
    batch_size: usize,
}

impl LocalConnectorFactory {
    /// Creates a factory over the given stores.
    #[must_use]
    pub fn new(
        queue: Arc<InMemoryQueue>,
        tables: Arc<InMemoryTableStore>,
        files: Arc<InMemoryFileStore>,
    ) -> Self {
        Self {
            queue,
            tables,
            files,
            inputs: HashMap::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Stages the contents of an input file for file sources.
    #[must_use]
    pub fn with_input(mut self, path: impl Into<String>, contents: impl Into<String>) -> Self {
        self.inputs.insert(path.into(), contents.into());
        self
    }

    /// Sets how many records a source emits per poll.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

impl ConnectorFactory for LocalConnectorFactory {
    fn source(
        &self,
        _ctx: &TestContext,
        _stage: &str,
        _instance: u32,
        component: &ComponentSpec,
    ) -> Result<Box<dyn SourceAdapter>, ConnectorError> {
        match component {
            ComponentSpec::FileSource { path, field } => {
                let contents = self
                    .inputs
                    .get(path)
                    .ok_or_else(|| ConnectorError::MissingInput(path.clone()))?;
                Ok(Box::new(FileSource {
                    words: contents.split_whitespace().map(str::to_string).collect(),
                    field: field.clone(),
                    batch_size: self.batch_size,
                }))
            }
            ComponentSpec::QueueSubscriber { topic, field } => Ok(Box::new(QueueSubscriber {
                queue: Arc::clone(&self.queue),
                topic: topic.clone(),
                field: field.clone(),
                offset: 0,
                batch_size: self.batch_size,
            })),
            other => Err(ConnectorError::Unsupported {
                component: other.type_name().to_string(),
                role: StageRole::Source,
            }),
        }
    }

    fn processor(
        &self,
        _ctx: &TestContext,
        stage: &str,
        instance: u32,
        component: &ComponentSpec,
    ) -> Result<Box<dyn ProcessorAdapter>, ConnectorError> {
        match component {
            ComponentSpec::QueuePublisher {
                topic,
                key_field,
                message_field,
            } => Ok(Box::new(QueuePublisher {
                queue: Arc::clone(&self.queue),
                topic: topic.clone(),
                key_field: key_field.clone(),
                message_field: message_field.clone(),
            })),
            ComponentSpec::WordCounter {
                word_field,
                count_field,
            } => Ok(Box::new(WordCounter {
                word_field: word_field.clone(),
                count_field: count_field.clone(),
                counts: HashMap::new(),
            })),
            ComponentSpec::FileSink {
                source_dir,
                rotation_dir,
                rotate_every,
            } => Ok(Box::new(FileSink {
                files: Arc::clone(&self.files),
                source_dir: source_dir.clone(),
                rotation_dir: rotation_dir.clone(),
                rotate_every: *rotate_every,
                file_prefix: format!("{stage}-{instance}"),
                rotation: 0,
                written: 0,
            })),
            ComponentSpec::TableSink {
                table,
                column_family,
                row_key_field,
                columns,
            } => Ok(Box::new(TableSink {
                tables: Arc::clone(&self.tables),
                table: table.clone(),
                column_family: column_family.clone(),
                row_key_field: row_key_field.clone(),
                columns: columns.clone(),
            })),
            other => Err(ConnectorError::Unsupported {
                component: other.type_name().to_string(),
                role: StageRole::Processor,
            }),
        }
    }
}

struct FileSource {
    words: VecDeque<String>,
    field: String,
    batch_size: usize,
}

#[async_trait]
impl SourceAdapter for FileSource {
    async fn poll(&mut self) -> Result<Option<Vec<Record>>, ConnectorError> {
        if self.words.is_empty() {
            return Ok(None);
        }
        let take = self.batch_size.min(self.words.len());
        Ok(Some(
            self.words
                .drain(..take)
                .map(|word| Record::single(self.field.clone(), word))
                .collect(),
        ))
    }
}

struct QueueSubscriber {
    queue: Arc<InMemoryQueue>,
    topic: String,
    field: String,
    offset: usize,
    batch_size: usize,
}

#[async_trait]
impl SourceAdapter for QueueSubscriber {
    async fn poll(&mut self) -> Result<Option<Vec<Record>>, ConnectorError> {
        let mut messages = self.queue.read_from(&self.topic, self.offset)?;
        messages.truncate(self.batch_size);
        self.offset += messages.len();
        Ok(Some(
            messages
                .into_iter()
                .filter_map(|message| message.get(MESSAGE_FIELD).cloned())
                .map(|body| Record::single(self.field.clone(), body))
                .collect(),
        ))
    }
}

struct QueuePublisher {
    queue: Arc<InMemoryQueue>,
    topic: String,
    key_field: String,
    message_field: String,
}

#[async_trait]
impl ProcessorAdapter for QueuePublisher {
    async fn process(&mut self, record: Record) -> Result<Vec<Record>, ConnectorError> {
        let key = record
            .get(&self.key_field)
            .ok_or_else(|| ConnectorError::MissingField(self.key_field.clone()))?;
        let body = record
            .get(&self.message_field)
            .ok_or_else(|| ConnectorError::MissingField(self.message_field.clone()))?;
        let message = Record::single(KEY_FIELD, key.clone()).with(MESSAGE_FIELD, body.clone());
        self.queue.publish(&self.topic, message)?;
        Ok(Vec::new())
    }
}

struct WordCounter {
    word_field: String,
    count_field: String,
    counts: HashMap<String, u64>,
}

#[async_trait]
impl ProcessorAdapter for WordCounter {
    async fn process(&mut self, record: Record) -> Result<Vec<Record>, ConnectorError> {
        let word = record
            .get_text(&self.word_field)
            .ok_or_else(|| ConnectorError::MissingField(self.word_field.clone()))?;
        let count = self.counts.entry(word.clone()).or_default();
        *count += 1;
        Ok(vec![Record::single(self.word_field.clone(), word)
            .with(self.count_field.clone(), *count)])
    }
}

struct FileSink {
    files: Arc<InMemoryFileStore>,
    source_dir: String,
    rotation_dir: String,
    rotate_every: usize,
    file_prefix: String,
    rotation: u32,
    written: usize,
}

impl FileSink {
    fn current_path(&self) -> String {
        join(
            &self.source_dir,
            &format!("{}-{}.txt", self.file_prefix, self.rotation),
        )
    }
}

#[async_trait]
impl ProcessorAdapter for FileSink {
    async fn process(&mut self, record: Record) -> Result<Vec<Record>, ConnectorError> {
        let line = record
            .iter()
            .map(|(field, _)| format!("{field}={}", record.get_text(field).unwrap_or_default()))
            .collect::<Vec<_>>()
            .join("|");
        self.files.append(&self.current_path(), line);
        self.written += 1;

        if self.rotate_every > 0 && self.written >= self.rotate_every {
            self.files
                .move_file(&self.current_path(), &self.rotation_dir)?;
            self.rotation += 1;
            self.written = 0;
        }
        Ok(Vec::new())
    }
}

struct TableSink {
    tables: Arc<InMemoryTableStore>,
    table: String,
    column_family: String,
    row_key_field: String,
    columns: Vec<String>,
}

#[async_trait]
impl ProcessorAdapter for TableSink {
    async fn process(&mut self, record: Record) -> Result<Vec<Record>, ConnectorError> {
        let row_key = record
            .get_text(&self.row_key_field)
            .ok_or_else(|| ConnectorError::MissingField(self.row_key_field.clone()))?;
        for column in &self.columns {
            let value = record
                .get_text(column)
                .ok_or_else(|| ConnectorError::MissingField(column.clone()))?;
            self.tables
                .put(&self.table, &row_key, &self.column_family, column, value)?;
        }
        Ok(Vec::new())
    }
}
