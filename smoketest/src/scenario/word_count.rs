//! The word-count smoke test.
//!
//! Words are read from a staged file, pushed through a queue topic, counted,
//! and written both to rotated files and to a table with one row per word.

use super::SmokeTestScenario;
use crate::connectors::ComponentSpec;
use crate::errors::InvalidResourceError;
use crate::pipeline::{PipelineSpec, StageDescriptor};
use crate::resources::{ResourceDescriptor, ResourceSet};
use crate::verify::Expectation;
use serde::{Deserialize, Serialize};

/// Field carrying a word between stages.
pub const WORD_FIELD: &str = "word";

/// Field carrying a running count.
pub const COUNT_FIELD: &str = "count";

/// Names and knobs of the word-count scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCountConfig {
    /// Queue topic between the two halves of the pipeline.
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Table receiving the counts.
    #[serde(default = "default_table")]
    pub table: String,

    /// Column family of the table.
    #[serde(default = "default_column_family")]
    pub column_family: String,

    /// Directory the file sink writes into.
    #[serde(default = "default_source_dir")]
    pub source_dir: String,

    /// Directory rotated files are moved into.
    #[serde(default = "default_destination_dir")]
    pub destination_dir: String,

    /// Input file read by the word source.
    #[serde(default = "default_input_file")]
    pub input_file: String,

    /// Records per file before the file sink rotates.
    #[serde(default = "default_rotate_every")]
    pub rotate_every: usize,
}

fn default_topic() -> String {
    "storm-smoke-test-tmp".to_string()
}

fn default_table() -> String {
    "WordCount".to_string()
}

fn default_column_family() -> String {
    "columnFamily".to_string()
}

fn default_source_dir() -> String {
    "/tmp/".to_string()
}

fn default_destination_dir() -> String {
    "/dest/".to_string()
}

fn default_input_file() -> String {
    "words.txt".to_string()
}

fn default_rotate_every() -> usize {
    100
}

impl Default for WordCountConfig {
    fn default() -> Self {
        Self {
            topic: default_topic(),
            table: default_table(),
            column_family: default_column_family(),
            source_dir: default_source_dir(),
            destination_dir: default_destination_dir(),
            input_file: default_input_file(),
            rotate_every: default_rotate_every(),
        }
    }
}

/// Word count over a known word list.
#[derive(Debug, Clone)]
pub struct WordCountScenario {
    config: WordCountConfig,
    words: Vec<String>,
    resources: ResourceSet,
}

impl WordCountScenario {
    /// Creates the scenario and its resource set.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured name is not a legal resource name.
    pub fn new<I, S>(config: &WordCountConfig, words: I) -> Result<Self, InvalidResourceError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let resources = ResourceSet::new()
            .with(ResourceDescriptor::queue(&config.topic))?
            .with(ResourceDescriptor::table(&config.table, &config.column_family))?
            .with(ResourceDescriptor::directory(&config.source_dir))?
            .with(ResourceDescriptor::directory(&config.destination_dir))?;

        Ok(Self {
            config: config.clone(),
            words: words.into_iter().map(Into::into).collect(),
            resources,
        })
    }

    /// Returns the input file path.
    #[must_use]
    pub fn input_file(&self) -> &str {
        &self.config.input_file
    }

    /// Returns the words fed through the pipeline.
    #[must_use]
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Returns the input file contents, one word per line.
    #[must_use]
    pub fn input_contents(&self) -> String {
        self.words.join("\n")
    }
}

impl SmokeTestScenario for WordCountScenario {
    fn name(&self) -> &str {
        "word-count"
    }

    fn resources(&self) -> &ResourceSet {
        &self.resources
    }

    fn topic_name(&self) -> &str {
        &self.config.topic
    }

    fn table_name(&self) -> &str {
        &self.config.table
    }

    fn column_family(&self) -> &str {
        &self.config.column_family
    }

    fn source_dir(&self) -> &str {
        &self.config.source_dir
    }

    fn destination_dir(&self) -> &str {
        &self.config.destination_dir
    }

    fn pipeline(&self) -> PipelineSpec {
        let c = &self.config;
        PipelineSpec::new(self.name())
            .with_stage(StageDescriptor::source(
                "randomWords",
                ComponentSpec::file_source(&c.input_file, WORD_FIELD),
            ))
            .with_stage(
                StageDescriptor::processor(
                    "writeToKafka",
                    ComponentSpec::queue_publisher(&c.topic, WORD_FIELD, WORD_FIELD),
                )
                .broadcast_from("randomWords"),
            )
            .with_stage(StageDescriptor::source(
                "kafkaSpout",
                ComponentSpec::queue_subscriber(&c.topic, WORD_FIELD),
            ))
            .with_stage(
                StageDescriptor::processor(
                    "wordCount",
                    ComponentSpec::word_counter(WORD_FIELD, COUNT_FIELD),
                )
                .broadcast_from("kafkaSpout"),
            )
            .with_stage(
                StageDescriptor::sink(
                    "hdfsBolt",
                    ComponentSpec::file_sink(&c.source_dir, &c.destination_dir, c.rotate_every),
                )
                .broadcast_from("wordCount"),
            )
            .with_stage(
                StageDescriptor::sink(
                    "hbaseBolt",
                    ComponentSpec::table_sink(
                        &c.table,
                        &c.column_family,
                        WORD_FIELD,
                        [WORD_FIELD, COUNT_FIELD],
                    ),
                )
                .broadcast_from("wordCount"),
            )
    }

    fn expectation(&self) -> Expectation {
        Expectation::word_counts(
            &self.config.table,
            &self.config.column_family,
            WORD_FIELD,
            COUNT_FIELD,
            &self.words,
        )
    }
}
