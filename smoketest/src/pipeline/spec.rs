//! Pipeline and stage descriptions.

use crate::connectors::ComponentSpec;
use crate::core::{Grouping, StageRole};
use serde::{Deserialize, Serialize};

/// An upstream stage feeding a stage, with its grouping policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageInput {
    /// Name of the upstream stage.
    pub stage: String,
    /// How upstream records reach this stage's instances.
    #[serde(default)]
    pub grouping: Grouping,
}

impl StageInput {
    /// Creates a broadcast input.
    #[must_use]
    pub fn broadcast(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            grouping: Grouping::Broadcast,
        }
    }
}

/// Description of a single stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDescriptor {
    /// The unique name of the stage.
    pub name: String,
    /// The role of the stage.
    pub role: StageRole,
    /// Number of parallel instances.
    pub parallelism: u32,
    /// Upstream stages, without duplicates.
    #[serde(default)]
    pub inputs: Vec<StageInput>,
    /// What the stage runs.
    pub component: ComponentSpec,
}

impl StageDescriptor {
    /// Creates a stage with one instance and no inputs.
    #[must_use]
    pub fn new(name: impl Into<String>, role: StageRole, component: ComponentSpec) -> Self {
        Self {
            name: name.into(),
            role,
            parallelism: 1,
            inputs: Vec::new(),
            component,
        }
    }

    /// Creates a source stage.
    #[must_use]
    pub fn source(name: impl Into<String>, component: ComponentSpec) -> Self {
        Self::new(name, StageRole::Source, component)
    }

    /// Creates a processor stage.
    #[must_use]
    pub fn processor(name: impl Into<String>, component: ComponentSpec) -> Self {
        Self::new(name, StageRole::Processor, component)
    }

    /// Creates a sink stage.
    #[must_use]
    pub fn sink(name: impl Into<String>, component: ComponentSpec) -> Self {
        Self::new(name, StageRole::Sink, component)
    }

    /// Sets the parallelism.
    #[must_use]
    pub fn with_parallelism(mut self, parallelism: u32) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Adds a broadcast input. Adding the same upstream twice is a no-op.
    #[must_use]
    pub fn broadcast_from(mut self, stage: impl Into<String>) -> Self {
        let stage = stage.into();
        if !self.inputs.iter().any(|input| input.stage == stage) {
            self.inputs.push(StageInput::broadcast(stage));
        }
        self
    }

    /// Returns true if the stage reads from `upstream`.
    #[must_use]
    pub fn reads_from(&self, upstream: &str) -> bool {
        self.inputs.iter().any(|input| input.stage == upstream)
    }
}

/// An ordered description of a processing graph.
///
/// Order matters: a stage may only read from stages declared before it,
/// which keeps the graph acyclic by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// The pipeline name.
    pub name: String,
    /// Stages in declaration order.
    #[serde(default)]
    pub stages: Vec<StageDescriptor>,
}

impl PipelineSpec {
    /// Creates an empty pipeline specification.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Appends a stage.
    #[must_use]
    pub fn with_stage(mut self, stage: StageDescriptor) -> Self {
        self.stages.push(stage);
        self
    }

    /// Looks up a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageDescriptor> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the pipeline has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> ComponentSpec {
        ComponentSpec::word_counter("word", "count")
    }

    #[test]
    fn test_stage_descriptor_creation() {
        let stage = StageDescriptor::processor("wordCount", counter())
            .with_parallelism(3)
            .broadcast_from("kafkaSpout");

        assert_eq!(stage.name, "wordCount");
        assert_eq!(stage.role, StageRole::Processor);
        assert_eq!(stage.parallelism, 3);
        assert_eq!(stage.inputs, vec![StageInput::broadcast("kafkaSpout")]);
        assert!(stage.reads_from("kafkaSpout"));
    }

    #[test]
    fn test_inputs_behave_as_a_set() {
        let stage = StageDescriptor::processor("wordCount", counter())
            .broadcast_from("a")
            .broadcast_from("a")
            .broadcast_from("b");

        assert_eq!(stage.inputs.len(), 2);
    }

    #[test]
    fn test_pipeline_spec_lookup() {
        let spec = PipelineSpec::new("p")
            .with_stage(StageDescriptor::source(
                "words",
                ComponentSpec::file_source("words.txt", "word"),
            ))
            .with_stage(StageDescriptor::processor("count", counter()).broadcast_from("words"));

        assert_eq!(spec.len(), 2);
        assert!(spec.stage("count").is_some());
        assert!(spec.stage("missing").is_none());
    }

    #[test]
    fn test_spec_deserializes_with_default_grouping() {
        let spec: PipelineSpec = serde_json::from_value(serde_json::json!({
            "name": "p",
            "stages": [{
                "name": "count",
                "role": "processor",
                "parallelism": 1,
                "inputs": [{"stage": "words"}],
                "component": {"type": "word_counter", "word_field": "word", "count_field": "count"}
            }]
        }))
        .unwrap();

        assert_eq!(spec.stages[0].inputs[0].grouping, Grouping::Broadcast);
    }
}
