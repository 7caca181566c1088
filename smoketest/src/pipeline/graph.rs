//! The executable graph handed to execution engines.

use super::{PipelineSpec, StageInput};
use crate::connectors::ComponentSpec;
use crate::context::TestContext;
use crate::core::StageRole;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// One stage of an executable graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    /// Stage name.
    pub name: String,
    /// Stage role.
    pub role: StageRole,
    /// Number of instances the engine starts.
    pub parallelism: u32,
    /// Connector configuration.
    pub component: ComponentSpec,
    /// Incoming edges.
    pub upstream: Vec<StageInput>,
    /// Names of stages reading from this one, in declaration order.
    pub downstream: Vec<String>,
}

/// A validated, wired processing graph. Opaque to the orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutableGraph {
    id: Uuid,
    name: String,
    context: TestContext,
    nodes: Vec<GraphNode>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl ExecutableGraph {
    /// Wires a spec that already passed validation.
    pub(super) fn from_validated(ctx: &TestContext, spec: &PipelineSpec) -> Self {
        let mut nodes: Vec<GraphNode> = spec
            .stages
            .iter()
            .map(|stage| GraphNode {
                name: stage.name.clone(),
                role: stage.role,
                parallelism: stage.parallelism,
                component: stage.component.clone(),
                upstream: stage.inputs.clone(),
                downstream: Vec::new(),
            })
            .collect();

        let index: HashMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.name.clone(), i))
            .collect();

        for stage in &spec.stages {
            for input in &stage.inputs {
                if let Some(&upstream) = index.get(&input.stage) {
                    nodes[upstream].downstream.push(stage.name.clone());
                }
            }
        }

        Self {
            id: Uuid::new_v4(),
            name: spec.name.clone(),
            context: ctx.clone(),
            nodes,
            index,
        }
    }

    /// Returns the graph ID.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the graph name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the context connectors are bound to.
    #[must_use]
    pub fn context(&self) -> &TestContext {
        &self.context
    }

    /// Returns nodes in declaration order (a topological order).
    #[must_use]
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Looks up a node.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&GraphNode> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    /// Iterates over source nodes.
    pub fn sources(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(|n| n.role == StageRole::Source)
    }

    /// Returns the total number of stage instances.
    #[must_use]
    pub fn instance_count(&self) -> u32 {
        self.nodes.iter().map(|n| n.parallelism).sum()
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.upstream.len()).sum()
    }
}
