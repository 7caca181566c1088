//! Validates pipeline specs and assembles executable graphs.

use super::{ExecutableGraph, PipelineSpec};
use crate::context::TestContext;
use crate::errors::InvalidSpecError;
use std::collections::HashSet;
use tracing::debug;

/// Turns a [`PipelineSpec`] into an [`ExecutableGraph`].
///
/// Assembly is pure: it performs no I/O against queues or stores and only
/// records the configuration connector factories use at submission time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopologyAssembler;

impl TopologyAssembler {
    /// Creates a new assembler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validates and wires a spec.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidSpecError`] naming the first offending stage.
    pub fn build(
        &self,
        ctx: &TestContext,
        spec: &PipelineSpec,
    ) -> Result<ExecutableGraph, InvalidSpecError> {
        validate(spec)?;
        let graph = ExecutableGraph::from_validated(ctx, spec);
        debug!(
            run_id = %ctx.run_id(),
            graph = %graph.name(),
            nodes = graph.nodes().len(),
            edges = graph.edge_count(),
            instances = graph.instance_count(),
            "Assembled topology"
        );
        Ok(graph)
    }
}

/// Checks the structural invariants of a spec.
///
/// Stages are checked in declaration order; every input must name a stage
/// declared earlier, which rules out cycles.
///
/// # Errors
///
/// Returns the first violation found.
pub fn validate(spec: &PipelineSpec) -> Result<(), InvalidSpecError> {
    if spec.is_empty() {
        return Err(InvalidSpecError::new(
            "SPEC-EMPTY",
            format!("Pipeline '{}' has no stages", spec.name),
        )
        .with_fix_hint("Add at least one source stage."));
    }

    let declared: HashSet<&str> = spec.stages.iter().map(|s| s.name.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::new();

    for stage in &spec.stages {
        let name = stage.name.as_str();

        if name.trim().is_empty() {
            return Err(InvalidSpecError::new("SPEC-NAME", "Stage names cannot be empty")
                .with_stage(name));
        }

        if !seen.insert(name) {
            return Err(InvalidSpecError::new(
                "SPEC-DUPLICATE",
                format!("Stage '{name}' is declared more than once"),
            )
            .with_stage(name)
            .with_fix_hint("Give every stage a unique name."));
        }

        if stage.parallelism == 0 {
            return Err(InvalidSpecError::new(
                "SPEC-PARALLELISM",
                format!("Stage '{name}' must run at least one instance"),
            )
            .with_stage(name));
        }

        if !stage.component.supports_role(stage.role) {
            return Err(InvalidSpecError::new(
                "SPEC-ROLE",
                format!(
                    "Stage '{name}' runs a {} which cannot act as a {}",
                    stage.component.type_name(),
                    stage.role
                ),
            )
            .with_stage(name)
            .with_context_entry("component", stage.component.type_name()));
        }

        if !stage.role.requires_inputs() && !stage.inputs.is_empty() {
            return Err(InvalidSpecError::new(
                "SPEC-SOURCE-INPUT",
                format!("Source '{name}' cannot have inputs"),
            )
            .with_stage(name));
        }

        if stage.role.requires_inputs() && stage.inputs.is_empty() {
            return Err(InvalidSpecError::new(
                "SPEC-NO-INPUT",
                format!("Stage '{name}' is a {} without inputs", stage.role),
            )
            .with_stage(name)
            .with_fix_hint("Add at least one upstream stage."));
        }

        for input in &stage.inputs {
            let upstream = input.stage.as_str();
            if upstream != name && seen.contains(upstream) {
                continue;
            }

            let err = if upstream == name || declared.contains(upstream) {
                InvalidSpecError::new(
                    "SPEC-FORWARD-INPUT",
                    format!("Stage '{name}' reads from '{upstream}' which is not declared before it"),
                )
                .with_fix_hint("Declare upstream stages first; cycles are not allowed.")
            } else {
                InvalidSpecError::new(
                    "SPEC-UNKNOWN-INPUT",
                    format!("Stage '{name}' reads from unknown stage '{upstream}'"),
                )
                .with_fix_hint("Check the input for typos.")
            };
            return Err(err.with_stage(name).with_context_entry("input", upstream));
        }
    }

    Ok(())
}
