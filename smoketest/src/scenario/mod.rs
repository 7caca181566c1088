//! Test scenarios: what a run provisions, runs and expects.
//!
//! A scenario is the per-test capability set the lifecycle drives. Setup and
//! cleanup default to provisioning the scenario's resources; scenarios with
//! extra preparation override them.

mod word_count;

pub use word_count::{WordCountConfig, WordCountScenario, COUNT_FIELD, WORD_FIELD};

use crate::context::TestContext;
use crate::errors::{ResourceCleanupError, ResourceCreationError};
use crate::pipeline::PipelineSpec;
use crate::resources::{ResourceProvisioner, ResourceSet};
use crate::verify::Expectation;
use async_trait::async_trait;

/// A smoke test the lifecycle can run.
#[async_trait]
pub trait SmokeTestScenario: Send + Sync {
    /// Scenario name, used in reports and logs.
    fn name(&self) -> &str;

    /// Resources that must exist while the pipeline runs.
    fn resources(&self) -> &ResourceSet;

    /// Declares the pipeline to assemble.
    fn pipeline(&self) -> PipelineSpec;

    /// The sink state a passing run reaches.
    fn expectation(&self) -> Expectation;

    /// Queue topic the pipeline publishes to and subscribes from.
    fn topic_name(&self) -> &str;

    /// Table the pipeline writes results into.
    fn table_name(&self) -> &str;

    /// Column family of the result table.
    fn column_family(&self) -> &str;

    /// File-store directory sinks write into.
    fn source_dir(&self) -> &str;

    /// File-store directory written files are rotated into.
    fn destination_dir(&self) -> &str;

    /// Creates the scenario's resources.
    async fn setup(
        &self,
        ctx: &TestContext,
        provisioner: &ResourceProvisioner,
    ) -> Result<(), ResourceCreationError> {
        provisioner.setup(ctx, self.resources()).await
    }

    /// Deletes the scenario's resources, collecting every failure.
    async fn cleanup(
        &self,
        ctx: &TestContext,
        provisioner: &ResourceProvisioner,
    ) -> Vec<ResourceCleanupError> {
        provisioner.cleanup(ctx, self.resources()).await
    }

    /// Names of all resources, in provisioning order.
    fn resource_names(&self) -> Vec<String> {
        self.resources().iter().map(|r| r.name.clone()).collect()
    }
}
