//! The test-lifecycle state machine.
//!
//! A run moves `Created → Provisioned → Submitted → Verified`, dropping to
//! `Failed` on the first fatal error, and always ends in `CleanedUp`.
//! Cleanup runs exactly once, whatever happened before it, including a
//! panic inside a collaborator.

mod report;

pub use report::{TestReport, Verdict};

use crate::context::TestContext;
use crate::core::LifecycleState;
use crate::engine::{ExecutionEngine, RunHandle};
use crate::errors::{ResourceCleanupError, SmokeTestError, SubmissionError};
use crate::events::{EventSink, NoOpEventSink, CLEANUP_FAILED_EVENT, TRANSITION_EVENT};
use crate::pipeline::TopologyAssembler;
use crate::resources::ResourceProvisioner;
use crate::scenario::SmokeTestScenario;
use crate::verify::Verifier;
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Drives one scenario from setup to cleanup.
pub struct TestLifecycle {
    context: Arc<TestContext>,
    scenario: Arc<dyn SmokeTestScenario>,
    provisioner: ResourceProvisioner,
    assembler: TopologyAssembler,
    engine: Arc<dyn ExecutionEngine>,
    verifier: Verifier,
    events: Arc<dyn EventSink>,
    state: LifecycleState,
    trace: Vec<LifecycleState>,
    run_handle: Option<RunHandle>,
    warnings: Vec<String>,
}

impl std::fmt::Debug for TestLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestLifecycle")
            .field("run_id", &self.context.run_id())
            .field("scenario", &self.scenario.name())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl TestLifecycle {
    /// Creates a lifecycle in the `Created` state.
    #[must_use]
    pub fn new(
        context: Arc<TestContext>,
        scenario: Arc<dyn SmokeTestScenario>,
        provisioner: ResourceProvisioner,
        engine: Arc<dyn ExecutionEngine>,
        verifier: Verifier,
    ) -> Self {
        Self {
            context,
            scenario,
            provisioner,
            assembler: TopologyAssembler::new(),
            engine,
            verifier,
            events: Arc::new(NoOpEventSink),
            state: LifecycleState::Created,
            trace: vec![LifecycleState::Created],
            run_handle: None,
            warnings: Vec::new(),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Returns the scenario being driven.
    #[must_use]
    pub fn scenario(&self) -> &dyn SmokeTestScenario {
        self.scenario.as_ref()
    }

    /// Runs the scenario to completion and reports the outcome.
    ///
    /// Never returns early: every failure, panics included, is folded into
    /// the report after cleanup.
    pub async fn run(mut self) -> TestReport {
        let started_at = Utc::now();
        let clock = Instant::now();
        info!(
            run_id = %self.context.run_id(),
            scenario = %self.scenario.name(),
            "Smoke test starting"
        );

        let failure = match AssertUnwindSafe(self.drive()).catch_unwind().await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(panic) => Some(SmokeTestError::Internal(panic_message(panic.as_ref()))),
        };

        if let Some(ref e) = failure {
            error!(
                run_id = %self.context.run_id(),
                state = %self.state,
                code = e.code(),
                error = %e,
                "Smoke test failed"
            );
            self.transition(LifecycleState::Failed).await;
        }

        self.stop_run().await;
        let cleanup_errors = self.cleanup().await;
        self.transition(LifecycleState::CleanedUp).await;

        let verdict = failure.as_ref().map_or(Verdict::Passed, Verdict::from);
        info!(
            run_id = %self.context.run_id(),
            passed = failure.is_none(),
            cleanup_errors = cleanup_errors.len(),
            "Smoke test finished"
        );

        TestReport {
            run_id: self.context.run_id(),
            scenario: self.scenario.name().to_string(),
            states: self.trace,
            verdict,
            cleanup_errors,
            warnings: self.warnings,
            started_at,
            finished_at: Utc::now(),
            duration_ms: u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX),
            failure,
        }
    }

    async fn drive(&mut self) -> Result<(), SmokeTestError> {
        let scenario = Arc::clone(&self.scenario);

        scenario.setup(&self.context, &self.provisioner).await?;
        self.transition(LifecycleState::Provisioned).await;

        let graph = self.assembler.build(&self.context, &scenario.pipeline())?;
        let graph_name = graph.name().to_string();
        let handle = self
            .engine
            .submit(graph)
            .await
            .map_err(|e| SubmissionError::new(graph_name, e.to_string()))?;
        info!(run_id = %self.context.run_id(), engine_run = %handle.id, "Graph accepted");
        self.run_handle = Some(handle);
        self.transition(LifecycleState::Submitted).await;

        let verified = self.verifier.verify(&scenario.expectation()).await?;
        info!(
            run_id = %self.context.run_id(),
            attempts = verified.attempts,
            elapsed_ms = u64::try_from(verified.elapsed.as_millis()).unwrap_or(u64::MAX),
            "Sink state verified"
        );
        self.transition(LifecycleState::Verified).await;
        Ok(())
    }

    async fn stop_run(&mut self) {
        let Some(handle) = self.run_handle.take() else {
            return;
        };
        let killed = AssertUnwindSafe(self.engine.kill(&handle)).catch_unwind().await;
        let problem = match killed {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(panic) => Some(panic_message(panic.as_ref())),
        };
        if let Some(problem) = problem {
            warn!(run_id = %self.context.run_id(), engine_run = %handle.id, error = %problem, "Failed to kill run");
            self.warnings
                .push(format!("failed to kill run {}: {problem}", handle.id));
        }
    }

    async fn cleanup(&mut self) -> Vec<ResourceCleanupError> {
        let cleaned = AssertUnwindSafe(self.scenario.cleanup(&self.context, &self.provisioner))
            .catch_unwind()
            .await;
        let errors = match cleaned {
            Ok(errors) => errors,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(run_id = %self.context.run_id(), error = %message, "Cleanup panicked");
                self.warnings.push(format!("cleanup panicked: {message}"));
                Vec::new()
            }
        };

        for err in &errors {
            self.events
                .emit(
                    CLEANUP_FAILED_EVENT,
                    Some(serde_json::json!({
                        "run_id": self.context.run_id(),
                        "kind": err.kind,
                        "name": err.name,
                        "error": err.source.to_string(),
                    })),
                )
                .await;
        }
        errors
    }

    async fn transition(&mut self, to: LifecycleState) {
        let from = self.state;
        if !from.can_transition_to(to) {
            warn!(from = %from, to = %to, "Unexpected lifecycle transition");
        }
        self.state = to;
        self.trace.push(to);
        info!(run_id = %self.context.run_id(), from = %from, to = %to, "Lifecycle transition");
        self.events
            .emit(
                TRANSITION_EVENT,
                Some(serde_json::json!({
                    "run_id": self.context.run_id(),
                    "from": from,
                    "to": to,
                })),
            )
            .await;
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::ComponentSpec;
    use crate::core::LifecycleState::{CleanedUp, Created, Failed, Provisioned, Submitted, Verified};
    use crate::errors::AdminError;
    use crate::events::CollectingEventSink;
    use crate::local::LocalBackend;
    use crate::pipeline::{PipelineSpec, StageDescriptor};
    use crate::resources::{ResourceKind, ResourceSet, TableReader, TableRows};
    use crate::scenario::{WordCountConfig, WordCountScenario};
    use crate::testing::{ScriptedAdmin, StaticTableReader, StubEngine, SubmitBehavior};
    use crate::verify::{Expectation, VerificationPolicy};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const WORDS: [&str; 6] = ["the", "quick", "fox", "the", "lazy", "the"];

    fn quick_policy() -> VerificationPolicy {
        VerificationPolicy::new(Duration::from_millis(100), Duration::from_millis(10))
    }

    fn word_count() -> Arc<WordCountScenario> {
        Arc::new(WordCountScenario::new(&WordCountConfig::default(), WORDS).unwrap())
    }

    fn expected_rows(scenario: &WordCountScenario) -> TableRows {
        let Expectation::TableRows { rows, .. } = scenario.expectation();
        rows
    }

    struct Harness {
        admin: Arc<ScriptedAdmin>,
        engine: Arc<StubEngine>,
        reader: Arc<StaticTableReader>,
        events: Arc<CollectingEventSink>,
    }

    impl Harness {
        fn new(engine: StubEngine) -> Self {
            Self {
                admin: Arc::new(ScriptedAdmin::new()),
                engine: Arc::new(engine),
                reader: Arc::new(StaticTableReader::default()),
                events: Arc::new(CollectingEventSink::new()),
            }
        }

        fn lifecycle(&self, scenario: Arc<dyn SmokeTestScenario>) -> TestLifecycle {
            self.lifecycle_with_reader(scenario, self.reader.clone())
        }

        fn lifecycle_with_reader(
            &self,
            scenario: Arc<dyn SmokeTestScenario>,
            reader: Arc<dyn TableReader>,
        ) -> TestLifecycle {
            let provisioner = ResourceProvisioner::new(
                self.admin.clone(),
                self.admin.clone(),
                self.admin.clone(),
            );
            TestLifecycle::new(
                TestContext::local().shared(),
                scenario,
                provisioner,
                self.engine.clone(),
                Verifier::new(reader, quick_policy()),
            )
            .with_events(self.events.clone())
        }
    }

    #[tokio::test]
    async fn test_word_count_on_local_backend() {
        let scenario = word_count();
        let backend = LocalBackend::new().with_input(scenario.input_file(), scenario.input_contents());
        let events = Arc::new(CollectingEventSink::new());

        let report = TestLifecycle::new(
            TestContext::local().shared(),
            scenario.clone(),
            backend.provisioner(),
            Arc::new(backend.engine()),
            Verifier::new(
                backend.reader(),
                VerificationPolicy::new(Duration::from_secs(5), Duration::from_millis(10)),
            ),
        )
        .with_events(events.clone())
        .run()
        .await;

        assert!(report.is_clean(), "{:?}", report.failure);
        assert_eq!(
            report.states,
            vec![Created, Provisioned, Submitted, Verified, CleanedUp]
        );
        assert_eq!(events.transitions(), vec![Provisioned, Submitted, Verified, CleanedUp]);
        assert!(backend.remaining(scenario.resources()).is_empty());
    }

    #[tokio::test]
    async fn test_passes_and_cleans_up_once() {
        let h = Harness::new(StubEngine::default());
        let scenario = word_count();
        h.reader.set_rows(expected_rows(&scenario));

        let report = h.lifecycle(scenario.clone()).run().await;

        assert!(report.passed());
        assert_eq!(h.engine.submitted(), vec!["word-count".to_string()]);
        assert_eq!(h.engine.kill_count(), 1);
        for name in scenario.resource_names() {
            assert_eq!(h.admin.delete_count(&name), 1, "{name}");
        }
        assert!(h.admin.existing().is_empty());
    }

    #[tokio::test]
    async fn test_setup_tolerates_existing_resources() {
        let h = Harness::new(StubEngine::default());
        let scenario = word_count();
        h.admin.preexisting(ResourceKind::Queue, scenario.topic_name());
        h.reader.set_rows(expected_rows(&scenario));

        let report = h.lifecycle(scenario).run().await;

        assert!(report.passed());
        assert!(h.admin.existing().is_empty());
    }

    #[tokio::test]
    async fn test_setup_failure_skips_submission_but_cleans_up() {
        let h = Harness::new(StubEngine::default());
        h.admin.fail_create(
            ResourceKind::Table,
            "WordCount",
            AdminError::Unavailable("region server down".into()),
        );

        let report = h.lifecycle(word_count()).run().await;

        assert_eq!(report.states, vec![Created, Failed, CleanedUp]);
        assert!(matches!(report.failure, Some(SmokeTestError::ResourceCreation(_))));
        assert!(h.engine.submitted().is_empty());
        assert_eq!(h.engine.kill_count(), 0);
        // The topic created before the failure is removed; the table never existed.
        assert!(h.admin.existing().is_empty());
        assert!(report.cleanup_errors.is_empty());
    }

    struct BrokenScenario {
        resources: ResourceSet,
    }

    #[async_trait::async_trait]
    impl SmokeTestScenario for BrokenScenario {
        fn name(&self) -> &str {
            "broken"
        }

        fn resources(&self) -> &ResourceSet {
            &self.resources
        }

        fn pipeline(&self) -> PipelineSpec {
            PipelineSpec::new("broken").with_stage(
                StageDescriptor::processor("count", ComponentSpec::word_counter("word", "count"))
                    .broadcast_from("later"),
            )
        }

        fn expectation(&self) -> Expectation {
            Expectation::word_counts("T", "cf", "word", "count", Vec::<String>::new())
        }

        fn topic_name(&self) -> &str {
            "topic"
        }

        fn table_name(&self) -> &str {
            "T"
        }

        fn column_family(&self) -> &str {
            "cf"
        }

        fn source_dir(&self) -> &str {
            "/tmp/"
        }

        fn destination_dir(&self) -> &str {
            "/dest/"
        }
    }

    #[tokio::test]
    async fn test_invalid_spec_never_submits() {
        let h = Harness::new(StubEngine::default());
        let scenario = Arc::new(BrokenScenario {
            resources: ResourceSet::new()
                .with(crate::resources::ResourceDescriptor::queue("topic"))
                .unwrap(),
        });

        let report = h.lifecycle(scenario).run().await;

        assert_eq!(report.states, vec![Created, Provisioned, Failed, CleanedUp]);
        assert!(matches!(report.verdict, Verdict::Failed { ref code, .. } if code == "INVALID-SPEC"));
        assert!(h.engine.submitted().is_empty());
        assert_eq!(h.admin.delete_count("topic"), 1);
    }

    #[tokio::test]
    async fn test_submission_failure() {
        let h = Harness::new(StubEngine::new(SubmitBehavior::Reject("no slots".into())));

        let report = h.lifecycle(word_count()).run().await;

        assert_eq!(report.states, vec![Created, Provisioned, Failed, CleanedUp]);
        assert!(matches!(report.failure, Some(SmokeTestError::Submission(_))));
        assert_eq!(h.engine.kill_count(), 0);
        assert!(h.admin.existing().is_empty());
    }

    #[tokio::test]
    async fn test_verification_timeout_leaks_nothing() {
        let h = Harness::new(StubEngine::default());

        let report = h.lifecycle(word_count()).run().await;

        assert_eq!(
            report.states,
            vec![Created, Provisioned, Submitted, Failed, CleanedUp]
        );
        assert!(matches!(report.failure, Some(SmokeTestError::VerificationTimeout(_))));
        assert_eq!(h.engine.kill_count(), 1);
        assert!(h.admin.existing().is_empty());
        assert_eq!(h.events.transitions().last(), Some(&CleanedUp));
    }

    /// Never answers.
    struct StalledReader;

    #[async_trait::async_trait]
    impl TableReader for StalledReader {
        async fn scan(&self, _table: &str, _cf: &str) -> Result<TableRows, AdminError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_stalled_scan_times_out_and_cleans_up() {
        let h = Harness::new(StubEngine::default());
        let lifecycle = h.lifecycle_with_reader(word_count(), Arc::new(StalledReader));

        let report = tokio::time::timeout(Duration::from_secs(3), lifecycle.run())
            .await
            .expect("lifecycle should finish despite a stalled scan");

        assert_eq!(
            report.states,
            vec![Created, Provisioned, Submitted, Failed, CleanedUp]
        );
        assert!(matches!(report.failure, Some(SmokeTestError::VerificationTimeout(_))));
        assert_eq!(h.engine.kill_count(), 1);
        assert!(h.admin.existing().is_empty());
        assert!(report.cleanup_errors.is_empty());
    }

    #[test]
    fn test_scenario_names_through_lifecycle() {
        let h = Harness::new(StubEngine::default());
        let lifecycle = h.lifecycle(word_count());

        let scenario = lifecycle.scenario();
        assert_eq!(scenario.name(), "word-count");
        assert_eq!(scenario.topic_name(), "storm-smoke-test-tmp");
        assert_eq!(scenario.table_name(), "WordCount");
        assert_eq!(scenario.column_family(), "columnFamily");
        assert_eq!(scenario.source_dir(), "/tmp/");
        assert_eq!(scenario.destination_dir(), "/dest/");
    }

    #[tokio::test]
    async fn test_delete_failure_still_deletes_the_rest() {
        let h = Harness::new(StubEngine::default());
        let scenario = word_count();
        h.reader.set_rows(expected_rows(&scenario));
        h.admin.fail_delete(
            ResourceKind::Table,
            "WordCount",
            AdminError::Unavailable("master down".into()),
        );

        let report = h.lifecycle(scenario).run().await;

        assert!(report.passed());
        assert!(!report.is_clean());
        assert_eq!(report.cleanup_errors.len(), 1);
        assert_eq!(report.cleanup_errors[0].name, "WordCount");
        assert_eq!(h.admin.existing(), vec!["WordCount".to_string()]);
        assert_eq!(h.events.events_of_type(CLEANUP_FAILED_EVENT).len(), 1);
    }

    #[tokio::test]
    async fn test_panic_in_engine_is_reported_and_cleaned_up() {
        let h = Harness::new(StubEngine::new(SubmitBehavior::Panic));

        let report = h.lifecycle(word_count()).run().await;

        assert_eq!(report.final_state(), Some(CleanedUp));
        assert!(report.reached(Failed));
        assert!(
            matches!(report.failure, Some(SmokeTestError::Internal(ref msg)) if msg.contains("engine crashed"))
        );
        assert!(h.admin.existing().is_empty());
    }

    #[tokio::test]
    async fn test_kill_failure_is_a_warning() {
        let h = Harness::new(StubEngine::default().failing_kill());
        let scenario = word_count();
        h.reader.set_rows(expected_rows(&scenario));

        let report = h.lifecycle(scenario).run().await;

        assert!(report.passed());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("failed to kill run"));
    }
}
