//! In-process execution engine.
//!
//! Each stage instance runs as its own tokio task. Every non-source instance
//! owns an unbounded inbox, and every instance holds a sender to each
//! instance of each downstream stage, which is exactly broadcast grouping.
//! Instances stop when their run's token is cancelled or, for processors,
//! when every upstream sender has been dropped.

use crate::cancellation::CancellationToken;
use crate::connectors::{ConnectorFactory, ProcessorAdapter, SourceAdapter};
use crate::core::{Record, StageRole};
use crate::engine::{ExecutionEngine, RunHandle};
use crate::errors::EngineError;
use crate::pipeline::ExecutableGraph;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

const DEFAULT_IDLE_WAIT: Duration = Duration::from_millis(20);

struct Outputs(Vec<UnboundedSender<Record>>);

impl Outputs {
    fn emit(&self, record: &Record) {
        for tx in &self.0 {
            // A closed inbox means the downstream instance already stopped.
            let _ = tx.send(record.clone());
        }
    }
}

enum Instance {
    Source {
        stage: String,
        adapter: Box<dyn SourceAdapter>,
        outputs: Outputs,
    },
    Processor {
        stage: String,
        adapter: Box<dyn ProcessorAdapter>,
        inbox: UnboundedReceiver<Record>,
        outputs: Outputs,
    },
}

struct LocalRun {
    token: Arc<CancellationToken>,
    tasks: Vec<JoinHandle<()>>,
}

/// Runs graphs on the current tokio runtime.
pub struct LocalEngine {
    factory: Arc<dyn ConnectorFactory>,
    idle_wait: Duration,
    runs: DashMap<Uuid, LocalRun>,
}

impl LocalEngine {
    /// Creates an engine that builds adapters with the given factory.
    #[must_use]
    pub fn new(factory: Arc<dyn ConnectorFactory>) -> Self {
        Self {
            factory,
            idle_wait: DEFAULT_IDLE_WAIT,
            runs: DashMap::new(),
        }
    }

    /// Sets how long idle instances wait before checking for work again.
    #[must_use]
    pub fn with_idle_wait(mut self, idle_wait: Duration) -> Self {
        self.idle_wait = idle_wait;
        self
    }

    /// Returns the number of runs that have not been killed.
    #[must_use]
    pub fn active_runs(&self) -> usize {
        self.runs.len()
    }

    fn instantiate(&self, graph: &ExecutableGraph) -> Result<Vec<Instance>, EngineError> {
        let ctx = graph.context();
        let mut senders: HashMap<&str, Vec<UnboundedSender<Record>>> = HashMap::new();
        let mut inboxes: HashMap<&str, Vec<UnboundedReceiver<Record>>> = HashMap::new();

        for node in graph.nodes().iter().filter(|n| n.role != StageRole::Source) {
            let (txs, rxs): (Vec<_>, Vec<_>) =
                (0..node.parallelism).map(|_| unbounded_channel()).unzip();
            senders.insert(node.name.as_str(), txs);
            inboxes.insert(node.name.as_str(), rxs);
        }

        let mut instances = Vec::with_capacity(graph.instance_count() as usize);
        for node in graph.nodes() {
            let outputs = || {
                Outputs(
                    node.downstream
                        .iter()
                        .filter_map(|name| senders.get(name.as_str()))
                        .flatten()
                        .cloned()
                        .collect(),
                )
            };
            let rejected = |instance: u32, err: crate::errors::ConnectorError| {
                EngineError::Rejected(format!(
                    "stage '{}' instance {instance}: {err}",
                    node.name
                ))
            };

            if node.role == StageRole::Source {
                for instance in 0..node.parallelism {
                    let adapter = self
                        .factory
                        .source(ctx, &node.name, instance, &node.component)
                        .map_err(|e| rejected(instance, e))?;
                    instances.push(Instance::Source {
                        stage: node.name.clone(),
                        adapter,
                        outputs: outputs(),
                    });
                }
            } else {
                let node_inboxes = inboxes.remove(node.name.as_str()).unwrap_or_default();
                for (instance, inbox) in (0..node.parallelism).zip(node_inboxes) {
                    let adapter = self
                        .factory
                        .processor(ctx, &node.name, instance, &node.component)
                        .map_err(|e| rejected(instance, e))?;
                    instances.push(Instance::Processor {
                        stage: node.name.clone(),
                        adapter,
                        inbox,
                        outputs: outputs(),
                    });
                }
            }
        }
        Ok(instances)
    }
}

impl std::fmt::Debug for LocalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEngine")
            .field("idle_wait", &self.idle_wait)
            .field("active_runs", &self.runs.len())
            .finish_non_exhaustive()
    }
}

async fn run_source(
    stage: String,
    mut adapter: Box<dyn SourceAdapter>,
    outputs: Outputs,
    token: Arc<CancellationToken>,
    idle_wait: Duration,
) {
    while !token.is_cancelled() {
        match adapter.poll().await {
            Ok(Some(batch)) if batch.is_empty() => tokio::time::sleep(idle_wait).await,
            Ok(Some(batch)) => batch.iter().for_each(|record| outputs.emit(record)),
            Ok(None) => {
                debug!(stage = %stage, "Source exhausted");
                break;
            }
            Err(e) => {
                warn!(stage = %stage, error = %e, "Source poll failed");
                tokio::time::sleep(idle_wait).await;
            }
        }
    }
}

async fn run_processor(
    stage: String,
    mut adapter: Box<dyn ProcessorAdapter>,
    mut inbox: UnboundedReceiver<Record>,
    outputs: Outputs,
    token: Arc<CancellationToken>,
    idle_wait: Duration,
) {
    while !token.is_cancelled() {
        match tokio::time::timeout(idle_wait, inbox.recv()).await {
            Ok(Some(record)) => match adapter.process(record).await {
                Ok(emitted) => emitted.iter().for_each(|record| outputs.emit(record)),
                Err(e) => warn!(stage = %stage, error = %e, "Record dropped"),
            },
            Ok(None) => {
                debug!(stage = %stage, "All upstream instances finished");
                break;
            }
            Err(_) => {}
        }
    }
}

#[async_trait]
impl ExecutionEngine for LocalEngine {
    async fn submit(&self, graph: ExecutableGraph) -> Result<RunHandle, EngineError> {
        let instances = self.instantiate(&graph)?;
        let handle = RunHandle::new(graph.name());
        let token = Arc::new(CancellationToken::new());

        let tasks = instances
            .into_iter()
            .map(|instance| {
                let token = Arc::clone(&token);
                match instance {
                    Instance::Source {
                        stage,
                        adapter,
                        outputs,
                    } => tokio::spawn(run_source(stage, adapter, outputs, token, self.idle_wait)),
                    Instance::Processor {
                        stage,
                        adapter,
                        inbox,
                        outputs,
                    } => tokio::spawn(run_processor(
                        stage,
                        adapter,
                        inbox,
                        outputs,
                        token,
                        self.idle_wait,
                    )),
                }
            })
            .collect::<Vec<_>>();

        info!(
            run_id = %handle.id,
            graph = %graph.name(),
            instances = tasks.len(),
            "Graph submitted"
        );
        self.runs.insert(handle.id, LocalRun { token, tasks });
        Ok(handle)
    }

    async fn kill(&self, handle: &RunHandle) -> Result<(), EngineError> {
        let (_, run) = self
            .runs
            .remove(&handle.id)
            .ok_or(EngineError::UnknownRun(handle.id))?;

        run.token.cancel("run killed");
        for task in run.tasks {
            if let Err(e) = task.await {
                warn!(run_id = %handle.id, error = %e, "Stage instance did not exit cleanly");
            }
        }
        info!(run_id = %handle.id, graph = %handle.graph, "Run killed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::ComponentSpec;
    use crate::context::TestContext;
    use crate::local::{InMemoryFileStore, InMemoryQueue, InMemoryTableStore, LocalConnectorFactory};
    use crate::pipeline::{PipelineSpec, StageDescriptor, TopologyAssembler};
    use crate::resources::{TableAdmin, TableReader};
    use pretty_assertions::assert_eq;

    fn engine(tables: Arc<InMemoryTableStore>, input: &str) -> LocalEngine {
        let factory = LocalConnectorFactory::new(
            Arc::new(InMemoryQueue::new()),
            tables,
            Arc::new(InMemoryFileStore::new()),
        )
        .with_input("words.txt", input);
        LocalEngine::new(Arc::new(factory)).with_idle_wait(Duration::from_millis(5))
    }

    fn counting_graph(sources: u32) -> ExecutableGraph {
        let spec = PipelineSpec::new("count")
            .with_stage(
                StageDescriptor::source("words", ComponentSpec::file_source("words.txt", "word"))
                    .with_parallelism(sources),
            )
            .with_stage(
                StageDescriptor::processor("counter", ComponentSpec::word_counter("word", "count"))
                    .broadcast_from("words"),
            )
            .with_stage(
                StageDescriptor::sink(
                    "table",
                    ComponentSpec::table_sink("T", "cf", "word", ["word", "count"]),
                )
                .broadcast_from("counter"),
            );
        TopologyAssembler::new()
            .build(&TestContext::local(), &spec)
            .unwrap()
    }

    async fn wait_for_rows(tables: &InMemoryTableStore, rows: usize) {
        for _ in 0..200 {
            if tables.scan("T", "cf").await.unwrap().len() >= rows {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_runs_graph_until_sinks_are_written() {
        let tables = Arc::new(InMemoryTableStore::new());
        tables.create_table("T", "cf").await.unwrap();
        let engine = engine(tables.clone(), "a b a c");

        let handle = engine.submit(counting_graph(1)).await.unwrap();
        assert_eq!(engine.active_runs(), 1);
        wait_for_rows(&tables, 3).await;
        engine.kill(&handle).await.unwrap();

        let rows = tables.scan("T", "cf").await.unwrap();
        assert_eq!(rows["a"]["count"], "2");
        assert_eq!(rows["c"]["count"], "1");
        assert_eq!(engine.active_runs(), 0);
    }

    #[tokio::test]
    async fn test_broadcast_merges_every_upstream_instance() {
        let tables = Arc::new(InMemoryTableStore::new());
        tables.create_table("T", "cf").await.unwrap();
        let engine = engine(tables.clone(), "a");

        let handle = engine.submit(counting_graph(3)).await.unwrap();
        for _ in 0..200 {
            let rows = tables.scan("T", "cf").await.unwrap();
            if rows.get("a").is_some_and(|row| row["count"] == "3") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        engine.kill(&handle).await.unwrap();

        // Three source instances each read the file once.
        let rows = tables.scan("T", "cf").await.unwrap();
        assert_eq!(rows["a"]["count"], "3");
    }

    #[tokio::test]
    async fn test_submit_rejects_unbuildable_graph() {
        let tables = Arc::new(InMemoryTableStore::new());
        let factory = LocalConnectorFactory::new(
            Arc::new(InMemoryQueue::new()),
            tables,
            Arc::new(InMemoryFileStore::new()),
        );
        let engine = LocalEngine::new(Arc::new(factory));

        let err = engine.submit(counting_graph(1)).await.unwrap_err();
        assert!(matches!(err, EngineError::Rejected(ref msg) if msg.contains("words.txt")));
        assert_eq!(engine.active_runs(), 0);
    }

    #[tokio::test]
    async fn test_kill_unknown_run() {
        let engine = engine(Arc::new(InMemoryTableStore::new()), "");
        let err = engine.kill(&RunHandle::new("ghost")).await.unwrap_err();
        assert!(matches!(err, EngineError::UnknownRun(_)));
    }
}
