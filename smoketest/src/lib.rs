//! # Smoketest
//!
//! An end-to-end smoke-test harness for streaming data pipelines.
//!
//! A run provisions the external resources a pipeline needs, assembles and
//! submits the pipeline, waits for the expected sink state, and always tears
//! the resources down again:
//!
//! - **Resources**: idempotent setup and exhaustive cleanup of topics, tables
//!   and file-store directories
//! - **Pipelines**: declarative stage graphs validated into executable graphs
//! - **Lifecycle**: a state machine with exactly-once cleanup and a report
//! - **Local backend**: in-memory stores and a tokio engine for running
//!   scenarios without clusters
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use smoketest::prelude::*;
//!
//! let scenario = WordCountScenario::new(&WordCountConfig::default(), ["a", "b", "a"])?;
//! let backend = LocalBackend::new().with_input(scenario.input_file(), scenario.input_contents());
//!
//! let report = TestLifecycle::new(
//!     TestContext::local().shared(),
//!     Arc::new(scenario),
//!     backend.provisioner(),
//!     Arc::new(backend.engine()),
//!     Verifier::new(backend.reader(), VerificationPolicy::default()),
//! )
//! .run()
//! .await;
//! assert!(report.passed());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod connectors;
pub mod context;
pub mod core;
pub mod engine;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod local;
pub mod logging;
pub mod pipeline;
pub mod resources;
pub mod scenario;
pub mod testing;
pub mod verify;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::SmokeTestConfig;
    pub use crate::connectors::{ComponentSpec, ConnectorFactory};
    pub use crate::context::TestContext;
    pub use crate::core::{Grouping, LifecycleState, Record, StageRole};
    pub use crate::engine::{ExecutionEngine, RunHandle};
    pub use crate::errors::{
        AdminError, InvalidSpecError, ResourceCleanupError, ResourceCreationError,
        SmokeTestError, SubmissionError, VerificationMismatchError, VerificationTimeoutError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::lifecycle::{TestLifecycle, TestReport, Verdict};
    pub use crate::local::LocalBackend;
    pub use crate::pipeline::{ExecutableGraph, PipelineSpec, StageDescriptor, TopologyAssembler};
    pub use crate::resources::{ResourceDescriptor, ResourceKind, ResourceProvisioner, ResourceSet};
    pub use crate::scenario::{SmokeTestScenario, WordCountConfig, WordCountScenario};
    pub use crate::verify::{Expectation, VerificationPolicy, Verifier};
    pub use std::sync::Arc;
}
