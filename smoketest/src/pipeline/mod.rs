//! Pipeline description and topology assembly.
//!
//! This module provides:
//! - Stage and pipeline specifications
//! - Spec validation and graph assembly
//! - The executable graph handed to execution engines

mod assembler;
mod graph;
mod spec;

pub use assembler::{validate, TopologyAssembler};
pub use graph::{ExecutableGraph, GraphNode};
pub use spec::{PipelineSpec, StageDescriptor, StageInput};
