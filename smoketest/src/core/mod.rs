//! Core domain model types for the harness.
//!
//! This module contains the fundamental types shared by every layer:
//! - Stage roles and grouping policies
//! - Lifecycle states
//! - The record type flowing between stage instances

mod record;
mod status;

pub use record::Record;
pub use status::{Grouping, LifecycleState, StageRole};
