//! Test doubles for driving a lifecycle without real services.
//!
//! This module provides:
//! - A scripted admin client with recorded calls and injectable failures
//! - A stub execution engine that can reject or panic on submit
//! - A table reader serving fixed rows

mod mocks;

pub use mocks::{AdminCall, ScriptedAdmin, StaticTableReader, StubEngine, SubmitBehavior};
