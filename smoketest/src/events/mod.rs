//! Event emission for lifecycle observability.

mod sink;

pub use sink::{
    CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, CLEANUP_FAILED_EVENT,
    TRANSITION_EVENT,
};
