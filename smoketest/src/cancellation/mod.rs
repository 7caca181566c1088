//! Cooperative cancellation for running graphs.

mod token;

pub use token::CancellationToken;
