//! Bounded verification of sink-store state.
//!
//! The verifier only sees what sinks wrote. It polls the table until the
//! rows match the expectation, the rows can no longer converge, or the
//! timeout elapses.

use crate::errors::{SmokeTestError, VerificationMismatchError, VerificationTimeoutError};
use crate::resources::{TableReader, TableRows};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// How long and how often to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationPolicy {
    /// Upper bound on total waiting.
    pub timeout: Duration,
    /// Pause between polls.
    pub poll_interval: Duration,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl VerificationPolicy {
    /// Creates a policy.
    #[must_use]
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }
}

/// The observable state a run must reach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expectation {
    /// A column family must hold exactly these rows (extra columns ignored).
    TableRows {
        /// Table to scan.
        table: String,
        /// Column family to scan.
        column_family: String,
        /// Expected rows.
        rows: TableRows,
    },
}

impl Expectation {
    /// Expects one row per distinct word whose count column equals its
    /// number of occurrences.
    #[must_use]
    pub fn word_counts<I, S>(
        table: impl Into<String>,
        column_family: impl Into<String>,
        word_column: &str,
        count_column: &str,
        words: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for word in words {
            *counts.entry(word.as_ref().to_string()).or_default() += 1;
        }

        let rows = counts
            .into_iter()
            .map(|(word, count)| {
                let columns = BTreeMap::from([
                    (word_column.to_string(), word.clone()),
                    (count_column.to_string(), count.to_string()),
                ]);
                (word, columns)
            })
            .collect();

        Self::TableRows {
            table: table.into(),
            column_family: column_family.into(),
            rows,
        }
    }
}

/// Result of comparing one observation against an expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    /// Observed state equals the expectation.
    Match,
    /// Not there yet, but may still converge.
    Pending {
        /// Expected rows not observed yet.
        missing_rows: usize,
        /// Differences among rows that are present.
        differences: Vec<String>,
    },
    /// Can never converge: counters only grow and rows are never removed.
    Diverged(Vec<String>),
}

/// Compares observed rows against expected rows.
///
/// Numeric values are treated as monotonically growing counters: an
/// observed value above the expected one is a divergence, below it is
/// still pending.
#[must_use]
pub fn compare(expected: &TableRows, observed: &TableRows) -> Comparison {
    let mut diverged = Vec::new();
    let mut differences = Vec::new();

    for key in observed.keys() {
        if !expected.contains_key(key) {
            diverged.push(format!("unexpected row '{key}'"));
        }
    }

    let mut missing_rows = 0;
    for (key, columns) in expected {
        let Some(actual) = observed.get(key) else {
            missing_rows += 1;
            continue;
        };
        for (column, want) in columns {
            match actual.get(column) {
                Some(got) if got == want => {}
                Some(got) => {
                    let message = format!("row '{key}' column '{column}': expected {want}, got {got}");
                    match (want.parse::<u64>(), got.parse::<u64>()) {
                        (Ok(w), Ok(g)) if g > w => diverged.push(message),
                        _ => differences.push(message),
                    }
                }
                None => differences.push(format!("row '{key}' lacks column '{column}'")),
            }
        }
    }

    if !diverged.is_empty() {
        Comparison::Diverged(diverged)
    } else if missing_rows == 0 && differences.is_empty() {
        Comparison::Match
    } else {
        Comparison::Pending {
            missing_rows,
            differences,
        }
    }
}

/// Successful verification summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verified {
    /// Number of polls it took.
    pub attempts: u32,
    /// Time spent polling.
    pub elapsed: Duration,
}

/// Polls a table until it matches an expectation.
#[derive(Clone)]
pub struct Verifier {
    reader: Arc<dyn TableReader>,
    policy: VerificationPolicy,
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Verifier {
    /// Creates a verifier.
    #[must_use]
    pub fn new(reader: Arc<dyn TableReader>, policy: VerificationPolicy) -> Self {
        Self { reader, policy }
    }

    /// Returns the polling policy.
    #[must_use]
    pub fn policy(&self) -> VerificationPolicy {
        self.policy
    }

    /// Waits for the expectation to hold.
    ///
    /// Scan failures count as "not there yet" so a slow sink does not fail
    /// the run early. Each scan is bounded by the time left in the policy.
    ///
    /// # Errors
    ///
    /// Returns `VerificationMismatch` as soon as the rows diverge, or when the
    /// timeout elapses with every expected row present but some values wrong.
    /// Returns `VerificationTimeout` when the timeout elapses with rows still
    /// missing.
    pub async fn verify(&self, expectation: &Expectation) -> Result<Verified, SmokeTestError> {
        let Expectation::TableRows {
            table,
            column_family,
            rows,
        } = expectation;

        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let remaining = self.policy.timeout.saturating_sub(started.elapsed());
            let scan = tokio::time::timeout(remaining, self.reader.scan(table, column_family)).await;
            let last = match scan {
                Ok(Ok(observed)) => match compare(rows, &observed) {
                    Comparison::Match => {
                        let elapsed = started.elapsed();
                        info!(table = %table, attempts, ?elapsed, "Verification succeeded");
                        return Ok(Verified { attempts, elapsed });
                    }
                    Comparison::Diverged(differences) => {
                        return Err(VerificationMismatchError::new(differences).into());
                    }
                    Comparison::Pending {
                        missing_rows,
                        differences,
                    } => {
                        debug!(table = %table, attempts, missing_rows, "Expected rows not there yet");
                        LastObservation::Pending {
                            missing_rows,
                            differences,
                        }
                    }
                },
                Ok(Err(e)) => {
                    debug!(table = %table, attempts, error = %e, "Scan failed");
                    LastObservation::ScanFailed(e.to_string())
                }
                Err(_) => {
                    debug!(table = %table, attempts, "Scan did not return before the deadline");
                    LastObservation::ScanFailed("scan timed out".to_string())
                }
            };

            let elapsed = started.elapsed();
            if elapsed >= self.policy.timeout {
                return Err(last.into_error(self.policy.timeout, attempts));
            }
            let pause = self.policy.poll_interval.min(self.policy.timeout - elapsed);
            tokio::time::sleep(pause).await;
        }
    }
}

enum LastObservation {
    Pending {
        missing_rows: usize,
        differences: Vec<String>,
    },
    ScanFailed(String),
}

impl LastObservation {
    fn into_error(self, timeout: Duration, attempts: u32) -> SmokeTestError {
        match self {
            Self::Pending {
                missing_rows: 0,
                differences,
            } => VerificationMismatchError::new(differences).into(),
            Self::Pending { missing_rows, .. } => VerificationTimeoutError {
                timeout,
                attempts,
                last_observation: format!("{missing_rows} expected rows missing"),
            }
            .into(),
            Self::ScanFailed(reason) => VerificationTimeoutError {
                timeout,
                attempts,
                last_observation: format!("scan failed: {reason}"),
            }
            .into(),
        }
    }
}
