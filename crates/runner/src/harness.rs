//! Timed execution of one catalog query against a document store.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use docbench_catalog::compile;

use crate::store::{DocumentStore, Submission};

/// Outcome of one timed run.
#[derive(Debug, Clone, PartialEq)]
pub enum Measurement {
    /// Time from submission until the last row was drained.
    Completed { elapsed: Duration, rows: usize },
    /// The id has no plan; the store was never contacted.
    Unimplemented,
    /// The store failed the query; the error has already been logged.
    Failed,
}

impl Measurement {
    /// Elapsed milliseconds, or 0.0 for both sentinels.
    pub fn millis(&self) -> f64 {
        match self {
            Measurement::Completed { elapsed, .. } => elapsed.as_secs_f64() * 1000.0,
            Measurement::Unimplemented | Measurement::Failed => 0.0,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Measurement::Completed { .. })
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.millis())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Harness {
    pub allow_disk_use: bool,
}

impl Default for Harness {
    fn default() -> Self {
        Self {
            allow_disk_use: true,
        }
    }
}

impl Harness {
    pub fn new(allow_disk_use: bool) -> Self {
        Self { allow_disk_use }
    }

    pub async fn run(&self, store: &dyn DocumentStore, database: &str, query_id: i64) -> Measurement {
        let pipeline = match compile(query_id) {
            Ok(p) => p,
            Err(e) => {
                debug!("Skipping query {}: {}", query_id, e);
                return Measurement::Unimplemented;
            }
        };

        let submission = Submission::new(pipeline);

        let start = Instant::now();
        match store.aggregate(database, submission, self.allow_disk_use).await {
            Ok(result) => {
                let elapsed = start.elapsed();
                debug!(
                    "Query {} on {} returned {} rows in {:?}",
                    query_id,
                    store.name(),
                    result.len(),
                    elapsed
                );
                Measurement::Completed {
                    elapsed,
                    rows: result.len(),
                }
            }
            Err(e) => {
                error!("Error running query {}: {}", query_id, e);
                Measurement::Failed
            }
        }
    }
}

/// Run one query with disk spill permitted.
pub async fn run(store: &dyn DocumentStore, database: &str, query_id: i64) -> Measurement {
    Harness::default().run(store, database, query_id).await
}
