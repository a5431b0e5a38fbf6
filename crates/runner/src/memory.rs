use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use docbench_catalog::{Dataset, QueryExecutor};

use crate::store::{DocumentStore, ResultSet, StoreError, Submission};

/// In-process store backed by the reference executor.
///
/// Databases that were never registered behave like an empty database on a
/// real server: every collection is empty and every plan returns no rows.
#[derive(Debug, Default)]
pub struct MemoryStore {
    databases: HashMap<String, Dataset>,
    empty: Dataset,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(mut self, name: impl Into<String>, data: Dataset) -> Self {
        self.databases.insert(name.into(), data);
        self
    }

    pub fn database(&self, name: &str) -> &Dataset {
        self.databases.get(name).unwrap_or(&self.empty)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn aggregate(
        &self,
        database: &str,
        submission: Submission,
        _allow_disk_use: bool,
    ) -> Result<ResultSet, StoreError> {
        let data = self.database(database);
        debug!(
            "Running plan on {}.{} ({} documents)",
            database,
            submission.pipeline.entry,
            data.document_count()
        );
        QueryExecutor::execute(&submission.pipeline, data)
            .map(ResultSet::new)
            .map_err(|e| StoreError::Execution(e.to_string()))
    }
}
