use async_trait::async_trait;
use bson::Document;

use docbench_catalog::{lower, Pipeline};

/// Rows produced by one fully drained aggregation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub rows: Vec<Document>,
}

impl ResultSet {
    pub fn new(rows: Vec<Document>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A plan ready to send: the stage tree plus its lowered aggregation stages.
///
/// Built before the clock starts, so translation never counts towards a
/// measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub pipeline: Pipeline,
    pub stages: Vec<Document>,
}

impl Submission {
    pub fn new(pipeline: Pipeline) -> Self {
        let stages = lower(&pipeline);
        Self { pipeline, stages }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("connection failure: {0}")]
    Connection(String),

    /// The store rejected or failed the pipeline.
    #[error("execution failure: {0}")]
    Execution(String),

    /// The plan could not be turned into the store's pipeline language.
    #[error("lowering failure: {0}")]
    Lowering(String),
}

/// A document store that can run an aggregation plan against one database.
///
/// Implementations read `submission.pipeline.entry` to pick the collection and
/// must only return once every result row has been pulled from the store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn name(&self) -> &str;

    async fn aggregate(
        &self,
        database: &str,
        submission: Submission,
        allow_disk_use: bool,
    ) -> Result<ResultSet, StoreError>;
}
