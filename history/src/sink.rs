use disk_bench_model::{BlockSize, ResultRecord, RunSummary, WorkloadType};
use serde::Serialize;

use crate::error::StoreError;

/// Persists the records of a finished run.
pub trait ResultSink {
    fn save(&self, run: &RunSummary, records: &[ResultRecord]) -> Result<(), StoreError>;
}

/// A store that can be queried for earlier runs.
pub trait HistoryStore: ResultSink {
    /// The most recent results, newest first.
    fn history(&self, limit: usize) -> Result<Vec<StoredResult>, StoreError>;

    /// Results matching `filter`, newest first.
    fn query(&self, filter: &HistoryFilter) -> Result<Vec<StoredResult>, StoreError>;

    /// Run arbitrary SQL against the store.
    fn custom_query(&self, sql: &str) -> Result<QueryResult, StoreError>;

    /// The most recent runs, newest first.
    fn runs(&self, limit: usize) -> Result<Vec<StoredRun>, StoreError>;

    /// Results of one run, in the order the trials ran.
    fn run_records(&self, run_id: &str) -> Result<Vec<StoredResult>, StoreError>;
}

/// A result row read back from a store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredResult {
    pub id: i64,
    /// `YYYY-MM-DD HH:MM:SS` in UTC.
    pub timestamp: String,
    /// Absent for rows written before runs were tracked.
    pub run_id: Option<String>,
    pub mode: String,
    pub file_size: String,
    pub runtime_seconds: i64,
    #[serde(flatten)]
    pub record: ResultRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRun {
    pub run_id: String,
    pub timestamp: String,
    pub mode: String,
    pub file_size: String,
    pub runtime_seconds: i64,
    pub trial_count: usize,
    pub failed_count: usize,
}

/// Restricts the rows returned by [HistoryStore::query]. Empty lists do not filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    /// Inclusive lower bound, compared as text against the stored timestamp.
    pub after: Option<String>,
    /// Inclusive upper bound, compared as text against the stored timestamp.
    pub before: Option<String>,
    pub workload_types: Vec<WorkloadType>,
    pub block_sizes: Vec<BlockSize>,
    pub limit: Option<usize>,
}

/// Rows returned by [HistoryStore::custom_query], with values in column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}
