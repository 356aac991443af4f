//! Storage of benchmark results and analysis across runs.
//!
//! Results are written through a [ResultSink]. The SQLite backend also implements
//! [HistoryStore], which the statistics and comparison commands read from.

mod comparison;
mod error;
mod filter;
mod sink;
mod statistics;
mod store;

pub use comparison::{
    compare_runs, format_comparison, Delta, RunComparison, TrialComparison, COMPARED_METRICS,
    DEFAULT_THRESHOLD,
};
pub use error::StoreError;
pub use filter::{latest_comparable_runs, run_summaries_by_config};
pub use sink::{HistoryFilter, HistoryStore, QueryResult, ResultSink, StoredResult, StoredRun};
pub use statistics::{
    calculate, format_basic, format_detailed, GroupStats, Metric, MetricDetail, MetricStats,
};
pub use store::{CsvStore, JsonStore, SqliteStore, TRIAL_FILES_DIR};
