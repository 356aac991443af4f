mod config;
mod output;
mod record;
mod size;
mod summary;
mod trial;

pub use config::{
    BenchmarkConfig, BlockSize, ConfigError, Mode, WorkloadType, QUICK_FILE_SIZE,
    QUICK_RUNTIME_SECS, TIMEOUT_GRACE_SECS,
};
pub use output::{OutputFormat, PlotType, StorageBackend};
pub use record::{ResultRecord, TrialStatus, CPU_NOT_AVAILABLE};
pub use size::{parse_size, SizeParseError};
pub use summary::{
    append_run_summary, load_run_summary, load_summary_runs, store_run_summary, RunSummary,
};
pub use trial::TrialSpec;
