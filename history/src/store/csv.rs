use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use disk_bench_model::{ResultRecord, RunSummary};

use crate::error::StoreError;
use crate::sink::ResultSink;

/// Writes each run to its own `benchmark_<timestamp>.csv` file in the results directory.
///
/// The file starts with `#` comment lines describing the run, followed by a blank line and the
/// result table.
pub struct CsvStore {
    results_dir: PathBuf,
}

impl CsvStore {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
        }
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub(crate) fn save_at(
        &self,
        now: DateTime<Local>,
        run: &RunSummary,
        records: &[ResultRecord],
    ) -> Result<PathBuf, StoreError> {
        std::fs::create_dir_all(&self.results_dir).map_err(StoreError::io(&self.results_dir))?;

        let timestamp = now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
        let path = self
            .results_dir
            .join(format!("benchmark_{}.csv", timestamp.replace(':', "-")));

        let file = std::fs::File::create(&path).map_err(StoreError::io(&path))?;
        let mut writer = std::io::BufWriter::new(file);

        let config = &run.config;
        let header = [
            "# Disk I/O Benchmark Results".to_string(),
            format!("# Timestamp: {timestamp}"),
            format!("# Mode: {}", config.mode),
            format!("# File Size: {}", config.file_size),
            format!("# Runtime: {}s", config.runtime_seconds),
            format!("# SSD: {}", config.ssd_mode),
            format!("# Concurrency: {}", config.high_concurrency),
            String::new(),
        ];
        for line in header {
            writeln!(writer, "{line}").map_err(StoreError::io(&path))?;
        }

        disk_bench_report::write_csv(records, &mut writer)?;
        writer.flush().map_err(StoreError::io(&path))?;

        Ok(path)
    }
}

impl ResultSink for CsvStore {
    fn save(&self, run: &RunSummary, records: &[ResultRecord]) -> Result<(), StoreError> {
        let path = self.save_at(Local::now(), run, records)?;
        log::info!("Results saved to {}", path.display());
        Ok(())
    }
}
