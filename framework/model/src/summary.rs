use crate::config::BenchmarkConfig;
use crate::record::ResultRecord;
use serde::{Deserialize, Serialize};
use sha3::Digest;
use std::io::{BufRead, Read, Write};
use std::path::Path;

/// Summary of a benchmark run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// The unique run id
    ///
    /// Chosen by the runner. Unique for each run and stored alongside every result row.
    pub run_id: String,
    /// The time the run started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    /// The configuration that the run was started with
    pub config: BenchmarkConfig,
    /// The number of trials in the expanded matrix
    pub trial_count: usize,
    /// The number of trials that did not finish with an OK status
    pub failed_count: usize,
    /// Wall time for the whole run, in seconds
    pub total_wall_time_sec: f64,
    /// The first line of `fio --version`, if it could be determined
    pub fio_version: Option<String>,
    /// The version of disk-bench that produced this run
    pub disk_bench_version: String,
}

impl RunSummary {
    /// Create a new run summary, before any trial has finished
    pub fn new(
        run_id: String,
        started_at: i64,
        config: BenchmarkConfig,
        trial_count: usize,
        fio_version: Option<String>,
        disk_bench_version: String,
    ) -> Self {
        Self {
            run_id,
            started_at,
            config,
            trial_count,
            failed_count: 0,
            total_wall_time_sec: 0.0,
            fio_version,
            disk_bench_version,
        }
    }

    /// Record the outcome of the run
    pub fn finish(&mut self, records: &[ResultRecord], total_wall_time_sec: f64) {
        self.failed_count = records.iter().filter(|r| !r.status.is_ok()).count();
        self.total_wall_time_sec = total_wall_time_sec;
    }

    /// Compute a fingerprint for this run summary
    ///
    /// The fingerprint identifies runs whose results can be compared with each other. It uses the
    ///     - Benchmark parameters that shape the fio invocations
    ///     - Selected workload types and block sizes
    ///     - fio version
    ///
    /// The timeout is left out because it does not change what is measured.
    ///
    /// The fingerprint is computed using [sha3::Sha3_256].
    pub fn fingerprint(&self) -> String {
        let config = &self.config;
        let mut hasher = sha3::Sha3_256::new();
        Digest::update(&mut hasher, config.mode.as_str().as_bytes());
        Digest::update(&mut hasher, config.file_size.as_bytes());
        Digest::update(&mut hasher, config.runtime_seconds.to_le_bytes());
        Digest::update(&mut hasher, config.io_depth.to_le_bytes());
        Digest::update(&mut hasher, config.num_jobs.to_le_bytes());
        for flag in [
            config.direct_io,
            config.sync_each_op,
            config.ssd_mode,
            config.hdd_mode,
            config.high_concurrency,
        ] {
            Digest::update(&mut hasher, [flag as u8]);
        }
        config.workload_types.iter().for_each(|w| {
            Digest::update(&mut hasher, w.as_str().as_bytes());
        });
        config.block_sizes.iter().for_each(|b| {
            Digest::update(&mut hasher, b.as_str().as_bytes());
        });
        if let Some(fio_version) = &self.fio_version {
            Digest::update(&mut hasher, fio_version.as_bytes());
        }

        format!("{:x}", hasher.finalize())
    }
}

/// Append the run summary to a file
///
/// The summary will be serialized to JSON and output as a single line followed by a newline. The
/// recommended file extension is `.jsonl`.
pub fn append_run_summary(run_summary: &RunSummary, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    store_run_summary(run_summary, &mut file)?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Serialize the run summary to a writer
pub fn store_run_summary<W: Write>(run_summary: &RunSummary, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer(writer, run_summary)?;
    Ok(())
}

/// Load a run summary from a reader
pub fn load_run_summary<R: Read>(reader: R) -> anyhow::Result<RunSummary> {
    let reader = std::io::BufReader::new(reader);
    let run_summary: RunSummary = serde_json::from_reader(reader)?;
    Ok(run_summary)
}

/// Load run summaries from a file
///
/// The file should contain one JSON object per line. This is the format produced by
/// [append_run_summary]. Blank lines are skipped.
pub fn load_summary_runs(path: &Path) -> anyhow::Result<Vec<RunSummary>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut runs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let run: RunSummary = serde_json::from_str(&line)?;
        runs.push(run);
    }
    Ok(runs)
}
