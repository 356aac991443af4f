use std::sync::Arc;

use disk_bench_core::prelude::ShutdownHandle;
use disk_bench_model::{BenchmarkConfig, ConfigError, ResultRecord, RunSummary};
use tokio::time::Instant;

use crate::matrix::expand;
use crate::progress::{NoProgress, ProgressObserver, TrialPosition};
use crate::trial::TrialRunner;

/// Everything a benchmark run produced.
#[derive(Debug, Clone)]
pub struct BenchmarkRun {
    pub summary: RunSummary,
    /// One record per trial that was started, in matrix order.
    pub records: Vec<ResultRecord>,
}

/// Drives every trial of the expanded matrix, one after another.
pub struct BenchmarkExecutor {
    config: BenchmarkConfig,
    runner: TrialRunner,
    shutdown: ShutdownHandle,
    observer: Arc<dyn ProgressObserver>,
    fio_version: Option<String>,
}

impl BenchmarkExecutor {
    pub fn new(config: BenchmarkConfig, runner: TrialRunner, shutdown: ShutdownHandle) -> Self {
        Self {
            config,
            runner,
            shutdown,
            observer: Arc::new(NoProgress),
            fio_version: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The fio version recorded in the run summary.
    pub fn with_fio_version(mut self, fio_version: Option<String>) -> Self {
        self.fio_version = fio_version;
        self
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Run the whole matrix.
    ///
    /// A failing trial never stops the run, its record is kept and the next trial starts. After a
    /// shutdown signal no further trials are started and the records collected so far are
    /// returned.
    pub async fn run_all(&self) -> Result<BenchmarkRun, ConfigError> {
        self.config.validate()?;
        let trials = expand(&self.config);
        if trials.is_empty() {
            return Err(ConfigError::EmptyMatrix);
        }

        let total = trials.len();
        let mut summary = RunSummary::new(
            nanoid::nanoid!(),
            chrono::Utc::now().timestamp(),
            self.config.clone(),
            total,
            self.fio_version.clone(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        log::info!(
            "Starting run {} in {} mode with {total} trials of {}s each",
            summary.run_id,
            self.config.mode,
            self.config.runtime_seconds
        );

        let started = Instant::now();
        let mut records = Vec::with_capacity(total);
        for (i, trial) in trials.into_iter().enumerate() {
            if self.shutdown.is_shutdown() {
                log::warn!(
                    "Shutdown requested, skipping the remaining {} trials",
                    total - i
                );
                break;
            }

            let position = TrialPosition { index: i + 1, total };
            let record = self
                .runner
                .run(
                    trial,
                    &self.config,
                    position,
                    self.observer.as_ref(),
                    &self.shutdown,
                )
                .await;
            records.push(record);
        }

        summary.finish(&records, started.elapsed().as_secs_f64());
        log::info!(
            "Run {} finished {} of {total} trials ({} not OK) in {:.1}s",
            summary.run_id,
            records.len(),
            summary.failed_count,
            summary.total_wall_time_sec
        );

        Ok(BenchmarkRun { summary, records })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::platform::Platform;
    use crate::progress::tests::RecordingProgress;
    use disk_bench_model::{BlockSize, Mode, TrialSpec, TrialStatus, WorkloadType};
    use pretty_assertions::assert_eq;
    use std::os::unix::fs::PermissionsExt as _;
    use std::path::Path;

    /// Fails the randwrite trial and reports one read IOP for everything else.
    const SCRIPT: &str = r#"#!/bin/sh
case "$*" in
  *--rw=randwrite*) echo "fio: randwrite unsupported" >&2; exit 1;;
esac
echo '{"jobs":[{"read":{"iops":1.0},"job_runtime":1000}]}'
"#;

    fn install_script(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("fio");
        std::fs::write(&path, SCRIPT).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn executor(dir: &Path, config: BenchmarkConfig, shutdown: ShutdownHandle) -> BenchmarkExecutor {
        let runner = TrialRunner::new(install_script(dir), Platform::POSIX, Some(dir)).unwrap();
        BenchmarkExecutor::new(config, runner, shutdown)
    }

    #[tokio::test]
    async fn runs_every_trial_in_order_despite_failures() {
        let dir = tempfile::tempdir().unwrap();
        let progress = Arc::new(RecordingProgress::default());
        let config = BenchmarkConfig {
            mode: Mode::Test,
            runtime_seconds: 1,
            ..Default::default()
        };

        let run = executor(dir.path(), config, ShutdownHandle::new())
            .with_observer(progress.clone())
            .with_fio_version(Some("fio-3.36".to_string()))
            .run_all()
            .await
            .unwrap();

        let trials = run.records.iter().map(|r| r.trial()).collect::<Vec<_>>();
        assert_eq!(
            trials,
            vec![
                TrialSpec::new(WorkloadType::Randread, BlockSize::K4),
                TrialSpec::new(WorkloadType::Randwrite, BlockSize::K64),
                TrialSpec::new(WorkloadType::Read, BlockSize::M1),
            ]
        );
        assert_eq!(run.records[0].status, TrialStatus::Ok);
        assert_eq!(
            run.records[1].status,
            TrialStatus::Failed("fio: randwrite unsupported".to_string())
        );
        assert_eq!(run.records[2].status, TrialStatus::Ok);

        assert_eq!(run.summary.trial_count, 3);
        assert_eq!(run.summary.failed_count, 1);
        assert_eq!(run.summary.fio_version.as_deref(), Some("fio-3.36"));
        assert!(!run.summary.run_id.is_empty());

        assert_eq!(
            *progress.events.lock(),
            vec![
                "start 1/3 randread (4k)".to_string(),
                "finish 1/3 OK".to_string(),
                "start 2/3 randwrite (64k)".to_string(),
                "finish 2/3 FAILED: fio: randwrite unsupported".to_string(),
                "start 3/3 read (1M)".to_string(),
                "finish 3/3 OK".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn invalid_config_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = BenchmarkConfig {
            mode: Mode::Individual,
            ..Default::default()
        };

        let err = executor(dir.path(), config, ShutdownHandle::new())
            .run_all()
            .await
            .unwrap_err();

        assert_eq!(err, ConfigError::IndividualModeIncomplete);
    }

    #[tokio::test]
    async fn trim_only_with_large_blocks_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = BenchmarkConfig {
            mode: Mode::Individual,
            workload_types: vec![WorkloadType::Trim],
            block_sizes: vec![BlockSize::M1],
            ..Default::default()
        };

        let err = executor(dir.path(), config, ShutdownHandle::new())
            .run_all()
            .await
            .unwrap_err();

        assert_eq!(err, ConfigError::EmptyMatrix);
    }

    #[tokio::test]
    async fn shutdown_before_start_returns_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let shutdown = ShutdownHandle::new();
        shutdown.shutdown();
        let config = BenchmarkConfig {
            mode: Mode::Test,
            ..Default::default()
        };

        let run = executor(dir.path(), config, shutdown).run_all().await.unwrap();

        assert!(run.records.is_empty());
        assert_eq!(run.summary.trial_count, 3);
        assert_eq!(run.summary.failed_count, 0);
    }
}
