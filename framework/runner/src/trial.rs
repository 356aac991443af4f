use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use disk_bench_core::prelude::{ShutdownHandle, ShutdownSignalError};
use disk_bench_model::{BenchmarkConfig, ResultRecord, TrialSpec};
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::{Instant, MissedTickBehavior};

use crate::command::build_fio_args;
use crate::normalize::parse_fio_output;
use crate::platform::Platform;
use crate::progress::{ProgressObserver, ProgressUpdate, TrialPosition};

/// Prefix of the directory that holds the scratch files fio writes to.
pub const SCRATCH_DIR_PREFIX: &str = "disk_benchmark_";

const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// How the fio process ended.
#[derive(Debug)]
enum Outcome {
    Exited {
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
    TimedOut,
    Cancelled,
}

/// The fio target file for one trial. Removed when dropped, whatever happened to the trial.
struct ScratchFile(PathBuf);

impl ScratchFile {
    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => log::trace!("Removed scratch file {}", self.0.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove scratch file {}: {e}", self.0.display()),
        }
    }
}

/// Runs one fio invocation per trial and always turns the outcome into a [ResultRecord].
#[derive(Debug)]
pub struct TrialRunner {
    fio_path: PathBuf,
    platform: Platform,
    scratch_dir: TempDir,
    progress_interval: Duration,
}

impl TrialRunner {
    /// Create a runner with a fresh scratch directory.
    ///
    /// The scratch directory is created inside `parent` when given, otherwise in the system
    /// temporary directory. It is removed when the runner is dropped.
    pub fn new(fio_path: PathBuf, platform: Platform, parent: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_DIR_PREFIX);
        let scratch_dir = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        log::debug!("Using scratch directory {}", scratch_dir.path().display());

        Ok(Self {
            fio_path,
            platform,
            scratch_dir,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        })
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch_dir.path()
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub async fn run(
        &self,
        trial: TrialSpec,
        config: &BenchmarkConfig,
        position: TrialPosition,
        observer: &dyn ProgressObserver,
        shutdown: &ShutdownHandle,
    ) -> ResultRecord {
        let scratch = ScratchFile(self.scratch_dir.path().join(format!(
            "test_{}_{}",
            trial.workload_type, trial.block_size
        )));
        let args = build_fio_args(trial, config, scratch.path(), self.platform);
        log::debug!(
            "Running {trial}: {} {}",
            self.fio_path.display(),
            args.join(" ")
        );

        let target = Duration::from_secs(config.runtime_seconds);
        let timeout = config.trial_timeout();
        observer.trial_started(position, trial, target);

        let started = Instant::now();
        let outcome = self
            .execute(&args, timeout, shutdown, |elapsed| {
                observer.progress(ProgressUpdate::new(position, trial, elapsed, target))
            })
            .await;
        let wall_time_sec = started.elapsed().as_secs_f64();

        let record = classify(trial, outcome, timeout).with_wall_time(wall_time_sec);
        drop(scratch);

        observer.trial_finished(position, &record);
        record
    }

    async fn execute(
        &self,
        args: &[String],
        timeout: Duration,
        shutdown: &ShutdownHandle,
        on_tick: impl Fn(Duration),
    ) -> io::Result<Outcome> {
        let mut command = Command::new(&self.fio_path);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // fio forks one process per job. A group of its own lets them be stopped together.
        #[cfg(unix)]
        command.process_group(0);
        let mut child = command.spawn()?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("fio stdout was not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("fio stderr was not captured"))?;

        let mut shutdown_listener = shutdown.new_listener();
        let started = Instant::now();
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        let mut ticker = tokio::time::interval(self.progress_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let interrupted = {
            let completion = async {
                let mut out = Vec::new();
                let mut err = Vec::new();
                let (status, _, _) = tokio::try_join!(
                    child.wait(),
                    stdout.read_to_end(&mut out),
                    stderr.read_to_end(&mut err)
                )?;
                Ok::<_, io::Error>((status, out, err))
            };
            tokio::pin!(completion);

            loop {
                tokio::select! {
                    result = &mut completion => {
                        let (status, out, err) = result?;
                        return Ok(Outcome::Exited {
                            status,
                            stdout: String::from_utf8_lossy(&out).into_owned(),
                            stderr: String::from_utf8_lossy(&err).into_owned(),
                        });
                    }
                    _ = &mut deadline => break Outcome::TimedOut,
                    _ = shutdown_listener.wait_for_shutdown() => break Outcome::Cancelled,
                    _ = ticker.tick() => on_tick(started.elapsed()),
                }
            }
        };

        // Kill and reap so that nothing is left holding the scratch file.
        #[cfg(unix)]
        if let Some(pid) = child.id() {
            kill_process_group(pid);
        }
        if let Err(e) = child.kill().await {
            log::warn!("Failed to stop fio: {e}");
        }

        Ok(interrupted)
    }
}

/// SIGKILL every process in the group led by `pid`, including job processes fio forked.
#[cfg(unix)]
#[allow(unsafe_code)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg only sends a signal. fio was spawned with `process_group(0)`, so the group id
    // is its pid and the group holds nothing but fio and its children.
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
        log::debug!(
            "Failed to signal fio's process group {pgid}: {}",
            io::Error::last_os_error()
        );
    }
}

fn classify(trial: TrialSpec, outcome: io::Result<Outcome>, timeout: Duration) -> ResultRecord {
    match outcome {
        Ok(Outcome::Exited { status, stdout, .. }) if status.success() => {
            match parse_fio_output(&stdout, trial) {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("Could not read fio output for {trial}: {e}");
                    ResultRecord::failed(trial, e.to_string())
                }
            }
        }
        Ok(Outcome::Exited {
            status,
            stdout,
            stderr,
        }) => match parse_fio_output(&stdout, trial) {
            Ok(record) if record.has_measurements() => {
                log::warn!("fio {status} for {trial} but reported measurements, keeping them");
                record
            }
            _ => {
                let reason = match stderr.trim() {
                    "" => format!("fio {status}"),
                    trimmed => trimmed.to_string(),
                };
                log::error!("{trial} failed: {reason}");
                ResultRecord::failed(trial, reason)
            }
        },
        Ok(Outcome::TimedOut) => {
            log::error!("{trial} timed out after {}s", timeout.as_secs());
            ResultRecord::timed_out(trial)
        }
        Ok(Outcome::Cancelled) => {
            log::warn!("{trial} was cancelled");
            ResultRecord::error(trial, ShutdownSignalError::default().to_string())
        }
        Err(e) => {
            log::error!("Failed to run fio for {trial}: {e}");
            ResultRecord::error(trial, e.to_string())
        }
    }
}
