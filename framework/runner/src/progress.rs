use std::fmt::Write;
use std::time::Duration;

use disk_bench_model::{ResultRecord, TrialSpec};
use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use parking_lot::Mutex;

/// Where a trial sits in the run, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialPosition {
    pub index: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    pub position: TrialPosition,
    pub trial: TrialSpec,
    /// Never more than `target`.
    pub elapsed: Duration,
    pub target: Duration,
}

impl ProgressUpdate {
    pub fn new(
        position: TrialPosition,
        trial: TrialSpec,
        elapsed: Duration,
        target: Duration,
    ) -> Self {
        Self {
            position,
            trial,
            elapsed: elapsed.min(target),
            target,
        }
    }
}

/// Receives progress from the trial runner.
///
/// Called from the task driving the trial, so implementations must not block.
pub trait ProgressObserver: Send + Sync {
    fn trial_started(&self, position: TrialPosition, trial: TrialSpec, target: Duration);

    fn progress(&self, update: ProgressUpdate);

    fn trial_finished(&self, position: TrialPosition, record: &ResultRecord);
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn trial_started(&self, _: TrialPosition, _: TrialSpec, _: Duration) {}

    fn progress(&self, _: ProgressUpdate) {}

    fn trial_finished(&self, _: TrialPosition, _: &ResultRecord) {}
}

/// Displays a progress bar per trial to show the user how long is left.
#[derive(Default)]
pub struct BarProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl BarProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn style(target: Duration) -> ProgressStyle {
        let target_secs = target.as_secs();
        ProgressStyle::with_template(
            "{spinner:.green} {msg} [{wide_bar:.cyan/blue}] [{elapsed_precise} / {target}]",
        )
        .expect("Progress template is valid")
        .with_key(
            "target",
            move |_state: &ProgressState, w: &mut dyn Write| {
                let _ = write!(
                    w,
                    "{:02}:{:02}:{:02}",
                    target_secs / 3600,
                    (target_secs % 3600) / 60,
                    target_secs % 60
                );
            },
        )
        .progress_chars("#>-")
    }
}

impl ProgressObserver for BarProgress {
    fn trial_started(&self, position: TrialPosition, trial: TrialSpec, target: Duration) {
        let pb = ProgressBar::new(target.as_secs());
        pb.set_style(Self::style(target));
        pb.set_message(format!("[{}/{}] {trial}", position.index, position.total));

        if let Some(previous) = self.bar.lock().replace(pb) {
            previous.finish_and_clear();
        }
    }

    fn progress(&self, update: ProgressUpdate) {
        if let Some(pb) = self.bar.lock().as_ref() {
            pb.set_position(update.elapsed.as_secs());
        }
    }

    fn trial_finished(&self, position: TrialPosition, record: &ResultRecord) {
        if let Some(pb) = self.bar.lock().take() {
            pb.finish_and_clear();
        }
        log::info!(
            "[{}/{}] {} finished: {}",
            position.index,
            position.total,
            record.trial(),
            record.status
        );
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use disk_bench_model::{BlockSize, WorkloadType};

    /// Records every callback so tests can check the order of events.
    #[derive(Default)]
    pub(crate) struct RecordingProgress {
        pub(crate) events: Mutex<Vec<String>>,
        pub(crate) updates: Mutex<Vec<ProgressUpdate>>,
    }

    impl ProgressObserver for RecordingProgress {
        fn trial_started(&self, position: TrialPosition, trial: TrialSpec, _: Duration) {
            self.events
                .lock()
                .push(format!("start {}/{} {trial}", position.index, position.total));
        }

        fn progress(&self, update: ProgressUpdate) {
            self.updates.lock().push(update);
        }

        fn trial_finished(&self, position: TrialPosition, record: &ResultRecord) {
            self.events.lock().push(format!(
                "finish {}/{} {}",
                position.index, position.total, record.status
            ));
        }
    }

    #[test]
    fn elapsed_is_capped_at_target() {
        let update = ProgressUpdate::new(
            TrialPosition { index: 1, total: 3 },
            TrialSpec::new(WorkloadType::Read, BlockSize::K4),
            Duration::from_secs(20),
            Duration::from_secs(15),
        );

        assert_eq!(update.elapsed, Duration::from_secs(15));
    }

    #[test]
    fn bar_progress_clears_between_trials() {
        let progress = BarProgress::new();
        let trial = TrialSpec::new(WorkloadType::Read, BlockSize::K4);
        let position = TrialPosition { index: 1, total: 1 };

        progress.trial_started(position, trial, Duration::from_secs(10));
        progress.progress(ProgressUpdate::new(
            position,
            trial,
            Duration::from_secs(3),
            Duration::from_secs(10),
        ));
        assert!(progress.bar.lock().is_some());

        progress.trial_finished(position, &ResultRecord::timed_out(trial));
        assert!(progress.bar.lock().is_none());
    }
}
