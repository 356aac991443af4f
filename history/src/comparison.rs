use std::fmt::Write;

use anyhow::bail;
use disk_bench_model::{BlockSize, ResultRecord, WorkloadType};
use serde::Serialize;

use crate::statistics::Metric;

/// Relative change, as a fraction, at which a difference is reported as significant.
pub const DEFAULT_THRESHOLD: f64 = 0.1;

/// Throughput and latency are compared. Timings are expected to differ between runs.
pub const COMPARED_METRICS: [Metric; 6] = [
    Metric::ReadIops,
    Metric::WriteIops,
    Metric::ReadBw,
    Metric::WriteBw,
    Metric::ReadLatencyUs,
    Metric::WriteLatencyUs,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delta {
    pub metric: Metric,
    pub absolute: f64,
    /// Percent of the first run's value. Zero if the first run measured zero.
    pub percent: f64,
    pub significant: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialComparison {
    pub workload_type: WorkloadType,
    pub block_size: BlockSize,
    pub deltas: Vec<Delta>,
}

impl TrialComparison {
    pub fn has_significant_change(&self) -> bool {
        self.deltas.iter().any(|d| d.significant)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunComparison {
    pub threshold: f64,
    /// One entry per trial of the first run that also ran in the second, in the first run's order.
    pub trials: Vec<TrialComparison>,
}

impl RunComparison {
    pub fn significant_changes(&self) -> impl Iterator<Item = &TrialComparison> {
        self.trials.iter().filter(|t| t.has_significant_change())
    }
}

/// Compare the results of two runs trial by trial.
///
/// Each trial of `run1` is matched with the first trial of `run2` with the same workload type and
/// block size. Trials without a match are skipped.
pub fn compare_runs(
    run1: &[ResultRecord],
    run2: &[ResultRecord],
    threshold: f64,
) -> anyhow::Result<RunComparison> {
    if run1.is_empty() || run2.is_empty() {
        bail!("Cannot compare empty runs");
    }

    let trials = run1
        .iter()
        .filter_map(|first| {
            let second = run2.iter().find(|r| r.trial() == first.trial())?;

            let deltas = COMPARED_METRICS
                .iter()
                .map(|metric| {
                    let before = metric.value(first);
                    let absolute = metric.value(second) - before;
                    let percent = if before != 0.0 {
                        absolute / before * 100.0
                    } else {
                        0.0
                    };

                    Delta {
                        metric: *metric,
                        absolute,
                        percent,
                        significant: percent.abs() >= threshold * 100.0,
                    }
                })
                .collect();

            Some(TrialComparison {
                workload_type: first.workload_type,
                block_size: first.block_size,
                deltas,
            })
        })
        .collect();

    Ok(RunComparison { threshold, trials })
}

pub fn format_comparison(comparison: &RunComparison) -> String {
    let mut out = format!("Run Comparison\n{}", "=".repeat(100));

    for trial in &comparison.trials {
        let _ = write!(out, "\n\n{} ({}):", trial.workload_type, trial.block_size);

        if trial.has_significant_change() {
            out.push_str("\n  [SIGNIFICANT CHANGES]");
            for delta in trial.deltas.iter().filter(|d| d.significant) {
                let _ = write!(
                    out,
                    "\n    {}: {:+.2} ({:+.1}%)",
                    delta.metric.as_str(),
                    delta.absolute,
                    delta.percent
                );
            }
        } else {
            for delta in &trial.deltas {
                let _ = write!(
                    out,
                    "\n  {}: {:+.2} ({:+.1}%)",
                    delta.metric.as_str(),
                    delta.absolute,
                    delta.percent
                );
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use disk_bench_model::{TrialSpec, TrialStatus};
    use pretty_assertions::assert_eq;

    fn record(
        workload_type: WorkloadType,
        block_size: BlockSize,
        read_iops: f64,
        read_latency_us: f64,
    ) -> ResultRecord {
        let mut record = ResultRecord::zeroed(
            TrialSpec::new(workload_type, block_size),
            TrialStatus::Ok,
        );
        record.read_iops = read_iops;
        record.read_latency_us = read_latency_us;
        record
    }

    #[test]
    fn flags_changes_at_or_above_threshold() {
        let run1 = vec![
            record(WorkloadType::Randread, BlockSize::K4, 1000.0, 50.0),
            record(WorkloadType::Read, BlockSize::M1, 200.0, 800.0),
        ];
        let run2 = vec![
            record(WorkloadType::Read, BlockSize::M1, 210.0, 800.0),
            record(WorkloadType::Randread, BlockSize::K4, 750.0, 62.5),
        ];

        let comparison = compare_runs(&run1, &run2, DEFAULT_THRESHOLD).unwrap();

        assert_eq!(comparison.trials.len(), 2);
        let randread = &comparison.trials[0];
        assert_eq!(randread.workload_type, WorkloadType::Randread);
        assert_eq!(
            randread.deltas[0],
            Delta {
                metric: Metric::ReadIops,
                absolute: -250.0,
                percent: -25.0,
                significant: true,
            }
        );
        assert!(randread.deltas[4].significant);
        assert_eq!(randread.deltas[4].percent, 25.0);

        let read = &comparison.trials[1];
        assert_eq!(read.deltas[0].percent, 5.0);
        assert!(!read.has_significant_change());

        assert_eq!(comparison.significant_changes().count(), 1);
    }

    #[test]
    fn zero_baseline_is_never_significant() {
        let run1 = vec![record(WorkloadType::Write, BlockSize::K64, 0.0, 0.0)];
        let run2 = vec![record(WorkloadType::Write, BlockSize::K64, 500.0, 10.0)];

        let comparison = compare_runs(&run1, &run2, 0.0001).unwrap();

        let delta = &comparison.trials[0].deltas[0];
        assert_eq!(delta.absolute, 500.0);
        assert_eq!(delta.percent, 0.0);
        assert!(!delta.significant);
    }

    #[test]
    fn unmatched_trials_are_skipped() {
        let run1 = vec![record(WorkloadType::Trim, BlockSize::K4, 10.0, 1.0)];
        let run2 = vec![record(WorkloadType::Read, BlockSize::K4, 10.0, 1.0)];

        let comparison = compare_runs(&run1, &run2, DEFAULT_THRESHOLD).unwrap();

        assert!(comparison.trials.is_empty());
        assert_eq!(format_comparison(&comparison).lines().count(), 2);
    }

    #[test]
    fn empty_runs_cannot_be_compared() {
        let run = vec![record(WorkloadType::Read, BlockSize::K4, 10.0, 1.0)];

        let err = compare_runs(&run, &[], DEFAULT_THRESHOLD).unwrap_err();
        assert_eq!(err.to_string(), "Cannot compare empty runs");
    }

    #[test]
    fn formats_significant_and_unchanged_trials() {
        let run1 = vec![
            record(WorkloadType::Randread, BlockSize::K4, 1000.0, 50.0),
            record(WorkloadType::Read, BlockSize::M1, 200.0, 800.0),
        ];
        let run2 = vec![
            record(WorkloadType::Randread, BlockSize::K4, 1500.0, 50.0),
            record(WorkloadType::Read, BlockSize::M1, 200.0, 800.0),
        ];

        let comparison = compare_runs(&run1, &run2, DEFAULT_THRESHOLD).unwrap();
        let text = format_comparison(&comparison);
        let lines = text.lines().collect::<Vec<_>>();

        let rule = "=".repeat(100);
        assert_eq!(
            lines,
            vec![
                "Run Comparison",
                rule.as_str(),
                "",
                "randread (4k):",
                "  [SIGNIFICANT CHANGES]",
                "    read_iops: +500.00 (+50.0%)",
                "",
                "read (1M):",
                "  read_iops: +0.00 (+0.0%)",
                "  write_iops: +0.00 (+0.0%)",
                "  read_bw: +0.00 (+0.0%)",
                "  write_bw: +0.00 (+0.0%)",
                "  read_latency_us: +0.00 (+0.0%)",
                "  write_latency_us: +0.00 (+0.0%)",
            ]
        );
    }
}
