use std::fmt::Write;

use anyhow::Context;
use disk_bench_model::{BlockSize, ResultRecord, WorkloadType};
use itertools::Itertools;
use polars::prelude::*;
use serde::Serialize;

/// The measurements that statistics are calculated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    ReadIops,
    WriteIops,
    ReadBw,
    WriteBw,
    ReadLatencyUs,
    WriteLatencyUs,
    IoTimeSec,
    WallTimeSec,
}

impl Metric {
    pub const ALL: [Metric; 8] = [
        Metric::ReadIops,
        Metric::WriteIops,
        Metric::ReadBw,
        Metric::WriteBw,
        Metric::ReadLatencyUs,
        Metric::WriteLatencyUs,
        Metric::IoTimeSec,
        Metric::WallTimeSec,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::ReadIops => "read_iops",
            Metric::WriteIops => "write_iops",
            Metric::ReadBw => "read_bw",
            Metric::WriteBw => "write_bw",
            Metric::ReadLatencyUs => "read_latency_us",
            Metric::WriteLatencyUs => "write_latency_us",
            Metric::IoTimeSec => "io_time_sec",
            Metric::WallTimeSec => "wall_time_sec",
        }
    }

    pub fn value(&self, record: &ResultRecord) -> f64 {
        match self {
            Metric::ReadIops => record.read_iops,
            Metric::WriteIops => record.write_iops,
            Metric::ReadBw => record.read_bw as f64,
            Metric::WriteBw => record.write_bw as f64,
            Metric::ReadLatencyUs => record.read_latency_us,
            Metric::WriteLatencyUs => record.write_latency_us,
            Metric::IoTimeSec => record.io_time_sec,
            Metric::WallTimeSec => record.wall_time_sec,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricStats {
    pub metric: Metric,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// Only calculated for detailed statistics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<MetricDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDetail {
    /// Sample standard deviation. Not defined for a single value.
    pub std: Option<f64>,
    pub q25: f64,
    pub q75: f64,
    pub count: usize,
}

/// Statistics for all results of one workload type and block size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub workload_type: WorkloadType,
    pub block_size: BlockSize,
    pub metrics: Vec<MetricStats>,
}

impl GroupStats {
    /// `randread_4k`
    pub fn key(&self) -> String {
        format!("{}_{}", self.workload_type, self.block_size)
    }
}

/// Calculate statistics per workload type and block size.
///
/// Groups appear in the order their workload type was first seen, and within a workload type in
/// the order the block size was first seen.
pub fn calculate(records: &[ResultRecord], detailed: bool) -> anyhow::Result<Vec<GroupStats>> {
    let mut groups = Vec::new();

    for workload_type in records.iter().map(|r| r.workload_type).unique() {
        let of_type = records
            .iter()
            .filter(|r| r.workload_type == workload_type)
            .collect::<Vec<_>>();

        for block_size in of_type.iter().map(|r| r.block_size).unique() {
            let subset = of_type
                .iter()
                .filter(|r| r.block_size == block_size)
                .copied()
                .collect::<Vec<_>>();

            groups.push(GroupStats {
                workload_type,
                block_size,
                metrics: group_stats(&subset, detailed)
                    .with_context(|| format!("Statistics for {workload_type}_{block_size}"))?,
            });
        }
    }

    Ok(groups)
}

fn group_stats(records: &[&ResultRecord], detailed: bool) -> anyhow::Result<Vec<MetricStats>> {
    let columns = Metric::ALL
        .iter()
        .map(|metric| {
            Column::new(
                metric.as_str().into(),
                records.iter().map(|r| metric.value(r)).collect::<Vec<_>>(),
            )
        })
        .collect::<Vec<_>>();
    let frame = DataFrame::new(columns)?;

    Metric::ALL
        .iter()
        .map(|metric| -> anyhow::Result<MetricStats> {
            let values = frame.column(metric.as_str())?.f64()?;

            let detail = if detailed {
                Some(MetricDetail {
                    std: values.std(1),
                    q25: values
                        .quantile(0.25, QuantileMethod::Linear)?
                        .context("q25")?,
                    q75: values
                        .quantile(0.75, QuantileMethod::Linear)?
                        .context("q75")?,
                    count: values.len(),
                })
            } else {
                None
            };

            Ok(MetricStats {
                metric: *metric,
                mean: values.mean().context("Mean")?,
                median: values.median().context("Median")?,
                min: values.min().context("Min")?,
                max: values.max().context("Max")?,
                detail,
            })
        })
        .collect()
}

const RULE_WIDTH: usize = 80;

pub fn format_basic(stats: &[GroupStats]) -> String {
    if stats.is_empty() {
        return "No statistics available".to_string();
    }

    let mut out = format!("Statistics Summary\n{}", "=".repeat(RULE_WIDTH));
    for group in stats {
        let _ = write!(out, "\n\n{}:", group.key());
        for m in &group.metrics {
            let _ = write!(
                out,
                "\n  {}: mean={:.2}, median={:.2}, min={:.2}, max={:.2}",
                m.metric.as_str(),
                m.mean,
                m.median,
                m.min,
                m.max
            );
        }
    }
    out
}

pub fn format_detailed(stats: &[GroupStats]) -> String {
    if stats.is_empty() {
        return "No statistics available".to_string();
    }

    let mut out = format!("Detailed Statistics\n{}", "=".repeat(RULE_WIDTH));
    for group in stats {
        let _ = write!(out, "\n\n{}:", group.key());
        for m in &group.metrics {
            let _ = write!(
                out,
                "\n  {}:\n    mean={:.2}, median={:.2}",
                m.metric.as_str(),
                m.mean,
                m.median
            );
            match m.detail.as_ref().and_then(|d| d.std) {
                Some(std) => {
                    let _ = write!(out, "\n    std={std:.2}");
                }
                None => out.push_str("\n    std=N/A"),
            }
            let _ = write!(out, "\n    min={:.2}, max={:.2}", m.min, m.max);
            if let Some(detail) = &m.detail {
                let _ = write!(
                    out,
                    "\n    q25={:.2}, q75={:.2}\n    count={}",
                    detail.q25, detail.q75, detail.count
                );
            }
        }
    }
    out
}
