use std::path::PathBuf;

use anyhow::Context;
use disk_bench_model::{PlotType, ResultRecord, WorkloadType};
use itertools::Itertools;
use serde_json::{json, Value};

use crate::format::mb_per_sec;
use crate::plot::Plotter;

const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// The qualitative Set1 palette.
const COLORS: [&str; 9] = [
    "#E41A1C", "#377EB8", "#4DAF4A", "#984EA3", "#FF7F00", "#FFFF33", "#A65628", "#F781BF",
    "#999999",
];

/// Workloads shown on the radar chart. Trim has no meaningful IOPS to compare.
const RADAR_WORKLOADS: [WorkloadType; 5] = [
    WorkloadType::Randread,
    WorkloadType::Randwrite,
    WorkloadType::Read,
    WorkloadType::Write,
    WorkloadType::Randrw,
];

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Chart {
    pub(crate) file_name: &'static str,
    pub(crate) title: &'static str,
    pub(crate) traces: Vec<Value>,
    pub(crate) layout: Value,
}

/// Writes self-contained HTML pages that draw the charts with Plotly.js.
pub struct PlotlyPlotter {
    output_dir: PathBuf,
    plot_types: Vec<PlotType>,
}

impl PlotlyPlotter {
    pub fn new(output_dir: impl Into<PathBuf>, plot_types: Vec<PlotType>) -> Self {
        Self {
            output_dir: output_dir.into(),
            plot_types,
        }
    }

    pub(crate) fn charts(&self, records: &[ResultRecord]) -> Vec<Chart> {
        if records.is_empty() {
            return Vec::new();
        }

        self.plot_types
            .iter()
            .unique()
            .flat_map(|plot_type| match plot_type {
                PlotType::Bar => bar_charts(records),
                PlotType::Scatter => scatter_charts(records),
                PlotType::Line => vec![line_chart(records)],
                PlotType::Radar => radar_chart(records).into_iter().collect(),
            })
            .collect()
    }
}

impl Plotter for PlotlyPlotter {
    fn generate(&self, records: &[ResultRecord]) -> anyhow::Result<Vec<PathBuf>> {
        let charts = self.charts(records);
        if charts.is_empty() {
            return Ok(Vec::new());
        }

        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create plot directory {}", self.output_dir.display())
        })?;

        let mut written = Vec::with_capacity(charts.len());
        for chart in charts {
            let path = self.output_dir.join(chart.file_name);
            std::fs::write(&path, render_html(&chart))
                .with_context(|| format!("Failed to write plot {}", path.display()))?;
            log::info!("Plot saved to {}", path.display());
            written.push(path);
        }

        Ok(written)
    }
}

fn workloads(records: &[ResultRecord]) -> Vec<WorkloadType> {
    records.iter().map(|r| r.workload_type).unique().collect()
}

fn color(i: usize) -> &'static str {
    COLORS[i % COLORS.len()]
}

/// A read and a write bar trace per workload type, with block sizes on the x axis.
fn grouped_bars(
    records: &[ResultRecord],
    read: impl Fn(&ResultRecord) -> f64,
    write: impl Fn(&ResultRecord) -> f64,
) -> Vec<Value> {
    workloads(records)
        .into_iter()
        .enumerate()
        .flat_map(|(i, workload)| {
            let rows = records
                .iter()
                .filter(|r| r.workload_type == workload)
                .collect::<Vec<_>>();
            let x = rows.iter().map(|r| r.block_size.as_str()).collect::<Vec<_>>();

            [
                json!({
                    "type": "bar",
                    "name": format!("{workload} Read"),
                    "x": x,
                    "y": rows.iter().map(|r| read(r)).collect::<Vec<_>>(),
                    "marker": {"color": color(i)},
                }),
                json!({
                    "type": "bar",
                    "name": format!("{workload} Write"),
                    "x": x,
                    "y": rows.iter().map(|r| write(r)).collect::<Vec<_>>(),
                    "marker": {"color": color(i + 1)},
                }),
            ]
        })
        .collect()
}

fn bar_layout(title: &str, y_title: &str) -> Value {
    json!({
        "title": {"text": title},
        "xaxis": {"title": {"text": "Block Size"}},
        "yaxis": {"title": {"text": y_title}},
        "barmode": "group",
        "hovermode": "x unified",
    })
}

fn bar_charts(records: &[ResultRecord]) -> Vec<Chart> {
    vec![
        Chart {
            file_name: "bar_iops.html",
            title: "IOPS Comparison",
            traces: grouped_bars(records, |r| r.read_iops, |r| r.write_iops),
            layout: bar_layout("IOPS Comparison", "IOPS"),
        },
        Chart {
            file_name: "bar_bandwidth.html",
            title: "Bandwidth Comparison",
            traces: grouped_bars(records, |r| mb_per_sec(r.read_bw), |r| mb_per_sec(r.write_bw)),
            layout: bar_layout("Bandwidth Comparison", "MB/s"),
        },
        Chart {
            file_name: "bar_latency.html",
            title: "Latency Comparison",
            traces: grouped_bars(records, |r| r.read_latency_us, |r| r.write_latency_us),
            layout: bar_layout("Latency Comparison", "Latency (µs)"),
        },
    ]
}

fn scatter_traces(records: &[ResultRecord], x: impl Fn(&ResultRecord) -> f64) -> Vec<Value> {
    workloads(records)
        .into_iter()
        .map(|workload| {
            let rows = records
                .iter()
                .filter(|r| r.workload_type == workload)
                .collect::<Vec<_>>();
            json!({
                "type": "scatter",
                "mode": "markers",
                "name": workload.as_str(),
                "x": rows.iter().map(|r| x(r)).collect::<Vec<_>>(),
                "y": rows.iter().map(|r| r.read_latency_us).collect::<Vec<_>>(),
                "text": rows.iter().map(|r| r.block_size.as_str()).collect::<Vec<_>>(),
                "marker": {"size": 10, "opacity": 0.7},
            })
        })
        .collect()
}

fn scatter_layout(title: &str, x_title: &str) -> Value {
    json!({
        "title": {"text": title},
        "xaxis": {"title": {"text": x_title}},
        "yaxis": {"title": {"text": "Latency (µs)"}},
        "hovermode": "closest",
    })
}

fn scatter_charts(records: &[ResultRecord]) -> Vec<Chart> {
    vec![
        Chart {
            file_name: "scatter_iops_latency.html",
            title: "IOPS vs Latency",
            traces: scatter_traces(records, |r| r.read_iops),
            layout: scatter_layout("IOPS vs Latency", "IOPS"),
        },
        Chart {
            file_name: "scatter_bw_latency.html",
            title: "Bandwidth vs Latency",
            traces: scatter_traces(records, |r| mb_per_sec(r.read_bw)),
            layout: scatter_layout("Bandwidth vs Latency", "Bandwidth (MB/s)"),
        },
    ]
}

/// Read and write IOPS of every trial in the order the trials ran.
fn line_chart(records: &[ResultRecord]) -> Chart {
    let labels = records
        .iter()
        .map(|r| r.trial().to_string())
        .collect::<Vec<_>>();
    let series = |name: &str, values: Vec<f64>, i: usize| {
        json!({
            "type": "scatter",
            "mode": "lines+markers",
            "name": name,
            "x": labels,
            "y": values,
            "line": {"color": color(i)},
        })
    };

    Chart {
        file_name: "line_trends.html",
        title: "IOPS by Trial",
        traces: vec![
            series("Read IOPS", records.iter().map(|r| r.read_iops).collect(), 0),
            series("Write IOPS", records.iter().map(|r| r.write_iops).collect(), 1),
        ],
        layout: json!({
            "title": {"text": "IOPS by Trial"},
            "xaxis": {"title": {"text": "Trial"}},
            "yaxis": {"title": {"text": "IOPS"}},
            "hovermode": "x unified",
        }),
    }
}

/// Mean read IOPS per workload type, one polygon per block size.
fn radar_chart(records: &[ResultRecord]) -> Option<Chart> {
    let axes = RADAR_WORKLOADS
        .into_iter()
        .filter(|w| records.iter().any(|r| r.workload_type == *w))
        .collect::<Vec<_>>();
    if axes.is_empty() {
        return None;
    }

    let polygons = records
        .iter()
        .map(|r| r.block_size)
        .unique()
        .map(|block_size| {
            let values = axes
                .iter()
                .map(|workload| {
                    let iops = records
                        .iter()
                        .filter(|r| r.block_size == block_size && r.workload_type == *workload)
                        .map(|r| r.read_iops)
                        .collect::<Vec<_>>();
                    if iops.is_empty() {
                        0.0
                    } else {
                        iops.iter().sum::<f64>() / iops.len() as f64
                    }
                })
                .collect::<Vec<_>>();
            (block_size, values)
        })
        .collect::<Vec<_>>();

    let peak = polygons
        .iter()
        .flat_map(|(_, values)| values.iter().copied())
        .fold(0.0, f64::max);
    let range = if peak > 0.0 {
        json!([0.0, peak * 1.2])
    } else {
        json!([0.0, 1.0])
    };
    let theta = axes.iter().map(|w| w.as_str()).collect::<Vec<_>>();

    Some(Chart {
        file_name: "radar_performance.html",
        title: "Performance Profile (IOPS)",
        traces: polygons
            .into_iter()
            .map(|(block_size, values)| {
                json!({
                    "type": "scatterpolar",
                    "r": values,
                    "theta": theta,
                    "fill": "toself",
                    "name": block_size.as_str(),
                })
            })
            .collect(),
        layout: json!({
            "title": {"text": "Performance Profile (IOPS)"},
            "polar": {"radialaxis": {"visible": true, "range": range}},
            "showlegend": true,
        }),
    })
}

fn render_html(chart: &Chart) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{PLOTLY_JS}"></script>
</head>
<body>
<div id="chart" style="width:100%;height:90vh;"></div>
<script>
Plotly.newPlot("chart", {traces}, {layout}, {{"responsive": true}});
</script>
</body>
</html>
"#,
        title = chart.title,
        traces = Value::Array(chart.traces.clone()),
        layout = chart.layout,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use disk_bench_model::{BlockSize, TrialSpec, TrialStatus};
    use pretty_assertions::assert_eq;

    fn record(workload_type: WorkloadType, block_size: BlockSize, read_iops: f64) -> ResultRecord {
        let mut record =
            ResultRecord::zeroed(TrialSpec::new(workload_type, block_size), TrialStatus::Ok);
        record.read_iops = read_iops;
        record.read_bw = 2 * 1024 * 1024;
        record.read_latency_us = 12.5;
        record
    }

    fn records() -> Vec<ResultRecord> {
        vec![
            record(WorkloadType::Randread, BlockSize::K4, 100.0),
            record(WorkloadType::Randwrite, BlockSize::K4, 0.0),
            record(WorkloadType::Randread, BlockSize::K64, 50.0),
            record(WorkloadType::Trim, BlockSize::K4, 0.0),
        ]
    }

    fn file_names(charts: &[Chart]) -> Vec<&'static str> {
        charts.iter().map(|c| c.file_name).collect()
    }

    #[test]
    fn bar_charts_group_by_workload() {
        let plotter = PlotlyPlotter::new("unused", vec![PlotType::Bar]);
        let charts = plotter.charts(&records());

        assert_eq!(
            file_names(&charts),
            vec!["bar_iops.html", "bar_bandwidth.html", "bar_latency.html"]
        );

        let iops = &charts[0];
        assert_eq!(iops.traces.len(), 6);
        assert_eq!(iops.traces[0]["name"], "randread Read");
        assert_eq!(iops.traces[0]["x"], json!(["4k", "64k"]));
        assert_eq!(iops.traces[0]["y"], json!([100.0, 50.0]));
        assert_eq!(charts[1].traces[0]["y"], json!([2.0, 2.0]));
    }

    #[test]
    fn radar_skips_trim_and_scales_to_peak() {
        let plotter = PlotlyPlotter::new("unused", vec![PlotType::Radar]);
        let charts = plotter.charts(&records());
        let radar = &charts[0];

        assert_eq!(radar.traces.len(), 2);
        assert_eq!(radar.traces[0]["theta"], json!(["randread", "randwrite"]));
        assert_eq!(radar.traces[0]["r"], json!([100.0, 0.0]));
        assert_eq!(radar.traces[1]["r"], json!([50.0, 0.0]));
        assert_eq!(radar.layout["polar"]["radialaxis"]["range"], json!([0.0, 100.0 * 1.2]));
    }

    #[test]
    fn radar_without_comparable_workloads_is_skipped() {
        let plotter = PlotlyPlotter::new("unused", vec![PlotType::Radar]);
        let charts = plotter.charts(&[record(WorkloadType::Trim, BlockSize::K4, 1.0)]);
        assert!(charts.is_empty());
    }

    #[test]
    fn repeated_plot_types_are_generated_once() {
        let plotter = PlotlyPlotter::new(
            "unused",
            vec![PlotType::Scatter, PlotType::Line, PlotType::Scatter],
        );
        let charts = plotter.charts(&records());

        assert_eq!(
            file_names(&charts),
            vec![
                "scatter_iops_latency.html",
                "scatter_bw_latency.html",
                "line_trends.html"
            ]
        );
        assert_eq!(charts[2].traces[0]["x"][0], "randread (4k)");
    }

    #[test]
    fn writes_html_files() {
        let dir = tempfile::tempdir().unwrap();
        let plotter = PlotlyPlotter::new(dir.path().join("plots"), vec![PlotType::Bar]);

        let written = plotter.generate(&records()).unwrap();

        assert_eq!(written.len(), 3);
        let html = std::fs::read_to_string(&written[0]).unwrap();
        assert!(html.contains("<title>IOPS Comparison</title>"));
        assert!(html.contains("Plotly.newPlot(\"chart\""));
        assert!(html.contains("\"barmode\":\"group\""));
    }

    #[test]
    fn nothing_to_plot() {
        let dir = tempfile::tempdir().unwrap();
        let plotter = PlotlyPlotter::new(dir.path().join("plots"), vec![PlotType::Bar]);

        assert!(plotter.generate(&[]).unwrap().is_empty());
        assert!(!dir.path().join("plots").exists());
    }
}
