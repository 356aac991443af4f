use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use disk_bench_model::ResultRecord;
use polars::prelude::*;

use crate::format::{mb_per_sec, Formatter};

pub const CSV_HEADERS: [&str; 12] = [
    "Test Type",
    "Block Size",
    "Read IOPS",
    "Write IOPS",
    "Read MB/s",
    "Write MB/s",
    "Read Lat (us)",
    "Write Lat (us)",
    "CPU",
    "I/O Time (s)",
    "Wall Time (s)",
    "Status",
];

/// Write one CSV row per record, with a header row.
///
/// Bandwidth is converted to MiB/s. Bandwidth, latency and times keep two decimal places.
pub fn write_csv<W: Write>(records: &[ResultRecord], writer: W) -> PolarsResult<()> {
    let column = |f: &dyn Fn(&ResultRecord) -> String| records.iter().map(f).collect::<Vec<_>>();

    let mut frame = df![
        CSV_HEADERS[0] => column(&|r| r.workload_type.to_string()),
        CSV_HEADERS[1] => column(&|r| r.block_size.to_string()),
        CSV_HEADERS[2] => column(&|r| r.read_iops.to_string()),
        CSV_HEADERS[3] => column(&|r| r.write_iops.to_string()),
        CSV_HEADERS[4] => column(&|r| format!("{:.2}", mb_per_sec(r.read_bw))),
        CSV_HEADERS[5] => column(&|r| format!("{:.2}", mb_per_sec(r.write_bw))),
        CSV_HEADERS[6] => column(&|r| format!("{:.2}", r.read_latency_us)),
        CSV_HEADERS[7] => column(&|r| format!("{:.2}", r.write_latency_us)),
        CSV_HEADERS[8] => column(&|r| r.cpu.clone()),
        CSV_HEADERS[9] => column(&|r| format!("{:.2}", r.io_time_sec)),
        CSV_HEADERS[10] => column(&|r| format!("{:.2}", r.wall_time_sec)),
        CSV_HEADERS[11] => column(&|r| r.status.to_string()),
    ]?;

    CsvWriter::new(writer)
        .include_header(true)
        .finish(&mut frame)?;

    Ok(())
}

/// Saves the run as a single CSV file.
pub struct CsvFormatter {
    output_path: PathBuf,
}

impl CsvFormatter {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }
}

impl Formatter for CsvFormatter {
    fn render(&self, records: &[ResultRecord]) -> anyhow::Result<()> {
        if records.is_empty() {
            log::info!("No results to export");
            return Ok(());
        }

        if let Some(parent) = self.output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(&self.output_path)
            .with_context(|| format!("Failed to create {}", self.output_path.display()))?;
        write_csv(records, std::io::BufWriter::new(file))
            .with_context(|| format!("Failed to write {}", self.output_path.display()))?;

        log::info!("Results saved to {}", self.output_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use disk_bench_model::{BlockSize, TrialSpec, TrialStatus, WorkloadType};
    use pretty_assertions::assert_eq;

    fn records() -> Vec<ResultRecord> {
        let mut ok = ResultRecord::zeroed(
            TrialSpec::new(WorkloadType::Randread, BlockSize::K4),
            TrialStatus::Ok,
        );
        ok.read_iops = 10000.5;
        ok.read_bw = 41943040;
        ok.read_latency_us = 50.0;
        ok.cpu = "usr=5.5%, sys=2.3%".to_string();
        ok.io_time_sec = 15.023;
        ok.wall_time_sec = 16.0;

        vec![
            ok,
            ResultRecord::failed(TrialSpec::new(WorkloadType::Trim, BlockSize::K4), "no trim"),
        ]
    }

    #[test]
    fn writes_header_and_rows() {
        let mut out = Vec::new();
        write_csv(&records(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines = text.lines().collect::<Vec<_>>();

        assert_eq!(
            lines[0],
            "Test Type,Block Size,Read IOPS,Write IOPS,Read MB/s,Write MB/s,Read Lat (us),Write Lat (us),CPU,I/O Time (s),Wall Time (s),Status"
        );
        assert_eq!(
            lines[1],
            "randread,4k,10000.5,0,40.00,0.00,50.00,0.00,\"usr=5.5%, sys=2.3%\",15.02,16.00,OK"
        );
        assert_eq!(lines[2], "trim,4k,0,0,0.00,0.00,0.00,0.00,N/A,0.00,0.00,FAILED: no trim");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn formatter_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("results.csv");

        CsvFormatter::new(&path).render(&records()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Test Type,"));
    }

    #[test]
    fn empty_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");

        CsvFormatter::new(&path).render(&[]).unwrap();

        assert!(!path.exists());
    }
}
