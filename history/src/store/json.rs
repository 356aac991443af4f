use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use disk_bench_model::{Mode, ResultRecord, RunSummary};
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;
use crate::sink::ResultSink;

/// Subdirectory of the results directory that holds one file per trial in individual mode.
pub const TRIAL_FILES_DIR: &str = "json";

/// Writes runs as JSON files.
///
/// Individual mode runs get one file per trial under `json/`, named after the trial. All other
/// modes write a single `benchmark_results.json` that is replaced by the next run.
pub struct JsonStore {
    results_dir: PathBuf,
}

#[derive(Serialize)]
struct RunDocument<'a> {
    timestamp: &'a str,
    mode: &'a str,
    results: &'a [ResultRecord],
}

#[derive(Serialize)]
struct TrialDocument<'a> {
    timestamp: &'a str,
    test: &'a str,
    block_size: &'a str,
    read_iops: Value,
    write_iops: Value,
    read_bw_mibs: Value,
    write_bw_mibs: Value,
    read_latency_us: Value,
    write_latency_us: Value,
    cpu: Value,
    io_time_sec: Value,
    wall_time_sec: Value,
}

impl<'a> TrialDocument<'a> {
    fn new(timestamp: &'a str, record: &'a ResultRecord) -> Self {
        Self {
            timestamp,
            test: record.workload_type.as_str(),
            block_size: record.block_size.as_str(),
            read_iops: or_not_available(record.read_iops),
            write_iops: or_not_available(record.write_iops),
            read_bw_mibs: or_not_available(record.read_bw as f64),
            write_bw_mibs: or_not_available(record.write_bw as f64),
            read_latency_us: or_not_available(record.read_latency_us),
            write_latency_us: or_not_available(record.write_latency_us),
            cpu: if record.cpu.is_empty() {
                Value::from("N/A")
            } else {
                Value::from(record.cpu.as_str())
            },
            io_time_sec: or_not_available(record.io_time_sec),
            wall_time_sec: or_not_available(record.wall_time_sec),
        }
    }
}

/// Zero means the trial did not measure this value.
fn or_not_available(value: f64) -> Value {
    if value == 0.0 {
        Value::from("N/A")
    } else {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::from("N/A"))
    }
}

impl JsonStore {
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
    ) -> Result<Vec<PathBuf>, StoreError> {
        let timestamp = now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string();

        if run.config.mode == Mode::Individual {
            let dir = self.results_dir.join(TRIAL_FILES_DIR);
            std::fs::create_dir_all(&dir).map_err(StoreError::io(&dir))?;

            records
                .iter()
                .map(|record| -> Result<PathBuf, StoreError> {
                    let path = dir.join(format!(
                        "{}_{}.json",
                        record.workload_type, record.block_size
                    ));
                    write_pretty(&path, &TrialDocument::new(&timestamp, record))?;
                    Ok(path)
                })
                .collect()
        } else {
            std::fs::create_dir_all(&self.results_dir)
                .map_err(StoreError::io(&self.results_dir))?;

            let path = self.results_dir.join(disk_bench_report::RESULTS_FILE_NAME);
            let document = RunDocument {
                timestamp: &timestamp,
                mode: run.config.mode.as_str(),
                results: records,
            };
            write_pretty(&path, &document)?;
            Ok(vec![path])
        }
    }
}

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let file = std::fs::File::create(path).map_err(StoreError::io(path))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), value)?;
    Ok(())
}

impl ResultSink for JsonStore {
    fn save(&self, run: &RunSummary, records: &[ResultRecord]) -> Result<(), StoreError> {
        let paths = self.save_at(Local::now(), run, records)?;
        log::info!(
            "Saved {} JSON file(s) to {}",
            paths.len(),
            self.results_dir.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use disk_bench_model::{BenchmarkConfig, BlockSize, TrialSpec, TrialStatus, WorkloadType};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn run(mode: Mode) -> RunSummary {
        RunSummary::new(
            "run-1".to_string(),
            1_700_000_000,
            BenchmarkConfig {
                mode,
                ..Default::default()
            },
            2,
            None,
            "0.3.0".to_string(),
        )
    }

    fn records() -> Vec<ResultRecord> {
        let mut ok = ResultRecord::zeroed(
            TrialSpec::new(WorkloadType::Randread, BlockSize::K4),
            TrialStatus::Ok,
        );
        ok.read_iops = 1500.0;
        ok.read_bw = 6144000;
        ok.read_latency_us = 12.5;
        ok.cpu = "usr=1.0%, sys=2.0%".to_string();
        ok.io_time_sec = 15.0;

        vec![
            ok,
            ResultRecord::timed_out(TrialSpec::new(WorkloadType::Read, BlockSize::M1)),
        ]
    }

    fn read(path: &Path) -> Value {
        serde_json::from_reader(std::fs::File::open(path).unwrap()).unwrap()
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap()
    }

    #[test]
    fn individual_mode_writes_one_file_per_trial() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        let paths = store
            .save_at(now(), &run(Mode::Individual), &records())
            .unwrap();

        assert_eq!(
            paths,
            vec![
                dir.path().join("json").join("randread_4k.json"),
                dir.path().join("json").join("read_1M.json"),
            ]
        );
        assert_eq!(
            read(&paths[0]),
            json!({
                "timestamp": "2024-03-05T14:07:09.000000",
                "test": "randread",
                "block_size": "4k",
                "read_iops": 1500.0,
                "write_iops": "N/A",
                "read_bw_mibs": 6144000.0,
                "write_bw_mibs": "N/A",
                "read_latency_us": 12.5,
                "write_latency_us": "N/A",
                "cpu": "usr=1.0%, sys=2.0%",
                "io_time_sec": 15.0,
                "wall_time_sec": "N/A",
            })
        );
        assert_eq!(read(&paths[1])["cpu"], "N/A");
        assert_eq!(read(&paths[1])["io_time_sec"], "N/A");
    }

    #[test]
    fn other_modes_write_a_combined_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        let paths = store.save_at(now(), &run(Mode::Lean), &records()).unwrap();

        assert_eq!(paths, vec![dir.path().join("benchmark_results.json")]);
        let document = read(&paths[0]);
        assert_eq!(document["mode"], "lean");
        assert_eq!(document["timestamp"], "2024-03-05T14:07:09.000000");

        let loaded: Vec<ResultRecord> =
            serde_json::from_value(document["results"].clone()).unwrap();
        assert_eq!(loaded, records());
    }
}
