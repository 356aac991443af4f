use std::path::{Path, PathBuf};

use anyhow::Context;
use disk_bench_model::ResultRecord;
use serde::Serialize;

use crate::format::Formatter;

pub const RESULTS_FILE_NAME: &str = "benchmark_results.json";

#[derive(Serialize)]
struct ResultsDocument<'a> {
    timestamp: String,
    results: &'a [ResultRecord],
}

/// Writes every record of the run into one pretty printed JSON document.
pub struct JsonFormatter {
    output_dir: PathBuf,
}

impl JsonFormatter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_file(&self) -> PathBuf {
        self.output_dir.join(RESULTS_FILE_NAME)
    }

    pub fn write(&self, records: &[ResultRecord]) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create JSON output directory {}", self.output_dir.display())
        })?;

        let path = self.output_file();
        let document = ResultsDocument {
            timestamp: chrono::Local::now().to_rfc3339(),
            results: records,
        };
        write_pretty(&path, &document)?;

        Ok(path)
    }
}

impl Formatter for JsonFormatter {
    fn render(&self, records: &[ResultRecord]) -> anyhow::Result<()> {
        let path = self.write(records)?;
        log::info!("Results saved to {}", path.display());
        Ok(())
    }
}

pub(crate) fn write_pretty<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), value)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use disk_bench_model::{BlockSize, TrialSpec, WorkloadType};
    use pretty_assertions::assert_eq;

    #[test]
    fn writes_timestamped_document() {
        let dir = tempfile::tempdir().unwrap();
        let formatter = JsonFormatter::new(dir.path().join("json"));
        let records = vec![ResultRecord::timed_out(TrialSpec::new(
            WorkloadType::Write,
            BlockSize::K64,
        ))];

        formatter.render(&records).unwrap();

        let document: serde_json::Value =
            serde_json::from_reader(std::fs::File::open(formatter.output_file()).unwrap()).unwrap();
        assert!(document["timestamp"].is_string());
        assert_eq!(document["results"][0]["workload_type"], "write");
        assert_eq!(document["results"][0]["block_size"], "64k");
        assert_eq!(document["results"][0]["status"], "TIMED OUT");

        let loaded: Vec<ResultRecord> =
            serde_json::from_value(document["results"].clone()).unwrap();
        assert_eq!(loaded, records);
    }
}
