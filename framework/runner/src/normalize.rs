use disk_bench_model::{ResultRecord, TrialSpec, TrialStatus};
use serde_json::Value;
use thiserror::Error;

/// How much of the raw output to keep when the JSON document cannot be parsed.
const PREVIEW_CHARS: usize = 200;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("no JSON in output")]
    NoJson,
    #[error("JSON parse error: {source}, output starts with {preview:?}")]
    Json {
        #[source]
        source: serde_json::Error,
        /// The start of the raw output, for diagnostics.
        preview: String,
    },
    #[error("no jobs in output")]
    NoJobs,
}

/// Turn fio's `--output-format=json` output into a [ResultRecord] with status OK.
///
/// fio may print warnings or progress lines around the document, so only the text between the
/// first `{` and the last `}` is parsed. Every value inside the document is optional and falls
/// back to zero.
pub fn parse_fio_output(raw: &str, trial: TrialSpec) -> Result<ResultRecord, ParseError> {
    let document = json_span(raw).ok_or(ParseError::NoJson)?;
    let data: Value = serde_json::from_str(document).map_err(|source| ParseError::Json {
        source,
        preview: raw.chars().take(PREVIEW_CHARS).collect(),
    })?;

    let job = data
        .get("jobs")
        .and_then(Value::as_array)
        .and_then(|jobs| jobs.first())
        .ok_or(ParseError::NoJobs)?;

    let mut record = ResultRecord::zeroed(trial, TrialStatus::Ok);
    record.read_iops = number_at(job, &["read", "iops"]);
    record.write_iops = number_at(job, &["write", "iops"]);
    record.read_bw = bytes_at(job, &["read", "bw_bytes"]);
    record.write_bw = bytes_at(job, &["write", "bw_bytes"]);
    record.read_latency_us = ns_to_us(number_at(job, &["read", "lat_ns", "mean"]));
    record.write_latency_us = ns_to_us(number_at(job, &["write", "lat_ns", "mean"]));
    record.cpu = format_cpu(
        first_number_at(job, &[&["job_options", "cpu", "user"], &["usr_cpu"]]),
        first_number_at(job, &[&["job_options", "cpu", "system"], &["sys_cpu"]]),
    );
    record.io_time_sec = first_number_at(job, &[&["job_runtime"], &["runtime"]]) / 1000.0;

    Ok(record)
}

fn json_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

/// Numbers may be encoded as strings, fio does this inside `job_options`.
fn as_number(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// The non-negative finite number at `path`, or zero.
fn number_at(value: &Value, path: &[&str]) -> f64 {
    lookup(value, path)
        .and_then(as_number)
        .filter(|n| n.is_finite() && *n > 0.0)
        .unwrap_or(0.0)
}

/// The number at the first of `paths` that holds one, or zero.
fn first_number_at(value: &Value, paths: &[&[&str]]) -> f64 {
    paths
        .iter()
        .find(|path| lookup(value, path).and_then(as_number).is_some())
        .map(|path| number_at(value, path))
        .unwrap_or(0.0)
}

fn bytes_at(value: &Value, path: &[&str]) -> u64 {
    match lookup(value, path).and_then(Value::as_u64) {
        Some(bytes) => bytes,
        None => number_at(value, path) as u64,
    }
}

/// Nanoseconds to microseconds, rounded to two decimal places.
pub fn ns_to_us(latency_ns: f64) -> f64 {
    if !latency_ns.is_finite() || latency_ns <= 0.0 {
        return 0.0;
    }
    (latency_ns / 1000.0 * 100.0).round() / 100.0
}

fn format_cpu(user: f64, system: f64) -> String {
    format!("usr={user:.1}%, sys={system:.1}%")
}
