use crate::config::{BlockSize, WorkloadType};
use crate::trial::TrialSpec;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Placeholder CPU summary for trials that produced no measurements.
pub const CPU_NOT_AVAILABLE: &str = "N/A";

/// Outcome of a single trial.
///
/// Serialized as the free text that the table and storage layers show, for example
/// `FAILED: fio: unknown option`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrialStatus {
    Ok,
    Failed(String),
    TimedOut,
    Error(String),
}

impl TrialStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, TrialStatus::Ok)
    }
}

impl fmt::Display for TrialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialStatus::Ok => f.write_str("OK"),
            TrialStatus::Failed(reason) if reason.is_empty() => f.write_str("FAILED"),
            TrialStatus::Failed(reason) => write!(f, "FAILED: {reason}"),
            TrialStatus::TimedOut => f.write_str("TIMED OUT"),
            TrialStatus::Error(reason) => write!(f, "ERROR: {reason}"),
        }
    }
}

impl FromStr for TrialStatus {
    type Err = Infallible;

    /// Anything that is not one of the known prefixes is kept as a failure reason, which is how
    /// older history rows recorded parse failures.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "OK" => TrialStatus::Ok,
            "TIMED OUT" => TrialStatus::TimedOut,
            "FAILED" => TrialStatus::Failed(String::new()),
            _ => {
                if let Some(reason) = s.strip_prefix("FAILED: ") {
                    TrialStatus::Failed(reason.to_string())
                } else if let Some(reason) = s.strip_prefix("ERROR: ") {
                    TrialStatus::Error(reason.to_string())
                } else {
                    TrialStatus::Failed(s.to_string())
                }
            }
        })
    }
}

impl Serialize for TrialStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TrialStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(text.parse().unwrap_or_else(|never: Infallible| match never {}))
    }
}

/// The normalized result of one trial.
///
/// Every measurement is always present. Trials that did not produce data carry zeros, so consumers
/// only ever need to look at values, never at whether a field exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(alias = "test_type")]
    pub workload_type: WorkloadType,
    pub block_size: BlockSize,
    pub status: TrialStatus,
    #[serde(default)]
    pub read_iops: f64,
    #[serde(default)]
    pub write_iops: f64,
    /// Bytes per second.
    #[serde(default)]
    pub read_bw: u64,
    /// Bytes per second.
    #[serde(default)]
    pub write_bw: u64,
    #[serde(default)]
    pub read_latency_us: f64,
    #[serde(default)]
    pub write_latency_us: f64,
    #[serde(default = "cpu_not_available")]
    pub cpu: String,
    /// Elapsed time reported by fio.
    #[serde(default, alias = "runtime_sec")]
    pub io_time_sec: f64,
    /// Elapsed time measured around the whole fio invocation.
    #[serde(default)]
    pub wall_time_sec: f64,
}

fn cpu_not_available() -> String {
    CPU_NOT_AVAILABLE.to_string()
}

impl ResultRecord {
    /// A record with every measurement zeroed.
    pub fn zeroed(trial: TrialSpec, status: TrialStatus) -> Self {
        Self {
            workload_type: trial.workload_type,
            block_size: trial.block_size,
            status,
            read_iops: 0.0,
            write_iops: 0.0,
            read_bw: 0,
            write_bw: 0,
            read_latency_us: 0.0,
            write_latency_us: 0.0,
            cpu: cpu_not_available(),
            io_time_sec: 0.0,
            wall_time_sec: 0.0,
        }
    }

    pub fn failed(trial: TrialSpec, reason: impl Into<String>) -> Self {
        Self::zeroed(trial, TrialStatus::Failed(reason.into()))
    }

    pub fn error(trial: TrialSpec, reason: impl Into<String>) -> Self {
        Self::zeroed(trial, TrialStatus::Error(reason.into()))
    }

    pub fn timed_out(trial: TrialSpec) -> Self {
        Self::zeroed(trial, TrialStatus::TimedOut)
    }

    pub fn trial(&self) -> TrialSpec {
        TrialSpec::new(self.workload_type, self.block_size)
    }

    pub fn with_wall_time(mut self, wall_time_sec: f64) -> Self {
        self.wall_time_sec = wall_time_sec;
        self
    }

    /// True if fio reported any throughput or any time spent doing I/O.
    pub fn has_measurements(&self) -> bool {
        self.read_iops > 0.0
            || self.write_iops > 0.0
            || self.read_bw > 0
            || self.write_bw > 0
            || self.io_time_sec > 0.0
    }
}
