use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Extra time allowed on top of the requested runtime before a trial is considered hung.
///
/// Covers fio laying out the test file before the timed section starts and tearing down after it.
pub const TIMEOUT_GRACE_SECS: u64 = 60;

/// File size used by quick mode.
pub const QUICK_FILE_SIZE: &str = "1G";

/// Runtime used by quick mode, in seconds.
pub const QUICK_RUNTIME_SECS: u64 = 15;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Individual mode requires at least one --test-type and one --block-size")]
    IndividualModeIncomplete,
    #[error("The selected workload types and block sizes do not produce any trials")]
    EmptyMatrix,
    #[error("Unknown {kind}: '{value}' (expected one of: {expected})")]
    UnknownValue {
        kind: &'static str,
        value: String,
        expected: String,
    },
}

fn unknown<T: fmt::Display>(kind: &'static str, value: &str, all: &[T]) -> ConfigError {
    ConfigError::UnknownValue {
        kind,
        value: value.to_string(),
        expected: all
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// Controls how the trial matrix is expanded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Three fixed trials, useful to check the setup.
    Test,
    /// The common read/write matrix at 4k, 64k and 1M.
    #[default]
    Lean,
    /// The lean matrix plus 512k blocks.
    Full,
    /// The product of the configured workload types and block sizes.
    Individual,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Test, Mode::Lean, Mode::Full, Mode::Individual];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Test => "test",
            Mode::Lean => "lean",
            Mode::Full => "full",
            Mode::Individual => "individual",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| unknown("mode", s, &Mode::ALL))
    }
}

/// The I/O access pattern passed to fio as `--rw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadType {
    Randread,
    Randwrite,
    Read,
    Write,
    Randrw,
    Trim,
}

impl WorkloadType {
    pub const ALL: [WorkloadType; 6] = [
        WorkloadType::Randread,
        WorkloadType::Randwrite,
        WorkloadType::Read,
        WorkloadType::Write,
        WorkloadType::Randrw,
        WorkloadType::Trim,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadType::Randread => "randread",
            WorkloadType::Randwrite => "randwrite",
            WorkloadType::Read => "read",
            WorkloadType::Write => "write",
            WorkloadType::Randrw => "randrw",
            WorkloadType::Trim => "trim",
        }
    }
}

impl fmt::Display for WorkloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkloadType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkloadType::ALL
            .into_iter()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| unknown("workload type", s, &WorkloadType::ALL))
    }
}

/// The size of each I/O issued by fio, passed as `--bs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BlockSize {
    #[serde(rename = "4k")]
    K4,
    #[serde(rename = "64k")]
    K64,
    #[serde(rename = "1M")]
    M1,
    #[serde(rename = "512k")]
    K512,
}

impl BlockSize {
    pub const ALL: [BlockSize; 4] = [BlockSize::K4, BlockSize::K64, BlockSize::M1, BlockSize::K512];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockSize::K4 => "4k",
            BlockSize::K64 => "64k",
            BlockSize::M1 => "1M",
            BlockSize::K512 => "512k",
        }
    }

    pub fn bytes(&self) -> u64 {
        match self {
            BlockSize::K4 => 4 * 1024,
            BlockSize::K64 => 64 * 1024,
            BlockSize::M1 => 1024 * 1024,
            BlockSize::K512 => 512 * 1024,
        }
    }
}

impl fmt::Display for BlockSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockSize {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockSize::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| unknown("block size", s, &BlockSize::ALL))
    }
}

/// Parameters of a benchmark run.
///
/// Built once from the command line (and optionally a config file) and then only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub mode: Mode,
    /// Only used in [Mode::Individual].
    pub workload_types: Vec<WorkloadType>,
    /// Only used in [Mode::Individual].
    pub block_sizes: Vec<BlockSize>,
    /// A fio size specifier, for example `10G`.
    pub file_size: String,
    pub runtime_seconds: u64,
    pub io_depth: u32,
    pub num_jobs: u32,
    pub direct_io: bool,
    pub sync_each_op: bool,
    pub ssd_mode: bool,
    /// Recorded with the run. Does not currently change the fio invocation.
    pub hdd_mode: bool,
    pub high_concurrency: bool,
    /// Per-trial timeout in seconds. `None` or `0` means `runtime_seconds + 60`.
    pub timeout_override: Option<u64>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            workload_types: Vec::new(),
            block_sizes: Vec::new(),
            file_size: "10G".to_string(),
            runtime_seconds: 300,
            io_depth: 4,
            num_jobs: 1,
            direct_io: true,
            sync_each_op: true,
            ssd_mode: false,
            hdd_mode: false,
            high_concurrency: false,
            timeout_override: None,
        }
    }
}

impl BenchmarkConfig {
    /// Switch to the small file and short runtime used for a quick check.
    pub fn quick(mut self) -> Self {
        self.file_size = QUICK_FILE_SIZE.to_string();
        self.runtime_seconds = QUICK_RUNTIME_SECS;
        self
    }

    /// Check the configuration before any trial is expanded.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mode == Mode::Individual
            && (self.workload_types.is_empty() || self.block_sizes.is_empty())
        {
            return Err(ConfigError::IndividualModeIncomplete);
        }

        Ok(())
    }

    /// The hard limit for a single trial.
    pub fn trial_timeout(&self) -> Duration {
        match self.timeout_override {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => Duration::from_secs(self.runtime_seconds.saturating_add(TIMEOUT_GRACE_SECS)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_names_round_trip() {
        for w in WorkloadType::ALL {
            assert_eq!(w, w.as_str().parse().unwrap());
        }
        for b in BlockSize::ALL {
            assert_eq!(b, b.as_str().parse().unwrap());
        }
        for m in Mode::ALL {
            assert_eq!(m, m.as_str().parse().unwrap());
        }
    }

    #[test]
    fn unknown_block_size_lists_choices() {
        let err = "8k".parse::<BlockSize>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown block size: '8k' (expected one of: 4k, 64k, 1M, 512k)"
        );
    }

    #[test]
    fn block_size_serializes_as_fio_specifier() {
        assert_eq!(serde_json::to_string(&BlockSize::M1).unwrap(), "\"1M\"");
        assert_eq!(
            serde_json::from_str::<BlockSize>("\"512k\"").unwrap(),
            BlockSize::K512
        );
    }

    #[test]
    fn individual_mode_requires_filters() {
        let config = BenchmarkConfig {
            mode: Mode::Individual,
            workload_types: vec![WorkloadType::Read],
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::IndividualModeIncomplete));

        let config = BenchmarkConfig {
            block_sizes: vec![BlockSize::K4],
            ..config
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn default_timeout_adds_grace_period() {
        let config = BenchmarkConfig {
            runtime_seconds: 30,
            ..Default::default()
        };
        assert_eq!(config.trial_timeout(), Duration::from_secs(90));

        let config = BenchmarkConfig {
            timeout_override: Some(0),
            ..config
        };
        assert_eq!(config.trial_timeout(), Duration::from_secs(90));

        let config = BenchmarkConfig {
            timeout_override: Some(10),
            ..config
        };
        assert_eq!(config.trial_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn huge_runtime_does_not_overflow_the_timeout() {
        let config = BenchmarkConfig {
            runtime_seconds: u64::MAX - 10,
            ..Default::default()
        };
        assert_eq!(config.trial_timeout(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn quick_mode_shrinks_the_run() {
        let config = BenchmarkConfig::default().quick();
        assert_eq!(config.file_size, "1G");
        assert_eq!(config.runtime_seconds, 15);
    }
}
