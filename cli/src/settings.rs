use std::path::{Path, PathBuf};

use anyhow::Context;
use disk_bench_runner::prelude::{
    parse_size, BenchmarkConfig, BlockSize, Mode, OutputFormat, PlotType, StorageBackend,
    WorkloadType,
};
use serde::Deserialize;

use crate::cli::{RunArgs, TestArgs};

pub const DEFAULT_RESULTS_DIR: &str = "results";
pub const DEFAULT_JSON_OUTPUT_DIR: &str = "results/json";
pub const DEFAULT_DB_PATH: &str = "results/benchmark_history.db";
pub const DEFAULT_PLOT_OUTPUT_DIR: &str = "results/plots";

/// Environment variable name to set a custom run summary file path
pub const RUN_SUMMARY_PATH_ENV: &str = "RUN_SUMMARY_PATH";
/// File name of the run summary log inside the results directory
pub const RUN_SUMMARY_FILE_NAME: &str = "run_summary.jsonl";

/// Everything that happens to the results once the run is over.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputOptions {
    pub results_dir: PathBuf,
    pub output_format: OutputFormat,
    pub json_output_dir: PathBuf,
    pub plots: bool,
    pub plot_types: Vec<PlotType>,
    pub plot_output_dir: PathBuf,
    pub interactive_plots: bool,
    pub storage: StorageBackend,
    pub db_path: PathBuf,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            output_format: OutputFormat::default(),
            json_output_dir: PathBuf::from(DEFAULT_JSON_OUTPUT_DIR),
            plots: false,
            plot_types: vec![PlotType::Bar],
            plot_output_dir: PathBuf::from(DEFAULT_PLOT_OUTPUT_DIR),
            interactive_plots: false,
            storage: StorageBackend::default(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

impl OutputOptions {
    /// `RUN_SUMMARY_PATH` if set, otherwise `run_summary.jsonl` in the results directory.
    pub fn run_summary_path(&self) -> PathBuf {
        run_summary_path(&self.results_dir)
    }
}

pub fn run_summary_path(results_dir: &Path) -> PathBuf {
    std::env::var(RUN_SUMMARY_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| results_dir.join(RUN_SUMMARY_FILE_NAME))
}

/// The fully resolved settings of a benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub benchmark: BenchmarkConfig,
    pub output: OutputOptions,
    pub target_dir: Option<PathBuf>,
    pub show_progress: bool,
}

/// Defaults for `disk-bench run` read from a TOML file.
///
/// Every field is optional. A value given on the command line takes precedence over the file.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub mode: Option<Mode>,
    pub ssd: Option<bool>,
    pub hdd: Option<bool>,
    pub concurrency: Option<bool>,
    pub quick: Option<bool>,
    pub test_types: Vec<WorkloadType>,
    pub block_sizes: Vec<BlockSize>,
    pub runtime: Option<u64>,
    pub timeout: Option<u64>,
    pub filesize: Option<String>,
    pub io_depth: Option<u32>,
    pub num_jobs: Option<u32>,
    pub direct_io: Option<bool>,
    pub sync_each_op: Option<bool>,
    pub target_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub output_format: Option<OutputFormat>,
    pub json_output_dir: Option<PathBuf>,
    pub database: Option<StorageBackend>,
    pub db_path: Option<PathBuf>,
    pub plots: Option<bool>,
    pub plot_types: Vec<PlotType>,
    pub plot_output_dir: Option<PathBuf>,
    pub interactive_plots: Option<bool>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }
}

/// Merge command line options, the optional config file and the built in defaults.
pub fn resolve_run_settings(args: &RunArgs, file: ConfigFile) -> anyhow::Result<RunSettings> {
    let defaults = BenchmarkConfig::default();
    let flag = |cli: bool, file: Option<bool>| cli || file.unwrap_or(false);

    let workload_types = if args.test_types.is_empty() {
        file.test_types
    } else {
        args.test_types.clone()
    };
    let mut block_sizes = if args.block_sizes.is_empty() {
        file.block_sizes
    } else {
        args.block_sizes.clone()
    };

    let mode = args.mode.or(file.mode).unwrap_or(if workload_types.is_empty() {
        Mode::Lean
    } else {
        Mode::Individual
    });
    if mode == Mode::Individual && !workload_types.is_empty() && block_sizes.is_empty() {
        block_sizes = BlockSize::ALL.to_vec();
    }

    let mut benchmark = BenchmarkConfig {
        mode,
        workload_types,
        block_sizes,
        file_size: args
            .filesize
            .clone()
            .or(file.filesize)
            .unwrap_or(defaults.file_size),
        runtime_seconds: args.runtime.or(file.runtime).unwrap_or(defaults.runtime_seconds),
        io_depth: args.io_depth.or(file.io_depth).unwrap_or(defaults.io_depth),
        num_jobs: args.num_jobs.or(file.num_jobs).unwrap_or(defaults.num_jobs),
        direct_io: !args.no_direct && file.direct_io.unwrap_or(defaults.direct_io),
        sync_each_op: !args.no_fsync && file.sync_each_op.unwrap_or(defaults.sync_each_op),
        ssd_mode: flag(args.ssd, file.ssd),
        hdd_mode: flag(args.hdd, file.hdd),
        high_concurrency: flag(args.concurrency, file.concurrency),
        timeout_override: args.timeout.or(file.timeout),
    };
    if flag(args.quick, file.quick) {
        benchmark = benchmark.quick();
    }
    parse_size(&benchmark.file_size)
        .with_context(|| format!("Invalid --filesize '{}'", benchmark.file_size))?;
    benchmark.validate()?;

    let output = OutputOptions {
        results_dir: args
            .output_dir
            .clone()
            .or(file.output_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR)),
        output_format: args.output_format.or(file.output_format).unwrap_or_default(),
        json_output_dir: args
            .json_output_dir
            .clone()
            .or(file.json_output_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_JSON_OUTPUT_DIR)),
        plots: flag(args.plots, file.plots),
        plot_types: if !args.plot_types.is_empty() {
            args.plot_types.clone()
        } else if !file.plot_types.is_empty() {
            file.plot_types
        } else {
            vec![PlotType::Bar]
        },
        plot_output_dir: args
            .plot_output_dir
            .clone()
            .or(file.plot_output_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PLOT_OUTPUT_DIR)),
        interactive_plots: flag(args.interactive_plots, file.interactive_plots),
        storage: args.database.or(file.database).unwrap_or_default(),
        db_path: args
            .db_path
            .clone()
            .or(file.db_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
    };

    Ok(RunSettings {
        benchmark,
        output,
        target_dir: args.target_dir.clone().or(file.target_dir),
        show_progress: !args.no_progress,
    })
}

/// `disk-bench test` runs the three test mode trials and only prints the table.
pub fn test_run_settings(args: &TestArgs) -> anyhow::Result<RunSettings> {
    let benchmark = BenchmarkConfig {
        mode: Mode::Test,
        file_size: args.filesize.clone(),
        runtime_seconds: args.runtime,
        ssd_mode: args.ssd,
        high_concurrency: args.concurrency,
        ..Default::default()
    };
    parse_size(&benchmark.file_size)
        .with_context(|| format!("Invalid --filesize '{}'", benchmark.file_size))?;

    Ok(RunSettings {
        benchmark,
        output: OutputOptions {
            storage: StorageBackend::None,
            ..Default::default()
        },
        target_dir: args.target_dir.clone(),
        show_progress: !args.no_progress,
    })
}
