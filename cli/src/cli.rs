use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use disk_bench_history::DEFAULT_THRESHOLD;
use disk_bench_runner::prelude::{
    BlockSize, Mode, OutputFormat, PlotType, StorageBackend, WorkloadType,
};

use crate::settings::DEFAULT_DB_PATH;

#[derive(Parser, Debug)]
#[command(name = "disk-bench", version, about, long_about = None)]
pub struct DiskBenchCli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run disk I/O benchmarks with fio
    Run(Box<RunArgs>),

    /// Run a short benchmark in test mode, without storing any results
    Test(TestArgs),

    /// Show the most recent results stored in the history database
    History(HistoryArgs),

    /// Query the history database with custom SQL
    Query(QueryArgs),

    /// Calculate statistics over stored results
    Stats(StatsArgs),

    /// Compare the results of two runs
    Compare(CompareArgs),

    /// Export stored results to a CSV or JSON file
    Export(ExportArgs),
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Test mode. Defaults to `lean`, or `individual` when `--test-type` is given
    #[clap(long)]
    pub mode: Option<Mode>,

    /// Enable SSD-specific tests and submission batching
    #[clap(long)]
    pub ssd: bool,

    /// Mark the run as targeting a spinning disk
    #[clap(long)]
    pub hdd: bool,

    /// High concurrency mode, 4 jobs with an I/O depth of 16 each
    #[clap(long)]
    pub concurrency: bool,

    /// Quick mode, a 1G file and 15 seconds per trial
    #[clap(long)]
    pub quick: bool,

    /// Workload types for individual mode. Can be given multiple times
    #[clap(long = "test-type")]
    pub test_types: Vec<WorkloadType>,

    /// Block sizes for individual mode. Can be given multiple times. Defaults to all block sizes
    /// when only `--test-type` is given
    #[clap(long = "block-size")]
    pub block_sizes: Vec<BlockSize>,

    /// Runtime of each trial in seconds [default: 300]
    #[clap(long)]
    pub runtime: Option<u64>,

    /// Timeout per trial in seconds, 0 means the runtime plus 60 seconds [default: 0]
    #[clap(long)]
    pub timeout: Option<u64>,

    /// Size of the file fio works on [default: 10G]
    #[clap(long)]
    pub filesize: Option<String>,

    /// Outstanding I/Os per job when an asynchronous I/O engine is available [default: 4]
    #[clap(long)]
    pub io_depth: Option<u32>,

    /// Number of fio jobs when an asynchronous I/O engine is available [default: 1]
    #[clap(long)]
    pub num_jobs: Option<u32>,

    /// Go through the page cache instead of using direct I/O
    #[clap(long)]
    pub no_direct: bool,

    /// Do not fsync after each write
    #[clap(long)]
    pub no_fsync: bool,

    /// Directory that holds the fio test files. Defaults to the system temp directory
    #[clap(long)]
    pub target_dir: Option<PathBuf>,

    /// Results directory [default: results]
    #[clap(long)]
    pub output_dir: Option<PathBuf>,

    /// How results are presented after the run [default: table]
    #[clap(long)]
    pub output_format: Option<OutputFormat>,

    /// Directory for the JSON output format [default: results/json]
    #[clap(long)]
    pub json_output_dir: Option<PathBuf>,

    /// Where results are stored [default: sqlite]
    #[clap(long)]
    pub database: Option<StorageBackend>,

    /// Path to the SQLite database [default: results/benchmark_history.db]
    #[clap(long)]
    pub db_path: Option<PathBuf>,

    /// Generate HTML plots
    #[clap(long)]
    pub plots: bool,

    /// Plot types to generate. Can be given multiple times [default: bar]
    #[clap(long = "plot-types")]
    pub plot_types: Vec<PlotType>,

    /// Directory for plot files [default: results/plots]
    #[clap(long)]
    pub plot_output_dir: Option<PathBuf>,

    /// Open the first plot in a browser
    #[clap(long)]
    pub interactive_plots: bool,

    /// TOML file with defaults for any of these options. Options given on the command line win
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by
    /// anyone and is just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,
}

#[derive(Args, Debug)]
pub struct TestArgs {
    /// Enable SSD-specific tests
    #[clap(long)]
    pub ssd: bool,

    /// High concurrency mode
    #[clap(long)]
    pub concurrency: bool,

    /// Runtime of each trial in seconds
    #[clap(long, default_value = "15")]
    pub runtime: u64,

    /// Size of the file fio works on
    #[clap(long, default_value = "1G")]
    pub filesize: String,

    /// Directory that holds the fio test files
    #[clap(long)]
    pub target_dir: Option<PathBuf>,

    /// Do not show a progress bar on the CLI
    #[clap(long, default_value = "false")]
    pub no_progress: bool,
}

#[derive(Args, Debug)]
pub struct DatabaseArgs {
    /// Path to the SQLite database
    #[clap(long, default_value = DEFAULT_DB_PATH)]
    pub db_path: PathBuf,
}

#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Only results stored at or after this time, `YYYY-MM-DD HH:MM:SS` in UTC
    #[clap(long)]
    pub after: Option<String>,

    /// Only results stored at or before this time, `YYYY-MM-DD HH:MM:SS` in UTC
    #[clap(long)]
    pub before: Option<String>,

    /// Only these workload types. Can be given multiple times
    #[clap(long = "test-type")]
    pub test_types: Vec<WorkloadType>,

    /// Only these block sizes. Can be given multiple times
    #[clap(long = "block-size")]
    pub block_sizes: Vec<BlockSize>,

    /// At most this many results
    #[clap(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Number of results, or runs with `--runs`, to show
    #[clap(long, short = 'n', default_value = "10")]
    pub limit: usize,

    /// List runs instead of individual results
    #[clap(long)]
    pub runs: bool,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    /// The SQL to run, for example `SELECT test_type, AVG(read_iops) FROM benchmarks GROUP BY test_type`
    pub sql: String,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Only results of this run
    #[clap(long)]
    pub run: Option<String>,

    /// Add standard deviation, quartiles and sample count
    #[clap(long)]
    pub detailed: bool,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    /// The baseline run. Without run ids the two latest runs with the same configuration are
    /// compared
    #[clap(requires = "run2")]
    pub run1: Option<String>,

    /// The run compared against the baseline
    pub run2: Option<String>,

    /// Relative change at which a difference is reported as significant
    #[clap(long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Results directory that holds the run summary log
    #[clap(long, default_value = "results")]
    pub output_dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// File format to export to
    #[clap(long, value_parser = ["csv", "json"], default_value = "csv")]
    pub format: String,

    /// File to write
    #[clap(long, short)]
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        DiskBenchCli::command().debug_assert();
    }

    #[test]
    fn parses_repeated_run_options() {
        let cli = DiskBenchCli::try_parse_from([
            "disk-bench",
            "run",
            "--test-type",
            "randread",
            "--test-type",
            "trim",
            "--block-size",
            "4k",
            "--database",
            "csv",
            "--plot-types",
            "radar",
            "--runtime",
            "30",
        ])
        .unwrap();

        let Command::Run(args) = cli.command else {
            panic!("expected the run command");
        };
        assert_eq!(args.test_types, vec![WorkloadType::Randread, WorkloadType::Trim]);
        assert_eq!(args.block_sizes, vec![BlockSize::K4]);
        assert_eq!(args.database, Some(StorageBackend::Csv));
        assert_eq!(args.plot_types, vec![PlotType::Radar]);
        assert_eq!(args.runtime, Some(30));
        assert_eq!(args.mode, None);
    }

    #[test]
    fn rejects_unknown_choices() {
        assert!(DiskBenchCli::try_parse_from(["disk-bench", "run", "--block-size", "8k"]).is_err());
        assert!(DiskBenchCli::try_parse_from(["disk-bench", "run", "--mode", "huge"]).is_err());
    }

    #[test]
    fn compare_needs_both_runs() {
        assert!(DiskBenchCli::try_parse_from(["disk-bench", "compare", "abc"]).is_err());

        let cli = DiskBenchCli::try_parse_from(["disk-bench", "compare", "abc", "def"]).unwrap();
        let Command::Compare(args) = cli.command else {
            panic!("expected the compare command");
        };
        assert_eq!(args.run1.as_deref(), Some("abc"));
        assert_eq!(args.threshold, DEFAULT_THRESHOLD);
    }
}
