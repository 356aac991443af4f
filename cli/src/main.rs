use clap::Parser;

use crate::cli::{Command, DiskBenchCli};
use crate::settings::{resolve_run_settings, test_run_settings, ConfigFile};

mod browser;
mod cli;
mod history;
mod run;
mod settings;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = DiskBenchCli::parse();

    match cli.command {
        Command::Run(args) => {
            let file = match &args.config {
                Some(path) => {
                    log::debug!("Loading config from {}", path.display());
                    ConfigFile::load(path)?
                }
                None => ConfigFile::default(),
            };
            run::run_benchmarks(resolve_run_settings(&args, file)?)
        }
        Command::Test(args) => {
            println!("Running test benchmark...");
            run::run_benchmarks(test_run_settings(&args)?)
        }
        Command::History(args) => history::show_history(args),
        Command::Query(args) => history::run_query(args),
        Command::Stats(args) => history::show_stats(args),
        Command::Compare(args) => history::compare(args),
        Command::Export(args) => history::export(args),
    }
}
