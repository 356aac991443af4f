use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use disk_bench_history::{CsvStore, JsonStore, ResultSink, SqliteStore};
use disk_bench_report::{
    format_total_runtime, CsvFormatter, Formatter, JsonFormatter, PlotlyPlotter, Plotter,
    TableFormatter,
};
use disk_bench_runner::prelude::*;

use crate::browser::open_in_browser;
use crate::settings::{OutputOptions, RunSettings};

/// File name used by the CSV output format inside the results directory.
const CSV_OUTPUT_FILE_NAME: &str = "benchmark_results.csv";

pub fn run_benchmarks(settings: RunSettings) -> anyhow::Result<()> {
    let fio_path = fio_path()?;
    let fio_version = match fio_version(&fio_path) {
        Ok(version) => {
            log::info!("Using {version} from {}", fio_path.display());
            Some(version)
        }
        Err(e) => {
            log::warn!("Could not determine the fio version: {e:?}");
            None
        }
    };

    let runner = TrialRunner::new(fio_path, Platform::detect(), settings.target_dir.as_deref())
        .context("Failed to create the scratch directory for fio test files")?;
    check_free_space(runner.scratch_dir(), &settings.benchmark.file_size)?;

    let observer: Arc<dyn ProgressObserver> = if settings.show_progress {
        Arc::new(BarProgress::new())
    } else {
        Arc::new(NoProgress)
    };

    let executor = Executor::new()?;
    let benchmark = BenchmarkExecutor::new(
        settings.benchmark,
        runner,
        executor.shutdown_handle().clone(),
    )
    .with_observer(observer)
    .with_fio_version(fio_version);

    let BenchmarkRun { summary, records } = executor.block_on(benchmark.run_all())?;

    let errors = publish(&settings.output, &summary, &records);

    println!(
        "\nTotal runtime: {}",
        format_total_runtime(summary.total_wall_time_sec)
    );

    if !errors.is_empty() {
        return Err(anyhow!(
            "{} out of the run's outputs failed:\n{:#?}",
            errors.len(),
            errors
        ));
    }

    Ok(())
}

/// Hand the results to every configured output.
///
/// A failing output is logged and does not stop the others.
fn publish(
    output: &OutputOptions,
    summary: &RunSummary,
    records: &[ResultRecord],
) -> Vec<anyhow::Error> {
    let mut errors = Vec::new();
    let mut check = |what: &str, result: anyhow::Result<()>| {
        if let Err(e) = result {
            log::error!("Failed to {what}: {e:?}");
            errors.push(e.context(format!("Failed to {what}")));
        }
    };

    check("store results", store_results(output, summary, records));
    check(
        "append the run summary",
        append_run_summary(summary, &output.run_summary_path()),
    );
    check("format results", format_results(output, records));
    if output.plots && !records.is_empty() {
        check("generate plots", generate_plots(output, records));
    }

    errors
}

fn store_results(
    output: &OutputOptions,
    summary: &RunSummary,
    records: &[ResultRecord],
) -> anyhow::Result<()> {
    let sink: Box<dyn ResultSink> = match output.storage {
        StorageBackend::None => return Ok(()),
        StorageBackend::Sqlite => Box::new(
            SqliteStore::open(&output.db_path)
                .with_context(|| format!("Failed to open {}", output.db_path.display()))?,
        ),
        StorageBackend::Csv => Box::new(CsvStore::new(&output.results_dir)),
        StorageBackend::Json => Box::new(JsonStore::new(&output.results_dir)),
    };

    sink.save(summary, records)?;
    log::info!("Results stored with the {} backend", output.storage);
    Ok(())
}

fn format_results(output: &OutputOptions, records: &[ResultRecord]) -> anyhow::Result<()> {
    let formatter: Box<dyn Formatter> = match output.output_format {
        OutputFormat::Table => Box::new(TableFormatter::new()),
        OutputFormat::Json => Box::new(JsonFormatter::new(&output.json_output_dir)),
        OutputFormat::Csv => Box::new(CsvFormatter::new(
            output.results_dir.join(CSV_OUTPUT_FILE_NAME),
        )),
    };

    formatter.render(records)
}

fn generate_plots(output: &OutputOptions, records: &[ResultRecord]) -> anyhow::Result<()> {
    let plotter = PlotlyPlotter::new(&output.plot_output_dir, output.plot_types.clone());
    let files: Vec<PathBuf> = plotter.generate(records)?;
    println!("Plots saved to {}/", output.plot_output_dir.display());

    if output.interactive_plots {
        match files.first() {
            Some(first) => open_in_browser(first)?,
            None => log::warn!("No plots were generated, nothing to open"),
        }
    }

    Ok(())
}
