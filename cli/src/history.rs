use std::path::Path;

use anyhow::{bail, Context};
use disk_bench_history::{
    calculate, compare_runs, format_basic, format_comparison, format_detailed,
    latest_comparable_runs, HistoryFilter, HistoryStore, QueryResult, SqliteStore, StoredResult,
    StoredRun,
};
use disk_bench_report::{CsvFormatter, Formatter, ResultRow};
use disk_bench_runner::prelude::{load_summary_runs, ResultRecord};
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::cli::{CompareArgs, ExportArgs, FilterArgs, HistoryArgs, QueryArgs, StatsArgs};
use crate::settings::run_summary_path;

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Run")]
    run_id: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(inline)]
    result: ResultRow,
}

impl From<&StoredResult> for HistoryRow {
    fn from(stored: &StoredResult) -> Self {
        Self {
            timestamp: stored.timestamp.clone(),
            run_id: stored.run_id.clone().unwrap_or_else(|| "-".to_string()),
            mode: stored.mode.clone(),
            result: ResultRow::from(&stored.record),
        }
    }
}

#[derive(Tabled)]
struct RunRow {
    #[tabled(rename = "Run")]
    run_id: String,
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Mode")]
    mode: String,
    #[tabled(rename = "File Size")]
    file_size: String,
    #[tabled(rename = "Runtime (s)")]
    runtime_seconds: i64,
    #[tabled(rename = "Trials")]
    trial_count: usize,
    #[tabled(rename = "Not OK")]
    failed_count: usize,
}

impl From<StoredRun> for RunRow {
    fn from(run: StoredRun) -> Self {
        Self {
            run_id: run.run_id,
            timestamp: run.timestamp,
            mode: run.mode,
            file_size: run.file_size,
            runtime_seconds: run.runtime_seconds,
            trial_count: run.trial_count,
            failed_count: run.failed_count,
        }
    }
}

fn open_store(db_path: &Path) -> anyhow::Result<SqliteStore> {
    SqliteStore::open(db_path)
        .with_context(|| format!("Failed to open history database {}", db_path.display()))
}

fn modern_table<T: Tabled>(rows: &[T]) -> String {
    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.to_string()
}

pub fn show_history(args: HistoryArgs) -> anyhow::Result<()> {
    let store = open_store(&args.database.db_path)?;

    if args.runs {
        let runs = store
            .runs(args.limit)?
            .into_iter()
            .map(RunRow::from)
            .collect::<Vec<_>>();
        if runs.is_empty() {
            println!("No runs stored yet");
        } else {
            println!("Last {} Benchmark Runs\n{}", runs.len(), modern_table(&runs));
        }
        return Ok(());
    }

    let results = store.history(args.limit)?;
    if results.is_empty() {
        println!("No results to display");
    } else {
        let rows = results.iter().map(HistoryRow::from).collect::<Vec<_>>();
        println!("Last {} Benchmark Results\n{}", rows.len(), modern_table(&rows));
    }

    Ok(())
}

pub fn run_query(args: QueryArgs) -> anyhow::Result<()> {
    let store = open_store(&args.database.db_path)?;
    let result = store
        .custom_query(&args.sql)
        .with_context(|| format!("Query failed: {}", args.sql))?;

    if result.rows.is_empty() {
        println!("Query returned no rows");
    } else {
        println!("Custom Query Results\n{}", query_table(&result));
    }
    Ok(())
}

fn query_table(result: &QueryResult) -> String {
    let mut builder = Builder::default();
    builder.push_record(result.columns.clone());
    for row in &result.rows {
        builder.push_record(row.iter().map(|value| match value {
            serde_json::Value::Null => "NULL".to_string(),
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        }));
    }

    let mut table = builder.build();
    table.with(Style::modern());
    table.to_string()
}

impl From<&FilterArgs> for HistoryFilter {
    fn from(args: &FilterArgs) -> Self {
        HistoryFilter {
            after: args.after.clone(),
            before: args.before.clone(),
            workload_types: args.test_types.clone(),
            block_sizes: args.block_sizes.clone(),
            limit: args.limit,
        }
    }
}

fn records_of(results: Vec<StoredResult>) -> Vec<ResultRecord> {
    results.into_iter().map(|stored| stored.record).collect()
}

pub fn show_stats(args: StatsArgs) -> anyhow::Result<()> {
    let store = open_store(&args.database.db_path)?;
    let results = match &args.run {
        Some(run_id) => store.run_records(run_id)?,
        None => store.query(&HistoryFilter::from(&args.filter))?,
    };
    log::debug!("Calculating statistics over {} results", results.len());

    let stats = calculate(&records_of(results), args.detailed)?;
    if args.detailed {
        println!("{}", format_detailed(&stats));
    } else {
        println!("{}", format_basic(&stats));
    }
    Ok(())
}

pub fn compare(args: CompareArgs) -> anyhow::Result<()> {
    let store = open_store(&args.database.db_path)?;

    let (run1, run2) = match (args.run1, args.run2) {
        (Some(run1), Some(run2)) => (run1, run2),
        _ => latest_runs_to_compare(&store, &args.output_dir)?,
    };
    log::info!("Comparing run {run1} against run {run2}");

    let before = records_of(store.run_records(&run1)?);
    let after = records_of(store.run_records(&run2)?);

    let comparison = compare_runs(&before, &after, args.threshold)?;
    println!("{}", format_comparison(&comparison));
    Ok(())
}

/// Prefer the run summary log, which knows which runs share a configuration. Without it the two
/// most recent runs in the database are used.
fn latest_runs_to_compare(
    store: &SqliteStore,
    results_dir: &Path,
) -> anyhow::Result<(String, String)> {
    let summary_path = run_summary_path(results_dir);
    if summary_path.exists() {
        log::debug!("Loading run summaries from {}", summary_path.display());
        let summaries = load_summary_runs(&summary_path)
            .with_context(|| format!("Failed to load {}", summary_path.display()))?;

        if let Some((older, newer)) = latest_comparable_runs(summaries) {
            return Ok((older.run_id, newer.run_id));
        }
        log::warn!(
            "No two runs in {} share a configuration",
            summary_path.display()
        );
    }

    let mut runs = store.runs(2)?;
    if runs.len() < 2 {
        bail!("Need at least two stored runs to compare, found {}", runs.len());
    }
    log::warn!("Comparing the two most recent runs, their configurations may differ");
    let newer = runs.remove(0);
    let older = runs.remove(0);
    Ok((older.run_id, newer.run_id))
}

pub fn export(args: ExportArgs) -> anyhow::Result<()> {
    let store = open_store(&args.database.db_path)?;
    let results = store.query(&HistoryFilter::from(&args.filter))?;
    if results.is_empty() {
        println!("No results to export");
        return Ok(());
    }

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    match args.format.as_str() {
        "json" => {
            let file = std::fs::File::create(&args.output)
                .with_context(|| format!("Failed to create {}", args.output.display()))?;
            serde_json::to_writer_pretty(std::io::BufWriter::new(file), &results)
                .with_context(|| format!("Failed to write {}", args.output.display()))?;
        }
        _ => CsvFormatter::new(&args.output).render(&records_of(results.clone()))?,
    }

    println!("Exported {} results to {}", results.len(), args.output.display());
    Ok(())
}
