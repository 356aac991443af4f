mod result_table;

use disk_bench_model::ResultRecord;
use tabled::settings::Style;
use tabled::Table;

use crate::format::Formatter;

pub use result_table::ResultRow;

const DEFAULT_TITLE: &str = "Disk I/O Benchmark Results";

/// Prints results as a console table, one row per trial in run order.
pub struct TableFormatter {
    title: String,
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn render_to_string(&self, records: &[ResultRecord]) -> String {
        if records.is_empty() {
            return "No results to display".to_string();
        }

        let rows = records.iter().map(ResultRow::from).collect::<Vec<_>>();
        let mut table = Table::new(&rows);
        table.with(Style::modern());

        format!("\n{}\n{}", self.title, table)
    }
}

impl Formatter for TableFormatter {
    fn render(&self, records: &[ResultRecord]) -> anyhow::Result<()> {
        println!("{}", self.render_to_string(records));
        Ok(())
    }
}
