mod plotly;

use std::path::PathBuf;

use disk_bench_model::ResultRecord;

pub use plotly::PlotlyPlotter;

/// Produces chart files from the records of a run.
pub trait Plotter {
    /// Write the charts and return the paths of the files written, in generation order.
    fn generate(&self, records: &[ResultRecord]) -> anyhow::Result<Vec<PathBuf>>;
}
