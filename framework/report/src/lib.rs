mod format;
mod plot;

pub use format::{
    format_time, format_total_runtime, mb_per_sec, write_csv, CsvFormatter, Formatter,
    JsonFormatter, ResultRow, TableFormatter, CSV_HEADERS, RESULTS_FILE_NAME,
};
pub use plot::{PlotlyPlotter, Plotter};
