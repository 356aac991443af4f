mod csv;
mod json;
mod table;

use disk_bench_model::ResultRecord;

pub use csv::{write_csv, CsvFormatter, CSV_HEADERS};
pub use json::{JsonFormatter, RESULTS_FILE_NAME};
pub use table::{ResultRow, TableFormatter};

/// Presents the records of a finished run.
pub trait Formatter {
    fn render(&self, records: &[ResultRecord]) -> anyhow::Result<()>;
}

/// Bytes per second to MiB per second.
pub fn mb_per_sec(bytes_per_sec: u64) -> f64 {
    bytes_per_sec as f64 / 1024.0 / 1024.0
}

/// Short human form of a trial duration: `850ms`, `15.0s` or `05:03`.
pub fn format_time(seconds: f64) -> String {
    if seconds < 1.0 {
        format!("{:.0}ms", seconds * 1000.0)
    } else if seconds < 60.0 {
        format!("{seconds:.1}s")
    } else {
        let whole = seconds as u64;
        format!("{:02}:{:02}", whole / 60, whole % 60)
    }
}

/// Human form of the time a whole run took: `1h 2m 3s`, `4m 5s` or `6s`.
pub fn format_total_runtime(seconds: f64) -> String {
    let whole = seconds.max(0.0) as u64;
    let (hours, minutes, secs) = (whole / 3600, (whole % 3600) / 60, whole % 60);

    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trial_durations() {
        assert_eq!(format_time(0.0), "0ms");
        assert_eq!(format_time(0.25), "250ms");
        assert_eq!(format_time(15.023), "15.0s");
        assert_eq!(format_time(59.94), "59.9s");
        assert_eq!(format_time(303.9), "05:03");
    }

    #[test]
    fn run_durations() {
        assert_eq!(format_total_runtime(6.7), "6s");
        assert_eq!(format_total_runtime(245.0), "4m 5s");
        assert_eq!(format_total_runtime(3723.0), "1h 2m 3s");
    }

    #[test]
    fn bandwidth_in_mib() {
        assert_eq!(mb_per_sec(41943040), 40.0);
        assert_eq!(mb_per_sec(0), 0.0);
    }
}
