use disk_bench_model::ResultRecord;
use tabled::Tabled;

use crate::format::{format_time, mb_per_sec};

#[derive(Tabled, Debug, Clone, PartialEq)]
pub struct ResultRow {
    #[tabled(rename = "Test Type")]
    pub workload_type: String,
    #[tabled(rename = "Block Size")]
    pub block_size: String,
    #[tabled(rename = "Read IOPS", display = "float0")]
    pub read_iops: f64,
    #[tabled(rename = "Write IOPS", display = "float0")]
    pub write_iops: f64,
    #[tabled(rename = "Read MB/s", display = "float2")]
    pub read_mb_s: f64,
    #[tabled(rename = "Write MB/s", display = "float2")]
    pub write_mb_s: f64,
    #[tabled(rename = "Read Lat (µs)", display = "float2")]
    pub read_latency_us: f64,
    #[tabled(rename = "Write Lat (µs)", display = "float2")]
    pub write_latency_us: f64,
    #[tabled(rename = "CPU")]
    pub cpu: String,
    #[tabled(rename = "I/O Time")]
    pub io_time: String,
    #[tabled(rename = "Wall Time")]
    pub wall_time: String,
    #[tabled(rename = "Status")]
    pub status: String,
}

impl From<&ResultRecord> for ResultRow {
    fn from(record: &ResultRecord) -> Self {
        Self {
            workload_type: record.workload_type.to_string(),
            block_size: record.block_size.to_string(),
            read_iops: record.read_iops,
            write_iops: record.write_iops,
            read_mb_s: mb_per_sec(record.read_bw),
            write_mb_s: mb_per_sec(record.write_bw),
            read_latency_us: record.read_latency_us,
            write_latency_us: record.write_latency_us,
            cpu: record.cpu.clone(),
            io_time: format_time(record.io_time_sec),
            wall_time: if record.wall_time_sec > 0.0 {
                format_time(record.wall_time_sec)
            } else {
                "N/A".to_string()
            },
            status: record.status.to_string(),
        }
    }
}

fn float0(n: &f64) -> String {
    format!("{:.0}", n)
}

fn float2(n: &f64) -> String {
    format!("{:.2}", n)
}
