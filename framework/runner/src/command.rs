use crate::platform::Platform;
use disk_bench_model::{BenchmarkConfig, TrialSpec, WorkloadType};
use std::path::Path;

/// Share of reads in the mixed random workload.
const MIXED_READ_PERCENT: u32 = 70;

/// Batch depth used to keep SSD submission queues full.
const SSD_BATCH_DEPTH: u32 = 32;

const HIGH_CONCURRENCY_JOBS: u32 = 4;
const HIGH_CONCURRENCY_DEPTH: u32 = 16;

/// Build the fio argument vector for one trial. The program name is not included.
///
/// Every flag is emitted at most once, so the resolved job count and queue depth are unambiguous.
pub fn build_fio_args(
    trial: TrialSpec,
    config: &BenchmarkConfig,
    target_file: &Path,
    platform: Platform,
) -> Vec<String> {
    let mut args = vec![
        "--name=benchmark".to_string(),
        format!("--filename={}", target_file.display()),
        format!("--size={}", config.file_size),
        format!("--rw={}", trial.workload_type),
        format!("--bs={}", trial.block_size),
        "--output-format=json".to_string(),
        "--time_based".to_string(),
    ];

    if platform.supports_async_io_engine {
        let (io_depth, num_jobs) = if config.high_concurrency {
            (HIGH_CONCURRENCY_DEPTH, HIGH_CONCURRENCY_JOBS)
        } else {
            (config.io_depth, config.num_jobs)
        };
        args.push(format!("--iodepth={io_depth}"));
        args.push(format!("--numjobs={num_jobs}"));
    } else {
        args.push("--ioengine=psync".to_string());
        args.push("--iodepth=1".to_string());
        args.push("--numjobs=1".to_string());
    }

    args.push(format!("--runtime={}", config.runtime_seconds));

    if config.direct_io && platform.supports_direct_io {
        args.push("--direct=1".to_string());
    }

    args.push(format!("--fsync={}", u8::from(config.sync_each_op)));

    if trial.workload_type == WorkloadType::Randrw {
        args.push(format!("--rwmixread={MIXED_READ_PERCENT}"));
    }

    if config.ssd_mode && platform.supports_async_io_engine {
        args.push(format!("--iodepth_batch_submit_max={SSD_BATCH_DEPTH}"));
        args.push(format!("--iodepth_batch_complete_max={SSD_BATCH_DEPTH}"));
    }

    args
}

/// Recover the trial from an argument vector produced by [build_fio_args].
pub fn trial_from_fio_args(args: &[String]) -> Option<TrialSpec> {
    let value_of = |flag: &str| {
        args.iter()
            .find_map(|arg| arg.strip_prefix(flag).and_then(|rest| rest.strip_prefix('=')))
    };

    let workload_type = value_of("--rw")?.parse().ok()?;
    let block_size = value_of("--bs")?.parse().ok()?;

    Some(TrialSpec::new(workload_type, block_size))
}
