use disk_bench_model::{BenchmarkConfig, BlockSize, Mode, TrialSpec, WorkloadType};

const TEST_TRIALS: [TrialSpec; 3] = [
    TrialSpec::new(WorkloadType::Randread, BlockSize::K4),
    TrialSpec::new(WorkloadType::Randwrite, BlockSize::K64),
    TrialSpec::new(WorkloadType::Read, BlockSize::M1),
];

const CORE_WORKLOADS: [WorkloadType; 4] = [
    WorkloadType::Randread,
    WorkloadType::Randwrite,
    WorkloadType::Read,
    WorkloadType::Write,
];

const LEAN_BLOCK_SIZES: [BlockSize; 3] = [BlockSize::K4, BlockSize::K64, BlockSize::M1];

const FULL_BLOCK_SIZES: [BlockSize; 4] = [BlockSize::K4, BlockSize::K64, BlockSize::M1, BlockSize::K512];

const MIXED_TRIAL: TrialSpec = TrialSpec::new(WorkloadType::Randrw, BlockSize::K4);

const TRIM_TRIAL: TrialSpec = TrialSpec::new(WorkloadType::Trim, BlockSize::K4);

/// Expand the configured mode into the ordered list of trials to run.
///
/// The order is the execution order and the order results are displayed in. An empty list means
/// the configuration cannot produce any trial, which callers must report rather than run nothing.
pub fn expand(config: &BenchmarkConfig) -> Vec<TrialSpec> {
    match config.mode {
        Mode::Test => TEST_TRIALS.to_vec(),
        Mode::Lean => standard_matrix(&LEAN_BLOCK_SIZES, config.ssd_mode),
        Mode::Full => standard_matrix(&FULL_BLOCK_SIZES, config.ssd_mode),
        Mode::Individual => {
            if config.workload_types.is_empty() || config.block_sizes.is_empty() {
                return Vec::new();
            }

            config
                .workload_types
                .iter()
                .flat_map(|&workload_type| {
                    config
                        .block_sizes
                        .iter()
                        .map(move |&block_size| TrialSpec::new(workload_type, block_size))
                })
                // Trim only makes sense at 4k granularity
                .filter(|trial| {
                    trial.workload_type != WorkloadType::Trim || trial.block_size == BlockSize::K4
                })
                .collect()
        }
    }
}

fn standard_matrix(block_sizes: &[BlockSize], ssd_mode: bool) -> Vec<TrialSpec> {
    let mut trials = block_sizes
        .iter()
        .flat_map(|&block_size| {
            CORE_WORKLOADS
                .iter()
                .map(move |&workload_type| TrialSpec::new(workload_type, block_size))
        })
        .collect::<Vec<_>>();

    trials.push(MIXED_TRIAL);
    if ssd_mode {
        trials.push(TRIM_TRIAL);
    }

    trials
}
