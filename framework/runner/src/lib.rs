mod command;
mod executor;
mod fio_binary;
mod matrix;
mod normalize;
mod platform;
mod preflight;
mod progress;
mod run;
mod shutdown;
mod trial;

pub mod prelude {
    pub use crate::command::{build_fio_args, trial_from_fio_args};
    pub use crate::executor::Executor;
    pub use crate::fio_binary::{fio_path, fio_version, resolve_fio_path, DISK_BENCH_FIO_PATH_ENV};
    pub use crate::matrix::expand;
    pub use crate::normalize::{ns_to_us, parse_fio_output, ParseError};
    pub use crate::platform::Platform;
    pub use crate::preflight::{available_space, check_free_space, space_shortfall};
    pub use crate::progress::{
        BarProgress, NoProgress, ProgressObserver, ProgressUpdate, TrialPosition,
    };
    pub use crate::run::{BenchmarkExecutor, BenchmarkRun};
    pub use crate::trial::{TrialRunner, SCRATCH_DIR_PREFIX};

    pub use disk_bench_core::prelude::*;
    pub use disk_bench_model::*;
}
