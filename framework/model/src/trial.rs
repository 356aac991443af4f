use crate::config::{BlockSize, WorkloadType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One cell of the benchmark matrix: a single fio invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrialSpec {
    pub workload_type: WorkloadType,
    pub block_size: BlockSize,
}

impl TrialSpec {
    pub const fn new(workload_type: WorkloadType, block_size: BlockSize) -> Self {
        Self {
            workload_type,
            block_size,
        }
    }
}

impl fmt::Display for TrialSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.workload_type, self.block_size)
    }
}
