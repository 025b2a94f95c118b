//! Bounded worker pools
//!
//! Gantree: L0_Foundation → Parallel
//!
//! Calibration and estimation fan out over independent trials inside a
//! rayon pool sized by the caller's core count.

use crate::error::{EmqstError, EmqstResult};
use rayon::ThreadPool;

/// Build a pool with exactly `num_cores` workers
/// Gantree: worker_pool(cores) -> Result<ThreadPool> // 작업자 풀
pub fn worker_pool(num_cores: usize) -> EmqstResult<ThreadPool> {
    if num_cores == 0 {
        return Err(EmqstError::InvalidParameter(
            "core count must be at least 1".into(),
        ));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_cores)
        .thread_name(|i| format!("emqst-worker-{}", i))
        .build()
        .map_err(|e| EmqstError::InvalidParameter(format!("cannot build worker pool: {}", e)))
}

/// Cores available to this process
pub fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
