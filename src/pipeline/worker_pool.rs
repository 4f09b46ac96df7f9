// In: src/pipeline/worker_pool.rs

//! Bounded worker pool for per-column analysis.
//!
//! A fresh rayon pool is built for every partition and dropped when the
//! partition is done. Dropping the pool joins its threads, so the pool is
//! released on the error path as well.

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::Result;

/// Number of workers for `max_workers`: one core is left to the driver and
/// at least one worker is always used.
pub fn worker_count(max_workers: usize) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    bounded_worker_count(cores, max_workers)
}

fn bounded_worker_count(cores: usize, max_workers: usize) -> usize {
    cores.saturating_sub(1).min(max_workers).max(1)
}

/// Builds a pool with exactly `num_threads` workers.
pub fn build_pool(num_threads: usize) -> Result<ThreadPool> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(num_threads.max(1))
        .thread_name(|i| format!("synthstats-worker-{}", i))
        .build()?;
    Ok(pool)
}
