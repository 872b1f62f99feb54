//! Worker pool sizing for region aggregation
//!
//! Regions are spread over Rayon's global pool; this module decides how large
//! that pool is and reports what the process ended up with.

use crate::errors::{Result, ZonalError};
use rayon::ThreadPoolBuilder;
use tracing::info;

/// Size of the pool used for per-region work. `None` keeps Rayon's default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParallelConfig {
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    #[must_use]
    pub const fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// One worker per logical core
    #[must_use]
    pub fn all_cores() -> Self {
        Self::new(Some(num_cpus::get()))
    }

    #[must_use]
    pub const fn with_threads(num_threads: usize) -> Self {
        Self::new(Some(num_threads))
    }

    /// Install the configured size as Rayon's global pool.
    ///
    /// Must run before the first extraction; the global pool can only be built once.
    ///
    /// # Errors
    ///
    /// Returns [`ZonalError::ThreadPoolError`] for a zero thread count or when the
    /// global pool already exists.
    pub fn setup_global_pool(&self) -> Result<()> {
        let Some(threads) = self.num_threads else {
            info!(threads = rayon::current_num_threads(), "using default worker pool");
            return Ok(());
        };
        if threads == 0 {
            return Err(ZonalError::ThreadPoolError(
                "worker thread count must be at least 1".to_string(),
            ));
        }

        ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("zonal-worker-{i}"))
            .build_global()
            .map_err(|e| {
                ZonalError::ThreadPoolError(format!("cannot start {threads} worker threads: {e}"))
            })?;
        info!(threads, "worker pool ready");
        Ok(())
    }

    /// Threads the region fan-out will actually use
    #[must_use]
    pub fn current_threads(&self) -> usize {
        rayon::current_num_threads()
    }
}

/// Snapshot of the pool against the machine it runs on
#[derive(Debug, Clone, Copy)]
pub struct ParallelInfo {
    pub pool_threads: usize,
    pub logical_cores: usize,
    pub physical_cores: usize,
}

/// Describe the current worker pool.
#[must_use]
pub fn get_parallel_info() -> ParallelInfo {
    ParallelInfo {
        pool_threads: rayon::current_num_threads(),
        logical_cores: num_cpus::get(),
        physical_cores: num_cpus::get_physical(),
    }
}

impl ParallelInfo {
    pub fn log(&self) {
        info!(
            pool_threads = self.pool_threads,
            logical_cores = self.logical_cores,
            physical_cores = self.physical_cores,
            "worker pool"
        );
    }
}
