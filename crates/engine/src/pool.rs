//! Bounded worker pool for recompute calls

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

/// Upper bound on explicitly requested workers
pub const MAX_WORKERS: usize = 256;

/// Runs recompute calls with a fixed amount of parallelism
///
/// `workers == 0` uses rayon's global pool, `workers == 1` runs inline on the
/// calling thread, anything larger gets a dedicated pool of that size.
/// Results always come back in input order.
pub struct RecomputePool {
    workers: usize,
    pool: Option<ThreadPool>,
}

impl RecomputePool {
    /// Create a pool with `workers` threads (clamped to [`MAX_WORKERS`])
    pub fn new(workers: usize) -> Result<Self, ThreadPoolBuildError> {
        let workers = workers.min(MAX_WORKERS);
        let pool = if workers > 1 {
            Some(
                ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .thread_name(|i| format!("gl-recompute-{}", i))
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self { workers, pool })
    }

    /// Run everything on the calling thread
    pub fn sequential() -> Self {
        Self {
            workers: 1,
            pool: None,
        }
    }

    /// Configured worker count (0 = rayon default)
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Apply `f` to every item, preserving order
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        match (&self.pool, self.workers) {
            (Some(pool), _) => pool.install(|| items.par_iter().map(&f).collect()),
            (None, 1) => items.iter().map(&f).collect(),
            (None, _) => items.par_iter().map(&f).collect(),
        }
    }
}

impl Default for RecomputePool {
    fn default() -> Self {
        Self::sequential()
    }
}
