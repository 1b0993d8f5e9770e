//! Optional worker pool for the SVD sweeps.
//!
//! Work is split by output ownership: each task produces one whole row or
//! column, so results do not depend on the number of workers.

use las_common::{Error, Result};
use rayon::prelude::*;
use tracing::debug;

/// Runs indexed tasks on a private rayon pool, or inline without one.
#[derive(Debug)]
pub struct Parallelism {
    pool: Option<rayon::ThreadPool>,
}

impl Parallelism {
    /// `threads == 0` runs every task on the calling thread.
    pub fn new(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Ok(Self::inline());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("las-svd-{i}"))
            .build()
            .map_err(|e| Error::ThreadPool(e.to_string()))?;
        debug!(threads, "svd worker pool started");
        Ok(Self { pool: Some(pool) })
    }

    pub fn inline() -> Self {
        Self { pool: None }
    }

    pub fn threads(&self) -> usize {
        self.pool
            .as_ref()
            .map_or(0, rayon::ThreadPool::current_num_threads)
    }

    /// `(0..n).map(task)` with results in index order.
    pub fn map<T, F>(&self, n: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(|| (0..n).into_par_iter().map(&task).collect()),
            None => (0..n).map(task).collect(),
        }
    }
}

impl Default for Parallelism {
    fn default() -> Self {
        Self::inline()
    }
}
