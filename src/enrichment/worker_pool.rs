/*!
 * CPU worker pool for language separation.
 *
 * Language detection over many short text units is CPU-bound, so it runs
 * on a dedicated rayon pool instead of the async runtime. The pool is
 * built once per pipeline and reused for every job of every pass.
 */

use std::sync::Arc;

use anyhow::{Context, Result};
use log::debug;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::errors::EnrichmentError;

/// Fixed-size pool of worker threads
#[derive(Clone)]
pub struct WorkerPool {
    pool: Arc<ThreadPool>,
}

impl WorkerPool {
    /// Build a pool with `threads` workers, or one per available core
    pub fn new(threads: Option<usize>) -> Result<Self> {
        let threads = threads.filter(|&n| n > 0).unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("separator-{}", index))
            .build()
            .context("Failed to build worker pool")?;

        debug!("Worker pool started with {} threads", threads);

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Number of worker threads
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `job` on the pool and await its result
    ///
    /// The calling task is suspended, never blocked. A panicking job is
    /// reported as `EnrichmentError::Worker`.
    pub async fn run<F, T>(&self, job: F) -> Result<T, EnrichmentError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || pool.install(job))
            .await
            .map_err(|e| EnrichmentError::Worker(e.to_string()))
    }
}
