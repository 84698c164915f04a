//! Rayon thread pool sizing for batch selection and genetic training.

use rayon::ThreadPoolBuilder;

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerPool {
    /// Number of worker threads. 0 means the global Rayon pool (all cores).
    pub workers: usize,
}

impl WorkerPool {
    pub fn with_workers(workers: usize) -> Self {
        Self { workers }
    }

    /// Runs `f` on a pool with this worker count. Falls back to the global pool
    /// if a dedicated one cannot be built.
    pub fn install<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        if self.workers == 0 {
            return f();
        }

        match ThreadPoolBuilder::new().num_threads(self.workers).build() {
            Ok(pool) => pool.install(f),
            Err(e) => {
                tracing::warn!(
                    "Could not build a {}-thread pool ({}), using the global pool",
                    self.workers,
                    e
                );
                f()
            }
        }
    }
}
