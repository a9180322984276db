use crate::error::{ProcessingError, Result};
use crate::utils::progress::ProgressReporter;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Runs pure per-group computations on a bounded rayon pool.
///
/// Results come back in input order, so callers can write them out exactly as
/// a sequential loop would have.
pub struct ParallelProcessor {
    max_workers: usize,
    chunk_size: usize,
}

impl ParallelProcessor {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            chunk_size: 4096,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    fn pool(&self) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))
    }

    /// Apply `f` to every item, one task per item
    pub fn map<T, R, F>(&self, items: &[T], progress: Option<&ProgressReporter>, f: F) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        let processed = AtomicUsize::new(0);
        let pool = self.pool()?;

        let results = pool.install(|| {
            items
                .par_iter()
                .map(|item| {
                    let result = f(item);
                    processed.fetch_add(1, Ordering::Relaxed);
                    if let Some(p) = progress {
                        p.increment(1);
                    }
                    result
                })
                .collect()
        });

        tracing::debug!(
            "Processed {} items on {} workers",
            processed.load(Ordering::Relaxed),
            self.max_workers
        );
        Ok(results)
    }

    /// Apply `f` to fixed-size chunks and flatten, for cheap per-item work
    pub fn map_chunked<T, R, F>(&self, items: &[T], f: F) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        let pool = self.pool()?;
        let chunks: Vec<Vec<R>> = pool.install(|| {
            items
                .par_chunks(self.chunk_size)
                .map(|chunk| chunk.iter().map(&f).collect())
                .collect()
        });
        Ok(chunks.into_iter().flatten().collect())
    }
}

impl Default for ParallelProcessor {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_preserves_order() {
        let items: Vec<u32> = (0..100).collect();
        let doubled = ParallelProcessor::new(4).map(&items, None, |x| x * 2).unwrap();
        assert_eq!(doubled, (0..100).map(|x| x * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_map_chunked_flattens_in_order() {
        let items: Vec<u32> = (0..10).collect();
        let squared = ParallelProcessor::new(2)
            .with_chunk_size(3)
            .map_chunked(&items, |x| x * x)
            .unwrap();
        assert_eq!(squared, vec![0, 1, 4, 9, 16, 25, 36, 49, 64, 81]);
    }

    #[test]
    fn test_zero_workers_is_clamped() {
        assert_eq!(ParallelProcessor::new(0).max_workers(), 1);
    }
}
