//! Executor configuration.
//!
//! The [`Executor`] carries the two knobs every skeleton consults: the number
//! of workers a call may fan out to, and the queue depth used between stages
//! of a task-pipelined [`Pipeline`](crate::Pipeline). The skeletons
//! themselves live in their own modules as `impl Executor` blocks.

use crate::tile::{compute_tiles, TilePlan};
use crate::{Result, SkeletonError, DEFAULT_PIPELINE_DEPTH};

/// Maximum parallelism reported by the platform.
///
/// With the `parallel` feature this is the size of rayon's global pool
/// (which honours `RAYON_NUM_THREADS`); without it, 1.
pub fn max_parallelism() -> usize {
    #[cfg(feature = "parallel")]
    {
        rayon::current_num_threads().max(1)
    }
    #[cfg(not(feature = "parallel"))]
    {
        1
    }
}

/// Entry point for every skeleton.
///
/// Cheap to copy; holds no threads or buffers of its own.
///
/// ```rust
/// use tiled_skeletons::Executor;
///
/// let exec = Executor::new().with_workers(2).unwrap();
/// assert_eq!(exec.n_workers(), 2);
///
/// let mut out = vec![0i32; 4];
/// exec.map_into(&mut out, &[1, 2, 3, 4], |x| x * 10).unwrap();
/// assert_eq!(out, vec![10, 20, 30, 40]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Executor {
    n_workers: usize,
    pipeline_depth: usize,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    /// Executor using every worker the platform reports.
    pub fn new() -> Self {
        Self {
            n_workers: max_parallelism(),
            pipeline_depth: DEFAULT_PIPELINE_DEPTH,
        }
    }

    /// Executor that runs every skeleton on the calling thread.
    pub fn sequential() -> Self {
        Self {
            n_workers: 1,
            pipeline_depth: DEFAULT_PIPELINE_DEPTH,
        }
    }

    /// Set the worker count. Zero is rejected.
    pub fn with_workers(mut self, n_workers: usize) -> Result<Self> {
        if n_workers == 0 {
            return Err(SkeletonError::InvalidConfig("worker count must be at least 1"));
        }
        self.n_workers = n_workers;
        Ok(self)
    }

    /// Set the capacity of each inter-stage queue used by
    /// [`Pipeline::run_pipelined`](crate::Pipeline::run_pipelined). Zero is
    /// rejected.
    pub fn with_pipeline_depth(mut self, depth: usize) -> Result<Self> {
        if depth == 0 {
            return Err(SkeletonError::InvalidConfig("pipeline depth must be at least 1"));
        }
        self.pipeline_depth = depth;
        Ok(self)
    }

    #[inline]
    pub fn n_workers(&self) -> usize {
        self.n_workers
    }

    #[inline]
    pub fn pipeline_depth(&self) -> usize {
        self.pipeline_depth
    }

    /// Tile plan this executor uses for `n_items` items.
    pub fn plan(&self, n_items: usize) -> TilePlan {
        let plan = compute_tiles(n_items, self.n_workers);
        tracing::trace!(
            n_items,
            n_workers = self.n_workers,
            n_tiles = plan.len(),
            "tile plan"
        );
        plan
    }
}

/// Fail with [`SkeletonError::LengthMismatch`] unless `actual == expected`.
pub(crate) fn ensure_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        let err = SkeletonError::LengthMismatch {
            what,
            expected,
            actual,
        };
        tracing::debug!(%err, "rejected call");
        return Err(err);
    }
    Ok(())
}
