//! Multi-stage elementwise pipelines.
//!
//! A [`Pipeline`] computes `dest[i] = stage_k(… stage_1(src[i]))` for every
//! item. The three schedules produce identical output and differ only in how
//! work is ordered:
//!
//! - stage-major: a full parallel map per stage with a barrier in between;
//! - item-major: one parallel pass where each item runs through all stages;
//! - task-pipelined: one thread per stage, connected by bounded queues, so
//!   stage `j` works on an item while stage `j - 1` already works on a later
//!   one.

use crate::executor::{ensure_len, Executor};
use crate::maybe_sync::MaybeSendSync;
use crate::threading::for_each_tile_mut;
use crate::Result;

#[cfg(feature = "parallel")]
type StageFn<'a, T> = dyn Fn(&T) -> T + Send + Sync + 'a;
#[cfg(not(feature = "parallel"))]
type StageFn<'a, T> = dyn Fn(&T) -> T + 'a;

/// Ordered list of elementwise stages.
///
/// ```rust
/// use tiled_skeletons::{Executor, Pipeline};
///
/// let pipeline = Pipeline::new().stage(|x: &i64| x + 1).stage(|x: &i64| x * 10);
/// let mut out = vec![0i64; 3];
/// pipeline
///     .run_item_major(&Executor::new(), &mut out, &[1, 2, 3])
///     .unwrap();
/// assert_eq!(out, vec![20, 30, 40]);
/// ```
pub struct Pipeline<'a, T> {
    stages: Vec<Box<StageFn<'a, T>>>,
}

impl<T> Default for Pipeline<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Pipeline<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .finish()
    }
}

impl<'a, T> Pipeline<'a, T> {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage. Stages run in the order they are added.
    pub fn stage<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> T + MaybeSendSync + 'a,
    {
        self.stages.push(Box::new(f));
        self
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage on one item, in order. `None` for an empty pipeline.
    pub fn apply(&self, item: &T) -> Option<T> {
        let (first, rest) = self.stages.split_first()?;
        Some(rest.iter().fold(first(item), |value, stage| stage(&value)))
    }
}

impl<T> Pipeline<'_, T>
where
    T: Clone + MaybeSendSync,
{
    /// Stage-major schedule: stage 1 maps `src` into `dest`, every later
    /// stage maps `dest` in place, with a barrier after each stage.
    ///
    /// An empty pipeline leaves `dest` untouched.
    #[tracing::instrument(level = "debug", skip_all, fields(n = src.len(), stages = self.len()))]
    pub fn run_stage_major(&self, exec: &Executor, dest: &mut [T], src: &[T]) -> Result<()> {
        ensure_len("pipeline destination", src.len(), dest.len())?;
        let Some((first, rest)) = self.stages.split_first() else {
            return Ok(());
        };

        exec.map_into(dest, src, &**first)?;
        for stage in rest {
            exec.map_in_place(dest, &**stage);
        }
        Ok(())
    }

    /// Item-major schedule: a single parallel pass in which each item runs
    /// through all stages before the worker moves on.
    #[tracing::instrument(level = "debug", skip_all, fields(n = src.len(), stages = self.len()))]
    pub fn run_item_major(&self, exec: &Executor, dest: &mut [T], src: &[T]) -> Result<()> {
        ensure_len("pipeline destination", src.len(), dest.len())?;
        if self.is_empty() {
            return Ok(());
        }

        let plan = exec.plan(src.len());
        for_each_tile_mut(dest, &plan, |_, tile, out| {
            for (slot, item) in out.iter_mut().zip(&src[tile.range()]) {
                if let Some(value) = self.apply(item) {
                    *slot = value;
                }
            }
        });
        Ok(())
    }

    /// Task-pipelined schedule: each stage runs on its own thread and hands
    /// `(index, value)` pairs to the next stage through a bounded queue of
    /// [`Executor::pipeline_depth`] slots. The first stage reads `src` in
    /// index order; the calling thread drains the last queue into `dest`.
    ///
    /// A full queue blocks its producer, so at most `depth` items wait
    /// between any two stages. Without the `parallel` feature this runs the
    /// item-major schedule on the calling thread.
    #[tracing::instrument(level = "debug", skip_all, fields(n = src.len(), stages = self.len(), depth = exec.pipeline_depth()))]
    pub fn run_pipelined(&self, exec: &Executor, dest: &mut [T], src: &[T]) -> Result<()> {
        ensure_len("pipeline destination", src.len(), dest.len())?;
        if self.is_empty() {
            return Ok(());
        }

        #[cfg(feature = "parallel")]
        {
            self.run_stage_threads(exec.pipeline_depth(), dest, src)
        }
        #[cfg(not(feature = "parallel"))]
        {
            self.run_item_major(&Executor::sequential(), dest, src)
        }
    }

    #[cfg(feature = "parallel")]
    fn run_stage_threads(&self, depth: usize, dest: &mut [T], src: &[T]) -> Result<()> {
        use crate::SkeletonError;
        use crossbeam_channel::bounded;

        let Some((first, rest)) = self.stages.split_first() else {
            return Ok(());
        };

        std::thread::scope(|scope| {
            let mut threads = Vec::with_capacity(self.stages.len());

            let (tx, mut rx) = bounded::<(usize, T)>(depth);
            let first: &StageFn<'_, T> = &**first;
            threads.push(scope.spawn(move || {
                for (index, item) in src.iter().enumerate() {
                    if tx.send((index, first(item))).is_err() {
                        break;
                    }
                }
            }));

            for stage in rest {
                let (tx, next_rx) = bounded::<(usize, T)>(depth);
                let input = std::mem::replace(&mut rx, next_rx);
                let stage: &StageFn<'_, T> = &**stage;
                threads.push(scope.spawn(move || {
                    for (index, value) in input {
                        if tx.send((index, stage(&value))).is_err() {
                            break;
                        }
                    }
                }));
            }

            // Queues are FIFO, so items arrive in index order.
            for (index, value) in rx {
                dest[index] = value;
            }

            let mut panicked = false;
            for thread in threads {
                panicked |= thread.join().is_err();
            }
            if panicked {
                return Err(SkeletonError::WorkerPanicked("pipeline stage"));
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_stage<'a>() -> Pipeline<'a, u64> {
        Pipeline::new()
            .stage(|x: &u64| x + 3)
            .stage(|x: &u64| x.wrapping_mul(x + 1))
            .stage(|x: &u64| x ^ 0x5a5a)
    }

    fn expected(src: &[u64]) -> Vec<u64> {
        src.iter()
            .map(|x| {
                let y = x + 3;
                let z = y.wrapping_mul(y + 1);
                z ^ 0x5a5a
            })
            .collect()
    }

    #[test]
    fn test_apply() {
        let pipeline = three_stage();
        assert_eq!(pipeline.len(), 3);
        assert_eq!(pipeline.apply(&4), Some(expected(&[4])[0]));
        assert_eq!(Pipeline::<u64>::new().apply(&4), None);
    }

    #[test]
    fn test_schedules_agree() {
        let src: Vec<u64> = (0..777).collect();
        let want = expected(&src);
        let pipeline = three_stage();
        for workers in [1, 2, 5] {
            let exec = Executor::new().with_workers(workers).unwrap();

            let mut dest = vec![0u64; src.len()];
            pipeline.run_stage_major(&exec, &mut dest, &src).unwrap();
            assert_eq!(dest, want, "stage-major workers={workers}");

            let mut dest = vec![0u64; src.len()];
            pipeline.run_item_major(&exec, &mut dest, &src).unwrap();
            assert_eq!(dest, want, "item-major workers={workers}");

            let mut dest = vec![0u64; src.len()];
            pipeline.run_pipelined(&exec, &mut dest, &src).unwrap();
            assert_eq!(dest, want, "pipelined workers={workers}");
        }
    }

    #[test]
    fn test_pipelined_depth_one() {
        let src: Vec<u64> = (0..200).collect();
        let exec = Executor::new().with_pipeline_depth(1).unwrap();
        let mut dest = vec![0u64; src.len()];
        three_stage().run_pipelined(&exec, &mut dest, &src).unwrap();
        assert_eq!(dest, expected(&src));
    }

    #[test]
    fn test_empty_pipeline_is_noop() {
        let exec = Executor::new();
        let pipeline = Pipeline::<u64>::new();
        let mut dest = vec![9u64; 3];
        pipeline.run_stage_major(&exec, &mut dest, &[1, 2, 3]).unwrap();
        pipeline.run_item_major(&exec, &mut dest, &[1, 2, 3]).unwrap();
        pipeline.run_pipelined(&exec, &mut dest, &[1, 2, 3]).unwrap();
        assert_eq!(dest, vec![9, 9, 9]);
    }

    #[test]
    fn test_single_stage_and_no_items() {
        let exec = Executor::new();
        let pipeline = Pipeline::new().stage(|x: &i32| -x);
        let mut dest = vec![0; 2];
        pipeline.run_pipelined(&exec, &mut dest, &[4, 5]).unwrap();
        assert_eq!(dest, vec![-4, -5]);

        let mut empty: Vec<i32> = Vec::new();
        pipeline.run_pipelined(&exec, &mut empty, &[]).unwrap();
        pipeline.run_stage_major(&exec, &mut empty, &[]).unwrap();
    }

    #[test]
    fn test_length_mismatch() {
        let exec = Executor::new();
        let mut dest = vec![0u64; 2];
        assert!(three_stage().run_pipelined(&exec, &mut dest, &[1]).is_err());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_stage_panic_is_reported() {
        let exec = Executor::new();
        let pipeline = Pipeline::new()
            .stage(|x: &u32| x + 1)
            .stage(|x: &u32| {
                if *x == 50 {
                    panic!("stage failure");
                }
                *x
            });
        let src: Vec<u32> = (0..100).collect();
        let mut dest = vec![0u32; src.len()];
        let err = pipeline.run_pipelined(&exec, &mut dest, &src).unwrap_err();
        assert_eq!(err, crate::SkeletonError::WorkerPanicked("pipeline stage"));
    }
}
