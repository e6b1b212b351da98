//! Elementwise skeletons: map and farm.

use crate::executor::{ensure_len, Executor};
use crate::maybe_sync::{MaybeSend, MaybeSync};
use crate::threading::for_each_tile_mut;
use crate::Result;

impl Executor {
    /// Apply `f` to every element: `dest[i] = f(&src[i])`.
    ///
    /// Iterations are independent and run one tile per worker. The output
    /// does not depend on the worker count.
    #[tracing::instrument(level = "debug", skip_all, fields(n = src.len(), workers = self.n_workers()))]
    pub fn map_into<S, D, F>(&self, dest: &mut [D], src: &[S], f: F) -> Result<()>
    where
        S: MaybeSync,
        D: MaybeSend,
        F: Fn(&S) -> D + MaybeSync,
    {
        ensure_len("map destination", src.len(), dest.len())?;
        let plan = self.plan(src.len());
        for_each_tile_mut(dest, &plan, |_, tile, out| {
            for (slot, item) in out.iter_mut().zip(&src[tile.range()]) {
                *slot = f(item);
            }
        });
        Ok(())
    }

    /// In-place map: `buf[i] = f(&buf[i])`.
    #[tracing::instrument(level = "debug", skip_all, fields(n = buf.len(), workers = self.n_workers()))]
    pub fn map_in_place<T, F>(&self, buf: &mut [T], f: F)
    where
        T: MaybeSend,
        F: Fn(&T) -> T + MaybeSync,
    {
        let plan = self.plan(buf.len());
        for_each_tile_mut(buf, &plan, |_, _, out| {
            for slot in out.iter_mut() {
                *slot = f(slot);
            }
        });
    }

    /// Worker-pool map: same result as [`map_into`](Self::map_into), computed
    /// by at most `n_workers` threads that keep claiming the next unclaimed
    /// unit of work until none is left.
    ///
    /// There is no static partition: a fast worker ends up processing more
    /// units than a slow one. Each item is still processed exactly once.
    #[tracing::instrument(level = "debug", skip_all, fields(n = src.len(), workers = self.n_workers()))]
    pub fn farm<S, D, F>(&self, dest: &mut [D], src: &[S], f: F) -> Result<()>
    where
        S: MaybeSync,
        D: MaybeSend,
        F: Fn(&S) -> D + MaybeSync,
    {
        ensure_len("farm destination", src.len(), dest.len())?;
        let n_workers = self.n_workers().min(src.len());

        #[cfg(feature = "parallel")]
        if n_workers > 1 {
            return farm_threaded(dest, src, &f, n_workers);
        }

        let _ = n_workers;
        for (slot, item) in dest.iter_mut().zip(src) {
            *slot = f(item);
        }
        Ok(())
    }
}

#[cfg(feature = "parallel")]
fn farm_threaded<S, D, F>(dest: &mut [D], src: &[S], f: &F, n_workers: usize) -> Result<()>
where
    S: Sync,
    D: Send,
    F: Fn(&S) -> D + Sync,
{
    use crate::{SkeletonError, FARM_UNITS_PER_WORKER};

    let unit_len = src
        .len()
        .div_ceil(n_workers * FARM_UNITS_PER_WORKER)
        .max(1);

    // The queue is filled up front and closed; workers drain it.
    let (tx, rx) = crossbeam_channel::unbounded::<(&mut [D], &[S])>();
    for unit in dest.chunks_mut(unit_len).zip(src.chunks(unit_len)) {
        tx.send(unit)
            .map_err(|_| SkeletonError::WorkerPanicked("farm queue"))?;
    }
    drop(tx);

    tracing::trace!(n_workers, unit_len, units = rx.len(), "farm queue filled");

    std::thread::scope(|scope| {
        let workers: Vec<_> = (0..n_workers)
            .map(|_| {
                let rx = rx.clone();
                scope.spawn(move || {
                    for (out, items) in rx {
                        for (slot, item) in out.iter_mut().zip(items) {
                            *slot = f(item);
                        }
                    }
                })
            })
            .collect();

        let mut panicked = false;
        for worker in workers {
            panicked |= worker.join().is_err();
        }
        if panicked {
            return Err(SkeletonError::WorkerPanicked("farm worker"));
        }
        Ok(())
    })
}
