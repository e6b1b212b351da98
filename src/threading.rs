//! Tile runners: fan a tile plan out to rayon or walk it sequentially.
//!
//! Every parallel phase in this crate is "one task per tile". A plan never
//! holds more tiles than the configured worker count, so at most that many
//! tasks are in flight for one phase. Plans with a single tile, and builds
//! without the `parallel` feature, take the plain sequential loop, which
//! produces the same output.

use crate::maybe_sync::{MaybeSend, MaybeSync};
use crate::tile::{split_tiles_mut, Tile, TilePlan};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A raw pointer wrapper that is `Send` + `Sync`.
///
/// # Safety
/// The caller must guarantee that the pointed-to data outlives every task
/// holding the pointer and that concurrent tasks write disjoint elements.
pub(crate) struct SendPtr<T>(pub(crate) *mut T);

impl<T> Clone for SendPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SendPtr<T> {}

unsafe impl<T> Send for SendPtr<T> {}
unsafe impl<T> Sync for SendPtr<T> {}

impl<T> SendPtr<T> {
    pub(crate) fn as_ptr(self) -> *mut T {
        self.0
    }
}

/// Run `f(tile_index, tile)` once per tile and return the results in tile
/// order, independent of completion order.
pub(crate) fn collect_tiles<R, F>(plan: &TilePlan, f: F) -> Vec<R>
where
    R: MaybeSend,
    F: Fn(usize, Tile) -> R + MaybeSync,
{
    #[cfg(feature = "parallel")]
    if plan.len() > 1 {
        let f = &f;
        return plan
            .tiles()
            .par_iter()
            .enumerate()
            .map(|(t, tile)| f(t, *tile))
            .collect();
    }

    plan.iter().enumerate().map(|(t, tile)| f(t, *tile)).collect()
}

/// Run `f(tile_index, tile)` once per tile for its side effects.
pub(crate) fn for_each_tile<F>(plan: &TilePlan, f: F)
where
    F: Fn(usize, Tile) + MaybeSync,
{
    #[cfg(feature = "parallel")]
    if plan.len() > 1 {
        let f = &f;
        plan.tiles()
            .par_iter()
            .enumerate()
            .for_each(|(t, tile)| f(t, *tile));
        return;
    }

    for (t, tile) in plan.iter().enumerate() {
        f(t, *tile);
    }
}

/// Hand each tile of `plan` its own disjoint slice of `dest`.
///
/// `f` receives `(tile_index, tile, out)` where `out` is `dest[tile.range()]`.
pub(crate) fn for_each_tile_mut<T, F>(dest: &mut [T], plan: &TilePlan, f: F)
where
    T: MaybeSend,
    F: Fn(usize, Tile, &mut [T]) + MaybeSync,
{
    let parts = split_tiles_mut(dest, plan);

    #[cfg(feature = "parallel")]
    if parts.len() > 1 {
        let f = &f;
        parts
            .into_par_iter()
            .enumerate()
            .for_each(|(t, out)| f(t, plan[t], out));
        return;
    }

    for (t, out) in parts.into_iter().enumerate() {
        f(t, plan[t], out);
    }
}
