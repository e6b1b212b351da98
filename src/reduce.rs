//! Two-phase tiled reduction.
//!
//! Phase 1 folds every tile into one partial in parallel; phase 2 folds the
//! partials sequentially in tile order. Since there are at most `n_workers`
//! partials, the sequential phase is short, and walking it in tile order keeps
//! the global fold order equal to source order.

use crate::executor::Executor;
use crate::maybe_sync::{MaybeSendSync, MaybeSync};
use crate::threading::collect_tiles;

/// Left-to-right fold of one tile, seeded with its first element.
///
/// Returns `None` only for an empty tile. Shared with the scan engine.
pub(crate) fn fold_tile<T, F>(items: &[T], op: &F) -> Option<T>
where
    T: Clone,
    F: Fn(&T, &T) -> T,
{
    let (first, rest) = items.split_first()?;
    Some(rest.iter().fold(first.clone(), |acc, item| op(&acc, item)))
}

impl Executor {
    /// Fold `src` with the associative operator `op`.
    ///
    /// Returns `T::default()` (the zero element) for an empty source and
    /// `src[0]` unchanged for a single element. `op` is never applied to the
    /// zero element, and never assumed commutative.
    #[tracing::instrument(level = "debug", skip_all, fields(n = src.len(), workers = self.n_workers()))]
    pub fn reduce<T, F>(&self, src: &[T], op: F) -> T
    where
        T: Clone + Default + MaybeSendSync,
        F: Fn(&T, &T) -> T + MaybeSync,
    {
        if src.is_empty() {
            return T::default();
        }

        let plan = self.plan(src.len());

        // Phase 1: one partial per tile
        let partials = collect_tiles(&plan, |_, tile| fold_tile(&src[tile.range()], &op));

        // Phase 2: combine partials in tile order
        let mut partials = partials.into_iter().flatten();
        match partials.next() {
            Some(first) => partials.fold(first, |acc, partial| op(&acc, &partial)),
            None => T::default(),
        }
    }

    /// [`reduce`](Self::reduce) writing into a caller-owned slot.
    ///
    /// Any previous value of `dest` is discarded; an empty source leaves the
    /// zero element behind.
    pub fn reduce_into<T, F>(&self, dest: &mut T, src: &[T], op: F)
    where
        T: Clone + Default + MaybeSendSync,
        F: Fn(&T, &T) -> T + MaybeSync,
    {
        *dest = self.reduce(src, op);
    }
}
