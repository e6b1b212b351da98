//! Selection and permutation: pack, gather, scatter.
//!
//! Every index filter is validated in full before the first element is
//! written, so a rejected call leaves the destination exactly as it was.

use crate::executor::{ensure_len, Executor};
use crate::maybe_sync::MaybeSendSync;
use crate::threading::{for_each_tile, for_each_tile_mut, SendPtr};
use crate::{Result, SkeletonError};

/// First filter entry that does not index into a buffer of length `len`.
fn check_bounds(indices: &[usize], len: usize) -> Result<()> {
    match indices.iter().position(|&index| index >= len) {
        Some(position) => {
            let err = SkeletonError::IndexOutOfBounds {
                position,
                index: indices[position],
                len,
            };
            tracing::debug!(%err, "rejected index filter");
            Err(err)
        }
        None => Ok(()),
    }
}

/// First filter entry that repeats an earlier target. Assumes bounds were
/// checked against `len`.
fn check_unique(indices: &[usize], len: usize) -> Result<()> {
    let mut taken = vec![false; len];
    for (position, &index) in indices.iter().enumerate() {
        if std::mem::replace(&mut taken[index], true) {
            let err = SkeletonError::DuplicateIndex { position, index };
            tracing::debug!(%err, "rejected index filter");
            return Err(err);
        }
    }
    Ok(())
}

impl Executor {
    /// Stable compaction: copy every `src[i]` with `keep[i]` set to the
    /// front of `dest`, preserving source order, and return how many were
    /// kept.
    ///
    /// `dest` only needs room for the kept elements; slots past the returned
    /// count are untouched. Runs sequentially in `O(n)`.
    #[tracing::instrument(level = "debug", skip_all, fields(n = src.len()))]
    pub fn pack<T: Clone>(&self, dest: &mut [T], src: &[T], keep: &[bool]) -> Result<usize> {
        ensure_len("pack filter", src.len(), keep.len())?;
        let kept = keep.iter().filter(|&&k| k).count();
        if dest.len() < kept {
            let err = SkeletonError::DestinationTooSmall {
                required: kept,
                actual: dest.len(),
            };
            tracing::debug!(%err, "rejected pack");
            return Err(err);
        }

        let selected = src.iter().zip(keep).filter(|(_, k)| **k).map(|(item, _)| item);
        for (slot, item) in dest.iter_mut().zip(selected) {
            *slot = item.clone();
        }
        Ok(kept)
    }

    /// Indexed read: `dest[i] = src[indices[i]]`.
    ///
    /// Fails with [`SkeletonError::IndexOutOfBounds`] naming the first entry
    /// with `indices[i] >= src.len()`; nothing is written in that case.
    #[tracing::instrument(level = "debug", skip_all, fields(n = src.len(), m = indices.len(), workers = self.n_workers()))]
    pub fn gather<T>(&self, dest: &mut [T], src: &[T], indices: &[usize]) -> Result<()>
    where
        T: Clone + MaybeSendSync,
    {
        ensure_len("gather destination", indices.len(), dest.len())?;
        check_bounds(indices, src.len())?;

        let plan = self.plan(indices.len());
        for_each_tile_mut(dest, &plan, |_, tile, out| {
            for (slot, &index) in out.iter_mut().zip(&indices[tile.range()]) {
                *slot = src[index].clone();
            }
        });
        Ok(())
    }

    /// Indexed write: `dest[indices[i]] = src[i]`.
    ///
    /// Every target must lie inside `dest` and no target may repeat; the
    /// first violation is reported as [`SkeletonError::IndexOutOfBounds`] or
    /// [`SkeletonError::DuplicateIndex`] before anything is written. Slots not
    /// targeted keep their value. Use
    /// [`priority_scatter`](Self::priority_scatter) when targets may collide.
    #[tracing::instrument(level = "debug", skip_all, fields(n = src.len(), workers = self.n_workers()))]
    pub fn scatter<T>(&self, dest: &mut [T], src: &[T], indices: &[usize]) -> Result<()>
    where
        T: Clone + MaybeSendSync,
    {
        ensure_len("scatter filter", src.len(), indices.len())?;
        check_bounds(indices, dest.len())?;
        check_unique(indices, dest.len())?;

        let dest_ptr = SendPtr(dest.as_mut_ptr());
        let plan = self.plan(src.len());
        for_each_tile(&plan, |_, tile| {
            for i in tile.range() {
                // SAFETY: indices were checked to be in bounds and pairwise
                // distinct, so every slot is written by exactly one iteration
                // while `dest` stays mutably borrowed for the whole call.
                unsafe {
                    *dest_ptr.as_ptr().add(indices[i]) = src[i].clone();
                }
            }
        });
        Ok(())
    }

    /// Indexed write where several sources may target one slot.
    ///
    /// For each targeted slot, the source with the highest position wins,
    /// independent of the worker count. Untargeted slots keep their value.
    /// Out-of-range targets are rejected like in [`scatter`](Self::scatter).
    #[tracing::instrument(level = "debug", skip_all, fields(n = src.len(), workers = self.n_workers()))]
    pub fn priority_scatter<T>(&self, dest: &mut [T], src: &[T], indices: &[usize]) -> Result<()>
    where
        T: Clone + MaybeSendSync,
    {
        ensure_len("scatter filter", src.len(), indices.len())?;
        check_bounds(indices, dest.len())?;

        // Resolve collisions first, then write each slot from its winner.
        let mut winner: Vec<Option<usize>> = vec![None; dest.len()];
        for (position, &index) in indices.iter().enumerate() {
            winner[index] = Some(position);
        }

        let plan = self.plan(dest.len());
        for_each_tile_mut(dest, &plan, |_, tile, out| {
            for (slot, source) in out.iter_mut().zip(&winner[tile.range()]) {
                if let Some(source) = *source {
                    *slot = src[source].clone();
                }
            }
        });
        Ok(())
    }
}
