//! Tile partitioning shared by the reduce and scan engines.
//!
//! A tile plan cuts `[0, total_items)` into at most `n_workers` contiguous,
//! ordered, non-overlapping ranges whose lengths differ by at most one. The
//! first `leftover` tiles carry the extra element, so a given
//! `(total_items, n_workers)` pair always produces the same plan regardless
//! of how the runtime later schedules the tiles.

use smallvec::SmallVec;
use std::ops::Range;

/// Stack-allocated tile list. Tile count is bounded by the worker count,
/// which rarely exceeds a few dozen.
type TileVec = SmallVec<[Tile; 16]>;

/// A contiguous range of item indices handled by one worker for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Index of the first item in the tile.
    pub start: usize,
    /// Number of items in the tile (never zero inside a plan).
    pub len: usize,
}

impl Tile {
    /// One past the last item of the tile.
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }
}

/// Ordered tiles covering `[0, total_items)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilePlan {
    tiles: TileVec,
    total_items: usize,
}

impl TilePlan {
    /// Number of tiles.
    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Total number of items covered by the plan.
    #[inline]
    pub fn total_items(&self) -> usize {
        self.total_items
    }

    #[inline]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.tiles.iter()
    }
}

impl std::ops::Index<usize> for TilePlan {
    type Output = Tile;

    fn index(&self, t: usize) -> &Tile {
        &self.tiles[t]
    }
}

/// Start offset of tile `tile` when the first `leftover` tiles hold
/// `tile_size + 1` items and the rest hold `tile_size`.
#[inline]
pub fn tile_offset(tile: usize, leftover: usize, tile_size: usize) -> usize {
    if tile < leftover {
        tile * (tile_size + 1)
    } else {
        leftover * (tile_size + 1) + (tile - leftover) * tile_size
    }
}

/// Partition `[0, total_items)` into `min(total_items, n_workers)` tiles.
///
/// `tile_size = total_items / n_tiles` and `leftover = total_items % n_tiles`;
/// tile `t` gets `tile_size + 1` items when `t < leftover`. An empty item
/// range or a zero worker count yields an empty plan.
pub fn compute_tiles(total_items: usize, n_workers: usize) -> TilePlan {
    let n_tiles = total_items.min(n_workers);
    if n_tiles == 0 {
        return TilePlan {
            tiles: TileVec::new(),
            total_items,
        };
    }

    let tile_size = total_items / n_tiles;
    let leftover = total_items % n_tiles;

    let tiles = (0..n_tiles)
        .map(|t| Tile {
            start: tile_offset(t, leftover, tile_size),
            len: tile_size + usize::from(t < leftover),
        })
        .collect();

    TilePlan { tiles, total_items }
}

/// Carve `data` into one disjoint mutable sub-slice per tile of `plan`.
///
/// `plan` must cover exactly `data.len()` items.
pub(crate) fn split_tiles_mut<'a, T>(data: &'a mut [T], plan: &TilePlan) -> Vec<&'a mut [T]> {
    debug_assert_eq!(data.len(), plan.total_items());
    let mut parts = Vec::with_capacity(plan.len());
    let mut rest = data;
    for tile in plan.iter() {
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(tile.len);
        parts.push(head);
        rest = tail;
    }
    parts
}
