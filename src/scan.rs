//! Three-phase tiled prefix scan.
//!
//! Element 0 is the seed and `[1, n)` is tiled:
//!
//! 1. (parallel) every tile but the last is reduced to one local total;
//! 2. (sequential, one step per tile) the totals are folded into a carry-in
//!    per tile: the fold of everything before the tile's first element;
//! 3. (parallel) every tile re-walks its elements, seeded with its carry-in,
//!    and writes the running fold straight into its slice of `dest`.
//!
//! Only phase 2 is sequential, and it is as long as the tile count, so the
//! latency is `O(n / workers + workers)`. The result equals the strict
//! left-to-right running fold for any associative operator.

use crate::executor::{ensure_len, Executor};
use crate::maybe_sync::{MaybeSendSync, MaybeSync};
use crate::reduce::fold_tile;
use crate::threading::{collect_tiles, for_each_tile_mut};
use crate::Result;

impl Executor {
    /// Inclusive scan: `dest[i] = src[0] ⊕ src[1] ⊕ … ⊕ src[i]`.
    ///
    /// `op` must be associative; it is never assumed commutative. An empty
    /// source is a no-op.
    #[tracing::instrument(level = "debug", skip_all, fields(n = src.len(), workers = self.n_workers()))]
    pub fn inclusive_scan<T, F>(&self, dest: &mut [T], src: &[T], op: F) -> Result<()>
    where
        T: Clone + MaybeSendSync,
        F: Fn(&T, &T) -> T + MaybeSync,
    {
        ensure_len("scan destination", src.len(), dest.len())?;
        self.scan_tiled(dest, src, &op);
        Ok(())
    }

    /// Exclusive scan: `dest[i] = src[0] ⊕ … ⊕ src[i - 1]` for `i ≥ 1`.
    ///
    /// `dest[0]` is left untouched; it belongs to the caller (typically the
    /// identity of `op`, which this crate never needs to know).
    #[tracing::instrument(level = "debug", skip_all, fields(n = src.len(), workers = self.n_workers()))]
    pub fn exclusive_scan<T, F>(&self, dest: &mut [T], src: &[T], op: F) -> Result<()>
    where
        T: Clone + MaybeSendSync,
        F: Fn(&T, &T) -> T + MaybeSync,
    {
        ensure_len("scan destination", src.len(), dest.len())?;
        if let Some((_, shifted)) = dest.split_first_mut() {
            self.scan_tiled(shifted, &src[..src.len() - 1], &op);
        }
        Ok(())
    }

    /// Inclusive scan of `src` into `dest`; both have the same length.
    fn scan_tiled<T, F>(&self, dest: &mut [T], src: &[T], op: &F)
    where
        T: Clone + MaybeSendSync,
        F: Fn(&T, &T) -> T + MaybeSync,
    {
        let (Some((seed, src)), Some((dest_seed, dest))) = (src.split_first(), dest.split_first_mut())
        else {
            return;
        };
        *dest_seed = seed.clone();
        if src.is_empty() {
            return;
        }

        let plan = self.plan(src.len());
        let n_tiles = plan.len();

        // Phase 1: local totals; the last tile's total feeds no carry
        let totals = collect_tiles(&plan, |t, tile| {
            if t + 1 < n_tiles {
                fold_tile(&src[tile.range()], op)
            } else {
                None
            }
        });

        // Phase 2: carry-in of tile t is seed ⊕ total(0) ⊕ … ⊕ total(t - 1)
        let mut carries: Vec<T> = Vec::with_capacity(n_tiles);
        carries.push(seed.clone());
        for total in totals.iter().take(n_tiles - 1) {
            let prev = &carries[carries.len() - 1];
            let next = match total {
                Some(total) => op(prev, total),
                None => prev.clone(),
            };
            carries.push(next);
        }

        // Phase 3: seeded running fold per tile
        for_each_tile_mut(dest, &plan, |t, tile, out| {
            let items = &src[tile.range()];
            out[0] = op(&carries[t], &items[0]);
            for i in 1..out.len() {
                out[i] = op(&out[i - 1], &items[i]);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use crate::Executor;

    fn sequential_scan(src: &[i64]) -> Vec<i64> {
        src.iter()
            .scan(0i64, |acc, x| {
                *acc += x;
                Some(*acc)
            })
            .collect()
    }

    #[test]
    fn test_inclusive_scan_matches_sequential() {
        let src: Vec<i64> = (0..503).map(|i| (i * 37 % 11) - 5).collect();
        let expected = sequential_scan(&src);
        for workers in [1, 2, 3, 8, 502, 503, 1000] {
            let exec = Executor::new().with_workers(workers).unwrap();
            let mut dest = vec![0i64; src.len()];
            exec.inclusive_scan(&mut dest, &src, |a, b| a + b).unwrap();
            assert_eq!(dest, expected, "workers={workers}");
        }
    }

    #[test]
    fn test_inclusive_scan_small_cases() {
        let exec = Executor::new().with_workers(4).unwrap();

        let mut empty: Vec<i64> = Vec::new();
        exec.inclusive_scan(&mut empty, &[], |a, b| a + b).unwrap();
        assert!(empty.is_empty());

        let mut one = vec![0i64];
        exec.inclusive_scan(&mut one, &[42], |a, b| a + b).unwrap();
        assert_eq!(one, vec![42]);

        let mut two = vec![0i64; 2];
        exec.inclusive_scan(&mut two, &[3, 4], |a, b| a + b).unwrap();
        assert_eq!(two, vec![3, 7]);
    }

    #[test]
    fn test_exclusive_scan_leaves_first_slot() {
        let exec = Executor::new().with_workers(3).unwrap();
        let mut dest = vec![-1i64; 5];
        exec.exclusive_scan(&mut dest, &[1, 2, 3, 4, 5], |a, b| a + b)
            .unwrap();
        assert_eq!(dest, vec![-1, 1, 3, 6, 10]);

        let mut single = vec![-1i64];
        exec.exclusive_scan(&mut single, &[9], |a, b| a + b).unwrap();
        assert_eq!(single, vec![-1]);
    }

    #[test]
    fn test_scan_respects_order() {
        let src: Vec<String> = ["a", "b", "c", "d", "e", "f", "g"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        for workers in [1, 2, 3, 6, 7, 12] {
            let exec = Executor::new().with_workers(workers).unwrap();
            let mut dest = vec![String::new(); src.len()];
            exec.inclusive_scan(&mut dest, &src, |a, b| format!("{a}{b}"))
                .unwrap();
            assert_eq!(
                dest,
                vec!["a", "ab", "abc", "abcd", "abcde", "abcdef", "abcdefg"],
                "workers={workers}"
            );
        }
    }

    #[test]
    fn test_scan_length_mismatch() {
        let exec = Executor::new();
        let mut dest = vec![0i64; 4];
        assert!(exec.inclusive_scan(&mut dest, &[1, 2, 3], |a, b| a + b).is_err());
        assert!(exec.exclusive_scan(&mut dest, &[1, 2, 3], |a, b| a + b).is_err());
        assert_eq!(dest, vec![0; 4]);
    }
}
