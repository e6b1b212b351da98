//! Tiled shared-memory parallel skeletons.
//!
//! This crate provides a small set of reusable execution patterns over flat
//! slices of elements, driven by caller-supplied operator closures:
//!
//! # Core Types
//!
//! - [`Executor`]: Worker count and pipeline queue depth; every skeleton is a method on it
//! - [`Pipeline`]: An ordered list of elementwise stages
//! - [`TilePlan`] / [`Tile`]: Deterministic contiguous partitioning of an index range
//!
//! # Skeletons
//!
//! ## Elementwise
//!
//! - [`Executor::map_into`], [`Executor::map_in_place`]: `dest[i] = f(src[i])`
//! - [`Executor::farm`]: The same result computed by a dynamic worker pool
//!
//! ## Folds
//!
//! - [`Executor::reduce`], [`Executor::reduce_into`]: Two-phase tiled associative fold
//! - [`Executor::inclusive_scan`], [`Executor::exclusive_scan`]: Three-phase tiled prefix fold
//!
//! ## Selection and permutation
//!
//! - [`Executor::pack`]: Stable compaction through a boolean filter
//! - [`Executor::gather`]: `dest[i] = src[indices[i]]`
//! - [`Executor::scatter`], [`Executor::priority_scatter`]: `dest[indices[i]] = src[i]`
//!
//! ## Pipelines
//!
//! - [`Pipeline::run_stage_major`]: One parallel map per stage, barrier in between
//! - [`Pipeline::run_item_major`]: Each item runs through every stage back-to-back
//! - [`Pipeline::run_pipelined`]: One thread per stage joined by bounded queues
//!
//! # Operators
//!
//! Binary operators passed to the folds must be associative. They are never
//! assumed commutative: within a tile elements are folded in source order and
//! tiles are combined in tile order, so the result equals a strict
//! left-to-right fold at every worker count.
//!
//! Operators take their inputs by reference and return the result, so an
//! in-place update (`acc = op(&acc, &x)`) never hands the operator two aliasing
//! mutable views.
//!
//! # Example
//!
//! ```rust
//! use tiled_skeletons::Executor;
//!
//! let exec = Executor::new();
//! let src = vec![1u64, 2, 3, 4, 5];
//!
//! assert_eq!(exec.reduce(&src, |a, b| a + b), 15);
//!
//! let mut prefix = vec![0u64; src.len()];
//! exec.inclusive_scan(&mut prefix, &src, |a, b| a + b).unwrap();
//! assert_eq!(prefix, vec![1, 3, 6, 10, 15]);
//! ```
//!
//! # Features
//!
//! - `parallel` (default): run tiles on rayon's pool and enable the threaded
//!   farm and stage pipeline. Without it every skeleton runs sequentially and
//!   produces the same output.

mod executor;
mod map;
pub mod maybe_sync;
mod pipeline;
mod reduce;
mod scan;
mod select;
mod threading;
pub mod tile;

// ============================================================================
// Configuration and composition
// ============================================================================
pub use executor::{max_parallelism, Executor};
pub use pipeline::Pipeline;

// ============================================================================
// Partitioning
// ============================================================================
pub use tile::{compute_tiles, tile_offset, Tile, TilePlan};

// ============================================================================
// Constants
// ============================================================================

/// Default capacity of each inter-stage queue in [`Pipeline::run_pipelined`].
pub const DEFAULT_PIPELINE_DEPTH: usize = 4;

/// Number of work units [`Executor::farm`] cuts its input into per worker.
pub const FARM_UNITS_PER_WORKER: usize = 8;

// ============================================================================
// Error types
// ============================================================================

/// Errors reported by the skeletons.
///
/// All validation happens before the first write, so a call rejected with
/// one of the precondition variants leaves its destination untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkeletonError {
    /// Two buffers (or a buffer and its filter) disagree on length.
    #[error("{what}: expected length {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The destination cannot hold every selected element.
    #[error("destination too small: need {required} elements, have {actual}")]
    DestinationTooSmall { required: usize, actual: usize },

    /// An index filter entry points outside the buffer it indexes.
    #[error("index {index} at filter position {position} is out of bounds for length {len}")]
    IndexOutOfBounds {
        position: usize,
        index: usize,
        len: usize,
    },

    /// Two scatter sources target the same destination slot.
    #[error("index {index} at filter position {position} was already targeted")]
    DuplicateIndex { position: usize, index: usize },

    /// An executor setting is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// A farm worker or pipeline stage panicked.
    #[error("{0} panicked")]
    WorkerPanicked(&'static str),
}

/// Result type for skeleton operations.
pub type Result<T> = std::result::Result<T, SkeletonError>;
