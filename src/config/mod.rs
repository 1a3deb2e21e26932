//! # Configuration Constants
//!
//! This module centralizes the compile-time constants that shape the tree.
//! Constants that depend on each other are co-located and guarded by
//! compile-time assertions so they cannot drift apart.
//!
//! ## Dependency Graph
//!
//! ```text
//! HIGH_WATER (1024 bytes)
//!       │
//!       ├─> SmallBuf capacity (fixed; small blocks never reallocate)
//!       │
//!       └─> small/large slot boundary: a slot with span <= HIGH_WATER is
//!           small (mutable in place when uniquely owned), above it the
//!           backing block is immutable and shared by refcount
//!
//! NODE_TARGET_BYTES (256, roughly two cache lines)
//!       │
//!       ├─> INNER_FANOUT (16): span (8B) + child pointer (8B) per slot
//!       │
//!       └─> LEAF_FANOUT (8): span (8B) + Slice (~24B) per slot
//!
//! min_fill(fanout)
//!       │
//!       └─> B+tree occupancy floor for non-root nodes; rebalancing tops
//!           an underfull node back up to exactly this fill
//!
//! ITER_STACK (3)
//!       │
//!       └─> ancestor frames an iterator records; stepping across a
//!           boundary deeper than this falls back to a root re-descent
//! ```
//!
//! ## Critical Invariants
//!
//! 1. `2 * min_fill(f) <= f + 1`: redistribution between two siblings
//!    holding `f + 1` slots must leave both at or above the floor.
//! 2. Fanouts are at least 4 so a split always yields two valid nodes.

/// Maximum span of a small slot in bytes.
///
/// Small blocks are heap allocations of exactly this capacity and are
/// edited in place by byte shifting while uniquely owned. Anything
/// larger is stored in an immutable shared block and edited by
/// copy-on-write fragment surgery.
pub const HIGH_WATER: usize = 1024;

/// Rough target size of one node in bytes.
pub const NODE_TARGET_BYTES: usize = 256;

/// Slot count of an inner node: one `usize` span plus one child pointer
/// per slot.
pub const INNER_FANOUT: usize = NODE_TARGET_BYTES / 16;

/// Slot count of a leaf node. Leaf slots carry a `Slice` (tag + pointer
/// + offset, ~24 bytes) next to the span, so leaves are narrower than
/// inner nodes.
pub const LEAF_FANOUT: usize = NODE_TARGET_BYTES / 32;

/// Number of ancestor frames a `SliceIter` keeps while walking.
pub const ITER_STACK: usize = 3;

/// Minimum live-slot count for a non-root node: the ceiling of half the
/// fanout. Matches the rebalancing target, which tops an underfull node
/// back up to exactly this fill.
pub const fn min_fill(fanout: usize) -> usize {
    (fanout + 1) / 2
}

const _: () = assert!(INNER_FANOUT >= 4, "inner nodes must split into two valid halves");
const _: () = assert!(LEAF_FANOUT >= 4, "leaf nodes must split into two valid halves");
const _: () = assert!(
    2 * min_fill(INNER_FANOUT) <= INNER_FANOUT + 1,
    "redistribution would push the donor below the occupancy floor"
);
const _: () = assert!(
    2 * min_fill(LEAF_FANOUT) <= LEAF_FANOUT + 1,
    "redistribution would push the donor below the occupancy floor"
);
const _: () = assert!(HIGH_WATER > 0);
