//! # Insert Base Case
//!
//! Insertion at the leaf prefers cheap in-place growth over new slots,
//! in this order:
//!
//! 1. **Append to the left small neighbor** when the position sits on a
//!    slot boundary and the slot before it is small.
//! 2. **Grow a small slot in place** (covers prepending into a small
//!    slot at a boundary); the slot is promoted to a large block when
//!    the result outgrows `HIGH_WATER`.
//! 3. **New slot on a boundary** between unmergeable neighbors,
//!    splitting the leaf when it is full.
//! 4. **Fragment surgery inside a large slot**: the slot splits into a
//!    truncated left window and a right window sharing the same block,
//!    with the new bytes between them. The disturbed window (at most
//!    five slots counting both neighbors) goes through the merge pass,
//!    and the survivors are spliced back, into two leaves when they no
//!    longer fit in one.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::block::Block;
use crate::config::{min_fill, HIGH_WATER, LEAF_FANOUT};
use crate::node::{demote_in_place, merge_small_neighbors, slice_insert, Leaf, Node, Slice, SlotScratch};
use crate::tree::edit::Outcome;

pub(crate) fn insert_leaf(leaf: &mut Leaf, pos: usize, data: &[u8]) -> (isize, Outcome) {
    let mut off = pos;
    let i = leaf.offset(&mut off);
    let fill = leaf.fill();
    let len = data.len();

    // append onto the left small neighbor
    if off == 0 && i > 0 && leaf.spans[i - 1] <= HIGH_WATER {
        let (span, slice) = leaf.slot_mut(i - 1);
        let at = *span;
        slice_insert(slice, span, at, data);
        debug_assert!(i == fill || leaf.spans[i] > HIGH_WATER);
        return (len as isize, Outcome::Balanced);
    }

    // grow a small slot in place (off == 0 prepends into it)
    if i < fill && leaf.spans[i] <= HIGH_WATER {
        debug_assert!(off > 0 || i == 0 || leaf.spans[i - 1] > HIGH_WATER);
        let (span, slice) = leaf.slot_mut(i);
        slice_insert(slice, span, off, data);
        return (len as isize, Outcome::Balanced);
    }

    // boundary between unmergeable slots: a new slot of its own
    if off == 0 {
        let slice = Slice::from_bytes(data);
        if fill < LEAF_FANOUT {
            leaf.insert_slot(i, len, slice);
            return (len as isize, Outcome::Balanced);
        }
        let cut = LEAF_FANOUT / 2 + usize::from(i > LEAF_FANOUT / 2);
        let mut right = leaf.split(cut);
        let mut right_span = right.sum();
        let mut delta = len as isize - right_span as isize;
        if i > LEAF_FANOUT / 2 {
            delta -= len as isize;
            right_span += len;
            right.insert_slot(i - cut, len, slice);
        } else {
            leaf.insert_slot(i, len, slice);
        }
        return (
            delta,
            Outcome::Split {
                node: Arc::new(Node::Leaf(right)),
                span: right_span,
            },
        );
    }

    insert_within_slice(leaf, i, off, data)
}

/// Insertion strictly inside a large slot: split the slot around the
/// position, merge the disturbed window, splice back.
fn insert_within_slice(leaf: &mut Leaf, i: usize, off: usize, data: &[u8]) -> (isize, Outcome) {
    let fill = leaf.fill();
    let old_sum = leaf.sum();
    let len = data.len();

    let (slot_span, slot_slice) = leaf.take_slot(i);
    let Slice::Large { blk, offset } = slot_slice else {
        unreachable!("span above HIGH_WATER implies a large slice")
    };
    debug_assert!(0 < off && off < slot_span);

    let left = fragment(Arc::clone(&blk), offset, off);
    let right = fragment(blk, offset + off, slot_span - off);

    let mut window: SlotScratch = SmallVec::new();
    if i > 0 {
        window.push(leaf.take_slot(i - 1));
    }
    window.push(left);
    window.push((len, Slice::from_bytes(data)));
    window.push(right);
    if i + 1 < fill {
        window.push(leaf.take_slot(i + 1));
    }
    merge_small_neighbors(&mut window);

    let window_start = i.saturating_sub(1);
    let window_end = (i + 2).min(fill);
    splice_window(leaf, fill, window_start, window_end, window, old_sum, len as isize)
}

/// A window into an existing block, copied out into a small buffer when
/// it fits the small range.
pub(crate) fn fragment(blk: Arc<Block>, offset: usize, span: usize) -> (usize, Slice) {
    let mut slice = Slice::Large { blk, offset };
    demote_in_place(&mut slice, span);
    (span, slice)
}

/// Rebuilds a leaf from its untouched prefix, a merged window, and its
/// untouched suffix; splits into two leaves when the survivors no longer
/// fit. Returns the delta/outcome pair for the edit driver, where
/// `applied` is the byte delta when no split happens.
pub(crate) fn splice_window(
    leaf: &mut Leaf,
    fill: usize,
    window_start: usize,
    window_end: usize,
    window: SlotScratch,
    old_sum: usize,
    applied: isize,
) -> (isize, Outcome) {
    let mut all: SlotScratch = SmallVec::new();
    for k in 0..window_start {
        all.push(leaf.take_slot(k));
    }
    all.extend(window);
    for k in window_end..fill {
        all.push(leaf.take_slot(k));
    }

    let total = all.len();
    if total <= LEAF_FANOUT {
        leaf.reset_from(all.into_iter());
        let outcome = if total < min_fill(LEAF_FANOUT) {
            Outcome::Underflow
        } else {
            Outcome::Balanced
        };
        return (applied, outcome);
    }

    // the survivors outgrew the leaf: distribute over two
    let mut right = Leaf::new();
    right.reset_from(all.drain(LEAF_FANOUT / 2..));
    leaf.reset_from(all.into_iter());
    let right_span = right.sum();
    let delta = leaf.sum() as isize - old_sum as isize;
    (
        delta,
        Outcome::Split {
            node: Arc::new(Node::Leaf(right)),
            span: right_span,
        },
    )
}
