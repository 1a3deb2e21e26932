//! # Delete Base Case
//!
//! Deletion at the leaf has two shapes:
//!
//! - **Strictly within one slot**: a small slot shrinks in place; a
//!   large slot splits into a left and right fragment around the doomed
//!   range (fragments in the small range are copied out of the block),
//!   and the disturbed window goes through the merge pass. The extra
//!   fragment can overflow a full leaf, which splits it.
//!
//! - **Across the end of the slot**: the slot is truncated at the
//!   position, wholly-consumed following slots are dropped, and the
//!   first surviving slot is trimmed from the front. The gap closes and
//!   the seam window (at most four slots) goes through the merge pass.
//!
//! A single descent deletes at most one leaf's worth of bytes; the
//! consumed count travels back through the in/out `span` and the
//! top-level driver descends again until nothing remains. This caps the
//! work per descent and keeps invariant maintenance local to one leaf.
//!
//! Line feeds are counted here, where the doomed ranges are being read
//! anyway, and accumulate into the operation context.

use smallvec::SmallVec;

use crate::config::{min_fill, HIGH_WATER, LEAF_FANOUT};
use crate::node::{
    demote_in_place, merge_small_neighbors, slice_delete, Leaf, Slice, SlotScratch,
};
use crate::tree::edit::Outcome;
use crate::tree::insert::{fragment, splice_window};
use crate::tree::count_linefeeds;

pub(crate) fn delete_leaf(
    leaf: &mut Leaf,
    pos: usize,
    span: &mut isize,
    linefeeds: &mut usize,
) -> (isize, Outcome) {
    let mut off = pos;
    let i = leaf.offset(&mut off);
    let fill = leaf.fill();
    let want = span.unsigned_abs();
    debug_assert!(i < fill && want > 0);

    if off + want < leaf.spans[i] {
        if leaf.spans[i] <= HIGH_WATER {
            *linefeeds += count_linefeeds(&leaf.slice_bytes(i)[off..off + want]);
            let (slot_span, slice) = leaf.slot_mut(i);
            slice_delete(slice, slot_span, off, want);
            (-(want as isize), Outcome::Balanced)
        } else {
            delete_within_slice(leaf, i, off, want, linefeeds)
        }
    } else {
        delete_multi(leaf, i, off, want, span, linefeeds)
    }
}

/// Deletion strictly inside a large slot: carve left and right fragments
/// around the doomed range and merge the disturbed window.
fn delete_within_slice(
    leaf: &mut Leaf,
    i: usize,
    off: usize,
    want: usize,
    linefeeds: &mut usize,
) -> (isize, Outcome) {
    let fill = leaf.fill();
    let old_sum = leaf.sum();
    *linefeeds += count_linefeeds(&leaf.slice_bytes(i)[off..off + want]);

    let (slot_span, slot_slice) = leaf.take_slot(i);
    let Slice::Large { blk, offset } = slot_slice else {
        unreachable!("span above HIGH_WATER implies a large slice")
    };

    let mut window: SlotScratch = SmallVec::new();
    if i > 0 {
        window.push(leaf.take_slot(i - 1));
    }
    if off > 0 {
        window.push(fragment(std::sync::Arc::clone(&blk), offset, off));
    }
    window.push(fragment(blk, offset + off + want, slot_span - off - want));
    if i + 1 < fill {
        window.push(leaf.take_slot(i + 1));
    }
    merge_small_neighbors(&mut window);

    let window_start = i.saturating_sub(1);
    let window_end = (i + 2).min(fill);
    splice_window(
        leaf,
        fill,
        window_start,
        window_end,
        window,
        old_sum,
        -(want as isize),
    )
}

/// Deletion reaching the end of slot `i` and possibly beyond: truncate,
/// drop consumed slots, trim the first survivor, merge the seam.
fn delete_multi(
    leaf: &mut Leaf,
    i: usize,
    off: usize,
    want: usize,
    span: &mut isize,
    linefeeds: &mut usize,
) -> (isize, Outcome) {
    let fill = leaf.fill();
    let mut consumed = 0;

    let mut remove_from = i;
    if off > 0 {
        let tail = leaf.spans[i] - off;
        *linefeeds += count_linefeeds(&leaf.slice_bytes(i)[off..]);
        truncate_slot(leaf, i, off);
        consumed += tail;
        remove_from = i + 1;
    }

    let mut k = remove_from;
    while k < fill && consumed + leaf.spans[k] <= want {
        *linefeeds += count_linefeeds(leaf.slice_bytes(k));
        consumed += leaf.spans[k];
        leaf.spans[k] = 0;
        leaf.slices[k] = None;
        k += 1;
    }

    if k < fill && consumed < want {
        let trim = want - consumed;
        *linefeeds += count_linefeeds(&leaf.slice_bytes(k)[..trim]);
        trim_slot_front(leaf, k, trim);
        consumed = want;
    }

    // close the gap left by the dropped slots
    if k > remove_from {
        for (dst, src) in (remove_from..).zip(k..fill) {
            leaf.spans[dst] = leaf.spans[src];
            leaf.slices[dst] = leaf.slices[src].take();
            leaf.spans[src] = 0;
        }
    }
    let new_fill = fill - (k - remove_from);
    *span = -(consumed as isize);

    if new_fill == 0 {
        return (-(consumed as isize), Outcome::Emptied);
    }

    // the slots flanking the seam both shrank; merge the window they span
    let window_start = i.saturating_sub(1);
    let window_end = (remove_from + 2).min(new_fill);
    if window_end > window_start + 1 {
        let mut window: SlotScratch = SmallVec::new();
        for k in window_start..window_end {
            window.push(leaf.take_slot(k));
        }
        merge_small_neighbors(&mut window);
        let mut all: SlotScratch = SmallVec::new();
        for k in 0..window_start {
            all.push(leaf.take_slot(k));
        }
        all.extend(window);
        for k in window_end..new_fill {
            all.push(leaf.take_slot(k));
        }
        leaf.reset_from(all.into_iter());
    }

    let final_fill = leaf.fill();
    let outcome = if final_fill < min_fill(LEAF_FANOUT) {
        Outcome::Underflow
    } else {
        Outcome::Balanced
    };
    (-(consumed as isize), outcome)
}

/// Keeps the first `keep` bytes of slot `i`.
fn truncate_slot(leaf: &mut Leaf, i: usize, keep: usize) {
    let (span, slice) = leaf.slot_mut(i);
    match slice {
        Slice::Small(_) => {
            let tail = *span - keep;
            slice_delete(slice, span, keep, tail);
        }
        Slice::Large { .. } => {
            *span = keep;
            demote_in_place(slice, keep);
        }
    }
}

/// Drops the first `trim` bytes of slot `i`.
fn trim_slot_front(leaf: &mut Leaf, i: usize, trim: usize) {
    let (span, slice) = leaf.slot_mut(i);
    if let Slice::Large { offset, .. } = slice {
        *offset += trim;
        *span -= trim;
    } else {
        slice_delete(slice, span, 0, trim);
        return;
    }
    demote_in_place(slice, *span);
}
