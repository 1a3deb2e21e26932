//! # Recursive Edit Driver
//!
//! Insert and delete share one recursive template. The descent locates
//! the child slot covering the edit position, makes that child
//! exclusively owned (the path copy-on-write step), and recurses; the
//! ascent applies the child's byte delta to its slot and resolves the
//! child's structural outcome:
//!
//! ```text
//! Balanced           nothing further
//! Split { node, n }  new right sibling of n bytes to insert at i+1,
//!                    splitting this node too when it is full
//! Underflow          child fill fell below the floor: borrow from or
//!                    merge with a neighbor, possibly dropping the
//!                    neighbor's slot and underflowing this node in turn
//! Emptied            child lost every slot: drop its slot here
//! ```
//!
//! ## Delta bookkeeping
//!
//! Each level reports the byte delta the parent must apply to this
//! node's slot. The leaf case leaves the requested span in the in/out
//! `span` parameter (deletions shrink it to what one leaf could absorb),
//! and each inner level starts from that value, subtracting whatever
//! moved out of this node into a freshly split sibling; the parent
//! accounts for the sibling separately when it inserts the new slot.
//!
//! ## Split routing
//!
//! A full node splits at `FANOUT/2 + (i > FANOUT/2)` so the new slot's
//! side keeps the majority; the slot is then inserted into whichever
//! half now covers index `i`, and the reported deltas move the routed
//! bytes with it.

use std::sync::Arc;

use crate::config::{min_fill, INNER_FANOUT};
use crate::node::{Inner, Leaf, Node};
use crate::tree::delete::delete_leaf;
use crate::tree::insert::insert_leaf;

/// The operation a descent performs at the leaf.
pub(crate) enum EditOp<'a> {
    Insert { data: &'a [u8] },
    Delete { linefeeds: usize },
}

/// Structural outcome a level reports to its parent.
pub(crate) enum Outcome {
    Balanced,
    /// The node split; `node` is the new right sibling holding `span`
    /// bytes.
    Split { node: Arc<Node>, span: usize },
    /// The node's fill fell below the occupancy floor.
    Underflow,
    /// The node lost all of its slots.
    Emptied,
}

pub(crate) fn edit_recurse(
    node: &mut Node,
    level: usize,
    pos: usize,
    span: &mut isize,
    op: &mut EditOp<'_>,
) -> (isize, Outcome) {
    if level == 1 {
        let leaf = node.as_leaf_mut();
        return match op {
            EditOp::Insert { data } => insert_leaf(leaf, pos, *data),
            EditOp::Delete { linefeeds } => delete_leaf(leaf, pos, span, linefeeds),
        };
    }

    let inner = node.as_inner_mut();
    let mut key = pos;
    let mut i = inner.offset(&mut key);
    if i == inner.fill() {
        // appending at the very end of this subtree: descend through the
        // rightmost child instead of one past it
        debug_assert_eq!(key, 0);
        i -= 1;
        key = inner.spans[i];
    }

    // INVARIANT: offset() lands on a live slot for any position within the span
    let child = Node::make_mut(inner.children[i].as_mut().expect("live slot"));
    let (delta, outcome) = edit_recurse(child, level - 1, key, span, op);
    inner.spans[i] = apply_delta(inner.spans[i], delta);

    // the delta reported upward restarts from the span this descent
    // actually applied; split handling below subtracts what left the node
    let mut up = *span;

    match outcome {
        Outcome::Balanced => (up, Outcome::Balanced),

        Outcome::Split {
            node: child_split,
            span: child_split_span,
        } => {
            let at = i + 1;
            let fill = inner.fill();
            if fill < INNER_FANOUT {
                inner.insert_slot(at, child_split_span, child_split);
                return (up, Outcome::Balanced);
            }
            let cut = INNER_FANOUT / 2 + usize::from(at > INNER_FANOUT / 2);
            let mut right = inner.split(cut);
            let mut right_span = right.sum();
            up -= right_span as isize;
            if at > INNER_FANOUT / 2 {
                up -= child_split_span as isize;
                right_span += child_split_span;
                right.insert_slot(at - cut, child_split_span, child_split);
            } else {
                inner.insert_slot(at, child_split_span, child_split);
            }
            (
                up,
                Outcome::Split {
                    node: Arc::new(Node::Inner(right)),
                    span: right_span,
                },
            )
        }

        Outcome::Underflow => {
            let fill = inner.fill();
            if fill < 2 {
                // only the root can reach fill 1; the top-level driver
                // collapses it after the edit
                return (up, Outcome::Balanced);
            }
            let j = if i > 0 { i - 1 } else { i + 1 };
            rebalance_children(inner, i, j);
            let fill = inner.fill();
            if fill < min_fill(INNER_FANOUT) {
                (up, Outcome::Underflow)
            } else {
                (up, Outcome::Balanced)
            }
        }

        Outcome::Emptied => {
            let _ = inner.remove_slot(i);
            let fill = inner.fill();
            if fill < min_fill(INNER_FANOUT) {
                (up, Outcome::Underflow)
            } else {
                (up, Outcome::Balanced)
            }
        }
    }
}

/// Refills the underfull child `i` from its neighbor `j`: both are made
/// exclusively owned, adjacent leaves first merge mergeable boundary
/// slots, then slots move until `i` reaches the floor, or all of `j`
/// moves over, in which case `j`'s slot is dropped.
fn rebalance_children(parent: &mut Inner, i: usize, j: usize) {
    let mut a = parent.children[i].take().expect("live slot"); // INVARIANT: i < fill
    let mut b = parent.children[j].take().expect("live slot"); // INVARIANT: j is i's neighbor, fill >= 2
    {
        let recv = Node::make_mut(&mut a);
        let donor = Node::make_mut(&mut b);
        match (recv, donor) {
            (Node::Leaf(recv), Node::Leaf(donor)) => {
                if i < j {
                    Leaf::merge_boundary(recv, donor);
                } else {
                    Leaf::merge_boundary(donor, recv);
                }
                recv.rebalance(donor, i < j);
            }
            (Node::Inner(recv), Node::Inner(donor)) => recv.rebalance(donor, i < j),
            _ => unreachable!("siblings always share a level"),
        }
    }
    let donor_emptied = b.fill() == 0;
    parent.spans[i] = a.total_span();
    parent.children[i] = Some(a);
    parent.spans[j] = b.total_span();
    parent.children[j] = Some(b);
    if donor_emptied {
        let _ = parent.remove_slot(j);
    }
}

pub(crate) fn apply_delta(span: usize, delta: isize) -> usize {
    debug_assert!(delta >= 0 || span >= delta.unsigned_abs());
    (span as isize + delta) as usize
}
