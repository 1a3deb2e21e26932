//! # SliceTable
//!
//! The document handle: a persistent sequence of bytes stored as a
//! B+tree of spans over shared blocks.
//!
//! ## Architecture Overview
//!
//! ```text
//! SliceTable { root, levels }
//!        │
//!   [Inner]  spans are subtree byte counts
//!    /    \
//! [Inner] [Inner]
//!  /   \     \
//! [Leaf][Leaf][Leaf]   slots pair a span with a Slice
//!   │      │
//!   │      └── Slice::Large ──> Arc<Block> (heap or mmap, immutable)
//!   └────────── Slice::Small ──> SmallBuf  (owned, edited in place)
//! ```
//!
//! ## Snapshots
//!
//! `Clone` is the snapshot operation: it bumps the root's refcount and
//! copies the height, in O(1). Edits on any handle first make every node
//! on the descent path exclusively owned (cloning shared nodes and, at
//! the leaf, their small buffers), so a snapshot observes exactly the
//! bytes it held when it was taken, no matter what other handles do.
//! Handles are `Send`, so snapshots can be read from other threads while
//! the original keeps editing.
//!
//! ## Editing
//!
//! `insert` and `delete` drive the recursive engine behind
//! `edit_recurse`. A single descent edits at most one leaf; `delete`
//! repeats the descent until the requested range is gone, which keeps
//! each descent's work proportional to one leaf's width. After each
//! descent the root is fixed up: a split installs a new two-slot root, a
//! single-child root collapses into its child.
//!
//! ## Failure model
//!
//! The only fallible public operations are `from_file` (I/O errors),
//! `insert` past the end (contract violation surfaced as an error
//! rather than the C API's undefined behavior), and `dump` (sink
//! errors). `delete` clips to the document instead of failing.
//! Allocation failure aborts, as everywhere else in Rust.

mod delete;
mod edit;
mod insert;

use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use eyre::{ensure, Result, WrapErr};
use memmap2::Mmap;

use crate::block::Block;
use crate::config::{min_fill, HIGH_WATER, INNER_FANOUT, LEAF_FANOUT};
use crate::iter::SliceIter;
use crate::node::{Inner, Leaf, Node, Slice};
use crate::tree::edit::{edit_recurse, EditOp, Outcome};

/// A persistent, copy-on-write sequence of bytes.
pub struct SliceTable {
    root: Arc<Node>,
    levels: usize,
}

impl SliceTable {
    /// An empty document.
    pub fn new() -> Self {
        SliceTable {
            root: Arc::new(Node::Leaf(Leaf::new())),
            levels: 1,
        }
    }

    /// Loads a document from a file. Content up to `HIGH_WATER` bytes is
    /// read into a small block; anything larger is memory-mapped
    /// read-only and shared for the life of the slots referencing it. An
    /// empty file yields an empty document.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)
            .wrap_err_with(|| format!("failed to open '{}'", path.display()))?;
        let len = file
            .metadata()
            .wrap_err_with(|| format!("failed to stat '{}'", path.display()))?
            .len() as usize;

        if len == 0 {
            return Ok(SliceTable::new());
        }

        let (span, slice) = if len <= HIGH_WATER {
            let mut data = Vec::with_capacity(len);
            file.read_to_end(&mut data)
                .wrap_err_with(|| format!("failed to read '{}'", path.display()))?;
            (data.len(), Slice::from_bytes(&data))
        } else {
            // SAFETY: Mmap::map is unsafe because the file could be
            // truncated or rewritten externally while mapped, which would
            // invalidate the mapping. This is safe under the documented
            // contract because:
            // 1. The mapping is read-only; this process never writes it
            // 2. The map's lifetime is tied to the owning Block, which
            //    lives exactly as long as slots referencing it
            // 3. All access goes through spans validated against the
            //    mapped length at load time
            let map = unsafe {
                Mmap::map(&file)
                    .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
            };
            #[cfg(unix)]
            let _ = map.advise(memmap2::Advice::WillNeed);
            let span = map.len();
            (
                span,
                Slice::Large {
                    blk: Arc::new(Block::Mmap(map)),
                    offset: 0,
                },
            )
        };

        let mut leaf = Leaf::new();
        leaf.insert_slot(0, span, slice);
        Ok(SliceTable {
            root: Arc::new(Node::Leaf(leaf)),
            levels: 1,
        })
    }

    /// Total bytes in the document.
    pub fn len(&self) -> usize {
        self.root.total_span()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tree height; 1 is a leaf-only tree.
    pub fn levels(&self) -> usize {
        self.levels
    }

    pub(crate) fn root(&self) -> &Node {
        &self.root
    }

    /// Inserts `data` before position `pos` and returns the number of
    /// line feeds inserted. `pos` must not exceed [`len`](Self::len).
    pub fn insert(&mut self, pos: usize, data: &[u8]) -> Result<usize> {
        ensure!(
            pos <= self.len(),
            "insert position {} beyond document end {}",
            pos,
            self.len()
        );
        if data.is_empty() {
            return Ok(0);
        }
        let mut op = EditOp::Insert { data };
        self.edit(pos, data.len() as isize, &mut op);
        Ok(count_linefeeds(data))
    }

    /// Deletes up to `len` bytes at `pos`, clipped to the end of the
    /// document, and returns the number of line feeds removed.
    pub fn delete(&mut self, pos: usize, len: usize) -> usize {
        let size = self.len();
        if pos >= size {
            return 0;
        }
        let mut remaining = len.min(size - pos);
        let mut linefeeds = 0;
        while remaining > 0 {
            // one descent deletes at most one leaf's worth
            let mut op = EditOp::Delete { linefeeds: 0 };
            let consumed = -self.edit(pos, -(remaining as isize), &mut op);
            let EditOp::Delete { linefeeds: n } = op else {
                unreachable!()
            };
            linefeeds += n;
            debug_assert!(consumed > 0, "a delete descent must make progress");
            remaining -= consumed as usize;
        }
        linefeeds
    }

    /// Runs one edit descent and applies the root fixups. Returns the
    /// final value of the in/out span (for deletions, the negated byte
    /// count this descent consumed).
    fn edit(&mut self, pos: usize, requested: isize, op: &mut EditOp<'_>) -> isize {
        let mut span = requested;
        let root = Node::make_mut(&mut self.root);
        let (_, outcome) = edit_recurse(root, self.levels, pos, &mut span, op);

        if let Outcome::Split {
            node: right,
            span: right_span,
        } = outcome
        {
            let left = std::mem::replace(&mut self.root, Arc::new(Node::Leaf(Leaf::new())));
            let mut top = Inner::new();
            top.insert_slot(0, left.total_span(), left);
            top.insert_slot(1, right_span, right);
            self.root = Arc::new(Node::Inner(top));
            self.levels += 1;
        }

        // a root left holding a single child hands its role down
        while self.levels > 1 {
            let root = Node::make_mut(&mut self.root);
            let Node::Inner(inner) = root else { break };
            if inner.fill() != 1 {
                break;
            }
            let (_, child) = inner.remove_slot(0);
            self.root = child;
            self.levels -= 1;
        }

        span
    }

    /// Writes the document bytes to `sink` in order, unframed.
    pub fn dump<W: Write>(&self, sink: &mut W) -> Result<()> {
        fn walk<W: Write>(node: &Node, sink: &mut W) -> std::io::Result<()> {
            match node {
                Node::Leaf(leaf) => {
                    for i in 0..leaf.fill() {
                        sink.write_all(leaf.slice_bytes(i))?;
                    }
                }
                Node::Inner(inner) => {
                    for i in 0..inner.fill() {
                        walk(inner.child(i), sink)?;
                    }
                }
            }
            Ok(())
        }
        walk(&self.root, sink).wrap_err("failed to write document bytes")
    }

    /// The document content as one owned buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        self.dump(&mut out).expect("writing to a Vec cannot fail");
        out
    }

    /// A cursor positioned at byte 0.
    pub fn iter(&self) -> SliceIter<'_> {
        SliceIter::new(self, 0)
    }

    /// A cursor positioned at `pos`, clipped to the document end (the
    /// end position itself is valid and reads as off-end).
    pub fn iter_at(&self, pos: usize) -> SliceIter<'_> {
        SliceIter::new(self, pos.min(self.len()))
    }

    /// Verifies the structural invariants of the whole tree, returning a
    /// descriptive error for the first violation. Intended for tests,
    /// fuzzing, and debug assertions.
    pub fn check_invariants(&self) -> Result<()> {
        check_node(&self.root, self.levels, true)?;
        Ok(())
    }
}

impl Default for SliceTable {
    fn default() -> Self {
        SliceTable::new()
    }
}

impl Clone for SliceTable {
    /// O(1) snapshot: shares the root (and transitively every node and
    /// block) by refcount.
    fn clone(&self) -> Self {
        SliceTable {
            root: Arc::clone(&self.root),
            levels: self.levels,
        }
    }
}

fn check_node(node: &Node, level: usize, is_root: bool) -> Result<usize> {
    match node {
        Node::Leaf(leaf) => {
            ensure!(level == 1, "leaf found at level {}", level);
            let fill = leaf.fill();
            ensure!(
                is_root || fill >= min_fill(LEAF_FANOUT),
                "non-root leaf fill {} below minimum {}",
                fill,
                min_fill(LEAF_FANOUT)
            );
            for i in fill..LEAF_FANOUT {
                ensure!(
                    leaf.slices[i].is_none(),
                    "leaf slot {} live after first empty slot",
                    i
                );
            }
            let mut prev_small = false;
            for i in 0..fill {
                let span = leaf.spans[i];
                ensure!(span > 0, "leaf slot {} has zero span", i);
                let small = span <= HIGH_WATER;
                ensure!(
                    !(small && prev_small),
                    "adjacent small slots at {} and {}",
                    i - 1,
                    i
                );
                // INVARIANT: i < fill, and the prefix-packing check above passed
                match leaf.slices[i].as_ref().expect("live slot") {
                    Slice::Small(buf) => {
                        ensure!(small, "small buffer with span {} above HIGH_WATER", span);
                        ensure!(
                            buf.len() == span,
                            "small buffer length {} disagrees with span {}",
                            buf.len(),
                            span
                        );
                    }
                    Slice::Large { blk, offset } => {
                        ensure!(!small, "large slice with span {} in the small range", span);
                        ensure!(
                            offset + span <= blk.len(),
                            "slice window {}..{} beyond block length {}",
                            offset,
                            offset + span,
                            blk.len()
                        );
                    }
                }
                prev_small = small;
            }
            Ok(leaf.sum())
        }
        Node::Inner(inner) => {
            ensure!(level > 1, "inner node found at leaf level");
            let fill = inner.fill();
            if is_root {
                ensure!(fill >= 2, "root with {} slots should have collapsed", fill);
            } else {
                ensure!(
                    fill >= min_fill(INNER_FANOUT),
                    "non-root inner fill {} below minimum {}",
                    fill,
                    min_fill(INNER_FANOUT)
                );
            }
            for i in fill..INNER_FANOUT {
                ensure!(
                    inner.children[i].is_none(),
                    "inner slot {} live after first empty slot",
                    i
                );
            }
            let mut total = 0;
            for i in 0..fill {
                ensure!(inner.spans[i] > 0, "inner slot {} has zero span", i);
                let child_span = check_node(inner.child(i), level - 1, false)?;
                ensure!(
                    child_span == inner.spans[i],
                    "slot {} span {} disagrees with child total {}",
                    i,
                    inner.spans[i],
                    child_span
                );
                total += child_span;
            }
            Ok(total)
        }
    }
}

pub(crate) fn count_linefeeds(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b == b'\n').count()
}

impl fmt::Debug for SliceTable {
    /// Structural dump: one line per level, nodes bracketed with their
    /// slot spans.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SliceTable {{ levels: {}, bytes: {} }}", self.levels, self.len())?;
        let mut row: Vec<&Node> = vec![&*self.root];
        let mut level = self.levels;
        while !row.is_empty() {
            let mut next: Vec<&Node> = Vec::new();
            for node in &row {
                match node {
                    Node::Inner(inner) => {
                        write!(f, "[")?;
                        for i in 0..inner.fill() {
                            if i > 0 {
                                write!(f, "|")?;
                            }
                            write!(f, "{}", inner.spans[i])?;
                            next.push(inner.child(i));
                        }
                        write!(f, "] ")?;
                    }
                    Node::Leaf(leaf) => {
                        write!(f, "[")?;
                        for i in 0..leaf.fill() {
                            if i > 0 {
                                write!(f, "|")?;
                            }
                            let tag = if leaf.spans[i] <= HIGH_WATER { "s" } else { "L" };
                            write!(f, "{}{}", leaf.spans[i], tag)?;
                        }
                        write!(f, "] ")?;
                    }
                }
            }
            if level > 1 {
                writeln!(f)?;
            }
            row = next;
            level = level.saturating_sub(1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_table_is_empty() {
        let table = SliceTable::new();
        assert_eq!(table.len(), 0);
        assert!(table.is_empty());
        assert_eq!(table.levels(), 1);
        table.check_invariants().unwrap();
    }

    #[test]
    fn insert_into_empty_table() {
        let mut table = SliceTable::new();
        let lfs = table.insert(0, b"hello\nworld\n").unwrap();
        assert_eq!(lfs, 2);
        assert_eq!(table.len(), 12);
        assert_eq!(table.to_vec(), b"hello\nworld\n");
        table.check_invariants().unwrap();
    }

    #[test]
    fn insert_past_end_is_an_error() {
        let mut table = SliceTable::new();
        table.insert(0, b"abc").unwrap();
        assert!(table.insert(4, b"x").is_err());
    }

    #[test]
    fn empty_insert_and_delete_are_noops() {
        let mut table = SliceTable::new();
        table.insert(0, b"abc").unwrap();
        assert_eq!(table.insert(1, b"").unwrap(), 0);
        assert_eq!(table.delete(1, 0), 0);
        assert_eq!(table.to_vec(), b"abc");
    }

    #[test]
    fn delete_clips_to_document_end() {
        let mut table = SliceTable::new();
        table.insert(0, b"abcdef").unwrap();
        table.delete(4, 100);
        assert_eq!(table.to_vec(), b"abcd");
        assert_eq!(table.delete(10, 5), 0);
    }

    #[test]
    fn delete_reports_linefeeds() {
        let mut table = SliceTable::new();
        table.insert(0, b"a\nb\nc\n").unwrap();
        assert_eq!(table.delete(1, 4), 2);
        assert_eq!(table.to_vec(), b"a\n");
    }

    #[test]
    fn appends_split_leaves_and_grow_a_root() {
        let mut table = SliceTable::new();
        let chunk = vec![b'x'; HIGH_WATER + 1];
        for _ in 0..LEAF_FANOUT + 1 {
            let end = table.len();
            table.insert(end, &chunk).unwrap();
            table.check_invariants().unwrap();
        }
        assert!(table.levels() > 1);
        assert_eq!(table.len(), (LEAF_FANOUT + 1) * (HIGH_WATER + 1));
    }

    #[test]
    fn deleting_everything_collapses_to_an_empty_leaf() {
        let mut table = SliceTable::new();
        let chunk = vec![b'y'; HIGH_WATER + 1];
        for _ in 0..LEAF_FANOUT * 3 {
            let end = table.len();
            table.insert(end, &chunk).unwrap();
        }
        assert!(table.levels() > 1);
        table.delete(0, table.len());
        assert_eq!(table.len(), 0);
        assert_eq!(table.levels(), 1);
        table.check_invariants().unwrap();
    }
}
