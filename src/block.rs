//! # Byte Blocks
//!
//! The leaves of the tree do not own bytes directly; they reference blocks.
//! A block comes in two flavors with very different contracts:
//!
//! - [`Block`] is a **large, immutable** store: a heap buffer or a
//!   read-only memory map. Large blocks are shared between slots, leaves,
//!   and whole snapshots through `Arc`, and are never written after
//!   creation. Edits to large content produce new blocks or fragment
//!   references; the old block lives until its last referent drops.
//!
//! - [`SmallBuf`] is a **small, mutable** buffer of fixed `HIGH_WATER`
//!   capacity, edited in place by byte shifting. A `SmallBuf` is uniquely
//!   owned by exactly one leaf slot; cloning a leaf (the copy-on-write
//!   step) deep-copies its small buffers, which is what makes in-place
//!   edits safe in the presence of snapshots.
//!
//! ## Reference counting
//!
//! Sharing and reclamation of large blocks ride on `Arc`: a relaxed
//! increment on clone, a release decrement on drop, and an acquire fence
//! before the final free. The structural-uniqueness rule (mutate only
//! what you exclusively own) is enforced one level up, where the tree
//! clones any node (and its small buffers) whose refcount exceeds one
//! before editing it.

use std::fmt;

use memmap2::Mmap;

use crate::config::HIGH_WATER;

/// An immutable byte store backing large slots.
pub enum Block {
    /// Heap-allocated content, created by an edit or a small file read
    /// that outgrew `HIGH_WATER`.
    Heap(Vec<u8>),
    /// A read-only memory-mapped file, created by
    /// [`SliceTable::from_file`](crate::SliceTable::from_file).
    Mmap(Mmap),
}

impl Block {
    pub fn bytes(&self) -> &[u8] {
        match self {
            Block::Heap(data) => data,
            Block::Mmap(map) => map,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Block::Heap(data) => f.debug_struct("Heap").field("len", &data.len()).finish(),
            Block::Mmap(map) => f.debug_struct("Mmap").field("len", &map.len()).finish(),
        }
    }
}

/// A fixed-capacity mutable buffer for small slots.
///
/// The capacity is always exactly `HIGH_WATER`, so in-place inserts never
/// reallocate; content that would exceed the capacity is promoted to a
/// large [`Block`] by the slice layer instead.
pub struct SmallBuf {
    len: usize,
    data: Box<[u8; HIGH_WATER]>,
}

impl SmallBuf {
    /// Copies `bytes` (at most `HIGH_WATER` of them) into a fresh buffer.
    pub fn new(bytes: &[u8]) -> Self {
        debug_assert!(bytes.len() <= HIGH_WATER);
        let mut data = Box::new([0u8; HIGH_WATER]);
        data[..bytes.len()].copy_from_slice(bytes);
        SmallBuf {
            len: bytes.len(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Shifts the tail right and splices `bytes` in at `offset`.
    ///
    /// The result must fit the fixed capacity; the caller promotes to a
    /// large block instead when it would not.
    pub fn insert(&mut self, offset: usize, bytes: &[u8]) {
        debug_assert!(offset <= self.len);
        debug_assert!(self.len + bytes.len() <= HIGH_WATER);
        self.data
            .copy_within(offset..self.len, offset + bytes.len());
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
    }

    /// Shifts the tail left over `len` bytes at `offset`.
    pub fn delete(&mut self, offset: usize, len: usize) {
        debug_assert!(offset + len <= self.len);
        self.data.copy_within(offset + len..self.len, offset);
        self.len -= len;
    }
}

impl Clone for SmallBuf {
    fn clone(&self) -> Self {
        SmallBuf {
            len: self.len,
            data: self.data.clone(),
        }
    }
}

impl fmt::Debug for SmallBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmallBuf").field("len", &self.len).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_buf_copies_initial_bytes() {
        let buf = SmallBuf::new(b"hello");
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.as_slice(), b"hello");
    }

    #[test]
    fn small_buf_insert_shifts_tail() {
        let mut buf = SmallBuf::new(b"held");
        buf.insert(3, b"lo wor");
        assert_eq!(buf.as_slice(), b"hello word");
    }

    #[test]
    fn small_buf_insert_at_ends() {
        let mut buf = SmallBuf::new(b"bc");
        buf.insert(0, b"a");
        buf.insert(3, b"d");
        assert_eq!(buf.as_slice(), b"abcd");
    }

    #[test]
    fn small_buf_delete_shifts_tail() {
        let mut buf = SmallBuf::new(b"abcdef");
        buf.delete(2, 2);
        assert_eq!(buf.as_slice(), b"abef");
    }

    #[test]
    fn small_buf_delete_whole_content() {
        let mut buf = SmallBuf::new(b"abc");
        buf.delete(0, 3);
        assert!(buf.is_empty());
    }

    #[test]
    fn small_buf_clone_is_independent() {
        let mut a = SmallBuf::new(b"shared");
        let b = a.clone();
        a.delete(0, 6);
        assert_eq!(b.as_slice(), b"shared");
    }

    #[test]
    fn heap_block_exposes_bytes() {
        let block = Block::Heap(vec![1, 2, 3]);
        assert_eq!(block.bytes(), &[1, 2, 3]);
        assert_eq!(block.len(), 3);
    }
}
