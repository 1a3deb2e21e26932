//! # slicetable - Persistent Copy-on-Write Byte Sequence
//!
//! A B+tree-backed sequence of bytes built as the buffer representation
//! for a text editor: positional insert and delete, point lookup, and
//! forward/backward iteration by byte or chunk, with O(1) snapshots that
//! share structure with the original.
//!
//! ## Quick Start
//!
//! ```
//! use slicetable::SliceTable;
//!
//! let mut doc = SliceTable::new();
//! doc.insert(0, b"hello world")?;
//! doc.delete(5, 6);
//! doc.insert(5, b", tree")?;
//!
//! let snapshot = doc.clone();       // O(1)
//! doc.delete(0, doc.len());
//! assert_eq!(snapshot.to_vec(), b"hello, tree");
//! # eyre::Ok(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────┐
//! │   SliceTable (handle: root + height)  │
//! ├───────────────────────────────────────┤
//! │   Edit engine (recursive descent,     │
//! │   split/underflow handling)           │
//! ├───────────────────────────────────────┤
//! │   Path copy-on-write (Arc make-mut)   │
//! ├───────────────────────────────────────┤
//! │   Nodes (span + child slot arrays)    │
//! ├───────────────────────────────────────┤
//! │   Blocks (small mutable buffers /     │
//! │   large shared heap or mmap blocks)   │
//! └───────────────────────────────────────┘
//! ```
//!
//! Leaves mix two storage classes per slot: spans up to
//! [`config::HIGH_WATER`] live in fixed-capacity buffers edited in place,
//! larger spans reference windows of immutable reference-counted blocks
//! (optionally file-backed via mmap). The tree keeps the two interleaved
//! (no two adjacent small slots) so scattered small edits coalesce
//! instead of fragmenting the document.
//!
//! ## Concurrency Model
//!
//! One handle, one writer. Any number of snapshots may be read
//! concurrently from other threads; every edit copies the root-to-leaf
//! path out of shared ownership before writing, so snapshots are
//! observationally immutable.
//!
//! ## Module Overview
//!
//! - [`config`]: compile-time constants (fanouts, small/large boundary)
//! - [`block`]: byte storage (small mutable buffers, large shared blocks)
//! - [`node`]: tree nodes, hybrid leaf slots, merge machinery
//! - [`tree`]: the `SliceTable` handle and the edit engine
//! - [`iter`]: bounded-stack cursor over a table

pub mod block;
pub mod config;
pub mod iter;
pub mod node;
pub mod tree;

pub use iter::SliceIter;
pub use tree::SliceTable;
