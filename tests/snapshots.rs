//! # Snapshot Tests
//!
//! A clone of a `SliceTable` is an O(1) snapshot sharing the whole tree.
//! These tests verify the copy-on-write contract from the outside: no
//! sequence of edits through one handle may change the bytes another
//! handle observes, including across threads.

use std::thread;

use slicetable::config::HIGH_WATER;
use slicetable::SliceTable;

#[test]
fn snapshot_sees_bytes_from_before_the_edit() {
    let mut t = SliceTable::new();
    t.insert(0, b"abc").unwrap();
    let mut u = t.clone();
    u.insert(1, b"ZZ").unwrap();
    assert_eq!(t.to_vec(), b"abc");
    assert_eq!(u.to_vec(), b"aZZbc");
    t.check_invariants().unwrap();
    u.check_invariants().unwrap();
}

#[test]
fn snapshot_survives_heavy_mutation_of_the_original() {
    let mut t = SliceTable::new();
    for k in 0..40u8 {
        let end = t.len();
        t.insert(end, &vec![k, k, k]).unwrap();
        t.insert(end / 2, &vec![b'#'; HIGH_WATER + 7]).unwrap();
    }
    let frozen = t.clone();
    let expected = frozen.to_vec();

    for i in 0..200usize {
        let pos = (i * 131) % t.len().max(1);
        t.delete(pos, 97);
        t.insert(pos.min(t.len()), b"mutation").unwrap();
    }
    t.delete(0, t.len());

    assert_eq!(frozen.to_vec(), expected);
    frozen.check_invariants().unwrap();
}

#[test]
fn chain_of_snapshots_diverges_independently() {
    let mut generations: Vec<SliceTable> = Vec::new();
    let mut t = SliceTable::new();
    for k in 0..10usize {
        let end = t.len();
        t.insert(end, format!("gen{:02} ", k).as_bytes()).unwrap();
        generations.push(t.clone());
    }
    for (k, snap) in generations.iter().enumerate() {
        assert_eq!(snap.len(), (k + 1) * 6);
        assert!(snap.to_vec().ends_with(format!("gen{:02} ", k).as_bytes()));
    }
}

#[test]
fn snapshots_are_readable_from_other_threads() {
    let mut t = SliceTable::new();
    for k in 0..64usize {
        let end = t.len();
        t.insert(end, &vec![(k % 251) as u8; 500]).unwrap();
    }
    let expected = t.to_vec();

    let readers: Vec<_> = (0..4usize)
        .map(|offset| {
            let snap = t.clone();
            let expected = expected.clone();
            thread::spawn(move || {
                for round in 0..50usize {
                    let pos = (offset * 1000 + round * 37) % snap.len();
                    assert_eq!(snap.iter_at(pos).byte(), Some(expected[pos]));
                }
                assert_eq!(snap.to_vec(), expected);
            })
        })
        .collect();

    // keep editing while the readers run
    for i in 0..200usize {
        let pos = (i * 7919) % t.len().max(1);
        t.delete(pos, 300);
        t.insert(pos.min(t.len()), b"writer traffic").unwrap();
    }

    for reader in readers {
        reader.join().unwrap();
    }
    t.check_invariants().unwrap();
}
