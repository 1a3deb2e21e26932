//! Fuzz testing for the edit engine.
//!
//! Replays an arbitrary edit script against both a `SliceTable` and a
//! plain `Vec<u8>` model, checking the structural invariants after every
//! operation and full byte equality at checkpoints. Snapshots taken
//! mid-script must still hold their bytes at the end.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use slicetable::SliceTable;

#[derive(Debug, Arbitrary)]
enum EditAction {
    Insert { pos: u16, len: u16, byte: u8 },
    Delete { pos: u16, len: u16 },
    Snapshot,
    IterCheck { pos: u16 },
}

fuzz_target!(|actions: Vec<EditAction>| {
    if actions.len() > 256 {
        return;
    }

    let mut table = SliceTable::new();
    let mut model: Vec<u8> = Vec::new();
    let mut snapshots: Vec<(SliceTable, usize)> = Vec::new();
    let mut frozen: Vec<Vec<u8>> = Vec::new();

    for action in &actions {
        match action {
            EditAction::Insert { pos, len, byte } => {
                let pos = *pos as usize % (model.len() + 1);
                let len = (*len as usize % 2048) + 1;
                let data = vec![*byte; len];
                let lfs = table.insert(pos, &data).unwrap();
                assert_eq!(lfs, if *byte == b'\n' { len } else { 0 });
                model.splice(pos..pos, data.iter().copied());
            }
            EditAction::Delete { pos, len } => {
                let pos = *pos as usize % (model.len() + 1);
                let len = *len as usize % 4096;
                table.delete(pos, len);
                let start = pos.min(model.len());
                let end = (pos + len).min(model.len());
                model.drain(start..end);
            }
            EditAction::Snapshot => {
                if snapshots.len() < 8 {
                    snapshots.push((table.clone(), model.len()));
                    frozen.push(model.clone());
                }
            }
            EditAction::IterCheck { pos } => {
                if !model.is_empty() {
                    let pos = *pos as usize % model.len();
                    assert_eq!(table.iter_at(pos).byte(), Some(model[pos]));
                }
            }
        }
        table.check_invariants().unwrap();
        assert_eq!(table.len(), model.len());
    }

    assert_eq!(table.to_vec(), model);
    for ((snap, len), bytes) in snapshots.iter().zip(&frozen) {
        assert_eq!(snap.len(), *len);
        assert_eq!(&snap.to_vec(), bytes);
        snap.check_invariants().unwrap();
    }
});
