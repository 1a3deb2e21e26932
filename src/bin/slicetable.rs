//! Edit-storm driver: loads a document, runs a fixed sequence of
//! delete/insert pairs across it, verifies the tree invariants, and
//! writes the result. Exercises the whole engine the way an editor
//! session would, compressed into one command.
//!
//! ```sh
//! slicetable <input> <output> [iterations]
//! ```

use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};

use eyre::{bail, Result, WrapErr};
use slicetable::SliceTable;

const EDIT: &[u8] = b"thang";
const CHECK_EVERY: usize = 4096;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let (input, output) = match args.as_slice() {
        [_, input, output] | [_, input, output, _] => (input, output),
        _ => bail!("usage: slicetable <input> <output> [iterations]"),
    };
    let iterations: usize = match args.get(3) {
        Some(n) => n.parse().wrap_err("iterations must be a number")?,
        None => 100_000,
    };

    let mut table = SliceTable::from_file(input)?;
    let size = table.len();
    println!("loaded {} ({} bytes, {} levels)", input, size, table.levels());
    if size <= EDIT.len() {
        bail!("input must be larger than the {}-byte edit", EDIT.len());
    }

    for i in 0..iterations {
        let pos = (34 + 59 * i) % (size - EDIT.len());
        table.delete(pos, EDIT.len());
        table.insert(pos, EDIT)?;
        if i % CHECK_EVERY == 0 {
            table.check_invariants()?;
        }
    }
    table.check_invariants()?;
    assert_eq!(table.len(), size, "paired edits must preserve the size");

    let file = File::create(output)
        .wrap_err_with(|| format!("failed to create '{}'", output))?;
    let mut sink = BufWriter::new(file);
    table.dump(&mut sink)?;
    sink.flush().wrap_err("failed to flush output")?;

    println!(
        "{} edit pairs applied, {} bytes written to {}",
        iterations,
        table.len(),
        output
    );
    Ok(())
}
