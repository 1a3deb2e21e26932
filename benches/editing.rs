//! Editing benchmarks for the document engine.
//!
//! These measure the paths an editor hits constantly: appending,
//! scattered delete/insert pairs, snapshotting before an edit burst, and
//! sequential chunk iteration.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use slicetable::config::HIGH_WATER;
use slicetable::SliceTable;

fn doc_of(chunks: usize) -> SliceTable {
    let mut t = SliceTable::new();
    let chunk = vec![b'd'; HIGH_WATER + 1];
    for _ in 0..chunks {
        let end = t.len();
        t.insert(end, &chunk).unwrap();
    }
    t
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");
    for count in [256usize, 2048].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("large_chunks", count), count, |b, &count| {
            b.iter(|| doc_of(count));
        });
        group.bench_with_input(BenchmarkId::new("small_pieces", count), count, |b, &count| {
            b.iter(|| {
                let mut t = SliceTable::new();
                for _ in 0..count {
                    let end = t.len();
                    t.insert(end, b"word ").unwrap();
                }
                t
            });
        });
    }
    group.finish();
}

fn bench_edit_storm(c: &mut Criterion) {
    let mut group = c.benchmark_group("edit_storm");
    for pairs in [1_000usize, 10_000].iter() {
        group.throughput(Throughput::Elements(*pairs as u64));
        group.bench_with_input(BenchmarkId::new("delete_insert", pairs), pairs, |b, &pairs| {
            b.iter_with_setup(
                || doc_of(64),
                |mut t| {
                    let size = t.len();
                    for i in 0..pairs {
                        let pos = (34 + 59 * i) % (size - 5);
                        t.delete(pos, 5);
                        t.insert(pos, b"thang").unwrap();
                    }
                    t
                },
            );
        });
    }
    group.finish();
}

fn bench_snapshot_then_edit(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    group.bench_function("clone", |b| {
        let t = doc_of(512);
        b.iter(|| black_box(t.clone()));
    });

    group.bench_function("clone_then_first_edit", |b| {
        // the first edit after a snapshot pays for the path copy
        b.iter_with_setup(
            || {
                let t = doc_of(512);
                let snap = t.clone();
                (t, snap)
            },
            |(mut t, snap)| {
                t.insert(t.len() / 2, b"cow").unwrap();
                (t, snap)
            },
        );
    });

    group.finish();
}

fn bench_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("iterate");
    let t = doc_of(1024);
    group.throughput(Throughput::Bytes(t.len() as u64));

    group.bench_function("chunks", |b| {
        b.iter(|| {
            let mut it = t.iter();
            let mut total = it.chunk().len();
            while let Some(chunk) = it.next_chunk() {
                total += chunk.len();
            }
            black_box(total)
        });
    });

    group.bench_function("dump", |b| {
        b.iter(|| black_box(t.to_vec().len()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_append,
    bench_edit_storm,
    bench_snapshot_then_edit,
    bench_iteration,
);
criterion_main!(benches);
