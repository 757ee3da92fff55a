use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use cascade_core::{Cascade, Cleaner, Initial};

/// `width` parallel nodes between one source and one sink, each with a
/// cleaner.
fn wide_diamond(width: usize) -> Cascade<usize> {
    let sink = width + 1;
    let nodes = std::iter::once((0, Some(Cleaner::new(|| {})), Initial::State(true)))
        .chain((1..=width).map(|id| (id, Some(Cleaner::new(|| {})), Initial::from([0]))))
        .chain(std::iter::once((
            sink,
            Some(Cleaner::new(|| {})),
            Initial::Dependencies((1..=width).collect()),
        )));
    Cascade::create(nodes).expect("valid diamond")
}

/// A single chain of `len` nodes.
fn chain(len: usize) -> Cascade<usize> {
    Cascade::create((0..len).map(|id| {
        let initial = match id {
            0 => Initial::State(true),
            _ => Initial::Dependencies(vec![id - 1]),
        };
        (id, Some(Cleaner::new(|| {})), initial)
    }))
    .expect("valid chain")
}

fn bench_dirty_then_clean(c: &mut Criterion) {
    let mut group = c.benchmark_group("dirty_then_clean");

    for width in [16, 256, 4096] {
        let cascade = wide_diamond(width);
        let sink = width + 1;
        group.bench_with_input(BenchmarkId::new("wide_diamond", width), &cascade, |b, cascade| {
            b.iter(|| {
                let dirty = cascade.dirty([0]).unwrap();
                black_box(dirty.clean(&sink).unwrap())
            })
        });
    }

    for len in [16, 256, 4096] {
        let cascade = chain(len);
        let tail = len - 1;
        group.bench_with_input(BenchmarkId::new("chain", len), &cascade, |b, cascade| {
            b.iter(|| {
                let dirty = cascade.dirty([0]).unwrap();
                black_box(dirty.clean(&tail).unwrap())
            })
        });
    }

    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let cascade = wide_diamond(1024).set_all(false);
    c.bench_function("resolve_wide_diamond_1024", |b| {
        b.iter(|| black_box(cascade.resolve(&1025).unwrap()))
    });
}

criterion_group!(benches, bench_dirty_then_clean, bench_resolve);
criterion_main!(benches);
