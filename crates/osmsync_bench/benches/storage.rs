//! Spill store, index store and external sort benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use osmsync_bench::{random_strings, scratch_store, shuffled_keys};
use osmsync_store::{FileBasedSort, IndexStore, LongLongIndexElement, Release, SimpleObjectStore};

/// Benchmark writing then replaying a sequential store.
fn bench_simple_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("simple_store");

    for count in [1_000usize, 10_000, 100_000] {
        let values = random_strings(count, 32, 7);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("write_read", count), &values, |b, values| {
            b.iter(|| {
                let (_dir, config) = scratch_store();
                let mut store = SimpleObjectStore::<String>::new(&config.storage, "bench");
                for value in values {
                    store.add(value).unwrap();
                }
                let mut reader = store.iterate().unwrap();
                let read = reader.by_ref().map(|r| r.unwrap()).count();
                reader.release();
                store.release();
                black_box(read);
            });
        });
    }

    group.finish();
}

/// Benchmark completing an index from random input.
fn bench_index_complete(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_complete");
    group.sample_size(10);

    for count in [10_000usize, 100_000] {
        let keys = shuffled_keys(count, 11);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &keys, |b, keys| {
            b.iter(|| {
                let (_dir, config) = scratch_store();
                let mut index = IndexStore::new(&config, "bench");
                for key in keys {
                    index.write(&LongLongIndexElement::new(*key, *key)).unwrap();
                }
                index.complete().unwrap();
                index.release();
            });
        });
    }

    group.finish();
}

/// Benchmark point lookups on a completed index.
fn bench_index_lookup(c: &mut Criterion) {
    let (_dir, config) = scratch_store();
    let count = 100_000;
    let mut index = IndexStore::new(&config, "lookup");
    for key in shuffled_keys(count, 13) {
        index.write(&LongLongIndexElement::new(key, -key)).unwrap();
    }
    index.complete().unwrap();

    let probes = shuffled_keys(count, 17);
    let mut next = probes.iter().cycle();
    c.bench_function("index_lookup", |b| {
        b.iter(|| {
            let key = *next.next().unwrap_or(&0);
            black_box(index.get(black_box(key)).unwrap());
        });
    });
    index.release();
}

/// Benchmark the external sort with several merge passes.
fn bench_external_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("external_sort");
    group.sample_size(10);

    for run_size in [1_024usize, 16_384] {
        let keys = shuffled_keys(200_000, 19);
        group.throughput(Throughput::Elements(keys.len() as u64));
        group.bench_with_input(BenchmarkId::new("run_size", run_size), &keys, |b, keys| {
            b.iter(|| {
                let (_dir, config) = scratch_store();
                let config = config.with_sort_run_size(run_size).with_sort_fan_in(8);
                let mut sort = FileBasedSort::new(config, |a: &i64, b: &i64| a.cmp(b));
                for key in keys {
                    sort.add(*key).unwrap();
                }
                let mut sorted = sort.iterate().unwrap();
                let count = sorted.by_ref().map(|r| r.unwrap()).count();
                sorted.release();
                black_box(count);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_simple_store,
    bench_index_complete,
    bench_index_lookup,
    bench_external_sort
);
criterion_main!(benches);
