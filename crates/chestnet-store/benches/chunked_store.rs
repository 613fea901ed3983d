//! Chunked write/read throughput against the in-memory record store

use chestnet_store::{ChunkedStore, MemoryRecordStore};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_chunked_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunked_roundtrip");

    for size in [1_000usize, 32_767, 250_000] {
        let payload = "net:ore-depot.red|Ore Depot|red\n".repeat(size / 32 + 1);
        let chunked = ChunkedStore::new(MemoryRecordStore::new(), 32_767).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| {
                chunked.write("bench", black_box(payload)).unwrap();
                black_box(chunked.read("bench").unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_chunked_roundtrip);
criterion_main!(benches);
