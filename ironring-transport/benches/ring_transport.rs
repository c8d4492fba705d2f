//! Ring transport benchmarks.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use ironring_transport::RingTransport;
use std::hint::black_box;

fn benchmark_publish_poll(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut group = c.benchmark_group("ring_transport");

    for size in [32usize, 256, 1024] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("publish_poll", size), &size, |b, &size| {
            let path = dir.path().join(format!("bench-{size}"));
            let mut ring = RingTransport::create(&path, 1 << 20).unwrap();
            let message = vec![7u8; size];

            b.iter(|| {
                ring.publish(black_box(&message)).unwrap();
                black_box(ring.poll(|payload| {
                    black_box(payload);
                }))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_publish_poll);
criterion_main!(benches);
