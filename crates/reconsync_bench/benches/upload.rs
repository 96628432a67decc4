//! Upload throughput benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use reconsync_bench::{plain_batch, reference_batch};
use reconsync_testkit::TestHarness;

/// Fresh inserts of plain objects.
fn bench_upload_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("upload_create");

    for batch_size in [10usize, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, &batch_size| {
                let items = plain_batch(batch_size, 64);
                b.iter_with_setup(TestHarness::new, |harness| {
                    black_box(harness.upload(items.clone()));
                });
            },
        );
    }

    group.finish();
}

/// Sparse updates of existing objects.
fn bench_upload_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("upload_update");

    for batch_size in [10usize, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, &batch_size| {
                let harness = TestHarness::new();
                harness.upload(plain_batch(batch_size, 64));
                let updates = plain_batch(batch_size, 64);
                b.iter(|| black_box(harness.upload(updates.clone())));
            },
        );
    }

    group.finish();
}

/// Objects carrying reference collections, with placeholders.
fn bench_upload_references(c: &mut Criterion) {
    let mut group = c.benchmark_group("upload_references");

    for fan_out in [1usize, 4, 16].iter() {
        group.throughput(Throughput::Elements(100));
        group.bench_with_input(BenchmarkId::from_parameter(fan_out), fan_out, |b, &fan_out| {
            let items = reference_batch(100, fan_out);
            b.iter_with_setup(TestHarness::new, |harness| {
                black_box(harness.upload(items.clone()));
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_upload_create,
    bench_upload_update,
    bench_upload_references
);
criterion_main!(benches);
