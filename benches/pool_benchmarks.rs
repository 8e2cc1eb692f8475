use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use elastic_pool::{connect, create_pool, job::Job};
use std::hint::black_box;

fn create_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .enable_all()
        .build()
        .unwrap()
}

struct Spin(u64);

impl Job for Spin {
    type Output = u64;

    fn execute(self) -> u64 {
        (0..self.0).fold(0_u64, |acc, x| acc.wrapping_add(black_box(x)))
    }
}

// Benchmark 1: проход задач через один пул при разной границе
fn bench_single_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_pool");
    let rt = create_runtime();
    let size = 1_000;
    group.throughput(Throughput::Elements(size));

    for concurrency in [1_usize, 4, 16] {
        group.bench_with_input(
            BenchmarkId::new("concurrency", concurrency),
            &concurrency,
            |b, &concurrency| {
                b.to_async(&rt).iter(|| async move {
                    let (jobs, results) = create_pool::<Spin, _>(concurrency).unwrap();
                    tokio::spawn(async move {
                        jobs.submit_all((0..size).map(|_| Spin(256))).await.unwrap();
                    });
                    black_box(results.drain().await.len())
                });
            },
        );
    }

    group.finish();
}

// Benchmark 2: две стадии через connect
fn bench_pipeline(c: &mut Criterion) {
    struct Forward(u64);

    impl Job for Forward {
        type Output = Spin;

        fn execute(self) -> Spin {
            Spin(self.0)
        }
    }

    let mut group = c.benchmark_group("pipeline");
    let rt = create_runtime();
    let size = 1_000;
    group.throughput(Throughput::Elements(size));

    group.bench_function("two_stages", |b| {
        b.to_async(&rt).iter(|| async move {
            let (jobs, results) = create_pool::<Forward, _>(4).unwrap();
            let (next_jobs, next_results) = create_pool::<Spin, _>(4).unwrap();
            let connector = connect(results, next_jobs);
            tokio::spawn(async move {
                jobs.submit_all((0..size).map(|_| Forward(256))).await.unwrap();
            });
            let n = next_results.drain().await.len();
            connector.await.unwrap();
            black_box(n)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_single_pool, bench_pipeline);
criterion_main!(benches);
