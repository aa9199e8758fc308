//! 代理池基准测试
//!
//! 测试存活列表操作和随机选取的性能

use criterion::{criterion_group, criterion_main, Criterion};
use proxy_pool::health::FnProber;
use proxy_pool::pool::{AliveStore, PoolOptions, ProxyPool};
use std::hint::black_box;
use std::time::Duration;
use url::Url;

fn endpoints(count: usize) -> Vec<Url> {
    (0..count)
        .map(|i| Url::parse(&format!("http://10.0.{}.{}:8080", i / 250, i % 250 + 1)).unwrap())
        .collect()
}

/// 存活列表基准测试
fn alive_store_benchmark(c: &mut Criterion) {
    let urls = endpoints(1000);

    c.bench_function("alive_store_push_1000", |b| {
        b.iter(|| {
            let mut store = AliveStore::new();
            for url in &urls {
                store.push(url.clone());
            }
            black_box(store.len())
        });
    });

    c.bench_function("alive_store_swap_remove_half", |b| {
        b.iter(|| {
            let mut store = AliveStore::new();
            for url in &urls {
                store.push(url.clone());
            }
            for index in (0..store.len()).rev().step_by(2) {
                black_box(store.swap_remove(index));
            }
            black_box(store.len())
        });
    });
}

/// 代理池随机选取基准测试
fn pool_get_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let pool = runtime.block_on(async {
        let pool = ProxyPool::new(
            PoolOptions::default()
                .with_prober(FnProber::new(|_: &Url| true))
                .with_sweep_interval(Duration::from_secs(3600)),
        )
        .unwrap();
        for url in endpoints(100) {
            pool.add_endpoint(url).await.unwrap();
        }
        pool
    });

    c.bench_function("pool_get", |b| {
        b.iter(|| runtime.block_on(async { black_box(pool.get().await.unwrap()) }));
    });

    c.bench_function("pool_all", |b| {
        b.iter(|| runtime.block_on(async { black_box(pool.all().await.len()) }));
    });

    runtime.block_on(async { pool.stop() });
}

criterion_group!(benches, alive_store_benchmark, pool_get_benchmark);
criterion_main!(benches);
