//! Throughput Benchmarks for rediskit
//!
//! Measures keyed reduction and top-N selection over in-memory records, and
//! the storage engine and JSON helpers under typical cache workloads.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rediskit::cache::{CacheClient, CacheService};
use rediskit::collections::{reduce_to_map, top_n, OrderType, TieBreak};
use rediskit::storage::{KeyValueStore, StorageEngine};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Quote {
    symbol: u32,
    sequence: u64,
    price: f64,
}

fn quotes(count: u64, symbols: u32) -> Vec<Quote> {
    (0..count)
        .map(|i| Quote {
            symbol: (i % symbols as u64) as u32,
            sequence: i,
            price: (i % 97) as f64 * 1.25,
        })
        .collect()
}

/// Benchmark keyed reduction: unique keys (fast path) vs heavy duplication
fn bench_reduce(c: &mut Criterion) {
    let mut group = c.benchmark_group("reduce_to_map");

    for &(count, symbols) in &[(10_000u64, 10_000u32), (10_000, 100)] {
        let records = quotes(count, symbols);
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(
            BenchmarkId::new("latest_per_symbol", format!("{}/{}", count, symbols)),
            &records,
            |b, records| {
                b.iter(|| {
                    black_box(reduce_to_map(
                        records.clone(),
                        |q| q.symbol,
                        |q| q.sequence,
                        |q| q.price,
                        TieBreak::Max,
                    ))
                });
            },
        );
    }

    group.finish();
}

/// Benchmark top-N selection
fn bench_top_n(c: &mut Criterion) {
    let records = quotes(10_000, 10_000);

    let mut group = c.benchmark_group("top_n");
    group.throughput(Throughput::Elements(records.len() as u64));

    group.bench_function("top_10_desc", |b| {
        b.iter(|| {
            black_box(top_n(records.iter(), |q| q.sequence, OrderType::Desc, 0, 10).count())
        });
    });

    group.bench_function("page_3_asc", |b| {
        b.iter(|| {
            black_box(top_n(records.iter(), |q| q.sequence, OrderType::Asc, 20, 10).count())
        });
    });

    group.finish();
}

/// Benchmark string SET/GET
fn bench_strings(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());
    for i in 0..100_000 {
        engine.set(format!("key:{}", i).as_bytes(), Bytes::from(format!("value:{}", i)), None);
    }

    let mut group = c.benchmark_group("strings");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            engine.set(format!("new:{}", i).as_bytes(), Bytes::from("small_value"), None);
            i += 1;
        });
    });

    group.bench_function("set_with_ttl", |b| {
        let mut i = 0u64;
        b.iter(|| {
            engine.set(
                format!("ttl:{}", i).as_bytes(),
                Bytes::from("value"),
                Some(Duration::from_secs(3600)),
            );
            i += 1;
        });
    });

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(engine.get(format!("key:{}", i % 100_000).as_bytes()).ok());
            i += 1;
        });
    });

    group.bench_function("incr_single_counter", |b| {
        b.iter(|| {
            black_box(engine.incr_by(b"counter", 1).ok());
        });
    });

    group.finish();
}

/// Benchmark hash and sorted-set commands
fn bench_collections(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    let mut group = c.benchmark_group("collections");
    group.throughput(Throughput::Elements(1));

    group.bench_function("hset_hget", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let field = Bytes::from(format!("field:{}", i % 1_000));
            engine.hset(b"hash", field.clone(), Bytes::from("value")).ok();
            black_box(engine.hget(b"hash", &field).ok());
            i += 1;
        });
    });

    group.bench_function("zincr_by", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let member = Bytes::from(format!("player:{}", i % 1_000));
            black_box(engine.zincr_by(b"board", member, 1.0).ok());
            i += 1;
        });
    });

    group.bench_function("zrevrange_top_10", |b| {
        b.iter(|| {
            black_box(engine.zrevrange(b"board", 0, 9).ok());
        });
    });

    group.finish();
}

/// Benchmark JSON encode/decode through the cache service
fn bench_json(c: &mut Criterion) {
    let service = CacheService::from_store(Arc::new(StorageEngine::new()));
    let quote = Quote {
        symbol: 7,
        sequence: 42,
        price: 101.5,
    };
    service.set_json("quote", &quote).ok();

    let mut group = c.benchmark_group("json");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_json", |b| {
        b.iter(|| service.set_json("quote", black_box(&quote)).ok());
    });

    group.bench_function("get_json", |b| {
        b.iter(|| black_box(service.get_json::<Quote>("quote").ok()));
    });

    group.finish();
}

/// Several threads sharing one client, each updating its own counters hash
fn bench_shared_client(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared_client");
    group.measurement_time(Duration::from_secs(10));

    for &threads in &[2usize, 8] {
        group.throughput(Throughput::Elements((threads * 2_000) as u64));
        group.bench_with_input(BenchmarkId::new("hash_incr", threads), &threads, |b, &threads| {
            b.iter(|| {
                let client = CacheClient::new(Arc::new(StorageEngine::new()));
                std::thread::scope(|scope| {
                    for t in 0..threads {
                        let client = client.clone();
                        scope.spawn(move || {
                            let key = format!("stats:{}", t);
                            for i in 0..2_000 {
                                let _ = client.hash_incr(&key, &format!("bucket:{}", i % 16));
                            }
                        });
                    }
                });
                black_box(client.store().len())
            });
        });
    }

    group.finish();
}

/// Namespace scans through the client, as cache invalidation does
fn bench_key_scan(c: &mut Criterion) {
    let client = CacheClient::new(Arc::new(StorageEngine::new()));
    for tenant in 0..10 {
        for i in 0..300 {
            client.set(&format!("tenant:{}:order:{}", tenant, i), "o");
            client.set(&format!("tenant:{}:invoice:{}", tenant, i), "i");
        }
    }

    let mut group = c.benchmark_group("key_scan");

    for pattern in ["tenant:3:*", "tenant:?:order:1*", "tenant:[0-4]:invoice:*"] {
        group.bench_with_input(BenchmarkId::from_parameter(pattern), pattern, |b, pattern| {
            b.iter(|| black_box(client.keys(pattern).map(|keys| keys.len()).ok()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_reduce,
    bench_top_n,
    bench_strings,
    bench_collections,
    bench_json,
    bench_shared_client,
    bench_key_scan,
);

criterion_main!(benches);
