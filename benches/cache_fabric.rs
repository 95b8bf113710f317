// Performance benchmarks for the cache fabric: get/set throughput under
// each eviction strategy, and pattern invalidation cost at scale.

use std::time::Duration;

use cellar_intelligence::cache::CacheFabric;
use cellar_intelligence::config::CacheStrategyName;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn fabric(strategy: CacheStrategyName, max_size: usize) -> CacheFabric {
    CacheFabric::new(strategy, max_size, 64 * 1024 * 1024, Duration::from_secs(3600))
}

fn bench_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_set");

    for strategy in [CacheStrategyName::Lru, CacheStrategyName::Lfu, CacheStrategyName::Hybrid] {
        let cache = fabric(strategy, 10_000);
        group.bench_function(format!("{strategy:?}"), |b| {
            let mut i = 0usize;
            b.iter(|| {
                let key = format!("weather:alias:burgundy:{i}");
                cache.set(black_box(key), black_box(serde_json::json!({"score": 87})), None);
                i += 1;
            })
        });
    }

    group.finish();
}

fn bench_get_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_get_hit");

    for strategy in [CacheStrategyName::Lru, CacheStrategyName::Lfu, CacheStrategyName::Hybrid] {
        let cache = fabric(strategy, 10_000);
        for i in 0..1_000 {
            cache.set(format!("pairing:{i}"), serde_json::json!({"total": 0.8}), None);
        }

        group.bench_function(format!("{strategy:?}"), |b| {
            b.iter(|| black_box(cache.get(black_box("pairing:500"))))
        });
    }

    group.finish();
}

fn bench_eviction_under_pressure(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_eviction_under_pressure");

    for size in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let cache = fabric(CacheStrategyName::Hybrid, size / 2);
                for i in 0..size {
                    cache.set(
                        format!("k{i}"),
                        black_box(serde_json::json!({"v": i})),
                        None,
                    );
                }
            })
        });
    }

    group.finish();
}

fn bench_invalidate_pattern(c: &mut Criterion) {
    let cache = fabric(CacheStrategyName::Lru, 50_000);
    for i in 0..20_000 {
        let prefix = if i % 4 == 0 { "weather:alias:burgundy" } else { "pairing" };
        cache.set(format!("{prefix}:{i}"), serde_json::json!({"i": i}), None);
    }

    c.bench_function("invalidate_pattern", |b| {
        b.iter(|| black_box(cache.invalidate_pattern(black_box("weather:alias:burgundy*"))))
    });
}

criterion_group!(
    benches,
    bench_set,
    bench_get_hit,
    bench_eviction_under_pressure,
    bench_invalidate_pattern,
);
criterion_main!(benches);
