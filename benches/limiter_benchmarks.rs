use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::time::Duration;
use window_limiter::rate_limit::{
    Granularity, MemoryCounterStore, RateLimitConfig, RateLimiter, RecordStrategy,
    WindowKeyDeriver,
};

fn benchmark_derive_key(c: &mut Criterion) {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 20).unwrap();
    let mut group = c.benchmark_group("derive_key");

    for granularity in [
        Granularity::MinuteOfHour,
        Granularity::EpochMinute,
        Granularity::EpochDay,
    ] {
        let deriver = WindowKeyDeriver::new("requestCount", granularity);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", granularity)),
            &deriver,
            |b, deriver| b.iter(|| deriver.derive_key(black_box(now))),
        );
    }

    group.finish();
}

fn benchmark_check_and_record(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 20).unwrap();
    let mut group = c.benchmark_group("check_and_record_memory");

    for strategy in [RecordStrategy::ReadThenWrite, RecordStrategy::Atomic] {
        let config = RateLimitConfig {
            strategy,
            ..RateLimitConfig::new(u64::MAX - 1, Duration::from_secs(60))
        };
        let limiter = RateLimiter::with_store(config, Arc::new(MemoryCounterStore::new()))
            .expect("Failed to build limiter");

        group.bench_function(format!("{:?}", strategy), |b| {
            b.to_async(&runtime)
                .iter(|| async { limiter.check_and_record(black_box(now)).await.unwrap() })
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_derive_key, benchmark_check_and_record);
criterion_main!(benches);
