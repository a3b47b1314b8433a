//! Benchmarks for the Hivesight stores and report synthesis
//!
//! Run with: cargo bench

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use hivesight::{
    Config, HiveCore, ManualClock, Observation, Retention, TtlKeyedStore, BEE_COUNT, HONEY_YIELD,
    TEMPERATURE,
};
use std::collections::BTreeMap;
use std::sync::Arc;

fn start() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn create_test_observations(count: usize) -> Vec<Observation> {
    (0..count)
        .map(|i| {
            Observation::new("hive-1", start() + Duration::hours(i as i64))
                .metric(BEE_COUNT, 20.0 + (i % 30) as f64)
                .metric(HONEY_YIELD, 15.0 + (i % 10) as f64)
                .environmental(TEMPERATURE, 18.0 + (i % 15) as f64)
        })
        .collect()
}

fn bench_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");

    for size in [100, 1000, 10000] {
        let observations = create_test_observations(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("append_{}", size), |b| {
            b.iter(|| {
                let clock = Arc::new(ManualClock::new(start() + Duration::days(365)));
                let store = TtlKeyedStore::new("bench", Retention::days(365), clock);
                for obs in &observations {
                    store.append("hive-1".to_string(), obs.clone(), obs.timestamp);
                }
                black_box(store.len("hive-1"))
            })
        });

        let clock = Arc::new(ManualClock::new(start() + Duration::days(365)));
        let store = TtlKeyedStore::new("bench", Retention::days(365), clock);
        for obs in &observations {
            store.append("hive-1".to_string(), obs.clone(), obs.timestamp);
        }

        group.bench_function(format!("get_{}", size), |b| {
            b.iter(|| black_box(store.get(black_box("hive-1"), None)))
        });

        group.bench_function(format!("sweep_nothing_expired_{}", size), |b| {
            b.iter(|| black_box(store.sweep()))
        });
    }

    group.finish();
}

fn build_core(days: i64) -> HiveCore {
    let clock = Arc::new(ManualClock::new(start() + Duration::days(days)));
    let core = HiveCore::new(Config::default(), clock).unwrap();
    for day in 0..days {
        core.record(
            Observation::new("hive-1", start() + Duration::days(day))
                .metric(BEE_COUNT, 20.0 + (day % 30) as f64)
                .metric(HONEY_YIELD, 15.0 + (day % 10) as f64)
                .environmental(TEMPERATURE, 18.0 + (day % 15) as f64),
        )
        .unwrap();
    }
    core
}

fn bench_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("report");
    let metrics = BTreeMap::from([(BEE_COUNT.to_string(), 35.0)]);

    for days in [30, 365] {
        // Each report records an observation, so every iteration gets a fresh core
        group.bench_function(format!("generate_report_{}_days", days), |b| {
            b.iter_batched(
                || build_core(days),
                |core| {
                    core.generate_report(black_box("hive-1"), metrics.clone(), None, None)
                        .unwrap()
                },
                BatchSize::LargeInput,
            )
        });

        let core = build_core(days);
        group.bench_function(format!("forecast_{}_days", days), |b| {
            b.iter(|| core.get_forecast(black_box("hive-1")).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_store, bench_report);
criterion_main!(benches);
