//! Benchmarks for planning and merging.

use chrono::{Days, NaiveDate, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quotecache_core::{Bar, DateRange, FetchedSeries, SeriesRecord};
use quotecache_engine::{merge, plan};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 3).unwrap()
}

fn bars(from: NaiveDate, count: u64) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            Bar::on_date(from + Days::new(i), close, close + 1.0, close - 1.0, close, 1_000.0)
        })
        .collect()
}

fn record(count: u64) -> SeriesRecord {
    let last = start() + Days::new(count - 1);
    SeriesRecord {
        name: "Bench".to_string(),
        bars: bars(start(), count),
        coverage: DateRange::new(start(), last).ok(),
        fetched_at: Utc::now(),
    }
}

fn benchmark_merge_tail(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_tail");

    for size in [1_000u64, 10_000, 50_000].iter() {
        let base = record(*size);
        let tail_start = start() + Days::new(*size - 5);
        let tail_end = tail_start + Days::new(30);
        let segment = DateRange::new(tail_start, tail_end).unwrap();
        let fetched = FetchedSeries::new("Bench", bars(tail_start, 31));

        group.bench_with_input(BenchmarkId::from_parameter(size), &base, |b, base| {
            b.iter(|| {
                merge(
                    Some(black_box(base.clone())),
                    vec![(segment, fetched.clone())],
                    Utc::now(),
                )
            })
        });
    }

    group.finish();
}

fn benchmark_plan(c: &mut Criterion) {
    let base = record(10_000);
    let requested = DateRange::new(start(), start() + Days::new(20_000)).unwrap();
    let today = start() + Days::new(20_000);

    c.bench_function("plan_stale_extend", |b| {
        b.iter(|| plan(Some(black_box(&base)), requested, true, today))
    });
}

criterion_group!(benches, benchmark_merge_tail, benchmark_plan);
criterion_main!(benches);
