use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use qcwatch_core::checks::window_deltas;
use qcwatch_core::window::{rolling_extrema, rolling_std};
use qcwatch_core::Timestamp;

const ROWS: usize = 100_000;

fn series(rows: usize) -> (Vec<Timestamp>, Vec<f64>) {
    let index = (0..rows as i64).map(|i| Timestamp::from_secs(i * 60)).collect();
    let values = (0..rows).map(|i| (i as f64 / 50.0).sin() * 10.0 + (i % 17) as f64).collect();
    (index, values)
}

/// Benchmark windowed max/min positions for growing window widths
fn bench_rolling_extrema(c: &mut Criterion) {
    let mut group = c.benchmark_group("rolling_extrema");
    let (index, values) = series(ROWS);

    for minutes in [15u64, 60, 24 * 60].iter() {
        let window = Duration::from_secs(minutes * 60);
        group.bench_with_input(BenchmarkId::from_parameter(minutes), &window, |b, window| {
            b.iter(|| rolling_extrema(black_box(&index), black_box(&values), *window).unwrap());
        });
    }
    group.finish();
}

/// Benchmark the delta check's per-row window deltas
fn bench_window_deltas(c: &mut Criterion) {
    let (index, values) = series(ROWS);
    let window = Duration::from_secs(3600);

    c.bench_function("window_deltas_1h", |b| {
        b.iter(|| window_deltas(black_box(&index), black_box(&values), window, false).unwrap());
    });
}

/// Benchmark rolling standard deviation used by the outlier check
fn bench_rolling_std(c: &mut Criterion) {
    let (index, values) = series(ROWS);
    let window = Duration::from_secs(3600);

    c.bench_function("rolling_std_1h", |b| {
        b.iter(|| rolling_std(black_box(&index), black_box(&values), window).unwrap());
    });
}

criterion_group!(benches, bench_rolling_extrema, bench_window_deltas, bench_rolling_std);
criterion_main!(benches);
