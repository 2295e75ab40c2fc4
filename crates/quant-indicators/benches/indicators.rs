//! Benchmarks for indicator kernels and the full pipeline.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quant_core::traits::Indicator;
use quant_core::types::{Bar, BarSeries, Timeframe};
use quant_indicators::{simd, IndicatorPipeline, IndicatorSettings, Rsi};

fn generate_closes(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 100.0 + (i as f64 * 0.1).sin() * 10.0)
        .collect()
}

fn generate_series(size: usize) -> BarSeries {
    let raw = generate_closes(size).into_iter().enumerate().map(|(i, c)| {
        Bar::new(i as i64 * 3_600_000, c - 0.1, c + 0.6, c - 0.7, c, 1_000.0 + (i % 17) as f64)
    });
    BarSeries::ingest("BENCH", Timeframe::Hour1, raw).0
}

fn benchmark_rolling(c: &mut Criterion) {
    let mut group = c.benchmark_group("rolling");

    for size in [1000, 10000, 100000].iter() {
        let data = generate_closes(*size);

        group.bench_with_input(BenchmarkId::new("mean", size), &data, |b, data| {
            b.iter(|| simd::rolling_mean_simd(black_box(data), black_box(20)))
        });

        group.bench_with_input(BenchmarkId::new("mean_std", size), &data, |b, data| {
            b.iter(|| simd::rolling_mean_std_simd(black_box(data), black_box(20)))
        });
    }

    group.finish();
}

fn benchmark_rsi(c: &mut Criterion) {
    let mut group = c.benchmark_group("RSI");

    for size in [1000, 10000, 100000].iter() {
        let data = generate_closes(*size);

        group.bench_with_input(BenchmarkId::new("wilder", size), &data, |b, data| {
            let rsi = Rsi::new(14);
            b.iter(|| rsi.calculate(black_box(data)))
        });
    }

    group.finish();
}

fn benchmark_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let pipeline = IndicatorPipeline::new(IndicatorSettings::default()).expect("default settings");

    for size in [1000, 10000].iter() {
        let series = generate_series(*size);

        group.bench_with_input(BenchmarkId::new("compute", size), &series, |b, series| {
            b.iter(|| pipeline.compute(black_box(series)))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_rolling, benchmark_rsi, benchmark_pipeline);
criterion_main!(benches);
