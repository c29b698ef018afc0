//! Criterion benchmarks for the per-symbol hot path.
//!
//! Benchmarks:
//! 1. EMA over a full history (50 and 200 periods)
//! 2. Classifier over a precomputed EMA pair
//! 3. Full per-symbol pipeline (two EMAs + classify)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use emascan_core::domain::{PricePoint, PriceSeries};
use emascan_core::{classify, compute_ema, CrossoverParams};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_series(n: usize) -> PriceSeries {
    let base_date = chrono::NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    let points = (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.05).sin() * 10.0;
            PricePoint::new(base_date + chrono::Duration::days(i as i64), close)
        })
        .collect();
    PriceSeries::new("BENCH", points).unwrap()
}

// ── 1. EMA ───────────────────────────────────────────────────────────

fn bench_ema(c: &mut Criterion) {
    let mut group = c.benchmark_group("ema");
    for n in [250, 1000, 5000] {
        let series = make_series(n);
        for period in [50, 200] {
            group.bench_with_input(
                BenchmarkId::new(format!("period_{period}"), n),
                &series,
                |b, s| b.iter(|| compute_ema(black_box(s), period).unwrap()),
            );
        }
    }
    group.finish();
}

// ── 2. Classifier ────────────────────────────────────────────────────

fn bench_classify(c: &mut Criterion) {
    let series = make_series(400);
    let short = compute_ema(&series, 50).unwrap();
    let long = compute_ema(&series, 200).unwrap();
    let params = CrossoverParams::default();

    c.bench_function("classify_400", |b| {
        b.iter(|| classify(black_box(&short), black_box(&long), &params))
    });
}

// ── 3. Per-symbol pipeline ───────────────────────────────────────────

fn bench_pipeline(c: &mut Criterion) {
    let series = make_series(400);
    let params = CrossoverParams::default();

    c.bench_function("symbol_pipeline_400", |b| {
        b.iter(|| {
            let s = black_box(&series);
            let short = compute_ema(s, 50).unwrap();
            let long = compute_ema(s, 200).unwrap();
            classify(&short, &long, &params)
        })
    });
}

criterion_group!(benches, bench_ema, bench_classify, bench_pipeline);
criterion_main!(benches);
