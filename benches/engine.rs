//! Benchmarks for 2-1-2 detection, backtesting and trade planning.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use strat212::prelude::*;

/// Generate realistic random bars
fn generate_bars(n: usize) -> Vec<Candle> {
  let mut bars = Vec::with_capacity(n);
  let mut price = 100.0;

  for i in 0..n {
    let change = ((i * 7 + 13) % 100) as f64 / 50.0 - 1.0; // Deterministic "random"
    let volatility = 2.0 + ((i * 3) % 10) as f64 / 5.0;

    let o = price;
    let c = price + change;
    let h = o.max(c) + volatility * 0.5;
    let l = o.min(c) - volatility * 0.5;

    bars.push(Candle::new(i as i64 * 60_000, o, h, l, c));
    price = c;
  }

  bars
}

fn bench_detect_212(c: &mut Criterion) {
  let bars = generate_bars(1000);

  c.bench_function("detect_212_1000_bars", |b| {
    b.iter(|| {
      let _ = black_box(detect_212(black_box(&bars)));
    })
  });
}

fn bench_detect_fvg(c: &mut Criterion) {
  let bars = generate_bars(1000);

  c.bench_function("detect_fvg_1000_bars", |b| {
    b.iter(|| {
      let _ = black_box(detect_fvg(black_box(&bars)));
    })
  });
}

fn bench_backtest_scaling(c: &mut Criterion) {
  let config = BacktestConfig { require_fvg: true, ..BacktestConfig::default() };

  let mut group = c.benchmark_group("backtest_scaling");

  for size in [100, 500, 1000, 5000, 10000].iter() {
    let bars = generate_bars(*size);

    group.bench_with_input(BenchmarkId::new("backtest", size), size, |b, _| {
      b.iter(|| {
        let _ = black_box(backtest(black_box(&bars), black_box(&config)));
      })
    });
  }

  group.finish();
}

fn bench_parallel_backtest(c: &mut Criterion) {
  let bars1 = generate_bars(1000);
  let bars2 = generate_bars(1000);
  let bars3 = generate_bars(1000);
  let bars4 = generate_bars(1000);

  let config = BacktestConfig::default();

  let instruments: Vec<(&str, &[Candle])> =
    vec![("SYM1", &bars1), ("SYM2", &bars2), ("SYM3", &bars3), ("SYM4", &bars4)];

  c.bench_function("parallel_backtest_4_instruments", |b| {
    b.iter(|| {
      let _ = black_box(backtest_parallel(black_box(instruments.clone()), black_box(&config)));
    })
  });
}

fn bench_scout(c: &mut Criterion) {
  let bars = generate_bars(500);
  let config = RecommendConfig::new(10_000.0, 0.5);

  c.bench_function("scout_500_bars", |b| {
    b.iter(|| {
      let _ = black_box(scout(black_box(&bars), black_box(&config)));
    })
  });
}

criterion_group!(
  benches,
  bench_detect_212,
  bench_detect_fvg,
  bench_backtest_scaling,
  bench_parallel_backtest,
  bench_scout,
);

criterion_main!(benches);
