//! Moving-average style indicators
//!
//! Outputs are index-aligned with their input. `None` marks a slot with no
//! value, and callers decide per use whether a missing value passes or fails
//! a filter.

use crate::{OHLCVExt, Period, OHLCV};

/// Running exponential moving average, `k = 2 / (period + 1)`.
///
/// Seeded from the first present value with no warm-up window, so every slot
/// from the seed onward carries a value. A `None` input leaves its output
/// slot empty and does not advance the average.
pub fn ema(values: &[Option<f64>], period: Period) -> Vec<Option<f64>> {
    let k = 2.0 / (period.get() as f64 + 1.0);
    let mut out = vec![None; values.len()];
    let mut prev: Option<f64> = None;

    for (slot, value) in out.iter_mut().zip(values) {
        let Some(v) = *value else {
            continue;
        };
        let next = match prev {
            None => v,
            Some(p) => v * k + p * (1.0 - k),
        };
        prev = Some(next);
        *slot = Some(next);
    }

    out
}

/// [`ema`] over bar closes.
pub fn ema_of_closes<T: OHLCV>(bars: &[T], period: Period) -> Vec<Option<f64>> {
    let closes: Vec<Option<f64>> = bars.iter().map(|b| Some(b.close())).collect();
    ema(&closes, period)
}

/// Average true range with Wilder smoothing.
///
/// Empty until `period - 1`, where it is seeded with the simple mean of the
/// first `period` true ranges. The first bar measures against its own close.
pub fn atr<T: OHLCV>(bars: &[T], period: Period) -> Vec<Option<f64>> {
    let period = period.get();
    let n = period as f64;
    let mut out = vec![None; bars.len()];
    let mut sum = 0.0;
    let mut prev_atr: Option<f64> = None;

    for (i, bar) in bars.iter().enumerate() {
        let prev_close = if i > 0 { bars[i - 1].close() } else { bar.close() };
        let tr = bar.true_range(prev_close);

        if i < period {
            sum += tr;
            if i == period - 1 {
                prev_atr = Some(sum / n);
            }
        } else if let Some(p) = prev_atr {
            prev_atr = Some((p * (n - 1.0) + tr) / n);
        }

        out[i] = prev_atr;
    }

    out
}
