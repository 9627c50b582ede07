//! 2-1-2 breakout detection
//!
//! A 2-1-2 is a directional bar, then an inside bar, then a directional bar.
//! The trigger levels are the inside bar's high and low. The first bar may
//! point either way; only the third bar decides the signal direction.

use crate::{BarType, Direction, OHLCV};

/// Classify `curr` against `prev` using strict breaks of the prior extremes.
#[inline]
pub fn classify<T: OHLCV + ?Sized>(curr: &T, prev: &T) -> BarType {
    let up = curr.high() > prev.high();
    let down = curr.low() < prev.low();
    match (up, down) {
        (true, true) => BarType::Outside,
        (false, false) => BarType::Inside,
        (true, false) => BarType::Up2,
        (false, true) => BarType::Down2,
    }
}

/// A completed 2-1-2 breakout
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    /// Index of the breakout (third) bar
    pub index: usize,
    pub direction: Direction,
    pub inside_high: f64,
    pub inside_low: f64,
}

impl Signal {
    /// "212u" or "212d"
    pub fn code(&self) -> &'static str {
        match self.direction {
            Direction::Bullish => "212u",
            Direction::Bearish => "212d",
        }
    }

    /// Match the triple of types ending at `index`.
    fn from_types<T: OHLCV>(bars: &[T], index: usize, types: [BarType; 3]) -> Option<Self> {
        let [a, b, c] = types;
        if !a.is_directional() || b != BarType::Inside {
            return None;
        }
        let direction = c.direction()?;
        let inside = &bars[index - 1];
        Some(Self {
            index,
            direction,
            inside_high: inside.high(),
            inside_low: inside.low(),
        })
    }
}

/// Per-bar types and every 2-1-2 found in a series
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Detection {
    pub types: Vec<BarType>,
    pub signals: Vec<Signal>,
}

impl Detection {
    /// Signal lookup by breakout bar index.
    pub fn signal_at(&self, index: usize) -> Option<&Signal> {
        self.signals
            .binary_search_by_key(&index, |s| s.index)
            .ok()
            .map(|pos| &self.signals[pos])
    }
}

/// Classify every bar and collect all 2-1-2 breakouts in index order.
///
/// Bar 0 has no predecessor and is `Inside`.
pub fn detect_212<T: OHLCV>(bars: &[T]) -> Detection {
    let mut types = vec![BarType::Inside; bars.len()];
    for i in 1..bars.len() {
        types[i] = classify(&bars[i], &bars[i - 1]);
    }

    let signals = (2..bars.len())
        .filter_map(|i| Signal::from_types(bars, i, [types[i - 2], types[i - 1], types[i]]))
        .collect();

    Detection { types, signals }
}

/// The 2-1-2 ending at the last completed bar (`len - 2`), if any.
///
/// The final bar is treated as still forming and never considered.
pub fn latest_212<T: OHLCV>(bars: &[T]) -> Option<Signal> {
    if bars.len() < 4 {
        return None;
    }
    let i = bars.len() - 2;
    let types = [
        classify(&bars[i - 2], &bars[i - 3]),
        classify(&bars[i - 1], &bars[i - 2]),
        classify(&bars[i], &bars[i - 1]),
    ];
    Signal::from_types(bars, i, types)
}

/// A directional bar followed by an inside bar, waiting for its breakout
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Arming {
    /// Index of the bar that would complete the pattern (the forming bar)
    pub index: usize,
    /// Direction of the first directional bar
    pub expected: Direction,
    /// Inside bar high to watch for an upside break
    pub trigger_up: f64,
    /// Inside bar low to watch for a downside break
    pub trigger_down: f64,
}

/// Forecast the trigger levels for the forming bar.
///
/// Looks at the two bars before the last one: the older must be a "2"
/// (against its own predecessor, or `Inside` when it has none) and the newer
/// an inside bar.
pub fn arming_212<T: OHLCV>(bars: &[T]) -> Option<Arming> {
    if bars.len() < 3 {
        return None;
    }
    let i = bars.len() - 1;
    let prev2 = &bars[i - 2];
    let prev1 = &bars[i - 1];

    let first = match i.checked_sub(3) {
        Some(j) => classify(prev2, &bars[j]),
        None => BarType::Inside,
    };
    if classify(prev1, prev2) != BarType::Inside {
        return None;
    }

    first.direction().map(|expected| Arming {
        index: i,
        expected,
        trigger_up: prev1.high(),
        trigger_down: prev1.low(),
    })
}
