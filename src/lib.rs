//! # strat212 - 2-1-2 breakout detection and backtesting
//!
//! Bar classification ("1", "2u", "2d", "3"), 2-1-2 breakout detection, fair
//! value gap tracking, an all-in single-asset backtest and a risk-sized live
//! trade plan. Every function is a pure transform over a borrowed bar slice.
//!
//! ## Quick Start
//!
//! ```rust
//! use strat212::prelude::*;
//!
//! let bars: Vec<Candle> = (0..30i64)
//!     .map(|i| {
//!         let p = 100.0 + i as f64;
//!         Candle::new(i * 60_000, p, p + 1.0, p - 1.0, p + 0.5)
//!     })
//!     .collect();
//!
//! let report = backtest(&bars, &BacktestConfig::default()).unwrap();
//! assert_eq!(report.equity_curve.len(), bars.len());
//!
//! let plan = recommend(&bars, &RecommendConfig::new(10_000.0, 0.5)).unwrap();
//! assert_eq!(plan.status(), "no-signal");
//! ```
//!
//! ## Input contract
//!
//! Bars must be sorted ascending by timestamp without duplicates. The engine
//! does not check this unless `validate_data` is enabled on the config.

pub mod backtest;
pub mod detectors;
pub mod export;
pub mod indicators;
pub mod params;
pub mod recommend;

pub mod prelude {
    pub use crate::{
        // Simulation
        backtest::{backtest, BacktestReport, Diagnostics, EquityPoint, Ledger, Side, Trade},
        // Parallel
        backtest_parallel,
        // Detectors
        detectors::{
            arming_212, classify, detect_212, detect_fvg, latest_212, ActiveZones, Arming,
            Detection, FvgScan, FvgZone, Signal,
        },
        // Export
        export::{equity_to_csv, trades_to_csv},
        // Indicators
        indicators::{atr, ema, ema_of_closes},
        // Parameters
        params::{BacktestConfig, ParamMeta, ParamType, ParameterizedConfig, RecommendConfig},
        // Live
        recommend::{recommend, scout, Plan, Scout, TradePlan},
        // Types
        BacktestFailure,
        BacktestRun,
        BarType,
        Candle,
        Direction,
        OHLCVExt,
        Period,
        Result,
        StratError,
        OHLCV,
        // Validation
        validate_candles,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, StratError>;

/// Errors raised by configuration checks, opt-in data validation and export
#[derive(Debug, Clone, thiserror::Error)]
pub enum StratError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid candle at index {index}: {reason}")]
    InvalidCandle { index: usize, reason: &'static str },

    #[error("Export failed: {0}")]
    Export(String),
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(StratError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core bar data trait
pub trait OHLCV {
    /// Bar open time, milliseconds since the Unix epoch
    fn timestamp(&self) -> i64;
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;

    fn volume(&self) -> Option<f64> {
        None
    }
}

impl<T: OHLCV + ?Sized> OHLCV for &T {
    fn timestamp(&self) -> i64 {
        (**self).timestamp()
    }

    fn open(&self) -> f64 {
        (**self).open()
    }

    fn high(&self) -> f64 {
        (**self).high()
    }

    fn low(&self) -> f64 {
        (**self).low()
    }

    fn close(&self) -> f64 {
        (**self).close()
    }

    fn volume(&self) -> Option<f64> {
        (**self).volume()
    }
}

/// Extension trait with computed properties for bar data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    /// Wilder true range against the previous close
    #[inline]
    fn true_range(&self, prev_close: f64) -> f64 {
        self.range()
            .max((self.high() - prev_close).abs())
            .max((self.low() - prev_close).abs())
    }

    /// Validate bar consistency
    fn validate(&self) -> Result<()> {
        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| p.is_nan()) {
            return Err(StratError::InvalidCandle {
                index: 0,
                reason: "NaN in OHLC",
            });
        }
        if prices.iter().any(|p| p.is_infinite()) {
            return Err(StratError::InvalidCandle {
                index: 0,
                reason: "Infinite value in OHLC",
            });
        }
        if self.high() < self.low() {
            return Err(StratError::InvalidCandle {
                index: 0,
                reason: "high < low",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV + ?Sized> OHLCVExt for T {}

/// Check every bar and the ascending, duplicate-free timestamp order.
pub fn validate_candles<T: OHLCV>(bars: &[T]) -> Result<()> {
    for (i, bar) in bars.iter().enumerate() {
        bar.validate().map_err(|e| match e {
            StratError::InvalidCandle { reason, .. } => StratError::InvalidCandle { index: i, reason },
            other => other,
        })?;
        if i > 0 && bar.timestamp() <= bars[i - 1].timestamp() {
            return Err(StratError::InvalidCandle {
                index: i,
                reason: "timestamp not strictly ascending",
            });
        }
    }
    Ok(())
}

// ============================================================
// CANDLE
// ============================================================

/// One OHLC(V) sample, as delivered by the market data fetch
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Candle {
    /// Milliseconds since the Unix epoch
    pub t: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl Candle {
    pub fn new(t: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            t,
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }
}

impl OHLCV for Candle {
    fn timestamp(&self) -> i64 {
        self.t
    }

    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> Option<f64> {
        self.volume
    }
}

// ============================================================
// BAR CLASSIFICATION TYPES
// ============================================================

/// Bar type relative to the immediately preceding bar
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum BarType {
    /// "1": neither extreme broken
    #[default]
    #[serde(rename = "1")]
    Inside,
    /// "2u": only the high broken
    #[serde(rename = "2u")]
    Up2,
    /// "2d": only the low broken
    #[serde(rename = "2d")]
    Down2,
    /// "3": both extremes broken
    #[serde(rename = "3")]
    Outside,
}

impl BarType {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            BarType::Inside => "1",
            BarType::Up2 => "2u",
            BarType::Down2 => "2d",
            BarType::Outside => "3",
        }
    }

    #[inline]
    pub fn is_directional(self) -> bool {
        matches!(self, BarType::Up2 | BarType::Down2)
    }

    /// Break direction of a "2" bar
    #[inline]
    pub fn direction(self) -> Option<Direction> {
        match self {
            BarType::Up2 => Some(Direction::Bullish),
            BarType::Down2 => Some(Direction::Bearish),
            _ => None,
        }
    }
}

impl std::fmt::Display for BarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polarity of a signal or an imbalance zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }
}

// ============================================================
// NUMERIC HELPERS
// ============================================================

/// Round half away from zero to `dp` decimals.
#[inline]
pub fn round_to(value: f64, dp: i32) -> f64 {
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor
}

/// Floor a quantity to the 0.001 lot granularity used for sizing.
#[inline]
pub fn floor_lot(qty: f64) -> f64 {
    (qty * 1000.0).floor() / 1000.0
}

// ============================================================
// PARALLEL BACKTESTING
// ============================================================

use rayon::prelude::*;

use crate::{
    backtest::{backtest, BacktestReport},
    params::BacktestConfig,
};

/// Backtest of a single instrument
#[derive(Debug)]
pub struct BacktestRun {
    pub symbol: String,
    pub report: BacktestReport,
}

/// Error from backtesting a single instrument
#[derive(Debug)]
pub struct BacktestFailure {
    pub symbol: String,
    pub error: StratError,
}

/// Independent single-asset backtests of several instruments.
///
/// Every instrument starts from `config.init_cash`; nothing is shared
/// between runs. Results keep the input order.
pub fn backtest_parallel<'a, T, I>(
    instruments: I,
    config: &BacktestConfig,
) -> (Vec<BacktestRun>, Vec<BacktestFailure>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            backtest(bars, config)
                .map(|report| BacktestRun {
                    symbol: symbol.to_string(),
                    report,
                })
                .map_err(|error| BacktestFailure {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut failures = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => {
                log::warn!("backtest for {} failed: {}", e.symbol, e.error);
                failures.push(e);
            },
        }
    }

    (successes, failures)
}

// ============================================================
// TESTS
// ============================================================
