//! Engine options and their metadata
//!
//! Both configs deserialize from the plain camelCase option records UI
//! callers pass around (`emaFilter`, `initCash`, `riskPct`, ...), filling in
//! defaults for anything missing. [`ParameterizedConfig`] additionally
//! describes every option so a caller can render controls for them and
//! build a config from a flat numeric map.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use strat212::params::{BacktestConfig, ParameterizedConfig};
//!
//! for param in BacktestConfig::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let mut params = HashMap::new();
//! params.insert("allow_shorts", 0.0);
//! let config = BacktestConfig::with_params(&params).unwrap();
//! assert!(!config.allow_shorts);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Period, Result, StratError};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// On/off switch; any non-zero value is on
    Flag,
    /// Currency amount or price
    Amount,
    /// Percentage, 1.0 = 1%
    Percent,
    /// Bar count (positive integer)
    Period,
}

/// Metadata for a single option
#[derive(Debug, Clone)]
pub struct ParamMeta {
    /// Parameter name (e.g., "init_cash")
    pub name: &'static str,
    pub param_type: ParamType,
    pub default: f64,
    /// Accepted range, inclusive: (min, max)
    pub range: (f64, f64),
    /// Human-readable description
    pub description: &'static str,
}

impl ParamMeta {
    pub const fn flag(name: &'static str, default: bool, description: &'static str) -> Self {
        Self {
            name,
            param_type: ParamType::Flag,
            default: if default { 1.0 } else { 0.0 },
            range: (f64::MIN, f64::MAX),
            description,
        }
    }

    pub const fn amount(
        name: &'static str,
        default: f64,
        range: (f64, f64),
        description: &'static str,
    ) -> Self {
        Self { name, param_type: ParamType::Amount, default, range, description }
    }

    pub const fn percent(
        name: &'static str,
        default: f64,
        range: (f64, f64),
        description: &'static str,
    ) -> Self {
        Self { name, param_type: ParamType::Percent, default, range, description }
    }

    pub const fn period(
        name: &'static str,
        default: f64,
        range: (f64, f64),
        description: &'static str,
    ) -> Self {
        Self { name, param_type: ParamType::Period, default, range, description }
    }

    /// Validate a value for this parameter
    pub fn validate(&self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(StratError::InvalidValue("Parameter must be finite"));
        }
        let (min, max) = self.range;
        if value < min || value > max {
            return Err(StratError::OutOfRange { field: self.name, value, min, max });
        }
        if self.param_type == ParamType::Period && value.fract() != 0.0 {
            return Err(StratError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
    }

    /// Value from `params` or the default, validated
    fn resolve(&self, params: &HashMap<&str, f64>) -> Result<f64> {
        let value = params.get(self.name).copied().unwrap_or(self.default);
        self.validate(value)?;
        Ok(value)
    }

    fn flag_from(&self, params: &HashMap<&str, f64>) -> Result<bool> {
        Ok(self.resolve(params)? != 0.0)
    }

    fn period_from(&self, params: &HashMap<&str, f64>) -> Result<Period> {
        Period::new(self.resolve(params)? as usize)
    }
}

// ============================================================
// PARAMETERIZED CONFIG TRAIT
// ============================================================

/// Options that can be listed and built from a flat numeric map
pub trait ParameterizedConfig: Sized {
    /// Metadata for every option
    fn param_meta() -> &'static [ParamMeta];

    /// Build from `params`; missing keys take their defaults.
    fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;
}

// ============================================================
// SHARED OPTIONS
// ============================================================

const EMA_FILTER: ParamMeta = ParamMeta::flag(
    "ema_filter",
    true,
    "Longs need close >= EMA, shorts close <= EMA; a missing EMA blocks the trade",
);
const ALLOW_SHORTS: ParamMeta =
    ParamMeta::flag("allow_shorts", true, "Act on bearish 2-1-2 signals");
const REQUIRE_FVG: ParamMeta = ParamMeta::flag(
    "require_fvg",
    false,
    "Require an active fair value gap of matching polarity near the price",
);
const EMA_PERIOD: ParamMeta =
    ParamMeta::period("ema_period", 8.0, (1.0, 500.0), "Trend filter EMA period");
const VALIDATE_DATA: ParamMeta = ParamMeta::flag(
    "validate_data",
    false,
    "Reject non-finite prices, high < low and unsorted timestamps",
);

// ============================================================
// BACKTEST CONFIG
// ============================================================

const INIT_CASH: ParamMeta =
    ParamMeta::amount("init_cash", 10_000.0, (0.01, 1e12), "Starting cash balance");

static BACKTEST_PARAMS: [ParamMeta; 6] =
    [EMA_FILTER, ALLOW_SHORTS, REQUIRE_FVG, INIT_CASH, EMA_PERIOD, VALIDATE_DATA];

/// Backtest options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BacktestConfig {
    pub ema_filter: bool,
    pub allow_shorts: bool,
    #[serde(rename = "requireFVG", alias = "requireFvg")]
    pub require_fvg: bool,
    pub init_cash: f64,
    pub ema_period: Period,
    pub validate_data: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            ema_filter: true,
            allow_shorts: true,
            require_fvg: false,
            init_cash: 10_000.0,
            ema_period: Period::new_const(8),
            validate_data: false,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<()> {
        INIT_CASH.validate(self.init_cash)?;
        EMA_PERIOD.validate(self.ema_period.get() as f64)
    }
}

impl ParameterizedConfig for BacktestConfig {
    fn param_meta() -> &'static [ParamMeta] {
        &BACKTEST_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            ema_filter: EMA_FILTER.flag_from(params)?,
            allow_shorts: ALLOW_SHORTS.flag_from(params)?,
            require_fvg: REQUIRE_FVG.flag_from(params)?,
            init_cash: INIT_CASH.resolve(params)?,
            ema_period: EMA_PERIOD.period_from(params)?,
            validate_data: VALIDATE_DATA.flag_from(params)?,
        })
    }
}

// ============================================================
// RECOMMEND CONFIG
// ============================================================

const ACCOUNT: ParamMeta =
    ParamMeta::amount("account", 10_000.0, (0.0, 1e12), "Account equity used for sizing");
const RISK_PCT: ParamMeta =
    ParamMeta::percent("risk_pct", 0.5, (0.01, 100.0), "Share of the account risked per trade");
const TICK: ParamMeta = ParamMeta::amount(
    "tick",
    0.0,
    (0.0, 1e6),
    "Breakout buffer; 0 selects 5 bps of price with a 0.01 minimum",
);
const MIN_BARS: ParamMeta = ParamMeta::period(
    "min_bars",
    20.0,
    (4.0, 100_000.0),
    "Bars required before a plan is produced",
);

static RECOMMEND_PARAMS: [ParamMeta; 9] = [
    ACCOUNT,
    RISK_PCT,
    EMA_FILTER,
    ALLOW_SHORTS,
    REQUIRE_FVG,
    TICK,
    EMA_PERIOD,
    MIN_BARS,
    VALIDATE_DATA,
];

/// Live recommendation options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecommendConfig {
    pub account: f64,
    pub risk_pct: f64,
    pub ema_filter: bool,
    pub allow_shorts: bool,
    #[serde(rename = "requireFVG", alias = "requireFvg")]
    pub require_fvg: bool,
    /// Breakout buffer; `None` derives it from the last price
    pub tick: Option<f64>,
    pub ema_period: Period,
    pub min_bars: usize,
    pub validate_data: bool,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            account: 10_000.0,
            risk_pct: 0.5,
            ema_filter: true,
            allow_shorts: true,
            require_fvg: false,
            tick: None,
            ema_period: Period::new_const(8),
            min_bars: 20,
            validate_data: false,
        }
    }
}

impl RecommendConfig {
    pub fn new(account: f64, risk_pct: f64) -> Self {
        Self {
            account,
            risk_pct,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        ACCOUNT.validate(self.account)?;
        RISK_PCT.validate(self.risk_pct)?;
        if let Some(tick) = self.tick {
            TICK.validate(tick)?;
            if tick <= 0.0 {
                return Err(StratError::InvalidValue("tick must be > 0"));
            }
        }
        EMA_PERIOD.validate(self.ema_period.get() as f64)?;
        MIN_BARS.validate(self.min_bars as f64)
    }

    /// Currency amount risked per trade
    #[inline]
    pub fn risk_amount(&self) -> f64 {
        self.account * self.risk_pct / 100.0
    }
}

impl ParameterizedConfig for RecommendConfig {
    fn param_meta() -> &'static [ParamMeta] {
        &RECOMMEND_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let tick = TICK.resolve(params)?;
        Ok(Self {
            account: ACCOUNT.resolve(params)?,
            risk_pct: RISK_PCT.resolve(params)?,
            ema_filter: EMA_FILTER.flag_from(params)?,
            allow_shorts: ALLOW_SHORTS.flag_from(params)?,
            require_fvg: REQUIRE_FVG.flag_from(params)?,
            tick: (tick > 0.0).then_some(tick),
            ema_period: EMA_PERIOD.period_from(params)?,
            min_bars: MIN_BARS.resolve(params)? as usize,
            validate_data: VALIDATE_DATA.flag_from(params)?,
        })
    }
}

// ============================================================
// TESTS
// ============================================================
