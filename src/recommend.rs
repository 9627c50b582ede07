//! Live 2-1-2 trade planning
//!
//! Looks only at the last completed bar for a fresh 2-1-2, applies the same
//! gates as the backtest at the latest bar and, when the signal survives,
//! sizes an entry/stop/targets plan to a fixed share of the account. Unlike
//! the backtest, sizing here is risk based.

use crate::{
    backtest::{ema_allows, Side},
    detectors::{arming_212, detect_fvg, latest_212, ActiveZones, Arming, Signal},
    floor_lot,
    indicators::ema_of_closes,
    params::RecommendConfig,
    round_to, validate_candles, Direction, Result, OHLCV,
};

/// R-multiples of the three profit targets
pub const RISK_MULTIPLES: [u8; 3] = [1, 2, 3];

/// Entry, stop and targets for a live signal
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradePlan {
    pub side: Side,
    pub signal: Signal,
    /// Last close
    pub price: f64,
    pub ema: Option<f64>,
    /// Breakout buffer beyond the trigger level
    pub step: f64,
    pub entry: f64,
    pub stop: f64,
    /// Entry to stop distance, never below `step`
    pub risk: f64,
    /// Currency risked
    pub risk_amount: f64,
    pub size: f64,
    pub targets: [f64; 3],
    pub risk_multiples: [u8; 3],
}

impl TradePlan {
    fn new(signal: Signal, price: f64, ema: Option<f64>, step: f64, risk_amount: f64) -> Self {
        let (side, entry, stop, risk) = match signal.direction {
            Direction::Bullish => {
                let entry = signal.inside_high + step;
                let stop = signal.inside_low.min(entry - step) - step;
                (Side::Buy, entry, stop, (entry - stop).max(step))
            },
            Direction::Bearish => {
                let entry = signal.inside_low - step;
                let stop = signal.inside_high.max(entry + step) + step;
                (Side::Short, entry, stop, (stop - entry).max(step))
            },
        };
        let sign = if signal.direction.is_bullish() { 1.0 } else { -1.0 };
        let targets = RISK_MULTIPLES.map(|r| entry + sign * f64::from(r) * risk);

        Self {
            side,
            signal,
            price,
            ema,
            step,
            entry,
            stop,
            risk,
            risk_amount,
            size: floor_lot(risk_amount / risk),
            targets,
            risk_multiples: RISK_MULTIPLES,
        }
    }
}

/// Outcome of a recommendation request
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Plan {
    /// Fewer bars than `min_bars`
    Insufficient,
    /// No 2-1-2 completed on the last closed bar
    NoSignal { price: f64, ema: Option<f64> },
    /// A signal exists but the EMA, FVG or shorts setting rejected it
    Filtered {
        price: f64,
        ema: Option<f64>,
        signal: Signal,
    },
    Long(TradePlan),
    Short(TradePlan),
}

impl Plan {
    pub fn status(&self) -> &'static str {
        match self {
            Plan::Insufficient => "insufficient",
            Plan::NoSignal { .. } => "no-signal",
            Plan::Filtered { .. } => "filtered",
            Plan::Long(_) => "long",
            Plan::Short(_) => "short",
        }
    }

    pub fn trade_plan(&self) -> Option<&TradePlan> {
        match self {
            Plan::Long(p) | Plan::Short(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.trade_plan().is_some()
    }
}

/// Plan and arming forecast from one poll
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Scout {
    pub plan: Plan,
    pub arming: Option<Arming>,
}

/// Default breakout buffer: 5 bps of price, at least one cent.
#[inline]
pub fn default_step(price: f64) -> f64 {
    round_to(price * 0.0005, 2).max(0.01)
}

/// Build the live plan for the 2-1-2 ending at the last completed bar.
///
/// Gates use the last bar's close, EMA and active zones. The EMA gate fails
/// closed when no EMA value exists.
pub fn recommend<T: OHLCV>(bars: &[T], config: &RecommendConfig) -> Result<Plan> {
    config.validate()?;
    if config.validate_data {
        validate_candles(bars)?;
    }
    if bars.len() < config.min_bars {
        return Ok(Plan::Insufficient);
    }

    let last = bars.len() - 1;
    let price = bars[last].close();
    let ema = ema_of_closes(bars, config.ema_period)[last];

    let Some(signal) = latest_212(bars) else {
        return Ok(Plan::NoSignal { price, ema });
    };

    let active = detect_fvg(bars).active_at(last);
    Ok(evaluate(signal, price, ema, &active, config))
}

/// [`recommend`] and [`arming_212`] over the same bars.
pub fn scout<T: OHLCV>(bars: &[T], config: &RecommendConfig) -> Result<Scout> {
    Ok(Scout {
        plan: recommend(bars, config)?,
        arming: arming_212(bars),
    })
}

fn evaluate(
    signal: Signal,
    price: f64,
    ema: Option<f64>,
    active: &ActiveZones,
    config: &RecommendConfig,
) -> Plan {
    let direction = signal.direction;
    let side_ok = direction.is_bullish() || config.allow_shorts;
    let ema_ok = ema_allows(direction, price, ema, config.ema_filter);
    let fvg_ok = !config.require_fvg || active.has_near(direction, price);

    if !(side_ok && ema_ok && fvg_ok) {
        log::trace!(
            "{} at bar {} filtered (side {}, ema {}, fvg {})",
            signal.code(),
            signal.index,
            side_ok,
            ema_ok,
            fvg_ok
        );
        return Plan::Filtered { price, ema, signal };
    }

    let step = config.tick.unwrap_or_else(|| default_step(price));
    let plan = TradePlan::new(signal, price, ema, step, config.risk_amount());
    match direction {
        Direction::Bullish => Plan::Long(plan),
        Direction::Bearish => Plan::Short(plan),
    }
}
