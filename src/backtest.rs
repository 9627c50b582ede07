//! Single-asset 2-1-2 backtest
//!
//! Replays every bar through the 2-1-2 detector, the EMA trend gate and the
//! optional fair value gap gate. Position sizing is all-in: each entry uses
//! the whole cash balance at the signal bar's close, floored to 0.001 lots.
//! An opposite signal closes the open side and reopens the other on the same
//! bar at the same price.

use crate::{
    detectors::{detect_212, detect_fvg, Detection, FvgScan, Signal},
    floor_lot,
    indicators::ema_of_closes,
    params::BacktestConfig,
    round_to, validate_candles, BarType, Direction, Result, OHLCV,
};

// ============================================================
// TRADES AND LEDGER
// ============================================================

/// Ledger transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Open a long
    Buy,
    /// Close a long
    Sell,
    /// Open a short
    Short,
    /// Close a short
    Cover,
}

impl Side {
    #[inline]
    pub fn is_opening(self) -> bool {
        matches!(self, Side::Buy | Side::Short)
    }
}

/// One fill in the trade log
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Trade {
    pub time: i64,
    pub side: Side,
    /// Unsigned quantity
    pub size: f64,
    pub price: f64,
    pub note: String,
}

/// Cash and signed position (positive long, negative short)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ledger {
    pub cash: f64,
    pub position: f64,
}

impl Ledger {
    pub fn new(cash: f64) -> Self {
        Self { cash, position: 0.0 }
    }

    #[inline]
    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.position * price
    }

    #[inline]
    pub fn is_flat(&self) -> bool {
        self.position == 0.0
    }

    /// Close any short, then go long with all cash if flat.
    fn enter_long(&mut self, time: i64, price: f64, trades: &mut Vec<Trade>) {
        if self.position < 0.0 {
            let size = -self.position;
            self.cash -= size * price;
            self.position = 0.0;
            self.record(trades, time, Side::Cover, price, size, "flip long");
        }
        if self.is_flat() {
            let qty = floor_lot(self.cash / price);
            if qty > 0.0 {
                self.position = qty;
                self.cash -= qty * price;
                self.record(trades, time, Side::Buy, price, qty, "212u");
            }
        }
    }

    /// Close any long, then go short sized by all cash if flat.
    fn enter_short(&mut self, time: i64, price: f64, trades: &mut Vec<Trade>) {
        if self.position > 0.0 {
            let size = self.position;
            self.cash += size * price;
            self.position = 0.0;
            self.record(trades, time, Side::Sell, price, size, "flip short");
        }
        if self.is_flat() {
            let qty = floor_lot(self.cash / price);
            if qty > 0.0 {
                self.position = -qty;
                self.cash += qty * price;
                self.record(trades, time, Side::Short, price, qty, "212d");
            }
        }
    }

    fn record(
        &self,
        trades: &mut Vec<Trade>,
        time: i64,
        side: Side,
        price: f64,
        size: f64,
        note: &str,
    ) {
        log::debug!(
            "{:?} {} @ {} ({}): cash {:.2}, position {}",
            side,
            size,
            price,
            note,
            self.cash,
            self.position
        );
        trades.push(Trade {
            time,
            side,
            price,
            size,
            note: note.to_string(),
        });
    }
}

// ============================================================
// REPORT
// ============================================================

/// Mark-to-market equity at one bar's close
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EquityPoint {
    pub t: i64,
    pub equity: f64,
}

/// Intermediate series the simulation was driven by
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Diagnostics {
    pub ema: Vec<Option<f64>>,
    pub types: Vec<BarType>,
    pub signals: Vec<Signal>,
    pub fvg: FvgScan,
}

/// Backtest outcome
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestReport {
    pub trades: Vec<Trade>,
    /// One point per input bar
    pub equity_curve: Vec<EquityPoint>,
    pub final_equity: f64,
    pub pl: f64,
    pub pl_pct: f64,
    pub diagnostics: Diagnostics,
}

// ============================================================
// GATES
// ============================================================

/// EMA trend gate. Fails closed when the EMA is missing.
#[inline]
pub(crate) fn ema_allows(direction: Direction, price: f64, ema: Option<f64>, enabled: bool) -> bool {
    if !enabled {
        return true;
    }
    match (direction, ema) {
        (_, None) => false,
        (Direction::Bullish, Some(e)) => price >= e,
        (Direction::Bearish, Some(e)) => price <= e,
    }
}

// ============================================================
// SIMULATION
// ============================================================

/// Run the 2-1-2 strategy over `bars`.
///
/// Errors only on an invalid `config`, or on bad data when
/// `config.validate_data` is set.
pub fn backtest<T: OHLCV>(bars: &[T], config: &BacktestConfig) -> Result<BacktestReport> {
    config.validate()?;
    if config.validate_data {
        validate_candles(bars)?;
    }

    let ema = ema_of_closes(bars, config.ema_period);
    let Detection { types, signals } = detect_212(bars);
    let fvg = detect_fvg(bars);

    let mut by_index: Vec<Option<Signal>> = vec![None; bars.len()];
    for s in &signals {
        by_index[s.index] = Some(*s);
    }

    let mut ledger = Ledger::new(config.init_cash);
    let mut trades = Vec::new();
    let mut equity_curve = Vec::with_capacity(bars.len());
    let mut last_price = bars.first().map_or(0.0, |b| b.close());

    for (i, bar) in bars.iter().enumerate() {
        let price = bar.close();
        last_price = price;
        equity_curve.push(EquityPoint {
            t: bar.timestamp(),
            equity: round_to(ledger.equity(price), 2),
        });

        let Some(signal) = by_index[i] else {
            continue;
        };

        let direction = signal.direction;
        let fvg_ok =
            !config.require_fvg || fvg.active_by_index[i].has_near(direction, price);
        if !ema_allows(direction, price, ema[i], config.ema_filter) || !fvg_ok {
            log::trace!("{} at bar {} gated out", signal.code(), i);
            continue;
        }

        match direction {
            Direction::Bullish => ledger.enter_long(bar.timestamp(), price, &mut trades),
            Direction::Bearish if config.allow_shorts => {
                ledger.enter_short(bar.timestamp(), price, &mut trades)
            },
            Direction::Bearish => {},
        }
    }

    let final_equity = ledger.equity(last_price);
    let pl = round_to(final_equity - config.init_cash, 2);
    let pl_pct = round_to((final_equity / config.init_cash - 1.0) * 100.0, 2);

    log::debug!(
        "backtest over {} bars: {} signals, {} trades, final equity {:.2}",
        bars.len(),
        signals.len(),
        trades.len(),
        final_equity
    );

    Ok(BacktestReport {
        trades,
        equity_curve,
        final_equity: round_to(final_equity, 2),
        pl,
        pl_pct,
        diagnostics: Diagnostics {
            ema,
            types,
            signals,
            fvg,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Candle;

    fn bar(t: i64, h: f64, l: f64, c: f64) -> Candle {
        Candle::new(t, c, h, l, c)
    }

    fn no_filters() -> BacktestConfig {
        BacktestConfig {
            ema_filter: false,
            ..BacktestConfig::default()
        }
    }

    /// 2u, 1, 2u closing at 10 on bar 3
    fn long_setup() -> Vec<Candle> {
        vec![
            bar(0, 10.0, 5.0, 8.0),
            bar(1, 11.0, 6.0, 9.0),
            bar(2, 10.5, 6.5, 9.0),
            bar(3, 12.0, 7.0, 10.0),
        ]
    }

    #[test]
    fn test_ema_gate_fails_closed() {
        assert!(!ema_allows(Direction::Bullish, 10.0, None, true));
        assert!(!ema_allows(Direction::Bearish, 10.0, None, true));
        assert!(ema_allows(Direction::Bullish, 10.0, None, false));
        assert!(ema_allows(Direction::Bullish, 10.0, Some(10.0), true));
        assert!(!ema_allows(Direction::Bullish, 9.9, Some(10.0), true));
        assert!(ema_allows(Direction::Bearish, 9.9, Some(10.0), true));
        assert!(!ema_allows(Direction::Bearish, 10.1, Some(10.0), true));
    }

    #[test]
    fn test_all_in_long() {
        let report = backtest(&long_setup(), &no_filters()).unwrap();
        assert_eq!(report.trades.len(), 1);
        let t = &report.trades[0];
        assert_eq!(t.side, Side::Buy);
        assert_eq!(t.price, 10.0);
        assert_eq!(t.size, 1000.0);
        assert_eq!(t.note, "212u");
        assert_eq!(t.time, 3);

        assert_eq!(report.equity_curve.len(), 4);
        assert_eq!(report.final_equity, 10_000.0);
        assert_eq!(report.pl, 0.0);
    }

    #[test]
    fn test_equity_marked_before_trading() {
        let mut bars = long_setup();
        bars.push(bar(4, 13.0, 10.0, 12.0));
        let report = backtest(&bars, &no_filters()).unwrap();
        // bar 3 marks before the buy, bar 4 marks the long at 12
        assert_eq!(report.equity_curve[3].equity, 10_000.0);
        assert_eq!(report.equity_curve[4].equity, 12_000.0);
        assert_eq!(report.final_equity, 12_000.0);
        assert_eq!(report.pl, 2_000.0);
        assert_eq!(report.pl_pct, 20.0);
    }

    #[test]
    fn test_flip_long_to_short() {
        let mut bars = long_setup();
        bars.extend([
            bar(4, 11.5, 8.0, 11.0),  // 1
            bar(5, 11.0, 7.0, 8.0),   // 2d -> 2-1-2 down
        ]);
        let report = backtest(&bars, &no_filters()).unwrap();
        let sides: Vec<Side> = report.trades.iter().map(|t| t.side).collect();
        assert_eq!(sides, vec![Side::Buy, Side::Sell, Side::Short]);

        let sell = &report.trades[1];
        assert_eq!((sell.price, sell.size, sell.note.as_str()), (8.0, 1000.0, "flip short"));
        let short = &report.trades[2];
        assert_eq!(short.time, sell.time);
        assert_eq!(short.price, 8.0);
        assert_eq!(short.size, 1000.0);
        assert_eq!(short.note, "212d");
        // 8000 cash + 8000 short proceeds - 1000 * 8
        assert_eq!(report.final_equity, 8_000.0);
    }

    #[test]
    fn test_flip_short_to_long_at_flat_price() {
        // every close is 6: covering and re-entering must not create equity
        let bars = vec![
            bar(0, 10.0, 5.0, 6.0),
            bar(1, 9.0, 4.0, 6.0),  // 2d
            bar(2, 8.5, 4.5, 6.0),  // 1
            bar(3, 8.0, 4.0, 6.0),  // 2d -> short
            bar(4, 7.5, 4.2, 6.0),  // 1
            bar(5, 8.5, 4.5, 6.0),  // 2u -> cover and buy
        ];
        let report = backtest(&bars, &no_filters()).unwrap();
        let sides: Vec<Side> = report.trades.iter().map(|t| t.side).collect();
        assert_eq!(sides, vec![Side::Short, Side::Cover, Side::Buy]);

        let cover = &report.trades[1];
        assert_eq!((cover.size, cover.note.as_str()), (1666.666, "flip long"));
        assert_eq!(report.trades[2].size, 1666.666);

        assert!(report.equity_curve.iter().all(|p| p.equity == 10_000.0));
        assert_eq!(report.final_equity, 10_000.0);
        assert_eq!(report.pl, 0.0);
    }

    #[test]
    fn test_shorts_disabled_keeps_long_open() {
        let mut bars = long_setup();
        bars.extend([bar(4, 11.5, 8.0, 11.0), bar(5, 11.0, 7.0, 8.0)]);
        let config = BacktestConfig {
            allow_shorts: false,
            ..no_filters()
        };
        let report = backtest(&bars, &config).unwrap();
        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.trades[0].side, Side::Buy);
    }

    #[test]
    fn test_ema_filter_blocks_signal_below_average() {
        // bar 3 closes below its EMA
        let bars = vec![
            bar(0, 10.0, 5.0, 9.0),
            bar(1, 11.0, 6.0, 10.5),
            bar(2, 10.5, 6.5, 10.0),
            bar(3, 12.0, 7.0, 7.5),
        ];
        let report = backtest(&bars, &BacktestConfig::default()).unwrap();
        assert_eq!(report.diagnostics.signals.len(), 1);
        assert!(report.trades.is_empty());
        assert_eq!(report.final_equity, 10_000.0);
    }

    #[test]
    fn test_require_fvg_without_zones_blocks() {
        let config = BacktestConfig {
            require_fvg: true,
            ..no_filters()
        };
        let report = backtest(&long_setup(), &config).unwrap();
        assert!(report.diagnostics.fvg.zones.is_empty());
        assert!(report.trades.is_empty());
    }

    #[test]
    fn test_empty_series() {
        let report = backtest::<Candle>(&[], &BacktestConfig::default()).unwrap();
        assert!(report.trades.is_empty());
        assert!(report.equity_curve.is_empty());
        assert_eq!(report.final_equity, 10_000.0);
        assert_eq!(report.pl, 0.0);
        assert_eq!(report.pl_pct, 0.0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = BacktestConfig {
            init_cash: -5.0,
            ..BacktestConfig::default()
        };
        assert!(backtest(&long_setup(), &config).is_err());
    }

    #[test]
    fn test_side_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Side::Cover).unwrap(), "\"COVER\"");
        assert!(Side::Short.is_opening());
        assert!(!Side::Sell.is_opening());
    }
}
