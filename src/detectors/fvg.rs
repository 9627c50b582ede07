//! Fair value gaps (three-bar imbalance zones)
//!
//! A bullish gap opens when bar `i` trades entirely above the high of bar
//! `i - 2`; a bearish gap when it trades entirely below the low of `i - 2`.
//! A zone stays active until a later bar's range touches it.

use crate::{Direction, OHLCV};

/// One imbalance zone
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FvgZone {
    /// Index of the bar that completed the gap
    pub created_at: usize,
    pub direction: Direction,
    pub top: f64,
    pub bottom: f64,
}

impl FvgZone {
    #[inline]
    pub fn width(&self) -> f64 {
        self.top - self.bottom
    }

    /// True when a bar spanning `[low, high]` touches the zone (inclusive).
    #[inline]
    pub fn is_filled_by(&self, low: f64, high: f64) -> bool {
        low <= self.top && high >= self.bottom
    }

    /// Price lies within one zone width of either boundary.
    #[inline]
    pub fn is_near(&self, price: f64) -> bool {
        let width = self.width();
        (price - self.bottom).abs() <= width || (price - self.top).abs() <= width
    }
}

/// Unfilled zones at one bar, split by polarity in creation order
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ActiveZones {
    pub bull: Vec<FvgZone>,
    pub bear: Vec<FvgZone>,
}

impl ActiveZones {
    pub fn of(&self, direction: Direction) -> &[FvgZone] {
        match direction {
            Direction::Bullish => &self.bull,
            Direction::Bearish => &self.bear,
        }
    }

    /// Any zone of the given polarity near `price`.
    pub fn has_near(&self, direction: Direction, price: f64) -> bool {
        self.of(direction).iter().any(|z| z.is_near(price))
    }

    pub fn is_empty(&self) -> bool {
        self.bull.is_empty() && self.bear.is_empty()
    }
}

/// Every zone ever created plus the active set as of each bar
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FvgScan {
    pub zones: Vec<FvgZone>,
    /// Index-aligned with the input bars
    pub active_by_index: Vec<ActiveZones>,
}

impl FvgScan {
    /// Active zones as of bar `index`; empty past the end of the series.
    pub fn active_at(&self, index: usize) -> ActiveZones {
        self.active_by_index.get(index).cloned().unwrap_or_default()
    }
}

/// Detect all gaps and build the active-zone timeline.
///
/// At each bar, zones the bar touches are dropped first, then zones
/// completed by this bar are added, then the set is recorded. A zone is
/// therefore never filled by the bar that created it.
pub fn detect_fvg<T: OHLCV>(bars: &[T]) -> FvgScan {
    let mut zones = Vec::new();
    for i in 2..bars.len() {
        let (curr, back) = (&bars[i], &bars[i - 2]);
        if curr.low() > back.high() {
            zones.push(FvgZone {
                created_at: i,
                direction: Direction::Bullish,
                top: curr.low(),
                bottom: back.high(),
            });
        }
        if curr.high() < back.low() {
            zones.push(FvgZone {
                created_at: i,
                direction: Direction::Bearish,
                top: back.low(),
                bottom: curr.high(),
            });
        }
    }

    let mut active: Vec<FvgZone> = Vec::new();
    let mut pending = zones.iter().peekable();
    let mut active_by_index = Vec::with_capacity(bars.len());

    for (i, bar) in bars.iter().enumerate() {
        active.retain(|z| !z.is_filled_by(bar.low(), bar.high()));
        while let Some(z) = pending.next_if(|z| z.created_at == i) {
            active.push(*z);
        }

        let (bull, bear) = active.iter().partition(|z| z.direction.is_bullish());
        active_by_index.push(ActiveZones { bull, bear });
    }

    FvgScan {
        zones,
        active_by_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Candle;

    fn bar(t: i64, h: f64, l: f64) -> Candle {
        Candle::new(t, (h + l) / 2.0, h, l, (h + l) / 2.0)
    }

    #[test]
    fn test_bull_gap_created_and_active() {
        let bars = vec![
            bar(0, 10.0, 9.0),
            bar(1, 12.0, 9.5),
            bar(2, 14.0, 11.0), // low 11 > high[0] 10
            bar(3, 15.0, 12.0), // above the zone
        ];
        let scan = detect_fvg(&bars);
        assert_eq!(scan.zones.len(), 1);
        let z = scan.zones[0];
        assert_eq!(z.direction, Direction::Bullish);
        assert_eq!((z.top, z.bottom, z.created_at), (11.0, 10.0, 2));

        assert!(scan.active_by_index[1].is_empty());
        assert_eq!(scan.active_by_index[2].bull, vec![z]);
        assert_eq!(scan.active_by_index[3].bull, vec![z]);
        assert!(scan.active_by_index[3].bear.is_empty());
    }

    #[test]
    fn test_bear_gap_filled_later() {
        let bars = vec![
            bar(0, 20.0, 18.0),
            bar(1, 18.5, 16.0),
            bar(2, 17.0, 15.0), // high 17 < low[0] 18
            bar(3, 16.5, 14.0), // below the zone
            bar(4, 18.2, 15.0), // reaches back into [17, 18]
            bar(5, 18.0, 16.0),
        ];
        let scan = detect_fvg(&bars);
        assert_eq!(scan.zones.len(), 1);
        let z = scan.zones[0];
        assert_eq!(z.direction, Direction::Bearish);
        assert_eq!((z.top, z.bottom), (18.0, 17.0));

        assert_eq!(scan.active_by_index[2].bear, vec![z]);
        assert_eq!(scan.active_by_index[3].bear, vec![z]);
        assert!(scan.active_by_index[4].bear.is_empty());
        assert!(scan.active_by_index[5].is_empty());
    }

    #[test]
    fn test_fill_is_boundary_inclusive() {
        let z = FvgZone {
            created_at: 0,
            direction: Direction::Bullish,
            top: 11.0,
            bottom: 10.0,
        };
        assert!(z.is_filled_by(11.0, 12.0));
        assert!(z.is_filled_by(9.0, 10.0));
        assert!(!z.is_filled_by(11.01, 12.0));
        assert!(!z.is_filled_by(8.0, 9.99));
    }

    #[test]
    fn test_is_near_uses_zone_width() {
        let z = FvgZone {
            created_at: 0,
            direction: Direction::Bullish,
            top: 12.0,
            bottom: 10.0,
        };
        assert!(z.is_near(11.0));
        assert!(z.is_near(8.0));
        assert!(z.is_near(14.0));
        assert!(!z.is_near(14.5));
        assert!(!z.is_near(7.5));
    }

    #[test]
    fn test_has_near_checks_polarity() {
        let z = FvgZone {
            created_at: 0,
            direction: Direction::Bearish,
            top: 12.0,
            bottom: 10.0,
        };
        let active = ActiveZones {
            bull: vec![],
            bear: vec![z],
        };
        assert!(active.has_near(Direction::Bearish, 11.0));
        assert!(!active.has_near(Direction::Bullish, 11.0));
    }

    #[test]
    fn test_active_at_past_end_is_empty() {
        let scan = detect_fvg::<Candle>(&[]);
        assert!(scan.zones.is_empty());
        assert!(scan.active_at(3).is_empty());
    }
}
