//! CSV rendering of backtest output

use serde::Serialize;

use crate::{
    backtest::{EquityPoint, Trade},
    Result, StratError,
};

impl From<csv::Error> for StratError {
    fn from(e: csv::Error) -> Self {
        StratError::Export(e.to_string())
    }
}

/// Trade log as CSV: `time,side,size,price,note`.
pub fn trades_to_csv(trades: &[Trade]) -> Result<String> {
    to_csv(&["time", "side", "size", "price", "note"], trades)
}

/// Equity curve as CSV: `t,equity`.
pub fn equity_to_csv(points: &[EquityPoint]) -> Result<String> {
    to_csv(&["t", "equity"], points)
}

// Header written up front so empty input still yields a header line.
fn to_csv<R: Serialize>(headers: &[&str], rows: &[R]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| StratError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| StratError::Export(e.to_string()))
}
