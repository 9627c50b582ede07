//! Bar pattern detectors
//!
//! # Detectors
//!
//! - **strat**: bar classification ("1", "2u", "2d", "3"), 2-1-2 breakouts,
//!   the latest completed signal and the arming forecast.
//! - **fvg**: three-bar fair value gaps with a per-bar timeline of unfilled
//!   zones.

pub mod fvg;
pub mod strat;

pub use fvg::*;
pub use strat::*;
