// Technical indicators module
// Series-aligned EMA and ATR used by the crossover detector

pub mod atr;
pub mod moving_average;

pub use atr::{atr_series, atr_series_from_candles};
pub use moving_average::ema_series;

use thiserror::Error;

/// Malformed indicator arguments. Fatal to the single call; the caller must
/// not proceed with a partial result.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndicatorError {
    #[error("indicator period must be >= 1")]
    InvalidPeriod,

    #[error("input series lengths differ: highs={highs}, lows={lows}, closes={closes}")]
    LengthMismatch {
        highs: usize,
        lows: usize,
        closes: usize,
    },
}
