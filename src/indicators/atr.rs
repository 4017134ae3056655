/// Average True Range (ATR) indicator
///
/// Measures volatility as a smoothed average of the True Range, the greatest
/// of:
/// - Current High - Current Low
/// - Abs(Current High - Previous Close)
/// - Abs(Current Low - Previous Close)
///
/// Smoothing uses the same SMA-seeded EMA recurrence as `ema_series`, so the
/// output aligns with the EMA warm-up rules: defined from index `period - 1`.
use super::{ema_series, IndicatorError};
use crate::models::Candle;

/// Calculate an ATR series aligned to the input sequences.
///
/// All three inputs must have equal length. At index 0 the True Range falls
/// back to `high - low` (no previous close).
pub fn atr_series(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    period: usize,
) -> Result<Vec<Option<f64>>, IndicatorError> {
    if highs.len() != lows.len() || highs.len() != closes.len() {
        return Err(IndicatorError::LengthMismatch {
            highs: highs.len(),
            lows: lows.len(),
            closes: closes.len(),
        });
    }
    if period == 0 {
        return Err(IndicatorError::InvalidPeriod);
    }

    let mut true_ranges = Vec::with_capacity(highs.len());
    for i in 0..highs.len() {
        let tr = if i == 0 {
            highs[0] - lows[0]
        } else {
            let prev_close = closes[i - 1];
            (highs[i] - lows[i])
                .max((highs[i] - prev_close).abs())
                .max((lows[i] - prev_close).abs())
        };
        true_ranges.push(tr);
    }

    ema_series(&true_ranges, period)
}

/// Calculate the ATR series directly from candles
pub fn atr_series_from_candles(
    candles: &[Candle],
    period: usize,
) -> Result<Vec<Option<f64>>, IndicatorError> {
    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    atr_series(&highs, &lows, &closes, period)
}
