use crate::indicators::{atr_series_from_candles, ema_series, IndicatorError};
use crate::models::{Candle, Direction, SignalEvent, SymbolSignalState};

/// Configuration for crossover-pullback detection
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub trend_period: usize,
    pub atr_period: usize,
    pub pullback_atr_multiple: f64,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            fast_period: 5,
            slow_period: 50,
            trend_period: 200,
            atr_period: 14,
            pullback_atr_multiple: 1.0,
        }
    }
}

impl DetectionParams {
    /// Validate once at construction so `detect` never runs with a malformed
    /// configuration.
    pub fn validated(self) -> Result<Self, IndicatorError> {
        if self.fast_period == 0
            || self.slow_period == 0
            || self.trend_period == 0
            || self.atr_period == 0
        {
            return Err(IndicatorError::InvalidPeriod);
        }
        Ok(self)
    }

    /// Minimum series length: current and previous bar with all indicators
    /// defined under the longest warm-up.
    pub fn min_candles(&self) -> usize {
        self.trend_period + 2
    }
}

/// Evaluate the crossover-with-trend-filter-and-pullback rule on the last two
/// closed candles.
///
/// Returns `Ok(None)` for every non-fire outcome (short series, warm-up,
/// failed filter, already-reported direction); `state` is mutated only when a
/// `SignalEvent` is returned.
pub fn detect(
    candles: &[Candle],
    state: &mut SymbolSignalState,
    params: &DetectionParams,
) -> Result<Option<SignalEvent>, IndicatorError> {
    if candles.len() < params.min_candles() {
        return Ok(None);
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let ema_fast = ema_series(&closes, params.fast_period)?;
    let ema_slow = ema_series(&closes, params.slow_period)?;
    let ema_trend = ema_series(&closes, params.trend_period)?;
    let atr = atr_series_from_candles(candles, params.atr_period)?;

    let curr = candles.len() - 1;
    let prev = curr - 1;

    // Every value the rule reads must be past its warm-up
    let (fast_prev, fast_curr, slow_prev, slow_curr, trend_curr, atr_curr) = match (
        ema_fast[prev],
        ema_fast[curr],
        ema_slow[prev],
        ema_slow[curr],
        ema_trend[curr],
        atr[curr],
    ) {
        (Some(fp), Some(fc), Some(sp), Some(sc), Some(tc), Some(ac)) => (fp, fc, sp, sc, tc, ac),
        _ => return Ok(None),
    };

    let close = closes[curr];

    // Two-sample sign-change test between the last two closed bars
    let direction = if fast_prev <= slow_prev && fast_curr > slow_curr {
        Direction::Bullish
    } else if fast_prev >= slow_prev && fast_curr < slow_curr {
        Direction::Bearish
    } else {
        return Ok(None);
    };

    // Trend filter: price on the expected side of the long EMA
    let trend_ok = match direction {
        Direction::Bullish => close > trend_curr,
        Direction::Bearish => close < trend_curr,
    };
    if !trend_ok {
        return Ok(None);
    }

    // Pullback confirmation: price has retraced close to the fast EMA
    if (close - fast_curr).abs() > atr_curr * params.pullback_atr_multiple {
        return Ok(None);
    }

    // Edge trigger: re-arm only after an opposite-direction crossover
    if state.last_direction == Some(direction) {
        return Ok(None);
    }

    let event = SignalEvent {
        symbol: candles[curr].symbol.clone(),
        timestamp: candles[curr].open_time,
        direction,
        price: close,
        ema_fast: fast_curr,
        ema_slow: slow_curr,
        ema_trend: trend_curr,
        atr: atr_curr,
    };

    state.last_direction = Some(direction);
    state.last_fired_at = Some(event.timestamp);

    Ok(Some(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    /// Build a candle series from closes: each bar opens at the previous
    /// close with a half-unit wick on both sides of the move.
    fn series_from_closes(closes: &[f64]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut prev_close = closes[0];
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let candle = Candle {
                    symbol: "BTC/USD".to_string(),
                    open_time: start + Duration::minutes(5 * i as i64),
                    open: prev_close,
                    high: prev_close.max(close) + 0.5,
                    low: prev_close.min(close) - 0.5,
                    close,
                    volume: 1000.0,
                };
                prev_close = close;
                candle
            })
            .collect()
    }

    fn flat_then(extra: &[f64]) -> Vec<Candle> {
        let mut closes = vec![100.0; 260];
        closes.extend_from_slice(extra);
        series_from_closes(&closes)
    }

    #[test]
    fn test_bullish_fire() {
        // Long flat run pins every EMA at 100; the final bar jumps to 101.5,
        // crossing fast over slow with price above the trend EMA and within
        // one ATR of the fast EMA.
        let candles = flat_then(&[101.5]);
        let mut state = SymbolSignalState::default();
        let params = DetectionParams::default();

        let event = detect(&candles, &mut state, &params).unwrap().unwrap();
        assert_eq!(event.direction, Direction::Bullish);
        assert_eq!(event.price, 101.5);
        assert_eq!(event.symbol, "BTC/USD");
        assert!((event.ema_fast - 100.5).abs() < 1e-9);
        assert!(event.ema_slow > 100.0 && event.ema_slow < event.ema_fast);
        assert!(event.ema_trend > 100.0 && event.ema_trend < event.ema_slow);
        assert_eq!(state.last_direction, Some(Direction::Bullish));
        assert_eq!(state.last_fired_at, Some(event.timestamp));
    }

    #[test]
    fn test_bearish_fire() {
        let candles = flat_then(&[98.5]);
        let mut state = SymbolSignalState::default();
        let params = DetectionParams::default();

        let event = detect(&candles, &mut state, &params).unwrap().unwrap();
        assert_eq!(event.direction, Direction::Bearish);
        assert_eq!(state.last_direction, Some(Direction::Bearish));
    }

    #[test]
    fn test_pullback_rejects_breakout() {
        // Same cross, but the bar runs 6 points: |close - ema_fast| = 4.0
        // against an ATR well under 4, so the breakout is discarded.
        let candles = flat_then(&[106.0]);
        let mut state = SymbolSignalState::default();
        let params = DetectionParams::default();

        let verdict = detect(&candles, &mut state, &params).unwrap();
        assert!(verdict.is_none());
        assert_eq!(state, SymbolSignalState::default());
    }

    #[test]
    fn test_trend_filter_rejects_countertrend() {
        // Old lows drag the 200 EMA near 98; the fast EMA then crosses under
        // the slow EMA while price (99.0) still sits above the trend EMA, so
        // the bearish candidate is discarded.
        let mut closes = vec![90.0; 100];
        closes.extend(vec![100.0; 160]);
        closes.extend([103.0, 99.0, 99.0]);
        let candles = series_from_closes(&closes);
        let mut state = SymbolSignalState::default();
        let params = DetectionParams::default();

        let verdict = detect(&candles, &mut state, &params).unwrap();
        assert!(verdict.is_none());
        assert!(state.last_direction.is_none());
    }

    #[test]
    fn test_edge_trigger_fires_once() {
        // Fire on the cross bar, then keep appending bars that hold the same
        // condition: exactly one event across all windows.
        let mut closes = vec![100.0; 260];
        closes.push(101.5);
        let mut state = SymbolSignalState::default();
        let params = DetectionParams::default();
        let mut fires = 0;

        for _ in 0..6 {
            let candles = series_from_closes(&closes);
            if detect(&candles, &mut state, &params).unwrap().is_some() {
                fires += 1;
            }
            closes.push(101.5);
        }

        assert_eq!(fires, 1);
        assert_eq!(state.last_direction, Some(Direction::Bullish));
    }

    #[test]
    fn test_direction_flip_fires_again() {
        let mut closes = vec![100.0; 260];
        closes.push(101.5);
        let mut state = SymbolSignalState::default();
        let params = DetectionParams::default();

        let candles = series_from_closes(&closes);
        let first = detect(&candles, &mut state, &params).unwrap().unwrap();
        assert_eq!(first.direction, Direction::Bullish);

        // Gentle decline eventually crosses fast back under slow with price
        // below the trend EMA and close to the fast EMA: one bearish event.
        let mut directions = Vec::new();
        for next in [100.5, 99.8, 99.5, 99.3, 99.2, 99.1, 99.0, 99.0, 99.0, 99.0] {
            closes.push(next);
            let candles = series_from_closes(&closes);
            if let Some(event) = detect(&candles, &mut state, &params).unwrap() {
                directions.push(event.direction);
            }
        }

        assert_eq!(directions, vec![Direction::Bearish]);
        assert_eq!(state.last_direction, Some(Direction::Bearish));
    }

    #[test]
    fn test_same_direction_recross_suppressed() {
        let mut closes = vec![100.0; 260];
        closes.push(101.5);
        let mut state = SymbolSignalState::default();
        let params = DetectionParams::default();

        let candles = series_from_closes(&closes);
        assert!(detect(&candles, &mut state, &params).unwrap().is_some());

        // Violent drop crosses down but fails the pullback filter (no bearish
        // fire, state keeps Bullish), then the recovery crosses up again.
        for next in [93.0, 102.0, 102.0, 102.0] {
            closes.push(next);
            let candles = series_from_closes(&closes);
            assert!(detect(&candles, &mut state, &params).unwrap().is_none());
        }
        assert_eq!(state.last_direction, Some(Direction::Bullish));

        // A fresh state over the same series does fire on the re-cross,
        // proving the suppression above came from de-duplication.
        let candles = series_from_closes(&closes);
        let mut fresh = SymbolSignalState::default();
        let event = detect(&candles, &mut fresh, &params).unwrap().unwrap();
        assert_eq!(event.direction, Direction::Bullish);
    }

    #[test]
    fn test_idempotent_on_unchanged_series() {
        let candles = flat_then(&[]);
        let mut state = SymbolSignalState::default();
        let params = DetectionParams::default();

        assert!(detect(&candles, &mut state, &params).unwrap().is_none());
        assert!(detect(&candles, &mut state, &params).unwrap().is_none());
        assert_eq!(state, SymbolSignalState::default());
    }

    #[test]
    fn test_insufficient_data_is_not_an_error() {
        let candles = series_from_closes(&vec![100.0; 150]);
        let mut state = SymbolSignalState::default();
        let params = DetectionParams::default();

        let verdict = detect(&candles, &mut state, &params).unwrap();
        assert!(verdict.is_none());
        assert_eq!(state, SymbolSignalState::default());
    }

    #[test]
    fn test_minimum_length_window() {
        // Exactly trend_period + 2 candles is enough to evaluate
        let mut closes = vec![100.0; 201];
        closes.push(101.5);
        let candles = series_from_closes(&closes);
        let mut state = SymbolSignalState::default();
        let params = DetectionParams::default();

        let event = detect(&candles, &mut state, &params).unwrap();
        assert!(event.is_some());
    }

    #[test]
    fn test_params_validation() {
        let params = DetectionParams {
            fast_period: 0,
            ..Default::default()
        };
        assert_eq!(params.validated(), Err(IndicatorError::InvalidPeriod));

        let params = DetectionParams::default().validated().unwrap();
        assert_eq!(params.min_candles(), 202);
    }
}
