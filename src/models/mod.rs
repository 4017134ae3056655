use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV candlestick for one completed interval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Direction of a detected crossover signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Bullish => "LONG",
            Direction::Bearish => "SHORT",
        }
    }
}

/// A confirmed crossover-pullback event for one symbol on one closed bar.
///
/// Fully determined at detection time; the notification layer only formats it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalEvent {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub price: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub ema_trend: f64,
    pub atr: f64,
}

/// Per-symbol de-duplication state, owned by the detector.
///
/// `last_direction` is only overwritten on a fire decision, so a signal that
/// stays true across consecutive scans reports once per trend regime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolSignalState {
    pub last_direction: Option<Direction>,
    pub last_fired_at: Option<DateTime<Utc>>,
}
