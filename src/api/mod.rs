// Market data providers
pub mod blofin;
pub mod hyperliquid;

pub use blofin::BlofinClient;
pub use hyperliquid::HyperliquidClient;

use crate::models::Candle;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// A venue that can serve OHLCV candles.
///
/// Implementations return candles ordered oldest-to-newest with the most
/// recent candle fully closed.
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn fetch_candles(&self, symbol: &str, interval: &str, limit: usize)
        -> Result<Vec<Candle>>;

    /// List up to `top_n` tradable symbols as "BASE/QUOTE", best-volume
    /// first where the venue exposes volume.
    async fn list_top_symbols(&self, quote: &str, top_n: usize) -> Result<Vec<String>>;

    /// Current funding rate in percent, for venues that expose one.
    /// Defaults to `None` so the scanner never blocks on it.
    async fn fetch_funding_rate(&self, _symbol: &str) -> Result<Option<f64>> {
        Ok(None)
    }

    /// Quote currency used when auto-selecting symbols
    fn default_quote(&self) -> &str;

    /// Venue name for the startup banner
    fn label(&self) -> &str;
}

/// Build the configured provider (`hyperliquid` when unspecified)
pub fn make_provider(name: &str) -> Result<Box<dyn CandleSource>> {
    match name.trim().to_lowercase().as_str() {
        "" | "hyperliquid" => Ok(Box::new(HyperliquidClient::new())),
        "blofin" => Ok(Box::new(BlofinClient::new())),
        other => Err(format!("Unknown provider '{}'", other).into()),
    }
}

/// Normalize "BTC/USD" to the instrument id form "BTC-USD"
pub(crate) fn to_inst_id(symbol: &str) -> String {
    symbol.replace('/', "-").to_uppercase()
}

fn to_millis(raw: f64) -> i64 {
    let t = raw as i64;
    // Some venues send epoch seconds, others milliseconds
    if t < 10_000_000_000 {
        t * 1000
    } else {
        t
    }
}

fn timestamp_from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| format!("Invalid candle timestamp: {}", ms).into())
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn row_field<'a>(row: &'a Value, short: &str, long: &str) -> Option<&'a Value> {
    row.get(short).or_else(|| row.get(long))
}

/// Parse an OHLCV payload into candles, tolerating the shapes public kline
/// endpoints actually return:
/// - `[[ts, o, h, l, c, v], ...]`
/// - `[{"t":..,"o":..,...}, ...]` or the long-key `{"time":..,"open":..}` form
/// - any of the above wrapped under `data`/`result`/`rows`/`candles`/...
///
/// Timestamps are accepted in seconds or milliseconds. Rows come back sorted
/// oldest-to-newest regardless of the wire order.
pub(crate) fn parse_ohlcv_payload(payload: &Value, symbol: &str) -> Result<Vec<Candle>> {
    let rows = unwrap_rows(payload)
        .ok_or_else(|| format!("Unrecognized OHLCV payload shape for {}", symbol))?;

    let mut candles = Vec::with_capacity(rows.len());
    for row in rows {
        candles.push(parse_row(row, symbol)?);
    }

    candles.sort_by_key(|c| c.open_time);
    Ok(candles)
}

fn unwrap_rows(payload: &Value) -> Option<&Vec<Value>> {
    if let Some(rows) = payload.as_array() {
        return Some(rows);
    }
    const WRAPPER_KEYS: &[&str] = &[
        "data", "result", "rows", "candles", "kline", "klines", "list", "items",
    ];
    WRAPPER_KEYS
        .iter()
        .find_map(|key| payload.get(key).and_then(Value::as_array))
}

fn parse_row(row: &Value, symbol: &str) -> Result<Candle> {
    if let Some(cols) = row.as_array() {
        if cols.len() < 6 {
            return Err(format!("OHLCV row for {} has {} columns", symbol, cols.len()).into());
        }
        let mut nums = [0.0f64; 6];
        for (i, col) in cols.iter().take(6).enumerate() {
            nums[i] = match value_as_f64(col) {
                Some(n) => n,
                None => return Err(format!("Non-numeric OHLCV column for {}", symbol).into()),
            };
        }
        return Ok(Candle {
            symbol: symbol.to_string(),
            open_time: timestamp_from_millis(to_millis(nums[0]))?,
            open: nums[1],
            high: nums[2],
            low: nums[3],
            close: nums[4],
            volume: nums[5],
        });
    }

    if row.is_object() {
        let field = |short: &str, long: &str| -> Result<f64> {
            row_field(row, short, long)
                .and_then(value_as_f64)
                .ok_or_else(|| format!("Missing OHLCV field '{}' for {}", long, symbol).into())
        };
        let ts = field("t", "time")?;
        return Ok(Candle {
            symbol: symbol.to_string(),
            open_time: timestamp_from_millis(to_millis(ts))?,
            open: field("o", "open")?,
            high: field("h", "high")?,
            low: field("l", "low")?,
            close: field("c", "close")?,
            volume: field("v", "volume")?,
        });
    }

    Err(format!("Unrecognized OHLCV row shape for {}", symbol).into())
}
