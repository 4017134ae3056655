use super::{parse_ohlcv_payload, to_inst_id, CandleSource};
use crate::models::Candle;
use crate::Result;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

const BLOFIN_API_BASE: &str = "https://openapi.blofin.com";
const KLINES_PATH: &str = "/api/v1/market/candles";
const INSTRUMENTS_PATH: &str = "/api/v1/public/instruments";
const TICKERS_PATH: &str = "/api/v1/public/tickers";
const RATE_LIMIT_RPM: u32 = 60;
const MAX_RETRIES: u32 = 3;

type DirectRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// BloFin public market data client (REST, no auth needed for candles)
#[derive(Clone)]
pub struct BlofinClient {
    client: Client,
    base_url: String,
    rate_limiter: Arc<DirectRateLimiter>,
}

impl Default for BlofinClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BlofinClient {
    pub fn new() -> Self {
        Self::with_base_url(BLOFIN_API_BASE.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(RATE_LIMIT_RPM).unwrap());
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    async fn fetch_payload(&self, inst_id: &str, bar: &str, limit: usize) -> Result<Value> {
        let limit = limit.to_string();
        self.get_json(
            KLINES_PATH,
            &[("instId", inst_id), ("bar", bar), ("limit", &limit)],
        )
        .await
    }

    /// Rate-limited GET with a bounded retry loop for transient 429/5xx
    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut backoff = Duration::from_millis(400);

        for attempt in 1..=MAX_RETRIES {
            self.rate_limiter.until_ready().await;

            let response = match self.client.get(&url).query(query).send().await {
                Ok(r) => r,
                Err(e) => {
                    if attempt == MAX_RETRIES {
                        return Err(e.into());
                    }
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                if attempt == MAX_RETRIES {
                    return Err(format!("BloFin API error: {}", status).into());
                }
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                continue;
            }
            if !status.is_success() {
                return Err(format!("BloFin API error: {}", status).into());
            }

            return Ok(response.json().await?);
        }

        unreachable!("retry loop always returns")
    }
}

/// Map an instrument id like "BTC-USDT" to "BTC/USDT"
fn symbol_from_inst(inst_id: &str) -> Option<String> {
    let normalized = inst_id.trim().to_uppercase();
    let (base, quote) = normalized.split_once('-')?;
    if base.is_empty() || quote.is_empty() {
        return None;
    }
    Some(format!("{}/{}", base, quote))
}

fn ticker_volume(row: &Value) -> f64 {
    ["volUsd", "quoteVolume", "vol24hQuote"]
        .iter()
        .find_map(|key| row.get(*key))
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
        .unwrap_or(0.0)
}

#[async_trait]
impl CandleSource for BlofinClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let inst_id = to_inst_id(symbol);
        let payload = self.fetch_payload(&inst_id, interval, limit).await?;
        parse_ohlcv_payload(&payload, symbol)
    }

    /// Instruments filtered to the quote currency, ranked by the 24h quote
    /// volume reported by the public tickers endpoint.
    async fn list_top_symbols(&self, quote: &str, top_n: usize) -> Result<Vec<String>> {
        let instruments = self
            .get_json(INSTRUMENTS_PATH, &[("instType", "SWAP")])
            .await?;
        let quote_suffix = format!("/{}", quote.to_uppercase());

        let mut symbols: Vec<String> = instruments
            .get("data")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| row.get("instId").and_then(Value::as_str))
                    .filter_map(symbol_from_inst)
                    .filter(|s| s.ends_with(&quote_suffix))
                    .collect()
            })
            .unwrap_or_default();
        symbols.sort();
        symbols.dedup();
        if symbols.is_empty() {
            return Err(format!("No {} instruments listed", quote).into());
        }

        // A tickers failure degrades to unranked output rather than aborting
        let mut volumes: std::collections::HashMap<String, f64> = std::collections::HashMap::new();
        match self.get_json(TICKERS_PATH, &[("instType", "SWAP")]).await {
            Ok(tickers) => {
                if let Some(rows) = tickers.get("data").and_then(Value::as_array) {
                    for row in rows {
                        if let Some(sym) = row
                            .get("instId")
                            .and_then(Value::as_str)
                            .and_then(symbol_from_inst)
                        {
                            volumes.insert(sym, ticker_volume(row));
                        }
                    }
                }
            }
            Err(e) => tracing::warn!("BloFin tickers unavailable ({}), keeping listing order", e),
        }

        symbols.sort_by(|a, b| {
            let va = volumes.get(a).copied().unwrap_or(0.0);
            let vb = volumes.get(b).copied().unwrap_or(0.0);
            vb.partial_cmp(&va).unwrap_or(std::cmp::Ordering::Equal)
        });
        symbols.truncate(top_n);
        Ok(symbols)
    }

    fn default_quote(&self) -> &str {
        "USDT"
    }

    fn label(&self) -> &str {
        "blofin"
    }
}
