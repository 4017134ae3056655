use super::{parse_ohlcv_payload, to_inst_id, CandleSource};
use crate::models::Candle;
use crate::Result;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

const HYPERLIQUID_API_BASE: &str = "https://api.hyperliquid.xyz";
const KLINES_PATH: &str = "/api/v1/ohlcv";
const INFO_PATH: &str = "/info";
const RATE_LIMIT_RPM: u32 = 60;
const MAX_RETRIES: u32 = 3;

type DirectRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Hyperliquid public data client (REST)
///
/// Prefers POST for the klines endpoint; falls back to GET with query
/// parameters since some nodes only accept one of the two.
#[derive(Clone)]
pub struct HyperliquidClient {
    client: Client,
    base_url: String,
    rate_limiter: Arc<DirectRateLimiter>,
}

impl Default for HyperliquidClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperliquidClient {
    pub fn new() -> Self {
        Self::with_base_url(HYPERLIQUID_API_BASE.to_string())
    }

    /// Point the client at a different node (or a test server)
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

    async fn fetch_payload(&self, inst_id: &str, interval: &str, limit: usize) -> Result<Value> {
        let url = format!("{}{}", self.base_url, KLINES_PATH);
        let body = json!({ "instId": inst_id, "interval": interval, "limit": limit });

        match self.request_json(|| self.client.post(&url).json(&body)).await {
            Ok(payload) => Ok(payload),
            Err(post_err) => {
                tracing::debug!("POST {} failed ({}), trying GET", url, post_err);
                self.request_json(|| {
                    self.client.get(&url).query(&[
                        ("instId", inst_id),
                        ("interval", interval),
                        ("limit", &limit.to_string()),
                    ])
                })
                .await
            }
        }
    }

    /// Universe of listed base coins via `/info`. Some nodes only answer GET,
    /// others only POST with an empty body, so both are tried.
    async fn fetch_universe(&self) -> Result<Value> {
        let url = format!("{}{}", self.base_url, INFO_PATH);
        match self.request_json(|| self.client.get(&url)).await {
            Ok(payload) => Ok(payload),
            Err(get_err) => {
                tracing::debug!("GET {} failed ({}), trying POST", url, get_err);
                self.request_json(|| self.client.post(&url).json(&json!({})))
                    .await
            }
        }
    }

    /// Rate-limited request with a bounded retry loop for transient 429/5xx
    async fn request_json<F>(&self, build: F) -> Result<Value>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut backoff = Duration::from_millis(400);

        for attempt in 1..=MAX_RETRIES {
            self.rate_limiter.until_ready().await;

            let response = match build().send().await {
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
                    return Err(format!("Hyperliquid API error: {}", status).into());
                }
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                continue;
            }
            if !status.is_success() {
                return Err(format!("Hyperliquid API error: {}", status).into());
            }

            return Ok(response.json().await?);
        }

        unreachable!("retry loop always returns")
    }
}

/// Extract base coins from the `/info` payload, tolerating the shapes
/// different nodes answer with: entries may be plain strings or objects,
/// listed under any of several keys, as "BTC", "BTC-USD" or "BTCUSD".
fn parse_base_symbols(payload: &Value) -> Vec<String> {
    const UNIVERSE_KEYS: &[&str] = &["universe", "coins", "tickers", "mids", "allMids", "symbols"];
    const QUOTE_SUFFIXES: &[&str] = &["USDT", "USDC", "USD"];

    let mut bases = Vec::new();
    for key in UNIVERSE_KEYS {
        let Some(entries) = payload.get(key).and_then(Value::as_array) else {
            continue;
        };
        for entry in entries {
            let raw = match entry {
                Value::String(s) => Some(s.as_str()),
                Value::Object(_) => ["symbol", "instId", "name", "id"]
                    .iter()
                    .find_map(|k| entry.get(k).and_then(Value::as_str)),
                _ => None,
            };
            let Some(raw) = raw else { continue };

            let normalized = raw.replace('_', "-").to_uppercase();
            let base = match normalized.split_once('-') {
                Some((base, _)) => base.to_string(),
                None => QUOTE_SUFFIXES
                    .iter()
                    .find_map(|q| normalized.strip_suffix(q))
                    .unwrap_or(&normalized)
                    .to_string(),
            };
            if !base.is_empty() && !bases.contains(&base) {
                bases.push(base);
            }
        }
    }

    bases.sort();
    bases
}

#[async_trait]
impl CandleSource for HyperliquidClient {
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

    /// No stable public volume endpoint across nodes, so the discovered
    /// universe is returned in sorted order, capped at `top_n`.
    async fn list_top_symbols(&self, quote: &str, top_n: usize) -> Result<Vec<String>> {
        let payload = self.fetch_universe().await?;
        let bases = parse_base_symbols(&payload);
        if bases.is_empty() {
            return Err("No symbols discovered from /info".into());
        }
        Ok(bases
            .into_iter()
            .take(top_n)
            .map(|base| format!("{}/{}", base, quote.to_uppercase()))
            .collect())
    }

    fn default_quote(&self) -> &str {
        "USD"
    }

    fn label(&self) -> &str {
        "hyperliquid"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_candles_post() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/ohlcv")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"data": [[1700000000, 100.0, 101.0, 99.0, 100.5, 1000.0],
                            [1700000300, 100.5, 102.0, 100.0, 101.5, 900.0]]}"#,
            )
            .create_async()
            .await;

        let client = HyperliquidClient::with_base_url(server.url());
        let candles = client.fetch_candles("BTC/USD", "5m", 2).await.unwrap();

        mock.assert_async().await;
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].close, 101.5);
        assert_eq!(candles[0].symbol, "BTC/USD");
    }

    #[tokio::test]
    async fn test_falls_back_to_get() {
        let mut server = mockito::Server::new_async().await;
        let _post = server
            .mock("POST", "/api/v1/ohlcv")
            .with_status(404)
            .create_async()
            .await;
        let get = server
            .mock("GET", "/api/v1/ohlcv")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[[1700000000, 1.0, 2.0, 0.5, 1.5, 10.0]]"#)
            .create_async()
            .await;

        let client = HyperliquidClient::with_base_url(server.url());
        let candles = client.fetch_candles("SOL/USD", "5m", 1).await.unwrap();

        get.assert_async().await;
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].close, 1.5);
    }

    #[tokio::test]
    async fn test_list_top_symbols() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/info")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"universe": [{"name": "BTC"}, {"name": "ETH"}, {"name": "SOL"}, {"name": "BTC"}]}"#)
            .create_async()
            .await;

        let client = HyperliquidClient::with_base_url(server.url());
        let symbols = client.list_top_symbols("USD", 2).await.unwrap();

        mock.assert_async().await;
        assert_eq!(symbols, vec!["BTC/USD", "ETH/USD"]);
    }

    #[test]
    fn test_parse_base_symbols_shapes() {
        let payload = json!({"coins": ["btc_usd", "ETHUSDT", "SOL"]});
        assert_eq!(parse_base_symbols(&payload), vec!["BTC", "ETH", "SOL"]);

        let empty = json!({"status": "ok"});
        assert!(parse_base_symbols(&empty).is_empty());
    }
}
