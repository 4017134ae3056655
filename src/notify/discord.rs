use super::TradePlan;
use crate::models::{Direction, SignalEvent};
use crate::Result;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

const COLOR_LONG: u32 = 0x00C853;
const COLOR_SHORT: u32 = 0xD32F2F;

const NUM_EMOJI: &[&str] = &[
    "1\u{fe0f}\u{20e3}",
    "2\u{fe0f}\u{20e3}",
    "3\u{fe0f}\u{20e3}",
    "4\u{fe0f}\u{20e3}",
    "5\u{fe0f}\u{20e3}",
    "6\u{fe0f}\u{20e3}",
    "7\u{fe0f}\u{20e3}",
    "8\u{fe0f}\u{20e3}",
    "9\u{fe0f}\u{20e3}",
    "\u{1f51f}",
];

/// Discord webhook sink for signal embeds and operational notes
#[derive(Clone)]
pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
    title: String,
}

impl DiscordNotifier {
    pub fn new(webhook_url: String, title: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            webhook_url,
            title,
        }
    }

    /// Post one signal as a rich embed
    pub async fn send_signal(
        &self,
        event: &SignalEvent,
        plan: &TradePlan,
        extras: &[(&str, String)],
    ) -> Result<()> {
        let color = match event.direction {
            Direction::Bullish => COLOR_LONG,
            Direction::Bearish => COLOR_SHORT,
        };
        let payload = json!({
            "embeds": [{
                "title": self.title,
                "description": build_description(event, plan, extras),
                "color": color,
            }]
        });
        self.post(&payload).await
    }

    /// Post a plain informational embed (startup banner, operational notes)
    pub async fn send_info(&self, msg: &str) -> Result<()> {
        let payload = json!({
            "embeds": [{
                "title": "Signals Bot",
                "description": msg,
            }]
        });
        self.post(&payload).await
    }

    async fn post(&self, payload: &serde_json::Value) -> Result<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(format!("Discord webhook error: {}", response.status()).into());
        }
        Ok(())
    }
}

/// "ENA/USDT" -> "USDT"; "BTC/USD:USD" -> "USD"; defaults to USDT
fn currency_from_symbol(symbol: &str) -> &str {
    let quote = symbol
        .rsplit('/')
        .next()
        .and_then(|leg| leg.split(':').next())
        .unwrap_or("");
    if quote.is_empty() {
        "USDT"
    } else {
        quote
    }
}

/// Smart decimal formatting so sub-cent tickers stay readable
fn fmt_price(x: f64) -> String {
    if x == 0.0 || x.is_nan() || x.is_infinite() {
        return "0".to_string();
    }
    let abs = x.abs();
    if abs < 0.0001 {
        return format!("{:.8}", x);
    }
    let precision = if abs < 0.01 {
        7
    } else if abs < 1.0 {
        6
    } else if abs < 10.0 {
        4
    } else if abs < 1000.0 {
        3
    } else {
        2
    };
    format!("{:.*}", precision, x)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

fn build_description(event: &SignalEvent, plan: &TradePlan, extras: &[(&str, String)]) -> String {
    let cur = currency_from_symbol(&event.symbol);
    let dot = match event.direction {
        Direction::Bullish => "\u{1f7e2} **Long**",
        Direction::Bearish => "\u{1f534} **Short**",
    };

    let mut lines = Vec::new();
    lines.push(format!("{}\n", dot));
    lines.push(format!("**Name:** {}", event.symbol));
    lines.push(format!("**Leverage:** Cross ({}x)", plan.leverage));
    lines.push(format!(
        "\u{1f300} **Entry Price ({})**: {} \u{2013} {}",
        cur,
        fmt_price(plan.entry_low),
        fmt_price(plan.entry_high)
    ));
    lines.push(format!("\n\u{1f3af} **Targets in {}:**", cur));
    for (i, tp) in plan.take_profits.iter().take(10).enumerate() {
        lines.push(format!("{} {}", NUM_EMOJI[i], fmt_price(*tp)));
    }
    lines.push(format!(
        "\n\u{1f6d1} **StopLoss:** {}",
        fmt_price(plan.stop_loss)
    ));

    for (key, value) in extras {
        lines.push(format!("\n- {}: {}", key, value));
    }

    lines.join("\n")
}
