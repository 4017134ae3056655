use crate::notify::PlanParams;
use crate::strategy::DetectionParams;
use crate::Result;

/// Runtime configuration, read once from the environment at startup.
///
/// Every knob has a default; only the Discord webhook URL is required.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: String,
    pub exchange_label: String,
    pub symbols: Vec<String>,
    pub auto_symbols: bool,
    pub top_n: usize,
    pub auto_quote: String,
    pub timeframe: String,
    pub min_bars: usize,
    pub poll_seconds: u64,
    pub scan_batch: usize,
    pub webhook_url: String,
    pub signal_title: String,
    pub quiet: bool,
    pub enable_funding_filter: bool,
    pub max_abs_funding: f64,
    pub detection: DetectionParams,
    pub plan: PlanParams,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let webhook_url = std::env::var("DISCORD_WEBHOOK_URL")
            .map_err(|_| "DISCORD_WEBHOOK_URL not found in environment")?;

        let provider = env_or("PROVIDER", "hyperliquid");
        let exchange_label = std::env::var("EXCHANGE_LABEL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| provider.clone());

        let detection = DetectionParams {
            fast_period: env_parsed("FAST_PERIOD", 5),
            slow_period: env_parsed("SLOW_PERIOD", 50),
            trend_period: env_parsed("TREND_PERIOD", 200),
            atr_period: env_parsed("ATR_PERIOD", 14),
            pullback_atr_multiple: env_parsed("PULLBACK_ATR_MULT", 1.0),
        }
        .validated()?;

        let plan = PlanParams {
            leverage: env_parsed("LEVERAGE", 20),
            risk_atr: env_parsed("RISK_ATR", 2.2),
            pull_lower: env_parsed("PULL_L", 0.35),
            pull_upper: env_parsed("PULL_U", 0.20),
            tp_multiples: parse_f64_list(&env_or("TP_MULT", "0.8,1.6,2.4,3.5,4.2,5.0")),
        };

        Ok(Self {
            provider,
            exchange_label,
            symbols: parse_symbol_list(&env_or("SYMBOLS", "MTL/USDT")),
            auto_symbols: parse_bool(&env_or("AUTO_SYMBOLS", "false")),
            top_n: env_parsed("TOP_N", 12).max(1),
            // Empty means "use the provider's native quote currency"
            auto_quote: env_or("AUTO_QUOTE", ""),
            timeframe: env_or("TIMEFRAME", "5m"),
            min_bars: env_parsed("MIN_BARS", 400),
            poll_seconds: env_parsed("POLL_SECONDS", 30),
            scan_batch: env_parsed("SCAN_BATCH", 8).max(1),
            webhook_url,
            signal_title: env_or("SIGNAL_TITLE", "\u{2b50}  VIP Signal  \u{2b50}"),
            quiet: parse_bool(&env_or("QUIET", "false")),
            enable_funding_filter: parse_bool(&env_or("ENABLE_FUNDING_FILTER", "false")),
            max_abs_funding: env_parsed("MAX_ABS_FUNDING", 0.05),
            detection,
            plan,
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub(crate) fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub(crate) fn parse_symbol_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn parse_f64_list(value: &str) -> Vec<f64> {
    value
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect()
}
