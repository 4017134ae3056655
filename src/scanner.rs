use crate::api::CandleSource;
use crate::config::Config;
use crate::models::SignalEvent;
use crate::notify::{DiscordNotifier, TradePlan};
use crate::strategy::{detect, SignalStateStore};
use crate::Result;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Scan driver: rotates through symbol batches on a fixed cadence, runs the
/// detector per symbol and forwards confirmed signals to the notifier.
pub struct Scanner {
    provider: Box<dyn CandleSource>,
    notifier: DiscordNotifier,
    store: SignalStateStore,
    config: Config,
}

impl Scanner {
    pub fn new(provider: Box<dyn CandleSource>, notifier: DiscordNotifier, config: Config) -> Self {
        Self {
            provider,
            notifier,
            store: SignalStateStore::new(),
            config,
        }
    }

    /// Evaluate one symbol: fetch, detect, notify on fire.
    ///
    /// A short or empty series is a silent no-signal outcome; provider,
    /// indicator and delivery errors surface to the caller, which isolates
    /// them to this symbol.
    pub async fn scan_symbol(&mut self, symbol: &str) -> Result<Option<SignalEvent>> {
        // Funding gate runs before any detection so a skipped symbol leaves
        // its de-dup state untouched.
        let mut funding_note = None;
        if self.config.enable_funding_filter {
            match self.provider.fetch_funding_rate(symbol).await {
                Ok(Some(rate)) => {
                    if rate.abs() > self.config.max_abs_funding {
                        tracing::debug!(
                            "{}: funding {:.4}% beyond ±{:.4}%, skipping",
                            symbol,
                            rate,
                            self.config.max_abs_funding
                        );
                        return Ok(None);
                    }
                    funding_note = Some(format!("Funding: {:.4}%", rate));
                }
                Ok(None) => {}
                Err(e) => tracing::debug!("{}: funding rate unavailable: {}", symbol, e),
            }
        }

        let candles = self
            .provider
            .fetch_candles(symbol, &self.config.timeframe, self.config.min_bars)
            .await?;

        if candles.len() < self.config.detection.min_candles() {
            tracing::debug!(
                "{}: {} candles, need {} - waiting for history",
                symbol,
                candles.len(),
                self.config.detection.min_candles()
            );
            return Ok(None);
        }

        let state = self.store.state_mut(symbol);
        let event = detect(&candles, state, &self.config.detection)?;

        if let Some(event) = &event {
            tracing::info!(
                "{} {} @ {} (fast {:.4} / slow {:.4} / trend {:.4} / atr {:.4})",
                event.symbol,
                event.direction.as_str(),
                event.price,
                event.ema_fast,
                event.ema_slow,
                event.ema_trend,
                event.atr
            );

            let plan = TradePlan::for_event(event, &self.config.plan);
            let mut extras = vec![("TF", self.config.timeframe.clone())];
            if let Some(note) = funding_note {
                extras.push(("Info", note));
            }
            self.notifier.send_signal(event, &plan, &extras).await?;
        }

        Ok(event)
    }

    /// Scan loop: one batch of symbols per tick, errors logged per symbol so
    /// a failing pair never stalls the cycle.
    pub async fn run(&mut self) -> Result<()> {
        let banner = format!(
            "Started scanner on **{}** | TF **{}** | Symbols: {}",
            self.config.exchange_label,
            self.config.timeframe,
            self.config.symbols.join(", ")
        );
        tracing::info!("{}", banner);
        self.maybe_info(&banner).await;

        let batches = symbol_batches(&self.config.symbols, self.config.scan_batch);
        if batches.is_empty() {
            return Err("No symbols configured".into());
        }

        let mut ticker = interval(Duration::from_secs(self.config.poll_seconds));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut batch_index = 0usize;
        loop {
            ticker.tick().await;

            let batch = batches[batch_index % batches.len()].clone();
            batch_index = batch_index.wrapping_add(1);

            for symbol in &batch {
                match self.scan_symbol(symbol).await {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        tracing::debug!("{}: no signal", symbol);
                    }
                    Err(e) => {
                        tracing::warn!("{}: scan failed: {}", symbol, e);
                    }
                }
            }
        }
    }

    async fn maybe_info(&self, msg: &str) {
        if self.config.quiet {
            return;
        }
        if let Err(e) = self.notifier.send_info(msg).await {
            tracing::warn!("Failed to send info message: {}", e);
        }
    }
}

/// Split symbols into scan batches. A zero batch size is treated as one so a
/// hand-built config can never panic the loop.
fn symbol_batches(symbols: &[String], batch_size: usize) -> Vec<Vec<String>> {
    symbols
        .chunks(batch_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}
