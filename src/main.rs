use signalbot::api::make_provider;
use signalbot::config::Config;
use signalbot::notify::DiscordNotifier;
use signalbot::scanner::Scanner;
use signalbot::Result;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let mut config = Config::from_env()?;
    tracing::info!(
        "Starting scanner: provider={} tf={} symbols={} poll={}s",
        config.provider,
        config.timeframe,
        config.symbols.len(),
        config.poll_seconds
    );

    let provider = make_provider(&config.provider)?;

    // Symbol auto-selection fails open: any listing problem keeps the
    // SYMBOLS list from the environment.
    if config.auto_symbols {
        let quote = if config.auto_quote.trim().is_empty() {
            provider.default_quote().to_string()
        } else {
            config.auto_quote.clone()
        };
        match provider.list_top_symbols(&quote, config.top_n).await {
            Ok(symbols) if !symbols.is_empty() => {
                tracing::info!("Auto-selected {} symbols: {}", symbols.len(), symbols.join(", "));
                config.symbols = symbols;
            }
            Ok(_) => tracing::warn!("Auto-selection returned no symbols, keeping SYMBOLS"),
            Err(e) => tracing::warn!("Auto-selection failed ({}), keeping SYMBOLS", e),
        }
    }
    let notifier = DiscordNotifier::new(config.webhook_url.clone(), config.signal_title.clone());
    let mut scanner = Scanner::new(provider, notifier, config);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        result = scanner.run() => {
            if let Err(e) = result {
                tracing::error!("Scanner exited: {}", e);
                return Err(e);
            }
        }
    }

    tracing::info!("Scanner stopped");
    Ok(())
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "signalbot=info".into()),
        )
        .init();
}
