use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::sync::watch;

use spotbot::api::{BinanceClient, CoinGeckoClient};
use spotbot::config::{BotConfig, Credentials};
use spotbot::execution::{MarketDataGateway, Scheduler, TradingCycle};
use spotbot::persistence::PositionStore;
use spotbot::risk::CircuitBreaker;

#[derive(Parser)]
#[command(name = "spotbot")]
#[command(about = "RSI mean-reversion spot trader with fixed take-profit and stop-loss exits")]
#[command(version)]
struct Cli {
    /// TOML config file (defaults to ./spotbot.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Override the positions file location
    #[arg(long)]
    positions_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();

    let mut config = BotConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(path) = cli.positions_file {
        config.positions_file = path;
    }

    let credentials = Credentials::from_env().context("Exchange credentials missing")?;

    tracing::info!("🚀 SpotBot starting");
    log_configuration(&config);

    let exchange = BinanceClient::from_config(&config, credentials)
        .context("Failed to create exchange client")?;
    let ranking =
        CoinGeckoClient::from_config(&config).context("Failed to create ranking client")?;

    let gateway = MarketDataGateway::new(
        Arc::new(exchange),
        Arc::new(ranking),
        config.symbol_suffix.clone(),
    );
    let store = PositionStore::new(config.positions_file.clone());
    let breaker = CircuitBreaker::from_config(&config);
    let poll_interval = config.poll_interval();

    let mut cycle = TradingCycle::new(config, gateway, store);

    if cli.once {
        let report = cycle.run_once().await.context("Trading cycle failed")?;
        if let Some(e) = report.entry_scan_error {
            bail!("Entry scan failed: {}", e);
        }
        return Ok(());
    }

    let shutdown_rx = spawn_shutdown_listener(tokio::signal::ctrl_c());

    tracing::info!("Press Ctrl+C to stop...");

    Scheduler::new(cycle, breaker, poll_interval)
        .run(shutdown_rx)
        .await
        .context("Trading loop halted")?;

    tracing::info!("👋 SpotBot stopped");
    Ok(())
}

/// Flip the returned flag once `signal` fires
///
/// If the signal cannot be installed the sender is kept alive, so the loop
/// keeps running instead of reading a dropped channel as a stop request.
fn spawn_shutdown_listener<F>(signal: F) -> watch::Receiver<bool>
where
    F: Future<Output = std::io::Result<()>> + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match signal.await {
            Ok(()) => {
                tracing::info!("⚠️  Received Ctrl+C, finishing current cycle...");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                tracing::error!("Failed to listen for Ctrl+C ({}), stop the process externally", e);
                std::future::pending::<()>().await;
                drop(shutdown_tx);
            }
        }
    });
    shutdown_rx
}

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("spotbot=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn log_configuration(config: &BotConfig) {
    tracing::info!("📊 Configuration:");
    tracing::info!("  Strategy: {:?}", config.strategy);
    tracing::info!(
        "  Universe: top {} by volume, quoted in {}",
        config.candidate_limit,
        config.quote_asset
    );
    tracing::info!(
        "  Entry: RSI({}) < {} on {} candles",
        config.rsi_period,
        config.rsi_threshold,
        config.candle_timeframe
    );
    tracing::info!(
        "  Exit: take-profit x{}, stop-loss x{}",
        config.take_profit,
        config.stop_loss
    );
    tracing::info!(
        "  Sizing: {:.0}% of balance, max {} positions",
        config.capital_fraction * 100.0,
        config.max_positions
    );
    tracing::info!("  Positions file: {}", config.positions_file.display());
}
