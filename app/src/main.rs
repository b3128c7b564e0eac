// In app/src/main.rs

use anyhow::{Context, Result};
use app_config::Settings;
use clap::{Parser, Subcommand};
use core_types::{Symbol, TradeSignal};
use signals::JsonlInbox;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

mod telemetry;
mod wiring;

// --- Command-Line Interface Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = "A risk-gated trade execution pipeline.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Polls signal sources and executes admitted trades until Ctrl-C.
    Run,

    /// Loads and validates the configuration, then prints the effective limits.
    CheckConfig,

    /// Fetches the current price of a symbol from the configured venue.
    Quote {
        /// The symbol to quote (e.g., "AAPL", "INFY", "BTCUSDT").
        #[arg(short, long)]
        symbol: String,
    },

    /// Appends a signal read from a JSON file to the signal inbox.
    SubmitSignal {
        /// A file holding a single signal as a JSON object.
        #[arg(short, long)]
        file: PathBuf,
    },
}

// --- Main Application Entry Point ---

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from a .env file, if it exists.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Settings are loaded before the subscriber so `app.log_level` applies.
    let settings = app_config::load_settings();
    let log_level = settings.as_ref().map_or("info", |s| s.app.log_level.as_str());
    telemetry::init(log_level);

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration. Refusing to start.");
            return Err(e).context("Failed to load configuration");
        }
    };
    tracing::info!(environment = %settings.app.environment, "Starting Atlas application");

    match cli.command {
        Commands::Run => handle_run(&settings).await?,
        Commands::CheckConfig => handle_check_config(&settings)?,
        Commands::Quote { symbol } => handle_quote(&settings, symbol).await?,
        Commands::SubmitSignal { file } => handle_submit_signal(&settings, file).await?,
    }

    tracing::info!("Atlas application has finished successfully.");
    Ok(())
}

// --- "Run" Subcommand Logic ---

async fn handle_run(settings: &Settings) -> Result<()> {
    let engine = wiring::build_engine(settings).await?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Ctrl-C received. Shutting down."),
                Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C. Shutting down."),
            }
            shutdown.cancel();
        }
    });

    engine.run(shutdown).await
}

// --- "CheckConfig" Subcommand Logic ---

fn handle_check_config(settings: &Settings) -> Result<()> {
    let risk = risk::RiskConfig::try_from(&settings.risk)?;
    println!("Configuration is valid.");
    println!("  venue:               {:?}", settings.broker.venue);
    println!(
        "  market:              {:?} {:?}",
        settings.market.market, settings.market.trading_hours
    );
    println!("  max risk per trade:  {}", risk.max_risk_per_trade);
    println!("  min reward ratio:    {}", risk.min_reward_ratio);
    println!("  max positions:       {}", risk.max_positions);
    println!("  require target:      {}", risk.require_target);
    println!("  initial equity:      {}", settings.pipeline.initial_equity);
    println!("  advisor model:       {}", settings.advisor.primary.model);
    println!(
        "  fallback model:      {}",
        settings.advisor.fallback.as_ref().map_or("none", |f| f.model.as_str())
    );
    Ok(())
}

// --- "Quote" Subcommand Logic ---

async fn handle_quote(settings: &Settings, symbol: String) -> Result<()> {
    let gateway = execution::gateway_from_settings(&settings.broker, settings.pipeline.broker_timeout())?;
    let symbol = Symbol(symbol);
    let price = gateway
        .get_price(&symbol)
        .await
        .with_context(|| format!("Failed to quote {symbol} on {}", gateway.name()))?;
    println!("{symbol} {price}");
    Ok(())
}

// --- "SubmitSignal" Subcommand Logic ---

async fn handle_submit_signal(settings: &Settings, file: PathBuf) -> Result<()> {
    let inbox_path = settings
        .signals
        .inbox_path
        .as_deref()
        .context("signals.inbox_path is not configured")?;
    let content = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let signal: TradeSignal = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a valid signal", file.display()))?;

    JsonlInbox::new(inbox_path).submit(&signal).await?;
    tracing::info!(symbol = %signal.symbol, side = %signal.side, inbox = %inbox_path, "Signal submitted.");
    Ok(())
}
