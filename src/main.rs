//! Real-time BTC wager engine entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pulsebet::api::{create_router, AppState};
use pulsebet::config::Config;
use pulsebet::feed::{FeedConfig, PriceFeed};
use pulsebet::metrics;
use pulsebet::store::{FileStore, SessionGateway};
use pulsebet::utils::shutdown_signal;
use pulsebet::wager::{SessionLedger, WagerConfig, WagerManager};

/// Real-time BTC wager engine.
#[derive(Parser, Debug)]
#[command(name = "pulsebet")]
#[command(about = "Real-time wager engine over a live BTC price feed")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port for the engine API.
    #[arg(short, long, default_value = "8080")]
    port: u16,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the wager engine (default).
    Run {
        /// HTTP server port for the engine API.
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Connect to the price feed and print ticks (diagnostic).
    FeedTest,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("pulsebet=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Initialize metrics
    metrics::init_metrics();

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::FeedTest) => cmd_feed_test().await,
        Some(Command::Run { port }) => cmd_run(port).await,
        None => cmd_run(args.port).await,
    }
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("PULSEBET - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Stream URL: {}", config.trade_stream_url());
    println!("  Backfill: {} points", config.backfill_points);
    println!("  History Capacity: {} points", config.history_capacity);
    println!("  Settlement Delay: {}ms", config.settlement_delay_ms);
    println!("  Win Multiplier: x{}", config.win_multiplier);
    println!("  Tie Multiplier: x{}", config.tie_multiplier);
    println!("  Price Tolerance: ${}", config.price_tolerance);
    println!("  Starting Balance: ${}", config.starting_balance);
    println!("  Session Retention: {} days", config.session_retention_days);
    println!("  Store Directory: {}", config.session_store_dir);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Run the wager engine.
async fn cmd_run(port: u16) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    info!("Configuration loaded successfully");
    info!("Stream: {}", config.trade_stream_url());
    info!("Settlement delay: {}ms", config.settlement_delay_ms);
    info!(
        "Multipliers: win x{}, tie x{}",
        config.win_multiplier, config.tie_multiplier
    );

    // Install the Prometheus recorder before any counters move.
    let prometheus = PrometheusBuilder::new().install_recorder()?;

    // Resume or start a session
    let gateway = Arc::new(SessionGateway::new(
        Box::new(FileStore::new(&config.session_store_dir)),
        config.session_retention_days,
    ));

    let ledger = match gateway.load() {
        Some(ledger) => {
            info!(
                balance = %ledger.balance,
                total_wagers = ledger.total_wagers,
                "Resumed saved session"
            );
            ledger
        }
        None => {
            info!(balance = %config.starting_balance, "Starting fresh session");
            SessionLedger::new(config.starting_balance, pulsebet::utils::now_ms())
        }
    };

    // Connect the price feed
    let feed = PriceFeed::new(FeedConfig::from_config(&config));
    feed.connect().await?;

    // Create the lifecycle manager
    let manager = Arc::new(WagerManager::new(
        WagerConfig::from_config(&config),
        ledger,
        feed.price(),
        feed.connectivity(),
        gateway.clone(),
    ));

    // Start HTTP server
    let app_state = AppState::new(
        manager.clone(),
        feed.price(),
        feed.history(),
        feed.connectivity(),
    );

    let router = create_router(app_state).route(
        "/metrics",
        get(move || {
            let prometheus = prometheus.clone();
            async move { prometheus.render() }
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Teardown: release timers, close the stream, flush the ledger.
    info!("Shutting down...");
    manager.shutdown();
    feed.disconnect();

    Ok(())
}

/// Connect to the price feed and print ticks.
async fn cmd_feed_test() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("PULSEBET - FEED TEST");
    println!("======================================================================");

    let config = Config::load()?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    println!("\n1. Connecting to {} ...", config.trade_stream_url());
    let feed = PriceFeed::new(FeedConfig::from_config(&config));
    feed.connect().await?;

    println!("   Backfilled {} points", feed.history().len());
    println!("\n2. Watching ticks for 10 seconds...");

    let price = feed.price();
    let start = std::time::Instant::now();
    let mut last_seen_ts = 0i64;
    let mut tick_count = 0u32;

    while start.elapsed() < Duration::from_secs(10) {
        tokio::time::sleep(Duration::from_millis(250)).await;

        if let Some(point) = price.latest() {
            if point.timestamp != last_seen_ts {
                last_seen_ts = point.timestamp;
                tick_count += 1;
                println!(
                    "   [{:.1}s] {} ${}",
                    start.elapsed().as_secs_f64(),
                    point.time,
                    point.price
                );
            }
        }
    }

    feed.disconnect();

    println!("\n======================================================================");
    println!("FEED TEST COMPLETE");
    println!("  Ticks observed: {}", tick_count);
    println!("  History size: {}", feed.history().len());
    println!("======================================================================");

    Ok(())
}
