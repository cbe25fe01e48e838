//! SMC Signal Engine - Main Entry Point
//!
//! Live analysis, market scanning and order execution against BingX.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use smc_signal_engine::config::Config;
use smc_signal_engine::exchange::{
    AdvisoryClient, AdvisoryRequest, BingxClient, MarketDataProvider,
};
use smc_signal_engine::strategy::{
    analysis_cycle, AnalysisReport, Analyzer, OpportunityScanner, OrderExecutor, PricePoller,
    SetupOutcome, SymbolTracker,
};
use smc_signal_engine::utils::decimal::format_price;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// SMC Signal Engine CLI
#[derive(Parser)]
#[command(name = "smc-signal-engine")]
#[command(version, about = "Indicator consensus and smart-money setups for BingX perpetuals")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track one symbol continuously and log every published report
    Watch {
        #[arg(short, long)]
        symbol: String,

        /// Candle interval (default: analysis.interval)
        #[arg(short, long)]
        interval: Option<String>,
    },

    /// Rank top movers and batch-analyse them for setups
    Scan,

    /// Analyse a symbol once and execute the resulting setup
    Trade {
        #[arg(short, long)]
        symbol: String,

        #[arg(short, long)]
        interval: Option<String>,

        /// Size and print the orders without sending them
        #[arg(long)]
        dry_run: bool,

        /// Send the entry without take-profit / stop-loss triggers
        #[arg(long)]
        no_protection: bool,
    },

    /// List tradable contracts
    Symbols,

    /// Analyse a symbol once and ask the advisory backend for commentary
    Advise {
        #[arg(short, long)]
        symbol: String,

        #[arg(short, long)]
        interval: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging()?;

    let config = Config::load()?;
    config.validate()?;
    log_config(&config);

    let client = Arc::new(BingxClient::new(&config.exchange)?);

    match cli.command {
        Commands::Watch { symbol, interval } => {
            let interval = interval.unwrap_or_else(|| config.analysis.interval.clone());
            run_watch(&config, client, &symbol, &interval).await
        }
        Commands::Scan => run_scan(&config, client.as_ref()).await,
        Commands::Trade {
            symbol,
            interval,
            dry_run,
            no_protection,
        } => {
            let interval = interval.unwrap_or_else(|| config.analysis.interval.clone());
            run_trade(&config, client.as_ref(), &symbol, &interval, dry_run, !no_protection).await
        }
        Commands::Symbols => list_symbols(client.as_ref()).await,
        Commands::Advise { symbol, interval } => {
            let interval = interval.unwrap_or_else(|| config.analysis.interval.clone());
            run_advise(&config, client.as_ref(), &symbol, &interval).await
        }
    }
}

/// Initialize logging to stdout and an hourly rolling file.
fn init_logging() -> Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all("logs")?;

    let file_appender = tracing_appender::rolling::hourly("logs", "signal-engine.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the writer alive for the program duration
    Box::leak(Box::new(guard));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("smc_signal_engine=debug".parse()?)
                .add_directive(Level::INFO.into()),
        )
        .with_writer(std::io::stdout.and(file_writer))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .init();

    Ok(())
}

fn log_config(config: &Config) {
    info!("📋 Configuration:");
    info!(
        "   Mode: {} ({})",
        if config.exchange.demo { "DEMO" } else { "LIVE" },
        config.exchange.base_url()
    );
    if !config.exchange.has_credentials() {
        info!("   No API keys provided, account endpoints will be rejected");
    }
    info!(
        "   Risk per trade: {:.2}% at {}x leverage",
        config.trading.risk_fraction * Decimal::from(100),
        config.trading.leverage
    );
    info!(
        "   Setup strategy: {:?}, interval {}, {} candles",
        config.analysis.strategy, config.analysis.interval, config.analysis.kline_limit
    );
    info!(
        "   Scanner: top {} movers per side, min volume {}",
        config.scan.top_n, config.scan.min_quote_volume
    );
}

fn log_report(report: &AnalysisReport) {
    info!(
        symbol = %report.symbol,
        price = %format_price(report.price),
        trend = %report.verdict.trend,
        long_votes = report.verdict.long_votes,
        short_votes = report.verdict.short_votes,
        rsi = %report.rsi_status(),
        "Analysis"
    );
    info!("   Order blocks: {}", report.order_blocks.describe());
    info!("   Fair value gaps: {}", report.fair_value_gaps.describe());
    info!("   Setup: {}", report.setup);
}

async fn run_watch(config: &Config, client: Arc<BingxClient>, symbol: &str, interval: &str) -> Result<()> {
    let analyzer = Analyzer::from_config(&config.analysis);
    let mut tracker = SymbolTracker::new(Arc::clone(&client), analyzer, &config.analysis);
    let mut poller = PricePoller::new(client, config.analysis.price_poll_interval());

    let mut reports = tracker.subscribe();
    let mut prices = poller.subscribe();
    tracker.track(symbol, interval);
    poller.track(symbol);

    info!("🚀 Watching {} on {} (Ctrl-C to stop)", symbol, interval);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("🛑 Shutdown signal received");
                break;
            }
            changed = reports.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = reports.borrow_and_update().clone();
                if let Some(err) = &state.last_error {
                    warn!(cycles = state.cycles, error = %err, "Latest cycle failed, keeping previous report");
                } else if let Some(report) = &state.report {
                    log_report(report);
                }
            }
            changed = prices.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(tick) = prices.borrow_and_update().clone() {
                    tracing::debug!(symbol = %tick.symbol, price = %format_price(tick.price), "Price");
                }
            }
        }
    }

    tracker.stop();
    info!("👋 Watch stopped");
    Ok(())
}

async fn run_scan(config: &Config, client: &BingxClient) -> Result<()> {
    let scanner = OpportunityScanner::new(config.scan.clone(), Analyzer::from_config(&config.analysis));

    let opportunities = tokio::select! {
        result = scanner.scan(client) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("🛑 Scan cancelled");
            return Ok(());
        }
    };

    if opportunities.is_empty() {
        info!("No opportunities found");
        return Ok(());
    }

    info!("🎯 {} opportunities:", opportunities.len());
    for o in &opportunities {
        info!(
            "   {:<14} {:<5} entry {} TP {} SL {} ({}, score {}/6)",
            o.symbol,
            o.side.to_string(),
            format_price(o.entry_price),
            format_price(o.take_profit),
            format_price(o.stop_loss),
            o.trend,
            o.score
        );
    }
    Ok(())
}

async fn run_trade(
    config: &Config,
    client: &BingxClient,
    symbol: &str,
    interval: &str,
    dry_run: bool,
    protect: bool,
) -> Result<()> {
    let analyzer = Analyzer::from_config(&config.analysis);
    let report = analysis_cycle(client, &analyzer, symbol, interval, config.analysis.kline_limit)
        .await
        .with_context(|| format!("Failed to analyse {}", symbol))?;
    log_report(&report);

    let setup = match &report.setup {
        SetupOutcome::Ready(setup) if setup.has_valid_levels() => *setup,
        SetupOutcome::Ready(setup) => bail!("Setup levels are inconsistent: {}", setup),
        other => {
            info!("Nothing to trade: {}", other);
            return Ok(());
        }
    };

    let executor = OrderExecutor::new(config.trading.clone());

    if dry_run {
        let plan = executor
            .plan(client, symbol, &setup, report.price, protect)
            .await?;
        info!("📝 Dry run, balance {}:", plan.balance);
        for order in std::iter::once(&plan.entry)
            .chain(plan.take_profit.iter())
            .chain(plan.stop_loss.iter())
        {
            info!("   {:?}", order.to_params());
        }
        return Ok(());
    }

    if !config.exchange.demo {
        warn!("⚠️  LIVE TRADING MODE - Real money at risk!");
    }

    match executor
        .execute(client, symbol, &setup, report.price, protect)
        .await
    {
        Ok(result) if result.is_protected() || !protect => {
            info!("✅ {}", result.summary());
            Ok(())
        }
        Ok(result) => {
            error!("❌ {}", result.summary());
            Ok(())
        }
        Err(e) => {
            error!("❌ Order not placed: {}", e);
            Err(e.into())
        }
    }
}

async fn list_symbols(client: &BingxClient) -> Result<()> {
    let contracts = client.contracts().await?;
    let mut symbols: Vec<&str> = contracts
        .iter()
        .filter(|c| c.is_trading())
        .map(|c| c.symbol.as_str())
        .collect();
    symbols.sort_unstable();

    info!("{} tradable contracts", symbols.len());
    for chunk in symbols.chunks(8) {
        info!("   {}", chunk.join("  "));
    }
    Ok(())
}

async fn run_advise(config: &Config, client: &BingxClient, symbol: &str, interval: &str) -> Result<()> {
    let analyzer = Analyzer::from_config(&config.analysis);
    let report = analysis_cycle(client, &analyzer, symbol, interval, config.analysis.kline_limit)
        .await
        .with_context(|| format!("Failed to analyse {}", symbol))?;
    log_report(&report);

    let advisory = AdvisoryClient::new(&config.advisory)?;
    let answer = advisory.ask(&AdvisoryRequest::from_report(&report)).await?;
    info!("🤖 Advisory:\n{}", answer);
    Ok(())
}
