//! Configuration management for the signal engine.
//!
//! Loads settings from an optional `config.toml`, then environment variables
//! prefixed with `SIGNAL` (e.g. `SIGNAL__EXCHANGE__API_KEY`).

use crate::strategy::SetupStrategy;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEMO_BASE_URL: &str = "https://open-api-vst.bingx.com";
pub const LIVE_BASE_URL: &str = "https://open-api.bingx.com";

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Exchange credentials and trading mode
    #[serde(default)]
    pub exchange: ExchangeConfig,
    /// Position sizing
    #[serde(default)]
    pub trading: TradingConfig,
    /// Analysis loop and setup strategy
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Market-scan ranking
    #[serde(default)]
    pub scan: ScanConfig,
    /// Advisory backend
    #[serde(default)]
    pub advisory: AdvisoryConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// API key for authentication
    #[serde(default)]
    pub api_key: String,
    /// Secret key for signing requests
    #[serde(default)]
    pub secret_key: String,
    /// Trade virtual funds on the demo venue
    #[serde(default = "default_demo")]
    pub demo: bool,
    /// Overrides the demo/live base URL (tests, proxies)
    #[serde(default)]
    pub base_url: Option<String>,
}

impl ExchangeConfig {
    pub fn base_url(&self) -> &str {
        match &self.base_url {
            Some(url) => url.as_str(),
            None if self.demo => DEMO_BASE_URL,
            None => LIVE_BASE_URL,
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.secret_key.is_empty()
    }
}

impl std::fmt::Debug for ExchangeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeConfig")
            .field("api_key", &self.api_key)
            .field("secret_key", &"<redacted>")
            .field("demo", &self.demo)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Fraction of balance committed as margin per trade (0.0-1.0)
    #[serde(default = "default_risk_fraction")]
    pub risk_fraction: Decimal,
    /// Leverage applied to the margin
    #[serde(default = "default_leverage")]
    pub leverage: u32,
    /// Orders are refused at or below this balance
    #[serde(default = "default_min_balance")]
    pub min_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Kline timeframe for the tracked symbol
    #[serde(default = "default_interval")]
    pub interval: String,
    /// Candles requested per cycle
    #[serde(default = "default_kline_limit")]
    pub kline_limit: u32,
    /// Pause between analysis cycles
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Period of the price-only poller
    #[serde(default = "default_price_poll_interval_ms")]
    pub price_poll_interval_ms: u64,
    /// Setup calculator: `ladder` or `hybrid`
    #[serde(default)]
    pub strategy: SetupStrategy,
    /// Take-profit distance of the ATR ladder, in ATRs
    #[serde(default = "default_target_atr_multiple")]
    pub target_atr_multiple: Decimal,
}

impl AnalysisConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn price_poll_interval(&self) -> Duration {
        Duration::from_millis(self.price_poll_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Settlement currency suffix of candidate symbols
    #[serde(default = "default_quote_suffix")]
    pub quote_suffix: String,
    /// Gainers and losers taken from each side
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Minimum 24h quote volume
    #[serde(default = "default_min_quote_volume")]
    pub min_quote_volume: Decimal,
    /// Pause between candidates
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    /// Kline timeframe for batch analysis
    #[serde(default = "default_scan_interval")]
    pub interval: String,
    /// Candles requested per candidate
    #[serde(default = "default_kline_limit")]
    pub kline_limit: u32,
}

impl ScanConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryConfig {
    /// Endpoint receiving the market summary
    #[serde(default = "default_advisory_url")]
    pub url: String,
    #[serde(default = "default_advisory_timeout_secs")]
    pub timeout_secs: u64,
}

// Default value functions
fn default_demo() -> bool {
    true
}

fn default_risk_fraction() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_leverage() -> u32 {
    20
}

fn default_min_balance() -> Decimal {
    Decimal::new(5, 0)
}

fn default_interval() -> String {
    "1h".to_string()
}

fn default_kline_limit() -> u32 {
    1000
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_price_poll_interval_ms() -> u64 {
    2000
}

fn default_target_atr_multiple() -> Decimal {
    Decimal::new(4, 0)
}

fn default_quote_suffix() -> String {
    "-USDT".to_string()
}

fn default_top_n() -> usize {
    15
}

fn default_min_quote_volume() -> Decimal {
    Decimal::new(1_000_000, 0)
}

fn default_request_delay_ms() -> u64 {
    150
}

fn default_scan_interval() -> String {
    "15m".to_string()
}

fn default_advisory_url() -> String {
    "http://127.0.0.1:8000/ask-ai".to_string()
}

fn default_advisory_timeout_secs() -> u64 {
    60
}

impl Config {
    /// Load configuration from environment variables and config files.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("SIGNAL").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.trading.risk_fraction > Decimal::ZERO && self.trading.risk_fraction <= Decimal::ONE,
            "risk_fraction must be between 0 and 1"
        );

        anyhow::ensure!(
            (1..=125).contains(&self.trading.leverage),
            "leverage must be between 1 and 125"
        );

        anyhow::ensure!(
            self.trading.min_balance >= Decimal::ZERO,
            "min_balance must not be negative"
        );

        anyhow::ensure!(self.scan.top_n >= 1, "top_n must be at least 1");

        anyhow::ensure!(
            self.analysis.poll_interval_ms > 0 && self.analysis.price_poll_interval_ms > 0,
            "poll intervals must be non-zero"
        );

        anyhow::ensure!(
            self.analysis.kline_limit > 0 && self.scan.kline_limit > 0,
            "kline_limit must be non-zero"
        );

        anyhow::ensure!(
            self.analysis.target_atr_multiple > Decimal::ZERO,
            "target_atr_multiple must be positive"
        );

        Ok(())
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            secret_key: String::new(),
            demo: default_demo(),
            base_url: None,
        }
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            risk_fraction: default_risk_fraction(),
            leverage: default_leverage(),
            min_balance: default_min_balance(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            kline_limit: default_kline_limit(),
            poll_interval_ms: default_poll_interval_ms(),
            price_poll_interval_ms: default_price_poll_interval_ms(),
            strategy: SetupStrategy::default(),
            target_atr_multiple: default_target_atr_multiple(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            quote_suffix: default_quote_suffix(),
            top_n: default_top_n(),
            min_quote_volume: default_min_quote_volume(),
            request_delay_ms: default_request_delay_ms(),
            interval: default_scan_interval(),
            kline_limit: default_kline_limit(),
        }
    }
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            url: default_advisory_url(),
            timeout_secs: default_advisory_timeout_secs(),
        }
    }
}
