//! Advisory backend client: posts a market summary, returns free-text advice.

use crate::config::AdvisoryConfig;
use crate::strategy::{AnalysisReport, SetupOutcome};
use crate::utils::decimal::format_price;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

/// Market summary sent to the advisory backend. Every field is display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvisoryRequest {
    pub symbol: String,
    pub price: String,
    pub trend: String,
    pub rsi_status: String,
    pub ob_status: String,
    pub fvg_status: String,
    pub setup_entry: String,
    pub setup_tp: String,
    pub setup_sl: String,
}

impl AdvisoryRequest {
    pub fn from_report(report: &AnalysisReport) -> Self {
        let (setup_entry, setup_tp, setup_sl) = match &report.setup {
            SetupOutcome::Ready(s) => (
                format!("{} ({}, {})", format_price(s.entry_price), s.side, s.entry_reason),
                format_price(s.take_profit),
                format_price(s.stop_loss),
            ),
            other => (other.to_string(), "-".to_string(), "-".to_string()),
        };

        Self {
            symbol: report.symbol.clone(),
            price: format_price(report.price),
            trend: format!(
                "{} ({} long / {} short)",
                report.verdict.trend, report.verdict.long_votes, report.verdict.short_votes
            ),
            rsi_status: report.rsi_status(),
            ob_status: report.order_blocks.describe(),
            fvg_status: report.fair_value_gaps.describe(),
            setup_entry,
            setup_tp,
            setup_sl,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct AdvisoryResponse {
    ai_response: String,
}

pub struct AdvisoryClient {
    http: Client,
    url: String,
}

impl AdvisoryClient {
    pub fn new(config: &AdvisoryConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            url: config.url.clone(),
        })
    }

    #[instrument(skip(self, request), fields(symbol = %request.symbol))]
    pub async fn ask(&self, request: &AdvisoryRequest) -> Result<String> {
        let response = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .context("Failed to reach advisory backend")?
            .error_for_status()
            .context("Advisory backend returned an error status")?;

        let body: AdvisoryResponse = response
            .json()
            .await
            .context("Failed to parse advisory response")?;
        Ok(body.ai_response)
    }
}
