//! BingX perpetual swap REST client.

use super::error::{ExchangeError, ExchangeResult};
use super::signing::Credentials;
use super::traits::{MarketDataProvider, TradingApi};
use super::types::*;
use crate::config::ExchangeConfig;
use crate::market::{into_chronological, Candle};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

const TICKER_PATH: &str = "/openApi/swap/v2/quote/ticker";
const KLINES_PATH: &str = "/openApi/swap/v3/quote/klines";
const CONTRACTS_PATH: &str = "/openApi/swap/v2/quote/contracts";
const BALANCE_PATH: &str = "/openApi/swap/v2/user/balance";
const ORDER_PATH: &str = "/openApi/swap/v2/trade/order";

const API_KEY_HEADER: &str = "X-BX-APIKEY";

/// BingX API client. The demo/live choice is fixed at construction.
pub struct BingxClient {
    http: Client,
    credentials: Credentials,
    base_url: String,
}

impl BingxClient {
    /// Create a new client from configuration.
    pub fn new(config: &ExchangeConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            credentials: Credentials::new(config.api_key.clone(), config.secret_key.clone()),
            base_url: config.base_url().trim_end_matches('/').to_string(),
        })
    }

    /// Point the client at another host (mock servers, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check the status, then unwrap the `{code, msg, data}` envelope.
    async fn decode<T: DeserializeOwned>(response: Response) -> ExchangeResult<T> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ExchangeError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ApiResponse<T> =
            serde_json::from_str(&body).map_err(|e| ExchangeError::Malformed(e.to_string()))?;
        envelope.into_data()
    }

    async fn get_public<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> ExchangeResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.get(&url).query(query).send().await?;
        Self::decode(response).await
    }

    async fn send_signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: BTreeMap<String, String>,
    ) -> ExchangeResult<T> {
        let signed = self
            .credentials
            .sign_params(params, Utc::now().timestamp_millis());
        let url = signed.url(&self.base_url, path);

        let response = self
            .http
            .request(method, &url)
            .header(API_KEY_HEADER, &self.credentials.api_key)
            .send()
            .await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl MarketDataProvider for BingxClient {
    #[instrument(skip(self))]
    async fn ticker(&self, symbol: &str) -> ExchangeResult<Ticker> {
        self.get_public(TICKER_PATH, &[("symbol", symbol.to_string())])
            .await
    }

    #[instrument(skip(self))]
    async fn klines(&self, symbol: &str, interval: &str, limit: u32) -> ExchangeResult<Vec<Candle>> {
        let klines: Vec<Kline> = self
            .get_public(
                KLINES_PATH,
                &[
                    ("symbol", symbol.to_string()),
                    ("interval", interval.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        let received = klines.len();
        let candles = into_chronological(klines.into_iter().map(Candle::from).collect());
        debug!(received, kept = candles.len(), "Fetched klines");
        Ok(candles)
    }

    #[instrument(skip(self))]
    async fn market_tickers(&self) -> ExchangeResult<Vec<MarketTicker>> {
        self.get_public(TICKER_PATH, &[]).await
    }

    #[instrument(skip(self))]
    async fn contracts(&self) -> ExchangeResult<Vec<Contract>> {
        self.get_public(CONTRACTS_PATH, &[]).await
    }
}

#[async_trait]
impl TradingApi for BingxClient {
    #[instrument(skip(self))]
    async fn balance(&self) -> ExchangeResult<AccountBalance> {
        if self.credentials.is_empty() {
            warn!("Requesting balance without API credentials");
        }
        let data: BalanceData = self
            .send_signed(Method::GET, BALANCE_PATH, BTreeMap::new())
            .await?;
        data.balance
            .ok_or_else(|| ExchangeError::Malformed("balance payload missing".to_string()))
    }

    #[instrument(skip(self), fields(symbol = %order.symbol, order_type = order.order_type.as_str()))]
    async fn place_order(&self, order: &OrderRequest) -> ExchangeResult<OrderAck> {
        debug!("Placing order: {:?}", order);
        let data: serde_json::Value = self
            .send_signed(Method::POST, ORDER_PATH, order.to_params())
            .await?;
        Ok(OrderAck { data })
    }
}
