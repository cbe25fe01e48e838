//! Collaborator seams between the engine and the exchange.
//!
//! The analysis loop and scanner only read market data; the executor also
//! needs the signed account endpoints. Splitting the two lets read-only
//! callers run without credentials.

use super::error::ExchangeResult;
use super::types::{AccountBalance, Contract, MarketTicker, OrderAck, OrderRequest, Ticker};
use crate::market::Candle;
use async_trait::async_trait;

/// Public market data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Last price for one symbol.
    async fn ticker(&self, symbol: &str) -> ExchangeResult<Ticker>;

    /// Candles ordered oldest-first, malformed bars removed.
    async fn klines(&self, symbol: &str, interval: &str, limit: u32) -> ExchangeResult<Vec<Candle>>;

    /// 24h statistics for every listed symbol.
    async fn market_tickers(&self) -> ExchangeResult<Vec<MarketTicker>>;

    async fn contracts(&self) -> ExchangeResult<Vec<Contract>>;
}

/// Signed account operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TradingApi: Send + Sync {
    async fn balance(&self) -> ExchangeResult<AccountBalance>;

    async fn place_order(&self, order: &OrderRequest) -> ExchangeResult<OrderAck>;
}
