//! Exchange integration.
//!
//! ## BingX
//! Perpetual swap REST API:
//! - Market data (ticker, klines, contract list, 24h statistics)
//! - Signed account operations (balance, order placement)
//!
//! ## Advisory
//! Thin client for the advisory backend that comments on an analysis report.

pub mod advisory;
mod client;
mod error;
pub mod signing;
mod traits;
mod types;

pub use advisory::{AdvisoryClient, AdvisoryRequest};
pub use client::BingxClient;
pub use error::{ExchangeError, ExchangeResult};
pub use signing::{canonical_query, sign, Credentials, SignedRequest};
pub use traits::{MarketDataProvider, TradingApi};
#[cfg(test)]
pub use traits::{MockMarketDataProvider, MockTradingApi};
pub use types::*;
