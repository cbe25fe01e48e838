//! # SMC Signal Engine
//!
//! Technical-analysis and order-execution engine for BingX perpetual swaps.
//!
//! ## Architecture
//!
//! - `config`: Configuration loading and validation
//! - `exchange`: BingX REST client, request signing, advisory backend client
//! - `market`: Candle model and series hygiene
//! - `indicators`: EMA, RSI, ATR, DMI/ADX, Alligator, Aroon, MFI, CMF, OBV
//! - `strategy`: SMC levels, consensus, setups, scanner, tracker and executor
//! - `utils`: Shared decimal arithmetic and price formatting

pub mod config;
pub mod exchange;
pub mod indicators;
pub mod market;
pub mod strategy;
pub mod utils;

pub use config::Config;
