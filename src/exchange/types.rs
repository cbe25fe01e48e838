//! Type definitions for BingX perpetual swap API payloads.

use super::error::{ExchangeError, ExchangeResult};
use crate::market::Candle;
use crate::strategy::TradeSide;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Common `{code, msg, data}` envelope. `code == 0` means success.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Unwrap the envelope: non-zero code is a rejection, missing data is malformed.
    pub fn into_data(self) -> ExchangeResult<T> {
        if self.code != 0 {
            return Err(ExchangeError::Rejected {
                code: self.code,
                msg: self.msg.unwrap_or_default(),
            });
        }
        self.data
            .ok_or_else(|| ExchangeError::Malformed("response carried no data".to_string()))
    }
}

/// Last-price ticker for one symbol.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    pub symbol: String,
    pub last_price: Decimal,
    #[serde(default)]
    pub high_price: Option<Decimal>,
    #[serde(default)]
    pub low_price: Option<Decimal>,
    #[serde(default)]
    pub volume: Option<Decimal>,
}

/// Raw kline. Prices arrive as strings or numbers depending on the endpoint
/// version; both deserialize into `Decimal`.
#[derive(Debug, Clone, Deserialize)]
pub struct Kline {
    pub time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl From<Kline> for Candle {
    fn from(k: Kline) -> Self {
        Candle::new(k.time, k.open, k.high, k.low, k.close, k.volume)
    }
}

/// Contract listing entry.
#[derive(Debug, Clone, Deserialize)]
pub struct Contract {
    pub symbol: String,
    /// 1 = trading, 0 = suspended
    #[serde(default)]
    pub status: Option<i64>,
}

impl Contract {
    /// Contracts without a status are assumed tradable.
    pub fn is_trading(&self) -> bool {
        self.status.map_or(true, |s| s == 1)
    }
}

/// 24h statistics row from the all-symbols ticker.
///
/// Numeric fields stay as received so a single bad row can be skipped
/// instead of failing the whole batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketTicker {
    pub symbol: String,
    #[serde(default)]
    pub last_price: Option<String>,
    #[serde(default)]
    pub price_change_percent: Option<String>,
    #[serde(default)]
    pub quote_volume: Option<String>,
}

fn parse_field(raw: &Option<String>) -> Option<Decimal> {
    raw.as_deref()
        .map(|s| s.trim().trim_end_matches('%'))
        .and_then(|s| Decimal::from_str(s).ok())
}

impl MarketTicker {
    pub fn last_price(&self) -> Option<Decimal> {
        parse_field(&self.last_price)
    }

    pub fn percent_change(&self) -> Option<Decimal> {
        parse_field(&self.price_change_percent)
    }

    /// Missing volume counts as zero liquidity.
    pub fn quote_volume(&self) -> Decimal {
        parse_field(&self.quote_volume).unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceData {
    #[serde(default)]
    pub balance: Option<AccountBalance>,
}

/// Perpetual account balance.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    #[serde(default)]
    pub equity: Option<Decimal>,
    #[serde(default)]
    pub balance: Option<Decimal>,
    #[serde(default)]
    pub available_margin: Option<Decimal>,
}

impl AccountBalance {
    /// Funds usable for a new position: available margin, then wallet
    /// balance, then equity.
    pub fn usable(&self) -> Option<Decimal> {
        self.available_margin.or(self.balance).or(self.equity)
    }
}

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl From<TradeSide> for OrderSide {
    fn from(side: TradeSide) -> Self {
        match side {
            TradeSide::Long => OrderSide::Buy,
            TradeSide::Short => OrderSide::Sell,
        }
    }
}

/// Hedge-mode position side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Long => "LONG",
            PositionSide::Short => "SHORT",
        }
    }
}

impl From<TradeSide> for PositionSide {
    fn from(side: TradeSide) -> Self {
        match side {
            TradeSide::Long => PositionSide::Long,
            TradeSide::Short => PositionSide::Short,
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    StopMarket,
    TakeProfitMarket,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::StopMarket => "STOP_MARKET",
            OrderType::TakeProfitMarket => "TAKE_PROFIT_MARKET",
        }
    }
}

/// Price basis for trigger orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkingType {
    MarkPrice,
    ContractPrice,
}

impl WorkingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkingType::MarkPrice => "MARK_PRICE",
            WorkingType::ContractPrice => "CONTRACT_PRICE",
        }
    }
}

/// New order request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub position_side: PositionSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub stop_price: Option<Decimal>,
    pub working_type: Option<WorkingType>,
    pub leverage: Option<u32>,
}

impl OrderRequest {
    /// Market entry opening a position on `side`.
    pub fn market_entry(symbol: &str, side: TradeSide, quantity: Decimal, leverage: u32) -> Self {
        Self {
            symbol: symbol.to_string(),
            side: side.into(),
            position_side: side.into(),
            order_type: OrderType::Market,
            quantity,
            stop_price: None,
            working_type: None,
            leverage: Some(leverage),
        }
    }

    /// Mark-price trigger closing a `side` position at `stop_price`.
    pub fn protective_trigger(
        symbol: &str,
        side: TradeSide,
        order_type: OrderType,
        quantity: Decimal,
        stop_price: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            side: OrderSide::from(side).opposite(),
            position_side: side.into(),
            order_type,
            quantity,
            stop_price: Some(stop_price),
            working_type: Some(WorkingType::MarkPrice),
            leverage: None,
        }
    }

    /// Query parameters, excluding timestamp and signature.
    pub fn to_params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("symbol".to_string(), self.symbol.clone());
        params.insert("side".to_string(), self.side.as_str().to_string());
        params.insert("positionSide".to_string(), self.position_side.as_str().to_string());
        params.insert("type".to_string(), self.order_type.as_str().to_string());
        params.insert("quantity".to_string(), self.quantity.normalize().to_string());

        if let Some(price) = &self.stop_price {
            params.insert("stopPrice".to_string(), price.to_string());
        }
        if let Some(working_type) = &self.working_type {
            params.insert("workingType".to_string(), working_type.as_str().to_string());
        }
        if let Some(leverage) = self.leverage {
            params.insert("leverage".to_string(), leverage.to_string());
        }
        params
    }
}

/// Accepted order. The payload shape varies by order type, so it is kept raw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderAck {
    pub data: serde_json::Value,
}

impl OrderAck {
    pub fn order_id(&self) -> Option<String> {
        let id = self.data.pointer("/order/orderId").or_else(|| self.data.get("orderId"))?;
        match id {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_envelope_rejection() {
        let raw = r#"{"code":80012,"msg":"Insufficient margin","data":{}}"#;
        let resp: ApiResponse<serde_json::Value> = serde_json::from_str(raw).unwrap();
        match resp.into_data() {
            Err(ExchangeError::Rejected { code, msg }) => {
                assert_eq!(code, 80012);
                assert_eq!(msg, "Insufficient margin");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    fn decode_envelope<T: serde::de::DeserializeOwned>(raw: &str) -> ExchangeResult<T> {
        serde_json::from_str::<ApiResponse<T>>(raw).unwrap().into_data()
    }

    #[test]
    fn test_envelope_decodes_payload_without_default() {
        let ticker: Ticker =
            decode_envelope(r#"{"code":0,"data":{"symbol":"BTC-USDT","lastPrice":"97000.5"}}"#).unwrap();
        assert_eq!(ticker.last_price, dec!(97000.5));
        let missing = decode_envelope::<Ticker>(r#"{"code":0}"#);
        assert!(matches!(missing, Err(ExchangeError::Malformed(_))));
    }

    #[test]
    fn test_envelope_missing_data_is_malformed() {
        let resp: ApiResponse<Ticker> = serde_json::from_str(r#"{"code":0,"msg":""}"#).unwrap();
        assert!(matches!(resp.into_data(), Err(ExchangeError::Malformed(_))));
    }

    #[test]
    fn test_kline_accepts_strings_and_numbers() {
        let raw = r#"[
            {"time":1700000060000,"open":"100.5","high":"101","low":"99.5","close":"100","volume":"12.3"},
            {"time":1700000000000,"open":100,"high":102.25,"low":98,"close":101,"volume":8}
        ]"#;
        let klines: Vec<Kline> = serde_json::from_str(raw).unwrap();
        let candles: Vec<Candle> = klines.into_iter().map(Candle::from).collect();
        assert_eq!(candles[0].open, dec!(100.5));
        assert_eq!(candles[1].high, dec!(102.25));
    }

    #[test]
    fn test_market_ticker_tolerates_bad_numbers() {
        let raw = r#"{"symbol":"PEPE-USDT","lastPrice":"0.0000123","priceChangePercent":"n/a"}"#;
        let t: MarketTicker = serde_json::from_str(raw).unwrap();
        assert_eq!(t.last_price(), Some(dec!(0.0000123)));
        assert_eq!(t.percent_change(), None);
        assert_eq!(t.quote_volume(), Decimal::ZERO);
    }

    #[test]
    fn test_balance_fallback_order() {
        let raw = r#"{"balance":{"equity":"120","balance":"110"}}"#;
        let data: BalanceData = serde_json::from_str(raw).unwrap();
        assert_eq!(data.balance.unwrap().usable(), Some(dec!(110)));

        let full = AccountBalance {
            equity: Some(dec!(120)),
            balance: Some(dec!(110)),
            available_margin: Some(dec!(90)),
        };
        assert_eq!(full.usable(), Some(dec!(90)));
    }

    #[test]
    fn test_market_entry_params() {
        let order = OrderRequest::market_entry("BTC-USDT", TradeSide::Long, dec!(0.0004), 20);
        let params = order.to_params();
        assert_eq!(params["side"], "BUY");
        assert_eq!(params["positionSide"], "LONG");
        assert_eq!(params["type"], "MARKET");
        assert_eq!(params["quantity"], "0.0004");
        assert_eq!(params["leverage"], "20");
        assert!(!params.contains_key("stopPrice"));
    }

    #[test]
    fn test_protective_trigger_closes_opposite_side() {
        let order = OrderRequest::protective_trigger(
            "ETH-USDT",
            TradeSide::Short,
            OrderType::StopMarket,
            dec!(1.5),
            dec!(2510.25),
        );
        let params = order.to_params();
        assert_eq!(params["side"], "BUY");
        assert_eq!(params["positionSide"], "SHORT");
        assert_eq!(params["type"], "STOP_MARKET");
        assert_eq!(params["stopPrice"], "2510.25");
        assert_eq!(params["workingType"], "MARK_PRICE");
    }

    #[test]
    fn test_order_ack_id() {
        let ack = OrderAck {
            data: serde_json::json!({"order": {"orderId": 1735950529123455488i64}}),
        };
        assert_eq!(ack.order_id().as_deref(), Some("1735950529123455488"));
    }

    #[test]
    fn test_contract_status() {
        let contracts: Vec<Contract> =
            serde_json::from_str(r#"[{"symbol":"BTC-USDT","status":1},{"symbol":"OLD-USDT","status":0},{"symbol":"X-USDT"}]"#)
                .unwrap();
        let live: Vec<bool> = contracts.iter().map(Contract::is_trading).collect();
        assert_eq!(live, vec![true, false, true]);
    }
}
