//! Risk-sized order execution with separate protective trigger orders.
//!
//! Flow: fetch balance, size the position, send a market entry, then place the
//! take-profit and stop-loss as mark-price trigger orders on the opposite side.
//! Nothing is retried. A failed entry stops the pipeline before any trigger is
//! sent; a failed trigger leaves the filled entry in place and is reported as
//! partial protection.

use super::setup::{TradeSetup, TradeSide};
use crate::config::TradingConfig;
use crate::exchange::{ExchangeError, OrderAck, OrderRequest, OrderType, TradingApi};
use crate::utils::decimal::{decimal_places, div, format_price, round_down, round_half_up};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;
use tracing::{error, info, warn};

/// Coins priced below this trade in whole units.
const WHOLE_UNIT_PRICE: Decimal = dec!(10);
/// Quantity decimals for everything else.
const QUANTITY_DECIMALS: u32 = 4;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("balance {available} is at or below the minimum of {minimum}")]
    InsufficientBalance { available: Decimal, minimum: Decimal },

    #[error("quantity too small: {raw} rounds to zero")]
    InvalidQuantity { raw: Decimal },

    #[error("invalid price: {0}")]
    InvalidPrice(String),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

/// Round a raw quantity down to what the venue accepts for a coin at `price`.
pub fn quantize_quantity(raw: Decimal, price: Decimal) -> Decimal {
    if price < WHOLE_UNIT_PRICE {
        round_down(raw, 0)
    } else {
        round_down(raw, QUANTITY_DECIMALS)
    }
}

/// Position size in coins: `balance * risk_fraction * leverage / price`,
/// quantized downward. Returns zero when `price <= 0` or the balance does not
/// exceed `min_balance`; never negative.
pub fn calculate_quantity(
    balance: Decimal,
    risk_fraction: Decimal,
    leverage: u32,
    price: Decimal,
    min_balance: Decimal,
) -> Decimal {
    if price <= Decimal::ZERO || balance <= min_balance || risk_fraction <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let margin = balance * risk_fraction;
    let notional = margin * Decimal::from(leverage);
    // Truncate the exact ratio; rounding it first can push it over a lot boundary.
    let raw = notional.checked_div(price).unwrap_or(Decimal::ZERO);
    quantize_quantity(raw, price).max(Decimal::ZERO)
}

/// Round a trigger level to the precision of the formatted reference price.
pub fn quantize_level(level: Decimal, reference_price: Decimal) -> Decimal {
    let decimals = decimal_places(&format_price(reference_price));
    let mut rounded = round_half_up(level, decimals);
    rounded.rescale(decimals);
    rounded
}

/// Orders ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlan {
    pub balance: Decimal,
    pub entry: OrderRequest,
    pub take_profit: Option<OrderRequest>,
    pub stop_loss: Option<OrderRequest>,
}

impl OrderPlan {
    pub fn quantity(&self) -> Decimal {
        self.entry.quantity
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionFailure {
    pub order_type: OrderType,
    pub trigger_price: Decimal,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protection {
    /// Both triggers accepted.
    Full,
    /// Entry filled, at least one trigger rejected.
    Partial(Vec<ProtectionFailure>),
    /// Entry sent without triggers.
    Unrequested,
}

#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: Decimal,
    pub entry: OrderAck,
    pub protection: Protection,
}

impl ExecutionReport {
    pub fn is_protected(&self) -> bool {
        self.protection == Protection::Full
    }

    /// One-line outcome for the operator.
    pub fn summary(&self) -> String {
        let opened = format!("{} {} {} opened", self.side, self.quantity, self.symbol);
        match &self.protection {
            Protection::Full => format!("{}, TP/SL placed", opened),
            Protection::Unrequested => format!("{} without TP/SL", opened),
            Protection::Partial(failures) => {
                let detail = failures
                    .iter()
                    .map(|f| format!("{} at {} failed: {}", f.order_type.as_str(), f.trigger_price, f.reason))
                    .collect::<Vec<_>>()
                    .join("; ");
                format!("{} but position is UNPROTECTED ({})", opened, detail)
            }
        }
    }
}

/// Sizes and submits orders for a trade setup.
pub struct OrderExecutor {
    config: TradingConfig,
}

impl OrderExecutor {
    pub fn new(config: TradingConfig) -> Self {
        Self { config }
    }

    /// Fetch the balance and build the entry plus trigger orders, sending nothing.
    ///
    /// `reference_price` is the live price the entry will fill near; trigger
    /// levels are quantized to its display precision.
    pub async fn plan<T: TradingApi + ?Sized>(
        &self,
        api: &T,
        symbol: &str,
        setup: &TradeSetup,
        reference_price: Decimal,
        protect: bool,
    ) -> Result<OrderPlan, ExecutionError> {
        if reference_price <= Decimal::ZERO {
            return Err(ExecutionError::InvalidPrice(format!(
                "reference price {} must be positive",
                reference_price
            )));
        }

        let triggers = if protect {
            let take_profit = quantize_level(setup.take_profit, reference_price);
            let stop_loss = quantize_level(setup.stop_loss, reference_price);
            if take_profit <= Decimal::ZERO || stop_loss <= Decimal::ZERO {
                return Err(ExecutionError::InvalidPrice(format!(
                    "TP {} / SL {} must both be positive",
                    take_profit, stop_loss
                )));
            }
            Some((take_profit, stop_loss))
        } else {
            None
        };

        let account = api.balance().await?;
        let available = account.usable().unwrap_or(Decimal::ZERO);
        if available <= self.config.min_balance {
            return Err(ExecutionError::InsufficientBalance {
                available,
                minimum: self.config.min_balance,
            });
        }

        let quantity = calculate_quantity(
            available,
            self.config.risk_fraction,
            self.config.leverage,
            reference_price,
            self.config.min_balance,
        );
        if quantity.is_zero() {
            let raw = div(
                available * self.config.risk_fraction * Decimal::from(self.config.leverage),
                reference_price,
            );
            return Err(ExecutionError::InvalidQuantity { raw });
        }

        let entry = OrderRequest::market_entry(symbol, setup.side, quantity, self.config.leverage);
        let (take_profit, stop_loss) = match triggers {
            Some((tp, sl)) => (
                Some(OrderRequest::protective_trigger(
                    symbol,
                    setup.side,
                    OrderType::TakeProfitMarket,
                    quantity,
                    tp,
                )),
                Some(OrderRequest::protective_trigger(
                    symbol,
                    setup.side,
                    OrderType::StopMarket,
                    quantity,
                    sl,
                )),
            ),
            None => (None, None),
        };

        Ok(OrderPlan {
            balance: available,
            entry,
            take_profit,
            stop_loss,
        })
    }

    /// Plan and send: market entry first, then the protective triggers.
    pub async fn execute<T: TradingApi + ?Sized>(
        &self,
        api: &T,
        symbol: &str,
        setup: &TradeSetup,
        reference_price: Decimal,
        protect: bool,
    ) -> Result<ExecutionReport, ExecutionError> {
        let plan = self
            .plan(api, symbol, setup, reference_price, protect)
            .await?;

        info!(
            %symbol,
            side = %setup.side,
            quantity = %plan.quantity(),
            balance = %plan.balance,
            leverage = self.config.leverage,
            "Submitting market entry"
        );

        let entry = match api.place_order(&plan.entry).await {
            Ok(ack) => ack,
            Err(e) => {
                error!(%symbol, error = %e, "Entry order failed, no triggers sent");
                return Err(e.into());
            }
        };
        info!(%symbol, order_id = ?entry.order_id(), "Entry order accepted");

        let triggers: Vec<OrderRequest> = plan
            .take_profit
            .iter()
            .chain(plan.stop_loss.iter())
            .cloned()
            .collect();

        let protection = if triggers.is_empty() {
            Protection::Unrequested
        } else {
            let mut failures = Vec::new();
            for trigger in &triggers {
                let trigger_price = trigger.stop_price.unwrap_or_default();
                match api.place_order(trigger).await {
                    Ok(ack) => info!(
                        %symbol,
                        order_type = trigger.order_type.as_str(),
                        %trigger_price,
                        order_id = ?ack.order_id(),
                        "Protective order placed"
                    ),
                    Err(e) => {
                        warn!(
                            %symbol,
                            order_type = trigger.order_type.as_str(),
                            %trigger_price,
                            error = %e,
                            "Protective order failed, position left open"
                        );
                        failures.push(ProtectionFailure {
                            order_type: trigger.order_type,
                            trigger_price,
                            reason: e.to_string(),
                        });
                    }
                }
            }
            if failures.is_empty() {
                Protection::Full
            } else {
                Protection::Partial(failures)
            }
        };

        Ok(ExecutionReport {
            symbol: symbol.to_string(),
            side: setup.side,
            quantity: plan.quantity(),
            entry,
            protection,
        })
    }
}
