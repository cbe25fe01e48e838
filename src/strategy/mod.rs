//! Signal generation and execution.
//!
//! Contains the core logic for:
//! - Smart-money level detection (order blocks, fair value gaps)
//! - Six-rule indicator consensus and trend labelling
//! - Trade setup derivation (ATR ladder, hybrid pullback)
//! - Market scanning, background tracking and order execution

mod analyzer;
mod consensus;
mod executor;
mod scanner;
mod setup;
mod smc;
mod tracker;

pub use analyzer::{AnalysisReport, Analyzer};
pub use consensus::{evaluate, Abstention, ConsensusVerdict, Rule, TrendLabel, Vote, STRONG_VOTES};
pub use executor::{
    calculate_quantity, quantize_level, quantize_quantity, ExecutionError, ExecutionReport,
    OrderExecutor, OrderPlan, Protection, ProtectionFailure,
};
pub use scanner::{rank_movers, Movers, OpportunityScanner, ScanError, TradeOpportunity};
pub use setup::{
    atr_ladder_setup, hybrid_setup, EntryReason, SetupOutcome, SetupStrategy, TradeSetup, TradeSide,
    HYBRID_MIN_CANDLES, LADDER_STOP_ATR, LADDER_TARGET_ATR,
};
pub use smc::{
    fair_value_gaps, find_fair_value_gap, find_order_block, order_blocks, SmcKind, SmcLevel,
    SmcScan, DISPLACEMENT_BODY_RATIO, SMC_WINDOW,
};
pub use tracker::{analysis_cycle, PricePoller, PriceTick, SymbolTracker, TrackerState};
