// 6.0: the AMM engine. one collateral pool backing a list of option markets.
// prices through the oracle, trades on the bonding curve, reprices IV from fills,
// settles at expiry. deterministic, no I/O beyond tracing.

mod config;
mod core;
mod pricing;
mod results;
mod settlement;
mod trading;

pub use config::AmmConfig;
pub use core::MinterAmm;
pub use results::{AmmError, SettledMarket, SettlementReport, TradeQuote, TradeResult};
