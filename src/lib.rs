// minter-amm: bonding-curve option AMM.
// one collateral pool writes weekly options, prices them through an oracle,
// trades bToken/wToken on a curve and reprices IV from every fill.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: MarketId, OptionType, Token, Timestamp, IV units
//   2.x  market.rs: option terms, settlement payout, per-market engine slot
//   3.x  oracle.rs: PricingOracle, Black-Scholes, strike-for-delta search
//   4.x  curve.rs: virtual reserves, collateral in/out, fee rule
//   5.x  volatility.rs: IV decay, vega impact step, realized/implied vol
//   6.x  engine/: MinterAmm: listing, quotes, trades, settlement, valuation
//   7.x  events.rs: state transition events for audit
//   8.x  config.rs: simulation config, presets, validation
//   9.x  expiry.rs: Friday 08:00 UTC calendar
//   10.x paths.rs: bootstrap and synthetic hourly price paths
//   11.x strategy.rs: trade sizing and perpetual delta hedging
//   12.x simulation.rs: weekly driver state machine and records

// core amm modules
pub mod curve;
pub mod engine;
pub mod events;
pub mod market;
pub mod oracle;
pub mod types;
pub mod volatility;

// simulation modules
pub mod config;
pub mod expiry;
pub mod paths;
pub mod simulation;
pub mod strategy;

// re exports for convenience
pub use config::{ConfigError, Preset, SimulationConfig};
pub use curve::*;
pub use engine::*;
pub use events::*;
pub use expiry::*;
pub use market::*;
pub use oracle::*;
pub use paths::*;
pub use simulation::*;
pub use strategy::*;
pub use types::*;
pub use volatility::*;
