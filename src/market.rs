//! Option market descriptor and per-market engine state.
//!
//! A `Market` is the immutable contract: strike, expiration, and the payout rule
//! applied at settlement. A `MarketSlot` is the engine's mutable record for one
//! listed market, stored in an append-only arena and addressed by `MarketId`.

use crate::types::{MarketId, OptionType, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Static option terms (immutable after listing)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub strike: f64,
    pub expiration: Timestamp,
}

/// How the collateral behind one bToken/wToken pair splits at settlement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SettlementShares {
    pub buyer: f64,
    pub writer: f64,
}

impl SettlementShares {
    pub fn total(&self) -> f64 {
        self.buyer + self.writer
    }
}

impl Market {
    pub fn new(strike: f64, expiration: Timestamp) -> Self {
        debug_assert!(strike > 0.0);
        Self { strike, expiration }
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expiration <= now
    }

    /// Payout split at `settlement_price`.
    ///
    /// Calls return normalized shares summing to 1 (collateral is the underlying).
    /// Puts return amounts in price units: the writer keeps `strike` when OTM,
    /// otherwise `settlement_price`, and the buyer gets `strike - settlement_price`.
    /// Downstream scaling depends on this asymmetry, keep it.
    pub fn settlement_amounts(&self, settlement_price: f64, option_type: OptionType) -> SettlementShares {
        match option_type {
            OptionType::Call => {
                if settlement_price <= self.strike {
                    SettlementShares { buyer: 0.0, writer: 1.0 }
                } else {
                    let writer = self.strike / settlement_price;
                    SettlementShares { buyer: 1.0 - writer, writer }
                }
            }
            OptionType::Put => {
                if settlement_price >= self.strike {
                    SettlementShares { buyer: 0.0, writer: self.strike }
                } else {
                    SettlementShares {
                        buyer: self.strike - settlement_price,
                        writer: settlement_price,
                    }
                }
            }
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Strike: {}, Expiration Date: {}", self.strike, self.expiration)
    }
}

/// Dynamic per-market state (changes during trading)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSlot {
    pub id: MarketId,
    pub market: Market,
    /// Pool-held bToken inventory
    pub b_token_reserve: f64,
    /// Pool-held wToken inventory
    pub w_token_reserve: f64,
    /// IV in per-second units as of `iv_updated`
    pub iv: f64,
    pub iv_updated: Timestamp,
    /// Monotonic: false -> true once
    pub settled: bool,
}

impl MarketSlot {
    pub fn new(id: MarketId, market: Market, iv: f64, listed_at: Timestamp) -> Self {
        Self {
            id,
            market,
            b_token_reserve: 0.0,
            w_token_reserve: 0.0,
            iv,
            iv_updated: listed_at,
            settled: false,
        }
    }

    /// bToken minus wToken held by the pool
    pub fn exposure(&self) -> f64 {
        self.b_token_reserve - self.w_token_reserve
    }

    pub fn is_empty(&self) -> bool {
        self.b_token_reserve == 0.0 && self.w_token_reserve == 0.0
    }
}
