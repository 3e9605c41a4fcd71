// 6.0.2: result types and errors for engine operations.

use crate::curve::CurveError;
use crate::market::SettlementShares;
use crate::types::{MarketId, Token, TradeDirection};

/// Read-only price of a prospective trade.
///
/// `collateral` is what changes hands with the trader: the gross payment
/// (fee included) for buys, the net proceeds (fee deducted) for sells.
/// `execution_price` is the fee-free fill price expressed in bToken terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeQuote {
    pub collateral: f64,
    pub fee: f64,
    pub execution_price: f64,
}

#[derive(Debug, Clone)]
pub struct TradeResult {
    pub market_id: MarketId,
    pub token: Token,
    pub direction: TradeDirection,
    pub amount: f64,
    pub collateral: f64,
    pub fee: f64,
    pub execution_price: f64,
    pub minted: f64,
    pub closed: f64,
    pub iv_before: f64,
    pub iv_after: f64,
}

#[derive(Debug, Clone)]
pub struct SettledMarket {
    pub market_id: MarketId,
    /// Per-second IV the market carried when it settled
    pub iv: f64,
    pub shares: SettlementShares,
    pub collateral_credited: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SettlementReport {
    pub hedge_value: f64,
    pub markets: Vec<SettledMarket>,
}

impl SettlementReport {
    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    pub fn settled_ivs(&self) -> Vec<f64> {
        self.markets.iter().map(|m| m.iv).collect()
    }

    pub fn buyer_shares(&self) -> Vec<f64> {
        self.markets.iter().map(|m| m.shares.buyer).collect()
    }

    pub fn writer_shares(&self) -> Vec<f64> {
        self.markets.iter().map(|m| m.shares.writer).collect()
    }

    pub fn collateral_credited(&self) -> f64 {
        self.markets.iter().map(|m| m.collateral_credited).sum()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AmmError {
    #[error("Market {0} not found")]
    MarketNotFound(MarketId),

    #[error("Market {0} is already settled")]
    AlreadySettled(MarketId),

    #[error("Invalid trade size {0}")]
    InvalidTradeSize(f64),

    #[error("Expected {expected} prices, got {provided}")]
    PriceCountMismatch { expected: usize, provided: usize },

    #[error("No spot price has been set")]
    NoSpotPrice,

    #[error("Numeric failure in {context}: {detail}")]
    Numeric { context: String, detail: String },
}

impl AmmError {
    /// Numeric failures mean the model broke down; everything else is a caller mistake.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AmmError::Numeric { .. })
    }

    pub(super) fn numeric(context: impl Into<String>, detail: impl Into<String>) -> Self {
        AmmError::Numeric {
            context: context.into(),
            detail: detail.into(),
        }
    }
}

impl From<CurveError> for AmmError {
    fn from(err: CurveError) -> Self {
        AmmError::numeric("bonding curve", err.to_string())
    }
}
