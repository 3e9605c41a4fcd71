// 7.0: every engine mutation produces an event. used for audit trails and replaying
// a simulation tick by tick. the EventPayload enum lists all event types.

use crate::types::{MarketId, OptionType, Timestamp, Token, TradeDirection};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Listing
    MarketListed(MarketListedEvent),

    // Trading
    Trade(TradeEvent),
    DirectIssue(DirectIssueEvent),
    IvRepriced(IvRepricedEvent),

    // Settlement
    MarketSettled(MarketSettledEvent),
    HedgeCredited(HedgeCreditedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketListedEvent {
    pub market_id: MarketId,
    pub strike: f64,
    pub expiration: Timestamp,
    pub initial_iv: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvent {
    pub market_id: MarketId,
    pub token: Token,
    pub direction: TradeDirection,
    pub amount: f64,
    /// Collateral moved between trader and pool, fee included
    pub collateral: f64,
    pub fee: f64,
    /// Implied bToken price of the fill, fee excluded
    pub execution_price: f64,
    pub minted: f64,
    pub closed: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectIssueEvent {
    pub market_id: MarketId,
    pub amount: f64,
    pub collateral: f64,
    pub minted: f64,
    pub option_type: OptionType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IvRepricedEvent {
    pub market_id: MarketId,
    pub previous_iv: f64,
    pub new_iv: f64,
    pub theoretical_price: f64,
    pub execution_price: f64,
    pub clamped: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSettledEvent {
    pub market_id: MarketId,
    pub settlement_price: f64,
    pub buyer_share: f64,
    pub writer_share: f64,
    pub collateral_credited: f64,
    pub forced: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeCreditedEvent {
    pub amount: f64,
    pub new_collateral_reserve: f64,
}
