// 6.0 engine/core.rs: the pool. collateral, fee pot, the market arena, clock and spot.

use super::config::AmmConfig;
use super::results::AmmError;
use crate::events::{Event, EventId, EventPayload, MarketListedEvent};
use crate::market::{Market, MarketSlot};
use crate::oracle::{BlackScholes, PricingOracle};
use crate::types::{MarketId, Timestamp};

/** 6.1: main engine struct. all state lives here */
#[derive(Debug)]
pub struct MinterAmm {
    pub(super) config: AmmConfig,
    pub(super) oracle: Box<dyn PricingOracle>,
    pub(super) slots: Vec<MarketSlot>,
    pub(super) collateral_reserve: f64,
    pub(super) accrued_fees: f64,
    /// Per-second IV that market IV reverts to
    pub(super) target_iv: f64,
    pub(super) current_price: Option<f64>,
    pub(super) current_time: Timestamp,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
}

impl MinterAmm {
    pub fn new(collateral_reserve: f64, target_iv: f64, timestamp: Timestamp, config: AmmConfig) -> Self {
        Self::with_oracle(collateral_reserve, target_iv, timestamp, config, Box::new(BlackScholes::new()))
    }

    pub fn with_oracle(
        collateral_reserve: f64,
        target_iv: f64,
        timestamp: Timestamp,
        config: AmmConfig,
        oracle: Box<dyn PricingOracle>,
    ) -> Self {
        Self {
            config,
            oracle,
            slots: Vec::new(),
            collateral_reserve,
            accrued_fees: 0.0,
            target_iv,
            current_price: None,
            current_time: timestamp,
            events: Vec::new(),
            next_event_id: 1,
        }
    }

    pub fn set_timestamp(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn timestamp(&self) -> Timestamp {
        self.current_time
    }

    pub fn set_current_price(&mut self, price: f64) {
        self.current_price = Some(price);
    }

    pub fn current_price(&self) -> Option<f64> {
        self.current_price
    }

    pub fn set_target_iv(&mut self, target_iv: f64) {
        self.target_iv = target_iv;
    }

    pub fn target_iv(&self) -> f64 {
        self.target_iv
    }

    pub fn config(&self) -> &AmmConfig {
        &self.config
    }

    pub fn oracle(&self) -> &dyn PricingOracle {
        self.oracle.as_ref()
    }

    // 6.2: listing. every new market starts empty at target IV, anchored now.
    pub fn add_markets(&mut self, markets: &[Market]) -> Vec<MarketId> {
        markets.iter().map(|market| self.add_market(*market)).collect()
    }

    pub fn add_market(&mut self, market: Market) -> MarketId {
        let market_id = MarketId(self.slots.len());
        let slot = MarketSlot::new(market_id, market, self.target_iv, self.current_time);
        self.slots.push(slot);

        tracing::info!(
            market = %market_id,
            strike = market.strike,
            expiration = %market.expiration,
            "market listed"
        );
        self.emit_event(EventPayload::MarketListed(MarketListedEvent {
            market_id,
            strike: market.strike,
            expiration: market.expiration,
            initial_iv: self.target_iv,
        }));

        market_id
    }

    pub fn markets(&self) -> &[MarketSlot] {
        &self.slots
    }

    pub fn market(&self, market_id: MarketId) -> Result<&MarketSlot, AmmError> {
        self.slots
            .get(market_id.index())
            .ok_or(AmmError::MarketNotFound(market_id))
    }

    // settled markets stay in the arena; trading entry points go through here
    pub(super) fn open_market(&self, market_id: MarketId) -> Result<&MarketSlot, AmmError> {
        let slot = self.market(market_id)?;
        if slot.settled {
            return Err(AmmError::AlreadySettled(market_id));
        }
        Ok(slot)
    }

    pub fn unsettled_markets(&self) -> impl Iterator<Item = &MarketSlot> {
        self.slots.iter().filter(|slot| !slot.settled)
    }

    pub fn market_count(&self) -> usize {
        self.slots.len()
    }

    pub fn collateral_reserve(&self) -> f64 {
        self.collateral_reserve
    }

    pub fn accrued_fees(&self) -> f64 {
        self.accrued_fees
    }

    pub fn b_token_reserve(&self, market_id: MarketId) -> Result<f64, AmmError> {
        Ok(self.market(market_id)?.b_token_reserve)
    }

    pub fn w_token_reserve(&self, market_id: MarketId) -> Result<f64, AmmError> {
        Ok(self.market(market_id)?.w_token_reserve)
    }

    /// bToken minus wToken held by the pool for one market.
    pub fn exposure(&self, market_id: MarketId) -> Result<f64, AmmError> {
        Ok(self.market(market_id)?.exposure())
    }

    pub fn is_settled(&self, market_id: MarketId) -> Result<bool, AmmError> {
        Ok(self.market(market_id)?.settled)
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub(super) fn spot(&self) -> Result<f64, AmmError> {
        self.current_price.ok_or(AmmError::NoSpotPrice)
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        if self.config.verbose {
            tracing::debug!(event_id = event.id.0, payload = ?event.payload, "engine event");
        }

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}
