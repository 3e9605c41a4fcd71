//! Expiry settlement and pool valuation.

use super::core::MinterAmm;
use super::results::{AmmError, SettledMarket, SettlementReport};
use crate::events::{EventPayload, HedgeCreditedEvent, MarketSettledEvent};
use crate::types::{MarketId, OptionType};

impl MinterAmm {
    /// 6.7: settle every unsettled market whose expiry has passed at the current spot.
    ///
    /// `hedge_value` (the hedge book's P&L) is credited to the collateral reserve
    /// whether or not any market settles.
    pub fn settle(&mut self, option_type: OptionType, hedge_value: f64) -> Result<SettlementReport, AmmError> {
        if !hedge_value.is_finite() {
            return Err(AmmError::numeric("hedge value", hedge_value.to_string()));
        }
        let now = self.current_time;
        let due: Vec<MarketId> = self
            .unsettled_markets()
            .filter(|slot| slot.market.is_expired(now))
            .map(|slot| slot.id)
            .collect();
        let settled = self.prepare_settlement(&due, option_type)?;

        self.collateral_reserve += hedge_value;
        self.emit_event(EventPayload::HedgeCredited(HedgeCreditedEvent {
            amount: hedge_value,
            new_collateral_reserve: self.collateral_reserve,
        }));
        let markets = self.commit_settlement(settled, false);

        Ok(SettlementReport { hedge_value, markets })
    }

    /// Settle every unsettled market regardless of expiry.
    pub fn force_settle_all_markets(&mut self, option_type: OptionType) -> Result<SettlementReport, AmmError> {
        let open: Vec<MarketId> = self.unsettled_markets().map(|slot| slot.id).collect();
        let settled = self.prepare_settlement(&open, option_type)?;
        let markets = self.commit_settlement(settled, true);
        Ok(SettlementReport { hedge_value: 0.0, markets })
    }

    /// Settle one market regardless of expiry. Settling twice is an error.
    pub fn settle_market(&mut self, market_id: MarketId, option_type: OptionType) -> Result<SettledMarket, AmmError> {
        self.open_market(market_id)?;
        let settled = self.prepare_settlement(&[market_id], option_type)?;
        let mut markets = self.commit_settlement(settled, true);
        markets.pop().ok_or(AmmError::MarketNotFound(market_id))
    }

    fn prepare_settlement(&self, ids: &[MarketId], option_type: OptionType) -> Result<Vec<SettledMarket>, AmmError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let spot = self.spot()?;
        ids.iter()
            .map(|&market_id| {
                let slot = self.market(market_id)?;
                let shares = slot.market.settlement_amounts(spot, option_type);
                let collateral_credited = slot.b_token_reserve * shares.buyer + slot.w_token_reserve * shares.writer;
                Ok(SettledMarket {
                    market_id,
                    iv: self.current_iv(market_id)?,
                    shares,
                    collateral_credited,
                })
            })
            .collect()
    }

    fn commit_settlement(&mut self, settled: Vec<SettledMarket>, forced: bool) -> Vec<SettledMarket> {
        let settlement_price = self.current_price.unwrap_or_default();
        for entry in &settled {
            let slot = &mut self.slots[entry.market_id.index()];
            slot.b_token_reserve = 0.0;
            slot.w_token_reserve = 0.0;
            slot.settled = true;
            self.collateral_reserve += entry.collateral_credited;

            tracing::info!(
                market = %entry.market_id,
                settlement_price,
                buyer = entry.shares.buyer,
                writer = entry.shares.writer,
                credited = entry.collateral_credited,
                forced,
                "market settled"
            );
            self.emit_event(EventPayload::MarketSettled(MarketSettledEvent {
                market_id: entry.market_id,
                settlement_price,
                buyer_share: entry.shares.buyer,
                writer_share: entry.shares.writer,
                collateral_credited: entry.collateral_credited,
                forced,
            }));
        }
        settled
    }

    /// 6.8: collateral plus inventory marked at the given bToken prices.
    ///
    /// `b_prices` lines up with the unsettled markets in listing order; wTokens
    /// are marked at `1 - price`.
    pub fn pool_value(&self, b_prices: &[f64]) -> Result<f64, AmmError> {
        let expected = self.unsettled_markets().count();
        if b_prices.len() != expected {
            return Err(AmmError::PriceCountMismatch {
                expected,
                provided: b_prices.len(),
            });
        }
        let inventory: f64 = self
            .unsettled_markets()
            .zip(b_prices)
            .map(|(slot, price)| price * slot.b_token_reserve + (1.0 - price) * slot.w_token_reserve)
            .sum();
        Ok(self.collateral_reserve + inventory)
    }

    pub fn pool_value_at_oracle(&self, option_type: OptionType) -> Result<f64, AmmError> {
        let prices = self
            .unsettled_markets()
            .map(|slot| self.price_for_market(slot.id, option_type))
            .collect::<Result<Vec<_>, _>>()?;
        self.pool_value(&prices)
    }
}
