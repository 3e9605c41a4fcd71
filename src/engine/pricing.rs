//! Oracle pricing, curve quotes and IV repricing.

use super::core::MinterAmm;
use super::results::{AmmError, TradeQuote};
use crate::curve::{self, VirtualReserves};
use crate::types::{annualize_iv, per_second_iv, MarketId, OptionType, TradeDirection};
use crate::volatility::{clamp_iv, decayed_iv, vega_step};

/// IV change implied by one fill, computed before anything is committed.
#[derive(Debug, Clone, Copy)]
pub(super) struct IvUpdate {
    pub previous: f64,
    pub next: f64,
    pub theoretical_price: f64,
    pub clamped: bool,
}

impl MinterAmm {
    /// Market IV (per-second) after reverting toward target since the last update.
    pub fn current_iv(&self, market_id: MarketId) -> Result<f64, AmmError> {
        let slot = self.market(market_id)?;
        let elapsed = slot.iv_updated.seconds_until(&self.current_time);
        Ok(decayed_iv(slot.iv, self.target_iv, self.config.iv_decay_rate, elapsed))
    }

    /// Oracle price of one bToken, in collateral units.
    pub fn price_for_market(&self, market_id: MarketId, option_type: OptionType) -> Result<f64, AmmError> {
        let spot = self.spot()?;
        let market = self.market(market_id)?.market;
        let volatility = annualize_iv(self.current_iv(market_id)?);
        let price = self.oracle.price(
            self.current_time,
            spot,
            market.strike,
            market.expiration,
            volatility,
            option_type,
        );
        if !price.is_finite() {
            tracing::warn!(market = %market_id, price, "oracle returned a non-finite price");
            return Err(AmmError::numeric("oracle price", format!("{price} for market {market_id}")));
        }
        Ok(price)
    }

    pub fn virtual_reserves(&self, market_id: MarketId, option_type: OptionType) -> Result<VirtualReserves, AmmError> {
        let b_price = self.price_for_market(market_id, option_type)?;
        let slot = self.market(market_id)?;
        Ok(curve::virtual_reserves(
            slot.b_token_reserve,
            slot.w_token_reserve,
            self.collateral_reserve,
            b_price,
        )?)
    }

    fn check_amount(amount: f64) -> Result<(), AmmError> {
        if amount.is_finite() && amount > 0.0 {
            Ok(())
        } else {
            Err(AmmError::InvalidTradeSize(amount))
        }
    }

    fn fee(&self, notional: f64, premium_collateral: f64) -> f64 {
        curve::calc_fee(
            notional,
            premium_collateral,
            self.config.fee_percent,
            self.config.collateral_fee_cap_percent,
        )
    }

    // 6.3: quotes. read-only, same validation as the trades they preview.
    pub fn quote_b_token_buy(&self, market_id: MarketId, amount: f64, option_type: OptionType) -> Result<TradeQuote, AmmError> {
        Self::check_amount(amount)?;
        self.open_market(market_id)?;
        let v = self.virtual_reserves(market_id, option_type)?;
        let collateral = curve::collateral_in(amount, v.b_token, v.w_token)?;
        let fee = self.fee(amount, collateral);
        Ok(TradeQuote {
            collateral: collateral + fee,
            fee,
            execution_price: collateral / amount,
        })
    }

    pub fn quote_b_token_sell(&self, market_id: MarketId, amount: f64, option_type: OptionType) -> Result<TradeQuote, AmmError> {
        Self::check_amount(amount)?;
        self.open_market(market_id)?;
        let v = self.virtual_reserves(market_id, option_type)?;
        let collateral = curve::collateral_out(amount, v.b_token, v.w_token)?;
        let fee = self.fee(amount, collateral);
        Ok(TradeQuote {
            collateral: collateral - fee,
            fee,
            execution_price: collateral / amount,
        })
    }

    // wToken quotes report the bToken-equivalent price and cap the fee on it
    pub fn quote_w_token_buy(&self, market_id: MarketId, amount: f64, option_type: OptionType) -> Result<TradeQuote, AmmError> {
        Self::check_amount(amount)?;
        self.open_market(market_id)?;
        let v = self.virtual_reserves(market_id, option_type)?;
        let collateral = curve::collateral_in(amount, v.w_token, v.b_token)?;
        let fee = self.fee(amount, amount - collateral);
        Ok(TradeQuote {
            collateral: collateral + fee,
            fee,
            execution_price: 1.0 - collateral / amount,
        })
    }

    pub fn quote_w_token_sell(&self, market_id: MarketId, amount: f64, option_type: OptionType) -> Result<TradeQuote, AmmError> {
        Self::check_amount(amount)?;
        self.open_market(market_id)?;
        let v = self.virtual_reserves(market_id, option_type)?;
        let collateral = curve::collateral_out(amount, v.w_token, v.b_token)?;
        let fee = self.fee(amount, amount - collateral);
        Ok(TradeQuote {
            collateral: collateral - fee,
            fee,
            execution_price: 1.0 - collateral / amount,
        })
    }

    /// Percent difference between the bToken average fill (fee included) and the oracle price.
    pub fn slippage(
        &self,
        market_id: MarketId,
        amount: f64,
        direction: TradeDirection,
        option_type: OptionType,
    ) -> Result<f64, AmmError> {
        let quote = match direction {
            TradeDirection::Buy => self.quote_b_token_buy(market_id, amount, option_type)?,
            TradeDirection::Sell => self.quote_b_token_sell(market_id, amount, option_type)?,
        };
        let price = self.price_for_market(market_id, option_type)?;
        Ok((quote.collateral / amount / price - 1.0) * 100.0)
    }

    // 6.4: one vega step from the decayed IV, clamped into the policy band.
    // zero vega (expired, deep in/out of the money) keeps the decayed IV.
    pub(super) fn repriced_iv(
        &self,
        market_id: MarketId,
        execution_price: f64,
        option_type: OptionType,
    ) -> Result<IvUpdate, AmmError> {
        let spot = self.spot()?;
        let market = self.market(market_id)?.market;
        let previous = self.current_iv(market_id)?;
        let current_annual = annualize_iv(previous);
        let theoretical_price = self.price_for_market(market_id, option_type)?;
        let vega = self
            .oracle
            .vega(self.current_time, spot, market.strike, market.expiration, current_annual);

        let unclamped = match vega_step(current_annual, execution_price, theoretical_price, vega) {
            Some(annual) => per_second_iv(annual),
            None => previous,
        };
        let next = clamp_iv(unclamped, self.config.iv_floor, self.config.iv_ceiling);

        Ok(IvUpdate {
            previous,
            next,
            theoretical_price,
            clamped: next != unclamped,
        })
    }
}
