//! Curve trades and primary issuance.
//!
//! Every entry point quotes, reprices IV and works out the new reserves on
//! locals first; engine state is only written once nothing can fail.

use super::core::MinterAmm;
use super::results::{AmmError, TradeResult};
use crate::events::{DirectIssueEvent, EventPayload, IvRepricedEvent, TradeEvent};
use crate::types::{MarketId, OptionType, Token, TradeDirection};

// float slack allowed on the collateral reserve, relative to the sizes involved
const RESERVE_TOLERANCE: f64 = 1e-9;

impl MinterAmm {
    /// Buy `amount` bTokens; returns the fill with the gross collateral paid.
    pub fn b_token_buy(&mut self, market_id: MarketId, amount: f64, option_type: OptionType) -> Result<TradeResult, AmmError> {
        self.execute_trade(market_id, Token::BToken, TradeDirection::Buy, amount, option_type)
    }

    /// Sell `amount` bTokens; returns the fill with the net collateral received.
    pub fn b_token_sell(&mut self, market_id: MarketId, amount: f64, option_type: OptionType) -> Result<TradeResult, AmmError> {
        self.execute_trade(market_id, Token::BToken, TradeDirection::Sell, amount, option_type)
    }

    pub fn w_token_buy(&mut self, market_id: MarketId, amount: f64, option_type: OptionType) -> Result<TradeResult, AmmError> {
        self.execute_trade(market_id, Token::WToken, TradeDirection::Buy, amount, option_type)
    }

    pub fn w_token_sell(&mut self, market_id: MarketId, amount: f64, option_type: OptionType) -> Result<TradeResult, AmmError> {
        self.execute_trade(market_id, Token::WToken, TradeDirection::Sell, amount, option_type)
    }

    // 6.5: buys mint pairs for any shortfall in the pool's inventory, sells
    // close as many pairs as the pool holds afterwards.
    fn execute_trade(
        &mut self,
        market_id: MarketId,
        token: Token,
        direction: TradeDirection,
        amount: f64,
        option_type: OptionType,
    ) -> Result<TradeResult, AmmError> {
        let quote = match (token, direction) {
            (Token::BToken, TradeDirection::Buy) => self.quote_b_token_buy(market_id, amount, option_type)?,
            (Token::BToken, TradeDirection::Sell) => self.quote_b_token_sell(market_id, amount, option_type)?,
            (Token::WToken, TradeDirection::Buy) => self.quote_w_token_buy(market_id, amount, option_type)?,
            (Token::WToken, TradeDirection::Sell) => self.quote_w_token_sell(market_id, amount, option_type)?,
        };
        let iv = self.repriced_iv(market_id, quote.execution_price, option_type)?;

        let slot = self.market(market_id)?;
        let (mut own, mut other) = match token {
            Token::BToken => (slot.b_token_reserve, slot.w_token_reserve),
            Token::WToken => (slot.w_token_reserve, slot.b_token_reserve),
        };
        let mut reserve = self.collateral_reserve;

        let (minted, closed) = match direction {
            TradeDirection::Buy => {
                reserve += quote.collateral - quote.fee;
                let to_mint = (amount - own).max(0.0);
                reserve -= to_mint;
                own += to_mint;
                other += to_mint;
                own -= amount;
                (to_mint, 0.0)
            }
            TradeDirection::Sell => {
                reserve -= quote.collateral + quote.fee;
                own += amount;
                let to_close = own.min(other).max(0.0);
                reserve += to_close;
                own -= to_close;
                other -= to_close;
                (0.0, to_close)
            }
        };

        let slack = RESERVE_TOLERANCE * (1.0 + self.collateral_reserve.abs() + amount);
        if reserve < -slack || !reserve.is_finite() {
            tracing::warn!(market = %market_id, reserve, "trade would leave the pool undercollateralized");
            return Err(AmmError::numeric(
                "collateral reserve",
                format!("{reserve} after {direction:?} of {amount} {token:?}"),
            ));
        }

        // commit
        let now = self.current_time;
        self.collateral_reserve = reserve;
        self.accrued_fees += quote.fee;
        let slot = &mut self.slots[market_id.index()];
        match token {
            Token::BToken => {
                slot.b_token_reserve = own;
                slot.w_token_reserve = other;
            }
            Token::WToken => {
                slot.w_token_reserve = own;
                slot.b_token_reserve = other;
            }
        }
        slot.iv = iv.next;
        slot.iv_updated = now;

        tracing::debug!(
            market = %market_id,
            ?token,
            ?direction,
            amount,
            collateral = quote.collateral,
            fee = quote.fee,
            iv = iv.next,
            "trade executed"
        );
        self.emit_event(EventPayload::Trade(TradeEvent {
            market_id,
            token,
            direction,
            amount,
            collateral: quote.collateral,
            fee: quote.fee,
            execution_price: quote.execution_price,
            minted,
            closed,
        }));
        self.emit_event(EventPayload::IvRepriced(IvRepricedEvent {
            market_id,
            previous_iv: iv.previous,
            new_iv: iv.next,
            theoretical_price: iv.theoretical_price,
            execution_price: quote.execution_price,
            clamped: iv.clamped,
        }));

        Ok(TradeResult {
            market_id,
            token,
            direction,
            amount,
            collateral: quote.collateral,
            fee: quote.fee,
            execution_price: quote.execution_price,
            minted,
            closed,
            iv_before: iv.previous,
            iv_after: iv.next,
        })
    }

    /// 6.6: primary issuance at a caller-chosen price. no curve, no fee, IV untouched.
    ///
    /// The pool mints pairs for any bToken shortfall, paying one collateral unit
    /// per pair for calls and `strike` per pair for puts.
    pub fn b_token_buy_direct(
        &mut self,
        market_id: MarketId,
        amount: f64,
        collateral: f64,
        option_type: OptionType,
    ) -> Result<TradeResult, AmmError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(AmmError::InvalidTradeSize(amount));
        }
        if !collateral.is_finite() || collateral < 0.0 {
            return Err(AmmError::InvalidTradeSize(collateral));
        }
        let slot = self.open_market(market_id)?;
        let strike = slot.market.strike;
        let iv = slot.iv;

        let minted = (amount - slot.b_token_reserve).max(0.0);
        let mint_cost = match option_type {
            OptionType::Call => minted,
            OptionType::Put => minted * strike,
        };

        self.collateral_reserve += collateral - mint_cost;
        let slot = &mut self.slots[market_id.index()];
        slot.b_token_reserve += minted - amount;
        slot.w_token_reserve += minted;

        tracing::debug!(market = %market_id, amount, collateral, minted, "direct issue");
        self.emit_event(EventPayload::DirectIssue(DirectIssueEvent {
            market_id,
            amount,
            collateral,
            minted,
            option_type,
        }));

        Ok(TradeResult {
            market_id,
            token: Token::BToken,
            direction: TradeDirection::Buy,
            amount,
            collateral,
            fee: 0.0,
            execution_price: collateral / amount,
            minted,
            closed: 0.0,
            iv_before: iv,
            iv_after: iv,
        })
    }
}
