//! Solvency invariant tests.
//!
//! These tests verify that collateral is conserved by every trade and that
//! settlement leaves the pool in a consistent terminal state.

use minter_amm::{
    per_second_iv, AmmConfig, AmmError, EventPayload, Market, MarketId, MinterAmm, OptionType, Timestamp, Token,
    TradeDirection, TradeResult,
};
use proptest::prelude::*;

const SPOT: f64 = 2_000.0;

fn t0() -> Timestamp {
    Timestamp::from_secs(1_609_488_000)
}

fn engine(collateral: f64, annual_iv: f64, config: AmmConfig) -> MinterAmm {
    let mut amm = MinterAmm::new(collateral, per_second_iv(annual_iv), t0(), config);
    amm.set_current_price(SPOT);
    amm
}

fn execute(
    amm: &mut MinterAmm,
    id: MarketId,
    token: Token,
    direction: TradeDirection,
    amount: f64,
) -> Result<TradeResult, AmmError> {
    match (token, direction) {
        (Token::BToken, TradeDirection::Buy) => amm.b_token_buy(id, amount, OptionType::Call),
        (Token::BToken, TradeDirection::Sell) => amm.b_token_sell(id, amount, OptionType::Call),
        (Token::WToken, TradeDirection::Buy) => amm.w_token_buy(id, amount, OptionType::Call),
        (Token::WToken, TradeDirection::Sell) => amm.w_token_sell(id, amount, OptionType::Call),
    }
}

// pool cash, fee pot and inventory, all marked at one fixed bToken price
fn marked_value(amm: &MinterAmm, id: MarketId, b_price: f64) -> f64 {
    let slot = amm.market(id).unwrap();
    amm.collateral_reserve()
        + amm.accrued_fees()
        + slot.b_token_reserve * b_price
        + slot.w_token_reserve * (1.0 - b_price)
}

fn trade_strategy() -> impl Strategy<Value = (Token, TradeDirection, f64)> {
    (
        prop_oneof![Just(Token::BToken), Just(Token::WToken)],
        prop_oneof![Just(TradeDirection::Buy), Just(TradeDirection::Sell)],
        1u32..=2_000u32,
    )
        .prop_map(|(token, direction, size)| (token, direction, size as f64 / 10.0))
}

proptest! {
    /// Every trade changes pool value by exactly the collateral that crossed
    /// minus the tokens that left, at any fixed mark.
    #[test]
    fn trades_conserve_collateral(
        annual_iv in (30u32..=150u32).prop_map(|x| x as f64 / 100.0),
        strike in 1_800u32..2_600u32,
        with_fees in any::<bool>(),
        trades in proptest::collection::vec(trade_strategy(), 1..30),
    ) {
        let config = if with_fees { AmmConfig::with_fees() } else { AmmConfig::default() };
        let mut amm = engine(10_000.0, annual_iv, config);
        let id = amm.add_market(Market::new(strike as f64, t0().plus_days(7)));

        for (token, direction, amount) in trades {
            let mark = amm.price_for_market(id, OptionType::Call).unwrap();
            let before = marked_value(&amm, id, mark);

            let fill = match execute(&mut amm, id, token, direction, amount) {
                Ok(fill) => fill,
                Err(_) => {
                    // rejected trades leave the pool untouched
                    prop_assert_eq!(marked_value(&amm, id, mark), before);
                    continue;
                }
            };
            let after = marked_value(&amm, id, mark);

            let token_price = match token {
                Token::BToken => mark,
                Token::WToken => 1.0 - mark,
            };
            let expected = match direction {
                TradeDirection::Buy => fill.collateral - amount * token_price,
                TradeDirection::Sell => amount * token_price - fill.collateral,
            };
            prop_assert!(
                ((after - before) - expected).abs() < 1e-8 * (1.0 + before),
                "{:?} {:?} {}: moved {} expected {}", token, direction, amount, after - before, expected
            );
        }
    }

    /// Pool inventory is one-sided and never negative
    #[test]
    fn reserves_never_negative(
        trades in proptest::collection::vec(trade_strategy(), 1..30),
    ) {
        let mut amm = engine(10_000.0, 0.8, AmmConfig::default());
        let id = amm.add_market(Market::new(2_100.0, t0().plus_days(7)));

        for (token, direction, amount) in trades {
            let _ = execute(&mut amm, id, token, direction, amount);
            let slot = amm.market(id).unwrap();
            prop_assert!(slot.b_token_reserve >= -1e-9 && slot.w_token_reserve >= -1e-9);
            prop_assert!(slot.b_token_reserve.min(slot.w_token_reserve) <= 1e-9);
            prop_assert!(amm.collateral_reserve() >= -1e-6);
        }
    }
}

mod settlement_tests {
    use super::*;

    #[test]
    fn force_settle_zeros_every_market() {
        let mut amm = engine(10_000.0, 0.8, AmmConfig::default());
        let ids = amm.add_markets(&[
            Market::new(1_900.0, t0().plus_days(7)),
            Market::new(2_100.0, t0().plus_days(14)),
            Market::new(2_400.0, t0().plus_days(21)),
        ]);
        amm.b_token_buy(ids[0], 50.0, OptionType::Call).unwrap();
        amm.w_token_buy(ids[1], 80.0, OptionType::Call).unwrap();
        amm.b_token_sell(ids[2], 30.0, OptionType::Call).unwrap();

        let report = amm.force_settle_all_markets(OptionType::Call).unwrap();
        assert_eq!(report.len(), 3);

        for id in ids {
            assert!(amm.is_settled(id).unwrap());
            assert_eq!(amm.b_token_reserve(id).unwrap(), 0.0);
            assert_eq!(amm.w_token_reserve(id).unwrap(), 0.0);
        }
        assert_eq!(amm.unsettled_markets().count(), 0);
        assert_eq!(amm.pool_value(&[]).unwrap(), amm.collateral_reserve());
    }

    #[test]
    fn settlement_credits_reserves_at_payout() {
        let mut amm = engine(10_000.0, 0.8, AmmConfig::default());
        let id = amm.add_market(Market::new(2_000.0, t0().plus_days(7)));
        amm.b_token_buy(id, 100.0, OptionType::Call).unwrap();

        let w = amm.w_token_reserve(id).unwrap();
        let reserve = amm.collateral_reserve();

        amm.set_timestamp(t0().plus_days(7));
        amm.set_current_price(2_500.0);
        let report = amm.settle(OptionType::Call, 0.0).unwrap();

        // pool holds only wTokens: it keeps the writer share
        let writer = 2_000.0 / 2_500.0;
        assert!((report.collateral_credited() - w * writer).abs() < 1e-9);
        assert!((amm.collateral_reserve() - (reserve + w * writer)).abs() < 1e-9);
    }

    #[test]
    fn settled_market_rejects_everything() {
        let mut amm = engine(10_000.0, 0.8, AmmConfig::default());
        let id = amm.add_market(Market::new(2_000.0, t0().plus_days(7)));
        amm.b_token_buy(id, 10.0, OptionType::Call).unwrap();
        amm.settle_market(id, OptionType::Call).unwrap();

        let reserve = amm.collateral_reserve();
        let fees = amm.accrued_fees();
        let event_count = amm.events().len();

        for token in [Token::BToken, Token::WToken] {
            for direction in [TradeDirection::Buy, TradeDirection::Sell] {
                let result = execute(&mut amm, id, token, direction, 5.0);
                assert_eq!(result.unwrap_err(), AmmError::AlreadySettled(id));
            }
        }
        assert_eq!(
            amm.b_token_buy_direct(id, 5.0, 0.1, OptionType::Call).unwrap_err(),
            AmmError::AlreadySettled(id)
        );
        assert_eq!(amm.settle_market(id, OptionType::Call).unwrap_err(), AmmError::AlreadySettled(id));

        assert_eq!(amm.collateral_reserve(), reserve);
        assert_eq!(amm.accrued_fees(), fees);
        assert_eq!(amm.events().len(), event_count);
        assert!(!AmmError::AlreadySettled(id).is_fatal());
    }

    #[test]
    fn settle_is_idempotent_after_expiry() {
        let mut amm = engine(10_000.0, 0.8, AmmConfig::default());
        let id = amm.add_market(Market::new(2_000.0, t0().plus_days(7)));
        amm.b_token_buy(id, 10.0, OptionType::Call).unwrap();

        amm.set_timestamp(t0().plus_days(7));
        assert_eq!(amm.settle(OptionType::Call, 0.0).unwrap().len(), 1);
        let reserve = amm.collateral_reserve();

        let again = amm.settle(OptionType::Call, 0.0).unwrap();
        assert!(again.is_empty());
        assert_eq!(amm.collateral_reserve(), reserve);
    }

    #[test]
    fn every_mutation_is_logged() {
        let mut amm = engine(10_000.0, 0.8, AmmConfig::default());
        let id = amm.add_market(Market::new(2_000.0, t0().plus_days(7)));
        amm.b_token_buy(id, 10.0, OptionType::Call).unwrap();
        amm.set_timestamp(t0().plus_days(7));
        amm.settle(OptionType::Call, 1.5).unwrap();

        let kinds: Vec<&str> = amm
            .events()
            .iter()
            .map(|event| match event.payload {
                EventPayload::MarketListed(_) => "listed",
                EventPayload::Trade(_) => "trade",
                EventPayload::DirectIssue(_) => "direct",
                EventPayload::IvRepriced(_) => "iv",
                EventPayload::MarketSettled(_) => "settled",
                EventPayload::HedgeCredited(_) => "hedge",
            })
            .collect();
        assert_eq!(kinds, vec!["listed", "trade", "iv", "hedge", "settled"]);
        assert!(amm.events().windows(2).all(|w| w[0].id < w[1].id));
    }
}

mod reference_tests {
    use super::*;
    use minter_amm::{BlackScholes, PricingOracle};

    // strike 2200, one week out, spot 2000, 25% IV
    fn reference() -> (MinterAmm, MarketId) {
        let mut amm = engine(1_000.0, 0.25, AmmConfig::default());
        let id = amm.add_market(Market::new(2_200.0, t0().plus_days(7)));
        (amm, id)
    }

    #[test]
    fn empty_market_quotes_the_oracle() {
        let (amm, id) = reference();
        let oracle = BlackScholes::new();
        let expected = oracle.price(t0(), SPOT, 2_200.0, t0().plus_days(7), 0.25, OptionType::Call);

        let price = amm.price_for_market(id, OptionType::Call).unwrap();
        assert!((price - expected).abs() < 1e-12);
        assert!(price > 0.0 && price < 0.01);
    }

    #[test]
    fn tiny_trade_has_no_slippage() {
        let (amm, id) = reference();
        let buy = amm.slippage(id, 1e-3, TradeDirection::Buy, OptionType::Call).unwrap();
        let sell = amm.slippage(id, 1e-3, TradeDirection::Sell, OptionType::Call).unwrap();

        // percent; the option is so cheap that rounding dominates below this
        assert!(buy.abs() < 1e-2, "buy slippage {buy}%");
        assert!(sell.abs() < 1e-2, "sell slippage {sell}%");
    }

    #[test]
    fn larger_trades_slip_more() {
        let (amm, id) = reference();
        let small = amm.slippage(id, 1.0, TradeDirection::Buy, OptionType::Call).unwrap();
        let large = amm.slippage(id, 100.0, TradeDirection::Buy, OptionType::Call).unwrap();
        assert!(small > 0.05 && small < 0.2, "small slippage {small}%");
        assert!(large > 10.0 * small);
    }
}
