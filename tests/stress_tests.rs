//! Stress tests
//!
//! These tests drive the engine with heavy order flow and run full-year
//! simulations to verify the pool stays consistent under every strategy.

use minter_amm::*;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

fn year_path(seed: u64, yearly_median: f64, yearly_sigma: f64) -> HourlyPath {
    HourlyPath::synthetic(seed, SAMPLE_LENGTH, yearly_median, yearly_sigma, 2_000.0, SIMULATION_EPOCH)
}

fn assert_well_formed(result: &SimulationResult) {
    assert_eq!(result.ticks.len(), result.pool_values.len());
    assert!(result.ticks.windows(2).all(|w| w[0].timestamp.seconds_until(&w[1].timestamp) == SECONDS_PER_HOUR));
    assert!(is_expiration(result.ticks[0].timestamp));
    assert!(result
        .pool_values
        .iter()
        .all(|r| r.pool_value.is_finite() && r.collateral_reserve.is_finite()));
}

/// Full-year weekly option writing.
mod simulation_tests {
    use super::*;

    #[test]
    fn covered_calls_settle_every_week() {
        let path = year_path(42, 1.0, 0.8);
        let sim = Simulation::new(SimulationConfig::calls()).unwrap();
        let result = sim.run_path(&path, &mut Unhedged::new()).unwrap();

        assert_well_formed(&result);
        assert!(result.weeks_listed >= 52);
        assert_eq!(result.weeks_suppressed, 0);
        // the last listing is still live when the path ends
        assert_eq!(result.settlements + 1, result.weeks_listed);

        // a covered call writer can lose upside but never the pool
        let settled: Vec<f64> = result.pool_values.iter().filter_map(|r| r.settled_pool_value).collect();
        assert_eq!(settled.len(), result.weeks_listed);
        assert!(settled.iter().all(|v| *v > 0.0));
        assert!(result.pool_values.iter().all(|r| {
            r.buyer_share.zip(r.writer_share).map_or(true, |(b, w)| (b + w - 1.0).abs() < 1e-12)
        }));
    }

    #[test]
    fn cash_secured_puts_stay_funded() {
        let path = year_path(42, 0.5, 1.0);
        let sim = Simulation::new(SimulationConfig::puts()).unwrap();
        let result = sim.run_path(&path, &mut Unhedged::new()).unwrap();

        assert_well_formed(&result);
        assert_eq!(result.settlements + 1, result.weeks_listed);
        assert!(result
            .pool_values
            .iter()
            .filter_map(|r| r.settled_pool_value)
            .all(|v| v > 0.0));
        // out-of-the-money strikes at every listing
        for (tick, value) in result.ticks.iter().zip(&result.pool_values) {
            if value.settled_pool_value.is_some() && tick.state == TickState::Trading {
                let strike = tick.strike.unwrap();
                assert!(strike > 0.0 && strike < tick.underlying_price, "strike {strike} at {}", tick.timestamp);
            }
        }
    }

    #[test]
    fn selective_writer_skips_quiet_weeks() {
        let path = year_path(9, 1.0, 0.3);
        let calls = Simulation::new(SimulationConfig::calls())
            .unwrap()
            .run_path(&path, &mut Unhedged::new())
            .unwrap();
        let selective = Simulation::new(SimulationConfig::selective())
            .unwrap()
            .run_path(&path, &mut Unhedged::new())
            .unwrap();

        assert_well_formed(&selective);
        // realized vol near 30% plus the premium stays under the 60% floor
        assert!(selective.weeks_suppressed > 0);
        assert_eq!(selective.weeks_listed + selective.weeks_suppressed, calls.weeks_listed);
        assert!(selective.settlements <= calls.settlements);
        assert!(selective
            .ticks
            .iter()
            .filter(|t| t.state == TickState::IvSuppressed)
            .all(|t| t.market_id.is_none() && t.b_token_reserve.is_none()));
    }

    #[test]
    fn every_strategy_completes() {
        let path = year_path(7, 1.5, 1.0);
        let sim = Simulation::new(SimulationConfig::calls()).unwrap();
        let kinds = [
            StrategyKind::Unhedged,
            StrategyKind::DeltaInterval {
                interval_hours: 8,
                target_delta: 0.0,
                range: 0.05,
            },
            StrategyKind::DeltaNonPositive {
                interval_hours: 8,
                max_negative: -0.2,
            },
        ];

        for (epoch, kind) in kinds.iter().enumerate() {
            let mut strategy = kind.build();
            let result = sim.clone().with_epoch(epoch).run_path(&path, strategy.as_mut()).unwrap();

            assert_well_formed(&result);
            assert_eq!(result.strategy, strategy.name());
            assert!(result.ticks.iter().all(|t| t.epoch_id == epoch));
            let deltas: Vec<f64> = result.ticks.iter().filter_map(|t| t.hedge_delta).collect();
            assert!(deltas.iter().all(|d| d.is_finite()));
            match kind {
                StrategyKind::Unhedged => assert!(deltas.iter().all(|d| *d == 0.0)),
                StrategyKind::DeltaInterval { .. } => assert!(deltas.iter().any(|d| *d != 0.0)),
                StrategyKind::DeltaNonPositive { .. } => {}
            }
        }
    }

    #[test]
    fn runs_are_deterministic() {
        let sim = Simulation::new(SimulationConfig::calls()).unwrap();
        let first = sim
            .run_path(&year_path(3, 1.0, 0.8), &mut DeltaIntervalHedge::new(4, 0.0, 0.1))
            .unwrap();
        let second = sim
            .run_path(&year_path(3, 1.0, 0.8), &mut DeltaIntervalHedge::new(4, 0.0, 0.1))
            .unwrap();

        assert_eq!(first.final_pool_value(), second.final_pool_value());
        assert_eq!(first.settlements, second.settlements);
    }

    #[test]
    fn bootstrapped_path_runs() {
        let mut rng = Pcg64::seed_from_u64(17);
        let sample = synthetic_std_returns(2 * SAMPLE_LENGTH, &mut rng);
        let std_returns = bootstrap_path(&sample, &BootstrapParams::default(), &mut rng).unwrap();
        assert_eq!(std_returns.len(), SAMPLE_LENGTH);

        let path = HourlyPath::from_std_returns(
            &std_returns,
            hourly_mu(1.0),
            hourly_sigma(0.8),
            2_000.0,
            SIMULATION_EPOCH,
        );
        let result = Simulation::new(SimulationConfig::calls())
            .unwrap()
            .run_path(&path, &mut Unhedged::new())
            .unwrap();

        assert_well_formed(&result);
        assert!(result.collateral_return().is_some());
    }

    #[test]
    fn crash_and_rally_keep_the_pool_solvent() {
        // flat for a month of warmup, then a 60% rally in one week, then a crash
        let mut prices = vec![2_000.0; 30 * 24];
        prices.extend((1..=7 * 24).map(|h| 2_000.0 * (1.0 + 0.6 * h as f64 / (7.0 * 24.0))));
        prices.extend((1..=7 * 24).map(|h| 3_200.0 * (1.0 - 0.5 * h as f64 / (7.0 * 24.0))));
        prices.extend(vec![1_600.0; 7 * 24]);
        let path = HourlyPath::new(SIMULATION_EPOCH, prices);
        let ivs = vec![0.8; path.len()];

        let result = Simulation::new(SimulationConfig::calls())
            .unwrap()
            .run(&path, &ivs, &mut Unhedged::new())
            .unwrap();

        assert_well_formed(&result);
        let settled: Vec<f64> = result.pool_values.iter().filter_map(|r| r.settled_pool_value).collect();
        assert!(settled.iter().all(|v| *v > 0.0));
        // the rally week settles deep in the money for the buyer
        assert!(result.pool_values.iter().filter_map(|r| r.buyer_share).any(|b| b > 0.1));
    }
}

/// Heavy order flow straight into the engine.
mod engine_tests {
    use super::*;

    fn t0() -> Timestamp {
        SIMULATION_EPOCH
    }

    #[test]
    fn random_order_flow_across_markets() {
        let mut rng = Pcg64::seed_from_u64(99);
        let mut amm = MinterAmm::new(100_000.0, per_second_iv(0.8), t0(), AmmConfig::with_fees());
        amm.set_current_price(2_000.0);
        let ids = amm.add_markets(&[
            Market::new(1_800.0, t0().plus_days(7)),
            Market::new(2_000.0, t0().plus_days(7)),
            Market::new(2_400.0, t0().plus_days(14)),
        ]);

        let mut fees = 0.0;
        for step in 0..2_000 {
            amm.set_timestamp(t0().plus_secs(step * 60));
            amm.set_current_price(2_000.0 * (1.0 + 0.05 * (step as f64 / 300.0).sin()));

            let id = ids[rng.gen_range(0..ids.len())];
            let amount = rng.gen_range(0.1..500.0);
            let fill = match rng.gen_range(0..4) {
                0 => amm.b_token_buy(id, amount, OptionType::Call),
                1 => amm.b_token_sell(id, amount, OptionType::Call),
                2 => amm.w_token_buy(id, amount, OptionType::Call),
                _ => amm.w_token_sell(id, amount, OptionType::Call),
            };
            match fill {
                Ok(fill) => fees += fill.fee,
                Err(err) => assert!(!err.is_fatal(), "step {step}: {err}"),
            }

            for &id in &ids {
                let iv = amm.current_iv(id).unwrap();
                assert!((IV_FLOOR..=IV_CEILING).contains(&iv));
            }
        }

        assert!((amm.accrued_fees() - fees).abs() < 1e-9);
        assert!(amm.collateral_reserve() > 0.0);
        assert!(amm.pool_value_at_oracle(OptionType::Call).unwrap().is_finite());

        amm.set_current_price(2_100.0);
        let report = amm.force_settle_all_markets(OptionType::Call).unwrap();
        assert_eq!(report.len(), 3);
        assert!(ids.iter().all(|id| amm.is_settled(*id).unwrap()));
        assert!(amm.collateral_reserve() > 0.0);
    }

    #[test]
    fn sustained_buying_pins_iv_at_ceiling() {
        let mut amm = MinterAmm::new(10_000.0, per_second_iv(0.8), t0(), AmmConfig::default());
        amm.set_current_price(2_000.0);
        let id = amm.add_market(Market::new(2_000.0, t0().plus_days(7)));

        for _ in 0..50 {
            amm.b_token_buy(id, 200.0, OptionType::Call).unwrap();
        }
        assert_eq!(amm.current_iv(id).unwrap(), IV_CEILING);

        for _ in 0..100 {
            amm.b_token_sell(id, 200.0, OptionType::Call).unwrap();
        }
        assert!(amm.current_iv(id).unwrap() < IV_CEILING);
        assert!(amm.current_iv(id).unwrap() >= IV_FLOOR);
    }

    #[test]
    fn event_log_stays_bounded() {
        let config = AmmConfig {
            max_events: 64,
            ..AmmConfig::default()
        };
        let mut amm = MinterAmm::new(10_000.0, per_second_iv(0.8), t0(), config);
        amm.set_current_price(2_000.0);
        let id = amm.add_market(Market::new(2_000.0, t0().plus_days(7)));

        for _ in 0..500 {
            amm.b_token_buy(id, 1.0, OptionType::Call).unwrap();
            amm.b_token_sell(id, 1.0, OptionType::Call).unwrap();
        }
        assert!(amm.events().len() <= 64);
        let last = amm.recent_events(1);
        assert!(matches!(last[0].payload, EventPayload::IvRepriced(_)));
    }

    #[test]
    fn weekly_listing_and_settlement_cycle() {
        let mut amm = MinterAmm::new(1_000.0, per_second_iv(0.8), t0(), AmmConfig::default());
        let oracle = BlackScholes::new();
        let mut price = 2_000.0;

        for week in 0..52 {
            let now = t0().plus_days(7 * week);
            amm.set_timestamp(now);
            amm.set_current_price(price);

            let report = amm.settle(OptionType::Call, 0.0).unwrap();
            assert!(report.len() <= 1);

            let expiration = now.plus_days(7);
            let strike = strike_for_delta(&oracle, OptionType::Call, 0.1, now, price, expiration, 0.8).unwrap();
            let id = amm.add_market(Market::new(strike, expiration));
            let size = amm.collateral_reserve();
            let premium = amm.price_for_market(id, OptionType::Call).unwrap() * size;
            amm.b_token_buy_direct(id, size, premium, OptionType::Call).unwrap();

            assert!(amm.collateral_reserve() >= 0.0);
            price *= if week % 3 == 0 { 1.08 } else { 0.98 };
        }

        assert_eq!(amm.market_count(), 52);
        assert_eq!(amm.unsettled_markets().count(), 1);
        assert!(amm.collateral_reserve() > 0.0);
    }
}
