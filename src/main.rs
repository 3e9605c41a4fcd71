//! Option AMM simulation.
//!
//! Walks the engine through quoting, trading, IV repricing and settlement,
//! then runs year-long weekly option-writing simulations on synthetic paths.

use minter_amm::*;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    println!("Bonding-Curve Option AMM Simulation");
    println!("Single Collateral Pool, Weekly Expiries\n");

    scenario_1_quotes()?;
    scenario_2_trading_and_iv()?;
    scenario_3_settlement()?;
    scenario_4_unhedged_year()?;
    scenario_5_hedged_strategies()?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

fn reference_engine(config: AmmConfig) -> (MinterAmm, MarketId) {
    let now = SIMULATION_EPOCH;
    let mut amm = MinterAmm::new(1_000.0, per_second_iv(0.25), now, config);
    let id = amm.add_market(Market::new(2_200.0, now.plus_days(7)));
    amm.set_current_price(2_000.0);
    (amm, id)
}

/// Oracle price, curve quotes and slippage on a fresh market.
fn scenario_1_quotes() -> Result<(), Box<dyn Error>> {
    println!("Scenario 1: Quotes on an Empty Pool\n");

    let (amm, id) = reference_engine(AmmConfig::default());
    let price = amm.price_for_market(id, OptionType::Call)?;
    println!("  Call 2200, 7 days, spot 2000, IV 25%");
    println!("  Oracle bToken price: {:.6}", price);

    for amount in [1.0, 10.0, 100.0] {
        let buy = amm.quote_b_token_buy(id, amount, OptionType::Call)?;
        let sell = amm.quote_b_token_sell(id, amount, OptionType::Call)?;
        let slippage = amm.slippage(id, amount, TradeDirection::Buy, OptionType::Call)?;
        println!(
            "  {:>5} bTokens: buy {:.6}, sell {:.6}, buy slippage {:.3}%",
            amount, buy.collateral, sell.collateral, slippage
        );
    }
    println!();
    Ok(())
}

/// Fills move IV; fees accrue outside the reserve; IV decays back to target.
fn scenario_2_trading_and_iv() -> Result<(), Box<dyn Error>> {
    println!("Scenario 2: Trading and IV Repricing\n");

    let (mut amm, id) = reference_engine(AmmConfig::with_fees());

    let buy = amm.b_token_buy(id, 50.0, OptionType::Call)?;
    println!(
        "  Buy 50 bTokens for {:.4} (fee {:.4}), IV {:.1}% -> {:.1}%",
        buy.collateral,
        buy.fee,
        annualize_iv(buy.iv_before) * 100.0,
        annualize_iv(buy.iv_after) * 100.0
    );

    let w_buy = amm.w_token_buy(id, 20.0, OptionType::Call)?;
    println!(
        "  Buy 20 wTokens for {:.4}, IV -> {:.1}%",
        w_buy.collateral,
        annualize_iv(w_buy.iv_after) * 100.0
    );

    let sell = amm.b_token_sell(id, 30.0, OptionType::Call)?;
    println!(
        "  Sell 30 bTokens for {:.4}, {} pairs closed, IV -> {:.1}%",
        sell.collateral,
        sell.closed,
        annualize_iv(sell.iv_after) * 100.0
    );

    println!(
        "  Reserve {:.4}, fees {:.4}, exposure {}",
        amm.collateral_reserve(),
        amm.accrued_fees(),
        amm.exposure(id)?
    );

    amm.set_timestamp(amm.timestamp().plus_days(1));
    println!(
        "  One day later IV decays to {:.1}% (target {:.1}%)\n",
        annualize_iv(amm.current_iv(id)?) * 100.0,
        annualize_iv(amm.target_iv()) * 100.0
    );
    Ok(())
}

/// Expiry pays each side of the pool's inventory.
fn scenario_3_settlement() -> Result<(), Box<dyn Error>> {
    println!("Scenario 3: Settlement\n");

    let now = SIMULATION_EPOCH;
    let mut amm = MinterAmm::new(1_000.0, per_second_iv(0.8), now, AmmConfig::default());
    let expiry = now.plus_days(7);
    let ids = amm.add_markets(&[Market::new(1_800.0, expiry), Market::new(2_400.0, expiry)]);
    amm.set_current_price(2_000.0);

    for id in &ids {
        let theoretical = amm.price_for_market(*id, OptionType::Call)?;
        amm.b_token_buy_direct(*id, 100.0, 100.0 * theoretical, OptionType::Call)?;
    }
    println!("  Sold 100 calls at 1800 and 2400, reserve {:.4}", amm.collateral_reserve());

    amm.set_timestamp(expiry);
    amm.set_current_price(2_100.0);
    let report = amm.settle(OptionType::Call, 0.0)?;
    for settled in &report.markets {
        println!(
            "  Market {}: buyer {:.4}, writer {:.4}, credited {:.4}",
            settled.market_id, settled.shares.buyer, settled.shares.writer, settled.collateral_credited
        );
    }
    println!("  Reserve after settlement: {:.4}\n", amm.collateral_reserve());
    Ok(())
}

fn print_summary(label: &str, result: &SimulationResult) {
    println!(
        "  {:<20} listed {:>2}, suppressed {:>2}, settled {:>2}, return {:>8.3}%, pool ${:>12.2}",
        label,
        result.weeks_listed,
        result.weeks_suppressed,
        result.settlements,
        result.collateral_return().unwrap_or_default() * 100.0,
        result.final_pool_value_usd().unwrap_or_default()
    );
}

/// Covered calls, cash-secured puts and the selective writer on one synthetic year.
fn scenario_4_unhedged_year() -> Result<(), Box<dyn Error>> {
    println!("Scenario 4: One Year Unhedged\n");

    let path = HourlyPath::synthetic(42, SAMPLE_LENGTH, 1.0, 0.8, 2_000.0, SIMULATION_EPOCH);
    println!(
        "  Synthetic path: {} hourly prices, {:.2} -> {:.2}",
        path.len(),
        path.prices[0],
        path.prices[path.len() - 1]
    );

    for preset in [Preset::Calls, Preset::Puts, Preset::Selective] {
        let sim = Simulation::new(preset.config())?;
        let result = sim.run_path(&path, &mut Unhedged::new())?;
        print_summary(&format!("{:?}", preset), &result);
    }
    println!();
    Ok(())
}

/// Perpetual delta hedging against the same path.
fn scenario_5_hedged_strategies() -> Result<(), Box<dyn Error>> {
    println!("Scenario 5: Hedged Strategies\n");

    let path = HourlyPath::synthetic(7, SAMPLE_LENGTH, 1.5, 1.0, 2_000.0, SIMULATION_EPOCH);
    let sim = Simulation::new(SimulationConfig::calls())?;

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
        let result = sim.clone().with_epoch(epoch).run_path(&path, strategy.as_mut())?;
        print_summary(strategy.name(), &result);
    }
    Ok(())
}
