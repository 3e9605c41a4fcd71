// 12.0: the weekly option-writing driver. walks an hourly path with an explicit
// tick state machine:
//
//   AwaitingSettlement -> settle expired market, credit hedge P&L, close hedges,
//                         then list next week's market or sit the week out
//   Trading            -> strategy hedges the live market
//   IvSuppressed       -> IV was below min_iv at the last expiry; nothing live
//
// every Friday 08:00 tick moves to AwaitingSettlement. each tick emits one
// TickRecord and one PoolValueRecord.

use crate::config::{ConfigError, SimulationConfig};
use crate::engine::{AmmError, MinterAmm};
use crate::expiry::{is_expiration, next_expiry};
use crate::market::Market;
use crate::oracle::{strike_for_delta, BlackScholes, OracleError, PricingOracle};
use crate::paths::HourlyPath;
use crate::strategy::Strategy;
use crate::types::{per_second_iv, MarketId, Timestamp, SECONDS_PER_HOUR};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Amm(#[from] AmmError),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("{count} markets settled at {timestamp}, expected at most one")]
    MultipleSettlements { count: usize, timestamp: Timestamp },

    #[error("Path has no ticks to simulate")]
    EmptyPath,

    #[error("{implied_vols} implied vols for a path of {prices} prices")]
    PathNotAligned { prices: usize, implied_vols: usize },

    #[error("No expiry could be computed from {0}")]
    Calendar(Timestamp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickState {
    Trading,
    AwaitingSettlement,
    IvSuppressed,
}

/// Market-side view of one tick. `None` where nothing is live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickRecord {
    pub timestamp: Timestamp,
    pub epoch_id: usize,
    pub state: TickState,
    pub market_id: Option<MarketId>,
    pub trade_size: Option<f64>,
    pub implied_vol: f64,
    pub b_token_reserve: Option<f64>,
    pub w_token_reserve: Option<f64>,
    pub underlying_price: f64,
    /// Normalized price the live market was sold at
    pub theoretical_price: Option<f64>,
    pub strike: Option<f64>,
    pub pool_position_delta: f64,
    pub exposure: f64,
    pub hedge_delta: Option<f64>,
}

/// Pool-side view of one tick. values in collateral units unless suffixed `_usd`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolValueRecord {
    pub timestamp: Timestamp,
    pub epoch_id: usize,
    pub pool_value_usd: f64,
    pub pool_value: f64,
    pub hedge_value: Option<f64>,
    pub settled_pool_value: Option<f64>,
    pub buyer_share: Option<f64>,
    pub writer_share: Option<f64>,
    pub collateral_reserve: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub epoch_id: usize,
    pub strategy: String,
    pub ticks: Vec<TickRecord>,
    pub pool_values: Vec<PoolValueRecord>,
    pub settlements: usize,
    pub weeks_listed: usize,
    pub weeks_suppressed: usize,
}

impl SimulationResult {
    pub fn final_pool_value(&self) -> Option<f64> {
        self.pool_values.last().map(|r| r.pool_value)
    }

    pub fn final_pool_value_usd(&self) -> Option<f64> {
        self.pool_values.last().map(|r| r.pool_value_usd)
    }

    pub fn initial_pool_value(&self) -> Option<f64> {
        self.pool_values.first().map(|r| r.pool_value)
    }

    /// Final over initial pool value in collateral units, minus one.
    pub fn collateral_return(&self) -> Option<f64> {
        match (self.initial_pool_value(), self.final_pool_value()) {
            (Some(start), Some(end)) if start != 0.0 => Some(end / start - 1.0),
            _ => None,
        }
    }
}

// one week's listing outcome, carried across ticks
#[derive(Debug, Clone, Copy, Default)]
struct LiveWeek {
    trade_size: Option<f64>,
    theoretical_price: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimulationConfig,
    epoch_id: usize,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        Ok(Self { config, epoch_id: 0 })
    }

    pub fn with_epoch(mut self, epoch_id: usize) -> Self {
        self.epoch_id = epoch_id;
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Derive the IV series from the path's own realized vol, then run.
    pub fn run_path(&self, path: &HourlyPath, strategy: &mut dyn Strategy) -> Result<SimulationResult, SimulationError> {
        let implied_vols = path.implied_vols(self.config.rv_window_days, self.config.iv_premium, self.config.iv_cap);
        self.run(path, &implied_vols, strategy)
    }

    /// Run over the ticks of `path` covered by `implied_vols` (aligned to the path's end).
    pub fn run(
        &self,
        path: &HourlyPath,
        implied_vols: &[f64],
        strategy: &mut dyn Strategy,
    ) -> Result<SimulationResult, SimulationError> {
        self.run_with_oracle(path, implied_vols, strategy, Box::new(BlackScholes::new()))
    }

    pub fn run_with_oracle(
        &self,
        path: &HourlyPath,
        implied_vols: &[f64],
        strategy: &mut dyn Strategy,
        oracle: Box<dyn PricingOracle>,
    ) -> Result<SimulationResult, SimulationError> {
        if implied_vols.len() > path.len() {
            return Err(SimulationError::PathNotAligned {
                prices: path.len(),
                implied_vols: implied_vols.len(),
            });
        }
        if implied_vols.is_empty() {
            return Err(SimulationError::EmptyPath);
        }
        let offset = path.len() - implied_vols.len();

        // first Friday 08:00 at or after the first tick with an IV
        let iv_start = path.timestamp_at(offset);
        let mut start = next_expiry(iv_start).ok_or(SimulationError::Calendar(iv_start))?;
        if start < iv_start {
            start = next_expiry(iv_start.plus_days(1)).ok_or(SimulationError::Calendar(iv_start))?;
        }
        let first = offset + (iv_start.seconds_until(&start) / SECONDS_PER_HOUR) as usize;
        if first >= path.len() {
            return Err(SimulationError::EmptyPath);
        }

        let config = &self.config;
        let option_type = config.option_type;
        let mut amm = MinterAmm::with_oracle(
            config.collateral_reserve,
            per_second_iv(implied_vols[first - offset]),
            start,
            config.amm.clone(),
            oracle,
        );

        tracing::info!(
            epoch = self.epoch_id,
            strategy = strategy.name(),
            %option_type,
            %start,
            ticks = path.len() - first,
            "simulation started"
        );

        let mut result = SimulationResult {
            epoch_id: self.epoch_id,
            strategy: strategy.name().to_string(),
            ticks: Vec::with_capacity(path.len() - first),
            pool_values: Vec::with_capacity(path.len() - first),
            settlements: 0,
            weeks_listed: 0,
            weeks_suppressed: 0,
        };
        let mut state = TickState::AwaitingSettlement;
        let mut week = LiveWeek::default();

        for index in first..path.len() {
            let now = path.timestamp_at(index);
            let price = path.prices[index];
            let iv = implied_vols[index - offset];
            amm.set_timestamp(now);
            amm.set_current_price(price);

            if is_expiration(now) {
                state = TickState::AwaitingSettlement;
            }

            let mut hedge_value = None;
            let mut hedge_delta = None;
            let mut settled_pool_value = None;
            let mut buyer_share = None;
            let mut writer_share = None;

            if state == TickState::AwaitingSettlement {
                let pnl = strategy.pnl(price);
                hedge_value = Some(pnl);
                let report = amm.settle(option_type, pnl)?;
                if report.len() > 1 {
                    return Err(SimulationError::MultipleSettlements {
                        count: report.len(),
                        timestamp: now,
                    });
                }
                if let Some(settled) = report.markets.first() {
                    buyer_share = Some(settled.shares.buyer);
                    writer_share = Some(settled.shares.writer);
                    result.settlements += 1;
                }
                settled_pool_value = Some(amm.collateral_reserve());

                strategy.expired();
                hedge_delta = Some(strategy.delta());

                if iv < config.min_iv {
                    tracing::info!(%now, iv, min_iv = config.min_iv, "implied vol too low, skipping the week");
                    state = TickState::IvSuppressed;
                    result.weeks_suppressed += 1;
                } else {
                    week = self.list_week(&mut amm, strategy, now, price, iv)?;
                    state = TickState::Trading;
                    result.weeks_listed += 1;
                }
            }

            let mut trade_size = week.trade_size;
            if state == TickState::Trading {
                trade_size = strategy.last_trade_size();
                strategy.hedge(now, price, iv, option_type, amm.oracle());
                hedge_value = Some(strategy.pnl(price));
                hedge_delta = Some(strategy.delta());
            }

            let mut pool_value = amm.collateral_reserve();
            let mut tick = TickRecord {
                timestamp: now,
                epoch_id: self.epoch_id,
                state,
                market_id: None,
                trade_size,
                implied_vol: iv,
                b_token_reserve: None,
                w_token_reserve: None,
                underlying_price: price,
                theoretical_price: week.theoretical_price,
                strike: None,
                pool_position_delta: 0.0,
                exposure: 0.0,
                hedge_delta,
            };

            if state != TickState::IvSuppressed {
                if let Some(slot) = amm.markets().last() {
                    let market = slot.market;
                    let oracle = amm.oracle();
                    let b_price = oracle.price(now, price, market.strike, market.expiration, iv, option_type);
                    pool_value += b_price * slot.b_token_reserve + (1.0 - b_price) * slot.w_token_reserve;

                    tick.market_id = Some(slot.id);
                    tick.b_token_reserve = Some(slot.b_token_reserve);
                    tick.w_token_reserve = Some(slot.w_token_reserve);
                    tick.strike = Some(market.strike);
                    tick.pool_position_delta =
                        -oracle.delta(now, price, market.strike, market.expiration, iv, option_type);
                    tick.exposure = slot.exposure();
                }
            }

            result.ticks.push(tick);
            result.pool_values.push(PoolValueRecord {
                timestamp: now,
                epoch_id: self.epoch_id,
                pool_value_usd: pool_value * price,
                pool_value,
                hedge_value,
                settled_pool_value,
                buyer_share,
                writer_share,
                collateral_reserve: amm.collateral_reserve(),
            });
        }

        tracing::info!(
            epoch = self.epoch_id,
            settlements = result.settlements,
            weeks_listed = result.weeks_listed,
            weeks_suppressed = result.weeks_suppressed,
            final_pool_value = result.final_pool_value().unwrap_or_default(),
            "simulation finished"
        );
        Ok(result)
    }

    // list next Friday's market at the target-delta strike and sell the strategy's
    // size to the pool at the oracle price
    fn list_week(
        &self,
        amm: &mut MinterAmm,
        strategy: &mut dyn Strategy,
        now: Timestamp,
        price: f64,
        iv: f64,
    ) -> Result<LiveWeek, SimulationError> {
        let option_type = self.config.option_type;
        let expiration = next_expiry(now.plus_days(1)).ok_or(SimulationError::Calendar(now))?;
        let strike = strike_for_delta(
            amm.oracle(),
            option_type,
            self.config.target_delta,
            now,
            price,
            expiration,
            iv,
        )?;

        let market = Market::new(strike, expiration);
        amm.set_target_iv(per_second_iv(iv));
        let market_id = amm.add_market(market);

        let trade_size = strategy.new_trade_size(amm, &market, option_type);
        let theoretical_price = amm
            .oracle()
            .price(now, price, strike, expiration, iv, option_type);
        amm.b_token_buy_direct(market_id, trade_size, trade_size * theoretical_price, option_type)?;
        strategy.set_market(market);

        Ok(LiveWeek {
            trade_size: Some(trade_size),
            theoretical_price: Some(theoretical_price),
        })
    }
}
