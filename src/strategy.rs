// 11.0: how the pool sizes its weekly sale and hedges the resulting short option.
// strategies watch the engine but never mutate it; hedges live in a perpetual book
// whose P&L is paid into the pool at each settlement.
//
// 11.1 Perpetual: the hedge book
// 11.2 Strategy trait
// 11.3 Unhedged, DeltaIntervalHedge, DeltaNonPositiveHedge
// 11.4 StrategyKind: serializable selector

use crate::engine::MinterAmm;
use crate::market::Market;
use crate::oracle::PricingOracle;
use crate::types::{OptionType, Timestamp, SECONDS_PER_HOUR};
use serde::{Deserialize, Serialize};

/// One perpetual fill: size is in underlying units, negative for shorts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerpPosition {
    pub entry_price: f64,
    pub size: f64,
}

// 11.1: P&L is measured in underlying units, i.e. divided by the current price
#[derive(Debug, Clone, Default)]
pub struct Perpetual {
    positions: Vec<PerpPosition>,
}

impl Perpetual {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_position(&mut self, size: f64, price: f64) {
        self.positions.push(PerpPosition { entry_price: price, size });
    }

    pub fn close_all(&mut self) {
        self.positions.clear();
    }

    pub fn positions(&self) -> &[PerpPosition] {
        &self.positions
    }

    pub fn position_size(&self) -> f64 {
        self.positions.iter().map(|p| p.size).sum()
    }

    pub fn pnl(&self, price: f64) -> f64 {
        self.positions
            .iter()
            .map(|p| (price - p.entry_price) / price * p.size)
            .sum()
    }
}

// 11.2
pub trait Strategy {
    fn name(&self) -> &str;

    /// Size of the next weekly sale of `market`, remembered as the last trade size.
    ///
    /// The whole collateral reserve, counted in pairs: a call pair locks one unit
    /// of collateral, a put pair locks `strike`.
    fn new_trade_size(&mut self, amm: &MinterAmm, market: &Market, option_type: OptionType) -> f64;

    fn last_trade_size(&self) -> Option<f64>;

    fn set_market(&mut self, market: Market);

    /// Called every tick while a market is live. `annual_iv` is the tick's implied vol.
    fn hedge(
        &mut self,
        now: Timestamp,
        spot: f64,
        annual_iv: f64,
        option_type: OptionType,
        oracle: &dyn PricingOracle,
    );

    /// Hedge book P&L in underlying units.
    fn pnl(&self, _spot: f64) -> f64 {
        0.0
    }

    /// Hedge position relative to the last trade size.
    fn delta(&self) -> f64 {
        0.0
    }

    /// The live market has settled; hedges are closed.
    fn expired(&mut self) {}
}

// what every strategy tracks about the live week
#[derive(Debug, Clone, Default)]
struct WeekState {
    trade_size: Option<f64>,
    market: Option<Market>,
}

impl WeekState {
    fn new_trade_size(&mut self, amm: &MinterAmm, market: &Market, option_type: OptionType) -> f64 {
        let size = match option_type {
            OptionType::Call => amm.collateral_reserve(),
            OptionType::Put => amm.collateral_reserve() / market.strike,
        };
        self.trade_size = Some(size);
        size
    }
}

// 11.3: sells the whole reserve every week and never hedges
#[derive(Debug, Clone, Default)]
pub struct Unhedged {
    week: WeekState,
}

impl Unhedged {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for Unhedged {
    fn name(&self) -> &str {
        "unhedged"
    }

    fn new_trade_size(&mut self, amm: &MinterAmm, market: &Market, option_type: OptionType) -> f64 {
        self.week.new_trade_size(amm, market, option_type)
    }

    fn last_trade_size(&self) -> Option<f64> {
        self.week.trade_size
    }

    fn set_market(&mut self, market: Market) {
        self.week.market = Some(market);
    }

    fn hedge(&mut self, _: Timestamp, _: f64, _: f64, _: OptionType, _: &dyn PricingOracle) {}
}

// shared plumbing of the perpetual-hedged strategies
#[derive(Debug, Clone)]
struct HedgeBook {
    interval_secs: i64,
    last_hedged: Option<Timestamp>,
    perpetual: Perpetual,
    week: WeekState,
}

impl HedgeBook {
    fn new(interval_hours: i64) -> Self {
        Self {
            interval_secs: interval_hours * SECONDS_PER_HOUR,
            last_hedged: None,
            perpetual: Perpetual::new(),
            week: WeekState::default(),
        }
    }

    // at most once per interval; a successful check counts as a hedge
    fn can_hedge(&mut self, now: Timestamp) -> bool {
        if let Some(last) = self.last_hedged {
            if last.seconds_until(&now) < self.interval_secs {
                return false;
            }
        }
        self.last_hedged = Some(now);
        true
    }

    fn relative_delta(&self) -> f64 {
        match self.week.trade_size {
            Some(size) if size != 0.0 => self.perpetual.position_size() / size,
            _ => 0.0,
        }
    }

    /// (trade size, total delta of short option plus hedge) if a hedge is due
    fn total_delta(
        &mut self,
        now: Timestamp,
        spot: f64,
        annual_iv: f64,
        option_type: OptionType,
        oracle: &dyn PricingOracle,
    ) -> Option<(f64, f64)> {
        let trade_size = self.week.trade_size.filter(|size| *size != 0.0)?;
        let market = self.week.market?;
        if !self.can_hedge(now) {
            return None;
        }
        let option_delta = -oracle.delta(now, spot, market.strike, market.expiration, annual_iv, option_type);
        Some((trade_size, option_delta + self.relative_delta()))
    }
}

/// Rebalances toward `target_delta` whenever total delta drifts `range` away from it.
#[derive(Debug, Clone)]
pub struct DeltaIntervalHedge {
    book: HedgeBook,
    target_delta: f64,
    range: f64,
}

impl DeltaIntervalHedge {
    pub fn new(interval_hours: i64, target_delta: f64, range: f64) -> Self {
        Self {
            book: HedgeBook::new(interval_hours),
            target_delta,
            range,
        }
    }

    pub fn perpetual(&self) -> &Perpetual {
        &self.book.perpetual
    }
}

/// Keeps total delta inside `(max_negative, 0)`: sells perps when it turns
/// non-negative, buys back when it falls to `max_negative` or below.
#[derive(Debug, Clone)]
pub struct DeltaNonPositiveHedge {
    book: HedgeBook,
    max_negative: f64,
}

impl DeltaNonPositiveHedge {
    pub fn new(interval_hours: i64, max_negative: f64) -> Self {
        Self {
            book: HedgeBook::new(interval_hours),
            max_negative,
        }
    }

    pub fn perpetual(&self) -> &Perpetual {
        &self.book.perpetual
    }
}

macro_rules! hedged_strategy_common {
    () => {
        fn new_trade_size(&mut self, amm: &MinterAmm, market: &Market, option_type: OptionType) -> f64 {
            self.book.week.new_trade_size(amm, market, option_type)
        }

        fn last_trade_size(&self) -> Option<f64> {
            self.book.week.trade_size
        }

        fn set_market(&mut self, market: Market) {
            self.book.week.market = Some(market);
        }

        fn pnl(&self, spot: f64) -> f64 {
            self.book.perpetual.pnl(spot)
        }

        fn delta(&self) -> f64 {
            self.book.relative_delta()
        }

        fn expired(&mut self) {
            self.book.perpetual.close_all();
        }
    };
}

impl Strategy for DeltaIntervalHedge {
    fn name(&self) -> &str {
        "delta_interval"
    }

    hedged_strategy_common!();

    fn hedge(&mut self, now: Timestamp, spot: f64, annual_iv: f64, option_type: OptionType, oracle: &dyn PricingOracle) {
        let Some((trade_size, total)) = self.book.total_delta(now, spot, annual_iv, option_type, oracle) else {
            return;
        };
        if (total - self.target_delta).abs() >= self.range {
            let size = (self.target_delta - total) * trade_size;
            tracing::debug!(%now, spot, total, size, "rebalancing hedge toward target delta");
            self.book.perpetual.add_position(size, spot);
        }
    }
}

impl Strategy for DeltaNonPositiveHedge {
    fn name(&self) -> &str {
        "delta_non_positive"
    }

    hedged_strategy_common!();

    fn hedge(&mut self, now: Timestamp, spot: f64, annual_iv: f64, option_type: OptionType, oracle: &dyn PricingOracle) {
        let Some((trade_size, total)) = self.book.total_delta(now, spot, annual_iv, option_type, oracle) else {
            return;
        };
        if total >= 0.0 {
            tracing::debug!(%now, spot, total, "hedge net long, selling perps");
            self.book.perpetual.add_position(-total * trade_size, spot);
        }
        if total <= self.max_negative {
            tracing::debug!(%now, spot, total, "hedge too short, buying perps");
            self.book.perpetual.add_position(-(total - self.max_negative) * trade_size, spot);
        }
    }
}

// 11.4
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyKind {
    Unhedged,
    DeltaInterval {
        interval_hours: i64,
        target_delta: f64,
        range: f64,
    },
    DeltaNonPositive {
        interval_hours: i64,
        max_negative: f64,
    },
}

impl StrategyKind {
    pub fn build(&self) -> Box<dyn Strategy> {
        match *self {
            StrategyKind::Unhedged => Box::new(Unhedged::new()),
            StrategyKind::DeltaInterval {
                interval_hours,
                target_delta,
                range,
            } => Box::new(DeltaIntervalHedge::new(interval_hours, target_delta, range)),
            StrategyKind::DeltaNonPositive {
                interval_hours,
                max_negative,
            } => Box::new(DeltaNonPositiveHedge::new(interval_hours, max_negative)),
        }
    }
}
