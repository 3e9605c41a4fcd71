// 3.0: pricing oracle. the engine never prices options itself, it asks an oracle.
// 3.1 is the contract, 3.2 the zero-rate Black-Scholes implementation, 3.3 the strike search
// used when listing a new weekly market.

use crate::types::{OptionType, Timestamp, SECONDS_PER_YEAR};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

const STRIKE_SEARCH_TOLERANCE: f64 = 0.01;
const STRIKE_SEARCH_MAX_ITERATIONS: usize = 200;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OracleError {
    #[error("Strike search did not reach delta {target_delta} within {iterations} iterations")]
    NoConvergence { target_delta: f64, iterations: usize },

    #[error("Invalid oracle input: {0}")]
    InvalidInput(String),
}

/// 3.1: pure pricing function. volatility is annualized, times are unix seconds.
///
/// `price` and `vega` are normalized by spot so they live in collateral units
/// of the underlying; `vega` is d(price)/d(volatility) per unit of annualized vol.
pub trait PricingOracle: std::fmt::Debug {
    fn price(
        &self,
        now: Timestamp,
        spot: f64,
        strike: f64,
        expiration: Timestamp,
        volatility: f64,
        option_type: OptionType,
    ) -> f64;

    fn delta(
        &self,
        now: Timestamp,
        spot: f64,
        strike: f64,
        expiration: Timestamp,
        volatility: f64,
        option_type: OptionType,
    ) -> f64;

    /// Call-convention vega.
    fn vega(&self, now: Timestamp, spot: f64, strike: f64, expiration: Timestamp, volatility: f64) -> f64;
}

// 3.2: zero interest rate, zero dividends. T in years of 365 days.
#[derive(Debug, Clone)]
pub struct BlackScholes {
    normal: Normal,
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self::new()
    }
}

impl BlackScholes {
    pub fn new() -> Self {
        Self { normal: Normal::standard() }
    }

    pub fn years_to_expiry(now: Timestamp, expiration: Timestamp) -> f64 {
        (now.seconds_until(&expiration).max(0) as f64) / SECONDS_PER_YEAR
    }

    // None when there is no time value left to price
    fn d1(spot: f64, strike: f64, years: f64, volatility: f64) -> Option<f64> {
        if years <= 0.0 || volatility <= 0.0 {
            return None;
        }
        let vol_sqrt_t = volatility * years.sqrt();
        Some(((spot / strike).ln() + 0.5 * volatility * volatility * years) / vol_sqrt_t)
    }

    /// Call premium in quote units.
    pub fn call_price(&self, spot: f64, strike: f64, years: f64, volatility: f64) -> f64 {
        match Self::d1(spot, strike, years, volatility) {
            Some(d1) => {
                let d2 = d1 - volatility * years.sqrt();
                spot * self.normal.cdf(d1) - strike * self.normal.cdf(d2)
            }
            None => (spot - strike).max(0.0),
        }
    }

    /// Put premium in quote units.
    pub fn put_price(&self, spot: f64, strike: f64, years: f64, volatility: f64) -> f64 {
        match Self::d1(spot, strike, years, volatility) {
            Some(d1) => {
                let d2 = d1 - volatility * years.sqrt();
                strike * self.normal.cdf(-d2) - spot * self.normal.cdf(-d1)
            }
            None => (strike - spot).max(0.0),
        }
    }

    pub fn call_delta(&self, spot: f64, strike: f64, years: f64, volatility: f64) -> f64 {
        match Self::d1(spot, strike, years, volatility) {
            Some(d1) => self.normal.cdf(d1),
            None if spot > strike => 1.0,
            None => 0.0,
        }
    }

    pub fn put_delta(&self, spot: f64, strike: f64, years: f64, volatility: f64) -> f64 {
        match Self::d1(spot, strike, years, volatility) {
            Some(d1) => self.normal.cdf(d1) - 1.0,
            None if spot < strike => -1.0,
            None => 0.0,
        }
    }

    /// Quote-unit vega, d(premium)/d(volatility).
    pub fn raw_vega(&self, spot: f64, strike: f64, years: f64, volatility: f64) -> f64 {
        match Self::d1(spot, strike, years, volatility) {
            Some(d1) => spot * self.normal.pdf(d1) * years.sqrt(),
            None => 0.0,
        }
    }
}

impl PricingOracle for BlackScholes {
    fn price(
        &self,
        now: Timestamp,
        spot: f64,
        strike: f64,
        expiration: Timestamp,
        volatility: f64,
        option_type: OptionType,
    ) -> f64 {
        let years = Self::years_to_expiry(now, expiration);
        let premium = match option_type {
            OptionType::Call => self.call_price(spot, strike, years, volatility),
            OptionType::Put => self.put_price(spot, strike, years, volatility),
        };
        premium / spot
    }

    fn delta(
        &self,
        now: Timestamp,
        spot: f64,
        strike: f64,
        expiration: Timestamp,
        volatility: f64,
        option_type: OptionType,
    ) -> f64 {
        let years = Self::years_to_expiry(now, expiration);
        match option_type {
            OptionType::Call => self.call_delta(spot, strike, years, volatility),
            OptionType::Put => self.put_delta(spot, strike, years, volatility),
        }
    }

    fn vega(&self, now: Timestamp, spot: f64, strike: f64, expiration: Timestamp, volatility: f64) -> f64 {
        let years = Self::years_to_expiry(now, expiration);
        self.raw_vega(spot, strike, years, volatility) / spot
    }
}

/// 3.3: bisect for the strike whose delta is within 0.01 of `target_delta`,
/// then snap to two significant figures.
///
/// Call deltas live in [0, 1], put deltas in [-1, 0]. Between the truncated and
/// the ceiled grid strike, the one whose delta lands closer to target wins.
#[allow(clippy::too_many_arguments)]
pub fn strike_for_delta<O: PricingOracle + ?Sized>(
    oracle: &O,
    option_type: OptionType,
    target_delta: f64,
    now: Timestamp,
    spot: f64,
    expiration: Timestamp,
    volatility: f64,
) -> Result<f64, OracleError> {
    if spot <= 0.0 || !spot.is_finite() {
        return Err(OracleError::InvalidInput(format!("spot must be positive, got {spot}")));
    }
    if volatility <= 0.0 {
        return Err(OracleError::InvalidInput(format!("volatility must be positive, got {volatility}")));
    }
    if expiration <= now {
        return Err(OracleError::InvalidInput(format!("expiration {expiration} is not after {now}")));
    }

    let delta_at = |strike: f64| oracle.delta(now, spot, strike, expiration, volatility, option_type);

    let (mut low, mut high) = (0.0_f64, 10.0 * spot);
    for _ in 0..STRIKE_SEARCH_MAX_ITERATIONS {
        let strike = low + (high - low) / 2.0;
        let current = delta_at(strike);

        if (current - target_delta).abs() <= STRIKE_SEARCH_TOLERANCE {
            let (truncated, ceiled) = snap_to_grid(strike)?;
            let diff_truncated = (delta_at(truncated) - target_delta).abs();
            let diff_ceiled = (delta_at(ceiled) - target_delta).abs();
            return Ok(if diff_ceiled < diff_truncated { ceiled } else { truncated });
        }

        // both call and put deltas fall as strike rises
        let strike_too_low = match option_type {
            OptionType::Call => current > target_delta,
            OptionType::Put => current >= target_delta,
        };
        if strike_too_low {
            low = strike;
        } else {
            high = strike;
        }
    }

    Err(OracleError::NoConvergence {
        target_delta,
        iterations: STRIKE_SEARCH_MAX_ITERATIONS,
    })
}

// listing grid spacing: one unit in the second significant figure
fn grid_step(strike: f64) -> Decimal {
    let digits = strike.log10().floor() as i32;
    let decimals = 1 - digits;
    if decimals >= 0 {
        Decimal::new(1, decimals as u32)
    } else {
        Decimal::from(10_i64.pow((-decimals) as u32))
    }
}

/// Truncated and ceiled strike at two significant figures, e.g. 2247.3 -> (2200, 2300).
pub fn snap_to_grid(strike: f64) -> Result<(f64, f64), OracleError> {
    let value = Decimal::from_f64(strike)
        .ok_or_else(|| OracleError::InvalidInput(format!("strike {strike} not representable")))?;

    let step = grid_step(strike);
    let truncated = (value / step).trunc() * step;
    let ceiled = (value / step).ceil() * step;

    match (truncated.to_f64(), ceiled.to_f64()) {
        (Some(t), Some(c)) => Ok((t, c)),
        _ => Err(OracleError::InvalidInput(format!("strike {strike} lost on grid snap"))),
    }
}
