// 5.0: implied volatility dynamics. engine IV is kept per sqrt-second (see types::annualize_iv).
// 5.1 decays IV linearly toward target, 5.2 turns trade price impact into an IV shock,
// 5.3 estimates realized volatility from an hourly price series.

/// Policy clamp on engine IV (per-second units), roughly 20%..200% annualized.
pub const IV_FLOOR: f64 = 0.000_035_6;
pub const IV_CEILING: f64 = 0.000_356;

pub const RV_WINDOW_DAYS: usize = 30;
pub const HOURS_PER_DAY: usize = 24;
/// Annualized cap applied when deriving implied vol from realized vol.
pub const IMPLIED_VOL_CAP: f64 = 2.7;

// 5.1: one-sided linear reversion. never crosses target.
pub fn decayed_iv(iv: f64, target_iv: f64, decay_rate: f64, elapsed_secs: i64) -> f64 {
    let decay = decay_rate * elapsed_secs as f64;
    if iv < target_iv {
        target_iv.min(iv + decay)
    } else {
        target_iv.max(iv - decay)
    }
}

/// 5.2: one Newton step from the pre-trade IV. all inputs are annualized/normalized
/// the way the oracle reports them; the result is annualized and unclamped.
///
/// Returns `None` when vega carries no information (zero, negative or non-finite),
/// e.g. at expiry where the option has no time value left.
pub fn vega_step(current_annual_iv: f64, execution_price: f64, theoretical_price: f64, vega: f64) -> Option<f64> {
    if !vega.is_finite() || vega <= 0.0 {
        return None;
    }
    let next = current_annual_iv + (execution_price - theoretical_price) / vega;
    if next.is_nan() {
        None
    } else {
        Some(next)
    }
}

pub fn clamp_iv(iv: f64, floor: f64, ceiling: f64) -> f64 {
    iv.min(ceiling).max(floor)
}

// 5.3: consecutive log returns. one shorter than the input.
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect()
}

/// Rolling population std-dev of log returns over `window_days * samples_per_day`
/// samples, annualized by `sqrt(samples_per_day * 365)`.
///
/// Entry `k` of the output is the estimate as of `prices[k + window]`, so the
/// output is empty when the series is not longer than one window.
pub fn realized_volatility(prices: &[f64], window_days: usize, samples_per_day: usize) -> Vec<f64> {
    let window = window_days * samples_per_day;
    let returns = log_returns(prices);
    if window == 0 || returns.len() < window {
        return Vec::new();
    }

    let annualization = ((samples_per_day * 365) as f64).sqrt();
    returns
        .windows(window)
        .map(|w| {
            let n = w.len() as f64;
            let mean = w.iter().sum::<f64>() / n;
            let variance = w.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
            variance.sqrt() * annualization
        })
        .collect()
}

/// Realized vol plus a constant premium, capped.
pub fn implied_from_realized(realized: &[f64], premium: f64, cap: f64) -> Vec<f64> {
    realized.iter().map(|rv| (rv + premium).min(cap)).collect()
}
