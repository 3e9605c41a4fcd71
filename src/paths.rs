// 10.0: hourly price paths for simulation. 10.1 return transforms, 10.2 block
// bootstrap from a standardized return sample, 10.3 the HourlyPath container.
//
// log returns are resampled in standardized form, rescaled to a target hourly
// drift and vol, then compounded from p0.

use crate::types::Timestamp;
use crate::volatility::{implied_from_realized, realized_volatility, HOURS_PER_DAY, RV_WINDOW_DAYS};
use rand::Rng;
use rand::SeedableRng;
use rand_distr::StandardNormal;
use rand_pcg::Pcg64;

pub const HOURS_PER_YEAR: f64 = 365.0 * 24.0;

/// One year of hourly ticks plus the realized-vol warmup window.
pub const SAMPLE_LENGTH: usize = 365 * HOURS_PER_DAY + RV_WINDOW_DAYS * HOURS_PER_DAY;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("Return sample is empty")]
    EmptySample,

    #[error("Invalid block length range {min}..={max}")]
    InvalidBlock { min: usize, max: usize },
}

// 10.1: yearly median growth factor -> hourly log drift
pub fn hourly_mu(yearly_median: f64) -> f64 {
    yearly_median.ln() / HOURS_PER_YEAR
}

pub fn hourly_sigma(yearly_sigma: f64) -> f64 {
    yearly_sigma / HOURS_PER_YEAR.sqrt()
}

/// Zero mean, unit population std-dev. A constant sample maps to all zeros.
pub fn standardized_returns(returns: &[f64]) -> Vec<f64> {
    if returns.is_empty() {
        return Vec::new();
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let std = (returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n).sqrt();
    if std == 0.0 {
        return vec![0.0; returns.len()];
    }
    returns.iter().map(|r| (r - mean) / std).collect()
}

pub fn unstandardize(std_returns: &[f64], mu: f64, sigma: f64) -> Vec<f64> {
    std_returns.iter().map(|r| r * sigma + mu).collect()
}

/// `p0` followed by `p0 * exp(cumsum(returns))`; one longer than the input.
pub fn prices_from_log_returns(returns: &[f64], p0: f64) -> Vec<f64> {
    let mut prices = Vec::with_capacity(returns.len() + 1);
    prices.push(p0);
    let mut cumulative = 0.0;
    for r in returns {
        cumulative += r;
        prices.push(p0 * cumulative.exp());
    }
    prices
}

pub fn synthetic_std_returns<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<f64> {
    (0..n).map(|_| rng.sample::<f64, _>(StandardNormal)).collect()
}

// 10.2: contiguous blocks keep some of the sample's autocorrelation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapParams {
    pub sample_length: usize,
    pub min_block: usize,
    pub max_block: usize,
    pub with_replacement: bool,
}

impl Default for BootstrapParams {
    fn default() -> Self {
        Self {
            sample_length: SAMPLE_LENGTH,
            min_block: 24,
            max_block: 72,
            with_replacement: false,
        }
    }
}

/// Draw blocks of `min_block..=max_block` consecutive returns until
/// `sample_length` is reached, truncating the last block.
///
/// Without replacement drawn blocks are removed from the pool. If the sample
/// is not longer than `sample_length` that cannot finish, so it falls back to
/// drawing with replacement.
pub fn bootstrap_path<R: Rng + ?Sized>(
    returns: &[f64],
    params: &BootstrapParams,
    rng: &mut R,
) -> Result<Vec<f64>, PathError> {
    if returns.is_empty() {
        return Err(PathError::EmptySample);
    }
    if params.min_block == 0 || params.min_block > params.max_block || params.max_block > returns.len() {
        return Err(PathError::InvalidBlock {
            min: params.min_block,
            max: params.max_block,
        });
    }

    let with_replacement = params.with_replacement || params.sample_length >= returns.len();
    if !params.with_replacement && with_replacement {
        tracing::warn!(
            sample = returns.len(),
            wanted = params.sample_length,
            "sample too short to draw without replacement, drawing with replacement"
        );
    }

    let mut pool = returns.to_vec();
    let mut path = Vec::with_capacity(params.sample_length);
    while path.len() < params.sample_length {
        let block = rng
            .gen_range(params.min_block..=params.max_block)
            .min(params.sample_length - path.len())
            .min(pool.len());
        let start = rng.gen_range(0..=pool.len() - block);
        if with_replacement {
            path.extend_from_slice(&pool[start..start + block]);
        } else {
            path.extend(pool.drain(start..start + block));
        }
    }
    Ok(path)
}

// 10.3: hourly prices starting at `start`
#[derive(Debug, Clone)]
pub struct HourlyPath {
    pub start: Timestamp,
    pub prices: Vec<f64>,
}

impl HourlyPath {
    pub fn new(start: Timestamp, prices: Vec<f64>) -> Self {
        Self { start, prices }
    }

    /// Rescale standardized returns to the hourly drift/vol and compound from `p0`.
    pub fn from_std_returns(std_returns: &[f64], mu: f64, sigma: f64, p0: f64, start: Timestamp) -> Self {
        let returns = unstandardize(std_returns, mu, sigma);
        Self::new(start, prices_from_log_returns(&returns, p0))
    }

    /// Seeded Gaussian path for a yearly median growth and yearly vol.
    pub fn synthetic(seed: u64, hours: usize, yearly_median: f64, yearly_sigma: f64, p0: f64, start: Timestamp) -> Self {
        let mut rng = Pcg64::seed_from_u64(seed);
        let std_returns = synthetic_std_returns(hours, &mut rng);
        Self::from_std_returns(&std_returns, hourly_mu(yearly_median), hourly_sigma(yearly_sigma), p0, start)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn timestamp_at(&self, index: usize) -> Timestamp {
        self.start.plus_hours(index as i64)
    }

    pub fn ticks(&self) -> impl Iterator<Item = (Timestamp, f64)> + '_ {
        self.prices
            .iter()
            .enumerate()
            .map(move |(i, price)| (self.timestamp_at(i), *price))
    }

    /// Implied vol series from trailing realized vol. aligned to the end of the path.
    pub fn implied_vols(&self, window_days: usize, premium: f64, cap: f64) -> Vec<f64> {
        let realized = realized_volatility(&self.prices, window_days, HOURS_PER_DAY);
        implied_from_realized(&realized, premium, cap)
    }
}
