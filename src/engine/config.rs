//! AMM engine configuration.

use crate::config::ConfigError;
use crate::curve::COLLATERAL_FEE_CAP_PERCENT;
use crate::volatility::{IV_CEILING, IV_FLOOR};
use serde::{Deserialize, Serialize};

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmmConfig {
    /// Trading fee as a percentage of traded token notional.
    pub fee_percent: f64,
    /// Fee cap as a percentage of premium-side collateral.
    pub collateral_fee_cap_percent: f64,
    /// Lower IV clamp, per-second units.
    pub iv_floor: f64,
    /// Upper IV clamp, per-second units.
    pub iv_ceiling: f64,
    /// Linear IV reversion per elapsed second.
    pub iv_decay_rate: f64,
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Log every event at debug level.
    pub verbose: bool,
}

impl Default for AmmConfig {
    fn default() -> Self {
        Self {
            fee_percent: 0.0,
            collateral_fee_cap_percent: COLLATERAL_FEE_CAP_PERCENT,
            iv_floor: IV_FLOOR,
            iv_ceiling: IV_CEILING,
            iv_decay_rate: 0.0,
            max_events: 100_000,
            verbose: false,
        }
    }
}

impl AmmConfig {
    /// Fee-charging pool with IV that relaxes back to target over roughly a day.
    pub fn with_fees() -> Self {
        Self {
            fee_percent: 0.3,
            iv_decay_rate: 1e-10,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..100.0).contains(&self.fee_percent) {
            return Err(ConfigError::InvalidFees {
                reason: format!("fee percent {} outside [0, 100)", self.fee_percent),
            });
        }
        if self.collateral_fee_cap_percent <= 0.0 || self.collateral_fee_cap_percent > 100.0 {
            return Err(ConfigError::InvalidFees {
                reason: format!("collateral fee cap {} outside (0, 100]", self.collateral_fee_cap_percent),
            });
        }
        if self.iv_floor <= 0.0 || self.iv_floor >= self.iv_ceiling {
            return Err(ConfigError::InvalidVolatility {
                reason: "IV floor must be positive and below the ceiling".to_string(),
            });
        }
        if self.iv_decay_rate < 0.0 {
            return Err(ConfigError::InvalidVolatility {
                reason: "IV decay rate must not be negative".to_string(),
            });
        }
        if self.max_events == 0 {
            return Err(ConfigError::InvalidEngine {
                reason: "event log needs room for at least one event".to_string(),
            });
        }
        Ok(())
    }
}
