// 8.0 config.rs: run-level settings in one place. pool size, listing policy, IV series.
// 8.1 engine knobs live in engine::AmmConfig and are nested here.

use serde::{Deserialize, Serialize};

use crate::engine::AmmConfig;
use crate::types::OptionType;
use crate::volatility::{IMPLIED_VOL_CAP, RV_WINDOW_DAYS};

// Complete configuration for one simulated weekly-option run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    // Collateral seeded into the pool at start
    pub collateral_reserve: f64,
    // Skip listing for the week when annualized IV is below this
    pub min_iv: f64,
    // Delta the weekly strike is searched for (calls [0,1], puts [-1,0])
    pub target_delta: f64,
    pub option_type: OptionType,
    // Constant added to realized vol to get implied vol
    pub iv_premium: f64,
    // Cap on implied vol (annualized)
    pub iv_cap: f64,
    // Realized vol lookback
    pub rv_window_days: usize,
    pub amm: AmmConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            collateral_reserve: 1e9,
            min_iv: 0.0,
            target_delta: 0.1,
            option_type: OptionType::Call,
            iv_premium: 0.05,
            iv_cap: IMPLIED_VOL_CAP,
            rv_window_days: RV_WINDOW_DAYS,
            amm: AmmConfig::default(),
        }
    }
}

impl SimulationConfig {
    // Covered-call writer at 10 delta
    pub fn calls() -> Self {
        Self::default()
    }

    // Cash-secured put writer at -10 delta
    pub fn puts() -> Self {
        Self {
            option_type: OptionType::Put,
            target_delta: -0.1,
            ..Self::default()
        }
    }

    // Only sells when vol pays, charges fees on the curve
    pub fn selective() -> Self {
        Self {
            min_iv: 0.6,
            amm: AmmConfig::with_fees(),
            ..Self::default()
        }
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.collateral_reserve.is_finite() || self.collateral_reserve <= 0.0 {
            return Err(ConfigError::InvalidPool {
                reason: "Collateral reserve must be positive".to_string(),
            });
        }

        let delta_range = match self.option_type {
            OptionType::Call => 0.0..=1.0,
            OptionType::Put => -1.0..=0.0,
        };
        if !delta_range.contains(&self.target_delta) {
            return Err(ConfigError::InvalidListing {
                reason: format!(
                    "Target delta {} outside {:?} for {}s",
                    self.target_delta, delta_range, self.option_type
                ),
            });
        }

        if self.min_iv < 0.0 || self.iv_premium < 0.0 || self.iv_cap <= 0.0 {
            return Err(ConfigError::InvalidVolatility {
                reason: "IV floor, premium and cap must be non-negative".to_string(),
            });
        }

        if self.rv_window_days == 0 {
            return Err(ConfigError::InvalidVolatility {
                reason: "Realized vol window must be at least one day".to_string(),
            });
        }

        self.amm.validate()
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid pool: {reason}")]
    InvalidPool { reason: String },
    #[error("Invalid listing policy: {reason}")]
    InvalidListing { reason: String },
    #[error("Invalid fees: {reason}")]
    InvalidFees { reason: String },
    #[error("Invalid volatility settings: {reason}")]
    InvalidVolatility { reason: String },
    #[error("Invalid engine settings: {reason}")]
    InvalidEngine { reason: String },
}

// Presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Calls,
    Puts,
    Selective,
}

impl Preset {
    pub fn config(&self) -> SimulationConfig {
        match self {
            Preset::Calls => SimulationConfig::calls(),
            Preset::Puts => SimulationConfig::puts(),
            Preset::Selective => SimulationConfig::selective(),
        }
    }
}
