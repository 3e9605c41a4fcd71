// 1.0: all the primitives live here. market handles, option side, token kind, timestamps,
// and the IV unit conversion. each id is a newtype so the compiler catches index mixups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const SECONDS_PER_HOUR: i64 = 3_600;
pub const SECONDS_PER_DAY: i64 = 86_400;
pub const SECONDS_PER_YEAR: f64 = 86_400.0 * 365.0;

/// Multiplier from the engine's per-second IV to the oracle's annualized IV.
pub const IV_ANNUALIZATION: f64 = 5_615.692_299_262_843;

// stable position in the engine's market arena. never reused, never reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarketId(pub usize);

impl MarketId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// 1.1: call pays when spot ends above strike, put when below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn is_call(&self) -> bool {
        matches!(self, OptionType::Call)
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Call => write!(f, "call"),
            OptionType::Put => write!(f, "put"),
        }
    }
}

// 1.2: bToken = buyer claim, wToken = writer claim. one of each is backed by one collateral unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Token {
    BToken,
    WToken,
}

impl Token {
    pub fn complement(&self) -> Self {
        match self {
            Token::BToken => Token::WToken,
            Token::WToken => Token::BToken,
        }
    }
}

// from the trader's point of view. Buy = trader receives tokens from the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    Buy,
    Sell,
}

// 1.3: unix timestamp in whole seconds. the engine clock and IV decay run on seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }

    pub fn as_secs(&self) -> i64 {
        self.0
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.0, 0)
    }

    pub fn plus_secs(&self, secs: i64) -> Self {
        Self(self.0 + secs)
    }

    pub fn plus_hours(&self, hours: i64) -> Self {
        self.plus_secs(hours * SECONDS_PER_HOUR)
    }

    pub fn plus_days(&self, days: i64) -> Self {
        self.plus_secs(days * SECONDS_PER_DAY)
    }

    // negative when `later` is before self
    pub fn seconds_until(&self, later: &Timestamp) -> i64 {
        later.0 - self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S UTC")),
            None => write!(f, "{}s", self.0),
        }
    }
}

// 1.4: the engine keeps IV per sqrt-second, the oracle wants annualized.
// every oracle call site goes through these two.
pub fn annualize_iv(per_second: f64) -> f64 {
    per_second * IV_ANNUALIZATION
}

pub fn per_second_iv(annualized: f64) -> f64 {
    annualized / IV_ANNUALIZATION
}
