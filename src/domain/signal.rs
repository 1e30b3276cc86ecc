//! Directional signal records produced by the strategy set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
    Flat,
}

impl Direction {
    /// Encoded as +1 / -1 / 0.
    pub fn as_i8(self) -> i8 {
        match self {
            Direction::Long => 1,
            Direction::Short => -1,
            Direction::Flat => 0,
        }
    }

    pub fn from_i8(value: i8) -> Option<Direction> {
        match value {
            1 => Some(Direction::Long),
            -1 => Some(Direction::Short),
            0 => Some(Direction::Flat),
            _ => None,
        }
    }

    pub fn magnitude(self) -> f64 {
        f64::from(self.as_i8().abs())
    }

    pub fn is_flat(self) -> bool {
        self == Direction::Flat
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StrategyKind {
    MeanReversion,
    Momentum,
    StatisticalArbitrage,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::MeanReversion => "mean_reversion",
            StrategyKind::Momentum => "momentum",
            StrategyKind::StatisticalArbitrage => "statistical_arbitrage",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean_reversion" => Ok(StrategyKind::MeanReversion),
            "momentum" => Ok(StrategyKind::Momentum),
            "statistical_arbitrage" => Ok(StrategyKind::StatisticalArbitrage),
            other => Err(format!("unknown strategy type: {other}")),
        }
    }
}

/// Strategy output before the merger stamps it with a strategy, size and time.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSignal {
    pub direction: Direction,
    pub strength: f64,
    pub z_score: f64,
    pub momentum_score: f64,
    pub rsi: f64,
    /// `None` when the strategy has no volatility estimate.
    pub realized_vol: Option<f64>,
}

impl RawSignal {
    pub fn flat() -> Self {
        RawSignal {
            direction: Direction::Flat,
            strength: 0.0,
            z_score: 0.0,
            momentum_score: 0.0,
            rsi: 50.0,
            realized_vol: None,
        }
    }

    /// `|direction| × strength`
    pub fn conviction(&self) -> f64 {
        self.direction.magnitude() * self.strength
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub symbol: String,
    pub strategy: StrategyKind,
    pub direction: Direction,
    pub strength: f64,
    pub z_score: f64,
    pub momentum_score: f64,
    pub rsi: f64,
    pub realized_vol: f64,
    pub recommended_size: f64,
    pub generated_at: DateTime<Utc>,
}

impl SignalRecord {
    pub fn conviction(&self) -> f64 {
        self.direction.magnitude() * self.strength
    }
}
