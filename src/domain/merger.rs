//! Signal merging and volatility-inverse sizing.
//!
//! recommended_size = (target_risk / realized_vol) × |direction| × strength,
//! rounded to 4 decimal places.

use chrono::{DateTime, Utc};

use super::signal::{RawSignal, SignalRecord};
use super::strategy::StrategyOutput;

#[derive(Debug, Clone, PartialEq)]
pub struct SizingConfig {
    pub target_risk: f64,
    /// Used when a strategy supplies no positive volatility estimate.
    pub default_volatility: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        SizingConfig {
            target_risk: 0.01,
            default_volatility: 0.02,
        }
    }
}

impl SizingConfig {
    pub fn effective_volatility(&self, realized_vol: Option<f64>) -> f64 {
        match realized_vol {
            Some(v) if v.is_finite() && v > 0.0 => v,
            _ => self.default_volatility,
        }
    }

    pub fn recommended_size(&self, raw: &RawSignal) -> f64 {
        let vol = self.effective_volatility(raw.realized_vol);
        round4((self.target_risk / vol) * raw.conviction())
    }
}

pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Flatten strategy outputs into signal records, preserving strategy order.
pub fn merge_signals(
    outputs: &[StrategyOutput],
    sizing: &SizingConfig,
    generated_at: DateTime<Utc>,
) -> Vec<SignalRecord> {
    outputs
        .iter()
        .flat_map(|output| {
            output.signals.iter().map(move |(symbol, raw)| SignalRecord {
                symbol: symbol.clone(),
                strategy: output.strategy,
                direction: raw.direction,
                strength: raw.strength,
                z_score: raw.z_score,
                momentum_score: raw.momentum_score,
                rsi: raw.rsi,
                realized_vol: sizing.effective_volatility(raw.realized_vol),
                recommended_size: sizing.recommended_size(raw),
                generated_at,
            })
        })
        .collect()
}
