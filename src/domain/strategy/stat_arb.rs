//! Statistical arbitrage over configured symbol pairs.
//!
//! The spread z-score is measured against a fixed baseline mean and scale
//! rather than a historical spread distribution. Both are carried as
//! `*_simplified` parameters so the stand-in is visible wherever it is used.

use std::collections::BTreeMap;

use super::{MarketContext, SignalStrategy};
use crate::domain::signal::{Direction, RawSignal, StrategyKind};
use crate::domain::universe::Pair;

#[derive(Debug, Clone, PartialEq)]
pub struct StatArbParams {
    pub spread_mean_simplified: f64,
    pub spread_scale_simplified: f64,
    pub entry_z: f64,
    /// Volatility attached to pair signals for sizing.
    pub pair_volatility: f64,
}

impl Default for StatArbParams {
    fn default() -> Self {
        StatArbParams {
            spread_mean_simplified: 100.0,
            spread_scale_simplified: 50.0,
            entry_z: 2.0,
            pair_volatility: 0.015,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatArbStrategy {
    pairs: Vec<Pair>,
    params: StatArbParams,
}

impl StatArbStrategy {
    pub fn new(pairs: Vec<Pair>, params: StatArbParams) -> Self {
        Self { pairs, params }
    }

    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    pub fn z_score(&self, first_price: f64, second_price: f64) -> f64 {
        let spread = first_price - second_price;
        (spread - self.params.spread_mean_simplified) / self.params.spread_scale_simplified
    }

    /// Signal for one pair given both current prices.
    pub fn evaluate(&self, first_price: f64, second_price: f64) -> RawSignal {
        let z = self.z_score(first_price, second_price);

        let direction = if z > self.params.entry_z {
            Direction::Short
        } else if z < -self.params.entry_z {
            Direction::Long
        } else {
            Direction::Flat
        };

        let strength = if direction.is_flat() {
            0.0
        } else {
            (z.abs() / 3.0).clamp(0.0, 1.0)
        };

        RawSignal {
            direction,
            strength,
            z_score: z,
            momentum_score: 0.0,
            rsi: 50.0,
            realized_vol: Some(self.params.pair_volatility),
        }
    }
}

impl SignalStrategy for StatArbStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::StatisticalArbitrage
    }

    fn generate(&self, ctx: &MarketContext<'_>) -> BTreeMap<String, RawSignal> {
        self.pairs
            .iter()
            .filter_map(|pair| {
                let first = ctx.prices.get(&pair.first)?;
                let second = ctx.prices.get(&pair.second)?;
                let signal = self.evaluate(*first, *second);
                signal.z_score.is_finite().then(|| (pair.key(), signal))
            })
            .collect()
    }
}
