//! Cross-sectional momentum: rank every symbol by its momentum score, go
//! long the top quintile and short the bottom quintile.

use std::collections::BTreeMap;

use super::{MarketContext, SignalStrategy};
use crate::domain::indicator::IndicatorBundle;
use crate::domain::signal::{Direction, RawSignal, StrategyKind};

const STRENGTH_RANGE: f64 = 0.3;
const STRENGTH_FLOOR: f64 = 0.7;
const DEFAULT_RSI: f64 = 50.0;
const DEFAULT_VOLATILITY: f64 = 0.02;

#[derive(Debug, Clone, Copy, Default)]
pub struct MomentumStrategy;

/// Rank cut points for `n` symbols: ranks below `long_cut` are long, ranks
/// at or above `short_cut` are short.
pub fn bucket_cuts(n: usize) -> (usize, usize) {
    let long_cut = (n / 5).max(1);
    let short_cut = (n * 4 / 5).max(1);
    (long_cut, short_cut)
}

impl MomentumStrategy {
    /// Rank `(symbol, score)` pairs and assign direction and strength.
    ///
    /// Sorted by score descending with symbol name as the tie-breaker.
    pub fn rank(scores: &[(String, f64)]) -> Vec<(String, Direction, f64)> {
        let mut sorted: Vec<&(String, f64)> = scores.iter().collect();
        sorted.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let n = sorted.len();
        let (long_cut, short_cut) = bucket_cuts(n);

        sorted
            .into_iter()
            .enumerate()
            .map(|(rank, (symbol, _))| {
                let (direction, strength) = if rank < long_cut {
                    (
                        Direction::Long,
                        1.0 - (rank as f64 / long_cut as f64) * STRENGTH_RANGE,
                    )
                } else if rank >= short_cut {
                    let span = (n - short_cut) as f64;
                    (
                        Direction::Short,
                        ((rank - short_cut) as f64 / span) * STRENGTH_RANGE + STRENGTH_FLOOR,
                    )
                } else {
                    (Direction::Flat, 0.0)
                };
                (symbol.clone(), direction, strength)
            })
            .collect()
    }
}

impl SignalStrategy for MomentumStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Momentum
    }

    fn generate(&self, ctx: &MarketContext<'_>) -> BTreeMap<String, RawSignal> {
        let usable: BTreeMap<&String, &IndicatorBundle> = ctx
            .indicators
            .iter()
            .filter(|(_, bundle)| !bundle.is_empty())
            .collect();

        let scores: Vec<(String, f64)> = usable
            .iter()
            .map(|(symbol, bundle)| ((*symbol).clone(), bundle.momentum.unwrap_or(0.0)))
            .collect();

        Self::rank(&scores)
            .into_iter()
            .map(|(symbol, direction, strength)| {
                let bundle = usable[&symbol];
                let raw = RawSignal {
                    direction,
                    strength,
                    z_score: 0.0,
                    momentum_score: bundle.momentum.unwrap_or(0.0),
                    rsi: bundle.rsi.unwrap_or(DEFAULT_RSI),
                    realized_vol: Some(bundle.volatility.unwrap_or(DEFAULT_VOLATILITY)),
                };
                (symbol, raw)
            })
            .collect()
    }
}
