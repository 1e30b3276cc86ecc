//! Signal strategies.
//!
//! Every strategy implements [`SignalStrategy`]: it reads the shared
//! [`MarketContext`] for one pass and returns a `symbol → RawSignal` map,
//! including flat signals for symbols it evaluated but has no view on.

pub mod mean_reversion;
pub mod momentum;
pub mod stat_arb;

use std::collections::BTreeMap;

use crate::domain::indicator::IndicatorBundle;
use crate::domain::signal::{RawSignal, StrategyKind};

pub use mean_reversion::MeanReversionStrategy;
pub use momentum::MomentumStrategy;
pub use stat_arb::{StatArbParams, StatArbStrategy};

/// Inputs shared by all strategies for one pass.
#[derive(Debug, Clone, Copy)]
pub struct MarketContext<'a> {
    /// Symbols with a usable indicator bundle.
    pub indicators: &'a BTreeMap<String, IndicatorBundle>,
    /// Latest close per symbol, for every symbol with stored prices.
    pub prices: &'a BTreeMap<String, f64>,
}

pub trait SignalStrategy {
    fn kind(&self) -> StrategyKind;

    fn generate(&self, ctx: &MarketContext<'_>) -> BTreeMap<String, RawSignal>;
}

/// Output of one strategy, tagged with its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutput {
    pub strategy: StrategyKind,
    pub signals: BTreeMap<String, RawSignal>,
}

/// Ordered collection of strategies run once per pass.
pub struct StrategySet {
    strategies: Vec<Box<dyn SignalStrategy>>,
}

impl StrategySet {
    pub fn new(strategies: Vec<Box<dyn SignalStrategy>>) -> Self {
        Self { strategies }
    }

    /// Mean reversion, momentum, then statistical arbitrage.
    pub fn standard(stat_arb: StatArbStrategy) -> Self {
        Self::new(vec![
            Box::new(MeanReversionStrategy),
            Box::new(MomentumStrategy),
            Box::new(stat_arb),
        ])
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn run(&self, ctx: &MarketContext<'_>) -> Vec<StrategyOutput> {
        self.strategies
            .iter()
            .map(|s| StrategyOutput {
                strategy: s.kind(),
                signals: s.generate(ctx),
            })
            .collect()
    }
}
