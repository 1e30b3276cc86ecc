//! Mean reversion: fade closes outside the Bollinger bands when RSI agrees.

use std::collections::BTreeMap;

use super::{MarketContext, SignalStrategy};
use crate::domain::indicator::IndicatorBundle;
use crate::domain::signal::{Direction, RawSignal, StrategyKind};

pub const RSI_OVERSOLD: f64 = 30.0;
pub const RSI_OVERBOUGHT: f64 = 70.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct MeanReversionStrategy;

impl MeanReversionStrategy {
    /// Evaluate one bundle. Returns `None` unless price, RSI and both bands
    /// are present.
    pub fn evaluate(bundle: &IndicatorBundle) -> Option<RawSignal> {
        let price = bundle.current_price?;
        let rsi = bundle.rsi?;
        let upper = bundle.bb_upper?;
        let lower = bundle.bb_lower?;

        let (direction, strength) = if price < lower && rsi < RSI_OVERSOLD {
            (
                Direction::Long,
                ((RSI_OVERSOLD - rsi) / 30.0).clamp(0.0, 1.0),
            )
        } else if price > upper && rsi > RSI_OVERBOUGHT {
            (
                Direction::Short,
                ((rsi - RSI_OVERBOUGHT) / 30.0).clamp(0.0, 1.0),
            )
        } else {
            (Direction::Flat, 0.0)
        };

        let width = upper - lower;
        let z_score = if width != 0.0 {
            (price - bundle.sma20.unwrap_or(price)) / width
        } else {
            0.0
        };

        Some(RawSignal {
            direction,
            strength,
            z_score,
            momentum_score: 0.0,
            rsi,
            realized_vol: bundle.volatility,
        })
    }
}

impl SignalStrategy for MeanReversionStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MeanReversion
    }

    fn generate(&self, ctx: &MarketContext<'_>) -> BTreeMap<String, RawSignal> {
        ctx.indicators
            .iter()
            .filter(|(_, bundle)| !bundle.is_empty())
            .filter_map(|(symbol, bundle)| Self::evaluate(bundle).map(|s| (symbol.clone(), s)))
            .collect()
    }
}
