//! Technical indicator implementations.
//!
//! Every indicator is a pure function over a [`PriceSeries`] (most recent
//! first) that returns `None` when its minimum window is not met:
//! - `IndicatorKind`: indicator identity, used as the bundle field name
//! - `IndicatorBundle`: all indicators for one symbol at one evaluation point
//! - `calculate_all`: bundle computation gated on [`MIN_HISTORY`]

pub mod bollinger;
pub mod momentum;
pub mod rsi;
pub mod sma;
pub mod stddev;
pub mod volatility;

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::price_series::PriceSeries;

pub use bollinger::{calculate_bollinger, Bands};
pub use momentum::calculate_momentum;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use stddev::calculate_stddev;
pub use volatility::calculate_volatility;

/// Minimum history length before the engine evaluates a symbol at all.
pub const MIN_HISTORY: usize = 100;

pub const SMA_SHORT_PERIOD: usize = 20;
pub const SMA_LONG_PERIOD: usize = 90;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_MULT: f64 = 2.0;
pub const RSI_PERIOD: usize = 14;
pub const VOLATILITY_PERIOD: usize = 30;
pub const MOMENTUM_PERIOD: usize = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndicatorKind {
    CurrentPrice,
    Sma20,
    Sma90,
    Rsi,
    Volatility,
    Momentum,
    BollingerUpper,
    BollingerMiddle,
    BollingerLower,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 9] = [
        IndicatorKind::CurrentPrice,
        IndicatorKind::Sma20,
        IndicatorKind::Sma90,
        IndicatorKind::Rsi,
        IndicatorKind::Volatility,
        IndicatorKind::Momentum,
        IndicatorKind::BollingerUpper,
        IndicatorKind::BollingerMiddle,
        IndicatorKind::BollingerLower,
    ];
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::CurrentPrice => write!(f, "current_price"),
            IndicatorKind::Sma20 => write!(f, "sma20"),
            IndicatorKind::Sma90 => write!(f, "sma90"),
            IndicatorKind::Rsi => write!(f, "rsi"),
            IndicatorKind::Volatility => write!(f, "volatility"),
            IndicatorKind::Momentum => write!(f, "momentum"),
            IndicatorKind::BollingerUpper => write!(f, "bb_upper"),
            IndicatorKind::BollingerMiddle => write!(f, "bb_middle"),
            IndicatorKind::BollingerLower => write!(f, "bb_lower"),
        }
    }
}

/// Indicators for one symbol at one evaluation point.
///
/// Fields whose minimum window was not met are `None`; no field is ever
/// zero-filled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorBundle {
    pub current_price: Option<f64>,
    pub sma20: Option<f64>,
    pub sma90: Option<f64>,
    pub rsi: Option<f64>,
    pub volatility: Option<f64>,
    pub momentum: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
}

impl IndicatorBundle {
    /// Compute every indicator whose precondition holds for `series`.
    pub fn from_series(series: &PriceSeries) -> Self {
        let bands = calculate_bollinger(series, BOLLINGER_PERIOD, BOLLINGER_MULT);
        IndicatorBundle {
            current_price: finite(series.latest()),
            sma20: finite(calculate_sma(series, SMA_SHORT_PERIOD)),
            sma90: finite(calculate_sma(series, SMA_LONG_PERIOD)),
            rsi: finite(calculate_rsi(series, RSI_PERIOD)),
            volatility: finite(calculate_volatility(series, VOLATILITY_PERIOD)),
            momentum: finite(calculate_momentum(series, MOMENTUM_PERIOD)),
            bb_upper: finite(bands.map(|b| b.upper)),
            bb_middle: finite(bands.map(|b| b.middle)),
            bb_lower: finite(bands.map(|b| b.lower)),
        }
    }

    pub fn get(&self, kind: IndicatorKind) -> Option<f64> {
        match kind {
            IndicatorKind::CurrentPrice => self.current_price,
            IndicatorKind::Sma20 => self.sma20,
            IndicatorKind::Sma90 => self.sma90,
            IndicatorKind::Rsi => self.rsi,
            IndicatorKind::Volatility => self.volatility,
            IndicatorKind::Momentum => self.momentum,
            IndicatorKind::BollingerUpper => self.bb_upper,
            IndicatorKind::BollingerMiddle => self.bb_middle,
            IndicatorKind::BollingerLower => self.bb_lower,
        }
    }

    pub fn present_count(&self) -> usize {
        IndicatorKind::ALL
            .iter()
            .filter(|k| self.get(**k).is_some())
            .count()
    }

    /// A bundle with no computed field means "no indicators available".
    pub fn is_empty(&self) -> bool {
        self.present_count() == 0
    }

    /// Present fields keyed by indicator name.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        IndicatorKind::ALL
            .iter()
            .filter_map(|k| self.get(*k).map(|v| (k.to_string(), v)))
            .collect()
    }
}

/// Full bundle for a series of at least [`MIN_HISTORY`] points.
///
/// Returns `None` for short series and for bundles with no computed field.
pub fn calculate_all(series: &PriceSeries) -> Option<IndicatorBundle> {
    if series.len() < MIN_HISTORY {
        return None;
    }
    let bundle = IndicatorBundle::from_series(series);
    if bundle.is_empty() { None } else { Some(bundle) }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}
