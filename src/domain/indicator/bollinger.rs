//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//! A zero deviation is a valid result: all three bands coincide.

use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::stddev::calculate_stddev;
use crate::domain::price_series::PriceSeries;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl Bands {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

pub fn calculate_bollinger(series: &PriceSeries, period: usize, mult: f64) -> Option<Bands> {
    let middle = calculate_sma(series, period)?;
    let stddev = calculate_stddev(series, middle, period)?;
    Some(Bands {
        upper: middle + mult * stddev,
        middle,
        lower: middle - mult * stddev,
    })
}
