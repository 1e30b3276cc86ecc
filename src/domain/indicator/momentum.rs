//! Momentum: percentage change between the latest close and the close
//! `period` observations back. Needs `period + 1` closes.

use crate::domain::price_series::PriceSeries;

pub fn calculate_momentum(series: &PriceSeries, period: usize) -> Option<f64> {
    if period == 0 {
        return None;
    }
    let window = series.window(period + 1)?;
    let current = window[0];
    let past = window[period];
    Some((current - past) / past * 100.0)
}
