//! Simple Moving Average over the most recent `period` closes.

use crate::domain::price_series::PriceSeries;

pub fn calculate_sma(series: &PriceSeries, period: usize) -> Option<f64> {
    let window = series.window(period)?;
    Some(window.iter().sum::<f64>() / period as f64)
}
