//! Realized volatility: population standard deviation of the most recent
//! `period` simple returns, each return taken chronologically
//! ((newer - older) / older). Needs `period + 1` closes.

use crate::domain::price_series::PriceSeries;

pub fn calculate_volatility(series: &PriceSeries, period: usize) -> Option<f64> {
    if period == 0 {
        return None;
    }
    let window = series.window(period + 1)?;

    let returns: Vec<f64> = window
        .windows(2)
        .map(|pair| (pair[0] - pair[1]) / pair[1])
        .collect();

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns
        .iter()
        .map(|r| {
            let diff = r - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;

    Some(variance.sqrt())
}
