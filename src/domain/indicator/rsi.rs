//! RSI (Relative Strength Index) indicator.
//!
//! Simple (not Wilder-smoothed) averages over the most recent `period`
//! price changes, each change taken chronologically (newer - older):
//! - avg_gain = sum(max(change, 0)) / n
//! - avg_loss = sum(max(-change, 0)) / n
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100 when there were gains, otherwise 50.
//!
//! Needs `period + 1` closes.

use crate::domain::price_series::PriceSeries;

pub fn calculate_rsi(series: &PriceSeries, period: usize) -> Option<f64> {
    if period == 0 {
        return None;
    }
    let window = series.window(period + 1)?;

    let mut gains = 0.0;
    let mut losses = 0.0;
    for pair in window.windows(2) {
        let change = pair[0] - pair[1];
        if change > 0.0 {
            gains += change;
        } else {
            losses += -change;
        }
    }

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return Some(if avg_gain > 0.0 { 100.0 } else { 50.0 });
    }

    Some(100.0 - (100.0 / (1.0 + avg_gain / avg_loss)))
}
