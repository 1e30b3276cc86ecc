//! Standard Deviation indicator.
//!
//! Population standard deviation over the `period` most recent closes, taken
//! around a caller-supplied mean (the SMA over the same window).
//! STDDEV(n) = sqrt(sum((C[j] - mean)^2 for j in 0..n) / n)

use crate::domain::price_series::PriceSeries;

pub fn calculate_stddev(series: &PriceSeries, mean: f64, period: usize) -> Option<f64> {
    let window = series.window(period)?;
    let variance: f64 = window
        .iter()
        .map(|p| {
            let diff = p - mean;
            diff * diff
        })
        .sum::<f64>()
        / period as f64;
    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::sma::calculate_sma;

    fn series(prices: &[f64]) -> PriceSeries {
        PriceSeries::new("TEST", prices.to_vec()).unwrap()
    }

    #[test]
    fn stddev_constant_values() {
        let s = series(&[100.0, 100.0, 100.0, 100.0, 100.0]);
        let mean = calculate_sma(&s, 3).unwrap();
        let v = calculate_stddev(&s, mean, 3).unwrap();
        assert!((v - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn stddev_basic_calculation() {
        let s = series(&[30.0, 20.0, 10.0]);
        let mean = calculate_sma(&s, 3).unwrap();
        let v = calculate_stddev(&s, mean, 3).unwrap();
        let expected: f64 =
            ((10.0 - mean).powi(2) + (20.0 - mean).powi(2) + (30.0 - mean).powi(2)) / 3.0;
        assert!((v - expected.sqrt()).abs() < 1e-10);
    }

    #[test]
    fn stddev_known_values() {
        let s = series(&[9.0, 7.0, 5.0, 5.0, 4.0, 4.0, 4.0, 2.0]);
        let mean = calculate_sma(&s, 8).unwrap();
        let v = calculate_stddev(&s, mean, 8).unwrap();
        assert!((v - 2.0).abs() < 1e-10);
    }

    #[test]
    fn stddev_insufficient_data() {
        let s = series(&[1.0, 2.0]);
        assert!(calculate_stddev(&s, 1.5, 3).is_none());
    }
}
