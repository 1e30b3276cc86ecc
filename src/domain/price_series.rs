//! Ordered close history for one symbol, most recent first.

use super::error::PapertraderError;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    closes: Vec<f64>,
}

impl PriceSeries {
    /// Build a series from closes ordered most-recent-first.
    ///
    /// Every close must be finite and strictly positive; returns and momentum
    /// divide by historical prices.
    pub fn new(symbol: impl Into<String>, closes: Vec<f64>) -> Result<Self, PapertraderError> {
        let symbol = symbol.into();
        if let Some(&bad) = closes.iter().find(|p| !p.is_finite() || **p <= 0.0) {
            return Err(PapertraderError::InvalidPrice { symbol, value: bad });
        }
        Ok(Self { symbol, closes })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Closes, most recent first.
    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn latest(&self) -> Option<f64> {
        self.closes.first().copied()
    }

    /// The `n` most recent closes, or `None` when the series is shorter.
    pub fn window(&self, n: usize) -> Option<&[f64]> {
        if n == 0 || self.closes.len() < n {
            None
        } else {
            Some(&self.closes[..n])
        }
    }
}
