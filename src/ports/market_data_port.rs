//! Read access to stored market prices.

use crate::domain::error::PapertraderError;

pub trait MarketDataPort {
    /// Every symbol with at least one stored quote, sorted.
    fn list_symbols(&self) -> Result<Vec<String>, PapertraderError>;

    /// Up to `limit` closing prices, most recent first. Empty when the symbol
    /// has no quotes.
    fn price_history(&self, symbol: &str, limit: usize) -> Result<Vec<f64>, PapertraderError>;

    /// Latest close, or `None` when the symbol has no quotes.
    fn current_price(&self, symbol: &str) -> Result<Option<f64>, PapertraderError>;
}
