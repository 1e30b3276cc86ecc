//! Signal, position, trade and portfolio storage.
//!
//! All records are keyed by symbol (and strategy for signals); the store
//! enforces at most one live signal per `(symbol, strategy)` and at most one
//! open position per symbol.

use crate::domain::error::PapertraderError;
use crate::domain::portfolio::{PortfolioSnapshot, StrategyBreakdown};
use crate::domain::position::{Position, PositionChange, TradeIntent};
use crate::domain::signal::SignalRecord;

pub trait StorePort {
    /// Insert or replace the live signal for `(symbol, strategy)`.
    fn upsert_signal(&self, signal: &SignalRecord) -> Result<(), PapertraderError>;

    /// Every live signal.
    fn latest_signals(&self) -> Result<Vec<SignalRecord>, PapertraderError>;

    /// Open positions ordered by symbol.
    fn open_positions(&self) -> Result<Vec<Position>, PapertraderError>;

    fn upsert_position(&self, position: &Position) -> Result<(), PapertraderError>;

    fn delete_position(&self, symbol: &str) -> Result<(), PapertraderError>;

    /// Write the marked price, unrealized P&L and value of an open position.
    ///
    /// Update only: returns `false` and writes nothing when the symbol is no
    /// longer held, or is held with a different quantity or entry time.
    fn mark_position(&self, position: &Position) -> Result<bool, PapertraderError>;

    /// Append the trade and apply the position change as one atomic unit.
    ///
    /// The stored position is re-read inside the same unit: an open fails if
    /// a position now exists, a close fails unless the stored quantity still
    /// equals the expected one. Either failure is a `PositionConflict` and
    /// leaves the store untouched.
    fn commit_trade(
        &self,
        intent: &TradeIntent,
        change: &PositionChange,
    ) -> Result<(), PapertraderError>;

    /// Append to the trade log without touching positions.
    fn append_trade(&self, intent: &TradeIntent) -> Result<(), PapertraderError>;

    /// The full trade log in chronological order.
    fn trade_log(&self) -> Result<Vec<TradeIntent>, PapertraderError>;

    fn append_portfolio_snapshot(&self, snapshot: &PortfolioSnapshot)
    -> Result<(), PapertraderError>;

    fn latest_portfolio_snapshot(&self) -> Result<Option<PortfolioSnapshot>, PapertraderError>;

    fn append_strategy_breakdown(
        &self,
        breakdown: &[StrategyBreakdown],
    ) -> Result<(), PapertraderError>;

    /// Total value from the latest snapshot, or `default` when none exists.
    fn portfolio_value(&self, default: f64) -> Result<f64, PapertraderError> {
        Ok(self
            .latest_portfolio_snapshot()?
            .map(|s| s.total_value)
            .unwrap_or(default))
    }
}
