//! In-memory market data and store, for tests and dry runs.

use std::cell::RefCell;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::domain::error::PapertraderError;
use crate::domain::execution::apply_change;
use crate::domain::portfolio::{PortfolioSnapshot, StrategyBreakdown};
use crate::domain::position::{Position, PositionChange, TradeIntent};
use crate::domain::quote::Quote;
use crate::domain::signal::{SignalRecord, StrategyKind};
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::store_port::StorePort;

#[derive(Debug, Default)]
struct State {
    /// symbol → timestamp → close
    prices: BTreeMap<String, BTreeMap<DateTime<Utc>, f64>>,
    signals: BTreeMap<(String, StrategyKind), SignalRecord>,
    positions: BTreeMap<String, Position>,
    trades: Vec<TradeIntent>,
    snapshots: Vec<PortfolioSnapshot>,
    breakdowns: Vec<StrategyBreakdown>,
}

#[derive(Debug, Default)]
pub struct MemoryAdapter {
    state: RefCell<State>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_quotes(&self, quotes: &[Quote]) -> usize {
        let mut state = self.state.borrow_mut();
        for quote in quotes {
            state
                .prices
                .entry(quote.symbol.clone())
                .or_default()
                .insert(quote.timestamp, quote.close);
        }
        quotes.len()
    }

    /// Store closes given oldest first, one per day ending at `last`.
    pub fn insert_closes(&self, symbol: &str, closes: &[f64], last: DateTime<Utc>) {
        let mut state = self.state.borrow_mut();
        let series = state.prices.entry(symbol.to_string()).or_default();
        let n = closes.len() as i64;
        for (i, close) in closes.iter().enumerate() {
            let ts = last - chrono::Duration::days(n - 1 - i as i64);
            series.insert(ts, *close);
        }
    }

    pub fn strategy_breakdowns(&self) -> Vec<StrategyBreakdown> {
        self.state.borrow().breakdowns.clone()
    }

    pub fn snapshots(&self) -> Vec<PortfolioSnapshot> {
        self.state.borrow().snapshots.clone()
    }
}

impl MarketDataPort for MemoryAdapter {
    fn list_symbols(&self) -> Result<Vec<String>, PapertraderError> {
        Ok(self
            .state
            .borrow()
            .prices
            .iter()
            .filter(|(_, series)| !series.is_empty())
            .map(|(symbol, _)| symbol.clone())
            .collect())
    }

    fn price_history(&self, symbol: &str, limit: usize) -> Result<Vec<f64>, PapertraderError> {
        Ok(self
            .state
            .borrow()
            .prices
            .get(symbol)
            .map(|series| series.values().rev().take(limit).copied().collect())
            .unwrap_or_default())
    }

    fn current_price(&self, symbol: &str) -> Result<Option<f64>, PapertraderError> {
        Ok(self
            .state
            .borrow()
            .prices
            .get(symbol)
            .and_then(|series| series.values().next_back().copied()))
    }
}

impl StorePort for MemoryAdapter {
    fn upsert_signal(&self, signal: &SignalRecord) -> Result<(), PapertraderError> {
        self.state
            .borrow_mut()
            .signals
            .insert((signal.symbol.clone(), signal.strategy), signal.clone());
        Ok(())
    }

    fn latest_signals(&self) -> Result<Vec<SignalRecord>, PapertraderError> {
        Ok(self.state.borrow().signals.values().cloned().collect())
    }

    fn open_positions(&self) -> Result<Vec<Position>, PapertraderError> {
        Ok(self.state.borrow().positions.values().cloned().collect())
    }

    fn upsert_position(&self, position: &Position) -> Result<(), PapertraderError> {
        self.state
            .borrow_mut()
            .positions
            .insert(position.symbol.clone(), position.clone());
        Ok(())
    }

    fn delete_position(&self, symbol: &str) -> Result<(), PapertraderError> {
        self.state.borrow_mut().positions.remove(symbol);
        Ok(())
    }

    fn mark_position(&self, position: &Position) -> Result<bool, PapertraderError> {
        let mut state = self.state.borrow_mut();
        match state.positions.get_mut(&position.symbol) {
            Some(held)
                if held.quantity == position.quantity && held.entry_time == position.entry_time =>
            {
                held.current_price = position.current_price;
                held.unrealized_pnl = position.unrealized_pnl;
                held.position_value = position.position_value;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn commit_trade(
        &self,
        intent: &TradeIntent,
        change: &PositionChange,
    ) -> Result<(), PapertraderError> {
        let mut state = self.state.borrow_mut();
        if !apply_change(&mut state.positions, change) {
            let held = state.positions.get(change.symbol()).map(|p| p.quantity);
            return Err(PapertraderError::PositionConflict {
                symbol: change.symbol().to_string(),
                reason: format!("stored quantity {held:?} does not match the planned change"),
            });
        }
        state.trades.push(intent.clone());
        Ok(())
    }

    fn append_trade(&self, intent: &TradeIntent) -> Result<(), PapertraderError> {
        self.state.borrow_mut().trades.push(intent.clone());
        Ok(())
    }

    fn trade_log(&self) -> Result<Vec<TradeIntent>, PapertraderError> {
        let mut trades = self.state.borrow().trades.clone();
        trades.sort_by_key(|t| t.timestamp);
        Ok(trades)
    }

    fn append_portfolio_snapshot(
        &self,
        snapshot: &PortfolioSnapshot,
    ) -> Result<(), PapertraderError> {
        self.state.borrow_mut().snapshots.push(snapshot.clone());
        Ok(())
    }

    fn latest_portfolio_snapshot(&self) -> Result<Option<PortfolioSnapshot>, PapertraderError> {
        // max_by_key keeps the last of equal timestamps, matching insertion order
        Ok(self
            .state
            .borrow()
            .snapshots
            .iter()
            .max_by_key(|s| s.timestamp)
            .cloned())
    }

    fn append_strategy_breakdown(
        &self,
        breakdown: &[StrategyBreakdown],
    ) -> Result<(), PapertraderError> {
        self.state
            .borrow_mut()
            .breakdowns
            .extend_from_slice(breakdown);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{PositionEffect, Side};
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 21, 0, 0).unwrap()
    }

    #[test]
    fn closes_are_returned_most_recent_first() {
        let store = MemoryAdapter::new();
        store.insert_closes("AAPL", &[1.0, 2.0, 3.0], ts());
        assert_eq!(store.price_history("AAPL", 10).unwrap(), vec![3.0, 2.0, 1.0]);
        assert_eq!(store.price_history("AAPL", 1).unwrap(), vec![3.0]);
        assert_eq!(store.current_price("AAPL").unwrap(), Some(3.0));
        assert_eq!(store.current_price("MSFT").unwrap(), None);
        assert_eq!(store.list_symbols().unwrap(), vec!["AAPL"]);
    }

    #[test]
    fn commit_trade_conflict_leaves_state_untouched() {
        let store = MemoryAdapter::new();
        let intent = TradeIntent {
            symbol: "MSFT".into(),
            side: Side::Sell,
            quantity: 10,
            price: 120.0,
            strategy: StrategyKind::Momentum,
            timestamp: ts(),
            effect: PositionEffect::Close,
            realized_pnl: 200.0,
        };
        let change = PositionChange::Close {
            symbol: "MSFT".into(),
            expected_quantity: 10,
        };

        let result = store.commit_trade(&intent, &change);
        assert!(matches!(
            result,
            Err(PapertraderError::PositionConflict { .. })
        ));
        assert!(store.trade_log().unwrap().is_empty());
    }

    #[test]
    fn mark_position_skips_closed_and_resized_positions() {
        let store = MemoryAdapter::new();
        let mut position = Position::open("MSFT", 10, 100.0, StrategyKind::Momentum, ts());
        store.upsert_position(&position).unwrap();

        position.mark(120.0);
        assert!(store.mark_position(&position).unwrap());
        assert_eq!(store.open_positions().unwrap()[0].unrealized_pnl, 200.0);

        let mut resized = position.clone();
        resized.quantity = 4;
        assert!(!store.mark_position(&resized).unwrap());

        store.delete_position("MSFT").unwrap();
        assert!(!store.mark_position(&position).unwrap());
        assert!(store.open_positions().unwrap().is_empty());
    }

    #[test]
    fn latest_snapshot_prefers_newest() {
        let store = MemoryAdapter::new();
        let base = PortfolioSnapshot {
            total_value: 100_000.0,
            unrealized_pnl: 0.0,
            realized_pnl: 0.0,
            win_rate: 0.0,
            total_return_pct: 0.0,
            sharpe_ratio_simplified: 0.8,
            max_drawdown_simplified: -5.0,
            num_positions: 0,
            num_trades: 0,
            timestamp: ts(),
        };
        store.append_portfolio_snapshot(&base).unwrap();
        store
            .append_portfolio_snapshot(&PortfolioSnapshot {
                total_value: 99_000.0,
                timestamp: ts() - chrono::Duration::days(1),
                ..base.clone()
            })
            .unwrap();
        assert_eq!(store.portfolio_value(1.0).unwrap(), 100_000.0);
    }
}
