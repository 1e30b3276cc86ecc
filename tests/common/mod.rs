#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use papertrader::adapters::memory_adapter::MemoryAdapter;
use papertrader::domain::engine::EngineConfig;
use papertrader::domain::error::PapertraderError;
use papertrader::domain::portfolio::{PortfolioSnapshot, StrategyBreakdown};
use papertrader::domain::position::{Position, PositionChange, PositionEffect, TradeIntent};
pub use papertrader::domain::quote::Quote;
use papertrader::domain::signal::{Direction, SignalRecord, StrategyKind};
use papertrader::domain::universe::{Pair, Universe};
use papertrader::ports::market_data_port::MarketDataPort;
use papertrader::ports::store_port::StorePort;
use std::cell::Cell;
use std::collections::HashMap;

pub fn ts(day: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 21, 0, 0).unwrap() + chrono::Duration::days(day)
}

/// Closes, oldest first, that end with RSI = 75 and the last close above the
/// 20-period upper Bollinger band.
pub fn overbought_spike() -> Vec<f64> {
    let mut closes = vec![100.0; 86];
    for k in 1..=13 {
        closes.push(100.0 - 0.1 * k as f64);
    }
    closes.push(102.6);
    closes
}

/// `n` closes, oldest first, compounding by `growth` per step.
pub fn trending(n: usize, start: f64, growth: f64) -> Vec<f64> {
    (0..n).map(|i| start * (1.0 + growth).powi(i as i32)).collect()
}

pub fn make_quote(symbol: &str, day: i64, close: f64) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        timestamp: ts(day),
        open: close,
        high: close * 1.01,
        low: close * 0.99,
        close,
        volume: 10_000,
    }
}

/// Quotes for `closes` (oldest first), one per day ending on day 0.
pub fn quotes_for(symbol: &str, closes: &[f64]) -> Vec<Quote> {
    let n = closes.len() as i64;
    closes
        .iter()
        .enumerate()
        .map(|(i, c)| make_quote(symbol, i as i64 - (n - 1), *c))
        .collect()
}

pub fn make_signal(
    symbol: &str,
    strategy: StrategyKind,
    direction: Direction,
    strength: f64,
    day: i64,
) -> SignalRecord {
    SignalRecord {
        symbol: symbol.to_string(),
        strategy,
        direction,
        strength,
        z_score: 0.0,
        momentum_score: 0.0,
        rsi: 50.0,
        realized_vol: 0.02,
        recommended_size: 0.0,
        generated_at: ts(day),
    }
}

pub fn engine_config(symbols: &[&str], pairs: &[(&str, &str)]) -> EngineConfig {
    EngineConfig {
        universe: Universe {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            pairs: pairs.iter().map(|(a, b)| Pair::new(*a, *b)).collect(),
        },
        ..EngineConfig::default()
    }
}

pub fn seeded_memory(series: &[(&str, Vec<f64>)]) -> MemoryAdapter {
    let store = MemoryAdapter::new();
    for (symbol, closes) in series {
        store.insert_closes(symbol, closes, ts(0));
    }
    store
}

/// Market data that fails for selected symbols.
pub struct MockMarketData {
    pub closes: HashMap<String, Vec<f64>>,
    pub errors: HashMap<String, String>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            closes: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    /// `closes` oldest first.
    pub fn with_closes(mut self, symbol: &str, closes: Vec<f64>) -> Self {
        let mut recent_first = closes;
        recent_first.reverse();
        self.closes.insert(symbol.to_string(), recent_first);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    fn check(&self, symbol: &str) -> Result<(), PapertraderError> {
        match self.errors.get(symbol) {
            Some(reason) => Err(PapertraderError::Database {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl MarketDataPort for MockMarketData {
    fn list_symbols(&self) -> Result<Vec<String>, PapertraderError> {
        let mut symbols: Vec<String> = self.closes.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn price_history(&self, symbol: &str, limit: usize) -> Result<Vec<f64>, PapertraderError> {
        self.check(symbol)?;
        Ok(self
            .closes
            .get(symbol)
            .map(|c| c.iter().take(limit).copied().collect())
            .unwrap_or_default())
    }

    fn current_price(&self, symbol: &str) -> Result<Option<f64>, PapertraderError> {
        self.check(symbol)?;
        Ok(self.closes.get(symbol).and_then(|c| c.first().copied()))
    }
}

/// Store wrapper that rejects every trade commit for the given symbols, as a
/// concurrent pass that got there first would.
pub struct ContendedStore<'a> {
    pub inner: &'a MemoryAdapter,
    pub contended: Vec<String>,
}

impl StorePort for ContendedStore<'_> {
    fn upsert_signal(&self, signal: &SignalRecord) -> Result<(), PapertraderError> {
        self.inner.upsert_signal(signal)
    }

    fn latest_signals(&self) -> Result<Vec<SignalRecord>, PapertraderError> {
        self.inner.latest_signals()
    }

    fn open_positions(&self) -> Result<Vec<Position>, PapertraderError> {
        self.inner.open_positions()
    }

    fn upsert_position(&self, position: &Position) -> Result<(), PapertraderError> {
        self.inner.upsert_position(position)
    }

    fn delete_position(&self, symbol: &str) -> Result<(), PapertraderError> {
        self.inner.delete_position(symbol)
    }

    fn mark_position(&self, position: &Position) -> Result<bool, PapertraderError> {
        self.inner.mark_position(position)
    }

    fn commit_trade(
        &self,
        intent: &TradeIntent,
        change: &PositionChange,
    ) -> Result<(), PapertraderError> {
        if self.contended.iter().any(|s| s == &intent.symbol) {
            return Err(PapertraderError::PositionConflict {
                symbol: intent.symbol.clone(),
                reason: "changed by another pass".to_string(),
            });
        }
        self.inner.commit_trade(intent, change)
    }

    fn append_trade(&self, intent: &TradeIntent) -> Result<(), PapertraderError> {
        self.inner.append_trade(intent)
    }

    fn trade_log(&self) -> Result<Vec<TradeIntent>, PapertraderError> {
        self.inner.trade_log()
    }

    fn append_portfolio_snapshot(
        &self,
        snapshot: &PortfolioSnapshot,
    ) -> Result<(), PapertraderError> {
        self.inner.append_portfolio_snapshot(snapshot)
    }

    fn latest_portfolio_snapshot(&self) -> Result<Option<PortfolioSnapshot>, PapertraderError> {
        self.inner.latest_portfolio_snapshot()
    }

    fn append_strategy_breakdown(
        &self,
        breakdown: &[StrategyBreakdown],
    ) -> Result<(), PapertraderError> {
        self.inner.append_strategy_breakdown(breakdown)
    }
}

/// Store wrapper that lets another pass close `symbol` at `price` right after
/// the first read of open positions.
pub struct RacingCloseStore<'a> {
    pub inner: &'a dyn StorePort,
    pub symbol: String,
    pub price: f64,
    pub closed: Cell<bool>,
}

impl<'a> RacingCloseStore<'a> {
    pub fn new(inner: &'a dyn StorePort, symbol: &str, price: f64) -> Self {
        Self {
            inner,
            symbol: symbol.to_string(),
            price,
            closed: Cell::new(false),
        }
    }

    fn close_elsewhere(&self, positions: &[Position]) -> Result<(), PapertraderError> {
        let Some(held) = positions.iter().find(|p| p.symbol == self.symbol) else {
            return Ok(());
        };
        let intent = TradeIntent {
            symbol: held.symbol.clone(),
            side: held.closing_side(),
            quantity: held.quantity.abs(),
            price: self.price,
            strategy: held.strategy,
            timestamp: ts(0),
            effect: PositionEffect::Close,
            realized_pnl: held.unrealized_pnl_at(self.price),
        };
        let change = PositionChange::Close {
            symbol: held.symbol.clone(),
            expected_quantity: held.quantity,
        };
        self.inner.commit_trade(&intent, &change)
    }
}

impl StorePort for RacingCloseStore<'_> {
    fn upsert_signal(&self, signal: &SignalRecord) -> Result<(), PapertraderError> {
        self.inner.upsert_signal(signal)
    }

    fn latest_signals(&self) -> Result<Vec<SignalRecord>, PapertraderError> {
        self.inner.latest_signals()
    }

    fn open_positions(&self) -> Result<Vec<Position>, PapertraderError> {
        let positions = self.inner.open_positions()?;
        if !self.closed.replace(true) {
            self.close_elsewhere(&positions)?;
        }
        Ok(positions)
    }

    fn upsert_position(&self, position: &Position) -> Result<(), PapertraderError> {
        self.inner.upsert_position(position)
    }

    fn delete_position(&self, symbol: &str) -> Result<(), PapertraderError> {
        self.inner.delete_position(symbol)
    }

    fn mark_position(&self, position: &Position) -> Result<bool, PapertraderError> {
        self.inner.mark_position(position)
    }

    fn commit_trade(
        &self,
        intent: &TradeIntent,
        change: &PositionChange,
    ) -> Result<(), PapertraderError> {
        self.inner.commit_trade(intent, change)
    }

    fn append_trade(&self, intent: &TradeIntent) -> Result<(), PapertraderError> {
        self.inner.append_trade(intent)
    }

    fn trade_log(&self) -> Result<Vec<TradeIntent>, PapertraderError> {
        self.inner.trade_log()
    }

    fn append_portfolio_snapshot(
        &self,
        snapshot: &PortfolioSnapshot,
    ) -> Result<(), PapertraderError> {
        self.inner.append_portfolio_snapshot(snapshot)
    }

    fn latest_portfolio_snapshot(&self) -> Result<Option<PortfolioSnapshot>, PapertraderError> {
        self.inner.latest_portfolio_snapshot()
    }

    fn append_strategy_breakdown(
        &self,
        breakdown: &[StrategyBreakdown],
    ) -> Result<(), PapertraderError> {
        self.inner.append_strategy_breakdown(breakdown)
    }
}
