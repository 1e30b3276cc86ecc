//! Execution reconciler: signals + prices + open positions → trade intents.
//!
//! Per symbol, over the states {no position, long, short}:
//!
//! | held      | signal      | action                                    |
//! |-----------|-------------|-------------------------------------------|
//! | none      | flat        | nothing                                   |
//! | none      | long/short  | open, if quantity > 0 and a slot is free  |
//! | long/short| flat        | close the whole position                  |
//! | long/short| long/short  | nothing (no scaling in, no flipping)      |
//!
//! Closes are planned before opens so that a slot freed this pass can be
//! reused by an open in the same pass.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::position::{Position, PositionChange, PositionEffect, Side, TradeIntent};
use super::signal::{Direction, SignalRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    /// Fraction of portfolio value committed per opening trade.
    pub risk_per_trade: f64,
    pub max_positions: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            risk_per_trade: 0.01,
            max_positions: 50,
        }
    }
}

/// A trade together with the position change it implies.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeAction {
    pub intent: TradeIntent,
    pub change: PositionChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingPrice,
    PositionLimit,
    ZeroQuantity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Skip {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileResult {
    pub actions: Vec<TradeAction>,
    pub skipped: Vec<Skip>,
}

/// Ordering used to pick one signal per symbol: newest first, then highest
/// conviction, then stat-arb over momentum over mean reversion.
fn signal_precedence(a: &SignalRecord, b: &SignalRecord) -> Ordering {
    a.generated_at
        .cmp(&b.generated_at)
        .then_with(|| a.conviction().total_cmp(&b.conviction()))
        .then_with(|| a.strategy.cmp(&b.strategy))
}

/// Select the governing signal for each symbol across all strategies.
pub fn select_latest_signals(signals: &[SignalRecord]) -> BTreeMap<String, SignalRecord> {
    let mut selected: BTreeMap<String, SignalRecord> = BTreeMap::new();
    for signal in signals {
        match selected.get(&signal.symbol) {
            Some(current) if signal_precedence(signal, current) != Ordering::Greater => {}
            _ => {
                selected.insert(signal.symbol.clone(), signal.clone());
            }
        }
    }
    selected
}

/// Whole-share quantity for an opening trade; zero means no trade.
pub fn open_quantity(portfolio_value: f64, risk_per_trade: f64, price: f64, strength: f64) -> i64 {
    if !(price.is_finite() && price > 0.0) {
        return 0;
    }
    let capital_per_trade = portfolio_value * risk_per_trade;
    let quantity = (capital_per_trade / price * strength).floor();
    if quantity.is_finite() && quantity > 0.0 {
        quantity as i64
    } else {
        0
    }
}

fn close_action(position: &Position, price: f64, now: DateTime<Utc>) -> TradeAction {
    TradeAction {
        intent: TradeIntent {
            symbol: position.symbol.clone(),
            side: position.closing_side(),
            quantity: position.quantity.abs(),
            price,
            strategy: position.strategy,
            timestamp: now,
            effect: PositionEffect::Close,
            realized_pnl: position.unrealized_pnl_at(price),
        },
        change: PositionChange::Close {
            symbol: position.symbol.clone(),
            expected_quantity: position.quantity,
        },
    }
}

fn open_action(signal: &SignalRecord, quantity: i64, price: f64, now: DateTime<Utc>) -> TradeAction {
    let (side, signed) = match signal.direction {
        Direction::Short => (Side::Sell, -quantity),
        _ => (Side::Buy, quantity),
    };
    TradeAction {
        intent: TradeIntent {
            symbol: signal.symbol.clone(),
            side,
            quantity,
            price,
            strategy: signal.strategy,
            timestamp: now,
            effect: PositionEffect::Open,
            realized_pnl: 0.0,
        },
        change: PositionChange::Open(Position::open(
            signal.symbol.clone(),
            signed,
            price,
            signal.strategy,
            now,
        )),
    }
}

/// Plan the trades for one pass. Pure: nothing is applied.
pub fn reconcile(
    signals: &BTreeMap<String, SignalRecord>,
    prices: &BTreeMap<String, f64>,
    positions: &BTreeMap<String, Position>,
    portfolio_value: f64,
    config: &ExecutionConfig,
    now: DateTime<Utc>,
) -> ReconcileResult {
    let mut result = ReconcileResult::default();
    let mut open_count = positions.len();
    let mut pending_opens = Vec::new();

    for (symbol, signal) in signals {
        let held = positions.get(symbol);
        match (held, signal.direction) {
            (None, Direction::Flat) | (Some(_), Direction::Long | Direction::Short) => continue,
            _ => {}
        }

        let Some(&price) = prices.get(symbol) else {
            result.skipped.push(Skip {
                symbol: symbol.clone(),
                reason: SkipReason::MissingPrice,
            });
            continue;
        };

        match held {
            Some(position) => {
                result.actions.push(close_action(position, price, now));
                open_count = open_count.saturating_sub(1);
            }
            None => pending_opens.push((signal, price)),
        }
    }

    for (signal, price) in pending_opens {
        let quantity = open_quantity(portfolio_value, config.risk_per_trade, price, signal.strength);
        if quantity == 0 {
            result.skipped.push(Skip {
                symbol: signal.symbol.clone(),
                reason: SkipReason::ZeroQuantity,
            });
            continue;
        }
        if open_count >= config.max_positions {
            result.skipped.push(Skip {
                symbol: signal.symbol.clone(),
                reason: SkipReason::PositionLimit,
            });
            continue;
        }
        result.actions.push(open_action(signal, quantity, price, now));
        open_count += 1;
    }

    result
}

/// Apply a position change to an in-memory position map.
///
/// Returns `false` without mutating when the map no longer matches the state
/// the change was planned against.
pub fn apply_change(positions: &mut BTreeMap<String, Position>, change: &PositionChange) -> bool {
    match change {
        PositionChange::Open(position) => {
            if positions.contains_key(&position.symbol) {
                return false;
            }
            positions.insert(position.symbol.clone(), position.clone());
            true
        }
        PositionChange::Close {
            symbol,
            expected_quantity,
        } => match positions.get(symbol) {
            Some(held) if held.quantity == *expected_quantity => {
                positions.remove(symbol);
                true
            }
            _ => false,
        },
    }
}

/// Mark every position with a known price. Returns the refreshed positions.
pub fn refresh_positions<'a>(
    positions: impl IntoIterator<Item = &'a mut Position>,
    prices: &BTreeMap<String, f64>,
) -> Vec<Position> {
    positions
        .into_iter()
        .filter_map(|position| {
            let price = *prices.get(&position.symbol)?;
            position.mark(price);
            Some(position.clone())
        })
        .collect()
}
