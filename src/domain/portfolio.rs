//! Portfolio aggregation over open positions and the trade log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};

use super::position::{Position, PositionEffect, TradeIntent};
use super::signal::StrategyKind;

/// Placeholder until a return series is tracked.
pub const SHARPE_RATIO_SIMPLIFIED: f64 = 0.8;
/// Placeholder until an equity curve is tracked.
pub const MAX_DRAWDOWN_SIMPLIFIED: f64 = -5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub total_value: f64,
    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
    /// Percentage in [0, 100].
    pub win_rate: f64,
    pub total_return_pct: f64,
    pub sharpe_ratio_simplified: f64,
    pub max_drawdown_simplified: f64,
    pub num_positions: usize,
    pub num_trades: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyBreakdown {
    pub strategy: StrategyKind,
    pub num_positions: usize,
    pub total_position_value: f64,
    pub total_unrealized_pnl: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct Lot {
    /// Signed: positive for bought lots, negative for sold lots.
    quantity: i64,
    price: f64,
}

/// Realized P&L by FIFO lot matching per symbol.
///
/// Trades are replayed in timestamp order (stable for equal timestamps). A
/// trade against the direction of the queued lots consumes the oldest lots
/// first; matched P&L is (sell price − buy price) × matched quantity.
pub fn realized_pnl_fifo(trades: &[TradeIntent]) -> f64 {
    let mut ordered: Vec<&TradeIntent> = trades.iter().collect();
    ordered.sort_by_key(|t| t.timestamp);

    let mut books: HashMap<&str, VecDeque<Lot>> = HashMap::new();
    let mut realized = 0.0;

    for trade in ordered {
        let lots = books.entry(trade.symbol.as_str()).or_default();
        let mut remaining = trade.signed_quantity();

        while remaining != 0 {
            let Some(front) = lots.front_mut() else { break };
            if front.quantity.signum() == remaining.signum() {
                break;
            }
            let matched = remaining.abs().min(front.quantity.abs());
            let (buy, sell) = if front.quantity > 0 {
                (front.price, trade.price)
            } else {
                (trade.price, front.price)
            };
            realized += (sell - buy) * matched as f64;

            front.quantity -= front.quantity.signum() * matched;
            remaining -= remaining.signum() * matched;
            if front.quantity == 0 {
                lots.pop_front();
            }
        }

        if remaining != 0 {
            lots.push_back(Lot {
                quantity: remaining,
                price: trade.price,
            });
        }
    }

    realized
}

/// Percentage of closing trades with positive recorded P&L; 0 when none.
pub fn win_rate(trades: &[TradeIntent]) -> f64 {
    let closes: Vec<&TradeIntent> = trades
        .iter()
        .filter(|t| t.effect == PositionEffect::Close)
        .collect();
    if closes.is_empty() {
        return 0.0;
    }
    let wins = closes.iter().filter(|t| t.realized_pnl > 0.0).count();
    wins as f64 / closes.len() as f64 * 100.0
}

pub fn aggregate(
    positions: &[Position],
    trades: &[TradeIntent],
    initial_capital: f64,
    now: DateTime<Utc>,
) -> PortfolioSnapshot {
    let unrealized_pnl: f64 = positions.iter().map(|p| p.unrealized_pnl).sum();
    let realized_pnl = realized_pnl_fifo(trades);
    let total_value = initial_capital + realized_pnl + unrealized_pnl;
    let total_return_pct = if initial_capital > 0.0 {
        (total_value - initial_capital) / initial_capital * 100.0
    } else {
        0.0
    };

    PortfolioSnapshot {
        total_value,
        unrealized_pnl,
        realized_pnl,
        win_rate: win_rate(trades),
        total_return_pct,
        sharpe_ratio_simplified: SHARPE_RATIO_SIMPLIFIED,
        max_drawdown_simplified: MAX_DRAWDOWN_SIMPLIFIED,
        num_positions: positions.len(),
        num_trades: trades.len(),
        timestamp: now,
    }
}

/// Group open positions by owning strategy.
pub fn strategy_breakdown(positions: &[Position], now: DateTime<Utc>) -> Vec<StrategyBreakdown> {
    let mut groups: BTreeMap<StrategyKind, StrategyBreakdown> = BTreeMap::new();
    for position in positions {
        let entry = groups
            .entry(position.strategy)
            .or_insert_with(|| StrategyBreakdown {
                strategy: position.strategy,
                num_positions: 0,
                total_position_value: 0.0,
                total_unrealized_pnl: 0.0,
                timestamp: now,
            });
        entry.num_positions += 1;
        entry.total_position_value += position.position_value;
        entry.total_unrealized_pnl += position.unrealized_pnl;
    }
    groups.into_values().collect()
}
