//! Paper positions and trade intents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::signal::StrategyKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    /// Positive for long, negative for short. Never zero while stored.
    pub quantity: i64,
    pub entry_price: f64,
    pub current_price: f64,
    pub unrealized_pnl: f64,
    pub position_value: f64,
    pub strategy: StrategyKind,
    pub entry_time: DateTime<Utc>,
}

impl Position {
    /// A freshly opened position, marked at its entry price.
    pub fn open(
        symbol: impl Into<String>,
        quantity: i64,
        price: f64,
        strategy: StrategyKind,
        entry_time: DateTime<Utc>,
    ) -> Self {
        let mut position = Position {
            symbol: symbol.into(),
            quantity,
            entry_price: price,
            current_price: price,
            unrealized_pnl: 0.0,
            position_value: 0.0,
            strategy,
            entry_time,
        };
        position.mark(price);
        position
    }

    pub fn is_long(&self) -> bool {
        self.quantity > 0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0
    }

    /// Signed exposure: negative for shorts.
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    pub fn unrealized_pnl_at(&self, price: f64) -> f64 {
        self.quantity as f64 * (price - self.entry_price)
    }

    /// Refresh current price, unrealized P&L and position value.
    pub fn mark(&mut self, price: f64) {
        self.current_price = price;
        self.unrealized_pnl = self.unrealized_pnl_at(price);
        self.position_value = self.market_value(price);
    }

    /// Side of the trade that would flatten this position.
    pub fn closing_side(&self) -> Side {
        if self.is_long() { Side::Sell } else { Side::Buy }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    /// +1 for buys, -1 for sells.
    pub fn sign(self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(format!("unknown side: {other}")),
        }
    }
}

/// Whether a trade opens a new position or closes an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionEffect {
    Open,
    Close,
}

impl PositionEffect {
    pub fn as_str(self) -> &'static str {
        match self {
            PositionEffect::Open => "OPEN",
            PositionEffect::Close => "CLOSE",
        }
    }
}

impl FromStr for PositionEffect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(PositionEffect::Open),
            "CLOSE" => Ok(PositionEffect::Close),
            other => Err(format!("unknown position effect: {other}")),
        }
    }
}

/// One executed (simulated) trade. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeIntent {
    pub symbol: String,
    pub side: Side,
    /// Always positive.
    pub quantity: i64,
    pub price: f64,
    pub strategy: StrategyKind,
    pub timestamp: DateTime<Utc>,
    pub effect: PositionEffect,
    /// P&L realized by this trade; zero for opening trades.
    pub realized_pnl: f64,
}

impl TradeIntent {
    pub fn notional(&self) -> f64 {
        self.quantity as f64 * self.price
    }

    pub fn signed_quantity(&self) -> i64 {
        self.side.sign() * self.quantity
    }
}

/// Position state transition that accompanies a trade.
///
/// Stores re-check the expected state before applying it; see
/// `StorePort::commit_trade`.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionChange {
    /// Requires that no position is held for the symbol.
    Open(Position),
    /// Requires that the held quantity still equals `expected_quantity`.
    Close {
        symbol: String,
        expected_quantity: i64,
    },
}

impl PositionChange {
    pub fn symbol(&self) -> &str {
        match self {
            PositionChange::Open(position) => &position.symbol,
            PositionChange::Close { symbol, .. } => symbol,
        }
    }
}
