//! SQLite storage adapter.
//!
//! Implements both [`MarketDataPort`] and [`StorePort`] over one pooled
//! database. Timestamps are stored as integer microseconds since the Unix
//! epoch so ordering in SQL matches chronological order.

use crate::domain::error::PapertraderError;
use crate::domain::portfolio::{PortfolioSnapshot, StrategyBreakdown};
use crate::domain::position::{Position, PositionChange, PositionEffect, Side, TradeIntent};
use crate::domain::quote::Quote;
use crate::domain::signal::{Direction, SignalRecord, StrategyKind};
use crate::ports::config_port::ConfigPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::store_port::StorePort;
use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};
use std::str::FromStr;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS market_prices (
    symbol TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    open REAL NOT NULL,
    high REAL NOT NULL,
    low REAL NOT NULL,
    close REAL NOT NULL,
    volume INTEGER NOT NULL,
    PRIMARY KEY (symbol, timestamp)
);
CREATE INDEX IF NOT EXISTS idx_market_prices_symbol_ts ON market_prices(symbol, timestamp DESC);

CREATE TABLE IF NOT EXISTS signals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL,
    strategy_type TEXT NOT NULL,
    direction INTEGER NOT NULL CHECK (direction IN (-1, 0, 1)),
    strength REAL NOT NULL,
    z_score REAL NOT NULL,
    momentum_score REAL NOT NULL,
    rsi REAL NOT NULL,
    realized_vol REAL NOT NULL,
    recommended_size REAL NOT NULL,
    generated_at INTEGER NOT NULL,
    UNIQUE (symbol, strategy_type)
);

CREATE TABLE IF NOT EXISTS paper_positions (
    symbol TEXT PRIMARY KEY,
    quantity INTEGER NOT NULL CHECK (quantity != 0),
    entry_price REAL NOT NULL,
    current_price REAL NOT NULL,
    unrealized_pnl REAL NOT NULL,
    position_value REAL NOT NULL,
    strategy_type TEXT NOT NULL,
    entry_time INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS trade_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL,
    side TEXT NOT NULL CHECK (side IN ('BUY', 'SELL')),
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    price REAL NOT NULL,
    strategy_type TEXT NOT NULL,
    effect TEXT NOT NULL CHECK (effect IN ('OPEN', 'CLOSE')),
    realized_pnl REAL NOT NULL,
    timestamp INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_trade_log_symbol ON trade_log(symbol, timestamp);

CREATE TABLE IF NOT EXISTS portfolio_summary (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    total_value REAL NOT NULL,
    unrealized_pnl REAL NOT NULL,
    realized_pnl REAL NOT NULL,
    win_rate REAL NOT NULL,
    total_return_pct REAL NOT NULL,
    sharpe_ratio_simplified REAL NOT NULL,
    max_drawdown_simplified REAL NOT NULL,
    num_positions INTEGER NOT NULL,
    num_trades INTEGER NOT NULL,
    timestamp INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS strategy_breakdown (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    strategy_type TEXT NOT NULL,
    num_positions INTEGER NOT NULL,
    total_position_value REAL NOT NULL,
    total_unrealized_pnl REAL NOT NULL,
    timestamp INTEGER NOT NULL
);";

const SIGNAL_COLUMNS: &str = "symbol, strategy_type, direction, strength, z_score, momentum_score, \
     rsi, realized_vol, recommended_size, generated_at";

const POSITION_COLUMNS: &str = "symbol, quantity, entry_price, current_price, unrealized_pnl, \
     position_value, strategy_type, entry_time";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn db_err(e: r2d2::Error) -> PapertraderError {
    PapertraderError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> PapertraderError {
    PapertraderError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn conversion_err(idx: usize, reason: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, reason.into())
}

fn to_micros(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let micros: i64 = row.get(idx)?;
    DateTime::<Utc>::from_timestamp_micros(micros)
        .ok_or_else(|| conversion_err(idx, format!("timestamp out of range: {micros}")))
}

fn parsed_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_err(idx, e))
}

fn signal_from_row(row: &Row<'_>) -> rusqlite::Result<SignalRecord> {
    let direction: i64 = row.get(2)?;
    let direction = i8::try_from(direction)
        .ok()
        .and_then(Direction::from_i8)
        .ok_or_else(|| conversion_err(2, format!("invalid direction: {direction}")))?;
    Ok(SignalRecord {
        symbol: row.get(0)?,
        strategy: parsed_at::<StrategyKind>(row, 1)?,
        direction,
        strength: row.get(3)?,
        z_score: row.get(4)?,
        momentum_score: row.get(5)?,
        rsi: row.get(6)?,
        realized_vol: row.get(7)?,
        recommended_size: row.get(8)?,
        generated_at: timestamp_at(row, 9)?,
    })
}

fn position_from_row(row: &Row<'_>) -> rusqlite::Result<Position> {
    Ok(Position {
        symbol: row.get(0)?,
        quantity: row.get(1)?,
        entry_price: row.get(2)?,
        current_price: row.get(3)?,
        unrealized_pnl: row.get(4)?,
        position_value: row.get(5)?,
        strategy: parsed_at::<StrategyKind>(row, 6)?,
        entry_time: timestamp_at(row, 7)?,
    })
}

fn trade_from_row(row: &Row<'_>) -> rusqlite::Result<TradeIntent> {
    Ok(TradeIntent {
        symbol: row.get(0)?,
        side: parsed_at::<Side>(row, 1)?,
        quantity: row.get(2)?,
        price: row.get(3)?,
        strategy: parsed_at::<StrategyKind>(row, 4)?,
        effect: parsed_at::<PositionEffect>(row, 5)?,
        realized_pnl: row.get(6)?,
        timestamp: timestamp_at(row, 7)?,
    })
}

fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<PortfolioSnapshot> {
    let num_positions: i64 = row.get(7)?;
    let num_trades: i64 = row.get(8)?;
    Ok(PortfolioSnapshot {
        total_value: row.get(0)?,
        unrealized_pnl: row.get(1)?,
        realized_pnl: row.get(2)?,
        win_rate: row.get(3)?,
        total_return_pct: row.get(4)?,
        sharpe_ratio_simplified: row.get(5)?,
        max_drawdown_simplified: row.get(6)?,
        num_positions: num_positions.max(0) as usize,
        num_trades: num_trades.max(0) as usize,
        timestamp: timestamp_at(row, 9)?,
    })
}

fn insert_position(conn: &rusqlite::Connection, position: &Position) -> rusqlite::Result<usize> {
    conn.execute(
        &format!(
            "INSERT INTO paper_positions ({POSITION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(symbol) DO UPDATE SET
                quantity = excluded.quantity,
                entry_price = excluded.entry_price,
                current_price = excluded.current_price,
                unrealized_pnl = excluded.unrealized_pnl,
                position_value = excluded.position_value,
                strategy_type = excluded.strategy_type,
                entry_time = excluded.entry_time"
        ),
        params![
            position.symbol,
            position.quantity,
            position.entry_price,
            position.current_price,
            position.unrealized_pnl,
            position.position_value,
            position.strategy.as_str(),
            to_micros(position.entry_time),
        ],
    )
}

fn insert_trade(conn: &rusqlite::Connection, intent: &TradeIntent) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO trade_log (symbol, side, quantity, price, strategy_type, effect, realized_pnl, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            intent.symbol,
            intent.side.as_str(),
            intent.quantity,
            intent.price,
            intent.strategy.as_str(),
            intent.effect.as_str(),
            intent.realized_pnl,
            to_micros(intent.timestamp),
        ],
    )
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PapertraderError> {
        let db_path =
            config
                .get_string("database", "path")
                .ok_or_else(|| PapertraderError::ConfigMissing {
                    section: "database".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("database", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path)
            .with_init(|c| c.execute_batch("PRAGMA busy_timeout = 5000;"));
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(db_err)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, PapertraderError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(db_err)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, PapertraderError> {
        self.pool.get().map_err(db_err)
    }

    pub fn initialize_schema(&self) -> Result<(), PapertraderError> {
        self.conn()?.execute_batch(SCHEMA).map_err(query_err)
    }

    /// Insert or replace quotes keyed by `(symbol, timestamp)`. Returns the
    /// number of rows written.
    pub fn insert_quotes(&self, quotes: &[Quote]) -> Result<usize, PapertraderError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        for quote in quotes {
            tx.execute(
                "INSERT OR REPLACE INTO market_prices (symbol, timestamp, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    quote.symbol,
                    to_micros(quote.timestamp),
                    quote.open,
                    quote.high,
                    quote.low,
                    quote.close,
                    quote.volume
                ],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)?;
        Ok(quotes.len())
    }

    /// Most recent strategy breakdown rows (those sharing the latest timestamp).
    pub fn latest_strategy_breakdown(&self) -> Result<Vec<StrategyBreakdown>, PapertraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT strategy_type, num_positions, total_position_value, total_unrealized_pnl, timestamp
                 FROM strategy_breakdown
                 WHERE timestamp = (SELECT MAX(timestamp) FROM strategy_breakdown)
                 ORDER BY strategy_type",
            )
            .map_err(query_err)?;
        let rows = stmt
            .query_map([], |row| {
                let num_positions: i64 = row.get(1)?;
                Ok(StrategyBreakdown {
                    strategy: parsed_at::<StrategyKind>(row, 0)?,
                    num_positions: num_positions.max(0) as usize,
                    total_position_value: row.get(2)?,
                    total_unrealized_pnl: row.get(3)?,
                    timestamp: timestamp_at(row, 4)?,
                })
            })
            .map_err(query_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(query_err)
    }
}

impl MarketDataPort for SqliteAdapter {
    fn list_symbols(&self) -> Result<Vec<String>, PapertraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT symbol FROM market_prices ORDER BY symbol")
            .map_err(query_err)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(query_err)?;
        rows.collect::<rusqlite::Result<Vec<String>>>()
            .map_err(query_err)
    }

    fn price_history(&self, symbol: &str, limit: usize) -> Result<Vec<f64>, PapertraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT close FROM market_prices
                 WHERE symbol = ?1
                 ORDER BY timestamp DESC
                 LIMIT ?2",
            )
            .map_err(query_err)?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![symbol, limit], |row| row.get(0))
            .map_err(query_err)?;
        rows.collect::<rusqlite::Result<Vec<f64>>>()
            .map_err(query_err)
    }

    fn current_price(&self, symbol: &str) -> Result<Option<f64>, PapertraderError> {
        self.conn()?
            .query_row(
                "SELECT close FROM market_prices WHERE symbol = ?1 ORDER BY timestamp DESC LIMIT 1",
                params![symbol],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_err)
    }
}

impl StorePort for SqliteAdapter {
    fn upsert_signal(&self, signal: &SignalRecord) -> Result<(), PapertraderError> {
        self.conn()?
            .execute(
                &format!(
                    "INSERT INTO signals ({SIGNAL_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                     ON CONFLICT(symbol, strategy_type) DO UPDATE SET
                        direction = excluded.direction,
                        strength = excluded.strength,
                        z_score = excluded.z_score,
                        momentum_score = excluded.momentum_score,
                        rsi = excluded.rsi,
                        realized_vol = excluded.realized_vol,
                        recommended_size = excluded.recommended_size,
                        generated_at = excluded.generated_at"
                ),
                params![
                    signal.symbol,
                    signal.strategy.as_str(),
                    i64::from(signal.direction.as_i8()),
                    signal.strength,
                    signal.z_score,
                    signal.momentum_score,
                    signal.rsi,
                    signal.realized_vol,
                    signal.recommended_size,
                    to_micros(signal.generated_at),
                ],
            )
            .map_err(query_err)?;
        Ok(())
    }

    fn latest_signals(&self) -> Result<Vec<SignalRecord>, PapertraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SIGNAL_COLUMNS} FROM signals ORDER BY symbol, strategy_type"
            ))
            .map_err(query_err)?;
        let rows = stmt.query_map([], signal_from_row).map_err(query_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(query_err)
    }

    fn open_positions(&self) -> Result<Vec<Position>, PapertraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {POSITION_COLUMNS} FROM paper_positions ORDER BY symbol"
            ))
            .map_err(query_err)?;
        let rows = stmt.query_map([], position_from_row).map_err(query_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(query_err)
    }

    fn upsert_position(&self, position: &Position) -> Result<(), PapertraderError> {
        let conn = self.conn()?;
        insert_position(&conn, position).map_err(query_err)?;
        Ok(())
    }

    fn mark_position(&self, position: &Position) -> Result<bool, PapertraderError> {
        let updated = self
            .conn()?
            .execute(
                "UPDATE paper_positions
                 SET current_price = ?1, unrealized_pnl = ?2, position_value = ?3
                 WHERE symbol = ?4 AND quantity = ?5 AND entry_time = ?6",
                params![
                    position.current_price,
                    position.unrealized_pnl,
                    position.position_value,
                    position.symbol,
                    position.quantity,
                    to_micros(position.entry_time),
                ],
            )
            .map_err(query_err)?;
        Ok(updated == 1)
    }

    fn delete_position(&self, symbol: &str) -> Result<(), PapertraderError> {
        self.conn()?
            .execute(
                "DELETE FROM paper_positions WHERE symbol = ?1",
                params![symbol],
            )
            .map_err(query_err)?;
        Ok(())
    }

    fn commit_trade(
        &self,
        intent: &TradeIntent,
        change: &PositionChange,
    ) -> Result<(), PapertraderError> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(query_err)?;

        let symbol = change.symbol();
        let held: Option<i64> = tx
            .query_row(
                "SELECT quantity FROM paper_positions WHERE symbol = ?1",
                params![symbol],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_err)?;

        match (change, held) {
            (PositionChange::Open(position), None) => {
                insert_position(&tx, position).map_err(query_err)?;
            }
            (PositionChange::Open(_), Some(quantity)) => {
                return Err(PapertraderError::PositionConflict {
                    symbol: symbol.to_string(),
                    reason: format!("position already open with quantity {quantity}"),
                });
            }
            (
                PositionChange::Close {
                    expected_quantity, ..
                },
                Some(quantity),
            ) if quantity == *expected_quantity => {
                tx.execute(
                    "DELETE FROM paper_positions WHERE symbol = ?1",
                    params![symbol],
                )
                .map_err(query_err)?;
            }
            (
                PositionChange::Close {
                    expected_quantity, ..
                },
                held,
            ) => {
                return Err(PapertraderError::PositionConflict {
                    symbol: symbol.to_string(),
                    reason: format!("expected quantity {expected_quantity}, found {held:?}"),
                });
            }
        }

        insert_trade(&tx, intent).map_err(query_err)?;
        tx.commit().map_err(query_err)
    }

    fn append_trade(&self, intent: &TradeIntent) -> Result<(), PapertraderError> {
        let conn = self.conn()?;
        insert_trade(&conn, intent).map_err(query_err)?;
        Ok(())
    }

    fn trade_log(&self) -> Result<Vec<TradeIntent>, PapertraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT symbol, side, quantity, price, strategy_type, effect, realized_pnl, timestamp
                 FROM trade_log
                 ORDER BY timestamp ASC, id ASC",
            )
            .map_err(query_err)?;
        let rows = stmt.query_map([], trade_from_row).map_err(query_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(query_err)
    }

    fn append_portfolio_snapshot(
        &self,
        snapshot: &PortfolioSnapshot,
    ) -> Result<(), PapertraderError> {
        self.conn()?
            .execute(
                "INSERT INTO portfolio_summary (total_value, unrealized_pnl, realized_pnl, win_rate,
                    total_return_pct, sharpe_ratio_simplified, max_drawdown_simplified,
                    num_positions, num_trades, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    snapshot.total_value,
                    snapshot.unrealized_pnl,
                    snapshot.realized_pnl,
                    snapshot.win_rate,
                    snapshot.total_return_pct,
                    snapshot.sharpe_ratio_simplified,
                    snapshot.max_drawdown_simplified,
                    snapshot.num_positions as i64,
                    snapshot.num_trades as i64,
                    to_micros(snapshot.timestamp),
                ],
            )
            .map_err(query_err)?;
        Ok(())
    }

    fn latest_portfolio_snapshot(&self) -> Result<Option<PortfolioSnapshot>, PapertraderError> {
        self.conn()?
            .query_row(
                "SELECT total_value, unrealized_pnl, realized_pnl, win_rate, total_return_pct,
                    sharpe_ratio_simplified, max_drawdown_simplified, num_positions, num_trades,
                    timestamp
                 FROM portfolio_summary
                 ORDER BY timestamp DESC, id DESC
                 LIMIT 1",
                [],
                snapshot_from_row,
            )
            .optional()
            .map_err(query_err)
    }

    fn append_strategy_breakdown(
        &self,
        breakdown: &[StrategyBreakdown],
    ) -> Result<(), PapertraderError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        for row in breakdown {
            tx.execute(
                "INSERT INTO strategy_breakdown (strategy_type, num_positions, total_position_value,
                    total_unrealized_pnl, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    row.strategy.as_str(),
                    row.num_positions as i64,
                    row.total_position_value,
                    row.total_unrealized_pnl,
                    to_micros(row.timestamp),
                ],
            )
            .map_err(query_err)?;
        }
        tx.commit().map_err(query_err)
    }
}
