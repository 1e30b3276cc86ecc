//! The three engine passes: signal generation, trade execution and portfolio
//! aggregation. Each pass reads from and writes to the ports it is given and
//! returns a report of what it did.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::error::PapertraderError;
use super::execution::{
    apply_change, reconcile, refresh_positions, select_latest_signals, ExecutionConfig, SkipReason,
};
use super::indicator::{calculate_all, IndicatorBundle, MIN_HISTORY};
use super::merger::{merge_signals, SizingConfig};
use super::portfolio::{aggregate, strategy_breakdown, PortfolioSnapshot, StrategyBreakdown};
use super::position::{Position, PositionEffect};
use super::price_series::PriceSeries;
use super::signal::StrategyKind;
use super::strategy::{MarketContext, StatArbParams, StatArbStrategy, StrategySet};
use super::universe::Universe;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::store_port::StorePort;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub initial_capital: f64,
    /// Closes loaded per symbol for indicator calculation.
    pub history_limit: usize,
    pub universe: Universe,
    pub execution: ExecutionConfig,
    pub sizing: SizingConfig,
    pub stat_arb: StatArbParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            initial_capital: 100_000.0,
            history_limit: MIN_HISTORY,
            universe: Universe::default_universe(),
            execution: ExecutionConfig::default(),
            sizing: SizingConfig::default(),
            stat_arb: StatArbParams::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalReport {
    pub symbols_evaluated: usize,
    pub symbols_skipped: Vec<String>,
    pub signals_written: usize,
    pub by_strategy: BTreeMap<StrategyKind, usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReport {
    pub opened: usize,
    pub closed: usize,
    pub conflicts: Vec<String>,
    pub skipped: Vec<(String, SkipReason)>,
    pub positions_refreshed: usize,
}

impl ExecutionReport {
    pub fn trades_executed(&self) -> usize {
        self.opened + self.closed
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioReport {
    pub snapshot: PortfolioSnapshot,
    pub breakdown: Vec<StrategyBreakdown>,
}

/// Load history for one symbol and compute its indicator bundle.
///
/// Every error returned for a symbol that merely lacks usable data is
/// symbol-scoped (see [`PapertraderError::is_symbol_scoped`]).
pub fn load_indicators(
    market: &dyn MarketDataPort,
    symbol: &str,
    history_limit: usize,
) -> Result<IndicatorBundle, PapertraderError> {
    let history = market.price_history(symbol, history_limit)?;
    if history.is_empty() {
        return Err(PapertraderError::NoData {
            symbol: symbol.to_string(),
        });
    }
    if history.len() < MIN_HISTORY {
        return Err(PapertraderError::InsufficientData {
            symbol: symbol.to_string(),
            points: history.len(),
            minimum: MIN_HISTORY,
        });
    }

    let series = PriceSeries::new(symbol, history)?;
    calculate_all(&series).ok_or_else(|| PapertraderError::Computation {
        symbol: symbol.to_string(),
        reason: "no indicator could be computed".to_string(),
    })
}

fn current_prices<'a>(
    market: &dyn MarketDataPort,
    symbols: impl IntoIterator<Item = &'a String>,
) -> Result<BTreeMap<String, f64>, PapertraderError> {
    let mut prices = BTreeMap::new();
    for symbol in symbols {
        if let Some(price) = market.current_price(symbol)? {
            prices.insert(symbol.clone(), price);
        }
    }
    Ok(prices)
}

/// Compute indicators for the universe, run every strategy and upsert the
/// merged signals.
pub fn generate_signals(
    market: &dyn MarketDataPort,
    store: &dyn StorePort,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Result<SignalReport, PapertraderError> {
    let mut report = SignalReport::default();
    let mut indicators = BTreeMap::new();

    for symbol in &config.universe.symbols {
        match load_indicators(market, symbol, config.history_limit) {
            Ok(bundle) => {
                tracing::debug!(
                    symbol = %symbol,
                    fields = bundle.present_count(),
                    values = ?bundle.to_map(),
                    "indicators computed"
                );
                indicators.insert(symbol.clone(), bundle);
            }
            Err(e) if e.is_symbol_scoped() => {
                tracing::warn!(symbol = %symbol, error = %e, "skipping symbol");
                report.symbols_skipped.push(symbol.clone());
            }
            Err(e) => return Err(e),
        }
    }
    report.symbols_evaluated = indicators.len();

    let listed = market.list_symbols()?;
    let prices = current_prices(market, &listed)?;

    let ctx = MarketContext {
        indicators: &indicators,
        prices: &prices,
    };
    let strategies = StrategySet::standard(StatArbStrategy::new(
        config.universe.pairs.clone(),
        config.stat_arb.clone(),
    ));
    let outputs = strategies.run(&ctx);
    let records = merge_signals(&outputs, &config.sizing, now);

    for record in &records {
        store.upsert_signal(record)?;
        *report.by_strategy.entry(record.strategy).or_default() += 1;
    }
    report.signals_written = records.len();

    tracing::info!(
        evaluated = report.symbols_evaluated,
        skipped = report.symbols_skipped.len(),
        signals = report.signals_written,
        "signal generation complete"
    );
    Ok(report)
}

/// Reconcile the live signals against open positions, commit the resulting
/// trades and mark every remaining position to market.
pub fn execute_trades(
    market: &dyn MarketDataPort,
    store: &dyn StorePort,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Result<ExecutionReport, PapertraderError> {
    let mut report = ExecutionReport::default();

    let signals = select_latest_signals(&store.latest_signals()?);
    let mut positions: BTreeMap<String, Position> = store
        .open_positions()?
        .into_iter()
        .map(|p| (p.symbol.clone(), p))
        .collect();
    let prices = current_prices(market, signals.keys().chain(positions.keys()))?;
    let portfolio_value = store.portfolio_value(config.initial_capital)?;

    tracing::debug!(
        signals = signals.len(),
        positions = positions.len(),
        portfolio_value,
        "reconciling"
    );

    let plan = reconcile(
        &signals,
        &prices,
        &positions,
        portfolio_value,
        &config.execution,
        now,
    );

    for skip in plan.skipped {
        match skip.reason {
            SkipReason::MissingPrice if skip.symbol.contains('/') => {
                tracing::debug!(symbol = %skip.symbol, "pair signal is not directly tradable");
            }
            SkipReason::MissingPrice | SkipReason::PositionLimit => {
                tracing::warn!(symbol = %skip.symbol, reason = ?skip.reason, "signal not executed");
            }
            SkipReason::ZeroQuantity => {
                tracing::debug!(symbol = %skip.symbol, "open quantity floors to zero");
            }
        }
        report.skipped.push((skip.symbol, skip.reason));
    }

    for action in plan.actions {
        let intent = &action.intent;
        match store.commit_trade(intent, &action.change) {
            Ok(()) => {
                apply_change(&mut positions, &action.change);
                match intent.effect {
                    PositionEffect::Open => report.opened += 1,
                    PositionEffect::Close => report.closed += 1,
                }
                tracing::info!(
                    symbol = %intent.symbol,
                    side = %intent.side,
                    quantity = intent.quantity,
                    price = intent.price,
                    notional = intent.notional(),
                    strategy = %intent.strategy,
                    effect = intent.effect.as_str(),
                    realized_pnl = intent.realized_pnl,
                    "trade executed"
                );
            }
            Err(e @ PapertraderError::PositionConflict { .. }) => {
                tracing::warn!(symbol = %intent.symbol, error = %e, "trade rejected");
                report.conflicts.push(intent.symbol.clone());
            }
            Err(e) => return Err(e),
        }
    }

    // Only positions still stored exactly as read above are marked.
    for position in refresh_positions(positions.values_mut(), &prices) {
        if store.mark_position(&position)? {
            report.positions_refreshed += 1;
        } else {
            tracing::warn!(
                symbol = %position.symbol,
                quantity = position.quantity,
                "position changed since read, not marked"
            );
        }
    }

    tracing::info!(
        opened = report.opened,
        closed = report.closed,
        conflicts = report.conflicts.len(),
        refreshed = report.positions_refreshed,
        "trade execution complete"
    );
    Ok(report)
}

/// Fold positions and the trade log into a snapshot and per-strategy
/// breakdown, and persist both.
pub fn aggregate_portfolio(
    store: &dyn StorePort,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Result<PortfolioReport, PapertraderError> {
    let positions = store.open_positions()?;
    let trades = store.trade_log()?;

    let snapshot = aggregate(&positions, &trades, config.initial_capital, now);
    let breakdown = strategy_breakdown(&positions, now);

    store.append_portfolio_snapshot(&snapshot)?;
    store.append_strategy_breakdown(&breakdown)?;

    tracing::info!(
        total_value = snapshot.total_value,
        realized_pnl = snapshot.realized_pnl,
        unrealized_pnl = snapshot.unrealized_pnl,
        positions = snapshot.num_positions,
        trades = snapshot.num_trades,
        "portfolio aggregated"
    );
    Ok(PortfolioReport {
        snapshot,
        breakdown,
    })
}
