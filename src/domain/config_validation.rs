//! Configuration validation and engine config assembly.
//!
//! Every check runs before any pass touches the store.

use crate::domain::engine::EngineConfig;
use crate::domain::error::PapertraderError;
use crate::domain::execution::ExecutionConfig;
use crate::domain::indicator::MIN_HISTORY;
use crate::domain::merger::SizingConfig;
use crate::domain::strategy::StatArbParams;
use crate::domain::universe::{parse_pairs, parse_symbols, Pair, Universe};
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;

pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<(), PapertraderError> {
    validate_initial_capital(config)?;
    validate_risk_per_trade(config)?;
    validate_max_positions(config)?;
    validate_history_limit(config)?;
    validate_sizing(config)?;
    validate_spread_scale(config)?;
    load_universe(config)?;
    Ok(())
}

/// Validate, then build the engine configuration.
pub fn load_engine_config(config: &dyn ConfigPort) -> Result<EngineConfig, PapertraderError> {
    validate_engine_config(config)?;

    let defaults = StatArbParams::default();
    let sizing_defaults = SizingConfig::default();
    let execution_defaults = ExecutionConfig::default();

    Ok(EngineConfig {
        initial_capital: config.get_double("engine", "initial_capital", DEFAULT_INITIAL_CAPITAL),
        history_limit: config.get_int("engine", "history_limit", MIN_HISTORY as i64) as usize,
        universe: load_universe(config)?,
        execution: ExecutionConfig {
            risk_per_trade: config.get_double(
                "engine",
                "risk_per_trade",
                execution_defaults.risk_per_trade,
            ),
            max_positions: config.get_int(
                "engine",
                "max_positions",
                execution_defaults.max_positions as i64,
            ) as usize,
        },
        sizing: SizingConfig {
            target_risk: config.get_double("sizing", "target_risk", sizing_defaults.target_risk),
            default_volatility: config.get_double(
                "sizing",
                "default_volatility",
                sizing_defaults.default_volatility,
            ),
        },
        stat_arb: StatArbParams {
            spread_mean_simplified: config.get_double(
                "stat_arb",
                "spread_mean",
                defaults.spread_mean_simplified,
            ),
            spread_scale_simplified: config.get_double(
                "stat_arb",
                "spread_scale",
                defaults.spread_scale_simplified,
            ),
            entry_z: config.get_double("stat_arb", "entry_z", defaults.entry_z),
            pair_volatility: config.get_double(
                "sizing",
                "pair_volatility",
                defaults.pair_volatility,
            ),
        },
    })
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> PapertraderError {
    PapertraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), PapertraderError> {
    let value = config.get_double("engine", "initial_capital", DEFAULT_INITIAL_CAPITAL);
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid(
            "engine",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_risk_per_trade(config: &dyn ConfigPort) -> Result<(), PapertraderError> {
    let value = config.get_double("engine", "risk_per_trade", 0.01);
    if !(value > 0.0 && value <= 1.0) {
        return Err(invalid(
            "engine",
            "risk_per_trade",
            "risk_per_trade must be in (0, 1]",
        ));
    }
    Ok(())
}

fn validate_max_positions(config: &dyn ConfigPort) -> Result<(), PapertraderError> {
    let value = config.get_int("engine", "max_positions", 50);
    if value < 1 {
        return Err(invalid(
            "engine",
            "max_positions",
            "max_positions must be at least 1",
        ));
    }
    Ok(())
}

fn validate_history_limit(config: &dyn ConfigPort) -> Result<(), PapertraderError> {
    let value = config.get_int("engine", "history_limit", MIN_HISTORY as i64);
    if value < MIN_HISTORY as i64 {
        return Err(invalid(
            "engine",
            "history_limit",
            format!("history_limit must be at least {MIN_HISTORY}"),
        ));
    }
    Ok(())
}

fn validate_sizing(config: &dyn ConfigPort) -> Result<(), PapertraderError> {
    for (key, default) in [
        ("target_risk", 0.01),
        ("default_volatility", 0.02),
        ("pair_volatility", 0.015),
    ] {
        let value = config.get_double("sizing", key, default);
        if !(value.is_finite() && value > 0.0) {
            return Err(invalid("sizing", key, format!("{key} must be positive")));
        }
    }
    Ok(())
}

fn validate_spread_scale(config: &dyn ConfigPort) -> Result<(), PapertraderError> {
    let scale = config.get_double("stat_arb", "spread_scale", 50.0);
    if !(scale.is_finite() && scale > 0.0) {
        return Err(invalid(
            "stat_arb",
            "spread_scale",
            "spread_scale must be positive",
        ));
    }
    let entry_z = config.get_double("stat_arb", "entry_z", 2.0);
    if !(entry_z.is_finite() && entry_z >= 0.0) {
        return Err(invalid(
            "stat_arb",
            "entry_z",
            "entry_z must be non-negative",
        ));
    }
    Ok(())
}

fn load_universe(config: &dyn ConfigPort) -> Result<Universe, PapertraderError> {
    let defaults = Universe::default_universe();

    let symbols = match config.get_string("universe", "symbols") {
        Some(raw) => parse_symbols(&raw).map_err(|e| invalid("universe", "symbols", e.to_string()))?,
        None => defaults.symbols,
    };

    let pairs: Vec<Pair> = match config.get_string("universe", "pairs") {
        Some(raw) if raw.trim().is_empty() => Vec::new(),
        Some(raw) => parse_pairs(&raw).map_err(|e| invalid("universe", "pairs", e.to_string()))?,
        None => defaults.pairs,
    };

    Ok(Universe { symbols, pairs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn assert_invalid(content: &str, expected_key: &str) {
        let config = make_config(content);
        match validate_engine_config(&config) {
            Err(PapertraderError::ConfigInvalid { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("expected ConfigInvalid for {expected_key}, got {other:?}"),
        }
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = make_config("[engine]\n");
        let engine = load_engine_config(&config).unwrap();
        assert_eq!(engine.initial_capital, 100_000.0);
        assert_eq!(engine.history_limit, 100);
        assert_eq!(engine.execution, ExecutionConfig::default());
        assert_eq!(engine.sizing, SizingConfig::default());
        assert_eq!(engine.stat_arb, StatArbParams::default());
        assert_eq!(engine.universe, Universe::default_universe());
    }

    #[test]
    fn full_config_is_read() {
        let config = make_config(
            r#"
[engine]
initial_capital = 50000
risk_per_trade = 0.02
max_positions = 10
history_limit = 250

[universe]
symbols = aapl, msft, googl
pairs = MSFT/GOOGL

[sizing]
target_risk = 0.02
default_volatility = 0.03
pair_volatility = 0.01

[stat_arb]
spread_mean = 0
spread_scale = 25
entry_z = 1.5
"#,
        );
        let engine = load_engine_config(&config).unwrap();
        assert_eq!(engine.initial_capital, 50_000.0);
        assert_eq!(engine.history_limit, 250);
        assert_eq!(engine.execution.risk_per_trade, 0.02);
        assert_eq!(engine.execution.max_positions, 10);
        assert_eq!(engine.universe.symbols, vec!["AAPL", "MSFT", "GOOGL"]);
        assert_eq!(engine.universe.pairs, vec![Pair::new("MSFT", "GOOGL")]);
        assert_eq!(engine.sizing.default_volatility, 0.03);
        assert_eq!(engine.stat_arb.spread_mean_simplified, 0.0);
        assert_eq!(engine.stat_arb.spread_scale_simplified, 25.0);
        assert_eq!(engine.stat_arb.entry_z, 1.5);
        assert_eq!(engine.stat_arb.pair_volatility, 0.01);
    }

    #[test]
    fn empty_pairs_disables_stat_arb() {
        let config = make_config("[universe]\npairs =\n");
        let engine = load_engine_config(&config).unwrap();
        assert!(engine.universe.pairs.is_empty());
    }

    #[test]
    fn initial_capital_must_be_positive() {
        assert_invalid("[engine]\ninitial_capital = 0\n", "initial_capital");
        assert_invalid("[engine]\ninitial_capital = -5\n", "initial_capital");
    }

    #[test]
    fn risk_per_trade_range() {
        assert_invalid("[engine]\nrisk_per_trade = 0\n", "risk_per_trade");
        assert_invalid("[engine]\nrisk_per_trade = 1.5\n", "risk_per_trade");
        let config = make_config("[engine]\nrisk_per_trade = 1.0\n");
        assert!(validate_engine_config(&config).is_ok());
    }

    #[test]
    fn max_positions_at_least_one() {
        assert_invalid("[engine]\nmax_positions = 0\n", "max_positions");
    }

    #[test]
    fn history_limit_covers_minimum() {
        assert_invalid("[engine]\nhistory_limit = 99\n", "history_limit");
    }

    #[test]
    fn sizing_values_positive() {
        assert_invalid("[sizing]\ntarget_risk = 0\n", "target_risk");
        assert_invalid("[sizing]\ndefault_volatility = -0.1\n", "default_volatility");
    }

    #[test]
    fn spread_scale_positive() {
        assert_invalid("[stat_arb]\nspread_scale = 0\n", "spread_scale");
        assert_invalid("[stat_arb]\nentry_z = -1\n", "entry_z");
    }

    #[test]
    fn malformed_universe_rejected() {
        assert_invalid("[universe]\nsymbols = AAPL,,MSFT\n", "symbols");
        assert_invalid("[universe]\nsymbols = AAPL,aapl\n", "symbols");
        assert_invalid("[universe]\npairs = MSFT-GOOGL\n", "pairs");
        assert_invalid("[universe]\npairs = XOM/XOM\n", "pairs");
    }
}
