//! Tracked symbol universe and configured stat-arb pairs.
//!
//! Parses symbol and pair lists from configuration. Symbols are upper-cased
//! and must be unique; a pair is written `A/B` and names two distinct symbols.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub const DEFAULT_SYMBOLS: [&str; 15] = [
    "AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "META", "NVDA", "JPM", "BAC", "WFC", "XOM", "CVX",
    "MCD", "NKE", "COST",
];

pub const DEFAULT_PAIRS: [(&str, &str); 5] = [
    ("MSFT", "GOOGL"),
    ("JPM", "BAC"),
    ("XOM", "CVX"),
    ("TSLA", "GOOGL"),
    ("NVDA", "META"),
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair {
    pub first: String,
    pub second: String,
}

impl Pair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Pair {
            first: first.into(),
            second: second.into(),
        }
    }

    /// Composite identifier used as the signal symbol, e.g. `MSFT/GOOGL`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.first, self.second)
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.first, self.second)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Universe {
    pub symbols: Vec<String>,
    pub pairs: Vec<Pair>,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.symbols.len()
    }

    pub fn default_universe() -> Self {
        Universe {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            pairs: DEFAULT_PAIRS
                .iter()
                .map(|(a, b)| Pair::new(*a, *b))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),

    #[error("malformed pair '{0}', expected A/B")]
    MalformedPair(String),

    #[error("pair '{0}' names the same symbol twice")]
    SelfPair(String),

    #[error("duplicate pair: {0}")]
    DuplicatePair(String),
}

pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

pub fn parse_pairs(input: &str) -> Result<Vec<Pair>, UniverseError> {
    let mut pairs = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let (first, second) = trimmed
            .split_once('/')
            .ok_or_else(|| UniverseError::MalformedPair(trimmed.to_string()))?;
        let first = first.trim().to_uppercase();
        let second = second.trim().to_uppercase();
        if first.is_empty() || second.is_empty() || second.contains('/') {
            return Err(UniverseError::MalformedPair(trimmed.to_string()));
        }
        if first == second {
            return Err(UniverseError::SelfPair(trimmed.to_string()));
        }
        let pair = Pair::new(first, second);
        if !seen.insert(pair.clone()) {
            return Err(UniverseError::DuplicatePair(pair.key()));
        }
        pairs.push(pair);
    }

    Ok(pairs)
}
