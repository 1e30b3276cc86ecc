//! Domain error types.

/// Top-level error type for papertrader.
#[derive(Debug, thiserror::Error)]
pub enum PapertraderError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no price data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for {symbol}: have {points} prices, need {minimum}")]
    InsufficientData {
        symbol: String,
        points: usize,
        minimum: usize,
    },

    #[error("no current price for {symbol}")]
    MissingPrice { symbol: String },

    #[error("invalid price for {symbol}: {value}")]
    InvalidPrice { symbol: String, value: f64 },

    #[error("computation failed for {symbol}: {reason}")]
    Computation { symbol: String, reason: String },

    #[error("position conflict on {symbol}: {reason}")]
    PositionConflict { symbol: String, reason: String },

    #[error("quote import error: {reason}")]
    Import { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PapertraderError {
    /// Errors scoped to a single symbol. The engine logs and skips these
    /// instead of aborting the pass.
    pub fn is_symbol_scoped(&self) -> bool {
        matches!(
            self,
            PapertraderError::NoData { .. }
                | PapertraderError::InsufficientData { .. }
                | PapertraderError::MissingPrice { .. }
                | PapertraderError::InvalidPrice { .. }
                | PapertraderError::Computation { .. }
                | PapertraderError::PositionConflict { .. }
        )
    }
}

impl From<&PapertraderError> for std::process::ExitCode {
    fn from(err: &PapertraderError) -> Self {
        let code: u8 = match err {
            PapertraderError::Io(_) | PapertraderError::Import { .. } => 1,
            PapertraderError::ConfigParse { .. }
            | PapertraderError::ConfigMissing { .. }
            | PapertraderError::ConfigInvalid { .. } => 2,
            PapertraderError::Database { .. } | PapertraderError::DatabaseQuery { .. } => 3,
            PapertraderError::PositionConflict { .. } => 4,
            PapertraderError::NoData { .. }
            | PapertraderError::InsufficientData { .. }
            | PapertraderError::MissingPrice { .. }
            | PapertraderError::InvalidPrice { .. }
            | PapertraderError::Computation { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
