//! Domain error types.

/// Top-level error type for regimetrader.
#[derive(Debug, thiserror::Error)]
pub enum TraderError {
    #[error("insufficient data for {symbol}: have {rows} rows, need {minimum}")]
    DataInsufficient {
        symbol: String,
        rows: usize,
        minimum: usize,
    },

    #[error("invalid price series for {symbol}: {reason}")]
    InvalidSeries { symbol: String, reason: String },

    #[error("{service} unavailable: {reason}")]
    UpstreamUnavailable { service: String, reason: String },

    #[error("order rejected for {symbol}: {reason}")]
    OrderRejected { symbol: String, reason: String },

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

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TraderError {
    /// Whether a bounded retry may succeed where this attempt failed.
    pub fn is_transient(&self) -> bool {
        matches!(self, TraderError::UpstreamUnavailable { .. })
    }
}

impl From<&TraderError> for std::process::ExitCode {
    fn from(err: &TraderError) -> Self {
        let code: u8 = match err {
            TraderError::Io(_) => 1,
            TraderError::ConfigParse { .. }
            | TraderError::ConfigMissing { .. }
            | TraderError::ConfigInvalid { .. } => 2,
            TraderError::Database { .. } | TraderError::DatabaseQuery { .. } => 3,
            TraderError::OrderRejected { .. } | TraderError::UpstreamUnavailable { .. } => 4,
            TraderError::DataInsufficient { .. } | TraderError::InvalidSeries { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
