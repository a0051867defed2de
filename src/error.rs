use chrono::NaiveDate;
use thiserror::Error;

/// Failures raised by providers, strategies, the simulator and the aggregator.
#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("invalid price input: {0}")]
    InvalidInput(String),

    #[error("no local price data for {ticker}")]
    NotFound { ticker: String },

    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error(
        "calendar mismatch for {ticker}: expected {expected} dates, found {found} (first difference at {first_difference})"
    )]
    CalendarMismatch {
        ticker: String,
        expected: usize,
        found: usize,
        first_difference: NaiveDate,
    },

    #[error("computation error: {0}")]
    Computation(String),

    #[error("no tickers available in {0}")]
    NoTickers(String),

    #[error("every security failed for {strategy} ({failed} failures)")]
    AllSecuritiesFailed { strategy: String, failed: usize },

    #[error("failed to read price data for {ticker}: {source}")]
    Io {
        ticker: String,
        #[source]
        source: std::io::Error,
    },

    #[error("market data snapshot error: {0}")]
    Snapshot(String),
}

impl BacktestError {
    /// Only I/O failures are worth another attempt; everything else is deterministic.
    pub fn is_transient(&self) -> bool {
        matches!(self, BacktestError::Io { .. })
    }
}

pub type BacktestResult<T> = Result<T, BacktestError>;
