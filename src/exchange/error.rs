//! Error taxonomy for exchange calls.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The exchange answered with a non-zero application code.
    #[error("exchange rejected request: code {code}, {msg}")]
    Rejected { code: i64, msg: String },

    /// Non-2xx HTTP status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Transport failure: timeout, refused connection, TLS.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Body could not be parsed or lacked the expected payload.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ExchangeError {
    /// Application-level rejection code, if any.
    pub fn code(&self) -> Option<i64> {
        match self {
            ExchangeError::Rejected { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True for failures a read-only loop should just retry next cycle.
    pub fn is_transient(&self) -> bool {
        matches!(self, ExchangeError::Network(_) | ExchangeError::Http { .. })
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
