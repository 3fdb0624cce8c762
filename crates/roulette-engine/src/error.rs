// crates/roulette-engine/src/error.rs
// Error types for the candidate engine

use thiserror::Error;

/// Failure of the external places search
#[derive(Error, Debug, Clone)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("search failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider error: {0}")]
    Provider(String),

    #[error("failed to decode search response: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("search provider not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SearchError::Decode(err.to_string())
        } else {
            SearchError::Http(err.to_string())
        }
    }
}

impl From<std::io::Error> for SearchError {
    fn from(err: std::io::Error) -> Self {
        SearchError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Decode(err.to_string())
    }
}

/// Business rule that rejected an add-to-kept request
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepRejection {
    #[error("restaurant is not operational")]
    NotOperational,

    #[error("kept list is full")]
    ListFull,

    #[error("restaurant is already kept")]
    AlreadyKept,

    #[error("no kept entry at that index")]
    OutOfRange,
}

/// Main error type for the engine
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("search failure: {0}")]
    SearchFailure(#[from] SearchError),

    #[error("no restaurants available, please retry")]
    ExhaustedInventory,

    #[error("invalid operation: {0}")]
    InvalidOperation(KeepRejection),

    #[error("no history to go back to")]
    NoHistory,

    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Result using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Whether retrying the same action later can succeed
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EngineError::Config(_))
    }
}

impl From<KeepRejection> for EngineError {
    fn from(rejection: KeepRejection) -> Self {
        EngineError::InvalidOperation(rejection)
    }
}
