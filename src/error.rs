use thiserror::Error;

/// Errors raised by the engine's capabilities (catalog, query backends, store).
///
/// Adapters at the edge of the engine fold these into success/failure envelopes,
/// so callers of the rendering layer never see them as panics.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("query engine error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("unknown view: {0}")]
    UnknownView(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound { kind, id: id.to_string() }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
