//! Error types for Gridcalc core.

use gridcalc_engine::engine::EngineError;
use thiserror::Error;

/// Errors that can occur while serving grid operations
#[derive(Error, Debug)]
pub enum GridcalcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Config error: {0}")]
    Config(String),

    /// Missing or ill-formed input at the service boundary.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl GridcalcError {
    /// Whether the caller sent something unusable, as opposed to the
    /// service failing on good input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, GridcalcError::Validation(_) | GridcalcError::Engine(_))
    }
}

pub type Result<T> = std::result::Result<T, GridcalcError>;
