//! Error types for the Gridcalc engine.

use thiserror::Error;

/// Failures the engine reports to its caller.
///
/// Formula evaluation problems are not errors: they become the `#ERR`
/// computed value and flow through the grid like any other value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid cell reference: {0}")]
    InvalidReference(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
