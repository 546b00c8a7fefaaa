// 🚨 Engine Errors - Fail fast with a specific kind
// An empty result is never an error; statistical edge cases resolve to null.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Unknown catalog id
    #[error("query not found: {0}")]
    QueryNotFound(String),

    /// Filter key not accepted, value of the wrong type, or out of range
    #[error("invalid filter '{key}': {reason}")]
    InvalidFilter { key: String, reason: String },

    /// The dataset access layer could not supply a table
    #[error("data unavailable for table '{table}': {reason}")]
    DataUnavailable { table: String, reason: String },

    /// Registry built from ill-formed descriptors (raised at startup only)
    #[error("invalid query catalog: {0}")]
    InvalidCatalog(String),
}

impl EngineError {
    pub fn invalid_filter(key: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidFilter {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn data_unavailable(table: impl Into<String>, reason: impl ToString) -> Self {
        EngineError::DataUnavailable {
            table: table.into(),
            reason: reason.to_string(),
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
