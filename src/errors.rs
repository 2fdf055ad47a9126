//! # Engine Error Types Module
//!
//! Resolution outcomes ("unmapped", "unresolved", "unlinked") are values, not
//! errors. This module covers the infrastructure failures around them:
//! loading dictionaries, reading configuration, talking to the record store
//! and driving the receipt review state machine out of order.

use crate::receipt_review::ReviewState;

/// Custom error types for the resolution engine
#[derive(Debug, Clone)]
pub enum EngineError {
    /// Synonym dictionary could not be parsed or referenced an unknown field
    Dictionary(String),
    /// Invalid configuration value
    Config(String),
    /// Record store failures
    Store(String),
    /// A review step was requested from a state that does not allow it
    InvalidTransition {
        from: ReviewState,
        to: ReviewState,
    },
    /// A line item index outside the current receipt
    UnknownLineItem(usize),
    /// An article id that is not part of the catalog snapshot
    UnknownArticle(i64),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Dictionary(msg) => write!(f, "Dictionary error: {msg}"),
            EngineError::Config(msg) => write!(f, "Configuration error: {msg}"),
            EngineError::Store(msg) => write!(f, "Record store error: {msg}"),
            EngineError::InvalidTransition { from, to } => {
                write!(f, "Invalid review transition: {from:?} -> {to:?}")
            }
            EngineError::UnknownLineItem(index) => write!(f, "Unknown line item: {index}"),
            EngineError::UnknownArticle(id) => write!(f, "Unknown article: {id}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::Store(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Dictionary(err.to_string())
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Store(err.to_string())
    }
}
