//! Error types for the analytics engine.
//!
//! The schedule, cost and WBS engines degrade silently on bad input and
//! never fail. Errors only come from the baseline store, imports and configuration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("baseline not found: {baseline_id}")]
    BaselineNotFound { baseline_id: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("snapshot belongs to project {found}, not {expected}")]
    ProjectMismatch { expected: String, found: String },
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
