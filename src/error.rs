//! Error types for the wellness core.

use std::collections::BTreeMap;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Key-value persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open store: {0}")]
    Open(String),

    #[error("Read of {key} failed: {reason}")]
    Read { key: String, reason: String },

    #[error("Write of {key} failed: {reason}")]
    Write { key: String, reason: String },

    #[error("Delete of {key} failed: {reason}")]
    Delete { key: String, reason: String },
}

/// Field path → message mapping produced by a schema.
pub type FieldErrors = BTreeMap<String, String>;

/// A record failed its schema.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{summary}")]
pub struct ValidationError {
    pub summary: String,
    pub field_errors: FieldErrors,
}

impl ValidationError {
    pub fn new(field_errors: FieldErrors) -> Self {
        let summary = field_errors
            .iter()
            .map(|(path, message)| format!("{path}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            summary,
            field_errors,
        }
    }
}

/// Slide navigation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("Slide index {index} out of range (0..{len})")]
    OutOfRange { index: usize, len: usize },

    #[error("Onboarding already completed; reset to navigate again")]
    Completed,
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
