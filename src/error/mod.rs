//! Error types and handling for `ticket_bridge`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Wraps `anyhow` errors from collaborators via [`BridgeError::Other`]
//! - Provides recovery hints for user-facing errors
//! - Provides structured JSON output through [`StructuredError`]

mod structured;

pub use structured::{ErrorCode, StructuredError};

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `ticket_bridge` operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    // === Mapping Errors ===
    /// Mapping configuration file not found.
    #[error("Mapping configuration not found at '{path}'")]
    MappingNotFound { path: PathBuf },

    /// A mapping entry violates the operator contract.
    #[error("Invalid mapping for '{field}': {reason}")]
    InvalidMapping { field: String, reason: String },

    // === Sync Errors ===
    /// A create was requested without a destination project key.
    #[error("Project key is required for creating a new issue")]
    MissingProjectKey,

    /// The write collaborator rejected a create or update.
    #[error("Failed to {operation} issue{}: {reason}", key_suffix(.key))]
    WriteFailure {
        operation: &'static str,
        key: Option<String>,
        reason: String,
    },

    /// The fetch collaborator failed for a key.
    #[error("Failed to fetch issue {key}: {reason}")]
    FetchFailure { key: String, reason: String },

    /// Search query could not be understood by the source.
    #[error("Invalid query '{query}': {reason}")]
    InvalidQuery { query: String, reason: String },

    // === Input Errors ===
    /// Failed to parse a line in a JSONL snapshot.
    #[error("JSONL parse error at line {line}: {reason}")]
    JsonlParse { line: usize, reason: String },

    /// Malformed CSV input.
    #[error("CSV parse error at line {line}: {reason}")]
    CsvParse { line: usize, reason: String },

    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    // === Configuration Errors ===
    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No `.bridge` directory was found.
    #[error("Bridge workspace not found: create a .bridge directory with config.yaml")]
    NotInitialized,

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Wrapped anyhow error from collaborators.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BridgeError {
    /// Can the user fix this without code changes?
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MappingNotFound { .. }
                | Self::InvalidMapping { .. }
                | Self::MissingProjectKey
                | Self::InvalidQuery { .. }
                | Self::Validation { .. }
                | Self::Config(_)
                | Self::NotInitialized
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Create .bridge/config.yaml or pass --bridge-dir"),
            Self::MappingNotFound { .. } => {
                Some("Set source.mapping-config / destination.mapping-config in .bridge/config.yaml")
            }
            Self::MissingProjectKey => {
                Some("Set the External Linking ID to [PROJECT] to create, or to a destination key to update")
            }
            Self::InvalidQuery { .. } => {
                Some("Supported: *, key = K, key in (A, B), project = P, joined with AND")
            }
            Self::WriteFailure { .. } => {
                Some("Records before the failing one were already written; fix and re-run")
            }
            _ => None,
        }
    }

    /// Create a validation error for a specific field.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a mapping error for a display name.
    #[must_use]
    pub fn invalid_mapping(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMapping {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[allow(clippy::ref_option)]
fn key_suffix(key: &Option<String>) -> String {
    key.as_ref().map(|k| format!(" {k}")).unwrap_or_default()
}

/// Result type using `BridgeError`.
pub type Result<T> = std::result::Result<T, BridgeError>;
