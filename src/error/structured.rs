//! Structured error output for scripted callers.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - Hints for self-correction
//! - Retryability flags
//! - Context for debugging

use crate::error::BridgeError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === Mapping Errors (exit code 2) ===
    /// Mapping file not found
    MappingNotFound,
    /// Mapping entry breaks the operator contract
    InvalidMapping,

    // === Sync Errors (exit code 3) ===
    /// Create requested without a project key
    MissingProjectKey,
    /// Destination rejected a write
    WriteFailed,
    /// Source fetch failed
    FetchFailed,

    // === Validation Errors (exit code 4) ===
    /// Field validation failed
    ValidationFailed,
    /// Query not understood by the source
    InvalidQuery,

    // === Input Errors (exit code 6) ===
    /// JSONL parse error
    JsonlParseError,
    /// CSV parse error
    CsvParseError,

    // === Config Errors (exit code 7) ===
    /// Configuration error
    ConfigError,
    /// No bridge workspace found
    NotInitialized,

    // === I/O Errors (exit code 8) ===
    /// File I/O error
    IoError,
    /// JSON serialization error
    JsonError,
    /// YAML parsing error
    YamlError,

    // === Internal Errors (exit code 1) ===
    /// Unexpected internal error
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MappingNotFound => "MAPPING_NOT_FOUND",
            Self::InvalidMapping => "INVALID_MAPPING",
            Self::MissingProjectKey => "MISSING_PROJECT_KEY",
            Self::WriteFailed => "WRITE_FAILED",
            Self::FetchFailed => "FETCH_FAILED",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::InvalidQuery => "INVALID_QUERY",
            Self::JsonlParseError => "JSONL_PARSE_ERROR",
            Self::CsvParseError => "CSV_PARSE_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::YamlError => "YAML_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether this error is potentially retryable.
    ///
    /// Write and fetch failures usually come from the transport and may
    /// succeed on a later run; the rest need an input fix first.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::WriteFailed | Self::FetchFailed | Self::ValidationFailed | Self::InvalidQuery
        )
    }

    /// Get the exit code for this error category.
    ///
    /// - 1: Internal/unknown errors
    /// - 2: Mapping errors
    /// - 3: Sync errors
    /// - 4: Validation errors
    /// - 6: Input file errors
    /// - 7: Config errors
    /// - 8: I/O errors
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::MappingNotFound | Self::InvalidMapping => 2,
            Self::MissingProjectKey | Self::WriteFailed | Self::FetchFailed => 3,
            Self::ValidationFailed | Self::InvalidQuery => 4,
            Self::JsonlParseError | Self::CsvParseError => 6,
            Self::ConfigError | Self::NotInitialized => 7,
            Self::IoError | Self::JsonError | Self::YamlError => 8,
            Self::InternalError => 1,
        }
    }
}

/// Structured error for machine-parseable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
    /// Additional context data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl StructuredError {
    /// Create a new structured error from a `BridgeError`.
    #[must_use]
    pub fn from_error(err: &BridgeError) -> Self {
        let (code, context) = Self::extract_code_and_context(err);
        let hint = Self::generate_hint(err);

        Self {
            code,
            message: err.to_string(),
            hint,
            retryable: code.is_retryable(),
            context,
        }
    }

    /// Serialize to JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
                "context": self.context,
            }
        })
    }

    /// Format for human-readable output.
    #[must_use]
    pub fn to_human(&self, color: bool) -> String {
        let mut output = String::new();

        if color {
            output.push_str("\x1b[31mError:\x1b[0m ");
        } else {
            output.push_str("Error: ");
        }

        output.push_str(&self.message);

        if let Some(hint) = &self.hint {
            output.push('\n');
            if color {
                output.push_str("\x1b[33mHint:\x1b[0m ");
            } else {
                output.push_str("Hint: ");
            }
            output.push_str(hint);
        }

        output
    }

    fn extract_code_and_context(err: &BridgeError) -> (ErrorCode, Option<Value>) {
        match err {
            BridgeError::MappingNotFound { path } => (
                ErrorCode::MappingNotFound,
                Some(json!({"path": path.display().to_string()})),
            ),
            BridgeError::InvalidMapping { field, reason } => (
                ErrorCode::InvalidMapping,
                Some(json!({"field": field, "reason": reason})),
            ),
            BridgeError::MissingProjectKey => (ErrorCode::MissingProjectKey, None),
            BridgeError::WriteFailure { operation, key, .. } => (
                ErrorCode::WriteFailed,
                Some(json!({"operation": operation, "key": key})),
            ),
            BridgeError::FetchFailure { key, .. } => {
                (ErrorCode::FetchFailed, Some(json!({"key": key})))
            }
            BridgeError::InvalidQuery { query, .. } => {
                (ErrorCode::InvalidQuery, Some(json!({"query": query})))
            }
            BridgeError::Validation { field, reason } => (
                ErrorCode::ValidationFailed,
                Some(json!({"field": field, "reason": reason})),
            ),
            BridgeError::JsonlParse { line, reason } => (
                ErrorCode::JsonlParseError,
                Some(json!({"line": line, "reason": reason})),
            ),
            BridgeError::CsvParse { line, reason } => (
                ErrorCode::CsvParseError,
                Some(json!({"line": line, "reason": reason})),
            ),
            BridgeError::Config(_) => (ErrorCode::ConfigError, None),
            BridgeError::NotInitialized => (ErrorCode::NotInitialized, None),
            BridgeError::Io(_) => (ErrorCode::IoError, None),
            BridgeError::Json(_) => (ErrorCode::JsonError, None),
            BridgeError::Yaml(_) => (ErrorCode::YamlError, None),
            BridgeError::Other(_) => (ErrorCode::InternalError, None),
        }
    }

    fn generate_hint(err: &BridgeError) -> Option<String> {
        if let Some(suggestion) = err.suggestion() {
            return Some(suggestion.to_string());
        }

        match err {
            BridgeError::JsonlParse { line, .. } => Some(format!(
                "Check line {line} of the snapshot file for syntax errors."
            )),
            BridgeError::CsvParse { line, .. } => {
                Some(format!("Check line {line} of the CSV file; it must be UTF-8 text."))
            }
            BridgeError::InvalidMapping { field, .. } => Some(format!(
                "Fix the '{field}' entry in the mapping YAML and re-run."
            )),
            _ => None,
        }
    }
}
