//! Shared utilities for `ticket_bridge`.
//!
//! - Display-name to record-key conversion
//! - Dotted-path access into raw issue JSON
//! - Date pattern translation for `DateAsString[...]`
//! - Content hashing of queued writes (SHA256)
//! - Progress indicators

mod case;
pub mod date;
mod hash;
pub mod json_path;
pub mod progress;

pub use case::to_camel_case;
pub use date::DatePattern;
pub use hash::write_request_hash;

/// True when the string is empty or whitespace only.
#[must_use]
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
