//! Collaborator seams around the mapping engine.
//!
//! The engine never talks to a tracker directly. It reads raw issues through
//! an [`IssueSource`] and hands reconstructed payloads to an [`IssueSink`].
//! Implementations shipped here are file-backed:
//! - [`SnapshotStore`] serves issues from a JSONL snapshot
//! - [`Outbox`] appends write requests to a JSONL file for a transport to replay
//! - [`DryRun`] keeps write requests in memory

mod outbox;
mod snapshot;

pub use outbox::{DryRun, Outbox, OutboxEntry};
pub use snapshot::{SearchQuery, SnapshotStore};

use crate::error::Result;
use serde_json::Value;

/// Read side of a tracker instance.
///
/// `Sync` so closure resolution can fetch from several threads at once.
pub trait IssueSource: Sync {
    /// Fetch one raw issue by key. `Ok(None)` when the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error when the lookup itself fails.
    fn fetch_issue(&self, key: &str) -> Result<Option<Value>>;

    /// Run a search and return the raw matching issues.
    ///
    /// # Errors
    ///
    /// Returns an error when the query is invalid or the search fails.
    fn search(&self, query: &str) -> Result<Vec<Value>>;
}

/// Write side of a tracker instance.
pub trait IssueSink {
    /// Create an issue from `{ "fields": ... }`; returns the new key when known.
    ///
    /// # Errors
    ///
    /// Returns an error when the create is rejected.
    fn create_issue(&mut self, payload: &Value) -> Result<Option<String>>;

    /// Update `key` with `{ "fields": ... }`.
    ///
    /// # Errors
    ///
    /// Returns an error when the update is rejected.
    fn update_issue(&mut self, key: &str, payload: &Value) -> Result<()>;
}

impl<T: IssueSink + ?Sized> IssueSink for &mut T {
    fn create_issue(&mut self, payload: &Value) -> Result<Option<String>> {
        (**self).create_issue(payload)
    }

    fn update_issue(&mut self, key: &str, payload: &Value) -> Result<()> {
        (**self).update_issue(key, payload)
    }
}
