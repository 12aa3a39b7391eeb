//! Write sinks: a JSONL outbox replayed by a transport, and an in-memory dry run.

use super::IssueSink;
use crate::error::{BridgeError, Result};
use crate::util::write_request_hash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One queued write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub op: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub payload: Value,
    pub content_hash: String,
    pub queued_at: DateTime<Utc>,
}

impl OutboxEntry {
    fn new(op: &str, key: Option<&str>, payload: &Value) -> Self {
        Self {
            op: op.to_string(),
            key: key.map(str::to_string),
            payload: payload.clone(),
            content_hash: write_request_hash(op, key, payload),
            queued_at: Utc::now(),
        }
    }
}

/// Appends write requests to a JSONL file, one entry per line.
pub struct Outbox {
    path: PathBuf,
    writer: BufWriter<File>,
    queued: usize,
}

impl Outbox {
    /// Open (or create) the outbox for appending.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its parent directory cannot be created.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            queued: 0,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries appended through this handle.
    #[must_use]
    pub const fn queued(&self) -> usize {
        self.queued
    }

    fn append(&mut self, entry: &OutboxEntry) -> Result<()> {
        serde_json::to_writer(&mut self.writer, entry)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.queued += 1;
        debug!(op = %entry.op, key = ?entry.key, hash = %entry.content_hash, "Queued write");
        Ok(())
    }

    /// Read back every entry in an outbox file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line is not an entry.
    pub fn read_entries(path: &Path) -> Result<Vec<OutboxEntry>> {
        let contents = fs::read_to_string(path)?;
        contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|e| BridgeError::JsonlParse {
                    line: index + 1,
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

impl IssueSink for Outbox {
    fn create_issue(&mut self, payload: &Value) -> Result<Option<String>> {
        self.append(&OutboxEntry::new("create", None, payload))?;
        Ok(None)
    }

    fn update_issue(&mut self, key: &str, payload: &Value) -> Result<()> {
        self.append(&OutboxEntry::new("update", Some(key), payload))
    }
}

/// Records write requests in memory without touching any file.
#[derive(Debug, Default)]
pub struct DryRun {
    entries: Vec<OutboxEntry>,
}

impl DryRun {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> &[OutboxEntry] {
        &self.entries
    }
}

impl IssueSink for DryRun {
    fn create_issue(&mut self, payload: &Value) -> Result<Option<String>> {
        self.entries.push(OutboxEntry::new("create", None, payload));
        Ok(None)
    }

    fn update_issue(&mut self, key: &str, payload: &Value) -> Result<()> {
        self.entries.push(OutboxEntry::new("update", Some(key), payload));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn outbox_appends_entries_across_handles() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("outbox.jsonl");

        let mut outbox = Outbox::open(&path).unwrap();
        outbox
            .create_issue(&json!({"fields": {"project": {"key": "PROJ"}}}))
            .unwrap();
        assert_eq!(outbox.queued(), 1);
        drop(outbox);

        let mut outbox = Outbox::open(&path).unwrap();
        outbox
            .update_issue("DEST-7", &json!({"fields": {"summary": "x"}}))
            .unwrap();
        drop(outbox);

        let entries = Outbox::read_entries(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].op, "create");
        assert_eq!(entries[0].key, None);
        assert_eq!(entries[1].key.as_deref(), Some("DEST-7"));
        assert_eq!(
            entries[1].content_hash,
            write_request_hash("update", Some("DEST-7"), &json!({"fields": {"summary": "x"}}))
        );
    }

    #[test]
    fn dry_run_keeps_entries_in_memory() {
        let mut sink = DryRun::new();
        assert_eq!(sink.create_issue(&json!({"fields": {}})).unwrap(), None);
        sink.update_issue("DEST-1", &json!({"fields": {}})).unwrap();
        assert_eq!(sink.entries().len(), 2);
        assert_eq!(sink.entries()[1].op, "update");
    }
}
