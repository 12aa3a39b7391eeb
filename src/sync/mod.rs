//! Synchronization decision engine.
//!
//! The `External Linking ID` field on a source record decides what happens
//! at the destination:
//! - blank or absent: the record is skipped
//! - `[PROJ]`: create a new issue in project `PROJ`
//! - anything else: update the destination issue with that key
//!
//! Records are processed in closure-set order. The first failed write aborts
//! the rest of the batch; [`Synchronizer::report`] still shows what was
//! written before the failure.

use crate::client::IssueSink;
use crate::error::{BridgeError, Result};
use crate::mapping::MappingTable;
use crate::model::{ClosureSet, FlatRecord, SyncDirective, WriteOperation, WriteRequest, keys};
use crate::payload::build_write_request;
use crate::util::progress::{BatchProgress, Tally};
use crate::util::to_camel_case;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Record key of the reserved linking-id field.
#[must_use]
pub fn linking_id_key() -> String {
    to_camel_case(keys::LINKING_ID_DISPLAY_NAME)
}

/// Derive the create/update decision for a source record.
///
/// Returns `None` when the record carries no linking id.
#[must_use]
pub fn decide(record: &FlatRecord, linking_key: &str) -> Option<SyncDirective> {
    let linking_id = record.non_blank_text(linking_key)?;

    if let Some(rest) = linking_id.strip_prefix('[') {
        let project_key = rest.strip_suffix(']').unwrap_or(rest).trim();
        return Some(SyncDirective::Create {
            project_key: project_key.to_string(),
            issue_type: record.non_blank_text(keys::ISSUE_TYPE).map(str::to_string),
        });
    }

    Some(SyncDirective::Update {
        target_key: linking_id.to_string(),
    })
}

/// Rewrite a source record into the destination record the directive describes.
#[must_use]
pub fn apply_directive(record: &FlatRecord, directive: &SyncDirective, linking_key: &str) -> FlatRecord {
    let mut target = record.clone();
    target.remove(linking_key);

    match directive {
        SyncDirective::Create { project_key, .. } => {
            target.remove(keys::ISSUE_KEY);
            target.insert(keys::PROJECT_KEY, project_key.as_str());
        }
        SyncDirective::Update { target_key } => {
            target.insert(keys::ISSUE_KEY, target_key.as_str());
        }
    }
    target
}

/// One write handed to the sink.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchedWrite {
    pub source_key: String,
    #[serde(flatten)]
    pub operation: WriteOperation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_key: Option<String>,
}

/// Outcome counts of a sync batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub dispatched: Vec<DispatchedWrite>,
}

impl SyncReport {
    /// Number of writes accepted by the sink.
    #[must_use]
    pub fn written(&self) -> usize {
        self.created + self.updated
    }
}

/// Drives reconstruction and dispatch for a closure set.
pub struct Synchronizer<'a, W: IssueSink + ?Sized> {
    table: &'a MappingTable,
    sink: &'a mut W,
    linking_key: String,
    report: SyncReport,
    show_progress: Option<bool>,
}

impl<'a, W: IssueSink + ?Sized> Synchronizer<'a, W> {
    pub fn new(table: &'a MappingTable, sink: &'a mut W) -> Self {
        Self {
            table,
            sink,
            linking_key: linking_id_key(),
            report: SyncReport::default(),
            show_progress: None,
        }
    }

    /// Force the progress bar on or off instead of detecting a terminal.
    #[must_use]
    pub const fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = Some(show);
        self
    }

    /// Process every record in order.
    ///
    /// # Errors
    ///
    /// Stops at the first record that cannot be reconstructed or written.
    pub fn run(&mut self, closure: &ClosureSet) -> Result<()> {
        let total = closure.len() as u64;
        let progress = match self.show_progress {
            Some(show) => BatchProgress::new(total, show),
            None => BatchProgress::detect(total),
        };

        let result = closure.iter().try_for_each(|(source_key, record)| {
            progress.start(source_key);
            let tally = self.sync_record(source_key, record)?;
            progress.record(tally);
            Ok(())
        });
        progress.finish();

        match &result {
            Ok(()) => info!(
                created = self.report.created,
                updated = self.report.updated,
                skipped = self.report.skipped,
                "Sync complete"
            ),
            Err(err) => warn!(
                written = self.report.written(),
                remaining = closure.len() - self.report.written() - self.report.skipped,
                error = %err,
                "Sync aborted"
            ),
        }
        result
    }

    fn sync_record(&mut self, source_key: &str, record: &FlatRecord) -> Result<Tally> {
        let Some(directive) = decide(record, &self.linking_key) else {
            debug!(source_key, "No linking id, skipping");
            self.report.skipped += 1;
            return Ok(Tally::Skipped);
        };

        let target = apply_directive(record, &directive, &self.linking_key);
        let request = build_write_request(&target, self.table)?;
        let created_key = self.dispatch(&request)?;

        let tally = match &request.operation {
            WriteOperation::Create { project_key, .. } => {
                info!(source_key, project_key = %project_key, created_key = ?created_key, "Created issue");
                self.report.created += 1;
                Tally::Created
            }
            WriteOperation::Update { issue_key } => {
                info!(source_key, issue_key = %issue_key, "Updated issue");
                self.report.updated += 1;
                Tally::Updated
            }
        };
        self.report.dispatched.push(DispatchedWrite {
            source_key: source_key.to_string(),
            operation: request.operation,
            created_key,
        });
        Ok(tally)
    }

    fn dispatch(&mut self, request: &WriteRequest) -> Result<Option<String>> {
        let result = match &request.operation {
            WriteOperation::Create { .. } => self.sink.create_issue(&request.payload),
            WriteOperation::Update { issue_key } => self
                .sink
                .update_issue(issue_key, &request.payload)
                .map(|()| None),
        };

        result.map_err(|err| match err {
            BridgeError::WriteFailure { .. } => err,
            other => BridgeError::WriteFailure {
                operation: request.operation.as_str(),
                key: request.operation.target_key().map(str::to_string),
                reason: other.to_string(),
            },
        })
    }

    #[must_use]
    pub const fn report(&self) -> &SyncReport {
        &self.report
    }

    #[must_use]
    pub fn into_report(self) -> SyncReport {
        self.report
    }
}

/// Synchronize a closure set through `sink`.
///
/// # Errors
///
/// Returns the first reconstruction or write error; earlier writes stay applied.
pub fn synchronize<W: IssueSink + ?Sized>(
    closure: &ClosureSet,
    table: &MappingTable,
    sink: &mut W,
) -> Result<SyncReport> {
    let mut synchronizer = Synchronizer::new(table, sink);
    synchronizer.run(closure)?;
    Ok(synchronizer.into_report())
}
