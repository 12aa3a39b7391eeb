//! `ticket_bridge`: mapping-driven migration and sync between two
//! ticket-tracker instances.
//!
//! The pipeline:
//! 1. [`mapping::MappingTable`] is loaded once from the operator's YAML
//! 2. [`flatten::flatten_issue`] turns raw issue JSON into flat records
//! 3. [`closure::ClosureResolver`] pulls in referenced parents and dependants
//! 4. [`sync::Synchronizer`] decides create vs update from the linking id and
//!    dispatches payloads built by [`payload::build_write_request`]
//!
//! [`report::build_work_items`] summarizes destination Epics per quarter.
//!
//! Trackers are reached through the [`client::IssueSource`] and
//! [`client::IssueSink`] traits.

pub mod cli;
pub mod client;
pub mod closure;
pub mod config;
pub mod error;
pub mod flatten;
pub mod format;
pub mod logging;
pub mod mapping;
pub mod model;
pub mod payload;
pub mod report;
pub mod sync;
pub mod util;

pub use error::{BridgeError, ErrorCode, Result, StructuredError};
