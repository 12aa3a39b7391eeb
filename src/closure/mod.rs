//! Issue closure resolution.
//!
//! Starting from a seed set of flat records, pull in every parent and
//! dependant issue they reference. Each round expands the records added by
//! the previous round; the default single round matches a one-pass scan over
//! the seed keys.

use crate::client::IssueSource;
use crate::error::Result;
use crate::flatten::flatten_issue;
use crate::mapping::MappingTable;
use crate::model::{ClosureSet, FlatRecord, keys};
use crate::util::is_blank;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use tracing::{debug, info, warn};

/// Default traversal depth.
pub const DEFAULT_DEPTH: usize = 1;
/// Default number of concurrent fetchers.
pub const DEFAULT_WORKERS: usize = 4;

/// Traversal settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClosureOptions {
    pub depth: usize,
    pub workers: usize,
}

impl Default for ClosureOptions {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            workers: DEFAULT_WORKERS,
        }
    }
}

/// Counters from one resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClosureStats {
    pub rounds: usize,
    pub fetched: usize,
    pub missing: usize,
    pub failed: usize,
}

/// Expands a closure set through a fetch-by-key collaborator.
pub struct ClosureResolver<'a, S: IssueSource + ?Sized> {
    source: &'a S,
    table: &'a MappingTable,
    options: ClosureOptions,
}

enum FetchOutcome {
    Found(usize, String, Value),
    Missing,
    Failed,
}

impl<'a, S: IssueSource + ?Sized> ClosureResolver<'a, S> {
    pub const fn new(source: &'a S, table: &'a MappingTable) -> Self {
        Self {
            source,
            table,
            options: ClosureOptions {
                depth: DEFAULT_DEPTH,
                workers: DEFAULT_WORKERS,
            },
        }
    }

    #[must_use]
    pub const fn with_options(mut self, options: ClosureOptions) -> Self {
        self.options = options;
        self
    }

    /// Add referenced issues to `closure` in place.
    ///
    /// Fetches that return nothing or fail are skipped; a key is never
    /// fetched twice.
    pub fn resolve(&self, closure: &mut ClosureSet) -> ClosureStats {
        let mut stats = ClosureStats::default();
        let claimed: Mutex<HashSet<String>> = Mutex::new(closure.keys().cloned().collect());
        let mut frontier: Vec<String> = closure.keys().cloned().collect();

        for round in 0..self.options.depth {
            let wanted = referenced_keys(closure, &frontier);
            if wanted.is_empty() {
                break;
            }
            stats.rounds += 1;
            debug!(round = round + 1, candidates = wanted.len(), "Expanding closure");

            let mut found = Vec::new();
            for outcome in self.fetch_round(&wanted, &claimed) {
                match outcome {
                    FetchOutcome::Found(order, key, issue) => found.push((order, key, issue)),
                    FetchOutcome::Missing => stats.missing += 1,
                    FetchOutcome::Failed => stats.failed += 1,
                }
            }
            found.sort_by_key(|(order, _, _)| *order);

            frontier = Vec::with_capacity(found.len());
            for (_, key, issue) in found {
                closure.insert(key.clone(), flatten_issue(&issue, self.table));
                frontier.push(key);
                stats.fetched += 1;
            }
        }

        info!(
            records = closure.len(),
            fetched = stats.fetched,
            missing = stats.missing,
            failed = stats.failed,
            "Resolved issue closure"
        );
        stats
    }

    /// Fetch one round of candidate keys on scoped worker threads.
    ///
    /// Workers pull candidates from a shared cursor and claim each key under
    /// the mutex before fetching it.
    fn fetch_round(&self, wanted: &[String], claimed: &Mutex<HashSet<String>>) -> Vec<FetchOutcome> {
        let cursor = AtomicUsize::new(0);
        let outcomes: Mutex<Vec<FetchOutcome>> = Mutex::new(Vec::new());
        let workers = self.options.workers.clamp(1, wanted.len().max(1));

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        let index = cursor.fetch_add(1, Ordering::Relaxed);
                        let Some(key) = wanted.get(index) else {
                            break;
                        };
                        let newly_claimed = claimed
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .insert(key.clone());
                        if !newly_claimed {
                            continue;
                        }
                        let outcome = self.fetch_one(index, key);
                        outcomes
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push(outcome);
                    }
                });
            }
        });

        outcomes.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn fetch_one(&self, order: usize, key: &str) -> FetchOutcome {
        match self.source.fetch_issue(key) {
            Ok(Some(issue)) => FetchOutcome::Found(order, key.to_string(), issue),
            Ok(None) => {
                debug!(key, "Referenced issue not found");
                FetchOutcome::Missing
            }
            Err(err) => {
                warn!(key, error = %err, "Failed to fetch referenced issue, skipping");
                FetchOutcome::Failed
            }
        }
    }
}

/// Parent and dependant keys referenced by `frontier`, in encounter order.
///
/// Keys already in the closure are left out; duplicates are kept so the
/// claim guard decides who fetches.
fn referenced_keys(closure: &ClosureSet, frontier: &[String]) -> Vec<String> {
    let mut wanted = Vec::new();
    for record in frontier.iter().filter_map(|key| closure.get(key)) {
        let parent = record.non_blank_text(keys::PARENT_LINK);
        let dependants = record
            .list(keys::DEPENDANT_ISSUES)
            .unwrap_or_default()
            .iter()
            .map(|key| key.trim())
            .filter(|key| !is_blank(key));

        for key in parent.into_iter().chain(dependants) {
            if !closure.contains_key(key) {
                wanted.push(key.to_string());
            }
        }
    }
    wanted
}

/// Search the source, flatten every hit keyed by its `key`, then resolve
/// the closure of the result.
///
/// # Errors
///
/// Returns an error when the search itself fails. Fetch failures during
/// resolution are skipped.
pub fn fetch_closure<S: IssueSource + ?Sized>(
    source: &S,
    table: &MappingTable,
    query: &str,
    options: ClosureOptions,
) -> Result<ClosureSet> {
    let mut closure = seed_from_issues(source.search(query)?, table);
    debug!(query, seeds = closure.len(), "Seeded closure from search");
    ClosureResolver::new(source, table)
        .with_options(options)
        .resolve(&mut closure);
    Ok(closure)
}

/// Flatten raw issues into a closure set keyed by issue key.
///
/// Issues without a `key` are skipped.
#[must_use]
pub fn seed_from_issues(issues: Vec<Value>, table: &MappingTable) -> ClosureSet {
    let mut closure = ClosureSet::new();
    for issue in issues {
        let Some(key) = issue.get("key").and_then(Value::as_str).filter(|k| !is_blank(k)) else {
            warn!("Search result without a key, skipping");
            continue;
        };
        closure.insert(key.trim().to_string(), flatten_issue(&issue, table));
    }
    closure
}

/// Seed a closure set from already-flat records (CSV ingestion).
///
/// Records without a non-blank `issueKey` are skipped.
#[must_use]
pub fn seed_from_records(records: Vec<FlatRecord>) -> ClosureSet {
    let mut closure = ClosureSet::new();
    for record in records {
        let Some(key) = record.non_blank_text(keys::ISSUE_KEY).map(str::to_string) else {
            warn!("Record without an issue key, skipping");
            continue;
        };
        closure.insert(key, record);
    }
    closure
}
