//! Progress bar for a sync batch.
//!
//! Drawn on stderr only when it is a terminal. The message shows the record
//! being written and running created/updated/skipped tallies.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::cell::Cell;
use std::io::{IsTerminal, stderr};

const TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:32.cyan/blue}] {pos}/{len} {msg}";

/// Outcome of a single record, as counted by [`BatchProgress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tally {
    Created,
    Updated,
    Skipped,
}

/// Batch progress with per-outcome counters.
pub struct BatchProgress {
    bar: ProgressBar,
    visible: bool,
    counts: Cell<[u64; 3]>,
}

impl BatchProgress {
    /// Bar for `total` records, visible when stderr is a terminal.
    #[must_use]
    pub fn detect(total: u64) -> Self {
        Self::new(total, stderr().is_terminal())
    }

    /// # Panics
    /// Panics if the bar template is invalid.
    #[must_use]
    pub fn new(total: u64, visible: bool) -> Self {
        let bar = ProgressBar::new(total);
        if visible {
            bar.set_style(
                ProgressStyle::default_bar()
                    .template(TEMPLATE)
                    .expect("valid template")
                    .progress_chars("=>-"),
            );
        } else {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        Self {
            bar,
            visible,
            counts: Cell::new([0; 3]),
        }
    }

    /// Show which source key is being processed.
    pub fn start(&self, source_key: &str) {
        self.bar.set_message(self.label(source_key));
    }

    /// Count one finished record.
    pub fn record(&self, tally: Tally) {
        let mut counts = self.counts.get();
        counts[tally as usize] += 1;
        self.counts.set(counts);
        self.bar.inc(1);
    }

    #[must_use]
    pub fn count(&self, tally: Tally) -> u64 {
        self.counts.get()[tally as usize]
    }

    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    fn label(&self, source_key: &str) -> String {
        let [created, updated, skipped] = self.counts.get();
        format!("{source_key} (+{created} ~{updated} -{skipped})")
    }
}
