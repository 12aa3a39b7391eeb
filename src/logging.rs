//! Logging setup.
//!
//! `RUST_LOG` wins when set. Otherwise verbosity flags pick the level:
//! `-q` error, default warn, `-v` info, `-vv` and above debug.
//! Logs go to stderr (or a file) so stdout stays clean for JSON output.
//! `TKB_LOG_FORMAT=json` switches to one JSON object per event.

use crate::error::{BridgeError, Result};
use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::{Mutex, Once};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

const LOG_FORMAT_ENV: &str = "TKB_LOG_FORMAT";

fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a subscriber is
/// already installed.
pub fn init_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let (writer, ansi) = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(io::stderr), io::stderr().is_terminal()),
    };

    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|value| value.eq_ignore_ascii_case("json"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(verbose > 1);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.with_ansi(ansi).try_init()
    };
    installed.map_err(|err| BridgeError::Other(anyhow::anyhow!("failed to install logger: {err}")))
}

/// Route logs through the test harness writer. Safe to call repeatedly.
pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .try_init()
            .ok();
    });
}
