// SPDX-License-Identifier: MIT
//! Observability utilities.
//!
//! Logging setup for embedding applications, plus latency tracking around the
//! crate's named passes (`entitlements.reconcile`, `favorites.persist`).

use std::path::Path;
use std::time::Instant;
use tracing::{debug, warn};

/// A pass slower than this is surfaced at WARN. Reconciliation and favorites
/// persistence both touch only local state and SQLite, so anything above a
/// quarter second means the store or the disk is misbehaving.
const SLOW_PASS_MS: u128 = 250;

/// Initialise tracing for an embedding application.
///
/// `log_format` is "pretty" or "json". With a `log_file`, output goes to a
/// daily-rolling file alongside stdout; the returned guard must outlive all
/// logging for the non-blocking writer to flush. Call once, before any tracing
/// calls.
pub fn setup_logging(
    log_level: &str,
    log_file: Option<&Path>,
    log_format: &str,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let json = log_format == "json";

    let Some(path) = log_file else {
        init_stdout(log_level, json);
        return None;
    };

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let filename = path
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("quotefeed.log"));

    // tracing-appender panics on an unopenable directory; a bad log path
    // degrades to stdout-only instead.
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!(
            "warn: could not create log directory '{}': {e} — logging to stdout only",
            dir.display()
        );
        init_stdout(log_level, json);
        return None;
    }

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, filename));

    if json {
        tracing_subscriber::registry()
            .with(EnvFilter::new(log_level))
            .with(fmt::layer().json())
            .with(fmt::layer().json().with_writer(file_writer))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(EnvFilter::new(log_level))
            .with(fmt::layer().compact())
            .with(fmt::layer().with_writer(file_writer))
            .init();
    }
    Some(guard)
}

fn init_stdout(log_level: &str, json: bool) {
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(log_level)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(log_level)
            .compact()
            .init();
    }
}

/// Times one named pass and logs its duration on [`finish`](Self::finish).
///
/// The name is one of the crate's fixed pass identifiers so log queries can
/// group on it; free-form strings defeat that, hence `&'static str`.
pub struct LatencyTracker {
    pass: &'static str,
    start: Instant,
}

impl LatencyTracker {
    pub fn start(pass: &'static str) -> Self {
        Self {
            pass,
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        let elapsed_ms = self.start.elapsed().as_millis();
        if elapsed_ms > SLOW_PASS_MS {
            warn!(pass = self.pass, elapsed_ms, "slow pass");
        } else {
            debug!(pass = self.pass, elapsed_ms, "pass complete");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_tracker_finishes_without_subscriber() {
        let tracker = LatencyTracker::start("entitlements.reconcile");
        tracker.finish();
    }
}
