use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::classify::ErrorKind;
use super::detect::Format;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal, e.g. a degraded decoder runtime).
    Warning,
    /// Error-level event (load failed because of its input).
    Error,
    /// Critical error (network, I/O or unclassified failures).
    Critical,
}

/// Context about a load attempt.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    /// The input name.
    pub name: String,
    /// Detected format ([`Format::Unknown`] if detection did not run or matched nothing).
    pub format: Format,
}

/// Minimal stats reported on a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionStats {
    /// Number of rows in the dataset.
    pub rows: usize,
    /// Input rows dropped as malformed.
    pub skipped_rows: usize,
    /// Whether the dataset is partial.
    pub partial: bool,
}

/// A classified failure as seen by observers.
#[derive(Debug, Clone, Copy)]
pub struct IngestionFailure<'a> {
    /// Failure kind.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: &'a str,
}

/// Observer interface for load outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait IngestionObserver: Send + Sync {
    /// Called when a load succeeds (including partial results).
    fn on_success(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    /// Called when a load fails.
    fn on_failure(
        &self,
        _ctx: &IngestionContext,
        _severity: IngestionSeverity,
        _failure: IngestionFailure<'_>,
    ) {
    }

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(
        &self,
        ctx: &IngestionContext,
        severity: IngestionSeverity,
        failure: IngestionFailure<'_>,
    ) {
        self.on_failure(ctx, severity, failure)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(
        &self,
        ctx: &IngestionContext,
        severity: IngestionSeverity,
        failure: IngestionFailure<'_>,
    ) {
        for o in &self.observers {
            o.on_failure(ctx, severity, failure);
        }
    }

    fn on_alert(
        &self,
        ctx: &IngestionContext,
        severity: IngestionSeverity,
        failure: IngestionFailure<'_>,
    ) {
        for o in &self.observers {
            o.on_alert(ctx, severity, failure);
        }
    }
}

/// Emits load outcomes as `tracing` events under the `atlas_ingest::load` target.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        if stats.partial {
            tracing::warn!(
                target: "atlas_ingest::load",
                format = %ctx.format,
                input = %ctx.name,
                rows = stats.rows,
                "partial dataset: decoder runtime unavailable"
            );
        } else {
            tracing::info!(
                target: "atlas_ingest::load",
                format = %ctx.format,
                input = %ctx.name,
                rows = stats.rows,
                skipped_rows = stats.skipped_rows,
                "load ok"
            );
        }
    }

    fn on_failure(
        &self,
        ctx: &IngestionContext,
        severity: IngestionSeverity,
        failure: IngestionFailure<'_>,
    ) {
        tracing::warn!(
            target: "atlas_ingest::load",
            ?severity,
            kind = %failure.kind,
            format = %ctx.format,
            input = %ctx.name,
            error = failure.message,
            "load failed"
        );
    }

    fn on_alert(
        &self,
        ctx: &IngestionContext,
        severity: IngestionSeverity,
        failure: IngestionFailure<'_>,
    ) {
        tracing::error!(
            target: "atlas_ingest::load",
            ?severity,
            kind = %failure.kind,
            format = %ctx.format,
            input = %ctx.name,
            error = failure.message,
            "load alert"
        );
    }
}

/// Appends load events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl IngestionObserver for FileObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.append_line(&format!(
            "{} ok format={} input={} rows={} skipped={} partial={}",
            unix_ts(),
            ctx.format,
            ctx.name,
            stats.rows,
            stats.skipped_rows,
            stats.partial
        ));
    }

    fn on_failure(
        &self,
        ctx: &IngestionContext,
        severity: IngestionSeverity,
        failure: IngestionFailure<'_>,
    ) {
        self.append_line(&format!(
            "{} fail severity={:?} kind={} format={} input={} err={}",
            unix_ts(),
            severity,
            failure.kind,
            ctx.format,
            ctx.name,
            failure.message
        ));
    }

    fn on_alert(
        &self,
        ctx: &IngestionContext,
        severity: IngestionSeverity,
        failure: IngestionFailure<'_>,
    ) {
        self.append_line(&format!(
            "{} ALERT severity={:?} kind={} format={} input={} err={}",
            unix_ts(),
            severity,
            failure.kind,
            ctx.format,
            ctx.name,
            failure.message
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
