//! Failure classification.
//!
//! Every [`IngestError`] maps to exactly one [`ErrorKind`]. Structured errors are classified by
//! variant (HTTP status, I/O, decoder errors); free-form messages fall through to
//! [`MESSAGE_SIGNATURES`], a finite table with one row per substring.

use std::fmt;

use serde::Serialize;
use tracing::Level;

use crate::error::IngestError;

use super::observability::IngestionSeverity;

/// Failure taxonomy surfaced in a [`super::LoadResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// A fetch failed or returned a non-success status.
    NetworkError,
    /// No decoder is registered for the detected format.
    UnsupportedFormat,
    /// The input is structurally invalid.
    MalformedInput,
    /// The columnar decoder runtime failed to load or instantiate.
    RuntimeUnavailable,
    /// Anything unclassified.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What the ingestion core does with a failure of a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryPolicy {
    /// Decode via the degraded path and mark the result partial.
    Fallback,
    /// Return a terminal failure to the caller.
    Surface,
}

/// Message substrings identifying failures that reach us only as text.
///
/// Rows are matched in order, case-insensitively; the first hit wins.
pub const MESSAGE_SIGNATURES: &[(&str, ErrorKind)] = &[
    ("parquetfile_fromfile", ErrorKind::RuntimeUnavailable),
    ("webassembly", ErrorKind::RuntimeUnavailable),
    ("wasm", ErrorKind::RuntimeUnavailable),
    ("failed to fetch", ErrorKind::NetworkError),
    ("connection", ErrorKind::NetworkError),
    ("footer", ErrorKind::MalformedInput),
    ("magic", ErrorKind::MalformedInput),
    ("unexpected end", ErrorKind::MalformedInput),
];

/// Assign an [`ErrorKind`] to a failure.
pub fn classify(err: &IngestError) -> ErrorKind {
    match err {
        IngestError::Io(_) | IngestError::Http { .. } | IngestError::Network(_) => {
            ErrorKind::NetworkError
        }
        IngestError::Csv(e) => match e.kind() {
            csv::ErrorKind::Io(_) => ErrorKind::NetworkError,
            _ => ErrorKind::MalformedInput,
        },
        IngestError::Parquet(e) => {
            classify_message(&e.to_string()).unwrap_or(ErrorKind::MalformedInput)
        }
        IngestError::Json(_) | IngestError::MalformedInput { .. } => ErrorKind::MalformedInput,
        IngestError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
        IngestError::RuntimeUnavailable { .. } | IngestError::ModuleInstantiation { .. } => {
            ErrorKind::RuntimeUnavailable
        }
        IngestError::Config(_) => ErrorKind::Internal,
        IngestError::Internal { message } => {
            classify_message(message).unwrap_or(ErrorKind::Internal)
        }
    }
}

/// Look a free-form message up in [`MESSAGE_SIGNATURES`].
pub fn classify_message(message: &str) -> Option<ErrorKind> {
    let lower = message.to_ascii_lowercase();
    MESSAGE_SIGNATURES
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|&(_, kind)| kind)
}

impl ErrorKind {
    /// Recovery policy for this kind. Only [`ErrorKind::RuntimeUnavailable`] falls back.
    pub fn policy(self) -> RecoveryPolicy {
        match self {
            Self::RuntimeUnavailable => RecoveryPolicy::Fallback,
            _ => RecoveryPolicy::Surface,
        }
    }

    /// Severity reported to [`super::IngestionObserver`]s.
    pub fn severity(self) -> IngestionSeverity {
        match self {
            Self::RuntimeUnavailable => IngestionSeverity::Warning,
            Self::UnsupportedFormat | Self::MalformedInput => IngestionSeverity::Error,
            Self::NetworkError | Self::Internal => IngestionSeverity::Critical,
        }
    }

    /// Log level for this kind. Expected environmental runtime failures stay at `debug`.
    pub fn log_level(self) -> Level {
        match self {
            Self::RuntimeUnavailable => Level::DEBUG,
            _ => Level::WARN,
        }
    }
}

/// Emit a log line for a classified failure at the level chosen by [`ErrorKind::log_level`].
pub(crate) fn log_failure(kind: ErrorKind, name: &str, err: &IngestError) {
    if kind.log_level() == Level::DEBUG {
        tracing::debug!(kind = %kind, input = name, error = %err, "load degraded");
    } else {
        tracing::warn!(kind = %kind, input = name, error = %err, "load failed");
    }
}
