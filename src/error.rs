use thiserror::Error;

/// Convenience result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Error type returned by every stage of the ingestion core.
///
/// These never cross the [`crate::ingestion::IngestionPipeline`] boundary: the façade classifies
/// them (see [`crate::ingestion::classify`]) and turns them into a failed
/// [`crate::ingestion::LoadResult`].
#[derive(Debug, Error)]
pub enum IngestError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A fetch completed with a non-success HTTP status.
    #[error("http {status} fetching {url}")]
    Http { status: u16, url: String },

    /// Transport-level HTTP failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// CSV decoding error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Parquet decoding error.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// JSON parse error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The input is structurally invalid for its format.
    #[error("malformed input: {message}")]
    MalformedInput { message: String },

    /// No decoder is registered for the detected format.
    #[error("unsupported format {format} for '{name}'")]
    UnsupportedFormat { format: String, name: String },

    /// The columnar decoder runtime is degraded.
    #[error("decoder runtime unavailable: {reason}")]
    RuntimeUnavailable { reason: String },

    /// The decoder module was fetched but could not be instantiated or verified.
    #[error("decoder module instantiation failed: {message}")]
    ModuleInstantiation { message: String },

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Anything else.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl IngestError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: message.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<figment::Error> for IngestError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl From<tokio::task::JoinError> for IngestError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(format!("background task failed: {err}"))
    }
}
