//! The ingestion façade.
//!
//! Most callers should use [`IngestionPipeline::load`], which takes an [`InputDescriptor`]
//! through:
//!
//! `Acquiring → Detecting → Resolving → AwaitingRuntime? → Decoding → Normalizing → Done`
//!
//! and always settles on a [`LoadResult`] value. Errors never escape: they are classified (see
//! [`super::classify`]), logged at the level the classification picks, reported to the
//! configured [`IngestionObserver`] and returned as a failed result.
//!
//! ```no_run
//! use atlas_ingest::config::IngestConfig;
//! use atlas_ingest::ingestion::{InputDescriptor, IngestionPipeline};
//!
//! # async fn run() -> Result<(), atlas_ingest::IngestError> {
//! let pipeline = IngestionPipeline::from_config(&IngestConfig::load()?);
//! let result = pipeline.load(InputDescriptor::from_path("tests/data/coverage.geojson")).await;
//! if let Some(dataset) = &result.dataset {
//!     println!("rows={} partial={}", dataset.row_count(), dataset.partial);
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::join_all;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::IngestConfig;
use crate::error::IngestResult;
use crate::runtime::{WasmRuntimeManager, fetch_url};
use crate::types::{Dataset, VisualConfig};

use super::classify::{ErrorKind, classify, log_failure};
use super::detect::{Format, detect};
use super::normalize::{Normalized, normalize};
use super::observability::{
    IngestionContext, IngestionFailure, IngestionObserver, IngestionSeverity, IngestionStats,
};
use super::registry::DecoderRegistry;

/// Where an input's bytes come from.
pub enum InputSource {
    /// Bytes already in memory.
    Bytes(Bytes),
    /// A local file.
    Path(PathBuf),
    /// An `http(s)://` URL.
    Url(String),
    /// An async byte stream, read to completion before detection.
    Stream(Box<dyn AsyncRead + Send + Unpin>),
}

impl fmt::Debug for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Self::Path(p) => f.debug_tuple("Path").field(p).finish(),
            Self::Url(u) => f.debug_tuple("Url").field(u).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// One ingestion request. Consumed by [`IngestionPipeline::load`].
#[derive(Debug)]
pub struct InputDescriptor {
    /// Byte source.
    pub source: InputSource,
    /// Input name; its extension drives detection.
    pub name: String,
    /// MIME type declared by whoever supplied the input.
    pub declared_mime: Option<String>,
    /// Dataset label. Defaults to the file stem of `name`.
    pub label: Option<String>,
}

impl InputDescriptor {
    fn new(source: InputSource, name: impl Into<String>) -> Self {
        Self {
            source,
            name: name.into(),
            declared_mime: None,
            label: None,
        }
    }

    /// In-memory bytes named `name`.
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::new(InputSource::Bytes(data.into()), name)
    }

    /// A local file; the name is its file name.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or_else(|| path.display().to_string(), str::to_owned);
        Self::new(InputSource::Path(path.to_path_buf()), name)
    }

    /// A remote file; the name is the last path segment of the URL.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let name = url_file_name(&url).to_string();
        Self::new(InputSource::Url(url), name)
    }

    /// An async reader named `name`.
    pub fn from_stream(
        name: impl Into<String>,
        reader: impl AsyncRead + Send + Unpin + 'static,
    ) -> Self {
        Self::new(InputSource::Stream(Box::new(reader)), name)
    }

    /// Set the declared MIME type.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.declared_mime = Some(mime.into());
        self
    }

    /// Set the dataset label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

fn url_file_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').find(|s| !s.is_empty()).unwrap_or(path)
}

/// Stage of an in-flight load, as it appears in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Acquiring,
    Detecting,
    Resolving,
    AwaitingRuntime,
    Decoding,
    Normalizing,
    Done,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Acquiring => "acquiring",
            Self::Detecting => "detecting",
            Self::Resolving => "resolving",
            Self::AwaitingRuntime => "awaiting_runtime",
            Self::Decoding => "decoding",
            Self::Normalizing => "normalizing",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

/// Terminal status of a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Success,
    Failure,
}

/// Classified failure carried by a [`LoadResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of one load. Exactly one of `dataset` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResult {
    pub status: LoadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<Dataset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<VisualConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<LoadError>,
    /// Input rows the decoder dropped as malformed.
    pub skipped_rows: usize,
}

impl LoadResult {
    pub(crate) fn success(normalized: Normalized) -> Self {
        Self {
            status: LoadStatus::Success,
            dataset: Some(normalized.dataset),
            config: normalized.config,
            error: None,
            skipped_rows: normalized.skipped_rows,
        }
    }

    pub(crate) fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: LoadStatus::Failure,
            dataset: None,
            config: None,
            error: Some(LoadError {
                kind,
                message: message.into(),
            }),
            skipped_rows: 0,
        }
    }

    /// True for [`LoadStatus::Success`].
    pub fn is_success(&self) -> bool {
        self.status == LoadStatus::Success
    }

    /// True for a successful load whose dataset is known to be incomplete.
    pub fn is_partial(&self) -> bool {
        self.dataset.as_ref().is_some_and(|d| d.partial)
    }

    /// The failure kind, if the load failed.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}

/// Orchestrates detection, decoding and normalization.
///
/// Clones share the decoder runtime, so concurrent loads from any clone trigger at most one
/// runtime initialization.
#[derive(Clone)]
pub struct IngestionPipeline {
    registry: DecoderRegistry,
    runtime: WasmRuntimeManager,
    client: reqwest::Client,
    sniff_bytes: usize,
    pub(crate) demo_root: String,
    observer: Option<Arc<dyn IngestionObserver>>,
    alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("registry", &self.registry)
            .field("runtime", &self.runtime)
            .field("sniff_bytes", &self.sniff_bytes)
            .field("demo_root", &self.demo_root)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl IngestionPipeline {
    /// Build a pipeline around an existing runtime manager.
    pub fn new(config: &IngestConfig, runtime: WasmRuntimeManager) -> Self {
        Self {
            registry: DecoderRegistry::with_defaults(config),
            runtime,
            client: reqwest::Client::new(),
            sniff_bytes: config.detect.sniff_bytes,
            demo_root: config.demo.root.clone(),
            observer: None,
            alert_at_or_above: config.observability.alert_at_or_above,
        }
    }

    /// Build a pipeline whose runtime reads the module from `config.runtime.module_path`.
    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(config, WasmRuntimeManager::from_config(config.runtime.clone()))
    }

    /// Report load outcomes to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn IngestionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Replace the decoder table.
    pub fn with_registry(mut self, registry: DecoderRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// The shared decoder runtime.
    pub fn runtime(&self) -> &WasmRuntimeManager {
        &self.runtime
    }

    /// The decoder table.
    pub fn registry(&self) -> &DecoderRegistry {
        &self.registry
    }

    /// Load one input. Never fails; failures are returned as [`LoadStatus::Failure`].
    ///
    /// When an observer is configured this reports:
    ///
    /// - `on_success` on success (partial datasets included)
    /// - `on_failure` on failure, with the kind's severity
    /// - `on_alert` on failure when that severity is >= the configured threshold
    pub async fn load(&self, input: InputDescriptor) -> LoadResult {
        let InputDescriptor {
            source,
            name,
            declared_mime,
            label,
        } = input;
        let label = label.unwrap_or_else(|| default_label(&name));
        let mut ctx = IngestionContext {
            name,
            format: Format::Unknown,
        };

        match self.run(source, declared_mime.as_deref(), &label, &mut ctx).await {
            Ok(normalized) => {
                if let Some(obs) = self.observer.as_ref() {
                    obs.on_success(
                        &ctx,
                        IngestionStats {
                            rows: normalized.dataset.row_count(),
                            skipped_rows: normalized.skipped_rows,
                            partial: normalized.dataset.partial,
                        },
                    );
                }
                LoadResult::success(normalized)
            }
            Err(err) => {
                let kind = classify(&err);
                log_failure(kind, &ctx.name, &err);
                let message = err.to_string();
                if let Some(obs) = self.observer.as_ref() {
                    let sev = kind.severity();
                    let failure = IngestionFailure {
                        kind,
                        message: &message,
                    };
                    obs.on_failure(&ctx, sev, failure);
                    if sev >= self.alert_at_or_above {
                        obs.on_alert(&ctx, sev, failure);
                    }
                }
                LoadResult::failure(kind, message)
            }
        }
    }

    /// Load several inputs concurrently. Results are returned in input order.
    pub async fn load_all(
        &self,
        inputs: impl IntoIterator<Item = InputDescriptor>,
    ) -> Vec<LoadResult> {
        join_all(inputs.into_iter().map(|input| self.load(input))).await
    }

    async fn run(
        &self,
        source: InputSource,
        declared_mime: Option<&str>,
        label: &str,
        ctx: &mut IngestionContext,
    ) -> IngestResult<Normalized> {
        let name = ctx.name.clone();
        enter(LoadStage::Acquiring, &name);
        let data = self.acquire(source).await?;

        enter(LoadStage::Detecting, &name);
        let format = detect(&name, declared_mime, &data, self.sniff_bytes);
        ctx.format = format;

        enter(LoadStage::Resolving, &name);
        let decoder = *self.registry.resolve(format, &name)?;

        if decoder.requires_runtime() {
            enter(LoadStage::AwaitingRuntime, &name);
            let readiness = self.runtime.ensure_ready().await;
            tracing::debug!(input = %name, ready = readiness.is_ready(), "decoder runtime settled");
        }

        enter(LoadStage::Decoding, &name);
        let raw = decoder.decode(data, &self.runtime).await?;

        enter(LoadStage::Normalizing, &name);
        let normalized = normalize(raw, format, label)?;

        enter(LoadStage::Done, &name);
        Ok(normalized)
    }

    async fn acquire(&self, source: InputSource) -> IngestResult<Bytes> {
        match source {
            InputSource::Bytes(data) => Ok(data),
            InputSource::Path(path) => Ok(Bytes::from(tokio::fs::read(&path).await?)),
            InputSource::Url(url) => fetch_url(&self.client, &url).await,
            InputSource::Stream(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).await?;
                Ok(Bytes::from(buf))
            }
        }
    }
}

fn enter(stage: LoadStage, name: &str) {
    tracing::trace!(%stage, input = name, "load stage");
}

fn default_label(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(name)
        .to_string()
}
