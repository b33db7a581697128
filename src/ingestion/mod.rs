//! Ingestion entrypoints and implementations.
//!
//! Most callers should use [`IngestionPipeline::load`] (from [`pipeline`]) which:
//!
//! - acquires the input bytes (memory, file, URL or stream)
//! - detects the format by extension, declared MIME type or content
//! - decodes through the [`DecoderRegistry`], bringing up the columnar decoder runtime if needed
//! - normalizes into a [`crate::types::Dataset`] plus an optional [`crate::types::VisualConfig`]
//! - optionally reports success/failure/alerts to an [`IngestionObserver`]
//!
//! Format-specific decoders are also available under:
//! - [`csv`]
//! - [`geojson`]
//! - [`parquet`]

pub mod classify;
pub mod csv;
pub mod demo;
pub mod detect;
pub mod geojson;
pub mod normalize;
pub mod observability;
pub mod parquet;
pub mod pipeline;
pub mod registry;

pub use classify::{ErrorKind, MESSAGE_SIGNATURES, RecoveryPolicy, classify, classify_message};
pub use demo::{DEMO_DATASETS, DemoDataset, find_demo, sample_locations};
pub use detect::{Format, detect};
pub use normalize::{Normalized, normalize};
pub use observability::{
    CompositeObserver, FileObserver, IngestionContext, IngestionFailure, IngestionObserver,
    IngestionSeverity, IngestionStats, TracingObserver,
};
pub use pipeline::{
    IngestionPipeline, InputDescriptor, InputSource, LoadError, LoadResult, LoadStage, LoadStatus,
};
pub use registry::{CsvDecoder, Decoder, DecoderRegistry};
