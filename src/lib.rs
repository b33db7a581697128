//! `atlas-ingest` turns heterogeneous geospatial and tabular files into one canonical in-memory
//! [`types::Dataset`], plus an optional [`types::VisualConfig`] hint for a map renderer.
//!
//! The primary entrypoint is [`ingestion::IngestionPipeline::load`]. It never returns an error:
//! every outcome, including failures, is a [`ingestion::LoadResult`] value.
//!
//! ## What you can ingest
//!
//! **Formats (detected by extension, then declared MIME type, then content):**
//!
//! - **GeoJSON**: `.geojson`, `.json` (a `FeatureCollection` or a single `Feature`)
//! - **CSV**: `.csv` (header row required; ragged rows are skipped and counted)
//! - **Parquet**: `.parquet`, `.pq`
//! - **GeoParquet**: `.geoparquet` (geometry columns read from the `geo` metadata)
//!
//! **Sources:** in-memory bytes, local paths, `http(s)://` URLs and `tokio` async readers.
//!
//! Parquet and GeoParquet decode through a shared, lazily initialized decoder runtime (see
//! [`runtime::WasmRuntimeManager`]). If it cannot be brought up, columnar loads still succeed
//! with an empty dataset flagged `partial` (unless `runtime.fallback` is off).
//!
//! ## Quick example
//!
//! ```no_run
//! use atlas_ingest::config::IngestConfig;
//! use atlas_ingest::ingestion::{InputDescriptor, IngestionPipeline};
//!
//! # async fn run() -> Result<(), atlas_ingest::IngestError> {
//! let pipeline = IngestionPipeline::from_config(&IngestConfig::load()?);
//! let results = pipeline
//!     .load_all([
//!         InputDescriptor::from_path("tests/data/coverage.geojson"),
//!         InputDescriptor::from_url("http://localhost:3000/data/entities.geoparquet"),
//!     ])
//!     .await;
//! for r in &results {
//!     println!("{:?} partial={}", r.status, r.is_partial());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: the pipeline façade, format detection, decoders, normalization, failure
//!   classification and observers
//! - [`runtime`]: lifecycle of the columnar decoder runtime
//! - [`types`]: raw decoder output and the canonical dataset types
//! - [`config`]: file + environment configuration
//! - [`error`]: error types used across ingestion

pub mod config;
pub mod error;
pub mod ingestion;
pub mod runtime;
pub mod types;

pub use error::{IngestError, IngestResult};
