//! Format → decoder lookup table.

use std::collections::HashMap;

use bytes::Bytes;

use crate::config::IngestConfig;
use crate::error::{IngestError, IngestResult};
use crate::runtime::WasmRuntimeManager;
use crate::types::RawOutput;

use super::csv::decode_csv;
use super::detect::Format;
use super::geojson::decode_geojson;
use super::parquet::ParquetDecoder;

/// CSV decoder settings.
#[derive(Debug, Clone, Copy)]
pub struct CsvDecoder {
    /// Field delimiter.
    pub delimiter: u8,
}

impl Default for CsvDecoder {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// The closed set of decoders.
#[derive(Debug, Clone, Copy)]
pub enum Decoder {
    /// Plain Parquet.
    Parquet(ParquetDecoder),
    /// GeoParquet (Parquet plus `geo` metadata).
    GeoParquet(ParquetDecoder),
    /// CSV with header row.
    Csv(CsvDecoder),
    /// GeoJSON.
    GeoJson,
}

impl Decoder {
    /// Whether decoding goes through the columnar decoder runtime.
    pub fn requires_runtime(&self) -> bool {
        matches!(self, Self::Parquet(_) | Self::GeoParquet(_))
    }

    /// Decode a complete input.
    pub async fn decode(
        &self,
        data: Bytes,
        runtime: &WasmRuntimeManager,
    ) -> IngestResult<RawOutput> {
        match *self {
            Self::Parquet(decoder) | Self::GeoParquet(decoder) => {
                decoder.decode(data, runtime).await.map(RawOutput::Table)
            }
            Self::Csv(csv) => {
                let table =
                    tokio::task::spawn_blocking(move || decode_csv(&data, csv.delimiter)).await??;
                Ok(RawOutput::Table(table))
            }
            Self::GeoJson => {
                let geometry = tokio::task::spawn_blocking(move || decode_geojson(&data)).await??;
                Ok(RawOutput::Geometry(geometry))
            }
        }
    }
}

/// Maps each [`Format`] to its [`Decoder`].
#[derive(Debug, Clone, Default)]
pub struct DecoderRegistry {
    decoders: HashMap<Format, Decoder>,
}

impl DecoderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every supported format registered according to `config`.
    pub fn with_defaults(config: &IngestConfig) -> Self {
        let columnar = ParquetDecoder::new(config.runtime.fallback);
        let mut registry = Self::new();
        registry.register(Format::Parquet, Decoder::Parquet(columnar));
        registry.register(Format::GeoParquet, Decoder::GeoParquet(columnar));
        registry.register(
            Format::Csv,
            Decoder::Csv(CsvDecoder {
                delimiter: config.csv_delimiter(),
            }),
        );
        registry.register(Format::GeoJson, Decoder::GeoJson);
        registry
    }

    /// Register (or replace) the decoder for `format`.
    pub fn register(&mut self, format: Format, decoder: Decoder) {
        self.decoders.insert(format, decoder);
    }

    /// Remove the decoder for `format`, returning it.
    pub fn unregister(&mut self, format: Format) -> Option<Decoder> {
        self.decoders.remove(&format)
    }

    /// Look up the decoder for `format`.
    pub fn get(&self, format: Format) -> Option<&Decoder> {
        self.decoders.get(&format)
    }

    /// Look up the decoder for `format`, failing with [`IngestError::UnsupportedFormat`].
    pub fn resolve(&self, format: Format, name: &str) -> IngestResult<&Decoder> {
        self.get(format).ok_or_else(|| IngestError::UnsupportedFormat {
            format: format.to_string(),
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_known_formats_only() {
        let registry = DecoderRegistry::with_defaults(&IngestConfig::default());
        for fmt in [Format::Parquet, Format::GeoParquet, Format::Csv, Format::GeoJson] {
            assert!(registry.get(fmt).is_some(), "{fmt}");
        }
        assert!(registry.get(Format::Unknown).is_none());
        let err = registry.resolve(Format::Unknown, "notes.txt").unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedFormat { .. }));
    }

    #[test]
    fn only_columnar_decoders_need_the_runtime() {
        let registry = DecoderRegistry::with_defaults(&IngestConfig::default());
        assert!(registry.get(Format::Parquet).unwrap().requires_runtime());
        assert!(registry.get(Format::GeoParquet).unwrap().requires_runtime());
        assert!(!registry.get(Format::Csv).unwrap().requires_runtime());
        assert!(!registry.get(Format::GeoJson).unwrap().requires_runtime());
    }

    #[test]
    fn unregister_removes_format() {
        let mut registry = DecoderRegistry::with_defaults(&IngestConfig::default());
        assert!(registry.unregister(Format::Csv).is_some());
        assert!(registry.get(Format::Csv).is_none());
    }
}
