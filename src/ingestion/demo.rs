//! Bundled demo datasets and the built-in sample.

use std::path::Path;

use crate::error::{IngestError, IngestResult};
use crate::runtime::is_http_url;
use crate::types::{ColumnType, RawColumn, RawOutput, RawTable, Value};

use super::classify::classify;
use super::detect::Format;
use super::normalize::{Normalized, normalize};
use super::pipeline::{IngestionPipeline, InputDescriptor, LoadResult};

/// A demo dataset shipped next to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoDataset {
    /// Lookup key.
    pub key: &'static str,
    /// Display name, used as the dataset label.
    pub name: &'static str,
    pub description: &'static str,
    /// Path relative to the configured demo root.
    pub path: &'static str,
    pub format: Format,
}

/// The demo table.
pub const DEMO_DATASETS: &[DemoDataset] = &[
    DemoDataset {
        key: "coverage",
        name: "Coverage Analysis",
        description: "Sample coverage data in GeoJSON format",
        path: "coverage.geojson",
        format: Format::GeoJson,
    },
    DemoDataset {
        key: "coverageTable",
        name: "Coverage Table",
        description: "Tabular coverage data in Parquet format",
        path: "coverage_table.parquet",
        format: Format::Parquet,
    },
    DemoDataset {
        key: "entitiesAnalysis",
        name: "Entities Analysis",
        description: "Geospatial entities analysis in GeoParquet format",
        path: "entities_analysis.geoparquet",
        format: Format::GeoParquet,
    },
    DemoDataset {
        key: "features",
        name: "Features Dataset",
        description: "Feature data in Parquet format",
        path: "features.parquet",
        format: Format::Parquet,
    },
];

/// Look a demo dataset up by key.
pub fn find_demo(key: &str) -> Option<&'static DemoDataset> {
    DEMO_DATASETS.iter().find(|d| d.key == key)
}

impl IngestionPipeline {
    /// Load a [`DEMO_DATASETS`] entry from the configured demo root.
    ///
    /// An unknown key is reported as an [`ErrorKind::Internal`](super::ErrorKind::Internal)
    /// failure.
    pub async fn load_demo(&self, key: &str) -> LoadResult {
        let Some(demo) = find_demo(key) else {
            let err = IngestError::internal(format!("demo dataset '{key}' not found"));
            tracing::warn!(key, "unknown demo dataset");
            return LoadResult::failure(classify(&err), err.to_string());
        };

        let input = if is_http_url(&self.demo_root) {
            let root = self.demo_root.trim_end_matches('/');
            InputDescriptor::from_url(format!("{root}/{}", demo.path))
        } else {
            InputDescriptor::from_path(Path::new(&self.demo_root).join(demo.path))
        };
        self.load(input.with_label(demo.name)).await
    }
}

const SAMPLE_LOCATIONS: [(i64, &str, f64, f64, i64, &str); 8] = [
    (1, "San Francisco", 37.7749, -122.4194, 100, "Tech Hub"),
    (2, "New York City", 40.7128, -74.0060, 200, "Financial Center"),
    (3, "Los Angeles", 34.0522, -118.2437, 150, "Entertainment"),
    (4, "Chicago", 41.8781, -87.6298, 180, "Industrial"),
    (5, "Boston", 42.3601, -71.0589, 120, "Education"),
    (6, "Seattle", 47.6062, -122.3321, 140, "Tech Hub"),
    (7, "Austin", 30.2672, -97.7431, 90, "Tech Hub"),
    (8, "Denver", 39.7392, -104.9903, 110, "Energy"),
];

/// Eight US cities as a point-layer dataset labelled "Sample Locations".
pub fn sample_locations() -> IngestResult<Normalized> {
    let columns = vec![
        RawColumn::new("id", ColumnType::Integer),
        RawColumn::new("name", ColumnType::String),
        RawColumn::new("latitude", ColumnType::Real),
        RawColumn::new("longitude", ColumnType::Real),
        RawColumn::new("value", ColumnType::Integer),
        RawColumn::new("category", ColumnType::String),
    ];
    let rows = SAMPLE_LOCATIONS
        .iter()
        .map(|&(id, name, lat, lng, value, category)| {
            vec![
                Value::Integer(id),
                Value::String(name.to_string()),
                Value::Real(lat),
                Value::Real(lng),
                Value::Integer(value),
                Value::String(category.to_string()),
            ]
        })
        .collect();
    let raw = RawOutput::Table(RawTable {
        columns,
        rows,
        partial: false,
        skipped_rows: 0,
    });

    normalize(raw, Format::Unknown, "Sample Locations")
}
