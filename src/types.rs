//! Core data model: decoder output ([`RawTable`], [`RawGeometry`]) and the canonical
//! [`Dataset`] every format converges to, plus the optional [`VisualConfig`] hint handed to the
//! rendering engine alongside it.

use serde::Serialize;

/// Logical type of a canonical [`Dataset`] column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// 64-bit signed integer.
    Integer,
    /// 64-bit floating point number.
    Real,
    /// UTF-8 string.
    String,
    /// Boolean.
    Boolean,
    /// Milliseconds since the Unix epoch.
    Timestamp,
    /// A geometry (GeoJSON feature, WKB or WKT).
    Geometry,
}

/// A single named, typed column in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    /// Column name, unique within a schema.
    pub name: String,
    /// Column type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl Column {
    /// Create a new column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Ordered list of columns describing the shape of every row in a [`Dataset`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Schema {
    /// Ordered list of columns.
    pub columns: Vec<Column>,
}

impl Schema {
    /// Create a new schema from columns.
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True if the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Returns the index of a column by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Geometry payload carried by a [`Value::Geometry`] cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "encoding", content = "data", rename_all = "lowercase")]
pub enum Geometry {
    /// A GeoJSON `Feature` object (geometry plus properties).
    GeoJson(serde_json::Value),
    /// Well-known binary, as stored by GeoParquet.
    Wkb(Vec<u8>),
    /// Well-known text.
    Wkt(String),
}

/// A single typed value in a [`Dataset`] row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Real(f64),
    /// Boolean.
    Boolean(bool),
    /// UTF-8 string.
    String(String),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    /// Geometry payload.
    Geometry(Geometry),
}

impl Value {
    /// True for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// A column as reported by a decoder, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawColumn {
    /// Column name as found in the input (may repeat).
    pub name: String,
    /// Type inferred by the decoder.
    pub inferred_type: ColumnType,
}

impl RawColumn {
    /// Create a new raw column.
    pub fn new(name: impl Into<String>, inferred_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            inferred_type,
        }
    }
}

/// Tabular decoder output. Consumed by the normalizer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// Columns in input order.
    pub columns: Vec<RawColumn>,
    /// Row-major values, one entry per column.
    pub rows: Vec<Vec<Value>>,
    /// Set when the table is known to be incomplete because a dependency was unavailable.
    pub partial: bool,
    /// Number of input rows dropped because they were malformed.
    pub skipped_rows: usize,
}

impl RawTable {
    /// An explicitly empty, schema-less table flagged as partial.
    pub fn degraded() -> Self {
        Self {
            partial: true,
            ..Self::default()
        }
    }
}

/// GeoJSON decoder output: a structurally valid `FeatureCollection`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawGeometry {
    /// The collection's features, each a JSON object with `"type": "Feature"`.
    pub features: Vec<serde_json::Value>,
}

impl RawGeometry {
    /// Re-assemble the `FeatureCollection` tree.
    pub fn feature_collection(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "FeatureCollection",
            "features": self.features,
        })
    }
}

/// Output of any decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutput {
    /// Tabular output (Parquet, GeoParquet, CSV).
    Table(RawTable),
    /// Geometry output (GeoJSON).
    Geometry(RawGeometry),
}

/// Canonical in-memory dataset.
///
/// Every row has exactly `schema.len()` values and column names are unique. The ingestion core
/// never mutates a dataset after handing it out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    /// Identifier, unique per load.
    pub id: String,
    /// Human-readable label (usually the input's file stem).
    pub label: String,
    /// Column schema.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
    /// Name of the geometry column, when one was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry_column: Option<String>,
    /// Set when the payload is known to be incomplete (degraded decoder runtime).
    pub partial: bool,
}

impl Dataset {
    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Column names, total row count and the first `sample_size` rows.
    pub fn preview(&self, sample_size: usize) -> DatasetPreview {
        DatasetPreview {
            columns: self.schema.column_names().map(str::to_owned).collect(),
            row_count: self.rows.len(),
            sample: self.rows.iter().take(sample_size).cloned().collect(),
        }
    }
}

/// Lightweight summary of a [`Dataset`] for UI previews.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetPreview {
    /// Column names in schema order.
    pub columns: Vec<String>,
    /// Total number of rows in the dataset.
    pub row_count: usize,
    /// Leading rows.
    pub sample: Vec<Vec<Value>>,
}

/// Kind of map layer suggested for a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    /// Point layer keyed to latitude/longitude columns.
    Point,
    /// Geometry layer keyed to a geometry column.
    GeoJson,
}

impl LayerType {
    /// Name used by the rendering engine.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::GeoJson => "geojson",
        }
    }
}

/// Columns a layer is keyed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LayerColumns {
    /// Latitude/longitude (and optional altitude) columns.
    LatLng {
        /// Latitude column name.
        lat: String,
        /// Longitude column name.
        lng: String,
        /// Altitude column name.
        #[serde(skip_serializing_if = "Option::is_none")]
        altitude: Option<String>,
    },
    /// A single geometry column.
    Geometry {
        /// Geometry column name.
        geometry: String,
    },
}

/// A named color ramp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorRamp {
    /// Ramp name.
    pub name: String,
    /// Ramp type, e.g. `sequential`.
    #[serde(rename = "type")]
    pub ramp_type: String,
    /// Hex colors from low to high.
    pub colors: Vec<String>,
}

/// Styling hint for a layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorHint {
    /// Base RGB color.
    pub color: [u8; 3],
    /// Fill opacity.
    pub opacity: f32,
    /// Stroke opacity.
    pub stroke_opacity: f32,
    /// Stroke thickness.
    pub thickness: f32,
    /// Stroke RGB color.
    pub stroke_color: [u8; 3],
    /// Point radius.
    pub radius: f32,
    /// Fill polygons.
    pub filled: bool,
    /// Draw outlines.
    pub stroked: bool,
    /// Color ramp, when the layer is colored by value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_range: Option<ColorRamp>,
}

/// Best-effort visualization hint derived from a dataset. Absence is valid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualConfig {
    /// Suggested layer type.
    pub layer_type: LayerType,
    /// Columns the layer is keyed to.
    pub columns: LayerColumns,
    /// Styling hint.
    pub color_hint: ColorHint,
}
