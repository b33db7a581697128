//! Decoder output → canonical [`Dataset`] plus a best-effort [`VisualConfig`].

use std::collections::HashSet;

use uuid::Uuid;

use crate::error::{IngestError, IngestResult};
use crate::types::{
    ColorHint, ColorRamp, Column, ColumnType, Dataset, Geometry, LayerColumns, LayerType,
    RawGeometry, RawOutput, RawTable, Schema, Value, VisualConfig,
};

use super::detect::Format;

/// Latitude column candidates, in priority order.
pub const LAT_NAMES: &[&str] = &["lat", "latitude", "y"];
/// Longitude column candidates, in priority order.
pub const LNG_NAMES: &[&str] = &["lng", "lon", "longitude", "x"];
/// Altitude column candidates, in priority order.
pub const ALTITUDE_NAMES: &[&str] = &["altitude", "elevation", "z"];
/// Geometry column candidates, in priority order.
pub const GEOMETRY_NAMES: &[&str] = &["geometry", "geom", "wkt"];

/// Name of the single column produced for GeoJSON input.
pub const GEOMETRY_COLUMN: &str = "geometry";

const BASE_COLOR: [u8; 3] = [23, 184, 190];
const GLOBAL_WARMING: [&str; 6] = [
    "#5A1846", "#900C3F", "#C70039", "#E3611C", "#F1920E", "#FFC300",
];

/// Normalizer output.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// The canonical dataset.
    pub dataset: Dataset,
    /// Visualization hint, when column inference found something to key a layer to.
    pub config: Option<VisualConfig>,
    /// Input rows the decoder dropped as malformed.
    pub skipped_rows: usize,
}

/// Convert decoder output into a [`Dataset`] labelled `label`.
///
/// Only fails if `raw` breaks the raw-table contract (a row width that differs from the column
/// count); inconclusive column inference just yields no config.
pub fn normalize(raw: RawOutput, format: Format, label: &str) -> IngestResult<Normalized> {
    let normalized = match raw {
        RawOutput::Table(table) => normalize_table(table, label)?,
        RawOutput::Geometry(geometry) => normalize_geometry(geometry, label),
    };
    tracing::debug!(
        %format,
        label,
        columns = normalized.dataset.schema.len(),
        rows = normalized.dataset.row_count(),
        layer = normalized.config.as_ref().map_or("none", |c| c.layer_type.as_str()),
        "normalized dataset"
    );
    Ok(normalized)
}

fn normalize_table(table: RawTable, label: &str) -> IngestResult<Normalized> {
    let RawTable {
        columns,
        mut rows,
        partial,
        skipped_rows,
    } = table;

    let names = unique_names(columns.iter().map(|c| c.name.as_str()));
    let mut schema = Schema::new(
        names
            .into_iter()
            .zip(&columns)
            .map(|(name, raw)| Column::new(name, raw.inferred_type))
            .collect(),
    );

    if let Some((idx, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != schema.len()) {
        return Err(IngestError::internal(format!(
            "decoder produced row {idx} with {} values for {} columns",
            row.len(),
            schema.len()
        )));
    }

    let geometry_column = resolve_geometry_column(&mut schema, &mut rows);
    let lat_lng = find_column(&schema, LAT_NAMES, is_numeric)
        .zip(find_column(&schema, LNG_NAMES, is_numeric));

    let config = match (lat_lng, &geometry_column) {
        (Some((lat, lng)), _) => Some(VisualConfig {
            layer_type: LayerType::Point,
            columns: LayerColumns::LatLng {
                lat,
                lng,
                altitude: find_column(&schema, ALTITUDE_NAMES, is_numeric),
            },
            color_hint: point_style(),
        }),
        (None, Some(geometry)) => Some(VisualConfig {
            layer_type: LayerType::GeoJson,
            columns: LayerColumns::Geometry {
                geometry: geometry.clone(),
            },
            color_hint: geometry_style(),
        }),
        (None, None) => None,
    };

    Ok(Normalized {
        dataset: Dataset {
            id: dataset_id(label),
            label: label.to_string(),
            schema,
            rows,
            geometry_column,
            partial,
        },
        config,
        skipped_rows,
    })
}

fn normalize_geometry(geometry: RawGeometry, label: &str) -> Normalized {
    let rows = geometry
        .features
        .into_iter()
        .map(|feature| vec![Value::Geometry(Geometry::GeoJson(feature))])
        .collect();

    Normalized {
        dataset: Dataset {
            id: dataset_id(label),
            label: label.to_string(),
            schema: Schema::new(vec![Column::new(GEOMETRY_COLUMN, ColumnType::Geometry)]),
            rows,
            geometry_column: Some(GEOMETRY_COLUMN.to_string()),
            partial: false,
        },
        config: Some(VisualConfig {
            layer_type: LayerType::GeoJson,
            columns: LayerColumns::Geometry {
                geometry: GEOMETRY_COLUMN.to_string(),
            },
            color_hint: geometry_style(),
        }),
        skipped_rows: 0,
    }
}

/// Prefer a column already typed as geometry; otherwise adopt a string column with a geometry
/// name, re-typing its values as WKT.
fn resolve_geometry_column(schema: &mut Schema, rows: &mut [Vec<Value>]) -> Option<String> {
    if let Some(col) = schema.columns.iter().find(|c| c.column_type == ColumnType::Geometry) {
        return Some(col.name.clone());
    }

    let name = find_column(schema, GEOMETRY_NAMES, |t| t == ColumnType::String)?;
    let idx = schema.index_of(&name)?;
    schema.columns[idx].column_type = ColumnType::Geometry;
    for row in rows.iter_mut() {
        if let Some(Value::String(wkt)) = row.get_mut(idx) {
            let wkt = std::mem::take(wkt);
            row[idx] = Value::Geometry(Geometry::Wkt(wkt));
        }
    }
    Some(name)
}

/// First candidate (in priority order) matching a column name case-insensitively.
fn find_column(
    schema: &Schema,
    candidates: &[&str],
    accept: impl Fn(ColumnType) -> bool,
) -> Option<String> {
    candidates.iter().find_map(|candidate| {
        schema
            .columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(candidate) && accept(c.column_type))
            .map(|c| c.name.clone())
    })
}

fn is_numeric(t: ColumnType) -> bool {
    matches!(t, ColumnType::Integer | ColumnType::Real)
}

/// Blank names become `column_<n>`; repeats get a `_<n>` suffix.
fn unique_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for (idx, name) in names.enumerate() {
        let base = if name.trim().is_empty() {
            format!("column_{}", idx + 1)
        } else {
            name.to_string()
        };
        let mut candidate = base.clone();
        let mut n = 2;
        while seen.contains(&candidate) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

fn dataset_id(label: &str) -> String {
    let slug: String = label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase();
    format!("{slug}-{}", Uuid::new_v4().simple())
}

fn point_style() -> ColorHint {
    ColorHint {
        color: BASE_COLOR,
        opacity: 0.8,
        stroke_opacity: 0.8,
        thickness: 2.0,
        stroke_color: BASE_COLOR,
        radius: 10.0,
        filled: true,
        stroked: false,
        color_range: None,
    }
}

fn geometry_style() -> ColorHint {
    ColorHint {
        color: BASE_COLOR,
        opacity: 0.8,
        stroke_opacity: 0.8,
        thickness: 0.5,
        stroke_color: BASE_COLOR,
        radius: 10.0,
        filled: true,
        stroked: true,
        color_range: Some(ColorRamp {
            name: "Global Warming".to_string(),
            ramp_type: "sequential".to_string(),
            colors: GLOBAL_WARMING.iter().map(|c| (*c).to_string()).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawColumn;

    fn table(columns: &[(&str, ColumnType)], rows: Vec<Vec<Value>>) -> RawOutput {
        RawOutput::Table(RawTable {
            columns: columns.iter().map(|(n, t)| RawColumn::new(*n, *t)).collect(),
            rows,
            partial: false,
            skipped_rows: 0,
        })
    }

    #[test]
    fn duplicate_and_blank_names_are_made_unique() {
        let names = unique_names(["a", "a", "", "a_2", "a"].into_iter());
        assert_eq!(names, vec!["a", "a_2", "column_3", "a_2_2", "a_3"]);
    }

    #[test]
    fn lat_lng_priority_and_case() {
        let raw = table(
            &[
                ("Latitude", ColumnType::Real),
                ("LON", ColumnType::Real),
                ("x", ColumnType::Real),
                ("elevation", ColumnType::Integer),
            ],
            vec![],
        );
        let n = normalize(raw, Format::Csv, "pts").unwrap();
        let cfg = n.config.unwrap();
        assert_eq!(cfg.layer_type, LayerType::Point);
        assert_eq!(
            cfg.columns,
            LayerColumns::LatLng {
                lat: "Latitude".into(),
                lng: "LON".into(),
                altitude: Some("elevation".into()),
            }
        );
    }

    #[test]
    fn string_lat_lng_columns_do_not_make_a_point_layer() {
        let raw = table(&[("lat", ColumnType::String), ("lng", ColumnType::Real)], vec![]);
        assert!(normalize(raw, Format::Csv, "x").unwrap().config.is_none());
    }

    #[test]
    fn wkt_column_becomes_geometry() {
        let raw = table(
            &[("name", ColumnType::String), ("WKT", ColumnType::String)],
            vec![vec![Value::String("a".into()), Value::String("POINT (1 2)".into())]],
        );
        let n = normalize(raw, Format::Csv, "shapes").unwrap();
        assert_eq!(n.dataset.geometry_column.as_deref(), Some("WKT"));
        assert_eq!(n.dataset.schema.columns[1].column_type, ColumnType::Geometry);
        assert_eq!(n.dataset.rows[0][1], Value::Geometry(Geometry::Wkt("POINT (1 2)".into())));
        assert_eq!(n.config.unwrap().layer_type, LayerType::GeoJson);
    }

    #[test]
    fn inconclusive_columns_yield_no_config() {
        let raw = table(&[("id", ColumnType::Integer)], vec![vec![Value::Integer(1)]]);
        let n = normalize(raw, Format::Parquet, "plain").unwrap();
        assert!(n.config.is_none());
        assert!(n.dataset.geometry_column.is_none());
    }

    #[test]
    fn ragged_raw_rows_are_rejected() {
        let raw = table(&[("a", ColumnType::Integer)], vec![vec![]]);
        assert!(matches!(normalize(raw, Format::Csv, "bad"), Err(IngestError::Internal { .. })));
    }

    #[test]
    fn ids_are_unique_per_load() {
        let a = dataset_id("Coverage Analysis");
        let b = dataset_id("Coverage Analysis");
        assert!(a.starts_with("coverage_analysis-"));
        assert_ne!(a, b);
    }
}
