//! GeoJSON decoding.
//!
//! Accepted roots:
//! - a `FeatureCollection` whose `features` is an array of `Feature` objects
//! - a single `Feature`, wrapped into a one-feature collection
//!
//! There is no partial mode: any structural violation fails the decode.

use serde_json::Value as Json;

use crate::error::{IngestError, IngestResult};
use crate::types::RawGeometry;

/// Parse and validate GeoJSON text.
pub fn decode_geojson(input: &[u8]) -> IngestResult<RawGeometry> {
    let input = input.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(input);
    let root: Json = serde_json::from_slice(input)?;
    decode_geojson_value(root)
}

/// Validate an already-parsed GeoJSON tree.
pub fn decode_geojson_value(root: Json) -> IngestResult<RawGeometry> {
    let root_type = root.get("type").and_then(Json::as_str).unwrap_or_default().to_owned();
    match root_type.as_str() {
        "FeatureCollection" => {
            let Json::Object(mut obj) = root else {
                return Err(IngestError::malformed("geojson root is not an object"));
            };
            let features = match obj.remove("features") {
                Some(Json::Array(items)) => items,
                Some(_) => {
                    return Err(IngestError::malformed(
                        "FeatureCollection.features is not an array",
                    ));
                }
                None => {
                    return Err(IngestError::malformed("FeatureCollection is missing 'features'"));
                }
            };
            for (idx, feature) in features.iter().enumerate() {
                validate_feature(feature).map_err(|message| {
                    IngestError::malformed(format!("feature {idx}: {message}"))
                })?;
            }
            Ok(RawGeometry { features })
        }
        "Feature" => {
            validate_feature(&root).map_err(IngestError::malformed)?;
            Ok(RawGeometry { features: vec![root] })
        }
        "" => Err(IngestError::malformed("invalid GeoJSON: root has no 'type'")),
        other => Err(IngestError::malformed(format!(
            "invalid GeoJSON: root type '{other}' is not FeatureCollection or Feature"
        ))),
    }
}

fn validate_feature(feature: &Json) -> Result<(), String> {
    let obj = feature.as_object().ok_or_else(|| "not a json object".to_string())?;
    if obj.get("type").and_then(Json::as_str) != Some("Feature") {
        return Err("type is not 'Feature'".to_string());
    }
    match obj.get("geometry") {
        None | Some(Json::Null) => Ok(()),
        Some(Json::Object(geom)) if geom.get("type").and_then(Json::as_str).is_some() => Ok(()),
        Some(_) => Err("geometry must be null or an object with a 'type'".to_string()),
    }
}
