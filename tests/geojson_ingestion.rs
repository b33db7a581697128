use atlas_ingest::ingestion::geojson::{decode_geojson, decode_geojson_value};
use atlas_ingest::IngestError;
use serde_json::json;

#[test]
fn decode_feature_collection_fixture() {
    let input = std::fs::read("tests/fixtures/coverage.geojson").unwrap();
    let geometry = decode_geojson(&input).unwrap();

    assert_eq!(geometry.features.len(), 3);
    assert_eq!(geometry.features[0]["geometry"]["type"], "Polygon");
    assert_eq!(geometry.features[2]["properties"]["cell"], "B1");

    let collection = geometry.feature_collection();
    assert_eq!(collection["type"], "FeatureCollection");
    assert_eq!(collection["features"].as_array().unwrap().len(), 3);
}

#[test]
fn bare_feature_is_wrapped() {
    let feature = json!({
        "type": "Feature",
        "properties": {},
        "geometry": { "type": "Point", "coordinates": [1.0, 2.0] }
    });
    let geometry = decode_geojson_value(feature.clone()).unwrap();
    assert_eq!(geometry.features, vec![feature]);
}

#[test]
fn null_geometry_is_allowed() {
    let body = br#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":null}]}"#;
    let geometry = decode_geojson(body)
        .unwrap();
    assert_eq!(geometry.features.len(), 1);
}

#[test]
fn byte_order_mark_is_ignored() {
    let mut input = b"\xEF\xBB\xBF".to_vec();
    input.extend_from_slice(br#"{"type":"FeatureCollection","features":[]}"#);
    assert!(decode_geojson(&input).unwrap().features.is_empty());
}

#[test]
fn wrong_root_type_is_malformed() {
    let input = std::fs::read("tests/fixtures/not_geojson.json").unwrap();
    let err = decode_geojson(&input).unwrap_err();
    assert!(matches!(err, IngestError::MalformedInput { .. }));
    assert!(err.to_string().contains("invalid GeoJSON"));
}

#[test]
fn structural_violations_are_malformed() {
    let cases: [&[u8]; 4] = [
        br#"{"type":"FeatureCollection"}"#,
        br#"{"type":"FeatureCollection","features":{}}"#,
        br#"{"type":"FeatureCollection","features":[{"type":"Point"}]}"#,
        br#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":[1,2]}]}"#,
    ];
    for input in cases {
        let err = decode_geojson(input).unwrap_err();
        assert!(matches!(err, IngestError::MalformedInput { .. }), "{err}");
    }
}

#[test]
fn invalid_json_is_a_json_error() {
    let err = decode_geojson(b"{ not json").unwrap_err();
    assert!(matches!(err, IngestError::Json(_)));
}
