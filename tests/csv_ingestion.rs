use atlas_ingest::ingestion::csv::{decode_csv, decode_csv_from_reader};
use atlas_ingest::types::{ColumnType, Value};
use atlas_ingest::IngestError;

#[test]
fn decode_csv_from_fixture_happy_path() {
    let input = std::fs::read("tests/fixtures/features.csv").unwrap();
    let table = decode_csv(&input, b',').unwrap();

    let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "lat", "lng", "value"]);
    assert_eq!(table.rows.len(), 5);
    assert_eq!(table.skipped_rows, 0);

    assert_eq!(table.columns[0].inferred_type, ColumnType::Integer);
    assert_eq!(table.columns[1].inferred_type, ColumnType::Real);
    assert_eq!(table.columns[2].inferred_type, ColumnType::Real);
    // One non-numeric cell turns the whole column into strings.
    assert_eq!(table.columns[3].inferred_type, ColumnType::String);

    assert_eq!(
        table.rows[0],
        vec![
            Value::Integer(1),
            Value::Real(37.7749),
            Value::Real(-122.4194),
            Value::String("10".to_string()),
        ]
    );
    assert_eq!(table.rows[2][3], Value::String("n/a".to_string()));
}

#[test]
fn ragged_rows_are_skipped_and_counted() {
    let input = std::fs::read("tests/fixtures/ragged.csv").unwrap();
    let table = decode_csv(&input, b',').unwrap();

    assert_eq!(table.columns.len(), 3);
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.skipped_rows, 2);
    assert_eq!(table.rows[1][1], Value::String("Ken".to_string()));
    assert_eq!(table.columns[2].inferred_type, ColumnType::Real);
    assert!(!table.partial);
}

#[test]
fn custom_delimiter() {
    let table = decode_csv(b"lat;lng\n1.5;2.5\n", b';').unwrap();
    assert_eq!(table.columns.len(), 2);
    assert_eq!(table.rows[0], vec![Value::Real(1.5), Value::Real(2.5)]);
}

#[test]
fn decode_from_reader_trims_header_names() {
    let input = " id , name \n1,Ada\n";
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input.as_bytes());

    let table = decode_csv_from_reader(&mut rdr).unwrap();
    assert_eq!(table.columns[0].name, "id");
    assert_eq!(table.columns[1].name, "name");
    assert_eq!(table.rows[0][0], Value::Integer(1));
}

#[test]
fn empty_header_is_malformed() {
    let err = decode_csv(b"", b',').unwrap_err();
    assert!(matches!(err, IngestError::MalformedInput { .. }));

    let err = decode_csv(b",,\n1,2,3\n", b',').unwrap_err();
    assert!(err.to_string().contains("header"));
}

#[test]
fn empty_cells_are_null() {
    let table = decode_csv(b"a,b\n1,\n,x\n", b',').unwrap();
    assert_eq!(table.rows[0][1], Value::Null);
    assert_eq!(table.rows[1][0], Value::Null);
    assert_eq!(table.columns[0].inferred_type, ColumnType::Integer);
}
