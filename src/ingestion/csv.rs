//! CSV decoding.
//!
//! Column names come from the header row. Each column's type is inferred from its non-empty
//! cells: `integer` if all parse as integers, `real` if all parse as finite numbers, otherwise
//! `string`. Rows whose field count differs from the header (or that are not valid UTF-8) are
//! skipped and counted rather than failing the load.

use crate::error::{IngestError, IngestResult};
use crate::types::{ColumnType, RawColumn, RawTable, Value};

/// Decode CSV text into a [`RawTable`].
pub fn decode_csv(input: &[u8], delimiter: u8) -> IngestResult<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(input);
    decode_csv_from_reader(&mut rdr)
}

/// Decode CSV from an existing reader. The reader should be `flexible` so ragged rows can be
/// skipped instead of aborting the read.
pub fn decode_csv_from_reader<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
) -> IngestResult<RawTable> {
    let headers = rdr.headers()?.clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(IngestError::malformed("csv header row is empty"));
    }
    let width = headers.len();

    let mut records: Vec<csv::StringRecord> = Vec::new();
    let mut skipped_rows = 0usize;
    for (row_idx0, result) in rdr.records().enumerate() {
        // 1-based, and the header is row 1.
        let user_row = row_idx0 + 2;
        match result {
            Ok(record) if record.len() == width => records.push(record),
            Ok(record) => {
                skipped_rows += 1;
                tracing::debug!(
                    row = user_row,
                    fields = record.len(),
                    expected = width,
                    "skipping ragged csv row"
                );
            }
            Err(err)
                if matches!(
                    err.kind(),
                    csv::ErrorKind::Utf8 { .. } | csv::ErrorKind::UnequalLengths { .. }
                ) =>
            {
                skipped_rows += 1;
                tracing::debug!(row = user_row, error = %err, "skipping malformed csv row");
            }
            Err(err) => return Err(err.into()),
        }
    }

    let columns: Vec<RawColumn> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| RawColumn::new(name.trim(), infer_column_type(&records, idx)))
        .collect();

    let rows = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .zip(record.iter())
                .map(|(col, raw)| parse_typed_value(col.inferred_type, raw))
                .collect()
        })
        .collect();

    Ok(RawTable {
        columns,
        rows,
        partial: false,
        skipped_rows,
    })
}

fn infer_column_type(records: &[csv::StringRecord], idx: usize) -> ColumnType {
    let mut saw_value = false;
    let mut all_int = true;
    for raw in records.iter().filter_map(|r| r.get(idx)).map(str::trim) {
        if raw.is_empty() {
            continue;
        }
        saw_value = true;
        if all_int && raw.parse::<i64>().is_ok() {
            continue;
        }
        all_int = false;
        if parse_finite(raw).is_none() {
            return ColumnType::String;
        }
    }

    match (saw_value, all_int) {
        (false, _) => ColumnType::String,
        (true, true) => ColumnType::Integer,
        (true, false) => ColumnType::Real,
    }
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_typed_value(column_type: ColumnType, raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }

    match column_type {
        ColumnType::Integer => trimmed.parse::<i64>().map_or(Value::Null, Value::Integer),
        ColumnType::Real => parse_finite(trimmed).map_or(Value::Null, Value::Real),
        _ => Value::String(trimmed.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_column_with_one_real_becomes_real() {
        let t = decode_csv(b"a,b\n1,x\n2.5,y\n", b',').unwrap();
        assert_eq!(t.columns[0].inferred_type, ColumnType::Real);
        assert_eq!(t.rows[0][0], Value::Real(1.0));
        assert_eq!(t.columns[1].inferred_type, ColumnType::String);
    }

    #[test]
    fn non_finite_numbers_are_strings() {
        let t = decode_csv(b"a\nNaN\ninf\n", b',').unwrap();
        assert_eq!(t.columns[0].inferred_type, ColumnType::String);
    }

    #[test]
    fn all_empty_column_is_string_of_nulls() {
        let t = decode_csv(b"a,b\n1,\n2,\n", b',').unwrap();
        assert_eq!(t.columns[1].inferred_type, ColumnType::String);
        assert_eq!(t.rows[1][1], Value::Null);
    }
}
