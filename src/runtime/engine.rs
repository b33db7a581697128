//! Columnar decoding engines and the instantiator that produces them from a fetched module.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use parquet::basic::{ConvertedType, Type as PhysicalType};
use parquet::column::writer::ColumnWriter;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::FileReader;
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::file::writer::SerializedFileWriter;
use parquet::record::Field;
use parquet::schema::parser::parse_message_type;
use parquet::schema::types::Type as SchemaType;

use crate::error::{IngestError, IngestResult};
use crate::types::{ColumnType, Geometry, RawColumn, RawTable, Value};

/// WebAssembly binary header: `\0asm` followed by version 1 (little endian).
pub const WASM_HEADER: &[u8; 8] = b"\0asm\x01\x00\x00\x00";

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Column names treated as WKB geometry when a file carries no GeoParquet metadata.
const GEOMETRY_BINARY_NAMES: &[&str] = &["geometry", "geom", "wkb"];

/// A batch-oriented columnar decoder provided by an instantiated module.
pub trait ColumnarEngine: Send + Sync {
    /// Engine name, for logs.
    fn name(&self) -> &str;

    /// Decode a complete columnar file. Batches are concatenated in file order.
    fn decode(&self, data: Bytes) -> IngestResult<RawTable>;

    /// Exercise the engine once after instantiation.
    fn smoke_check(&self) -> IngestResult<()>;
}

/// Turns verified module bytes into a [`ColumnarEngine`].
pub trait ModuleInstantiator: Send + Sync {
    fn instantiate(&self, module: &[u8]) -> IngestResult<Arc<dyn ColumnarEngine>>;
}

/// Accepts any well-formed WebAssembly binary and backs it with [`NativeParquetEngine`].
#[derive(Debug, Default)]
pub struct NativeInstantiator;

impl ModuleInstantiator for NativeInstantiator {
    fn instantiate(&self, module: &[u8]) -> IngestResult<Arc<dyn ColumnarEngine>> {
        if module.len() < WASM_HEADER.len() || !module.starts_with(b"\0asm") {
            return Err(IngestError::ModuleInstantiation {
                message: format!("not a WebAssembly module ({} bytes)", module.len()),
            });
        }
        if !module.starts_with(WASM_HEADER) {
            return Err(IngestError::ModuleInstantiation {
                message: "unsupported WebAssembly binary version".to_string(),
            });
        }
        Ok(Arc::new(NativeParquetEngine))
    }
}

/// Parquet/GeoParquet decoding via the `parquet` record API, one row group per batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeParquetEngine;

impl ColumnarEngine for NativeParquetEngine {
    fn name(&self) -> &str {
        "native-parquet"
    }

    fn decode(&self, data: Bytes) -> IngestResult<RawTable> {
        let reader = SerializedFileReader::new(data)?;
        let file_meta = reader.metadata().file_metadata();

        let geo_columns = file_meta
            .key_value_metadata()
            .and_then(|kvs| kvs.iter().find(|kv| kv.key == "geo"))
            .and_then(|kv| kv.value.as_deref())
            .map(geo_metadata_columns)
            .unwrap_or_default();

        let columns: Vec<RawColumn> = file_meta
            .schema_descr()
            .root_schema()
            .get_fields()
            .iter()
            .map(|field| RawColumn::new(field.name(), column_type_of(field, &geo_columns)))
            .collect();

        let capacity = usize::try_from(file_meta.num_rows()).unwrap_or(0);
        let mut rows: Vec<Vec<Value>> = Vec::with_capacity(capacity);
        for rg_idx in 0..reader.num_row_groups() {
            let row_group = reader.get_row_group(rg_idx)?;
            let batch_start = rows.len();
            for row_res in row_group.get_row_iter(None)? {
                let row = row_res?;
                let mut out_row: Vec<Value> = Vec::with_capacity(columns.len());
                for ((_, field), column) in row.get_column_iter().zip(&columns) {
                    out_row.push(convert_parquet_field(field, column.inferred_type));
                }
                out_row.resize(columns.len(), Value::Null);
                rows.push(out_row);
            }
            tracing::trace!(row_group = rg_idx, rows = rows.len() - batch_start, "decoded batch");
        }

        Ok(RawTable {
            columns,
            rows,
            partial: false,
            skipped_rows: 0,
        })
    }

    fn smoke_check(&self) -> IngestResult<()> {
        let table = self.decode(smoke_file()?)?;
        match table.rows.as_slice() {
            [row] if row.first() == Some(&Value::Integer(1)) => Ok(()),
            _ => Err(IngestError::ModuleInstantiation {
                message: format!("smoke check decoded {} rows, expected 1", table.rows.len()),
            }),
        }
    }
}

/// A one-column, one-row Parquet file built in memory.
fn smoke_file() -> IngestResult<Bytes> {
    let schema = Arc::new(parse_message_type("message smoke { REQUIRED INT64 id; }")?);
    let props = Arc::new(WriterProperties::builder().build());
    let mut buf: Vec<u8> = Vec::new();
    {
        let mut writer = SerializedFileWriter::new(&mut buf, schema, props)?;
        let mut rg = writer.next_row_group()?;
        while let Some(mut col) = rg.next_column()? {
            if let ColumnWriter::Int64ColumnWriter(w) = col.untyped() {
                w.write_batch(&[1_i64], None, None)?;
            }
            col.close()?;
        }
        rg.close()?;
        writer.close()?;
    }
    Ok(Bytes::from(buf))
}

/// Geometry column names declared by GeoParquet `geo` metadata.
///
/// Unparsable metadata yields an empty set; name-based detection still applies.
pub fn geo_metadata_columns(raw: &str) -> HashSet<String> {
    let Ok(meta) = serde_json::from_str::<serde_json::Value>(raw) else {
        tracing::debug!("ignoring unparsable geo metadata");
        return HashSet::new();
    };
    let mut out: HashSet<String> = meta
        .get("columns")
        .and_then(serde_json::Value::as_object)
        .map(|cols| cols.keys().cloned().collect())
        .unwrap_or_default();
    if let Some(primary) = meta.get("primary_column").and_then(serde_json::Value::as_str) {
        out.insert(primary.to_string());
    }
    out
}

fn column_type_of(field: &SchemaType, geo_columns: &HashSet<String>) -> ColumnType {
    if geo_columns.contains(field.name()) {
        return ColumnType::Geometry;
    }
    if !field.is_primitive() {
        return ColumnType::String;
    }

    match field.get_basic_info().converted_type() {
        ConvertedType::UTF8
        | ConvertedType::ENUM
        | ConvertedType::JSON
        | ConvertedType::DECIMAL => {
            return ColumnType::String;
        }
        ConvertedType::TIMESTAMP_MILLIS | ConvertedType::TIMESTAMP_MICROS | ConvertedType::DATE => {
            return ColumnType::Timestamp;
        }
        _ => {}
    }

    match field.get_physical_type() {
        PhysicalType::BOOLEAN => ColumnType::Boolean,
        PhysicalType::INT32 | PhysicalType::INT64 => ColumnType::Integer,
        PhysicalType::INT96 => ColumnType::Timestamp,
        PhysicalType::FLOAT | PhysicalType::DOUBLE => ColumnType::Real,
        _ => {
            let lower = field.name().to_ascii_lowercase();
            if GEOMETRY_BINARY_NAMES.contains(&lower.as_str()) {
                ColumnType::Geometry
            } else {
                ColumnType::String
            }
        }
    }
}

fn convert_parquet_field(f: &Field, column_type: ColumnType) -> Value {
    match (f, column_type) {
        (Field::Null, _) => Value::Null,
        (Field::Bytes(b), ColumnType::Geometry) => {
            Value::Geometry(Geometry::Wkb(b.data().to_vec()))
        }
        (Field::Str(s), ColumnType::Geometry) => Value::Geometry(Geometry::Wkt(s.clone())),
        (Field::Bool(b), _) => Value::Boolean(*b),
        (Field::Byte(v), _) => Value::Integer(i64::from(*v)),
        (Field::Short(v), _) => Value::Integer(i64::from(*v)),
        (Field::Int(v), _) => Value::Integer(i64::from(*v)),
        (Field::Long(v), _) => Value::Integer(*v),
        (Field::UByte(v), _) => Value::Integer(i64::from(*v)),
        (Field::UShort(v), _) => Value::Integer(i64::from(*v)),
        (Field::UInt(v), _) => Value::Integer(i64::from(*v)),
        (Field::ULong(v), _) => {
            i64::try_from(*v).map_or_else(|_| Value::String(v.to_string()), Value::Integer)
        }
        (Field::Float(v), _) => Value::Real(f64::from(*v)),
        (Field::Double(v), _) => Value::Real(*v),
        (Field::Str(s), _) => Value::String(s.clone()),
        (Field::Bytes(b), _) => match std::str::from_utf8(b.data()) {
            Ok(s) => Value::String(s.to_owned()),
            Err(_) => Value::String(f.to_string()),
        },
        (Field::Date(days), _) => Value::Timestamp(i64::from(*days) * MILLIS_PER_DAY),
        (Field::TimestampMillis(ms), _) => Value::Timestamp(*ms),
        (Field::TimestampMicros(us), _) => Value::Timestamp(us / 1_000),
        (other, _) => Value::String(other.to_string()),
    }
}
