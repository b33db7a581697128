//! Format detection.
//!
//! [`detect`] is pure and total: it looks at the input name, then the declared MIME type, then
//! the leading/trailing bytes, and returns [`Format::Unknown`] when nothing matches.

use std::fmt;
use std::path::Path;

/// Magic bytes at the start and end of every Parquet file.
pub const PARQUET_MAGIC: &[u8; 4] = b"PAR1";

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Apache Parquet.
    Parquet,
    /// Parquet with GeoParquet `geo` metadata.
    GeoParquet,
    /// GeoJSON `FeatureCollection` or `Feature`.
    GeoJson,
    /// Comma-separated values with a header row.
    Csv,
    /// Nothing matched.
    Unknown,
}

impl Format {
    /// Parse a format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "parquet" | "pq" => Some(Self::Parquet),
            "geoparquet" => Some(Self::GeoParquet),
            "csv" => Some(Self::Csv),
            "geojson" | "json" => Some(Self::GeoJson),
            _ => None,
        }
    }

    /// Parse a format from a declared MIME type, ignoring parameters such as `charset`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "application/geo+json" | "application/json" => Some(Self::GeoJson),
            "text/csv" => Some(Self::Csv),
            "application/vnd.apache.parquet" | "application/x-parquet" => Some(Self::Parquet),
            _ => None,
        }
    }

    /// Lowercase name, as used in logs and demo tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parquet => "parquet",
            Self::GeoParquet => "geoparquet",
            Self::GeoJson => "geojson",
            Self::Csv => "csv",
            Self::Unknown => "unknown",
        }
    }

    /// True for the columnar binary formats.
    pub fn is_columnar(&self) -> bool {
        matches!(self, Self::Parquet | Self::GeoParquet)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify an input by name, declared MIME type and content.
///
/// `sniff_bytes` bounds how far into `content` the GeoJSON structural check looks.
pub fn detect(
    name: &str,
    declared_mime: Option<&str>,
    content: &[u8],
    sniff_bytes: usize,
) -> Format {
    if let Some(fmt) = extension(name).and_then(Format::from_extension) {
        return fmt;
    }

    if let Some(fmt) = declared_mime.and_then(Format::from_mime) {
        return fmt;
    }

    sniff(content, sniff_bytes)
}

/// The name's extension. A bare dot-name such as `.csv` counts as its own extension.
fn extension(name: &str) -> Option<&str> {
    let path = Path::new(name);
    path.extension().and_then(|ext| ext.to_str()).or_else(|| {
        path.file_name()
            .and_then(|file| file.to_str())
            .and_then(|file| file.strip_prefix('.'))
    })
}

/// Content-only detection.
pub fn sniff(content: &[u8], sniff_bytes: usize) -> Format {
    if has_parquet_magic(content) {
        return Format::Parquet;
    }
    if looks_like_geojson(content, sniff_bytes) {
        return Format::GeoJson;
    }
    Format::Unknown
}

/// `PAR1` at both ends, with room for at least a footer length in between.
pub fn has_parquet_magic(content: &[u8]) -> bool {
    content.len() >= 12 && content.starts_with(PARQUET_MAGIC) && content.ends_with(PARQUET_MAGIC)
}

fn looks_like_geojson(content: &[u8], sniff_bytes: usize) -> bool {
    let window = content.get(..sniff_bytes.min(content.len())).unwrap_or_default();
    let window = window.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(window);
    let Some(start) = window.iter().position(|b| !b.is_ascii_whitespace()) else {
        return false;
    };
    if window[start] != b'{' {
        return false;
    }
    window.windows(6).any(|w| w == b"\"type\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parquet_like() -> Vec<u8> {
        let mut v = PARQUET_MAGIC.to_vec();
        v.extend_from_slice(&[0u8; 16]);
        v.extend_from_slice(PARQUET_MAGIC);
        v
    }

    #[test]
    fn extension_table() {
        for (name, expected) in [
            ("a.parquet", Format::Parquet),
            ("a.PQ", Format::Parquet),
            ("entities.geoparquet", Format::GeoParquet),
            ("features.csv", Format::Csv),
            ("coverage.geojson", Format::GeoJson),
            ("coverage.json", Format::GeoJson),
        ] {
            assert_eq!(detect(name, None, b"", 4096), expected, "{name}");
        }
    }

    #[test]
    fn extension_wins_over_mime_and_content() {
        let fmt = detect("x.csv", Some("application/geo+json"), &parquet_like(), 4096);
        assert_eq!(fmt, Format::Csv);
    }

    #[test]
    fn bare_dot_name_is_its_own_extension() {
        assert_eq!(detect(".csv", None, b"a,b\n1,2\n", 4096), Format::Csv);
        assert_eq!(detect("uploads/.geojson", None, b"", 4096), Format::GeoJson);
        assert_eq!(detect(".bashrc", None, b"export X=1", 4096), Format::Unknown);
    }

    #[test]
    fn mime_used_when_extension_missing() {
        assert_eq!(detect("upload", Some("text/csv; charset=utf-8"), b"", 4096), Format::Csv);
        assert_eq!(detect("upload.bin", Some("application/x-parquet"), b"", 4096), Format::Parquet);
    }

    #[test]
    fn sniffs_parquet_magic_at_both_ends() {
        assert_eq!(detect("blob", None, &parquet_like(), 4096), Format::Parquet);

        let mut only_head = parquet_like();
        only_head.truncate(only_head.len() - 1);
        assert_eq!(detect("blob", None, &only_head, 4096), Format::Unknown);
    }

    #[test]
    fn sniffs_geojson_structure() {
        let body = b"\xEF\xBB\xBF  \n{\"type\": \"FeatureCollection\", \"features\": []}";
        assert_eq!(detect("download", None, body, 4096), Format::GeoJson);
        assert_eq!(detect("download", None, b"[1, 2, 3]", 4096), Format::Unknown);
    }

    #[test]
    fn sniff_window_is_bounded() {
        let body = b"{\"name\": \"x\", \"type\": \"Feature\"}";
        assert_eq!(sniff(body, 8), Format::Unknown);
        assert_eq!(sniff(body, 4096), Format::GeoJson);
    }

    #[test]
    fn unrecognized_input_is_unknown_and_idempotent() {
        let first = detect("notes.txt", None, b"hello world", 4096);
        let second = detect("notes.txt", None, b"hello world", 4096);
        assert_eq!(first, Format::Unknown);
        assert_eq!(first, second);
        assert_eq!(detect("", None, b"", 0), Format::Unknown);
    }
}
