use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{IngestError, IngestResult};

/// Fetches the decoder module asset.
#[async_trait]
pub trait ModuleSource: Send + Sync {
    /// Fetch the asset at `location`, failing on any unsuccessful response.
    async fn fetch(&self, location: &str) -> IngestResult<Bytes>;
}

/// Reads the module from the local filesystem, or from the local server when the configured
/// location is an `http(s)://` URL. No other location is ever tried.
#[derive(Debug, Clone, Default)]
pub struct LocalModuleSource {
    client: reqwest::Client,
}

impl LocalModuleSource {
    /// Create a source sharing an existing HTTP client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ModuleSource for LocalModuleSource {
    async fn fetch(&self, location: &str) -> IngestResult<Bytes> {
        if is_http_url(location) {
            fetch_url(&self.client, location).await
        } else {
            Ok(Bytes::from(tokio::fs::read(location).await?))
        }
    }
}

pub(crate) fn is_http_url(location: &str) -> bool {
    let lower = location.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// GET `url`, mapping non-2xx statuses to [`IngestError::Http`].
pub(crate) async fn fetch_url(client: &reqwest::Client, url: &str) -> IngestResult<Bytes> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(IngestError::Http {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(response.bytes().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_http_locations() {
        assert!(is_http_url("http://localhost:3000/parquet_wasm_bg.wasm"));
        assert!(is_http_url("HTTPS://example.test/x"));
        assert!(!is_http_url("static/wasm/parquet_wasm_bg.wasm"));
        assert!(!is_http_url("/abs/path.wasm"));
    }

    #[tokio::test]
    async fn missing_local_module_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.wasm");
        let err = LocalModuleSource::default()
            .fetch(path.to_str().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn reads_local_module() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.wasm");
        std::fs::write(&path, b"\0asm\x01\0\0\0").unwrap();
        let bytes = LocalModuleSource::default().fetch(path.to_str().unwrap()).await.unwrap();
        assert_eq!(&bytes[..4], b"\0asm");
    }
}
