//! Parquet/GeoParquet decoding through the columnar decoder runtime.

use bytes::Bytes;

use crate::error::{IngestError, IngestResult};
use crate::runtime::{Readiness, WasmRuntimeManager};
use crate::types::RawTable;

use super::classify::{RecoveryPolicy, classify};

/// Decodes columnar files once the runtime is ready; degrades to an empty partial table when it
/// is not (unless fallback is disabled).
#[derive(Debug, Clone, Copy)]
pub struct ParquetDecoder {
    fallback: bool,
}

impl Default for ParquetDecoder {
    fn default() -> Self {
        Self { fallback: true }
    }
}

impl ParquetDecoder {
    /// Create a decoder. With `fallback == false`, a degraded runtime fails the load.
    pub fn new(fallback: bool) -> Self {
        Self { fallback }
    }

    /// Decode `data`, initializing the runtime on first use.
    pub async fn decode(
        &self,
        data: Bytes,
        runtime: &WasmRuntimeManager,
    ) -> IngestResult<RawTable> {
        match runtime.ensure_ready().await {
            Readiness::Ready(engine) => {
                let decoded = tokio::task::spawn_blocking(move || engine.decode(data)).await?;
                decoded.or_else(|err| self.recover(err))
            }
            Readiness::Degraded(degradation) => self.recover(IngestError::RuntimeUnavailable {
                reason: degradation.to_string(),
            }),
        }
    }

    fn recover(&self, err: IngestError) -> IngestResult<RawTable> {
        let kind = classify(&err);
        if self.fallback && kind.policy() == RecoveryPolicy::Fallback {
            tracing::debug!(error = %err, "columnar decode degraded to empty partial table");
            Ok(RawTable::degraded())
        } else {
            Err(err)
        }
    }
}
