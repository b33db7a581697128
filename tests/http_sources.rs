use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use atlas_ingest::config::{IngestConfig, RuntimeConfig};
use atlas_ingest::ingestion::{ErrorKind, IngestionPipeline, InputDescriptor, LoadStatus};
use atlas_ingest::runtime::{WASM_HEADER, WasmRuntimeManager, WasmState};
use atlas_ingest::types::LayerType;

/// Answers every request on a loopback port with `status` and `body`. Returns the base URL.
async fn serve(status: &'static str, body: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let head = format!(
                    "HTTP/1.1 {status}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes()).await;
                let _ = stream.write_all(body).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn module_not_found_over_http_degrades_and_falls_back() {
    let base = serve("404 Not Found", b"").await;
    let mut config = IngestConfig::default();
    config.runtime.module_path = format!("{base}/static/wasm/parquet_wasm_bg.wasm");
    let pipeline = IngestionPipeline::from_config(&config);

    let results = pipeline
        .load_all([
            InputDescriptor::from_bytes("entities.geoparquet", &b"PAR1..PAR1"[..]),
            InputDescriptor::from_bytes("coverage_table.parquet", &b"PAR1..PAR1"[..]),
            InputDescriptor::from_url(format!("{base}/data/features.csv")),
        ])
        .await;

    match pipeline.runtime().state() {
        WasmState::Degraded(d) => {
            assert_eq!(d.kind, ErrorKind::NetworkError);
            assert!(d.message.contains("404"), "{}", d.message);
        }
        other => panic!("expected degraded runtime, got {other:?}"),
    }
    assert_eq!(pipeline.runtime().attempts(), 1);

    for result in &results[..2] {
        assert_eq!(result.status, LoadStatus::Success);
        assert!(result.is_partial());
        assert_eq!(result.dataset.as_ref().unwrap().row_count(), 0);
    }
    assert_eq!(results[2].status, LoadStatus::Failure);
    assert_eq!(results[2].error_kind(), Some(ErrorKind::NetworkError));
}

#[tokio::test]
async fn module_served_over_http_becomes_ready() {
    let base = serve("200 OK", WASM_HEADER).await;
    let runtime = WasmRuntimeManager::from_config(RuntimeConfig {
        module_path: format!("{base}/parquet_wasm_bg.wasm"),
        ..RuntimeConfig::default()
    });

    assert!(runtime.ensure_ready().await.is_ready());
    assert_eq!(runtime.state(), WasmState::Ready);
}

#[tokio::test]
async fn url_input_is_fetched_and_decoded() {
    let base = serve("200 OK", b"id,lat,lng\n1,1.5,2.5\n2,3.0,4.0\n").await;
    let pipeline = IngestionPipeline::from_config(&IngestConfig::default());

    let result = pipeline
        .load(InputDescriptor::from_url(format!("{base}/exports/features.csv?download=1")))
        .await;

    assert!(result.is_success(), "{:?}", result.error);
    let dataset = result.dataset.unwrap();
    assert_eq!(dataset.label, "features");
    assert_eq!(dataset.row_count(), 2);
    assert_eq!(result.config.unwrap().layer_type, LayerType::Point);
}
