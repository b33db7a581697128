use std::sync::{Arc, Mutex};

use atlas_ingest::config::{IngestConfig, RuntimeMode};
use atlas_ingest::ingestion::{
    CompositeObserver, ErrorKind, FileObserver, IngestionContext, IngestionFailure,
    IngestionObserver, IngestionPipeline, IngestionSeverity, IngestionStats, InputDescriptor,
};

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<IngestionStats>>,
    failures: Mutex<Vec<(IngestionSeverity, ErrorKind)>>,
    alerts: Mutex<Vec<IngestionSeverity>>,
}

impl IngestionObserver for RecordingObserver {
    fn on_success(&self, _ctx: &IngestionContext, stats: IngestionStats) {
        self.successes.lock().unwrap().push(stats);
    }

    fn on_failure(
        &self,
        _ctx: &IngestionContext,
        severity: IngestionSeverity,
        failure: IngestionFailure<'_>,
    ) {
        self.failures.lock().unwrap().push((severity, failure.kind));
    }

    fn on_alert(
        &self,
        _ctx: &IngestionContext,
        severity: IngestionSeverity,
        _failure: IngestionFailure<'_>,
    ) {
        self.alerts.lock().unwrap().push(severity);
    }
}

fn pipeline(config: &IngestConfig, obs: Arc<RecordingObserver>) -> IngestionPipeline {
    IngestionPipeline::from_config(config).with_observer(obs)
}

#[tokio::test]
async fn observer_receives_failure_and_alert_on_critical_io_error() {
    let obs = Arc::new(RecordingObserver::default());
    let p = pipeline(&IngestConfig::default(), obs.clone());

    // Missing file -> Io error -> NetworkError -> Critical
    let _ = p.load(InputDescriptor::from_path("tests/fixtures/does_not_exist.csv")).await;

    let failures = obs.failures.lock().unwrap().clone();
    let alerts = obs.alerts.lock().unwrap().clone();
    assert_eq!(failures, vec![(IngestionSeverity::Critical, ErrorKind::NetworkError)]);
    assert_eq!(alerts, vec![IngestionSeverity::Critical]);
}

#[tokio::test]
async fn observer_receives_failure_without_alert_for_non_critical_error() {
    let obs = Arc::new(RecordingObserver::default());
    let p = pipeline(&IngestConfig::default(), obs.clone());

    // Bad GeoJSON root -> MalformedInput -> Error severity (not Critical) -> no alert
    let _ = p.load(InputDescriptor::from_path("tests/fixtures/not_geojson.json")).await;

    let failures = obs.failures.lock().unwrap().clone();
    assert_eq!(failures, vec![(IngestionSeverity::Error, ErrorKind::MalformedInput)]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn alert_threshold_comes_from_config() {
    let config =
        IngestConfig::from_toml_str("[observability]\nalert_at_or_above = \"error\"\n").unwrap();
    let obs = Arc::new(RecordingObserver::default());
    let p = pipeline(&config, obs.clone());

    let _ = p.load(InputDescriptor::from_bytes("notes.txt", &b"hello"[..])).await;

    assert_eq!(
        obs.failures.lock().unwrap().clone(),
        vec![(IngestionSeverity::Error, ErrorKind::UnsupportedFormat)]
    );
    assert_eq!(obs.alerts.lock().unwrap().clone(), vec![IngestionSeverity::Error]);
}

#[tokio::test]
async fn partial_loads_are_reported_as_successes() {
    let mut config = IngestConfig::default();
    config.runtime.mode = RuntimeMode::Disabled;
    let obs = Arc::new(RecordingObserver::default());
    let p = pipeline(&config, obs.clone());

    let result = p
        .load(InputDescriptor::from_bytes("entities.geoparquet", &b"PAR1..PAR1"[..]))
        .await;
    assert!(result.is_partial());

    let successes = obs.successes.lock().unwrap().clone();
    assert_eq!(
        successes,
        vec![IngestionStats {
            rows: 0,
            skipped_rows: 0,
            partial: true,
        }]
    );
    assert!(obs.failures.lock().unwrap().is_empty());
}

#[tokio::test]
async fn composite_and_file_observers_fan_out() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("ingest.log");
    let recorder = Arc::new(RecordingObserver::default());
    let composite = CompositeObserver::new(vec![
        recorder.clone() as Arc<dyn IngestionObserver>,
        Arc::new(FileObserver::new(&log_path)),
    ]);
    let p = IngestionPipeline::from_config(&IngestConfig::default())
        .with_observer(Arc::new(composite));

    let _ = p.load(InputDescriptor::from_path("tests/fixtures/ragged.csv")).await;
    let _ = p.load(InputDescriptor::from_path("tests/fixtures/does_not_exist.csv")).await;

    assert_eq!(recorder.successes.lock().unwrap()[0].skipped_rows, 2);
    assert_eq!(recorder.failures.lock().unwrap().len(), 1);

    let log = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("ok format=csv input=ragged.csv rows=2 skipped=2 partial=false"));
    assert!(lines[1].contains("fail severity=Critical kind=NetworkError"));
    assert!(lines[2].contains("ALERT"));
}
