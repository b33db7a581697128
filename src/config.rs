//! Configuration for the ingestion core.
//!
//! Loaded hierarchically from:
//! - `atlas-ingest.toml` (optional)
//! - Environment variables (`ATLAS_INGEST_*` prefix, `__` separates nested keys)
//!
//! ```toml
//! [runtime]
//! module_path = "static/wasm/parquet_wasm_bg.wasm"
//! mode = "native"
//! fallback = true
//!
//! [csv]
//! delimiter = ","
//! ```
//!
//! ```bash
//! ATLAS_INGEST_RUNTIME__MODE=disabled
//! ```

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::IngestResult;
use crate::ingestion::IngestionSeverity;

/// Default config file name.
pub const CONFIG_FILE: &str = "atlas-ingest.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "ATLAS_INGEST_";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub csv: CsvConfig,
    #[serde(default)]
    pub detect: DetectConfig,
    #[serde(default)]
    pub demo: DemoConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// How the columnar decoder runtime is brought up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    /// Fetch, instantiate and verify the module; degrade on failure.
    #[default]
    Native,
    /// Never initialize; every columnar load takes the degraded path.
    Disabled,
}

/// Columnar decoder runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Local path or same-server `http(s)://` URL of the decoder module. No other location is tried.
    #[serde(default = "default_module_path")]
    pub module_path: String,
    #[serde(default)]
    pub mode: RuntimeMode,
    /// Whether columnar loads degrade to an empty partial dataset when the runtime is unavailable.
    #[serde(default = "default_true")]
    pub fallback: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            module_path: default_module_path(),
            mode: RuntimeMode::default(),
            fallback: true,
        }
    }
}

/// CSV decoding settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

/// Format detection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectConfig {
    /// How many leading bytes the content sniffer inspects.
    #[serde(default = "default_sniff_bytes")]
    pub sniff_bytes: usize,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            sniff_bytes: default_sniff_bytes(),
        }
    }
}

/// Demo dataset settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Directory or base URL demo paths are resolved against.
    #[serde(default = "default_demo_root")]
    pub root: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            root: default_demo_root(),
        }
    }
}

/// Observer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Severity at or above which observers receive `on_alert`.
    #[serde(default = "default_alert_threshold")]
    pub alert_at_or_above: IngestionSeverity,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            alert_at_or_above: default_alert_threshold(),
        }
    }
}

fn default_module_path() -> String {
    "static/wasm/parquet_wasm_bg.wasm".to_string()
}
fn default_true() -> bool {
    true
}
fn default_delimiter() -> char {
    ','
}
fn default_sniff_bytes() -> usize {
    4096
}
fn default_demo_root() -> String {
    "tests/data".to_string()
}
fn default_alert_threshold() -> IngestionSeverity {
    IngestionSeverity::Critical
}

impl IngestConfig {
    /// Load configuration from `atlas-ingest.toml` and `ATLAS_INGEST_*` environment variables.
    pub fn load() -> IngestResult<Self> {
        Self::from_file(CONFIG_FILE)
    }

    /// Load configuration from a specific file, then environment overrides.
    pub fn from_file(path: &str) -> IngestResult<Self> {
        Ok(Self::base()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?)
    }

    /// Parse configuration from a TOML string (no environment overrides).
    pub fn from_toml_str(toml: &str) -> IngestResult<Self> {
        Ok(Self::base().merge(Toml::string(toml)).extract()?)
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
    }

    /// The CSV delimiter as a byte. Non-ASCII delimiters fall back to `,`.
    pub(crate) fn csv_delimiter(&self) -> u8 {
        let delimiter = self.csv.delimiter;
        if delimiter.is_ascii() {
            delimiter as u8
        } else {
            tracing::warn!(%delimiter, "non-ASCII csv delimiter configured; using ','");
            b','
        }
    }
}
