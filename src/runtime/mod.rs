//! Lifecycle of the columnar decoder runtime.
//!
//! [`WasmRuntimeManager`] brings the decoder module up lazily, on the first
//! [`WasmRuntimeManager::ensure_ready`] call:
//!
//! 1. fetch the module asset from the configured local location
//! 2. fail on an unsuccessful response
//! 3. instantiate it
//! 4. run a smoke check
//!
//! At most one attempt is in flight at a time: concurrent callers share one memoized future and
//! all observe the same [`Readiness`]. Failures never propagate as errors; they settle the
//! manager in [`WasmState::Degraded`], which is sticky until [`WasmRuntimeManager::retry`].
//! A panicking collaborator settles it the same way, as [`ErrorKind::Internal`].

mod engine;
mod source;

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures_util::future::{BoxFuture, FutureExt, Shared};

use crate::config::{RuntimeConfig, RuntimeMode};
use crate::error::IngestError;
use crate::ingestion::classify::{ErrorKind, classify};

pub use engine::{
    ColumnarEngine, ModuleInstantiator, NativeInstantiator, NativeParquetEngine, WASM_HEADER,
    geo_metadata_columns,
};
pub use source::{LocalModuleSource, ModuleSource};
pub(crate) use source::{fetch_url, is_http_url};

/// Why the runtime is degraded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Degradation {
    /// Classified failure kind (e.g. [`ErrorKind::NetworkError`] for a missing asset).
    pub kind: ErrorKind,
    /// Original failure message.
    pub message: String,
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Snapshot of the runtime lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WasmState {
    /// Nothing has asked for the runtime yet.
    Uninitialized,
    /// One initialization attempt is in flight.
    Initializing,
    /// The engine is instantiated and verified.
    Ready,
    /// The last attempt failed; callers fall back.
    Degraded(Degradation),
}

/// Settled outcome handed to every caller of [`WasmRuntimeManager::ensure_ready`].
#[derive(Clone)]
pub enum Readiness {
    /// Decode through this engine.
    Ready(Arc<dyn ColumnarEngine>),
    /// Take the degraded path.
    Degraded(Degradation),
}

impl Readiness {
    /// True for [`Readiness::Ready`].
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The degradation reason, if degraded.
    pub fn degradation(&self) -> Option<&Degradation> {
        match self {
            Self::Ready(_) => None,
            Self::Degraded(d) => Some(d),
        }
    }
}

impl PartialEq for Readiness {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Ready(a), Self::Ready(b)) => Arc::ptr_eq(a, b),
            (Self::Degraded(a), Self::Degraded(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(engine) => f.debug_tuple("Ready").field(&engine.name()).finish(),
            Self::Degraded(d) => f.debug_tuple("Degraded").field(d).finish(),
        }
    }
}

type PendingInit = Shared<BoxFuture<'static, Readiness>>;

enum Slot {
    Uninitialized,
    Initializing(PendingInit),
    Ready(Arc<dyn ColumnarEngine>),
    Degraded(Degradation),
}

struct Inner {
    config: RuntimeConfig,
    source: Arc<dyn ModuleSource>,
    instantiator: Arc<dyn ModuleInstantiator>,
    slot: Mutex<Slot>,
    attempts: AtomicUsize,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to the process-wide decoder runtime. Clones share the same state.
#[derive(Clone)]
pub struct WasmRuntimeManager {
    inner: Arc<Inner>,
}

impl fmt::Debug for WasmRuntimeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WasmRuntimeManager")
            .field("module_path", &self.inner.config.module_path)
            .field("mode", &self.inner.config.mode)
            .field("state", &self.state())
            .field("attempts", &self.attempts())
            .finish()
    }
}

impl WasmRuntimeManager {
    /// Create a manager with injected fetch and instantiation collaborators.
    pub fn new(
        config: RuntimeConfig,
        source: Arc<dyn ModuleSource>,
        instantiator: Arc<dyn ModuleInstantiator>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                source,
                instantiator,
                slot: Mutex::new(Slot::Uninitialized),
                attempts: AtomicUsize::new(0),
            }),
        }
    }

    /// Create a manager that reads the module from `config.module_path` and backs it with the
    /// native Parquet engine.
    pub fn from_config(config: RuntimeConfig) -> Self {
        Self::new(config, Arc::new(LocalModuleSource::default()), Arc::new(NativeInstantiator))
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WasmState {
        match &*self.inner.lock() {
            Slot::Uninitialized => WasmState::Uninitialized,
            Slot::Initializing(_) => WasmState::Initializing,
            Slot::Ready(_) => WasmState::Ready,
            Slot::Degraded(d) => WasmState::Degraded(d.clone()),
        }
    }

    /// Number of underlying fetch/instantiate sequences started so far.
    pub fn attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Resolve the runtime, initializing it on first use.
    ///
    /// Never fails: a failed initialization resolves to [`Readiness::Degraded`]. A degraded
    /// manager answers immediately without re-attempting.
    pub async fn ensure_ready(&self) -> Readiness {
        let pending = {
            let mut slot = self.inner.lock();
            match &*slot {
                Slot::Ready(engine) => return Readiness::Ready(Arc::clone(engine)),
                Slot::Degraded(d) => return Readiness::Degraded(d.clone()),
                Slot::Initializing(pending) => pending.clone(),
                Slot::Uninitialized => match self.begin(&mut slot) {
                    Some(pending) => pending,
                    None => return self.disabled(&mut slot),
                },
            }
        };
        pending.await
    }

    /// Leave [`WasmState::Degraded`] and attempt initialization again.
    ///
    /// In any other state this behaves like [`Self::ensure_ready`].
    pub async fn retry(&self) -> Readiness {
        let pending = {
            let mut slot = self.inner.lock();
            if matches!(&*slot, Slot::Degraded(_)) {
                tracing::info!(
                    module_path = %self.inner.config.module_path,
                    "retrying decoder runtime initialization"
                );
                *slot = Slot::Uninitialized;
            }
            match &*slot {
                Slot::Ready(engine) => return Readiness::Ready(Arc::clone(engine)),
                Slot::Degraded(d) => return Readiness::Degraded(d.clone()),
                Slot::Initializing(pending) => pending.clone(),
                Slot::Uninitialized => match self.begin(&mut slot) {
                    Some(pending) => pending,
                    None => return self.disabled(&mut slot),
                },
            }
        };
        pending.await
    }

    /// Start an attempt and park its memoized future in the slot. `None` when disabled.
    fn begin(&self, slot: &mut Slot) -> Option<PendingInit> {
        if self.inner.config.mode == RuntimeMode::Disabled {
            return None;
        }
        let attempt = self.inner.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let config = self.inner.config.clone();
        let source = Arc::clone(&self.inner.source);
        let instantiator = Arc::clone(&self.inner.instantiator);
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        let pending = async move {
            let outcome = AssertUnwindSafe(initialize(attempt, &config, source, instantiator))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    let message = panic
                        .downcast_ref::<String>()
                        .map(String::as_str)
                        .or(panic.downcast_ref::<&str>().copied())
                        .unwrap_or_default();
                    let err = IngestError::internal(format!(
                        "decoder runtime initialization panicked: {message}"
                    ));
                    degrade(&config.module_path, &err)
                });
            if let Some(inner) = weak.upgrade() {
                *inner.lock() = match &outcome {
                    Readiness::Ready(engine) => Slot::Ready(Arc::clone(engine)),
                    Readiness::Degraded(d) => Slot::Degraded(d.clone()),
                };
            }
            outcome
        }
        .boxed()
        .shared();

        *slot = Slot::Initializing(pending.clone());
        Some(pending)
    }

    fn disabled(&self, slot: &mut Slot) -> Readiness {
        let degradation = Degradation {
            kind: ErrorKind::RuntimeUnavailable,
            message: "decoder runtime disabled by configuration".to_string(),
        };
        tracing::debug!(reason = %degradation, "decoder runtime degraded");
        *slot = Slot::Degraded(degradation.clone());
        Readiness::Degraded(degradation)
    }
}

async fn initialize(
    attempt: usize,
    config: &RuntimeConfig,
    source: Arc<dyn ModuleSource>,
    instantiator: Arc<dyn ModuleInstantiator>,
) -> Readiness {
    let path = config.module_path.as_str();
    tracing::info!(module_path = path, attempt, "initializing decoder runtime");

    let module = match source.fetch(path).await {
        Ok(module) => module,
        Err(err) => return degrade(path, &err),
    };
    let bytes = module.len();
    // Instantiation and the smoke check run a real encode/decode; keep them off the executor.
    let verified = tokio::task::spawn_blocking(move || {
        let engine = instantiator.instantiate(&module)?;
        engine.smoke_check()?;
        Ok::<_, IngestError>(engine)
    })
    .await;
    let engine = match verified.map_err(IngestError::from).and_then(|engine| engine) {
        Ok(engine) => engine,
        Err(err) => return degrade(path, &err),
    };

    tracing::info!(
        module_path = path,
        engine = engine.name(),
        bytes,
        "decoder runtime ready"
    );
    Readiness::Ready(engine)
}

fn degrade(path: &str, err: &IngestError) -> Readiness {
    let kind = classify(err);
    let degradation = Degradation {
        kind,
        message: err.to_string(),
    };
    if kind == ErrorKind::RuntimeUnavailable {
        tracing::debug!(module_path = path, reason = %degradation, "decoder runtime degraded");
    } else {
        tracing::warn!(module_path = path, reason = %degradation, "decoder runtime degraded");
    }
    Readiness::Degraded(degradation)
}
