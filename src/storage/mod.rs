//! Snapshot Cache
//!
//! Holds exactly one current snapshot under two logical keys
//! (`benchmark_results`, `benchmark_timestamp`), written and read together.
//!
//! Backends implement [`SnapshotStore`] and may fail. [`SnapshotCache`] is
//! the face the rest of the crate sees: it never fails a caller. An
//! unconfigured or unreachable store reads as empty and reports writes as
//! not persisted, with the underlying error logged at `warn`.

pub mod database;
mod kv_rest;
mod sqlite;

pub use database::{Database, PoolConfig, SharedDatabase};
pub use kv_rest::KvRestStore;
pub use sqlite::SqliteStore;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::benchmark::{ResultEntry, Snapshot};
use crate::config::{CacheBackend, CacheConfig};
use crate::types::{ArenaError, Result};

/// Outcome of a best-effort cache write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheWrite {
    Persisted,
    NotPersisted,
}

impl CacheWrite {
    pub fn is_persisted(&self) -> bool {
        matches!(self, Self::Persisted)
    }
}

/// A durable home for the snapshot
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Both keys, or None when either is missing
    async fn load(&self) -> Result<Option<Snapshot>>;

    /// Replace both keys
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;

    /// Delete both keys
    async fn clear(&self) -> Result<()>;
}

/// Best-effort snapshot cache over an optional store
#[derive(Clone, Default)]
pub struct SnapshotCache {
    store: Option<Arc<dyn SnapshotStore>>,
}

impl SnapshotCache {
    /// Cache that never holds anything
    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store: Some(store) }
    }

    /// Open the configured backend. A backend that cannot be opened leaves
    /// the cache disabled rather than failing startup.
    pub fn open(config: &CacheConfig) -> Self {
        let backend = config.resolved_backend();
        let opened: Result<Option<Arc<dyn SnapshotStore>>> = match backend {
            CacheBackend::Disabled | CacheBackend::Auto => Ok(None),
            CacheBackend::Sqlite => {
                let path = config.sqlite_path_or_default();
                SqliteStore::open(&path).map(|s| Some(Arc::new(s) as Arc<dyn SnapshotStore>))
            }
            CacheBackend::KvRest => match (&config.kv_url, &config.kv_token) {
                (Some(url), Some(token)) => {
                    KvRestStore::new(url, token).map(|s| Some(Arc::new(s) as Arc<dyn SnapshotStore>))
                }
                _ => Err(ArenaError::Config(
                    "kv-rest cache requires cache.kv_url and cache.kv_token".to_string(),
                )),
            },
        };

        match opened {
            Ok(Some(store)) => {
                info!("Snapshot cache: {}", store.name());
                Self::new(store)
            }
            Ok(None) => {
                info!("Snapshot cache disabled");
                Self::disabled()
            }
            Err(e) => {
                warn!("Snapshot cache ({}) unavailable, continuing without: {}", backend, e);
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.as_ref().map(|s| s.name()).unwrap_or("disabled")
    }

    /// Current snapshot, or None when absent or unreadable
    pub async fn get(&self) -> Option<Snapshot> {
        let store = self.store.as_ref()?;
        match store.load().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Cache read failed ({}): {}", store.name(), e);
                None
            }
        }
    }

    /// Replace the snapshot; never fails the caller
    pub async fn set(&self, snapshot: &Snapshot) -> CacheWrite {
        let Some(store) = self.store.as_ref() else {
            debug!("Cache disabled; snapshot not persisted");
            return CacheWrite::NotPersisted;
        };

        match store.save(snapshot).await {
            Ok(()) => {
                debug!("Persisted snapshot with {} entries", snapshot.len());
                CacheWrite::Persisted
            }
            Err(e) => {
                warn!("Cache write failed ({}): {}", store.name(), e);
                CacheWrite::NotPersisted
            }
        }
    }

    /// Delete the snapshot. Unlike get/set this reports failures, since an
    /// operator asked for it explicitly.
    pub async fn clear(&self) -> Result<()> {
        match self.store.as_ref() {
            Some(store) => store.clear().await,
            None => Err(ArenaError::CacheUnavailable(
                "no cache backend configured".to_string(),
            )),
        }
    }
}

// =============================================================================
// Wire Encoding
// =============================================================================

/// `(results JSON, RFC 3339 timestamp)`
pub(crate) fn encode_snapshot(snapshot: &Snapshot) -> Result<(String, String)> {
    let results = serde_json::to_string(&snapshot.results)?;
    let timestamp = snapshot
        .timestamp
        .to_rfc3339_opts(SecondsFormat::Millis, true);
    Ok((results, timestamp))
}

pub(crate) fn decode_snapshot(
    results: Option<String>,
    timestamp: Option<String>,
) -> Result<Option<Snapshot>> {
    let (Some(results), Some(timestamp)) = (results, timestamp) else {
        return Ok(None);
    };

    let results: BTreeMap<String, ResultEntry> = serde_json::from_str(&results)?;
    let timestamp = DateTime::parse_from_rfc3339(timestamp.trim().trim_matches('"'))
        .map_err(|e| ArenaError::Storage(format!("Invalid cached timestamp: {}", e)))?
        .with_timezone(&Utc);

    Ok(Some(Snapshot { results, timestamp }))
}
