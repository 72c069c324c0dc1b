//! SQLite snapshot store. Blocking pool calls run on the blocking thread pool.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use super::database::{Database, SharedDatabase};
use super::{SnapshotStore, decode_snapshot, encode_snapshot};
use crate::benchmark::Snapshot;
use crate::constants::cache::{RESULTS_KEY, TIMESTAMP_KEY};
use crate::types::{ArenaError, Result};

pub struct SqliteStore {
    db: SharedDatabase,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::open(path)?;
        db.initialize()?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn from_database(db: SharedDatabase) -> Self {
        Self { db }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| ArenaError::Storage(format!("Cache task failed: {}", e)))?
    }
}

#[async_trait]
impl SnapshotStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn load(&self) -> Result<Option<Snapshot>> {
        let values = self
            .blocking(|db| db.get_values(&[RESULTS_KEY, TIMESTAMP_KEY]))
            .await?;

        let mut values = values.into_iter();
        decode_snapshot(values.next().flatten(), values.next().flatten())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let (results, timestamp) = encode_snapshot(snapshot)?;
        self.blocking(move |db| db.put_values(&[(RESULTS_KEY, results), (TIMESTAMP_KEY, timestamp)]))
            .await
    }

    async fn clear(&self) -> Result<()> {
        self.blocking(|db| db.delete_keys(&[RESULTS_KEY, TIMESTAMP_KEY]))
            .await?;
        Ok(())
    }
}
