//! Result Entries and Snapshots
//!
//! A snapshot is the single persisted aggregate: every model's latest
//! result keyed by `<category>-<modelId>`, plus the time of the most recent
//! run. New runs merge into it key by key.

use std::collections::BTreeMap;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Category, OutputKind};

/// Prefix of every failed model's payload
pub const ERROR_PREFIX: &str = "Error: ";

/// Start time for a new run.
///
/// Cut to milliseconds, the precision the cache stores the snapshot
/// timestamp with, so entries and snapshot agree after a reload.
pub fn run_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// One model's outcome for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    /// Raw text, or a data URI / URL for images
    pub output: String,
    pub kind: OutputKind,
    /// Start time of the run that produced this entry
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ResultEntry {
    pub fn success(
        output: impl Into<String>,
        kind: OutputKind,
        timestamp: DateTime<Utc>,
        duration_ms: Option<u64>,
    ) -> Self {
        Self {
            output: output.into(),
            kind,
            timestamp,
            duration_ms,
        }
    }

    /// Failures are always displayable text: `Error: <message>`
    pub fn failure(message: &str, timestamp: DateTime<Utc>, duration_ms: Option<u64>) -> Self {
        Self {
            output: format!("{}{}", ERROR_PREFIX, message),
            kind: OutputKind::Text,
            timestamp,
            duration_ms,
        }
    }
}

/// Entries produced by one orchestrator run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub category: Category,
    /// Run start time, shared by every entry
    pub timestamp: DateTime<Utc>,
    pub entries: BTreeMap<String, ResultEntry>,
    /// Keys whose entry records a failure
    pub failed: Vec<String>,
}

impl RunOutcome {
    pub fn succeeded(&self) -> usize {
        self.entries.len() - self.failed.len()
    }

    /// This run's entries alone, shaped as a snapshot
    pub fn fragment(&self) -> Snapshot {
        Snapshot {
            results: self.entries.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// The unit of persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub results: BTreeMap<String, ResultEntry>,
    pub timestamp: DateTime<Utc>,
}

impl Snapshot {
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            results: BTreeMap::new(),
            timestamp,
        }
    }

    /// Overwrite the run's keys on top of `previous`, keeping every other
    /// entry untouched. The snapshot timestamp becomes the run's.
    pub fn merge(previous: Option<Snapshot>, outcome: &RunOutcome) -> Snapshot {
        let mut results = previous.map(|s| s.results).unwrap_or_default();
        for (key, entry) in &outcome.entries {
            results.insert(key.clone(), entry.clone());
        }
        Snapshot {
            results,
            timestamp: outcome.timestamp,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
