// =============================================================================
// Signal queue — pending records awaiting review
// =============================================================================
//
// Publication is queue-first: every accepted signal is appended as a
// `pending` record and a human (or downstream approver) flips the status
// later. The store also answers the spam-guard question: "what was the most
// recent pending record for this pair and mode?".
// =============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
#[cfg(test)]
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write as _;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::confirm::TimeframeFeatures;
use crate::signal_builder::Signal;
use crate::tier::Tier;
use crate::types::Mode;

/// Review status of a queued record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Approved => "approved",
            RecordStatus::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

/// One queued signal. `id` and `created_at` are assigned by the store on
/// append; the levels are flattened into the record for downstream consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueRecord {
    pub id: String,
    pub pair: String,
    pub mode: Mode,
    pub tier: Tier,
    pub xscore: i64,
    pub confidence: String,
    pub features: TimeframeFeatures,
    #[serde(flatten)]
    pub signal: Signal,
    pub status: RecordStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Store failure. Appends that fail lose only the one record; the scan
/// cycle itself keeps going.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialisation failure: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Draft record before the store assigns identity fields.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub pair: String,
    pub mode: Mode,
    pub tier: Tier,
    pub xscore: i64,
    pub confidence: String,
    pub features: TimeframeFeatures,
    pub signal: Signal,
}

/// Append-only persistence for queued signals.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Append a new pending record. The store assigns `id` and `created_at`.
    async fn append(&self, draft: NewRecord) -> Result<QueueRecord, StoreError>;

    /// Most recent record for `pair`/`mode` with the given status, if any.
    async fn latest_matching(
        &self,
        pair: &str,
        mode: Mode,
        status: RecordStatus,
    ) -> Result<Option<QueueRecord>, StoreError>;
}

fn materialise(draft: NewRecord) -> QueueRecord {
    QueueRecord {
        id: Uuid::new_v4().to_string(),
        pair: draft.pair,
        mode: draft.mode,
        tier: draft.tier,
        xscore: draft.xscore,
        confidence: draft.confidence,
        features: draft.features,
        signal: draft.signal,
        status: RecordStatus::Pending,
        created_at: Utc::now(),
    }
}

// =============================================================================
// JSONL store
// =============================================================================

/// File-backed store: one JSON object per line, append-only. Reads replay
/// the file; the write path holds a mutex so concurrent appends cannot
/// interleave partial lines.
pub struct JsonlStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<Vec<QueueRecord>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<QueueRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    // A torn final line from a crash mid-append is skipped,
                    // not fatal.
                    debug!(error = %e, "skipping unparseable queue line");
                }
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl SignalStore for JsonlStore {
    async fn append(&self, draft: NewRecord) -> Result<QueueRecord, StoreError> {
        let record = materialise(draft);
        let line = serde_json::to_string(&record)?;

        let _guard = self.write_lock.lock();
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        file.flush()?;

        debug!(id = %record.id, pair = %record.pair, "queue record appended");
        Ok(record)
    }

    async fn latest_matching(
        &self,
        pair: &str,
        mode: Mode,
        status: RecordStatus,
    ) -> Result<Option<QueueRecord>, StoreError> {
        let records = self.read_all()?;
        Ok(records
            .into_iter()
            .rev()
            .find(|r| r.pair == pair && r.mode == mode && r.status == status))
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Memory-backed store used as a test double across the crate.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<QueueRecord>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the status of a stored record. Test helper for exercising the
    /// spam guard against approved/rejected history.
    pub fn set_status(&self, id: &str, status: RecordStatus) {
        let mut records = self.records.write();
        if let Some(record) = records.iter_mut().find(|r| r.id == id) {
            record.status = status;
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[cfg(test)]
#[async_trait]
impl SignalStore for MemoryStore {
    async fn append(&self, draft: NewRecord) -> Result<QueueRecord, StoreError> {
        let record = materialise(draft);
        self.records.write().push(record.clone());
        Ok(record)
    }

    async fn latest_matching(
        &self,
        pair: &str,
        mode: Mode,
        status: RecordStatus,
    ) -> Result<Option<QueueRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .iter()
            .rev()
            .find(|r| r.pair == pair && r.mode == mode && r.status == status)
            .cloned())
    }
}
