//! Filesystem-backed run ledger.
//!
//! Layout, one directory per run:
//!
//! ```text
//! <root>/<run_id>/run.json       # RunRecord (rewritten atomically on finalize)
//! <root>/<run_id>/ledger.jsonl   # one LedgerEvent per line, append-only
//! ```
//!
//! Each event append is a single `write_all` of one newline-terminated JSON
//! line, which keeps concurrent appends atomic per record. Record rewrites
//! go through a temp file in the run directory followed by a rename.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tempfile::NamedTempFile;

use crate::error::StorageError;
use crate::storage_traits::*;

/// Run ledger persisted under a root directory.
pub struct FsRunLedger {
    root: PathBuf,
    // Serializes status checks against record rewrites and appends.
    write_lock: Mutex<()>,
}

impl FsRunLedger {
    /// Open (or create) a ledger rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Directory holding a run's artifacts.
    pub fn run_dir(&self, run_id: &RunId) -> PathBuf {
        self.root.join(&run_id.0)
    }

    fn record_path(&self, run_id: &RunId) -> PathBuf {
        self.run_dir(run_id).join("run.json")
    }

    fn ledger_path(&self, run_id: &RunId) -> PathBuf {
        self.run_dir(run_id).join("ledger.jsonl")
    }

    fn read_record(&self, run_id: &RunId) -> StorageResult<RunRecord> {
        let path = self.record_path(run_id);
        let data = fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::RunNotFound {
                    run_id: run_id.0.clone(),
                }
            } else {
                StorageError::Io(e)
            }
        })?;
        Ok(serde_json::from_slice(&data)?)
    }

    fn write_record(&self, record: &RunRecord) -> StorageResult<()> {
        let path = self.record_path(&record.run_id);
        let dir = path.parent().expect("record path always has parent");
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&serde_json::to_vec_pretty(record)?)?;
        tmp.persist(&path).map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }

    fn require_running(&self, run_id: &RunId) -> StorageResult<RunRecord> {
        let record = self.read_record(run_id)?;
        if record.status != RunStatus::Running {
            return Err(StorageError::InvalidRunState {
                run_id: run_id.0.clone(),
                status: format!("{:?}", record.status),
                expected: "Running".to_string(),
            });
        }
        Ok(record)
    }

    fn finalize(
        &self,
        run_id: &RunId,
        status: RunStatus,
        summary: RunSummary,
    ) -> StorageResult<()> {
        let _guard = self.write_lock.lock().unwrap();
        let mut record = self.require_running(run_id)?;
        record.status = status;
        record.summary = Some(summary);
        record.completed_at = Some(Utc::now());
        self.write_record(&record)
    }
}

#[async_trait]
impl RunLedger for FsRunLedger {
    async fn create_run(
        &self,
        config: &serde_json::Value,
        config_digest: &ContentDigest,
        plan: &serde_json::Value,
        sections: &serde_json::Value,
        metadata: RunMetadata,
    ) -> StorageResult<RunId> {
        let run_id = RunId::new();
        let record = RunRecord {
            run_id: run_id.clone(),
            config: config.clone(),
            config_digest: config_digest.clone(),
            plan: plan.clone(),
            sections: sections.clone(),
            metadata,
            status: RunStatus::Running,
            summary: None,
            created_at: Utc::now(),
            completed_at: None,
        };

        let _guard = self.write_lock.lock().unwrap();
        fs::create_dir_all(self.run_dir(&run_id))?;
        self.write_record(&record)?;
        // Touch the ledger file so empty runs still replay.
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.ledger_path(&run_id))?;
        Ok(run_id)
    }

    async fn append_event(&self, run_id: &RunId, event: LedgerEvent) -> StorageResult<()> {
        let _guard = self.write_lock.lock().unwrap();
        self.require_running(run_id)?;

        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.ledger_path(run_id))?;
        file.write_all(&line)?;
        Ok(())
    }

    async fn complete_run(&self, run_id: &RunId, summary: RunSummary) -> StorageResult<()> {
        self.finalize(run_id, RunStatus::Completed, summary)
    }

    async fn fail_run(&self, run_id: &RunId, summary: RunSummary) -> StorageResult<()> {
        self.finalize(run_id, RunStatus::Failed, summary)
    }

    async fn cancel_run(&self, run_id: &RunId, summary: RunSummary) -> StorageResult<()> {
        self.finalize(run_id, RunStatus::Cancelled, summary)
    }

    async fn get_run(&self, run_id: &RunId) -> StorageResult<RunRecord> {
        self.read_record(run_id)
    }

    async fn get_events(&self, run_id: &RunId) -> StorageResult<Vec<LedgerEvent>> {
        // Existence check first so a missing run is RunNotFound, not Io.
        self.read_record(run_id)?;

        let file = fs::File::open(self.ledger_path(run_id))?;
        let reader = BufReader::new(file);
        let mut events = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str::<LedgerEvent>(&line)?);
        }
        events.sort_by_key(|e| e.seq);
        Ok(events)
    }

    async fn list_runs(&self) -> StorageResult<Vec<RunRecord>> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let run_id = RunId(entry.file_name().to_string_lossy().to_string());
            match self.read_record(&run_id) {
                Ok(record) => records.push(record),
                // Directories without run.json are not runs.
                Err(StorageError::RunNotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }
}
