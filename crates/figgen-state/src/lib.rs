//! figgen-state: run ledger persistence for the figgen pipeline.
//!
//! This crate is the storage layer (Layer 0): it defines the `RunLedger`
//! trait plus the record/event types the orchestration core persists through,
//! and provides two backends — an in-memory fake for tests and a
//! filesystem-backed ledger for real runs.

pub mod error;
pub mod fakes;
pub mod fs_ledger;
pub mod storage_traits;

pub use error::StorageError;
pub use fakes::MemoryRunLedger;
pub use fs_ledger::FsRunLedger;
pub use storage_traits::{
    ContentDigest, LedgerEvent, RunId, RunLedger, RunMetadata, RunRecord, RunStatus, RunSummary,
    StorageResult,
};
