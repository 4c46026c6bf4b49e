//! Structured observability hooks for run lifecycle events.
//!
//! Events are emitted at `info!` level; configure verbosity with `RUST_LOG`
//! and output format via [`crate::telemetry::init_tracing`].

use tracing::info;

/// RAII guard that enters a run-scoped tracing span for the duration of a run.
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Create and enter a span tagged with the run_id.
    pub fn enter(run_id: &str) -> Self {
        let span = tracing::info_span!("figgen.run", run_id = %run_id);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_run_started(run_id: &str, entry_count: usize) {
    info!(event = "run.started", run_id = %run_id, entry_count = entry_count);
}

pub fn emit_run_finished(run_id: &str, duration_ms: u64, accepted: usize, success: bool) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        accepted = accepted,
        success = success,
    );
}

pub fn emit_event_appended(run_id: &str, event_kind: &str, seq: u64) {
    tracing::debug!(event = "run.event_appended", run_id = %run_id, kind = %event_kind, seq = seq);
}

pub fn emit_entry_finished(run_id: &str, entry_id: &str, status: &str, iterations: u32) {
    info!(
        event = "entry.finished",
        run_id = %run_id,
        entry_id = %entry_id,
        status = %status,
        iterations = iterations,
    );
}

pub fn emit_capability_failed(run_id: &str, entry_id: &str, capability: &str, reason: &str) {
    tracing::warn!(
        event = "capability.failed",
        run_id = %run_id,
        entry_id = %entry_id,
        capability = %capability,
        reason = %reason,
    );
}

pub fn emit_run_finalize_error(run_id: &str, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "run.finalize_error", run_id = %run_id, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_create() {
        // Just ensure RunSpan::enter doesn't panic
        let _span = RunSpan::enter("test-run-id");
    }
}
