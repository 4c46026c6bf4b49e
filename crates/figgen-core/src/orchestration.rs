//! The generation-critique loop: per-entry state machine and run executor.
//!
//! Per entry the loop walks Drafting → Validating → Critiquing → Deciding
//! until an attempt is accepted, the quality iteration bound is exhausted,
//! transient capability failures exceed their cap, or cancellation is
//! requested. Entries are independent and run on parallel workers bounded by
//! the configured worker count; within one entry iterations are strictly
//! sequential because each draft folds in the previous critique's feedback.
//!
//! Transient capability failures (unavailable, timeout) do not consume
//! quality iterations; they are budgeted separately by `transient_retries`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use figgen_state::{RunLedger, RunMetadata, RunSummary};
use tokio::sync::Semaphore;
use tracing::instrument;

use crate::capability::{FigureCritic, FigureGenerator};
use crate::domain::attempt::{AttemptStatus, DraftContext, GenerationAttempt};
use crate::domain::config::RunConfig;
use crate::domain::critique::{CritiqueFeedback, Dimension};
use crate::domain::error::{FiggenError, Result};
use crate::domain::plan::{FigurePlanEntry, SectionSet};
use crate::domain::run::{EntryOutcome, EntryStatus, RunOutcome};
use crate::events::*;
use crate::obs;
use crate::policy::{self, Decision, Thresholds};
use crate::recording::RunRecorder;
use crate::traceability::validate_elements;

/// Cooperative cancellation handle. In-flight capability calls complete or
/// time out; no new iteration starts once cancellation is requested.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives a full run: creates the run record, fans entries out to workers,
/// and finalizes the ledger with per-entry outcomes.
pub struct Orchestrator {
    generator: Arc<dyn FigureGenerator>,
    critic: Arc<dyn FigureCritic>,
    ledger: Arc<dyn RunLedger>,
    config: RunConfig,
}

impl Orchestrator {
    pub fn new(
        generator: Arc<dyn FigureGenerator>,
        critic: Arc<dyn FigureCritic>,
        ledger: Arc<dyn RunLedger>,
        config: RunConfig,
    ) -> Self {
        Orchestrator {
            generator,
            critic,
            ledger,
            config,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Execute one run over the given plan.
    ///
    /// Configuration is validated before any capability call; only a
    /// `Configuration` error aborts the run without creating a record. All
    /// capability-level failures are scoped to their entry — the run always
    /// completes with a per-entry status report.
    #[instrument(skip_all, fields(entries = plan.len()))]
    pub async fn execute(
        &self,
        plan: Vec<FigurePlanEntry>,
        sections: SectionSet,
        metadata: RunMetadata,
        cancel: CancelFlag,
    ) -> Result<RunOutcome> {
        self.config.validate()?;
        let config_digest = self.config.fingerprint()?;
        let started = Instant::now();

        let run_id = self
            .ledger
            .create_run(
                &serde_json::to_value(&self.config)?,
                &config_digest,
                &serde_json::to_value(&plan)?,
                &serde_json::to_value(&sections)?,
                metadata,
            )
            .await?;

        let _span = obs::RunSpan::enter(&run_id.0);
        obs::emit_run_started(&run_id.0, plan.len());

        let recorder = Arc::new(RunRecorder::new(self.ledger.clone(), run_id.clone()));
        recorder
            .record(
                RUN_STARTED,
                &RunStartedPayload {
                    entry_count: plan.len(),
                    config_digest: config_digest.clone(),
                },
            )
            .await?;

        let sections = Arc::new(sections);
        let semaphore = Arc::new(Semaphore::new(self.config.worker_count));
        let mut handles = Vec::with_capacity(plan.len());

        for entry in plan {
            let generator = self.generator.clone();
            let critic = self.critic.clone();
            let recorder = recorder.clone();
            let sections = sections.clone();
            let config = self.config.clone();
            let cancel = cancel.clone();
            let semaphore = semaphore.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore never closed");
                run_entry(entry, sections, config, generator, critic, recorder, cancel).await
            }));
        }

        // Collect in spawn order, which is plan order. Every task settles
        // before the run is finalized.
        let joined = futures::future::join_all(handles).await;
        let mut outcomes = Vec::with_capacity(joined.len());
        for result in joined {
            let result = result.map_err(|e| FiggenError::Worker(e.to_string()))?;
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    self.finalize_failed(&run_id, &recorder, started, &outcomes)
                        .await;
                    return Err(e);
                }
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        let cancelled = cancel.is_cancelled();
        let accepted_count = outcomes.iter().filter(|o| o.accepted()).count();
        let success = !cancelled && accepted_count == outcomes.len();

        recorder
            .record(
                RUN_FINISHED,
                &RunFinishedPayload {
                    success,
                    cancelled,
                    accepted_count,
                    entry_count: outcomes.len(),
                    duration_ms,
                },
            )
            .await?;

        let summary = RunSummary {
            total_events: recorder.event_count(),
            duration_ms,
            success,
            outcomes: serde_json::to_value(&outcomes)?,
        };
        if cancelled {
            self.ledger.cancel_run(&run_id, summary).await?;
        } else {
            self.ledger.complete_run(&run_id, summary).await?;
        }
        obs::emit_run_finished(&run_id.0, duration_ms, accepted_count, success);

        Ok(RunOutcome {
            run_id: run_id.0,
            outcomes,
            success,
            cancelled,
            duration_ms,
        })
    }

    /// Best-effort ledger finalization when a fatal (non-entry) error ends
    /// the run early. The original error is what callers see.
    async fn finalize_failed(
        &self,
        run_id: &figgen_state::RunId,
        recorder: &RunRecorder,
        started: Instant,
        outcomes: &[EntryOutcome],
    ) {
        let summary = RunSummary {
            total_events: recorder.event_count(),
            duration_ms: started.elapsed().as_millis() as u64,
            success: false,
            outcomes: serde_json::to_value(outcomes).unwrap_or(serde_json::Value::Null),
        };
        if let Err(e) = self.ledger.fail_run(run_id, summary).await {
            obs::emit_run_finalize_error(&run_id.0, &e);
        }
    }
}

/// Retained state of the best-scoring critiqued attempt for an entry.
struct BestAttempt {
    overall: f64,
    attempt: u32,
    failed_dimensions: Vec<Dimension>,
    element_count: usize,
}

/// Drive one plan entry to a terminal state.
async fn run_entry(
    entry: FigurePlanEntry,
    sections: Arc<SectionSet>,
    config: RunConfig,
    generator: Arc<dyn FigureGenerator>,
    critic: Arc<dyn FigureCritic>,
    recorder: Arc<RunRecorder>,
    cancel: CancelFlag,
) -> Result<EntryOutcome> {
    recorder
        .record(
            ENTRY_STARTED,
            &EntryStartedPayload {
                entry_id: entry.entry_id.clone(),
                order: entry.order,
            },
        )
        .await?;

    let thresholds = Thresholds {
        overall: config.overall_threshold,
        dimension: config.dimension_threshold,
    };
    let timeout = config.capability_timeout();

    let mut feedback: Vec<CritiqueFeedback> = Vec::new();
    let mut transient_failures = 0u32;
    let mut iteration = 0u32;
    let mut draft_seq = 0u32;
    let mut best: Option<BestAttempt> = None;

    loop {
        if cancel.is_cancelled() {
            let outcome = unaccepted_outcome(
                &entry.entry_id,
                EntryStatus::Cancelled,
                iteration,
                best.as_ref(),
            );
            return finish_entry(&recorder, outcome).await;
        }
        if iteration >= config.max_iterations {
            break;
        }
        iteration += 1;

        let context = DraftContext {
            iteration,
            feedback: feedback.clone(),
        };

        // Drafting.
        let draft = match call_with_timeout(
            generator.generate(&entry, &context),
            timeout,
            "generator",
        )
        .await
        {
            Ok(draft) => draft,
            Err(e) if e.is_transient() => {
                iteration -= 1;
                transient_failures += 1;
                if let Some(outcome) = record_transient_failure(
                    &recorder,
                    &entry.entry_id,
                    iteration,
                    "generator",
                    &e,
                    transient_failures,
                    &config,
                    best.as_ref(),
                )
                .await?
                {
                    return finish_entry(&recorder, outcome).await;
                }
                continue;
            }
            Err(e) => return Err(e),
        };

        draft_seq += 1;
        recorder
            .record(
                ATTEMPT_DRAFTED,
                &AttemptDraftedPayload {
                    entry_id: entry.entry_id.clone(),
                    draft_seq,
                    attempt: GenerationAttempt::drafted(iteration, context, &draft),
                },
            )
            .await?;

        // Validating.
        let trace = match validate_elements(&entry.entry_id, &draft.elements, &sections) {
            Ok(trace) => {
                recorder
                    .record(
                        TRACEABILITY_CHECKED,
                        &TraceabilityCheckedPayload {
                            entry_id: entry.entry_id.clone(),
                            attempt: iteration,
                            status: AttemptStatus::Produced,
                            violations: vec![],
                        },
                    )
                    .await?;
                trace
            }
            Err(violations) => {
                // The attempt is failed; treat it like a revise decision
                // with a synthetic issue. Consumes this quality iteration.
                recorder
                    .record(
                        TRACEABILITY_CHECKED,
                        &TraceabilityCheckedPayload {
                            entry_id: entry.entry_id.clone(),
                            attempt: iteration,
                            status: AttemptStatus::Failed,
                            violations: violations.clone(),
                        },
                    )
                    .await?;
                recorder
                    .record(
                        DECISION_MADE,
                        &DecisionMadePayload {
                            entry_id: entry.entry_id.clone(),
                            attempt: iteration,
                            decision: "revise".to_string(),
                            failed_dimensions: vec![Dimension::Faithfulness],
                        },
                    )
                    .await?;
                feedback.push(CritiqueFeedback::traceability(
                    iteration,
                    violations.iter().map(|v| v.describe()).collect(),
                ));
                continue;
            }
        };

        // Critiquing.
        let report = match call_with_timeout(
            critic.critique(&entry, &draft, iteration, &sections),
            timeout,
            "critic",
        )
        .await
        {
            Ok(report) => report,
            Err(e) if e.is_transient() => {
                iteration -= 1;
                transient_failures += 1;
                if let Some(outcome) = record_transient_failure(
                    &recorder,
                    &entry.entry_id,
                    iteration,
                    "critic",
                    &e,
                    transient_failures,
                    &config,
                    best.as_ref(),
                )
                .await?
                {
                    return finish_entry(&recorder, outcome).await;
                }
                continue;
            }
            Err(e) => return Err(e),
        };

        recorder
            .record(
                CRITIQUE_RECEIVED,
                &CritiqueReceivedPayload {
                    entry_id: entry.entry_id.clone(),
                    attempt: iteration,
                    scores: report.scores,
                    overall: report.overall,
                    issues: report.issues.iter().map(|i| i.description.clone()).collect(),
                    recommendations: report.recommendations.clone(),
                },
            )
            .await?;

        // Deciding.
        let decision = policy::decide(&report, &thresholds);
        let failed_dimensions = match &decision {
            Decision::Accept => vec![],
            Decision::Revise { failed_dimensions } => failed_dimensions.clone(),
        };
        recorder
            .record(
                DECISION_MADE,
                &DecisionMadePayload {
                    entry_id: entry.entry_id.clone(),
                    attempt: iteration,
                    decision: decision.as_str().to_string(),
                    failed_dimensions: failed_dimensions.clone(),
                },
            )
            .await?;

        if best.as_ref().map_or(true, |b| report.overall > b.overall) {
            best = Some(BestAttempt {
                overall: report.overall,
                attempt: iteration,
                failed_dimensions: failed_dimensions.clone(),
                element_count: draft.elements.len(),
            });
        }

        match decision {
            Decision::Accept => {
                let outcome = EntryOutcome {
                    entry_id: entry.entry_id.clone(),
                    status: EntryStatus::Accepted,
                    iterations: iteration,
                    final_score: Some(report.overall),
                    retained_attempt: Some(iteration),
                    failed_dimensions: vec![],
                    element_count: draft.elements.len(),
                    traceability: Some(trace),
                    needs_attention: false,
                };
                return finish_entry(&recorder, outcome).await;
            }
            Decision::Revise { failed_dimensions } => {
                feedback.push(CritiqueFeedback::from_report(&report, failed_dimensions));
            }
        }
    }

    // Exhausted: the best-scoring attempt is retained, flagged for review.
    let outcome = unaccepted_outcome(
        &entry.entry_id,
        EntryStatus::Exhausted,
        config.max_iterations,
        best.as_ref(),
    );
    finish_entry(&recorder, outcome).await
}

/// Record a transient capability failure; returns a `Failed` outcome once
/// the retry cap is reached.
#[allow(clippy::too_many_arguments)]
async fn record_transient_failure(
    recorder: &RunRecorder,
    entry_id: &str,
    iteration: u32,
    capability: &str,
    error: &FiggenError,
    transient_failures: u32,
    config: &RunConfig,
    best: Option<&BestAttempt>,
) -> Result<Option<EntryOutcome>> {
    recorder
        .record(
            CAPABILITY_FAILED,
            &CapabilityFailedPayload {
                entry_id: entry_id.to_string(),
                attempt: iteration + 1,
                capability: capability.to_string(),
                reason: error.to_string(),
                transient_failures,
            },
        )
        .await?;
    obs::emit_capability_failed(
        &recorder.run_id().0,
        entry_id,
        capability,
        &error.to_string(),
    );

    if transient_failures >= config.transient_retries {
        return Ok(Some(unaccepted_outcome(
            entry_id,
            EntryStatus::Failed,
            iteration,
            best,
        )));
    }
    Ok(None)
}

fn unaccepted_outcome(
    entry_id: &str,
    status: EntryStatus,
    iterations: u32,
    best: Option<&BestAttempt>,
) -> EntryOutcome {
    EntryOutcome {
        entry_id: entry_id.to_string(),
        status,
        iterations,
        final_score: best.map(|b| b.overall),
        retained_attempt: best.map(|b| b.attempt),
        failed_dimensions: best.map(|b| b.failed_dimensions.clone()).unwrap_or_default(),
        element_count: best.map(|b| b.element_count).unwrap_or(0),
        traceability: None,
        needs_attention: true,
    }
}

async fn finish_entry(recorder: &RunRecorder, outcome: EntryOutcome) -> Result<EntryOutcome> {
    recorder
        .record(
            ENTRY_FINISHED,
            &EntryFinishedPayload {
                entry_id: outcome.entry_id.clone(),
                status: outcome.status,
                iterations: outcome.iterations,
                final_score: outcome.final_score,
                retained_attempt: outcome.retained_attempt,
                needs_attention: outcome.needs_attention,
            },
        )
        .await?;
    obs::emit_entry_finished(
        &recorder.run_id().0,
        &outcome.entry_id,
        outcome.status.as_str(),
        outcome.iterations,
    );
    Ok(outcome)
}

async fn call_with_timeout<T>(
    fut: impl std::future::Future<Output = Result<T>>,
    timeout: Duration,
    capability: &str,
) -> Result<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(FiggenError::CapabilityTimeout {
            capability: capability.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}
