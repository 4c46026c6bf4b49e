//! Figgen - paper-to-figure generation pipeline CLI
//!
//! The `figgen` command drives figure plans through the generation-critique
//! loop and works with the recorded run ledger afterwards.
//!
//! ## Commands
//!
//! - `generate`: Run a figure plan through the generation-critique loop
//! - `list`: List recorded runs
//! - `inspect`: Show per-entry outcomes and aggregates for a run
//! - `replay`: Reconstruct a run's outcomes from the ledger alone
//! - `rerun`: Re-execute a recorded run against live capabilities
//! - `diff`: Compare two runs entry by entry
//! - `audit`: Cross-check a run's record, summary, and event stream

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;

use figgen_core::audit::{audit, AuditMode};
use figgen_core::diff::{diff_runs, EntryChange};
use figgen_core::heuristics::{HeuristicCritic, HeuristicGenerator};
use figgen_core::inspect::inspect;
use figgen_core::replay::replay;
use figgen_core::rerun::rerun;
use figgen_core::telemetry::init_tracing;
use figgen_core::{
    CancelFlag, FigurePlanEntry, Orchestrator, Planner, RunConfig, RunOutcome, SectionSet,
    StaticPlanner,
};
use figgen_state::{FsRunLedger, RunId, RunLedger, RunMetadata};

#[derive(Parser)]
#[command(name = "figgen")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Paper-to-figure generation pipeline", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Root directory for the run ledger
    #[arg(long, global = true, env = "FIGGEN_LEDGER_DIR", default_value = ".figgen/runs")]
    ledger_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a figure plan through the generation-critique loop
    Generate {
        /// Path to the figure plan (JSON array of plan entries)
        #[arg(short, long)]
        plan: PathBuf,

        /// Path to extracted sections (JSON map of name -> {start, end})
        #[arg(short, long)]
        sections: PathBuf,

        /// Source paper path recorded in run metadata
        #[arg(long)]
        paper: Option<String>,

        /// Maximum quality iterations per entry
        #[arg(long, default_value = "3")]
        max_iterations: u32,

        /// Overall acceptance threshold
        #[arg(long, default_value = "0.75")]
        overall_threshold: f64,

        /// Per-dimension acceptance threshold
        #[arg(long, default_value = "0.55")]
        dimension_threshold: f64,

        /// Transient capability failures tolerated per entry
        #[arg(long, default_value = "3")]
        transient_retries: u32,

        /// Parallel entry workers
        #[arg(long, default_value = "4")]
        workers: usize,

        /// Capability call timeout in milliseconds
        #[arg(long, default_value = "30000")]
        timeout_ms: u64,
    },

    /// List recorded runs (newest last)
    List,

    /// Show per-entry outcomes and aggregates for a run
    Inspect {
        /// Run ID
        run: String,

        /// Emit JSON output instead of terminal text
        #[arg(long)]
        json: bool,
    },

    /// Reconstruct a run's outcomes from the ledger alone
    Replay {
        /// Run ID
        run: String,

        /// Emit JSON output instead of terminal text
        #[arg(long)]
        json: bool,
    },

    /// Re-execute a recorded run against live capabilities
    Rerun {
        /// Source run ID
        run: String,
    },

    /// Compare two runs entry by entry
    Diff {
        /// First run ID
        #[arg(long)]
        run_a: String,

        /// Second run ID
        #[arg(long)]
        run_b: String,

        /// Emit JSON output instead of terminal text
        #[arg(long)]
        json: bool,
    },

    /// Cross-check a run's record, summary, and event stream
    Audit {
        /// Run ID
        run: String,

        /// Fail with a non-zero exit when any check fails
        #[arg(long)]
        hard: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json_logs, level);

    let ledger = Arc::new(
        FsRunLedger::new(&cli.ledger_dir)
            .with_context(|| format!("Failed to open ledger at {:?}", cli.ledger_dir))?,
    );

    match cli.command {
        Commands::Generate {
            plan,
            sections,
            paper,
            max_iterations,
            overall_threshold,
            dimension_threshold,
            transient_retries,
            workers,
            timeout_ms,
        } => {
            let config = RunConfig {
                max_iterations,
                overall_threshold,
                dimension_threshold,
                transient_retries,
                worker_count: workers,
                capability_timeout_ms: timeout_ms,
            };
            cmd_generate(ledger, &plan, &sections, paper, config).await
        }
        Commands::List => cmd_list(ledger.as_ref()).await,
        Commands::Inspect { run, json } => cmd_inspect(ledger.as_ref(), &run, json).await,
        Commands::Replay { run, json } => cmd_replay(ledger.as_ref(), &run, json).await,
        Commands::Rerun { run } => cmd_rerun(ledger, &run).await,
        Commands::Diff { run_a, run_b, json } => {
            cmd_diff(ledger.as_ref(), &run_a, &run_b, json).await
        }
        Commands::Audit { run, hard } => cmd_audit(ledger.as_ref(), &run, hard).await,
    }
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))
}

fn print_outcome(outcome: &RunOutcome) {
    println!("Run: {}", outcome.run_id);
    println!(
        "Status: {}",
        if outcome.cancelled {
            "cancelled"
        } else if outcome.success {
            "success"
        } else {
            "completed with unaccepted entries"
        }
    );
    println!("Duration: {}ms", outcome.duration_ms);
    println!();

    for entry in &outcome.outcomes {
        let score = entry
            .final_score
            .map(|s| format!("{s:.3}"))
            .unwrap_or_else(|| "-".to_string());
        let flag = if entry.needs_attention {
            "  [needs attention]"
        } else {
            ""
        };
        println!(
            "  {:<24} {:<10} iterations: {}  score: {}{}",
            entry.entry_id, entry.status, entry.iterations, score, flag
        );
    }

    println!();
    println!(
        "Accepted: {}/{}",
        outcome.accepted_count(),
        outcome.outcomes.len()
    );
}

/// Run a figure plan through the generation-critique loop
async fn cmd_generate(
    ledger: Arc<FsRunLedger>,
    plan_path: &PathBuf,
    sections_path: &PathBuf,
    paper: Option<String>,
    config: RunConfig,
) -> Result<()> {
    let entries: Vec<FigurePlanEntry> = read_json_file(plan_path)?;
    let sections: SectionSet = read_json_file(sections_path)?;

    let planner = StaticPlanner::new(entries);
    let plan = planner
        .plan(&sections)
        .await
        .context("Planning failed")?;
    if plan.is_empty() {
        anyhow::bail!("Plan is empty: {:?}", plan_path);
    }

    let metadata = RunMetadata {
        paper_path: paper,
        rerun_of: None,
        tags: serde_json::json!({}),
    };

    let orchestrator = Orchestrator::new(
        Arc::new(HeuristicGenerator::new()),
        Arc::new(HeuristicCritic::new(
            config.overall_threshold,
            config.dimension_threshold,
        )),
        ledger,
        config,
    );

    let outcome = orchestrator
        .execute(plan, sections, metadata, CancelFlag::new())
        .await
        .context("Generation run failed")?;

    print_outcome(&outcome);
    Ok(())
}

/// List recorded runs
async fn cmd_list(ledger: &dyn RunLedger) -> Result<()> {
    let mut runs = ledger.list_runs().await?;
    if runs.is_empty() {
        println!("No runs recorded.");
        return Ok(());
    }
    runs.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    for record in runs {
        let success = record
            .summary
            .as_ref()
            .map(|s| if s.success { "ok" } else { "partial" })
            .unwrap_or("-");
        println!(
            "{}  {:?}  {}  {}",
            record.run_id,
            record.status,
            record.created_at.format("%Y-%m-%d %H:%M:%S"),
            success
        );
    }
    Ok(())
}

/// Show per-entry outcomes and aggregates for a run
async fn cmd_inspect(ledger: &dyn RunLedger, run: &str, json: bool) -> Result<()> {
    let inspection = inspect(ledger, &RunId(run.to_string()))
        .await
        .with_context(|| format!("Failed to inspect run: {run}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&inspection)?);
        return Ok(());
    }

    println!("Run: {}", inspection.run_id);
    println!("Status: {:?}", inspection.status);
    println!("Config digest: {}", &inspection.config_digest[..12]);
    println!("Events: {}", inspection.event_count);
    if let Some(rerun_of) = &inspection.metadata.rerun_of {
        println!("Rerun of: {rerun_of}");
    }
    println!();

    let agg = &inspection.aggregate;
    println!(
        "Entries: {} (accepted {}, exhausted {}, failed {}, cancelled {})",
        agg.total_entries,
        agg.accepted_count,
        agg.exhausted_count,
        agg.failed_count,
        agg.cancelled_count
    );
    if let Some(score) = agg.avg_final_score {
        println!("Avg final score: {score:.3}");
    }
    if let Some(coverage) = agg.avg_traceability_coverage {
        println!("Avg traceability coverage: {coverage:.3}");
    }
    if !agg.max_iterations_hit.is_empty() {
        println!(
            "Hit iteration bound: {}",
            agg.max_iterations_hit.join(", ")
        );
    }
    Ok(())
}

/// Reconstruct a run's outcomes from the ledger alone
async fn cmd_replay(ledger: &dyn RunLedger, run: &str, json: bool) -> Result<()> {
    let summary = replay(ledger, &RunId(run.to_string()))
        .await
        .with_context(|| format!("Replay failed for run: {run}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Run: {}", summary.run_id);
    println!("Status: {:?}", summary.status);
    println!("Events: {}", summary.event_count);
    println!("Replay digest: {}", summary.replay_digest);
    println!(
        "Consistent with summary: {}",
        if summary.consistent { "yes" } else { "NO" }
    );
    println!();

    for entry in &summary.entries {
        let score = entry
            .final_score
            .map(|s| format!("{s:.3}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<24} {:<10} iterations: {}  score: {}",
            entry.entry_id, entry.status, entry.iterations, score
        );
    }
    Ok(())
}

/// Re-execute a recorded run against live capabilities
async fn cmd_rerun(ledger: Arc<FsRunLedger>, run: &str) -> Result<()> {
    let record = ledger.get_run(&RunId(run.to_string())).await?;
    let config: RunConfig = serde_json::from_value(record.config.clone())
        .context("Stored run config is not readable")?;

    let outcome = rerun(
        ledger,
        &RunId(run.to_string()),
        Arc::new(HeuristicGenerator::new()),
        Arc::new(HeuristicCritic::new(
            config.overall_threshold,
            config.dimension_threshold,
        )),
        CancelFlag::new(),
    )
    .await
    .with_context(|| format!("Rerun failed for run: {run}"))?;

    println!("Rerun of {run}");
    print_outcome(&outcome);
    Ok(())
}

/// Compare two runs entry by entry
async fn cmd_diff(ledger: &dyn RunLedger, run_a: &str, run_b: &str, json: bool) -> Result<()> {
    let report = diff_runs(
        ledger,
        &RunId(run_a.to_string()),
        &RunId(run_b.to_string()),
    )
    .await
    .context("Diff failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("A: {}", report.run_id_1);
    println!("B: {}", report.run_id_2);
    println!();

    if report.identical {
        println!("Runs are identical.");
    } else {
        for change in &report.changes {
            match change {
                EntryChange::Added { entry_id } => println!("  + {entry_id}"),
                EntryChange::Removed { entry_id } => println!("  - {entry_id}"),
                EntryChange::Modified { entry_id, fields } => {
                    println!("  ~ {entry_id}");
                    for field in fields {
                        println!("      {} : {} -> {}", field.field, field.left, field.right);
                    }
                }
            }
        }
        println!();
    }

    let m = &report.metrics;
    println!(
        "accepted_count: {} -> {} ({:+})",
        m.accepted_count.left, m.accepted_count.right, m.accepted_count.delta
    );
    println!(
        "avg_final_score: {:.3} -> {:.3} ({:+.3})",
        m.avg_final_score.left, m.avg_final_score.right, m.avg_final_score.delta
    );
    println!(
        "avg_traceability_coverage: {:.3} -> {:.3} ({:+.3})",
        m.avg_traceability_coverage.left,
        m.avg_traceability_coverage.right,
        m.avg_traceability_coverage.delta
    );
    Ok(())
}

/// Cross-check a run's record, summary, and event stream
async fn cmd_audit(ledger: &dyn RunLedger, run: &str, hard: bool) -> Result<()> {
    let mode = if hard { AuditMode::Hard } else { AuditMode::Soft };
    let report = audit(ledger, &RunId(run.to_string()), mode)
        .await
        .with_context(|| format!("Audit failed for run: {run}"))?;

    println!("Audit for {}", report.run_id);
    for check in &report.checks {
        let status = if check.passed { "pass" } else { "FAIL" };
        print!("  [{status}] {}", check.description);
        if let Some(message) = &check.message {
            print!(" ({message})");
        }
        println!();
    }
    println!();
    println!(
        "Result: {} ({} of {} checks failed)",
        if report.passed { "passed" } else { "failed" },
        report.failures(),
        report.checks.len()
    );
    Ok(())
}
