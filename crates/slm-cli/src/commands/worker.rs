//! Worker management CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use slm_core::error::AppError;
use slm_core::traits::DeferredExecutor;
use slm_entity::job::{ACCOUNTING_QUEUE, CreateJob, DELAYED_RECALCULATION, Job};

use super::CliContext;
use crate::output::{self, OutputFormat};

/// Arguments for worker commands
#[derive(Debug, Args)]
pub struct WorkerArgs {
    /// Worker subcommand
    #[command(subcommand)]
    pub command: WorkerCommand,
}

/// Worker subcommands
#[derive(Debug, Subcommand)]
pub enum WorkerCommand {
    /// Show worker/queue status
    Status,
    /// Enqueue a job of the given type to run now
    Trigger {
        /// Job type to trigger
        job_type: String,
    },
}

/// Job status row
#[derive(Debug, Serialize, Tabled)]
struct JobRow {
    /// Job type
    #[tabled(rename = "type")]
    job_type: String,
    /// Status
    status: String,
    /// Attempts so far
    attempts: String,
    /// Due time
    scheduled_at: String,
    /// Last error
    error: String,
}

impl From<&Job> for JobRow {
    fn from(job: &Job) -> Self {
        Self {
            job_type: job.job_type.clone(),
            status: job.status.to_string(),
            attempts: format!("{}/{}", job.attempts, job.max_attempts),
            scheduled_at: job.scheduled_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            error: job.error_message.clone().unwrap_or_default(),
        }
    }
}

/// Execute worker commands
pub async fn execute(
    args: &WorkerArgs,
    ctx: &CliContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        WorkerCommand::Status => {
            let stats = ctx.queue.stats().await?;
            let pending_recalculation = ctx.queue.is_scheduled(DELAYED_RECALCULATION).await?;
            let recent = ctx.queue.recent(slm_core::types::PageRequest::new(1, 10)).await?;

            match format {
                OutputFormat::Json => output::print_json(&serde_json::json!({
                    "stats": stats,
                    "recalculation_pending": pending_recalculation,
                    "recent": recent.items,
                })),
                OutputFormat::Table => {
                    println!("Worker Queue Status:");
                    output::print_kv("Pending", &stats.pending.to_string());
                    output::print_kv("Running", &stats.running.to_string());
                    output::print_kv("Completed", &stats.completed.to_string());
                    output::print_kv("Failed", &stats.failed.to_string());
                    output::print_kv("Cancelled", &stats.cancelled.to_string());
                    output::print_kv("Recalculation Pending", output::yes_no(pending_recalculation));
                    output::print_kv("Worker Enabled", output::yes_no(ctx.config.worker.enabled));
                    output::print_kv("Concurrency", &ctx.config.worker.concurrency.to_string());
                    println!();
                    let rows: Vec<JobRow> = recent.items.iter().map(JobRow::from).collect();
                    output::print_list(&rows, format);
                }
            }
        }
        WorkerCommand::Trigger { job_type } => {
            let data = CreateJob::new(job_type.as_str(), ACCOUNTING_QUEUE).dedup(job_type.as_str());
            match ctx.queue.enqueue(data).await? {
                Some(job) => {
                    output::print_success(&format!("Job '{job_type}' enqueued (id: {})", job.id));
                }
                None => output::print_warning(&format!("Job '{job_type}' is already pending")),
            }
        }
    }

    Ok(())
}
