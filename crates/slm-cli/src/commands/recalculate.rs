//! Recalculation command.

use clap::Args;

use slm_core::error::AppError;

use super::CliContext;
use crate::output::{self, OutputFormat};

/// Arguments for the recalculate command
#[derive(Debug, Args)]
pub struct RecalculateArgs {
    /// Hand the rescan to the worker after the debounce delay instead of
    /// running it now
    #[arg(long)]
    pub deferred: bool,
}

/// Execute the recalculate command
pub async fn execute(
    args: &RecalculateArgs,
    ctx: &CliContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    if args.deferred {
        if ctx.services.scheduler.schedule().await? {
            output::print_success(&format!(
                "Recalculation scheduled in {}s",
                ctx.config.scheduler.delay_seconds
            ));
        } else {
            output::print_warning("A recalculation is already pending");
        }
        return Ok(());
    }

    println!("Recalculating storage usage...");
    let report = ctx.services.scheduler.force_recalculate().await?;

    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Table => {
            output::print_success("Recalculation complete");
            output::print_kv(
                "Total",
                &slm_service::format::format_bytes(
                    report.total_bytes,
                    slm_service::format::DEFAULT_PRECISION,
                ),
            );
            output::print_kv("Files Counted", &report.processed_count.to_string());
            output::print_kv("Files Missing", &report.missing_count.to_string());
        }
    }

    if report.missing_count > 0 {
        output::print_warning(&format!(
            "{} stored objects have no file on disk",
            report.missing_count
        ));
    }
    Ok(())
}
