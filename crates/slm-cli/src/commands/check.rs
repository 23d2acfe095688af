//! Upload admission check command.

use clap::Args;

use slm_core::error::AppError;

use super::{CliContext, parse_size};
use crate::output::{self, OutputFormat};

/// Arguments for the check command
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// File sizes, e.g. `250MB`; several sizes are checked as one batch
    #[arg(required = true, value_parser = parse_size)]
    pub sizes: Vec<u64>,
}

/// Execute the check command. Fails when the upload would be refused.
pub async fn execute(args: &CheckArgs, ctx: &CliContext, format: OutputFormat) -> Result<(), AppError> {
    let decision = ctx.services.guard.evaluate_batch(&args.sizes).await?;
    let restrictions = ctx.services.guard.upload_restrictions().await?;

    match format {
        OutputFormat::Json => output::print_json(&decision),
        OutputFormat::Table => {
            output::print_kv("Current Usage", &decision.stats.formatted.total);
            output::print_kv("Limit", &decision.stats.formatted.max);
            output::print_kv("Blocking", output::yes_no(restrictions.blocking_enabled));
            if restrictions.blocking_enabled {
                let largest = ctx.services.guard.max_uploadable_size(None).await?;
                output::print_kv(
                    "Largest Upload",
                    &slm_service::format::format_bytes(
                        largest,
                        slm_service::format::DEFAULT_PRECISION,
                    ),
                );
            }
        }
    }

    if decision.allowed {
        output::print_success("Upload would be accepted");
        Ok(())
    } else {
        let message = decision
            .message
            .unwrap_or_else(|| "Upload would be refused".to_string());
        Err(AppError::quota_exceeded(message))
    }
}
