//! Activation and uninstall commands.

use clap::Args;

use slm_core::error::AppError;

use super::CliContext;
use crate::output::{self, OutputFormat};

/// Arguments for the uninstall command
#[derive(Debug, Args)]
pub struct UninstallArgs {
    /// Skip confirmation prompt
    #[arg(long)]
    pub force: bool,
}

/// Store defaults if absent and run the initial recalculation
pub async fn activate(ctx: &CliContext, format: OutputFormat) -> Result<(), AppError> {
    let report = ctx.services.activate().await?;
    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Table => {
            output::print_success("Storage accounting activated");
            output::print_kv("Files Counted", &report.processed_count.to_string());
            output::print_kv("Total Bytes", &report.total_bytes.to_string());
        }
    }
    Ok(())
}

/// Delete settings, the usage record, and recalculation flags
pub async fn uninstall(args: &UninstallArgs, ctx: &CliContext) -> Result<(), AppError> {
    if !args.force {
        let confirm = dialoguer::Confirm::new()
            .with_prompt("This deletes the quota settings and the usage record. Continue?")
            .default(false)
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

        if !confirm {
            println!("Cancelled.");
            return Ok(());
        }
    }

    ctx.services.uninstall().await?;
    output::print_success("Accounting data removed");
    Ok(())
}
