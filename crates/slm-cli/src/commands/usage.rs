//! Usage reporting command.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use slm_core::error::AppError;

use super::CliContext;
use crate::output::{self, OutputFormat};

/// Arguments for the usage command
#[derive(Debug, Args)]
pub struct UsageArgs {
    /// Also list stored objects grouped by type
    #[arg(long)]
    pub files: bool,
}

/// Object count per type
#[derive(Debug, Serialize, Tabled)]
struct TypeRow {
    /// Top-level MIME type
    #[tabled(rename = "type")]
    mime_type: String,
    /// Number of objects
    count: u64,
}

/// Execute the usage command
pub async fn execute(
    args: &UsageArgs,
    ctx: &CliContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    let snapshot = ctx.services.stats.get_snapshot().await?;
    let settings = ctx.services.settings.get_settings().await?;

    match format {
        OutputFormat::Json => output::print_json(&snapshot),
        OutputFormat::Table => {
            println!("Storage Usage:");
            output::print_kv("Used", &snapshot.formatted.total);
            if settings.unlimited {
                output::print_kv("Limit", "unlimited");
            } else {
                output::print_kv("Limit", &snapshot.formatted.max);
                output::print_kv("Remaining", &snapshot.formatted.remaining);
            }
            output::print_kv("Percentage", &snapshot.formatted.percentage);
            output::print_kv("Status", snapshot.status.as_str());
            output::print_kv("Uploads Blocked", output::yes_no(settings.block_uploads));
            let updated = snapshot
                .last_updated
                .map_or_else(|| "never".to_string(), |t| t.to_rfc3339());
            output::print_kv("Last Updated", &updated);
        }
    }

    if ctx.services.scheduler.take_auto_recalculated().await? {
        output::print_success("Usage was recalculated automatically after recent changes.");
    }

    if args.files {
        let stats = ctx.services.stats.file_statistics().await?;
        let rows: Vec<TypeRow> = stats
            .by_type
            .into_iter()
            .map(|(mime_type, count)| TypeRow { mime_type, count })
            .collect();
        if format == OutputFormat::Table {
            println!();
            output::print_kv("Total Files", &stats.total_files.to_string());
        }
        output::print_list(&rows, format);
    }

    Ok(())
}
