//! Quota settings commands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use slm_core::error::AppError;
use slm_entity::quota::{NoticeLevel, QuotaSettings, SettingsExport, SettingsNotice, SettingsPatch};

use super::CliContext;
use crate::output::{self, OutputFormat};

/// Arguments for settings commands
#[derive(Debug, Args)]
pub struct SettingsArgs {
    /// Settings subcommand
    #[command(subcommand)]
    pub command: SettingsCommand,
}

/// Settings subcommands
#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show the current settings
    Get,
    /// Change one or more settings
    Set {
        /// Storage limit in megabytes
        #[arg(long, allow_negative_numbers = true)]
        max_mb: Option<i64>,
        /// Refuse uploads that would exceed the limit
        #[arg(long)]
        block_uploads: Option<bool>,
        /// Show the usage bar to administrators
        #[arg(long)]
        show_progress_bar: Option<bool>,
        /// Disable the limit entirely
        #[arg(long)]
        unlimited: Option<bool>,
    },
    /// Restore the configured defaults
    Reset,
    /// Write the settings as JSON
    Export {
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Load settings from an export file
    Import {
        /// Export file to read
        file: PathBuf,
    },
}

/// Execute settings commands
pub async fn execute(
    args: &SettingsArgs,
    ctx: &CliContext,
    format: OutputFormat,
) -> Result<(), AppError> {
    let settings = &ctx.services.settings;

    match &args.command {
        SettingsCommand::Get => {
            let current = settings.get_settings().await?;
            print_settings(&current, format);
        }
        SettingsCommand::Set {
            max_mb,
            block_uploads,
            show_progress_bar,
            unlimited,
        } => {
            let patch = SettingsPatch {
                max_storage_mb: *max_mb,
                show_progress_bar: *show_progress_bar,
                block_uploads: *block_uploads,
                unlimited: *unlimited,
            };
            let outcome = settings.update_settings(&patch).await?;
            print_notices(&outcome.notices);
            output::print_success("Settings saved");
            print_settings(&outcome.settings, format);
        }
        SettingsCommand::Reset => {
            let defaults = settings.reset_to_defaults().await?;
            output::print_success("Settings reset to defaults");
            print_settings(&defaults, format);
        }
        SettingsCommand::Export { output: path } => {
            let export = settings.export_settings().await?;
            let json = serde_json::to_string_pretty(&export)?;
            match path {
                Some(path) => {
                    tokio::fs::write(path, json).await?;
                    output::print_success(&format!("Settings exported to '{}'", path.display()));
                }
                None => println!("{json}"),
            }
        }
        SettingsCommand::Import { file } => {
            let raw = tokio::fs::read_to_string(file).await?;
            let export: SettingsExport = serde_json::from_str(&raw).map_err(|e| {
                AppError::validation(format!("'{}' is not a settings export: {e}", file.display()))
            })?;
            let outcome = settings.import_settings(&export).await?;
            print_notices(&outcome.notices);
            output::print_success(&format!("Settings imported from '{}'", file.display()));
            print_settings(&outcome.settings, format);
        }
    }

    Ok(())
}

fn print_settings(settings: &QuotaSettings, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_json(settings),
        OutputFormat::Table => {
            output::print_kv("Max Storage", &format!("{} MB", settings.max_storage_mb));
            output::print_kv("Block Uploads", output::yes_no(settings.block_uploads));
            output::print_kv("Show Progress Bar", output::yes_no(settings.show_progress_bar));
            output::print_kv("Unlimited", output::yes_no(settings.unlimited));
        }
    }
}

fn print_notices(notices: &[SettingsNotice]) {
    for notice in notices {
        match notice.level {
            NoticeLevel::Error => output::print_error(&notice.message),
            NoticeLevel::Warning => output::print_warning(&notice.message),
        }
    }
}
