//! CLI command definitions and dispatch.

pub mod check;
pub mod config;
pub mod lifecycle;
pub mod migrate;
pub mod recalculate;
pub mod settings;
pub mod usage;
pub mod worker;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use slm_cache::CacheManager;
use slm_core::config::AppConfig;
use slm_core::error::AppError;
use slm_database::{AttachmentRepository, DatabasePool, PgJobStore, PgOptionStore};
use slm_service::{AccountingDeps, AccountingServices, EventBus, ServiceOptions};
use slm_worker::JobQueue;

use crate::output::OutputFormat;

/// Storage limit manager administration
#[derive(Debug, Parser)]
#[command(name = "slm-cli", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show storage usage against the quota
    Usage(usage::UsageArgs),
    /// Recompute usage from the stored files
    Recalculate(recalculate::RecalculateArgs),
    /// Check whether uploads of the given sizes would be accepted
    Check(check::CheckArgs),
    /// Quota settings management
    Settings(settings::SettingsArgs),
    /// Store default settings and compute the initial usage
    Activate,
    /// Remove all persisted accounting data
    Uninstall(lifecycle::UninstallArgs),
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Configuration management
    Config(config::ConfigArgs),
    /// Worker management
    Worker(worker::WorkerArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => return migrate::execute(args, &self.config).await,
            Commands::Config(args) => return config::execute(args, &self.config, self.format).await,
            _ => {}
        }

        let ctx = CliContext::connect(&self.config).await?;
        match &self.command {
            Commands::Usage(args) => usage::execute(args, &ctx, self.format).await,
            Commands::Recalculate(args) => recalculate::execute(args, &ctx, self.format).await,
            Commands::Check(args) => check::execute(args, &ctx, self.format).await,
            Commands::Settings(args) => settings::execute(args, &ctx, self.format).await,
            Commands::Activate => lifecycle::activate(&ctx, self.format).await,
            Commands::Uninstall(args) => lifecycle::uninstall(args, &ctx).await,
            Commands::Worker(args) => worker::execute(args, &ctx, self.format).await,
            Commands::Migrate(_) | Commands::Config(_) => Ok(()),
        }
    }
}

/// Connections and services shared by the data commands
#[derive(Debug)]
pub struct CliContext {
    /// Loaded configuration
    pub config: AppConfig,
    /// Database pool
    pub db: DatabasePool,
    /// Job queue backing deferred recalculation
    pub queue: Arc<JobQueue>,
    /// Accounting services
    pub services: AccountingServices,
}

impl CliContext {
    /// Load configuration and wire the services against PostgreSQL
    pub async fn connect(config_path: &str) -> Result<Self, AppError> {
        let config = load_config(config_path)?;
        let db = DatabasePool::connect(&config.database).await?;
        let pool = db.pool().clone();

        let jobs = Arc::new(PgJobStore::new(pool.clone()));
        let queue = Arc::new(JobQueue::new(jobs, format!("slm-cli-{}", std::process::id())));
        let cache = CacheManager::new(&config.cache).await?;

        let services = AccountingServices::new(
            AccountingDeps {
                options: Arc::new(PgOptionStore::new(pool.clone())),
                objects: Arc::new(AttachmentRepository::new(
                    pool,
                    &config.accounting.uploads_dir,
                )),
                cache: Arc::new(cache),
                deferred: queue.clone(),
                events: Arc::new(EventBus::default()),
            },
            ServiceOptions::from(&config),
        );

        Ok(Self {
            config,
            db,
            queue,
            services,
        })
    }
}

/// Helper: load configuration, overlaying `config/{SLM_ENV}.toml`
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    let env = std::env::var("SLM_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(config_path, &env)
}

/// Helper: parse a size such as `512`, `10KB`, `2.5MB` or `1GB` (binary
/// multiples) into bytes
pub fn parse_size(input: &str) -> Result<u64, String> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    let number: f64 = number
        .trim()
        .parse()
        .map_err(|_| format!("invalid size '{input}'"))?;
    if !number.is_finite() || number < 0.0 {
        return Err(format!("invalid size '{input}'"));
    }

    let multiplier: u64 = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" => 1 << 10,
        "M" | "MB" => 1 << 20,
        "G" | "GB" => 1 << 30,
        "T" | "TB" => 1 << 40,
        other => return Err(format!("unknown size unit '{other}'")),
    };
    Ok((number * multiplier as f64).round() as u64)
}
