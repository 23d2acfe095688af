//! Quota settings and upload decisions.

pub mod config;
pub mod decision;
pub mod export;
pub mod settings;

pub use config::QuotaConfig;
pub use decision::{UploadDecision, UploadRestrictions};
pub use export::SettingsExport;
pub use settings::{NoticeLevel, QuotaSettings, SettingsNotice, SettingsPatch};
