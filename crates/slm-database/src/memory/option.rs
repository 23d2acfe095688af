//! In-memory versioned options.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use slm_core::error::AppError;
use slm_core::result::AppResult;
use slm_core::traits::{OptionStore, VersionedValue};

/// A stored option; `value` is `None` once deleted.
#[derive(Debug, Clone)]
struct Slot {
    value: Option<Value>,
    version: i64,
}

/// [`OptionStore`] held in a map behind an async lock.
///
/// Deleted options keep their slot as a tombstone so versions keep
/// increasing across a delete and a later re-create.
#[derive(Debug, Default)]
pub struct MemoryOptionStore {
    entries: RwLock<HashMap<String, Slot>>,
    unavailable: AtomicBool,
}

impl MemoryOptionStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a persistence error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::persistence("Option store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl OptionStore for MemoryOptionStore {
    async fn get(&self, name: &str) -> AppResult<Option<VersionedValue>> {
        self.check()?;
        let entries = self.entries.read().await;
        Ok(entries.get(name).and_then(|slot| {
            slot.value.clone().map(|value| VersionedValue {
                value,
                version: slot.version,
            })
        }))
    }

    async fn put(&self, name: &str, value: &Value) -> AppResult<()> {
        self.check()?;
        let mut entries = self.entries.write().await;
        let version = entries.get(name).map_or(1, |slot| slot.version + 1);
        entries.insert(
            name.to_string(),
            Slot {
                value: Some(value.clone()),
                version,
            },
        );
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        name: &str,
        expected_version: Option<i64>,
        value: &Value,
    ) -> AppResult<bool> {
        self.check()?;
        let mut entries = self.entries.write().await;
        let slot = entries.get(name);
        let live_version = slot.filter(|s| s.value.is_some()).map(|s| s.version);
        if live_version != expected_version {
            return Ok(false);
        }
        let version = slot.map_or(1, |s| s.version + 1);
        entries.insert(
            name.to_string(),
            Slot {
                value: Some(value.clone()),
                version,
            },
        );
        Ok(true)
    }

    async fn delete(&self, name: &str) -> AppResult<bool> {
        self.check()?;
        let mut entries = self.entries.write().await;
        match entries.get_mut(name) {
            Some(slot) if slot.value.is_some() => {
                slot.value = None;
                slot.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
