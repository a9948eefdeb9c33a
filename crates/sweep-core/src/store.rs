//! Settings store contract and the blocked-ad counter.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::runtime::RuntimeContext;
use crate::settings::{Settings, SettingsPatch};

/// Error type for store writes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Platform(String),
    #[error("Failed to encode settings: {0}")]
    Encode(String),
}

/// Asynchronous key-value settings store.
///
/// `get` never fails: missing keys resolve to their defaults and platform
/// failures degrade to defaults. A single `set` becomes visible as a unit;
/// there is no ordering guarantee against writes from other instances.
#[allow(async_fn_in_trait)]
pub trait SettingsStore {
    async fn get(&self) -> Settings;
    async fn set(&self, patch: SettingsPatch) -> Result<(), StoreError>;
}

impl<T: SettingsStore + ?Sized> SettingsStore for &T {
    async fn get(&self) -> Settings {
        (**self).get().await
    }

    async fn set(&self, patch: SettingsPatch) -> Result<(), StoreError> {
        (**self).set(patch).await
    }
}

impl<T: SettingsStore + ?Sized> SettingsStore for Rc<T> {
    async fn get(&self) -> Settings {
        (**self).get().await
    }

    async fn set(&self, patch: SettingsPatch) -> Result<(), StoreError> {
        (**self).set(patch).await
    }
}

/// Add `count` to the persisted counter and mirror the result into `context`.
///
/// Plain read-modify-write: two overlapping calls can both read the same
/// value, and one increment is lost.
pub async fn record_blocked<S: SettingsStore>(
    store: &S,
    context: &RuntimeContext,
    count: u64,
) -> Result<u64, StoreError> {
    if count == 0 {
        return Ok(context.blocked_count());
    }

    let current = store.get().await.blocked_ads;
    let next = current.saturating_add(count);
    store.set(SettingsPatch::blocked_ads(next)).await?;
    context.set_blocked_count(next);
    log::debug!("Blocked counter {} -> {}", current, next);
    Ok(next)
}

/// In-memory store holding raw JSON values, like the browser's local storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RefCell<Map<String, Value>>,
    fail_writes: Cell<bool>,
    writes: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        let store = Self::new();
        store.write(&settings.to_patch());
        store
    }

    /// Store an arbitrary raw value under `key`.
    pub fn insert_raw(&self, key: &str, value: Value) {
        self.items.borrow_mut().insert(key.to_string(), value);
    }

    pub fn raw(&self, key: &str) -> Option<Value> {
        self.items.borrow().get(key).cloned()
    }

    /// Current settings without going through the async API.
    pub fn settings(&self) -> Settings {
        Settings::from_value(Value::Object(self.items.borrow().clone()))
    }

    /// Make every following `set` fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Number of successful `set` calls.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    fn write(&self, patch: &SettingsPatch) {
        if let Ok(Value::Object(values)) = serde_json::to_value(patch) {
            self.items.borrow_mut().extend(values);
        }
    }
}

impl SettingsStore for MemoryStore {
    async fn get(&self) -> Settings {
        self.settings()
    }

    async fn set(&self, patch: SettingsPatch) -> Result<(), StoreError> {
        if self.fail_writes.get() {
            return Err(StoreError::Platform("write rejected".to_string()));
        }
        self.write(&patch);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_defaults_when_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.get().await, Settings::default());
    }

    #[tokio::test]
    async fn test_set_is_partial() {
        let store = MemoryStore::new();
        store.set(SettingsPatch::enabled(false)).await.unwrap();
        let settings = store.get().await;
        assert!(!settings.enabled);
        assert!(settings.restore_volume_after_ad);
        assert_eq!(store.raw("enabled"), Some(json!(false)));
        assert_eq!(store.raw("blockedAds"), None);
    }

    #[tokio::test]
    async fn test_raw_values_read_leniently() {
        let store = MemoryStore::new();
        store.insert_raw("blockedAds", json!("41"));
        assert_eq!(store.get().await.blocked_ads, 41);
    }

    #[tokio::test]
    async fn test_record_blocked_adds_and_mirrors() {
        let store = MemoryStore::with_settings(Settings {
            blocked_ads: 5,
            ..Settings::default()
        });
        let context = RuntimeContext::new(&store.settings());

        let next = record_blocked(&store, &context, 3).await.unwrap();
        assert_eq!(next, 8);
        assert_eq!(store.settings().blocked_ads, 8);
        assert_eq!(context.blocked_count(), 8);
    }

    #[tokio::test]
    async fn test_record_blocked_zero_is_noop() {
        let store = MemoryStore::new();
        let context = RuntimeContext::default();
        record_blocked(&store, &context, 0).await.unwrap();
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_record_blocked_failed_write_keeps_context() {
        let store = MemoryStore::new();
        let context = RuntimeContext::default();
        store.fail_writes(true);
        assert!(record_blocked(&store, &context, 2).await.is_err());
        assert_eq!(context.blocked_count(), 0);
    }

    #[tokio::test]
    async fn test_store_through_rc() {
        let store = Rc::new(MemoryStore::new());
        store.set(SettingsPatch::blocked_ads(2)).await.unwrap();
        assert_eq!(store.get().await.blocked_ads, 2);
    }
}
