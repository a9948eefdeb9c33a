//! Extension API access (`chrome.storage`, `chrome.tabs`, `chrome.action`).
//!
//! Looked up through `Reflect` at call time, so the same module loads in the
//! content script, popup, options page and background worker.

use js_sys::{Array, Function, Object, Promise, Reflect, JSON};
use serde_json::Value;
use sweep_core::control::{Badge, MessagingError, PlatformError, TabId, TabMessenger};
use sweep_core::{Message, Settings, SettingsPatch, SettingsStore, StoreError};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

/// Resolve `chrome.<path>`.
pub fn namespace(path: &[&str]) -> Result<JsValue, JsValue> {
    let mut current = Reflect::get(&js_sys::global(), &"chrome".into())?;
    for segment in path {
        if current.is_undefined() || current.is_null() {
            break;
        }
        current = Reflect::get(&current, &JsValue::from_str(segment))?;
    }

    if current.is_undefined() || current.is_null() {
        return Err(JsValue::from_str(&format!(
            "chrome.{} is not available",
            path.join(".")
        )));
    }
    Ok(current)
}

/// Call `target[method](...args)`.
pub fn invoke(target: &JsValue, method: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let function: Function = Reflect::get(target, &JsValue::from_str(method))?.dyn_into()?;
    let arguments: Array = args.iter().collect();
    function.apply(target, &arguments)
}

/// Call `target[method](...args)` and await the promise it returns, if any.
pub async fn call(target: &JsValue, method: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let result = invoke(target, method, args)?;
    match result.dyn_into::<Promise>() {
        Ok(promise) => JsFuture::from(promise).await,
        Err(value) => Ok(value),
    }
}

pub fn to_js(value: &Value) -> Result<JsValue, JsValue> {
    JSON::parse(&value.to_string())
}

/// Copy a structured-clonable JS value into `serde_json`. Anything that does
/// not survive `JSON.stringify` becomes `null`.
pub fn from_js(value: &JsValue) -> Value {
    if value.is_undefined() {
        return Value::Null;
    }
    JSON::stringify(value)
        .ok()
        .map(String::from)
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or(Value::Null)
}

/// Best-effort text of a thrown JS value.
pub fn describe(error: &JsValue) -> String {
    error
        .as_string()
        .or_else(|| {
            Reflect::get(error, &"message".into())
                .ok()
                .and_then(|message| message.as_string())
        })
        .unwrap_or_else(|| format!("{:?}", error))
}

/// `chrome.runtime.openOptionsPage()`
pub async fn open_options_page() -> Result<(), JsValue> {
    let runtime = namespace(&["runtime"])?;
    call(&runtime, "openOptionsPage", &[]).await?;
    Ok(())
}

/// `chrome.storage.local`
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeStore;

impl ChromeStore {
    async fn read(&self) -> Result<Settings, JsValue> {
        let defaults = serde_json::to_value(Settings::default()).unwrap_or(Value::Null);
        let local = namespace(&["storage", "local"])?;
        let items = call(&local, "get", &[to_js(&defaults)?]).await?;
        Ok(Settings::from_value(from_js(&items)))
    }
}

impl SettingsStore for ChromeStore {
    async fn get(&self) -> Settings {
        match self.read().await {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Failed to read settings, using defaults: {}", describe(&e));
                Settings::default()
            }
        }
    }

    async fn set(&self, patch: SettingsPatch) -> Result<(), StoreError> {
        let value = serde_json::to_value(patch).map_err(|e| StoreError::Encode(e.to_string()))?;
        let items = to_js(&value).map_err(|e| StoreError::Platform(describe(&e)))?;
        let local = namespace(&["storage", "local"]).map_err(|e| StoreError::Platform(describe(&e)))?;
        call(&local, "set", &[items])
            .await
            .map_err(|e| StoreError::Platform(describe(&e)))?;
        Ok(())
    }
}

/// `chrome.tabs`
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeTabs;

impl ChromeTabs {
    async fn query(&self, pattern: &str) -> Result<Vec<TabId>, JsValue> {
        let tabs = namespace(&["tabs"])?;
        let query = Object::new();
        Reflect::set(&query, &"url".into(), &JsValue::from_str(pattern))?;
        let list = call(&tabs, "query", &[query.into()]).await?;

        let ids = Array::from(&list)
            .iter()
            .filter_map(|tab| Reflect::get(&tab, &"id".into()).ok()?.as_f64())
            .map(|id| id as TabId)
            .collect();
        Ok(ids)
    }
}

impl TabMessenger for ChromeTabs {
    async fn matching_tabs(&self, pattern: &str) -> Vec<TabId> {
        self.query(pattern).await.unwrap_or_else(|e| {
            log::debug!("Tab query failed: {}", describe(&e));
            Vec::new()
        })
    }

    async fn send(&self, tab: TabId, message: &Message) -> Result<(), MessagingError> {
        let tabs = namespace(&["tabs"]).map_err(|e| MessagingError::Platform(describe(&e)))?;
        let payload = to_js(&message.to_value()).map_err(|e| MessagingError::Platform(describe(&e)))?;
        // Rejects with "Receiving end does not exist" when no content script runs.
        call(&tabs, "sendMessage", &[JsValue::from(tab), payload])
            .await
            .map_err(|_| MessagingError::NoReceiver(tab))?;
        Ok(())
    }
}

/// `chrome.action` badge
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeBadge;

impl Badge for ChromeBadge {
    async fn set_text(&self, text: &str) -> Result<(), PlatformError> {
        let details = Object::new();
        Reflect::set(&details, &"text".into(), &JsValue::from_str(text))
            .map_err(|e| PlatformError(describe(&e)))?;
        let action = namespace(&["action"]).map_err(|e| PlatformError(describe(&e)))?;
        call(&action, "setBadgeText", &[details.into()])
            .await
            .map_err(|e| PlatformError(describe(&e)))?;
        Ok(())
    }
}
