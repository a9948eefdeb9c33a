//! Control message protocol
//!
//! Popup and options pages send JSON objects with a `type` discriminator to
//! the content runtime of every matching tab:
//!
//! ```json
//! { "type": "TOGGLE_ENABLED", "enabled": false }
//! { "type": "OPTIONS_UPDATED" }
//! { "type": "RESET_COUNTER" }
//! ```
//!
//! Anything else is not handled and gets no response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::runtime::RuntimeContext;
use crate::settings::SettingsPatch;
use crate::store::SettingsStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Set the in-memory enabled flag. Not persisted by the receiver.
    ToggleEnabled {
        #[serde(default, deserialize_with = "crate::settings::truthy")]
        enabled: bool,
    },
    /// Re-read `enabled` and `restoreVolumeAfterAd` from the store.
    OptionsUpdated,
    /// Zero the persisted and in-memory counter.
    ResetCounter,
}

impl Message {
    /// Decode an incoming message; `None` for anything unrecognized.
    pub fn parse(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Acknowledgement sent back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            ok: true,
            enabled: None,
        }
    }

    pub fn enabled(enabled: bool) -> Self {
        Self {
            ok: true,
            enabled: Some(enabled),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Apply `message` to the runtime context.
///
/// Store failures are logged and swallowed; the caller always gets `ok`.
pub async fn handle<S: SettingsStore>(
    context: &RuntimeContext,
    store: &S,
    message: Message,
) -> Response {
    match message {
        Message::ToggleEnabled { enabled } => {
            context.set_enabled(enabled);
            log::debug!("Enabled set to {}", enabled);
            Response::enabled(enabled)
        }
        Message::OptionsUpdated => {
            let settings = store.get().await;
            context.apply_options(&settings);
            log::debug!(
                "Options reloaded: enabled={}, restoreVolumeAfterAd={}",
                settings.enabled,
                settings.restore_volume_after_ad
            );
            Response::ok()
        }
        Message::ResetCounter => {
            context.set_blocked_count(0);
            if let Err(e) = store.set(SettingsPatch::blocked_ads(0)).await {
                log::debug!("Failed to reset counter: {}", e);
            }
            Response::ok()
        }
    }
}

/// Decode and apply a raw message. `None` means "not handled".
pub async fn handle_raw<S: SettingsStore>(
    context: &RuntimeContext,
    store: &S,
    raw: &Value,
) -> Option<Response> {
    let message = Message::parse(raw)?;
    Some(handle(context, store, message).await)
}
