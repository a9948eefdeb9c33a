//! Persisted user settings.
//!
//! Values come back from the browser store as arbitrary JSON, so reading is
//! forgiving: booleans follow JavaScript truthiness and the
//! counter accepts any finite non-negative number or numeric string.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Full settings record with defaults filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(deserialize_with = "truthy")]
    pub enabled: bool,
    #[serde(deserialize_with = "truthy")]
    pub restore_volume_after_ad: bool,
    #[serde(deserialize_with = "counter")]
    pub blocked_ads: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            restore_volume_after_ad: true,
            blocked_ads: 0,
        }
    }
}

impl Settings {
    /// Decode a store result, treating anything unreadable as "all defaults".
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(_) => serde_json::from_value(value).unwrap_or_else(|e| {
                log::debug!("Unreadable settings, using defaults: {}", e);
                Self::default()
            }),
            _ => Self::default(),
        }
    }

    /// Patch that writes every key of this record.
    pub fn to_patch(&self) -> SettingsPatch {
        SettingsPatch {
            enabled: Some(self.enabled),
            restore_volume_after_ad: Some(self.restore_volume_after_ad),
            blocked_ads: Some(self.blocked_ads),
        }
    }
}

/// Partial settings write; absent keys are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restore_volume_after_ad: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_ads: Option<u64>,
}

impl SettingsPatch {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }

    pub fn restore_volume_after_ad(restore: bool) -> Self {
        Self {
            restore_volume_after_ad: Some(restore),
            ..Self::default()
        }
    }

    pub fn blocked_ads(count: u64) -> Self {
        Self {
            blocked_ads: Some(count),
            ..Self::default()
        }
    }
}

/// JavaScript truthiness of a JSON value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// `Number(value) || 0`, truncated to a non-negative integer.
pub fn count_from_value(value: &Value) -> u64 {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(true) => Some(1.0),
        _ => None,
    };
    match number {
        Some(f) if f.is_finite() && f > 0.0 => f as u64,
        _ => 0,
    }
}

pub(crate) fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(is_truthy(&value))
}

fn counter<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(count_from_value(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.enabled);
        assert!(settings.restore_volume_after_ad);
        assert_eq!(settings.blocked_ads, 0);
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let settings = Settings::from_value(json!({ "blockedAds": 7 }));
        assert_eq!(
            settings,
            Settings {
                enabled: true,
                restore_volume_after_ad: true,
                blocked_ads: 7,
            }
        );
    }

    #[test]
    fn test_lenient_values() {
        let settings = Settings::from_value(json!({
            "enabled": 0,
            "restoreVolumeAfterAd": "yes",
            "blockedAds": "12.9"
        }));
        assert!(!settings.enabled);
        assert!(settings.restore_volume_after_ad);
        assert_eq!(settings.blocked_ads, 12);

        let settings = Settings::from_value(json!({
            "enabled": null,
            "blockedAds": -4
        }));
        assert!(!settings.enabled);
        assert_eq!(settings.blocked_ads, 0);

        let settings = Settings::from_value(json!({ "blockedAds": "lots" }));
        assert_eq!(settings.blocked_ads, 0);
    }

    #[test]
    fn test_non_object_is_default() {
        assert_eq!(Settings::from_value(json!(null)), Settings::default());
        assert_eq!(Settings::from_value(json!([1, 2])), Settings::default());
    }

    #[test]
    fn test_patch_serializes_only_present_keys() {
        let patch = SettingsPatch::blocked_ads(3);
        assert_eq!(serde_json::to_value(patch).unwrap(), json!({ "blockedAds": 3 }));

        let all = Settings::default().to_patch();
        assert_eq!(
            serde_json::to_value(all).unwrap(),
            json!({ "enabled": true, "restoreVolumeAfterAd": true, "blockedAds": 0 })
        );
    }
}
