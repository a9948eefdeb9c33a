//! Timing and host configuration.

use serde::{Deserialize, Serialize};

use crate::watcher::Millis;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Runtime configuration. Every field has a default, so a partial JSON
/// object is a valid override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtensionConfig {
    /// Quiet period before a mutation-triggered sweep
    pub debounce_ms: Millis,
    /// Interval of the fallback whole-document sweep
    pub periodic_ms: Millis,
    /// Window event fired when the site finishes an in-app navigation
    pub navigation_event: String,
    /// Match pattern for tabs that run the content script
    pub tab_url_pattern: String,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 250,
            periodic_ms: 2000,
            navigation_event: "yt-navigate-finish".to_string(),
            tab_url_pattern: "*://*.youtube.com/*".to_string(),
        }
    }
}

impl ExtensionConfig {
    /// Parse overrides from JSON. `None` or blank input yields the defaults.
    pub fn from_json(text: Option<&str>) -> Result<Self, ConfigError> {
        let config = match text.map(str::trim) {
            Some(text) if !text.is_empty() => serde_json::from_str(text)?,
            _ => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.debounce_ms == 0 {
            return Err(ConfigError::Invalid("debounceMs must be positive".to_string()));
        }
        if self.periodic_ms == 0 {
            return Err(ConfigError::Invalid("periodicMs must be positive".to_string()));
        }
        if self.navigation_event.is_empty() {
            return Err(ConfigError::Invalid("navigationEvent must not be empty".to_string()));
        }
        Ok(())
    }
}
