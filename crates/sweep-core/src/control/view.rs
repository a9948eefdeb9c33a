//! Text the popup and badge display for a settings record.

use crate::settings::Settings;

/// Status line shown after the options page saves.
pub const SAVED_STATUS: &str = "Saved!";

/// How long [`SAVED_STATUS`] stays visible.
pub const SAVED_STATUS_MS: i32 = 1400;

pub fn badge_text(enabled: bool) -> &'static str {
    if enabled {
        "ON"
    } else {
        "OFF"
    }
}

fn state_class(on: bool) -> &'static str {
    if on {
        "green"
    } else {
        "red"
    }
}

/// Labels and classes for the popup controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupView {
    pub toggle_label: &'static str,
    pub toggle_class: &'static str,
    pub mute_label: &'static str,
    pub mute_class: &'static str,
    pub count_text: String,
    pub badge: &'static str,
}

impl From<&Settings> for PopupView {
    fn from(settings: &Settings) -> Self {
        Self {
            toggle_label: if settings.enabled {
                "Disable Adblocker"
            } else {
                "Enable Adblocker"
            },
            toggle_class: state_class(settings.enabled),
            mute_label: if settings.restore_volume_after_ad {
                "Mute Ads: ON"
            } else {
                "Mute Ads: OFF"
            },
            mute_class: state_class(settings.restore_volume_after_ad),
            count_text: format!("Blocked Ads: {}", settings.blocked_ads),
            badge: badge_text(settings.enabled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_enabled() {
        let view = PopupView::from(&Settings {
            enabled: true,
            restore_volume_after_ad: true,
            blocked_ads: 42,
        });
        assert_eq!(view.toggle_label, "Disable Adblocker");
        assert_eq!(view.toggle_class, "green");
        assert_eq!(view.mute_label, "Mute Ads: ON");
        assert_eq!(view.count_text, "Blocked Ads: 42");
        assert_eq!(view.badge, "ON");
    }

    #[test]
    fn test_view_disabled() {
        let view = PopupView::from(&Settings {
            enabled: false,
            restore_volume_after_ad: false,
            blocked_ads: 0,
        });
        assert_eq!(view.toggle_label, "Enable Adblocker");
        assert_eq!(view.toggle_class, "red");
        assert_eq!(view.mute_label, "Mute Ads: OFF");
        assert_eq!(view.mute_class, "red");
        assert_eq!(view.badge, "OFF");
    }
}
