//! Built-in selector catalog for the video site.

use crate::selector::SelectorSet;

/// Ad containers removed outright.
pub const AD_CONTAINERS: &[&str] = &[
    "ytd-display-ad-renderer",
    "ytd-promoted-video-renderer",
    "ytd-compact-promoted-video-renderer",
    "ytd-promoted-sparkles-text-renderer",
    "ytd-ads",
    "#player-ads",
    ".ytp-ad-overlay-slot",
    ".ytp-ad-module",
    ".video-ads",
    ".ytp-paid-content-overlay",
    ".ytp-ad-player-overlay",
];

/// "Skip ad" controls.
pub const SKIP_BUTTONS: &[&str] = &[".ytp-ad-skip-button", r#"button[aria-label="Skip ad"]"#];

/// "Close ad" controls.
pub const CLOSE_BUTTONS: &[&str] = &[
    ".ytp-ad-overlay-close-button",
    r#"button[aria-label="Close ad"]"#,
];

/// Any of these present means an ad is probably playing.
pub const AD_PRESENCE: &[&str] = &[
    ".ytp-ad-player-overlay",
    ".ytp-ad-module",
    ".ytp-ad-overlay-slot",
    ".ad-showing",
];

pub const VIDEO: &[&str] = &["video"];

/// Named groups, in the order tools list them.
pub const GROUPS: &[(&str, &[&str])] = &[
    ("ads", AD_CONTAINERS),
    ("skip", SKIP_BUTTONS),
    ("close", CLOSE_BUTTONS),
    ("presence", AD_PRESENCE),
    ("video", VIDEO),
];

/// Look up a selector group by name.
pub fn group(name: &str) -> Option<&'static [&'static str]> {
    GROUPS
        .iter()
        .find(|(group_name, _)| *group_name == name)
        .map(|(_, selectors)| *selectors)
}

/// Every selector group the suppression runtime works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdSelectorSet {
    pub ad_containers: SelectorSet,
    pub skip_buttons: SelectorSet,
    pub close_buttons: SelectorSet,
    pub ad_presence: SelectorSet,
    pub video: SelectorSet,
}

impl AdSelectorSet {
    /// The compiled-in catalog.
    pub fn builtin() -> Self {
        Self {
            ad_containers: SelectorSet::lenient(AD_CONTAINERS),
            skip_buttons: SelectorSet::lenient(SKIP_BUTTONS),
            close_buttons: SelectorSet::lenient(CLOSE_BUTTONS),
            ad_presence: SelectorSet::lenient(AD_PRESENCE),
            video: SelectorSet::lenient(VIDEO),
        }
    }
}

impl Default for AdSelectorSet {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_parses_every_selector() {
        for (name, selectors) in GROUPS {
            let set = SelectorSet::parse(*selectors);
            assert!(set.is_ok(), "group {} failed: {:?}", name, set.err());
        }

        let catalog = AdSelectorSet::builtin();
        assert_eq!(catalog.ad_containers.len(), AD_CONTAINERS.len());
        assert_eq!(catalog.skip_buttons.len(), 2);
        assert_eq!(catalog.close_buttons.len(), 2);
        assert_eq!(catalog.ad_presence.len(), 4);
        assert_eq!(catalog.video.len(), 1);
    }

    #[test]
    fn test_group_lookup() {
        assert_eq!(group("skip"), Some(SKIP_BUTTONS));
        assert_eq!(group("presence"), Some(AD_PRESENCE));
        assert_eq!(group("nope"), None);
    }

    #[test]
    fn test_skip_css_keeps_quotes() {
        let catalog = AdSelectorSet::builtin();
        assert_eq!(
            catalog.skip_buttons.css(),
            r#".ytp-ad-skip-button, button[aria-label="Skip ad"]"#
        );
    }
}
