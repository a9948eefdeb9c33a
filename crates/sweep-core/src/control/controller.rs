//! Popup, options and background actions.

use crate::config::ExtensionConfig;
use crate::message::Message;
use crate::settings::{Settings, SettingsPatch};
use crate::store::SettingsStore;

use super::view::{badge_text, PopupView};
use super::{broadcast, Badge, TabMessenger};

/// Store, tab messaging and badge access for one UI surface.
///
/// Every action persists first, then notifies matching tabs. Store and
/// platform failures are logged and swallowed: the UI keeps working and
/// simply shows whatever the store holds afterwards.
pub struct Controller<S, T, B> {
    store: S,
    tabs: T,
    badge: B,
    tab_pattern: String,
}

impl<S, T, B> Controller<S, T, B>
where
    S: SettingsStore,
    T: TabMessenger,
    B: Badge,
{
    pub fn new(store: S, tabs: T, badge: B, config: &ExtensionConfig) -> Self {
        Self {
            store,
            tabs,
            badge,
            tab_pattern: config.tab_url_pattern.clone(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current settings, with defaults for anything missing.
    pub async fn settings(&self) -> Settings {
        self.store.get().await
    }

    /// Re-read the store, update the badge and compute the popup view.
    pub async fn refresh(&self) -> PopupView {
        let settings = self.store.get().await;
        self.show_badge(settings.enabled).await;
        PopupView::from(&settings)
    }

    /// Flip `enabled`, persist it and tell every tab.
    pub async fn toggle_enabled(&self) -> PopupView {
        let enabled = !self.store.get().await.enabled;
        self.persist(SettingsPatch::enabled(enabled)).await;
        self.notify(&Message::ToggleEnabled { enabled }).await;
        self.refresh().await
    }

    /// Flip `restoreVolumeAfterAd`, persist it and ask tabs to reload options.
    pub async fn toggle_restore_volume(&self) -> PopupView {
        let restore = !self.store.get().await.restore_volume_after_ad;
        self.persist(SettingsPatch::restore_volume_after_ad(restore)).await;
        self.notify(&Message::OptionsUpdated).await;
        self.refresh().await
    }

    /// Zero the counter everywhere.
    pub async fn reset_counter(&self) -> PopupView {
        self.persist(SettingsPatch::blocked_ads(0)).await;
        self.notify(&Message::ResetCounter).await;
        self.refresh().await
    }

    /// Options page save.
    pub async fn save_options(&self, enabled: bool, restore_volume_after_ad: bool) {
        self.persist(SettingsPatch {
            enabled: Some(enabled),
            restore_volume_after_ad: Some(restore_volume_after_ad),
            blocked_ads: None,
        })
        .await;
        self.notify(&Message::OptionsUpdated).await;
    }

    /// Background install hook: write every key with defaults filled in and
    /// show the initial badge.
    pub async fn install_defaults(&self) -> Settings {
        let settings = self.store.get().await;
        self.persist(settings.to_patch()).await;
        self.show_badge(settings.enabled).await;
        log::info!("AdSweep installed/initialized");
        settings
    }

    async fn persist(&self, patch: SettingsPatch) {
        if let Err(e) = self.store.set(patch).await {
            log::warn!("Failed to save settings: {}", e);
        }
    }

    async fn notify(&self, message: &Message) -> usize {
        broadcast(&self.tabs, &self.tab_pattern, message).await
    }

    async fn show_badge(&self, enabled: bool) {
        if let Err(e) = self.badge.set_text(badge_text(enabled)).await {
            log::debug!("Badge not updated: {}", e);
        }
    }
}
