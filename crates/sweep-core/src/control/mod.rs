//! Control surfaces: popup, options page and background worker
//!
//! They never talk to the page directly. They write the settings store, then
//! notify every tab matching the host pattern with a [`Message`]; delivery is
//! best-effort and tabs without a live content runtime are skipped.

pub mod controller;
pub mod view;

pub use controller::Controller;
pub use view::{badge_text, PopupView};

use crate::message::Message;

/// Browser tab identifier.
pub type TabId = i32;

/// Error type for tab messaging.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessagingError {
    #[error("No content runtime in tab {0}")]
    NoReceiver(TabId),
    #[error("Messaging error: {0}")]
    Platform(String),
}

/// Failure reported by a platform call such as setting the badge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Platform error: {0}")]
pub struct PlatformError(pub String);

/// Tab enumeration and messaging.
#[allow(async_fn_in_trait)]
pub trait TabMessenger {
    /// Ids of open tabs whose URL matches `pattern`.
    async fn matching_tabs(&self, pattern: &str) -> Vec<TabId>;

    async fn send(&self, tab: TabId, message: &Message) -> Result<(), MessagingError>;
}

/// Toolbar badge.
#[allow(async_fn_in_trait)]
pub trait Badge {
    async fn set_text(&self, text: &str) -> Result<(), PlatformError>;
}

/// Send `message` to every tab matching `pattern`. Returns how many tabs
/// accepted it; failures are logged and otherwise ignored.
pub async fn broadcast<T: TabMessenger>(tabs: &T, pattern: &str, message: &Message) -> usize {
    let mut delivered = 0;
    for tab in tabs.matching_tabs(pattern).await {
        match tabs.send(tab, message).await {
            Ok(()) => delivered += 1,
            Err(e) => log::debug!("Message ignored: {}", e),
        }
    }
    delivered
}
