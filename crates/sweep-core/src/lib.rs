//! AdSweep Core Library
//!
//! Host-agnostic engine behind the AdSweep browser extension. Everything that
//! touches the page goes through the [`dom::Dom`] capability trait and every
//! persisted value goes through [`store::SettingsStore`], so the whole engine
//! runs (and is tested) without a browser.
//!
//! # Modules
//!
//! - `selector`: CSS-like compound selectors and selector sets
//! - `catalog`: the built-in ad selector catalog
//! - `settings`: persisted settings and partial updates
//! - `store`: async settings store contract and blocked-ad counter
//! - `dom`: DOM capability trait and an in-memory DOM
//! - `suppress`: ad element removal and skip/close activation
//! - `audio`: mute-during-ad policy
//! - `watcher`: coalescing sweep scheduler
//! - `message`: control message protocol
//! - `runtime`: per-page runtime context and content runtime
//! - `control`: popup, options and background controller logic
//! - `config`: timing and host configuration

pub mod audio;
pub mod catalog;
pub mod config;
pub mod control;
pub mod dom;
pub mod message;
pub mod runtime;
pub mod selector;
pub mod settings;
pub mod store;
pub mod suppress;
pub mod watcher;

// Re-export commonly used types
pub use audio::{AudioAction, AudioGuard, VolumeState};
pub use catalog::AdSelectorSet;
pub use config::ExtensionConfig;
pub use dom::{Dom, DomError};
pub use message::{Message, Response};
pub use runtime::{ContentRuntime, RuntimeContext, SharedRuntime};
pub use selector::{Selector, SelectorError, SelectorSet};
pub use settings::{Settings, SettingsPatch};
pub use store::{SettingsStore, StoreError};
pub use suppress::SweepOutcome;
pub use watcher::{Scheduler, SweepTarget, WatchEvent};
