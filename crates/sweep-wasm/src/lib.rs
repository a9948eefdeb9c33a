//! WebAssembly bindings for AdSweep
//!
//! Each extension surface loads the same module and calls its entry point:
//! `start_content_script` from the content script, `start_popup` and
//! `start_options` from their pages, `start_background` from the worker.
//! Every entry point takes an optional JSON config override.

use wasm_bindgen::prelude::*;
use sweep_core::{catalog, ExtensionConfig, SelectorSet};

mod background;
mod chrome;
mod content;
mod dom;
mod logger;
mod options;
mod popup;

fn load_config(config_json: Option<String>) -> Result<ExtensionConfig, JsValue> {
    logger::init();
    ExtensionConfig::from_json(config_json.as_deref())
        .map_err(|e| JsValue::from_str(&format!("Failed to load config: {}", e)))
}

#[wasm_bindgen]
pub fn start_content_script(config_json: Option<String>) -> Result<(), JsValue> {
    content::start(load_config(config_json)?)
}

#[wasm_bindgen]
pub fn start_popup(config_json: Option<String>) -> Result<(), JsValue> {
    popup::start(load_config(config_json)?)
}

#[wasm_bindgen]
pub fn start_options(config_json: Option<String>) -> Result<(), JsValue> {
    options::start(load_config(config_json)?)
}

#[wasm_bindgen]
pub fn start_background(config_json: Option<String>) -> Result<(), JsValue> {
    background::start(load_config(config_json)?)
}

/// Run the install routine directly, for hosts that register
/// `onInstalled` themselves.
#[wasm_bindgen]
pub async fn on_installed(config_json: Option<String>) -> Result<(), JsValue> {
    let config = load_config(config_json)?;
    background::install(&config).await;
    Ok(())
}

/// Comma-joined selector list for a catalog group, e.g. for a hiding
/// stylesheet injected at `document_start`.
#[wasm_bindgen]
pub fn selector_css(group: &str) -> Option<String> {
    catalog::group(group).map(|sources| SelectorSet::lenient(sources.iter().copied()).css().to_string())
}
