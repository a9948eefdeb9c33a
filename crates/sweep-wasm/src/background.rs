//! Background worker.

use sweep_core::control::Controller;
use sweep_core::ExtensionConfig;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::chrome::{self, ChromeBadge, ChromeStore, ChromeTabs};

/// Fill in missing settings and set the badge.
pub async fn install(config: &ExtensionConfig) {
    let controller = Controller::new(ChromeStore, ChromeTabs, ChromeBadge, config);
    controller.install_defaults().await;
}

/// Register the `chrome.runtime.onInstalled` hook.
pub fn start(config: ExtensionConfig) -> Result<(), JsValue> {
    let listener = Closure::<dyn FnMut()>::new(move || {
        let config = config.clone();
        spawn_local(async move { install(&config).await });
    });

    let on_installed = chrome::namespace(&["runtime", "onInstalled"])?;
    chrome::invoke(&on_installed, "addListener", &[listener.as_ref().clone()])?;
    listener.forget();
    Ok(())
}
