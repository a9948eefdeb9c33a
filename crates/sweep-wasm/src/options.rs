//! Options page.

use std::rc::Rc;

use sweep_core::control::view::{SAVED_STATUS, SAVED_STATUS_MS};
use sweep_core::control::Controller;
use sweep_core::ExtensionConfig;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlElement, HtmlInputElement, Window};

use crate::chrome::{describe, ChromeBadge, ChromeStore, ChromeTabs};
use crate::popup::{element, on_click};

struct OptionsPage {
    window: Window,
    enabled: HtmlInputElement,
    restore_volume: HtmlInputElement,
    status: HtmlElement,
    controller: Controller<ChromeStore, ChromeTabs, ChromeBadge>,
}

impl OptionsPage {
    async fn load(&self) {
        let settings = self.controller.settings().await;
        self.enabled.set_checked(settings.enabled);
        self.restore_volume.set_checked(settings.restore_volume_after_ad);
    }

    async fn save(&self) {
        self.controller
            .save_options(self.enabled.checked(), self.restore_volume.checked())
            .await;
        self.status.set_text_content(Some(SAVED_STATUS));

        let status = self.status.clone();
        let clear = Closure::once_into_js(move || status.set_text_content(Some("")));
        if let Err(e) = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(clear.unchecked_ref(), SAVED_STATUS_MS)
        {
            log::debug!("Status not cleared: {}", describe(&e));
        }
    }
}

fn checkbox(window: &Window, id: &str) -> Result<HtmlInputElement, JsValue> {
    window
        .document()
        .and_then(|document| document.get_element_by_id(id))
        .ok_or_else(|| JsValue::from_str(&format!("Missing #{}", id)))?
        .dyn_into::<HtmlInputElement>()
        .map_err(|_| JsValue::from_str(&format!("#{} is not an input", id)))
}

pub fn start(config: ExtensionConfig) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("No document"))?;

    let page = Rc::new(OptionsPage {
        enabled: checkbox(&window, "opt-enabled")?,
        restore_volume: checkbox(&window, "opt-volume")?,
        status: element(&document, "status")?,
        controller: Controller::new(ChromeStore, ChromeTabs, ChromeBadge, &config),
        window,
    });

    let saver = page.clone();
    on_click(
        &element(&document, "saveBtn")?,
        Box::new(move || {
            let page = saver.clone();
            spawn_local(async move { page.save().await });
        }),
    )?;

    spawn_local(async move { page.load().await });
    Ok(())
}
