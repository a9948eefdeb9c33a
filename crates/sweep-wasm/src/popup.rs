//! Toolbar popup.

use std::future::Future;
use std::rc::Rc;

use sweep_core::control::{Controller, PopupView};
use sweep_core::ExtensionConfig;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, HtmlElement};

use crate::chrome::{self, describe, ChromeBadge, ChromeStore, ChromeTabs};

type PopupController = Controller<ChromeStore, ChromeTabs, ChromeBadge>;

struct Popup {
    toggle: HtmlElement,
    mute: HtmlElement,
    count: HtmlElement,
    controller: PopupController,
}

impl Popup {
    fn render(&self, view: &PopupView) {
        self.toggle.set_text_content(Some(view.toggle_label));
        self.toggle.set_class_name(view.toggle_class);
        self.mute.set_text_content(Some(view.mute_label));
        self.mute.set_class_name(view.mute_class);
        self.count.set_text_content(Some(&view.count_text));
    }
}

pub(crate) fn element(document: &Document, id: &str) -> Result<HtmlElement, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("Missing #{}", id)))?
        .dyn_into::<HtmlElement>()
        .map_err(|_| JsValue::from_str(&format!("#{} is not an HTML element", id)))
}

pub(crate) fn on_click(target: &HtmlElement, handler: Box<dyn FnMut()>) -> Result<(), JsValue> {
    let closure = Closure::wrap(handler);
    target.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

/// Run `action` on click and render the view it returns.
fn bind<F, Fut>(popup: &Rc<Popup>, target: &HtmlElement, action: F) -> Result<(), JsValue>
where
    F: Fn(Rc<Popup>) -> Fut + 'static,
    Fut: Future<Output = PopupView> + 'static,
{
    let popup = popup.clone();
    on_click(
        target,
        Box::new(move || {
            let popup = popup.clone();
            let pending = action(popup.clone());
            spawn_local(async move {
                let view = pending.await;
                popup.render(&view);
            });
        }),
    )
}

pub fn start(config: ExtensionConfig) -> Result<(), JsValue> {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("No document"))?;

    let popup = Rc::new(Popup {
        toggle: element(&document, "toggleBtn")?,
        mute: element(&document, "muteBtn")?,
        count: element(&document, "count")?,
        controller: Controller::new(ChromeStore, ChromeTabs, ChromeBadge, &config),
    });

    bind(&popup, &popup.toggle, |popup| async move {
        popup.controller.toggle_enabled().await
    })?;
    bind(&popup, &popup.mute, |popup| async move {
        popup.controller.toggle_restore_volume().await
    })?;
    bind(&popup, &element(&document, "resetBtn")?, |popup| async move {
        popup.controller.reset_counter().await
    })?;

    on_click(
        &element(&document, "optionsBtn")?,
        Box::new(|| {
            spawn_local(async {
                if let Err(e) = chrome::open_options_page().await {
                    log::debug!("Options page not opened: {}", describe(&e));
                }
            })
        }),
    )?;

    let initial = popup.clone();
    spawn_local(async move {
        let view = initial.controller.refresh().await;
        initial.render(&view);
    });
    Ok(())
}
