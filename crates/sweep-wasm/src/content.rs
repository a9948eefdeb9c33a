//! Content script: sweeps the page on mutations, a periodic timer and SPA
//! navigation, and answers control messages.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use js_sys::{Array, Function};
use sweep_core::message::{self, Message};
use sweep_core::store::record_blocked;
use sweep_core::watcher::Millis;
use sweep_core::{
    AdSelectorSet, ContentRuntime, ExtensionConfig, RuntimeContext, SettingsStore, SharedRuntime,
    SweepOutcome, WatchEvent,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    AddEventListenerOptions, Element, MutationObserver, MutationObserverInit, MutationRecord,
    Performance, Window,
};

use crate::chrome::{self, describe, from_js, to_js, ChromeStore};
use crate::dom::WebDom;

struct ContentScript {
    window: Window,
    clock: Performance,
    runtime: SharedRuntime<WebDom>,
    context: Rc<RuntimeContext>,
    store: ChromeStore,
    timer: Cell<Option<(i32, Millis)>>,
    on_timer: Closure<dyn FnMut()>,
}

impl ContentScript {
    /// Monotonic milliseconds since the page loaded.
    fn now(&self) -> Millis {
        self.clock.now() as Millis
    }

    fn dispatch(&self, event: WatchEvent<Element>) {
        let outcome = self.runtime.dispatch(event, self.now());
        self.finish(outcome);
    }

    fn sweep_document(&self) {
        let outcome = self.runtime.sweep_document(self.now());
        self.finish(outcome);
    }

    fn fire_timer(&self) {
        self.timer.set(None);
        let outcome = self.runtime.run_due(self.now());
        self.finish(outcome);
    }

    /// `None` means a pass is still running; it records and re-arms itself.
    fn finish(&self, outcome: Option<SweepOutcome>) {
        if let Some(outcome) = outcome {
            self.record(outcome);
            self.arm_timer();
        }
    }

    /// Keep one host timeout pointed at the scheduler's earliest deadline.
    fn arm_timer(&self) {
        let deadline = self.runtime.next_deadline();
        let armed = self.timer.get();
        if armed.map(|(_, at)| at) == deadline {
            return;
        }

        if let Some((handle, _)) = armed {
            self.window.clear_timeout_with_handle(handle);
            self.timer.set(None);
        }

        if let Some(at) = deadline {
            let delay = at.saturating_sub(self.now()).min(i32::MAX as Millis) as i32;
            match self.window.set_timeout_with_callback_and_timeout_and_arguments_0(
                self.on_timer.as_ref().unchecked_ref(),
                delay,
            ) {
                Ok(handle) => self.timer.set(Some((handle, at))),
                Err(e) => log::warn!("Failed to schedule sweep: {}", describe(&e)),
            }
        }
    }

    fn record(&self, outcome: SweepOutcome) {
        if outcome.is_empty() {
            return;
        }

        log::debug!(
            "Swept {} containers, activated {} buttons",
            outcome.removed,
            outcome.activated
        );
        let store = self.store;
        let context = self.context.clone();
        spawn_local(async move {
            if let Err(e) = record_blocked(&store, &context, outcome.total()).await {
                log::debug!("Counter not saved: {}", e);
            }
        });
    }
}

pub fn start(config: ExtensionConfig) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
    let clock = window
        .performance()
        .ok_or_else(|| JsValue::from_str("No performance clock"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("No document"))?;
    let dom = WebDom::new(&document).ok_or_else(|| JsValue::from_str("No document element"))?;
    let observed = dom.root().clone();

    let context = Rc::new(RuntimeContext::default());
    let runtime = ContentRuntime::new(dom, AdSelectorSet::builtin(), context.clone(), &config);

    let script = Rc::new_cyclic(|weak: &Weak<ContentScript>| {
        let weak = weak.clone();
        ContentScript {
            window: window.clone(),
            clock,
            runtime: SharedRuntime::new(runtime),
            context,
            store: ChromeStore,
            timer: Cell::new(None),
            on_timer: Closure::new(move || {
                if let Some(script) = weak.upgrade() {
                    script.fire_timer();
                }
            }),
        }
    });

    {
        let script = script.clone();
        spawn_local(async move {
            let settings = script.store.get().await;
            script.context.load(&settings);
            log::info!(
                "Settings loaded: enabled={}, restoreVolumeAfterAd={}, blockedAds={}",
                settings.enabled,
                settings.restore_volume_after_ad,
                settings.blocked_ads
            );
            script.sweep_document();
        });
    }

    observe_mutations(&script, &observed)?;
    start_periodic(&script, &window, config.periodic_ms)?;
    listen_navigation(&script, &window, &config.navigation_event)?;
    listen_messages(&script)?;

    log::info!("Content script started");
    Ok(())
}

fn observe_mutations(script: &Rc<ContentScript>, target: &Element) -> Result<(), JsValue> {
    let handler = script.clone();
    let callback = Closure::<dyn FnMut(Array, MutationObserver)>::new(
        move |records: Array, _observer: MutationObserver| {
            let mut added = Vec::new();
            for record in records.iter() {
                let record: MutationRecord = record.unchecked_into();
                let nodes = record.added_nodes();
                added.extend(
                    (0..nodes.length())
                        .filter_map(|index| nodes.item(index))
                        .filter_map(|node| node.dyn_into::<Element>().ok()),
                );
            }
            handler.dispatch(WatchEvent::Mutation { added });
        },
    );

    let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;
    let init = MutationObserverInit::new();
    init.set_child_list(true);
    init.set_subtree(true);
    observer.observe_with_options(target, &init)?;
    callback.forget();
    Ok(())
}

fn start_periodic(script: &Rc<ContentScript>, window: &Window, period: Millis) -> Result<(), JsValue> {
    let handler = script.clone();
    let callback = Closure::<dyn FnMut()>::new(move || handler.dispatch(WatchEvent::Periodic));
    window.set_interval_with_callback_and_timeout_and_arguments_0(
        callback.as_ref().unchecked_ref(),
        period.min(i32::MAX as Millis) as i32,
    )?;
    callback.forget();
    Ok(())
}

fn listen_navigation(script: &Rc<ContentScript>, window: &Window, event: &str) -> Result<(), JsValue> {
    let handler = script.clone();
    let callback = Closure::<dyn FnMut()>::new(move || handler.dispatch(WatchEvent::Navigation));
    let options = AddEventListenerOptions::new();
    options.set_passive(true);
    window.add_event_listener_with_callback_and_add_event_listener_options(
        event,
        callback.as_ref().unchecked_ref(),
        &options,
    )?;
    callback.forget();
    Ok(())
}

/// `chrome.runtime.onMessage`. Returning `true` keeps the response channel
/// open until the async handler replies.
fn listen_messages(script: &Rc<ContentScript>) -> Result<(), JsValue> {
    let handler = script.clone();
    let listener = Closure::<dyn FnMut(JsValue, JsValue, Function) -> JsValue>::new(
        move |raw: JsValue, _sender: JsValue, send_response: Function| {
            let Some(message) = Message::parse(&from_js(&raw)) else {
                return JsValue::FALSE;
            };

            let context = handler.context.clone();
            let store = handler.store;
            spawn_local(async move {
                let response = message::handle(&context, &store, message).await;
                match to_js(&response.to_value()) {
                    Ok(reply) => {
                        if let Err(e) = send_response.call1(&JsValue::UNDEFINED, &reply) {
                            log::debug!("Reply not delivered: {}", describe(&e));
                        }
                    }
                    Err(e) => log::warn!("Failed to encode reply: {}", describe(&e)),
                }
            });
            JsValue::TRUE
        },
    );

    let on_message = chrome::namespace(&["runtime", "onMessage"])?;
    chrome::invoke(&on_message, "addListener", &[listener.as_ref().clone()])?;
    listener.forget();
    Ok(())
}
