//! [`Dom`] on top of the live page.

use js_sys::Reflect;
use sweep_core::dom::{Dom, DomError, VolumeState};
use sweep_core::SelectorSet;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement, HtmlMediaElement};

use crate::chrome::describe;

pub struct WebDom {
    root: Element,
}

impl WebDom {
    /// `None` before the document has a root element.
    pub fn new(document: &Document) -> Option<Self> {
        document.document_element().map(|root| Self { root })
    }

    pub fn root(&self) -> &Element {
        &self.root
    }
}

impl Dom for WebDom {
    type Node = Element;

    fn document(&self) -> Element {
        self.root.clone()
    }

    fn query_all(&self, root: &Element, selectors: &SelectorSet) -> Vec<Element> {
        if selectors.is_empty() {
            return Vec::new();
        }

        let list = match root.query_selector_all(selectors.css()) {
            Ok(list) => list,
            Err(e) => {
                log::debug!("querySelectorAll failed: {}", describe(&e));
                return Vec::new();
            }
        };

        (0..list.length())
            .filter_map(|index| list.item(index))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn query_first(&self, root: &Element, selectors: &SelectorSet) -> Option<Element> {
        if selectors.is_empty() {
            return None;
        }
        root.query_selector(selectors.css()).ok().flatten()
    }

    fn remove(&self, node: &Element) -> Result<(), DomError> {
        node.remove();
        Ok(())
    }

    fn activate(&self, node: &Element) -> Result<(), DomError> {
        let element = node
            .dyn_ref::<HtmlElement>()
            .ok_or(DomError::NotActivatable)?;
        element.click();
        Ok(())
    }

    fn volume(&self, media: &Element) -> Option<VolumeState> {
        let media = media.dyn_ref::<HtmlMediaElement>()?;
        Some(VolumeState {
            muted: media.muted(),
            volume: media.volume(),
        })
    }

    fn set_muted(&self, media: &Element, muted: bool) -> Result<(), DomError> {
        let media = media.dyn_ref::<HtmlMediaElement>().ok_or(DomError::NotMedia)?;
        media.set_muted(muted);
        Ok(())
    }

    fn set_volume(&self, media: &Element, volume: f64) -> Result<(), DomError> {
        let media = media.dyn_ref::<HtmlMediaElement>().ok_or(DomError::NotMedia)?;
        // The setter throws for values outside [0, 1].
        Reflect::set(media, &"volume".into(), &JsValue::from_f64(volume))
            .map_err(|e| DomError::Platform(describe(&e)))?;
        Ok(())
    }
}
