//! Console logging and panic reporting.

use std::sync::Once;

static INIT: Once = Once::new();

/// Install the panic hook and the console logger. Safe to call more than once.
pub fn init() {
    console_error_panic_hook::set_once();

    INIT.call_once(|| {
        let level = if cfg!(debug_assertions) {
            log::Level::Debug
        } else {
            log::Level::Warn
        };
        wasm_logger::init(wasm_logger::Config::new(level));
    });
}
