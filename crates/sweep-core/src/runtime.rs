//! Per-page runtime state and the content runtime that drives sweeps.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::audio::AudioGuard;
use crate::catalog::AdSelectorSet;
use crate::config::ExtensionConfig;
use crate::dom::Dom;
use crate::settings::Settings;
use crate::suppress::{suppress, SweepOutcome};
use crate::watcher::{Millis, Scheduler, SweepTarget, WatchEvent};

/// Flags one content-script instance works with.
///
/// Loaded from the settings store at startup and afterwards changed only by
/// control messages and counter updates. Shared through an `Rc` by timers,
/// observers and message handlers.
#[derive(Debug)]
pub struct RuntimeContext {
    enabled: Cell<bool>,
    restore_volume_after_ad: Cell<bool>,
    blocked_count: Cell<u64>,
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

impl RuntimeContext {
    pub fn new(settings: &Settings) -> Self {
        Self {
            enabled: Cell::new(settings.enabled),
            restore_volume_after_ad: Cell::new(settings.restore_volume_after_ad),
            blocked_count: Cell::new(settings.blocked_ads),
        }
    }

    /// Take over every field from a full settings read.
    pub fn load(&self, settings: &Settings) {
        self.apply_options(settings);
        self.blocked_count.set(settings.blocked_ads);
    }

    /// Take over `enabled` and `restoreVolumeAfterAd` only.
    pub fn apply_options(&self, settings: &Settings) {
        self.enabled.set(settings.enabled);
        self.restore_volume_after_ad.set(settings.restore_volume_after_ad);
    }

    pub fn enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    pub fn restore_volume_after_ad(&self) -> bool {
        self.restore_volume_after_ad.get()
    }

    pub fn blocked_count(&self) -> u64 {
        self.blocked_count.get()
    }

    pub fn set_blocked_count(&self, count: u64) {
        self.blocked_count.set(count);
    }
}

/// Suppression engine, audio guard and scheduler bound to one document.
///
/// Persisting the counter is left to the caller: every method returns the
/// [`SweepOutcome`] to feed into [`crate::store::record_blocked`].
pub struct ContentRuntime<D: Dom> {
    dom: D,
    selectors: AdSelectorSet,
    context: Rc<RuntimeContext>,
    audio: AudioGuard<D::Node>,
    scheduler: Scheduler<D::Node>,
}

impl<D: Dom> ContentRuntime<D> {
    pub fn new(
        dom: D,
        selectors: AdSelectorSet,
        context: Rc<RuntimeContext>,
        config: &ExtensionConfig,
    ) -> Self {
        Self {
            dom,
            selectors,
            context,
            audio: AudioGuard::new(),
            scheduler: Scheduler::from_config(config),
        }
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn context(&self) -> &Rc<RuntimeContext> {
        &self.context
    }

    /// One full sweep: removal, button activation, then the audio policy.
    /// A no-op while disabled.
    pub fn sweep(&mut self, target: &SweepTarget<D::Node>) -> SweepOutcome {
        if !self.context.enabled() {
            return SweepOutcome::default();
        }

        let root = match target {
            SweepTarget::Document => self.dom.document(),
            SweepTarget::Subtree(node) => node.clone(),
        };

        let outcome = suppress(&self.dom, &root, &self.selectors);
        self.audio
            .apply(&self.dom, &self.selectors, self.context.restore_volume_after_ad());
        outcome
    }

    /// Feed a trigger and run whatever it makes due immediately.
    ///
    /// Events are dropped while disabled, so nothing queues up behind a
    /// disabled runtime.
    pub fn on_event(&mut self, event: WatchEvent<D::Node>, now: Millis) -> SweepOutcome {
        if !self.context.enabled() {
            return SweepOutcome::default();
        }

        let mut total = SweepOutcome::default();
        for target in self.scheduler.push(event, now) {
            total += self.sweep(&target);
        }
        total
    }

    /// Run every debounced sweep whose quiet period has elapsed.
    pub fn run_due(&mut self, now: Millis) -> SweepOutcome {
        let mut total = SweepOutcome::default();
        for target in self.scheduler.poll(now) {
            total += self.sweep(&target);
        }
        total
    }

    pub fn next_deadline(&self) -> Option<Millis> {
        self.scheduler.next_deadline()
    }
}

/// A [`ContentRuntime`] that host callbacks can share.
///
/// Page code runs synchronously inside a sweep (a click handler fired by a
/// skip button, say) and may raise another trigger. Such an event is queued
/// and run by the pass in progress before it returns; the nested call
/// reports `None`.
pub struct SharedRuntime<D: Dom> {
    runtime: RefCell<ContentRuntime<D>>,
    queued: RefCell<VecDeque<WatchEvent<D::Node>>>,
}

impl<D: Dom> SharedRuntime<D> {
    pub fn new(runtime: ContentRuntime<D>) -> Self {
        Self {
            runtime: RefCell::new(runtime),
            queued: RefCell::new(VecDeque::new()),
        }
    }

    pub fn dispatch(&self, event: WatchEvent<D::Node>, now: Millis) -> Option<SweepOutcome> {
        self.queued.borrow_mut().push_back(event);
        self.run(now, |_| SweepOutcome::default())
    }

    pub fn sweep_document(&self, now: Millis) -> Option<SweepOutcome> {
        self.run(now, |runtime| runtime.sweep(&SweepTarget::Document))
    }

    pub fn run_due(&self, now: Millis) -> Option<SweepOutcome> {
        self.run(now, |runtime| runtime.run_due(now))
    }

    /// `None` also while a pass is running.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.runtime
            .try_borrow()
            .ok()
            .and_then(|runtime| runtime.next_deadline())
    }

    fn run<F>(&self, now: Millis, task: F) -> Option<SweepOutcome>
    where
        F: FnOnce(&mut ContentRuntime<D>) -> SweepOutcome,
    {
        let Ok(mut runtime) = self.runtime.try_borrow_mut() else {
            log::debug!("Sweep in progress, deferred to the running pass");
            return None;
        };

        let mut outcome = task(&mut *runtime);
        loop {
            let next = self.queued.borrow_mut().pop_front();
            let Some(event) = next else {
                break;
            };
            outcome += runtime.on_event(event, now);
        }
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MemoryDom, NodeId, VolumeState};
    use crate::store::{record_blocked, MemoryStore};

    fn runtime(dom: MemoryDom) -> ContentRuntime<MemoryDom> {
        ContentRuntime::new(
            dom,
            AdSelectorSet::builtin(),
            Rc::new(RuntimeContext::default()),
            &ExtensionConfig::default(),
        )
    }

    fn watch_page() -> (MemoryDom, NodeId, NodeId) {
        let dom = MemoryDom::new();
        let player = dom.append(dom.root(), "div.html5-video-player").unwrap();
        let video = dom.append_video(player, false, 0.8);
        (dom, player, video)
    }

    #[test]
    fn test_disabled_sweep_does_nothing() {
        let dom = MemoryDom::new();
        let ad = dom.append(dom.root(), "ytd-ads").unwrap();
        let skip = dom.append(dom.root(), "button.ytp-ad-skip-button").unwrap();
        let mut runtime = runtime(dom);
        runtime.context().set_enabled(false);

        let outcome = runtime.sweep(&SweepTarget::Document);
        assert_eq!(outcome, SweepOutcome::default());
        assert!(runtime.dom().is_attached(ad));
        assert_eq!(runtime.dom().clicks(skip), 0);
    }

    #[test]
    fn test_disabled_sweep_leaves_audio_alone() {
        let (dom, player, video) = watch_page();
        dom.add_class(player, "ad-showing");
        let mut runtime = runtime(dom);
        runtime.context().set_enabled(false);

        runtime.sweep(&SweepTarget::Document);
        assert_eq!(
            runtime.dom().media(video),
            Some(VolumeState { muted: false, volume: 0.8 })
        );
    }

    #[test]
    fn test_sweep_applies_audio_policy() {
        let (dom, player, video) = watch_page();
        dom.add_class(player, "ad-showing");
        let mut runtime = runtime(dom);

        runtime.sweep(&SweepTarget::Document);
        assert_eq!(runtime.dom().media(video).map(|s| s.muted), Some(true));

        runtime.dom().remove_class(player, "ad-showing");
        runtime.sweep(&SweepTarget::Document);
        assert_eq!(
            runtime.dom().media(video),
            Some(VolumeState { muted: false, volume: 0.8 })
        );
    }

    #[test]
    fn test_restore_option_off_leaves_video_muted() {
        let (dom, player, video) = watch_page();
        dom.add_class(player, "ad-showing");
        let mut runtime = runtime(dom);
        runtime.context().apply_options(&Settings {
            restore_volume_after_ad: false,
            ..Settings::default()
        });

        runtime.sweep(&SweepTarget::Document);
        runtime.dom().remove_class(player, "ad-showing");
        runtime.sweep(&SweepTarget::Document);
        assert_eq!(runtime.dom().media(video).map(|s| s.muted), Some(true));
    }

    #[test]
    fn test_mutation_burst_sweeps_once() {
        let dom = MemoryDom::new();
        let mut runtime = runtime(dom);

        for t in 0..10 {
            let ad = runtime.dom().append(runtime.dom().root(), "ytd-ads").unwrap();
            let outcome = runtime.on_event(WatchEvent::Mutation { added: vec![] }, t * 20);
            assert!(outcome.is_empty());
            assert!(runtime.dom().is_attached(ad));
        }

        assert!(runtime.run_due(300).is_empty());
        assert_eq!(runtime.next_deadline(), Some(430));
        let outcome = runtime.run_due(430);
        assert_eq!(outcome.removed, 10);
        assert_eq!(runtime.next_deadline(), None);
    }

    #[test]
    fn test_added_subtree_swept_on_its_own() {
        let dom = MemoryDom::new();
        let container = dom.append(dom.root(), "ytd-rich-section-renderer").unwrap();
        let ad = dom.append(container, "ytd-display-ad-renderer").unwrap();
        let mut runtime = runtime(dom);

        runtime.on_event(WatchEvent::Mutation { added: vec![container] }, 0);
        let outcome = runtime.run_due(250);
        // Document sweep removes it first; the scoped sweep then finds nothing.
        assert_eq!(outcome.removed, 1);
        assert!(!runtime.dom().is_attached(ad));
    }

    #[test]
    fn test_navigation_and_periodic_sweep_immediately() {
        let dom = MemoryDom::new();
        dom.append(dom.root(), "ytd-ads").unwrap();
        let mut runtime = runtime(dom);

        assert_eq!(runtime.on_event(WatchEvent::Navigation, 0).removed, 1);

        runtime.dom().append(runtime.dom().root(), "div.video-ads").unwrap();
        assert_eq!(runtime.on_event(WatchEvent::Periodic, 2000).removed, 1);
    }

    #[test]
    fn test_disabled_drops_events() {
        let dom = MemoryDom::new();
        dom.append(dom.root(), "ytd-ads").unwrap();
        let mut runtime = runtime(dom);
        runtime.context().set_enabled(false);

        assert!(runtime.on_event(WatchEvent::Mutation { added: vec![] }, 0).is_empty());
        assert!(runtime.on_event(WatchEvent::Periodic, 0).is_empty());
        assert_eq!(runtime.next_deadline(), None);
    }

    #[tokio::test]
    async fn test_counter_grows_by_removed_plus_activated() {
        let store = MemoryStore::with_settings(Settings {
            blocked_ads: 10,
            ..Settings::default()
        });
        let dom = MemoryDom::new();
        dom.append(dom.root(), "ytd-ads").unwrap();
        dom.append(dom.root(), "div#player-ads").unwrap();
        dom.append(dom.root(), "button.ytp-ad-skip-button").unwrap();

        let context = Rc::new(RuntimeContext::new(&store.settings()));
        let mut runtime = ContentRuntime::new(
            dom,
            AdSelectorSet::builtin(),
            context.clone(),
            &ExtensionConfig::default(),
        );

        let outcome = runtime.sweep(&SweepTarget::Document);
        assert_eq!(outcome, SweepOutcome { removed: 2, activated: 1 });

        record_blocked(&store, &context, outcome.total()).await.unwrap();
        assert_eq!(store.settings().blocked_ads, 13);
        assert_eq!(context.blocked_count(), 13);
    }

    #[test]
    fn test_context_load() {
        let context = RuntimeContext::default();
        assert!(context.enabled());
        context.load(&Settings {
            enabled: false,
            restore_volume_after_ad: false,
            blocked_ads: 3,
        });
        assert!(!context.enabled());
        assert!(!context.restore_volume_after_ad());
        assert_eq!(context.blocked_count(), 3);
    }

    /// Delegates to a [`MemoryDom`] and, on the first click, raises a
    /// navigation trigger from inside the sweep.
    struct ClickHandlerDom {
        inner: Rc<MemoryDom>,
        runtime: RefCell<Option<std::rc::Weak<SharedRuntime<ClickHandlerDom>>>>,
        nested: Cell<Option<Option<SweepOutcome>>>,
    }

    impl Dom for ClickHandlerDom {
        type Node = NodeId;

        fn document(&self) -> NodeId {
            self.inner.document()
        }

        fn query_all(&self, root: &NodeId, selectors: &crate::selector::SelectorSet) -> Vec<NodeId> {
            self.inner.query_all(root, selectors)
        }

        fn remove(&self, node: &NodeId) -> Result<(), crate::dom::DomError> {
            self.inner.remove(node)
        }

        fn activate(&self, node: &NodeId) -> Result<(), crate::dom::DomError> {
            self.inner.activate(node)?;
            let hook = self.runtime.borrow_mut().take();
            if let Some(runtime) = hook.and_then(|weak| weak.upgrade()) {
                self.nested.set(Some(runtime.dispatch(WatchEvent::Navigation, 0)));
            }
            Ok(())
        }

        fn volume(&self, media: &NodeId) -> Option<VolumeState> {
            self.inner.volume(media)
        }

        fn set_muted(&self, media: &NodeId, muted: bool) -> Result<(), crate::dom::DomError> {
            self.inner.set_muted(media, muted)
        }

        fn set_volume(&self, media: &NodeId, volume: f64) -> Result<(), crate::dom::DomError> {
            self.inner.set_volume(media, volume)
        }
    }

    #[test]
    fn test_trigger_from_click_handler_is_queued() {
        let page = Rc::new(MemoryDom::new());
        let ad = page.append(page.root(), "ytd-ads").unwrap();
        let skip = page.append(page.root(), "button.ytp-ad-skip-button").unwrap();

        let dom = ClickHandlerDom {
            inner: page.clone(),
            runtime: RefCell::new(None),
            nested: Cell::new(None),
        };
        let shared = Rc::new(SharedRuntime::new(ContentRuntime::new(
            dom,
            AdSelectorSet::builtin(),
            Rc::new(RuntimeContext::default()),
            &ExtensionConfig::default(),
        )));
        if let Ok(runtime) = shared.runtime.try_borrow() {
            *runtime.dom().runtime.borrow_mut() = Some(Rc::downgrade(&shared));
        }

        let outcome = shared.dispatch(WatchEvent::Periodic, 0).unwrap();
        // The queued navigation sweep ran inside the same pass.
        assert_eq!(outcome, SweepOutcome { removed: 1, activated: 2 });
        assert!(!page.is_attached(ad));
        assert_eq!(page.clicks(skip), 2);
        assert!(shared.runtime.try_borrow().is_ok_and(|runtime| runtime.dom().nested.get() == Some(None)));
        assert!(shared.queued.borrow().is_empty());
    }

    #[test]
    fn test_shared_runtime_debounces() {
        let shared = SharedRuntime::new(runtime(MemoryDom::new()));
        assert_eq!(
            shared.dispatch(WatchEvent::Mutation { added: vec![] }, 0),
            Some(SweepOutcome::default())
        );
        assert_eq!(shared.next_deadline(), Some(250));
        assert_eq!(shared.run_due(250), Some(SweepOutcome::default()));
        assert_eq!(shared.next_deadline(), None);
        assert_eq!(shared.sweep_document(300), Some(SweepOutcome::default()));
    }
}
