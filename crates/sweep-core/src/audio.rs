//! Mute-during-ad policy.

use crate::catalog::AdSelectorSet;
use crate::dom::Dom;

pub use crate::dom::VolumeState;

/// What [`AudioGuard::apply`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioAction {
    /// No video, or no ad and nothing to restore.
    Idle,
    /// An ad is showing and the video was (re)muted.
    Muted,
    /// The ad ended and the saved state was put back.
    Restored,
}

#[derive(Debug, Clone)]
struct Saved<N> {
    video: N,
    /// `None` when the element would not report its state; restoring then
    /// just unmutes.
    state: Option<VolumeState>,
}

/// Holds the pre-ad volume of the current video for one ad interval.
///
/// At most one state is held. A state saved for a video that is no longer
/// the page's video is dropped on the next [`AudioGuard::apply`].
#[derive(Debug, Clone)]
pub struct AudioGuard<N> {
    saved: Option<Saved<N>>,
}

impl<N> Default for AudioGuard<N> {
    fn default() -> Self {
        Self { saved: None }
    }
}

impl<N: Clone + PartialEq> AudioGuard<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a pre-ad state is currently held for `video`.
    pub fn is_saved(&self, video: &N) -> bool {
        self.saved.as_ref().is_some_and(|saved| saved.video == *video)
    }

    /// Apply the policy to the first video in the document.
    ///
    /// The video is always muted while an ad is present. Its previous state is
    /// captured once per ad, and only when `restore_after_ad` is set; without a
    /// capture nothing is restored and the video stays muted.
    pub fn apply<D>(&mut self, dom: &D, selectors: &AdSelectorSet, restore_after_ad: bool) -> AudioAction
    where
        D: Dom<Node = N>,
    {
        let document = dom.document();
        let Some(video) = dom.query_first(&document, &selectors.video) else {
            self.saved = None;
            return AudioAction::Idle;
        };
        if !self.is_saved(&video) {
            self.saved = None;
        }
        let ad_present = dom.query_first(&document, &selectors.ad_presence).is_some();

        if ad_present {
            if restore_after_ad && self.saved.is_none() {
                self.saved = Some(Saved {
                    video: video.clone(),
                    state: dom.volume(&video),
                });
            }
            if let Err(e) = dom.set_muted(&video, true) {
                log::debug!("Failed to mute video: {}", e);
            }
            return AudioAction::Muted;
        }

        let Some(saved) = self.saved.take() else {
            return AudioAction::Idle;
        };

        match saved.state {
            Some(state) => {
                if let Err(e) = dom.set_muted(&video, state.muted) {
                    log::debug!("Failed to restore mute flag: {}", e);
                }
                if let Err(e) = dom.set_volume(&video, state.volume) {
                    log::debug!("Failed to restore volume: {}", e);
                }
            }
            None => {
                if let Err(e) = dom.set_muted(&video, false) {
                    log::debug!("Failed to unmute video: {}", e);
                }
            }
        }

        AudioAction::Restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MemoryDom, NodeId};

    fn page(muted: bool, volume: f64) -> (MemoryDom, NodeId, NodeId) {
        let dom = MemoryDom::new();
        let player = dom.append(dom.root(), "div.html5-video-player").unwrap();
        let video = dom.append_video(player, muted, volume);
        (dom, player, video)
    }

    #[test]
    fn test_no_video_is_idle() {
        let dom = MemoryDom::new();
        dom.append(dom.root(), "div.ad-showing").unwrap();
        let mut guard = AudioGuard::new();
        assert_eq!(guard.apply(&dom, &AdSelectorSet::builtin(), true), AudioAction::Idle);
    }

    #[test]
    fn test_mute_and_restore() {
        let (dom, player, video) = page(false, 0.8);
        let selectors = AdSelectorSet::builtin();
        let mut guard = AudioGuard::new();

        dom.add_class(player, "ad-showing");
        assert_eq!(guard.apply(&dom, &selectors, true), AudioAction::Muted);
        assert_eq!(dom.media(video), Some(VolumeState { muted: true, volume: 0.8 }));
        assert!(guard.is_saved(&video));

        // Page lowers the volume mid-ad; the original state must win.
        dom.set_volume(&video, 0.1).unwrap();
        assert_eq!(guard.apply(&dom, &selectors, true), AudioAction::Muted);

        dom.remove_class(player, "ad-showing");
        assert_eq!(guard.apply(&dom, &selectors, true), AudioAction::Restored);
        assert_eq!(dom.media(video), Some(VolumeState { muted: false, volume: 0.8 }));
        assert!(!guard.is_saved(&video));

        assert_eq!(guard.apply(&dom, &selectors, true), AudioAction::Idle);
    }

    #[test]
    fn test_restore_keeps_user_mute() {
        let (dom, player, video) = page(true, 0.3);
        let selectors = AdSelectorSet::builtin();
        let mut guard = AudioGuard::new();

        dom.add_class(player, "ad-showing");
        guard.apply(&dom, &selectors, true);
        dom.remove_class(player, "ad-showing");
        guard.apply(&dom, &selectors, true);
        assert_eq!(dom.media(video), Some(VolumeState { muted: true, volume: 0.3 }));
    }

    #[test]
    fn test_without_restore_stays_muted() {
        let (dom, player, video) = page(false, 0.8);
        let selectors = AdSelectorSet::builtin();
        let mut guard = AudioGuard::new();

        dom.add_class(player, "ad-showing");
        assert_eq!(guard.apply(&dom, &selectors, false), AudioAction::Muted);
        assert!(!guard.is_saved(&video));

        dom.remove_class(player, "ad-showing");
        assert_eq!(guard.apply(&dom, &selectors, false), AudioAction::Idle);
        assert_eq!(dom.media(video), Some(VolumeState { muted: true, volume: 0.8 }));
    }

    #[test]
    fn test_overlay_counts_as_ad() {
        let (dom, player, video) = page(false, 1.0);
        let selectors = AdSelectorSet::builtin();
        let mut guard = AudioGuard::new();

        let overlay = dom.append(player, "div.ytp-ad-player-overlay").unwrap();
        assert_eq!(guard.apply(&dom, &selectors, true), AudioAction::Muted);
        dom.detach(overlay);
        assert_eq!(guard.apply(&dom, &selectors, true), AudioAction::Restored);
        assert_eq!(dom.media(video), Some(VolumeState { muted: false, volume: 1.0 }));
    }

    #[test]
    fn test_unreadable_state_just_unmutes() {
        let dom = MemoryDom::new();
        let player = dom.append(dom.root(), "div.ad-showing").unwrap();
        // A <video> tag without media state: volume() reports None.
        let fake = dom.append(player, "video").unwrap();
        let selectors = AdSelectorSet::builtin();
        let mut guard = AudioGuard::new();

        assert_eq!(guard.apply(&dom, &selectors, true), AudioAction::Muted);
        assert!(guard.is_saved(&fake));
        dom.remove_class(player, "ad-showing");
        assert_eq!(guard.apply(&dom, &selectors, true), AudioAction::Restored);
        assert!(!guard.is_saved(&fake));
    }

    #[test]
    fn test_player_swap_drops_stale_state() {
        let dom = MemoryDom::new();
        let selectors = AdSelectorSet::builtin();
        let mut guard = AudioGuard::new();

        let mut swapped = Vec::new();
        for _ in 0..5 {
            let player = dom.append(dom.root(), "div.ad-showing").unwrap();
            let video = dom.append_video(player, false, 0.5);
            assert_eq!(guard.apply(&dom, &selectors, true), AudioAction::Muted);
            assert!(guard.is_saved(&video));
            dom.detach(player);
            swapped.push(video);
        }

        let player = dom.append(dom.root(), "div.html5-video-player").unwrap();
        let video = dom.append_video(player, false, 0.9);
        assert_eq!(guard.apply(&dom, &selectors, true), AudioAction::Idle);
        assert!(swapped.iter().all(|old| !guard.is_saved(old)));

        dom.add_class(player, "ad-showing");
        assert_eq!(guard.apply(&dom, &selectors, true), AudioAction::Muted);
        assert!(guard.is_saved(&video));
        dom.remove_class(player, "ad-showing");
        assert_eq!(guard.apply(&dom, &selectors, true), AudioAction::Restored);
        assert_eq!(dom.media(video), Some(VolumeState { muted: false, volume: 0.9 }));
    }

    #[test]
    fn test_video_gone_clears_state() {
        let (dom, player, video) = page(false, 0.8);
        let selectors = AdSelectorSet::builtin();
        let mut guard = AudioGuard::new();

        dom.add_class(player, "ad-showing");
        guard.apply(&dom, &selectors, true);
        assert!(guard.is_saved(&video));
        dom.detach(player);
        assert_eq!(guard.apply(&dom, &selectors, true), AudioAction::Idle);

        // A later video must not inherit the old capture.
        let host = dom.append(dom.root(), "div").unwrap();
        let again = dom.append_video(host, true, 0.2);
        assert_eq!(guard.apply(&dom, &selectors, true), AudioAction::Idle);
        assert_eq!(dom.media(again), Some(VolumeState { muted: true, volume: 0.2 }));
    }
}
