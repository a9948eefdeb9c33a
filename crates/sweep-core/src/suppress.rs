//! Ad element removal and skip/close activation.

use std::ops::{Add, AddAssign};

use crate::catalog::AdSelectorSet;
use crate::dom::Dom;

/// Result of one suppression pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Ad containers removed
    pub removed: u64,
    /// Skip/close buttons activated
    pub activated: u64,
}

impl SweepOutcome {
    /// Amount the blocked counter grows by.
    pub fn total(&self) -> u64 {
        self.removed + self.activated
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl Add for SweepOutcome {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            removed: self.removed + other.removed,
            activated: self.activated + other.activated,
        }
    }
}

impl AddAssign for SweepOutcome {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

/// Remove ad containers under `root`, then activate skip and close buttons.
///
/// Failures on individual nodes are logged and skipped.
pub fn suppress<D: Dom>(dom: &D, root: &D::Node, selectors: &AdSelectorSet) -> SweepOutcome {
    let mut outcome = SweepOutcome::default();

    for node in dom.query_all(root, &selectors.ad_containers) {
        match dom.remove(&node) {
            Ok(()) => outcome.removed += 1,
            Err(e) => log::debug!("Skipping ad node: {}", e),
        }
    }

    for buttons in [&selectors.skip_buttons, &selectors.close_buttons] {
        for node in dom.query_all(root, buttons) {
            match dom.activate(&node) {
                Ok(()) => outcome.activated += 1,
                Err(e) => log::debug!("Skipping ad button: {}", e),
            }
        }
    }

    if !outcome.is_empty() {
        log::debug!(
            "Suppressed {} ad nodes, clicked {} buttons",
            outcome.removed,
            outcome.activated
        );
    }

    outcome
}
