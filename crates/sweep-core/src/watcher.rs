//! Coalescing sweep scheduler
//!
//! Mutation, periodic and navigation triggers all feed one [`Scheduler`].
//! Mutations are debounced per root: scheduling a root that is already
//! pending restarts its quiet period, so a burst of mutations collapses into
//! exactly one sweep of that root. Periodic and navigation triggers bypass the
//! debounce and ask for an immediate whole-document sweep.
//!
//! At most [`MAX_PENDING_SUBTREES`] subtree roots are tracked. Once full,
//! further added nodes are left to the pending whole-document sweep, which
//! every mutation restarts and so always runs no earlier than any subtree.
//!
//! The scheduler never reads a clock. Hosts pass the current time in
//! milliseconds and arm a single timer for [`Scheduler::next_deadline`].

use crate::config::ExtensionConfig;

/// Milliseconds on the host's monotonic-enough clock.
pub type Millis = u64;

/// Where a sweep runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepTarget<N> {
    /// The whole document
    Document,
    /// One element and its descendants
    Subtree(N),
}

/// Trigger sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent<N> {
    /// A batch of DOM mutations; `added` holds the element nodes it inserted.
    Mutation { added: Vec<N> },
    /// The fallback interval fired.
    Periodic,
    /// The single-page app finished a navigation.
    Navigation,
}

/// Cap on separately debounced subtree roots.
pub const MAX_PENDING_SUBTREES: usize = 64;

#[derive(Debug, Clone)]
struct Pending<N> {
    target: SweepTarget<N>,
    due: Millis,
}

#[derive(Debug, Clone)]
pub struct Scheduler<N> {
    debounce_ms: Millis,
    pending: Vec<Pending<N>>,
}

impl<N: Clone + PartialEq> Scheduler<N> {
    pub fn new(debounce_ms: Millis) -> Self {
        Self {
            debounce_ms,
            pending: Vec::new(),
        }
    }

    pub fn from_config(config: &ExtensionConfig) -> Self {
        Self::new(config.debounce_ms)
    }

    /// Feed one event. Returns the sweeps that must run right away.
    pub fn push(&mut self, event: WatchEvent<N>, now: Millis) -> Vec<SweepTarget<N>> {
        match event {
            WatchEvent::Mutation { mut added } => {
                added.dedup();
                self.debounce(SweepTarget::Document, now);
                for node in added {
                    let target = SweepTarget::Subtree(node);
                    if !self.debounce(target, now) {
                        break;
                    }
                }
                Vec::new()
            }
            WatchEvent::Periodic | WatchEvent::Navigation => vec![SweepTarget::Document],
        }
    }

    /// (Re)start the quiet period for `target`. Returns `false` when a new
    /// subtree root was refused because the subtree list is full.
    fn debounce(&mut self, target: SweepTarget<N>, now: Millis) -> bool {
        let due = now.saturating_add(self.debounce_ms);
        if let Some(pending) = self.pending.iter_mut().find(|pending| pending.target == target) {
            pending.due = due;
            return true;
        }

        let is_subtree = matches!(target, SweepTarget::Subtree(_));
        if is_subtree && self.subtree_count() >= MAX_PENDING_SUBTREES {
            return false;
        }
        self.pending.push(Pending { target, due });
        true
    }

    fn subtree_count(&self) -> usize {
        self.pending
            .iter()
            .filter(|pending| matches!(pending.target, SweepTarget::Subtree(_)))
            .count()
    }

    /// Take every target whose quiet period has elapsed, in scheduling order.
    pub fn poll(&mut self, now: Millis) -> Vec<SweepTarget<N>> {
        let mut due = Vec::new();
        self.pending.retain(|pending| {
            if pending.due <= now {
                due.push(pending.target.clone());
                false
            } else {
                true
            }
        });
        due
    }

    /// Earliest time at which [`Scheduler::poll`] will return something.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.pending.iter().map(|pending| pending.due).min()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
