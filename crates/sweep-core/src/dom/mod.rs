//! DOM capability interface
//!
//! The suppression engine and audio guard only ever see the page through
//! [`Dom`]. The browser binding implements it on top of `web-sys`; tests use
//! [`MemoryDom`].

pub mod memory;

pub use memory::{MemoryDom, NodeId};

use crate::selector::SelectorSet;

/// Error type for per-node DOM actions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("Node is protected against modification")]
    Protected,
    #[error("Node cannot be activated")]
    NotActivatable,
    #[error("Node is not a media element")]
    NotMedia,
    #[error("DOM error: {0}")]
    Platform(String),
}

/// Mute flag and volume of a media element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeState {
    pub muted: bool,
    pub volume: f64,
}

/// Element query, removal and activation primitives of a document.
pub trait Dom {
    /// Handle to an element. Equality means "same element".
    type Node: Clone + PartialEq;

    /// Root of the whole document.
    fn document(&self) -> Self::Node;

    /// Descendants of `root` (not `root` itself) matching any selector in
    /// `selectors`, in document order.
    fn query_all(&self, root: &Self::Node, selectors: &SelectorSet) -> Vec<Self::Node>;

    fn query_first(&self, root: &Self::Node, selectors: &SelectorSet) -> Option<Self::Node> {
        self.query_all(root, selectors).into_iter().next()
    }

    /// Detach `node` from the tree. Removing a node that is already detached
    /// is a no-op.
    fn remove(&self, node: &Self::Node) -> Result<(), DomError>;

    /// Activate `node` the way a user click would.
    fn activate(&self, node: &Self::Node) -> Result<(), DomError>;

    /// Current mute/volume state, `None` if `media` is not a media element.
    fn volume(&self, media: &Self::Node) -> Option<VolumeState>;

    fn set_muted(&self, media: &Self::Node, muted: bool) -> Result<(), DomError>;

    fn set_volume(&self, media: &Self::Node, volume: f64) -> Result<(), DomError>;
}
