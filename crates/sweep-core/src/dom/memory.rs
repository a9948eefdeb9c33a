//! Arena-backed in-memory DOM.

use std::cell::RefCell;

use super::{Dom, DomError, VolumeState};
use crate::selector::{ElementView, Selector, SelectorError, SelectorSet};

/// Index of a node in a [`MemoryDom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    attributes: Vec<(String, String)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    protected: bool,
    clicks: u32,
    media: Option<VolumeState>,
}

impl NodeData {
    fn new(tag: &str, parent: Option<NodeId>) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            parent,
            children: Vec::new(),
            protected: false,
            clicks: 0,
            media: None,
        }
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.attributes.push((name, value.to_string())),
        }
    }
}

impl ElementView for NodeData {
    fn tag_name(&self) -> &str {
        &self.tag
    }

    fn id(&self) -> Option<&str> {
        self.attribute("id")
    }

    fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Small mutable document tree.
///
/// Node `0` is the `<html>` root returned by [`Dom::document`]. Nodes are never
/// freed; removal only unlinks them from their parent, so handles stay valid.
#[derive(Debug)]
pub struct MemoryDom {
    nodes: RefCell<Vec<NodeData>>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    pub fn new() -> Self {
        Self {
            nodes: RefCell::new(vec![NodeData::new("html", None)]),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Append a child built from a compound selector, e.g.
    /// `button.ytp-ad-skip-button[aria-label="Skip ad"]`. The tag defaults to
    /// `div`.
    pub fn append(&self, parent: NodeId, source: &str) -> Result<NodeId, SelectorError> {
        let selector = Selector::parse(source)?;
        let mut data = NodeData::new(selector.tag().unwrap_or("div"), Some(parent));
        if let Some(id) = selector.id() {
            data.set_attribute("id", id);
        }
        if !selector.classes().is_empty() {
            data.set_attribute("class", &selector.classes().join(" "));
        }
        for attribute in selector.attributes() {
            data.set_attribute(&attribute.name, attribute.value.as_deref().unwrap_or(""));
        }
        Ok(self.push(parent, data))
    }

    /// Append a `<video>` element with the given playback state.
    pub fn append_video(&self, parent: NodeId, muted: bool, volume: f64) -> NodeId {
        let mut data = NodeData::new("video", Some(parent));
        data.media = Some(VolumeState { muted, volume });
        self.push(parent, data)
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        self.nodes.borrow_mut()[node.0].set_attribute(name, value);
    }

    pub fn add_class(&self, node: NodeId, class: &str) {
        let mut nodes = self.nodes.borrow_mut();
        let data = &mut nodes[node.0];
        let mut classes: Vec<String> = data
            .attribute("class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
        data.set_attribute("class", &classes.join(" "));
    }

    pub fn remove_class(&self, node: NodeId, class: &str) {
        let mut nodes = self.nodes.borrow_mut();
        let data = &mut nodes[node.0];
        let classes: Vec<&str> = data
            .attribute("class")
            .map(|c| c.split_whitespace().filter(|existing| *existing != class).collect())
            .unwrap_or_default();
        let joined = classes.join(" ");
        data.set_attribute("class", &joined);
    }

    /// Make `remove`, `activate` and media writes on `node` fail.
    pub fn protect(&self, node: NodeId) {
        self.nodes.borrow_mut()[node.0].protected = true;
    }

    /// Unlink `node` the way page scripts would, bypassing protection.
    pub fn detach(&self, node: NodeId) {
        unlink(&mut self.nodes.borrow_mut(), node);
    }

    /// Whether `node` is still reachable from the root.
    pub fn is_attached(&self, node: NodeId) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = node;
        loop {
            if current == NodeId(0) {
                return true;
            }
            match nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn clicks(&self, node: NodeId) -> u32 {
        self.nodes.borrow()[node.0].clicks
    }

    pub fn media(&self, node: NodeId) -> Option<VolumeState> {
        self.nodes.borrow()[node.0].media
    }

    /// Attached elements in the whole document matching `selectors`.
    pub fn count_matching(&self, selectors: &SelectorSet) -> usize {
        self.query_all(&self.root(), selectors).len()
    }

    fn push(&self, parent: NodeId, data: NodeData) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId(nodes.len());
        nodes.push(data);
        nodes[parent.0].children.push(id);
        id
    }
}

fn unlink(nodes: &mut [NodeData], node: NodeId) {
    if let Some(parent) = nodes[node.0].parent.take() {
        nodes[parent.0].children.retain(|child| *child != node);
    }
}

impl Dom for MemoryDom {
    type Node = NodeId;

    fn document(&self) -> NodeId {
        self.root()
    }

    fn query_all(&self, root: &NodeId, selectors: &SelectorSet) -> Vec<NodeId> {
        let nodes = self.nodes.borrow();
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = nodes[root.0].children.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            let data = &nodes[id.0];
            if selectors.matches(data) {
                found.push(id);
            }
            stack.extend(data.children.iter().rev().copied());
        }

        found
    }

    fn remove(&self, node: &NodeId) -> Result<(), DomError> {
        let mut nodes = self.nodes.borrow_mut();
        if nodes[node.0].protected {
            return Err(DomError::Protected);
        }
        unlink(&mut nodes, *node);
        Ok(())
    }

    fn activate(&self, node: &NodeId) -> Result<(), DomError> {
        let mut nodes = self.nodes.borrow_mut();
        let data = &mut nodes[node.0];
        if data.protected {
            return Err(DomError::Protected);
        }
        data.clicks += 1;
        Ok(())
    }

    fn volume(&self, media: &NodeId) -> Option<VolumeState> {
        self.media(*media)
    }

    fn set_muted(&self, media: &NodeId, muted: bool) -> Result<(), DomError> {
        let mut nodes = self.nodes.borrow_mut();
        let data = &mut nodes[media.0];
        if data.protected {
            return Err(DomError::Protected);
        }
        let state = data.media.as_mut().ok_or(DomError::NotMedia)?;
        state.muted = muted;
        Ok(())
    }

    fn set_volume(&self, media: &NodeId, volume: f64) -> Result<(), DomError> {
        let mut nodes = self.nodes.borrow_mut();
        let data = &mut nodes[media.0];
        if data.protected {
            return Err(DomError::Protected);
        }
        let state = data.media.as_mut().ok_or(DomError::NotMedia)?;
        state.volume = volume;
        Ok(())
    }
}
