use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Generational handle to a node in a [`Dom`](crate::Dom)
///
/// Freed slots are reused with a bumped generation, so a handle to a removed
/// node never resolves to whatever later occupies its slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Document,
    /// Shadow roots have no parent; `host` links them to the light tree
    ShadowRoot { host: NodeId },
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
    },
    Text { data: String },
}

impl NodeKind {
    pub fn element(tag: impl Into<String>) -> Self {
        NodeKind::Element {
            tag: tag.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn text(data: impl Into<String>) -> Self {
        NodeKind::Text { data: data.into() }
    }

    /// Documents and shadow roots own a selection and an active element
    pub fn is_root(&self) -> bool {
        matches!(self, NodeKind::Document | NodeKind::ShadowRoot { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self, NodeKind::Text { .. })
    }

    pub fn is_element(&self) -> bool {
        matches!(self, NodeKind::Element { .. })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl NodeData {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Slot {
    pub generation: u32,
    pub node: Option<NodeData>,
}
