use crate::NodeId;
use serde::{Deserialize, Serialize};

/// A point in the rendering tree
///
/// For text nodes `offset` counts characters; for other nodes it counts
/// children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomPosition {
    pub node: NodeId,
    pub offset: usize,
}

impl DomPosition {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// Native selection of a document or shadow root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomSelection {
    pub anchor: DomPosition,
    pub focus: DomPosition,
}

impl DomSelection {
    pub fn new(anchor: DomPosition, focus: DomPosition) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(pos: DomPosition) -> Self {
        Self {
            anchor: pos,
            focus: pos,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

/// Selection and focus state owned by a document or shadow root
#[derive(Debug, Clone, Default)]
pub(crate) struct RootState {
    pub selection: Option<DomSelection>,
    pub active_element: Option<NodeId>,
    /// Sequence numbers of selection changes not yet taken by a listener
    pub selection_changes: Vec<u64>,
}
