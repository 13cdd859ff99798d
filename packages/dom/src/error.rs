//! Error types for rendering tree operations

use crate::{NodeId, ObserverId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("Hierarchy request error: {0}")]
    HierarchyRequest(String),

    #[error("Node is not text: {0}")]
    NotText(NodeId),

    #[error("Node is not an element: {0}")]
    NotElement(NodeId),

    #[error("Node is not a document or shadow root: {0}")]
    NotARoot(NodeId),

    #[error("Offset {offset} is out of bounds for {node}")]
    OffsetOutOfBounds { node: NodeId, offset: usize },

    #[error("Observer not registered: {0:?}")]
    ObserverNotFound(ObserverId),
}
