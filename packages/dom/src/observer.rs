//! # Mutation Records
//!
//! Observer registrations and the records the tree queues for them.
//!
//! Records are queued at mutation time and only handed out when the
//! consumer asks for them (`Dom::take_records`), which is how a host event
//! loop delivers them as one batch on its next turn. Disconnecting drops a
//! registration together with everything still queued for it.

use crate::NodeId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObserverId(pub(crate) u32);

/// What an observer registration reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub character_data: bool,
    pub attributes: bool,
    /// Also observe descendants of the target
    pub subtree: bool,
}

impl ObserveOptions {
    /// Everything below and including the target
    pub fn all() -> Self {
        Self {
            child_list: true,
            character_data: true,
            attributes: true,
            subtree: true,
        }
    }

    pub(crate) fn accepts(&self, kind: &MutationKind) -> bool {
        match kind {
            MutationKind::ChildList => self.child_list,
            MutationKind::CharacterData => self.character_data,
            MutationKind::Attributes { .. } => self.attributes,
        }
    }
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationKind {
    ChildList,
    CharacterData,
    Attributes { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRecord {
    /// Tree sequence number of the mutation
    pub seq: u64,
    pub kind: MutationKind,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
}

#[derive(Debug)]
pub(crate) struct Registration {
    pub target: NodeId,
    pub options: ObserveOptions,
    pub records: Vec<MutationRecord>,
}
