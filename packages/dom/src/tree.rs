//! # Rendering Tree
//!
//! Arena-backed, mutable element tree standing in for the host platform's
//! live document.
//!
//! ## Sequence numbers
//!
//! Every tree mutation, selection write and focus change bumps `seq`. Mutation
//! records and selection-change notifications carry the number of the event
//! that produced them, which lets consumers tell apart batches produced while
//! they were themselves writing to the tree.

use crate::node::{NodeData, Slot};
use crate::observer::Registration;
use crate::selection::RootState;
use crate::{
    DomError, DomPosition, DomSelection, MutationKind, MutationRecord, NodeId, NodeKind,
    ObserveOptions, ObserverId,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace};

/// Shared handle used by every party that reads or writes the tree
pub type DomHandle = Rc<RefCell<Dom>>;

#[derive(Debug)]
pub struct Dom {
    slots: Vec<Slot>,
    free: Vec<u32>,
    document: NodeId,
    seq: u64,
    mutations: u64,
    observers: Vec<Option<Registration>>,
    roots: HashMap<NodeId, RootState>,
    shadow_roots: HashMap<NodeId, NodeId>,
}

impl Dom {
    /// Create a tree containing only the global document
    pub fn new() -> Self {
        let mut dom = Self {
            slots: Vec::new(),
            free: Vec::new(),
            document: NodeId {
                index: 0,
                generation: 0,
            },
            seq: 0,
            mutations: 0,
            observers: Vec::new(),
            roots: HashMap::new(),
            shadow_roots: HashMap::new(),
        };
        dom.document = dom.create_document();
        dom
    }

    pub fn new_handle() -> DomHandle {
        Rc::new(RefCell::new(Self::new()))
    }

    /// The global document
    pub fn document(&self) -> NodeId {
        self.document
    }

    /// Sequence number of the latest tree event
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Number of structural, text and attribute mutations performed so far
    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }

    // ----- construction -------------------------------------------------

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.alloc(NodeData::new(NodeKind::element(tag)))
    }

    pub fn create_text(&mut self, data: impl Into<String>) -> NodeId {
        self.alloc(NodeData::new(NodeKind::text(data)))
    }

    /// Create an additional document (an iframe's, say)
    pub fn create_document(&mut self) -> NodeId {
        let id = self.alloc(NodeData::new(NodeKind::Document));
        self.roots.insert(id, RootState::default());
        id
    }

    /// Attach a shadow root to `host`, or return the existing one
    pub fn attach_shadow(&mut self, host: NodeId) -> Result<NodeId, DomError> {
        if !self.node(host)?.kind.is_element() {
            return Err(DomError::NotElement(host));
        }
        if let Some(existing) = self.shadow_roots.get(&host) {
            return Ok(*existing);
        }
        let id = self.alloc(NodeData::new(NodeKind::ShadowRoot { host }));
        self.roots.insert(id, RootState::default());
        self.shadow_roots.insert(host, id);
        Ok(id)
    }

    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.shadow_roots.get(&host).copied()
    }

    // ----- queries ------------------------------------------------------

    /// Whether `id` still refers to a live node
    pub fn exists(&self, id: NodeId) -> bool {
        self.node(id).is_ok()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).ok().map(|data| &data.kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok().and_then(|data| data.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.node(id) {
            Ok(data) => &data.children,
            Err(_) => &[],
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text { data } => Some(data),
            _ => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            _ => None,
        }
    }

    /// Concatenated text of every text node below `id`
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Ok(data) = self.node(id) else {
            return;
        };
        match &data.kind {
            NodeKind::Text { data } => out.push_str(data),
            _ => {
                for child in &data.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Inclusive ancestry test; does not cross shadow boundaries
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Topmost ancestor of `id` (a document, a shadow root or a detached node)
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Whether `id` is reachable from a document, through shadow hosts
    pub fn is_connected(&self, id: NodeId) -> bool {
        let root = self.root_of(id);
        match self.kind(root) {
            Some(NodeKind::Document) => true,
            Some(NodeKind::ShadowRoot { host }) => self.is_connected(*host),
            _ => false,
        }
    }

    /// Serialized markup for debugging and assertions
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Ok(data) = self.node(id) else {
            return;
        };
        match &data.kind {
            NodeKind::Document | NodeKind::ShadowRoot { .. } => {
                for child in &data.children {
                    self.write_html(*child, out);
                }
            }
            NodeKind::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    out.push_str(&format!(" {}=\"{}\"", name, escape(value)));
                }
                out.push('>');
                for child in &data.children {
                    self.write_html(*child, out);
                }
                out.push_str(&format!("</{}>", tag));
            }
            NodeKind::Text { data } => out.push_str(&escape(data)),
        }
    }

    // ----- mutations ----------------------------------------------------

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` into `parent` before `reference` (append when `None`),
    /// moving it out of its current parent first
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.check_insertable(parent, child)?;
        if let Some(reference) = reference {
            if reference == child {
                return Err(DomError::HierarchyRequest(format!(
                    "cannot insert {child} before itself"
                )));
            }
            if self.node(reference)?.parent != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    child: reference,
                });
            }
        }

        self.detach(child)?;

        let siblings = &self.node(parent)?.children;
        let index = reference
            .and_then(|reference| siblings.iter().position(|id| *id == reference))
            .unwrap_or(siblings.len());

        self.node_mut(parent)?.children.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        self.notify(parent, MutationKind::ChildList, vec![child], vec![], None);
        Ok(())
    }

    /// Detach `child` from `parent`; the node stays alive and can be reinserted
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if self.node(child)?.parent != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.detach(child)
    }

    /// Detach `id` and destroy it together with its subtree
    ///
    /// Handles to destroyed nodes stop resolving. Selections and focus that
    /// pointed into the subtree are cleared.
    pub fn remove(&mut self, id: NodeId) -> Result<(), DomError> {
        if id == self.document {
            return Err(DomError::HierarchyRequest(
                "cannot remove the global document".to_string(),
            ));
        }
        self.detach(id)?;

        let mut freed = Vec::new();
        self.free_subtree(id, &mut freed);

        for state in self.roots.values_mut() {
            if let Some(selection) = state.selection {
                if freed.contains(&selection.anchor.node) || freed.contains(&selection.focus.node) {
                    state.selection = None;
                }
            }
            if state.active_element.is_some_and(|active| freed.contains(&active)) {
                state.active_element = None;
            }
        }

        debug!(node = %id, freed = freed.len(), "Destroyed subtree");
        Ok(())
    }

    /// Swap the whole child list of `parent` in one mutation
    ///
    /// Previous children that are not in `children` are detached, not
    /// destroyed.
    pub fn replace_children(
        &mut self,
        parent: NodeId,
        children: Vec<NodeId>,
    ) -> Result<(), DomError> {
        for child in &children {
            self.check_insertable(parent, *child)?;
        }
        for child in &children {
            let current = self.node(*child)?.parent;
            if current.is_some() && current != Some(parent) {
                self.detach(*child)?;
            }
        }

        let old = std::mem::take(&mut self.node_mut(parent)?.children);
        let removed: Vec<NodeId> = old
            .iter()
            .filter(|id| !children.contains(id))
            .copied()
            .collect();
        let added: Vec<NodeId> = children
            .iter()
            .filter(|id| !old.contains(id))
            .copied()
            .collect();

        for id in &removed {
            self.node_mut(*id)?.parent = None;
        }
        for id in &children {
            self.node_mut(*id)?.parent = Some(parent);
        }
        self.node_mut(parent)?.children = children;

        self.notify(parent, MutationKind::ChildList, added, removed, None);
        Ok(())
    }

    /// Replace the data of a text node
    pub fn set_text(&mut self, id: NodeId, data: impl Into<String>) -> Result<(), DomError> {
        let data = data.into();
        let old = self.text_data_mut(id)?;
        let old_value = std::mem::replace(old, data);
        self.notify(id, MutationKind::CharacterData, vec![], vec![], Some(old_value));
        Ok(())
    }

    /// Replace `count` characters at `offset` in a text node
    pub fn replace_data(
        &mut self,
        id: NodeId,
        offset: usize,
        count: usize,
        insert: &str,
    ) -> Result<(), DomError> {
        let current = self.text(id).ok_or(DomError::NotText(id))?;
        let len = current.chars().count();
        if offset > len {
            return Err(DomError::OffsetOutOfBounds { node: id, offset });
        }
        let end = (offset + count).min(len);
        let updated: String = current
            .chars()
            .take(offset)
            .chain(insert.chars())
            .chain(current.chars().skip(end))
            .collect();
        self.set_text(id, updated)
    }

    /// Insert characters into a text node, as typing would
    pub fn insert_text(&mut self, id: NodeId, offset: usize, text: &str) -> Result<(), DomError> {
        self.replace_data(id, offset, 0, text)
    }

    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        let name = name.into();
        let old_value = match &mut self.node_mut(id)?.kind {
            NodeKind::Element { attributes, .. } => attributes.insert(name.clone(), value.into()),
            _ => return Err(DomError::NotElement(id)),
        };
        self.notify(id, MutationKind::Attributes { name }, vec![], vec![], old_value);
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        let old_value = match &mut self.node_mut(id)?.kind {
            NodeKind::Element { attributes, .. } => attributes.remove(name),
            _ => return Err(DomError::NotElement(id)),
        };
        if old_value.is_some() {
            self.notify(
                id,
                MutationKind::Attributes {
                    name: name.to_string(),
                },
                vec![],
                vec![],
                old_value,
            );
        }
        Ok(())
    }

    // ----- observers ----------------------------------------------------

    pub fn observe(&mut self, target: NodeId, options: ObserveOptions) -> Result<ObserverId, DomError> {
        self.node(target)?;
        let id = ObserverId(self.observers.len() as u32);
        self.observers.push(Some(Registration {
            target,
            options,
            records: Vec::new(),
        }));
        trace!(observer = id.0, target = %target, "Observer registered");
        Ok(id)
    }

    /// Drop a registration together with its queued records
    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        match self.observers.get_mut(id.0 as usize) {
            Some(slot) => slot.take().is_some(),
            None => false,
        }
    }

    pub fn is_observing(&self, id: ObserverId) -> bool {
        matches!(self.observers.get(id.0 as usize), Some(Some(_)))
    }

    /// Hand out everything queued for `id` since the last call
    pub fn take_records(&mut self, id: ObserverId) -> Vec<MutationRecord> {
        match self.observers.get_mut(id.0 as usize) {
            Some(Some(registration)) => std::mem::take(&mut registration.records),
            _ => Vec::new(),
        }
    }

    pub fn pending_records(&self, id: ObserverId) -> usize {
        match self.observers.get(id.0 as usize) {
            Some(Some(registration)) => registration.records.len(),
            _ => 0,
        }
    }

    // ----- selection and focus ------------------------------------------

    pub fn selection(&self, root: NodeId) -> Option<DomSelection> {
        self.roots.get(&root).and_then(|state| state.selection)
    }

    /// Write the native selection of a document or shadow root
    pub fn set_selection(&mut self, root: NodeId, selection: DomSelection) -> Result<(), DomError> {
        self.check_root(root)?;
        self.check_position(selection.anchor)?;
        self.check_position(selection.focus)?;

        self.seq += 1;
        let seq = self.seq;
        let state = self.roots.entry(root).or_default();
        state.selection = Some(selection);
        state.selection_changes.push(seq);
        trace!(seq, root = %root, "Selection changed");
        Ok(())
    }

    pub fn clear_selection(&mut self, root: NodeId) -> Result<(), DomError> {
        self.check_root(root)?;
        self.seq += 1;
        let seq = self.seq;
        let state = self.roots.entry(root).or_default();
        if state.selection.take().is_some() {
            state.selection_changes.push(seq);
        }
        Ok(())
    }

    /// Sequence numbers of selection changes on `root` since the last call
    pub fn take_selection_changes(&mut self, root: NodeId) -> Vec<u64> {
        match self.roots.get_mut(&root) {
            Some(state) => std::mem::take(&mut state.selection_changes),
            None => Vec::new(),
        }
    }

    /// Give input focus to `id`
    ///
    /// Focusing inside a shadow tree also focuses the host in the enclosing
    /// root. Focusing a detached node does nothing.
    pub fn focus(&mut self, id: NodeId) -> Result<(), DomError> {
        self.node(id)?;
        let root = self.root_of(id);
        let host = match self.kind(root) {
            Some(NodeKind::Document) => None,
            Some(NodeKind::ShadowRoot { host }) => Some(*host),
            _ => {
                trace!(node = %id, "Ignoring focus on detached node");
                return Ok(());
            }
        };

        self.seq += 1;
        self.roots.entry(root).or_default().active_element = Some(id);
        if let Some(host) = host {
            self.focus(host)?;
        }
        Ok(())
    }

    pub fn blur(&mut self, root: NodeId) -> Result<(), DomError> {
        self.check_root(root)?;
        self.seq += 1;
        if let Some(state) = self.roots.get_mut(&root) {
            state.active_element = None;
        }
        Ok(())
    }

    /// Focused element of a document or shadow root
    ///
    /// A shadow root only reports an active element while its host is the
    /// active element of the enclosing root.
    pub fn active_element(&self, root: NodeId) -> Option<NodeId> {
        let active = self.roots.get(&root)?.active_element?;
        if self.root_of(active) != root {
            return None;
        }
        if let Some(NodeKind::ShadowRoot { host }) = self.kind(root) {
            if self.active_element(self.root_of(*host)) != Some(*host) {
                return None;
            }
        }
        Some(active)
    }

    // ----- internals ----------------------------------------------------

    fn node(&self, id: NodeId) -> Result<&NodeData, DomError> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(DomError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData, DomError> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(DomError::NodeNotFound(id))
    }

    fn text_data_mut(&mut self, id: NodeId) -> Result<&mut String, DomError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Text { data } => Ok(data),
            _ => Err(DomError::NotText(id)),
        }
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(data);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(data),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    fn free_subtree(&mut self, id: NodeId, freed: &mut Vec<NodeId>) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(slot) = self.slots.get_mut(current.index as usize) else {
                continue;
            };
            if slot.generation != current.generation {
                continue;
            }
            let Some(data) = slot.node.take() else {
                continue;
            };
            slot.generation += 1;
            self.free.push(current.index);
            freed.push(current);

            stack.extend(data.children);
            if let Some(shadow) = self.shadow_roots.remove(&current) {
                stack.push(shadow);
            }
            self.roots.remove(&current);
        }
    }

    fn detach(&mut self, child: NodeId) -> Result<(), DomError> {
        let Some(parent) = self.node(child)?.parent else {
            return Ok(());
        };
        self.node_mut(parent)?.children.retain(|id| *id != child);
        self.node_mut(child)?.parent = None;
        self.notify(parent, MutationKind::ChildList, vec![], vec![child], None);
        Ok(())
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if self.node(parent)?.kind.is_text() {
            return Err(DomError::HierarchyRequest(format!(
                "text node {parent} cannot have children"
            )));
        }
        if self.node(child)?.kind.is_root() {
            return Err(DomError::HierarchyRequest(format!(
                "{child} is a root and cannot be inserted"
            )));
        }
        if self.contains(child, parent) {
            return Err(DomError::HierarchyRequest(format!(
                "inserting {child} into {parent} would create a cycle"
            )));
        }
        Ok(())
    }

    fn check_root(&self, root: NodeId) -> Result<(), DomError> {
        if self.node(root)?.kind.is_root() {
            Ok(())
        } else {
            Err(DomError::NotARoot(root))
        }
    }

    fn check_position(&self, pos: DomPosition) -> Result<(), DomError> {
        let data = self.node(pos.node)?;
        let max = match &data.kind {
            NodeKind::Text { data } => data.chars().count(),
            _ => data.children.len(),
        };
        if pos.offset > max {
            return Err(DomError::OffsetOutOfBounds {
                node: pos.node,
                offset: pos.offset,
            });
        }
        Ok(())
    }

    fn notify(
        &mut self,
        target: NodeId,
        kind: MutationKind,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
        old_value: Option<String>,
    ) {
        self.seq += 1;
        self.mutations += 1;

        let interested: Vec<usize> = self
            .observers
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let registration = slot.as_ref()?;
                let in_scope = registration.target == target
                    || (registration.options.subtree && self.contains(registration.target, target));
                (in_scope && registration.options.accepts(&kind)).then_some(index)
            })
            .collect();

        trace!(seq = self.seq, target = %target, kind = ?kind, observers = interested.len(), "Mutation");

        for index in interested {
            if let Some(Some(registration)) = self.observers.get_mut(index) {
                registration.records.push(MutationRecord {
                    seq: self.seq,
                    kind: kind.clone(),
                    target,
                    added: added.clone(),
                    removed: removed.clone(),
                    old_value: old_value.clone(),
                });
            }
        }
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
