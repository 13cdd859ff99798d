//! # Input Routing
//!
//! Host events enter the view through [`handle_event`]. Handlers registered
//! in [`EditorProps`] see every event first; whatever they leave unhandled
//! falls through to the defaults, which pull pending tree changes into the
//! state via [`EditorView::poll`].

use crate::EditorView;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace, warn};
use weft_dom::NodeId;
use weft_state::{Selection, Transaction};

/// Host event, identified by its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub name: String,
    pub target: Option<NodeId>,
}

impl DomEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: None,
        }
    }

    pub fn with_target(mut self, target: NodeId) -> Self {
        self.target = Some(target);
        self
    }
}

/// Returns `true` when the event was handled
pub type DomEventHandler = Rc<dyn Fn(&mut EditorView, &DomEvent) -> bool>;

#[derive(Clone, Default)]
pub struct EditorProps {
    /// Handlers keyed by event name, consulted before the defaults
    pub handle_dom_events: HashMap<String, DomEventHandler>,
}

impl EditorProps {
    pub fn on(mut self, name: impl Into<String>, handler: DomEventHandler) -> Self {
        self.handle_dom_events.insert(name.into(), handler);
        self
    }
}

impl fmt::Debug for EditorProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.handle_dom_events.keys().collect();
        names.sort();
        f.debug_struct("EditorProps")
            .field("handle_dom_events", &names)
            .finish()
    }
}

pub fn handle_event(view: &mut EditorView, event: &DomEvent) -> bool {
    let handler = view.props().handle_dom_events.get(&event.name).cloned();
    if let Some(handler) = handler {
        if handler(view, event) {
            trace!(event = %event.name, "Event handled by props");
            return true;
        }
    }

    match event.name.as_str() {
        "input" | "selectionchange" => {
            view.poll();
            true
        }
        "focus" | "blur" => true,
        _ => false,
    }
}

/// Build a transaction turning the document into what the content
/// container currently shows
///
/// The replacement is the smallest one covering the difference; the
/// native selection, when it lies in the content, becomes the new
/// selection.
pub fn read_dom_change(view: &EditorView) -> Option<Transaction> {
    let root = view.root();
    let dom = view.dom_handle().borrow();
    let shown = view.doc_view().read_text(&dom);
    let doc = view.state().doc.to_string();
    if shown == doc {
        return None;
    }

    let (from, to, insert) = minimal_replacement(&doc, &shown);
    let selection = dom.selection(root).and_then(|native| {
        let anchor = view.doc_view().dom_to_pos(&dom, native.anchor)?;
        let head = view.doc_view().dom_to_pos(&dom, native.focus)?;
        Some(Selection::range(anchor, head))
    });

    let tr = match view.state().transaction().replace(from, to, &insert) {
        Ok(tr) => tr,
        Err(e) => {
            warn!(error = %e, from, to, "Tree change does not fit the document");
            return None;
        }
    };
    debug!(from, to, inserted = insert.chars().count(), "Read change from the tree");

    Some(match selection {
        Some(selection) => tr.set_selection(selection),
        None => tr,
    })
}

/// `(from, to, insert)` such that replacing `from..to` of `old` with
/// `insert` yields `new`, in character offsets
fn minimal_replacement(old: &str, new: &str) -> (usize, usize, String) {
    let old: Vec<char> = old.chars().collect();
    let new: Vec<char> = new.chars().collect();

    let prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();
    let room = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(room)
        .take_while(|(a, b)| a == b)
        .count();

    let insert = new[prefix..new.len() - suffix].iter().collect();
    (prefix, old.len() - suffix, insert)
}
