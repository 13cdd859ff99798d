//! # Selection Bridge
//!
//! Two directions, both keyed on the root the view lives in:
//!
//! ```text
//! EditorState.selection ──selection_to_dom()──► native selection
//!          ▲                                         │
//!          └────────── SelectionReader::read() ◄─────┘
//! ```
//!
//! The reader remembers the last native selection it saw or the view wrote,
//! so a selection change that merely echoes that state is dropped.

use crate::tracker::UpdateTracker;
use crate::viewdesc::DocView;
use crate::EditorView;
use std::rc::Rc;
use tracing::{debug, trace, warn};
use weft_dom::{Dom, DomSelection, NodeId};
use weft_state::Selection;

#[derive(Debug)]
pub struct SelectionReader {
    tracker: Rc<UpdateTracker>,
    last: Option<DomSelection>,
}

impl SelectionReader {
    pub fn new(tracker: Rc<UpdateTracker>) -> Self {
        Self { tracker, last: None }
    }

    /// Whether the view is currently writing to the tree
    pub fn ignore_updates(&self) -> bool {
        self.tracker.is_held()
    }

    /// Forget the last observed native selection
    pub fn clear_dom_state(&mut self) {
        self.last = None;
    }

    pub fn store_dom_state(&mut self, selection: Option<DomSelection>) {
        self.last = selection;
    }

    pub fn last_dom_state(&self) -> Option<DomSelection> {
        self.last
    }

    /// Consume pending selection changes on `root` and map the native
    /// selection to document offsets
    ///
    /// Returns `None` when nothing new happened: no pending change, changes
    /// caused by the view itself, or a selection equal to the cached one.
    pub fn read(&mut self, dom: &mut Dom, root: NodeId, doc_view: &DocView) -> Option<Selection> {
        let changes = dom.take_selection_changes(root);
        if changes.is_empty() {
            return None;
        }
        if self.ignore_updates() {
            trace!(changes = changes.len(), "Selection changes during update ignored");
            return None;
        }
        if changes.iter().all(|seq| self.tracker.is_self_caused(*seq)) {
            trace!(changes = changes.len(), "Self-caused selection changes dropped");
            return None;
        }

        let current = dom.selection(root)?;
        if self.last == Some(current) {
            return None;
        }

        let anchor = doc_view.dom_to_pos(dom, current.anchor)?;
        let head = doc_view.dom_to_pos(dom, current.focus)?;
        self.last = Some(current);
        debug!(anchor, head, "Native selection changed");
        Some(Selection::range(anchor, head))
    }
}

/// Write the logical selection into the native one
///
/// The write is skipped when the root already holds an equivalent
/// selection. With `force_focus` the content container is focused as well.
pub fn selection_to_dom(view: &mut EditorView, force_focus: bool) {
    let root = view.root();
    let content = view.content_dom();
    let selection = view.state().selection;
    let handle = Rc::clone(view.dom_handle());

    let mapped = {
        let doc = &view.state().doc;
        let doc_view = view.doc_view();
        doc_view
            .pos_to_dom(doc, selection.anchor)
            .zip(doc_view.pos_to_dom(doc, selection.head))
            .map(|(anchor, head)| DomSelection::new(anchor, head))
    };

    let mut dom = handle.borrow_mut();
    if force_focus {
        if let Err(e) = dom.focus(content) {
            warn!(error = %e, "Could not focus content");
        }
    }

    let Some(target) = mapped else {
        debug!(?selection, "Selection has no tree position");
        return;
    };

    if dom.selection(root) != Some(target) {
        if let Err(e) = dom.set_selection(root, target) {
            warn!(error = %e, "Could not write native selection");
            return;
        }
        trace!(anchor = selection.anchor, head = selection.head, "Native selection written");
    }
    drop(dom);

    view.selection_reader_mut().store_dom_state(Some(target));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ViewConfig;
    use weft_dom::DomPosition;
    use weft_state::Text;

    fn setup(content: &str) -> (Dom, NodeId, DocView, Rc<UpdateTracker>) {
        let mut dom = Dom::new();
        let container = dom.create_element("pre");
        dom.append_child(dom.document(), container).unwrap();
        let doc_view = DocView::new(&mut dom, container, &Text::new(content), &ViewConfig::default()).unwrap();
        (dom, container, doc_view, UpdateTracker::new())
    }

    #[test]
    fn test_read_maps_native_selection() {
        let (mut dom, _, doc_view, tracker) = setup("ab\ncd");
        let mut reader = SelectionReader::new(tracker);
        let root = dom.document();

        let text = doc_view.lines()[1].text_node();
        let selection = DomSelection::new(DomPosition::new(text, 0), DomPosition::new(text, 2));
        dom.set_selection(root, selection).unwrap();

        assert_eq!(reader.read(&mut dom, root, &doc_view), Some(Selection::range(3, 5)));
        assert_eq!(reader.last_dom_state(), Some(selection));
        // Already consumed
        assert_eq!(reader.read(&mut dom, root, &doc_view), None);
    }

    #[test]
    fn test_read_skips_cached_state() {
        let (mut dom, _, doc_view, tracker) = setup("abc");
        let mut reader = SelectionReader::new(tracker);
        let root = dom.document();
        let text = doc_view.lines()[0].text_node();
        let selection = DomSelection::collapsed(DomPosition::new(text, 1));

        reader.store_dom_state(Some(selection));
        dom.set_selection(root, selection).unwrap();
        assert_eq!(reader.read(&mut dom, root, &doc_view), None);

        reader.clear_dom_state();
        dom.set_selection(root, selection).unwrap();
        assert_eq!(reader.read(&mut dom, root, &doc_view), Some(Selection::cursor(1)));
    }

    #[test]
    fn test_read_ignores_self_caused_changes() {
        let handle = Dom::new_handle();
        let tracker = UpdateTracker::new();
        let mut reader = SelectionReader::new(Rc::clone(&tracker));
        let (root, doc_view) = {
            let mut dom = handle.borrow_mut();
            let root = dom.document();
            let container = dom.create_element("pre");
            dom.append_child(root, container).unwrap();
            let doc_view = DocView::new(&mut dom, container, &Text::new("abc"), &ViewConfig::default()).unwrap();
            (root, doc_view)
        };
        let text = doc_view.lines()[0].text_node();

        {
            let _guard = tracker.acquire(&handle);
            assert!(reader.ignore_updates());
            handle
                .borrow_mut()
                .set_selection(root, DomSelection::collapsed(DomPosition::new(text, 2)))
                .unwrap();
        }

        assert!(!reader.ignore_updates());
        assert_eq!(reader.read(&mut handle.borrow_mut(), root, &doc_view), None);
    }

    #[test]
    fn test_read_outside_content_is_none() {
        let (mut dom, _, doc_view, tracker) = setup("abc");
        let mut reader = SelectionReader::new(tracker);
        let root = dom.document();
        let elsewhere = dom.create_text("x");
        dom.append_child(root, elsewhere).unwrap();

        dom.set_selection(root, DomSelection::collapsed(DomPosition::new(elsewhere, 0)))
            .unwrap();
        assert_eq!(reader.read(&mut dom, root, &doc_view), None);
    }
}
