//! # Editor View
//!
//! The controller tying an immutable [`EditorState`] to a live rendering
//! tree.
//!
//! ## Update cycle
//!
//! ```text
//! dispatch(tr) ──► [override] ──► set_state(tr.apply())
//!                                      │
//!                  doc or dirty changed? ──no──► selection changed? ──no──► done
//!                          │ yes                        │ yes
//!                          ▼                            │
//!        guard ─► stop observer ─► DocView::update      │
//!                 ─► start observer ─► clear_dom_state  │
//!                          │                            │
//!                          └──────► selection_to_dom ◄──┘ ─► drop guard
//! ```
//!
//! Input flows the other way through [`EditorView::poll`]: queued mutation
//! records and selection changes are filtered, turned into transactions and
//! dispatched.

use crate::domobserver::DomObserver;
use crate::input::{self, DomEvent, EditorProps};
use crate::selection::{selection_to_dom, SelectionReader};
use crate::tracker::UpdateTracker;
use crate::viewdesc::DocView;
use crate::{ViewConfig, ViewError};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, error, instrument, trace, warn};
use weft_dom::{Dom, DomHandle, NodeId, NodeKind};
use weft_state::{EditorState, Transaction};

/// Replacement for the default `dispatch`
///
/// Receives the view so it can intercept the transaction and then commit
/// it (or a derived one) through [`EditorView::set_state`].
pub type DispatchFn = Rc<dyn Fn(&mut EditorView, Transaction)>;

/// Summary of one [`EditorView::poll`] turn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollOutcome {
    /// External mutations that survived filtering
    pub changes: usize,
    pub text_dispatched: bool,
    pub selection_dispatched: bool,
    /// Dirty lines were re-synced without a document change
    pub resynced: bool,
}

pub struct EditorView {
    state: EditorState,
    props: EditorProps,
    config: ViewConfig,
    dispatch_override: Option<DispatchFn>,
    handle: DomHandle,
    outer: NodeId,
    content: NodeId,
    root: Cell<Option<NodeId>>,
    doc_view: DocView,
    observer: DomObserver,
    selection_reader: SelectionReader,
    tracker: Rc<UpdateTracker>,
    reconciles: u64,
}

impl EditorView {
    /// Create a view with the default markup
    ///
    /// The outer element is created detached; mount [`dom()`](Self::dom)
    /// wherever the view should appear.
    pub fn new(
        dom: DomHandle,
        state: EditorState,
        props: EditorProps,
        dispatch: Option<DispatchFn>,
    ) -> Result<Self, ViewError> {
        Self::with_config(dom, state, props, dispatch, ViewConfig::default())
    }

    pub fn with_config(
        dom: DomHandle,
        state: EditorState,
        props: EditorProps,
        dispatch: Option<DispatchFn>,
        config: ViewConfig,
    ) -> Result<Self, ViewError> {
        let tracker = UpdateTracker::new();

        let (outer, content, doc_view) = {
            let mut tree = dom.borrow_mut();
            let outer = tree.create_element(&config.outer_tag);
            tree.set_attribute(outer, "class", &config.outer_class)?;
            let content = tree.create_element(&config.content_tag);
            tree.set_attribute(content, "class", &config.content_class)?;
            tree.set_attribute(content, "contenteditable", "true")?;
            tree.append_child(outer, content)?;

            let doc_view = DocView::new(&mut tree, content, &state.doc, &config)?;
            (outer, content, doc_view)
        };

        let mut observer = DomObserver::new(content, config.observe_options(), Rc::clone(&tracker));
        observer.start(&mut dom.borrow_mut())?;

        debug!(
            lines = state.doc.line_count(),
            content = %content,
            "Editor view created"
        );

        Ok(Self {
            state,
            props,
            config,
            dispatch_override: dispatch,
            handle: dom,
            outer,
            content,
            root: Cell::new(None),
            doc_view,
            observer,
            selection_reader: SelectionReader::new(Rc::clone(&tracker)),
            tracker,
            reconciles: 0,
        })
    }

    /// Route a transaction through the dispatch override, or apply it
    pub fn dispatch(&mut self, tr: Transaction) {
        match self.dispatch_override.clone() {
            Some(dispatch) => dispatch(self, tr),
            None => {
                let state = tr.apply();
                self.set_state(state);
            }
        }
    }

    /// Replace the state and bring the rendering tree in line with it
    #[instrument(skip_all, fields(doc_len = state.doc.len()))]
    pub fn set_state(&mut self, state: EditorState) {
        let prev = std::mem::replace(&mut self.state, state);

        let update_dom = self.state.doc != prev.doc || self.doc_view.has_dirty_ranges();
        let update_selection = update_dom || prev.selection != self.state.selection;
        if !update_selection {
            trace!("State unchanged; nothing to render");
            return;
        }

        let _guard = self.tracker.acquire(&self.handle);

        if update_dom {
            let mut dom = self.handle.borrow_mut();
            self.observer.stop(&mut dom);
            let report = self.doc_view.update(&mut dom, &self.state.doc);
            self.reconciles += 1;
            if let Err(e) = self.observer.start(&mut dom) {
                error!(error = %e, "Could not restart the mutation observer");
            }
            drop(dom);
            self.selection_reader.clear_dom_state();
            debug!(
                created = report.created,
                removed = report.removed,
                updated = report.updated,
                full_rebuild = report.full_rebuild,
                "Document rendered"
            );
        }

        selection_to_dom(self, false);
    }

    /// Focus the content and write the selection into it
    pub fn focus(&mut self) {
        let _guard = self.tracker.acquire(&self.handle);
        selection_to_dom(self, true);
    }

    pub fn has_focus(&self) -> bool {
        let root = self.root();
        self.handle.borrow().active_element(root) == Some(self.content)
    }

    /// Document or shadow root the view is mounted in
    ///
    /// Falls back to the global document, without caching, while the view
    /// is not mounted anywhere.
    pub fn root(&self) -> NodeId {
        let dom = self.handle.borrow();

        if let Some(root) = self.root.get() {
            if dom.exists(root) && dom.root_of(self.outer) == root {
                return root;
            }
            trace!(root = %root, "Cached root no longer holds the view");
            self.root.set(None);
        }

        match find_root(&dom, self.outer) {
            Some(root) => {
                self.root.set(Some(root));
                root
            }
            None => {
                debug!(outer = %self.outer, "View is not mounted; using the global document");
                dom.document()
            }
        }
    }

    /// Drop the cached root, e.g. after moving the view to another document
    pub fn invalidate_root(&self) {
        self.root.set(None);
    }

    /// Run one host event-loop turn
    ///
    /// Pulls pending mutation records and selection changes, turns external
    /// edits into transactions and dispatches them.
    #[instrument(skip_all)]
    pub fn poll(&mut self) -> PollOutcome {
        let mut outcome = PollOutcome::default();
        if self.tracker.is_held() {
            warn!("Poll requested during an update; ignored");
            return outcome;
        }

        let horizon = self.handle.borrow().seq();
        self.observer.flush(&mut self.handle.borrow_mut());
        let changes = self.observer.take_changes();
        outcome.changes = changes.len();

        if !changes.is_empty() {
            let targets: Vec<NodeId> = changes.iter().map(|change| change.target).collect();
            let ranges = self.doc_view.ranges_for_nodes(&self.handle.borrow(), &targets);
            for range in ranges {
                match range {
                    Some((from, to)) => self.doc_view.mark_dirty(from, to),
                    None => self.doc_view.mark_dirty(0, self.state.doc.len()),
                }
            }
        }

        match input::read_dom_change(self) {
            Some(tr) => {
                self.dispatch(tr);
                outcome.text_dispatched = true;
            }
            None if self.doc_view.has_dirty_ranges() => {
                let state = self.state.clone();
                self.set_state(state);
                outcome.resynced = true;
            }
            None => {}
        }

        let root = self.root();
        let selection = {
            let mut dom = self.handle.borrow_mut();
            self.selection_reader.read(&mut dom, root, &self.doc_view)
        };
        if let Some(selection) = selection {
            let selection = selection.clamp(self.state.doc.len());
            if selection != self.state.selection {
                let tr = self.state.transaction().set_selection(selection);
                self.dispatch(tr);
                outcome.selection_dispatched = true;
            }
        }

        self.tracker.prune(horizon);
        outcome
    }

    /// Route a host event through the props handlers and the defaults
    pub fn handle_event(&mut self, event: &DomEvent) -> bool {
        input::handle_event(self, event)
    }

    // ----- queries ------------------------------------------------------

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn props(&self) -> &EditorProps {
        &self.props
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// Outer element of the view
    pub fn dom(&self) -> NodeId {
        self.outer
    }

    /// Editable content container
    pub fn content_dom(&self) -> NodeId {
        self.content
    }

    pub fn dom_handle(&self) -> &DomHandle {
        &self.handle
    }

    pub fn doc_view(&self) -> &DocView {
        &self.doc_view
    }

    pub fn observer(&self) -> &DomObserver {
        &self.observer
    }

    pub fn selection_reader(&self) -> &SelectionReader {
        &self.selection_reader
    }

    pub(crate) fn selection_reader_mut(&mut self) -> &mut SelectionReader {
        &mut self.selection_reader
    }

    /// Number of times the document view has been reconciled
    pub fn reconcile_count(&self) -> u64 {
        self.reconciles
    }

    /// Text currently shown by the content container
    pub fn dom_text(&self) -> String {
        self.doc_view.read_text(&self.handle.borrow())
    }
}

impl fmt::Debug for EditorView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorView")
            .field("state", &self.state)
            .field("outer", &self.outer)
            .field("content", &self.content)
            .field("root", &self.root.get())
            .field("reconciles", &self.reconciles)
            .finish_non_exhaustive()
    }
}

/// Nearest document or shadow root above `node`
fn find_root(dom: &Dom, node: NodeId) -> Option<NodeId> {
    let mut current = dom.parent(node);
    while let Some(id) = current {
        match dom.kind(id) {
            Some(NodeKind::Document) | Some(NodeKind::ShadowRoot { .. }) => return Some(id),
            _ => current = dom.parent(id),
        }
    }
    None
}
