//! # Weft View
//!
//! Keeps an immutable [`EditorState`](weft_state::EditorState) and a live,
//! shared rendering tree in sync, in both directions.
//!
//! ## Architecture
//!
//! ```text
//!            transactions                       host events
//!                 │                                  │
//!                 ▼                                  ▼
//! ┌──────────────────────────────┐     ┌──────────────────────────┐
//! │ EditorView                   │◄────│ input: props handlers,   │
//! │  set_state / dispatch / poll │     │ defaults, read_dom_change│
//! └──────────────────────────────┘     └──────────────────────────┘
//!     │              │           ▲
//!     ▼              ▼           │
//! ┌─────────┐  ┌───────────┐  ┌────────────────┐
//! │ DocView │  │ Selection │  │ DomObserver    │
//! │ mirror, │  │ bridge    │  │ filtered batch │
//! │ diff    │  │           │  │ of mutations   │
//! └─────────┘  └───────────┘  └────────────────┘
//!     │              │           ▲
//!     ▼              ▼           │
//! ┌──────────────────────────────────────────────┐
//! │ weft_dom::Dom (shared with the host)          │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **No feedback loops**: every write the view makes happens under an
//!    [`IgnoreGuard`]; the tree events it produces are recognised by
//!    sequence number and never come back as input
//! 2. **Minimal writes**: an unchanged state touches nothing, a
//!    selection-only change touches only the native selection, and a
//!    document change touches only the lines it affects
//! 3. **Self-healing**: a tree changed behind the view's back is
//!    validated and repaired on the next update instead of failing
//!
//! ## Usage
//!
//! ```rust
//! use std::rc::Rc;
//! use weft_dom::Dom;
//! use weft_state::{EditorState, Selection};
//! use weft_view::{EditorProps, EditorView};
//!
//! let dom = Dom::new_handle();
//! let mut view = EditorView::new(Rc::clone(&dom), EditorState::from_text("ab"), EditorProps::default(), None)?;
//! let document = dom.borrow().document();
//! dom.borrow_mut().append_child(document, view.dom())?;
//!
//! let tr = view.state().transaction().insert(1, "c")?.set_selection(Selection::cursor(2));
//! view.dispatch(tr);
//!
//! assert_eq!(view.dom_text(), "acb");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
mod domobserver;
mod errors;
mod input;
mod selection;
mod tracker;
mod view;
mod viewdesc;

pub use config::ViewConfig;
pub use domobserver::{DomChange, DomObserver};
pub use errors::ViewError;
pub use input::{handle_event, read_dom_change, DomEvent, DomEventHandler, EditorProps};
pub use selection::{selection_to_dom, SelectionReader};
pub use tracker::{IgnoreGuard, SelfSpan, UpdateTracker};
pub use view::{DispatchFn, EditorView, PollOutcome};
pub use viewdesc::{DirtyRanges, DocView, LineView, ReconcileReport};
