//! # Weft DOM
//!
//! In-memory rendering tree used as the host platform of the editor view.
//!
//! The tree plays the part a browser's live document plays for a web
//! editor: it is mutable, shared, and may be changed by parties other than
//! the view (the user typing, extensions, the platform itself). It exposes
//! the handful of platform facilities the view relies on:
//!
//! - structural and text mutations with generational node handles
//! - mutation observer registrations with queued, batch-delivered records
//! - a native selection and an active element per document or shadow root
//!
//! ```rust
//! use weft_dom::{Dom, ObserveOptions};
//!
//! let mut dom = Dom::new();
//! let body = dom.create_element("div");
//! dom.append_child(dom.document(), body)?;
//!
//! let observer = dom.observe(body, ObserveOptions::all())?;
//! let text = dom.create_text("hi");
//! dom.append_child(body, text)?;
//!
//! assert_eq!(dom.take_records(observer).len(), 1);
//! # Ok::<(), weft_dom::DomError>(())
//! ```

mod error;
mod node;
mod observer;
mod selection;
mod tree;

pub use error::DomError;
pub use node::{NodeId, NodeKind};
pub use observer::{MutationKind, MutationRecord, ObserveOptions, ObserverId};
pub use selection::{DomPosition, DomSelection};
pub use tree::{Dom, DomHandle};
