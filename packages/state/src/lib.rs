//! # Weft State
//!
//! Immutable editor model consumed by the view layer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ state: EditorState { doc, selection }       │
//! │  - Text: shared, immutable line list        │
//! │  - Selection: anchor/head offsets           │
//! │  - Transaction: ordered changes + selection │
//! └─────────────────────────────────────────────┘
//!                     ↓ apply()
//! ┌─────────────────────────────────────────────┐
//! │ view: reconciles the rendering tree         │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **States are values**: every edit produces a new `EditorState`
//! 2. **Cheap identity**: untouched documents share storage, so comparing
//!    them is a pointer check
//! 3. **Character offsets**: positions count Unicode scalar values, and a
//!    line break occupies exactly one position
//!
//! ## Usage
//!
//! ```rust
//! use weft_state::{EditorState, Selection};
//!
//! let state = EditorState::from_text("ab");
//! let tr = state
//!     .transaction()
//!     .insert(1, "c")?
//!     .set_selection(Selection::cursor(2));
//! let next = tr.apply();
//!
//! assert_eq!(next.doc.to_string(), "acb");
//! assert_eq!(next.selection, Selection::cursor(2));
//! # Ok::<(), weft_state::StateError>(())
//! ```

mod change;
mod errors;
mod selection;
mod state;
mod text;
mod transaction;

pub use change::{Assoc, Change};
pub use errors::StateError;
pub use selection::Selection;
pub use state::EditorState;
pub use text::{LineInfo, Text};
pub use transaction::Transaction;
