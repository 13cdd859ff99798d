use crate::{Selection, Text, Transaction};

/// Immutable editor snapshot
///
/// Never mutated in place; transactions produce new instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorState {
    pub doc: Text,
    pub selection: Selection,
}

impl EditorState {
    pub fn new(doc: Text, selection: Selection) -> Self {
        let selection = selection.clamp(doc.len());
        Self { doc, selection }
    }

    /// State for `content` with the cursor at the start
    pub fn from_text(content: &str) -> Self {
        Self::new(Text::new(content), Selection::cursor(0))
    }

    /// Copy of this state with a different selection
    pub fn with_selection(&self, selection: Selection) -> Self {
        Self::new(self.doc.clone(), selection)
    }

    /// Start a transaction from this state
    pub fn transaction(&self) -> Transaction {
        Transaction::new(self.clone())
    }

    /// Apply a transaction that was started from this state
    pub fn apply(&self, tr: Transaction) -> EditorState {
        debug_assert!(
            tr.start().doc == self.doc,
            "transaction applied to a state it was not built from"
        );
        tr.apply()
    }
}

impl Default for EditorState {
    fn default() -> Self {
        Self::from_text("")
    }
}
