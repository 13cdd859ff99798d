//! # Transactions
//!
//! A transaction records an ordered list of changes against a start state and
//! an optional explicit selection. Each change is validated against the
//! document produced by the changes before it, so building a transaction
//! never yields an unappliable one.

use crate::{Change, EditorState, Selection, StateError, Text};

#[derive(Debug, Clone)]
pub struct Transaction {
    start: EditorState,
    doc: Text,
    changes: Vec<Change>,
    selection: Option<Selection>,
}

impl Transaction {
    pub(crate) fn new(start: EditorState) -> Self {
        Self {
            doc: start.doc.clone(),
            start,
            changes: Vec::new(),
            selection: None,
        }
    }

    /// Replace `from..to` in the current working document
    pub fn replace(mut self, from: usize, to: usize, insert: &str) -> Result<Self, StateError> {
        self.doc = self.doc.replace(from, to, insert)?;
        self.changes.push(Change::new(from, to, insert));
        Ok(self)
    }

    pub fn insert(self, pos: usize, text: &str) -> Result<Self, StateError> {
        self.replace(pos, pos, text)
    }

    pub fn delete(self, from: usize, to: usize) -> Result<Self, StateError> {
        self.replace(from, to, "")
    }

    /// Set the resulting selection explicitly instead of mapping the old one
    pub fn set_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn start(&self) -> &EditorState {
        &self.start
    }

    /// Document after all changes so far
    pub fn doc(&self) -> &Text {
        &self.doc
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn doc_changed(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn selection_set(&self) -> bool {
        self.selection.is_some()
    }

    /// Produce the resulting state
    pub fn apply(self) -> EditorState {
        let len = self.doc.len();
        let selection = match self.selection {
            Some(selection) => selection,
            None => self
                .changes
                .iter()
                .fold(self.start.selection, |sel, change| sel.map(change)),
        };

        EditorState {
            doc: self.doc,
            selection: selection.clamp(len),
        }
    }
}
