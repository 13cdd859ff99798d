use serde::{Deserialize, Serialize};

/// Which side of an insertion a mapped position sticks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assoc {
    Before,
    After,
}

/// Replacement of `from..to` with `insert`, in the coordinates of the
/// document it is applied to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub from: usize,
    pub to: usize,
    pub insert: String,
}

impl Change {
    pub fn new(from: usize, to: usize, insert: impl Into<String>) -> Self {
        Self {
            from,
            to,
            insert: insert.into(),
        }
    }

    /// Number of characters inserted
    pub fn inserted_len(&self) -> usize {
        self.insert.chars().count()
    }

    /// Map a position in the old document to the new one
    ///
    /// Positions inside a deleted range collapse onto its start (`Before`)
    /// or the end of the inserted text (`After`).
    pub fn map_pos(&self, pos: usize, assoc: Assoc) -> usize {
        let inserted = self.inserted_len();

        if pos < self.from || (pos == self.from && assoc == Assoc::Before) {
            return pos;
        }
        if pos > self.to || (pos == self.to && assoc == Assoc::After) {
            return pos - (self.to - self.from) + inserted;
        }

        match assoc {
            Assoc::Before => self.from,
            Assoc::After => self.from + inserted,
        }
    }
}
