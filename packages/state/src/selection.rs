use crate::{Assoc, Change};
use serde::{Deserialize, Serialize};

/// Logical selection: `anchor` stays put, `head` moves with the cursor
///
/// Equality (`==` / `eq`) is what the view uses to skip redundant native
/// selection writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn cursor(pos: usize) -> Self {
        Self {
            anchor: pos,
            head: pos,
        }
    }

    pub fn range(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Map through a change; a collapsed cursor moves past inserted text
    pub fn map(&self, change: &Change) -> Self {
        if self.is_empty() {
            return Self::cursor(change.map_pos(self.head, Assoc::After));
        }
        let map_end = |pos: usize| {
            if pos == self.from() {
                change.map_pos(pos, Assoc::After)
            } else {
                change.map_pos(pos, Assoc::Before)
            }
        };
        Self {
            anchor: map_end(self.anchor),
            head: map_end(self.head),
        }
    }

    /// Clamp both ends into `0..=len`
    pub fn clamp(&self, len: usize) -> Self {
        Self {
            anchor: self.anchor.min(len),
            head: self.head.min(len),
        }
    }
}
