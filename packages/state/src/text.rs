//! # Document Text
//!
//! Immutable line list backing every `EditorState`.
//!
//! Lines are stored as shared `Arc<str>` slices inside a shared vector, so a
//! replacement only allocates the lines it touches and an unchanged document
//! can be recognized with a pointer comparison.

use crate::StateError;
use std::fmt;
use std::sync::Arc;

/// Immutable document content
#[derive(Clone)]
pub struct Text {
    lines: Arc<Vec<Arc<str>>>,
    len: usize,
}

/// Location of a single line inside a `Text`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInfo {
    /// Zero-based line number
    pub number: usize,
    /// Offset of the first character of the line
    pub start: usize,
    /// Offset just past the last character (before the line break)
    pub end: usize,
}

impl LineInfo {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl Text {
    /// Build a document from a string, splitting on `\n`
    pub fn new(content: &str) -> Self {
        Self::from_lines(content.split('\n').map(Arc::from).collect())
    }

    fn from_lines(mut lines: Vec<Arc<str>>) -> Self {
        if lines.is_empty() {
            lines.push(Arc::from(""));
        }
        let chars: usize = lines.iter().map(|line| line.chars().count()).sum();
        let len = chars + lines.len() - 1;

        Self {
            lines: Arc::new(lines),
            len,
        }
    }

    /// Length in characters, counting each line break as one
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of lines (an empty document has one empty line)
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Content of line `number`, without its line break
    pub fn line(&self, number: usize) -> Option<&str> {
        self.lines.get(number).map(|line| &**line)
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> + '_ {
        self.lines.iter().map(|line| &**line)
    }

    /// Find the line containing `pos`
    ///
    /// A position sitting on a line break belongs to the line it ends.
    pub fn line_at(&self, pos: usize) -> Result<LineInfo, StateError> {
        if pos > self.len {
            return Err(StateError::OutOfRange { pos, len: self.len });
        }

        let mut start = 0;
        for (number, line) in self.lines.iter().enumerate() {
            let end = start + line.chars().count();
            if pos <= end {
                return Ok(LineInfo { number, start, end });
            }
            start = end + 1;
        }

        Err(StateError::OutOfRange { pos, len: self.len })
    }

    /// Offset of the first character of line `number`
    pub fn line_start(&self, number: usize) -> Option<usize> {
        if number >= self.lines.len() {
            return None;
        }
        Some(
            self.lines[..number]
                .iter()
                .map(|line| line.chars().count() + 1)
                .sum(),
        )
    }

    /// Copy out the characters in `from..to`
    pub fn slice(&self, from: usize, to: usize) -> Result<String, StateError> {
        self.check_range(from, to)?;
        Ok(self.to_string().chars().skip(from).take(to - from).collect())
    }

    /// Produce a new document with `from..to` replaced by `insert`
    ///
    /// Lines outside the touched region are shared with `self`.
    pub fn replace(&self, from: usize, to: usize, insert: &str) -> Result<Text, StateError> {
        self.check_range(from, to)?;

        let start = self.line_at(from)?;
        let end = self.line_at(to)?;

        let head: String = self.lines[start.number]
            .chars()
            .take(from - start.start)
            .collect();
        let tail: String = self.lines[end.number]
            .chars()
            .skip(to - end.start)
            .collect();
        let middle = format!("{head}{insert}{tail}");

        let mut lines = Vec::with_capacity(self.lines.len() + 1);
        lines.extend(self.lines[..start.number].iter().cloned());
        lines.extend(middle.split('\n').map(Arc::from));
        lines.extend(self.lines[end.number + 1..].iter().cloned());

        Ok(Self::from_lines(lines))
    }

    /// Whether both values share the same storage
    pub fn ptr_eq(&self, other: &Text) -> bool {
        Arc::ptr_eq(&self.lines, &other.lines)
    }

    fn check_range(&self, from: usize, to: usize) -> Result<(), StateError> {
        if from > to {
            return Err(StateError::InvertedRange { from, to });
        }
        if to > self.len {
            return Err(StateError::OutOfRange { pos: to, len: self.len });
        }
        Ok(())
    }
}

impl PartialEq for Text {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.len == other.len && self.lines == other.lines)
    }
}

impl Eq for Text {}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(line)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Text({:?})", self.to_string())
    }
}

impl Default for Text {
    fn default() -> Self {
        Self::new("")
    }
}

impl From<&str> for Text {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}
