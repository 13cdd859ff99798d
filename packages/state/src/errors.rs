//! Error types for the state model

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Position {pos} is outside the document (length {len})")]
    OutOfRange { pos: usize, len: usize },

    #[error("Inverted range: {from} > {to}")]
    InvertedRange { from: usize, to: usize },
}
