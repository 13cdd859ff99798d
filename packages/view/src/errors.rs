//! Error types for the view

use thiserror::Error;
use weft_dom::DomError;

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("Rendering tree error: {0}")]
    Dom(#[from] DomError),

    #[error("Invalid view configuration: {0}")]
    Config(#[from] serde_json::Error),
}
