use crate::ViewError;
use serde::{Deserialize, Serialize};
use weft_dom::ObserveOptions;

/// Markup and observation settings for an editor view
///
/// Every field has a default, so a partial JSON object is enough:
///
/// ```json
/// { "contentClass": "editor-content", "observeAttributes": false }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewConfig {
    /// Tag of the outer container
    #[serde(default = "default_outer_tag")]
    pub outer_tag: String,

    #[serde(default = "default_outer_class")]
    pub outer_class: String,

    /// Tag of the editable content container
    #[serde(default = "default_content_tag")]
    pub content_tag: String,

    #[serde(default = "default_content_class")]
    pub content_class: String,

    /// Tag of the element rendered for each document line
    #[serde(default = "default_line_tag")]
    pub line_tag: String,

    #[serde(default = "default_line_class")]
    pub line_class: String,

    /// Whether attribute drift inside the content is reported
    #[serde(default = "default_true")]
    pub observe_attributes: bool,
}

fn default_outer_tag() -> String {
    "div".to_string()
}

fn default_outer_class() -> String {
    "CM".to_string()
}

fn default_content_tag() -> String {
    "pre".to_string()
}

fn default_content_class() -> String {
    "CM-content".to_string()
}

fn default_line_tag() -> String {
    "div".to_string()
}

fn default_line_class() -> String {
    "CM-line".to_string()
}

fn default_true() -> bool {
    true
}

impl ViewConfig {
    /// Parse a configuration object
    pub fn from_json(json: &str) -> Result<Self, ViewError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Observer options for the content container
    pub fn observe_options(&self) -> ObserveOptions {
        ObserveOptions {
            child_list: true,
            character_data: true,
            attributes: self.observe_attributes,
            subtree: true,
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            outer_tag: default_outer_tag(),
            outer_class: default_outer_class(),
            content_tag: default_content_tag(),
            content_class: default_content_class(),
            line_tag: default_line_tag(),
            line_class: default_line_class(),
            observe_attributes: default_true(),
        }
    }
}
