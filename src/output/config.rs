//! Output configuration types

use serde::{Deserialize, Serialize};

/// Layout of the rendered tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Line-drawing tree, like `tree(1)`.
    #[default]
    Text,
    /// Nested markdown list.
    Markdown,
}

/// Configuration for output formatting.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Append a "File contents" section after the tree.
    pub include_content: bool,
    /// Folders at this depth are shown without their children (root is 0).
    pub max_depth: Option<usize>,
    /// Lines shown per file in the contents section.
    pub content_line_limit: Option<usize>,
    pub show_size: bool,
    /// Only used by `print`; `render` never emits escape codes.
    pub use_color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            include_content: false,
            max_depth: None,
            content_line_limit: None,
            show_size: false,
            use_color: true,
        }
    }
}

impl OutputConfig {
    /// Whether children of a folder at `depth` are rendered.
    pub fn descends_into(&self, depth: usize) -> bool {
        self.max_depth.is_none_or(|max| depth < max)
    }
}
