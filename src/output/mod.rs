//! Tree formatting and display
//!
//! # Module Structure
//!
//! - `config` - Output configuration types
//! - `utils` - Shared helpers (prefixes, change tags, the contents section)
//! - `tree` - Plain text formatter, optionally coloured
//! - `markdown` - Markdown list formatter
//! - `json` - JSON output

mod config;
mod json;
mod markdown;
mod tree;
mod utils;

pub use config::{OutputConfig, OutputFormat};
pub use json::{print_json, to_json};
pub use markdown::MarkdownFormatter;
pub use tree::TreeFormatter;
pub use utils::{
    BINARY_OMITTED, CONTENT_EXCLUDED, CONTENT_TRUNCATED, change_tag, content_section,
    status_letter_legend,
};

use crate::tree::TreeNode;

/// Render a tree in the configured format, plus the contents section when
/// `include_content` is set. Pure: the same tree always renders the same way.
pub fn render(root: &TreeNode, config: &OutputConfig) -> String {
    let mut output = match config.format {
        OutputFormat::Text => TreeFormatter::new(config.clone()).format(root),
        OutputFormat::Markdown => MarkdownFormatter::new(config.clone()).format(root),
    };
    if config.include_content {
        output.push_str(&content_section(root, config));
    }
    output
}
