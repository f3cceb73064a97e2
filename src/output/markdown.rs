//! Markdown output formatting
//!
//! `MarkdownFormatter` renders the tree as a nested markdown list, suitable
//! for pasting into documentation or a chat prompt.

use crate::tree::TreeNode;

use super::config::OutputConfig;
use super::utils::{file_suffix, issue_marker};

/// Markdown output formatter - folders in bold, files in code spans.
pub struct MarkdownFormatter {
    config: OutputConfig,
}

impl MarkdownFormatter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn format(&self, node: &TreeNode) -> String {
        let mut output = String::new();
        let (dir_count, file_count) = self.format_node(node, &mut output, 0);
        output.push('\n');
        output.push_str(&format!("*{} directories, {} files*\n", dir_count, file_count));
        output
    }

    fn format_node(&self, node: &TreeNode, output: &mut String, depth: usize) -> (usize, usize) {
        // Each level is 4 spaces to match the text tree
        let indent = "    ".repeat(depth);

        match node {
            TreeNode::File {
                name, size, change, ..
            } => {
                output.push_str(&indent);
                output.push_str("- `");
                output.push_str(name);
                output.push('`');
                output.push_str(&file_suffix(*size, change.as_ref(), self.config.show_size));
                output.push('\n');
                (0, 1)
            }
            TreeNode::Issue { name, issue, .. } => {
                output.push_str(&format!("{}- `{}` {}\n", indent, name, issue_marker(issue)));
                (0, 0)
            }
            TreeNode::Dir { name, children, .. } => {
                output.push_str(&indent);
                output.push_str("- **");
                output.push_str(name);
                output.push_str("/**\n");

                if !self.config.descends_into(depth) {
                    return (0, 0);
                }

                let mut dir_count = 0;
                let mut file_count = 0;
                for child in children {
                    let (d, f) = self.format_node(child, output, depth + 1);
                    dir_count += d;
                    file_count += f;
                    if matches!(child, TreeNode::Dir { .. }) {
                        dir_count += 1;
                    }
                }
                (dir_count, file_count)
            }
        }
    }
}
