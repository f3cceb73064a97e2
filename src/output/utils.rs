//! Shared utility functions for output formatting

use crate::compare::{FileStatus, RenameKind};
use crate::file_utils::FileContent;
use crate::tree::{ChangeMarker, EntryIssue, TreeNode, format_size};

use super::config::{OutputConfig, OutputFormat};

pub const CONTENT_EXCLUDED: &str = "[content excluded]";
pub const BINARY_OMITTED: &str = "[binary file, content omitted]";
pub const CONTENT_TRUNCATED: &str = "[content truncated]";

/// Calculate the prefix for the children of an entry.
pub fn child_prefix(prefix: &str, is_last: bool) -> String {
    if is_last {
        format!("{}    ", prefix)
    } else {
        format!("{}│   ", prefix)
    }
}

pub fn issue_marker(issue: &EntryIssue) -> String {
    format!("[{}]", issue.label())
}

/// `[A +12 -4]`, or `[A binary]` when the counts are unknown.
pub fn change_tag(change: &ChangeMarker) -> String {
    let letter = change.status.letter();
    let tag = match (change.additions, change.deletions) {
        (Some(add), Some(del)) => format!("[{} +{} -{}]", letter, add, del),
        _ => format!("[{} binary]", letter),
    };
    match (&change.rename, &change.old_path) {
        (Some(RenameKind::Renamed), Some(old)) => format!("{} (renamed from {})", tag, old),
        (Some(RenameKind::Copied), Some(old)) => format!("{} (copied from {})", tag, old),
        _ => tag,
    }
}

/// Everything printed after a file name on its tree line.
pub fn file_suffix(size: Option<u64>, change: Option<&ChangeMarker>, show_size: bool) -> String {
    let mut suffix = String::new();
    if show_size {
        if let Some(bytes) = size {
            suffix.push_str(&format!(" ({})", format_size(bytes)));
        }
    }
    if let Some(change) = change {
        suffix.push(' ');
        suffix.push_str(&change_tag(change));
    }
    suffix
}

/// Keep the first `limit` lines. Returns the kept text and how many lines were dropped.
pub fn limit_lines(text: &str, limit: Option<usize>) -> (String, usize) {
    let lines: Vec<&str> = text.lines().collect();
    match limit {
        Some(limit) if lines.len() > limit => (lines[..limit].join("\n"), lines.len() - limit),
        _ => (lines.join("\n"), 0),
    }
}

/// Markdown fence info string for a file name.
pub fn fence_language(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    match ext.to_ascii_lowercase().as_str() {
        "rs" => "rust",
        "ts" | "tsx" => "typescript",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "py" => "python",
        "go" => "go",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "cc" | "hpp" => "cpp",
        "cs" => "csharp",
        "rb" => "ruby",
        "sh" | "bash" => "bash",
        "json" => "json",
        "toml" => "toml",
        "yaml" | "yml" => "yaml",
        "md" => "markdown",
        "html" => "html",
        "css" => "css",
        "sql" => "sql",
        _ => "",
    }
}

/// A fence longer than any backtick run inside `text`.
fn fence_for(text: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

/// Render the "File contents" section for every file in tree order.
///
/// Files that were never read are skipped, as are folders beyond
/// `max_depth`.
pub fn content_section(root: &TreeNode, config: &OutputConfig) -> String {
    let mut files = Vec::new();
    collect_files(root, 0, config, &mut files);

    let mut out = String::new();
    match config.format {
        OutputFormat::Text => out.push_str("\nFile contents\n=============\n"),
        OutputFormat::Markdown => out.push_str("\n## File contents\n"),
    }

    for (path, name, content) in files {
        match config.format {
            OutputFormat::Text => {
                out.push_str(&format!("\n--- {} ---\n", path));
                out.push_str(&content_body(content, config.content_line_limit, None));
            }
            OutputFormat::Markdown => {
                out.push_str(&format!("\n### `{}`\n\n", path));
                out.push_str(&content_body(content, config.content_line_limit, Some(name)));
            }
        }
    }
    out
}

fn collect_files<'a>(
    node: &'a TreeNode,
    depth: usize,
    config: &OutputConfig,
    out: &mut Vec<(&'a str, &'a str, &'a FileContent)>,
) {
    if !config.descends_into(depth) {
        return;
    }
    for child in node.children() {
        match child {
            TreeNode::File {
                name,
                path,
                content: Some(content),
                ..
            } => out.push((path.as_str(), name.as_str(), content)),
            TreeNode::Dir { .. } => collect_files(child, depth + 1, config, out),
            _ => {}
        }
    }
}

/// Body of one file block. `fence_name` switches on markdown code fences.
fn content_body(content: &FileContent, line_limit: Option<usize>, fence_name: Option<&str>) -> String {
    let mut out = String::new();
    match content {
        FileContent::Text { text, truncated } => {
            let (kept, dropped) = limit_lines(text, line_limit);
            let fence = fence_name.map(|name| (fence_for(&kept), fence_language(name)));
            if let Some((fence, lang)) = &fence {
                out.push_str(&format!("{}{}\n", fence, lang));
            }
            if !kept.is_empty() {
                out.push_str(&kept);
                out.push('\n');
            }
            if let Some((fence, _)) = &fence {
                out.push_str(fence);
                out.push('\n');
            }
            if dropped > 0 {
                out.push_str(&format!("... ({} more lines)\n", dropped));
            }
            if *truncated {
                out.push_str(CONTENT_TRUNCATED);
                out.push('\n');
            }
        }
        FileContent::Binary => {
            out.push_str(BINARY_OMITTED);
            out.push('\n');
        }
        FileContent::Excluded => {
            out.push_str(CONTENT_EXCLUDED);
            out.push('\n');
        }
        FileContent::Unreadable { message } => {
            out.push_str(&format!("[error: {}]\n", message));
        }
    }
    out
}

/// Status counts line shown under comparison trees.
pub fn status_letter_legend() -> String {
    [FileStatus::Added, FileStatus::Modified, FileStatus::Deleted]
        .iter()
        .map(|s| format!("{} = {}", s.letter(), s))
        .collect::<Vec<_>>()
        .join(", ")
}
