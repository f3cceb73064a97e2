//! In-memory tree produced by the walker and consumed by the formatters

use serde::Serialize;

use crate::compare::{FileStatus, RenameKind};
use crate::file_utils::FileContent;

/// Problem recorded in place of an entry that could not be walked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryIssue {
    /// Symlink chain loops, or a directory link points back at an ancestor.
    SymlinkCycle,
    BrokenSymlink,
    Io { message: String },
}

impl EntryIssue {
    pub fn label(&self) -> String {
        match self {
            EntryIssue::SymlinkCycle => "symlink cycle".to_string(),
            EntryIssue::BrokenSymlink => "broken symlink".to_string(),
            EntryIssue::Io { message } => format!("error: {}", message),
        }
    }
}

/// Change annotation carried by files in a branch comparison tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeMarker {
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rename: Option<RenameKind>,
    pub additions: Option<u32>,
    pub deletions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
}

/// One filesystem entry. `path` is always the `/`-separated path relative to
/// the walk root (empty for the root itself).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    File {
        name: String,
        path: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        size: Option<u64>,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        content_excluded: bool,
        /// `None` until the content reader has looked at the file.
        #[serde(skip_serializing_if = "Option::is_none")]
        binary: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<FileContent>,
        #[serde(skip_serializing_if = "Option::is_none")]
        change: Option<ChangeMarker>,
    },
    Dir {
        name: String,
        path: String,
        children: Vec<TreeNode>,
    },
    Issue {
        name: String,
        path: String,
        /// Sort position; a folder that failed to read stays among folders.
        is_dir: bool,
        issue: EntryIssue,
    },
}

impl TreeNode {
    /// A plain file node with nothing read yet.
    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        TreeNode::File {
            name: name.into(),
            path: path.into(),
            size: None,
            content_excluded: false,
            binary: None,
            content: None,
            change: None,
        }
    }

    pub fn dir(name: impl Into<String>, path: impl Into<String>, children: Vec<TreeNode>) -> Self {
        TreeNode::Dir {
            name: name.into(),
            path: path.into(),
            children,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TreeNode::File { name, .. } | TreeNode::Dir { name, .. } | TreeNode::Issue { name, .. } => {
                name
            }
        }
    }

    pub fn path(&self) -> &str {
        match self {
            TreeNode::File { path, .. } | TreeNode::Dir { path, .. } | TreeNode::Issue { path, .. } => {
                path
            }
        }
    }

    pub fn is_dir(&self) -> bool {
        match self {
            TreeNode::Dir { .. } => true,
            TreeNode::Issue { is_dir, .. } => *is_dir,
            TreeNode::File { .. } => false,
        }
    }

    pub fn children(&self) -> &[TreeNode] {
        match self {
            TreeNode::Dir { children, .. } => children,
            _ => &[],
        }
    }

    /// Count (directories, files) below this node, excluding the node itself.
    pub fn counts(&self) -> (usize, usize) {
        let mut dirs = 0;
        let mut files = 0;
        for child in self.children() {
            match child {
                TreeNode::Dir { .. } => {
                    dirs += 1;
                    let (d, f) = child.counts();
                    dirs += d;
                    files += f;
                }
                TreeNode::File { .. } => files += 1,
                TreeNode::Issue { .. } => {}
            }
        }
        (dirs, files)
    }

    /// Find a node by its relative path.
    pub fn find(&self, path: &str) -> Option<&TreeNode> {
        if self.path() == path {
            return Some(self);
        }
        self.children().iter().find_map(|child| {
            let child_path = child.path();
            if child_path == path || path.starts_with(&format!("{}/", child_path)) {
                child.find(path)
            } else {
                None
            }
        })
    }

    /// All relative paths in the tree, depth-first, root excluded.
    pub fn paths(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_paths(self, &mut out);
        out
    }
}

fn collect_paths<'a>(node: &'a TreeNode, out: &mut Vec<&'a str>) {
    for child in node.children() {
        out.push(child.path());
        collect_paths(child, out);
    }
}
