//! Project structure generation
//!
//! Ties the walker, the content reader and the formatters together:
//! walk, optionally read contents, render.

use std::path::Path;

use tracing::info;

use crate::config::Settings;
use crate::error::Result;
use crate::file_utils::{ContentLimits, attach_contents};
use crate::matcher::PatternMatcher;
use crate::output::{OutputConfig, render};
use crate::tree::{TreeNode, TreeWalker, WalkerConfig};

/// Everything one structure run needs besides the root and the matcher.
#[derive(Debug, Clone, Default)]
pub struct StructureOptions {
    pub walker: WalkerConfig,
    pub output: OutputConfig,
    pub limits: ContentLimits,
    /// Content reader threads (0 = all cores, 1 = sequential).
    pub jobs: usize,
}

impl StructureOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            walker: WalkerConfig::from_settings(settings),
            output: OutputConfig {
                content_line_limit: settings.content_line_limit,
                ..OutputConfig::default()
            },
            limits: settings.content_limits(),
            jobs: 0,
        }
    }
}

/// Walk `root` and, when contents are requested, read every included file.
pub fn build_tree(root: &Path, matcher: &PatternMatcher, options: &StructureOptions) -> Result<TreeNode> {
    let mut tree = TreeWalker::new(options.walker.clone(), matcher).walk(root)?;
    if options.output.include_content {
        attach_contents(&mut tree, root, &options.limits, options.jobs);
    }
    let (dirs, files) = tree.counts();
    info!(dirs, files, "structure built");
    Ok(tree)
}

/// Render the structure of `root` as text or markdown.
pub fn generate_structure(root: &Path, matcher: &PatternMatcher, options: &StructureOptions) -> Result<String> {
    let tree = build_tree(root, matcher, options)?;
    Ok(render(&tree, &options.output))
}
