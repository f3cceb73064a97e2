//! Configuration types for the tree walker

use crate::config::Settings;

/// Configuration for tree walking behavior.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Folders at this depth are listed but not read (root is depth 0).
    pub max_depth: Option<usize>,
    pub dirs_only: bool,
    /// Resolve symlinks to their targets; when false they are skipped.
    pub follow_symlinks: bool,
    /// Honour `.gitignore` files found while descending.
    pub respect_gitignore: bool,
    /// Record file sizes (one extra stat per file).
    pub show_size: bool,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            dirs_only: false,
            follow_symlinks: true,
            respect_gitignore: false,
            show_size: false,
        }
    }
}

impl WalkerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            follow_symlinks: settings.follow_symlinks,
            respect_gitignore: settings.respect_gitignore,
            ..Self::default()
        }
    }
}
