//! Optional `.gitignore` support for the walker
//!
//! Each directory that contains a `.gitignore` contributes one layer. Layers
//! are consulted deepest first, so a nested `!keep.log` can re-include what a
//! parent ignored, the same way git resolves it.

use std::path::Path;

use ignore::Match;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::warn;

/// Stack of `.gitignore` layers for the directories currently being walked.
#[derive(Default)]
pub struct GitignoreStack {
    layers: Vec<Gitignore>,
}

impl GitignoreStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the layer for `dir` if it has a `.gitignore`. Returns whether a layer was pushed.
    pub fn enter(&mut self, dir: &Path) -> bool {
        let file = dir.join(".gitignore");
        if !file.is_file() {
            return false;
        }
        let mut builder = GitignoreBuilder::new(dir);
        if let Some(err) = builder.add(&file) {
            warn!(path = %file.display(), "partially invalid .gitignore: {}", err);
        }
        match builder.build() {
            Ok(gitignore) => {
                self.layers.push(gitignore);
                true
            }
            Err(err) => {
                warn!(path = %file.display(), "ignoring unreadable .gitignore: {}", err);
                false
            }
        }
    }

    pub fn leave(&mut self) {
        self.layers.pop();
    }

    /// Whether `path` is ignored by the innermost layer that has an opinion.
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        for layer in self.layers.iter().rev() {
            match layer.matched(path, is_dir) {
                Match::Ignore(_) => return true,
                Match::Whitelist(_) => return false,
                Match::None => {}
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_no_gitignore_pushes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut stack = GitignoreStack::new();
        assert!(!stack.enter(dir.path()));
        assert!(!stack.is_ignored(&dir.path().join("a.log"), false));
    }

    #[test]
    fn test_root_layer_ignores() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "*.log\nbuild/\n").unwrap();
        let mut stack = GitignoreStack::new();
        assert!(stack.enter(dir.path()));
        assert!(stack.is_ignored(&dir.path().join("debug.log"), false));
        assert!(stack.is_ignored(&dir.path().join("build"), true));
        assert!(!stack.is_ignored(&dir.path().join("build"), false));
        assert!(!stack.is_ignored(&dir.path().join("main.rs"), false));
    }

    #[test]
    fn test_nested_layer_whitelists() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("logs");
        fs::create_dir(&nested).unwrap();
        fs::write(dir.path().join(".gitignore"), "*.log\n").unwrap();
        fs::write(nested.join(".gitignore"), "!keep.log\n").unwrap();

        let mut stack = GitignoreStack::new();
        stack.enter(dir.path());
        stack.enter(&nested);
        assert!(!stack.is_ignored(&nested.join("keep.log"), false));
        assert!(stack.is_ignored(&nested.join("other.log"), false));

        stack.leave();
        assert!(stack.is_ignored(&nested.join("keep.log"), false));
    }
}
