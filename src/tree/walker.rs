//! TreeWalker - builds the filtered tree in memory

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::matcher::{EntryKind, PatternMatcher};
use crate::string_utils::join_relative;

use super::config::WalkerConfig;
use super::gitignore::GitignoreStack;
use super::node::{EntryIssue, TreeNode};
use super::utils::compare_entries;

/// Upper bound on symlink hops before a chain is treated as a loop.
const MAX_LINK_HOPS: usize = 40;

/// What a directory entry turned out to be.
#[derive(Debug)]
enum EntryType {
    File,
    /// `linked` folders are reached through a symlink and canonicalized
    /// only once they survive the exclusion rules.
    Dir { linked: bool },
    Issue(EntryIssue),
}

#[derive(Debug)]
struct Candidate {
    name: String,
    path: PathBuf,
    entry_type: EntryType,
}

impl Candidate {
    fn is_dir(&self) -> bool {
        matches!(self.entry_type, EntryType::Dir { .. })
    }
}

/// Per-walk mutable state. Nothing survives between walks.
struct WalkState {
    /// Canonical paths of the folders on the current descent path.
    ancestors: HashSet<PathBuf>,
    gitignore: GitignoreStack,
}

/// Depth-first walker that applies the exclusion rules at every entry.
///
/// Excluded folders are never opened. Entries that cannot be read are kept as
/// [`TreeNode::Issue`] markers; only a failure on the root itself is an error.
pub struct TreeWalker<'m> {
    config: WalkerConfig,
    matcher: &'m PatternMatcher,
}

impl<'m> TreeWalker<'m> {
    pub fn new(config: WalkerConfig, matcher: &'m PatternMatcher) -> Self {
        Self { config, matcher }
    }

    pub fn walk(&self, root: &Path) -> Result<TreeNode> {
        let metadata = fs::metadata(root).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::RootNotFound {
                    path: root.to_path_buf(),
                }
            } else {
                Error::io(root, e)
            }
        })?;
        if !metadata.is_dir() {
            return Err(Error::io(
                root,
                io::Error::new(io::ErrorKind::NotADirectory, "not a directory"),
            ));
        }
        let canonical_root = root.canonicalize().map_err(|e| Error::io(root, e))?;
        let name = root
            .file_name()
            .or_else(|| canonical_root.file_name())
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());

        let mut state = WalkState {
            ancestors: HashSet::from([canonical_root.clone()]),
            gitignore: GitignoreStack::new(),
        };

        info!(root = %root.display(), "walking project tree");
        let children = self
            .read_children(root, &canonical_root, "", 0, &mut state)
            .map_err(|e| Error::io(root, e))?;

        Ok(TreeNode::Dir {
            name,
            path: String::new(),
            children,
        })
    }

    /// Read, classify, sort and visit the entries of one folder.
    fn read_children(
        &self,
        dir: &Path,
        canonical_dir: &Path,
        rel: &str,
        depth: usize,
        state: &mut WalkState,
    ) -> io::Result<Vec<TreeNode>> {
        let entries = fs::read_dir(dir)?;

        let mut candidates = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => {
                    if let Some(candidate) = self.classify(&entry, rel) {
                        candidates.push(candidate);
                    }
                }
                Err(e) => warn!(dir = %dir.display(), "skipping unreadable entry: {}", e),
            }
        }
        candidates.sort_by(|a, b| compare_entries(a.is_dir(), &a.name, b.is_dir(), &b.name));

        let pushed = self.config.respect_gitignore && state.gitignore.enter(dir);

        let mut children = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if let Some(node) = self.visit(candidate, canonical_dir, rel, depth + 1, state) {
                children.push(node);
            }
        }

        if pushed {
            state.gitignore.leave();
        }
        Ok(children)
    }

    fn classify(&self, entry: &fs::DirEntry, parent_rel: &str) -> Option<Candidate> {
        let name = entry.file_name().to_string_lossy().to_string();
        let path = entry.path();

        let entry_type = match entry.file_type() {
            Ok(ft) if ft.is_symlink() => {
                if !self.config.follow_symlinks {
                    debug!(path = %path.display(), "skipping symlink");
                    return None;
                }
                // Whatever the target is, this name is hidden; skip the stat
                let rel = join_relative(parent_rel, &name);
                if self.matcher.should_exclude_entry(&rel, &name, EntryKind::File)
                    && self.matcher.should_exclude_entry(&rel, &name, EntryKind::Folder)
                {
                    debug!(path = %rel, "excluded symlink not resolved");
                    return None;
                }
                resolve_symlink(&path)
            }
            Ok(ft) if ft.is_dir() => EntryType::Dir { linked: false },
            Ok(_) => EntryType::File,
            Err(e) => EntryType::Issue(EntryIssue::Io {
                message: e.to_string(),
            }),
        };

        Some(Candidate {
            name,
            path,
            entry_type,
        })
    }

    fn visit(
        &self,
        candidate: Candidate,
        canonical_parent: &Path,
        parent_rel: &str,
        depth: usize,
        state: &mut WalkState,
    ) -> Option<TreeNode> {
        let Candidate {
            name,
            path,
            entry_type,
        } = candidate;
        let rel = join_relative(parent_rel, &name);
        let kind = match entry_type {
            EntryType::Dir { .. } => EntryKind::Folder,
            _ => EntryKind::File,
        };

        if let Some(reason) = self.matcher.exclusion_reason(&rel, &name, kind) {
            debug!(path = %rel, ?reason, "excluded");
            return None;
        }
        if self.config.respect_gitignore
            && (name == ".git" || state.gitignore.is_ignored(&path, kind == EntryKind::Folder))
        {
            debug!(path = %rel, "ignored by .gitignore");
            return None;
        }

        match entry_type {
            EntryType::File => {
                if self.config.dirs_only {
                    return None;
                }
                let size = if self.config.show_size {
                    fs::metadata(&path).ok().map(|m| m.len())
                } else {
                    None
                };
                let content_excluded = self.matcher.should_exclude_content(&rel, &name);
                Some(TreeNode::File {
                    name,
                    path: rel,
                    size,
                    content_excluded,
                    binary: None,
                    content: None,
                    change: None,
                })
            }
            EntryType::Issue(issue) => {
                warn!(path = %rel, "{}", issue.label());
                Some(TreeNode::Issue {
                    name,
                    path: rel,
                    is_dir: false,
                    issue,
                })
            }
            EntryType::Dir { linked } => {
                let canonical = if linked {
                    match path.canonicalize() {
                        Ok(canonical) => canonical,
                        Err(e) => {
                            warn!(path = %rel, "cannot resolve linked folder: {}", e);
                            return Some(TreeNode::Issue {
                                name,
                                path: rel,
                                is_dir: true,
                                issue: EntryIssue::Io {
                                    message: e.to_string(),
                                },
                            });
                        }
                    }
                } else {
                    canonical_parent.join(&name)
                };

                if self.config.max_depth.is_some_and(|max| depth >= max) {
                    return Some(TreeNode::dir(name, rel, Vec::new()));
                }
                if state.ancestors.contains(&canonical) {
                    warn!(path = %rel, "symlink cycle");
                    return Some(TreeNode::Issue {
                        name,
                        path: rel,
                        is_dir: true,
                        issue: EntryIssue::SymlinkCycle,
                    });
                }

                state.ancestors.insert(canonical.clone());
                let result = self.read_children(&path, &canonical, &rel, depth, state);
                state.ancestors.remove(&canonical);

                match result {
                    Ok(children) => Some(TreeNode::dir(name, rel, children)),
                    Err(e) => {
                        warn!(path = %rel, "cannot read folder: {}", e);
                        Some(TreeNode::Issue {
                            name,
                            path: rel,
                            is_dir: true,
                            issue: EntryIssue::Io {
                                message: e.to_string(),
                            },
                        })
                    }
                }
            }
        }
    }
}

/// Resolve a symlink to the kind of entry it points at.
fn resolve_symlink(path: &Path) -> EntryType {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => EntryType::Dir { linked: true },
        Ok(_) => EntryType::File,
        Err(_) if link_chain_loops(path) => EntryType::Issue(EntryIssue::SymlinkCycle),
        Err(e) if e.kind() == io::ErrorKind::NotFound => EntryType::Issue(EntryIssue::BrokenSymlink),
        Err(e) => EntryType::Issue(EntryIssue::Io {
            message: e.to_string(),
        }),
    }
}

/// Follow a chain of links by hand and report whether it revisits a link.
fn link_chain_loops(start: &Path) -> bool {
    let mut seen = HashSet::new();
    let mut current = start.to_path_buf();
    for _ in 0..MAX_LINK_HOPS {
        if !seen.insert(current.clone()) {
            return true;
        }
        let target = match fs::read_link(&current) {
            Ok(target) => target,
            Err(_) => return false,
        };
        current = if target.is_absolute() {
            target
        } else {
            current
                .parent()
                .map(|parent| parent.join(&target))
                .unwrap_or(target)
        };
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{ExclusionRule, ExclusionRuleSet, ExclusionTarget};
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn matcher(rules: &[(ExclusionTarget, &str)]) -> PatternMatcher {
        let mut set = ExclusionRuleSet::default();
        for (target, value) in rules {
            set = set.add_rule(&ExclusionRule::new(*target, *value)).unwrap();
        }
        PatternMatcher::new(&set, Default::default()).unwrap()
    }

    #[test]
    fn test_sorted_folders_first() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.txt", "");
        write(dir.path(), "A.txt", "");
        write(dir.path(), "zdir/x.rs", "");
        write(dir.path(), "adir/y.rs", "");

        let m = PatternMatcher::empty();
        let tree = TreeWalker::new(WalkerConfig::default(), &m).walk(dir.path()).unwrap();
        assert_eq!(
            tree.paths(),
            vec!["adir", "adir/y.rs", "zdir", "zdir/x.rs", "A.txt", "b.txt"]
        );
    }

    #[test]
    fn test_excluded_folder_not_descended() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "node_modules/pkg/index.js", "");
        write(dir.path(), "src/app.js", "");

        let m = matcher(&[(ExclusionTarget::Folder, "node_modules")]);
        let tree = TreeWalker::new(WalkerConfig::default(), &m).walk(dir.path()).unwrap();
        assert_eq!(tree.paths(), vec!["src", "src/app.js"]);
    }

    #[test]
    fn test_content_exclusion_flag_set() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Cargo.lock", "lock");
        write(dir.path(), "main.rs", "fn main() {}");

        let m = matcher(&[(ExclusionTarget::ContentFile, "Cargo.lock")]);
        let tree = TreeWalker::new(WalkerConfig::default(), &m).walk(dir.path()).unwrap();
        match tree.find("Cargo.lock") {
            Some(TreeNode::File {
                content_excluded, ..
            }) => assert!(*content_excluded),
            other => panic!("unexpected node: {:?}", other),
        }
        match tree.find("main.rs") {
            Some(TreeNode::File {
                content_excluded, ..
            }) => assert!(!*content_excluded),
            other => panic!("unexpected node: {:?}", other),
        }
    }

    #[test]
    fn test_max_depth_lists_but_does_not_read() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "top.rs", "");
        write(dir.path(), "level1/mid.rs", "");
        write(dir.path(), "level1/level2/deep.rs", "");

        let m = PatternMatcher::empty();
        let config = WalkerConfig {
            max_depth: Some(1),
            ..Default::default()
        };
        let tree = TreeWalker::new(config, &m).walk(dir.path()).unwrap();
        assert_eq!(tree.paths(), vec!["level1", "top.rs"]);
    }

    #[test]
    fn test_dirs_only() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "file.rs", "");
        write(dir.path(), "sub/nested.rs", "");

        let m = PatternMatcher::empty();
        let config = WalkerConfig {
            dirs_only: true,
            ..Default::default()
        };
        let tree = TreeWalker::new(config, &m).walk(dir.path()).unwrap();
        assert_eq!(tree.paths(), vec!["sub"]);
    }

    #[test]
    fn test_show_size() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "ten.txt", "0123456789");

        let m = PatternMatcher::empty();
        let config = WalkerConfig {
            show_size: true,
            ..Default::default()
        };
        let tree = TreeWalker::new(config, &m).walk(dir.path()).unwrap();
        match tree.find("ten.txt") {
            Some(TreeNode::File { size, .. }) => assert_eq!(*size, Some(10)),
            other => panic!("unexpected node: {:?}", other),
        }
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let m = PatternMatcher::empty();
        let err = TreeWalker::new(WalkerConfig::default(), &m)
            .walk(&dir.path().join("missing"))
            .unwrap_err();
        assert!(matches!(err, Error::RootNotFound { .. }));
    }

    #[test]
    fn test_file_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.txt", "");
        let m = PatternMatcher::empty();
        let err = TreeWalker::new(WalkerConfig::default(), &m)
            .walk(&dir.path().join("a.txt"))
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_root_name() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("my_project");
        fs::create_dir(&project).unwrap();
        let m = PatternMatcher::empty();
        let tree = TreeWalker::new(WalkerConfig::default(), &m).walk(&project).unwrap();
        assert_eq!(tree.name(), "my_project");
        assert_eq!(tree.path(), "");
    }

    #[test]
    fn test_gitignore_respected_when_enabled() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".gitignore", "*.log\n");
        write(dir.path(), "debug.log", "");
        write(dir.path(), "main.rs", "");
        write(dir.path(), ".git/HEAD", "ref: refs/heads/main");

        let m = PatternMatcher::empty();
        let plain = TreeWalker::new(WalkerConfig::default(), &m).walk(dir.path()).unwrap();
        assert!(plain.find("debug.log").is_some());

        let config = WalkerConfig {
            respect_gitignore: true,
            ..Default::default()
        };
        let tree = TreeWalker::new(config, &m).walk(dir.path()).unwrap();
        assert!(tree.find("debug.log").is_none());
        assert!(tree.find(".git").is_none());
        assert!(tree.find("main.rs").is_some());
        assert!(tree.find(".gitignore").is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_pair_loop_marked() {
        use std::os::unix::fs::symlink;

        let dir = TempDir::new().unwrap();
        symlink("b", dir.path().join("a")).unwrap();
        symlink("a", dir.path().join("b")).unwrap();

        let m = PatternMatcher::empty();
        let tree = TreeWalker::new(WalkerConfig::default(), &m).walk(dir.path()).unwrap();
        for name in ["a", "b"] {
            match tree.find(name) {
                Some(TreeNode::Issue { issue, .. }) => assert_eq!(*issue, EntryIssue::SymlinkCycle),
                other => panic!("expected cycle marker for {}, got {:?}", name, other),
            }
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_link_to_ancestor_marked() {
        use std::os::unix::fs::symlink;

        let dir = TempDir::new().unwrap();
        write(dir.path(), "sub/file.rs", "");
        symlink("..", dir.path().join("sub/parent")).unwrap();

        let m = PatternMatcher::empty();
        let tree = TreeWalker::new(WalkerConfig::default(), &m).walk(dir.path()).unwrap();
        match tree.find("sub/parent") {
            Some(TreeNode::Issue { issue, is_dir, .. }) => {
                assert_eq!(*issue, EntryIssue::SymlinkCycle);
                assert!(*is_dir);
            }
            other => panic!("expected cycle marker, got {:?}", other),
        }
        assert!(tree.find("sub/file.rs").is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_followed_to_target_kind() {
        use std::os::unix::fs::symlink;

        let dir = TempDir::new().unwrap();
        write(dir.path(), "real/inner.rs", "");
        write(dir.path(), "target.rs", "");
        symlink(dir.path().join("real"), dir.path().join("linked")).unwrap();
        symlink("target.rs", dir.path().join("alias.rs")).unwrap();
        symlink("nowhere.rs", dir.path().join("broken.rs")).unwrap();

        let m = PatternMatcher::empty();
        let tree = TreeWalker::new(WalkerConfig::default(), &m).walk(dir.path()).unwrap();
        assert!(tree.find("linked/inner.rs").is_some());
        assert!(matches!(tree.find("alias.rs"), Some(TreeNode::File { .. })));
        match tree.find("broken.rs") {
            Some(TreeNode::Issue { issue, .. }) => assert_eq!(*issue, EntryIssue::BrokenSymlink),
            other => panic!("expected broken marker, got {:?}", other),
        }

        let config = WalkerConfig {
            follow_symlinks: false,
            ..Default::default()
        };
        let tree = TreeWalker::new(config, &m).walk(dir.path()).unwrap();
        assert!(tree.find("linked").is_none());
        assert!(tree.find("alias.rs").is_none());
        assert!(tree.find("broken.rs").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_excluded_symlink_issue_hidden() {
        use std::os::unix::fs::symlink;

        let dir = TempDir::new().unwrap();
        symlink("nowhere", dir.path().join("stale.lnk")).unwrap();

        let m = matcher(&[(ExclusionTarget::Extension, "lnk")]);
        let tree = TreeWalker::new(WalkerConfig::default(), &m).walk(dir.path()).unwrap();
        assert!(tree.children().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_hidden_for_both_kinds_is_not_resolved() {
        use std::os::unix::fs::symlink;

        let dir = TempDir::new().unwrap();
        symlink("nowhere", dir.path().join("cache")).unwrap();
        symlink("nowhere", dir.path().join("vendor")).unwrap();

        let m = matcher(&[(ExclusionTarget::Regex, "^cache$"), (ExclusionTarget::Folder, "vendor")]);
        let walker = TreeWalker::new(WalkerConfig::default(), &m);
        let mut classified: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| {
                let entry = entry.unwrap();
                let name = entry.file_name().to_string_lossy().to_string();
                (name, walker.classify(&entry, ""))
            })
            .collect();
        classified.sort_by(|a, b| a.0.cmp(&b.0));

        assert!(classified[0].1.is_none());
        // Folder-only rules need the target kind, so the link is resolved
        match &classified[1].1 {
            Some(Candidate {
                entry_type: EntryType::Issue(issue),
                ..
            }) => assert_eq!(*issue, EntryIssue::BrokenSymlink),
            other => panic!("expected broken marker, got {:?}", other),
        }

        let tree = walker.walk(dir.path()).unwrap();
        assert!(tree.find("cache").is_none());
        let unfiltered = PatternMatcher::empty();
        let tree = TreeWalker::new(WalkerConfig::default(), &unfiltered)
            .walk(dir.path())
            .unwrap();
        assert!(matches!(tree.find("cache"), Some(TreeNode::Issue { .. })));
    }

    #[test]
    fn test_walk_is_deterministic() {
        let dir = TempDir::new().unwrap();
        for name in ["q.rs", "B.rs", "a.rs", "dir1/x", "Dir2/y", "dir3/z/w"] {
            write(dir.path(), name, "");
        }
        let m = PatternMatcher::empty();
        let walker = TreeWalker::new(WalkerConfig::default(), &m);
        let first = walker.walk(dir.path()).unwrap();
        let second = walker.walk(dir.path()).unwrap();
        assert_eq!(first, second);
    }
}
