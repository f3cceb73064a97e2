//! Test utilities: temporary project trees, throwaway git repositories and
//! an in-memory [`DiffSource`].
//!
//! This module is only compiled for tests and benchmarks.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use crate::compare::{DiffRange, DiffSource};
use crate::error::{Error, Result};

/// A temporary project directory, optionally a git repository.
///
/// The directory is removed when dropped.
pub struct TestRepo {
    dir: TempDir,
    git_initialized: bool,
}

impl TestRepo {
    /// Create a new empty temporary directory.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        Self {
            dir,
            git_initialized: false,
        }
    }

    /// Create a new temporary git repository whose first branch is `main`.
    pub fn with_git() -> Self {
        let mut repo = Self::new();
        repo.init_git();
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn init_git(&mut self) {
        self.git(&["init", "--quiet"]);
        self.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        self.git(&["config", "user.email", "test@test.com"]);
        self.git(&["config", "user.name", "Test"]);
        self.git(&["config", "commit.gpgsign", "false"]);
        self.git_initialized = true;
    }

    /// Run git in the repository, panicking on failure.
    pub fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.dir.path())
            .output()
            .expect("Failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    /// Write a file, creating parent directories as needed.
    pub fn add_file(&self, path: &str, content: &str) -> PathBuf {
        self.add_bytes(path, content.as_bytes())
    }

    pub fn add_bytes(&self, path: &str, content: &[u8]) -> PathBuf {
        let full_path = self.dir.path().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&full_path, content).expect("Failed to write file");
        full_path
    }

    pub fn add_dir(&self, path: &str) -> PathBuf {
        let full_path = self.dir.path().join(path);
        fs::create_dir_all(&full_path).expect("Failed to create dir");
        full_path
    }

    pub fn remove_file(&self, path: &str) {
        fs::remove_file(self.dir.path().join(path)).expect("Failed to remove file");
    }

    /// Stage everything and commit.
    pub fn commit_all(&self, message: &str) {
        assert!(self.git_initialized, "Git not initialized");
        self.git(&["add", "-A"]);
        self.git(&["commit", "--quiet", "--allow-empty", "-m", message]);
    }

    /// Create `branch` from the current HEAD and switch to it.
    pub fn create_branch(&self, branch: &str) {
        self.git(&["checkout", "--quiet", "-b", branch]);
    }

    pub fn checkout(&self, branch: &str) {
        self.git(&["checkout", "--quiet", branch]);
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

/// [`DiffSource`] serving canned git output.
///
/// Every range returns the same text; refs outside `refs` fail with
/// `RefNotFound`.
#[derive(Debug, Default, Clone)]
pub struct MemoryDiffSource {
    refs: BTreeSet<String>,
    numstat: String,
    name_status: String,
    patch: String,
}

impl MemoryDiffSource {
    pub fn new<I, S>(refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            refs: refs.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_numstat(mut self, raw: &str) -> Self {
        self.numstat = raw.to_string();
        self
    }

    pub fn with_name_status(mut self, raw: &str) -> Self {
        self.name_status = raw.to_string();
        self
    }

    pub fn with_patch(mut self, raw: &str) -> Self {
        self.patch = raw.to_string();
        self
    }
}

impl DiffSource for MemoryDiffSource {
    fn resolve_ref(&self, reference: &str) -> Result<String> {
        if self.refs.contains(reference) {
            Ok(reference.to_string())
        } else {
            Err(Error::RefNotFound {
                reference: reference.to_string(),
            })
        }
    }

    fn numstat(&self, _range: &DiffRange, _path_filter: Option<&str>) -> Result<String> {
        Ok(self.numstat.clone())
    }

    fn name_status(&self, _range: &DiffRange, _path_filter: Option<&str>) -> Result<String> {
        Ok(self.name_status.clone())
    }

    fn patch(&self, _range: &DiffRange, _path_filter: Option<&str>) -> Result<String> {
        Ok(self.patch.clone())
    }
}
