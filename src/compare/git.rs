//! `DiffSource` backed by the `git` binary
//!
//! libgit2 discovers the repository and resolves refs; the diffs themselves
//! come from `git diff` so rename detection and output formats match what
//! users see on the command line.

use std::path::{Path, PathBuf};
use std::process::Command;

use git2::{ErrorCode, Repository};
use tracing::debug;

use crate::error::{Error, Result};

use super::diff::{DiffRange, DiffSource};

pub struct GitCommandSource {
    repo: Repository,
    workdir: PathBuf,
}

impl GitCommandSource {
    /// Open the repository containing `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::RootNotFound {
                path: path.to_path_buf(),
            });
        }
        let repo = Repository::discover(path).map_err(|e| Error::ExternalTool {
            tool: "git".to_string(),
            message: format!("not a git repository ({}): {}", path.display(), e.message()),
        })?;
        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::ExternalTool {
                tool: "git".to_string(),
                message: "bare repositories are not supported".to_string(),
            })?;
        debug!(workdir = %workdir.display(), "opened repository");
        Ok(Self { repo, workdir })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Run `git diff <format> target...source [-- filter]` in the work tree.
    fn diff(&self, format: &str, range: &DiffRange, path_filter: Option<&str>) -> Result<String> {
        let range_arg = range.to_string();
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.workdir)
            .args(["-c", "core.quotePath=false", "diff", "--no-color", "--find-renames"])
            .arg(format)
            .arg(&range_arg)
            .arg("--");
        if let Some(filter) = path_filter {
            cmd.arg(filter);
        }
        debug!(range = %range_arg, format, "running git diff");

        let output = cmd.output().map_err(|e| Error::ExternalTool {
            tool: "git".to_string(),
            message: format!("cannot run git: {}", e),
        })?;
        if !output.status.success() {
            return Err(Error::ExternalTool {
                tool: "git".to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl DiffSource for GitCommandSource {
    fn resolve_ref(&self, reference: &str) -> Result<String> {
        let not_found = || Error::RefNotFound {
            reference: reference.to_string(),
        };
        // Never let a ref be read as a git option
        if reference.is_empty() || reference.starts_with('-') {
            return Err(not_found());
        }
        match self.repo.revparse_single(reference) {
            Ok(object) => {
                let commit = object.peel_to_commit().map_err(|_| not_found())?;
                Ok(commit.id().to_string())
            }
            Err(e) if matches!(e.code(), ErrorCode::NotFound | ErrorCode::InvalidSpec | ErrorCode::Ambiguous) => {
                Err(not_found())
            }
            Err(e) => Err(Error::ExternalTool {
                tool: "git".to_string(),
                message: e.message().to_string(),
            }),
        }
    }

    fn numstat(&self, range: &DiffRange, path_filter: Option<&str>) -> Result<String> {
        self.diff("--numstat", range, path_filter)
    }

    fn name_status(&self, range: &DiffRange, path_filter: Option<&str>) -> Result<String> {
        self.diff("--name-status", range, path_filter)
    }

    fn patch(&self, range: &DiffRange, path_filter: Option<&str>) -> Result<String> {
        self.diff("--patch", range, path_filter)
    }
}
