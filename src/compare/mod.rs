//! Branch comparison
//!
//! A comparison asks a [`DiffSource`] for numstat and name-status output of a
//! three-dot range, merges the two into [`ChangedFileRecord`]s, drops paths
//! hidden by the exclusion rules and summarises the rest.
//!
//! - `diff` - the `DiffSource` capability and the output parsers
//! - `git` - `DiffSource` backed by the `git` binary
//! - `engine` - merging, filtering and the changed-files tree
//! - `report` - text and markdown reports

mod diff;
mod engine;
mod git;
mod report;

use std::fmt;

use serde::Serialize;

pub use diff::{
    DiffRange, DiffSource, NameStatusEntry, NumstatEntry, parse_name_status, parse_numstat,
};
pub use engine::{BranchComparison, CompareOptions};
pub use git::GitCommandSource;
pub use report::{ReportConfig, generate_comparison_output};

/// How a file changed between the two branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
}

impl FileStatus {
    /// Single-letter code as used by `git diff --name-status`.
    pub fn letter(self) -> char {
        match self {
            FileStatus::Added => 'A',
            FileStatus::Modified => 'M',
            FileStatus::Deleted => 'D',
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileStatus::Added => "added",
            FileStatus::Modified => "modified",
            FileStatus::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

/// Rename or copy detected by git; the record keeps the old path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenameKind {
    Renamed,
    Copied,
}

/// One changed file, keyed by its path on the source branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedFileRecord {
    pub path: String,
    pub status: FileStatus,
    /// `None` when git reports `-`, i.e. a binary file.
    pub additions: Option<u32>,
    pub deletions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rename: Option<RenameKind>,
}

/// Totals over the changed files of one comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    pub total_files: usize,
    /// Sum of the known addition counts.
    pub additions: u64,
    pub deletions: u64,
    pub files_added: usize,
    pub files_modified: usize,
    pub files_deleted: usize,
}

impl ComparisonSummary {
    pub fn from_records(records: &[ChangedFileRecord]) -> Self {
        let mut summary = Self {
            total_files: records.len(),
            ..Self::default()
        };
        for record in records {
            summary.additions += u64::from(record.additions.unwrap_or(0));
            summary.deletions += u64::from(record.deletions.unwrap_or(0));
            match record.status {
                FileStatus::Added => summary.files_added += 1,
                FileStatus::Modified => summary.files_modified += 1,
                FileStatus::Deleted => summary.files_deleted += 1,
            }
        }
        summary
    }
}

/// Outcome of comparing `source_branch` against `target_branch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub source_branch: String,
    pub target_branch: String,
    pub files_changed: Vec<ChangedFileRecord>,
    pub summary: ComparisonSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_content: Option<String>,
}
