//! Branch comparison engine

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::matcher::PatternMatcher;
use crate::output::{OutputConfig, render, status_letter_legend};
use crate::string_utils::join_relative;
use crate::tree::{ChangeMarker, TreeNode, sort_nodes};

use super::diff::{
    DiffRange, DiffSource, NameStatusEntry, NumstatEntry, parse_name_status, parse_numstat, unquote,
};
use super::{ChangedFileRecord, ComparisonResult, ComparisonSummary, FileStatus, RenameKind};

#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    /// Fetch the patch text into `ComparisonResult::diff_content`.
    pub include_diff: bool,
    /// Restrict the diff to one path prefix.
    pub path_filter: Option<String>,
}

/// Compares two branches through a [`DiffSource`], applying the same
/// exclusion rules as the structure walk.
pub struct BranchComparison<'a> {
    source: &'a dyn DiffSource,
    matcher: &'a PatternMatcher,
    options: CompareOptions,
}

impl<'a> BranchComparison<'a> {
    pub fn new(source: &'a dyn DiffSource, matcher: &'a PatternMatcher, options: CompareOptions) -> Self {
        Self {
            source,
            matcher,
            options,
        }
    }

    /// Changed files on `source_branch` since it forked from `target_branch`.
    pub fn compare_branches(&self, source_branch: &str, target_branch: &str) -> Result<ComparisonResult> {
        self.source.resolve_ref(source_branch)?;
        self.source.resolve_ref(target_branch)?;

        let range = DiffRange::new(target_branch, source_branch);
        let filter = self.options.path_filter.as_deref();
        info!(%range, "comparing branches");

        let numstat = parse_numstat(&self.source.numstat(&range, filter)?);
        let name_status = parse_name_status(&self.source.name_status(&range, filter)?);

        let files_changed: Vec<ChangedFileRecord> = merge_records(numstat, name_status)
            .into_iter()
            .filter(|record| {
                let excluded = self.matcher.is_path_excluded(&record.path);
                if excluded {
                    debug!(path = %record.path, "excluded from comparison");
                }
                !excluded
            })
            .collect();
        let summary = ComparisonSummary::from_records(&files_changed);

        let diff_content = if self.options.include_diff {
            let patch = self.source.patch(&range, filter)?;
            Some(filter_patch(&patch, self.matcher))
        } else {
            None
        };

        Ok(ComparisonResult {
            source_branch: source_branch.to_string(),
            target_branch: target_branch.to_string(),
            files_changed,
            summary,
            diff_content,
        })
    }

    /// Tree of the changed files, rendered like a structure dump with change tags.
    pub fn generate_structure_comparison(
        &self,
        source_branch: &str,
        target_branch: &str,
        config: &OutputConfig,
    ) -> Result<String> {
        let result = self.compare_branches(source_branch, target_branch)?;
        let root_name = DiffRange::new(target_branch, source_branch).to_string();
        let tree = build_change_tree(&root_name, &result.files_changed);

        let summary = &result.summary;
        let mut output = render(&tree, config);
        output.push_str(&format!(
            "\n{} files changed, {} insertions(+), {} deletions(-)\n{}\n",
            summary.total_files,
            summary.additions,
            summary.deletions,
            status_letter_legend()
        ));
        Ok(output)
    }
}

/// Merge numstat counts into name-status records, keyed and sorted by path.
///
/// Name-status decides the status. A path only numstat knows about is
/// treated as modified; a path only name-status knows about has unknown counts.
/// Numstat rename syntax is only trusted when name-status reports the same
/// rename, or when name-status has no record under the literal path.
pub fn merge_records(numstat: Vec<NumstatEntry>, name_status: Vec<NameStatusEntry>) -> Vec<ChangedFileRecord> {
    let mut by_path: BTreeMap<String, ChangedFileRecord> = BTreeMap::new();

    for entry in name_status {
        by_path.insert(
            entry.path.clone(),
            ChangedFileRecord {
                path: entry.path,
                status: entry.status,
                additions: None,
                deletions: None,
                old_path: entry.old_path,
                rename: entry.rename,
            },
        );
    }

    for entry in numstat {
        let (path, old_path) = numstat_key(&by_path, entry.path, entry.old_path, entry.raw_path);
        match by_path.get_mut(&path) {
            Some(record) => {
                record.additions = entry.additions;
                record.deletions = entry.deletions;
                if record.old_path.is_none() {
                    record.old_path = old_path;
                }
            }
            None => {
                by_path.insert(
                    path.clone(),
                    ChangedFileRecord {
                        rename: old_path.as_ref().map(|_| RenameKind::Renamed),
                        path,
                        status: FileStatus::Modified,
                        additions: entry.additions,
                        deletions: entry.deletions,
                        old_path,
                    },
                );
            }
        }
    }

    by_path.into_values().collect()
}

/// Record key and old path for one numstat entry.
fn numstat_key(
    by_path: &BTreeMap<String, ChangedFileRecord>,
    path: String,
    old_path: Option<String>,
    raw_path: String,
) -> (String, Option<String>) {
    if old_path.is_none() {
        return (path, None);
    }
    let confirmed = by_path
        .get(&path)
        .is_some_and(|record| record.rename.is_some() && record.old_path == old_path);
    if confirmed {
        return (path, old_path);
    }
    if by_path.contains_key(&raw_path) {
        debug!(path = %raw_path, "numstat arrow is part of the file name");
        return (raw_path, None);
    }
    (path, old_path)
}

/// Build a tree holding only the changed files, with ancestor folders
/// synthesized and siblings sorted like the walker sorts them.
pub fn build_change_tree(root_name: &str, records: &[ChangedFileRecord]) -> TreeNode {
    let mut children = Vec::new();
    for record in records {
        let segments: Vec<&str> = record.path.split('/').filter(|s| !s.is_empty()).collect();
        insert_record(&mut children, "", &segments, record);
    }
    sort_recursive(&mut children);
    TreeNode::dir(root_name, "", children)
}

fn insert_record(children: &mut Vec<TreeNode>, parent_rel: &str, segments: &[&str], record: &ChangedFileRecord) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    let rel = join_relative(parent_rel, first);

    if rest.is_empty() {
        children.push(TreeNode::File {
            name: first.to_string(),
            path: rel,
            size: None,
            content_excluded: false,
            binary: None,
            content: None,
            change: Some(ChangeMarker {
                status: record.status,
                rename: record.rename,
                additions: record.additions,
                deletions: record.deletions,
                old_path: record.old_path.clone(),
            }),
        });
        return;
    }

    let index = match children
        .iter()
        .position(|c| matches!(c, TreeNode::Dir { name, .. } if name == first))
    {
        Some(index) => index,
        None => {
            children.push(TreeNode::dir(*first, rel.clone(), Vec::new()));
            children.len() - 1
        }
    };
    if let TreeNode::Dir { children: sub, .. } = &mut children[index] {
        insert_record(sub, &rel, rest, record);
    }
}

fn sort_recursive(nodes: &mut [TreeNode]) {
    sort_nodes(nodes);
    for node in nodes {
        if let TreeNode::Dir { children, .. } = node {
            sort_recursive(children);
        }
    }
}

/// Drop the per-file sections of a patch whose path is excluded.
pub fn filter_patch(patch: &str, matcher: &PatternMatcher) -> String {
    let mut out = String::new();
    let mut section = String::new();
    for line in patch.split_inclusive('\n') {
        if line.starts_with("diff --git ") {
            push_section(&mut out, &section, matcher);
            section.clear();
        }
        section.push_str(line);
    }
    push_section(&mut out, &section, matcher);
    out
}

fn push_section(out: &mut String, section: &str, matcher: &PatternMatcher) {
    if !section.starts_with("diff --git ") {
        out.push_str(section);
        return;
    }
    match section_path(section) {
        Some(path) if matcher.is_path_excluded(&path) => {
            debug!(%path, "excluded from patch");
        }
        Some(_) => out.push_str(section),
        None => {
            warn!(header = section.lines().next().unwrap_or_default(), "unparsable patch header");
            out.push_str(section);
        }
    }
}

/// New-side path of one `diff --git` section.
///
/// Prefers the `rename to`/`copy to` and `+++`/`---` lines, which carry one
/// path each. Sections without them (mode changes, binaries) fall back to
/// the header, whose two paths have equal length when the file kept its name.
fn section_path(section: &str) -> Option<String> {
    let mut old_side = None;
    for line in section.lines().skip(1) {
        let line = line.trim_end_matches(['\r', '\t']);
        if let Some(path) = line
            .strip_prefix("rename to ")
            .or_else(|| line.strip_prefix("copy to "))
        {
            return Some(unquote(path));
        }
        if let Some(path) = line.strip_prefix("+++ ") {
            if let Some(path) = strip_side(path, "b/") {
                return Some(path);
            }
        } else if let Some(path) = line.strip_prefix("--- ") {
            old_side = strip_side(path, "a/");
        } else if line.starts_with("@@") {
            break;
        }
    }
    old_side.or_else(|| header_path(section.lines().next()?.strip_prefix("diff --git ")?))
}

/// `a/x` or `"a/x"` to `x`; `None` for `/dev/null`.
fn strip_side(path: &str, prefix: &str) -> Option<String> {
    unquote(path).strip_prefix(prefix).map(str::to_string)
}

fn header_path(header: &str) -> Option<String> {
    let header = header.trim_end_matches(['\r', '\n']);
    if header.starts_with('"') {
        let end = quoted_end(header)?;
        let second = header[end..].strip_prefix(' ')?;
        return strip_side(second, "b/");
    }
    let mid = header.len().checked_sub(1)? / 2;
    let (old, new) = (header.get(..mid)?, header.get(mid + 1..)?);
    let old = old.strip_prefix("a/")?;
    let new = new.strip_prefix("b/")?;
    (header.as_bytes()[mid] == b' ' && old == new).then(|| new.to_string())
}

/// Byte index just past the closing quote of a leading quoted path.
fn quoted_end(text: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, b) in text.bytes().enumerate().skip(1) {
        match b {
            _ if escaped => escaped = false,
            b'\\' => escaped = true,
            b'"' => return Some(i + 1),
            _ => {}
        }
    }
    None
}
