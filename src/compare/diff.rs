//! Diff sources and parsers for git's `--numstat` and `--name-status` output

use std::fmt;

use tracing::warn;

use crate::error::Result;
use crate::string_utils::normalize_path;

use super::{FileStatus, RenameKind};

/// Three-dot range: changes on `source` since it forked from `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRange {
    pub target: String,
    pub source: String,
}

impl DiffRange {
    pub fn new(target: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            source: source.into(),
        }
    }
}

impl fmt::Display for DiffRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}...{}", self.target, self.source)
    }
}

/// Where raw diff output comes from.
///
/// Methods return the tool's raw text; parsing lives in [`parse_numstat`] and
/// [`parse_name_status`]. `path_filter` limits the diff to one path prefix.
pub trait DiffSource {
    /// Resolve a branch or revision, failing with `RefNotFound` when unknown.
    fn resolve_ref(&self, reference: &str) -> Result<String>;

    fn numstat(&self, range: &DiffRange, path_filter: Option<&str>) -> Result<String>;

    fn name_status(&self, range: &DiffRange, path_filter: Option<&str>) -> Result<String>;

    /// Unified patch text.
    fn patch(&self, range: &DiffRange, path_filter: Option<&str>) -> Result<String>;
}

/// One line of `--numstat` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumstatEntry {
    pub path: String,
    /// Set when the line used rename syntax.
    pub old_path: Option<String>,
    /// Path exactly as printed, before any rename split. Differs from
    /// `path` only when `old_path` is set; a file may be named `a => b`.
    pub raw_path: String,
    /// `None` for `-`, which git prints for binary files.
    pub additions: Option<u32>,
    pub deletions: Option<u32>,
}

/// One line of `--name-status` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameStatusEntry {
    pub path: String,
    pub status: FileStatus,
    pub old_path: Option<String>,
    pub rename: Option<RenameKind>,
}

/// Parse `git diff --numstat` output. Malformed lines are skipped.
pub fn parse_numstat(raw: &str) -> Vec<NumstatEntry> {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let entry = parse_numstat_line(line);
            if entry.is_none() {
                warn!(line, "skipping malformed numstat line");
            }
            entry
        })
        .collect()
}

fn parse_numstat_line(line: &str) -> Option<NumstatEntry> {
    let mut fields = line.splitn(3, '\t');
    let additions = parse_count(fields.next()?)?;
    let deletions = parse_count(fields.next()?)?;
    let raw_path = fields.next()?;
    if raw_path.is_empty() {
        return None;
    }

    let unquoted = unquote(raw_path);
    let literal = normalize_path(&unquoted);
    let (old_path, path) = match split_rename(&unquoted) {
        Some((old, new)) => (Some(old), new),
        None => (None, literal.clone()),
    };
    if path.is_empty() {
        return None;
    }
    Some(NumstatEntry {
        path,
        old_path,
        raw_path: literal,
        additions,
        deletions,
    })
}

/// `Some(None)` for `-`, `None` for garbage.
fn parse_count(field: &str) -> Option<Option<u32>> {
    match field.trim() {
        "-" => Some(None),
        n => n.parse().ok().map(Some),
    }
}

/// Split numstat rename syntax: `old => new` or `dir/{old => new}/file`.
fn split_rename(path: &str) -> Option<(String, String)> {
    if let (Some(open), Some(close)) = (path.find('{'), path.rfind('}')) {
        if open < close {
            let inner = &path[open + 1..close];
            if let Some((old, new)) = inner.split_once(" => ") {
                let prefix = &path[..open];
                let suffix = &path[close + 1..];
                return Some((
                    normalize_path(&format!("{}{}{}", prefix, old, suffix)),
                    normalize_path(&format!("{}{}{}", prefix, new, suffix)),
                ));
            }
        }
    }
    path.split_once(" => ")
        .map(|(old, new)| (normalize_path(old), normalize_path(new)))
}

/// Parse `git diff --name-status` output. Malformed lines are skipped.
pub fn parse_name_status(raw: &str) -> Vec<NameStatusEntry> {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let entry = parse_name_status_line(line);
            if entry.is_none() {
                warn!(line, "skipping malformed name-status line");
            }
            entry
        })
        .collect()
}

fn parse_name_status_line(line: &str) -> Option<NameStatusEntry> {
    let mut fields = line.split('\t');
    let code = fields.next()?.trim();
    let first = fields.next().map(|p| normalize_path(&unquote(p)))?;
    let second = fields.next().map(|p| normalize_path(&unquote(p)));
    if first.is_empty() {
        return None;
    }

    let letter = code.chars().next()?;
    let (status, rename) = match letter {
        'A' => (FileStatus::Added, None),
        'M' | 'T' => (FileStatus::Modified, None),
        'D' => (FileStatus::Deleted, None),
        'R' => (FileStatus::Modified, Some(RenameKind::Renamed)),
        'C' => (FileStatus::Added, Some(RenameKind::Copied)),
        _ => return None,
    };

    match (rename, second) {
        (Some(kind), Some(new)) if !new.is_empty() => Some(NameStatusEntry {
            path: new,
            status,
            old_path: Some(first),
            rename: Some(kind),
        }),
        // R/C lines need both paths
        (Some(_), _) => None,
        (None, _) => Some(NameStatusEntry {
            path: first,
            status,
            old_path: None,
            rename: None,
        }),
    }
}

/// Undo git's C-style quoting of unusual paths (`"tab\there"`).
pub(super) fn unquote(field: &str) -> String {
    let Some(inner) = field
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return field.to_string();
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.bytes().peekable();
    while let Some(b) = chars.next() {
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        match chars.next() {
            Some(b'n') => bytes.push(b'\n'),
            Some(b't') => bytes.push(b'\t'),
            Some(b'r') => bytes.push(b'\r'),
            Some(d @ b'0'..=b'7') => {
                let mut value = u32::from(d - b'0');
                for _ in 0..2 {
                    match chars.peek() {
                        Some(&o @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(o - b'0');
                            chars.next();
                        }
                        _ => break,
                    }
                }
                bytes.push(value as u8);
            }
            Some(other) => bytes.push(other),
            None => bytes.push(b'\\'),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
