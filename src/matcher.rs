//! Exclusion matching.
//!
//! A [`PatternMatcher`] is compiled once per run from an [`ExclusionRuleSet`]
//! and is the run's snapshot of the rules: globs and regexes are compiled here
//! and reused for every node. Matching itself does no I/O.
//!
//! Structural precedence, first match wins:
//!
//! 1. exact relative path (`specificFiles` / `specificFolders`)
//! 2. exact basename (`files` / `folders`)
//! 3. globs: metacharacter entries of `files` / `folders`, then `advanced.patterns`
//! 4. regexes from `advanced.regexPatterns`, against the relative path
//! 5. otherwise included
//!
//! Globs are case sensitive and `*` never crosses `/`. By default a wildcard
//! does not match a leading `.` (so `*env*` does not match `.env.local`);
//! [`MatcherOptions::dot_inclusive`] turns that off.

use std::borrow::Cow;
use std::collections::HashSet;

use glob::{MatchOptions, Pattern};
use regex::Regex;
use tracing::warn;

use crate::error::{Error, Result};
use crate::rules::ExclusionRuleSet;
use crate::string_utils::{basename, has_glob_metachars, normalize_path};

/// Whether an entry is a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
}

/// Matching policy knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatcherOptions {
    /// Let wildcards match names starting with `.`.
    pub dot_inclusive: bool,
}

/// The rule that caused an exclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionReason {
    SpecificPath,
    Name,
    Glob(String),
    Regex(String),
}

#[derive(Debug)]
struct GlobRule {
    source: String,
    pattern: Pattern,
    folders_only: bool,
    /// For `dir/**`, the pattern for `dir` itself.
    stem: Option<Pattern>,
}

impl GlobRule {
    fn compile(source: &str) -> Result<Self> {
        let normalized = source.replace('\\', "/");
        let folders_only = normalized.ends_with('/') && normalized.len() > 1;
        let body = normalized.trim_end_matches('/');
        let pattern = compile_glob(body)?;
        let stem = match body.strip_suffix("/**") {
            Some(stem) if !stem.is_empty() => Some(compile_glob(stem)?),
            _ => None,
        };
        Ok(Self {
            source: source.to_string(),
            pattern,
            folders_only,
            stem,
        })
    }

    fn matches(&self, rel: &str, base: &str, kind: EntryKind, opts: MatchOptions) -> bool {
        if self.folders_only && kind != EntryKind::Folder {
            return false;
        }
        if self.pattern.matches_with(base, opts) || (rel != base && self.pattern.matches_with(rel, opts)) {
            return true;
        }
        kind == EntryKind::Folder
            && self
                .stem
                .as_ref()
                .is_some_and(|stem| stem.matches_with(rel, opts) || stem.matches_with(base, opts))
    }
}

fn compile_glob(source: &str) -> Result<Pattern> {
    Pattern::new(source).map_err(|e| Error::config(format!("invalid glob '{}': {}", source, e)))
}

/// Split a rule list into literal names and compiled globs, skipping empty entries.
fn split_names(entries: &[&String], what: &str) -> Result<(HashSet<String>, Vec<GlobRule>)> {
    let mut names = HashSet::new();
    let mut globs = Vec::new();
    for entry in entries {
        let entry = entry.trim();
        if entry.is_empty() {
            warn!("ignoring empty {} exclusion", what);
        } else if has_glob_metachars(entry) {
            globs.push(GlobRule::compile(entry)?);
        } else {
            names.insert(entry.trim_end_matches('/').to_string());
        }
    }
    Ok((names, globs))
}

fn compile_globs(entries: &[String], what: &str) -> Result<Vec<GlobRule>> {
    entries
        .iter()
        .map(|e| e.trim())
        .filter(|e| {
            let keep = !e.is_empty();
            if !keep {
                warn!("ignoring empty {} pattern", what);
            }
            keep
        })
        .map(GlobRule::compile)
        .collect()
}

fn normalized_set<'a>(entries: impl Iterator<Item = &'a String>) -> HashSet<String> {
    entries
        .map(|e| normalize_path(e))
        .filter(|e| !e.is_empty())
        .collect()
}

#[derive(Debug, Default)]
struct ContentRules {
    names: HashSet<String>,
    globs: Vec<GlobRule>,
    folders: HashSet<String>,
    patterns: Vec<GlobRule>,
}

/// Compiled exclusion rules for one run.
#[derive(Debug)]
pub struct PatternMatcher {
    specific_files: HashSet<String>,
    specific_folders: HashSet<String>,
    file_names: HashSet<String>,
    folder_names: HashSet<String>,
    file_globs: Vec<GlobRule>,
    folder_globs: Vec<GlobRule>,
    patterns: Vec<GlobRule>,
    regexes: Vec<Regex>,
    content: ContentRules,
    glob_options: MatchOptions,
}

impl PatternMatcher {
    /// Compile `rules`. Invalid globs or regexes are a configuration error.
    pub fn new(rules: &ExclusionRuleSet, options: MatcherOptions) -> Result<Self> {
        let files: Vec<&String> = rules.files.iter().collect();
        let folders: Vec<&String> = rules.folders.iter().collect();
        let (file_names, file_globs) = split_names(&files, "file")?;
        let (folder_names, folder_globs) = split_names(&folders, "folder")?;

        let regexes = rules
            .advanced
            .regex_patterns
            .iter()
            .filter(|source| !source.trim().is_empty())
            .map(|source| {
                Regex::new(source)
                    .map_err(|e| Error::config(format!("invalid regex '{}': {}", source, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        let content_files: Vec<&String> = rules.content_exclusion.files.iter().collect();
        let (content_names, content_globs) = split_names(&content_files, "content file")?;

        Ok(Self {
            specific_files: normalized_set(rules.advanced.specific_files.iter()),
            specific_folders: normalized_set(rules.advanced.specific_folders.iter()),
            file_names,
            folder_names,
            file_globs,
            folder_globs,
            patterns: compile_globs(&rules.advanced.patterns, "advanced")?,
            regexes,
            content: ContentRules {
                names: content_names,
                globs: content_globs,
                folders: normalized_set(rules.content_exclusion.folders.iter()),
                patterns: compile_globs(&rules.content_exclusion.patterns, "content")?,
            },
            glob_options: MatchOptions {
                case_sensitive: true,
                require_literal_separator: true,
                require_literal_leading_dot: !options.dot_inclusive,
            },
        })
    }

    /// A matcher with no rules, which includes everything.
    pub fn empty() -> Self {
        Self {
            specific_files: HashSet::new(),
            specific_folders: HashSet::new(),
            file_names: HashSet::new(),
            folder_names: HashSet::new(),
            file_globs: Vec::new(),
            folder_globs: Vec::new(),
            patterns: Vec::new(),
            regexes: Vec::new(),
            content: ContentRules::default(),
            glob_options: MatchOptions {
                case_sensitive: true,
                require_literal_separator: true,
                require_literal_leading_dot: true,
            },
        }
    }

    /// Decide whether an entry is hidden from the tree.
    pub fn should_exclude_entry(&self, relative_path: &str, name: &str, kind: EntryKind) -> bool {
        self.exclusion_reason(relative_path, name, kind).is_some()
    }

    /// The first rule, in precedence order, that excludes this entry.
    pub fn exclusion_reason(
        &self,
        relative_path: &str,
        name: &str,
        kind: EntryKind,
    ) -> Option<ExclusionReason> {
        let rel = canonical(relative_path);
        let rel: &str = &rel;

        let (specific, names, globs) = match kind {
            EntryKind::File => (&self.specific_files, &self.file_names, &self.file_globs),
            EntryKind::Folder => (&self.specific_folders, &self.folder_names, &self.folder_globs),
        };

        if specific.contains(rel) {
            return Some(ExclusionReason::SpecificPath);
        }
        if names.contains(name) {
            return Some(ExclusionReason::Name);
        }
        if let Some(rule) = globs
            .iter()
            .chain(self.patterns.iter())
            .find(|g| g.matches(rel, name, kind, self.glob_options))
        {
            return Some(ExclusionReason::Glob(rule.source.clone()));
        }
        self.regexes
            .iter()
            .find(|re| re.is_match(rel))
            .map(|re| ExclusionReason::Regex(re.as_str().to_string()))
    }

    /// Decide whether a file's body is hidden. Never affects structure.
    pub fn should_exclude_content(&self, relative_path: &str, name: &str) -> bool {
        let rel = canonical(relative_path);
        let rel: &str = &rel;
        let opts = self.glob_options;
        let content = &self.content;

        if content.names.contains(name)
            || content
                .globs
                .iter()
                .chain(content.patterns.iter())
                .any(|g| g.matches(rel, name, EntryKind::File, opts))
        {
            return true;
        }

        if content.folders.is_empty() {
            return false;
        }
        ancestors(rel).any(|dir| content.folders.contains(dir) || content.folders.contains(basename(dir)))
    }

    /// Whether a path is hidden either itself or through any ancestor folder.
    ///
    /// Used where no walk happens, such as the changed-file list of a branch
    /// comparison.
    pub fn is_path_excluded(&self, relative_path: &str) -> bool {
        let rel = normalize_path(relative_path);
        if rel.is_empty() {
            return false;
        }
        ancestors(&rel).any(|dir| self.should_exclude_entry(dir, basename(dir), EntryKind::Folder))
            || self.should_exclude_entry(&rel, basename(&rel), EntryKind::File)
    }
}

fn canonical(path: &str) -> Cow<'_, str> {
    if path.contains('\\') || path.starts_with("./") || path.ends_with('/') {
        Cow::Owned(normalize_path(path))
    } else {
        Cow::Borrowed(path)
    }
}

/// Proper ancestor directories of a relative path, shallowest first.
fn ancestors(rel: &str) -> impl Iterator<Item = &str> {
    rel.match_indices('/').map(move |(i, _)| &rel[..i])
}
