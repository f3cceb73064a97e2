//! Exclusion rule sets and the pure operations that edit them.
//!
//! An [`ExclusionRuleSet`] is a plain value. Editing never mutates in place:
//! [`ExclusionRuleSet::add_rule`] and [`ExclusionRuleSet::remove_rule`] return
//! a new set, so a run that already compiled its matcher from an older set is
//! unaffected by later edits.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::string_utils::{has_glob_metachars, normalize_path};

/// All exclusion rules active for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExclusionRuleSet {
    /// Folder names excluded anywhere in the tree.
    pub folders: BTreeSet<String>,
    /// File names or glob patterns (e.g. `*.log`) excluded anywhere.
    pub files: BTreeSet<String>,
    pub advanced: AdvancedRules,
    /// Rules that hide file bodies while keeping the files in the tree.
    pub content_exclusion: ContentExclusion,
}

/// Path-aware and pattern-based rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdvancedRules {
    /// Glob patterns matched against the relative path or the basename.
    pub patterns: Vec<String>,
    /// Exact root-relative file paths.
    pub specific_files: BTreeSet<String>,
    /// Exact root-relative folder paths.
    pub specific_folders: BTreeSet<String>,
    /// Regex sources matched against the relative path.
    pub regex_patterns: Vec<String>,
}

/// Content exclusion rules, same shapes as the structural ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentExclusion {
    pub files: BTreeSet<String>,
    pub folders: BTreeSet<String>,
    pub patterns: Vec<String>,
}

/// Which container a rule lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExclusionTarget {
    Folder,
    File,
    /// Stored in `files` as `*.<ext>`.
    Extension,
    Pattern,
    SpecificFile,
    SpecificFolder,
    Regex,
    ContentFile,
    ContentFolder,
    ContentPattern,
}

impl ExclusionTarget {
    pub const ALL: [ExclusionTarget; 10] = [
        ExclusionTarget::Folder,
        ExclusionTarget::File,
        ExclusionTarget::Extension,
        ExclusionTarget::Pattern,
        ExclusionTarget::SpecificFile,
        ExclusionTarget::SpecificFolder,
        ExclusionTarget::Regex,
        ExclusionTarget::ContentFile,
        ExclusionTarget::ContentFolder,
        ExclusionTarget::ContentPattern,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExclusionTarget::Folder => "folder",
            ExclusionTarget::File => "file",
            ExclusionTarget::Extension => "extension",
            ExclusionTarget::Pattern => "pattern",
            ExclusionTarget::SpecificFile => "specific-file",
            ExclusionTarget::SpecificFolder => "specific-folder",
            ExclusionTarget::Regex => "regex",
            ExclusionTarget::ContentFile => "content-file",
            ExclusionTarget::ContentFolder => "content-folder",
            ExclusionTarget::ContentPattern => "content-pattern",
        }
    }
}

impl fmt::Display for ExclusionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExclusionTarget {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ExclusionTarget::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<_> = ExclusionTarget::ALL.iter().map(|t| t.as_str()).collect();
                format!("unknown exclusion target '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

/// A single rule: a target container plus the value to store in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionRule {
    pub target: ExclusionTarget,
    pub value: String,
}

impl ExclusionRule {
    pub fn new(target: ExclusionTarget, value: impl Into<String>) -> Self {
        Self {
            target,
            value: value.into(),
        }
    }

    /// Validate the value and convert it to the form stored in the rule set.
    fn canonical_value(&self) -> Result<String> {
        let raw = self.value.trim();
        if raw.is_empty() {
            return Err(Error::config(format!(
                "empty value for {} exclusion",
                self.target
            )));
        }

        let value = match self.target {
            ExclusionTarget::Folder | ExclusionTarget::File => {
                let name = raw.replace('\\', "/");
                let name = name.trim_end_matches('/');
                if name.contains('/') {
                    return Err(Error::config(format!(
                        "'{}' is a path; use specific-{} for path exclusions",
                        raw, self.target
                    )));
                }
                if has_glob_metachars(name) {
                    validate_glob(name)?;
                }
                name.to_string()
            }
            ExclusionTarget::ContentFile => {
                if has_glob_metachars(raw) {
                    validate_glob(raw)?;
                }
                raw.to_string()
            }
            ExclusionTarget::Extension => {
                let ext = raw.trim_start_matches('*').trim_start_matches('.');
                if ext.is_empty() || ext.contains(['/', '\\']) {
                    return Err(Error::config(format!("invalid extension '{}'", raw)));
                }
                format!("*.{}", ext)
            }
            ExclusionTarget::SpecificFile
            | ExclusionTarget::SpecificFolder
            | ExclusionTarget::ContentFolder => {
                let path = normalize_path(raw);
                if path.is_empty() {
                    return Err(Error::config(format!("empty path for {} exclusion", self.target)));
                }
                path
            }
            ExclusionTarget::Pattern | ExclusionTarget::ContentPattern => {
                let pattern = raw.replace('\\', "/");
                validate_glob(pattern.trim_end_matches('/'))?;
                pattern
            }
            ExclusionTarget::Regex => {
                regex::Regex::new(raw).map_err(|e| {
                    Error::config(format!("invalid regex '{}': {}", raw, e))
                })?;
                raw.to_string()
            }
        };
        Ok(value)
    }
}

fn validate_glob(pattern: &str) -> Result<()> {
    glob::Pattern::new(pattern)
        .map(|_| ())
        .map_err(|e| Error::config(format!("invalid glob '{}': {}", pattern, e)))
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

fn remove_from_list(list: &mut Vec<String>, value: &str) -> bool {
    match list.iter().position(|v| v == value) {
        Some(index) => {
            list.remove(index);
            true
        }
        None => false,
    }
}

impl ExclusionRuleSet {
    /// Return a copy of this set with `rule` added.
    ///
    /// Adding a rule that is already present returns an identical set.
    pub fn add_rule(&self, rule: &ExclusionRule) -> Result<Self> {
        let value = rule.canonical_value()?;
        let mut next = self.clone();
        match rule.target {
            ExclusionTarget::Folder => {
                next.folders.insert(value);
            }
            ExclusionTarget::File | ExclusionTarget::Extension => {
                next.files.insert(value);
            }
            ExclusionTarget::Pattern => push_unique(&mut next.advanced.patterns, value),
            ExclusionTarget::SpecificFile => {
                next.advanced.specific_files.insert(value);
            }
            ExclusionTarget::SpecificFolder => {
                next.advanced.specific_folders.insert(value);
            }
            ExclusionTarget::Regex => push_unique(&mut next.advanced.regex_patterns, value),
            ExclusionTarget::ContentFile => {
                next.content_exclusion.files.insert(value);
            }
            ExclusionTarget::ContentFolder => {
                next.content_exclusion.folders.insert(value);
            }
            ExclusionTarget::ContentPattern => {
                push_unique(&mut next.content_exclusion.patterns, value)
            }
        }
        Ok(next)
    }

    /// Return a copy of this set without `rule`, or `None` if it was not present.
    pub fn remove_rule(&self, rule: &ExclusionRule) -> Option<Self> {
        let value = rule.canonical_value().ok()?;
        let mut next = self.clone();
        let removed = match rule.target {
            ExclusionTarget::Folder => next.folders.remove(&value),
            ExclusionTarget::File | ExclusionTarget::Extension => next.files.remove(&value),
            ExclusionTarget::Pattern => remove_from_list(&mut next.advanced.patterns, &value),
            ExclusionTarget::SpecificFile => next.advanced.specific_files.remove(&value),
            ExclusionTarget::SpecificFolder => next.advanced.specific_folders.remove(&value),
            ExclusionTarget::Regex => remove_from_list(&mut next.advanced.regex_patterns, &value),
            ExclusionTarget::ContentFile => next.content_exclusion.files.remove(&value),
            ExclusionTarget::ContentFolder => next.content_exclusion.folders.remove(&value),
            ExclusionTarget::ContentPattern => {
                remove_from_list(&mut next.content_exclusion.patterns, &value)
            }
        };
        removed.then_some(next)
    }

    /// Every rule in the set, grouped by target in declaration order.
    pub fn rules(&self) -> Vec<ExclusionRule> {
        let groups: [(ExclusionTarget, Vec<&String>); 9] = [
            (ExclusionTarget::Folder, self.folders.iter().collect()),
            (ExclusionTarget::File, self.files.iter().collect()),
            (ExclusionTarget::Pattern, self.advanced.patterns.iter().collect()),
            (ExclusionTarget::SpecificFile, self.advanced.specific_files.iter().collect()),
            (ExclusionTarget::SpecificFolder, self.advanced.specific_folders.iter().collect()),
            (ExclusionTarget::Regex, self.advanced.regex_patterns.iter().collect()),
            (ExclusionTarget::ContentFile, self.content_exclusion.files.iter().collect()),
            (ExclusionTarget::ContentFolder, self.content_exclusion.folders.iter().collect()),
            (ExclusionTarget::ContentPattern, self.content_exclusion.patterns.iter().collect()),
        ];
        groups
            .into_iter()
            .flat_map(|(target, values)| {
                values
                    .into_iter()
                    .map(move |v| ExclusionRule::new(target, v.clone()))
            })
            .collect()
    }

    /// Rule set with the folders nearly every project wants hidden.
    pub fn with_common_defaults() -> Self {
        let mut rules = Self::default();
        for folder in ["node_modules", ".git", "dist", "build", "out", "target", ".vscode"] {
            rules.folders.insert(folder.to_string());
        }
        for file in [".DS_Store", "Thumbs.db", "*.log"] {
            rules.files.insert(file.to_string());
        }
        rules
    }
}
