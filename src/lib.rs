//! Canopy - project structure snapshots with layered exclusion rules, and
//! branch comparison reports built on the same rules.
//!
//! ```no_run
//! use std::path::Path;
//!
//! use canopy::{Settings, StructureOptions, generate_structure};
//!
//! let settings = Settings::load(Path::new("canopy.json"))?;
//! let matcher = settings.matcher()?;
//! let options = StructureOptions::from_settings(&settings);
//! println!("{}", generate_structure(Path::new("."), &matcher, &options)?);
//! # Ok::<(), canopy::Error>(())
//! ```

pub mod compare;
pub mod config;
pub mod error;
pub mod file_utils;
pub mod matcher;
pub mod output;
pub mod rules;
pub mod string_utils;
pub mod structure;
pub mod tree;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use compare::{
    BranchComparison, ChangedFileRecord, CompareOptions, ComparisonResult, ComparisonSummary,
    DiffRange, DiffSource, FileStatus, GitCommandSource, ReportConfig, generate_comparison_output,
};
pub use config::{SETTINGS_FILE_NAME, Settings};
pub use error::{Error, Result};
pub use file_utils::{ContentLimits, FileContent};
pub use matcher::{EntryKind, MatcherOptions, PatternMatcher};
pub use output::{
    MarkdownFormatter, OutputConfig, OutputFormat, TreeFormatter, print_json, render, to_json,
};
pub use rules::{ExclusionRule, ExclusionRuleSet, ExclusionTarget};
pub use structure::{StructureOptions, build_tree, generate_structure};
pub use tree::{EntryIssue, TreeNode, TreeWalker, WalkerConfig};
