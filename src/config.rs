//! Settings file handling
//!
//! `canopy.json` holds the exclusion rules plus a handful of scalar options.
//! Every run reads it once and works from that snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::file_utils::{ContentLimits, DEFAULT_MAX_CONTENT_SIZE};
use crate::matcher::{MatcherOptions, PatternMatcher};
use crate::rules::ExclusionRuleSet;

/// Default settings file name, looked up in the project root.
pub const SETTINGS_FILE_NAME: &str = "canopy.json";

/// User settings as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub exclude: ExclusionRuleSet,
    /// Emit debug-level log events.
    pub debug: bool,
    /// Bytes of text kept per file before truncation.
    pub max_content_size: u64,
    /// Lines of each file embedded in content dumps (`None` = all).
    pub content_line_limit: Option<usize>,
    pub respect_gitignore: bool,
    /// Let glob wildcards match names starting with `.`.
    pub dot_inclusive_globs: bool,
    pub follow_symlinks: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            exclude: ExclusionRuleSet::with_common_defaults(),
            debug: false,
            max_content_size: DEFAULT_MAX_CONTENT_SIZE,
            content_line_limit: None,
            respect_gitignore: false,
            dot_inclusive_globs: false,
            follow_symlinks: true,
        }
    }
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(Error::io(path, e)),
        };
        serde_json::from_str(&text)
            .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))
    }

    /// Write settings to `path` as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::config(format!("cannot serialize settings: {}", e)))?;
        json.push('\n');
        fs::write(path, json).map_err(|e| Error::io(path, e))
    }

    /// Settings path for a project root.
    pub fn default_path(root: &Path) -> PathBuf {
        root.join(SETTINGS_FILE_NAME)
    }

    /// Compile the exclusion rules into this run's matcher.
    pub fn matcher(&self) -> Result<PatternMatcher> {
        PatternMatcher::new(
            &self.exclude,
            MatcherOptions {
                dot_inclusive: self.dot_inclusive_globs,
            },
        )
    }

    pub fn content_limits(&self) -> ContentLimits {
        ContentLimits {
            max_bytes: self.max_content_size,
            ..ContentLimits::default()
        }
    }
}
