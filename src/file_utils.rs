//! Bounded file content reading
//!
//! Files are sniffed for binary content before anything is kept, and text is
//! capped at a byte budget so one huge log cannot blow up a structure dump.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::tree::TreeNode;

/// Default byte budget for one file's text (1MB).
pub const DEFAULT_MAX_CONTENT_SIZE: u64 = 1_000_000;

/// Bytes inspected by the binary sniffer.
pub const BINARY_SNIFF_LEN: usize = 8000;

/// Share of non-printable bytes above which a file counts as binary.
const NON_PRINTABLE_RATIO: f64 = 0.30;

const UTF8_BOM: char = '\u{feff}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentLimits {
    /// Text beyond this many bytes is cut off and marked truncated.
    pub max_bytes: u64,
    pub sniff_bytes: usize,
}

impl Default for ContentLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_CONTENT_SIZE,
            sniff_bytes: BINARY_SNIFF_LEN,
        }
    }
}

/// What a content read produced for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileContent {
    Text { text: String, truncated: bool },
    Binary,
    Excluded,
    Unreadable { message: String },
}

/// Binary heuristic: any NUL, or too many control bytes.
///
/// Tab, LF, CR, form feed and ESC count as printable.
pub fn is_binary(sample: &[u8]) -> bool {
    if sample.is_empty() {
        return false;
    }
    if sample.contains(&0) {
        return true;
    }
    let non_printable = sample
        .iter()
        .filter(|&&b| (b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c | 0x1b)) || b == 0x7f)
        .count();
    non_printable as f64 / sample.len() as f64 > NON_PRINTABLE_RATIO
}

/// Read a file's body unless its content is excluded.
///
/// Never fails: problems come back as [`FileContent::Unreadable`].
pub fn read_if_included(path: &Path, content_excluded: bool, limits: &ContentLimits) -> FileContent {
    if content_excluded {
        return FileContent::Excluded;
    }

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            warn!(path = %path.display(), "cannot open file: {}", e);
            return FileContent::Unreadable {
                message: e.to_string(),
            };
        }
    };

    let mut bytes = Vec::new();
    if let Err(e) = file.take(limits.max_bytes.saturating_add(1)).read_to_end(&mut bytes) {
        warn!(path = %path.display(), "cannot read file: {}", e);
        return FileContent::Unreadable {
            message: e.to_string(),
        };
    }

    let sniff = &bytes[..bytes.len().min(limits.sniff_bytes)];
    if is_binary(sniff) {
        debug!(path = %path.display(), "binary file");
        return FileContent::Binary;
    }

    let budget = usize::try_from(limits.max_bytes).unwrap_or(usize::MAX);
    let truncated = bytes.len() > budget;
    if truncated {
        bytes.truncate(budget);
        trim_partial_char(&mut bytes);
    }

    let text = String::from_utf8_lossy(&bytes);
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(&text[..]).to_string();
    FileContent::Text { text, truncated }
}

/// Drop a UTF-8 sequence cut in half at the end of the buffer.
fn trim_partial_char(bytes: &mut Vec<u8>) {
    if let Err(e) = std::str::from_utf8(bytes) {
        if e.error_len().is_none() {
            bytes.truncate(e.valid_up_to());
        }
    }
}

/// Read every file in `tree` and store the results on the nodes.
///
/// `jobs` is the worker count: 0 uses all cores, 1 reads sequentially. The
/// reads may finish in any order but results land on the right nodes.
pub fn attach_contents(tree: &mut TreeNode, root: &Path, limits: &ContentLimits, jobs: usize) {
    let mut requests = Vec::new();
    collect_requests(tree, &mut requests);
    debug!(files = requests.len(), jobs, "reading file contents");

    let read = |(rel, excluded): &(String, bool)| read_if_included(&root.join(rel), *excluded, limits);

    let results: Vec<FileContent> = match jobs {
        1 => requests.iter().map(read).collect(),
        0 => requests.par_iter().map(read).collect(),
        n => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
            Ok(pool) => pool.install(|| requests.par_iter().map(read).collect()),
            Err(e) => {
                warn!("falling back to the global thread pool: {}", e);
                requests.par_iter().map(read).collect()
            }
        },
    };

    let mut results = results.into_iter();
    store_results(tree, &mut results);
}

fn collect_requests(node: &TreeNode, out: &mut Vec<(String, bool)>) {
    match node {
        TreeNode::File {
            path,
            content_excluded,
            ..
        } => out.push((path.clone(), *content_excluded)),
        TreeNode::Dir { children, .. } => {
            for child in children {
                collect_requests(child, out);
            }
        }
        TreeNode::Issue { .. } => {}
    }
}

fn store_results(node: &mut TreeNode, results: &mut impl Iterator<Item = FileContent>) {
    match node {
        TreeNode::File {
            content, binary, ..
        } => {
            if let Some(read) = results.next() {
                *binary = match read {
                    FileContent::Binary => Some(true),
                    FileContent::Text { .. } => Some(false),
                    _ => None,
                };
                *content = Some(read);
            }
        }
        TreeNode::Dir { children, .. } => {
            for child in children {
                store_results(child, results);
            }
        }
        TreeNode::Issue { .. } => {}
    }
}
