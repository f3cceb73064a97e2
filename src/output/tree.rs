//! Tree formatter for plain text output
//!
//! `TreeFormatter` renders a complete `TreeNode` either into a string or,
//! with colours, into any `termcolor` writer.

use std::io::{self, Write};

use termcolor::{Buffer, Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::compare::FileStatus;
use crate::tree::TreeNode;

use super::config::OutputConfig;
use super::utils::{child_prefix, file_suffix, issue_marker};

/// Formatter for `tree(1)`-style output.
pub struct TreeFormatter {
    config: OutputConfig,
}

impl TreeFormatter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Tree lines followed by the `N directories, M files` summary.
    pub fn format(&self, node: &TreeNode) -> String {
        let mut buffer = Buffer::no_color();
        // Writes into memory never fail
        let _ = self.write_colored(node, &mut buffer);
        String::from_utf8_lossy(buffer.as_slice()).into_owned()
    }

    pub fn print(&self, node: &TreeNode) -> io::Result<()> {
        let choice = if self.config.use_color {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        let mut stdout = StandardStream::stdout(choice);
        self.write_colored(node, &mut stdout)
    }

    pub fn write_colored<W: WriteColor>(&self, node: &TreeNode, out: &mut W) -> io::Result<()> {
        let (dir_count, file_count) = self.write_node(node, out, "", true, 0)?;
        writeln!(out)?;
        writeln!(out, "{} directories, {} files", dir_count, file_count)?;
        Ok(())
    }

    fn write_node<W: WriteColor>(
        &self,
        node: &TreeNode,
        out: &mut W,
        prefix: &str,
        is_last: bool,
        depth: usize,
    ) -> io::Result<(usize, usize)> {
        let connector = if is_last { "└── " } else { "├── " };
        if depth > 0 {
            write!(out, "{}{}", prefix, connector)?;
        }

        match node {
            TreeNode::File {
                name, size, change, ..
            } => {
                out.set_color(ColorSpec::new().set_fg(Some(Color::White)))?;
                write!(out, "{}", name)?;
                if let Some(change) = change {
                    let color = match change.status {
                        FileStatus::Added => Color::Green,
                        FileStatus::Modified => Color::Yellow,
                        FileStatus::Deleted => Color::Red,
                    };
                    out.set_color(ColorSpec::new().set_fg(Some(color)))?;
                }
                write!(
                    out,
                    "{}",
                    file_suffix(*size, change.as_ref(), self.config.show_size)
                )?;
                out.reset()?;
                writeln!(out)?;
                Ok((0, 1))
            }
            TreeNode::Issue { name, issue, .. } => {
                write!(out, "{} ", name)?;
                out.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
                write!(out, "{}", issue_marker(issue))?;
                out.reset()?;
                writeln!(out)?;
                Ok((0, 0))
            }
            TreeNode::Dir { name, children, .. } => {
                out.set_color(ColorSpec::new().set_fg(Some(Color::Blue)).set_bold(true))?;
                write!(out, "{}", name)?;
                out.reset()?;
                writeln!(out)?;

                if !self.config.descends_into(depth) {
                    return Ok((0, 0));
                }

                let new_prefix = if depth == 0 {
                    String::new()
                } else {
                    child_prefix(prefix, is_last)
                };

                let mut dir_count = 0;
                let mut file_count = 0;
                for (i, child) in children.iter().enumerate() {
                    let child_is_last = i == children.len() - 1;
                    let (d, f) = self.write_node(child, out, &new_prefix, child_is_last, depth + 1)?;
                    dir_count += d;
                    file_count += f;
                    if matches!(child, TreeNode::Dir { .. }) {
                        dir_count += 1;
                    }
                }
                Ok((dir_count, file_count))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::RenameKind;
    use crate::tree::{ChangeMarker, EntryIssue};

    fn sample() -> TreeNode {
        TreeNode::dir(
            "project",
            "",
            vec![
                TreeNode::dir(
                    "src",
                    "src",
                    vec![
                        TreeNode::file("lib.rs", "src/lib.rs"),
                        TreeNode::file("main.rs", "src/main.rs"),
                    ],
                ),
                TreeNode::file("Cargo.toml", "Cargo.toml"),
                TreeNode::file("README.md", "README.md"),
            ],
        )
    }

    #[test]
    fn test_format_output() {
        let output = TreeFormatter::new(OutputConfig::default()).format(&sample());
        assert_eq!(
            output,
            "project\n\
             ├── src\n\
             │   ├── lib.rs\n\
             │   └── main.rs\n\
             ├── Cargo.toml\n\
             └── README.md\n\
             \n\
             1 directories, 4 files\n"
        );
    }

    #[test]
    fn test_format_has_no_escape_codes() {
        let config = OutputConfig {
            use_color: true,
            ..Default::default()
        };
        let output = TreeFormatter::new(config).format(&sample());
        assert!(!output.contains('\x1b'));
    }

    #[test]
    fn test_last_dir_continuation_is_blank() {
        let tree = TreeNode::dir(
            "root",
            "",
            vec![TreeNode::dir(
                "a",
                "a",
                vec![TreeNode::dir("b", "a/b", vec![TreeNode::file("c.rs", "a/b/c.rs")])],
            )],
        );
        let output = TreeFormatter::new(OutputConfig::default()).format(&tree);
        assert!(output.contains("└── a\n    └── b\n        └── c.rs\n"));
        assert!(output.ends_with("2 directories, 1 files\n"));
    }

    #[test]
    fn test_issue_markers() {
        let tree = TreeNode::dir(
            "root",
            "",
            vec![
                TreeNode::Issue {
                    name: "loop".to_string(),
                    path: "loop".to_string(),
                    is_dir: true,
                    issue: EntryIssue::SymlinkCycle,
                },
                TreeNode::Issue {
                    name: "dangling".to_string(),
                    path: "dangling".to_string(),
                    is_dir: false,
                    issue: EntryIssue::BrokenSymlink,
                },
            ],
        );
        let output = TreeFormatter::new(OutputConfig::default()).format(&tree);
        assert!(output.contains("├── loop [symlink cycle]\n"));
        assert!(output.contains("└── dangling [broken symlink]\n"));
        assert!(output.ends_with("0 directories, 0 files\n"));
    }

    #[test]
    fn test_change_tags_and_sizes() {
        let tree = TreeNode::dir(
            "root",
            "",
            vec![TreeNode::File {
                name: "new.rs".to_string(),
                path: "new.rs".to_string(),
                size: Some(2048),
                content_excluded: false,
                binary: None,
                content: None,
                change: Some(ChangeMarker {
                    status: FileStatus::Modified,
                    rename: Some(RenameKind::Renamed),
                    additions: Some(3),
                    deletions: Some(1),
                    old_path: Some("old.rs".to_string()),
                }),
            }],
        );
        let config = OutputConfig {
            show_size: true,
            ..Default::default()
        };
        let output = TreeFormatter::new(config).format(&tree);
        assert!(output.contains("└── new.rs (2.0K) [M +3 -1] (renamed from old.rs)\n"));
    }

    #[test]
    fn test_max_depth_hides_children() {
        let config = OutputConfig {
            max_depth: Some(1),
            ..Default::default()
        };
        let output = TreeFormatter::new(config).format(&sample());
        assert!(output.contains("├── src\n├── Cargo.toml"));
        assert!(!output.contains("lib.rs"));
        assert!(output.ends_with("1 directories, 2 files\n"));
    }

    #[test]
    fn test_format_is_idempotent() {
        let formatter = TreeFormatter::new(OutputConfig::default());
        assert_eq!(formatter.format(&sample()), formatter.format(&sample()));
    }

    #[test]
    fn test_colored_output_uses_escape_codes() {
        let mut buffer = Buffer::ansi();
        TreeFormatter::new(OutputConfig::default())
            .write_colored(&sample(), &mut buffer)
            .unwrap();
        let output = String::from_utf8(buffer.into_inner()).unwrap();
        assert!(output.contains('\x1b'));
        assert!(output.contains("lib.rs"));
    }
}
