//! Comparison reports

use crate::output::OutputFormat;

use super::{ChangedFileRecord, ComparisonResult, RenameKind};

#[derive(Debug, Clone, Default)]
pub struct ReportConfig {
    pub format: OutputFormat,
    /// Append the patch text when the result carries one.
    pub include_diff: bool,
}

pub fn generate_comparison_output(result: &ComparisonResult, config: &ReportConfig) -> String {
    match config.format {
        OutputFormat::Text => text_report(result, config),
        OutputFormat::Markdown => markdown_report(result, config),
    }
}

fn count(value: Option<u32>, sign: char) -> String {
    value.map_or_else(|| "-".to_string(), |n| format!("{}{}", sign, n))
}

fn origin_note(record: &ChangedFileRecord) -> Option<String> {
    let old = record.old_path.as_ref()?;
    Some(match record.rename {
        Some(RenameKind::Copied) => format!("copied from {}", old),
        _ => format!("renamed from {}", old),
    })
}

fn text_report(result: &ComparisonResult, config: &ReportConfig) -> String {
    let summary = &result.summary;
    let mut out = format!(
        "Comparing {} with {}\n\n",
        result.source_branch, result.target_branch
    );
    out.push_str(&format!("Files changed: {}\n", summary.total_files));
    out.push_str(&format!("Additions: +{}\n", summary.additions));
    out.push_str(&format!("Deletions: -{}\n", summary.deletions));
    out.push_str(&format!(
        "Added: {}, Modified: {}, Deleted: {}\n",
        summary.files_added, summary.files_modified, summary.files_deleted
    ));

    if result.files_changed.is_empty() {
        out.push_str("\nNo changes.\n");
    } else {
        out.push_str("\nChanged files:\n");
        for record in &result.files_changed {
            out.push_str(&format!(
                "  {}  {}  {} {}",
                record.status.letter(),
                record.path,
                count(record.additions, '+'),
                count(record.deletions, '-')
            ));
            if let Some(note) = origin_note(record) {
                out.push_str(&format!("  ({})", note));
            }
            out.push('\n');
        }
    }

    if config.include_diff {
        if let Some(diff) = result.diff_content.as_deref().filter(|d| !d.is_empty()) {
            out.push_str("\nDiff\n====\n\n");
            out.push_str(diff);
            if !diff.ends_with('\n') {
                out.push('\n');
            }
        }
    }
    out
}

fn markdown_report(result: &ComparisonResult, config: &ReportConfig) -> String {
    let summary = &result.summary;
    let mut out = format!(
        "# Branch comparison: `{}` vs `{}`\n\n",
        result.source_branch, result.target_branch
    );
    out.push_str("| Metric | Value |\n|--------|-------|\n");
    out.push_str(&format!("| Files changed | {} |\n", summary.total_files));
    out.push_str(&format!("| Additions | +{} |\n", summary.additions));
    out.push_str(&format!("| Deletions | -{} |\n", summary.deletions));
    out.push_str(&format!("| Added | {} |\n", summary.files_added));
    out.push_str(&format!("| Modified | {} |\n", summary.files_modified));
    out.push_str(&format!("| Deleted | {} |\n", summary.files_deleted));

    out.push_str("\n## Changed files\n\n");
    if result.files_changed.is_empty() {
        out.push_str("_No changes._\n");
    } else {
        out.push_str("| Status | File | Additions | Deletions |\n");
        out.push_str("|--------|------|-----------|-----------|\n");
        for record in &result.files_changed {
            let file = match origin_note(record) {
                Some(note) => format!("`{}` ({})", record.path, note),
                None => format!("`{}`", record.path),
            };
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                record.status.letter(),
                file,
                count(record.additions, '+'),
                count(record.deletions, '-')
            ));
        }
    }

    if config.include_diff {
        if let Some(diff) = result.diff_content.as_deref().filter(|d| !d.is_empty()) {
            out.push_str("\n## Diff\n\n```diff\n");
            out.push_str(diff);
            if !diff.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n");
        }
    }
    out
}
