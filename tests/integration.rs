//! Integration tests for canopy


use assert_cmd::Command;
use harness::{TestRepo, branched_repo, run_canopy};
use predicates::prelude::*;

fn project() -> TestRepo {
    let repo = TestRepo::new();
    repo.add_file("src/main.rs", "fn main() {}\n");
    repo.add_file("src/util.rs", "pub fn util() {}\n");
    repo.add_file("node_modules/pkg/index.js", "module.exports = 1;\n");
    repo.add_file("Cargo.toml", "[package]\nname = \"demo\"\n");
    repo.add_file(".env.local", "SECRET=1\n");
    repo
}

#[test]
fn test_basic_structure_output() {
    let repo = project();
    let (stdout, stderr, success) = run_canopy(repo.path(), &["structure"]);
    assert!(success, "canopy should succeed: {}", stderr);
    assert!(stdout.contains("├── src\n│   ├── main.rs\n│   └── util.rs\n"), "{}", stdout);
    assert!(stdout.contains("Cargo.toml"));
    // Common defaults hide node_modules
    assert!(!stdout.contains("node_modules"), "{}", stdout);
    assert!(stdout.contains("directories, "));
}

#[test]
fn test_structure_of_explicit_path() {
    let repo = project();
    let (stdout, _stderr, success) = run_canopy(repo.path(), &["structure", "src"]);
    assert!(success);
    assert!(stdout.starts_with("src\n"));
    assert!(stdout.ends_with("0 directories, 2 files\n"), "{}", stdout);
}

#[test]
fn test_structure_markdown_and_content() {
    let repo = project();
    let (stdout, _stderr, success) = run_canopy(repo.path(), &["structure", "-m", "--content"]);
    assert!(success);
    assert!(stdout.contains("    - **src/**\n"));
    assert!(stdout.contains("## File contents"));
    assert!(stdout.contains("### `src/main.rs`\n\n```rust\nfn main() {}\n```\n"), "{}", stdout);
}

#[test]
fn test_structure_json() {
    let repo = project();
    let (stdout, _stderr, success) = run_canopy(repo.path(), &["structure", "--json"]);
    assert!(success);
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(value["type"], "dir");
    assert!(value["children"].as_array().is_some_and(|c| !c.is_empty()));
}

#[test]
fn test_ignore_flag_adds_pattern() {
    let repo = project();
    let (stdout, _stderr, success) = run_canopy(repo.path(), &["structure", "-I", "*.toml"]);
    assert!(success);
    assert!(!stdout.contains("Cargo.toml"));
    assert!(stdout.contains("main.rs"));
}

#[test]
fn test_dotfile_policy_switch() {
    let repo = project();
    let (stdout, _stderr, _) = run_canopy(repo.path(), &["structure", "-I", "*env*"]);
    assert!(stdout.contains(".env.local"), "dotfiles survive wildcards by default");

    let (stdout, _stderr, _) = run_canopy(repo.path(), &["structure", "-I", "*env*", "--dot-globs"]);
    assert!(!stdout.contains(".env.local"));
}

#[test]
fn test_level_limits_depth() {
    let repo = project();
    let (stdout, _stderr, success) = run_canopy(repo.path(), &["structure", "-L", "1"]);
    assert!(success);
    assert!(stdout.contains("src"));
    assert!(!stdout.contains("main.rs"));
}

#[test]
fn test_output_file() {
    let repo = project();
    let (stdout, _stderr, success) = run_canopy(repo.path(), &["structure", "-o", "tree.txt"]);
    assert!(success);
    assert!(stdout.is_empty());
    let written = std::fs::read_to_string(repo.path().join("tree.txt")).unwrap();
    assert!(written.contains("main.rs"));
}

#[test]
fn test_missing_root_fails() {
    let repo = TestRepo::new();
    let (_stdout, stderr, success) = run_canopy(repo.path(), &["structure", "does-not-exist"]);
    assert!(!success);
    assert!(stderr.starts_with("canopy: "), "{}", stderr);
    assert!(stderr.contains("does-not-exist"));
}

#[test]
fn test_malformed_settings_fail() {
    let repo = project();
    repo.add_file("canopy.json", "{ not json");
    let (_stdout, stderr, success) = run_canopy(repo.path(), &["structure"]);
    assert!(!success);
    assert!(stderr.contains("invalid configuration"), "{}", stderr);
}

#[test]
fn test_settings_file_rules_apply() {
    let repo = project();
    repo.add_file(
        "canopy.json",
        r#"{"exclude": {"folders": ["src"], "advanced": {"specificFiles": ["Cargo.toml"]}}}"#,
    );
    let (stdout, _stderr, success) = run_canopy(repo.path(), &["structure"]);
    assert!(success);
    assert!(!stdout.contains("main.rs"));
    assert!(!stdout.contains("Cargo.toml"));
    // The file replaces the defaults entirely
    assert!(stdout.contains("node_modules"));
}

#[test]
fn test_exclude_add_list_remove() {
    let repo = TestRepo::new();

    Command::cargo_bin("canopy")
        .unwrap()
        .current_dir(repo.path())
        .args(["exclude", "add", "folder", "coverage"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added folder 'coverage'"));

    Command::cargo_bin("canopy")
        .unwrap()
        .current_dir(repo.path())
        .args(["exclude", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("folder\tcoverage"));

    Command::cargo_bin("canopy")
        .unwrap()
        .current_dir(repo.path())
        .args(["exclude", "remove", "folder", "coverage"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed folder 'coverage'"));

    Command::cargo_bin("canopy")
        .unwrap()
        .current_dir(repo.path())
        .args(["exclude", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("coverage").not());
}

#[test]
fn test_exclude_rejects_invalid_rule() {
    let repo = TestRepo::new();
    Command::cargo_bin("canopy")
        .unwrap()
        .current_dir(repo.path())
        .args(["exclude", "add", "folder", "a/b"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("canopy: "));
    assert!(!repo.path().join("canopy.json").exists());
}

#[test]
fn test_compare_report() {
    let repo = branched_repo();
    let (stdout, stderr, success) = run_canopy(repo.path(), &["compare", "feature", "main"]);
    assert!(success, "compare should succeed: {}", stderr);
    assert!(stdout.starts_with("Comparing feature with main\n"), "{}", stdout);
    assert!(stdout.contains("  A  src/new_module.rs  +1 -0\n"), "{}", stdout);
    assert!(stdout.contains("  M  src/lib.rs  +1 -0\n"), "{}", stdout);
    assert!(stdout.contains("  D  docs/guide.md  +0 -1\n"), "{}", stdout);
    assert!(stdout.contains("(renamed from src/old_name.rs)"), "{}", stdout);
    // dist is in the default exclusions
    assert!(!stdout.contains("dist/app.js"), "{}", stdout);
    assert!(stdout.contains("Files changed: 4\n"), "{}", stdout);
}

#[test]
fn test_compare_tree() {
    let repo = branched_repo();
    let (stdout, _stderr, success) = run_canopy(repo.path(), &["compare", "feature", "main", "--tree"]);
    assert!(success);
    assert!(stdout.starts_with("main...feature\n"), "{}", stdout);
    assert!(stdout.contains("├── docs\n│   └── guide.md [D +0 -1]\n"), "{}", stdout);
    assert!(stdout.contains("new_module.rs [A +1 -0]"));
}

#[test]
fn test_compare_json_summary_consistent() {
    let repo = branched_repo();
    let (stdout, _stderr, success) = run_canopy(repo.path(), &["compare", "feature", "main", "--json"]);
    assert!(success);
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    let files = value["filesChanged"].as_array().unwrap();
    let summary = &value["summary"];
    assert_eq!(summary["totalFiles"].as_u64().unwrap() as usize, files.len());
    let partition = summary["filesAdded"].as_u64().unwrap()
        + summary["filesModified"].as_u64().unwrap()
        + summary["filesDeleted"].as_u64().unwrap();
    assert_eq!(partition as usize, files.len());
}

#[test]
fn test_compare_with_diff() {
    let repo = branched_repo();
    let (stdout, _stderr, success) =
        run_canopy(repo.path(), &["compare", "feature", "main", "--diff", "-m"]);
    assert!(success);
    assert!(stdout.contains("## Diff"));
    assert!(stdout.contains("+pub fn added() {}"));
    assert!(!stdout.contains("console.log"));
}

#[test]
#[cfg(unix)]
fn test_compare_arrow_file_name_counted_once() {
    let repo = TestRepo::with_git();
    repo.add_file("README.md", "# readme\n");
    repo.commit_all("initial");
    repo.create_branch("feature");
    repo.add_file("notes => todo.md", "- ship it\n");
    repo.commit_all("notes");

    let (stdout, stderr, success) = run_canopy(repo.path(), &["compare", "feature", "main", "--json"]);
    assert!(success, "compare should succeed: {}", stderr);
    let value: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    let files = value["filesChanged"].as_array().unwrap();
    assert_eq!(files.len(), 1, "{}", stdout);
    assert_eq!(files[0]["path"], "notes => todo.md");
    assert_eq!(files[0]["status"], "added");
    assert_eq!(files[0]["additions"], 1);
    assert_eq!(value["summary"]["totalFiles"], 1);
}

#[test]
fn test_compare_diff_hides_excluded_folder_with_spaced_name() {
    let repo = TestRepo::with_git();
    repo.add_file("src/lib.rs", "pub fn one() {}\n");
    repo.commit_all("initial");
    repo.create_branch("feature");
    repo.add_file("dist/my b/app.js", "const token = 'hidden';\n");
    repo.add_file("src/lib.rs", "pub fn one() {}\npub fn two() {}\n");
    repo.commit_all("build output");

    let (stdout, stderr, success) = run_canopy(repo.path(), &["compare", "feature", "main", "--diff"]);
    assert!(success, "compare should succeed: {}", stderr);
    assert!(stdout.contains("+pub fn two() {}"), "{}", stdout);
    assert!(!stdout.contains("hidden"), "{}", stdout);
    assert!(!stdout.contains("app.js"), "{}", stdout);
}

#[test]
fn test_compare_unknown_branch() {
    let repo = branched_repo();
    let (_stdout, stderr, success) = run_canopy(repo.path(), &["compare", "nope", "main"]);
    assert!(!success);
    assert!(stderr.contains("unknown revision 'nope'"), "{}", stderr);
}

#[test]
fn test_compare_outside_repository() {
    let dir = TestRepo::new();
    let (_stdout, stderr, success) = run_canopy(dir.path(), &["compare", "feature", "main"]);
    assert!(!success);
    assert!(stderr.contains("git"), "{}", stderr);
}
