//! Performance benchmarks for canopy

use canopy::matcher::EntryKind;
use canopy::{
    ExclusionRule, ExclusionRuleSet, ExclusionTarget, OutputConfig, PatternMatcher,
    StructureOptions, TreeWalker, WalkerConfig, generate_structure, render,
};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::fs;
use tempfile::TempDir;

const NUMSTAT: &str = "12\t4\tsrc/a.ts\n3\t0\tsrc/b.ts\n-\t-\tassets/img.png\n1\t1\tsrc/{util => helpers}/mod.rs\n";

fn create_project(dirs: usize, files_per_dir: usize) -> TempDir {
    let dir = TempDir::new().unwrap();
    for d in 0..dirs {
        let sub = dir.path().join(format!("module_{}", d));
        fs::create_dir_all(&sub).unwrap();
        for f in 0..files_per_dir {
            fs::write(sub.join(format!("file_{}.rs", f)), format!("// file {}\nfn f() {{}}\n", f)).unwrap();
        }
    }
    let ignored = dir.path().join("node_modules/pkg");
    fs::create_dir_all(&ignored).unwrap();
    for f in 0..files_per_dir {
        fs::write(ignored.join(format!("dep_{}.js", f)), "module.exports = {};\n").unwrap();
    }
    dir
}

fn rich_rules() -> ExclusionRuleSet {
    let mut rules = ExclusionRuleSet::with_common_defaults();
    for (target, value) in [
        (ExclusionTarget::Extension, "tmp"),
        (ExclusionTarget::Pattern, "**/generated/**"),
        (ExclusionTarget::Pattern, "*.min.js"),
        (ExclusionTarget::SpecificFile, "src/secret.rs"),
        (ExclusionTarget::Regex, r"^vendor/.*\.c$"),
        (ExclusionTarget::ContentPattern, "*.lock"),
    ] {
        rules = rules.add_rule(&ExclusionRule::new(target, value)).unwrap();
    }
    rules
}

fn bench_matcher(c: &mut Criterion) {
    let rules = rich_rules();
    let mut group = c.benchmark_group("matcher");

    group.bench_function("compile", |b| {
        b.iter(|| PatternMatcher::new(black_box(&rules), Default::default()))
    });

    let matcher = PatternMatcher::new(&rules, Default::default()).unwrap();
    group.bench_function("included_file", |b| {
        b.iter(|| {
            matcher.should_exclude_entry(black_box("src/tree/walker.rs"), "walker.rs", EntryKind::File)
        })
    });
    group.bench_function("regex_excluded_file", |b| {
        b.iter(|| matcher.should_exclude_entry(black_box("vendor/zlib.c"), "zlib.c", EntryKind::File))
    });
    group.bench_function("path_with_ancestors", |b| {
        b.iter(|| matcher.is_path_excluded(black_box("a/b/c/d/e/generated/out.rs")))
    });

    group.finish();
}

fn bench_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("walk");
    let matcher = PatternMatcher::new(&ExclusionRuleSet::with_common_defaults(), Default::default()).unwrap();

    let small = create_project(5, 10);
    group.bench_function("small_project_50_files", |b| {
        b.iter(|| TreeWalker::new(WalkerConfig::default(), &matcher).walk(black_box(small.path())))
    });

    let large = create_project(50, 20);
    group.bench_function("large_project_1000_files", |b| {
        b.iter(|| TreeWalker::new(WalkerConfig::default(), &matcher).walk(black_box(large.path())))
    });

    let tree = TreeWalker::new(WalkerConfig::default(), &matcher)
        .walk(large.path())
        .unwrap();
    group.bench_function("render_large_project", |b| {
        b.iter(|| render(black_box(&tree), &OutputConfig::default()))
    });

    group.finish();
}

fn bench_structure_with_content(c: &mut Criterion) {
    let project = create_project(20, 20);
    let matcher = PatternMatcher::new(&ExclusionRuleSet::with_common_defaults(), Default::default()).unwrap();
    let mut group = c.benchmark_group("structure_with_content");

    for jobs in [1, 0] {
        let mut options = StructureOptions::default();
        options.output.include_content = true;
        options.jobs = jobs;
        let name = if jobs == 1 { "sequential" } else { "parallel" };
        group.bench_function(name, |b| {
            b.iter(|| generate_structure(black_box(project.path()), &matcher, &options))
        });
    }

    group.finish();
}

fn bench_numstat_parse(c: &mut Criterion) {
    let raw = NUMSTAT.repeat(250);
    c.bench_function("parse_numstat_1000_lines", |b| {
        b.iter(|| canopy::compare::parse_numstat(black_box(&raw)))
    });
}

criterion_group!(
    benches,
    bench_matcher,
    bench_walk,
    bench_structure_with_content,
    bench_numstat_parse,
);
criterion_main!(benches);
