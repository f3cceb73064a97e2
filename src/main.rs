//! CLI entry point for canopy

use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use canopy::output::content_section;
use canopy::{
    BranchComparison, CompareOptions, Error, ExclusionRule, ExclusionTarget, GitCommandSource,
    OutputConfig, OutputFormat, ReportConfig, Result, Settings, StructureOptions, TreeFormatter,
    build_tree, generate_comparison_output, render, to_json,
};

/// Color output mode
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum ColorMode {
    /// Auto-detect based on terminal and environment
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Determine whether to use color output based on mode and environment.
fn should_use_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            // https://no-color.org/
            if std::env::var_os("NO_COLOR").is_some() {
                return false;
            }
            if std::env::var_os("FORCE_COLOR").is_some() {
                return true;
            }
            if std::env::var("TERM").map(|t| t == "dumb").unwrap_or(false) {
                return false;
            }
            io::stdout().is_terminal()
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "canopy")]
#[command(about = "Project structure snapshots and branch comparisons with layered exclusions")]
#[command(version)]
struct Cli {
    /// Emit debug logging on stderr (overrides RUST_LOG)
    #[arg(long, global = true)]
    debug: bool,

    /// Settings file (default: canopy.json in the project root)
    #[arg(long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the file/folder structure of a directory
    Structure(StructureArgs),
    /// Compare two branches of a git repository
    Compare(CompareArgs),
    /// Edit the exclusion rules in the settings file
    Exclude {
        #[command(subcommand)]
        action: ExcludeAction,
    },
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output in Markdown format
    #[arg(long = "markdown", short = 'm', conflicts_with = "json")]
    markdown: bool,

    /// Output in JSON format
    #[arg(long = "json", conflicts_with = "markdown")]
    json: bool,

    /// Write output to FILE instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Control color output: auto, always, never
    #[arg(long = "color", value_name = "WHEN", default_value = "auto")]
    color: ColorMode,
}

impl OutputArgs {
    fn format(&self) -> OutputFormat {
        if self.markdown {
            OutputFormat::Markdown
        } else {
            OutputFormat::Text
        }
    }
}

#[derive(Args, Debug)]
struct StructureArgs {
    /// Directory to display
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Descend only N levels deep
    #[arg(short = 'L', long = "level")]
    level: Option<usize>,

    /// List directories only
    #[arg(short = 'd', long = "dirs-only")]
    dirs_only: bool,

    /// Exclude entries matching pattern for this run (can be used multiple times)
    #[arg(short = 'I', long = "ignore")]
    ignore: Vec<String>,

    /// Append the contents of every included file
    #[arg(short = 'c', long = "content")]
    content: bool,

    /// Show at most N lines of each file
    #[arg(long = "content-lines", value_name = "N", requires = "content")]
    content_lines: Option<usize>,

    /// Maximum bytes of text kept per file. Use suffixes: K, M, G (e.g., 5M)
    #[arg(long = "max-content-size", value_name = "SIZE", value_parser = parse_file_size)]
    max_content_size: Option<u64>,

    /// Show file sizes next to filenames
    #[arg(short = 's', long = "size")]
    size: bool,

    /// Skip files ignored by .gitignore
    #[arg(long = "gitignore")]
    gitignore: bool,

    /// Skip symlinks instead of following them
    #[arg(long = "no-follow")]
    no_follow: bool,

    /// Let wildcards match names starting with a dot
    #[arg(long = "dot-globs")]
    dot_globs: bool,

    /// Number of parallel workers for reading contents
    /// (0 = auto-detect, 1 = sequential, N = use N workers)
    #[arg(short = 'j', long = "jobs", default_value = "0")]
    jobs: usize,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct CompareArgs {
    /// Branch with the changes
    source: String,

    /// Branch to compare against
    target: String,

    /// Repository path
    #[arg(long = "repo", default_value = ".")]
    repo: PathBuf,

    /// Include the patch text
    #[arg(long = "diff")]
    diff: bool,

    /// Show the changed files as a tree instead of a report
    #[arg(long = "tree", conflicts_with = "json")]
    tree: bool,

    /// Only compare paths below this prefix
    #[arg(long = "path", value_name = "PREFIX")]
    path_filter: Option<String>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Subcommand, Debug)]
enum ExcludeAction {
    /// Add a rule, e.g. `canopy exclude add folder dist`
    Add {
        target: ExclusionTarget,
        value: String,
    },
    /// Remove a rule
    Remove {
        target: ExclusionTarget,
        value: String,
    },
    /// List all rules
    List,
}

/// Parse a file size string like "5M", "100K", "1G" into bytes.
/// Supports suffixes: K/KB (1024), M/MB (1024^2), G/GB (1024^3)
/// Without suffix, interprets as bytes.
fn parse_file_size(s: &str) -> std::result::Result<u64, String> {
    let s = s.trim().to_uppercase();
    let units: [(&str, u64); 6] = [
        ("GB", 1 << 30),
        ("G", 1 << 30),
        ("MB", 1 << 20),
        ("M", 1 << 20),
        ("KB", 1 << 10),
        ("K", 1 << 10),
    ];
    let (num_str, multiplier) = units
        .iter()
        .find_map(|(suffix, mult)| s.strip_suffix(suffix).map(|n| (n, *mult)))
        .unwrap_or((s.as_str(), 1));

    let num: u64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("invalid number: {}", num_str))?;

    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size too large: {}", s))
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("canopy=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("canopy: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings_path = |root: &Path| {
        cli.config
            .clone()
            .unwrap_or_else(|| Settings::default_path(root))
    };

    match &cli.command {
        Command::Structure(args) => {
            let path = settings_path(&args.path);
            let settings = Settings::load(&path)?;
            init_logging(cli.debug || settings.debug);
            debug!(settings = %path.display(), "loaded settings");
            run_structure(args, settings)
        }
        Command::Compare(args) => {
            let path = settings_path(&args.repo);
            let settings = Settings::load(&path)?;
            init_logging(cli.debug || settings.debug);
            debug!(settings = %path.display(), "loaded settings");
            run_compare(args, &settings)
        }
        Command::Exclude { action } => {
            let path = settings_path(Path::new("."));
            let settings = Settings::load(&path)?;
            init_logging(cli.debug || settings.debug);
            run_exclude(action, settings, &path)
        }
    }
}

fn run_structure(args: &StructureArgs, mut settings: Settings) -> Result<()> {
    for pattern in &args.ignore {
        let rule = ExclusionRule::new(ExclusionTarget::Pattern, pattern.as_str());
        settings.exclude = settings.exclude.add_rule(&rule)?;
    }
    if let Some(max) = args.max_content_size {
        settings.max_content_size = max;
    }
    if args.gitignore {
        settings.respect_gitignore = true;
    }
    if args.no_follow {
        settings.follow_symlinks = false;
    }
    if args.dot_globs {
        settings.dot_inclusive_globs = true;
    }

    let matcher = settings.matcher()?;
    let mut options = StructureOptions::from_settings(&settings);
    options.walker.max_depth = args.level;
    options.walker.dirs_only = args.dirs_only;
    options.walker.show_size = args.size;
    options.jobs = args.jobs;
    options.output = OutputConfig {
        format: args.output.format(),
        include_content: args.content,
        max_depth: args.level,
        content_line_limit: args.content_lines.or(settings.content_line_limit),
        show_size: args.size,
        use_color: should_use_color(args.output.color),
    };

    let tree = build_tree(&args.path, &matcher, &options)?;

    if args.output.json {
        let json = to_json(&tree).map_err(|e| Error::io(Path::new("<json>"), e))?;
        return emit(args.output.output.as_deref(), &format!("{}\n", json));
    }

    let colored = args.output.output.is_none()
        && options.output.format == OutputFormat::Text
        && options.output.use_color;
    if colored {
        TreeFormatter::new(options.output.clone())
            .print(&tree)
            .map_err(stdout_error)?;
        if options.output.include_content {
            emit(None, &content_section(&tree, &options.output))?;
        }
        return Ok(());
    }

    emit(args.output.output.as_deref(), &render(&tree, &options.output))
}

fn run_compare(args: &CompareArgs, settings: &Settings) -> Result<()> {
    let matcher = settings.matcher()?;
    let source = GitCommandSource::open(&args.repo)?;
    let options = CompareOptions {
        include_diff: args.diff,
        path_filter: args.path_filter.clone(),
    };
    let engine = BranchComparison::new(&source, &matcher, options);
    let format = args.output.format();

    let text = if args.tree {
        let config = OutputConfig {
            format,
            use_color: false,
            ..OutputConfig::default()
        };
        engine.generate_structure_comparison(&args.source, &args.target, &config)?
    } else {
        let result = engine.compare_branches(&args.source, &args.target)?;
        if args.output.json {
            let json = serde_json::to_string_pretty(&result)
                .map_err(|e| Error::io(Path::new("<json>"), io::Error::other(e)))?;
            format!("{}\n", json)
        } else {
            let config = ReportConfig {
                format,
                include_diff: args.diff,
            };
            generate_comparison_output(&result, &config)
        }
    };
    emit(args.output.output.as_deref(), &text)
}

fn run_exclude(action: &ExcludeAction, settings: Settings, path: &Path) -> Result<()> {
    match action {
        ExcludeAction::Add { target, value } => {
            let rule = ExclusionRule::new(*target, value.as_str());
            let updated = settings.exclude.add_rule(&rule)?;
            if updated == settings.exclude {
                println!("{} '{}' is already excluded", target, value);
                return Ok(());
            }
            Settings {
                exclude: updated,
                ..settings
            }
            .save(path)?;
            println!("Added {} '{}'", target, value);
        }
        ExcludeAction::Remove { target, value } => {
            let rule = ExclusionRule::new(*target, value.as_str());
            match settings.exclude.remove_rule(&rule) {
                Some(updated) => {
                    Settings {
                        exclude: updated,
                        ..settings
                    }
                    .save(path)?;
                    println!("Removed {} '{}'", target, value);
                }
                None => println!("{} '{}' was not excluded", target, value),
            }
        }
        ExcludeAction::List => {
            let rules = settings.exclude.rules();
            if rules.is_empty() {
                println!("No exclusion rules");
            }
            for rule in rules {
                println!("{}\t{}", rule.target, rule.value);
            }
        }
    }
    Ok(())
}

fn stdout_error(e: io::Error) -> Error {
    Error::io(Path::new("<stdout>"), e)
}

/// Write `text` to `path`, or to stdout when no path is given.
fn emit(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => fs::write(path, text).map_err(|e| Error::io(path, e)),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes()).map_err(stdout_error)?;
            stdout.flush().map_err(stdout_error)
        }
    }
}
