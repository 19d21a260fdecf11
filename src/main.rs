use std::io::Read;
use std::path::{Path, PathBuf};

use blamecov_blame::owners::{analyze_blame, strategy_for, FileOwners};
use blamecov_core::{BlamecovConfig, OutputFormat, SortOrder};
use blamecov_coverage::module::CoverageModule;
use blamecov_difflens::parser::{parse_diff, split_file_diffs};
use clap::{CommandFactory, Parser, Subcommand};
use miette::{Context, IntoDiagnostic, Result};

mod git;

#[derive(Parser)]
#[command(
    name = "blamecov",
    version,
    about = "Find untested changes and who owns them",
    long_about = "blamecov correlates git diffs, HTML coverage reports and blame traces.\n\n\
                   Examples:\n  \
                     blamecov diff-cover . HEAD~1..HEAD     Coverage of lines changed by the last commit\n  \
                     git diff main | blamecov diff-cover . --file -   Same, for a diff on stdin\n  \
                     blamecov owners src/                   Most recent committers of every tracked file\n  \
                     blamecov owners -s size -d lib.py      Authors of lib.py by line count, with details\n  \
                     blamecov owners -s cover cover/        Owners of lines the test suite missed"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .blamecov.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Plain-text reports (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Show coverage of the lines a diff adds or changes
    #[command(long_about = "Show coverage of the lines a diff adds or changes.\n\n\
        Every changed file (dot-files excluded) is diffed, and the added lines are\n\
        matched with the file's HTML coverage report under the report directory.\n\
        With --file the diff is read from a file, or stdin for '-', instead of git.\n\n\
        Examples:\n  blamecov diff-cover . HEAD~3..HEAD\n  blamecov diff-cover . --file changes.patch")]
    DiffCover {
        /// Top of the git repository
        repo_dir: PathBuf,

        /// Revisions to compare (e.g. HEAD~1..HEAD)
        #[arg(required_unless_present = "file")]
        versions: Option<String>,

        /// Read the diff from a file ('-' for stdin) instead of running git
        #[arg(long)]
        file: Option<PathBuf>,

        /// Coverage report directory (default: <repo-dir>/cover)
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },
    /// Show who owns a file, a tree of files, or the uncovered lines
    #[command(long_about = "Show who owns a file, a tree of files, or the uncovered lines.\n\n\
        Runs git blame on every tracked file below the path and lists the authors,\n\
        newest commit first (date) or most lines first (size). With --sort cover the\n\
        path is a coverage report directory and only missed or partial lines are blamed.\n\n\
        Examples:\n  blamecov owners src/\n  blamecov owners -s size -d -m 0 lib.py\n  blamecov owners -s cover -d cover/")]
    Owners {
        /// File or directory to examine
        #[arg(value_name = "FILE-OR-DIR")]
        root: PathBuf,

        /// Sort order: date, size or cover (default from config)
        #[arg(long, short)]
        sort: Option<SortOrder>,

        /// Show one line per commit in addition to the summary
        #[arg(long, short)]
        details: bool,

        /// Maximum number of commits to show, 0 for all (default from config)
        #[arg(long, short)]
        max: Option<usize>,
    },
    /// Create a default .blamecov.toml configuration file
    #[command(long_about = "Create a default .blamecov.toml configuration file.\n\n\
        Generates a commented template with all available options.\n\
        Fails if .blamecov.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

const DEFAULT_CONFIG: &str = r#"# blamecov configuration

[coverage]
# Coverage HTML directory, relative to the repository root
# report_dir = "cover"

[diff]
# Context lines requested from git diff (-U<n>)
# context_lines = 3
# Ignore whitespace-only changes (git diff -w)
# ignore_whitespace = true

[owners]
# Sort order: "date", "size" or "cover"
# sort = "date"
# Maximum commits shown per file, 0 for all
# max = 5
# details = false
# verbose = false
"#;

fn read_diff_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .into_diagnostic()
            .wrap_err("reading stdin")?;
        return Ok(input);
    }
    std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err(format!("reading {}", path.display()))
}

fn diff_cover(
    config: &BlamecovConfig,
    repo_dir: &Path,
    versions: Option<&str>,
    file: Option<&Path>,
    report_dir: Option<&Path>,
) -> Result<Vec<CoverageModule>> {
    let repo_dir = std::path::absolute(repo_dir).into_diagnostic()?;
    if !repo_dir.is_dir() {
        miette::bail!(miette::miette!(
            help = "Pass the top of the git repository as <REPO_DIR>",
            "{} is not a directory",
            repo_dir.display()
        ));
    }
    let report_dir = match report_dir {
        Some(dir) => dir.to_path_buf(),
        None => repo_dir.join(&config.coverage.report_dir),
    };
    if !report_dir.is_dir() {
        miette::bail!(miette::miette!(
            help = "Generate an HTML coverage report first, or set [coverage] report_dir",
            "Missing coverage report directory {}",
            report_dir.display()
        ));
    }

    let diffs = match (file, versions) {
        (Some(path), _) => split_file_diffs(&read_diff_input(path)?),
        (None, Some(versions)) => git::changed_files(&repo_dir, versions)?
            .iter()
            .map(|name| git::file_diff(&repo_dir, versions, name, &config.diff))
            .collect::<Result<Vec<_>>>()?,
        (None, None) => miette::bail!("Either <VERSIONS> or --file is required"),
    };

    let mut modules = Vec::new();
    for text in &diffs {
        let diff = match parse_diff(text) {
            Ok(diff) => diff,
            Err(e) => {
                tracing::warn!("skipping diff section: {e}");
                continue;
            }
        };
        if diff.path.is_empty() {
            tracing::debug!("skipping diff without file header");
            continue;
        }
        tracing::info!(%diff, "correlating coverage");
        let mut module = CoverageModule::from(diff);
        if let Err(e) = module.load_report(&report_dir) {
            tracing::warn!(file = %module.filename, "unable to read coverage report: {e}");
            continue;
        }
        modules.push(module);
    }
    Ok(modules)
}

fn owners(
    root: &Path,
    order: SortOrder,
    max: usize,
    verbose: bool,
) -> Result<Vec<FileOwners>> {
    let strategy = strategy_for(order);
    let targets = strategy.collect_modules(root)?;

    let mut reports = Vec::new();
    for target in &targets {
        let blame = match git::blame(&target.path, &target.ranges) {
            Ok(blame) => blame,
            Err(e) => {
                tracing::warn!(file = %target.path.display(), "unable to collect blame: {e}");
                continue;
            }
        };
        match analyze_blame(strategy.as_ref(), target, &blame, max, verbose) {
            Ok(report) => reports.push(report),
            Err(e) => {
                tracing::warn!(file = %target.path.display(), "skipping file: {e}");
            }
        }
    }
    Ok(reports)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG.max(cli.log_level)
    } else {
        cli.log_level
    };
    blamecov_core::telemetry::init_tracing(cli.log_json, level);

    let config = match &cli.config {
        Some(path) => BlamecovConfig::from_file(path)?,
        None => {
            let default_path = Path::new(".blamecov.toml");
            if default_path.exists() {
                BlamecovConfig::from_file(default_path)?
            } else {
                BlamecovConfig::default()
            }
        }
    };

    match cli.command {
        Command::DiffCover {
            ref repo_dir,
            ref versions,
            ref file,
            ref report_dir,
        } => {
            let modules = diff_cover(
                &config,
                repo_dir,
                versions.as_deref(),
                file.as_deref(),
                report_dir.as_deref(),
            )?;

            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&modules).into_diagnostic()?
                    );
                }
                OutputFormat::Markdown => {
                    println!("## Diff coverage\n");
                    for module in &modules {
                        println!("{}", module.to_markdown());
                    }
                }
                OutputFormat::Text => {
                    for module in &modules {
                        println!("{}", module.report());
                    }
                }
            }
        }
        Command::Owners {
            ref root,
            sort,
            details,
            max,
        } => {
            let order = sort.unwrap_or(config.owners.sort);
            let max = max.unwrap_or(config.owners.max);
            let details = details || config.owners.details;
            let verbose = cli.verbose || config.owners.verbose;
            let reports = owners(root, order, max, verbose)?;

            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&reports).into_diagnostic()?
                    );
                }
                OutputFormat::Markdown => {
                    println!("## Owners (by {order})\n");
                    for report in &reports {
                        println!("{}", report.to_markdown(details));
                    }
                }
                OutputFormat::Text => {
                    for report in &reports {
                        print!("{}", report.report(details));
                    }
                }
            }
        }
        Command::Init => {
            let path = Path::new(".blamecov.toml");
            if path.exists() {
                miette::bail!(".blamecov.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .blamecov.toml with default configuration");
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "blamecov", &mut std::io::stdout());
        }
    }

    Ok(())
}
