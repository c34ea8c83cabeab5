//! Command-line interface for stmt-facts.

use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::analysis::AnalysisContext;
use crate::compdb::{self, CompilationDatabase, DATABASE_FILE_NAME};
use crate::config::Config;
use crate::error::IndexError;
use crate::index::{Pipeline, Runner};
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 2;

/// Per-statement fact extraction for C and C++.
///
/// Reads a compilation database (or explicit source files), indexes the
/// top-level statements, snippets, loops, functions and insertion points of
/// every project file, and writes one JSON fact file per kind.
#[derive(Parser)]
#[command(name = "stmt-facts")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index function and method definitions
    Functions(IndexArgs),
    /// Index while, for, do and range-for loops
    Loops(IndexArgs),
    /// Index insertion points after top-level statements
    Insertions(IndexArgs),
    /// Index guarded returns, guarded breaks and zero-argument calls
    Snippets(IndexArgs),
    /// Index top-level statements with their read/write and liveness facts
    Statements(IndexArgs),
    /// Run every pipeline
    All(IndexArgs),
}

impl Commands {
    pub fn args(&self) -> &IndexArgs {
        match self {
            Commands::Functions(args)
            | Commands::Loops(args)
            | Commands::Insertions(args)
            | Commands::Snippets(args)
            | Commands::Statements(args)
            | Commands::All(args) => args,
        }
    }

    /// Pipelines this command runs.
    pub fn pipelines(&self) -> &'static [Pipeline] {
        match self {
            Commands::Functions(_) => &[Pipeline::Functions],
            Commands::Loops(_) => &[Pipeline::Loops],
            Commands::Insertions(_) => &[Pipeline::Insertions],
            Commands::Snippets(_) => &[Pipeline::Snippets],
            Commands::Statements(_) => &[Pipeline::Statements],
            Commands::All(_) => &Pipeline::ALL,
        }
    }
}

/// Arguments shared by every indexing command.
#[derive(Parser, Debug, Clone, Default)]
pub struct IndexArgs {
    /// Source files or directories (default: every database entry)
    pub files: Vec<PathBuf>,

    /// Compilation database file, or the build directory containing it
    #[arg(short = 'p', long = "build-path")]
    pub build_path: Option<PathBuf>,

    /// Path to configuration YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory receiving the fact files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Print the JSON arrays instead of writing files
    #[arg(long)]
    pub stdout: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Log level for a `-v` count.
pub fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Run pipelines from the current working directory.
pub fn run_index(pipelines: &[Pipeline], args: &IndexArgs) -> anyhow::Result<i32> {
    let cwd = std::env::current_dir()?;
    run_index_in(pipelines, args, &cwd)
}

/// Run pipelines with relative paths resolved against `cwd`.
///
/// Every input is loaded before any fact file is written, so a failing run
/// leaves no partial output.
pub fn run_index_in(pipelines: &[Pipeline], args: &IndexArgs, cwd: &Path) -> anyhow::Result<i32> {
    let resolve = |p: &Path| cwd.join(p);

    let config = Config::load(args.config.as_deref().map(resolve).as_deref(), cwd)?;
    let files: Vec<PathBuf> = args.files.iter().map(|f| resolve(f.as_path())).collect();
    let files = compdb::collect_inputs(&files)?;

    let database = match &args.build_path {
        Some(build_path) => Some(CompilationDatabase::load(&resolve(build_path.as_path()))?),
        None if files.is_empty() => {
            let discovered = cwd.join(DATABASE_FILE_NAME);
            if !discovered.is_file() {
                return Err(IndexError::NoInputs.into());
            }
            Some(CompilationDatabase::load(&discovered)?)
        }
        None => None,
    };
    let commands = match &database {
        Some(db) if files.is_empty() => db.commands().to_vec(),
        Some(db) => db.select(&files),
        None => CompilationDatabase::fixed(files).commands().to_vec(),
    };
    if commands.is_empty() {
        warn!("nothing to index");
    }

    let project_root = config
        .project_root
        .clone()
        .unwrap_or_else(|| cwd.to_path_buf());
    let context = AnalysisContext::new(&project_root, config.excluded_matcher()?);
    let units = context.load_all(&commands)?;
    info!(
        commands = commands.len(),
        files = context.cached_units(),
        "loaded translation units"
    );

    let output_dir = args
        .output_dir
        .as_deref()
        .map(resolve)
        .or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| cwd.to_path_buf());

    let runner = Runner::new().strict_statements(config.strict_statements);
    let mut summaries = Vec::new();
    for pipeline in pipelines {
        let (db, mut summary) = runner.run(*pipeline, &units);
        if args.stdout {
            db.dump()?;
        } else {
            let path = output_dir.join(db.file_name());
            db.to_file(&path)?;
            summary.output = Some(path);
        }
        summaries.push(summary);
    }

    if !args.stdout {
        report::write_pretty(
            &context.project_root().to_string_lossy(),
            context.cached_units(),
            &summaries,
        );
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from([
            "stmt-facts",
            "statements",
            "src/a.c",
            "-p",
            "build",
            "-o",
            "facts",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.command.pipelines(), &[Pipeline::Statements]);
        let args = cli.command.args();
        assert_eq!(args.files, vec![PathBuf::from("src/a.c")]);
        assert_eq!(args.build_path, Some(PathBuf::from("build")));
        assert_eq!(args.output_dir, Some(PathBuf::from("facts")));
        assert_eq!(args.verbose, 2);
        assert!(!args.stdout);

        let cli = Cli::try_parse_from(["stmt-facts", "all", "--stdout"]).unwrap();
        assert_eq!(cli.command.pipelines().len(), 5);
        assert!(cli.command.args().stdout);
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(Cli::try_parse_from(["stmt-facts", "mutants"]).is_err());
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(log_level(0), "warn");
        assert_eq!(log_level(1), "info");
        assert_eq!(log_level(2), "debug");
        assert_eq!(log_level(7), "trace");
    }
}
