//! Compilation database loading and input collection.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::analysis::get_frontend;
use crate::error::{IndexError, Result};

pub const DATABASE_FILE_NAME: &str = "compile_commands.json";

/// One `compile_commands.json` entry as written by build systems.
#[derive(Debug, Deserialize)]
struct RawCommand {
    directory: PathBuf,
    file: PathBuf,
    #[serde(default)]
    arguments: Option<Vec<String>>,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    output: Option<String>,
}

/// A translation unit to index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileCommand {
    pub directory: PathBuf,
    /// Source file, absolute when the database entry was.
    pub file: PathBuf,
    pub arguments: Vec<String>,
    pub output: Option<String>,
}

impl CompileCommand {
    /// Entry for a file given without compile flags.
    pub fn plain(file: PathBuf) -> Self {
        let directory = file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            directory,
            file,
            arguments: Vec::new(),
            output: None,
        }
    }

    /// Language forced with `-x <lang>` or `-x<lang>`, if any.
    pub fn language(&self) -> Option<&str> {
        let mut args = self.arguments.iter();
        let mut language = None;
        while let Some(arg) = args.next() {
            if arg == "-x" {
                language = args.next().map(String::as_str);
            } else if let Some(lang) = arg.strip_prefix("-x") {
                language = Some(lang);
            }
        }
        language
    }
}

/// Ordered list of translation units.
#[derive(Debug, Clone, Default)]
pub struct CompilationDatabase {
    path: Option<PathBuf>,
    commands: Vec<CompileCommand>,
}

impl CompilationDatabase {
    /// Load the database at `build_path`, which names either the JSON file
    /// or the directory containing `compile_commands.json`.
    pub fn load(build_path: &Path) -> Result<Self> {
        let path = if build_path.is_dir() {
            build_path.join(DATABASE_FILE_NAME)
        } else {
            build_path.to_path_buf()
        };
        if !path.is_file() {
            return Err(IndexError::MissingInput(path));
        }
        let content = fs::read_to_string(&path).map_err(|source| IndexError::Io {
            path: path.clone(),
            source,
        })?;
        Self::parse(&content, &path)
    }

    /// Parse database JSON read from `path`.
    pub fn parse(json: &str, path: &Path) -> Result<Self> {
        let raw: Vec<RawCommand> =
            serde_json::from_str(json).map_err(|e| IndexError::CompilationDatabase {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        let mut commands = Vec::with_capacity(raw.len());
        for entry in raw {
            let arguments = match (entry.arguments, entry.command) {
                (Some(arguments), _) => arguments,
                (None, Some(command)) => {
                    shell_words::split(&command).map_err(|e| IndexError::CompilationDatabase {
                        path: path.to_path_buf(),
                        message: format!("cannot split command for {}: {}", entry.file.display(), e),
                    })?
                }
                (None, None) => {
                    return Err(IndexError::CompilationDatabase {
                        path: path.to_path_buf(),
                        message: format!(
                            "entry for {} has neither `arguments` nor `command`",
                            entry.file.display()
                        ),
                    })
                }
            };
            commands.push(CompileCommand {
                file: entry.directory.join(&entry.file),
                directory: entry.directory,
                arguments,
                output: entry.output,
            });
        }
        debug!(path = %path.display(), entries = commands.len(), "loaded compilation database");
        Ok(Self {
            path: Some(path.to_path_buf()),
            commands,
        })
    }

    /// Database of plain entries for explicitly listed files.
    pub fn fixed(files: Vec<PathBuf>) -> Self {
        Self {
            path: None,
            commands: files.into_iter().map(CompileCommand::plain).collect(),
        }
    }

    /// Path of the loaded database file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Directory containing the database file.
    pub fn directory(&self) -> Option<&Path> {
        self.path.as_deref().and_then(Path::parent)
    }

    pub fn commands(&self) -> &[CompileCommand] {
        &self.commands
    }

    /// Entries for `files`, in the order given. Files the database does not
    /// know get a plain entry.
    pub fn select(&self, files: &[PathBuf]) -> Vec<CompileCommand> {
        let mut selected = Vec::new();
        for file in files {
            let wanted = canonical(file);
            let before = selected.len();
            selected.extend(
                self.commands
                    .iter()
                    .filter(|c| canonical(&c.file) == wanted)
                    .cloned(),
            );
            if selected.len() == before {
                warn!(file = %file.display(), "no compile command, indexing without flags");
                selected.push(CompileCommand::plain(file.clone()));
            }
        }
        selected
    }
}

/// Expand positional inputs: files are kept, directories are walked for
/// C and C++ sources (hidden directories skipped). Missing inputs are fatal.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.exists() {
            return Err(IndexError::MissingInput(path.clone()));
        }
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .and_then(get_frontend)
                    .is_some()
            })
            .collect();
        found.sort();
        files.extend(found);
    }
    Ok(files)
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

/// Canonical form of a path, or the path itself when it cannot be resolved.
pub fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
