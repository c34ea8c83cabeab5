//! Error types.
//!
//! [`IndexError`] aborts a run; [`SkipReason`] only drops one statement.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors that stop an indexing run before any output is written.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("input not found: {}", .0.display())]
    MissingInput(PathBuf),
    #[error("no input files and no compilation database")]
    NoInputs,
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid compilation database {}: {message}", path.display())]
    CompilationDatabase { path: PathBuf, message: String },
    #[error("invalid configuration {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error("no frontend handles {}", .0.display())]
    UnsupportedLanguage(PathBuf),
    #[error("failed to load grammar: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),
    #[error("invalid query: {0}")]
    Query(#[from] tree_sitter::QueryError),
    #[error("parser produced no tree for {}", .0.display())]
    Parse(PathBuf),
    #[error("failed to write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize facts: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// Recoverable per-statement conditions; logged and skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    #[error("statement has no valid source range")]
    InvalidLocation,
    #[error("statement is outside the project")]
    ExternalFile,
    #[error("no liveness scope for statement")]
    MissingLiveness,
    #[error("cannot resolve member expression `{0}`")]
    UnresolvedMember(String),
}
