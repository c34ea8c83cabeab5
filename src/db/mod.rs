//! Fact databases.
//!
//! Every database accumulates the records of one fact kind during a run and
//! serializes them as a single JSON array. Only the snippet database
//! deduplicates; all others are append-only and keep traversal order.

mod snippets;

pub use snippets::SnippetDatabase;

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::analysis::{FunctionFact, InsertionPointFact, LoopFact, StatementFact};
use crate::error::{IndexError, Result};

/// A serializable collection of fact records.
pub trait FactDatabase {
    /// Fixed output file name, e.g. `statements.json`.
    fn file_name(&self) -> &'static str;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries as a JSON array.
    fn to_json(&self) -> Result<serde_json::Value>;

    /// Pretty-printed JSON with a trailing newline.
    fn to_pretty(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(&self.to_json()?)?;
        text.push('\n');
        Ok(text)
    }

    /// Print the JSON array to standard output.
    fn dump(&self) -> Result<()> {
        let text = self.to_pretty()?;
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        out.write_all(text.as_bytes())
            .and_then(|_| out.flush())
            .map_err(|source| IndexError::Output {
                path: "<stdout>".into(),
                source,
            })
    }

    /// Write the JSON array to `path`, creating parent directories.
    fn to_file(&self, path: &Path) -> Result<()> {
        let text = self.to_pretty()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| IndexError::Output {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, text).map_err(|source| IndexError::Output {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// A record stored in an append-only [`Database`].
pub trait Record: Serialize {
    const FILE_NAME: &'static str;
}

impl Record for StatementFact {
    const FILE_NAME: &'static str = "statements.json";
}

impl Record for LoopFact {
    const FILE_NAME: &'static str = "loops.json";
}

impl Record for FunctionFact {
    const FILE_NAME: &'static str = "functions.json";
}

impl Record for InsertionPointFact {
    const FILE_NAME: &'static str = "insertion-points.json";
}

/// Append-only database.
#[derive(Debug, Clone)]
pub struct Database<T> {
    entries: Vec<T>,
}

pub type StatementDatabase = Database<StatementFact>;
pub type LoopDatabase = Database<LoopFact>;
pub type FunctionDatabase = Database<FunctionFact>;
pub type InsertionPointDatabase = Database<InsertionPointFact>;

impl<T> Default for Database<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Record> Database<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: T) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }
}

impl<T: Record> FactDatabase for Database<T> {
    fn file_name(&self) -> &'static str {
        T::FILE_NAME
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(&self.entries)?)
    }
}
