//! Core traits for language frontends.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::ast::TranslationUnit;
use crate::error::Result;

/// Holds a parsed tree-sitter tree and associated metadata.
///
/// Kept separate from [`TranslationUnit`] so that parsing (which may run in
/// parallel) and lowering are distinct steps.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// Decoded source text, kept for node text extraction. The tree was
    /// parsed from exactly these bytes.
    pub source: String,
    /// The file path (used in locations).
    pub path: PathBuf,
}

impl ParsedFile {
    /// Get the source code as a string slice.
    pub fn source_str(&self) -> &str {
        &self.source
    }

    pub fn source_bytes(&self) -> &[u8] {
        self.source.as_bytes()
    }

    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(self.source_bytes()).unwrap_or("")
    }
}

/// Decode a source file for parsing.
///
/// Invalid UTF-8 sequences (Latin-1 comments in legacy code, say) become
/// U+FFFD. Parsing the decoded text keeps tree offsets and text in step.
pub fn decode_source(path: &Path, source: &[u8]) -> String {
    match String::from_utf8_lossy(source) {
        Cow::Borrowed(text) => text.to_string(),
        Cow::Owned(text) => {
            warn!(path = %path.display(), "source is not valid UTF-8; invalid bytes replaced");
            text
        }
    }
}

/// Language frontend: parses a file and lowers it to a [`TranslationUnit`].
///
/// # Thread Safety
///
/// `tree_sitter::Parser` is not `Sync`, so implementations create a parser
/// per call.
pub trait Frontend: Send + Sync {
    /// Returns the language identifier (`"c"`, `"cpp"`).
    fn language_id(&self) -> &'static str;

    /// Returns file extensions this frontend handles (without dot).
    fn file_extensions(&self) -> &'static [&'static str];

    /// Parse a source file into a tree-sitter tree.
    ///
    /// Partial parse errors still produce a tree with ERROR nodes.
    fn parse(&self, path: &Path, source: &[u8]) -> Result<ParsedFile>;

    /// Lower a parsed file into the syntax graph with resolved names.
    fn lower(&self, parsed: &ParsedFile) -> Result<TranslationUnit>;

    /// Check if this frontend handles the given file extension.
    fn handles_extension(&self, ext: &str) -> bool {
        self.file_extensions().contains(&ext)
    }
}
