//! stmt-facts - per-statement fact extraction for C and C++.
//!
//! stmt-facts reads a compilation database, parses every project source file
//! and emits JSON fact files that program-transformation tools (mutation
//! testing, automated repair) consume: the top-level statements of each
//! function with their reads, writes, declarations and liveness, reusable
//! snippets, loop bodies, function definitions and insertion points.
//!
//! # Architecture
//!
//! - `compdb`: compilation database loading and input selection
//! - `analysis`: tree-sitter frontends lowering into `ast`, plus the
//!   per-statement analyses (read/write, syntax scope, visibility)
//! - `liveness`: control-flow graphs and backward liveness
//! - `index`: the five extraction pipelines and their runner
//! - `db`: fact databases and their JSON output
//! - `report`: human-readable run summary

pub mod analysis;
pub mod ast;
pub mod cli;
pub mod compdb;
pub mod config;
pub mod db;
pub mod error;
pub mod index;
pub mod liveness;
pub mod report;

pub use analysis::{
    register_frontends, AnalysisContext, FunctionFact, InsertionPointFact, LoadedUnit, LoopFact,
    SnippetFact, StatementFact,
};
pub use compdb::{CompilationDatabase, CompileCommand};
pub use config::Config;
pub use db::FactDatabase;
pub use error::{IndexError, Result};
pub use index::{Pipeline, PipelineSummary, Runner};

/// Initialize all subsystems.
///
/// Call this once at startup.
pub fn init() {
    register_frontends();
}
