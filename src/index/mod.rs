//! Indexing pipelines.
//!
//! Each pipeline walks the loaded translation units in input order and fills
//! one fact database. A file reached through several compile commands is
//! indexed once per pipeline.

pub mod functions;
pub mod insertions;
pub mod loops;
mod runner;
pub mod selector;
pub mod snippets;
pub mod statements;

pub use runner::{Pipeline, PipelineSummary, Runner, Visits};
pub use selector::{is_top_level, Selected, StatementSelector};
