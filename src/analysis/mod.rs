//! Per-statement analyses over the lowered syntax graph.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐     ┌─────────────────┐
//! │ Source Files    │────▶│ Frontends    │────▶│ TranslationUnit │
//! └─────────────────┘     │ (C, C++)     │     │ (resolved graph)│
//!                         └──────────────┘     └─────────────────┘
//!                                                      │
//!                                                      ▼
//!                         ┌──────────────┐     ┌─────────────────┐
//!                         │ Fact records │◀────│ Analyzers       │
//!                         │ (facts.rs)   │     │ (read/write,    │
//!                         └──────────────┘     │  scope, canon.) │
//!                                              └─────────────────┘
//! ```
//!
//! # Adding a New Language
//!
//! 1. Create a new module in `src/analysis/languages/`
//! 2. Implement the `Frontend` trait, lowering into the shared graph
//! 3. Register the frontend in `languages/mod.rs`

mod canonical;
mod context;
mod facts;
mod languages;
mod read_write;
mod syntax_scope;
mod traits;
mod visibility;

pub use canonical::canonicalize;
pub use context::{AnalysisContext, LoadedUnit};
pub use facts::{
    FunctionFact, InsertionPointFact, LoopFact, LoopKind, SnippetFact, SnippetKind, StatementFact,
};
pub use languages::{
    get_frontend, get_frontend_by_id, register_frontends, CFrontend, CppFrontend,
};
pub use read_write::{analyze_accesses, Accesses};
pub use syntax_scope::{analyze_syntax_scope, SyntaxScope};
pub use traits::{decode_source, Frontend, ParsedFile};
pub use visibility::{project_liveness, visible_decls, LiveSets};
