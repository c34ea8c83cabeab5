//! Liveness oracle for statements of a function body.
//!
//! [`LivenessProvider::prepare`] builds an oracle for one function or lambda;
//! the selector keeps it for as long as it visits that function.

mod cfg;
mod solver;

pub use cfg::{BasicBlock, BlockId, ControlFlowGraph, Element};
pub use solver::Liveness;

use std::collections::HashSet;

use tracing::debug;

use crate::ast::{DeclId, NodeId, Storage, TranslationUnit};

/// Answers liveness queries within one function.
pub trait LivenessOracle {
    /// Block containing the point where control enters `stmt`.
    fn block_of(&self, stmt: NodeId) -> Option<BlockId>;

    /// Whether `decl` may be read after control reaches `stmt`.
    fn is_live_before(&self, stmt: NodeId, decl: DeclId) -> bool;

    /// Whether `decl` is live at the exit of `block`.
    fn is_live_after(&self, block: BlockId, decl: DeclId) -> bool;
}

/// Creates liveness oracles.
pub trait LivenessProvider: Send + Sync {
    /// Prepare an oracle for a function, method or lambda.
    ///
    /// Returns `None` when the function has no body.
    fn prepare(&self, tu: &TranslationUnit, function: NodeId) -> Option<Box<dyn LivenessOracle>>;
}

/// Liveness from a statement-level control-flow graph.
///
/// Tracks automatic variables and parameters owned by the function; every
/// other declaration is reported live.
#[derive(Debug, Clone, Copy, Default)]
pub struct CfgLiveness;

impl LivenessProvider for CfgLiveness {
    fn prepare(&self, tu: &TranslationUnit, function: NodeId) -> Option<Box<dyn LivenessOracle>> {
        let tracked: HashSet<DeclId> = tu
            .decls()
            .filter(|(_, d)| {
                d.kind.is_value()
                    && d.storage == Storage::Automatic
                    && tu.enclosing_function(d.node) == Some(function)
            })
            .map(|(id, _)| id)
            .collect();
        let cfg = ControlFlowGraph::build(tu, function, &tracked)?;
        let solution = Liveness::analyze(&cfg);
        debug!(
            function = tu.node(function).name.as_deref().unwrap_or("<lambda>"),
            blocks = cfg.blocks.len(),
            tracked = tracked.len(),
            "prepared liveness"
        );
        Some(Box::new(FunctionLiveness {
            cfg,
            solution,
            tracked,
        }))
    }
}

struct FunctionLiveness {
    cfg: ControlFlowGraph,
    solution: Liveness,
    tracked: HashSet<DeclId>,
}

impl LivenessOracle for FunctionLiveness {
    fn block_of(&self, stmt: NodeId) -> Option<BlockId> {
        self.cfg.entry_point(stmt).map(|(block, _)| block)
    }

    fn is_live_before(&self, stmt: NodeId, decl: DeclId) -> bool {
        if !self.tracked.contains(&decl) {
            return true;
        }
        match self.cfg.entry_point(stmt) {
            Some((block, index)) => self.solution.live_at(block, index).contains(&decl),
            None => true,
        }
    }

    fn is_live_after(&self, block: BlockId, decl: DeclId) -> bool {
        !self.tracked.contains(&decl) || self.solution.live_out(block).contains(&decl)
    }
}
