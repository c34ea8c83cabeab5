//! Backward liveness over a [`ControlFlowGraph`].
//!
//! Standard iterative data flow:
//!
//! ```text
//! live_out[B] = ⋃ live_in[S] for all successors S
//! live_in[B]  = (live_out[B] - def[B]) ∪ use[B]
//! ```
//!
//! iterated to a fixed point, then refined to per-element program points.

use std::collections::HashSet;

use super::cfg::{BasicBlock, BlockId, ControlFlowGraph};
use crate::ast::DeclId;

#[derive(Debug, Clone)]
pub struct Liveness {
    pub live_in: Vec<HashSet<DeclId>>,
    pub live_out: Vec<HashSet<DeclId>>,
    /// `points[b][i]`: live set before element `i` of block `b`; the last
    /// entry equals `live_out[b]`.
    points: Vec<Vec<HashSet<DeclId>>>,
}

impl Liveness {
    pub fn analyze(cfg: &ControlFlowGraph) -> Self {
        let n = cfg.blocks.len();
        let use_def: Vec<_> = cfg.blocks.iter().map(compute_use_def).collect();
        let mut live_in: Vec<HashSet<DeclId>> = vec![HashSet::new(); n];
        let mut live_out: Vec<HashSet<DeclId>> = vec![HashSet::new(); n];

        let mut changed = true;
        while changed {
            changed = false;
            for block in cfg.blocks.iter().rev() {
                let b = block.id.0;
                let mut new_live_out = HashSet::new();
                for successor in &block.successors {
                    new_live_out.extend(live_in[successor.0].iter().copied());
                }

                let (use_set, def_set) = &use_def[b];
                let mut new_live_in = use_set.clone();
                for var in &new_live_out {
                    if !def_set.contains(var) {
                        new_live_in.insert(*var);
                    }
                }

                if new_live_in != live_in[b] || new_live_out != live_out[b] {
                    changed = true;
                    live_in[b] = new_live_in;
                    live_out[b] = new_live_out;
                }
            }
        }

        let points = cfg
            .blocks
            .iter()
            .map(|block| block_points(block, &live_out[block.id.0]))
            .collect();

        Self {
            live_in,
            live_out,
            points,
        }
    }

    /// Live set before element `index` of `block`.
    pub fn live_at(&self, block: BlockId, index: usize) -> &HashSet<DeclId> {
        let points = &self.points[block.0];
        &points[index.min(points.len() - 1)]
    }

    pub fn live_out(&self, block: BlockId) -> &HashSet<DeclId> {
        &self.live_out[block.0]
    }
}

fn compute_use_def(block: &BasicBlock) -> (HashSet<DeclId>, HashSet<DeclId>) {
    let mut use_set = HashSet::new();
    let mut def_set = HashSet::new();
    for element in &block.elements {
        for var in &element.uses {
            if !def_set.contains(var) {
                use_set.insert(*var);
            }
        }
        def_set.extend(element.defs.iter().copied());
    }
    (use_set, def_set)
}

fn block_points(block: &BasicBlock, live_out: &HashSet<DeclId>) -> Vec<HashSet<DeclId>> {
    let mut points = vec![live_out.clone()];
    let mut live = live_out.clone();
    for element in block.elements.iter().rev() {
        for var in &element.defs {
            live.remove(var);
        }
        live.extend(element.uses.iter().copied());
        points.push(live.clone());
    }
    points.reverse();
    points
}
