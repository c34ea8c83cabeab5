//! Visible declarations at a statement and their liveness.

use std::collections::{BTreeSet, HashSet};

use crate::ast::{DeclId, DeclKind, NodeId, TranslationUnit};
use crate::error::SkipReason;
use crate::liveness::LivenessOracle;

/// Name sets for one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveSets {
    pub visible: BTreeSet<String>,
    pub live_before: BTreeSet<String>,
    pub live_after: BTreeSet<String>,
}

/// Variables, parameters and fields visible where `stmt` starts.
///
/// Walks the statement's declaration context and its lookup parents. Names
/// in block and function scopes count only once declared; an inner
/// declaration hides outer ones of the same name.
pub fn visible_decls(tu: &TranslationUnit, stmt: NodeId) -> Vec<DeclId> {
    let node = tu.node(stmt);
    let Some(position) = node.span.as_ref().map(|s| s.start_byte) else {
        return Vec::new();
    };
    let mut seen: HashSet<&str> = HashSet::new();
    let mut visible = Vec::new();
    for scope_id in tu.scope_chain(node.scope) {
        let scope = tu.scope(scope_id);
        let sequential = scope.kind.is_sequential();
        for decl_id in scope.decls.iter().rev() {
            let decl = tu.decl(*decl_id);
            if sequential && decl.position >= position {
                continue;
            }
            if !seen.insert(decl.name.as_str()) {
                continue;
            }
            if decl.kind.is_value() {
                visible.push(*decl_id);
            }
        }
    }
    visible.reverse();
    visible
}

/// Compute visible, live-before and live-after names for `stmt`.
///
/// Fields are not tracked by the oracle and count as always live. Fails
/// when no oracle covers the statement.
pub fn project_liveness(
    tu: &TranslationUnit,
    stmt: NodeId,
    visible: &[DeclId],
    oracle: Option<&dyn LivenessOracle>,
) -> Result<LiveSets, SkipReason> {
    let oracle = oracle.ok_or(SkipReason::MissingLiveness)?;
    let block = oracle.block_of(stmt).ok_or(SkipReason::MissingLiveness)?;

    let mut sets = LiveSets::default();
    for decl_id in visible {
        let decl = tu.decl(*decl_id);
        sets.visible.insert(decl.name.clone());
        let (before, after) = match decl.kind {
            DeclKind::Field => (true, true),
            _ => (
                oracle.is_live_before(stmt, *decl_id),
                oracle.is_live_after(block, *decl_id),
            ),
        };
        if before {
            sets.live_before.insert(decl.name.clone());
        }
        if after {
            sets.live_after.insert(decl.name.clone());
        }
    }
    Ok(sets)
}
