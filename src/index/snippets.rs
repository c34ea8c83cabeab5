//! Snippet matchers: guarded returns, guarded breaks and zero-argument calls.

use tracing::debug;

use crate::analysis::SnippetKind;
use crate::ast::{NodeId, NodeKind, Role, TranslationUnit};
use crate::db::SnippetDatabase;

/// Feed every snippet of `tu` to `db`.
pub fn index_unit(tu: &TranslationUnit, db: &mut SnippetDatabase) {
    if !tu.file().in_project() {
        return;
    }
    let mut stack = vec![tu.root()];
    while let Some(id) = stack.pop() {
        if tu.kind(id) == NodeKind::Error {
            continue;
        }
        if let Some(kind) = match_snippet(tu, id) {
            if let Err(reason) = db.add(kind, tu, id) {
                debug!(snippet = %kind, %reason, "skipping snippet");
            }
        }
        stack.extend(tu.children(id).iter().rev().copied());
    }
}

/// The snippet shape `id` has, if any.
pub fn match_snippet(tu: &TranslationUnit, id: NodeId) -> Option<SnippetKind> {
    let parent = tu.kind(tu.parent(id)?);
    let blocked = parent.is_expr()
        || parent.is_decl()
        || matches!(
            parent,
            NodeKind::While | NodeKind::If | NodeKind::Switch | NodeKind::ForRange
        );
    if blocked {
        return None;
    }

    match tu.kind(id) {
        kind if kind.is_call() => {
            let no_arguments = tu.children_with(id, Role::Argument).next().is_none();
            (no_arguments && parent != NodeKind::For).then_some(SnippetKind::VoidCall)
        }
        NodeKind::If if tu.child(id, Role::Else).is_none() => {
            let then = tu.child(id, Role::Then)?;
            match tu.kind(then) {
                NodeKind::Return if tu.children(then).is_empty() => {
                    Some(SnippetKind::GuardedReturn)
                }
                NodeKind::Break => Some(SnippetKind::GuardedBreak),
                _ => None,
            }
        }
        _ => None,
    }
}
