//! Loop facts.

use crate::analysis::{LoopFact, LoopKind};
use crate::ast::{NodeKind, Role, TranslationUnit};
use crate::db::LoopDatabase;

/// Record every `while`, `for`, `do` and range-`for` loop of `tu`.
pub fn index_unit(tu: &TranslationUnit, db: &mut LoopDatabase) {
    if !tu.file().in_project() {
        return;
    }
    let mut stack = vec![tu.root()];
    while let Some(id) = stack.pop() {
        let kind = tu.kind(id);
        if kind == NodeKind::Error {
            continue;
        }
        if let Some(loop_kind) = LoopKind::from_node_kind(kind) {
            let body = tu.child(id, Role::Body).and_then(|b| tu.location(b));
            if let (Some(location), Some(body)) = (tu.location(id), body) {
                db.add(LoopFact {
                    kind: loop_kind,
                    location,
                    body,
                });
            }
        }
        stack.extend(tu.children(id).iter().rev().copied());
    }
}
