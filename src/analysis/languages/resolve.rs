//! Name resolution over a lowered translation unit.
//!
//! Runs after lowering so that names declared later in a record, namespace
//! or the file itself are visible; block-scope names must precede the use.

use tracing::debug;

use crate::ast::{DeclId, DeclKind, NodeId, ScopeId, TranslationUnit};

/// A reference awaiting resolution.
#[derive(Debug, Clone)]
pub(crate) struct PendingRef {
    pub node: NodeId,
    pub scope: ScopeId,
    /// Name components; a leading empty component means the global scope.
    pub path: Vec<String>,
    pub position: usize,
}

/// Resolve every pending reference and record its referent.
pub(crate) fn resolve_references(tu: &mut TranslationUnit, refs: Vec<PendingRef>) {
    let mut unresolved = 0usize;
    for r in refs {
        let found = match r.path.as_slice() {
            [name] => lookup(tu, r.scope, name, r.position),
            path => lookup_qualified(tu, r.scope, path),
        };
        match found {
            Some(decl) => tu.node_mut(r.node).referent = Some(decl),
            None => unresolved += 1,
        }
    }
    if unresolved > 0 {
        debug!(
            file = %tu.file().display_name(),
            unresolved,
            "unresolved references"
        );
    }
}

/// Unqualified lookup from `scope` outwards.
fn lookup(tu: &TranslationUnit, scope: ScopeId, name: &str, position: usize) -> Option<DeclId> {
    for id in tu.scope_chain(scope) {
        let s = tu.scope(id);
        let sequential = s.kind.is_sequential();
        let found = s.decls.iter().rev().copied().find(|d| {
            let decl = tu.decl(*d);
            decl.name == name && (!sequential || decl.position < position)
        });
        if found.is_some() {
            return found;
        }
    }
    None
}

fn lookup_qualified(tu: &TranslationUnit, scope: ScopeId, path: &[String]) -> Option<DeclId> {
    let (last, qualifiers) = path.split_last()?;
    let mut current = match qualifiers.first() {
        Some(first) if first.is_empty() => tu.root_scope(),
        Some(first) => {
            let decl = tu.scope_chain(scope).find_map(|id| {
                tu.scope(id)
                    .decls
                    .iter()
                    .copied()
                    .find(|d| is_named_context(tu, *d, first))
            })?;
            owned_scope(tu, decl)?
        }
        None => return None,
    };
    for qualifier in qualifiers.iter().skip(1) {
        let decl = tu
            .scope(current)
            .decls
            .iter()
            .copied()
            .find(|d| is_named_context(tu, *d, qualifier))?;
        current = owned_scope(tu, decl)?;
    }
    tu.scope(current)
        .decls
        .iter()
        .copied()
        .find(|d| tu.decl(*d).name == *last)
}

fn is_named_context(tu: &TranslationUnit, decl: DeclId, name: &str) -> bool {
    let d = tu.decl(decl);
    d.name == name && matches!(d.kind, DeclKind::Record | DeclKind::Namespace)
}

/// The declaration context introduced by a record or namespace declaration.
fn owned_scope(tu: &TranslationUnit, decl: DeclId) -> Option<ScopeId> {
    let node = tu.decl(decl).node;
    tu.scope_ids().find(|id| tu.scope(*id).node == node)
}
