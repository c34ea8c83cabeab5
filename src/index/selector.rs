//! Top-level statement selection.
//!
//! A statement is top-level when it rests directly in a statement sequence:
//! not a sub-expression, not part of a loop header and not one of the
//! structural kinds that carry no behaviour of their own.

use tracing::debug;

use crate::analysis::visible_decls;
use crate::ast::{DeclId, NodeId, NodeKind, Role, TranslationUnit};
use crate::error::SkipReason;
use crate::liveness::{LivenessOracle, LivenessProvider};

/// A statement accepted by the selector.
pub struct Selected<'a> {
    pub node: NodeId,
    /// Variables, parameters and fields visible where the statement starts.
    pub visible: Vec<DeclId>,
    /// Liveness scope of the innermost enclosing function, if prepared.
    pub oracle: Option<&'a dyn LivenessOracle>,
}

enum Step {
    Enter(NodeId),
    Exit(NodeId),
}

/// Walks one translation unit and reports its top-level statements in
/// source order.
pub struct StatementSelector<'a> {
    tu: &'a TranslationUnit,
    liveness: Option<&'a dyn LivenessProvider>,
    strict: bool,
}

impl<'a> StatementSelector<'a> {
    pub fn new(tu: &'a TranslationUnit, strict: bool) -> Self {
        Self {
            tu,
            liveness: None,
            strict,
        }
    }

    /// Prepare a liveness scope for every function entered.
    pub fn with_liveness(mut self, provider: &'a dyn LivenessProvider) -> Self {
        self.liveness = Some(provider);
        self
    }

    pub fn visit<F>(&self, mut on_statement: F)
    where
        F: FnMut(Selected<'_>),
    {
        let tu = self.tu;
        if !tu.file().in_project() {
            debug!(file = %tu.file().display_name(), reason = %SkipReason::ExternalFile, "skipping unit");
            return;
        }

        let mut oracles: Vec<(NodeId, Box<dyn LivenessOracle>)> = Vec::new();
        let mut steps = vec![Step::Enter(tu.root())];
        while let Some(step) = steps.pop() {
            let id = match step {
                Step::Exit(id) => {
                    if oracles.last().map(|(f, _)| *f) == Some(id) {
                        oracles.pop();
                    }
                    continue;
                }
                Step::Enter(id) => id,
            };
            let kind = tu.kind(id);
            if kind == NodeKind::Error {
                continue;
            }

            if kind.is_function_like() {
                if let Some(oracle) = self.liveness.and_then(|p| p.prepare(tu, id)) {
                    oracles.push((id, oracle));
                }
            }

            if is_top_level(tu, id, self.strict) {
                match tu.source_range(id) {
                    Some(_) => on_statement(Selected {
                        node: id,
                        visible: visible_decls(tu, id),
                        oracle: oracles.last().map(|(_, o)| o.as_ref()),
                    }),
                    None => debug!(
                        kind = kind.as_str(),
                        reason = %SkipReason::InvalidLocation,
                        "skipping statement"
                    ),
                }
            }

            steps.push(Step::Exit(id));
            steps.extend(tu.children(id).iter().rev().map(|c| Step::Enter(*c)));
        }
    }
}

/// Whether `id` is a statement worth indexing on its own.
pub fn is_top_level(tu: &TranslationUnit, id: NodeId, strict: bool) -> bool {
    let kind = tu.kind(id);
    if !kind.is_stmt() || is_structural(kind) {
        return false;
    }
    if strict && (kind.is_literal() || kind == NodeKind::InitList) {
        return false;
    }
    let Some(parent) = tu.parent(id) else {
        return false;
    };
    let parent_kind = tu.kind(parent);
    if parent_kind.is_expr() || parent_kind.is_decl() || is_excluding_parent(parent_kind) {
        return false;
    }
    if parent_kind.is_loop() && tu.role(id) != Role::Body {
        return false;
    }
    !in_array_subscript(tu, id)
}

/// Kinds never indexed as statements.
fn is_structural(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Compound
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Default
            | NodeKind::Return
            | NodeKind::Case
            | NodeKind::ImplicitCast
            | NodeKind::Catch
            | NodeKind::Null
    )
}

fn is_excluding_parent(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Return | NodeKind::If | NodeKind::Case | NodeKind::Switch | NodeKind::DeclStmt
    )
}

/// Whether an array subscript encloses `id` within its block.
fn in_array_subscript(tu: &TranslationUnit, id: NodeId) -> bool {
    tu.ancestors(id)
        .take_while(|a| tu.kind(*a) != NodeKind::Compound)
        .any(|a| tu.kind(a) == NodeKind::ArraySubscript)
}
