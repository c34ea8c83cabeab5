//! Statement facts.

use tracing::warn;

use super::selector::{Selected, StatementSelector};
use crate::analysis::{
    analyze_accesses, analyze_syntax_scope, canonicalize, project_liveness, StatementFact,
};
use crate::ast::TranslationUnit;
use crate::db::StatementDatabase;
use crate::error::SkipReason;
use crate::liveness::LivenessProvider;

/// Index every top-level statement of `tu`.
pub fn index_unit(
    tu: &TranslationUnit,
    liveness: &dyn LivenessProvider,
    strict: bool,
    db: &mut StatementDatabase,
) {
    StatementSelector::new(tu, strict)
        .with_liveness(liveness)
        .visit(|selected| match statement_fact(tu, &selected) {
            Ok(fact) => db.add(fact),
            Err(reason) => warn!(
                location = %tu.location(selected.node).map(|l| l.to_string()).unwrap_or_default(),
                %reason,
                "skipping statement"
            ),
        });
}

/// Build the fact for one selected statement.
pub fn statement_fact(
    tu: &TranslationUnit,
    selected: &Selected<'_>,
) -> Result<StatementFact, SkipReason> {
    let stmt = selected.node;
    let (location, content) = match (tu.location(stmt), tu.text(stmt)) {
        (Some(location), Some(content)) => (location, content),
        _ => return Err(SkipReason::InvalidLocation),
    };
    let live = project_liveness(tu, stmt, &selected.visible, selected.oracle)?;
    let accesses = analyze_accesses(tu, stmt);
    Ok(StatementFact {
        location,
        content: content.to_string(),
        canonical: canonicalize(content),
        kind: tu.kind(stmt).as_str().to_string(),
        reads: accesses.reads,
        writes: accesses.writes,
        decls: accesses.decls,
        visible: live.visible,
        live_before: live.live_before,
        live_after: live.live_after,
        requires_syntax: analyze_syntax_scope(tu, stmt),
    })
}
