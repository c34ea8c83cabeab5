//! Insertion points after top-level statements.

use super::selector::StatementSelector;
use crate::analysis::InsertionPointFact;
use crate::ast::TranslationUnit;
use crate::db::InsertionPointDatabase;

pub fn index_unit(tu: &TranslationUnit, strict: bool, db: &mut InsertionPointDatabase) {
    StatementSelector::new(tu, strict).visit(|selected| {
        let Some(span) = tu.source_range(selected.node) else {
            return;
        };
        db.add(InsertionPointFact {
            location: tu.file().end_point(span),
            visible: selected
                .visible
                .iter()
                .map(|d| tu.decl(*d).name.clone())
                .collect(),
        });
    });
}
