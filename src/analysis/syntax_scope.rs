//! Detection of `break`/`continue` statements that escape a statement.

use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::ast::{NodeId, NodeKind, TranslationUnit};

/// Enclosing constructs a statement needs to stay well-formed on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyntaxScope {
    pub requires_break: bool,
    pub requires_continue: bool,
}

impl SyntaxScope {
    pub fn is_empty(&self) -> bool {
        !self.requires_break && !self.requires_continue
    }
}

/// Serialized as the list of required constructs, e.g. `["break"]`.
impl Serialize for SyntaxScope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = usize::from(self.requires_break) + usize::from(self.requires_continue);
        let mut seq = serializer.serialize_seq(Some(len))?;
        if self.requires_break {
            seq.serialize_element("break")?;
        }
        if self.requires_continue {
            seq.serialize_element("continue")?;
        }
        seq.end()
    }
}

/// Find `break`/`continue` under `stmt` not consumed by a nested loop or
/// `switch` inside it.
pub fn analyze_syntax_scope(tu: &TranslationUnit, stmt: NodeId) -> SyntaxScope {
    let mut scope = SyntaxScope::default();
    let mut stack = vec![stmt];
    while let Some(id) = stack.pop() {
        match tu.kind(id) {
            NodeKind::Break => scope.requires_break = true,
            NodeKind::Continue => scope.requires_continue = true,
            NodeKind::For
            | NodeKind::ForRange
            | NodeKind::While
            | NodeKind::Do
            | NodeKind::Switch
            | NodeKind::Lambda => {}
            _ => stack.extend(tu.children(id).iter().copied()),
        }
    }
    scope
}
