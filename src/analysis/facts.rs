//! Fact records written to the fact databases.
//!
//! Field order is the JSON key order. Set-valued fields are `BTreeSet`s so
//! that they serialize as sorted arrays, and empty sets as `[]`.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use super::syntax_scope::SyntaxScope;
use crate::ast::{Location, NodeKind, Point};

/// One indexed top-level statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementFact {
    pub location: Location,
    /// Exact source text.
    pub content: String,
    pub canonical: String,
    /// Clang-style kind name of the statement node.
    pub kind: String,
    pub reads: BTreeSet<String>,
    pub writes: BTreeSet<String>,
    pub decls: BTreeSet<String>,
    pub visible: BTreeSet<String>,
    pub live_before: BTreeSet<String>,
    pub live_after: BTreeSet<String>,
    pub requires_syntax: SyntaxScope,
}

/// Shape matched by a snippet matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnippetKind {
    GuardedReturn,
    GuardedBreak,
    VoidCall,
}

impl SnippetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnippetKind::GuardedReturn => "guarded-return",
            SnippetKind::GuardedBreak => "guarded-break",
            SnippetKind::VoidCall => "void-call",
        }
    }
}

impl fmt::Display for SnippetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A snippet and every place its exact text occurs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnippetFact {
    pub kind: SnippetKind,
    pub content: String,
    pub locations: BTreeSet<Location>,
    pub reads: BTreeSet<String>,
}

/// Kind of an iteration statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoopKind {
    While,
    For,
    Do,
    ForRange,
}

impl LoopKind {
    pub fn from_node_kind(kind: NodeKind) -> Option<Self> {
        match kind {
            NodeKind::While => Some(LoopKind::While),
            NodeKind::For => Some(LoopKind::For),
            NodeKind::Do => Some(LoopKind::Do),
            NodeKind::ForRange => Some(LoopKind::ForRange),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopFact {
    pub kind: LoopKind,
    pub location: Location,
    pub body: Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionFact {
    pub name: String,
    pub location: Location,
    pub body: Location,
    #[serde(rename = "return-type")]
    pub return_type: String,
    pub pure: bool,
    pub global: bool,
}

/// A point after a top-level statement where code may be inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertionPointFact {
    pub location: Point,
    pub visible: BTreeSet<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;

    fn loc(line: usize, col: usize, end_col: usize) -> Location {
        Location::new(
            "/p/a.c",
            &Span {
                start_byte: 0,
                end_byte: 0,
                start_line: line,
                start_col: col,
                end_line: line,
                end_col,
            },
        )
    }

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_statement_fact_json_keys() {
        let fact = StatementFact {
            location: loc(2, 3, 9),
            content: "x=y+1;".into(),
            canonical: "x = y + 1;".into(),
            kind: "BinaryOperator".into(),
            reads: names(&["y"]),
            writes: names(&["x"]),
            decls: BTreeSet::new(),
            visible: names(&["y", "x"]),
            live_before: names(&["y"]),
            live_after: BTreeSet::new(),
            requires_syntax: SyntaxScope::default(),
        };
        let json = serde_json::to_value(&fact).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                "location",
                "content",
                "canonical",
                "kind",
                "reads",
                "writes",
                "decls",
                "visible",
                "live_before",
                "live_after",
                "requires_syntax"
            ]
        );
        assert_eq!(json["location"], "/p/a.c@2:3::2:9");
        assert_eq!(json["visible"], serde_json::json!(["x", "y"]));
        assert_eq!(json["decls"], serde_json::json!([]));
        assert_eq!(json["requires_syntax"], serde_json::json!([]));
    }

    #[test]
    fn test_function_fact_return_type_key() {
        let fact = FunctionFact {
            name: "f".into(),
            location: loc(1, 1, 20),
            body: loc(1, 12, 20),
            return_type: "int".into(),
            pure: false,
            global: true,
        };
        let json = serde_json::to_value(&fact).unwrap();
        assert_eq!(json["return-type"], "int");
        assert_eq!(json["global"], true);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(
            serde_json::to_value(SnippetKind::GuardedReturn).unwrap(),
            "guarded-return"
        );
        assert_eq!(SnippetKind::VoidCall.to_string(), "void-call");
        assert_eq!(
            serde_json::to_value(LoopKind::ForRange).unwrap(),
            "for-range"
        );
        assert_eq!(LoopKind::from_node_kind(NodeKind::Do), Some(LoopKind::Do));
        assert_eq!(LoopKind::from_node_kind(NodeKind::If), None);
    }
}
