//! C++ language frontend using tree-sitter.

use std::collections::HashSet;
use std::path::Path;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node as TsNode, Parser, Query, QueryCursor};

use super::c::collect_static_functions;
use super::lower::{declarator_info, unqualified_name, Lowerer, PrePass};
use crate::analysis::{decode_source, Frontend, ParsedFile};
use crate::ast::TranslationUnit;
use crate::error::{IndexError, Result};

/// Member declarations; pure virtual methods are the function declarators
/// among them that end in `= 0`.
const PURE_QUERY: &str = r#"
(field_declaration
  declarator: (_) @declarator
) @field
"#;

pub struct CppFrontend {
    language: Language,
}

impl CppFrontend {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_cpp::LANGUAGE.into(),
        }
    }

    fn create_parser(&self) -> Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }

    fn collect_pure_methods(&self, parsed: &ParsedFile) -> Result<HashSet<(String, String)>> {
        let query = Query::new(&self.language, PURE_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), parsed.source_bytes());

        let mut pure = HashSet::new();
        while let Some(m) = matches.next() {
            let mut field = None;
            let mut declarator = None;
            for capture in m.captures {
                match query.capture_names()[capture.index as usize] {
                    "field" => field = Some(capture.node),
                    "declarator" => declarator = Some(capture.node),
                    _ => {}
                }
            }
            let (Some(field), Some(declarator)) = (field, declarator) else {
                continue;
            };
            let Some(info) = declarator_info(declarator) else {
                continue;
            };
            if !info.is_function || !is_pure_specified(field, parsed) {
                continue;
            }
            let Some(class) = enclosing_class_name(field, parsed) else {
                continue;
            };
            let method = unqualified_name(info.name, parsed.source_bytes()).to_string();
            pure.insert((class, method));
        }
        Ok(pure)
    }
}

impl Default for CppFrontend {
    fn default() -> Self {
        Self::new()
    }
}

/// `= 0` appears either as the member's initializer or as a clause of its
/// function declarator, depending on the grammar version.
fn is_pure_specified(field: TsNode<'_>, parsed: &ParsedFile) -> bool {
    if let Some(value) = field.child_by_field_name("default_value") {
        return parsed.node_text(value) == "0";
    }
    let mut stack = vec![field];
    while let Some(node) = stack.pop() {
        if node.kind() == "pure_virtual_clause" {
            return true;
        }
        let mut cursor = node.walk();
        stack.extend(node.children(&mut cursor));
    }
    false
}

fn enclosing_class_name(node: TsNode<'_>, parsed: &ParsedFile) -> Option<String> {
    let mut current = node.parent();
    while let Some(n) = current {
        if matches!(n.kind(), "class_specifier" | "struct_specifier" | "union_specifier") {
            let name = n.child_by_field_name("name")?;
            return Some(unqualified_name(name, parsed.source_bytes()).to_string());
        }
        current = n.parent();
    }
    None
}

impl Frontend for CppFrontend {
    fn language_id(&self) -> &'static str {
        "cpp"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["cpp", "cc", "cxx", "hpp", "hh"]
    }

    fn parse(&self, path: &Path, source: &[u8]) -> Result<ParsedFile> {
        let mut parser = self.create_parser()?;
        let source = decode_source(path, source);
        let tree = parser
            .parse(source.as_bytes(), None)
            .ok_or_else(|| IndexError::Parse(path.to_path_buf()))?;

        Ok(ParsedFile {
            tree,
            source,
            path: path.to_path_buf(),
        })
    }

    fn lower(&self, parsed: &ParsedFile) -> Result<TranslationUnit> {
        let prepass = PrePass {
            static_functions: collect_static_functions(&self.language, parsed)?,
            pure_methods: self.collect_pure_methods(parsed)?,
        };
        Ok(Lowerer::new(parsed, &prepass).lower())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{DeclKind, NodeId, NodeKind, Role};

    fn lower_cpp(source: &str) -> TranslationUnit {
        let frontend = CppFrontend::new();
        let parsed = frontend
            .parse(Path::new("/src/test.cpp"), source.as_bytes())
            .unwrap();
        frontend.lower(&parsed).unwrap()
    }

    fn find(tu: &TranslationUnit, kind: NodeKind) -> Vec<NodeId> {
        tu.node_ids().filter(|id| tu.kind(*id) == kind).collect()
    }

    fn refs_named<'a>(tu: &'a TranslationUnit, name: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        find(tu, NodeKind::DeclRef)
            .into_iter()
            .filter(move |r| tu.node(*r).name.as_deref() == Some(name))
    }

    #[test]
    fn test_implicit_this_field_resolves_in_methods() {
        let src = r#"
class Counter {
public:
    int get() { return count; }
    void inc();
private:
    int count;
};

void Counter::inc() { count++; }
"#;
        let tu = lower_cpp(src);
        let refs: Vec<_> = refs_named(&tu, "count").collect();
        assert_eq!(refs.len(), 2);
        for r in refs {
            assert_eq!(tu.referent(r).unwrap().kind, DeclKind::Field);
        }

        let names: Vec<_> = tu.functions().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["get", "inc"]);
        assert!(tu.functions().iter().all(|f| !f.is_global));
        assert_eq!(tu.kind(tu.functions()[1].node), NodeKind::Method);
    }

    #[test]
    fn test_this_member_access() {
        let src = "struct S { int n; void bump() { this->n = this->n + 1; } };";
        let tu = lower_cpp(src);
        let members = find(&tu, NodeKind::Member);
        assert_eq!(members.len(), 2);
        for m in members {
            assert_eq!(tu.node(m).name.as_deref(), Some("n"));
            let base = tu.child(m, Role::Base).unwrap();
            assert_eq!(tu.kind(base), NodeKind::This);
        }
    }

    #[test]
    fn test_pure_methods() {
        let src = r#"
struct Shape {
    virtual int area() = 0;
    virtual int sides() { return 0; }
};

int Shape::area() { return 0; }
"#;
        let tu = lower_cpp(src);
        let functions = tu.functions();
        let area = functions.iter().find(|f| f.name == "area").unwrap();
        let sides = functions.iter().find(|f| f.name == "sides").unwrap();
        assert!(area.is_pure);
        assert!(!sides.is_pure);
    }

    #[test]
    fn test_anonymous_namespace_functions_are_not_global() {
        let src = "namespace {\nint hidden() { return 1; }\n}\nnamespace api {\nint visible() { return 2; }\n}\n";
        let tu = lower_cpp(src);
        let functions = tu.functions();
        assert_eq!(functions.len(), 2);
        assert!(!functions[0].is_global);
        assert!(functions[1].is_global);
    }

    #[test]
    fn test_range_for_loop_variable() {
        let src = "int sum(std::vector<int> &values) {\n  int total = 0;\n  for (int v : values) total += v;\n  return total;\n}\n";
        let tu = lower_cpp(src);
        let range_for = find(&tu, NodeKind::ForRange)[0];
        let var = tu.child(range_for, Role::LoopVariable).unwrap();
        assert_eq!(tu.kind(var), NodeKind::DeclStmt);
        assert_eq!(tu.text(var), Some("int v"));

        let body = tu.child(range_for, Role::Body).unwrap();
        assert_eq!(tu.kind(body), NodeKind::CompoundAssignOperator);
        let v_ref = tu.child(body, Role::Rhs).unwrap();
        assert_eq!(tu.referent(v_ref).unwrap().kind, DeclKind::Variable);
    }

    #[test]
    fn test_condition_declaration() {
        let src = "int next();\nvoid use(int);\nvoid f() {\n  if (int x = next()) use(x);\n}\n";
        let tu = lower_cpp(src);
        let if_stmt = find(&tu, NodeKind::If)[0];
        let cond = tu.child(if_stmt, Role::Condition).unwrap();
        assert_eq!(tu.kind(cond), NodeKind::DeclStmt);
        let x_ref = refs_named(&tu, "x").next().unwrap();
        assert_eq!(tu.referent(x_ref).unwrap().kind, DeclKind::Variable);
    }

    #[test]
    fn test_try_catch_and_lambda() {
        let src = r#"
void run() {
    int total = 0;
    try {
        auto add = [&](int n) { total += n; };
        add(1);
    } catch (const char *msg) {
        total = -1;
    }
}
"#;
        let tu = lower_cpp(src);
        let try_stmt = find(&tu, NodeKind::Try)[0];
        assert!(tu.child(try_stmt, Role::Body).is_some());
        let handler = tu.child(try_stmt, Role::Handler).unwrap();
        assert_eq!(tu.kind(handler), NodeKind::Catch);

        let lambda = find(&tu, NodeKind::Lambda)[0];
        let n_ref = refs_named(&tu, "n").next().unwrap();
        assert_eq!(tu.enclosing_function(n_ref), Some(lambda));
        assert_eq!(tu.referent(n_ref).unwrap().kind, DeclKind::Parameter);
    }

    #[test]
    fn test_qualified_reference() {
        let src = "namespace cfg { int limit = 3; }\nint f() { return cfg::limit + ::cfg::limit; }\n";
        let tu = lower_cpp(src);
        let refs: Vec<_> = refs_named(&tu, "limit").collect();
        assert_eq!(refs.len(), 2);
        for r in refs {
            assert_eq!(tu.referent(r).unwrap().kind, DeclKind::Variable);
        }
    }
}
