//! C language frontend using tree-sitter.

use std::collections::HashSet;
use std::path::Path;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Parser, Query, QueryCursor};

use super::lower::{declarator_info, Lowerer, PrePass};
use crate::analysis::{decode_source, Frontend, ParsedFile};
use crate::ast::TranslationUnit;
use crate::error::{IndexError, Result};

/// Tree-sitter query for declarations carrying a storage class.
///
/// A function is internal if any of its declarations says `static`.
pub(super) const STORAGE_QUERY: &str = r#"
(function_definition
  (storage_class_specifier) @storage
  declarator: (_) @declarator
)

(declaration
  (storage_class_specifier) @storage
  declarator: (_) @declarator
)
"#;

/// Collect names of functions declared `static` anywhere in the file.
pub(super) fn collect_static_functions(
    language: &Language,
    parsed: &ParsedFile,
) -> Result<HashSet<String>> {
    let query = Query::new(language, STORAGE_QUERY)?;
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, parsed.tree.root_node(), parsed.source_bytes());

    let mut names = HashSet::new();
    while let Some(m) = matches.next() {
        let mut is_static = false;
        let mut declarator = None;
        for capture in m.captures {
            match query.capture_names()[capture.index as usize] {
                "storage" => is_static |= parsed.node_text(capture.node) == "static",
                "declarator" => declarator = Some(capture.node),
                _ => {}
            }
        }
        if !is_static {
            continue;
        }
        if let Some(info) = declarator.and_then(declarator_info) {
            if info.is_function {
                names.insert(parsed.node_text(info.name).to_string());
            }
        }
    }
    Ok(names)
}

pub struct CFrontend {
    language: Language,
}

impl CFrontend {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_c::LANGUAGE.into(),
        }
    }

    fn create_parser(&self) -> Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }
}

impl Default for CFrontend {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontend for CFrontend {
    fn language_id(&self) -> &'static str {
        "c"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["c", "h"]
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
            ..PrePass::default()
        };
        Ok(Lowerer::new(parsed, &prepass).lower())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{DeclKind, NodeKind, Role, Storage};

    fn lower_c(source: &str) -> TranslationUnit {
        let frontend = CFrontend::new();
        let parsed = frontend
            .parse(Path::new("/src/test.c"), source.as_bytes())
            .unwrap();
        frontend.lower(&parsed).unwrap()
    }

    fn find(tu: &TranslationUnit, kind: NodeKind) -> Vec<crate::ast::NodeId> {
        tu.node_ids().filter(|id| tu.kind(*id) == kind).collect()
    }

    #[test]
    fn test_expression_statement_range_includes_semicolon() {
        let tu = lower_c("void f(int x) {\n    x = 1;\n}\n");
        let assign = find(&tu, NodeKind::BinaryOperator)[0];
        assert_eq!(tu.text(assign), Some("x = 1;"));
        assert_eq!(
            tu.location(assign).unwrap().to_string(),
            "/src/test.c@2:5::2:11"
        );
        assert_eq!(tu.node(assign).operator.as_deref(), Some("="));
        assert_eq!(tu.kind(tu.parent(assign).unwrap()), NodeKind::Compound);
    }

    #[test]
    fn test_declaration_statement() {
        let tu = lower_c("int f(int a) { int b = a, c; return b; }");
        let decl_stmt = find(&tu, NodeKind::DeclStmt)[0];
        assert_eq!(tu.text(decl_stmt), Some("int b = a, c;"));
        let vars: Vec<_> = tu
            .children(decl_stmt)
            .iter()
            .map(|v| tu.node(*v).name.clone().unwrap())
            .collect();
        assert_eq!(vars, vec!["b", "c"]);

        let var_b = tu.children(decl_stmt)[0];
        let decl = tu.decl(tu.node(var_b).declared.unwrap());
        assert_eq!(decl.kind, DeclKind::Variable);
        assert_eq!(decl.storage, Storage::Automatic);

        let init = tu.child(var_b, Role::Init).unwrap();
        assert_eq!(tu.kind(init), NodeKind::DeclRef);
        assert_eq!(tu.referent(init).unwrap().kind, DeclKind::Parameter);
    }

    #[test]
    fn test_references_resolve_by_scope() {
        let src = "int g;\nint f(void) {\n  int x = g;\n  { int g = 2; x = g; }\n  return x;\n}\n";
        let tu = lower_c(src);
        let refs: Vec<_> = find(&tu, NodeKind::DeclRef)
            .into_iter()
            .filter(|r| tu.node(*r).name.as_deref() == Some("g"))
            .collect();
        assert_eq!(refs.len(), 2);
        assert_eq!(tu.referent(refs[0]).unwrap().storage, Storage::Global);
        assert_eq!(tu.referent(refs[1]).unwrap().storage, Storage::Automatic);
    }

    #[test]
    fn test_enum_constants_and_functions_resolve() {
        let tu = lower_c("enum color { RED, GREEN };\nint h(void);\nint f(void) { return h() + RED; }\n");
        let refs = find(&tu, NodeKind::DeclRef);
        let kinds: Vec<_> = refs.iter().map(|r| tu.referent(*r).unwrap().kind).collect();
        assert_eq!(kinds, vec![DeclKind::Function, DeclKind::EnumConstant]);
    }

    #[test]
    fn test_control_flow_roles() {
        let src = "void f(int n) {\n  for (int i = 0; i < n; i++) { if (i) break; else continue; }\n  while (n) n--;\n}\n";
        let tu = lower_c(src);
        let for_stmt = find(&tu, NodeKind::For)[0];
        assert_eq!(tu.kind(tu.child(for_stmt, Role::Init).unwrap()), NodeKind::DeclStmt);
        assert_eq!(
            tu.kind(tu.child(for_stmt, Role::Condition).unwrap()),
            NodeKind::BinaryOperator
        );
        assert_eq!(
            tu.kind(tu.child(for_stmt, Role::Increment).unwrap()),
            NodeKind::UnaryOperator
        );
        assert_eq!(tu.kind(tu.child(for_stmt, Role::Body).unwrap()), NodeKind::Compound);

        let if_stmt = find(&tu, NodeKind::If)[0];
        assert_eq!(tu.kind(tu.child(if_stmt, Role::Then).unwrap()), NodeKind::Break);
        assert_eq!(tu.kind(tu.child(if_stmt, Role::Else).unwrap()), NodeKind::Continue);

        let while_stmt = find(&tu, NodeKind::While)[0];
        let cond = tu.child(while_stmt, Role::Condition).unwrap();
        assert_eq!(tu.kind(cond), NodeKind::DeclRef);
    }

    #[test]
    fn test_case_statements_flatten_into_switch_block() {
        let src = "void f(int x, int y) {\n  switch (x) {\n  case 1:\n    y = 1;\n    y = 2;\n    break;\n  default:\n    y = 3;\n  }\n}\n";
        let tu = lower_c(src);
        let switch = find(&tu, NodeKind::Switch)[0];
        let body = tu.child(switch, Role::Body).unwrap();
        let kinds: Vec<_> = tu.children(body).iter().map(|c| tu.kind(*c)).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Case,
                NodeKind::BinaryOperator,
                NodeKind::Break,
                NodeKind::Default
            ]
        );
        let case = tu.children(body)[0];
        assert_eq!(tu.text(tu.child(case, Role::Body).unwrap()), Some("y = 1;"));
    }

    #[test]
    fn test_member_expressions() {
        let src = "struct P { int x; };\nvoid f(struct P *p) { p->x = 1; }\n";
        let tu = lower_c(src);
        let member = find(&tu, NodeKind::Member)[0];
        assert_eq!(tu.node(member).name.as_deref(), Some("x"));
        assert_eq!(tu.node(member).operator.as_deref(), Some("->"));
        let base = tu.child(member, Role::Base).unwrap();
        assert_eq!(tu.node(base).name.as_deref(), Some("p"));
        assert_eq!(find(&tu, NodeKind::Record).len(), 1);
    }

    #[test]
    fn test_function_info() {
        let src = "static int helper(void);\nint helper(void) { return 1; }\nchar *name(void) { return 0; }\nint proto(int);\n";
        let tu = lower_c(src);
        let functions = tu.functions();
        assert_eq!(functions.len(), 2);
        assert_eq!(functions[0].name, "helper");
        assert!(!functions[0].is_global);
        assert_eq!(functions[0].return_type, "int");
        assert_eq!(functions[1].name, "name");
        assert!(functions[1].is_global);
        assert_eq!(functions[1].return_type, "char *");
        assert_eq!(tu.kind(functions[1].body), NodeKind::Compound);
    }

    #[test]
    fn test_preprocessor_conditionals_are_transparent() {
        let src = "void f(int x) {\n#ifdef DEBUG\n  x = 1;\n#else\n  x = 2;\n#endif\n}\n";
        let tu = lower_c(src);
        let body = tu.functions()[0].body;
        let texts: Vec<_> = tu
            .children(body)
            .iter()
            .map(|c| tu.text(*c).unwrap().to_string())
            .collect();
        assert_eq!(texts, vec!["x = 1;", "x = 2;"]);
    }

    #[test]
    fn test_static_local_storage() {
        let tu = lower_c("void f(void) { static int count; count++; }");
        let var = find(&tu, NodeKind::Var)[0];
        let decl = tu.decl(tu.node(var).declared.unwrap());
        assert_eq!(decl.storage, Storage::Static);
    }
}
