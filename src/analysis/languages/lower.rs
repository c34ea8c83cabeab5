//! Lowering of tree-sitter C/C++ syntax trees into a [`TranslationUnit`].
//!
//! The tree-sitter C++ grammar is a superset of the C grammar, so one
//! lowerer serves both frontends. Node kinds are mapped to clang-style
//! kinds; references are collected here and resolved afterwards by
//! [`super::resolve`].

use std::collections::{HashMap, HashSet};

use phf::{phf_map, phf_set};
use tree_sitter::Node as TsNode;

use super::resolve::{self, PendingRef};
use crate::analysis::ParsedFile;
use crate::ast::{
    DeclKind, FunctionInfo, NodeId, NodeKind, Role, ScopeId, ScopeKind, SourceFile, Span,
    Storage, TranslationUnit,
};

/// Grammar leaves that lower to a fixed kind.
static LEAF_KINDS: phf::Map<&'static str, NodeKind> = phf_map! {
    "string_literal" => NodeKind::StringLiteral,
    "concatenated_string" => NodeKind::StringLiteral,
    "raw_string_literal" => NodeKind::StringLiteral,
    "char_literal" => NodeKind::CharacterLiteral,
    "true" => NodeKind::BoolLiteral,
    "false" => NodeKind::BoolLiteral,
    "null" => NodeKind::NullPtrLiteral,
    "nullptr" => NodeKind::NullPtrLiteral,
    "this" => NodeKind::This,
};

/// Grammar nodes that never contain value references.
static TYPE_KINDS: phf::Set<&'static str> = phf_set! {
    "type_descriptor",
    "primitive_type",
    "type_identifier",
    "sized_type_specifier",
    "template_argument_list",
    "template_type",
    "abstract_pointer_declarator",
    "abstract_function_declarator",
    "abstract_array_declarator",
    "abstract_reference_declarator",
    "type_qualifier",
    "storage_class_specifier",
    "placeholder_type_specifier",
    "decltype",
    "struct_specifier",
    "union_specifier",
    "class_specifier",
    "enum_specifier",
    "lambda_capture_specifier",
    "attribute_specifier",
    "attribute_declaration",
    "ms_declspec_modifier",
};

/// Preprocessor nodes whose contents belong to the enclosing construct.
static PREPROC_CONDITIONALS: phf::Set<&'static str> = phf_set! {
    "preproc_if",
    "preproc_ifdef",
    "preproc_else",
    "preproc_elif",
    "preproc_elifdef",
};

/// File-level facts gathered by query before lowering.
#[derive(Debug, Default)]
pub(crate) struct PrePass {
    /// Functions declared `static` anywhere in the file.
    pub static_functions: HashSet<String>,
    /// `(class, method)` pairs declared pure virtual.
    pub pure_methods: HashSet<(String, String)>,
}

/// Name and shape information extracted from a declarator chain.
pub(crate) struct DeclaratorInfo<'a> {
    pub name: TsNode<'a>,
    pub is_function: bool,
    pub pointer_suffix: String,
    pub array_sizes: Vec<TsNode<'a>>,
}

/// Walk a declarator down to its declared name.
pub(crate) fn declarator_info(node: TsNode<'_>) -> Option<DeclaratorInfo<'_>> {
    let mut current = node;
    let mut is_function = false;
    let mut pointer_suffix = String::new();
    let mut array_sizes = Vec::new();
    loop {
        match current.kind() {
            "identifier" | "field_identifier" | "qualified_identifier" | "destructor_name"
            | "operator_name" | "template_function" | "operator_cast" | "type_identifier" => {
                return Some(DeclaratorInfo {
                    name: current,
                    is_function,
                    pointer_suffix,
                    array_sizes,
                });
            }
            "pointer_declarator" => {
                // `(*fp)(int)` declares a pointer, not a function.
                is_function = false;
                pointer_suffix.push('*');
                current = current.child_by_field_name("declarator")?;
            }
            "reference_declarator" => {
                is_function = false;
                if let Some(op) = current.child(0) {
                    if !op.is_named() {
                        pointer_suffix.push_str(op.kind());
                    }
                }
                current = first_named(current)?;
            }
            "function_declarator" => {
                is_function = true;
                current = current.child_by_field_name("declarator")?;
            }
            "array_declarator" => {
                if let Some(size) = current.child_by_field_name("size") {
                    array_sizes.push(size);
                }
                current = current.child_by_field_name("declarator")?;
            }
            "init_declarator" => {
                current = current.child_by_field_name("declarator")?;
            }
            "parenthesized_declarator" | "attributed_declarator" => {
                current = first_named(current)?;
            }
            _ => return None,
        }
    }
}

/// Last component of a possibly qualified name.
pub(crate) fn unqualified_name<'a>(node: TsNode<'a>, source: &'a [u8]) -> &'a str {
    match node.kind() {
        "qualified_identifier" => match node.child_by_field_name("name") {
            Some(name) => unqualified_name(name, source),
            None => node.utf8_text(source).unwrap_or(""),
        },
        "template_function" | "template_method" | "template_type" => {
            match node.child_by_field_name("name") {
                Some(name) => unqualified_name(name, source),
                None => node.utf8_text(source).unwrap_or(""),
            }
        }
        _ => node.utf8_text(source).unwrap_or(""),
    }
}

/// Components of a qualified name; a leading `::` yields an empty first component.
pub(crate) fn qualified_path(node: TsNode<'_>, source: &[u8]) -> Vec<String> {
    let mut path = Vec::new();
    let mut current = node;
    let mut first = true;
    while current.kind() == "qualified_identifier" {
        match current.child_by_field_name("scope") {
            Some(scope) => path.push(unqualified_name(scope, source).to_string()),
            None if first => path.push(String::new()),
            None => {}
        }
        first = false;
        match current.child_by_field_name("name") {
            Some(name) => current = name,
            None => break,
        }
    }
    path.push(unqualified_name(current, source).to_string());
    path
}

fn first_named(node: TsNode<'_>) -> Option<TsNode<'_>> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|c| c.kind() != "comment");
    found
}

fn named_children(node: TsNode<'_>) -> Vec<TsNode<'_>> {
    let mut cursor = node.walk();
    let children = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect();
    children
}

fn has_storage_class(node: TsNode<'_>, source: &[u8], class: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|c| c.kind() == "storage_class_specifier" && c.utf8_text(source).ok() == Some(class));
    found
}

/// Builds a [`TranslationUnit`] from a parsed file.
pub(crate) struct Lowerer<'a> {
    parsed: &'a ParsedFile,
    prepass: &'a PrePass,
    tu: TranslationUnit,
    refs: Vec<PendingRef>,
    records: HashMap<String, ScopeId>,
}

impl<'a> Lowerer<'a> {
    pub fn new(parsed: &'a ParsedFile, prepass: &'a PrePass) -> Self {
        let file = SourceFile::new(parsed.path.clone(), parsed.source_str().to_string());
        Self {
            parsed,
            prepass,
            tu: TranslationUnit::new(file),
            refs: Vec::new(),
            records: HashMap::new(),
        }
    }

    /// Lower the whole file and resolve its references.
    pub fn lower(mut self) -> TranslationUnit {
        let parsed = self.parsed;
        let root = parsed.tree.root_node();
        let (tu_node, tu_scope) = (self.tu.root(), self.tu.root_scope());
        for item in named_children(root) {
            self.lower_item(item, tu_node, tu_scope);
        }
        let mut tu = self.tu;
        resolve::resolve_references(&mut tu, self.refs);
        tu
    }

    fn source(&self) -> &'a [u8] {
        let parsed: &'a ParsedFile = self.parsed;
        parsed.source_bytes()
    }

    fn text(&self, node: TsNode<'_>) -> &'a str {
        node.utf8_text(self.source()).unwrap_or("")
    }

    fn add(
        &mut self,
        kind: NodeKind,
        role: Role,
        parent: NodeId,
        ts: TsNode<'_>,
        scope: ScopeId,
    ) -> NodeId {
        self.tu
            .add_node(kind, role, Some(parent), Span::from_node(ts), scope)
    }

    /// Whether `scope` lies inside a function body.
    fn is_local(&self, scope: ScopeId) -> bool {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.tu.scope(id);
            match s.kind {
                ScopeKind::Function => return true,
                ScopeKind::Block | ScopeKind::Statement => current = s.parent,
                _ => return false,
            }
        }
        false
    }

    fn in_anonymous_namespace(&self, scope: ScopeId) -> bool {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.tu.scope(id);
            if s.kind == ScopeKind::Namespace && self.tu.node(s.node).name.is_none() {
                return true;
            }
            current = s.parent;
        }
        false
    }

    // --- declarations -----------------------------------------------------

    fn lower_item(&mut self, item: TsNode<'_>, parent: NodeId, scope: ScopeId) {
        match item.kind() {
            "function_definition" => self.lower_function(item, parent, scope),
            "declaration" | "field_declaration" => self.lower_declaration(item, parent, scope),
            "type_definition" | "alias_declaration" => {
                if let Some(ty) = item.child_by_field_name("type") {
                    self.lower_specifier(ty, parent, scope);
                }
            }
            "struct_specifier" | "union_specifier" | "class_specifier" | "enum_specifier" => {
                self.lower_specifier(item, parent, scope);
            }
            "namespace_definition" => self.lower_namespace(item, parent, scope),
            "linkage_specification" => {
                if let Some(body) = item.child_by_field_name("body") {
                    if body.kind() == "declaration_list" {
                        for child in named_children(body) {
                            self.lower_item(child, parent, scope);
                        }
                    } else {
                        self.lower_item(body, parent, scope);
                    }
                }
            }
            "template_declaration" | "declaration_list" | "field_declaration_list" => {
                for child in named_children(item) {
                    self.lower_item(child, parent, scope);
                }
            }
            kind if PREPROC_CONDITIONALS.contains(kind) => {
                for child in preproc_contents(item) {
                    self.lower_item(child, parent, scope);
                }
            }
            "ERROR" => {
                self.add(NodeKind::Error, Role::None, parent, item, scope);
            }
            "expression_statement" | "compound_statement" | "if_statement" | "while_statement"
            | "for_statement" | "do_statement" | "switch_statement" | "return_statement" => {
                self.lower_statement(item, parent, scope, Role::None);
            }
            _ => {}
        }
    }

    fn lower_namespace(&mut self, item: TsNode<'_>, parent: NodeId, scope: ScopeId) {
        let node = self.add(NodeKind::Namespace, Role::None, parent, item, scope);
        let ns_scope = self.tu.add_scope(ScopeKind::Namespace, node, scope);
        if let Some(name) = item.child_by_field_name("name") {
            let text = self.text(name).to_string();
            self.tu.add_decl(
                text,
                DeclKind::Namespace,
                node,
                scope,
                Storage::Global,
                name.start_byte(),
            );
        }
        if let Some(body) = item.child_by_field_name("body") {
            for child in named_children(body) {
                self.lower_item(child, node, ns_scope);
            }
        }
    }

    /// Lower a struct/class/union/enum specifier that carries a body.
    fn lower_specifier(&mut self, spec: TsNode<'_>, parent: NodeId, scope: ScopeId) {
        let Some(body) = spec.child_by_field_name("body") else {
            return;
        };
        if spec.kind() == "enum_specifier" {
            self.lower_enum(spec, body, parent, scope);
            return;
        }

        let node = self.add(NodeKind::Record, Role::None, parent, spec, scope);
        let record_scope = self.tu.add_scope(ScopeKind::Record, node, scope);
        if let Some(name) = spec.child_by_field_name("name") {
            let text = unqualified_name(name, self.source()).to_string();
            self.tu.add_decl(
                text.clone(),
                DeclKind::Record,
                node,
                scope,
                Storage::Global,
                name.start_byte(),
            );
            self.records.insert(text, record_scope);
        }
        for member in named_children(body) {
            self.lower_item(member, node, record_scope);
        }
    }

    fn lower_enum(&mut self, spec: TsNode<'_>, body: TsNode<'_>, parent: NodeId, scope: ScopeId) {
        let node = self.add(NodeKind::Enum, Role::None, parent, spec, scope);
        let scoped = {
            let mut cursor = spec.walk();
            let scoped = spec
                .children(&mut cursor)
                .any(|c| matches!(c.kind(), "class" | "struct"));
            scoped
        };
        let mut constant_scope = scope;
        if let Some(name) = spec.child_by_field_name("name") {
            let text = unqualified_name(name, self.source()).to_string();
            let enum_scope = self.tu.add_scope(ScopeKind::Record, node, scope);
            self.tu.add_decl(
                text,
                DeclKind::Record,
                node,
                scope,
                Storage::Global,
                name.start_byte(),
            );
            if scoped {
                constant_scope = enum_scope;
            }
        }
        for enumerator in named_children(body) {
            if enumerator.kind() != "enumerator" {
                continue;
            }
            let Some(name) = enumerator.child_by_field_name("name") else {
                continue;
            };
            let constant = self.add(NodeKind::EnumConstant, Role::None, node, enumerator, scope);
            let text = self.text(name).to_string();
            self.tu.add_decl(
                text,
                DeclKind::EnumConstant,
                constant,
                constant_scope,
                Storage::Global,
                name.start_byte(),
            );
            if let Some(value) = enumerator.child_by_field_name("value") {
                self.lower_expr(value, constant, scope, Role::Init);
            }
        }
    }

    /// Lower the declarators of a declaration as children of `parent`.
    fn lower_declaration(&mut self, decl: TsNode<'_>, parent: NodeId, scope: ScopeId) {
        if let Some(ty) = decl.child_by_field_name("type") {
            self.lower_specifier(ty, parent, scope);
        }
        let source = self.source();
        let is_static = has_storage_class(decl, source, "static");
        let is_extern = has_storage_class(decl, source, "extern");
        let local = self.is_local(scope);
        let in_record = self.tu.scope(scope).kind == ScopeKind::Record;

        let declarators: Vec<TsNode<'_>> = {
            let mut cursor = decl.walk();
            let found = decl.children_by_field_name("declarator", &mut cursor).collect();
            found
        };
        for declarator in declarators {
            let Some(info) = declarator_info(declarator) else {
                continue;
            };
            let name = unqualified_name(info.name, self.source()).to_string();

            if info.is_function {
                let kind = if in_record {
                    NodeKind::Method
                } else {
                    NodeKind::Function
                };
                let node = self.add(kind, Role::None, parent, declarator, scope);
                if info.name.kind() != "qualified_identifier" {
                    self.tu.add_decl(
                        name,
                        DeclKind::Function,
                        node,
                        scope,
                        Storage::Global,
                        info.name.start_byte(),
                    );
                }
                continue;
            }

            let (kind, decl_kind, storage) = if in_record {
                (NodeKind::Field, DeclKind::Field, Storage::Global)
            } else if local && is_static {
                (NodeKind::Var, DeclKind::Variable, Storage::Static)
            } else if local && !is_extern {
                (NodeKind::Var, DeclKind::Variable, Storage::Automatic)
            } else {
                (NodeKind::Var, DeclKind::Variable, Storage::Global)
            };
            let node = self.add(kind, Role::None, parent, declarator, scope);
            self.tu
                .add_decl(name, decl_kind, node, scope, storage, info.name.start_byte());

            for size in info.array_sizes {
                self.lower_expr(size, node, scope, Role::Index);
            }
            // `init_declarator` carries the initializer; condition and field
            // declarations carry it on the declaration itself.
            let value = declarator
                .child_by_field_name("value")
                .or_else(|| decl.child_by_field_name("value"))
                .or_else(|| decl.child_by_field_name("default_value"));
            if let Some(value) = value {
                self.lower_initializer(value, node, scope);
            }
        }
    }

    /// One `OtherDecl` per name a `typedef` or alias declaration introduces.
    fn lower_type_alias(&mut self, item: TsNode<'_>, parent: NodeId, scope: ScopeId) {
        let names: Vec<TsNode<'_>> = if item.kind() == "alias_declaration" {
            item.child_by_field_name("name").into_iter().collect()
        } else {
            let mut cursor = item.walk();
            let found = item
                .children_by_field_name("declarator", &mut cursor)
                .filter_map(|d| declarator_info(d).map(|info| info.name))
                .collect();
            found
        };
        if names.is_empty() {
            self.add(NodeKind::OtherDecl, Role::None, parent, item, scope);
        }
        for name in names {
            let node = self.add(NodeKind::OtherDecl, Role::None, parent, item, scope);
            let text = unqualified_name(name, self.source()).to_string();
            self.tu
                .add_decl(text, DeclKind::Type, node, scope, Storage::Global, name.start_byte());
        }
    }

    fn lower_initializer(&mut self, value: TsNode<'_>, parent: NodeId, scope: ScopeId) {
        if value.kind() == "argument_list" {
            for arg in named_children(value) {
                self.lower_expr(arg, parent, scope, Role::Init);
            }
        } else {
            self.lower_expr(value, parent, scope, Role::Init);
        }
    }

    fn lower_params(&mut self, params: TsNode<'_>, parent: NodeId, scope: ScopeId) {
        for param in named_children(params) {
            if !matches!(
                param.kind(),
                "parameter_declaration" | "optional_parameter_declaration"
            ) {
                continue;
            }
            let info = param
                .child_by_field_name("declarator")
                .and_then(declarator_info);
            let node = self.add(NodeKind::Param, Role::None, parent, param, scope);
            if let Some(info) = info {
                let name = self.text(info.name).to_string();
                self.tu.add_decl(
                    name,
                    DeclKind::Parameter,
                    node,
                    scope,
                    Storage::Automatic,
                    info.name.start_byte(),
                );
            }
            if let Some(default) = param.child_by_field_name("default_value") {
                self.lower_expr(default, node, scope, Role::Init);
            }
        }
    }

    fn lower_function(&mut self, def: TsNode<'_>, parent: NodeId, scope: ScopeId) {
        let Some(info) = def
            .child_by_field_name("declarator")
            .and_then(declarator_info)
        else {
            return;
        };
        let source = self.source();
        let name = unqualified_name(info.name, source).to_string();
        let qualifier = if info.name.kind() == "qualified_identifier" {
            let mut path = qualified_path(info.name, source);
            path.pop();
            path.pop().filter(|q| !q.is_empty())
        } else {
            None
        };

        let in_record = self.tu.scope(scope).kind == ScopeKind::Record;
        let owner_scope = qualifier
            .as_ref()
            .and_then(|q| self.records.get(q).copied());
        let is_method = in_record || owner_scope.is_some() || info.name.kind() == "destructor_name";
        let kind = if is_method {
            NodeKind::Method
        } else {
            NodeKind::Function
        };

        let node = self.add(kind, Role::None, parent, def, scope);
        if qualifier.is_none() {
            self.tu.add_decl(
                name.clone(),
                DeclKind::Function,
                node,
                scope,
                Storage::Global,
                info.name.start_byte(),
            );
        } else {
            self.tu.node_mut(node).name = Some(name.clone());
        }

        let fn_scope = self.tu.add_scope(ScopeKind::Function, node, scope);
        self.tu.scope_mut(fn_scope).semantic_parent = owner_scope;

        if let Some(params) = find_parameters(def) {
            self.lower_params(params, node, fn_scope);
        }
        let mut cursor = def.walk();
        let initializers: Vec<_> = def
            .children(&mut cursor)
            .filter(|c| c.kind() == "field_initializer_list")
            .collect();
        for list in initializers {
            for init in named_children(list) {
                for arg in named_children(init).into_iter().skip(1) {
                    self.lower_initializer(arg, node, fn_scope);
                }
            }
        }

        let Some(body) = def.child_by_field_name("body") else {
            return;
        };
        let Some(body_id) = self.lower_statement(body, node, fn_scope, Role::Body) else {
            return;
        };

        let class_name = if in_record {
            self.tu.node(self.tu.scope(scope).node).name.clone()
        } else {
            qualifier
        };
        let is_pure = class_name
            .map(|c| self.prepass.pure_methods.contains(&(c, name.clone())))
            .unwrap_or(false);
        let is_global = !is_method
            && !has_storage_class(def, source, "static")
            && !self.prepass.static_functions.contains(&name)
            && !self.in_anonymous_namespace(scope);

        let return_type = return_type_text(def, &info.pointer_suffix, source);
        self.tu.push_function(FunctionInfo {
            node,
            name,
            return_type,
            is_pure,
            is_global,
            body: body_id,
        });
    }

    // --- statements -------------------------------------------------------

    /// Lower a statement; returns `None` for nodes that produce nothing.
    fn lower_statement(
        &mut self,
        stmt: TsNode<'_>,
        parent: NodeId,
        scope: ScopeId,
        role: Role,
    ) -> Option<NodeId> {
        let id = match stmt.kind() {
            "compound_statement" => {
                let node = self.add(NodeKind::Compound, role, parent, stmt, scope);
                let block = self.tu.add_scope(ScopeKind::Block, node, scope);
                self.lower_block_items(stmt, node, block);
                node
            }
            "expression_statement" => match first_named(stmt) {
                Some(expr) => {
                    let node = self.lower_expr(expr, parent, scope, role);
                    self.tu.node_mut(node).span = Span::from_node(stmt);
                    node
                }
                None => self.add(NodeKind::Null, role, parent, stmt, scope),
            },
            "declaration" => {
                let node = self.add(NodeKind::DeclStmt, role, parent, stmt, scope);
                self.lower_declaration(stmt, node, scope);
                node
            }
            "type_definition" | "alias_declaration" | "using_declaration"
            | "namespace_alias_definition" | "static_assert_declaration" => {
                let node = self.add(NodeKind::DeclStmt, role, parent, stmt, scope);
                if let Some(ty) = stmt.child_by_field_name("type") {
                    self.lower_specifier(ty, node, scope);
                }
                if matches!(stmt.kind(), "type_definition" | "alias_declaration") {
                    self.lower_type_alias(stmt, node, scope);
                } else {
                    self.add(NodeKind::OtherDecl, Role::None, node, stmt, scope);
                }
                node
            }
            "struct_specifier" | "union_specifier" | "class_specifier" | "enum_specifier" => {
                let node = self.add(NodeKind::DeclStmt, role, parent, stmt, scope);
                self.lower_specifier(stmt, node, scope);
                node
            }
            "if_statement" => {
                let node = self.add(NodeKind::If, role, parent, stmt, scope);
                let inner = self.lower_condition(stmt, node, scope);
                if let Some(then) = stmt.child_by_field_name("consequence") {
                    self.lower_statement(then, node, inner, Role::Then);
                }
                if let Some(alt) = stmt.child_by_field_name("alternative") {
                    let alt = if alt.kind() == "else_clause" {
                        first_named(alt)
                    } else {
                        Some(alt)
                    };
                    if let Some(alt) = alt {
                        self.lower_statement(alt, node, inner, Role::Else);
                    }
                }
                node
            }
            "while_statement" => {
                let node = self.add(NodeKind::While, role, parent, stmt, scope);
                let inner = self.lower_condition(stmt, node, scope);
                if let Some(body) = stmt.child_by_field_name("body") {
                    self.lower_statement(body, node, inner, Role::Body);
                }
                node
            }
            "do_statement" => {
                let node = self.add(NodeKind::Do, role, parent, stmt, scope);
                if let Some(body) = stmt.child_by_field_name("body") {
                    self.lower_statement(body, node, scope, Role::Body);
                }
                self.lower_condition(stmt, node, scope);
                node
            }
            "for_statement" => {
                let node = self.add(NodeKind::For, role, parent, stmt, scope);
                let inner = self.tu.add_scope(ScopeKind::Statement, node, scope);
                if let Some(init) = stmt.child_by_field_name("initializer") {
                    self.lower_header_part(init, node, inner, Role::Init);
                }
                if let Some(cond) = stmt.child_by_field_name("condition") {
                    self.lower_header_part(cond, node, inner, Role::Condition);
                }
                if let Some(update) = stmt.child_by_field_name("update") {
                    self.lower_expr(update, node, inner, Role::Increment);
                }
                if let Some(body) = stmt.child_by_field_name("body") {
                    self.lower_statement(body, node, inner, Role::Body);
                }
                node
            }
            "for_range_loop" => {
                let node = self.add(NodeKind::ForRange, role, parent, stmt, scope);
                let inner = self.tu.add_scope(ScopeKind::Statement, node, scope);
                if let Some(init) = stmt.child_by_field_name("initializer") {
                    self.lower_header_part(init, node, inner, Role::Init);
                }
                if let Some(right) = stmt.child_by_field_name("right") {
                    self.lower_expr(right, node, inner, Role::RangeInit);
                }
                if let Some(declarator) = stmt.child_by_field_name("declarator") {
                    self.lower_loop_variable(stmt, declarator, node, inner);
                }
                if let Some(body) = stmt.child_by_field_name("body") {
                    self.lower_statement(body, node, inner, Role::Body);
                }
                node
            }
            "switch_statement" => {
                let node = self.add(NodeKind::Switch, role, parent, stmt, scope);
                let inner = self.lower_condition(stmt, node, scope);
                if let Some(body) = stmt.child_by_field_name("body") {
                    self.lower_statement(body, node, inner, Role::Body);
                }
                node
            }
            "case_statement" => {
                // Only reached for a case that is not directly inside a block.
                let node = self.lower_case_label(stmt, parent, scope, role);
                for child in case_body(stmt) {
                    self.lower_statement(child, node, scope, Role::Body);
                }
                node
            }
            "break_statement" => self.add(NodeKind::Break, role, parent, stmt, scope),
            "continue_statement" => self.add(NodeKind::Continue, role, parent, stmt, scope),
            "return_statement" => {
                let node = self.add(NodeKind::Return, role, parent, stmt, scope);
                if let Some(value) = first_named(stmt) {
                    self.lower_expr(value, node, scope, Role::Value);
                }
                node
            }
            "goto_statement" => {
                let node = self.add(NodeKind::Goto, role, parent, stmt, scope);
                let label = stmt.child_by_field_name("label").map(|l| self.text(l).to_string());
                self.tu.node_mut(node).name = label;
                node
            }
            "labeled_statement" => {
                let node = self.add(NodeKind::Label, role, parent, stmt, scope);
                let label = stmt.child_by_field_name("label");
                self.tu.node_mut(node).name = label.map(|l| self.text(l).to_string());
                let label_id = label.map(|l| l.id());
                for child in named_children(stmt) {
                    if Some(child.id()) != label_id {
                        self.lower_statement(child, node, scope, Role::Body);
                    }
                }
                node
            }
            "throw_statement" => {
                let node = self.add(NodeKind::Throw, role, parent, stmt, scope);
                if let Some(value) = first_named(stmt) {
                    self.lower_expr(value, node, scope, Role::Operand);
                }
                node
            }
            "try_statement" => {
                let node = self.add(NodeKind::Try, role, parent, stmt, scope);
                if let Some(body) = stmt.child_by_field_name("body") {
                    self.lower_statement(body, node, scope, Role::Body);
                }
                for clause in named_children(stmt) {
                    if clause.kind() == "catch_clause" {
                        self.lower_catch(clause, node, scope);
                    }
                }
                node
            }
            "attributed_statement" => {
                let inner = named_children(stmt)
                    .into_iter()
                    .rfind(|c| c.kind() != "attribute_declaration")?;
                return self.lower_statement(inner, parent, scope, role);
            }
            "ERROR" => self.add(NodeKind::Error, role, parent, stmt, scope),
            "comment" | "preproc_include" | "preproc_def" | "preproc_function_def"
            | "preproc_call" => return None,
            kind if PREPROC_CONDITIONALS.contains(kind) => {
                let node = self.add(NodeKind::OtherStmt, role, parent, stmt, scope);
                for child in preproc_contents(stmt) {
                    self.lower_statement(child, node, scope, Role::None);
                }
                node
            }
            _ => {
                let node = self.add(NodeKind::OtherStmt, role, parent, stmt, scope);
                for child in named_children(stmt) {
                    if !TYPE_KINDS.contains(child.kind()) {
                        self.lower_expr(child, node, scope, Role::None);
                    }
                }
                node
            }
        };
        Some(id)
    }

    /// Lower the items of a block, flattening case labels and preprocessor
    /// conditionals into it.
    fn lower_block_items(&mut self, block: TsNode<'_>, node: NodeId, scope: ScopeId) {
        for item in named_children(block) {
            match item.kind() {
                "case_statement" => {
                    let label = self.lower_case_label(item, node, scope, Role::None);
                    let mut body = case_body(item).into_iter();
                    if let Some(first) = body.next() {
                        self.lower_statement(first, label, scope, Role::Body);
                    }
                    for rest in body {
                        self.lower_statement(rest, node, scope, Role::None);
                    }
                }
                kind if PREPROC_CONDITIONALS.contains(kind) => {
                    self.lower_block_items(item, node, scope);
                }
                _ => {
                    if item.kind() == "function_definition" {
                        continue;
                    }
                    if is_preproc_condition(item) {
                        continue;
                    }
                    self.lower_statement(item, node, scope, Role::None);
                }
            }
        }
    }

    fn lower_case_label(
        &mut self,
        stmt: TsNode<'_>,
        parent: NodeId,
        scope: ScopeId,
        role: Role,
    ) -> NodeId {
        match stmt.child_by_field_name("value") {
            Some(value) => {
                let node = self.add(NodeKind::Case, role, parent, stmt, scope);
                self.lower_expr(value, node, scope, Role::Value);
                node
            }
            None => self.add(NodeKind::Default, role, parent, stmt, scope),
        }
    }

    fn lower_catch(&mut self, clause: TsNode<'_>, parent: NodeId, scope: ScopeId) {
        let node = self.add(NodeKind::Catch, Role::Handler, parent, clause, scope);
        let inner = self.tu.add_scope(ScopeKind::Statement, node, scope);
        if let Some(params) = clause.child_by_field_name("parameters") {
            for param in named_children(params) {
                let Some(info) = param
                    .child_by_field_name("declarator")
                    .and_then(declarator_info)
                else {
                    continue;
                };
                let var = self.add(NodeKind::Var, Role::None, node, param, inner);
                let name = self.text(info.name).to_string();
                self.tu.add_decl(
                    name,
                    DeclKind::Variable,
                    var,
                    inner,
                    Storage::Automatic,
                    info.name.start_byte(),
                );
            }
        }
        if let Some(body) = clause.child_by_field_name("body") {
            self.lower_statement(body, node, inner, Role::Body);
        }
    }

    /// Lower the condition of an `if`/`while`/`do`/`switch`; returns the scope
    /// for the rest of the statement.
    fn lower_condition(&mut self, stmt: TsNode<'_>, node: NodeId, scope: ScopeId) -> ScopeId {
        let Some(cond) = stmt.child_by_field_name("condition") else {
            return scope;
        };
        match cond.kind() {
            "condition_clause" => {
                let inner = self.tu.add_scope(ScopeKind::Statement, node, scope);
                if let Some(init) = cond.child_by_field_name("initializer") {
                    self.lower_header_part(init, node, inner, Role::Init);
                }
                if let Some(value) = cond.child_by_field_name("value") {
                    self.lower_header_part(value, node, inner, Role::Condition);
                }
                inner
            }
            "parenthesized_expression" => {
                if let Some(inner) = first_named(cond) {
                    self.lower_header_part(inner, node, scope, Role::Condition);
                }
                scope
            }
            _ => {
                self.lower_header_part(cond, node, scope, Role::Condition);
                scope
            }
        }
    }

    /// Lower an init statement or condition, which may be a declaration.
    fn lower_header_part(&mut self, part: TsNode<'_>, node: NodeId, scope: ScopeId, role: Role) {
        match part.kind() {
            "declaration" | "condition_declaration" => {
                let decl_stmt = self.add(NodeKind::DeclStmt, role, node, part, scope);
                self.lower_declaration(part, decl_stmt, scope);
            }
            "init_statement" | "expression_statement" => {
                if let Some(inner) = first_named(part) {
                    self.lower_header_part(inner, node, scope, role);
                }
            }
            "type_definition" | "alias_declaration" => {
                let decl_stmt = self.add(NodeKind::DeclStmt, role, node, part, scope);
                self.lower_type_alias(part, decl_stmt, scope);
            }
            _ => {
                self.lower_expr(part, node, scope, role);
            }
        }
    }

    fn lower_loop_variable(
        &mut self,
        stmt: TsNode<'_>,
        declarator: TsNode<'_>,
        node: NodeId,
        scope: ScopeId,
    ) {
        let span = match (
            stmt.child_by_field_name("type").and_then(Span::from_node),
            Span::from_node(declarator),
        ) {
            (Some(ty), Some(decl)) => Some(ty.cover(&decl)),
            (_, decl) => decl,
        };
        let decl_stmt = self
            .tu
            .add_node(NodeKind::DeclStmt, Role::LoopVariable, Some(node), span, scope);
        let Some(info) = declarator_info(declarator) else {
            return;
        };
        let var = self.add(NodeKind::Var, Role::None, decl_stmt, declarator, scope);
        let name = self.text(info.name).to_string();
        self.tu.add_decl(
            name,
            DeclKind::Variable,
            var,
            scope,
            Storage::Automatic,
            info.name.start_byte(),
        );
    }

    // --- expressions ------------------------------------------------------

    fn lower_expr(&mut self, expr: TsNode<'_>, parent: NodeId, scope: ScopeId, role: Role) -> NodeId {
        let kind = expr.kind();
        if let Some(leaf) = LEAF_KINDS.get(kind) {
            return self.add(*leaf, role, parent, expr, scope);
        }
        match kind {
            "identifier" | "field_identifier" | "qualified_identifier" | "template_function" => {
                let node = self.add(NodeKind::DeclRef, role, parent, expr, scope);
                let path = qualified_path(expr, self.source());
                self.tu.node_mut(node).name = path.last().cloned();
                self.refs.push(PendingRef {
                    node,
                    scope,
                    path,
                    position: expr.start_byte(),
                });
                node
            }
            "number_literal" => {
                let kind = if is_floating_literal(self.text(expr)) {
                    NodeKind::FloatingLiteral
                } else {
                    NodeKind::IntegerLiteral
                };
                self.add(kind, role, parent, expr, scope)
            }
            "parenthesized_expression" => {
                let node = self.add(NodeKind::Paren, role, parent, expr, scope);
                if let Some(inner) = first_named(expr) {
                    self.lower_expr(inner, node, scope, Role::Operand);
                }
                node
            }
            "assignment_expression" | "binary_expression" | "comma_expression" => {
                let op = match expr.child_by_field_name("operator") {
                    Some(op) => self.text(op).to_string(),
                    None => ",".to_string(),
                };
                let kind = if kind == "assignment_expression" && op != "=" {
                    NodeKind::CompoundAssignOperator
                } else {
                    NodeKind::BinaryOperator
                };
                let node = self.add(kind, role, parent, expr, scope);
                self.tu.node_mut(node).operator = Some(op);
                if let Some(left) = expr.child_by_field_name("left") {
                    self.lower_expr(left, node, scope, Role::Lhs);
                }
                if let Some(right) = expr.child_by_field_name("right") {
                    self.lower_expr(right, node, scope, Role::Rhs);
                }
                node
            }
            "unary_expression" | "pointer_expression" | "update_expression" => {
                let node = self.add(NodeKind::UnaryOperator, role, parent, expr, scope);
                let op = expr
                    .child_by_field_name("operator")
                    .map(|op| self.text(op).to_string());
                self.tu.node_mut(node).operator = op;
                if let Some(arg) = expr.child_by_field_name("argument") {
                    self.lower_expr(arg, node, scope, Role::Operand);
                }
                node
            }
            "conditional_expression" => {
                let node = self.add(NodeKind::ConditionalOperator, role, parent, expr, scope);
                for (field, role) in [
                    ("condition", Role::Condition),
                    ("consequence", Role::Then),
                    ("alternative", Role::Else),
                ] {
                    if let Some(part) = expr.child_by_field_name(field) {
                        self.lower_expr(part, node, scope, role);
                    }
                }
                node
            }
            "call_expression" => {
                let callee = expr.child_by_field_name("function");
                let kind = match callee.map(|c| c.kind()) {
                    Some("field_expression") => NodeKind::MemberCall,
                    _ => NodeKind::Call,
                };
                let node = self.add(kind, role, parent, expr, scope);
                if let Some(callee) = callee {
                    self.lower_expr(callee, node, scope, Role::Callee);
                }
                if let Some(args) = expr.child_by_field_name("arguments") {
                    for arg in named_children(args) {
                        self.lower_expr(arg, node, scope, Role::Argument);
                    }
                }
                node
            }
            "field_expression" => {
                let node = self.add(NodeKind::Member, role, parent, expr, scope);
                let name = expr
                    .child_by_field_name("field")
                    .map(|f| unqualified_name(f, self.source()).to_string());
                let op = expr
                    .child_by_field_name("operator")
                    .map(|op| self.text(op).to_string());
                let n = self.tu.node_mut(node);
                n.name = name;
                n.operator = op;
                if let Some(base) = expr.child_by_field_name("argument") {
                    self.lower_expr(base, node, scope, Role::Base);
                }
                node
            }
            "subscript_expression" => {
                let node = self.add(NodeKind::ArraySubscript, role, parent, expr, scope);
                if let Some(base) = expr.child_by_field_name("argument") {
                    self.lower_expr(base, node, scope, Role::Base);
                }
                if let Some(index) = expr.child_by_field_name("index") {
                    self.lower_expr(index, node, scope, Role::Index);
                } else if let Some(indices) = expr.child_by_field_name("indices") {
                    for index in named_children(indices) {
                        self.lower_expr(index, node, scope, Role::Index);
                    }
                }
                node
            }
            "cast_expression" => {
                let node = self.add(NodeKind::CStyleCast, role, parent, expr, scope);
                if let Some(value) = expr.child_by_field_name("value") {
                    self.lower_expr(value, node, scope, Role::Operand);
                }
                node
            }
            "sizeof_expression" | "alignof_expression" => {
                let node = self.add(NodeKind::SizeOf, role, parent, expr, scope);
                if let Some(value) = expr.child_by_field_name("value") {
                    self.lower_expr(value, node, scope, Role::Operand);
                }
                node
            }
            "initializer_list" => {
                let node = self.add(NodeKind::InitList, role, parent, expr, scope);
                for element in named_children(expr) {
                    let element = match element.kind() {
                        "initializer_pair" => match element.child_by_field_name("value") {
                            Some(value) => value,
                            None => continue,
                        },
                        _ => element,
                    };
                    self.lower_expr(element, node, scope, Role::Argument);
                }
                node
            }
            "compound_literal_expression" => {
                let node = self.add(NodeKind::CompoundLiteral, role, parent, expr, scope);
                if let Some(value) = expr.child_by_field_name("value") {
                    self.lower_expr(value, node, scope, Role::Operand);
                }
                node
            }
            "new_expression" => {
                let node = self.add(NodeKind::New, role, parent, expr, scope);
                for field in ["placement", "arguments"] {
                    if let Some(args) = expr.child_by_field_name(field) {
                        if args.kind() == "initializer_list" {
                            self.lower_expr(args, node, scope, Role::Argument);
                        } else {
                            for arg in named_children(args) {
                                self.lower_expr(arg, node, scope, Role::Argument);
                            }
                        }
                    }
                }
                node
            }
            "delete_expression" => {
                let node = self.add(NodeKind::Delete, role, parent, expr, scope);
                if let Some(operand) = named_children(expr).pop() {
                    self.lower_expr(operand, node, scope, Role::Operand);
                }
                node
            }
            "lambda_expression" => self.lower_lambda(expr, parent, scope, role),
            "ERROR" => self.add(NodeKind::Error, role, parent, expr, scope),
            _ => {
                let node = self.add(NodeKind::OtherExpr, role, parent, expr, scope);
                for child in named_children(expr) {
                    if !TYPE_KINDS.contains(child.kind()) {
                        self.lower_expr(child, node, scope, Role::None);
                    }
                }
                node
            }
        }
    }

    fn lower_lambda(&mut self, expr: TsNode<'_>, parent: NodeId, scope: ScopeId, role: Role) -> NodeId {
        let node = self.add(NodeKind::Lambda, role, parent, expr, scope);
        let fn_scope = self.tu.add_scope(ScopeKind::Function, node, scope);
        if let Some(params) = expr
            .child_by_field_name("declarator")
            .and_then(|d| d.child_by_field_name("parameters"))
        {
            self.lower_params(params, node, fn_scope);
        }
        if let Some(body) = expr.child_by_field_name("body") {
            self.lower_statement(body, node, fn_scope, Role::Body);
        }
        node
    }
}

/// Children of a preprocessor conditional that belong to the enclosing code.
fn preproc_contents(node: TsNode<'_>) -> Vec<TsNode<'_>> {
    let skip: Vec<usize> = ["condition", "name"]
        .iter()
        .filter_map(|f| node.child_by_field_name(f))
        .map(|n| n.id())
        .collect();
    let mut out = Vec::new();
    for child in named_children(node) {
        if skip.contains(&child.id()) {
            continue;
        }
        if PREPROC_CONDITIONALS.contains(child.kind()) {
            out.extend(preproc_contents(child));
        } else {
            out.push(child);
        }
    }
    out
}

/// Condition expressions of preprocessor conditionals seen from a block.
fn is_preproc_condition(node: TsNode<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    if !PREPROC_CONDITIONALS.contains(parent.kind()) {
        return false;
    }
    ["condition", "name"]
        .iter()
        .filter_map(|f| parent.child_by_field_name(f))
        .any(|n| n.id() == node.id())
}

/// Statements following a `case`/`default` label.
fn case_body(stmt: TsNode<'_>) -> Vec<TsNode<'_>> {
    let value = stmt.child_by_field_name("value").map(|v| v.id());
    named_children(stmt)
        .into_iter()
        .filter(|c| Some(c.id()) != value)
        .collect()
}

fn find_parameters(def: TsNode<'_>) -> Option<TsNode<'_>> {
    let mut current = def.child_by_field_name("declarator")?;
    loop {
        match current.kind() {
            "function_declarator" => return current.child_by_field_name("parameters"),
            "pointer_declarator" | "array_declarator" | "init_declarator" => {
                current = current.child_by_field_name("declarator")?;
            }
            "reference_declarator" | "parenthesized_declarator" | "attributed_declarator" => {
                current = first_named(current)?;
            }
            _ => return None,
        }
    }
}

fn return_type_text(def: TsNode<'_>, pointer_suffix: &str, source: &[u8]) -> String {
    let Some(ty) = def.child_by_field_name("type") else {
        return "void".to_string();
    };
    let mut parts: Vec<&str> = Vec::new();
    let mut cursor = def.walk();
    for child in def.children(&mut cursor) {
        if child.id() == ty.id() {
            break;
        }
        if child.kind() == "type_qualifier" {
            parts.push(child.utf8_text(source).unwrap_or(""));
        }
    }
    let ty_text = ty.utf8_text(source).unwrap_or("");
    let normalized = ty_text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut text = parts.join(" ");
    if !text.is_empty() {
        text.push(' ');
    }
    text.push_str(&normalized);
    if !pointer_suffix.is_empty() {
        text.push(' ');
        text.push_str(pointer_suffix);
    }
    text
}

fn is_floating_literal(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    if lower.starts_with("0x") {
        return lower.contains('p') || lower.contains('.');
    }
    lower.contains('.') || lower.contains('e')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floating_literal_detection() {
        assert!(is_floating_literal("1.5"));
        assert!(is_floating_literal("1e10"));
        assert!(is_floating_literal("0x1p3"));
        assert!(!is_floating_literal("0xE"));
        assert!(!is_floating_literal("42u"));
    }
}
