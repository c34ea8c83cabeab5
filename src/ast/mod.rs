//! Parser-independent syntax graph.
//!
//! A [`TranslationUnit`] is an arena of [`Node`]s with parent links, resolved
//! declaration references and lexical declaration contexts ([`Scope`]s).
//! Frontends (see `analysis::languages`) lower their concrete syntax trees
//! into this graph; every analysis in the crate works on it alone.

mod kind;
mod source;

pub use kind::{NodeKind, Role};
pub use source::{Location, ParseLocationError, Point, SourceFile, Span};

/// Index of a node in its translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

/// Index of a declaration in its translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(u32);

/// Index of a declaration context in its translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

macro_rules! arena_index {
    ($($ty:ident),*) => {$(
        impl $ty {
            pub fn index(self) -> usize {
                self.0 as usize
            }

            fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }
    )*};
}

arena_index!(NodeId, DeclId, ScopeId);

/// A node of the syntax graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub role: Role,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// `None` for synthetic nodes without real source text.
    pub span: Option<Span>,
    /// Innermost declaration context enclosing this node.
    pub scope: ScopeId,
    /// Operator spelling for operator expressions (`=`, `+=`, `++`, `->`, ...).
    pub operator: Option<String>,
    /// Referenced or declared name, or the member name of a `MemberExpr`.
    pub name: Option<String>,
    /// Declaration a reference resolves to.
    pub referent: Option<DeclId>,
    /// Declaration introduced by this node.
    pub declared: Option<DeclId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Variable,
    Parameter,
    Field,
    Function,
    EnumConstant,
    Record,
    Namespace,
    /// `typedef` and alias names.
    Type,
}

impl DeclKind {
    /// Variables, parameters and fields: the entities facts talk about.
    pub fn is_value(&self) -> bool {
        matches!(self, DeclKind::Variable | DeclKind::Parameter | DeclKind::Field)
    }
}

/// Storage duration of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Storage {
    /// Block-scope locals and parameters.
    Automatic,
    /// `static` locals.
    Static,
    /// Namespace-scope variables, fields and everything else.
    Global,
}

#[derive(Debug, Clone)]
pub struct Decl {
    pub name: String,
    pub kind: DeclKind,
    pub node: NodeId,
    pub scope: ScopeId,
    pub storage: Storage,
    /// Byte offset of the declared name; block-scope names are visible after it.
    pub position: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    TranslationUnit,
    Namespace,
    Record,
    Function,
    Block,
    /// Scope of a `for`, `if`, `while`, `switch` or `catch` header.
    Statement,
}

impl ScopeKind {
    /// Whether names in this scope are only visible after their declaration.
    pub fn is_sequential(&self) -> bool {
        matches!(
            self,
            ScopeKind::Function | ScopeKind::Block | ScopeKind::Statement
        )
    }
}

/// A declaration context.
#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub node: NodeId,
    pub parent: Option<ScopeId>,
    /// Enclosing context for name lookup when it differs from the lexical
    /// one (the class of an out-of-line method definition).
    pub semantic_parent: Option<ScopeId>,
    pub decls: Vec<DeclId>,
}

impl Scope {
    /// Context searched after this one.
    pub fn lookup_parent(&self) -> Option<ScopeId> {
        self.semantic_parent.or(self.parent)
    }
}

/// A function or method definition.
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub node: NodeId,
    pub name: String,
    pub return_type: String,
    pub is_pure: bool,
    pub is_global: bool,
    pub body: NodeId,
}

/// Arena-allocated syntax graph of one source file.
#[derive(Debug, Clone)]
pub struct TranslationUnit {
    file: SourceFile,
    nodes: Vec<Node>,
    decls: Vec<Decl>,
    scopes: Vec<Scope>,
    functions: Vec<FunctionInfo>,
}

impl TranslationUnit {
    /// Create a unit holding only the root node and its scope.
    pub fn new(file: SourceFile) -> Self {
        let root_span = (!file.text().is_empty()).then(|| whole_file_span(file.text()));
        let mut tu = Self {
            file,
            nodes: Vec::new(),
            decls: Vec::new(),
            scopes: Vec::new(),
            functions: Vec::new(),
        };
        tu.nodes.push(Node {
            kind: NodeKind::TranslationUnit,
            role: Role::None,
            parent: None,
            children: Vec::new(),
            span: root_span,
            scope: ScopeId::from_index(0),
            operator: None,
            name: None,
            referent: None,
            declared: None,
        });
        tu.scopes.push(Scope {
            kind: ScopeKind::TranslationUnit,
            node: NodeId::from_index(0),
            parent: None,
            semantic_parent: None,
            decls: Vec::new(),
        });
        tu
    }

    pub fn root(&self) -> NodeId {
        NodeId::from_index(0)
    }

    pub fn root_scope(&self) -> ScopeId {
        ScopeId::from_index(0)
    }

    pub fn file(&self) -> &SourceFile {
        &self.file
    }

    pub fn file_mut(&mut self) -> &mut SourceFile {
        &mut self.file
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    // --- construction -----------------------------------------------------

    /// Append a node under `parent`.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        role: Role,
        parent: Option<NodeId>,
        span: Option<Span>,
        scope: ScopeId,
    ) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(Node {
            kind,
            role,
            parent,
            children: Vec::new(),
            span,
            scope,
            operator: None,
            name: None,
            referent: None,
            declared: None,
        });
        if let Some(parent) = parent {
            self.nodes[parent.index()].children.push(id);
        }
        id
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn add_scope(&mut self, kind: ScopeKind, node: NodeId, parent: ScopeId) -> ScopeId {
        let id = ScopeId::from_index(self.scopes.len());
        self.scopes.push(Scope {
            kind,
            node,
            parent: Some(parent),
            semantic_parent: None,
            decls: Vec::new(),
        });
        id
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    /// Register a declaration introduced by `node` in `scope`.
    pub fn add_decl(
        &mut self,
        name: String,
        kind: DeclKind,
        node: NodeId,
        scope: ScopeId,
        storage: Storage,
        position: usize,
    ) -> DeclId {
        let id = DeclId::from_index(self.decls.len());
        self.decls.push(Decl {
            name: name.clone(),
            kind,
            node,
            scope,
            storage,
            position,
        });
        self.scopes[scope.index()].decls.push(id);
        let n = &mut self.nodes[node.index()];
        n.declared = Some(id);
        if n.name.is_none() {
            n.name = Some(name);
        }
        id
    }

    pub fn push_function(&mut self, info: FunctionInfo) {
        self.functions.push(info);
    }

    // --- queries ----------------------------------------------------------

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.index()].kind
    }

    pub fn role(&self, id: NodeId) -> Role {
        self.nodes[id.index()].role
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// First child carrying `role`.
    pub fn child(&self, id: NodeId, role: Role) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| self.role(*c) == role)
    }

    /// All children carrying `role`, in source order.
    pub fn children_with(&self, id: NodeId, role: Role) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |c| self.role(*c) == role)
    }

    /// Strict ancestors, innermost first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tu: self,
            next: self.parent(id),
        }
    }

    /// The node and all of its descendants in pre-order.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tu: self,
            stack: vec![id],
        }
    }

    /// Every node id, in creation order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId::from_index)
    }

    pub fn source_range(&self, id: NodeId) -> Option<&Span> {
        self.nodes[id.index()].span.as_ref()
    }

    /// Exact source text of a node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.source_range(id).map(|span| self.file.slice(span))
    }

    pub fn location(&self, id: NodeId) -> Option<Location> {
        self.source_range(id).map(|span| self.file.location(span))
    }

    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }

    pub fn decls(&self) -> impl Iterator<Item = (DeclId, &Decl)> {
        self.decls
            .iter()
            .enumerate()
            .map(|(i, d)| (DeclId::from_index(i), d))
    }

    /// Declaration a reference node resolves to.
    pub fn referent(&self, id: NodeId) -> Option<&Decl> {
        self.nodes[id.index()].referent.map(|d| self.decl(d))
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn scope_ids(&self) -> impl Iterator<Item = ScopeId> {
        (0..self.scopes.len()).map(ScopeId::from_index)
    }

    /// Lookup chain starting at `scope`, innermost first.
    pub fn scope_chain(&self, scope: ScopeId) -> ScopeChain<'_> {
        ScopeChain {
            tu: self,
            next: Some(scope),
        }
    }

    pub fn functions(&self) -> &[FunctionInfo] {
        &self.functions
    }

    /// Innermost function, method or lambda containing a node.
    pub fn enclosing_function(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id).find(|a| self.kind(*a).is_function_like())
    }

    /// Skip parentheses and casts.
    pub fn ignore_parens_and_casts(&self, mut id: NodeId) -> NodeId {
        while matches!(
            self.kind(id),
            NodeKind::Paren | NodeKind::ImplicitCast | NodeKind::CStyleCast
        ) {
            match self.child(id, Role::Operand) {
                Some(inner) => id = inner,
                None => break,
            }
        }
        id
    }
}

fn whole_file_span(text: &str) -> Span {
    let end_line = text.matches('\n').count() + 1;
    let last_line_len = text.rsplit('\n').next().map(str::len).unwrap_or(0);
    Span {
        start_byte: 0,
        end_byte: text.len(),
        start_line: 1,
        start_col: 1,
        end_line,
        end_col: last_line_len + 1,
    }
}

pub struct Ancestors<'a> {
    tu: &'a TranslationUnit,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tu.parent(current);
        Some(current)
    }
}

pub struct Descendants<'a> {
    tu: &'a TranslationUnit,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.tu.children(current).iter().rev().copied());
        Some(current)
    }
}

pub struct ScopeChain<'a> {
    tu: &'a TranslationUnit,
    next: Option<ScopeId>,
}

impl Iterator for ScopeChain<'_> {
    type Item = ScopeId;

    fn next(&mut self) -> Option<ScopeId> {
        let current = self.next?;
        self.next = self.tu.scope(current).lookup_parent();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (TranslationUnit, NodeId, NodeId, NodeId) {
        let mut tu = TranslationUnit::new(SourceFile::new("t.c", "int x;".to_string()));
        let root = tu.root();
        let scope = tu.root_scope();
        let f = tu.add_node(NodeKind::Function, Role::None, Some(root), None, scope);
        let body = tu.add_node(NodeKind::Compound, Role::Body, Some(f), None, scope);
        let stmt = tu.add_node(NodeKind::Return, Role::None, Some(body), None, scope);
        (tu, f, body, stmt)
    }

    #[test]
    fn test_parent_links_and_roles() {
        let (tu, f, body, stmt) = sample();
        assert_eq!(tu.parent(stmt), Some(body));
        assert_eq!(tu.child(f, Role::Body), Some(body));
        assert_eq!(tu.ancestors(stmt).collect::<Vec<_>>(), vec![body, f, tu.root()]);
        assert_eq!(tu.enclosing_function(stmt), Some(f));
    }

    #[test]
    fn test_descendants_preorder() {
        let (tu, f, body, stmt) = sample();
        let order: Vec<_> = tu.descendants(tu.root()).collect();
        assert_eq!(order, vec![tu.root(), f, body, stmt]);
    }

    #[test]
    fn test_decl_registration() {
        let (mut tu, f, body, _) = sample();
        let fn_scope = tu.add_scope(ScopeKind::Function, f, tu.root_scope());
        let var = tu.add_node(NodeKind::Var, Role::None, Some(body), None, fn_scope);
        let decl = tu.add_decl("x".into(), DeclKind::Variable, var, fn_scope, Storage::Automatic, 4);
        assert_eq!(tu.node(var).declared, Some(decl));
        assert_eq!(tu.node(var).name.as_deref(), Some("x"));
        assert_eq!(tu.scope(fn_scope).decls, vec![decl]);
        assert_eq!(
            tu.scope_chain(fn_scope).collect::<Vec<_>>(),
            vec![fn_scope, tu.root_scope()]
        );
    }

    #[test]
    fn test_root_span_covers_file() {
        let tu = TranslationUnit::new(SourceFile::new("t.c", "a\nbc".to_string()));
        let span = tu.source_range(tu.root()).unwrap();
        assert_eq!((span.end_line, span.end_col), (2, 3));
        assert_eq!(tu.text(tu.root()), Some("a\nbc"));
    }
}
