//! Read/write/declaration classification of named entities in a statement.

use std::collections::BTreeSet;

use tracing::debug;

use crate::ast::{DeclKind, NodeId, NodeKind, Role, ScopeKind, TranslationUnit};
use crate::error::SkipReason;

/// Names read, written and declared by a statement.
///
/// Every declared name is also written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Accesses {
    pub reads: BTreeSet<String>,
    pub writes: BTreeSet<String>,
    pub decls: BTreeSet<String>,
}

/// How an assignment target is accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    /// Plain `=`: the old value is not read.
    Write,
    /// Compound assignment, `++`, `--`.
    ReadWrite,
}

/// Classify every variable, parameter and field occurrence under `stmt`.
pub fn analyze_accesses(tu: &TranslationUnit, stmt: NodeId) -> Accesses {
    let mut acc = Accesses::default();
    let mut stack = vec![stmt];
    while let Some(id) = stack.pop() {
        visit(tu, id, &mut acc, &mut stack);
    }
    acc
}

fn visit(tu: &TranslationUnit, id: NodeId, acc: &mut Accesses, stack: &mut Vec<NodeId>) {
    let node = tu.node(id);
    match node.kind {
        NodeKind::BinaryOperator if node.operator.as_deref() == Some("=") => {
            for child in tu.children(id).iter().rev() {
                if tu.role(*child) == Role::Lhs {
                    target(tu, *child, Target::Write, acc, stack);
                } else {
                    stack.push(*child);
                }
            }
        }
        NodeKind::CompoundAssignOperator => {
            for child in tu.children(id).iter().rev() {
                if tu.role(*child) == Role::Lhs {
                    target(tu, *child, Target::ReadWrite, acc, stack);
                } else {
                    stack.push(*child);
                }
            }
        }
        NodeKind::UnaryOperator if matches!(node.operator.as_deref(), Some("++" | "--")) => {
            match tu.child(id, Role::Operand) {
                Some(operand) => target(tu, operand, Target::ReadWrite, acc, stack),
                None => stack.extend(tu.children(id).iter().rev().copied()),
            }
        }
        NodeKind::DeclStmt | NodeKind::Var => {
            // A declaration statement declares every named entity directly
            // under it: variables, local prototypes, records, enums, typedefs.
            let declared = std::iter::once(id).chain(tu.children(id).iter().copied());
            for decl in declared.filter_map(|n| tu.node(n).declared) {
                let name = &tu.decl(decl).name;
                if !name.is_empty() {
                    acc.decls.insert(name.clone());
                    acc.writes.insert(name.clone());
                }
            }
            stack.extend(tu.children(id).iter().rev().copied());
        }
        NodeKind::DeclRef => {
            if let Some(name) = value_name(tu, id) {
                acc.reads.insert(name);
            }
        }
        NodeKind::Member => {
            if let Some(name) = resolve_member(tu, id, stack) {
                acc.reads.insert(name);
            }
        }
        _ => stack.extend(tu.children(id).iter().rev().copied()),
    }
}

/// Record the entity an assignment target denotes.
fn target(
    tu: &TranslationUnit,
    id: NodeId,
    mode: Target,
    acc: &mut Accesses,
    stack: &mut Vec<NodeId>,
) {
    let inner = tu.ignore_parens_and_casts(id);
    let name = match tu.kind(inner) {
        NodeKind::DeclRef => value_name(tu, inner),
        NodeKind::Member => resolve_member(tu, inner, stack),
        _ => {
            // `a[i] = ...`, `*p = ...`: the target itself is only read.
            stack.push(inner);
            return;
        }
    };
    if let Some(name) = name {
        if mode == Target::ReadWrite {
            acc.reads.insert(name.clone());
        }
        acc.writes.insert(name);
    }
}

/// Name of the variable, parameter or field a reference denotes.
fn value_name(tu: &TranslationUnit, id: NodeId) -> Option<String> {
    tu.referent(id)
        .filter(|decl| decl.kind.is_value())
        .map(|decl| decl.name.clone())
}

/// Resolve a member access chain to one name.
///
/// Walks the base chain through parentheses, casts, nested member accesses
/// and call callees. A chain rooted at `this` names the field accessed
/// directly on it (a method there leaves the chain unresolved); one rooted
/// at a variable names the variable. Call
/// arguments met on the way are pushed to `side` for ordinary traversal.
pub(crate) fn resolve_member(
    tu: &TranslationUnit,
    member: NodeId,
    side: &mut Vec<NodeId>,
) -> Option<String> {
    let mut current = member;
    let mut accessed = member;
    loop {
        match tu.kind(current) {
            NodeKind::Paren | NodeKind::ImplicitCast | NodeKind::CStyleCast => {
                current = tu.child(current, Role::Operand)?;
            }
            NodeKind::Member => {
                accessed = current;
                match tu.child(current, Role::Base) {
                    Some(base) => current = base,
                    None => return unresolved(tu, member),
                }
            }
            NodeKind::Call | NodeKind::MemberCall => {
                side.extend(tu.children_with(current, Role::Argument));
                match tu.child(current, Role::Callee) {
                    Some(callee) => current = callee,
                    None => return unresolved(tu, member),
                }
            }
            NodeKind::This => {
                return match tu.node(accessed).name.as_deref() {
                    Some(name) if is_field_of_this(tu, current, accessed, name) => {
                        Some(name.to_string())
                    }
                    _ => unresolved(tu, member),
                };
            }
            NodeKind::DeclRef => match value_name(tu, current) {
                Some(name) => return Some(name),
                None => return unresolved(tu, member),
            },
            _ => {
                side.push(current);
                return unresolved(tu, member);
            }
        }
    }
}

/// Whether `name`, accessed on `this` through `member`, is a data member.
///
/// Looked up in the enclosing class; names it does not declare (inherited
/// members) count as fields unless they are called.
fn is_field_of_this(tu: &TranslationUnit, this: NodeId, member: NodeId, name: &str) -> bool {
    let declared = tu
        .scope_chain(tu.node(this).scope)
        .find(|s| tu.scope(*s).kind == ScopeKind::Record)
        .and_then(|record| {
            tu.scope(record)
                .decls
                .iter()
                .map(|d| tu.decl(*d))
                .find(|d| d.name == name)
        });
    match declared {
        Some(decl) => decl.kind == DeclKind::Field,
        None => tu.role(member) != Role::Callee,
    }
}

fn unresolved(tu: &TranslationUnit, member: NodeId) -> Option<String> {
    let text = tu.text(member).unwrap_or("<unknown>").to_string();
    debug!(
        location = %tu.location(member).map(|l| l.to_string()).unwrap_or_default(),
        reason = %SkipReason::UnresolvedMember(text),
        "skipping member expression"
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::testing::{lower, stmt};

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    fn accesses_of(path: &str, src: &str, text: &str) -> Accesses {
        let tu = lower(path, src);
        analyze_accesses(&tu, stmt(&tu, text))
    }

    #[test]
    fn test_assignment_writes_target_reads_rhs() {
        let acc = accesses_of("t.c", "void f(int x, int y) {\n  x = y + 1;\n}\n", "x = y + 1;");
        assert_eq!(names(&acc.writes), vec!["x"]);
        assert_eq!(names(&acc.reads), vec!["y"]);
        assert!(acc.decls.is_empty());
    }

    #[test]
    fn test_compound_assignment_reads_and_writes() {
        let acc = accesses_of("t.c", "void f(int x, int y) {\n  x += y;\n  y++;\n}\n", "x += y;");
        assert_eq!(names(&acc.writes), vec!["x"]);
        assert_eq!(names(&acc.reads), vec!["x", "y"]);

        let acc = accesses_of("t.c", "void f(int y) {\n  y++;\n}\n", "y++;");
        assert_eq!(names(&acc.writes), vec!["y"]);
        assert_eq!(names(&acc.reads), vec!["y"]);
    }

    #[test]
    fn test_declarations_are_written() {
        let acc = accesses_of("t.c", "int f(int a) {\n  int b = a, c;\n  return b;\n}\n", "int b = a, c;");
        assert_eq!(names(&acc.decls), vec!["b", "c"]);
        assert_eq!(names(&acc.writes), vec!["b", "c"]);
        assert_eq!(names(&acc.reads), vec!["a"]);
        assert!(acc.decls.is_subset(&acc.writes));
    }

    #[test]
    fn test_every_named_declaration_is_declared() {
        let src = "void f(void) {\n  int g(int), k;\n  typedef int len_t, *len_p;\n  struct node { int v; } head;\n  g(k);\n}\n";
        let acc = accesses_of("t.c", src, "int g(int), k;");
        assert_eq!(names(&acc.decls), vec!["g", "k"]);
        assert_eq!(names(&acc.writes), vec!["g", "k"]);

        let acc = accesses_of("t.c", src, "typedef int len_t, *len_p;");
        assert_eq!(names(&acc.decls), vec!["len_p", "len_t"]);
        assert_eq!(names(&acc.writes), vec!["len_p", "len_t"]);

        let acc = accesses_of("t.c", src, "struct node { int v; } head;");
        assert_eq!(names(&acc.decls), vec!["head", "node"]);
        assert!(acc.decls.is_subset(&acc.writes));
    }

    #[test]
    fn test_functions_and_enum_constants_are_not_recorded() {
        let src = "enum { LIMIT = 3 };\nint clamp(int);\nvoid f(int v) {\n  v = clamp(v) + LIMIT;\n}\n";
        let acc = accesses_of("t.c", src, "v = clamp(v) + LIMIT;");
        assert_eq!(names(&acc.reads), vec!["v"]);
        assert_eq!(names(&acc.writes), vec!["v"]);
    }

    #[test]
    fn test_this_member_resolves_to_field() {
        let src = "struct S {\n  int count;\n  void bump() {\n    this->count = this->count + 1;\n  }\n};\n";
        let acc = accesses_of("t.cpp", src, "this->count = this->count + 1;");
        assert_eq!(names(&acc.writes), vec!["count"]);
        assert_eq!(names(&acc.reads), vec!["count"]);
    }

    #[test]
    fn test_method_on_this_is_not_a_name() {
        let src = "struct P { int x; };\nstruct S {\n  P &get();\n  void f(int v) {\n    this->get().x = v;\n    v = this->get().x;\n  }\n};\n";
        let acc = accesses_of("t.cpp", src, "this->get().x = v;");
        assert!(acc.writes.is_empty());
        assert_eq!(names(&acc.reads), vec!["v"]);

        let acc = accesses_of("t.cpp", src, "v = this->get().x;");
        assert_eq!(names(&acc.writes), vec!["v"]);
        assert!(acc.reads.is_empty());
    }

    #[test]
    fn test_implicit_this_field() {
        let src = "struct S {\n  int count;\n  void bump(int by) {\n    count += by;\n  }\n};\n";
        let acc = accesses_of("t.cpp", src, "count += by;");
        assert_eq!(names(&acc.writes), vec!["count"]);
        assert_eq!(names(&acc.reads), vec!["by", "count"]);
    }

    #[test]
    fn test_member_chain_resolves_to_base_variable() {
        let src = "struct P { int x; struct P *next; };\nvoid f(struct P *p, int v) {\n  p->next->x = v;\n  v = (p)->x;\n}\n";
        let acc = accesses_of("t.c", src, "p->next->x = v;");
        assert_eq!(names(&acc.writes), vec!["p"]);
        assert_eq!(names(&acc.reads), vec!["v"]);

        let acc = accesses_of("t.c", src, "v = (p)->x;");
        assert_eq!(names(&acc.reads), vec!["p"]);
    }

    #[test]
    fn test_call_in_member_chain_keeps_argument_reads() {
        let src = "struct P { int x; };\nstruct P *get(int);\nvoid f(int i, int v) {\n  v = get(i)->x;\n}\n";
        let acc = accesses_of("t.c", src, "v = get(i)->x;");
        assert_eq!(names(&acc.writes), vec!["v"]);
        assert_eq!(names(&acc.reads), vec!["i"]);
    }

    #[test]
    fn test_subscript_target_is_read() {
        let acc = accesses_of("t.c", "void f(int *a, int i) {\n  a[i] = 0;\n}\n", "a[i] = 0;");
        assert!(acc.writes.is_empty());
        assert_eq!(names(&acc.reads), vec!["a", "i"]);
    }
}
