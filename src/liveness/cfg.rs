//! Statement-level control-flow graph of one function body.

use std::collections::{HashMap, HashSet};

use crate::ast::{DeclId, NodeId, NodeKind, Role, TranslationUnit};

/// Index of a basic block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

/// One evaluated piece of a block: an expression statement, a declaration or
/// a condition, with the tracked variables it uses and defines.
#[derive(Debug, Clone)]
pub struct Element {
    pub node: NodeId,
    pub uses: Vec<DeclId>,
    pub defs: Vec<DeclId>,
}

#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub id: BlockId,
    pub elements: Vec<Element>,
    pub successors: Vec<BlockId>,
}

#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    pub blocks: Vec<BasicBlock>,
    pub entry: BlockId,
    pub exit: BlockId,
    /// Where control enters each statement: block and element index.
    entry_points: HashMap<NodeId, (BlockId, usize)>,
}

impl ControlFlowGraph {
    /// Build the graph of `function`'s body. `None` if it has no body.
    pub fn build(
        tu: &TranslationUnit,
        function: NodeId,
        tracked: &HashSet<DeclId>,
    ) -> Option<Self> {
        let body = tu.child(function, Role::Body)?;
        let mut builder = Builder {
            tu,
            tracked,
            blocks: Vec::new(),
            current: BlockId(0),
            exit: BlockId(0),
            entry_points: HashMap::new(),
            targets: Vec::new(),
            switches: Vec::new(),
            labels: HashMap::new(),
            gotos: Vec::new(),
        };
        let entry = builder.new_block();
        builder.exit = builder.new_block();
        builder.current = entry;

        // Parameters are defined on entry.
        let params: Vec<DeclId> = tu
            .children(function)
            .iter()
            .filter_map(|c| tu.node(*c).declared)
            .filter(|d| tracked.contains(d))
            .collect();
        if !params.is_empty() {
            builder.blocks[entry.0].elements.push(Element {
                node: function,
                uses: Vec::new(),
                defs: params,
            });
        }

        builder.statement(body);
        let (last, exit) = (builder.current, builder.exit);
        builder.edge(last, exit);
        builder.resolve_gotos();

        Some(Self {
            blocks: builder.blocks,
            entry,
            exit,
            entry_points: builder.entry_points,
        })
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0]
    }

    pub fn entry_point(&self, stmt: NodeId) -> Option<(BlockId, usize)> {
        self.entry_points.get(&stmt).copied()
    }
}

#[derive(Debug, Clone, Copy)]
struct JumpTargets {
    break_to: Option<BlockId>,
    continue_to: Option<BlockId>,
}

#[derive(Debug, Clone, Copy)]
struct SwitchContext {
    head: BlockId,
    has_default: bool,
}

struct Builder<'a> {
    tu: &'a TranslationUnit,
    tracked: &'a HashSet<DeclId>,
    blocks: Vec<BasicBlock>,
    current: BlockId,
    exit: BlockId,
    entry_points: HashMap<NodeId, (BlockId, usize)>,
    targets: Vec<JumpTargets>,
    switches: Vec<SwitchContext>,
    labels: HashMap<String, BlockId>,
    gotos: Vec<(BlockId, String)>,
}

impl Builder<'_> {
    fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock {
            id,
            elements: Vec::new(),
            successors: Vec::new(),
        });
        id
    }

    fn edge(&mut self, from: BlockId, to: BlockId) {
        let successors = &mut self.blocks[from.0].successors;
        if !successors.contains(&to) {
            successors.push(to);
        }
    }

    /// Continue in a fresh block after an unconditional jump.
    fn jump(&mut self, to: Option<BlockId>) {
        if let Some(to) = to {
            let from = self.current;
            self.edge(from, to);
        }
        self.current = self.new_block();
    }

    fn break_target(&self) -> Option<BlockId> {
        self.targets.iter().rev().find_map(|t| t.break_to)
    }

    fn continue_target(&self) -> Option<BlockId> {
        self.targets.iter().rev().find_map(|t| t.continue_to)
    }

    fn statement(&mut self, id: NodeId) {
        let point = (self.current, self.blocks[self.current.0].elements.len());
        self.entry_points.entry(id).or_insert(point);

        let tu = self.tu;
        match tu.kind(id) {
            NodeKind::Compound => {
                for child in tu.children(id) {
                    self.statement(*child);
                }
            }
            NodeKind::If => {
                self.header(id);
                let head = self.current;
                let then_block = self.new_block();
                let join = self.new_block();
                let else_child = tu.child(id, Role::Else);
                let else_block = match else_child {
                    Some(_) => self.new_block(),
                    None => join,
                };
                self.edge(head, then_block);
                self.edge(head, else_block);

                self.current = then_block;
                if let Some(then) = tu.child(id, Role::Then) {
                    self.statement(then);
                }
                let end = self.current;
                self.edge(end, join);

                if let Some(alt) = else_child {
                    self.current = else_block;
                    self.statement(alt);
                    let end = self.current;
                    self.edge(end, join);
                }
                self.current = join;
            }
            NodeKind::While => {
                let head = self.new_block();
                let before = self.current;
                self.edge(before, head);
                self.current = head;
                self.header(id);
                let cond_end = self.current;
                let body = self.new_block();
                let exit = self.new_block();
                self.edge(cond_end, body);
                self.edge(cond_end, exit);
                self.loop_body(id, body, exit, head);
                self.edge(self.current, head);
                self.current = exit;
            }
            NodeKind::Do => {
                let body = self.new_block();
                let cond = self.new_block();
                let exit = self.new_block();
                let before = self.current;
                self.edge(before, body);
                self.loop_body(id, body, exit, cond);
                let end = self.current;
                self.edge(end, cond);
                self.current = cond;
                self.header(id);
                let cond_end = self.current;
                self.edge(cond_end, body);
                self.edge(cond_end, exit);
                self.current = exit;
            }
            NodeKind::For => {
                for init in tu.children_with(id, Role::Init) {
                    self.element(init);
                }
                let head = self.new_block();
                let before = self.current;
                self.edge(before, head);
                self.current = head;
                let condition = tu.child(id, Role::Condition);
                if let Some(cond) = condition {
                    self.element(cond);
                }
                let body = self.new_block();
                let increment = self.new_block();
                let exit = self.new_block();
                self.edge(head, body);
                if condition.is_some() {
                    self.edge(head, exit);
                }
                self.loop_body(id, body, exit, increment);
                let end = self.current;
                self.edge(end, increment);
                self.current = increment;
                for inc in tu.children_with(id, Role::Increment) {
                    self.element(inc);
                }
                self.edge(increment, head);
                self.current = exit;
            }
            NodeKind::ForRange => {
                for part in tu.children_with(id, Role::Init) {
                    self.element(part);
                }
                for part in tu.children_with(id, Role::RangeInit) {
                    self.element(part);
                }
                let head = self.new_block();
                let before = self.current;
                self.edge(before, head);
                self.current = head;
                for var in tu.children_with(id, Role::LoopVariable) {
                    self.element(var);
                }
                let body = self.new_block();
                let exit = self.new_block();
                self.edge(head, body);
                self.edge(head, exit);
                self.loop_body(id, body, exit, head);
                self.edge(self.current, head);
                self.current = exit;
            }
            NodeKind::Switch => {
                self.header(id);
                let head = self.current;
                let exit = self.new_block();
                self.switches.push(SwitchContext {
                    head,
                    has_default: false,
                });
                self.targets.push(JumpTargets {
                    break_to: Some(exit),
                    continue_to: None,
                });
                // Code before the first label is unreachable.
                self.current = self.new_block();
                if let Some(body) = tu.child(id, Role::Body) {
                    self.statement(body);
                }
                self.edge(self.current, exit);
                self.targets.pop();
                if let Some(ctx) = self.switches.pop() {
                    if !ctx.has_default {
                        self.edge(ctx.head, exit);
                    }
                }
                self.current = exit;
            }
            kind @ (NodeKind::Case | NodeKind::Default) => {
                let label = self.new_block();
                let before = self.current;
                self.edge(before, label);
                if let Some(ctx) = self.switches.last_mut() {
                    if kind == NodeKind::Default {
                        ctx.has_default = true;
                    }
                    let head = ctx.head;
                    self.edge(head, label);
                }
                self.current = label;
                for body in tu.children_with(id, Role::Body) {
                    self.statement(body);
                }
            }
            NodeKind::Break => {
                let target = self.break_target();
                self.jump(target);
            }
            NodeKind::Continue => {
                let target = self.continue_target();
                self.jump(target);
            }
            NodeKind::Return | NodeKind::Throw => {
                self.element(id);
                let exit = self.exit;
                self.jump(Some(exit));
            }
            NodeKind::Goto => {
                if let Some(label) = tu.node(id).name.clone() {
                    self.gotos.push((self.current, label));
                }
                self.jump(None);
            }
            NodeKind::Label => {
                let block = self.new_block();
                let before = self.current;
                self.edge(before, block);
                if let Some(name) = tu.node(id).name.clone() {
                    self.labels.insert(name, block);
                }
                self.current = block;
                for body in tu.children_with(id, Role::Body) {
                    self.statement(body);
                }
            }
            NodeKind::Try => self.try_statement(id),
            NodeKind::Null | NodeKind::OtherDecl => {}
            _ => self.element(id),
        }
    }

    fn loop_body(&mut self, id: NodeId, body: BlockId, exit: BlockId, continue_to: BlockId) {
        self.targets.push(JumpTargets {
            break_to: Some(exit),
            continue_to: Some(continue_to),
        });
        self.current = body;
        if let Some(stmt) = self.tu.child(id, Role::Body) {
            self.statement(stmt);
        }
        self.targets.pop();
    }

    fn try_statement(&mut self, id: NodeId) {
        let tu = self.tu;
        let first = self.blocks.len();
        let body = self.new_block();
        let before = self.current;
        self.edge(before, body);
        self.current = body;
        if let Some(stmt) = tu.child(id, Role::Body) {
            self.statement(stmt);
        }
        let body_end = self.current;
        let last = self.blocks.len();
        let join = self.new_block();
        self.edge(body_end, join);

        for handler in tu.children_with(id, Role::Handler) {
            let block = self.new_block();
            // Any block of the protected body may throw.
            for from in first..last {
                self.edge(BlockId(from), block);
            }
            self.current = block;
            for child in tu.children(handler) {
                match tu.role(*child) {
                    Role::Body => self.statement(*child),
                    _ => self.element(*child),
                }
            }
            let end = self.current;
            self.edge(end, join);
        }
        self.current = join;
    }

    /// Add the init statement and condition of `id` to the current block.
    fn header(&mut self, id: NodeId) {
        let parts: Vec<NodeId> = self
            .tu
            .children(id)
            .iter()
            .copied()
            .filter(|c| matches!(self.tu.role(*c), Role::Init | Role::Condition))
            .collect();
        for part in parts {
            self.element(part);
        }
    }

    fn element(&mut self, node: NodeId) {
        let tu = self.tu;
        let mut uses = Vec::new();
        let mut defs = Vec::new();
        let mut stack = vec![(node, false)];
        while let Some((id, in_lambda)) = stack.pop() {
            let n = tu.node(id);
            match n.kind {
                NodeKind::DeclRef => {
                    if let Some(decl) = n.referent.filter(|d| self.tracked.contains(d)) {
                        if !in_lambda && is_assignment_target(tu, id) {
                            defs.push(decl);
                        } else {
                            uses.push(decl);
                        }
                    }
                }
                NodeKind::Var if !in_lambda => {
                    if let Some(decl) = n.declared.filter(|d| self.tracked.contains(d)) {
                        defs.push(decl);
                    }
                }
                _ => {}
            }
            let in_lambda = in_lambda || n.kind == NodeKind::Lambda;
            stack.extend(tu.children(id).iter().rev().map(|c| (*c, in_lambda)));
        }
        let current = self.current;
        self.blocks[current.0].elements.push(Element { node, uses, defs });
    }

    fn resolve_gotos(&mut self) {
        let gotos = std::mem::take(&mut self.gotos);
        for (from, label) in gotos {
            let to = self.labels.get(&label).copied().unwrap_or(self.exit);
            self.edge(from, to);
        }
    }
}

/// Whether a reference is the target of a plain `=` assignment.
fn is_assignment_target(tu: &TranslationUnit, id: NodeId) -> bool {
    let mut current = id;
    while let Some(parent) = tu.parent(current) {
        match tu.kind(parent) {
            NodeKind::Paren => current = parent,
            NodeKind::BinaryOperator => {
                return tu.node(parent).operator.as_deref() == Some("=")
                    && tu.role(current) == Role::Lhs;
            }
            _ => return false,
        }
    }
    false
}
