//! Node kinds of the lowered syntax graph.
//!
//! Kind names follow clang's AST class names so that the `kind` field of a
//! statement fact reads the same regardless of which frontend produced it.

use std::fmt;

/// Kind of a node in a [`TranslationUnit`](super::TranslationUnit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    // Declarations
    TranslationUnit,
    Namespace,
    Record,
    Enum,
    EnumConstant,
    Function,
    Method,
    Var,
    Param,
    Field,
    OtherDecl,

    // Statements
    Compound,
    DeclStmt,
    If,
    While,
    Do,
    For,
    ForRange,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    Goto,
    Label,
    Null,
    Try,
    Catch,
    OtherStmt,

    // Expressions
    BinaryOperator,
    CompoundAssignOperator,
    UnaryOperator,
    ConditionalOperator,
    Call,
    MemberCall,
    Member,
    ArraySubscript,
    DeclRef,
    Paren,
    CStyleCast,
    ImplicitCast,
    SizeOf,
    IntegerLiteral,
    FloatingLiteral,
    StringLiteral,
    CharacterLiteral,
    BoolLiteral,
    NullPtrLiteral,
    InitList,
    CompoundLiteral,
    This,
    New,
    Delete,
    Throw,
    Lambda,
    OtherExpr,

    /// Grammar error recovered by the parser.
    Error,
}

impl NodeKind {
    /// Clang-style class name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::TranslationUnit => "TranslationUnitDecl",
            NodeKind::Namespace => "NamespaceDecl",
            NodeKind::Record => "RecordDecl",
            NodeKind::Enum => "EnumDecl",
            NodeKind::EnumConstant => "EnumConstantDecl",
            NodeKind::Function => "FunctionDecl",
            NodeKind::Method => "CXXMethodDecl",
            NodeKind::Var => "VarDecl",
            NodeKind::Param => "ParmVarDecl",
            NodeKind::Field => "FieldDecl",
            NodeKind::OtherDecl => "Decl",
            NodeKind::Compound => "CompoundStmt",
            NodeKind::DeclStmt => "DeclStmt",
            NodeKind::If => "IfStmt",
            NodeKind::While => "WhileStmt",
            NodeKind::Do => "DoStmt",
            NodeKind::For => "ForStmt",
            NodeKind::ForRange => "CXXForRangeStmt",
            NodeKind::Switch => "SwitchStmt",
            NodeKind::Case => "CaseStmt",
            NodeKind::Default => "DefaultStmt",
            NodeKind::Break => "BreakStmt",
            NodeKind::Continue => "ContinueStmt",
            NodeKind::Return => "ReturnStmt",
            NodeKind::Goto => "GotoStmt",
            NodeKind::Label => "LabelStmt",
            NodeKind::Null => "NullStmt",
            NodeKind::Try => "CXXTryStmt",
            NodeKind::Catch => "CXXCatchStmt",
            NodeKind::OtherStmt => "Stmt",
            NodeKind::BinaryOperator => "BinaryOperator",
            NodeKind::CompoundAssignOperator => "CompoundAssignOperator",
            NodeKind::UnaryOperator => "UnaryOperator",
            NodeKind::ConditionalOperator => "ConditionalOperator",
            NodeKind::Call => "CallExpr",
            NodeKind::MemberCall => "CXXMemberCallExpr",
            NodeKind::Member => "MemberExpr",
            NodeKind::ArraySubscript => "ArraySubscriptExpr",
            NodeKind::DeclRef => "DeclRefExpr",
            NodeKind::Paren => "ParenExpr",
            NodeKind::CStyleCast => "CStyleCastExpr",
            NodeKind::ImplicitCast => "ImplicitCastExpr",
            NodeKind::SizeOf => "UnaryExprOrTypeTraitExpr",
            NodeKind::IntegerLiteral => "IntegerLiteral",
            NodeKind::FloatingLiteral => "FloatingLiteral",
            NodeKind::StringLiteral => "StringLiteral",
            NodeKind::CharacterLiteral => "CharacterLiteral",
            NodeKind::BoolLiteral => "CXXBoolLiteralExpr",
            NodeKind::NullPtrLiteral => "CXXNullPtrLiteralExpr",
            NodeKind::InitList => "InitListExpr",
            NodeKind::CompoundLiteral => "CompoundLiteralExpr",
            NodeKind::This => "CXXThisExpr",
            NodeKind::New => "CXXNewExpr",
            NodeKind::Delete => "CXXDeleteExpr",
            NodeKind::Throw => "CXXThrowExpr",
            NodeKind::Lambda => "LambdaExpr",
            NodeKind::OtherExpr => "Expr",
            NodeKind::Error => "ERROR",
        }
    }

    /// Declarations are never statements.
    pub fn is_decl(&self) -> bool {
        matches!(
            self,
            NodeKind::TranslationUnit
                | NodeKind::Namespace
                | NodeKind::Record
                | NodeKind::Enum
                | NodeKind::EnumConstant
                | NodeKind::Function
                | NodeKind::Method
                | NodeKind::Var
                | NodeKind::Param
                | NodeKind::Field
                | NodeKind::OtherDecl
        )
    }

    /// Expressions (which, as in clang, are also statements).
    pub fn is_expr(&self) -> bool {
        matches!(
            self,
            NodeKind::BinaryOperator
                | NodeKind::CompoundAssignOperator
                | NodeKind::UnaryOperator
                | NodeKind::ConditionalOperator
                | NodeKind::Call
                | NodeKind::MemberCall
                | NodeKind::Member
                | NodeKind::ArraySubscript
                | NodeKind::DeclRef
                | NodeKind::Paren
                | NodeKind::CStyleCast
                | NodeKind::ImplicitCast
                | NodeKind::SizeOf
                | NodeKind::IntegerLiteral
                | NodeKind::FloatingLiteral
                | NodeKind::StringLiteral
                | NodeKind::CharacterLiteral
                | NodeKind::BoolLiteral
                | NodeKind::NullPtrLiteral
                | NodeKind::InitList
                | NodeKind::CompoundLiteral
                | NodeKind::This
                | NodeKind::New
                | NodeKind::Delete
                | NodeKind::Throw
                | NodeKind::Lambda
                | NodeKind::OtherExpr
        )
    }

    /// Anything that is neither a declaration nor a parse error.
    pub fn is_stmt(&self) -> bool {
        !self.is_decl() && *self != NodeKind::Error
    }

    /// Literal expressions.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            NodeKind::IntegerLiteral
                | NodeKind::FloatingLiteral
                | NodeKind::StringLiteral
                | NodeKind::CharacterLiteral
                | NodeKind::BoolLiteral
                | NodeKind::NullPtrLiteral
        )
    }

    /// Iteration statements.
    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            NodeKind::While | NodeKind::Do | NodeKind::For | NodeKind::ForRange
        )
    }

    /// Calls, free or member.
    pub fn is_call(&self) -> bool {
        matches!(self, NodeKind::Call | NodeKind::MemberCall)
    }

    /// Function-like nodes that own a body and a liveness scope.
    pub fn is_function_like(&self) -> bool {
        matches!(
            self,
            NodeKind::Function | NodeKind::Method | NodeKind::Lambda
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Position of a node within its parent.
///
/// Roles carry the structural information that clang exposes through typed
/// accessors (`getCond()`, `getBody()`, `getLHS()`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    #[default]
    None,
    Condition,
    Then,
    Else,
    Body,
    Init,
    Increment,
    RangeInit,
    LoopVariable,
    Lhs,
    Rhs,
    Operand,
    Callee,
    Argument,
    Base,
    Index,
    Value,
    Handler,
}
