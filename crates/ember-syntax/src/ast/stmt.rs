//! Statement nodes.
//!
//! Provides nodes for:
//! - Expression statements, assignments and local declarations
//! - Control flow (if, while, do-while, for, switch)
//! - Jumps (return, break, continue, goto, goto case/default)
//! - Exception handling (try-catch, throw)
//! - Blocks and labels

use ember_core::Span;

use crate::ast::Ident;
use crate::ast::expr::Expr;
use crate::ast::types::TypeExpr;

/// A statement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stmt<'ast> {
    /// Expression statement (expr;)
    Expr(ExprStmt<'ast>),
    /// `target = value;`
    Assign(&'ast AssignStmt<'ast>),
    /// Local variable declaration
    VarDecl(&'ast VarDeclStmt<'ast>),
    Return(ReturnStmt<'ast>),
    Break(Span),
    Continue(Span),
    Block(Block<'ast>),
    If(&'ast IfStmt<'ast>),
    While(&'ast WhileStmt<'ast>),
    DoWhile(&'ast DoWhileStmt<'ast>),
    For(&'ast ForStmt<'ast>),
    /// `goto label;`
    Goto(Ident<'ast>),
    /// `label: stmt`
    Labeled(&'ast LabeledStmt<'ast>),
    Switch(&'ast SwitchStmt<'ast>),
    /// `goto case value;`
    GotoCase(&'ast GotoCaseStmt<'ast>),
    /// `goto default;`
    GotoDefault(Span),
    TryCatch(&'ast TryCatchStmt<'ast>),
    /// `throw expr;`
    Throw(&'ast ThrowStmt<'ast>),
    /// `;`
    Empty(Span),
}

impl<'ast> Stmt<'ast> {
    /// Get the span of this statement.
    pub fn span(&self) -> Span {
        match self {
            Self::Expr(s) => s.span,
            Self::Assign(s) => s.span,
            Self::VarDecl(s) => s.span,
            Self::Return(s) => s.span,
            Self::Break(span) | Self::Continue(span) | Self::GotoDefault(span) | Self::Empty(span) => {
                *span
            }
            Self::Block(s) => s.span,
            Self::If(s) => s.span,
            Self::While(s) => s.span,
            Self::DoWhile(s) => s.span,
            Self::For(s) => s.span,
            Self::Goto(label) => label.span,
            Self::Labeled(s) => s.span,
            Self::Switch(s) => s.span,
            Self::GotoCase(s) => s.span,
            Self::TryCatch(s) => s.span,
            Self::Throw(s) => s.span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExprStmt<'ast> {
    pub expr: Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignStmt<'ast> {
    pub target: Expr<'ast>,
    pub value: Expr<'ast>,
    pub span: Span,
}

/// `T name;`, `T name = value;` or `T name(args);`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarDeclStmt<'ast> {
    pub ty: TypeExpr<'ast>,
    pub name: Ident<'ast>,
    pub init: VarInit<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VarInit<'ast> {
    /// Default construction
    None,
    /// `= expr`
    Expr(Expr<'ast>),
    /// `(args)`
    Args(&'ast [Expr<'ast>]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnStmt<'ast> {
    pub value: Option<Expr<'ast>>,
    pub span: Span,
}

/// A `{ ... }` block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block<'ast> {
    pub stmts: &'ast [Stmt<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IfStmt<'ast> {
    pub condition: Expr<'ast>,
    pub then_stmt: Stmt<'ast>,
    pub else_stmt: Option<Stmt<'ast>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhileStmt<'ast> {
    pub condition: Expr<'ast>,
    pub body: Stmt<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoWhileStmt<'ast> {
    pub body: Stmt<'ast>,
    pub condition: Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForStmt<'ast> {
    pub init: Option<Stmt<'ast>>,
    pub condition: Option<Expr<'ast>>,
    pub update: &'ast [Expr<'ast>],
    pub body: Stmt<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledStmt<'ast> {
    pub label: Ident<'ast>,
    pub stmt: Stmt<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchStmt<'ast> {
    pub expr: Expr<'ast>,
    pub cases: &'ast [SwitchCase<'ast>],
    pub span: Span,
}

/// One case group: its labels and the statements following them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwitchCase<'ast> {
    pub labels: &'ast [CaseLabel<'ast>],
    pub stmts: &'ast [Stmt<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaseLabel<'ast> {
    Case(Expr<'ast>),
    Default(Span),
}

impl<'ast> CaseLabel<'ast> {
    pub fn span(&self) -> Span {
        match self {
            CaseLabel::Case(e) => e.span(),
            CaseLabel::Default(span) => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GotoCaseStmt<'ast> {
    pub value: Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TryCatchStmt<'ast> {
    pub try_block: Block<'ast>,
    pub catches: &'ast [CatchClause<'ast>],
    pub span: Span,
}

/// `catch (T name) { ... }`; the type must be a class pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatchClause<'ast> {
    pub ty: TypeExpr<'ast>,
    pub name: Option<Ident<'ast>>,
    pub body: Block<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrowStmt<'ast> {
    pub value: Expr<'ast>,
    pub span: Span,
}
