//! Expression nodes.
//!
//! Provides nodes for:
//! - Literals and names (`42`, `x`, `Game::MAX`, `this`, `base`)
//! - Operators (binary, prefix, postfix)
//! - Postfix forms (call, index, member access)
//! - Type-directed forms (`cast<T>`, `is`, `as`, `sizeof`, `T(args)`, `new T(args)`)

use ember_core::Span;

use crate::ast::types::TypeExpr;
use crate::ast::{BinaryOp, Ident, PostfixOp, UnaryOp};

/// An expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expr<'ast> {
    Literal(LiteralExpr<'ast>),
    /// Possibly qualified name.
    Ident(IdentExpr<'ast>),
    /// `this`
    This(Span),
    /// `base`
    Base(Span),
    Binary(&'ast BinaryExpr<'ast>),
    /// Prefix operation
    Unary(&'ast UnaryExpr<'ast>),
    Postfix(&'ast PostfixExpr<'ast>),
    Call(&'ast CallExpr<'ast>),
    Index(&'ast IndexExpr<'ast>),
    /// `.` and `->`
    Member(&'ast MemberExpr<'ast>),
    /// `cast<T>(e)`
    Cast(&'ast CastExpr<'ast>),
    /// `e is T`
    Is(&'ast TypeTestExpr<'ast>),
    /// `e as T`
    As(&'ast TypeTestExpr<'ast>),
    SizeOf(&'ast SizeOfExpr<'ast>),
    /// `T(args)` with an explicit type expression
    Construct(&'ast ConstructExpr<'ast>),
    /// `new T(args)`
    New(&'ast ConstructExpr<'ast>),
    /// The pending-exception pseudo-variable.
    ExceptionCode(Span),
    Paren(&'ast ParenExpr<'ast>),
}

impl<'ast> Expr<'ast> {
    /// Get the span of this expression.
    pub fn span(&self) -> Span {
        match self {
            Self::Literal(e) => e.span,
            Self::Ident(e) => e.span,
            Self::This(span) | Self::Base(span) | Self::ExceptionCode(span) => *span,
            Self::Binary(e) => e.span,
            Self::Unary(e) => e.span,
            Self::Postfix(e) => e.span,
            Self::Call(e) => e.span,
            Self::Index(e) => e.span,
            Self::Member(e) => e.span,
            Self::Cast(e) => e.span,
            Self::Is(e) | Self::As(e) => e.span,
            Self::SizeOf(e) => e.span,
            Self::Construct(e) | Self::New(e) => e.span,
            Self::Paren(e) => e.span,
        }
    }

    /// The expression with any enclosing parentheses removed.
    pub fn unparenthesized(&self) -> &Expr<'ast> {
        let mut current = self;
        while let Expr::Paren(p) = current {
            current = &p.expr;
        }
        current
    }
}

/// A literal value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiteralExpr<'ast> {
    pub kind: LiteralKind<'ast>,
    pub span: Span,
}

/// The kind of literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiteralKind<'ast> {
    /// Integer literal; `unsigned` is set by a `u` suffix.
    Int { value: u64, unsigned: bool },
    Float(f32),
    Double(f64),
    Bool(bool),
    Char(u8),
    /// String literal (raw bytes)
    String(&'ast [u8]),
    Null,
}

/// A possibly qualified name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdentExpr<'ast> {
    /// Leading `A::B::` segments
    pub scope: &'ast [Ident<'ast>],
    pub ident: Ident<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryExpr<'ast> {
    pub left: Expr<'ast>,
    pub op: BinaryOp,
    pub right: Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnaryExpr<'ast> {
    pub op: UnaryOp,
    pub operand: Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostfixExpr<'ast> {
    pub operand: Expr<'ast>,
    pub op: PostfixOp,
    pub span: Span,
}

/// A call: free function, method, delegate, or construction by class name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallExpr<'ast> {
    pub callee: Expr<'ast>,
    pub args: &'ast [Expr<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexExpr<'ast> {
    pub object: Expr<'ast>,
    pub index: Expr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemberExpr<'ast> {
    pub object: Expr<'ast>,
    pub member: Ident<'ast>,
    /// `->` rather than `.`
    pub arrow: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CastExpr<'ast> {
    pub target: TypeExpr<'ast>,
    pub expr: Expr<'ast>,
    pub span: Span,
}

/// `e is T` / `e as T`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeTestExpr<'ast> {
    pub expr: Expr<'ast>,
    pub target: TypeExpr<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeOfExpr<'ast> {
    pub operand: SizeOfOperand<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeOfOperand<'ast> {
    Type(TypeExpr<'ast>),
    Expr(Expr<'ast>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstructExpr<'ast> {
    pub ty: TypeExpr<'ast>,
    pub args: &'ast [Expr<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParenExpr<'ast> {
    pub expr: Expr<'ast>,
    pub span: Span,
}
