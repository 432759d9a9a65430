//! Syntax tree node definitions.

pub mod decl;
pub mod expr;
pub mod ops;
pub mod stmt;
pub mod types;

pub use decl::*;
pub use expr::*;
pub use ops::*;
pub use stmt::*;
pub use types::*;

use ember_core::Span;

/// An identifier with its location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ident<'ast> {
    pub name: &'ast str,
    pub span: Span,
}

impl<'ast> Ident<'ast> {
    pub fn new(name: &'ast str, span: Span) -> Self {
        Self { name, span }
    }
}
