//! Type expressions as written in source.

use ember_core::{RefKind, Span};

use crate::ast::Ident;

/// A type as written: `const Game::Player*&`, `int[4]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeExpr<'ast> {
    pub base: TypeBase<'ast>,
    pub is_const: bool,
    pub pointers: u8,
    pub reference: RefKind,
    pub span: Span,
}

/// The base of a type expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeBase<'ast> {
    /// A possibly qualified name; basic type names are names too.
    Named {
        scope: &'ast [Ident<'ast>],
        name: Ident<'ast>,
    },
    /// Fixed-size array `T[N]`.
    Array {
        element: &'ast TypeExpr<'ast>,
        size: u64,
    },
}

impl<'ast> TypeExpr<'ast> {
    /// An unqualified, underived named type.
    pub fn named(name: Ident<'ast>) -> Self {
        Self {
            base: TypeBase::Named { scope: &[], name },
            is_const: false,
            pointers: 0,
            reference: RefKind::None,
            span: name.span,
        }
    }

    pub fn with_const(self) -> Self {
        Self {
            is_const: true,
            ..self
        }
    }

    pub fn pointer(self) -> Self {
        Self {
            pointers: self.pointers + 1,
            ..self
        }
    }

    pub fn reference(self) -> Self {
        Self {
            reference: RefKind::LValue,
            ..self
        }
    }

    pub fn rvalue_reference(self) -> Self {
        Self {
            reference: RefKind::RValue,
            ..self
        }
    }

    /// The written name, for diagnostics.
    pub fn display_name(&self) -> String {
        let base = match self.base {
            TypeBase::Named { scope, name } => {
                let mut parts: Vec<&str> = scope.iter().map(|s| s.name).collect();
                parts.push(name.name);
                parts.join("::")
            }
            TypeBase::Array { element, size } => format!("{}[{size}]", element.display_name()),
        };
        let mut out = String::new();
        if self.is_const {
            out.push_str("const ");
        }
        out.push_str(&base);
        for _ in 0..self.pointers {
            out.push('*');
        }
        match self.reference {
            RefKind::None => {}
            RefKind::LValue => out.push('&'),
            RefKind::RValue => out.push_str("&&"),
        }
        out
    }
}
