//! Function declarations handed to the compiler.
//!
//! Only function bodies are compiled; classes, enums and the other
//! declarations are registered with the symbol registry by the host.

use ember_core::Span;

use crate::ast::Ident;
use crate::ast::stmt::Block;
use crate::ast::types::TypeExpr;

/// Which kind of function a declaration defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Free,
    Method,
    Constructor,
    Destructor,
}

/// A function with a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionDecl<'ast> {
    pub kind: FunctionKind,
    /// Namespace the function is declared in.
    pub namespace: &'ast [Ident<'ast>],
    /// Owning class, for methods, constructors and destructors.
    pub class: Option<Ident<'ast>>,
    pub name: Ident<'ast>,
    pub params: &'ast [FunctionParam<'ast>],
    /// `None` for `void`.
    pub return_type: Option<TypeExpr<'ast>>,
    pub body: Block<'ast>,
    pub span: Span,
}

/// A formal parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionParam<'ast> {
    pub ty: TypeExpr<'ast>,
    pub name: Option<Ident<'ast>>,
    pub span: Span,
}

impl<'ast> FunctionDecl<'ast> {
    /// `ns::Class::name` for diagnostics.
    pub fn display_name(&self) -> String {
        let mut parts: Vec<&str> = self.namespace.iter().map(|i| i.name).collect();
        if let Some(class) = self.class {
            parts.push(class.name);
        }
        parts.push(self.name.name);
        parts.join("::")
    }
}
