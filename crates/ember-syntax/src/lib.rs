//! Untyped syntax tree consumed by the ember binder.
//!
//! The tree is arena-allocated: every node borrows from a `bumpalo::Bump`
//! for the lifetime `'ast`. Parsing is not part of this crate; trees are
//! produced by an external front end or built programmatically with
//! [`SyntaxBuilder`].
//!
//! ```
//! use bumpalo::Bump;
//! use ember_syntax::{BinaryOp, Expr, SyntaxBuilder};
//!
//! let arena = Bump::new();
//! let b = SyntaxBuilder::new(&arena);
//! let sum = b.binary(BinaryOp::Add, b.ident("x"), b.int(1));
//! assert!(matches!(sum, Expr::Binary(_)));
//! ```

pub mod ast;
mod builder;

pub use ast::*;
pub use builder::SyntaxBuilder;
