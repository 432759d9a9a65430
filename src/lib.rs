//! Ember: semantic core of a statically typed, class-based language compiler.
//!
//! This crate re-exports the workspace crates:
//!
//! - [`core`]: spans, type identities, data types, entries and errors
//! - [`registry`]: the symbol registry answering name and type queries
//! - [`syntax`]: the untyped syntax tree and [`SyntaxBuilder`]
//! - [`compiler`]: binder, overload resolution and the function emitter
//!
//! ```
//! use bumpalo::Bump;
//! use ember::prelude::*;
//!
//! let registry = SymbolRegistry::with_basic_types();
//! let arena = Bump::new();
//! let b = SyntaxBuilder::new(&arena);
//! let body = b.block(&[b.ret(Some(b.binary(BinaryOp::Add, b.ident("x"), b.int(1))))]);
//! let decl = b.function("inc", &[(b.ty("int"), "x")], Some(b.ty("int")), body);
//!
//! let unit = Compiler::new(&registry, CompilerOptions::default())
//!     .compile(&[decl])
//!     .unwrap();
//! assert!(unit.is_success());
//! assert!(unit.function("inc").is_some());
//! ```

pub use ember_compiler as compiler;
pub use ember_core as core;
pub use ember_registry as registry;
pub use ember_syntax as syntax;

pub use ember_compiler::{CompiledUnit, Compiler, CompilerOptions, EmittedFunction};
pub use ember_core::{CompilationError, Diagnostic};
pub use ember_registry::SymbolRegistry;
pub use ember_syntax::SyntaxBuilder;

/// Everything needed to register symbols, build trees and compile them.
pub mod prelude {
    pub use ember_compiler::emit::{Instr, IrObject, LandingPadBlock, PadExit, Target};
    pub use ember_compiler::{
        BoundExpr, BoundExprKind, BoundFunction, BoundStmt, CompiledUnit, Compiler,
        CompilerOptions, EmittedFunction, ReachingClassMap, bind_function, emit_function,
    };
    pub use ember_core::{
        BasicKind, ClassEntry, CompilationError, ConstantValue, DataType, Diagnostic,
        FunctionEntry, FunctionTraits, IntrinsicOp, Param, Span, TypeHash,
    };
    pub use ember_registry::SymbolRegistry;
    pub use ember_syntax::{BinaryOp, FunctionDecl, PostfixOp, SyntaxBuilder, UnaryOp};
}
