//! Shared vocabulary of the ember compiler core.
//!
//! - [`Span`]: source locations
//! - [`TypeHash`]: deterministic identities of types and functions
//! - [`DataType`]: a base type plus const/pointer/reference derivations
//! - [`BasicKind`], [`ConstantValue`], [`IntrinsicOp`]: built-in types,
//!   compile-time values and the raw operations behind basic operators
//! - [`entries`]: what the registry stores about types and functions
//! - [`Symbol`]: what a name resolves to
//! - [`CompilationError`], [`Diagnostic`]: error reporting

mod basic;
mod constant;
mod data_type;
pub mod entries;
mod error;
mod intrinsic;
mod span;
mod symbol;
mod type_hash;

pub use basic::BasicKind;
pub use constant::ConstantValue;
pub use data_type::{DataType, RefKind};
pub use entries::{
    ArrayEntry, CONSTRUCTOR_NAME, ClassEntry, DESTRUCTOR_NAME, DelegateEntry, EnumEntry,
    FieldEntry, FunctionEntry, FunctionTraits, Param, TypeEntry,
};
pub use error::{CompilationError, Diagnostic, RegistrationError};
pub use intrinsic::IntrinsicOp;
pub use span::Span;
pub use symbol::Symbol;
pub use type_hash::TypeHash;

pub use ordered_float::OrderedFloat;
