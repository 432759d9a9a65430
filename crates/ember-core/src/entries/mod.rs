//! Registry entries for types and functions.

mod class;
mod function;
mod type_entry;

pub use class::{ClassEntry, FieldEntry};
pub use function::{
    CONSTRUCTOR_NAME, DESTRUCTOR_NAME, FunctionEntry, FunctionTraits, Param,
};
pub use type_entry::{ArrayEntry, DelegateEntry, EnumEntry, TypeEntry};
