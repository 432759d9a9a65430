//! Type and symbol oracle for the ember compiler.
//!
//! - [`SymbolRegistry`]: every type and function, keyed by hash
//! - [`NamespaceTree`]: the petgraph-backed namespace hierarchy
//! - [`classify_basic_conversion`]: the conversion table of the basic types

mod basic_ops;
mod namespace_tree;
mod registry;

pub use basic_ops::{BasicConversionClass, classify_basic_conversion};
pub use namespace_tree::{
    NamespaceData, NamespaceEdge, NamespaceTree, NamespaceValue, ResolutionResult,
};
pub use registry::{FieldRef, SymbolRegistry};

pub use petgraph::graph::NodeIndex;
