//! Resolved symbols returned by name lookup.

use crate::{ConstantValue, DataType, TypeHash};

/// What a name refers to.
///
/// Registry lookups produce the global kinds (constants, classes,
/// namespaces, function groups, ...); the binder's own scopes produce
/// locals, parameters, member variables and bound type parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    /// A named compile-time constant.
    Constant {
        name: String,
        data_type: DataType,
        value: ConstantValue,
    },
    /// A local variable of the function being bound.
    LocalVariable { index: u32, data_type: DataType },
    /// A parameter of the function being bound (index 0 is `this` in members).
    Parameter { index: u32, data_type: DataType },
    /// A member variable reached through the implicit `this`.
    MemberVariable {
        class: TypeHash,
        index: u32,
        data_type: DataType,
    },
    Class(TypeHash),
    Delegate(TypeHash),
    /// A namespace, by path.
    Namespace(Vec<String>),
    Enum(TypeHash),
    EnumConstant {
        enum_type: TypeHash,
        value: ConstantValue,
    },
    /// All overloads visible under one name.
    FunctionGroup {
        name: String,
        functions: Vec<TypeHash>,
        /// Set when the group was found in a class scope.
        class: Option<TypeHash>,
    },
    Typedef { name: String, target: DataType },
    BoundTypeParameter { name: String, data_type: DataType },
}

impl Symbol {
    /// Short description used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Symbol::Constant { .. } => "constant",
            Symbol::LocalVariable { .. } => "local variable",
            Symbol::Parameter { .. } => "parameter",
            Symbol::MemberVariable { .. } => "member variable",
            Symbol::Class(_) => "class",
            Symbol::Delegate(_) => "delegate",
            Symbol::Namespace(_) => "namespace",
            Symbol::Enum(_) => "enumerated type",
            Symbol::EnumConstant { .. } => "enumeration constant",
            Symbol::FunctionGroup { .. } => "function group",
            Symbol::Typedef { .. } => "typedef",
            Symbol::BoundTypeParameter { .. } => "type parameter",
        }
    }
}
