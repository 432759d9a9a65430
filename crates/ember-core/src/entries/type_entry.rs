//! The unified type entry stored by the registry.

use crate::{BasicKind, ClassEntry, ConstantValue, DataType, TypeHash};

/// A fixed-size array type `T[N]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayEntry {
    pub hash: TypeHash,
    pub element: DataType,
    pub size: u64,
}

impl ArrayEntry {
    pub fn new(element: DataType, size: u64) -> Self {
        Self {
            hash: TypeHash::from_derived(element.identity(), 0x4000_0000 | size),
            element,
            size,
        }
    }
}

/// An enumerated type.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumEntry {
    pub name: String,
    pub hash: TypeHash,
    pub underlying: BasicKind,
    pub constants: Vec<(String, ConstantValue)>,
}

impl EnumEntry {
    pub fn new(name: impl Into<String>, underlying: BasicKind) -> Self {
        let name = name.into();
        Self {
            hash: TypeHash::from_name(&name),
            name,
            underlying,
            constants: Vec::new(),
        }
    }

    /// Add a constant; the value is stored in the underlying kind.
    pub fn with_constant(mut self, name: impl Into<String>, value: i128) -> Self {
        let value = ConstantValue::integer(self.underlying, value)
            .unwrap_or(ConstantValue::Long(value as i64));
        self.constants.push((name.into(), value));
        self
    }

    pub fn constant(&self, name: &str) -> Option<&ConstantValue> {
        self.constants.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// A delegate (function pointer) type.
#[derive(Debug, Clone, PartialEq)]
pub struct DelegateEntry {
    pub name: String,
    pub hash: TypeHash,
    pub params: Vec<DataType>,
    pub return_type: DataType,
    pub nothrow: bool,
}

impl DelegateEntry {
    pub fn new(name: impl Into<String>, params: Vec<DataType>, return_type: DataType) -> Self {
        let name = name.into();
        Self {
            hash: TypeHash::from_name(&name),
            name,
            params,
            return_type,
            nothrow: false,
        }
    }
}

/// Any base type known to the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeEntry {
    Basic(BasicKind),
    Class(ClassEntry),
    Array(ArrayEntry),
    Enum(EnumEntry),
    Delegate(DelegateEntry),
}

impl TypeEntry {
    pub fn hash(&self) -> TypeHash {
        match self {
            TypeEntry::Basic(kind) => kind.hash(),
            TypeEntry::Class(c) => c.hash,
            TypeEntry::Array(a) => a.hash,
            TypeEntry::Enum(e) => e.hash,
            TypeEntry::Delegate(d) => d.hash,
        }
    }

    /// Display name.
    pub fn name(&self) -> String {
        match self {
            TypeEntry::Basic(kind) => kind.name().to_string(),
            TypeEntry::Class(c) => c.qualified_name(),
            TypeEntry::Array(a) => format!("array[{}]", a.size),
            TypeEntry::Enum(e) => e.name.clone(),
            TypeEntry::Delegate(d) => d.name.clone(),
        }
    }

    pub fn as_class(&self) -> Option<&ClassEntry> {
        match self {
            TypeEntry::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_class_mut(&mut self) -> Option<&mut ClassEntry> {
        match self {
            TypeEntry::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_basic(&self) -> Option<BasicKind> {
        match self {
            TypeEntry::Basic(k) => Some(*k),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayEntry> {
        match self {
            TypeEntry::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumEntry> {
        match self {
            TypeEntry::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_delegate(&self) -> Option<&DelegateEntry> {
        match self {
            TypeEntry::Delegate(d) => Some(d),
            _ => None,
        }
    }
}
