//! Class entries.

use crate::{DataType, TypeHash};

/// A member variable of a class.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub name: String,
    pub data_type: DataType,
}

/// A class type.
///
/// Member functions, constructors and the destructor are stored in the
/// registry's function table; the class only lists their hashes.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassEntry {
    pub name: String,
    pub namespace: Vec<String>,
    pub hash: TypeHash,
    /// Direct base class.
    pub base: Option<TypeHash>,
    /// Member variables declared in this class (not inherited ones).
    pub fields: Vec<FieldEntry>,
    /// Member functions declared in this class, including operators.
    pub methods: Vec<TypeHash>,
    pub constructors: Vec<TypeHash>,
    pub destructor: Option<TypeHash>,
    /// Has a vtable (declares or inherits a virtual function).
    pub is_polymorphic: bool,
    /// Size in bytes, as reported by `sizeof`.
    pub size: u64,
}

impl ClassEntry {
    /// A class named `name` in the global namespace.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            hash: TypeHash::from_name(&name),
            name,
            namespace: Vec::new(),
            base: None,
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            destructor: None,
            is_polymorphic: false,
            size: 0,
        }
    }

    /// Move the class into a namespace; the hash follows the qualified name.
    pub fn in_namespace<S: AsRef<str>>(mut self, path: &[S]) -> Self {
        self.namespace = path.iter().map(|s| s.as_ref().to_string()).collect();
        self.hash = TypeHash::from_name(&self.qualified_name());
        self
    }

    pub fn with_base(mut self, base: TypeHash) -> Self {
        self.base = Some(base);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.fields.push(FieldEntry {
            name: name.into(),
            data_type,
        });
        self
    }

    pub fn polymorphic(mut self) -> Self {
        self.is_polymorphic = true;
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.namespace.join("::"), self.name)
        }
    }

    /// Index of a member variable declared in this class.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// The class type as a value.
    pub fn data_type(&self) -> DataType {
        DataType::simple(self.hash)
    }
}
