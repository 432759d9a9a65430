//! Function entries: free functions, member functions, constructors,
//! destructors and the raw operators of the basic types.

use bitflags::bitflags;

use crate::{DataType, IntrinsicOp, TypeHash};

bitflags! {
    /// Declaration traits of a function.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FunctionTraits: u32 {
        /// Dispatched through the receiver's vtable.
        const VIRTUAL = 1 << 0;
        /// Virtual without a body.
        const ABSTRACT = 1 << 1;
        /// Overrides a base-class virtual function.
        const OVERRIDE = 1 << 2;
        const CONSTRUCTOR = 1 << 3;
        const DESTRUCTOR = 1 << 4;
        /// Member function callable on a const receiver.
        const CONST = 1 << 5;
        /// Never sets the exception code; calls need no landing pad.
        const NOTHROW = 1 << 6;
        /// Member function without a receiver.
        const STATIC = 1 << 7;
        /// Constructor or conversion function usable only in explicit casts.
        const EXPLICIT = 1 << 8;
        /// User-defined conversion function (`operator T()`).
        const CONVERSION = 1 << 9;
    }
}

/// A formal parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub data_type: DataType,
}

impl Param {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A function known to the registry.
///
/// Member functions (including constructors and destructors) carry their
/// receiver as the first parameter, named `this` and typed `C*` (or
/// `const C*` for const members). Everything downstream (overload
/// resolution, argument passing, devirtualization) treats the receiver as an
/// ordinary first argument.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionEntry {
    /// Identity of the function.
    pub hash: TypeHash,
    /// Group name (`"print"`, `"operator+"`, `"@constructor"`).
    pub name: String,
    /// Namespace path of free functions.
    pub namespace: Vec<String>,
    /// Class owning a member function.
    pub owner: Option<TypeHash>,
    /// Formal parameters, receiver first for members.
    pub params: Vec<Param>,
    pub return_type: DataType,
    pub traits: FunctionTraits,
    /// Set for raw operators of basic and pointer types.
    pub intrinsic: Option<IntrinsicOp>,
}

/// Group name constructors are registered under.
pub const CONSTRUCTOR_NAME: &str = "@constructor";
/// Group name destructors are registered under.
pub const DESTRUCTOR_NAME: &str = "@destructor";

impl FunctionEntry {
    /// A free function in the global namespace.
    pub fn free(name: impl Into<String>, params: Vec<Param>, return_type: DataType) -> Self {
        let name = name.into();
        let hashes: Vec<_> = params.iter().map(|p| p.data_type.identity()).collect();
        Self {
            hash: TypeHash::from_function(&name, &hashes),
            name,
            namespace: Vec::new(),
            owner: None,
            params,
            return_type,
            traits: FunctionTraits::empty(),
            intrinsic: None,
        }
    }

    /// A member function of `owner`; the `this` parameter is prepended.
    pub fn method(
        owner: TypeHash,
        name: impl Into<String>,
        params: Vec<Param>,
        return_type: DataType,
    ) -> Self {
        let name = name.into();
        let hashes: Vec<_> = params.iter().map(|p| p.data_type.identity()).collect();
        let mut all = Vec::with_capacity(params.len() + 1);
        all.push(Param::new("this", DataType::simple(owner).pointer_to()));
        all.extend(params);
        Self {
            hash: TypeHash::from_method(owner, &name, &hashes),
            name,
            namespace: Vec::new(),
            owner: Some(owner),
            params: all,
            return_type,
            traits: FunctionTraits::empty(),
            intrinsic: None,
        }
    }

    /// A constructor of `owner`.
    pub fn constructor(owner: TypeHash, params: Vec<Param>) -> Self {
        let hashes: Vec<_> = params.iter().map(|p| p.data_type.identity()).collect();
        let mut entry = Self::method(owner, CONSTRUCTOR_NAME, params, DataType::void());
        entry.hash = TypeHash::from_constructor(owner, &hashes);
        entry.traits |= FunctionTraits::CONSTRUCTOR;
        entry
    }

    /// The destructor of `owner`.
    pub fn destructor(owner: TypeHash) -> Self {
        let mut entry = Self::method(owner, DESTRUCTOR_NAME, Vec::new(), DataType::void());
        entry.hash = TypeHash::from_destructor(owner);
        entry.traits |= FunctionTraits::DESTRUCTOR | FunctionTraits::NOTHROW;
        entry
    }

    /// Add traits. `CONST` also makes the receiver `const C*`.
    pub fn with_traits(mut self, traits: FunctionTraits) -> Self {
        let had_receiver = self.has_receiver();
        self.traits |= traits;
        if had_receiver && traits.contains(FunctionTraits::STATIC) {
            self.params.remove(0);
        }
        if traits.contains(FunctionTraits::CONST) && self.has_receiver() {
            let this = self.params[0].data_type;
            if let Some(pointee) = this.pointee() {
                self.params[0].data_type = pointee.with_const().pointer_to();
            }
        }
        self
    }

    /// Place a free function in a namespace; the hash is recomputed from the
    /// qualified name.
    pub fn in_namespace<S: AsRef<str>>(mut self, path: &[S]) -> Self {
        self.namespace = path.iter().map(|s| s.as_ref().to_string()).collect();
        if self.owner.is_none() {
            let hashes: Vec<_> = self.params.iter().map(|p| p.data_type.identity()).collect();
            self.hash = TypeHash::from_function(&self.qualified_name(), &hashes);
        }
        self
    }

    /// Mark as a raw operator implementation.
    pub fn with_intrinsic(mut self, op: IntrinsicOp) -> Self {
        self.intrinsic = Some(op);
        self.traits |= FunctionTraits::NOTHROW;
        self
    }

    /// `ns::name` for free functions, `name` otherwise.
    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.namespace.join("::"), self.name)
        }
    }

    pub fn is_member(&self) -> bool {
        self.owner.is_some()
    }

    /// Member function with a `this` parameter.
    pub fn has_receiver(&self) -> bool {
        self.owner.is_some() && !self.traits.contains(FunctionTraits::STATIC)
    }

    /// Type of the `this` parameter.
    pub fn receiver_type(&self) -> Option<DataType> {
        if self.has_receiver() {
            self.params.first().map(|p| p.data_type)
        } else {
            None
        }
    }

    /// Class of the receiver (the class the function is declared in).
    pub fn receiver_class(&self) -> Option<TypeHash> {
        self.receiver_type().map(|t| t.base)
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn is_virtual(&self) -> bool {
        self.traits
            .intersects(FunctionTraits::VIRTUAL | FunctionTraits::ABSTRACT | FunctionTraits::OVERRIDE)
    }

    pub fn is_constructor(&self) -> bool {
        self.traits.contains(FunctionTraits::CONSTRUCTOR)
    }

    pub fn is_explicit(&self) -> bool {
        self.traits.contains(FunctionTraits::EXPLICIT)
    }

    /// Whether a call may leave a pending exception code.
    pub fn can_throw(&self) -> bool {
        self.intrinsic.is_none() && !self.traits.contains(FunctionTraits::NOTHROW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BasicKind;

    #[test]
    fn method_prepends_receiver() {
        let owner = TypeHash::from_name("C");
        let f = FunctionEntry::method(
            owner,
            "get",
            vec![Param::new("i", DataType::basic(BasicKind::Int))],
            DataType::basic(BasicKind::Int),
        );
        assert_eq!(f.arity(), 2);
        assert_eq!(f.receiver_class(), Some(owner));
        assert!(f.params[0].data_type.is_pointer());
    }

    #[test]
    fn const_method_has_const_receiver() {
        let owner = TypeHash::from_name("C");
        let f = FunctionEntry::method(owner, "size", vec![], DataType::basic(BasicKind::Int))
            .with_traits(FunctionTraits::CONST);
        assert!(f.receiver_type().is_some_and(|t| t.is_const));
    }

    #[test]
    fn intrinsics_cannot_throw() {
        let int = DataType::basic(BasicKind::Int);
        let f = FunctionEntry::free(
            "operator+",
            vec![Param::new("a", int), Param::new("b", int)],
            int,
        )
        .with_intrinsic(IntrinsicOp::Add);
        assert!(!f.can_throw());
        assert!(FunctionEntry::free("g", vec![], int).can_throw());
    }

    #[test]
    fn namespace_changes_identity() {
        let a = FunctionEntry::free("f", vec![], DataType::void());
        let b = a.clone().in_namespace(&["ns"]);
        assert_ne!(a.hash, b.hash);
        assert_eq!(b.qualified_name(), "ns::f");
    }
}
