//! `DataType` - a base type plus its derivations.
//!
//! A [`DataType`] pairs the hash of a base type (basic type, class, array,
//! enum or delegate) with the derivations applied on top of it: `const`,
//! pointer levels and an lvalue/rvalue reference. The category questions the
//! binder asks (is this a reference? a const reference? a pointer?) are
//! answered directly from the derivations; questions that need the base
//! type's kind (is this a class?) go through the registry.
//!
//! ```
//! use ember_core::{BasicKind, DataType, RefKind};
//!
//! let int = DataType::basic(BasicKind::Int);
//! let const_ref = int.with_const().with_reference(RefKind::LValue);
//! assert!(const_ref.is_const_reference());
//! assert_eq!(const_ref.plain(), int);
//! ```

use crate::{BasicKind, TypeHash};

/// Reference derivation of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RefKind {
    /// Not a reference.
    #[default]
    None,
    /// `T&`
    LValue,
    /// `T&&`
    RValue,
}

/// A complete type: base type hash plus derivations.
///
/// ```text
/// int          -> { base: int, is_const: false, pointers: 0, reference: None }
/// const C&     -> { base: C,   is_const: true,  pointers: 0, reference: LValue }
/// C*           -> { base: C,   is_const: false, pointers: 1, reference: None }
/// C&&          -> { base: C,   is_const: false, pointers: 0, reference: RValue }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataType {
    /// Hash of the base type.
    pub base: TypeHash,
    /// `const` qualification of the pointee/value.
    pub is_const: bool,
    /// Number of pointer levels.
    pub pointers: u8,
    /// Reference derivation.
    pub reference: RefKind,
}

impl DataType {
    /// A type with no derivations.
    #[inline]
    pub const fn simple(base: TypeHash) -> Self {
        Self {
            base,
            is_const: false,
            pointers: 0,
            reference: RefKind::None,
        }
    }

    /// The plain basic type of the given kind.
    #[inline]
    pub fn basic(kind: BasicKind) -> Self {
        Self::simple(kind.hash())
    }

    /// `void`
    #[inline]
    pub fn void() -> Self {
        Self::basic(BasicKind::Void)
    }

    /// `bool`
    #[inline]
    pub fn bool() -> Self {
        Self::basic(BasicKind::Bool)
    }

    /// The type of the `null` literal.
    #[inline]
    pub fn null_ptr() -> Self {
        Self::basic(BasicKind::NullPtr)
    }

    /// Add `const`.
    #[inline]
    pub fn with_const(self) -> Self {
        Self {
            is_const: true,
            ..self
        }
    }

    /// Remove `const`.
    #[inline]
    pub fn without_const(self) -> Self {
        Self {
            is_const: false,
            ..self
        }
    }

    /// Add one pointer level. A reference is dropped first.
    #[inline]
    pub fn pointer_to(self) -> Self {
        Self {
            pointers: self.pointers + 1,
            reference: RefKind::None,
            ..self
        }
    }

    /// Remove one pointer level; `None` if this is not a pointer.
    #[inline]
    pub fn pointee(self) -> Option<Self> {
        if self.pointers == 0 {
            return None;
        }
        Some(Self {
            pointers: self.pointers - 1,
            reference: RefKind::None,
            ..self
        })
    }

    /// Replace the reference derivation.
    #[inline]
    pub fn with_reference(self, reference: RefKind) -> Self {
        Self { reference, ..self }
    }

    /// Drop any reference derivation.
    #[inline]
    pub fn without_reference(self) -> Self {
        Self {
            reference: RefKind::None,
            ..self
        }
    }

    /// The type with reference and top-level `const` removed.
    ///
    /// For pointers the `const` applies to the pointee and is kept.
    #[inline]
    pub fn plain(self) -> Self {
        if self.pointers > 0 {
            return self.without_reference();
        }
        Self::simple(self.base)
    }

    /// Whether any derivation is applied.
    #[inline]
    pub fn is_derived(&self) -> bool {
        self.is_const || self.pointers > 0 || self.reference != RefKind::None
    }

    /// `T&` (const or not).
    #[inline]
    pub fn is_reference(&self) -> bool {
        self.reference == RefKind::LValue
    }

    /// `const T&`
    #[inline]
    pub fn is_const_reference(&self) -> bool {
        self.reference == RefKind::LValue && self.is_const
    }

    /// `T&` without const.
    #[inline]
    pub fn is_non_const_reference(&self) -> bool {
        self.reference == RefKind::LValue && !self.is_const
    }

    /// `T&&`
    #[inline]
    pub fn is_rvalue_reference(&self) -> bool {
        self.reference == RefKind::RValue
    }

    /// Any reference kind.
    #[inline]
    pub fn is_any_reference(&self) -> bool {
        self.reference != RefKind::None
    }

    /// A pointer that is not itself behind a reference.
    #[inline]
    pub fn is_pointer(&self) -> bool {
        self.pointers > 0 && self.reference == RefKind::None
    }

    /// `void`
    #[inline]
    pub fn is_void(&self) -> bool {
        !self.is_derived() && self.base == BasicKind::Void.hash()
    }

    /// `bool` (ignoring const and reference).
    #[inline]
    pub fn is_bool(&self) -> bool {
        self.pointers == 0 && self.base == BasicKind::Bool.hash()
    }

    /// Identity of the full derived type, used in function signatures and
    /// as a map key for derived types.
    #[inline]
    pub fn identity(&self) -> TypeHash {
        let reference = match self.reference {
            RefKind::None => 0u64,
            RefKind::LValue => 1,
            RefKind::RValue => 2,
        };
        let bits = (self.is_const as u64) | (reference << 1) | ((self.pointers as u64) << 3);
        TypeHash::from_derived(self.base, bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_queries() {
        let c = DataType::simple(TypeHash::from_name("C"));
        assert!(c.with_reference(RefKind::LValue).is_reference());
        assert!(c.with_reference(RefKind::LValue).is_non_const_reference());
        assert!(
            c.with_const()
                .with_reference(RefKind::LValue)
                .is_const_reference()
        );
        assert!(c.with_reference(RefKind::RValue).is_rvalue_reference());
        assert!(!c.is_any_reference());
    }

    #[test]
    fn pointer_round_trip() {
        let c = DataType::simple(TypeHash::from_name("C"));
        let p = c.pointer_to();
        assert!(p.is_pointer());
        assert_eq!(p.pointee(), Some(c));
        assert_eq!(c.pointee(), None);
    }

    #[test]
    fn plain_strips_const_and_reference() {
        let int = DataType::basic(BasicKind::Int);
        let r = int.with_const().with_reference(RefKind::LValue);
        assert_eq!(r.plain(), int);
    }

    #[test]
    fn plain_keeps_pointee_const() {
        let p = DataType::basic(BasicKind::Char).with_const().pointer_to();
        assert!(p.plain().is_const);
        assert!(p.plain().is_pointer());
    }

    #[test]
    fn identity_distinguishes_derivations() {
        let int = DataType::basic(BasicKind::Int);
        assert_eq!(int.identity(), int.base);
        assert_ne!(int.with_const().identity(), int.identity());
        assert_ne!(int.pointer_to().identity(), int.identity());
        assert_ne!(
            int.with_reference(RefKind::LValue).identity(),
            int.with_reference(RefKind::RValue).identity()
        );
    }
}
