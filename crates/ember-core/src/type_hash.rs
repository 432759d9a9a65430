//! Deterministic identities for types and functions.
//!
//! A [`TypeHash`] is computed from a qualified name (types) or from a name
//! plus parameter signature (functions). The same declaration always maps to
//! the same hash, so bound nodes and emitted instructions can refer to
//! symbols without holding references into the registry.
//!
//! ```
//! use ember_core::TypeHash;
//!
//! let a = TypeHash::from_function("print", &[TypeHash::from_name("int")]);
//! let b = TypeHash::from_function("print", &[TypeHash::from_name("long")]);
//! assert_ne!(a, b);
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-separation constants so that a type and a function with the same
/// spelling never collide.
mod domain {
    pub const SEP: u64 = 0x4bc94d6bd06053ad;
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;
    pub const FUNCTION: u64 = 0x5ea77ffbcdf5f302;
    pub const METHOD: u64 = 0x7d3c8b4a92e15f6d;
    pub const CONSTRUCTOR: u64 = 0x9a7f3d5e2b8c4601;
    pub const DESTRUCTOR: u64 = 0x3e9f5d2a8c7b1403;
    pub const DERIVED: u64 = 0x1a095090689d4647;
    pub const PARAM: u64 = 0x9e3779b97f4a7c15;
}

/// A 64-bit identity for a type, function, method or constructor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Hash of a qualified type name such as `"int"` or `"Game::Player"`.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(domain::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Hash of a free function from its qualified name and parameter hashes.
    ///
    /// Parameter order matters: `(int, long)` and `(long, int)` differ.
    #[inline]
    pub fn from_function(name: &str, params: &[TypeHash]) -> Self {
        Self::mix_params(domain::FUNCTION ^ xxh64(name.as_bytes(), 0), params)
    }

    /// Hash of a member function of `owner`.
    #[inline]
    pub fn from_method(owner: TypeHash, name: &str, params: &[TypeHash]) -> Self {
        Self::mix_params(domain::METHOD ^ owner.0 ^ xxh64(name.as_bytes(), 0), params)
    }

    /// Hash of a constructor of `owner`.
    #[inline]
    pub fn from_constructor(owner: TypeHash, params: &[TypeHash]) -> Self {
        Self::mix_params(domain::CONSTRUCTOR ^ owner.0, params)
    }

    /// Hash of the destructor of `owner`.
    #[inline]
    pub fn from_destructor(owner: TypeHash) -> Self {
        TypeHash(domain::DESTRUCTOR ^ owner.0.rotate_left(17))
    }

    /// Hash of a derived type (pointer, reference, const) over `base`.
    ///
    /// `derivation` packs the derivation bits; see `DataType::identity`.
    #[inline]
    pub fn from_derived(base: TypeHash, derivation: u64) -> Self {
        if derivation == 0 {
            return base;
        }
        TypeHash(
            base.0
                .wrapping_mul(domain::SEP)
                .wrapping_add(domain::DERIVED ^ derivation),
        )
    }

    fn mix_params(seed: u64, params: &[TypeHash]) -> Self {
        let mut hash = seed;
        for (i, param) in params.iter().enumerate() {
            let marker = domain::PARAM.wrapping_mul(i as u64 + 1);
            hash = hash.wrapping_mul(domain::SEP).wrapping_add(marker ^ param.0);
        }
        TypeHash(hash)
    }

    /// Whether this is the empty hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_deterministic() {
        assert_eq!(TypeHash::from_name("int"), TypeHash::from_name("int"));
        assert_ne!(TypeHash::from_name("int"), TypeHash::from_name("uint"));
    }

    #[test]
    fn parameter_order_matters() {
        let int = TypeHash::from_name("int");
        let long = TypeHash::from_name("long");
        assert_ne!(
            TypeHash::from_function("f", &[int, long]),
            TypeHash::from_function("f", &[long, int])
        );
    }

    #[test]
    fn domains_do_not_collide() {
        let owner = TypeHash::from_name("C");
        assert_ne!(
            TypeHash::from_method(owner, "f", &[]),
            TypeHash::from_function("f", &[])
        );
        assert_ne!(
            TypeHash::from_constructor(owner, &[]),
            TypeHash::from_destructor(owner)
        );
    }

    #[test]
    fn zero_derivation_is_the_base() {
        let base = TypeHash::from_name("C");
        assert_eq!(TypeHash::from_derived(base, 0), base);
        assert_ne!(TypeHash::from_derived(base, 1), base);
    }
}
