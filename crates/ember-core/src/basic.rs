//! Basic (non-class) value types.

use crate::TypeHash;

/// The built-in value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BasicKind {
    Void,
    Bool,
    SByte,
    Byte,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    Char,
    WChar,
    UChar,
    /// Type of the `null` literal.
    NullPtr,
}

impl BasicKind {
    /// Every basic kind, in declaration order.
    pub const ALL: [BasicKind; 16] = [
        BasicKind::Void,
        BasicKind::Bool,
        BasicKind::SByte,
        BasicKind::Byte,
        BasicKind::Short,
        BasicKind::UShort,
        BasicKind::Int,
        BasicKind::UInt,
        BasicKind::Long,
        BasicKind::ULong,
        BasicKind::Float,
        BasicKind::Double,
        BasicKind::Char,
        BasicKind::WChar,
        BasicKind::UChar,
        BasicKind::NullPtr,
    ];

    /// Integer kinds ordered by width, signed before unsigned.
    pub const INTEGERS: [BasicKind; 8] = [
        BasicKind::SByte,
        BasicKind::Byte,
        BasicKind::Short,
        BasicKind::UShort,
        BasicKind::Int,
        BasicKind::UInt,
        BasicKind::Long,
        BasicKind::ULong,
    ];

    /// Source-level name.
    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Void => "void",
            BasicKind::Bool => "bool",
            BasicKind::SByte => "sbyte",
            BasicKind::Byte => "byte",
            BasicKind::Short => "short",
            BasicKind::UShort => "ushort",
            BasicKind::Int => "int",
            BasicKind::UInt => "uint",
            BasicKind::Long => "long",
            BasicKind::ULong => "ulong",
            BasicKind::Float => "float",
            BasicKind::Double => "double",
            BasicKind::Char => "char",
            BasicKind::WChar => "wchar",
            BasicKind::UChar => "uchar",
            BasicKind::NullPtr => "@nullptr_type",
        }
    }

    /// Type hash of this basic type.
    #[inline]
    pub fn hash(self) -> TypeHash {
        TypeHash::from_name(self.name())
    }

    /// Look up a basic kind from its hash.
    pub fn from_hash(hash: TypeHash) -> Option<BasicKind> {
        Self::ALL.into_iter().find(|k| k.hash() == hash)
    }

    /// Storage size in bytes (`void` is 0, pointers are 8).
    pub fn size(self) -> u64 {
        match self {
            BasicKind::Void => 0,
            BasicKind::Bool | BasicKind::SByte | BasicKind::Byte | BasicKind::Char => 1,
            BasicKind::Short | BasicKind::UShort | BasicKind::WChar => 2,
            BasicKind::Int | BasicKind::UInt | BasicKind::Float | BasicKind::UChar => 4,
            BasicKind::Long | BasicKind::ULong | BasicKind::Double | BasicKind::NullPtr => 8,
        }
    }

    pub fn is_integer(self) -> bool {
        Self::INTEGERS.contains(&self)
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            BasicKind::SByte | BasicKind::Short | BasicKind::Int | BasicKind::Long
        )
    }

    pub fn is_unsigned(self) -> bool {
        self.is_integer() && !self.is_signed()
    }

    pub fn is_floating(self) -> bool {
        matches!(self, BasicKind::Float | BasicKind::Double)
    }

    pub fn is_char(self) -> bool {
        matches!(self, BasicKind::Char | BasicKind::WChar | BasicKind::UChar)
    }

    pub fn is_arithmetic(self) -> bool {
        self.is_integer() || self.is_floating()
    }

    /// Signed integer kind of the given width in bytes.
    pub fn signed_of_size(size: u64) -> Option<BasicKind> {
        match size {
            1 => Some(BasicKind::SByte),
            2 => Some(BasicKind::Short),
            4 => Some(BasicKind::Int),
            8 => Some(BasicKind::Long),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_round_trip() {
        for kind in BasicKind::ALL {
            assert_eq!(BasicKind::from_hash(kind.hash()), Some(kind));
        }
    }

    #[test]
    fn classification() {
        assert!(BasicKind::Int.is_signed());
        assert!(BasicKind::UInt.is_unsigned());
        assert!(!BasicKind::Float.is_integer());
        assert!(BasicKind::Double.is_arithmetic());
        assert!(!BasicKind::Char.is_arithmetic());
        assert_eq!(BasicKind::signed_of_size(2), Some(BasicKind::Short));
    }
}
