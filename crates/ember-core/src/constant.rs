//! Compile-time constant values.
//!
//! Literals, named constants, enum constants and switch case labels are all
//! represented as a [`ConstantValue`]. Floats are wrapped in
//! [`OrderedFloat`] so constants can be hashed and used as map keys (the
//! switch case-constant map relies on this).

use ordered_float::OrderedFloat;
use std::fmt;

use crate::BasicKind;

/// A typed compile-time value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstantValue {
    Bool(bool),
    SByte(i8),
    Byte(u8),
    Short(i16),
    UShort(u16),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Float(OrderedFloat<f32>),
    Double(OrderedFloat<f64>),
    Char(u8),
    WChar(u16),
    UChar(u32),
    /// String literal bytes; typed `const char*`.
    String(Vec<u8>),
    Null,
}

impl ConstantValue {
    /// Basic kind of the value; `None` for strings.
    pub fn kind(&self) -> Option<BasicKind> {
        Some(match self {
            ConstantValue::Bool(_) => BasicKind::Bool,
            ConstantValue::SByte(_) => BasicKind::SByte,
            ConstantValue::Byte(_) => BasicKind::Byte,
            ConstantValue::Short(_) => BasicKind::Short,
            ConstantValue::UShort(_) => BasicKind::UShort,
            ConstantValue::Int(_) => BasicKind::Int,
            ConstantValue::UInt(_) => BasicKind::UInt,
            ConstantValue::Long(_) => BasicKind::Long,
            ConstantValue::ULong(_) => BasicKind::ULong,
            ConstantValue::Float(_) => BasicKind::Float,
            ConstantValue::Double(_) => BasicKind::Double,
            ConstantValue::Char(_) => BasicKind::Char,
            ConstantValue::WChar(_) => BasicKind::WChar,
            ConstantValue::UChar(_) => BasicKind::UChar,
            ConstantValue::Null => BasicKind::NullPtr,
            ConstantValue::String(_) => return None,
        })
    }

    /// Integer (or character/bool) payload widened to `i128`.
    pub fn as_i128(&self) -> Option<i128> {
        Some(match *self {
            ConstantValue::Bool(b) => b as i128,
            ConstantValue::SByte(v) => v as i128,
            ConstantValue::Byte(v) => v as i128,
            ConstantValue::Short(v) => v as i128,
            ConstantValue::UShort(v) => v as i128,
            ConstantValue::Int(v) => v as i128,
            ConstantValue::UInt(v) => v as i128,
            ConstantValue::Long(v) => v as i128,
            ConstantValue::ULong(v) => v as i128,
            ConstantValue::Char(v) => v as i128,
            ConstantValue::WChar(v) => v as i128,
            ConstantValue::UChar(v) => v as i128,
            _ => return None,
        })
    }

    /// Floating payload widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            ConstantValue::Float(v) => Some(v.0 as f64),
            ConstantValue::Double(v) => Some(v.0),
            _ => self.as_i128().map(|v| v as f64),
        }
    }

    /// Build an integer-like constant of `kind` from `value`, if it fits.
    pub fn integer(kind: BasicKind, value: i128) -> Option<ConstantValue> {
        Some(match kind {
            BasicKind::Bool => ConstantValue::Bool(value != 0),
            BasicKind::SByte => ConstantValue::SByte(i8::try_from(value).ok()?),
            BasicKind::Byte => ConstantValue::Byte(u8::try_from(value).ok()?),
            BasicKind::Short => ConstantValue::Short(i16::try_from(value).ok()?),
            BasicKind::UShort => ConstantValue::UShort(u16::try_from(value).ok()?),
            BasicKind::Int => ConstantValue::Int(i32::try_from(value).ok()?),
            BasicKind::UInt => ConstantValue::UInt(u32::try_from(value).ok()?),
            BasicKind::Long => ConstantValue::Long(i64::try_from(value).ok()?),
            BasicKind::ULong => ConstantValue::ULong(u64::try_from(value).ok()?),
            BasicKind::Char => ConstantValue::Char(u8::try_from(value).ok()?),
            BasicKind::WChar => ConstantValue::WChar(u16::try_from(value).ok()?),
            BasicKind::UChar => ConstantValue::UChar(u32::try_from(value).ok()?),
            BasicKind::Float => ConstantValue::Float(OrderedFloat(value as f32)),
            BasicKind::Double => ConstantValue::Double(OrderedFloat(value as f64)),
            BasicKind::Void | BasicKind::NullPtr => return None,
        })
    }

    /// Convert to another basic kind, failing when an integer value does not fit.
    pub fn convert_to(&self, kind: BasicKind) -> Option<ConstantValue> {
        if self.kind() == Some(kind) {
            return Some(self.clone());
        }
        if let Some(v) = self.as_i128() {
            return ConstantValue::integer(kind, v);
        }
        let f = self.as_f64()?;
        match kind {
            BasicKind::Float => Some(ConstantValue::Float(OrderedFloat(f as f32))),
            BasicKind::Double => Some(ConstantValue::Double(OrderedFloat(f))),
            _ => None,
        }
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Bool(v) => write!(f, "{v}"),
            ConstantValue::Float(v) => write!(f, "{}f", v.0),
            ConstantValue::Double(v) => write!(f, "{}", v.0),
            ConstantValue::String(bytes) => write!(f, "\"{}\"", String::from_utf8_lossy(bytes)),
            ConstantValue::Null => write!(f, "null"),
            other => match other.as_i128() {
                Some(v) => write!(f, "{v}"),
                None => write!(f, "?"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_respects_range() {
        assert_eq!(
            ConstantValue::integer(BasicKind::SByte, -128),
            Some(ConstantValue::SByte(-128))
        );
        assert_eq!(ConstantValue::integer(BasicKind::SByte, 128), None);
        assert_eq!(ConstantValue::integer(BasicKind::Byte, -1), None);
    }

    #[test]
    fn convert_between_widths() {
        let v = ConstantValue::SByte(5);
        assert_eq!(v.convert_to(BasicKind::Long), Some(ConstantValue::Long(5)));
        assert_eq!(
            ConstantValue::Int(300).convert_to(BasicKind::Byte),
            None
        );
    }

    #[test]
    fn floats_are_hashable_keys() {
        let mut set = std::collections::HashSet::new();
        set.insert(ConstantValue::Double(OrderedFloat(1.5)));
        assert!(set.contains(&ConstantValue::Double(OrderedFloat(1.5))));
    }
}
