//! Basic types, their raw operators and their conversion table.
//!
//! Operators of the basic types are ordinary free functions in the global
//! namespace (`operator+(int, int)`, ...) marked with an [`IntrinsicOp`], so
//! overload resolution treats them exactly like user-declared operators.
//! Binary arithmetic is only declared for the "computation" kinds
//! (`int`, `uint`, `long`, `ulong`, `float`, `double`); narrower operands
//! reach them through promotions.

use ember_core::{BasicKind, DataType, FunctionEntry, IntrinsicOp, Param, RefKind};

use crate::SymbolRegistry;

/// Kinds binary arithmetic and comparisons are declared for.
const COMPUTATION_KINDS: [BasicKind; 6] = [
    BasicKind::Int,
    BasicKind::UInt,
    BasicKind::Long,
    BasicKind::ULong,
    BasicKind::Float,
    BasicKind::Double,
];

/// Kinds the integer-only operators (`%`, shifts, bitwise) are declared for.
const INTEGER_COMPUTATION_KINDS: [BasicKind; 4] = [
    BasicKind::Int,
    BasicKind::UInt,
    BasicKind::Long,
    BasicKind::ULong,
];

/// How a basic value converts to another basic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicConversionClass {
    /// Integral promotion to `int`/`uint`, `bool` to `int`, `float` to `double`.
    Promotion,
    /// Value-preserving integral widening.
    Widening,
    /// Integer or character to `double`.
    ToDouble,
    /// Arithmetic or character value tested against zero.
    ToBool,
    /// Anything that may lose information; explicit casts only.
    Narrowing,
}

impl BasicConversionClass {
    /// Whether the conversion may be applied implicitly.
    pub fn is_implicit(self) -> bool {
        !matches!(self, BasicConversionClass::Narrowing)
    }
}

/// Value range of an integer-like kind as (signed, bytes).
fn integer_shape(kind: BasicKind) -> Option<(bool, u64)> {
    if kind.is_integer() {
        Some((kind.is_signed(), kind.size()))
    } else if kind.is_char() {
        Some((false, kind.size()))
    } else {
        None
    }
}

/// Classify the conversion `from -> to` between two distinct basic kinds.
///
/// `None` means no conversion exists at all (void, the null type).
pub fn classify_basic_conversion(from: BasicKind, to: BasicKind) -> Option<BasicConversionClass> {
    use BasicConversionClass::*;

    if matches!(from, BasicKind::Void | BasicKind::NullPtr)
        || matches!(to, BasicKind::Void | BasicKind::NullPtr)
    {
        return None;
    }
    if to == BasicKind::Bool {
        return Some(ToBool);
    }
    if from == BasicKind::Bool {
        return Some(match to {
            BasicKind::Int => Promotion,
            t if t.is_integer() => Widening,
            _ => Narrowing,
        });
    }

    match (integer_shape(from), integer_shape(to)) {
        (Some((from_signed, from_size)), Some((to_signed, to_size))) => {
            let promotes = matches!(
                (from, to),
                (
                    BasicKind::SByte
                        | BasicKind::Byte
                        | BasicKind::Short
                        | BasicKind::UShort
                        | BasicKind::Char
                        | BasicKind::WChar,
                    BasicKind::Int
                ) | (BasicKind::UChar, BasicKind::UInt)
            );
            if promotes {
                return Some(Promotion);
            }
            if to.is_char() {
                return Some(Narrowing);
            }
            let preserves = match (from_signed, to_signed) {
                (false, false) | (true, true) => to_size >= from_size,
                (false, true) => to_size > from_size,
                (true, false) => false,
            };
            Some(if preserves { Widening } else { Narrowing })
        }
        (Some(_), None) => Some(match to {
            BasicKind::Double => ToDouble,
            _ => Narrowing,
        }),
        (None, _) => Some(match (from, to) {
            (BasicKind::Float, BasicKind::Double) => Promotion,
            _ => Narrowing,
        }),
    }
}

fn param(name: &str, kind: BasicKind) -> Param {
    Param::new(name, DataType::basic(kind))
}

fn binary(op: IntrinsicOp, kind: BasicKind, result: DataType) -> FunctionEntry {
    FunctionEntry::free(
        op.group_name(),
        vec![param("lhs", kind), param("rhs", kind)],
        result,
    )
    .with_intrinsic(op)
}

fn unary(op: IntrinsicOp, kind: BasicKind) -> FunctionEntry {
    FunctionEntry::free(op.group_name(), vec![param("operand", kind)], DataType::basic(kind))
        .with_intrinsic(op)
}

/// `operator++(K&) -> K&` and friends.
fn in_place(op: IntrinsicOp, kind: BasicKind) -> FunctionEntry {
    let reference = DataType::basic(kind).with_reference(RefKind::LValue);
    FunctionEntry::free(
        op.group_name(),
        vec![Param::new("operand", reference)],
        reference,
    )
    .with_intrinsic(op)
}

impl SymbolRegistry {
    /// Register every basic type and its raw operators. Calling this again is
    /// a no-op.
    pub fn register_basic_types(&mut self) {
        for kind in BasicKind::ALL {
            self.add_basic_type(kind);
        }

        for kind in COMPUTATION_KINDS {
            let value = DataType::basic(kind);
            for op in [
                IntrinsicOp::Add,
                IntrinsicOp::Sub,
                IntrinsicOp::Mul,
                IntrinsicOp::Div,
            ] {
                self.add_builtin(binary(op, kind, value));
            }
            for op in [IntrinsicOp::Less, IntrinsicOp::Equal] {
                self.add_builtin(binary(op, kind, DataType::bool()));
            }
            for op in [IntrinsicOp::Neg, IntrinsicOp::Plus] {
                self.add_builtin(unary(op, kind));
            }
        }

        for kind in INTEGER_COMPUTATION_KINDS {
            let value = DataType::basic(kind);
            for op in [
                IntrinsicOp::Rem,
                IntrinsicOp::Shl,
                IntrinsicOp::Shr,
                IntrinsicOp::BitAnd,
                IntrinsicOp::BitOr,
                IntrinsicOp::BitXor,
            ] {
                self.add_builtin(binary(op, kind, value));
            }
            self.add_builtin(unary(IntrinsicOp::Complement, kind));
        }

        self.add_builtin(binary(IntrinsicOp::Equal, BasicKind::Bool, DataType::bool()));
        self.add_builtin(unary(IntrinsicOp::Not, BasicKind::Bool));

        for kind in BasicKind::ALL {
            if kind.is_arithmetic() || kind.is_char() {
                self.add_builtin(in_place(IntrinsicOp::Increment, kind));
                self.add_builtin(in_place(IntrinsicOp::Decrement, kind));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BasicConversionClass::*;

    #[test]
    fn small_integers_promote_to_int() {
        assert_eq!(
            classify_basic_conversion(BasicKind::SByte, BasicKind::Int),
            Some(Promotion)
        );
        assert_eq!(
            classify_basic_conversion(BasicKind::UShort, BasicKind::Int),
            Some(Promotion)
        );
        assert_eq!(
            classify_basic_conversion(BasicKind::Bool, BasicKind::Int),
            Some(Promotion)
        );
    }

    #[test]
    fn widening_preserves_values() {
        assert_eq!(
            classify_basic_conversion(BasicKind::Int, BasicKind::Long),
            Some(Widening)
        );
        assert_eq!(
            classify_basic_conversion(BasicKind::UInt, BasicKind::Long),
            Some(Widening)
        );
        assert_eq!(
            classify_basic_conversion(BasicKind::UInt, BasicKind::Int),
            Some(Narrowing)
        );
        assert_eq!(
            classify_basic_conversion(BasicKind::Int, BasicKind::UInt),
            Some(Narrowing)
        );
    }

    #[test]
    fn integers_reach_double_implicitly_but_not_float() {
        assert_eq!(
            classify_basic_conversion(BasicKind::Long, BasicKind::Double),
            Some(ToDouble)
        );
        assert_eq!(
            classify_basic_conversion(BasicKind::Int, BasicKind::Float),
            Some(Narrowing)
        );
        assert_eq!(
            classify_basic_conversion(BasicKind::Float, BasicKind::Double),
            Some(Promotion)
        );
        assert_eq!(
            classify_basic_conversion(BasicKind::Double, BasicKind::Int),
            Some(Narrowing)
        );
    }

    #[test]
    fn void_and_null_do_not_convert() {
        assert_eq!(classify_basic_conversion(BasicKind::Void, BasicKind::Int), None);
        assert_eq!(classify_basic_conversion(BasicKind::Int, BasicKind::NullPtr), None);
    }

    #[test]
    fn operators_are_registered_once() {
        let mut registry = SymbolRegistry::with_basic_types();
        let count = registry.function_count();
        registry.register_basic_types();
        assert_eq!(registry.function_count(), count);

        let adds = registry.free_functions("operator+", registry.root());
        // Add and Plus for each computation kind.
        assert_eq!(adds.len(), 12);
        let equals = registry.free_functions("operator==", registry.root());
        assert_eq!(equals.len(), 7);
        assert!(equals.iter().all(|h| {
            registry
                .get_function(*h)
                .is_some_and(|f| f.return_type == DataType::bool() && !f.can_throw())
        }));
    }
}
