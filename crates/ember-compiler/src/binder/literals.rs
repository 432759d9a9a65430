//! Literal typing and constant folding.
//!
//! Integer literals take the smallest type that holds their value, in the
//! order sbyte, byte, short, ushort, int, uint, long, ulong; a `u` suffix
//! restricts the search to the unsigned types.

use ember_core::{BasicKind, ConstantValue, DataType, IntrinsicOp, OrderedFloat, Span};
use ember_syntax::LiteralKind;

use crate::bound::{BoundExpr, BoundExprKind};
use crate::conversion::ConversionKind;

const INTEGER_ORDER: [BasicKind; 8] = [
    BasicKind::SByte,
    BasicKind::Byte,
    BasicKind::Short,
    BasicKind::UShort,
    BasicKind::Int,
    BasicKind::UInt,
    BasicKind::Long,
    BasicKind::ULong,
];

const SIGNED_ORDER: [BasicKind; 4] = [
    BasicKind::SByte,
    BasicKind::Short,
    BasicKind::Int,
    BasicKind::Long,
];

/// Bind a literal expression.
pub(super) fn bind_literal(kind: &LiteralKind<'_>, span: Span) -> BoundExpr {
    let (value, ty) = match *kind {
        LiteralKind::Int { value, unsigned } => {
            let value = integer_literal(value, unsigned);
            let kind = value.kind().unwrap_or(BasicKind::ULong);
            (value, DataType::basic(kind))
        }
        LiteralKind::Float(v) => (
            ConstantValue::Float(OrderedFloat(v)),
            DataType::basic(BasicKind::Float),
        ),
        LiteralKind::Double(v) => (
            ConstantValue::Double(OrderedFloat(v)),
            DataType::basic(BasicKind::Double),
        ),
        LiteralKind::Bool(v) => (ConstantValue::Bool(v), DataType::bool()),
        LiteralKind::Char(c) => (ConstantValue::Char(c), DataType::basic(BasicKind::Char)),
        LiteralKind::String(bytes) => (
            ConstantValue::String(bytes.to_vec()),
            DataType::basic(BasicKind::Char).with_const().pointer_to(),
        ),
        LiteralKind::Null => (ConstantValue::Null, DataType::null_ptr()),
    };
    BoundExpr::literal(value, ty, span)
}

/// Smallest-fit constant for an integer literal.
fn integer_literal(value: u64, unsigned: bool) -> ConstantValue {
    INTEGER_ORDER
        .into_iter()
        .filter(|k| !unsigned || k.is_unsigned())
        .find_map(|k| ConstantValue::integer(k, i128::from(value)))
        .unwrap_or(ConstantValue::ULong(value))
}

/// `-literal`, folded.
///
/// Integers become the narrowest signed type at least as wide as the
/// operand that holds the negated value, so `-128` stays `sbyte` while
/// `-255` (a `byte` operand) becomes `short`.
pub(super) fn negate_literal(value: &ConstantValue, span: Span) -> Option<BoundExpr> {
    match value {
        ConstantValue::Float(v) => Some(BoundExpr::literal(
            ConstantValue::Float(OrderedFloat(-v.0)),
            DataType::basic(BasicKind::Float),
            span,
        )),
        ConstantValue::Double(v) => Some(BoundExpr::literal(
            ConstantValue::Double(OrderedFloat(-v.0)),
            DataType::basic(BasicKind::Double),
            span,
        )),
        _ => {
            let kind = value.kind().filter(|k| k.is_integer())?;
            let negated = -value.as_i128()?;
            SIGNED_ORDER
                .into_iter()
                .filter(|k| k.size() >= kind.size())
                .find_map(|k| ConstantValue::integer(k, negated).map(|v| (k, v)))
                .map(|(k, v)| BoundExpr::literal(v, DataType::basic(k), span))
        }
    }
}

// ============================================================================
// Constant Folding
// ============================================================================

/// Compile-time value of a bound expression built from literals, raw
/// operators, basic conversions and `sizeof`.
pub fn fold_constant(expr: &BoundExpr) -> Option<ConstantValue> {
    match &expr.kind {
        BoundExprKind::Literal(value) => Some(value.clone()),
        BoundExprKind::SizeOf { size, .. } => Some(ConstantValue::ULong(*size)),
        BoundExprKind::Conversion {
            operand,
            conversion,
        }
        | BoundExprKind::Cast {
            operand,
            conversion,
        } => {
            let inner = fold_constant(operand)?;
            match conversion {
                ConversionKind::Identity
                | ConversionKind::Qualification
                | ConversionKind::IntegerToEnum { .. } => Some(inner),
                ConversionKind::Basic { to, .. }
                | ConversionKind::ConstantFit { to }
                | ConversionKind::EnumToInteger { to, .. } => convert_wrapping(&inner, *to),
                _ => None,
            }
        }
        BoundExprKind::Unary { function, operand } => {
            let value = fold_constant(operand)?;
            fold_unary(function.intrinsic?, &value)
        }
        BoundExprKind::Binary {
            function,
            left,
            right,
        } => {
            let l = fold_constant(left)?;
            let r = fold_constant(right)?;
            let result = function.return_type.plain();
            fold_binary(function.intrinsic?, &l, &r, BasicKind::from_hash(result.base)?)
        }
        _ => None,
    }
}

/// Conversion of a constant, truncating integers like the runtime would.
fn convert_wrapping(value: &ConstantValue, to: BasicKind) -> Option<ConstantValue> {
    if to.is_integer() || to == BasicKind::Bool || to.is_char() {
        if let Some(v) = value.as_i128() {
            return wrap(to, v);
        }
        let f = value.as_f64()?;
        return wrap(to, f.trunc() as i128);
    }
    value.convert_to(to)
}

/// `v` truncated to the width of `kind`.
fn wrap(kind: BasicKind, v: i128) -> Option<ConstantValue> {
    if kind == BasicKind::Bool {
        return Some(ConstantValue::Bool(v != 0));
    }
    let bits = kind.size() * 8;
    if bits == 0 || bits > 64 {
        return None;
    }
    let modulus = 1i128 << bits;
    let mut out = v.rem_euclid(modulus);
    if kind.is_signed() && out >= modulus / 2 {
        out -= modulus;
    }
    ConstantValue::integer(kind, out)
}

fn fold_unary(op: IntrinsicOp, value: &ConstantValue) -> Option<ConstantValue> {
    let kind = value.kind()?;
    match op {
        IntrinsicOp::Plus => Some(value.clone()),
        IntrinsicOp::Not => match value {
            ConstantValue::Bool(b) => Some(ConstantValue::Bool(!b)),
            _ => None,
        },
        IntrinsicOp::Neg => match value {
            ConstantValue::Float(v) => Some(ConstantValue::Float(OrderedFloat(-v.0))),
            ConstantValue::Double(v) => Some(ConstantValue::Double(OrderedFloat(-v.0))),
            _ => wrap(kind, -value.as_i128()?),
        },
        IntrinsicOp::Complement => wrap(kind, !value.as_i128()?),
        _ => None,
    }
}

fn fold_binary(
    op: IntrinsicOp,
    l: &ConstantValue,
    r: &ConstantValue,
    result: BasicKind,
) -> Option<ConstantValue> {
    if let (Some(a), Some(b)) = (l.as_i128(), r.as_i128()) {
        let v = match op {
            IntrinsicOp::Add => a + b,
            IntrinsicOp::Sub => a - b,
            IntrinsicOp::Mul => a.checked_mul(b)?,
            IntrinsicOp::Div => a.checked_div(b)?,
            IntrinsicOp::Rem => a.checked_rem(b)?,
            IntrinsicOp::Shl => a.checked_shl(u32::try_from(b).ok()?)?,
            IntrinsicOp::Shr => a.checked_shr(u32::try_from(b).ok()?)?,
            IntrinsicOp::BitAnd => a & b,
            IntrinsicOp::BitOr => a | b,
            IntrinsicOp::BitXor => a ^ b,
            IntrinsicOp::Less => return Some(ConstantValue::Bool(a < b)),
            IntrinsicOp::Equal => return Some(ConstantValue::Bool(a == b)),
            _ => return None,
        };
        return wrap(result, v);
    }

    let (a, b) = (l.as_f64()?, r.as_f64()?);
    let v = match op {
        IntrinsicOp::Add => a + b,
        IntrinsicOp::Sub => a - b,
        IntrinsicOp::Mul => a * b,
        IntrinsicOp::Div => a / b,
        IntrinsicOp::Less => return Some(ConstantValue::Bool(a < b)),
        IntrinsicOp::Equal => return Some(ConstantValue::Bool(a == b)),
        _ => return None,
    };
    ConstantValue::Double(OrderedFloat(v)).convert_to(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(expr: &BoundExpr) -> BasicKind {
        BasicKind::from_hash(expr.ty.base).unwrap()
    }

    fn int_lit(value: u64, unsigned: bool) -> BoundExpr {
        bind_literal(&LiteralKind::Int { value, unsigned }, Span::default())
    }

    #[test]
    fn integers_take_smallest_fitting_type() {
        assert_eq!(kind_of(&int_lit(1, false)), BasicKind::SByte);
        assert_eq!(kind_of(&int_lit(200, false)), BasicKind::Byte);
        assert_eq!(kind_of(&int_lit(40_000, false)), BasicKind::UShort);
        assert_eq!(kind_of(&int_lit(70_000, false)), BasicKind::Int);
        assert_eq!(kind_of(&int_lit(3_000_000_000, false)), BasicKind::UInt);
        assert_eq!(kind_of(&int_lit(u64::MAX, false)), BasicKind::ULong);
    }

    #[test]
    fn unsigned_suffix_skips_signed_types() {
        assert_eq!(kind_of(&int_lit(1, true)), BasicKind::Byte);
        assert_eq!(kind_of(&int_lit(300, true)), BasicKind::UShort);
    }

    #[test]
    fn negation_picks_signed_type() {
        let cases = [
            (255, BasicKind::Short, -255),
            (128, BasicKind::SByte, -128),
            (2_147_483_648, BasicKind::Int, -2_147_483_648),
            (5, BasicKind::SByte, -5),
        ];
        for (value, kind, expected) in cases {
            let lit = int_lit(value, false);
            let negated = negate_literal(lit.constant().unwrap(), Span::default()).unwrap();
            assert_eq!(kind_of(&negated), kind, "-{value}");
            assert_eq!(negated.constant().and_then(|c| c.as_i128()), Some(expected));
        }
    }

    #[test]
    fn string_literal_is_const_char_pointer() {
        let s = bind_literal(&LiteralKind::String(b"hi"), Span::default());
        assert!(s.ty.is_pointer());
        assert!(s.ty.is_const);
        assert_eq!(s.ty.base, BasicKind::Char.hash());
    }

    #[test]
    fn wrap_truncates_to_width() {
        assert_eq!(wrap(BasicKind::Byte, 256 + 7), Some(ConstantValue::Byte(7)));
        assert_eq!(wrap(BasicKind::SByte, 255), Some(ConstantValue::SByte(-1)));
        assert_eq!(wrap(BasicKind::UInt, -1), Some(ConstantValue::UInt(u32::MAX)));
    }

    #[test]
    fn binary_folding() {
        let v = fold_binary(
            IntrinsicOp::Mul,
            &ConstantValue::Int(6),
            &ConstantValue::Int(7),
            BasicKind::Int,
        );
        assert_eq!(v, Some(ConstantValue::Int(42)));
        assert_eq!(
            fold_binary(
                IntrinsicOp::Div,
                &ConstantValue::Int(1),
                &ConstantValue::Int(0),
                BasicKind::Int
            ),
            None
        );
        assert_eq!(
            fold_binary(
                IntrinsicOp::Less,
                &ConstantValue::Int(1),
                &ConstantValue::Int(2),
                BasicKind::Bool
            ),
            Some(ConstantValue::Bool(true))
        );
    }
}
