//! Conversions between basic types.

use ember_core::{BasicKind, ConstantValue};
use ember_registry::{BasicConversionClass, classify_basic_conversion};

use super::{Conversion, ConversionKind};

/// Largest integer magnitude `float` represents exactly.
const FLOAT_EXACT_LIMIT: i128 = 1 << 24;
/// Largest integer magnitude `double` represents exactly.
const DOUBLE_EXACT_LIMIT: i128 = 1 << 53;

/// Convert between two distinct basic kinds.
///
/// A constant argument may take an otherwise narrowing conversion implicitly
/// when its value is representable in the target.
pub fn basic_conversion(
    from: BasicKind,
    to: BasicKind,
    constant: Option<&ConstantValue>,
) -> Option<Conversion> {
    if from == to {
        return Some(Conversion::identity());
    }
    let class = classify_basic_conversion(from, to)?;
    let kind = ConversionKind::Basic { from, to };

    Some(match class {
        BasicConversionClass::Promotion => Conversion::implicit(kind, Conversion::COST_PROMOTION),
        BasicConversionClass::Widening => Conversion::implicit(kind, Conversion::COST_WIDENING),
        BasicConversionClass::ToDouble => Conversion::implicit(kind, Conversion::COST_TO_DOUBLE),
        BasicConversionClass::ToBool => Conversion::implicit(kind, Conversion::COST_TO_BOOL),
        BasicConversionClass::Narrowing => match constant {
            Some(value) if constant_fits(value, to) => {
                Conversion::implicit(ConversionKind::ConstantFit { to }, Conversion::COST_CONSTANT_FIT)
                    .with_distance(1)
            }
            _ => Conversion::explicit(kind),
        },
    })
}

/// Whether `value` is exactly representable as `to`.
pub fn constant_fits(value: &ConstantValue, to: BasicKind) -> bool {
    let Some(v) = value.as_i128() else {
        // Floating constants only narrow explicitly.
        return false;
    };
    match to {
        BasicKind::Float => v.abs() <= FLOAT_EXACT_LIMIT,
        BasicKind::Double => v.abs() <= DOUBLE_EXACT_LIMIT,
        BasicKind::Bool | BasicKind::Void | BasicKind::NullPtr => false,
        _ => ConstantValue::integer(to, v).is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_ranks_before_widening() {
        let promote = basic_conversion(BasicKind::Short, BasicKind::Int, None).unwrap();
        let widen = basic_conversion(BasicKind::Short, BasicKind::Long, None).unwrap();
        assert!(promote.rank() < widen.rank());
    }

    #[test]
    fn fitting_constant_narrows_implicitly() {
        let c = basic_conversion(BasicKind::Int, BasicKind::Byte, Some(&ConstantValue::Int(200)))
            .unwrap();
        assert!(c.is_implicit);
        assert_eq!(c.kind, ConversionKind::ConstantFit { to: BasicKind::Byte });
        assert_eq!(c.rank(), (Conversion::COST_CONSTANT_FIT, 1));

        let c = basic_conversion(BasicKind::Int, BasicKind::Byte, Some(&ConstantValue::Int(300)))
            .unwrap();
        assert!(!c.is_implicit);
    }

    #[test]
    fn constant_fit_ranks_after_widening() {
        let fit = basic_conversion(BasicKind::Int, BasicKind::Short, Some(&ConstantValue::Int(1)))
            .unwrap();
        let widen =
            basic_conversion(BasicKind::Int, BasicKind::Long, Some(&ConstantValue::Int(1))).unwrap();
        assert!(widen.rank() < fit.rank());
    }

    #[test]
    fn integer_constants_fit_float_when_exact() {
        assert!(constant_fits(&ConstantValue::Int(1 << 20), BasicKind::Float));
        assert!(!constant_fits(&ConstantValue::Int((1 << 24) + 1), BasicKind::Float));
        assert!(!constant_fits(
            &ConstantValue::Double(ember_core::OrderedFloat(1.5)),
            BasicKind::Float
        ));
    }

    #[test]
    fn negative_constant_does_not_fit_unsigned() {
        assert!(!constant_fits(&ConstantValue::Int(-1), BasicKind::UInt));
        assert!(constant_fits(&ConstantValue::Int(-1), BasicKind::SByte));
    }

    #[test]
    fn anything_arithmetic_tests_as_bool() {
        let c = basic_conversion(BasicKind::Double, BasicKind::Bool, None).unwrap();
        assert_eq!(c.cost, Conversion::COST_TO_BOOL);
    }
}
