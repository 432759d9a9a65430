//! Type conversion system.
//!
//! Determines whether a value can be converted to another type, how, and at
//! what cost. Used by:
//!
//! - Overload resolution (which candidate is the best match?)
//! - Argument binding (which conversion node to insert?)
//! - Casts (explicit conversions)
//!
//! ## Conversion Priority
//!
//! Conversions are checked in this order:
//! 1. Reference binding rules of the target type
//! 2. Identity and qualification adjustments
//! 3. Null to pointer, pointer conversions, derived-to-base
//! 4. Basic conversions (promotion, widening, constants that fit, narrowing)
//! 5. Enum to integer and integer to enum
//! 6. User-defined (converting constructors and conversion functions)

mod basic;
mod class;

pub use basic::{basic_conversion, constant_fits};

use ember_core::{BasicKind, ConstantValue, DataType, RefKind, TypeHash};

use crate::bound::{ArgCategory, BoundExpr};
use crate::context::CompilationContext;

/// Whether explicit-only conversions may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionMode {
    Implicit,
    /// `cast<T>(e)` and functional casts.
    Explicit,
}

/// What is known about an argument when matching it against a parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgDesc {
    pub ty: DataType,
    pub category: ArgCategory,
    /// Value of a compile-time constant argument.
    pub constant: Option<ConstantValue>,
}

impl ArgDesc {
    pub fn of(expr: &BoundExpr) -> Self {
        Self {
            ty: expr.ty,
            category: expr.category,
            constant: expr.constant().cloned(),
        }
    }

    /// A non-constant rvalue of type `ty`.
    pub fn rvalue(ty: DataType) -> Self {
        Self {
            ty,
            category: ArgCategory::Rvalue,
            constant: None,
        }
    }

    /// A non-constant lvalue of type `ty`.
    pub fn lvalue(ty: DataType) -> Self {
        Self {
            ty,
            category: ArgCategory::Lvalue,
            constant: None,
        }
    }

    pub fn is_lvalue(&self) -> bool {
        self.category == ArgCategory::Lvalue || self.ty.is_reference()
    }

    pub fn is_null(&self) -> bool {
        matches!(self.constant, Some(ConstantValue::Null))
    }
}

/// A type conversion with its cost for overload resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub kind: ConversionKind,
    /// Rank of the conversion (lower is better).
    pub cost: u32,
    /// Tie-breaker within one cost: inheritance steps, or the cost of the
    /// inner conversion of a user-defined conversion.
    pub distance: u32,
    pub is_implicit: bool,
}

/// The kind of conversion being performed.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionKind {
    /// No conversion needed.
    Identity,
    /// `T*` to `const T*`, or an object bound to a const reference.
    Qualification,
    /// Between two basic types.
    Basic { from: BasicKind, to: BasicKind },
    /// A constant whose value is representable in the target type.
    ConstantFit { to: BasicKind },
    EnumToInteger { underlying: BasicKind, to: BasicKind },
    IntegerToEnum { enum_type: TypeHash },
    NullToPointer,
    PointerToBool,
    /// Pointer or object adjustment to a base class.
    DerivedToBase { base: TypeHash, steps: u32 },
    /// Downcast; explicit only.
    BaseToDerived { derived: TypeHash },
    /// Between unrelated pointer types; explicit only.
    PointerReinterpret,
    /// Through a non-explicit single-argument constructor of the target.
    Constructor { constructor: TypeHash },
    /// Through a conversion function of the source class.
    ConversionFunction { function: TypeHash },
}

impl Conversion {
    /// Cost for an exact match.
    pub const COST_EXACT: u32 = 0;
    /// Cost for adding const.
    pub const COST_QUALIFICATION: u32 = 1;
    /// Cost for integral promotion and `float` to `double`.
    pub const COST_PROMOTION: u32 = 2;
    pub const COST_NULL_TO_POINTER: u32 = 2;
    /// Cost for value-preserving widening.
    pub const COST_WIDENING: u32 = 3;
    /// Cost for a constant that fits its target; ranks after widening via
    /// its distance.
    pub const COST_CONSTANT_FIT: u32 = 3;
    pub const COST_DERIVED_TO_BASE: u32 = 3;
    /// Cost for integer or character to `double`.
    pub const COST_TO_DOUBLE: u32 = 4;
    pub const COST_TO_BOOL: u32 = 5;
    /// Cost for a user-defined conversion.
    pub const COST_USER_DEFINED: u32 = 6;
    /// Cost marker for explicit-only conversions.
    pub const COST_EXPLICIT: u32 = 8;

    pub fn identity() -> Self {
        Self::implicit(ConversionKind::Identity, Self::COST_EXACT)
    }

    pub fn implicit(kind: ConversionKind, cost: u32) -> Self {
        Self {
            kind,
            cost,
            distance: 0,
            is_implicit: true,
        }
    }

    pub fn explicit(kind: ConversionKind) -> Self {
        Self {
            kind,
            cost: Self::COST_EXPLICIT,
            distance: 0,
            is_implicit: false,
        }
    }

    pub fn with_distance(mut self, distance: u32) -> Self {
        self.distance = distance;
        self
    }

    /// `(cost, distance)`; lower is better.
    #[inline]
    pub fn rank(&self) -> (u32, u32) {
        (self.cost, self.distance)
    }

    pub fn is_exact(&self) -> bool {
        matches!(self.kind, ConversionKind::Identity)
    }

    /// Whether the conversion leaves the value untouched.
    pub fn is_trivial(&self) -> bool {
        matches!(
            self.kind,
            ConversionKind::Identity | ConversionKind::Qualification
        )
    }

    pub fn is_user_defined(&self) -> bool {
        matches!(
            self.kind,
            ConversionKind::Constructor { .. } | ConversionKind::ConversionFunction { .. }
        )
    }
}

// ============================================================================
// Entry Points
// ============================================================================

/// Find the cheapest conversion of `arg` to a parameter of type `to`.
pub fn find_conversion(
    ctx: &CompilationContext<'_>,
    arg: &ArgDesc,
    to: DataType,
    mode: ConversionMode,
) -> Option<Conversion> {
    convert(ctx, arg, to, mode, true)
}

/// Like [`find_conversion`] but never through user-defined conversions.
pub fn find_standard_conversion(
    ctx: &CompilationContext<'_>,
    arg: &ArgDesc,
    to: DataType,
    mode: ConversionMode,
) -> Option<Conversion> {
    convert(ctx, arg, to, mode, false)
}

/// Whether `arg` converts to `to` without any explicit-only step.
pub fn is_implicitly_convertible(ctx: &CompilationContext<'_>, arg: &ArgDesc, to: DataType) -> bool {
    find_conversion(ctx, arg, to, ConversionMode::Implicit).is_some()
}

fn convert(
    ctx: &CompilationContext<'_>,
    arg: &ArgDesc,
    to: DataType,
    mode: ConversionMode,
    allow_user: bool,
) -> Option<Conversion> {
    let from = arg.ty.without_reference();
    let target = to.without_reference();

    let conversion = match to.reference {
        RefKind::LValue if !to.is_const => {
            // Non-const lvalue references bind lvalues only, without
            // creating a temporary.
            if !arg.is_lvalue() {
                return None;
            }
            reference_binding(ctx, from, target)
        }
        RefKind::RValue => {
            if arg.is_lvalue() {
                return None;
            }
            value_conversion(ctx, arg, from, target, mode, allow_user)
        }
        RefKind::LValue => {
            let binds_directly = if from.pointers == 0 && target.pointers == 0 {
                from.base == target.base
            } else {
                from == target || from.with_const() == target
            };
            if binds_directly {
                Some(Conversion::identity())
            } else {
                value_conversion(ctx, arg, from, target, mode, allow_user)
            }
        }
        RefKind::None => value_conversion(ctx, arg, from, target, mode, allow_user),
    }?;

    (conversion.is_implicit || mode == ConversionMode::Explicit).then_some(conversion)
}

/// Binding an lvalue of type `from` to a non-const reference to `target`.
fn reference_binding(
    ctx: &CompilationContext<'_>,
    from: DataType,
    target: DataType,
) -> Option<Conversion> {
    if from.is_const && !target.is_const {
        return None;
    }
    if from.without_const() == target.without_const() {
        return Some(if from.is_const == target.is_const {
            Conversion::identity()
        } else {
            Conversion::implicit(ConversionKind::Qualification, Conversion::COST_QUALIFICATION)
        });
    }
    if from.pointers == 0 && target.pointers == 0 {
        return class::upcast(ctx, from.base, target.base);
    }
    None
}

/// Conversion between two value types (references already stripped).
fn value_conversion(
    ctx: &CompilationContext<'_>,
    arg: &ArgDesc,
    from: DataType,
    to: DataType,
    mode: ConversionMode,
    allow_user: bool,
) -> Option<Conversion> {
    let registry = ctx.registry();

    if from.pointers == 0 && to.pointers == 0 && from.base == to.base {
        return Some(Conversion::identity());
    }
    if from.pointers > 0 && from == to {
        return Some(Conversion::identity());
    }

    if arg.is_null() || (from.pointers == 0 && from.base == BasicKind::NullPtr.hash()) {
        return (to.pointers > 0).then(|| {
            Conversion::implicit(ConversionKind::NullToPointer, Conversion::COST_NULL_TO_POINTER)
        });
    }

    if from.pointers > 0 || to.pointers > 0 {
        return class::pointer_conversion(ctx, from, to);
    }

    if let (Some(from_kind), Some(to_kind)) = (registry.basic_kind(&from), registry.basic_kind(&to))
    {
        return basic_conversion(from_kind, to_kind, arg.constant.as_ref());
    }

    if let Some(enum_entry) = registry.get_enum(from.base) {
        let to_kind = registry.basic_kind(&to)?;
        return enum_to_integer(enum_entry.underlying, to_kind, arg.constant.as_ref());
    }

    if let Some(enum_entry) = registry.get_enum(to.base) {
        return registry
            .basic_kind(&from)
            .filter(|k| k.is_integer() || k.is_char())
            .map(|_| {
                Conversion::explicit(ConversionKind::IntegerToEnum {
                    enum_type: enum_entry.hash,
                })
            });
    }

    if registry.is_class_type(&from) && registry.is_class_type(&to) {
        if let Some(upcast) = class::upcast(ctx, from.base, to.base) {
            return Some(upcast);
        }
        if let Some(downcast) = class::downcast(ctx, from.base, to.base) {
            return Some(downcast);
        }
    }

    if !allow_user {
        return None;
    }

    let via_constructor = registry
        .is_class_type(&to)
        .then(|| class::constructor_conversion(ctx, arg, to.base, mode))
        .flatten();
    let via_function = registry
        .is_class_type(&from)
        .then(|| class::conversion_function(ctx, from.base, to, mode))
        .flatten();

    match (via_constructor, via_function) {
        (Some(a), Some(b)) => Some(if b.rank() < a.rank() { b } else { a }),
        (a, b) => a.or(b),
    }
}

/// Enum values convert like their underlying type, never cheaper than a
/// promotion.
fn enum_to_integer(
    underlying: BasicKind,
    to: BasicKind,
    constant: Option<&ConstantValue>,
) -> Option<Conversion> {
    let inner = if underlying == to {
        Conversion::identity()
    } else {
        basic_conversion(underlying, to, constant)?
    };
    let kind = ConversionKind::EnumToInteger { underlying, to };
    Some(if inner.is_implicit {
        Conversion::implicit(kind, inner.cost.max(Conversion::COST_PROMOTION))
            .with_distance(inner.distance)
    } else {
        Conversion::explicit(kind)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::{ClassEntry, EnumEntry, FunctionEntry, FunctionTraits, Param};
    use ember_registry::SymbolRegistry;

    fn int() -> DataType {
        DataType::basic(BasicKind::Int)
    }

    fn find(
        registry: &SymbolRegistry,
        arg: &ArgDesc,
        to: DataType,
        mode: ConversionMode,
    ) -> Option<Conversion> {
        let ctx = CompilationContext::new(registry);
        find_conversion(&ctx, arg, to, mode)
    }

    #[test]
    fn identity_ignores_top_level_const() {
        let registry = SymbolRegistry::with_basic_types();
        let c = find(
            &registry,
            &ArgDesc::lvalue(int().with_const()),
            int(),
            ConversionMode::Implicit,
        )
        .unwrap();
        assert!(c.is_exact());
    }

    #[test]
    fn non_const_reference_needs_lvalue() {
        let registry = SymbolRegistry::with_basic_types();
        let int_ref = int().with_reference(RefKind::LValue);
        assert!(
            find(&registry, &ArgDesc::rvalue(int()), int_ref, ConversionMode::Implicit).is_none()
        );
        assert!(
            find(&registry, &ArgDesc::lvalue(int()), int_ref, ConversionMode::Implicit)
                .is_some_and(|c| c.is_exact())
        );
        assert!(
            find(
                &registry,
                &ArgDesc::lvalue(int().with_const()),
                int_ref,
                ConversionMode::Implicit
            )
            .is_none()
        );
    }

    #[test]
    fn const_reference_accepts_rvalues() {
        let registry = SymbolRegistry::with_basic_types();
        let param = int().with_const().with_reference(RefKind::LValue);
        let c = find(
            &registry,
            &ArgDesc::rvalue(DataType::basic(BasicKind::Short)),
            param,
            ConversionMode::Implicit,
        )
        .unwrap();
        assert_eq!(c.cost, Conversion::COST_PROMOTION);
    }

    #[test]
    fn rvalue_reference_rejects_lvalues() {
        let registry = SymbolRegistry::with_basic_types();
        let param = int().with_reference(RefKind::RValue);
        assert!(find(&registry, &ArgDesc::lvalue(int()), param, ConversionMode::Implicit).is_none());
        assert!(find(&registry, &ArgDesc::rvalue(int()), param, ConversionMode::Implicit).is_some());
    }

    #[test]
    fn null_converts_to_any_pointer() {
        let registry = SymbolRegistry::with_basic_types();
        let null = ArgDesc {
            ty: DataType::null_ptr(),
            category: ArgCategory::Rvalue,
            constant: Some(ConstantValue::Null),
        };
        let c = find(&registry, &null, int().pointer_to(), ConversionMode::Implicit).unwrap();
        assert_eq!(c.kind, ConversionKind::NullToPointer);
        assert!(find(&registry, &null, int(), ConversionMode::Implicit).is_none());
    }

    #[test]
    fn narrowing_is_explicit_only() {
        let registry = SymbolRegistry::with_basic_types();
        let arg = ArgDesc::lvalue(DataType::basic(BasicKind::Long));
        assert!(find(&registry, &arg, int(), ConversionMode::Implicit).is_none());
        let c = find(&registry, &arg, int(), ConversionMode::Explicit).unwrap();
        assert!(!c.is_implicit);
        assert_eq!(c.cost, Conversion::COST_EXPLICIT);
    }

    #[test]
    fn enum_converts_to_underlying_at_promotion_cost() {
        let mut registry = SymbolRegistry::with_basic_types();
        let color = registry
            .register_enum(&[] as &[&str], EnumEntry::new("Color", BasicKind::Int).with_constant("Red", 0))
            .unwrap();
        let c = find(
            &registry,
            &ArgDesc::lvalue(DataType::simple(color)),
            int(),
            ConversionMode::Implicit,
        )
        .unwrap();
        assert_eq!(c.cost, Conversion::COST_PROMOTION);

        let back = find(
            &registry,
            &ArgDesc::lvalue(int()),
            DataType::simple(color),
            ConversionMode::Implicit,
        );
        assert!(back.is_none());
    }

    #[test]
    fn derived_pointer_converts_to_base_pointer() {
        let mut registry = SymbolRegistry::with_basic_types();
        let a = registry.register_class(ClassEntry::new("A")).unwrap();
        let b = registry
            .register_class(ClassEntry::new("B").with_base(a))
            .unwrap();
        let c = registry
            .register_class(ClassEntry::new("C").with_base(b))
            .unwrap();

        let conv = find(
            &registry,
            &ArgDesc::lvalue(DataType::simple(c).pointer_to()),
            DataType::simple(a).pointer_to(),
            ConversionMode::Implicit,
        )
        .unwrap();
        assert_eq!(conv.kind, ConversionKind::DerivedToBase { base: a, steps: 2 });
        assert_eq!(conv.rank(), (Conversion::COST_DERIVED_TO_BASE, 2));

        let down = find(
            &registry,
            &ArgDesc::lvalue(DataType::simple(a).pointer_to()),
            DataType::simple(c).pointer_to(),
            ConversionMode::Explicit,
        )
        .unwrap();
        assert_eq!(down.kind, ConversionKind::BaseToDerived { derived: c });
    }

    #[test]
    fn converting_constructor_is_user_defined() {
        let mut registry = SymbolRegistry::with_basic_types();
        let meters = registry.register_class(ClassEntry::new("Meters")).unwrap();
        registry
            .register_function(FunctionEntry::constructor(
                meters,
                vec![Param::new("value", DataType::basic(BasicKind::Double))],
            ))
            .unwrap();

        let conv = find(
            &registry,
            &ArgDesc::lvalue(DataType::basic(BasicKind::Double)),
            DataType::simple(meters),
            ConversionMode::Implicit,
        )
        .unwrap();
        assert!(matches!(conv.kind, ConversionKind::Constructor { .. }));
        assert_eq!(conv.cost, Conversion::COST_USER_DEFINED);
    }

    #[test]
    fn explicit_constructor_needs_explicit_mode() {
        let mut registry = SymbolRegistry::with_basic_types();
        let id = registry.register_class(ClassEntry::new("Id")).unwrap();
        registry
            .register_function(
                FunctionEntry::constructor(id, vec![Param::new("raw", int())])
                    .with_traits(FunctionTraits::EXPLICIT),
            )
            .unwrap();

        let arg = ArgDesc::lvalue(int());
        assert!(find(&registry, &arg, DataType::simple(id), ConversionMode::Implicit).is_none());
        assert!(find(&registry, &arg, DataType::simple(id), ConversionMode::Explicit).is_some());
    }

    #[test]
    fn conversion_function_to_basic() {
        let mut registry = SymbolRegistry::with_basic_types();
        let handle = registry.register_class(ClassEntry::new("Handle")).unwrap();
        registry
            .register_function(
                FunctionEntry::method(handle, "operator int", vec![], int())
                    .with_traits(FunctionTraits::CONVERSION | FunctionTraits::CONST),
            )
            .unwrap();

        let conv = find(
            &registry,
            &ArgDesc::lvalue(DataType::simple(handle)),
            DataType::basic(BasicKind::Long),
            ConversionMode::Implicit,
        )
        .unwrap();
        assert!(matches!(conv.kind, ConversionKind::ConversionFunction { .. }));
        assert_eq!(conv.distance, Conversion::COST_WIDENING);
    }
}
