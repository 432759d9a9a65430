//! Class, pointer and user-defined conversions.

use ember_core::{BasicKind, DataType, TypeHash};

use super::{ArgDesc, Conversion, ConversionKind, ConversionMode, find_standard_conversion};
use crate::context::CompilationContext;

/// `derived` object or pointer adjusted to `base`.
pub(super) fn upcast(
    ctx: &CompilationContext<'_>,
    derived: TypeHash,
    base: TypeHash,
) -> Option<Conversion> {
    let steps = ctx.registry().base_distance(derived, base)?;
    Some(
        Conversion::implicit(
            ConversionKind::DerivedToBase { base, steps },
            Conversion::COST_DERIVED_TO_BASE,
        )
        .with_distance(steps),
    )
}

/// `base` object or pointer reinterpreted as `derived`.
pub(super) fn downcast(
    ctx: &CompilationContext<'_>,
    base: TypeHash,
    derived: TypeHash,
) -> Option<Conversion> {
    ctx.registry()
        .base_distance(derived, base)
        .filter(|steps| *steps > 0)
        .map(|_| Conversion::explicit(ConversionKind::BaseToDerived { derived }))
}

/// Conversions where either side is a pointer.
pub(super) fn pointer_conversion(
    ctx: &CompilationContext<'_>,
    from: DataType,
    to: DataType,
) -> Option<Conversion> {
    let registry = ctx.registry();

    if to.pointers == 0 {
        return (from.pointers > 0 && registry.basic_kind(&to) == Some(BasicKind::Bool)).then(|| {
            Conversion::implicit(ConversionKind::PointerToBool, Conversion::COST_TO_BOOL)
        });
    }
    if from.pointers == 0 {
        return None;
    }

    // Dropping const from the pointee is never implicit.
    let drops_const = from.is_const && !to.is_const;
    let adds_const = !from.is_const && to.is_const;

    if from.pointers != to.pointers {
        return Some(Conversion::explicit(ConversionKind::PointerReinterpret));
    }

    if from.base == to.base {
        return Some(if drops_const {
            Conversion::explicit(ConversionKind::PointerReinterpret)
        } else if adds_const {
            Conversion::implicit(ConversionKind::Qualification, Conversion::COST_QUALIFICATION)
        } else {
            Conversion::identity()
        });
    }

    if from.pointers == 1 {
        if let Some(up) = upcast(ctx, from.base, to.base) {
            return Some(if drops_const {
                Conversion::explicit(up.kind)
            } else {
                up
            });
        }
        if let Some(down) = downcast(ctx, from.base, to.base) {
            return Some(down);
        }
    }

    Some(Conversion::explicit(ConversionKind::PointerReinterpret))
}

/// Through a single-argument constructor of `class`.
pub(super) fn constructor_conversion(
    ctx: &CompilationContext<'_>,
    arg: &ArgDesc,
    class: TypeHash,
    mode: ConversionMode,
) -> Option<Conversion> {
    let registry = ctx.registry();
    let mut best: Option<(TypeHash, Conversion)> = None;

    for hash in registry.constructors(class) {
        let Some(ctor) = registry.get_function(*hash) else {
            continue;
        };
        // Receiver plus exactly one argument.
        if ctor.params.len() != 2 {
            continue;
        }
        if ctor.is_explicit() && mode == ConversionMode::Implicit {
            continue;
        }
        let param = ctor.params[1].data_type;
        // Copy construction is not a conversion.
        if param.plain().base == class && param.pointers == 0 {
            continue;
        }
        let Some(inner) = find_standard_conversion(ctx, arg, param, mode) else {
            continue;
        };
        if best.as_ref().is_none_or(|(_, b)| inner.rank() < b.rank()) {
            best = Some((*hash, inner));
        }
    }

    best.map(|(constructor, inner)| user_defined(ConversionKind::Constructor { constructor }, &inner))
}

/// Through a conversion function of `class` returning something that
/// converts to `to`.
pub(super) fn conversion_function(
    ctx: &CompilationContext<'_>,
    class: TypeHash,
    to: DataType,
    mode: ConversionMode,
) -> Option<Conversion> {
    let mut best: Option<(TypeHash, Conversion)> = None;

    for function in ctx.registry().conversion_functions(class) {
        if function.is_explicit() && mode == ConversionMode::Implicit {
            continue;
        }
        let result = ArgDesc::rvalue(function.return_type);
        let Some(inner) = find_standard_conversion(ctx, &result, to, mode) else {
            continue;
        };
        if best.as_ref().is_none_or(|(_, b)| inner.rank() < b.rank()) {
            best = Some((function.hash, inner));
        }
    }

    best.map(|(function, inner)| {
        user_defined(ConversionKind::ConversionFunction { function }, &inner)
    })
}

fn user_defined(kind: ConversionKind, inner: &Conversion) -> Conversion {
    if inner.is_implicit {
        Conversion::implicit(kind, Conversion::COST_USER_DEFINED).with_distance(inner.cost)
    } else {
        Conversion::explicit(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::ClassEntry;
    use ember_registry::SymbolRegistry;

    #[test]
    fn pointer_const_rules() {
        let registry = SymbolRegistry::with_basic_types();
        let ctx = CompilationContext::new(&registry);
        let int_ptr = DataType::basic(BasicKind::Int).pointer_to();
        let const_int_ptr = DataType::basic(BasicKind::Int).with_const().pointer_to();

        let add = pointer_conversion(&ctx, int_ptr, const_int_ptr).unwrap();
        assert_eq!(add.kind, ConversionKind::Qualification);
        assert!(add.is_implicit);

        let drop = pointer_conversion(&ctx, const_int_ptr, int_ptr).unwrap();
        assert!(!drop.is_implicit);
    }

    #[test]
    fn pointer_tests_as_bool() {
        let registry = SymbolRegistry::with_basic_types();
        let ctx = CompilationContext::new(&registry);
        let c = pointer_conversion(
            &ctx,
            DataType::basic(BasicKind::Char).pointer_to(),
            DataType::bool(),
        )
        .unwrap();
        assert_eq!(c.kind, ConversionKind::PointerToBool);
        assert_eq!(c.cost, Conversion::COST_TO_BOOL);
    }

    #[test]
    fn nearer_base_ranks_better() {
        let mut registry = SymbolRegistry::with_basic_types();
        let a = registry.register_class(ClassEntry::new("A")).unwrap();
        let b = registry.register_class(ClassEntry::new("B").with_base(a)).unwrap();
        let c = registry.register_class(ClassEntry::new("C").with_base(b)).unwrap();
        let ctx = CompilationContext::new(&registry);

        let to_b = upcast(&ctx, c, b).unwrap();
        let to_a = upcast(&ctx, c, a).unwrap();
        assert!(to_b.rank() < to_a.rank());
        assert!(downcast(&ctx, a, c).is_some());
        assert!(downcast(&ctx, c, a).is_none());
    }

    #[test]
    fn unrelated_pointers_reinterpret_explicitly() {
        let mut registry = SymbolRegistry::with_basic_types();
        let a = registry.register_class(ClassEntry::new("A")).unwrap();
        let b = registry.register_class(ClassEntry::new("B")).unwrap();
        let ctx = CompilationContext::new(&registry);

        let c = pointer_conversion(
            &ctx,
            DataType::simple(a).pointer_to(),
            DataType::simple(b).pointer_to(),
        )
        .unwrap();
        assert_eq!(c.kind, ConversionKind::PointerReinterpret);
        assert!(!c.is_implicit);
    }
}
