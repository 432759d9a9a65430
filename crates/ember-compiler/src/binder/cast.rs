//! Casts, dynamic type tests and `sizeof`.

use ember_core::{BasicKind, CompilationError, DataType, Span};
use ember_syntax::{CastExpr, SizeOfExpr, SizeOfOperand, TypeTestExpr};

use super::{Binder, Result, require_value, result_of};
use crate::bound::{BoundExpr, BoundExprKind};
use crate::conversion::{ArgDesc, ConversionKind, ConversionMode, find_conversion};

/// Bind `cast<T>(expr)`.
pub(super) fn bind_cast(binder: &mut Binder<'_>, cast: &CastExpr<'_>) -> Result<BoundExpr> {
    let target = binder.ctx.resolve_type(&cast.target)?;
    let operand = binder.bind_value(&cast.expr)?;
    explicit_cast(binder, operand, target, cast.span)
}

/// Convert `operand` to `target`, allowing explicit-only conversions.
pub(super) fn explicit_cast(
    binder: &mut Binder<'_>,
    operand: BoundExpr,
    target: DataType,
    span: Span,
) -> Result<BoundExpr> {
    require_value(&operand)?;
    let Some(conversion) = find_conversion(
        &binder.ctx,
        &ArgDesc::of(&operand),
        target,
        ConversionMode::Explicit,
    ) else {
        return Err(CompilationError::TypeMismatch {
            message: format!(
                "cannot cast '{}' to '{}'",
                binder.ctx.type_name(&operand.ty),
                binder.ctx.type_name(&target)
            ),
            span,
        });
    };

    match conversion.kind {
        ConversionKind::Identity => Ok(operand),
        ConversionKind::Constructor { .. } | ConversionKind::ConversionFunction { .. } => {
            binder.apply_conversion(operand, &conversion, target)
        }
        kind => Ok(result_of(
            BoundExprKind::Cast {
                operand: Box::new(operand),
                conversion: kind,
            },
            target,
            span,
        )),
    }
}

/// Bind `expr is T` (`is == true`) or `expr as T`.
pub(super) fn bind_type_test(
    binder: &mut Binder<'_>,
    test: &TypeTestExpr<'_>,
    is: bool,
) -> Result<BoundExpr> {
    let span = test.span;
    let target = binder.ctx.resolve_type(&test.target)?;
    let operand = binder.bind_value(&test.expr)?;

    let registry = binder.registry();
    for ty in [operand.ty.without_reference(), target] {
        if !registry.is_polymorphic_pointer(&ty) {
            return Err(CompilationError::NotPolymorphic {
                type_name: binder.ctx.type_name(&ty),
                span,
            });
        }
    }

    let class = target.base;
    let operand = Box::new(operand);
    Ok(if is {
        BoundExpr::rvalue(BoundExprKind::Is { operand, class }, DataType::bool(), span)
    } else {
        BoundExpr::rvalue(BoundExprKind::As { operand, class }, target, span)
    })
}

/// Bind `sizeof(T)` or `sizeof(expr)`; the operand is never evaluated.
pub(super) fn bind_sizeof(binder: &mut Binder<'_>, sizeof: &SizeOfExpr<'_>) -> Result<BoundExpr> {
    let of = match &sizeof.operand {
        SizeOfOperand::Type(ty) => binder.ctx.resolve_type(ty)?,
        SizeOfOperand::Expr(expr) => binder.bind_value(expr)?.ty.without_reference(),
    };
    let size = binder.registry().size_of(&of);
    Ok(BoundExpr::rvalue(
        BoundExprKind::SizeOf { size, of },
        DataType::basic(BasicKind::ULong),
        sizeof.span,
    ))
}
