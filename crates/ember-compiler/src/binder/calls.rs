//! Call binding: function groups, delegates, construction and `new`.

use ember_core::{CompilationError, ConstantValue, DataType, Span, TypeHash};
use ember_syntax::{CallExpr, ConstructExpr};

use super::{Binder, Result, cast, require_value, result_of};
use crate::args::prepare_arguments;
use crate::bound::{BoundExpr, BoundExprKind, FunctionGroup, FunctionRef};
use crate::conversion::{ArgDesc, ConversionMode};
use crate::overload::{self, CallShape, registered_candidates};

/// Bind `callee(args)`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(super) fn bind_call(binder: &mut Binder<'_>, call: &CallExpr<'_>) -> Result<BoundExpr> {
    let span = call.span;
    binder.visit(&call.callee)?;
    let args = bind_args(binder, call.args)?;
    let callee = binder.pop()?;

    if callee.is_value() && binder.registry().is_delegate_type(&callee.ty.without_reference()) {
        return delegate_call(binder, callee, args, span);
    }
    match callee.kind {
        BoundExprKind::FunctionGroup(group) => call_group(binder, group, args, span),
        BoundExprKind::TypeExpr(ty) => construct_or_cast(binder, ty, args, span),
        _ => Err(CompilationError::WrongOperandCategory {
            message: format!(
                "expression of type '{}' is not callable",
                binder.ctx.type_name(&callee.ty)
            ),
            span,
        }),
    }
}

/// Visit every argument, then pop them back in source order.
pub(super) fn bind_args(binder: &mut Binder<'_>, args: &[ember_syntax::Expr<'_>]) -> Result<Vec<BoundExpr>> {
    for arg in args {
        binder.visit(arg)?;
    }
    let mut bound = Vec::with_capacity(args.len());
    for _ in args {
        bound.push(binder.pop()?);
    }
    bound.reverse();
    for arg in &bound {
        require_value(arg)?;
    }
    Ok(bound)
}

/// Resolve a call of a function group and build the call node.
fn call_group(
    binder: &mut Binder<'_>,
    group: FunctionGroup,
    args: Vec<BoundExpr>,
    span: Span,
) -> Result<BoundExpr> {
    let registry = binder.registry();
    let mut candidates = registered_candidates(&binder.ctx, &group.functions);

    if group.implicit_receiver && group.receiver.is_none() && candidates.iter().all(|c| c.is_member())
    {
        return Err(CompilationError::IllegalThisOrBase {
            message: format!("calling member function '{}' requires an object", group.name),
            span,
        });
    }
    // Members named without an object compete with free functions of the
    // same name.
    if group.implicit_receiver && !group.non_virtual {
        let free = registry.free_functions(&group.name, binder.ctx.namespace());
        candidates.extend(registered_candidates(&binder.ctx, &free));
    }

    let object = group.receiver.map(|r| *r);
    let object_desc = object.as_ref().map(ArgDesc::of);
    let arg_descs: Vec<ArgDesc> = args.iter().map(ArgDesc::of).collect();
    let shape = match &object_desc {
        Some(desc) => CallShape::method(desc, &arg_descs),
        None => CallShape::free(&arg_descs),
    };

    let m = overload::resolve(
        &binder.ctx,
        &group.name,
        &candidates,
        shape,
        ConversionMode::Implicit,
        span,
    )?;
    let object = if m.is_member { object } else { None };
    binder.finish_call(m, object, args, group.non_virtual, span)
}

/// Call through a delegate value.
fn delegate_call(
    binder: &mut Binder<'_>,
    delegate: BoundExpr,
    args: Vec<BoundExpr>,
    span: Span,
) -> Result<BoundExpr> {
    let entry = binder
        .registry()
        .get_delegate(delegate.ty.without_reference().base)
        .ok_or_else(|| CompilationError::internal("delegate type without entry"))?;
    if entry.params.len() != args.len() {
        return Err(CompilationError::ArgumentCountMismatch {
            name: entry.name.clone(),
            expected: entry.params.len(),
            found: args.len(),
            span,
        });
    }

    let mut converted = Vec::with_capacity(args.len());
    for (arg, param) in args.into_iter().zip(&entry.params) {
        let arg_span = arg.span;
        converted.push(binder.convert(arg, *param, ConversionMode::Implicit, arg_span)?);
    }
    prepare_arguments(
        &binder.ctx,
        &entry.params,
        &mut converted,
        false,
        false,
        &mut binder.locals,
    )?;

    let site = binder.next_call_site();
    Ok(result_of(
        BoundExprKind::DelegateCall {
            delegate: Box::new(delegate),
            args: converted,
            site,
            nothrow: entry.nothrow,
        },
        entry.return_type,
        span,
    ))
}

// ============================================================================
// Construction
// ============================================================================

/// `T(args)` written as a call or a construct expression.
fn construct_or_cast(
    binder: &mut Binder<'_>,
    ty: DataType,
    mut args: Vec<BoundExpr>,
    span: Span,
) -> Result<BoundExpr> {
    let registry = binder.registry();
    if ty.pointers == 0 && registry.is_class_type(&ty) {
        return construct_temporary(binder, ty.base, args, span);
    }

    match args.len() {
        1 => {
            let operand = args.remove(0);
            cast::explicit_cast(binder, operand, ty, span)
        }
        0 => {
            // `int()` is a zero of the type.
            let value = registry
                .basic_kind(&ty)
                .and_then(|k| ConstantValue::Int(0).convert_to(k))
                .or_else(|| ty.is_pointer().then_some(ConstantValue::Null))
                .ok_or_else(|| CompilationError::TypeMismatch {
                    message: format!("'{}' has no default value", binder.ctx.type_name(&ty)),
                    span,
                })?;
            Ok(BoundExpr::literal(value, ty, span))
        }
        found => Err(CompilationError::ArgumentCountMismatch {
            name: binder.ctx.type_name(&ty),
            expected: 1,
            found,
            span,
        }),
    }
}

/// Bind `T(args)`.
pub(super) fn bind_construct(
    binder: &mut Binder<'_>,
    construct: &ConstructExpr<'_>,
) -> Result<BoundExpr> {
    let ty = binder.ctx.resolve_type(&construct.ty)?;
    let args = bind_args(binder, construct.args)?;
    construct_or_cast(binder, ty, args, construct.span)
}

/// A class object constructed into a fresh temporary.
pub(super) fn construct_temporary(
    binder: &mut Binder<'_>,
    class: TypeHash,
    args: Vec<BoundExpr>,
    span: Span,
) -> Result<BoundExpr> {
    let (constructor, args) = resolve_constructor(binder, class, args, span)?;
    let object = binder.locals.add_temporary(DataType::simple(class));
    let site = binder.next_call_site();
    Ok(BoundExpr::rvalue(
        BoundExprKind::Construct {
            class,
            constructor,
            args,
            object,
            destructor: binder.registry().destructor(class),
            site,
        },
        DataType::simple(class),
        span,
    ))
}

/// Bind `new T(args)`.
pub(super) fn bind_new(binder: &mut Binder<'_>, construct: &ConstructExpr<'_>) -> Result<BoundExpr> {
    let span = construct.span;
    let ty = binder.ctx.resolve_type(&construct.ty)?;
    if ty.pointers != 0 || !binder.registry().is_class_type(&ty) {
        return Err(CompilationError::TypeMismatch {
            message: format!("'new' needs a class type, found '{}'", binder.ctx.type_name(&ty)),
            span,
        });
    }
    let args = bind_args(binder, construct.args)?;
    let (constructor, args) = resolve_constructor(binder, ty.base, args, span)?;
    let site = binder.next_call_site();
    Ok(BoundExpr::rvalue(
        BoundExprKind::New {
            class: ty.base,
            constructor,
            args,
            site,
        },
        DataType::simple(ty.base).pointer_to(),
        span,
    ))
}

/// Pick the constructor of `class` for `args` and convert the arguments.
///
/// Classes without constructors accept no arguments (trivial construction)
/// or a single object of the same class (trivial copy).
pub(super) fn resolve_constructor(
    binder: &mut Binder<'_>,
    class: TypeHash,
    args: Vec<BoundExpr>,
    span: Span,
) -> Result<(Option<FunctionRef>, Vec<BoundExpr>)> {
    let registry = binder.registry();
    let class_name = binder.ctx.type_name(&DataType::simple(class));
    let constructors = registry.constructors(class);

    if constructors.is_empty() {
        let trivial_copy = matches!(args.as_slice(), [arg] if arg.ty.pointers == 0 && arg.ty.base == class);
        if args.is_empty() || trivial_copy {
            return Ok((None, args));
        }
        return Err(CompilationError::NoMatchingOverload {
            name: class_name,
            args: args
                .iter()
                .map(|a| binder.ctx.type_name(&a.ty))
                .collect::<Vec<_>>()
                .join(", "),
            span,
        });
    }

    let object = ArgDesc::lvalue(DataType::simple(class));
    let arg_descs: Vec<ArgDesc> = args.iter().map(ArgDesc::of).collect();
    let candidates = registered_candidates(&binder.ctx, constructors);
    let m = overload::resolve(
        &binder.ctx,
        &class_name,
        &candidates,
        CallShape::method(&object, &arg_descs),
        ConversionMode::Implicit,
        span,
    )?;

    let mut converted = Vec::with_capacity(args.len());
    for ((arg, conversion), param) in args.into_iter().zip(&m.conversions).zip(m.arg_params()) {
        converted.push(binder.apply_conversion(arg, conversion, *param)?);
    }
    prepare_arguments(
        &binder.ctx,
        m.arg_params(),
        &mut converted,
        false,
        false,
        &mut binder.locals,
    )?;
    Ok((Some(m.function), converted))
}
