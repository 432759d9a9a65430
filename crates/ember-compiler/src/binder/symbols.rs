//! Identifier, `this` and `base` binding.
//!
//! Unqualified names resolve in this order:
//! 1. Locals and parameters, innermost scope first
//! 2. Members of the owning class and its bases, through the implicit `this`
//! 3. Namespace-level symbols visible from the function's namespace
//!
//! Qualified names (`ns::name`, `Class::name`, `Enum::Value`) skip the first
//! two steps.

use ember_core::{CompilationError, DataType, Span, Symbol, TypeHash};
use ember_registry::ResolutionResult;
use ember_syntax::IdentExpr;

use super::{Binder, Result};
use crate::bound::{BoundExpr, BoundExprKind, ExprFlags, FunctionGroup};
use crate::conversion::{Conversion, ConversionKind};
use crate::scope::VarStorage;

/// Bind a possibly qualified name.
pub(super) fn bind_ident(binder: &mut Binder<'_>, ident: &IdentExpr<'_>) -> Result<BoundExpr> {
    let name = ident.ident.name;
    let span = ident.span;

    if !ident.scope.is_empty() {
        let path: Vec<&str> = ident.scope.iter().map(|s| s.name).collect();
        return bind_qualified(binder, &path, name, span)
            .map(|expr| expr.with_flags(ExprFlags::SCOPE_QUALIFIED));
    }

    if let Some(var) = binder.scope.lookup(name) {
        let kind = match var.storage {
            VarStorage::Local(id) => BoundExprKind::Local(id),
            VarStorage::Parameter(index) => BoundExprKind::Parameter(index),
        };
        return Ok(BoundExpr::lvalue(kind, var.data_type, span));
    }

    if let Some(expr) = bind_implicit_member(binder, name, span)? {
        return Ok(expr);
    }

    let registry = binder.registry();
    match registry.lookup(name, binder.ctx.namespace()) {
        ResolutionResult::Found(Symbol::FunctionGroup { name, .. }) => {
            // Overloads may live in several enclosing namespaces and imports.
            let functions = registry.free_functions(&name, binder.ctx.namespace());
            Ok(free_group(name, functions, span))
        }
        ResolutionResult::Found(symbol) => bind_symbol(binder, symbol, span),
        ResolutionResult::Ambiguous(_) => Err(CompilationError::Other {
            message: format!("'{name}' is ambiguous"),
            span,
        }),
        ResolutionResult::NotFound => Err(CompilationError::UnknownSymbol {
            name: name.to_string(),
            span,
        }),
    }
}

/// A symbol found by namespace lookup.
fn bind_symbol(binder: &mut Binder<'_>, symbol: Symbol, span: Span) -> Result<BoundExpr> {
    Ok(match symbol {
        Symbol::Constant {
            data_type, value, ..
        } => BoundExpr::literal(value, data_type.plain(), span),
        Symbol::LocalVariable { index, data_type } => BoundExpr::lvalue(
            BoundExprKind::Local(crate::bound::LocalId(index)),
            data_type,
            span,
        ),
        Symbol::Parameter { index, data_type } => {
            BoundExpr::lvalue(BoundExprKind::Parameter(index), data_type, span)
        }
        Symbol::MemberVariable {
            class,
            index,
            data_type,
        } => {
            let this = binder.this_object(span)?;
            member_variable(binder, this, class, index, data_type, span)
        }
        Symbol::Class(hash) | Symbol::Delegate(hash) | Symbol::Enum(hash) => {
            BoundExpr::rvalue(BoundExprKind::TypeExpr(DataType::simple(hash)), DataType::void(), span)
        }
        Symbol::Typedef { target, .. } => {
            BoundExpr::rvalue(BoundExprKind::TypeExpr(target), DataType::void(), span)
        }
        Symbol::BoundTypeParameter { data_type, .. } => {
            BoundExpr::rvalue(BoundExprKind::TypeExpr(data_type), DataType::void(), span)
        }
        Symbol::Namespace(path) => {
            BoundExpr::rvalue(BoundExprKind::Namespace(path), DataType::void(), span)
        }
        Symbol::EnumConstant { enum_type, value } => {
            BoundExpr::literal(value, DataType::simple(enum_type), span)
        }
        Symbol::FunctionGroup {
            name, functions, ..
        } => free_group(name, functions, span),
    })
}

fn free_group(name: String, functions: Vec<TypeHash>, span: Span) -> BoundExpr {
    BoundExpr::rvalue(
        BoundExprKind::FunctionGroup(FunctionGroup {
            name,
            functions,
            receiver: None,
            implicit_receiver: false,
            non_virtual: false,
        }),
        DataType::void(),
        span,
    )
}

/// A field or method of the owning class named without `this.`.
fn bind_implicit_member(
    binder: &mut Binder<'_>,
    name: &str,
    span: Span,
) -> Result<Option<BoundExpr>> {
    let Some(owner) = binder.owner else {
        return Ok(None);
    };
    let registry = binder.registry();

    if let Some(field) = registry.find_field(owner, name) {
        let this = binder.this_object(span)?;
        return Ok(Some(member_variable(
            binder,
            this,
            field.class,
            field.index,
            field.data_type,
            span,
        )));
    }

    let methods = registry.find_methods(owner, name);
    if methods.is_empty() {
        return Ok(None);
    }
    let receiver = binder.this_object(span).ok().map(Box::new);
    Ok(Some(BoundExpr::rvalue(
        BoundExprKind::FunctionGroup(FunctionGroup {
            name: name.to_string(),
            functions: methods,
            receiver,
            implicit_receiver: true,
            non_virtual: false,
        }),
        DataType::void(),
        span,
    )))
}

/// `Class::member`, `Enum::Value` or `ns::name`.
fn bind_qualified(
    binder: &mut Binder<'_>,
    path: &[&str],
    name: &str,
    span: Span,
) -> Result<BoundExpr> {
    let registry = binder.registry();
    let ns = binder.ctx.namespace();

    let scope_symbol = match path.split_last() {
        Some((last, [])) => match registry.resolve_type_name(last, ns) {
            ResolutionResult::Found(ty) if ty.pointers == 0 => Some(ty.base),
            _ => None,
        },
        Some((last, outer)) => match registry.resolve_qualified(outer, last, ns) {
            Some(Symbol::Class(hash)) | Some(Symbol::Enum(hash)) => Some(hash),
            _ => None,
        },
        None => None,
    };

    if let Some(hash) = scope_symbol {
        if let Some(e) = registry.get_enum(hash) {
            let value = e.constant(name).ok_or_else(|| CompilationError::UnknownMember {
                name: name.to_string(),
                type_name: e.name.clone(),
                span,
            })?;
            return Ok(BoundExpr::literal(value.clone(), DataType::simple(hash), span));
        }
        if registry.get_class(hash).is_some() {
            return bind_class_scoped(binder, hash, name, span);
        }
    }

    match registry.resolve_qualified(path, name, ns) {
        Some(symbol) => bind_symbol(binder, symbol, span),
        None => Err(CompilationError::UnknownSymbol {
            name: format!("{}::{name}", path.join("::")),
            span,
        }),
    }
}

/// `Class::f` names `f` exactly: a call through it is never virtual.
fn bind_class_scoped(
    binder: &mut Binder<'_>,
    class: TypeHash,
    name: &str,
    span: Span,
) -> Result<BoundExpr> {
    let registry = binder.registry();
    let methods = registry.find_methods(class, name);
    if methods.is_empty() {
        return Err(CompilationError::UnknownMember {
            name: name.to_string(),
            type_name: binder.ctx.type_name(&DataType::simple(class)),
            span,
        });
    }

    // Inside a member of `class` or of a class derived from it, the
    // implicit `this` is the receiver.
    let receiver = match binder.owner {
        Some(owner) if registry.base_distance(owner, class).is_some() => {
            binder.this_object(span).ok().map(Box::new)
        }
        _ => None,
    };
    Ok(BoundExpr::rvalue(
        BoundExprKind::FunctionGroup(FunctionGroup {
            name: name.to_string(),
            functions: methods,
            receiver,
            implicit_receiver: true,
            non_virtual: true,
        }),
        DataType::void(),
        span,
    ))
}

/// Field `index` of `class` read through `object`; inherited fields get a
/// derived-to-base adjustment of the object first.
pub(super) fn member_variable(
    binder: &Binder<'_>,
    object: BoundExpr,
    class: TypeHash,
    index: u32,
    data_type: DataType,
    span: Span,
) -> BoundExpr {
    let object_class = object.ty.without_reference().base;
    let is_const = object.ty.is_const;
    let object = match binder.registry().base_distance(object_class, class) {
        Some(steps) if steps > 0 => {
            let conversion = Conversion::implicit(
                ConversionKind::DerivedToBase { base: class, steps },
                Conversion::COST_DERIVED_TO_BASE,
            )
            .with_distance(steps);
            let ty = super::adjusted(object.ty.without_reference(), class);
            binder.adjust(object, &conversion, ty)
        }
        _ => object,
    };

    let ty = if is_const && !data_type.is_any_reference() {
        data_type.with_const()
    } else {
        data_type
    };
    BoundExpr::lvalue(
        BoundExprKind::Member {
            object: Box::new(object),
            class,
            index,
        },
        ty,
        span,
    )
}

// ============================================================================
// this / base
// ============================================================================

/// `this`: the receiver pointer.
pub(super) fn bind_this(binder: &mut Binder<'_>, span: Span) -> Result<BoundExpr> {
    let Some(this) = binder.this_type else {
        return Err(CompilationError::IllegalThisOrBase {
            message: "'this' is only available in non-static member functions".to_string(),
            span,
        });
    };
    Ok(BoundExpr::rvalue(BoundExprKind::Parameter(0), this, span)
        .with_flags(ExprFlags::ARG_IS_THIS_OR_BASE))
}

/// `base`: `*this` viewed as the direct base class.
pub(super) fn bind_base(binder: &mut Binder<'_>, span: Span) -> Result<BoundExpr> {
    let illegal = |message: &str| CompilationError::IllegalThisOrBase {
        message: message.to_string(),
        span,
    };
    let owner = binder
        .owner
        .ok_or_else(|| illegal("'base' is only available in member functions"))?;
    let base = binder
        .registry()
        .get_class(owner)
        .and_then(|c| c.base)
        .ok_or_else(|| illegal("'base' used in a class without a base class"))?;

    let this = binder
        .this_object(span)
        .map_err(|_| illegal("'base' is only available in non-static member functions"))?;
    let conversion = Conversion::implicit(
        ConversionKind::DerivedToBase { base, steps: 1 },
        Conversion::COST_DERIVED_TO_BASE,
    )
    .with_distance(1);
    let ty = super::adjusted(this.ty, base);
    Ok(binder
        .adjust(this, &conversion, ty)
        .with_flags(ExprFlags::ARG_IS_THIS_OR_BASE))
}
