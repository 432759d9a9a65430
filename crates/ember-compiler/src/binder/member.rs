//! Member access and indexing.
//!
//! - `obj.name` / `ptr->name`: fields become member-variable nodes, methods
//!   become function groups carrying the object as receiver
//! - `p[i]`: pointer arithmetic followed by a dereference
//! - `a[i]` on arrays and classes: `operator[]`

use ember_core::{BasicKind, CompilationError, DataType, IntrinsicOp, Span};
use ember_syntax::{IndexExpr, MemberExpr};

use super::symbols::member_variable;
use super::{Binder, Result};
use crate::bound::{BoundExpr, BoundExprKind, ExprFlags, FunctionGroup, FunctionRef};
use crate::conversion::{ArgDesc, ConversionMode};
use crate::overload::{self, CallShape, pointer_operators, registered_candidates};

/// Bind `object.member` or `object->member`.
pub(super) fn bind_member(binder: &mut Binder<'_>, member: &MemberExpr<'_>) -> Result<BoundExpr> {
    let span = member.span;
    binder.visit(&member.object)?;
    let object = binder.pop()?;
    super::require_value(&object)?;

    let object = if member.arrow {
        arrow_target(binder, object, span)?
    } else {
        object
    };
    access_member(binder, object, member.member.name, span)
}

/// The object `->` reads through: a dereferenced pointer, or the result of
/// a class's `operator->`.
fn arrow_target(binder: &mut Binder<'_>, object: BoundExpr, span: Span) -> Result<BoundExpr> {
    let ty = object.ty.without_reference();
    if ty.pointers == 1 {
        return Ok(dereference(object, span));
    }
    let type_name = binder.ctx.type_name(&object.ty);
    if ty.pointers == 0 && binder.registry().is_class_type(&ty) {
        let methods = binder.registry().find_methods(ty.base, "operator->");
        if !methods.is_empty() {
            let candidates = registered_candidates(&binder.ctx, &methods);
            let desc = ArgDesc::of(&object);
            let m = overload::resolve(
                &binder.ctx,
                "operator->",
                &candidates,
                CallShape::method(&desc, &[]),
                ConversionMode::Implicit,
                span,
            )?;
            let result = binder.finish_call(m, Some(object), Vec::new(), false, span)?;
            if result.ty.without_reference().pointers == 1 {
                return Ok(dereference(result, span));
            }
        }
    }
    Err(CompilationError::WrongOperandCategory {
        message: format!("'->' needs a pointer operand, found '{type_name}'"),
        span,
    })
}

/// `*pointer` as an lvalue of the pointee type.
pub(super) fn dereference(pointer: BoundExpr, span: Span) -> BoundExpr {
    let pointee = pointer
        .ty
        .without_reference()
        .pointee()
        .unwrap_or_else(DataType::void);
    BoundExpr::lvalue(BoundExprKind::Deref(Box::new(pointer)), pointee, span)
}

/// A field or method group of the object's class.
fn access_member(
    binder: &mut Binder<'_>,
    object: BoundExpr,
    name: &str,
    span: Span,
) -> Result<BoundExpr> {
    let ty = object.ty.without_reference();
    let registry = binder.registry();
    if ty.pointers != 0 || !(registry.is_class_type(&ty) || registry.is_array_type(&ty)) {
        return Err(CompilationError::WrongOperandCategory {
            message: format!(
                "member access on non-class type '{}'",
                binder.ctx.type_name(&object.ty)
            ),
            span,
        });
    }

    if let Some(field) = registry.find_field(ty.base, name) {
        return Ok(member_variable(
            binder,
            object,
            field.class,
            field.index,
            field.data_type,
            span,
        ));
    }

    let methods = registry.find_methods(ty.base, name);
    if methods.is_empty() {
        return Err(CompilationError::UnknownMember {
            name: name.to_string(),
            type_name: binder.ctx.type_name(&ty),
            span,
        });
    }

    // `base.f()` calls the base implementation directly.
    let non_virtual = object.flags.contains(ExprFlags::ARG_IS_THIS_OR_BASE)
        && matches!(object.kind, BoundExprKind::Conversion { .. });
    Ok(BoundExpr::rvalue(
        BoundExprKind::FunctionGroup(FunctionGroup {
            name: name.to_string(),
            functions: methods,
            receiver: Some(Box::new(object)),
            implicit_receiver: false,
            non_virtual,
        }),
        DataType::void(),
        span,
    ))
}

// ============================================================================
// Indexing
// ============================================================================

/// Bind `object[index]`.
pub(super) fn bind_index(binder: &mut Binder<'_>, index: &IndexExpr<'_>) -> Result<BoundExpr> {
    let span = index.span;
    binder.visit(&index.object)?;
    binder.visit(&index.index)?;
    let subscript = binder.pop()?;
    let object = binder.pop()?;
    super::require_value(&object)?;
    super::require_value(&subscript)?;

    let ty = object.ty.without_reference();
    if ty.pointers > 0 {
        let offset = pointer_offset(binder, object, subscript, span)?;
        return Ok(dereference(offset, span));
    }

    let registry = binder.registry();
    if !(registry.is_class_type(&ty) || registry.is_array_type(&ty)) {
        return Err(CompilationError::WrongOperandCategory {
            message: format!("cannot index a value of type '{}'", binder.ctx.type_name(&ty)),
            span,
        });
    }

    let methods = registry.find_methods(ty.base, "operator[]");
    let mut candidates = registered_candidates(&binder.ctx, &methods);
    let free = registry.free_functions("operator[]", binder.ctx.namespace());
    candidates.extend(registered_candidates(&binder.ctx, &free));

    let object_desc = ArgDesc::of(&object);
    let args = [ArgDesc::of(&subscript)];
    let m = overload::resolve(
        &binder.ctx,
        "operator[]",
        &candidates,
        CallShape::operator(&object_desc, &args),
        ConversionMode::Implicit,
        span,
    )?;
    binder.finish_call(m, Some(object), vec![subscript], false, span)
}

/// `pointer + index` through the synthesized pointer operator.
fn pointer_offset(
    binder: &mut Binder<'_>,
    pointer: BoundExpr,
    subscript: BoundExpr,
    span: Span,
) -> Result<BoundExpr> {
    let registry = binder.registry();
    let is_integral = registry
        .basic_kind(&subscript.ty.without_reference())
        .is_some_and(|k| k.is_integer() || k.is_char())
        || registry.is_enum_type(&subscript.ty.without_reference());
    if !is_integral {
        return Err(CompilationError::TypeMismatch {
            message: format!(
                "pointer index must be integral, found '{}'",
                binder.ctx.type_name(&subscript.ty)
            ),
            span,
        });
    }

    let subscript = binder.convert(
        subscript,
        DataType::basic(BasicKind::Long),
        ConversionMode::Explicit,
        span,
    )?;
    let pointer_desc = ArgDesc::of(&pointer);
    let function = pointer_operators("operator+", &[&pointer_desc])
        .into_iter()
        .find(|c| c.entry.intrinsic == Some(IntrinsicOp::PtrOffset))
        .map(|c| FunctionRef::from_entry(&c.entry))
        .ok_or_else(|| CompilationError::internal("no pointer offset operator"))?;
    let ty = pointer.ty.without_reference();
    Ok(BoundExpr::rvalue(
        BoundExprKind::Binary {
            function,
            left: Box::new(pointer),
            right: Box::new(subscript),
        },
        ty,
        span,
    ))
}
