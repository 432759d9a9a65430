//! Unary, binary and postfix operators.
//!
//! Every operator except `&&`, `||`, `*p` and `&x` is resolved as a call of
//! its `operator` group. Candidates come from three places:
//! - methods of the left operand's class
//! - free functions visible from the current namespace, which include the
//!   raw operators of the basic types
//! - raw pointer operators synthesized for pointer operands
//!
//! `>`, `<=`, `>=` and `!=` are rewritten in terms of `<`, `==` and `!`.

use ember_core::{CompilationError, DataType, Span};
use ember_syntax::{BinaryExpr, BinaryOp, Expr, PostfixExpr, PostfixOp, UnaryExpr, UnaryOp};

use super::literals::negate_literal;
use super::member::dereference;
use super::{Binder, Result};
use crate::bound::{BoundExpr, BoundExprKind, ExprFlags};
use crate::conversion::{ArgDesc, ConversionMode};
use crate::overload::{self, Candidate, CallShape, pointer_operators, registered_candidates};

/// Bind a binary expression.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(super) fn bind_binary(binder: &mut Binder<'_>, bin: &BinaryExpr<'_>) -> Result<BoundExpr> {
    let span = bin.span;
    if bin.op.is_logical() {
        return bind_logical(binder, bin);
    }

    binder.visit(&bin.left)?;
    binder.visit(&bin.right)?;
    let right = binder.pop()?;
    let left = binder.pop()?;
    super::require_value(&left)?;
    super::require_value(&right)?;

    match bin.op {
        BinaryOp::Greater => operator_call(binder, "operator<", right, left, span),
        BinaryOp::LessEqual => {
            let less = operator_call(binder, "operator<", right, left, span)?;
            negate(binder, less, span)
        }
        BinaryOp::GreaterEqual => {
            let less = operator_call(binder, "operator<", left, right, span)?;
            negate(binder, less, span)
        }
        BinaryOp::NotEqual => {
            let equal = operator_call(binder, "operator==", left, right, span)?;
            negate(binder, equal, span)
        }
        op => {
            let name = op
                .operator_name()
                .ok_or_else(|| CompilationError::internal(format!("no operator group for '{op}'")))?;
            operator_call(binder, name, left, right, span)
        }
    }
}

/// `&&` / `||` with both operands converted to `bool`.
fn bind_logical(binder: &mut Binder<'_>, bin: &BinaryExpr<'_>) -> Result<BoundExpr> {
    let span = bin.span;
    let left = binder.bind_value(&bin.left)?;
    let left = binder.convert(left, DataType::bool(), ConversionMode::Implicit, span)?;
    let right = binder.bind_value(&bin.right)?;
    let right = binder.convert(right, DataType::bool(), ConversionMode::Implicit, span)?;
    let result = binder.locals.add_temporary(DataType::bool());

    let (left, right) = (Box::new(left), Box::new(right));
    let kind = if bin.op == BinaryOp::LogicalAnd {
        BoundExprKind::Conjunction {
            left,
            right,
            result,
        }
    } else {
        BoundExprKind::Disjunction {
            left,
            right,
            result,
        }
    };
    Ok(BoundExpr::rvalue(kind, DataType::bool(), span))
}

/// Candidates of operator `name` for operands `operands`; the first operand
/// contributes its class's methods.
fn operator_candidates<'a>(
    binder: &Binder<'a>,
    name: &str,
    operands: &[&ArgDesc],
) -> Vec<Candidate<'a>> {
    let registry = binder.registry();
    let mut candidates = Vec::new();
    if let Some(first) = operands.first() {
        let ty = first.ty.without_reference();
        if ty.pointers == 0 && registry.is_class_type(&ty) {
            let methods = registry.find_methods(ty.base, name);
            candidates.extend(registered_candidates(&binder.ctx, &methods));
        }
    }
    let free = registry.free_functions(name, binder.ctx.namespace());
    candidates.extend(registered_candidates(&binder.ctx, &free));
    candidates.extend(pointer_operators(name, operands));
    candidates
}

/// `left op right` through the operator group `name`.
fn operator_call(
    binder: &mut Binder<'_>,
    name: &str,
    left: BoundExpr,
    right: BoundExpr,
    span: Span,
) -> Result<BoundExpr> {
    let left_desc = ArgDesc::of(&left);
    let right_desc = ArgDesc::of(&right);
    let candidates = operator_candidates(binder, name, &[&left_desc, &right_desc]);
    let m = overload::resolve(
        &binder.ctx,
        name,
        &candidates,
        CallShape::operator(&left_desc, std::slice::from_ref(&right_desc)),
        ConversionMode::Implicit,
        span,
    )?;
    binder.finish_call(m, Some(left), vec![right], false, span)
}

/// `op operand` through the operator group `name`.
fn unary_operator(
    binder: &mut Binder<'_>,
    name: &str,
    operand: BoundExpr,
    span: Span,
) -> Result<BoundExpr> {
    let desc = ArgDesc::of(&operand);
    let candidates = operator_candidates(binder, name, &[&desc]);
    let m = overload::resolve(
        &binder.ctx,
        name,
        &candidates,
        CallShape::operator(&desc, &[]),
        ConversionMode::Implicit,
        span,
    )?;
    binder.finish_call(m, Some(operand), Vec::new(), false, span)
}

fn negate(binder: &mut Binder<'_>, value: BoundExpr, span: Span) -> Result<BoundExpr> {
    unary_operator(binder, "operator!", value, span)
}

// ============================================================================
// Unary
// ============================================================================

/// Bind a prefix operator.
pub(super) fn bind_unary(binder: &mut Binder<'_>, un: &UnaryExpr<'_>) -> Result<BoundExpr> {
    let span = un.span;

    // `-128` is folded as one literal so it may take the narrowest type.
    if let (UnaryOp::Neg, Expr::Literal(_)) = (un.op, &un.operand) {
        let literal = binder.bind_value(&un.operand)?;
        if let Some(folded) = literal.constant().and_then(|c| negate_literal(c, span)) {
            return Ok(folded);
        }
        return unary_operator(binder, "operator-", literal, span);
    }

    let operand = binder.bind_value(&un.operand)?;
    match un.op {
        UnaryOp::Deref => {
            if operand.ty.without_reference().pointers == 0 {
                return Err(CompilationError::WrongOperandCategory {
                    message: format!(
                        "cannot dereference a value of type '{}'",
                        binder.ctx.type_name(&operand.ty)
                    ),
                    span,
                });
            }
            Ok(dereference(operand, span))
        }
        UnaryOp::AddressOf => {
            if !operand.is_lvalue() {
                return Err(CompilationError::NotAnLvalue { span });
            }
            let ty = operand.ty.without_reference().pointer_to();
            Ok(
                BoundExpr::rvalue(BoundExprKind::AddressOf(Box::new(operand)), ty, span)
                    .with_flags(ExprFlags::ADDR_ARG),
            )
        }
        UnaryOp::PreInc | UnaryOp::PreDec => {
            require_modifiable(binder, &operand, span)?;
            let name = if un.op == UnaryOp::PreInc {
                "operator++"
            } else {
                "operator--"
            };
            unary_operator(binder, name, operand, span)
        }
        op => {
            let name = op
                .operator_name()
                .ok_or_else(|| CompilationError::internal(format!("no operator group for '{op}'")))?;
            unary_operator(binder, name, operand, span)
        }
    }
}

/// The operand of an increment, decrement or store must be a non-const
/// lvalue.
pub(super) fn require_modifiable(
    binder: &Binder<'_>,
    operand: &BoundExpr,
    span: Span,
) -> Result<()> {
    if !operand.is_lvalue() {
        return Err(CompilationError::NotAnLvalue { span });
    }
    if operand.ty.is_const && operand.ty.pointers == 0 {
        return Err(CompilationError::TypeMismatch {
            message: format!(
                "cannot modify a value of type '{}'",
                binder.ctx.type_name(&operand.ty)
            ),
            span,
        });
    }
    Ok(())
}

// ============================================================================
// Postfix
// ============================================================================

/// Bind `x++` / `x--` on a basic or pointer lvalue.
pub(super) fn bind_postfix(binder: &mut Binder<'_>, post: &PostfixExpr<'_>) -> Result<BoundExpr> {
    let span = post.span;
    let operand = binder.bind_value(&post.operand)?;
    require_modifiable(binder, &operand, span)?;

    let plain = operand.ty.plain();
    if plain.pointers == 0 && binder.registry().is_class_type(&plain) {
        return Err(CompilationError::TypeMismatch {
            message: format!(
                "postfix '{}' is not supported on class type '{}'",
                post.op,
                binder.ctx.type_name(&plain)
            ),
            span,
        });
    }

    let increment = post.op == PostfixOp::Inc;
    let name = if increment { "operator++" } else { "operator--" };
    let desc = ArgDesc::of(&operand);
    let candidates = operator_candidates(binder, name, &[&desc]);
    let m = overload::resolve(
        &binder.ctx,
        name,
        &candidates,
        CallShape::operator(&desc, &[]),
        ConversionMode::Implicit,
        span,
    )?;
    if !m.function.is_intrinsic() {
        return Err(CompilationError::TypeMismatch {
            message: format!(
                "postfix '{}' on '{}' would call user-defined '{}'",
                post.op,
                binder.ctx.type_name(&plain),
                m.function.name
            ),
            span,
        });
    }

    let old_value = binder.locals.add_temporary(plain);
    Ok(BoundExpr::rvalue(
        BoundExprKind::PostfixIncDec {
            operand: Box::new(operand.with_flags(ExprFlags::ARG_BY_REF)),
            function: m.function,
            increment,
            old_value,
        },
        plain,
        span,
    ))
}
