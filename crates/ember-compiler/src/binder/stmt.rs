//! Statement binding.
//!
//! Every block, case body, catch body and `for` loop opens a compound with
//! its own [`CompoundId`]; ids are handed out in source order. Labels are
//! collected when a compound opens, so `goto` may jump forward.

use ember_core::{BasicKind, CompilationError, ConstantValue, DataType, IntrinsicOp, Span};
use ember_syntax::{
    AssignStmt, Block, CaseLabel, Expr, Stmt, SwitchStmt, TryCatchStmt, VarDeclStmt, VarInit,
};
use rustc_hash::FxHashMap;

use super::calls::{bind_args, construct_temporary, resolve_constructor};
use super::literals::fold_constant;
use super::operators::require_modifiable;
use super::{Binder, Breakable, Result};
use crate::bound::{
    AssignOperator, BoundAssign, BoundCase, BoundCaseLabel, BoundCatch, BoundCompound,
    BoundExpr, BoundExprKind, BoundFor, BoundLocalInit, BoundStmt, BoundSwitch, BoundTryCatch,
    ExprFlags, LocalId, LocalInit,
};
use crate::args::prepare_arguments;
use crate::conversion::{ArgDesc, ConversionMode};
use crate::overload::{self, CallShape, registered_candidates};

/// Bind a `{ ... }` block as one compound.
pub(super) fn bind_block(binder: &mut Binder<'_>, block: &Block<'_>) -> Result<BoundCompound> {
    compound(binder, block.stmts, block.span, |_| Ok(())).map(|(c, ())| c)
}

/// Open a compound, run `prologue` inside it, then bind `stmts`.
fn compound<'a, T>(
    binder: &mut Binder<'a>,
    stmts: &[Stmt<'_>],
    span: Span,
    prologue: impl FnOnce(&mut Binder<'a>) -> Result<T>,
) -> Result<(BoundCompound, T)> {
    let id = binder.next_compound();
    let labels = collect_labels(stmts)?;
    binder.scope.push_scope();
    binder.labels.push((id, labels));

    let result = compound_body(binder, stmts, prologue);

    binder.labels.pop();
    binder.scope.pop_scope();
    let (stmts, extra) = result?;
    Ok((BoundCompound { id, stmts, span }, extra))
}

fn compound_body<'a, T>(
    binder: &mut Binder<'a>,
    stmts: &[Stmt<'_>],
    prologue: impl FnOnce(&mut Binder<'a>) -> Result<T>,
) -> Result<(Vec<BoundStmt>, T)> {
    let extra = prologue(binder)?;
    let mut bound = Vec::with_capacity(stmts.len());
    for stmt in stmts {
        bound.push(bind_stmt(binder, stmt)?);
    }
    Ok((bound, extra))
}

/// Labels declared directly in a compound, including chains like `a: b: s`.
fn collect_labels(stmts: &[Stmt<'_>]) -> Result<FxHashMap<String, Span>> {
    let mut labels: FxHashMap<String, Span> = FxHashMap::default();
    for stmt in stmts {
        let mut current = stmt;
        while let Stmt::Labeled(labeled) = current {
            let label = labeled.label;
            if let Some(previous) = labels.insert(label.name.to_string(), label.span) {
                return Err(CompilationError::DuplicateLabel {
                    label: label.name.to_string(),
                    span: label.span,
                    previous,
                });
            }
            current = &labeled.stmt;
        }
    }
    Ok(labels)
}

fn bind_stmt(binder: &mut Binder<'_>, stmt: &Stmt<'_>) -> Result<BoundStmt> {
    Ok(match stmt {
        Stmt::Expr(s) => BoundStmt::Expr(binder.bind_value(&s.expr)?),
        Stmt::Assign(s) => BoundStmt::Assign(bind_assign(binder, s)?),
        Stmt::VarDecl(s) => BoundStmt::LocalInit(bind_var_decl(binder, s)?),
        Stmt::Return(s) => bind_return(binder, s.value.as_ref(), s.span)?,
        Stmt::Break(span) => {
            if binder.breakables.is_empty() {
                return Err(CompilationError::InvalidControlFlow {
                    message: "'break' outside of a loop or switch".to_string(),
                    span: *span,
                });
            }
            BoundStmt::Break(*span)
        }
        Stmt::Continue(span) => {
            if !binder.breakables.iter().any(|b| matches!(b, Breakable::Loop)) {
                return Err(CompilationError::InvalidControlFlow {
                    message: "'continue' outside of a loop".to_string(),
                    span: *span,
                });
            }
            BoundStmt::Continue(*span)
        }
        Stmt::Block(block) => BoundStmt::Compound(bind_block(binder, block)?),
        Stmt::If(s) => {
            let condition = bind_condition(binder, &s.condition)?;
            let then_stmt = Box::new(bind_body(binder, &s.then_stmt)?);
            let else_stmt = match &s.else_stmt {
                Some(e) => Some(Box::new(bind_body(binder, e)?)),
                None => None,
            };
            BoundStmt::If {
                condition,
                then_stmt,
                else_stmt,
                span: s.span,
            }
        }
        Stmt::While(s) => {
            let condition = bind_condition(binder, &s.condition)?;
            let body = Box::new(bind_loop_body(binder, &s.body)?);
            BoundStmt::While {
                condition,
                body,
                span: s.span,
            }
        }
        Stmt::DoWhile(s) => {
            let body = Box::new(bind_loop_body(binder, &s.body)?);
            let condition = bind_condition(binder, &s.condition)?;
            BoundStmt::DoWhile {
                body,
                condition,
                span: s.span,
            }
        }
        Stmt::For(s) => {
            let id = binder.next_compound();
            binder.scope.push_scope();
            binder.labels.push((id, FxHashMap::default()));
            let result = bind_for_parts(binder, s.init.as_ref(), s.condition.as_ref(), s.update, &s.body);
            binder.labels.pop();
            binder.scope.pop_scope();
            let (init, condition, update, body) = result?;
            BoundStmt::For(Box::new(BoundFor {
                compound: id,
                init,
                condition,
                update,
                body,
                span: s.span,
            }))
        }
        Stmt::Goto(label) => {
            let compound = binder
                .labels
                .iter()
                .rev()
                .find(|(_, labels)| labels.contains_key(label.name))
                .map(|(id, _)| *id)
                .ok_or_else(|| CompilationError::UnknownLabel {
                    label: label.name.to_string(),
                    span: label.span,
                })?;
            BoundStmt::Goto {
                label: label.name.to_string(),
                compound,
                span: label.span,
            }
        }
        Stmt::Labeled(s) => BoundStmt::Labeled {
            label: s.label.name.to_string(),
            stmt: Box::new(bind_stmt(binder, &s.stmt)?),
            span: s.span,
        },
        Stmt::Switch(s) => BoundStmt::Switch(Box::new(bind_switch(binder, s)?)),
        Stmt::GotoCase(s) => {
            let Some(value_type) = enclosing_switch(binder) else {
                return Err(CompilationError::InvalidControlFlow {
                    message: "'goto case' outside of a switch".to_string(),
                    span: s.span,
                });
            };
            let value = case_constant(binder, &s.value, value_type)?;
            BoundStmt::GotoCase {
                value,
                span: s.span,
            }
        }
        Stmt::GotoDefault(span) => {
            if enclosing_switch(binder).is_none() {
                return Err(CompilationError::InvalidControlFlow {
                    message: "'goto default' outside of a switch".to_string(),
                    span: *span,
                });
            }
            BoundStmt::GotoDefault(*span)
        }
        Stmt::TryCatch(s) => BoundStmt::TryCatch(Box::new(bind_try_catch(binder, s)?)),
        Stmt::Throw(s) => {
            let value = binder.bind_value(&s.value)?;
            if !is_class_pointer(binder, &value.ty.without_reference()) {
                return Err(CompilationError::TypeMismatch {
                    message: format!(
                        "only class pointers can be thrown, found '{}'",
                        binder.ctx.type_name(&value.ty)
                    ),
                    span: s.span,
                });
            }
            BoundStmt::Throw {
                value,
                span: s.span,
            }
        }
        Stmt::Empty(span) => BoundStmt::Empty(*span),
    })
}

/// Body of an `if` or loop. A bare declaration gets a compound of its own.
fn bind_body(binder: &mut Binder<'_>, stmt: &Stmt<'_>) -> Result<BoundStmt> {
    if let Stmt::VarDecl(_) = stmt {
        let (body, ()) = compound(binder, std::slice::from_ref(stmt), stmt.span(), |_| Ok(()))?;
        return Ok(BoundStmt::Compound(body));
    }
    bind_stmt(binder, stmt)
}

fn bind_loop_body(binder: &mut Binder<'_>, stmt: &Stmt<'_>) -> Result<BoundStmt> {
    binder.breakables.push(Breakable::Loop);
    let body = bind_body(binder, stmt);
    binder.breakables.pop();
    body
}

type ForParts = (
    Option<BoundStmt>,
    Option<BoundExpr>,
    Vec<BoundExpr>,
    BoundStmt,
);

fn bind_for_parts(
    binder: &mut Binder<'_>,
    init: Option<&Stmt<'_>>,
    condition: Option<&Expr<'_>>,
    update: &[Expr<'_>],
    body: &Stmt<'_>,
) -> Result<ForParts> {
    let init = match init {
        Some(stmt) => Some(bind_stmt(binder, stmt)?),
        None => None,
    };
    let condition = match condition {
        Some(expr) => Some(bind_condition(binder, expr)?),
        None => None,
    };
    let mut updates = Vec::with_capacity(update.len());
    for expr in update {
        updates.push(binder.bind_value(expr)?);
    }
    let body = bind_loop_body(binder, body)?;
    Ok((init, condition, updates, body))
}

// ============================================================================
// Conditions
// ============================================================================

/// A condition converted to `bool` and marked for branch lowering.
fn bind_condition(binder: &mut Binder<'_>, expr: &Expr<'_>) -> Result<BoundExpr> {
    let value = binder.bind_value(expr)?;
    let span = value.span;
    let mut value = binder.convert(value, DataType::bool(), ConversionMode::Implicit, span)?;
    mark_jumping(&mut value);
    Ok(value)
}

/// Flag `expr` and its logical sub-conditions for jumping code.
fn mark_jumping(expr: &mut BoundExpr) {
    match &mut expr.kind {
        BoundExprKind::Conjunction { left, right, .. }
        | BoundExprKind::Disjunction { left, right, .. } => {
            mark_jumping(left);
            mark_jumping(right);
        }
        BoundExprKind::Unary { function, operand }
            if function.intrinsic == Some(IntrinsicOp::Not) =>
        {
            mark_jumping(operand);
        }
        _ => {}
    }
    expr.flags |= ExprFlags::GEN_JUMPING_BOOL_CODE;
}

// ============================================================================
// Declarations and Assignment
// ============================================================================

fn bind_var_decl(binder: &mut Binder<'_>, decl: &VarDeclStmt<'_>) -> Result<BoundLocalInit> {
    let span = decl.span;
    let ty = binder.ctx.resolve_type(&decl.ty)?;
    if ty.is_void() {
        return Err(CompilationError::TypeMismatch {
            message: format!("variable '{}' cannot have type void", decl.name.name),
            span,
        });
    }
    let registry = binder.registry();

    let init = if !ty.is_any_reference() && ty.pointers == 0 && registry.is_class_type(&ty) {
        let args = match decl.init {
            VarInit::None => Vec::new(),
            VarInit::Expr(expr) => vec![binder.bind_value(&expr)?],
            VarInit::Args(args) => bind_args(binder, args)?,
        };
        let (constructor, mut args) = resolve_constructor(binder, ty.base, args, span)?;
        match constructor {
            Some(constructor) => LocalInit::Construct {
                constructor,
                args,
                site: binder.next_call_site(),
            },
            None if args.is_empty() => LocalInit::Default,
            None => LocalInit::Value(args.remove(0)),
        }
    } else if ty.is_any_reference() {
        let VarInit::Expr(expr) = decl.init else {
            return Err(CompilationError::TypeMismatch {
                message: format!("reference '{}' must be initialized", decl.name.name),
                span,
            });
        };
        let value = binder.bind_value(&expr)?;
        let value = binder.convert(value, ty, ConversionMode::Implicit, span)?;
        if !value.is_lvalue() {
            return Err(CompilationError::NotAnLvalue { span });
        }
        LocalInit::Value(value.with_flags(ExprFlags::ARG_BY_REF))
    } else {
        let value = match decl.init {
            VarInit::None => None,
            VarInit::Expr(expr) => Some(binder.bind_value(&expr)?),
            VarInit::Args(args) => {
                let mut args = bind_args(binder, args)?;
                match args.len() {
                    0 => None,
                    1 => args.pop(),
                    found => {
                        return Err(CompilationError::ArgumentCountMismatch {
                            name: decl.name.name.to_string(),
                            expected: 1,
                            found,
                            span,
                        });
                    }
                }
            }
        };
        match value {
            Some(value) => {
                LocalInit::Value(binder.convert(value, ty, ConversionMode::Implicit, span)?)
            }
            None => LocalInit::Default,
        }
    };

    // Declared after the initializer so `int x = x;` sees an outer `x`.
    let local = binder
        .scope
        .declare_local(&mut binder.locals, decl.name.name, ty, decl.name.span)?;
    Ok(BoundLocalInit {
        local,
        init,
        destructor: registry.destructor_of(&ty),
        span,
    })
}

fn bind_assign(binder: &mut Binder<'_>, assign: &AssignStmt<'_>) -> Result<BoundAssign> {
    let span = assign.span;
    let target = binder.bind_value(&assign.target)?;
    let value = binder.bind_value(&assign.value)?;
    require_modifiable(binder, &target, span)?;

    let stored = target.ty.without_reference();
    let stored = if stored.pointers == 0 {
        stored.without_const()
    } else {
        stored
    };

    let registry = binder.registry();
    if stored.pointers == 0 && registry.is_class_type(&stored) {
        let methods = registry.find_methods(stored.base, "operator=");
        if !methods.is_empty() {
            let candidates = registered_candidates(&binder.ctx, &methods);
            let object = ArgDesc::of(&target);
            let args = [ArgDesc::of(&value)];
            let m = overload::resolve(
                &binder.ctx,
                "operator=",
                &candidates,
                CallShape::method(&object, &args),
                ConversionMode::Implicit,
                span,
            )?;
            let conversion = m
                .conversions
                .first()
                .ok_or_else(|| CompilationError::internal("operator= without argument"))?;
            let param = *m
                .arg_params()
                .first()
                .ok_or_else(|| CompilationError::internal("operator= without parameter"))?;
            let mut args = vec![binder.apply_conversion(value, conversion, param)?];
            prepare_arguments(
                &binder.ctx,
                &[param],
                &mut args,
                false,
                false,
                &mut binder.locals,
            )?;
            let value = args
                .pop()
                .ok_or_else(|| CompilationError::internal("operator= argument vanished"))?;
            return Ok(BoundAssign {
                target: target.with_flags(ExprFlags::ARG_BY_REF),
                value,
                operator: Some(AssignOperator {
                    function: m.function,
                    site: binder.next_call_site(),
                }),
                span,
            });
        }
    }

    let value = binder.convert(value, stored, ConversionMode::Implicit, span)?;
    Ok(BoundAssign {
        target,
        value,
        operator: None,
        span,
    })
}

fn bind_return(
    binder: &mut Binder<'_>,
    value: Option<&Expr<'_>>,
    span: Span,
) -> Result<BoundStmt> {
    let return_type = binder.return_type;
    let value = match (value, return_type.is_void()) {
        (None, true) => None,
        (Some(_), true) => {
            return Err(CompilationError::TypeMismatch {
                message: "a void function cannot return a value".to_string(),
                span,
            });
        }
        (None, false) => {
            return Err(CompilationError::TypeMismatch {
                message: format!(
                    "function must return a value of type '{}'",
                    binder.ctx.type_name(&return_type)
                ),
                span,
            });
        }
        (Some(expr), false) => {
            let bound = binder.bind_value(expr)?;
            let bound = binder.convert(bound, return_type, ConversionMode::Implicit, span)?;
            if return_type.is_any_reference() {
                if !bound.is_lvalue() {
                    return Err(CompilationError::NotAnLvalue { span });
                }
                Some(bound.with_flags(ExprFlags::ARG_BY_REF))
            } else if bound.is_lvalue()
                && return_type.pointers == 0
                && binder.registry().is_class_type(&return_type)
            {
                // The named object is destroyed on the way out; return a copy.
                Some(construct_temporary(binder, return_type.base, vec![bound], span)?)
            } else {
                Some(bound)
            }
        }
    };
    Ok(BoundStmt::Return { value, span })
}

// ============================================================================
// Switch
// ============================================================================

/// Value type of the innermost enclosing switch.
fn enclosing_switch(binder: &Binder<'_>) -> Option<DataType> {
    binder.breakables.iter().rev().find_map(|b| match b {
        Breakable::Switch { value_type, .. } => Some(*value_type),
        Breakable::Loop => None,
    })
}

fn bind_switch(binder: &mut Binder<'_>, switch: &SwitchStmt<'_>) -> Result<BoundSwitch> {
    let span = switch.span;
    let value = binder.bind_value(&switch.expr)?;
    let registry = binder.registry();

    let plain = value.ty.plain();
    let kind = if registry.is_enum_type(&plain) {
        registry.get_enum(plain.base).map(|e| e.underlying)
    } else {
        registry
            .basic_kind(&plain)
            .filter(|k| k.is_integer() || k.is_char() || *k == BasicKind::Bool)
    };
    let Some(kind) = kind else {
        return Err(CompilationError::TypeMismatch {
            message: format!(
                "switch value must be integral, found '{}'",
                binder.ctx.type_name(&value.ty)
            ),
            span,
        });
    };
    let value_type = DataType::basic(kind);
    let value_span = value.span;
    let value = binder.convert(value, value_type, ConversionMode::Implicit, value_span)?;

    let id = binder.next_compound();
    binder.breakables.push(Breakable::Switch { value_type });
    let cases = bind_cases(binder, switch, value_type);
    binder.breakables.pop();

    Ok(BoundSwitch {
        value,
        compound: id,
        cases: cases?,
        span,
    })
}

fn bind_cases(
    binder: &mut Binder<'_>,
    switch: &SwitchStmt<'_>,
    value_type: DataType,
) -> Result<Vec<BoundCase>> {
    let mut cases = Vec::with_capacity(switch.cases.len());
    for case in switch.cases {
        let mut labels = Vec::with_capacity(case.labels.len());
        for label in case.labels {
            labels.push(match label {
                CaseLabel::Case(expr) => BoundCaseLabel::Case {
                    value: case_constant(binder, expr, value_type)?,
                    span: expr.span(),
                },
                CaseLabel::Default(span) => BoundCaseLabel::Default(*span),
            });
        }
        let (body, ()) = compound(binder, case.stmts, case.span, |_| Ok(()))?;
        cases.push(BoundCase {
            labels,
            body,
            span: case.span,
        });
    }
    Ok(cases)
}

/// A case constant converted to the switch value type.
fn case_constant(
    binder: &mut Binder<'_>,
    expr: &Expr<'_>,
    value_type: DataType,
) -> Result<ConstantValue> {
    let span = expr.span();
    let bound = binder.bind_value(expr)?;
    if fold_constant(&bound).is_none() {
        return Err(CompilationError::NotConstant { span });
    }
    let converted = binder.convert(bound, value_type, ConversionMode::Implicit, span)?;
    fold_constant(&converted).ok_or(CompilationError::NotConstant { span })
}

// ============================================================================
// Exceptions
// ============================================================================

fn is_class_pointer(binder: &Binder<'_>, ty: &DataType) -> bool {
    ty.pointers == 1 && binder.registry().is_class_type(&DataType::simple(ty.base))
}

fn bind_try_catch(binder: &mut Binder<'_>, stmt: &TryCatchStmt<'_>) -> Result<BoundTryCatch> {
    let try_block = bind_block(binder, &stmt.try_block)?;

    let mut catches = Vec::with_capacity(stmt.catches.len());
    for clause in stmt.catches {
        let ty = binder.ctx.resolve_type(&clause.ty)?;
        if !is_class_pointer(binder, &ty) {
            return Err(CompilationError::TypeMismatch {
                message: format!(
                    "catch type must be a class pointer, found '{}'",
                    binder.ctx.type_name(&ty)
                ),
                span: clause.span,
            });
        }
        let name = clause.name;
        let (body, variable) = compound(
            binder,
            clause.body.stmts,
            clause.body.span,
            |binder| -> Result<Option<LocalId>> {
                match name {
                    Some(name) => binder
                        .scope
                        .declare_local(&mut binder.locals, name.name, ty, name.span)
                        .map(Some),
                    None => Ok(None),
                }
            },
        )?;
        catches.push(BoundCatch {
            class: ty.base,
            variable,
            body,
            span: clause.span,
        });
    }

    Ok(BoundTryCatch {
        try_block,
        catches,
        span: stmt.span,
    })
}
