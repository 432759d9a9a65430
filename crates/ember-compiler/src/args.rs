//! Argument-passing rules.
//!
//! After overload resolution has converted every argument to its parameter
//! type, [`prepare_arguments`] decides per argument whether it is passed by
//! reference, loaded through a reference, or materialized into a temporary.
//! The decision is recorded in the argument's [`ExprFlags`].
//!
//! Rules, first match wins:
//!
//! | Parameter                      | Argument                          | Passing                       |
//! |--------------------------------|-----------------------------------|-------------------------------|
//! | first of a member operator     | any                               | by reference                  |
//! | `T&`                           | not a reference                   | by reference                  |
//! | `const T&`                     | non-class rvalue                  | temporary, by reference       |
//! | `const T&`                     | otherwise                         | by reference                  |
//! | `T&&`                          | any                               | by reference                  |
//! | class or array                 | any                               | by reference                  |
//! | any                            | array                             | by reference                  |
//! | value                          | non-class reference               | load, then by value           |
//!
//! Raw operators only use the member-operator and class/array rules.

use ember_core::{CompilationError, ConstantValue, DataType};

use crate::bound::{BoundExpr, BoundExprKind, ExprFlags, LocalId, LocalTable};
use crate::context::CompilationContext;

/// Allocates compiler-generated temporaries.
pub trait TemporaryAllocator {
    fn allocate_temporary(&mut self, ty: DataType) -> LocalId;
}

impl TemporaryAllocator for LocalTable {
    fn allocate_temporary(&mut self, ty: DataType) -> LocalId {
        self.add_temporary(ty)
    }
}

/// Set the passing mode of every argument of a resolved call.
///
/// `params` are the formal parameter types (receiver included for member
/// functions) and `args` the already converted arguments.
pub fn prepare_arguments(
    ctx: &CompilationContext<'_>,
    params: &[DataType],
    args: &mut [BoundExpr],
    first_arg_by_ref: bool,
    is_raw_operator: bool,
    temps: &mut impl TemporaryAllocator,
) -> Result<(), CompilationError> {
    if params.len() != args.len() {
        return Err(CompilationError::internal(format!(
            "argument count mismatch after overload resolution: {} parameters, {} arguments",
            params.len(),
            args.len()
        )));
    }

    let registry = ctx.registry();
    for (index, (param, arg)) in params.iter().zip(args.iter_mut()).enumerate() {
        if index == 0 && first_arg_by_ref {
            arg.flags |= ExprFlags::ARG_BY_REF;
            continue;
        }

        let class_param = registry.is_class_type(&param.without_reference());
        let array_involved = registry.is_array_type(&param.without_reference())
            || registry.is_array_type(&arg.ty.without_reference());

        if is_raw_operator {
            if class_param || array_involved {
                arg.flags |= ExprFlags::ARG_BY_REF;
            }
            continue;
        }

        if param.is_non_const_reference() {
            if !arg.ty.is_reference() {
                arg.flags |= ExprFlags::ARG_BY_REF;
            }
        } else if param.is_const_reference() {
            let class_arg = registry.is_class_type(&arg.ty.without_reference());
            if !class_arg && produces_rvalue(arg) {
                materialize(arg, *param, temps);
            } else if !arg.ty.is_reference() {
                arg.flags |= ExprFlags::ARG_BY_REF;
            }
        } else if param.is_rvalue_reference() {
            arg.flags |= ExprFlags::ARG_BY_REF;
        } else if class_param || array_involved {
            arg.flags |= ExprFlags::ARG_BY_REF;
            if class_param && registry.is_class_type(&arg.ty.without_reference()) {
                arg.flags |= ExprFlags::CLASS_OBJECT_ARG;
            }
        } else if arg.ty.is_reference() && !registry.is_class_type(&arg.ty.without_reference()) {
            arg.flags |= ExprFlags::REF_BY_VALUE;
        }
    }
    Ok(())
}

/// Literals, constants and the results of arithmetic, calls, casts and
/// conversions have no storage of their own.
fn produces_rvalue(arg: &BoundExpr) -> bool {
    arg.is_value() && !arg.is_lvalue()
}

/// Replace `arg` by a temporary copy-constructed from it, passed by reference.
fn materialize(arg: &mut BoundExpr, param: DataType, temps: &mut impl TemporaryAllocator) {
    let ty = param.without_reference();
    let local = temps.allocate_temporary(ty);
    let span = arg.span;
    let placeholder = BoundExpr::literal(ConstantValue::Null, DataType::null_ptr(), span);
    let init = std::mem::replace(arg, placeholder);
    *arg = BoundExpr::lvalue(
        BoundExprKind::Temporary {
            local,
            init: Box::new(init),
        },
        ty,
        span,
    )
    .with_flags(ExprFlags::ARG_BY_REF | ExprFlags::ARG_IS_TEMPORARY);
}
