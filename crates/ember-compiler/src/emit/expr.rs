//! Expression emission.
//!
//! Every expression is first lowered to a [`Place`]: either an object
//! holding the value directly, or an address the value lives at. Callers
//! then ask for the value (loading through addresses) or for the address
//! (taking the address of direct objects), as the argument-passing flags
//! demand.

use ember_core::{CompilationError, ConstantValue, DataType, IntrinsicOp, TypeHash};

use super::devirtualize::try_devirtualize;
use super::{FunctionEmitter, GenResult, Instr, IrObject, Result, Target};
use crate::bound::{BoundExpr, BoundExprKind, CallSiteId, Dispatch, ExprFlags, FunctionRef};
use crate::conversion::ConversionKind;

/// Where an expression's value lives.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Place {
    Direct(IrObject),
    /// The value is stored at this address.
    Indirect(IrObject),
}

impl FunctionEmitter<'_> {
    /// Emit `expr` for its value.
    pub(super) fn emit_expr(&mut self, expr: &BoundExpr) -> Result<GenResult> {
        let before = self.frames.innermost().map_or(0, |f| f.len());
        let value = if expr.ty.is_void() {
            self.emit_place(expr)?;
            None
        } else {
            Some(self.emit_value(expr)?)
        };
        let aux = self
            .frames
            .innermost()
            .map(|f| {
                f.destruction_order()
                    .take(f.len().saturating_sub(before))
                    .map(|p| p.object.clone())
                    .collect()
            })
            .unwrap_or_default();
        Ok(GenResult {
            value,
            aux,
            ..GenResult::default()
        })
    }

    /// The value of `expr`.
    pub(super) fn emit_value(&mut self, expr: &BoundExpr) -> Result<IrObject> {
        match self.emit_place(expr)? {
            Place::Direct(object) => Ok(object),
            Place::Indirect(address) => {
                let dest = self.new_temp();
                self.emit(Instr::Load {
                    dest: dest.clone(),
                    address,
                });
                Ok(dest)
            }
        }
    }

    /// The address of `expr`.
    pub(super) fn emit_address(&mut self, expr: &BoundExpr) -> Result<IrObject> {
        match self.emit_place(expr)? {
            Place::Indirect(address) => Ok(address),
            Place::Direct(object) => {
                // Constants get a slot of their own.
                let object = if object.is_constant() {
                    let slot = self.new_temp();
                    self.emit(Instr::Copy {
                        dest: slot.clone(),
                        src: object,
                    });
                    slot
                } else {
                    object
                };
                let dest = self.new_temp();
                self.emit(Instr::AddressOf {
                    dest: dest.clone(),
                    object,
                });
                Ok(dest)
            }
        }
    }

    /// An argument as its passing flags ask for it.
    pub(super) fn emit_arg(&mut self, arg: &BoundExpr) -> Result<IrObject> {
        if arg.flags.contains(ExprFlags::ARG_BY_REF) {
            self.emit_address(arg)
        } else {
            self.emit_value(arg)
        }
    }

    fn emit_args(&mut self, args: &[BoundExpr]) -> Result<Vec<IrObject>> {
        args.iter().map(|a| self.emit_arg(a)).collect()
    }

    /// A result slot for a call returning `ty`; reference results are
    /// addresses.
    fn result_place(&mut self, ty: DataType) -> (Option<IrObject>, Place) {
        if ty.is_void() {
            return (None, Place::Direct(IrObject::Null));
        }
        let dest = self.new_temp();
        let place = if ty.is_any_reference() {
            Place::Indirect(dest.clone())
        } else {
            Place::Direct(dest.clone())
        };
        (Some(dest), place)
    }

    fn slot_place(object: IrObject, ty: &DataType) -> Place {
        if ty.is_any_reference() {
            Place::Indirect(object)
        } else {
            Place::Direct(object)
        }
    }

    pub(super) fn emit_place(&mut self, expr: &BoundExpr) -> Result<Place> {
        use BoundExprKind as K;
        match &expr.kind {
            K::Literal(ConstantValue::Null) => Ok(Place::Direct(IrObject::Null)),
            K::Literal(value) => Ok(Place::Direct(IrObject::Constant(value.clone()))),
            K::Local(id) => {
                let slot = self
                    .function
                    .locals
                    .get(*id)
                    .ok_or_else(|| CompilationError::internal(format!("unknown local {id}")))?;
                Ok(Self::slot_place(IrObject::Local(*id), &slot.ty))
            }
            K::Parameter(index) => {
                let param = self.function.params.get(*index as usize).ok_or_else(|| {
                    CompilationError::internal(format!("unknown parameter {index}"))
                })?;
                Ok(Self::slot_place(IrObject::Parameter(*index), &param.ty))
            }
            K::Member {
                object,
                class,
                index,
            } => {
                let object = self.emit_address(object)?;
                let dest = self.new_temp();
                self.emit(Instr::MemberAddress {
                    dest: dest.clone(),
                    object,
                    class: *class,
                    index: *index,
                });
                if expr.ty.is_any_reference() {
                    let target = self.new_temp();
                    self.emit(Instr::Load {
                        dest: target.clone(),
                        address: dest,
                    });
                    return Ok(Place::Indirect(target));
                }
                Ok(Place::Indirect(dest))
            }
            K::Unary { function, operand } => {
                let op = intrinsic_of(function)?;
                let operand = self.emit_arg(operand)?;
                let (dest, place) = self.result_place(expr.ty);
                let dest = dest.ok_or_else(|| CompilationError::internal("void raw operator"))?;
                self.emit(Instr::Unary { dest, op, operand });
                Ok(place)
            }
            K::Binary {
                function,
                left,
                right,
            } => {
                let op = intrinsic_of(function)?;
                let left = self.emit_arg(left)?;
                let right = self.emit_arg(right)?;
                let (dest, place) = self.result_place(expr.ty);
                let dest = dest.ok_or_else(|| CompilationError::internal("void raw operator"))?;
                self.emit(Instr::Binary {
                    dest,
                    op,
                    left,
                    right,
                });
                Ok(place)
            }
            K::Call {
                function,
                args,
                site,
                dispatch,
            } => self.emit_call(function, args, *site, *dispatch),
            K::DelegateCall {
                delegate,
                args,
                nothrow,
                ..
            } => {
                let delegate = self.emit_value(delegate)?;
                let args = self.emit_args(args)?;
                let (dest, place) = self.result_place(expr.ty);
                self.emit(Instr::DelegateCall {
                    dest: dest.clone(),
                    delegate,
                    args,
                });
                self.after_call(!nothrow);
                self.register_result(dest, expr.ty)?;
                Ok(place)
            }
            K::Conjunction {
                left,
                right,
                result,
            } => self.emit_logical(left, right, IrObject::Local(*result), true),
            K::Disjunction {
                left,
                right,
                result,
            } => self.emit_logical(left, right, IrObject::Local(*result), false),
            K::Cast {
                operand,
                conversion,
            }
            | K::Conversion {
                operand,
                conversion,
            } => self.emit_conversion(operand, conversion, expr.ty),
            K::SizeOf { size, .. } => Ok(Place::Direct(IrObject::Constant(ConstantValue::ULong(
                *size,
            )))),
            K::Construct {
                constructor,
                args,
                object,
                destructor,
                ..
            } => {
                let object = IrObject::Local(*object);
                self.construct_into(object.clone(), constructor.as_ref(), args)?;
                if let Some(destructor) = destructor {
                    self.frames.push(object.clone(), *destructor)?;
                }
                Ok(Place::Direct(object))
            }
            K::Is { operand, class } => {
                let operand = self.emit_value(operand)?;
                let dest = self.new_temp();
                self.emit(Instr::InstanceOf {
                    dest: dest.clone(),
                    operand,
                    class: *class,
                });
                Ok(Place::Direct(dest))
            }
            K::As { operand, class } => {
                let operand = self.emit_value(operand)?;
                let dest = self.new_temp();
                self.emit(Instr::DynamicCast {
                    dest: dest.clone(),
                    operand,
                    class: *class,
                });
                Ok(Place::Direct(dest))
            }
            K::TypeExpr(_) | K::Namespace(_) | K::FunctionGroup(_) => Err(
                CompilationError::internal("non-value expression reached the emitter"),
            ),
            K::PostfixIncDec {
                operand,
                function,
                old_value,
                ..
            } => {
                let op = intrinsic_of(function)?;
                let address = self.emit_address(operand)?;
                let old = IrObject::Local(*old_value);
                self.emit(Instr::Load {
                    dest: old.clone(),
                    address: address.clone(),
                });
                let dest = self.new_temp();
                self.emit(Instr::Unary {
                    dest,
                    op,
                    operand: address,
                });
                Ok(Place::Direct(old))
            }
            K::ExceptionCode => Ok(Place::Direct(IrObject::ExceptionCode)),
            K::AddressOf(operand) => Ok(Place::Direct(self.emit_address(operand)?)),
            K::Deref(pointer) => Ok(Place::Indirect(self.emit_value(pointer)?)),
            K::Temporary { local, init } => {
                let value = self.emit_value(init)?;
                let slot = IrObject::Local(*local);
                self.emit(Instr::Copy {
                    dest: slot.clone(),
                    src: value,
                });
                Ok(Place::Direct(slot))
            }
            K::New {
                class,
                constructor,
                args,
                ..
            } => {
                let raw = self.new_temp();
                self.emit(Instr::Allocate {
                    dest: raw.clone(),
                    class: *class,
                });
                let pointer = self.new_temp();
                self.emit(Instr::Reinterpret {
                    dest: pointer.clone(),
                    operand: raw,
                    to: expr.ty,
                });
                match constructor {
                    Some(function) => self.call_constructor(function, pointer.clone(), args)?,
                    None => {
                        if let Some(source) = args.first() {
                            let value = self.emit_value(source)?;
                            self.emit(Instr::Store {
                                address: pointer.clone(),
                                value,
                            });
                        }
                    }
                }
                Ok(Place::Direct(pointer))
            }
        }
    }

    // ==========================================================================
    // Calls
    // ==========================================================================

    fn emit_call(
        &mut self,
        function: &FunctionRef,
        args: &[BoundExpr],
        site: CallSiteId,
        dispatch: Dispatch,
    ) -> Result<Place> {
        let mut values = self.emit_args(args)?;
        let (dest, place) = self.result_place(function.return_type);

        let devirtualized = match (dispatch, self.reaching) {
            (Dispatch::Virtual, Some(reaching)) if self.options.devirtualize => {
                try_devirtualize(self.registry, function.hash, site, reaching)
            }
            _ => None,
        };

        match (dispatch, devirtualized) {
            (Dispatch::Virtual, Some(entry)) => {
                tracing::debug!(
                    function = %function.name,
                    target = %entry.qualified_name(),
                    %site,
                    "devirtualized call"
                );
                let receiver_class = args.first().map(|a| a.ty.without_reference().base);
                if receiver_class != entry.owner {
                    if let (Some(receiver), Some(to)) = (values.first(), entry.receiver_type()) {
                        let adjusted = self.new_temp();
                        self.emit(Instr::Reinterpret {
                            dest: adjusted.clone(),
                            operand: receiver.clone(),
                            to,
                        });
                        values[0] = adjusted;
                    }
                }
                self.emit(Instr::Call {
                    dest: dest.clone(),
                    function: entry.hash,
                    args: values,
                });
            }
            (Dispatch::Virtual, None) => {
                if self.reaching.is_some() && self.options.devirtualize {
                    tracing::debug!(function = %function.name, %site, "call left virtual");
                }
                self.emit(Instr::VirtualCall {
                    dest: dest.clone(),
                    function: function.hash,
                    args: values,
                });
            }
            (Dispatch::Direct, _) => {
                self.emit(Instr::Call {
                    dest: dest.clone(),
                    function: function.hash,
                    args: values,
                });
            }
        }
        self.after_call(function.can_throw());
        self.register_result(dest, function.return_type)?;
        Ok(place)
    }

    /// A class object returned by value is a temporary of the enclosing
    /// frame.
    fn register_result(&mut self, dest: Option<IrObject>, ty: DataType) -> Result<()> {
        if let (Some(dest), Some(destructor)) = (dest, self.registry.destructor_of(&ty)) {
            self.frames.push(dest, destructor)?;
        }
        Ok(())
    }

    /// Construct `object` in place. Classes without constructors are
    /// cleared or copied.
    pub(super) fn construct_into(
        &mut self,
        object: IrObject,
        constructor: Option<&FunctionRef>,
        args: &[BoundExpr],
    ) -> Result<()> {
        match constructor {
            Some(function) => {
                let address = self.new_temp();
                self.emit(Instr::AddressOf {
                    dest: address.clone(),
                    object,
                });
                self.call_constructor(function, address, args)
            }
            None => {
                match args.first() {
                    Some(source) => {
                        let src = self.emit_value(source)?;
                        self.emit(Instr::Copy { dest: object, src });
                    }
                    None => self.emit(Instr::Clear { dest: object }),
                }
                Ok(())
            }
        }
    }

    /// Call `function` on the storage at `address`.
    pub(super) fn call_constructor(
        &mut self,
        function: &FunctionRef,
        address: IrObject,
        args: &[BoundExpr],
    ) -> Result<()> {
        let mut values = Vec::with_capacity(args.len() + 1);
        values.push(address);
        values.extend(self.emit_args(args)?);
        self.emit(Instr::Call {
            dest: None,
            function: function.hash,
            args: values,
        });
        self.after_call(function.can_throw());
        Ok(())
    }

    // ==========================================================================
    // Operators and Conversions
    // ==========================================================================

    /// Materialized `&&` (`and == true`) or `||` into `result`.
    ///
    /// ```text
    /// result = left
    /// jump_if result == !and -> end
    /// [right, own frame]
    /// result = right
    /// end:
    /// ```
    fn emit_logical(
        &mut self,
        left: &BoundExpr,
        right: &BoundExpr,
        result: IrObject,
        and: bool,
    ) -> Result<Place> {
        let value = self.emit_value(left)?;
        self.emit(Instr::Copy {
            dest: result.clone(),
            src: value,
        });
        let short = self.emit_forward(Instr::JumpIf {
            condition: result.clone(),
            when: !and,
            target: Target::PENDING,
        });
        self.in_compound(None, |e| {
            let value = e.emit_value(right)?;
            e.emit(Instr::Copy {
                dest: result.clone(),
                src: value,
            });
            Ok(())
        })?;
        self.patch_here(vec![short])?;
        Ok(Place::Direct(result))
    }

    fn emit_conversion(
        &mut self,
        operand: &BoundExpr,
        conversion: &ConversionKind,
        to: DataType,
    ) -> Result<Place> {
        match conversion {
            ConversionKind::Identity
            | ConversionKind::Qualification
            | ConversionKind::NullToPointer => self.emit_place(operand),
            ConversionKind::Basic { .. }
            | ConversionKind::ConstantFit { .. }
            | ConversionKind::EnumToInteger { .. }
            | ConversionKind::IntegerToEnum { .. }
            | ConversionKind::PointerToBool => {
                let value = self.emit_value(operand)?;
                let dest = self.new_temp();
                self.emit(Instr::Convert {
                    dest: dest.clone(),
                    operand: value,
                    to,
                });
                Ok(Place::Direct(dest))
            }
            ConversionKind::DerivedToBase { base: target, .. }
            | ConversionKind::BaseToDerived { derived: target } => {
                let from = operand.ty.without_reference().base;
                self.adjust_pointer(operand, from, *target)
            }
            ConversionKind::PointerReinterpret => {
                let value = self.emit_value(operand)?;
                let dest = self.new_temp();
                self.emit(Instr::Reinterpret {
                    dest: dest.clone(),
                    operand: value,
                    to,
                });
                Ok(Place::Direct(dest))
            }
            ConversionKind::Constructor { .. } | ConversionKind::ConversionFunction { .. } => {
                Err(CompilationError::internal(
                    "user-defined conversion left unlowered",
                ))
            }
        }
    }

    /// Move a pointer, or an object's address, along the class hierarchy.
    fn adjust_pointer(&mut self, operand: &BoundExpr, from: TypeHash, to: TypeHash) -> Result<Place> {
        let is_pointer = operand.ty.without_reference().is_pointer();
        let source = if is_pointer {
            self.emit_value(operand)?
        } else {
            self.emit_address(operand)?
        };
        let dest = self.new_temp();
        self.emit(Instr::AdjustPointer {
            dest: dest.clone(),
            operand: source,
            from,
            to,
        });
        Ok(if is_pointer {
            Place::Direct(dest)
        } else {
            Place::Indirect(dest)
        })
    }
}

fn intrinsic_of(function: &FunctionRef) -> Result<IntrinsicOp> {
    function.intrinsic.ok_or_else(|| {
        CompilationError::internal(format!("'{}' is not a raw operator", function.name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::bind_function;
    use crate::emit::{EmittedFunction, emit_function};
    use crate::options::CompilerOptions;
    use bumpalo::Bump;
    use ember_registry::SymbolRegistry;
    use ember_syntax::{BinaryOp, FunctionDecl, SyntaxBuilder};

    fn emit(registry: &SymbolRegistry, decl: &FunctionDecl<'_>) -> EmittedFunction {
        let options = CompilerOptions::default();
        let bound = bind_function(registry, &options, decl).unwrap();
        emit_function(registry, &options, None, &bound).unwrap()
    }

    #[test]
    fn returned_conjunction_is_materialized() {
        let registry = SymbolRegistry::with_basic_types();
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let value = b.binary(BinaryOp::LogicalAnd, b.ident("x"), b.ident("y"));
        let decl = b.function(
            "both",
            &[(b.ty("bool"), "x"), (b.ty("bool"), "y")],
            Some(b.ty("bool")),
            b.block(&[b.ret(Some(value))]),
        );
        let function = emit(&registry, &decl);
        let code = &function.instructions;

        let Instr::Copy { dest: result, src } = &code[0] else {
            panic!("expected the left operand stored first, got {:?}", code[0]);
        };
        assert_eq!(*src, IrObject::Parameter(0));
        assert_eq!(
            code[1],
            Instr::JumpIf {
                condition: result.clone(),
                when: false,
                target: Target::at(3),
            }
        );
        assert_eq!(
            code[2],
            Instr::Copy {
                dest: result.clone(),
                src: IrObject::Parameter(1),
            }
        );
    }

    #[test]
    fn raw_operator_reads_parameters_directly() {
        let registry = SymbolRegistry::with_basic_types();
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let sum = b.binary(BinaryOp::Mul, b.ident("a"), b.ident("b"));
        let decl = b.function(
            "product",
            &[(b.ty("int"), "a"), (b.ty("int"), "b")],
            Some(b.ty("int")),
            b.block(&[b.ret(Some(sum))]),
        );
        let function = emit(&registry, &decl);

        assert!(matches!(
            &function.instructions[0],
            Instr::Binary { op: IntrinsicOp::Mul, left: IrObject::Parameter(0), right: IrObject::Parameter(1), .. }
        ));
        assert!(function.landing_pads.is_empty());
    }

    #[test]
    fn widening_argument_is_converted() {
        let registry = SymbolRegistry::with_basic_types();
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let sum = b.binary(BinaryOp::Add, b.ident("a"), b.ident("wide"));
        let decl = b.function(
            "mixed",
            &[(b.ty("int"), "a"), (b.ty("long"), "wide")],
            Some(b.ty("long")),
            b.block(&[b.ret(Some(sum))]),
        );
        let function = emit(&registry, &decl);

        assert!(matches!(
            &function.instructions[0],
            Instr::Convert { operand: IrObject::Parameter(0), .. }
        ));
    }
}
