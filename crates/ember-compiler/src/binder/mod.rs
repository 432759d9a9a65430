//! Function binder: syntax tree to bound tree.
//!
//! The [`Binder`] walks one function body depth-first. Every visited
//! expression pushes exactly one [`BoundExpr`] on the expression stack;
//! operator and call visitors pop their operands and push the combined
//! node. Statements are bound directly into [`BoundStmt`]s.
//!
//! ## Algorithm
//!
//! 1. Resolve the owning class and parameter types, and find the registered
//!    entry of the function (traits, `const` receiver)
//! 2. Declare `this` and the parameters at depth 0
//! 3. Bind the body as the outermost compound, assigning [`CompoundId`]s,
//!    [`CallSiteId`]s and local slots in binding order
//!
//! # Example
//!
//! ```ignore
//! let bound = bind_function(&registry, &CompilerOptions::default(), &decl)?;
//! assert_eq!(bound.params.len(), decl.params.len());
//! ```

mod calls;
mod cast;
mod literals;
mod member;
mod operators;
mod stmt;
mod symbols;

pub use literals::fold_constant;

use ember_core::{
    BasicKind, CompilationError, DataType, FunctionEntry, Param, Span, TypeHash,
};
use ember_registry::{ResolutionResult, SymbolRegistry};
use ember_syntax::{Expr, FunctionDecl, FunctionKind};
use rustc_hash::FxHashMap;

use crate::args::prepare_arguments;
use crate::bound::{
    ArgCategory, BoundExpr, BoundExprKind, BoundFunction, BoundParam, CallSiteId, CompoundId,
    Dispatch, ExprFlags, FunctionRef, LocalTable,
};
use crate::context::CompilationContext;
use crate::conversion::{
    ArgDesc, Conversion, ConversionKind, ConversionMode, find_conversion,
    find_standard_conversion,
};
use crate::options::CompilerOptions;
use crate::overload::OverloadMatch;
use crate::scope::LocalScope;

type Result<T> = std::result::Result<T, CompilationError>;

/// Bind one function declaration.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn bind_function(
    registry: &SymbolRegistry,
    options: &CompilerOptions,
    decl: &FunctionDecl<'_>,
) -> Result<BoundFunction> {
    let path: Vec<&str> = decl.namespace.iter().map(|i| i.name).collect();
    let namespace = registry
        .namespace_node(&path)
        .unwrap_or_else(|| registry.root());
    let ctx = CompilationContext::in_namespace(registry, namespace);

    tracing::debug!(function = %decl.display_name(), "binding function");
    let bound = Binder::new(ctx, options).bind(decl)?;
    tracing::debug!(
        function = %bound.name,
        locals = bound.locals.len(),
        call_sites = bound.call_sites,
        "bound function"
    );
    Ok(bound)
}

/// What `break` and `continue` may target.
#[derive(Debug, Clone, Copy)]
enum Breakable {
    Loop,
    /// Case constants convert to `value_type`.
    Switch { value_type: DataType },
}

/// Binding state of one function.
pub struct Binder<'a> {
    ctx: CompilationContext<'a>,
    options: &'a CompilerOptions,
    /// Class of a member function, constructor or destructor
    owner: Option<TypeHash>,
    /// `C*` receiver, absent for free and static functions
    this_type: Option<DataType>,
    return_type: DataType,
    locals: LocalTable,
    scope: LocalScope,
    stack: Vec<BoundExpr>,
    next_compound: u32,
    next_site: u32,
    /// Labels of every open compound, innermost last
    labels: Vec<(CompoundId, FxHashMap<String, Span>)>,
    breakables: Vec<Breakable>,
}

impl<'a> Binder<'a> {
    pub fn new(ctx: CompilationContext<'a>, options: &'a CompilerOptions) -> Self {
        Self {
            ctx,
            options,
            owner: None,
            this_type: None,
            return_type: DataType::void(),
            locals: LocalTable::new(),
            scope: LocalScope::new(),
            stack: Vec::new(),
            next_compound: 0,
            next_site: 0,
            labels: Vec::new(),
            breakables: Vec::new(),
        }
    }

    /// Bind `decl` into a [`BoundFunction`].
    pub fn bind(mut self, decl: &FunctionDecl<'_>) -> Result<BoundFunction> {
        let registry = self.ctx.registry();

        let owner = match decl.class {
            Some(class) => Some(self.resolve_class_name(class.name, class.span)?),
            None => None,
        };
        self.owner = owner;

        let mut declared = Vec::with_capacity(decl.params.len());
        for (i, param) in decl.params.iter().enumerate() {
            let ty = self.ctx.resolve_type(&param.ty)?;
            let name = param.name.map_or_else(|| format!("arg{i}"), |n| n.name.to_string());
            declared.push(Param::new(name, ty));
        }
        let return_type = match &decl.return_type {
            Some(ty) => self.ctx.resolve_type(ty)?,
            None => DataType::void(),
        };

        let entry = declared_entry(decl, owner, declared, return_type);
        let entry = match registry.get_function(entry.hash) {
            Some(registered) => registered.clone(),
            None => entry,
        };
        self.this_type = entry.receiver_type();
        self.return_type = entry.return_type;

        let mut params = Vec::with_capacity(entry.params.len());
        let offset = usize::from(self.this_type.is_some());
        for (index, param) in entry.params.iter().enumerate() {
            let is_this = index < offset;
            if !is_this {
                let syntax = &decl.params[index - offset];
                if let Some(name) = syntax.name {
                    self.scope
                        .declare_param(name.name, index as u32, param.data_type, name.span)?;
                }
            }
            params.push(BoundParam {
                name: Some(param.name.clone()),
                ty: param.data_type,
                destructor: if is_this {
                    None
                } else {
                    registry.destructor_of(&param.data_type)
                },
            });
        }

        let body = stmt::bind_block(&mut self, &decl.body)?;
        if !self.stack.is_empty() {
            return Err(CompilationError::internal(format!(
                "{} expression(s) left on the binder stack",
                self.stack.len()
            )));
        }

        let name = decl.display_name();
        Ok(BoundFunction {
            hash: entry.hash,
            is_entry: self.options.is_entry(decl.name.name, &name),
            name,
            owner,
            params,
            return_type: self.return_type,
            body,
            locals: self.locals,
            call_sites: self.next_site,
            span: decl.span,
        })
    }

    // ==========================================================================
    // Expression Stack
    // ==========================================================================

    fn push(&mut self, expr: BoundExpr) {
        self.stack.push(expr);
    }

    fn pop(&mut self) -> Result<BoundExpr> {
        self.stack
            .pop()
            .ok_or_else(|| CompilationError::internal("binder expression stack underflow"))
    }

    /// Visit `expr`, pushing its bound form.
    fn visit(&mut self, expr: &Expr<'_>) -> Result<()> {
        let bound = match expr {
            Expr::Literal(lit) => literals::bind_literal(&lit.kind, lit.span),
            Expr::Ident(ident) => symbols::bind_ident(self, ident)?,
            Expr::This(span) => symbols::bind_this(self, *span)?,
            Expr::Base(span) => symbols::bind_base(self, *span)?,
            Expr::ExceptionCode(span) => BoundExpr::lvalue(
                BoundExprKind::ExceptionCode,
                DataType::basic(BasicKind::Int),
                *span,
            ),
            Expr::Paren(p) => return self.visit(&p.expr),
            Expr::Binary(bin) => operators::bind_binary(self, bin)?,
            Expr::Unary(un) => operators::bind_unary(self, un)?,
            Expr::Postfix(post) => operators::bind_postfix(self, post)?,
            Expr::Call(call) => calls::bind_call(self, call)?,
            Expr::Construct(c) => calls::bind_construct(self, c)?,
            Expr::New(c) => calls::bind_new(self, c)?,
            Expr::Member(m) => member::bind_member(self, m)?,
            Expr::Index(index) => member::bind_index(self, index)?,
            Expr::Cast(c) => cast::bind_cast(self, c)?,
            Expr::Is(test) => cast::bind_type_test(self, test, true)?,
            Expr::As(test) => cast::bind_type_test(self, test, false)?,
            Expr::SizeOf(s) => cast::bind_sizeof(self, s)?,
        };
        self.push(bound);
        Ok(())
    }

    /// Visit `expr` and pop its bound form.
    fn bind_expr(&mut self, expr: &Expr<'_>) -> Result<BoundExpr> {
        self.visit(expr)?;
        self.pop()
    }

    /// Bind an expression that must denote a value.
    fn bind_value(&mut self, expr: &Expr<'_>) -> Result<BoundExpr> {
        let bound = self.bind_expr(expr)?;
        require_value(&bound)?;
        Ok(bound)
    }

    // ==========================================================================
    // Identities
    // ==========================================================================

    fn next_call_site(&mut self) -> CallSiteId {
        let site = CallSiteId(self.next_site);
        self.next_site += 1;
        site
    }

    fn next_compound(&mut self) -> CompoundId {
        let id = CompoundId(self.next_compound);
        self.next_compound += 1;
        id
    }

    // ==========================================================================
    // Shared Helpers
    // ==========================================================================

    fn registry(&self) -> &'a SymbolRegistry {
        self.ctx.registry()
    }

    fn resolve_class_name(&self, name: &str, span: Span) -> Result<TypeHash> {
        match self.registry().resolve_type_name(name, self.ctx.namespace()) {
            ResolutionResult::Found(ty) if self.registry().is_class_type(&ty) => Ok(ty.base),
            _ => Err(CompilationError::UnknownType {
                name: name.to_string(),
                span,
            }),
        }
    }

    /// `*this` as an lvalue of the owning class.
    fn this_object(&self, span: Span) -> Result<BoundExpr> {
        let Some(this) = self.this_type else {
            return Err(CompilationError::IllegalThisOrBase {
                message: "'this' is only available in non-static member functions".to_string(),
                span,
            });
        };
        let object = this
            .pointee()
            .ok_or_else(|| CompilationError::internal("receiver is not a pointer"))?;
        let pointer = BoundExpr::rvalue(BoundExprKind::Parameter(0), this, span);
        Ok(BoundExpr::lvalue(BoundExprKind::Deref(Box::new(pointer)), object, span)
            .with_flags(ExprFlags::ARG_IS_THIS_OR_BASE))
    }

    /// Convert `expr` to `to`, or report a type mismatch.
    fn convert(
        &mut self,
        expr: BoundExpr,
        to: DataType,
        mode: ConversionMode,
        span: Span,
    ) -> Result<BoundExpr> {
        require_value(&expr)?;
        let Some(conversion) = find_conversion(&self.ctx, &ArgDesc::of(&expr), to, mode) else {
            return Err(CompilationError::TypeMismatch {
                message: format!(
                    "cannot convert '{}' to '{}'",
                    self.ctx.type_name(&expr.ty),
                    self.ctx.type_name(&to)
                ),
                span,
            });
        };
        self.apply_conversion(expr, &conversion, to)
    }

    /// Insert the nodes performing `conversion` on `expr`.
    fn apply_conversion(
        &mut self,
        expr: BoundExpr,
        conversion: &Conversion,
        to: DataType,
    ) -> Result<BoundExpr> {
        let span = expr.span;
        let target = to.without_reference();
        let wrap = |expr: BoundExpr, ty: DataType| {
            BoundExpr::rvalue(
                BoundExprKind::Conversion {
                    operand: Box::new(expr),
                    conversion: conversion.kind.clone(),
                },
                ty,
                span,
            )
        };

        Ok(match &conversion.kind {
            ConversionKind::Identity => expr,
            ConversionKind::Qualification => {
                if expr.ty.is_pointer() {
                    let mut expr = expr;
                    expr.ty = target;
                    expr
                } else {
                    expr
                }
            }
            ConversionKind::Basic { to: kind, .. }
            | ConversionKind::ConstantFit { to: kind }
            | ConversionKind::EnumToInteger { to: kind, .. } => {
                let ty = DataType::basic(*kind);
                match expr.constant().and_then(|c| c.convert_to(*kind)) {
                    Some(value) => BoundExpr::literal(value, ty, span),
                    None => wrap(expr, ty),
                }
            }
            ConversionKind::IntegerToEnum { enum_type } => {
                let ty = DataType::simple(*enum_type);
                let folded = self
                    .registry()
                    .get_enum(*enum_type)
                    .and_then(|e| expr.constant().and_then(|c| c.convert_to(e.underlying)));
                match folded {
                    Some(value) => BoundExpr::literal(value, ty, span),
                    None => wrap(expr, ty),
                }
            }
            ConversionKind::NullToPointer => {
                let mut expr = expr;
                expr.ty = target;
                expr
            }
            ConversionKind::PointerToBool => wrap(expr, DataType::bool()),
            ConversionKind::DerivedToBase { base, .. } => {
                let ty = adjusted(expr.ty, *base);
                self.adjust(expr, conversion, ty)
            }
            ConversionKind::BaseToDerived { derived } => {
                let ty = adjusted(expr.ty, *derived);
                self.adjust(expr, conversion, ty)
            }
            ConversionKind::PointerReinterpret => wrap(expr, target),
            ConversionKind::Constructor { constructor } => {
                let mode = mode_of(conversion);
                self.construct_from(expr, *constructor, mode, span)?
            }
            ConversionKind::ConversionFunction { function } => {
                let mode = mode_of(conversion);
                let result = self.call_conversion_function(expr, *function, span)?;
                let inner = find_standard_conversion(&self.ctx, &ArgDesc::of(&result), to, mode)
                    .ok_or_else(|| {
                        CompilationError::internal("conversion function result no longer converts")
                    })?;
                self.apply_conversion(result, &inner, to)?
            }
        })
    }

    /// Pointer or object adjustment along the class hierarchy; objects keep
    /// their category.
    fn adjust(&self, expr: BoundExpr, conversion: &Conversion, ty: DataType) -> BoundExpr {
        let category = if expr.ty.is_pointer() {
            ArgCategory::Rvalue
        } else {
            expr.category
        };
        let span = expr.span;
        BoundExpr::new(
            BoundExprKind::Conversion {
                operand: Box::new(expr),
                conversion: conversion.kind.clone(),
            },
            ty,
            category,
            span,
        )
    }

    /// Adjust the object of a member call to the receiver class.
    fn adjust_receiver(&self, object: BoundExpr, conversion: &Conversion) -> Result<BoundExpr> {
        match &conversion.kind {
            ConversionKind::Identity | ConversionKind::Qualification => Ok(object),
            ConversionKind::DerivedToBase { base, .. } => {
                let ty = adjusted(object.ty.without_reference(), *base);
                Ok(self.adjust(object, conversion, ty))
            }
            other => Err(CompilationError::internal(format!(
                "unexpected receiver conversion {other:?}"
            ))),
        }
    }

    /// Temporary object built by converting constructor `constructor`.
    fn construct_from(
        &mut self,
        expr: BoundExpr,
        constructor: TypeHash,
        mode: ConversionMode,
        span: Span,
    ) -> Result<BoundExpr> {
        let entry = self
            .ctx
            .function(constructor)
            .ok_or_else(|| CompilationError::internal("unknown converting constructor"))?;
        let function = FunctionRef::from_entry(entry);
        let class = entry
            .owner
            .ok_or_else(|| CompilationError::internal("constructor without owner"))?;
        let param = *function
            .params
            .get(1)
            .ok_or_else(|| CompilationError::internal("converting constructor without argument"))?;

        let inner = find_standard_conversion(&self.ctx, &ArgDesc::of(&expr), param, mode)
            .ok_or_else(|| CompilationError::internal("constructor argument no longer converts"))?;
        let mut args = vec![self.apply_conversion(expr, &inner, param)?];
        prepare_arguments(
            &self.ctx,
            &function.params[1..],
            &mut args,
            false,
            false,
            &mut self.locals,
        )?;

        let object = self.locals.add_temporary(DataType::simple(class));
        let site = self.next_call_site();
        Ok(BoundExpr::rvalue(
            BoundExprKind::Construct {
                class,
                constructor: Some(function),
                args,
                object,
                destructor: self.registry().destructor(class),
                site,
            },
            DataType::simple(class),
            span,
        ))
    }

    /// Call of conversion function `function` on `object`.
    fn call_conversion_function(
        &mut self,
        object: BoundExpr,
        function: TypeHash,
        span: Span,
    ) -> Result<BoundExpr> {
        let entry = self
            .ctx
            .function(function)
            .ok_or_else(|| CompilationError::internal("unknown conversion function"))?;
        let this = entry
            .receiver_type()
            .ok_or_else(|| CompilationError::internal("conversion function without receiver"))?;
        let receiver = find_conversion(
            &self.ctx,
            &ArgDesc::rvalue(object.ty.without_reference().pointer_to()),
            this,
            ConversionMode::Implicit,
        )
        .ok_or_else(|| CompilationError::internal("conversion function receiver mismatch"))?;

        let m = OverloadMatch {
            function: FunctionRef::from_entry(entry),
            is_member: true,
            receiver: Some(receiver),
            conversions: Vec::new(),
        };
        self.finish_call(m, Some(object), Vec::new(), false, span)
    }

    /// Build the node for a resolved call: convert the object and arguments,
    /// apply the argument-passing rules, and emit an operator node for raw
    /// operators or a call otherwise.
    fn finish_call(
        &mut self,
        m: OverloadMatch,
        object: Option<BoundExpr>,
        args: Vec<BoundExpr>,
        non_virtual: bool,
        span: Span,
    ) -> Result<BoundExpr> {
        let mut all = Vec::with_capacity(args.len() + 1);
        match (&m.receiver, object) {
            (Some(receiver), Some(object)) if m.is_member => {
                all.push(self.adjust_receiver(object, receiver)?);
            }
            (Some(receiver), Some(object)) => {
                let param = m.function.params[0];
                all.push(self.apply_conversion(object, receiver, param)?);
            }
            (None, _) => {}
            (Some(_), None) => {
                return Err(CompilationError::internal("receiver conversion without object"));
            }
        }
        for ((arg, conversion), param) in args.into_iter().zip(&m.conversions).zip(m.arg_params())
        {
            all.push(self.apply_conversion(arg, conversion, *param)?);
        }

        let function = m.function;
        let is_raw = function.is_intrinsic();
        prepare_arguments(
            &self.ctx,
            &function.params,
            &mut all,
            m.is_member,
            is_raw,
            &mut self.locals,
        )?;

        let ret = function.return_type;
        let kind = if is_raw {
            let mut operands = all.into_iter();
            match (operands.next(), operands.next(), operands.next()) {
                (Some(operand), None, None) => BoundExprKind::Unary {
                    function,
                    operand: Box::new(operand),
                },
                (Some(left), Some(right), None) => BoundExprKind::Binary {
                    function,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                _ => {
                    return Err(CompilationError::internal(format!(
                        "raw operator '{}' with unexpected arity",
                        function.name
                    )));
                }
            }
        } else {
            let dispatch = if m.is_member && function.is_virtual() && !non_virtual {
                Dispatch::Virtual
            } else {
                Dispatch::Direct
            };
            BoundExprKind::Call {
                function,
                args: all,
                site: self.next_call_site(),
                dispatch,
            }
        };
        Ok(result_of(kind, ret, span))
    }
}

// ============================================================================
// Free Helpers
// ============================================================================

/// The entry a declaration defines, before consulting the registry.
fn declared_entry(
    decl: &FunctionDecl<'_>,
    owner: Option<TypeHash>,
    params: Vec<Param>,
    return_type: DataType,
) -> FunctionEntry {
    match (decl.kind, owner) {
        (FunctionKind::Constructor, Some(owner)) => FunctionEntry::constructor(owner, params),
        (FunctionKind::Destructor, Some(owner)) => FunctionEntry::destructor(owner),
        (_, Some(owner)) => FunctionEntry::method(owner, decl.name.name, params, return_type),
        (_, None) => {
            let path: Vec<&str> = decl.namespace.iter().map(|i| i.name).collect();
            FunctionEntry::free(decl.name.name, params, return_type).in_namespace(&path)
        }
    }
}

/// Node typed by a function result: reference results are lvalues.
fn result_of(kind: BoundExprKind, ret: DataType, span: Span) -> BoundExpr {
    if ret.is_any_reference() {
        BoundExpr::lvalue(kind, ret, span)
    } else {
        BoundExpr::rvalue(kind, ret, span)
    }
}

/// `ty` with its class replaced by `class`, keeping const and pointers.
fn adjusted(ty: DataType, class: TypeHash) -> DataType {
    let mut out = DataType::simple(class);
    out.is_const = ty.is_const;
    out.pointers = ty.pointers;
    out
}

fn mode_of(conversion: &Conversion) -> ConversionMode {
    if conversion.is_implicit {
        ConversionMode::Implicit
    } else {
        ConversionMode::Explicit
    }
}

fn require_value(expr: &BoundExpr) -> Result<()> {
    if expr.is_value() {
        return Ok(());
    }
    let what = match &expr.kind {
        BoundExprKind::TypeExpr(_) => "a type",
        BoundExprKind::Namespace(_) => "a namespace",
        _ => "a function group",
    };
    Err(CompilationError::WrongOperandCategory {
        message: format!("expected a value, found {what}"),
        span: expr.span,
    })
}

