//! Bound expressions.

use bitflags::bitflags;
use ember_core::{
    ConstantValue, DataType, FunctionEntry, FunctionTraits, IntrinsicOp, Span, TypeHash,
};

use super::{CallSiteId, LocalId};
use crate::conversion::ConversionKind;

bitflags! {
    /// Passing-mode and lowering traits of a bound expression.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ExprFlags: u16 {
        /// Pass the address of the argument instead of its value.
        const ARG_BY_REF = 1 << 0;
        /// The expression denotes a storage location.
        const LVALUE = 1 << 1;
        /// The argument is a compiler-generated temporary.
        const ARG_IS_TEMPORARY = 1 << 2;
        /// The argument is a class object passed to a class parameter.
        const CLASS_OBJECT_ARG = 1 << 3;
        /// Load through the reference before passing by value.
        const REF_BY_VALUE = 1 << 4;
        /// Lower `&&`/`||` to branches instead of a materialized bool.
        const GEN_JUMPING_BOOL_CODE = 1 << 5;
        /// The expression yields an address.
        const ADDR_ARG = 1 << 6;
        /// The name was written with an explicit scope (`ns::name`).
        const SCOPE_QUALIFIED = 1 << 7;
        /// The expression is `this` or `base`.
        const ARG_IS_THIS_OR_BASE = 1 << 8;
    }
}

/// Lvalue / rvalue classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgCategory {
    Lvalue,
    Rvalue,
}

/// How a member function call is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dispatch {
    Direct,
    Virtual,
}

/// The resolved target of a call or operator.
///
/// Synthesized pointer operators have no registry entry, so the bound tree
/// keeps what emission needs instead of only a hash.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionRef {
    pub hash: TypeHash,
    pub name: String,
    pub intrinsic: Option<IntrinsicOp>,
    pub traits: FunctionTraits,
    /// Receiver pointer type for member functions.
    pub receiver: Option<DataType>,
    /// Formal parameter types, receiver included.
    pub params: Vec<DataType>,
    pub return_type: DataType,
}

impl FunctionRef {
    pub fn from_entry(entry: &FunctionEntry) -> Self {
        Self {
            hash: entry.hash,
            name: entry.qualified_name(),
            intrinsic: entry.intrinsic,
            traits: entry.traits,
            receiver: entry.receiver_type(),
            params: entry.params.iter().map(|p| p.data_type).collect(),
            return_type: entry.return_type,
        }
    }

    #[inline]
    pub fn is_intrinsic(&self) -> bool {
        self.intrinsic.is_some()
    }

    pub fn is_virtual(&self) -> bool {
        self.traits.intersects(
            FunctionTraits::VIRTUAL | FunctionTraits::ABSTRACT | FunctionTraits::OVERRIDE,
        )
    }

    /// Whether a call may leave an exception pending.
    pub fn can_throw(&self) -> bool {
        self.intrinsic.is_none() && !self.traits.contains(FunctionTraits::NOTHROW)
    }
}

/// A set of same-named functions not yet narrowed by a call.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionGroup {
    pub name: String,
    pub functions: Vec<TypeHash>,
    /// Object the group was reached through, for member functions.
    pub receiver: Option<Box<BoundExpr>>,
    /// The receiver is the implicit `this` rather than a written operand.
    pub implicit_receiver: bool,
    /// `base.f()` and `Base::f()` call the named function directly.
    pub non_virtual: bool,
}

/// A bound expression: kind, static type, value category and flags.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundExpr {
    pub kind: BoundExprKind,
    pub ty: DataType,
    pub category: ArgCategory,
    pub flags: ExprFlags,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundExprKind {
    Literal(ConstantValue),
    Local(LocalId),
    /// Formal parameter by index; index 0 of a member function is `this`.
    Parameter(u32),
    /// Field `index` of `class`, read through `object`.
    Member {
        object: Box<BoundExpr>,
        class: TypeHash,
        index: u32,
    },
    /// Prefix operator resolved to a raw operator.
    Unary {
        function: FunctionRef,
        operand: Box<BoundExpr>,
    },
    /// Binary operator resolved to a raw operator.
    Binary {
        function: FunctionRef,
        left: Box<BoundExpr>,
        right: Box<BoundExpr>,
    },
    /// Call of a free or member function. `args[0]` is the receiver of
    /// member functions.
    Call {
        function: FunctionRef,
        args: Vec<BoundExpr>,
        site: CallSiteId,
        dispatch: Dispatch,
    },
    DelegateCall {
        delegate: Box<BoundExpr>,
        args: Vec<BoundExpr>,
        site: CallSiteId,
        nothrow: bool,
    },
    /// `left && right`, with its materialized result slot.
    Conjunction {
        left: Box<BoundExpr>,
        right: Box<BoundExpr>,
        result: LocalId,
    },
    /// `left || right`, with its materialized result slot.
    Disjunction {
        left: Box<BoundExpr>,
        right: Box<BoundExpr>,
        result: LocalId,
    },
    /// Written `cast<T>(e)` or functional cast.
    Cast {
        operand: Box<BoundExpr>,
        conversion: ConversionKind,
    },
    /// Conversion inserted by the binder.
    Conversion {
        operand: Box<BoundExpr>,
        conversion: ConversionKind,
    },
    SizeOf {
        size: u64,
        of: DataType,
    },
    /// `T(args)`: a class object constructed into `object`. The receiver is
    /// implicit, so `args` start at the first declared parameter.
    Construct {
        class: TypeHash,
        constructor: Option<FunctionRef>,
        args: Vec<BoundExpr>,
        object: LocalId,
        destructor: Option<TypeHash>,
        site: CallSiteId,
    },
    Is {
        operand: Box<BoundExpr>,
        class: TypeHash,
    },
    As {
        operand: Box<BoundExpr>,
        class: TypeHash,
    },
    /// A name that denotes a type.
    TypeExpr(DataType),
    /// A name that denotes a namespace.
    Namespace(Vec<String>),
    FunctionGroup(FunctionGroup),
    /// `x++` / `x--`; the previous value is kept in `old_value`.
    PostfixIncDec {
        operand: Box<BoundExpr>,
        function: FunctionRef,
        increment: bool,
        old_value: LocalId,
    },
    /// The pending-exception pseudo-variable.
    ExceptionCode,
    AddressOf(Box<BoundExpr>),
    Deref(Box<BoundExpr>),
    /// Compiler-generated temporary copy-constructed from `init`.
    Temporary {
        local: LocalId,
        init: Box<BoundExpr>,
    },
    /// `new T(args)`: allocation, pointer cast and in-place construction.
    New {
        class: TypeHash,
        constructor: Option<FunctionRef>,
        args: Vec<BoundExpr>,
        site: CallSiteId,
    },
}

impl BoundExpr {
    pub fn new(kind: BoundExprKind, ty: DataType, category: ArgCategory, span: Span) -> Self {
        let flags = match category {
            ArgCategory::Lvalue => ExprFlags::LVALUE,
            ArgCategory::Rvalue => ExprFlags::empty(),
        };
        Self {
            kind,
            ty,
            category,
            flags,
            span,
        }
    }

    pub fn rvalue(kind: BoundExprKind, ty: DataType, span: Span) -> Self {
        Self::new(kind, ty, ArgCategory::Rvalue, span)
    }

    pub fn lvalue(kind: BoundExprKind, ty: DataType, span: Span) -> Self {
        Self::new(kind, ty, ArgCategory::Lvalue, span)
    }

    pub fn literal(value: ConstantValue, ty: DataType, span: Span) -> Self {
        Self::rvalue(BoundExprKind::Literal(value), ty, span)
    }

    pub fn with_flags(mut self, flags: ExprFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Denotes a storage location: an lvalue or a reference.
    pub fn is_lvalue(&self) -> bool {
        self.category == ArgCategory::Lvalue || self.ty.is_reference()
    }

    /// Compile-time value of a literal.
    pub fn constant(&self) -> Option<&ConstantValue> {
        match &self.kind {
            BoundExprKind::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// Types, namespaces and unresolved function groups are not values.
    pub fn is_value(&self) -> bool {
        !matches!(
            self.kind,
            BoundExprKind::TypeExpr(_)
                | BoundExprKind::Namespace(_)
                | BoundExprKind::FunctionGroup(_)
        )
    }

    /// Whether the expression is the null literal.
    pub fn is_null(&self) -> bool {
        matches!(self.kind, BoundExprKind::Literal(ConstantValue::Null))
    }

    /// Direct children in evaluation order.
    pub fn children(&self) -> Vec<&BoundExpr> {
        use BoundExprKind::*;
        match &self.kind {
            Literal(_) | Local(_) | Parameter(_) | SizeOf { .. } | TypeExpr(_) | Namespace(_)
            | ExceptionCode => Vec::new(),
            Member { object, .. } => vec![&**object],
            Unary { operand, .. }
            | Cast { operand, .. }
            | Conversion { operand, .. }
            | Is { operand, .. }
            | As { operand, .. }
            | PostfixIncDec { operand, .. }
            | AddressOf(operand)
            | Deref(operand) => vec![&**operand],
            Temporary { init, .. } => vec![&**init],
            Binary { left, right, .. }
            | Conjunction { left, right, .. }
            | Disjunction { left, right, .. } => vec![&**left, &**right],
            Call { args, .. } | Construct { args, .. } | New { args, .. } => args.iter().collect(),
            DelegateCall { delegate, args, .. } => {
                std::iter::once(&**delegate).chain(args.iter()).collect()
            }
            FunctionGroup(group) => group.receiver.iter().map(|r| &**r).collect(),
        }
    }

    /// Direct children, mutably.
    pub fn children_mut(&mut self) -> Vec<&mut BoundExpr> {
        use BoundExprKind::*;
        match &mut self.kind {
            Literal(_) | Local(_) | Parameter(_) | SizeOf { .. } | TypeExpr(_) | Namespace(_)
            | ExceptionCode => Vec::new(),
            Member { object, .. } => vec![&mut **object],
            Unary { operand, .. }
            | Cast { operand, .. }
            | Conversion { operand, .. }
            | Is { operand, .. }
            | As { operand, .. }
            | PostfixIncDec { operand, .. }
            | AddressOf(operand)
            | Deref(operand) => vec![&mut **operand],
            Temporary { init, .. } => vec![&mut **init],
            Binary { left, right, .. }
            | Conjunction { left, right, .. }
            | Disjunction { left, right, .. } => vec![&mut **left, &mut **right],
            Call { args, .. } | Construct { args, .. } | New { args, .. } => {
                args.iter_mut().collect()
            }
            DelegateCall { delegate, args, .. } => std::iter::once(&mut **delegate)
                .chain(args.iter_mut())
                .collect(),
            FunctionGroup(group) => group.receiver.iter_mut().map(|r| &mut **r).collect(),
        }
    }

    /// Visit this node and every descendant, parents first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a BoundExpr)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// A copy with every span cleared, for shape comparisons.
    pub fn without_spans(&self) -> BoundExpr {
        let mut copy = self.clone();
        copy.clear_spans();
        copy
    }

    fn clear_spans(&mut self) {
        self.span = Span::default();
        for child in self.children_mut() {
            child.clear_spans();
        }
    }
}
