//! Raw target-level operations backing the basic-type operator functions.
//!
//! Operator functions registered for basic and pointer types carry an
//! [`IntrinsicOp`]; the emitter lowers calls to them into a single
//! `Intrinsic` instruction that cannot throw.

use std::fmt;

/// A raw operation on basic or pointer values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntrinsicOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    Less,
    Equal,
    Neg,
    Plus,
    Not,
    Complement,
    /// In-place `++` through a reference.
    Increment,
    /// In-place `--` through a reference.
    Decrement,
    /// Copy-construct a basic value into uninitialized storage.
    CopyConstruct,
    /// Assign a basic value through a reference.
    Assign,
    /// Pointer plus integer offset.
    PtrOffset,
    /// Pointer minus integer offset.
    PtrNegOffset,
    /// Difference of two pointers.
    PtrDiff,
    /// Element address of a fixed-size array.
    ArrayElement,
}

impl IntrinsicOp {
    /// Operator group name the operation is registered under.
    pub fn group_name(self) -> &'static str {
        match self {
            IntrinsicOp::Add | IntrinsicOp::Plus | IntrinsicOp::PtrOffset => "operator+",
            IntrinsicOp::Sub
            | IntrinsicOp::Neg
            | IntrinsicOp::PtrNegOffset
            | IntrinsicOp::PtrDiff => "operator-",
            IntrinsicOp::Mul => "operator*",
            IntrinsicOp::Div => "operator/",
            IntrinsicOp::Rem => "operator%",
            IntrinsicOp::Shl => "operator<<",
            IntrinsicOp::Shr => "operator>>",
            IntrinsicOp::BitAnd => "operator&",
            IntrinsicOp::BitOr => "operator|",
            IntrinsicOp::BitXor => "operator^",
            IntrinsicOp::Less => "operator<",
            IntrinsicOp::Equal => "operator==",
            IntrinsicOp::Not => "operator!",
            IntrinsicOp::Complement => "operator~",
            IntrinsicOp::Increment => "operator++",
            IntrinsicOp::Decrement => "operator--",
            IntrinsicOp::CopyConstruct => "@constructor",
            IntrinsicOp::Assign => "operator=",
            IntrinsicOp::ArrayElement => "operator[]",
        }
    }

    /// Whether the operation yields `bool`.
    pub fn is_comparison(self) -> bool {
        matches!(self, IntrinsicOp::Less | IntrinsicOp::Equal)
    }
}

impl fmt::Display for IntrinsicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
