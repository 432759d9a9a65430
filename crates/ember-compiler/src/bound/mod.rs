//! The bound tree: typed, symbol-resolved functions ready for emission.
//!
//! Every node owns its children. Identities that the emitter and the
//! reaching-class analysis need to agree on ([`LocalId`], [`CompoundId`],
//! [`CallSiteId`]) are small indices assigned by the binder in binding order.

mod expr;
mod function;
mod stmt;

pub use expr::{ArgCategory, BoundExpr, BoundExprKind, Dispatch, ExprFlags, FunctionGroup, FunctionRef};
pub use function::{BoundFunction, BoundParam, LocalSlot, LocalTable};
pub use stmt::{
    AssignOperator, BoundAssign, BoundCase, BoundCaseLabel, BoundCatch, BoundCompound, BoundFor,
    BoundLocalInit, BoundStmt, BoundSwitch, BoundTryCatch, LocalInit,
};

use std::fmt;

/// A local variable or compiler-generated temporary of one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u32);

/// A compound statement (lexical block) of one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompoundId(pub u32);

/// A call site of one function, numbered in binding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallSiteId(pub u32);

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "l{}", self.0)
    }
}

impl fmt::Display for CompoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl fmt::Display for CallSiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "site{}", self.0)
    }
}
