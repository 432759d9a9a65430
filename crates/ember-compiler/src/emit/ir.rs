//! The instruction set handed to the backend.
//!
//! Instructions are three-address style over [`IrObject`] handles. Branch
//! targets are instruction indices of the same function; landing pads are
//! ordinary instruction ranges placed after the normal body.

use std::fmt;

use ember_core::{ConstantValue, DataType, IntrinsicOp, TypeHash};

use crate::bound::LocalId;

/// A compiler temporary of one emitted function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TempId(pub u32);

/// A value handle. The backend treats these as opaque identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrObject {
    Parameter(u32),
    Local(LocalId),
    Temp(TempId),
    Constant(ConstantValue),
    /// The pending-exception slot of the running function.
    ExceptionCode,
    Null,
}

impl IrObject {
    pub fn is_constant(&self) -> bool {
        matches!(self, IrObject::Constant(_) | IrObject::Null)
    }
}

impl fmt::Display for IrObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrObject::Parameter(i) => write!(f, "p{i}"),
            IrObject::Local(id) => write!(f, "{id}"),
            IrObject::Temp(id) => write!(f, "t{}", id.0),
            IrObject::Constant(c) => write!(f, "{c}"),
            IrObject::ExceptionCode => write!(f, "@exception"),
            IrObject::Null => write!(f, "null"),
        }
    }
}

/// Branch target: an instruction index, or pending until backpatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target(u32);

impl Target {
    pub const PENDING: Target = Target(u32::MAX);

    pub fn at(index: usize) -> Self {
        Target(index as u32)
    }

    pub fn is_pending(self) -> bool {
        self == Self::PENDING
    }

    /// The instruction index, if resolved.
    pub fn index(self) -> Option<usize> {
        (!self.is_pending()).then_some(self.0 as usize)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    Copy {
        dest: IrObject,
        src: IrObject,
    },
    /// Zero-initialize `dest` (basic values and trivially constructed objects).
    Clear {
        dest: IrObject,
    },
    Load {
        dest: IrObject,
        address: IrObject,
    },
    Store {
        address: IrObject,
        value: IrObject,
    },
    AddressOf {
        dest: IrObject,
        object: IrObject,
    },
    /// Address of field `index` of `class` in the object at `object`.
    MemberAddress {
        dest: IrObject,
        object: IrObject,
        class: TypeHash,
        index: u32,
    },
    Unary {
        dest: IrObject,
        op: IntrinsicOp,
        operand: IrObject,
    },
    Binary {
        dest: IrObject,
        op: IntrinsicOp,
        left: IrObject,
        right: IrObject,
    },
    /// Value conversion between basic, enum and bool types.
    Convert {
        dest: IrObject,
        operand: IrObject,
        to: DataType,
    },
    /// Pointer adjustment between a class and one of its bases.
    AdjustPointer {
        dest: IrObject,
        operand: IrObject,
        from: TypeHash,
        to: TypeHash,
    },
    Reinterpret {
        dest: IrObject,
        operand: IrObject,
        to: DataType,
    },
    InstanceOf {
        dest: IrObject,
        operand: IrObject,
        class: TypeHash,
    },
    DynamicCast {
        dest: IrObject,
        operand: IrObject,
        class: TypeHash,
    },
    Call {
        dest: Option<IrObject>,
        function: TypeHash,
        args: Vec<IrObject>,
    },
    /// Dispatch through the receiver's dynamic class; `args[0]` is the
    /// receiver.
    VirtualCall {
        dest: Option<IrObject>,
        function: TypeHash,
        args: Vec<IrObject>,
    },
    DelegateCall {
        dest: Option<IrObject>,
        delegate: IrObject,
        args: Vec<IrObject>,
    },
    /// Raw storage for one object of `class`.
    Allocate {
        dest: IrObject,
        class: TypeHash,
    },
    Destroy {
        object: IrObject,
        destructor: TypeHash,
    },
    Jump {
        target: Target,
    },
    JumpIf {
        condition: IrObject,
        when: bool,
        target: Target,
    },
    /// Switch dispatch: jump when `value == constant`.
    CaseBranch {
        value: IrObject,
        constant: ConstantValue,
        target: Target,
    },
    /// Jump when the exception code differs from the no-error sentinel.
    TestException {
        target: Target,
    },
    /// Set the exception code to `value`.
    Throw {
        value: IrObject,
    },
    /// Jump when the pending exception is an instance of `class`.
    CatchTest {
        class: TypeHash,
        target: Target,
    },
    /// Take the pending exception into `dest` and clear the code.
    TakeException {
        dest: Option<IrObject>,
    },
    /// Entry functions: report an uncaught exception before returning.
    CheckException,
    /// Copy the exception code to the out-of-band result slot and return
    /// the default result.
    Propagate,
    Return {
        value: Option<IrObject>,
    },
}

impl Instr {
    /// The branch target of a jumping instruction.
    pub fn target(&self) -> Option<Target> {
        match self {
            Instr::Jump { target }
            | Instr::JumpIf { target, .. }
            | Instr::CaseBranch { target, .. }
            | Instr::TestException { target }
            | Instr::CatchTest { target, .. } => Some(*target),
            _ => None,
        }
    }

    pub(crate) fn target_mut(&mut self) -> Option<&mut Target> {
        match self {
            Instr::Jump { target }
            | Instr::JumpIf { target, .. }
            | Instr::CaseBranch { target, .. }
            | Instr::TestException { target }
            | Instr::CatchTest { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Control never falls through to the next instruction.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instr::Jump { .. } | Instr::Return { .. } | Instr::Propagate
        )
    }
}
