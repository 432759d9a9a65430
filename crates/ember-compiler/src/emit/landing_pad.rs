//! Landing pads: the exception path of fallible calls and `throw`.
//!
//! A fallible call is followed by a `TestException` branch to its pad. The
//! pad destroys the objects alive at the call, then either continues to the
//! catch dispatch of the enclosing try region or propagates the exception
//! out of the function.
//!
//! ## Layout
//!
//! ```text
//! body:     ...
//!           call f
//!           test_exception -> pad0
//!           ...
//! pad0:     destroy b        ; snapshot, innermost first
//!           destroy a
//!           jump catch_dispatch | propagate
//! ```
//!
//! Pads are collected while the body is emitted and placed after it.

use ember_core::CompilationError;
use rustc_hash::FxHashMap;

use super::buffer::{Fixup, InstrBuffer};
use super::destruction::{FunctionDestructionStack, PendingDestroy};
use super::ir::Instr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LandingPadId(pub u32);

/// A try region's catch dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CatchId(pub u32);

/// Where a pad goes after its destructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadExit {
    JumpToCatch(CatchId),
    Propagate,
}

/// A pad waiting to be placed.
#[derive(Debug, Clone)]
pub struct LandingPad {
    pub id: LandingPadId,
    pub snapshot: Vec<PendingDestroy>,
    pub exit: PadExit,
    fixups: Vec<Fixup>,
}

/// A placed pad: the instruction range `start..end`.
#[derive(Debug, Clone, PartialEq)]
pub struct LandingPadBlock {
    pub id: LandingPadId,
    pub start: usize,
    pub end: usize,
    pub exit: PadExit,
    pub destroyed: Vec<PendingDestroy>,
}

#[derive(Debug, Clone, Copy)]
struct ActiveCatch {
    id: CatchId,
    /// Frame depth when the try body was entered
    depth: usize,
}

#[derive(Debug, Default)]
pub struct LandingPadBuilder {
    pads: Vec<LandingPad>,
    catches: Vec<ActiveCatch>,
    next_catch: u32,
}

impl LandingPadBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a try body whose frames start above `depth`.
    pub fn push_catch(&mut self, depth: usize) -> CatchId {
        let id = CatchId(self.next_catch);
        self.next_catch += 1;
        self.catches.push(ActiveCatch { id, depth });
        id
    }

    pub fn pop_catch(&mut self) -> Result<CatchId, CompilationError> {
        self.catches
            .pop()
            .map(|c| c.id)
            .ok_or_else(|| CompilationError::internal("catch stack underflow"))
    }

    pub fn active_catch(&self) -> Option<CatchId> {
        self.catches.last().map(|c| c.id)
    }

    /// Create a pad for the branch `fixup`, snapshotting the objects alive
    /// now.
    ///
    /// Inside a try body only the frames opened in the try region are
    /// unwound; the catch dispatch runs in the enclosing frames.
    pub fn create(&mut self, frames: &FunctionDestructionStack, fixup: Fixup) -> LandingPadId {
        let id = LandingPadId(self.pads.len() as u32);
        let (snapshot, exit) = match self.catches.last() {
            Some(active) => (
                frames.unwind_above(active.depth),
                PadExit::JumpToCatch(active.id),
            ),
            None => (frames.unwind_above(0), PadExit::Propagate),
        };
        tracing::trace!(pad = id.0, objects = snapshot.len(), ?exit, "landing pad");
        self.pads.push(LandingPad {
            id,
            snapshot,
            exit,
            fixups: vec![fixup],
        });
        id
    }

    pub fn len(&self) -> usize {
        self.pads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pads.is_empty()
    }

    pub fn pads(&self) -> &[LandingPad] {
        &self.pads
    }

    /// Place every pad at the end of `buffer`, patching the branches that
    /// reach it. `catch_positions` gives the dispatch position of every
    /// try region.
    pub fn emit_all(
        self,
        buffer: &mut InstrBuffer,
        catch_positions: &FxHashMap<CatchId, usize>,
    ) -> Result<Vec<LandingPadBlock>, CompilationError> {
        if !self.catches.is_empty() {
            return Err(CompilationError::internal(format!(
                "{} try region(s) still open",
                self.catches.len()
            )));
        }

        let mut blocks = Vec::with_capacity(self.pads.len());
        for pad in self.pads {
            let start = buffer.position();
            buffer.backpatch(pad.fixups, start)?;
            for destroy in &pad.snapshot {
                buffer.emit(Instr::Destroy {
                    object: destroy.object.clone(),
                    destructor: destroy.destructor,
                });
            }
            match pad.exit {
                PadExit::JumpToCatch(catch) => {
                    let position = catch_positions.get(&catch).copied().ok_or_else(|| {
                        CompilationError::internal(format!("catch {} was never placed", catch.0))
                    })?;
                    buffer.emit_jump_to(position);
                }
                PadExit::Propagate => buffer.emit(Instr::Propagate),
            }
            blocks.push(LandingPadBlock {
                id: pad.id,
                start,
                end: buffer.position(),
                exit: pad.exit,
                destroyed: pad.snapshot,
            });
        }
        Ok(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bound::{CompoundId, LocalId};
    use crate::emit::ir::{IrObject, Target};
    use ember_core::TypeHash;

    const DTOR: TypeHash = TypeHash(77);

    fn local(i: u32) -> IrObject {
        IrObject::Local(LocalId(i))
    }

    #[test]
    fn pad_outside_try_propagates_everything() {
        let mut frames = FunctionDestructionStack::new();
        frames.enter(Some(CompoundId(0)));
        frames.push(local(0), DTOR).unwrap();
        frames.enter(Some(CompoundId(1)));
        frames.push(local(1), DTOR).unwrap();

        let mut buffer = InstrBuffer::new();
        let fixup = buffer.emit_forward(Instr::TestException {
            target: Target::PENDING,
        });
        let mut pads = LandingPadBuilder::new();
        pads.create(&frames, fixup);
        buffer.emit(Instr::Return { value: None });

        let blocks = pads.emit_all(&mut buffer, &FxHashMap::default()).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].exit, PadExit::Propagate);
        let objects: Vec<_> = blocks[0].destroyed.iter().map(|d| d.object.clone()).collect();
        assert_eq!(objects, vec![local(1), local(0)]);

        let instrs = buffer.finish().unwrap();
        assert_eq!(instrs[0].target(), Some(Target::at(2)));
        assert_eq!(instrs.last(), Some(&Instr::Propagate));
    }

    #[test]
    fn pad_inside_try_unwinds_only_the_try_region() {
        let mut frames = FunctionDestructionStack::new();
        frames.enter(Some(CompoundId(0)));
        frames.push(local(0), DTOR).unwrap();

        let mut pads = LandingPadBuilder::new();
        let catch = pads.push_catch(frames.depth());
        frames.enter(Some(CompoundId(1)));
        frames.push(local(1), DTOR).unwrap();

        let mut buffer = InstrBuffer::new();
        let fixup = buffer.emit_jump_forward();
        pads.create(&frames, fixup);
        pads.pop_catch().unwrap();

        let mut positions = FxHashMap::default();
        positions.insert(catch, 0);
        let blocks = pads.emit_all(&mut buffer, &positions).unwrap();
        assert_eq!(blocks[0].exit, PadExit::JumpToCatch(catch));
        assert_eq!(blocks[0].destroyed.len(), 1);
        assert_eq!(blocks[0].destroyed[0].object, local(1));
    }

    #[test]
    fn unplaced_catch_is_internal_error() {
        let frames = FunctionDestructionStack::new();
        let mut pads = LandingPadBuilder::new();
        pads.push_catch(0);
        let mut buffer = InstrBuffer::new();
        let fixup = buffer.emit_jump_forward();
        pads.create(&frames, fixup);
        pads.pop_catch().unwrap();
        assert!(pads.emit_all(&mut buffer, &FxHashMap::default()).is_err());
    }
}
