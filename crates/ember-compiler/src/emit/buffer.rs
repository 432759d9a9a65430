//! Instruction buffer with forward-jump backpatching.
//!
//! Forward jumps are emitted with a pending target and a [`Fixup`] naming
//! the instruction. Once the destination is known the fixups are patched in
//! place. Every fixup must be patched exactly once before the buffer is
//! finished.

use ember_core::CompilationError;
use rustc_hash::FxHashSet;

use super::ir::{Instr, Target};

/// A branch instruction whose target is not yet known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fixup(usize);

impl Fixup {
    /// Index of the branch instruction.
    pub fn position(self) -> usize {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct InstrBuffer {
    instrs: Vec<Instr>,
    /// Fixups emitted and not yet patched
    outstanding: FxHashSet<usize>,
}

impl InstrBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next instruction will get.
    #[inline]
    pub fn position(&self) -> usize {
        self.instrs.len()
    }

    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Instr> {
        self.instrs.get(index)
    }

    pub fn last(&self) -> Option<&Instr> {
        self.instrs.last()
    }

    pub fn emit(&mut self, instr: Instr) {
        self.instrs.push(instr);
    }

    /// Emit a branch whose target is patched later.
    ///
    /// The instruction's target is overwritten with [`Target::PENDING`].
    pub fn emit_forward(&mut self, mut instr: Instr) -> Fixup {
        if let Some(target) = instr.target_mut() {
            *target = Target::PENDING;
        }
        let position = self.instrs.len();
        self.instrs.push(instr);
        self.outstanding.insert(position);
        Fixup(position)
    }

    /// Unconditional jump to an already emitted position.
    pub fn emit_jump_to(&mut self, position: usize) {
        self.emit(Instr::Jump {
            target: Target::at(position),
        });
    }

    /// Unconditional forward jump.
    pub fn emit_jump_forward(&mut self) -> Fixup {
        self.emit_forward(Instr::Jump {
            target: Target::PENDING,
        })
    }

    /// Point every fixup in `fixups` at `target`.
    pub fn backpatch(
        &mut self,
        fixups: impl IntoIterator<Item = Fixup>,
        target: usize,
    ) -> Result<(), CompilationError> {
        for Fixup(position) in fixups {
            if !self.outstanding.remove(&position) {
                return Err(CompilationError::internal(format!(
                    "jump at {position} patched twice or never emitted as forward"
                )));
            }
            let slot = self
                .instrs
                .get_mut(position)
                .and_then(Instr::target_mut)
                .ok_or_else(|| {
                    CompilationError::internal(format!("fixup at {position} is not a branch"))
                })?;
            *slot = Target::at(target);
        }
        Ok(())
    }

    /// Patch `fixups` to the next instruction.
    pub fn backpatch_here(
        &mut self,
        fixups: impl IntoIterator<Item = Fixup>,
    ) -> Result<(), CompilationError> {
        let here = self.position();
        self.backpatch(fixups, here)
    }

    /// Number of branches still waiting for a target.
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    /// The finished instruction list.
    pub fn finish(self) -> Result<Vec<Instr>, CompilationError> {
        if let Some(position) = self.outstanding.iter().min() {
            return Err(CompilationError::internal(format!(
                "{} unresolved jump(s), first at {position}",
                self.outstanding.len()
            )));
        }
        Ok(self.instrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::ir::IrObject;

    #[test]
    fn forward_jump_is_pending_until_patched() {
        let mut buffer = InstrBuffer::new();
        let fixup = buffer.emit_jump_forward();
        assert_eq!(buffer.get(0).and_then(Instr::target), Some(Target::PENDING));
        assert_eq!(buffer.outstanding(), 1);

        buffer.emit(Instr::Return { value: None });
        buffer.backpatch([fixup], 1).unwrap();
        assert_eq!(buffer.get(0).and_then(Instr::target), Some(Target::at(1)));
        assert_eq!(buffer.outstanding(), 0);
    }

    #[test]
    fn backpatch_many_to_one_target() {
        let mut buffer = InstrBuffer::new();
        let a = buffer.emit_forward(Instr::JumpIf {
            condition: IrObject::Parameter(0),
            when: true,
            target: Target::PENDING,
        });
        let b = buffer.emit_jump_forward();
        buffer.backpatch_here([a, b]).unwrap();
        buffer.emit(Instr::Return { value: None });

        let instrs = buffer.finish().unwrap();
        assert_eq!(instrs[0].target(), Some(Target::at(2)));
        assert_eq!(instrs[1].target(), Some(Target::at(2)));
    }

    #[test]
    fn double_patch_is_internal_error() {
        let mut buffer = InstrBuffer::new();
        let fixup = buffer.emit_jump_forward();
        buffer.backpatch([fixup], 0).unwrap();
        let err = buffer.backpatch([fixup], 0).unwrap_err();
        assert!(matches!(err, CompilationError::Internal { .. }));
    }

    #[test]
    fn finish_rejects_unresolved_jumps() {
        let mut buffer = InstrBuffer::new();
        buffer.emit_jump_forward();
        let err = buffer.finish().unwrap_err();
        assert!(matches!(err, CompilationError::Internal { .. }));
    }

    #[test]
    fn backward_jump_needs_no_fixup() {
        let mut buffer = InstrBuffer::new();
        buffer.emit(Instr::Clear {
            dest: IrObject::Parameter(0),
        });
        buffer.emit_jump_to(0);
        let instrs = buffer.finish().unwrap();
        assert_eq!(instrs[1].target(), Some(Target::at(0)));
    }
}
