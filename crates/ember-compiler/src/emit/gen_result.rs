//! Result of emitting one expression or condition.

use super::buffer::Fixup;
use super::ir::IrObject;

/// Where emitted code left its value or its pending branches.
///
/// Jumping boolean code leaves no value; it leaves branches to patch
/// instead: `true_targets` are taken when the condition holds,
/// `false_targets` when it does not. `next_targets` join the code that
/// follows the construct whatever the outcome.
#[derive(Debug, Clone, Default)]
pub struct GenResult {
    /// The value; `None` for jumping code and void calls.
    pub value: Option<IrObject>,
    /// Temporaries constructed while evaluating the expression.
    pub aux: Vec<IrObject>,
    pub true_targets: Vec<Fixup>,
    pub false_targets: Vec<Fixup>,
    pub next_targets: Vec<Fixup>,
}

impl GenResult {
    /// Jumping code whose `fixups` are taken when the condition equals `when`.
    pub fn jumps(when: bool, fixups: Vec<Fixup>) -> Self {
        let mut result = Self::default();
        *result.targets_mut(when) = fixups;
        result
    }

    pub fn targets_mut(&mut self, when: bool) -> &mut Vec<Fixup> {
        if when {
            &mut self.true_targets
        } else {
            &mut self.false_targets
        }
    }

    /// Move out the branches taken on `when`.
    pub fn take_targets(&mut self, when: bool) -> Vec<Fixup> {
        std::mem::take(self.targets_mut(when))
    }

    /// Append `other`'s pending branches to ours.
    pub fn merge(&mut self, mut other: GenResult) {
        self.true_targets.append(&mut other.true_targets);
        self.false_targets.append(&mut other.false_targets);
        self.next_targets.append(&mut other.next_targets);
    }

    /// No branch is left to patch.
    pub fn is_resolved(&self) -> bool {
        self.true_targets.is_empty() && self.false_targets.is_empty() && self.next_targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::{Instr, InstrBuffer, Target};

    fn fixup(buffer: &mut InstrBuffer) -> Fixup {
        buffer.emit_jump_forward()
    }

    #[test]
    fn jumps_land_in_the_outcome_list() {
        let mut buffer = InstrBuffer::new();
        let on_true = GenResult::jumps(true, vec![fixup(&mut buffer)]);
        assert_eq!(on_true.true_targets.len(), 1);
        assert!(on_true.false_targets.is_empty());

        let mut on_false = GenResult::jumps(false, vec![fixup(&mut buffer)]);
        on_false.merge(on_true);
        assert_eq!(on_false.true_targets.len(), 1);
        assert_eq!(on_false.false_targets.len(), 1);
        assert!(!on_false.is_resolved());
    }

    #[test]
    fn taken_targets_backpatch_once() {
        let mut buffer = InstrBuffer::new();
        let mut result = GenResult::jumps(false, vec![fixup(&mut buffer)]);
        result.next_targets.push(fixup(&mut buffer));

        buffer.backpatch_here(result.take_targets(false)).unwrap();
        buffer.backpatch_here(std::mem::take(&mut result.next_targets)).unwrap();
        assert!(result.is_resolved());
        assert!(result.take_targets(false).is_empty());
        assert_eq!(buffer.outstanding(), 0);

        let end = buffer.len();
        for instr in buffer.finish().unwrap() {
            assert_eq!(instr, Instr::Jump { target: Target::at(end) });
        }
    }
}
