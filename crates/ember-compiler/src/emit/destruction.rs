//! Destruction-stack manager.
//!
//! One [`DestructionStack`] frame per open compound statement records the
//! objects constructed in it, in construction order. Leaving a compound
//! normally destroys its own frame; `break`, `continue`, `goto`, `return`
//! and exception paths destroy every frame they leave.
//!
//! ## Ordering
//!
//! Unwinding yields frames innermost first, and objects within a frame in
//! reverse construction order. Unwinding never pops: the frames stay in
//! place for the statements that follow the jump.

use ember_core::{CompilationError, TypeHash};

use super::ir::IrObject;
use crate::bound::CompoundId;

/// An object waiting for its destructor.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDestroy {
    pub object: IrObject,
    pub destructor: TypeHash,
}

/// Objects constructed in one compound statement.
#[derive(Debug, Clone, Default)]
pub struct DestructionStack {
    /// `None` for frames without a source compound (expression scopes).
    pub compound: Option<CompoundId>,
    objects: Vec<PendingDestroy>,
}

impl DestructionStack {
    fn new(compound: Option<CompoundId>) -> Self {
        Self {
            compound,
            objects: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Objects in destruction order.
    pub fn destruction_order(&self) -> impl Iterator<Item = &PendingDestroy> {
        self.objects.iter().rev()
    }
}

/// The frames of one function, outermost first.
#[derive(Debug, Default)]
pub struct FunctionDestructionStack {
    frames: Vec<DestructionStack>,
}

impl FunctionDestructionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a frame for a compound statement.
    pub fn enter(&mut self, compound: Option<CompoundId>) {
        self.frames.push(DestructionStack::new(compound));
    }

    /// Close the innermost frame.
    pub fn leave(&mut self) -> Result<DestructionStack, CompilationError> {
        self.frames
            .pop()
            .ok_or_else(|| CompilationError::internal("destruction stack underflow"))
    }

    /// Record a constructed object in the innermost frame.
    pub fn push(&mut self, object: IrObject, destructor: TypeHash) -> Result<(), CompilationError> {
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| CompilationError::internal("object constructed outside any compound"))?;
        frame.objects.push(PendingDestroy { object, destructor });
        Ok(())
    }

    /// Drop `object` from the innermost frame without destroying it; its
    /// ownership leaves the function. False when the frame does not own it.
    pub fn release(&mut self, object: &IrObject) -> bool {
        let Some(frame) = self.frames.last_mut() else {
            return false;
        };
        match frame.objects.iter().rposition(|p| &p.object == object) {
            Some(index) => {
                frame.objects.remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of open frames.
    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn innermost(&self) -> Option<&DestructionStack> {
        self.frames.last()
    }

    /// Position of the frame of `compound`, if open.
    pub fn depth_of(&self, compound: CompoundId) -> Option<usize> {
        self.frames
            .iter()
            .rposition(|f| f.compound == Some(compound))
    }

    /// Number of objects recorded in the frame at `index`.
    pub fn frame_len(&self, index: usize) -> usize {
        self.frames.get(index).map_or(0, DestructionStack::len)
    }

    /// Objects of the frame at `index` recorded after its first `from`, in
    /// destruction order.
    pub fn frame_tail(&self, index: usize, from: usize) -> Vec<PendingDestroy> {
        self.frames
            .get(index)
            .map(|f| f.objects.iter().skip(from).rev().cloned().collect())
            .unwrap_or_default()
    }

    /// Objects to destroy when leaving every frame above `depth`.
    pub fn unwind_above(&self, depth: usize) -> Vec<PendingDestroy> {
        self.frames
            .iter()
            .skip(depth)
            .rev()
            .flat_map(DestructionStack::destruction_order)
            .cloned()
            .collect()
    }

    /// Objects to destroy when jumping into compound `to`: every frame above
    /// it. `None` unwinds the whole function.
    pub fn unwind(&self, to: Option<CompoundId>) -> Result<Vec<PendingDestroy>, CompilationError> {
        let depth = match to {
            None => 0,
            Some(compound) => {
                self.depth_of(compound).ok_or_else(|| {
                    CompilationError::internal(format!("compound {compound} is not open"))
                })? + 1
            }
        };
        Ok(self.unwind_above(depth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bound::LocalId;

    fn local(i: u32) -> IrObject {
        IrObject::Local(LocalId(i))
    }

    fn dtor(i: u64) -> TypeHash {
        TypeHash(i)
    }

    fn objects(list: &[PendingDestroy]) -> Vec<IrObject> {
        list.iter().map(|p| p.object.clone()).collect()
    }

    #[test]
    fn push_without_frame_is_internal_error() {
        let mut stack = FunctionDestructionStack::new();
        assert!(stack.push(local(0), dtor(1)).is_err());
    }

    #[test]
    fn unwind_is_innermost_first_and_reverse_within_frame() {
        let mut stack = FunctionDestructionStack::new();
        stack.enter(Some(CompoundId(0)));
        stack.push(local(0), dtor(1)).unwrap();
        stack.push(local(1), dtor(1)).unwrap();
        stack.enter(Some(CompoundId(1)));
        stack.push(local(2), dtor(2)).unwrap();
        stack.push(local(3), dtor(2)).unwrap();

        let all = stack.unwind(None).unwrap();
        assert_eq!(objects(&all), vec![local(3), local(2), local(1), local(0)]);
    }

    #[test]
    fn unwind_to_compound_keeps_its_frame() {
        let mut stack = FunctionDestructionStack::new();
        stack.enter(Some(CompoundId(0)));
        stack.push(local(0), dtor(1)).unwrap();
        stack.enter(Some(CompoundId(1)));
        stack.push(local(1), dtor(1)).unwrap();
        stack.enter(None);
        stack.push(local(2), dtor(1)).unwrap();

        let to_outer = stack.unwind(Some(CompoundId(0))).unwrap();
        assert_eq!(objects(&to_outer), vec![local(2), local(1)]);
        // Unwinding does not pop.
        assert_eq!(stack.depth(), 3);
    }

    #[test]
    fn released_object_is_not_unwound() {
        let mut stack = FunctionDestructionStack::new();
        stack.enter(Some(CompoundId(0)));
        stack.push(local(0), dtor(1)).unwrap();
        stack.enter(None);
        stack.push(local(1), dtor(1)).unwrap();
        stack.push(local(2), dtor(1)).unwrap();

        assert!(stack.release(&local(1)));
        // Only the innermost frame is searched.
        assert!(!stack.release(&local(0)));
        assert_eq!(objects(&stack.unwind(None).unwrap()), vec![local(2), local(0)]);
    }

    #[test]
    fn unwind_to_closed_compound_is_internal_error() {
        let mut stack = FunctionDestructionStack::new();
        stack.enter(Some(CompoundId(0)));
        assert!(stack.unwind(Some(CompoundId(7))).is_err());
    }

    #[test]
    fn leave_returns_frame_in_destruction_order() {
        let mut stack = FunctionDestructionStack::new();
        stack.enter(Some(CompoundId(4)));
        stack.push(local(0), dtor(1)).unwrap();
        stack.push(local(1), dtor(2)).unwrap();
        let frame = stack.leave().unwrap();
        assert_eq!(frame.compound, Some(CompoundId(4)));
        let order: Vec<_> = frame.destruction_order().map(|p| p.destructor).collect();
        assert_eq!(order, vec![dtor(2), dtor(1)]);
        assert!(stack.leave().is_err());
    }
}
