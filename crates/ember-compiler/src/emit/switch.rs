//! Two-phase switch emission.
//!
//! Phase 1 ([`FunctionEmitter::create_switch_targets`]) gives every case
//! group a target and builds the case-constant map. Duplicate constants are
//! reported here, before any instruction of the switch exists.
//!
//! Phase 2 ([`FunctionEmitter::emit_switch_cases`]) places each case body at
//! its target and patches the dispatch branches and any `goto case` that
//! reached it early.
//!
//! ## Layout
//!
//! ```text
//! [switch value]
//! case_branch value == c1 -> case0
//! case_branch value == c2 -> case1
//! jump -> default | end
//! case0:  [body]            ; falls through
//! case1:  [body]
//! end:
//! ```

use ember_core::{CompilationError, ConstantValue, Span};
use rustc_hash::FxHashMap;

use super::buffer::Fixup;
use super::{Breakable, FunctionEmitter, Instr, Result, Target};
use crate::bound::{BoundCaseLabel, BoundSwitch, CompoundId};

/// Serialized case constant. Integral, character, enum and bool constants
/// all map onto one integer domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaseKey(pub i128);

impl CaseKey {
    pub fn of(value: &ConstantValue) -> Option<Self> {
        value.as_i128().map(CaseKey)
    }
}

/// Case constant to the index of the case group that owns it.
pub type SwitchCaseMap = FxHashMap<CaseKey, (usize, Span)>;

#[derive(Debug, Default)]
pub(super) struct CaseTarget {
    position: Option<usize>,
    pending: Vec<Fixup>,
}

/// Phase 1 output, kept on the breakable stack while the cases are emitted.
#[derive(Debug)]
pub(super) struct SwitchTargets {
    pub(super) compound: CompoundId,
    /// Frame depth of the switch's own frame
    pub(super) depth: usize,
    pub(super) cases: Vec<CaseTarget>,
    pub(super) map: SwitchCaseMap,
    pub(super) default: Option<usize>,
    pub(super) breaks: Vec<Fixup>,
}

impl SwitchTargets {
    /// Case group index of `value`, or of `default` for `None`.
    fn case_of(&self, value: Option<&ConstantValue>) -> Option<usize> {
        match value {
            Some(value) => CaseKey::of(value).and_then(|k| self.map.get(&k)).map(|(i, _)| *i),
            None => self.default,
        }
    }
}

impl FunctionEmitter<'_> {
    /// Emit a switch statement in its own frame.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(super) fn emit_switch(&mut self, switch: &BoundSwitch) -> Result<()> {
        self.in_compound(Some(switch.compound), |e| {
            let targets = e.create_switch_targets(switch)?;
            let value = e.emit_value(&switch.value)?;

            let index = e.breakables.len();
            e.breakables.push(Breakable::Switch(targets));

            let mut dispatch: Vec<(usize, Fixup)> = Vec::new();
            for (case_index, case) in switch.cases.iter().enumerate() {
                for label in &case.labels {
                    if let BoundCaseLabel::Case { value: constant, .. } = label {
                        let fixup = e.emit_forward(Instr::CaseBranch {
                            value: value.clone(),
                            constant: constant.clone(),
                            target: Target::PENDING,
                        });
                        dispatch.push((case_index, fixup));
                    }
                }
            }
            let fallback = e.jump_forward();

            let targets = e.switch_targets(index)?;
            for (case_index, fixup) in dispatch {
                targets.cases[case_index].pending.push(fixup);
            }
            match targets.default {
                Some(default) => targets.cases[default].pending.push(fallback),
                None => targets.breaks.push(fallback),
            }

            let result = e.emit_switch_cases(switch, index);
            let popped = e.breakables.pop();
            result?;
            match popped {
                Some(Breakable::Switch(targets)) => e.patch_here(targets.breaks),
                _ => Err(CompilationError::internal("switch target stack corrupted")),
            }
        })
    }

    /// Phase 1: one target per case group and the case-constant map.
    pub(super) fn create_switch_targets(&self, switch: &BoundSwitch) -> Result<SwitchTargets> {
        let mut map = SwitchCaseMap::default();
        let mut default: Option<(usize, Span)> = None;

        for (case_index, case) in switch.cases.iter().enumerate() {
            for label in &case.labels {
                match label {
                    BoundCaseLabel::Case { value, span } => {
                        let key = CaseKey::of(value).ok_or(CompilationError::NotConstant {
                            span: *span,
                        })?;
                        if let Some((_, previous)) = map.get(&key) {
                            return Err(CompilationError::DuplicateCaseConstant {
                                value: value.to_string(),
                                span: *span,
                                previous: *previous,
                            });
                        }
                        map.insert(key, (case_index, *span));
                    }
                    BoundCaseLabel::Default(span) => {
                        if let Some((_, previous)) = default {
                            return Err(CompilationError::DuplicateCaseConstant {
                                value: "default".to_string(),
                                span: *span,
                                previous,
                            });
                        }
                        default = Some((case_index, *span));
                    }
                }
            }
        }

        Ok(SwitchTargets {
            compound: switch.compound,
            depth: self.frames.depth(),
            cases: switch.cases.iter().map(|_| CaseTarget::default()).collect(),
            map,
            default: default.map(|(i, _)| i),
            breaks: Vec::new(),
        })
    }

    /// Phase 2: case bodies at their targets.
    fn emit_switch_cases(&mut self, switch: &BoundSwitch, index: usize) -> Result<()> {
        for (case_index, case) in switch.cases.iter().enumerate() {
            let position = self.place_target();
            let target = &mut self.switch_targets(index)?.cases[case_index];
            target.position = Some(position);
            let pending = std::mem::take(&mut target.pending);
            self.buffer.backpatch(pending, position)?;

            self.emit_compound(&case.body)?;
        }
        Ok(())
    }

    fn switch_targets(&mut self, index: usize) -> Result<&mut SwitchTargets> {
        match self.breakables.get_mut(index) {
            Some(Breakable::Switch(targets)) => Ok(targets),
            _ => Err(CompilationError::internal("switch targets missing")),
        }
    }

    /// `goto case value` (or `goto default` for `None`).
    pub(super) fn emit_goto_case(
        &mut self,
        value: Option<&ConstantValue>,
        span: Span,
    ) -> Result<()> {
        let index = self
            .breakables
            .iter()
            .rposition(|b| matches!(b, Breakable::Switch(_)))
            .ok_or_else(|| CompilationError::InvalidControlFlow {
                message: "'goto case' outside of a switch".to_string(),
                span,
            })?;
        let (compound, case_index) = {
            let targets = self.switch_targets(index)?;
            let case_index = targets.case_of(value).ok_or_else(|| CompilationError::UnknownLabel {
                label: value.map_or_else(|| "default".to_string(), |v| format!("case {v}")),
                span,
            })?;
            (targets.compound, case_index)
        };

        let destroys = self.frames.unwind(Some(compound))?;
        self.emit_destroys(destroys);
        let position = self.switch_targets(index)?.cases[case_index].position;
        match position {
            Some(position) => self.jump_to(position),
            None => {
                let fixup = self.jump_forward();
                self.switch_targets(index)?.cases[case_index].pending.push(fixup);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::bind_function;
    use crate::emit::{EmittedFunction, emit_function};
    use crate::options::CompilerOptions;
    use bumpalo::Bump;
    use ember_registry::SymbolRegistry;
    use ember_syntax::{FunctionDecl, SyntaxBuilder};

    fn emit(decl: &FunctionDecl<'_>) -> Result<EmittedFunction> {
        let registry = SymbolRegistry::with_basic_types();
        let options = CompilerOptions::default();
        let bound = bind_function(&registry, &options, decl)?;
        emit_function(&registry, &options, None, &bound)
    }

    fn case_targets(function: &EmittedFunction) -> Vec<(i128, usize)> {
        function
            .instructions
            .iter()
            .filter_map(|i| match i {
                Instr::CaseBranch {
                    constant, target, ..
                } => Some((constant.as_i128()?, target.index()?)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn case_key_spans_integral_constants() {
        assert_eq!(CaseKey::of(&ConstantValue::Int(-3)), Some(CaseKey(-3)));
        assert_eq!(CaseKey::of(&ConstantValue::Bool(true)), Some(CaseKey(1)));
        assert_eq!(
            CaseKey::of(&ConstantValue::SByte(4)),
            CaseKey::of(&ConstantValue::Long(4))
        );
        assert_eq!(CaseKey::of(&ConstantValue::Null), None);
    }

    #[test]
    fn missing_default_falls_back_to_the_end() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let cases = [b.case(&[b.int(7)], &[b.break_()])];
        let body = b.block(&[b.switch(b.ident("n"), &cases)]);
        let function = emit(&b.function("seven", &[(b.ty("int"), "n")], None, body)).unwrap();

        // case_branch, jump -> end, case body (break), return
        let Instr::Jump { target } = &function.instructions[1] else {
            panic!("expected the fallback jump");
        };
        let end = target.index().unwrap();
        assert_eq!(function.instructions[end], Instr::Return { value: None });
        assert_eq!(case_targets(&function), vec![(7, 2)]);
    }

    #[test]
    fn goto_case_jumps_forward_to_the_case_body() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let cases = [
            b.case(&[b.int(1)], &[b.goto_case(b.int(2))]),
            b.case(&[b.int(2)], &[b.break_()]),
        ];
        let body = b.block(&[b.switch(b.ident("n"), &cases)]);
        let function = emit(&b.function("hop", &[(b.ty("int"), "n")], None, body)).unwrap();

        let targets = case_targets(&function);
        let second = targets.iter().find(|(c, _)| *c == 2).map(|(_, t)| *t).unwrap();
        let first = targets.iter().find(|(c, _)| *c == 1).map(|(_, t)| *t).unwrap();
        assert_eq!(
            function.instructions[first],
            Instr::Jump {
                target: Target::at(second)
            }
        );
    }

    #[test]
    fn goto_default_jumps_backward() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let cases = [
            b.default_case(&[b.break_()]),
            b.case(&[b.int(3)], &[b.goto_default()]),
        ];
        let body = b.block(&[b.switch(b.ident("n"), &cases)]);
        let function = emit(&b.function("back", &[(b.ty("int"), "n")], None, body)).unwrap();

        let (_, three) = case_targets(&function)[0];
        let Instr::Jump { target } = &function.instructions[1] else {
            panic!("expected the fallback jump to default");
        };
        assert_eq!(
            function.instructions[three],
            Instr::Jump { target: *target }
        );
    }

    #[test]
    fn second_default_is_rejected() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let cases = [b.default_case(&[b.break_()]), b.default_case(&[b.break_()])];
        let body = b.block(&[b.switch(b.ident("n"), &cases)]);
        let err = emit(&b.function("twice", &[(b.ty("int"), "n")], None, body)).unwrap_err();
        assert!(matches!(
            err,
            CompilationError::DuplicateCaseConstant { ref value, .. } if value == "default"
        ));
    }
}
