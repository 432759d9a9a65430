//! Statement emission and control-flow lowering.
//!
//! Conditions of `if`, `while`, `do` and `for` are emitted as jumping code:
//! [`FunctionEmitter::branch`] returns a [`GenResult`] whose true or false
//! targets hold the forward jumps taken on that outcome; control falls
//! through otherwise. `&&`, `||` and `!` marked for jumping code never
//! materialize a boolean. Every list is drained by a backpatch before the
//! construct that owns it finishes.
//!
//! `break`, `continue`, `goto`, `goto case` and `return` destroy every
//! object of the frames they leave before jumping.

use ember_core::{CompilationError, ConstantValue, IntrinsicOp, Span};

use super::expr::Place;
use super::{
    Breakable, ContinueTarget, FunctionEmitter, GenResult, Instr, IrObject, LabelState,
    LoopTargets, Result, Target,
};
use crate::bound::{
    BoundAssign, BoundCompound, BoundExpr, BoundExprKind, BoundFor, BoundLocalInit, BoundStmt,
    BoundTryCatch, CompoundId, ExprFlags, LocalInit,
};

impl FunctionEmitter<'_> {
    /// Emit a compound statement in its own frame.
    pub(super) fn emit_compound(&mut self, compound: &BoundCompound) -> Result<()> {
        self.in_compound(Some(compound.id), |e| {
            for stmt in &compound.stmts {
                e.emit_stmt(stmt)?;
            }
            Ok(())
        })
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(super) fn emit_stmt(&mut self, stmt: &BoundStmt) -> Result<()> {
        match stmt {
            BoundStmt::Compound(compound) => self.emit_compound(compound),
            BoundStmt::Expr(expr) => self.emit_full_expr(expr),
            BoundStmt::Assign(assign) => self.emit_assign(assign),
            BoundStmt::LocalInit(init) => self.emit_local_init(init),
            BoundStmt::Return { value, .. } => self.emit_return(value.as_ref()),
            BoundStmt::If {
                condition,
                then_stmt,
                else_stmt,
                ..
            } => self.emit_if(condition, then_stmt, else_stmt.as_deref()),
            BoundStmt::While {
                condition, body, ..
            } => self.emit_while(condition, body),
            BoundStmt::DoWhile {
                body, condition, ..
            } => self.emit_do_while(body, condition),
            BoundStmt::For(for_stmt) => self.emit_for(for_stmt),
            BoundStmt::Break(span) => self.emit_break(*span),
            BoundStmt::Continue(span) => self.emit_continue(*span),
            BoundStmt::Goto {
                label,
                compound,
                span,
            } => self.emit_goto(label, *compound, *span),
            BoundStmt::Labeled { label, stmt, span } => {
                self.place_label(label, *span)?;
                self.emit_stmt(stmt)
            }
            BoundStmt::Switch(switch) => self.emit_switch(switch),
            BoundStmt::GotoCase { value, span } => self.emit_goto_case(Some(value), *span),
            BoundStmt::GotoDefault(span) => self.emit_goto_case(None, *span),
            BoundStmt::TryCatch(try_catch) => self.emit_try_catch(try_catch),
            BoundStmt::Throw { value, .. } => self.emit_throw(value),
            BoundStmt::Empty(_) => Ok(()),
        }
    }

    /// An expression statement. Temporaries live until the end of the
    /// statement.
    fn emit_full_expr(&mut self, expr: &BoundExpr) -> Result<()> {
        self.in_compound(None, |e| e.emit_expr(expr).map(|_| ()))
    }

    fn emit_assign(&mut self, assign: &BoundAssign) -> Result<()> {
        self.in_compound(None, |e| match &assign.operator {
            Some(operator) => {
                let target = e.emit_address(&assign.target)?;
                let value = e.emit_arg(&assign.value)?;
                let dest = (!operator.function.return_type.is_void()).then(|| e.new_temp());
                e.emit(Instr::Call {
                    dest,
                    function: operator.function.hash,
                    args: vec![target, value],
                });
                e.after_call(operator.function.can_throw());
                Ok(())
            }
            None => {
                let place = e.emit_place(&assign.target)?;
                let value = e.emit_value(&assign.value)?;
                match place {
                    Place::Direct(dest) => e.emit(Instr::Copy { dest, src: value }),
                    Place::Indirect(address) => {
                        e.emit(Instr::Store { address, value })
                    }
                }
                Ok(())
            }
        })
    }

    fn emit_local_init(&mut self, init: &BoundLocalInit) -> Result<()> {
        let local = IrObject::Local(init.local);
        let is_reference = self
            .function
            .locals
            .get(init.local)
            .is_some_and(|slot| slot.ty.is_any_reference());

        self.in_compound(None, |e| {
            match &init.init {
                LocalInit::Default => e.emit(Instr::Clear {
                    dest: local.clone(),
                }),
                LocalInit::Value(value) => {
                    let src = if is_reference {
                        e.emit_address(value)?
                    } else {
                        e.emit_value(value)?
                    };
                    e.emit(Instr::Copy {
                        dest: local.clone(),
                        src,
                    });
                }
                LocalInit::Construct {
                    constructor, args, ..
                } => e.construct_into(local.clone(), Some(constructor), args)?,
            }
            Ok(())
        })?;

        // Registered only once construction has completed.
        if let Some(destructor) = init.destructor {
            self.frames.push(local, destructor)?;
        }
        Ok(())
    }

    // ==========================================================================
    // Jumping Code
    // ==========================================================================

    /// Evaluate `condition`; the jumps in the result's `when` targets are
    /// taken when it equals `when`, otherwise control falls through.
    pub(super) fn branch(&mut self, condition: &BoundExpr, when: bool) -> Result<GenResult> {
        if !condition.flags.contains(ExprFlags::GEN_JUMPING_BOOL_CODE)
            || self.constructs_destructible(condition)
        {
            return self.branch_on_value(condition, when);
        }

        match &condition.kind {
            BoundExprKind::Literal(ConstantValue::Bool(value)) => Ok(self.constant_branch(*value, when)),
            // a && b: false as soon as a is false.
            BoundExprKind::Conjunction { left, right, .. } => {
                let mut left = self.branch(left, false)?;
                if when {
                    let taken = self.branch(right, true)?;
                    self.patch_here(left.take_targets(false))?;
                    Ok(taken)
                } else {
                    left.merge(self.branch(right, false)?);
                    Ok(left)
                }
            }
            // a || b: true as soon as a is true.
            BoundExprKind::Disjunction { left, right, .. } => {
                let mut left = self.branch(left, true)?;
                if when {
                    left.merge(self.branch(right, true)?);
                    Ok(left)
                } else {
                    let taken = self.branch(right, false)?;
                    self.patch_here(left.take_targets(true))?;
                    Ok(taken)
                }
            }
            BoundExprKind::Unary { function, operand }
                if function.intrinsic == Some(IntrinsicOp::Not) =>
            {
                let mut inner = self.branch(operand, !when)?;
                Ok(GenResult::jumps(when, inner.take_targets(!when)))
            }
            _ => self.branch_on_value(condition, when),
        }
    }

    fn constant_branch(&mut self, value: bool, when: bool) -> GenResult {
        if value == when {
            GenResult::jumps(when, vec![self.jump_forward()])
        } else {
            GenResult::default()
        }
    }

    /// Materialize `condition` in its own frame, destroy its temporaries,
    /// then branch on the value.
    fn branch_on_value(&mut self, condition: &BoundExpr, when: bool) -> Result<GenResult> {
        let value = self.in_compound(None, |e| {
            let value = e.emit_value(condition)?;
            if e.frames.innermost().is_some_and(|f| !f.is_empty()) && !value.is_constant() {
                // The value must survive the destructors that follow.
                let slot = e.new_temp();
                e.emit(Instr::Copy {
                    dest: slot.clone(),
                    src: value,
                });
                return Ok(slot);
            }
            Ok(value)
        })?;

        if let IrObject::Constant(ConstantValue::Bool(constant)) = value {
            return Ok(self.constant_branch(constant, when));
        }
        let jump = self.emit_forward(Instr::JumpIf {
            condition: value,
            when,
            target: Target::PENDING,
        });
        Ok(GenResult::jumps(when, vec![jump]))
    }

    /// Whether evaluating `expr` registers objects for destruction.
    fn constructs_destructible(&self, expr: &BoundExpr) -> bool {
        let registry = self.registry;
        let mut found = false;
        expr.walk(&mut |e| {
            found |= match &e.kind {
                BoundExprKind::Construct { destructor, .. } => destructor.is_some(),
                BoundExprKind::Call { function, .. } => {
                    registry.destructor_of(&function.return_type).is_some()
                }
                BoundExprKind::DelegateCall { .. } => registry.destructor_of(&e.ty).is_some(),
                _ => false,
            };
        });
        found
    }

    // ==========================================================================
    // Conditionals and Loops
    // ==========================================================================

    /// ```text
    /// [condition] false -> else
    /// [then]
    /// jump -> end
    /// else: [else]
    /// end:
    /// ```
    fn emit_if(
        &mut self,
        condition: &BoundExpr,
        then_stmt: &BoundStmt,
        else_stmt: Option<&BoundStmt>,
    ) -> Result<()> {
        let mut result = self.branch(condition, false)?;
        self.emit_stmt(then_stmt)?;
        if let Some(else_stmt) = else_stmt {
            if self.reachable {
                let to_end = self.jump_forward();
                result.next_targets.push(to_end);
            }
            self.patch_here(result.take_targets(false))?;
            self.emit_stmt(else_stmt)?;
        } else {
            self.patch_here(result.take_targets(false))?;
        }
        self.patch_here(std::mem::take(&mut result.next_targets))?;
        debug_assert!(result.is_resolved());
        Ok(())
    }

    /// Run `body` with a loop on the breakable stack and return its targets.
    fn with_loop(
        &mut self,
        continue_to: ContinueTarget,
        body: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<LoopTargets> {
        self.breakables.push(Breakable::Loop(LoopTargets {
            depth: self.frames.depth(),
            breaks: Vec::new(),
            continue_to,
        }));
        let result = body(self);
        let popped = self.breakables.pop();
        result?;
        match popped {
            Some(Breakable::Loop(targets)) => Ok(targets),
            _ => Err(CompilationError::internal("loop target stack corrupted")),
        }
    }

    /// ```text
    /// top: [condition] false -> end
    /// [body]
    /// jump -> top
    /// end:
    /// ```
    fn emit_while(&mut self, condition: &BoundExpr, body: &BoundStmt) -> Result<()> {
        let top = self.place_target();
        let mut exit = self.branch(condition, false)?;
        let targets = self.with_loop(ContinueTarget::At(top), |e| {
            e.emit_stmt(body)?;
            if e.reachable {
                e.jump_to(top);
            }
            Ok(())
        })?;
        self.patch_here(exit.take_targets(false))?;
        self.patch_here(targets.breaks)
    }

    /// ```text
    /// top: [body]
    /// continue: [condition] true -> top
    /// end:
    /// ```
    fn emit_do_while(&mut self, body: &BoundStmt, condition: &BoundExpr) -> Result<()> {
        let top = self.place_target();
        let targets = self.with_loop(ContinueTarget::Pending(Vec::new()), |e| {
            e.emit_stmt(body)?;
            e.patch_continues()?;
            if e.reachable {
                let mut repeat = e.branch(condition, true)?;
                e.buffer.backpatch(repeat.take_targets(true), top)?;
            }
            Ok(())
        })?;
        self.patch_here(targets.breaks)
    }

    /// ```text
    /// [init]
    /// top: [condition] false -> end
    /// [body]
    /// continue: [update]
    /// jump -> top
    /// end:
    /// ```
    fn emit_for(&mut self, for_stmt: &BoundFor) -> Result<()> {
        self.in_compound(Some(for_stmt.compound), |e| {
            if let Some(init) = &for_stmt.init {
                e.emit_stmt(init)?;
            }
            let top = e.place_target();
            let mut exit = match &for_stmt.condition {
                Some(condition) => e.branch(condition, false)?,
                None => GenResult::default(),
            };
            let targets = e.with_loop(ContinueTarget::Pending(Vec::new()), |e| {
                e.emit_stmt(&for_stmt.body)?;
                e.patch_continues()?;
                if e.reachable {
                    for update in &for_stmt.update {
                        e.emit_full_expr(update)?;
                    }
                    e.jump_to(top);
                }
                Ok(())
            })?;
            e.patch_here(exit.take_targets(false))?;
            e.patch_here(targets.breaks)
        })
    }

    /// Patch the pending `continue`s of the innermost loop here.
    fn patch_continues(&mut self) -> Result<()> {
        let pending = match self.breakables.last_mut() {
            Some(Breakable::Loop(LoopTargets {
                continue_to: ContinueTarget::Pending(pending),
                ..
            })) => std::mem::take(pending),
            _ => return Err(CompilationError::internal("no loop with pending continues")),
        };
        let position = self.buffer.position();
        if !pending.is_empty() {
            self.place_target();
        }
        self.buffer.backpatch(pending, position)
    }

    // ==========================================================================
    // Jumps
    // ==========================================================================

    fn emit_break(&mut self, span: Span) -> Result<()> {
        let depth = match self.breakables.last() {
            Some(Breakable::Loop(targets)) => targets.depth,
            Some(Breakable::Switch(targets)) => targets.depth,
            None => {
                return Err(CompilationError::InvalidControlFlow {
                    message: "'break' outside of a loop or switch".to_string(),
                    span,
                });
            }
        };
        let destroys = self.frames.unwind_above(depth);
        self.emit_destroys(destroys);
        let fixup = self.jump_forward();
        match self.breakables.last_mut() {
            Some(Breakable::Loop(targets)) => targets.breaks.push(fixup),
            Some(Breakable::Switch(targets)) => targets.breaks.push(fixup),
            None => return Err(CompilationError::internal("break target vanished")),
        }
        Ok(())
    }

    fn emit_continue(&mut self, span: Span) -> Result<()> {
        let index = self
            .breakables
            .iter()
            .rposition(|b| matches!(b, Breakable::Loop(_)))
            .ok_or_else(|| CompilationError::InvalidControlFlow {
                message: "'continue' outside of a loop".to_string(),
                span,
            })?;
        let Some(Breakable::Loop(targets)) = self.breakables.get(index) else {
            return Err(CompilationError::internal("continue target vanished"));
        };
        let destroys = self.frames.unwind_above(targets.depth);
        let known = match &targets.continue_to {
            ContinueTarget::At(position) => Some(*position),
            ContinueTarget::Pending(_) => None,
        };
        self.emit_destroys(destroys);
        match known {
            Some(position) => self.jump_to(position),
            None => {
                let fixup = self.jump_forward();
                if let Some(Breakable::Loop(LoopTargets {
                    continue_to: ContinueTarget::Pending(pending),
                    ..
                })) = self.breakables.get_mut(index)
                {
                    pending.push(fixup);
                }
            }
        }
        Ok(())
    }

    /// Live objects of `compound`'s frame, and its index.
    fn frame_of(&self, compound: CompoundId) -> Result<(usize, usize)> {
        let index = self.frames.depth_of(compound).ok_or_else(|| {
            CompilationError::internal(format!("compound {compound} is not open"))
        })?;
        Ok((index, self.frames.frame_len(index)))
    }

    /// `goto label`: destroy what the jump leaves, then jump.
    ///
    /// A backward jump also destroys the objects of the label's compound
    /// constructed after the label.
    fn emit_goto(&mut self, label: &str, compound: CompoundId, span: Span) -> Result<()> {
        let (index, live) = self.frame_of(compound)?;
        let mut destroys = self.frames.unwind(Some(compound))?;
        let key = (compound, label.to_string());
        let placed = self.labels.get(&key).and_then(|s| s.placed);

        match placed {
            Some((position, live_at_label)) => {
                destroys.extend(self.frames.frame_tail(index, live_at_label));
                self.emit_destroys(destroys);
                self.jump_to(position);
            }
            None => {
                self.emit_destroys(destroys);
                let fixup = self.jump_forward();
                self.labels.entry(key).or_default().pending.push((fixup, live));
            }
        }
        tracing::trace!(label, %compound, ?span, "goto");
        Ok(())
    }

    /// Place `label` here and resolve the jumps that reached it early.
    fn place_label(&mut self, label: &str, span: Span) -> Result<()> {
        let compound = self
            .frames
            .innermost()
            .and_then(|f| f.compound)
            .ok_or_else(|| CompilationError::internal("label outside of a compound"))?;
        let (_, live) = self.frame_of(compound)?;
        let position = self.place_target();

        let state: &mut LabelState = self.labels.entry((compound, label.to_string())).or_default();
        state.placed = Some((position, live));
        let pending = std::mem::take(&mut state.pending);
        if pending.iter().any(|(_, at_goto)| *at_goto != live) {
            return Err(CompilationError::InvalidControlFlow {
                message: format!(
                    "jump to label '{label}' skips the construction of an object with a destructor"
                ),
                span,
            });
        }
        self.buffer
            .backpatch(pending.into_iter().map(|(fixup, _)| fixup), position)
    }

    /// `return`: compute the value, destroy every open frame, return.
    fn emit_return(&mut self, value: Option<&BoundExpr>) -> Result<()> {
        let result = match value {
            Some(value) => Some(self.in_compound(None, |e| {
                let result = if value.flags.contains(ExprFlags::ARG_BY_REF) {
                    e.emit_address(value)?
                } else {
                    e.emit_value(value)?
                };
                if result.is_constant() {
                    return Ok(result);
                }
                // A class object built for the return belongs to the caller.
                if e.frames.release(&result) {
                    return Ok(result);
                }
                // The result must survive the destructors below.
                let slot = e.new_temp();
                e.emit(Instr::Copy {
                    dest: slot.clone(),
                    src: result,
                });
                Ok(slot)
            })?),
            None => None,
        };

        let destroys = self.frames.unwind(None)?;
        self.emit_destroys(destroys);
        if self.function.is_entry {
            self.emit(Instr::CheckException);
        }
        self.emit(Instr::Return { value: result });
        Ok(())
    }

    // ==========================================================================
    // Exceptions
    // ==========================================================================

    /// `throw value`: set the exception code and leave through a pad.
    fn emit_throw(&mut self, value: &BoundExpr) -> Result<()> {
        let value = self.emit_value(value)?;
        self.emit(Instr::Throw { value });
        let fixup = self.jump_forward();
        self.pads.create(&self.frames, fixup);
        Ok(())
    }

    /// ```text
    /// [try body]                 ; pads jump to dispatch
    /// jump -> end
    /// dispatch: catch_test C1 -> catch0
    ///           catch_test C2 -> catch1
    ///           jump -> rethrow pad
    /// catch0:   take_exception v; [body]; jump -> end
    /// catch1:   ...
    /// end:
    /// ```
    fn emit_try_catch(&mut self, stmt: &BoundTryCatch) -> Result<()> {
        let catch = self.pads.push_catch(self.frames.depth());
        let body = self.emit_compound(&stmt.try_block);
        let popped = self.pads.pop_catch()?;
        body?;
        if popped != catch {
            return Err(CompilationError::internal("catch stack corrupted"));
        }

        let mut to_end = Vec::new();
        if self.reachable {
            to_end.push(self.jump_forward());
        }

        let dispatch = self.place_target();
        self.catch_positions.insert(catch, dispatch);
        let mut handlers = Vec::with_capacity(stmt.catches.len());
        for clause in &stmt.catches {
            handlers.push(self.buffer.emit_forward(Instr::CatchTest {
                class: clause.class,
                target: Target::PENDING,
            }));
        }
        let rethrow = self.jump_forward();
        self.pads.create(&self.frames, rethrow);

        for (clause, handler) in stmt.catches.iter().zip(handlers) {
            self.patch_here(vec![handler])?;
            self.in_compound(Some(clause.body.id), |e| {
                e.emit(Instr::TakeException {
                    dest: clause.variable.map(IrObject::Local),
                });
                for stmt in &clause.body.stmts {
                    e.emit_stmt(stmt)?;
                }
                Ok(())
            })?;
            if self.reachable {
                to_end.push(self.jump_forward());
            }
        }
        self.patch_here(to_end)
    }
}
