//! Function emitter: bound tree to instructions.
//!
//! The [`FunctionEmitter`] lowers one [`BoundFunction`] into an
//! [`EmittedFunction`]. It owns the per-function emission state:
//! - the instruction buffer and its outstanding forward jumps
//! - the destruction frames of the open compounds
//! - the landing pads of fallible calls and the active try regions
//! - the break/continue targets of open loops and switches
//! - label positions for `goto`
//!
//! ## Algorithm
//!
//! 1. Open the outermost frame and register by-value class parameters
//! 2. Emit the body compound
//! 3. If the end of the body is reachable, emit the implicit return
//! 4. Place the landing pads after the body
//! 5. Verify that every forward jump was patched and every frame closed
//!
//! # Example
//!
//! ```ignore
//! let bound = bind_function(&registry, &options, &decl)?;
//! let emitted = emit_function(&registry, &options, None, &bound)?;
//! assert!(emitted.instructions.last().is_some_and(Instr::is_terminator));
//! ```

mod buffer;
mod destruction;
mod devirtualize;
mod expr;
mod gen_result;
mod ir;
mod landing_pad;
mod stmt;
mod switch;

pub use buffer::{Fixup, InstrBuffer};
pub use destruction::{DestructionStack, FunctionDestructionStack, PendingDestroy};
pub use devirtualize::{ReachingClassMap, try_devirtualize};
pub use gen_result::GenResult;
pub use ir::{Instr, IrObject, Target, TempId};
pub use landing_pad::{CatchId, LandingPadBlock, LandingPadBuilder, LandingPadId, PadExit};
pub use switch::{CaseKey, SwitchCaseMap};

use ember_core::{CompilationError, TypeHash};
use ember_registry::SymbolRegistry;
use rustc_hash::FxHashMap;

use crate::bound::{BoundFunction, CompoundId, LocalTable};
use crate::options::CompilerOptions;
use switch::SwitchTargets;

type Result<T> = std::result::Result<T, CompilationError>;

/// The instructions of one function, ready for a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedFunction {
    pub hash: TypeHash,
    pub name: String,
    /// Body followed by the landing pads.
    pub instructions: Vec<Instr>,
    pub landing_pads: Vec<LandingPadBlock>,
    /// Number of compiler temporaries ([`TempId`]s are `0..temporaries`).
    pub temporaries: u32,
    pub locals: LocalTable,
}

impl EmittedFunction {
    /// Instructions of the normal body, without the landing pads.
    pub fn body(&self) -> &[Instr] {
        let end = self
            .landing_pads
            .first()
            .map_or(self.instructions.len(), |p| p.start);
        &self.instructions[..end]
    }
}

/// Emit one bound function.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn emit_function(
    registry: &SymbolRegistry,
    options: &CompilerOptions,
    reaching: Option<&ReachingClassMap>,
    function: &BoundFunction,
) -> Result<EmittedFunction> {
    tracing::debug!(function = %function.name, "emitting function");
    let emitted = FunctionEmitter::new(registry, options, reaching, function).run()?;
    tracing::debug!(
        function = %emitted.name,
        instructions = emitted.instructions.len(),
        landing_pads = emitted.landing_pads.len(),
        temporaries = emitted.temporaries,
        "emitted function"
    );
    Ok(emitted)
}

/// Target of `break` and `continue`.
#[derive(Debug)]
enum Breakable {
    Loop(LoopTargets),
    Switch(SwitchTargets),
}

#[derive(Debug)]
struct LoopTargets {
    /// Frame depth of the loop statement; frames above it are unwound
    depth: usize,
    breaks: Vec<Fixup>,
    continue_to: ContinueTarget,
}

#[derive(Debug)]
enum ContinueTarget {
    /// Already emitted (`while` conditions)
    At(usize),
    /// Emitted after the body (`do`/`for`)
    Pending(Vec<Fixup>),
}

/// Position and pending jumps of one `goto` label.
#[derive(Debug, Default)]
struct LabelState {
    /// Position and live-object count of the label's frame when placed
    placed: Option<(usize, usize)>,
    /// Forward jumps with the live-object count at the jump
    pending: Vec<(Fixup, usize)>,
}

/// Emission state of one function.
pub struct FunctionEmitter<'a> {
    registry: &'a SymbolRegistry,
    options: &'a CompilerOptions,
    reaching: Option<&'a ReachingClassMap>,
    function: &'a BoundFunction,
    buffer: InstrBuffer,
    frames: FunctionDestructionStack,
    pads: LandingPadBuilder,
    breakables: Vec<Breakable>,
    labels: FxHashMap<(CompoundId, String), LabelState>,
    catch_positions: FxHashMap<CatchId, usize>,
    next_temp: u32,
    /// Control can reach the next instruction
    reachable: bool,
}

impl<'a> FunctionEmitter<'a> {
    pub fn new(
        registry: &'a SymbolRegistry,
        options: &'a CompilerOptions,
        reaching: Option<&'a ReachingClassMap>,
        function: &'a BoundFunction,
    ) -> Self {
        Self {
            registry,
            options,
            reaching,
            function,
            buffer: InstrBuffer::new(),
            frames: FunctionDestructionStack::new(),
            pads: LandingPadBuilder::new(),
            breakables: Vec::new(),
            labels: FxHashMap::default(),
            catch_positions: FxHashMap::default(),
            next_temp: 0,
            reachable: true,
        }
    }

    /// Emit the whole function.
    pub fn run(mut self) -> Result<EmittedFunction> {
        let function = self.function;

        self.in_compound(None, |e| {
            for (index, param) in function.params.iter().enumerate() {
                if let Some(destructor) = param.destructor {
                    e.frames.push(IrObject::Parameter(index as u32), destructor)?;
                }
            }
            e.emit_compound(&function.body)
        })?;

        if self.reachable {
            if function.is_entry {
                self.emit(Instr::CheckException);
            }
            self.emit(Instr::Return { value: None });
        }

        if self.frames.depth() != 0 {
            return Err(CompilationError::internal(format!(
                "{} destruction frame(s) left open",
                self.frames.depth()
            )));
        }
        if !self.breakables.is_empty() {
            return Err(CompilationError::internal("break target left open"));
        }
        if let Some(((_, label), _)) = self.labels.iter().find(|(_, s)| !s.pending.is_empty()) {
            return Err(CompilationError::internal(format!(
                "goto '{label}' was never resolved"
            )));
        }

        let landing_pads = self.pads.emit_all(&mut self.buffer, &self.catch_positions)?;
        let instructions = self.buffer.finish()?;
        Ok(EmittedFunction {
            hash: function.hash,
            name: function.name.clone(),
            instructions,
            landing_pads,
            temporaries: self.next_temp,
            locals: function.locals.clone(),
        })
    }

    // ==========================================================================
    // Buffer Access
    // ==========================================================================

    fn emit(&mut self, instr: Instr) {
        if instr.is_terminator() {
            self.reachable = false;
        }
        self.buffer.emit(instr);
    }

    fn emit_forward(&mut self, instr: Instr) -> Fixup {
        if instr.is_terminator() {
            self.reachable = false;
        }
        self.buffer.emit_forward(instr)
    }

    fn jump_forward(&mut self) -> Fixup {
        self.reachable = false;
        self.buffer.emit_jump_forward()
    }

    fn jump_to(&mut self, position: usize) {
        self.reachable = false;
        self.buffer.emit_jump_to(position);
    }

    /// Patch `fixups` to the next instruction; it becomes reachable if any
    /// jump lands there.
    fn patch_here(&mut self, fixups: Vec<Fixup>) -> Result<()> {
        if !fixups.is_empty() {
            self.reachable = true;
        }
        self.buffer.backpatch_here(fixups)
    }

    /// Position of a jump target placed here.
    fn place_target(&mut self) -> usize {
        self.reachable = true;
        self.buffer.position()
    }

    fn new_temp(&mut self) -> IrObject {
        let id = TempId(self.next_temp);
        self.next_temp += 1;
        IrObject::Temp(id)
    }

    // ==========================================================================
    // Destruction Frames
    // ==========================================================================

    /// Run `body` inside a new destruction frame.
    ///
    /// The frame is popped on every path. On normal exit its objects are
    /// destroyed, unless the end of `body` is unreachable.
    fn in_compound<T>(
        &mut self,
        compound: Option<CompoundId>,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.frames.enter(compound);
        let result = body(self);
        let frame = self.frames.leave()?;
        let value = result?;
        if self.reachable {
            for pending in frame.destruction_order() {
                self.buffer.emit(Instr::Destroy {
                    object: pending.object.clone(),
                    destructor: pending.destructor,
                });
            }
        }
        Ok(value)
    }

    fn emit_destroys(&mut self, objects: Vec<PendingDestroy>) {
        for pending in objects {
            self.buffer.emit(Instr::Destroy {
                object: pending.object,
                destructor: pending.destructor,
            });
        }
    }

    // ==========================================================================
    // Exceptions
    // ==========================================================================

    /// Per-call exception tests are emitted for fallible calls, except in
    /// entry functions.
    fn tests_exceptions(&self) -> bool {
        self.options.exception_checks && !self.function.is_entry
    }

    /// Branch to a new landing pad when the exception code is set.
    fn emit_exception_test(&mut self) {
        let fixup = self.buffer.emit_forward(Instr::TestException {
            target: Target::PENDING,
        });
        self.pads.create(&self.frames, fixup);
    }

    /// Follow a fallible call with an exception test.
    fn after_call(&mut self, can_throw: bool) {
        if can_throw && self.tests_exceptions() {
            self.emit_exception_test();
        }
    }
}
