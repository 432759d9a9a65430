//! Ember Compiler
//!
//! Semantic core of the ember compiler: binds untyped syntax trees against a
//! [`SymbolRegistry`] and lowers the bound functions into instructions.
//!
//! ## Architecture
//!
//! - **Binding**: resolve names, overloads and conversions, producing one
//!   [`BoundFunction`] per declaration
//! - **Emission**: lower each bound function into an [`EmittedFunction`],
//!   with destructor calls, landing pads and devirtualized calls
//!
//! ## Modules
//!
//! - [`args`]: Argument-passing rules applied after overload resolution
//! - [`binder`]: Expression and statement binder
//! - [`bound`]: The bound tree
//! - [`context`]: Registry access with namespace-aware type resolution
//! - [`conversion`]: Conversion search and costs
//! - [`emit`]: Function emitter, destruction frames, landing pads
//! - [`options`]: Compiler configuration
//! - [`overload`]: Overload resolution for calls and operators
//! - [`scope`]: Local scopes of the function being bound

pub mod args;
pub mod binder;
pub mod bound;
pub mod context;
pub mod conversion;
pub mod emit;
pub mod options;
pub mod overload;
pub mod scope;

pub use args::{TemporaryAllocator, prepare_arguments};
pub use binder::{Binder, bind_function, fold_constant};
pub use bound::{BoundExpr, BoundExprKind, BoundFunction, BoundStmt, CallSiteId, CompoundId, LocalId};
pub use context::CompilationContext;
pub use conversion::{ArgDesc, Conversion, ConversionKind, find_conversion};
pub use emit::{
    EmittedFunction, FunctionEmitter, Instr, IrObject, LandingPadBlock, ReachingClassMap,
    emit_function, try_devirtualize,
};
pub use options::CompilerOptions;
pub use overload::{OverloadMatch, resolve};
pub use scope::LocalScope;

// Re-export CompilationError from core for convenience
pub use ember_core::CompilationError;

use ember_registry::SymbolRegistry;
use ember_syntax::FunctionDecl;
use rustc_hash::FxHashMap;

/// The functions of one compile unit.
#[derive(Debug, Default)]
pub struct CompiledUnit {
    /// Functions that bound and emitted cleanly, in declaration order.
    pub functions: Vec<EmittedFunction>,
    /// Recoverable errors; each one abandoned the function it occurred in.
    pub errors: Vec<CompilationError>,
}

impl CompiledUnit {
    /// Check if compilation succeeded (no errors).
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn function(&self, name: &str) -> Option<&EmittedFunction> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// Compile-unit driver.
///
/// Binding and emission errors are recorded per function and compilation
/// moves on to the next declaration. Internal-consistency failures stop the
/// driver and are returned as `Err`.
pub struct Compiler<'reg> {
    registry: &'reg SymbolRegistry,
    options: CompilerOptions,
    /// Reaching classes per function, keyed by display name
    reaching: FxHashMap<String, ReachingClassMap>,
}

impl<'reg> Compiler<'reg> {
    pub fn new(registry: &'reg SymbolRegistry, options: CompilerOptions) -> Self {
        Self {
            registry,
            options,
            reaching: FxHashMap::default(),
        }
    }

    /// Supply the reaching-class analysis result of function `name`
    /// (`ns::Class::method` form).
    pub fn with_reaching_classes(mut self, name: impl Into<String>, map: ReachingClassMap) -> Self {
        self.reaching.insert(name.into(), map);
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile every declaration of a unit.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(&self, decls: &[FunctionDecl<'_>]) -> Result<CompiledUnit, CompilationError> {
        let mut unit = CompiledUnit::default();
        for decl in decls {
            match self.compile_function(decl) {
                Ok(function) => unit.functions.push(function),
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    tracing::debug!(
                        function = %decl.display_name(),
                        %error,
                        "abandoned function"
                    );
                    unit.errors.push(error);
                }
            }
        }
        tracing::debug!(
            functions = unit.functions.len(),
            errors = unit.errors.len(),
            "compiled unit"
        );
        Ok(unit)
    }

    /// Bind and emit one declaration.
    pub fn compile_function(
        &self,
        decl: &FunctionDecl<'_>,
    ) -> Result<EmittedFunction, CompilationError> {
        let bound = bind_function(self.registry, &self.options, decl)?;
        let reaching = self.reaching.get(&decl.display_name());
        emit_function(self.registry, &self.options, reaching, &bound)
    }
}
