//! CompilationContext - the binder's view of the registry.
//!
//! Wraps the read-only [`SymbolRegistry`] together with the namespace the
//! current function is declared in, and resolves written type expressions
//! to [`DataType`]s.

use ember_core::{ArrayEntry, CompilationError, DataType, FunctionEntry, Symbol, TypeHash};
use ember_registry::{NodeIndex, ResolutionResult, SymbolRegistry};
use ember_syntax::{TypeBase, TypeExpr};

/// Registry access plus the namespace names are resolved from.
#[derive(Clone, Copy)]
pub struct CompilationContext<'reg> {
    registry: &'reg SymbolRegistry,
    namespace: NodeIndex,
}

impl<'reg> CompilationContext<'reg> {
    /// A context resolving names from the global namespace.
    pub fn new(registry: &'reg SymbolRegistry) -> Self {
        Self {
            registry,
            namespace: registry.root(),
        }
    }

    /// A context resolving names from `namespace`.
    pub fn in_namespace(registry: &'reg SymbolRegistry, namespace: NodeIndex) -> Self {
        Self {
            registry,
            namespace,
        }
    }

    #[inline]
    pub fn registry(&self) -> &'reg SymbolRegistry {
        self.registry
    }

    #[inline]
    pub fn namespace(&self) -> NodeIndex {
        self.namespace
    }

    pub fn function(&self, hash: TypeHash) -> Option<&'reg FunctionEntry> {
        self.registry.get_function(hash)
    }

    /// Source spelling of a type for diagnostics.
    pub fn type_name(&self, ty: &DataType) -> String {
        self.registry.type_name(ty)
    }

    // ==========================================================================
    // Type Resolution
    // ==========================================================================

    /// Resolve a written type to a [`DataType`].
    pub fn resolve_type(&self, ty: &TypeExpr<'_>) -> Result<DataType, CompilationError> {
        let mut resolved = match ty.base {
            TypeBase::Named { scope, name } => {
                if scope.is_empty() {
                    self.resolve_simple_name(name.name, ty)?
                } else {
                    let path: Vec<&str> = scope.iter().map(|s| s.name).collect();
                    match self
                        .registry
                        .resolve_qualified(&path, name.name, self.namespace)
                    {
                        Some(Symbol::Class(hash))
                        | Some(Symbol::Enum(hash))
                        | Some(Symbol::Delegate(hash)) => DataType::simple(hash),
                        Some(Symbol::Typedef { target, .. }) => target,
                        _ => {
                            return Err(CompilationError::UnknownType {
                                name: ty.display_name(),
                                span: ty.span,
                            });
                        }
                    }
                }
            }
            TypeBase::Array { element, size } => {
                let element = self.resolve_type(element)?;
                let hash = ArrayEntry::new(element, size).hash;
                if self.registry.get_array(hash).is_none() {
                    return Err(CompilationError::UnknownType {
                        name: ty.display_name(),
                        span: ty.span,
                    });
                }
                DataType::simple(hash)
            }
        };

        if ty.is_const {
            resolved = resolved.with_const();
        }
        for _ in 0..ty.pointers {
            resolved = resolved.pointer_to();
        }
        Ok(resolved.with_reference(ty.reference))
    }

    fn resolve_simple_name(
        &self,
        name: &str,
        ty: &TypeExpr<'_>,
    ) -> Result<DataType, CompilationError> {
        match self.registry.resolve_type_name(name, self.namespace) {
            ResolutionResult::Found(data_type) => Ok(data_type),
            ResolutionResult::Ambiguous(_) => Err(CompilationError::Other {
                message: format!("type name '{name}' is ambiguous"),
                span: ty.span,
            }),
            ResolutionResult::NotFound => Err(CompilationError::UnknownType {
                name: ty.display_name(),
                span: ty.span,
            }),
        }
    }
}
