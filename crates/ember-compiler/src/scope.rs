//! Local scope management for function binding.
//!
//! `LocalScope` tracks the names visible inside a function body:
//! - Parameters, declared at depth 0
//! - Local variables, allocated in the function's [`LocalTable`]
//! - Nested block scopes, with shadowing restored on scope exit

use ember_core::{CompilationError, DataType, Span};
use rustc_hash::FxHashMap;

use crate::bound::{LocalId, LocalTable};

// ============================================================================
// Types
// ============================================================================

/// Storage a name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarStorage {
    Parameter(u32),
    Local(LocalId),
}

/// A name visible in the function body.
#[derive(Debug, Clone)]
pub struct LocalVar {
    pub name: String,
    pub data_type: DataType,
    pub storage: VarStorage,
    /// Scope depth where declared
    pub depth: u32,
    pub span: Span,
}

// ============================================================================
// LocalScope
// ============================================================================

#[derive(Debug, Default)]
pub struct LocalScope {
    variables: FxHashMap<String, LocalVar>,
    /// Current scope depth (0 = parameters)
    scope_depth: u32,
    /// (shadowing depth, name, hidden variable)
    shadowed: Vec<(u32, String, LocalVar)>,
}

impl LocalScope {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Scope Management
    // ==========================================================================

    /// Enter a block.
    pub fn push_scope(&mut self) {
        self.scope_depth += 1;
    }

    /// Leave the current block, forgetting its variables.
    pub fn pop_scope(&mut self) {
        let depth = self.scope_depth;
        self.variables.retain(|_, var| var.depth < depth);

        while let Some((shadowing_depth, _, _)) = self.shadowed.last() {
            if *shadowing_depth != depth {
                break;
            }
            if let Some((_, name, var)) = self.shadowed.pop() {
                self.variables.insert(name, var);
            }
        }

        self.scope_depth = depth.saturating_sub(1);
    }

    pub fn depth(&self) -> u32 {
        self.scope_depth
    }

    // ==========================================================================
    // Declaration
    // ==========================================================================

    /// Declare parameter `index`.
    pub fn declare_param(
        &mut self,
        name: &str,
        index: u32,
        data_type: DataType,
        span: Span,
    ) -> Result<(), CompilationError> {
        self.insert(name, data_type, VarStorage::Parameter(index), span)
    }

    /// Declare a local variable, allocating its slot in `locals`.
    pub fn declare_local(
        &mut self,
        locals: &mut LocalTable,
        name: &str,
        data_type: DataType,
        span: Span,
    ) -> Result<LocalId, CompilationError> {
        if let Some(existing) = self.variables.get(name) {
            if existing.depth == self.scope_depth {
                return Err(redeclaration(name, existing.span, span));
            }
        }
        let id = locals.add_variable(name, data_type);
        self.insert(name, data_type, VarStorage::Local(id), span)?;
        Ok(id)
    }

    fn insert(
        &mut self,
        name: &str,
        data_type: DataType,
        storage: VarStorage,
        span: Span,
    ) -> Result<(), CompilationError> {
        if let Some(existing) = self.variables.get(name) {
            if existing.depth == self.scope_depth {
                return Err(redeclaration(name, existing.span, span));
            }
            self.shadowed
                .push((self.scope_depth, name.to_string(), existing.clone()));
        }
        self.variables.insert(
            name.to_string(),
            LocalVar {
                name: name.to_string(),
                data_type,
                storage,
                depth: self.scope_depth,
                span,
            },
        );
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&LocalVar> {
        self.variables.get(name)
    }
}

fn redeclaration(name: &str, previous: Span, span: Span) -> CompilationError {
    CompilationError::Other {
        message: format!("'{name}' is already declared in this scope (at {previous})"),
        span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::BasicKind;

    fn int() -> DataType {
        DataType::basic(BasicKind::Int)
    }

    #[test]
    fn inner_declaration_shadows_until_scope_exit() {
        let mut scope = LocalScope::new();
        let mut locals = LocalTable::new();
        scope.push_scope();
        let outer = scope
            .declare_local(&mut locals, "x", int(), Span::default())
            .unwrap();

        scope.push_scope();
        let inner = scope
            .declare_local(&mut locals, "x", DataType::bool(), Span::default())
            .unwrap();
        assert_eq!(scope.lookup("x").unwrap().storage, VarStorage::Local(inner));

        scope.pop_scope();
        assert_eq!(scope.lookup("x").unwrap().storage, VarStorage::Local(outer));
        assert_ne!(outer, inner);
    }

    #[test]
    fn redeclaration_in_same_block_fails() {
        let mut scope = LocalScope::new();
        let mut locals = LocalTable::new();
        scope.push_scope();
        scope
            .declare_local(&mut locals, "x", int(), Span::default())
            .unwrap();
        assert!(
            scope
                .declare_local(&mut locals, "x", int(), Span::default())
                .is_err()
        );
        assert_eq!(locals.len(), 1);
    }

    #[test]
    fn locals_may_shadow_parameters() {
        let mut scope = LocalScope::new();
        let mut locals = LocalTable::new();
        scope.declare_param("n", 0, int(), Span::default()).unwrap();
        scope.push_scope();
        scope
            .declare_local(&mut locals, "n", int(), Span::default())
            .unwrap();
        scope.pop_scope();
        assert_eq!(scope.lookup("n").unwrap().storage, VarStorage::Parameter(0));
    }

    #[test]
    fn variables_vanish_with_their_block() {
        let mut scope = LocalScope::new();
        let mut locals = LocalTable::new();
        scope.push_scope();
        scope
            .declare_local(&mut locals, "tmp", int(), Span::default())
            .unwrap();
        scope.pop_scope();
        assert!(scope.lookup("tmp").is_none());
        assert_eq!(scope.depth(), 0);
    }
}
