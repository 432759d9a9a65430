//! Bound functions and their local tables.

use ember_core::{DataType, Span, TypeHash};

use super::{BoundCompound, BoundExpr, BoundStmt, LocalId};

/// A local variable or compiler-generated temporary.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSlot {
    /// `None` for temporaries.
    pub name: Option<String>,
    pub ty: DataType,
    pub is_temporary: bool,
}

/// Every local slot of one function, indexed by [`LocalId`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalTable {
    slots: Vec<LocalSlot>,
}

impl LocalTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, name: impl Into<String>, ty: DataType) -> LocalId {
        self.push(LocalSlot {
            name: Some(name.into()),
            ty,
            is_temporary: false,
        })
    }

    pub fn add_temporary(&mut self, ty: DataType) -> LocalId {
        self.push(LocalSlot {
            name: None,
            ty,
            is_temporary: true,
        })
    }

    fn push(&mut self, slot: LocalSlot) -> LocalId {
        let id = LocalId(self.slots.len() as u32);
        self.slots.push(slot);
        id
    }

    pub fn get(&self, id: LocalId) -> Option<&LocalSlot> {
        self.slots.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LocalId, &LocalSlot)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (LocalId(i as u32), slot))
    }

    pub fn temporary_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_temporary).count()
    }
}

/// A formal parameter; index 0 of a member function is `this`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParam {
    pub name: Option<String>,
    pub ty: DataType,
    /// Destructor of a by-value class parameter.
    pub destructor: Option<TypeHash>,
}

/// A function ready for emission.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundFunction {
    pub hash: TypeHash,
    pub name: String,
    pub owner: Option<TypeHash>,
    pub params: Vec<BoundParam>,
    pub return_type: DataType,
    pub body: BoundCompound,
    pub locals: LocalTable,
    /// Entry functions check the exception code before returning instead of
    /// after every call.
    pub is_entry: bool,
    /// Number of call sites assigned while binding.
    pub call_sites: u32,
    pub span: Span,
}

impl BoundFunction {
    /// Visit every expression of the body.
    pub fn walk_exprs<'a>(&'a self, visit: &mut impl FnMut(&'a BoundExpr)) {
        for stmt in &self.body.stmts {
            stmt.walk_exprs(visit);
        }
    }

    /// Visit every statement of the body, parents first.
    pub fn walk_stmts<'a>(&'a self, visit: &mut impl FnMut(&'a BoundStmt)) {
        fn walk<'a>(stmt: &'a BoundStmt, visit: &mut impl FnMut(&'a BoundStmt)) {
            visit(stmt);
            for child in stmt.substatements() {
                walk(child, visit);
            }
        }
        for stmt in &self.body.stmts {
            walk(stmt, visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::BasicKind;

    #[test]
    fn local_ids_are_dense() {
        let mut table = LocalTable::new();
        let a = table.add_variable("a", DataType::basic(BasicKind::Int));
        let t = table.add_temporary(DataType::bool());
        assert_eq!(a, LocalId(0));
        assert_eq!(t, LocalId(1));
        assert_eq!(table.len(), 2);
        assert_eq!(table.temporary_count(), 1);
        assert_eq!(table.get(a).and_then(|s| s.name.as_deref()), Some("a"));
    }
}
