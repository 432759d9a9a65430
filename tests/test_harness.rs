// tests/test_harness.rs
//! Test harness infrastructure for the binder and emitter integration tests
//!
//! This module provides a registry fixture with the classes and functions the
//! tests compile against, plus helpers for inspecting bound and emitted
//! functions.

#![allow(dead_code)]

use ember::core::RefKind;
use ember::prelude::*;

/// Registry fixture shared by the integration tests.
///
/// - `Res`: a class with a destructor and no constructors
/// - `Err`: a plain class thrown and caught by pointer
/// - `A`, `B : A`, `C : B`, `D : A`: `A::f` is virtual, `B` and `D`
///   override it
/// - `may_fail()`: a free function that can throw
/// - `take(const int&)`, `set(int&)`: reference parameters
pub struct Fixture {
    pub registry: SymbolRegistry,
    pub res: TypeHash,
    pub res_dtor: TypeHash,
    pub err: TypeHash,
    pub a: TypeHash,
    pub b: TypeHash,
    pub c: TypeHash,
    pub d: TypeHash,
    pub a_f: TypeHash,
    pub b_f: TypeHash,
    pub d_f: TypeHash,
    pub may_fail: TypeHash,
    pub take: TypeHash,
}

impl Fixture {
    pub fn new() -> Self {
        let mut registry = SymbolRegistry::with_basic_types();

        let res = registry.register_class(ClassEntry::new("Res")).unwrap();
        let res_dtor = registry
            .register_function(FunctionEntry::destructor(res))
            .unwrap();
        let err = registry.register_class(ClassEntry::new("Err")).unwrap();

        let a = registry.register_class(ClassEntry::new("A")).unwrap();
        let b = registry
            .register_class(ClassEntry::new("B").with_base(a))
            .unwrap();
        let c = registry
            .register_class(ClassEntry::new("C").with_base(b))
            .unwrap();
        let d = registry
            .register_class(ClassEntry::new("D").with_base(a))
            .unwrap();
        let method = |owner| FunctionEntry::method(owner, "f", Vec::new(), DataType::void());
        let a_f = registry
            .register_function(method(a).with_traits(FunctionTraits::VIRTUAL))
            .unwrap();
        let b_f = registry.register_function(method(b)).unwrap();
        let d_f = registry.register_function(method(d)).unwrap();

        let may_fail = registry
            .register_function(FunctionEntry::free("may_fail", Vec::new(), DataType::void()))
            .unwrap();
        let const_int_ref = int().with_const().with_reference(RefKind::LValue);
        let take = registry
            .register_function(FunctionEntry::free(
                "take",
                vec![Param::new("v", const_int_ref)],
                DataType::void(),
            ))
            .unwrap();
        registry
            .register_function(FunctionEntry::free(
                "set",
                vec![Param::new("v", int().with_reference(RefKind::LValue))],
                DataType::void(),
            ))
            .unwrap();

        Self {
            registry,
            res,
            res_dtor,
            err,
            a,
            b,
            c,
            d,
            a_f,
            b_f,
            d_f,
            may_fail,
            take,
        }
    }

    /// Bind one declaration with default options.
    pub fn bind(&self, decl: &FunctionDecl<'_>) -> BoundFunction {
        bind_function(&self.registry, &CompilerOptions::default(), decl)
            .unwrap_or_else(|e| panic!("binding {} failed: {e}", decl.display_name()))
    }

    /// Bind and emit one declaration with default options.
    pub fn compile(&self, decl: &FunctionDecl<'_>) -> EmittedFunction {
        self.compile_with(CompilerOptions::default(), decl)
    }

    pub fn compile_with(&self, options: CompilerOptions, decl: &FunctionDecl<'_>) -> EmittedFunction {
        let unit = Compiler::new(&self.registry, options)
            .compile(std::slice::from_ref(decl))
            .unwrap();
        assert_success(&unit);
        unit.functions.into_iter().next().unwrap()
    }

    /// The error compiling `decl` records.
    pub fn compile_err(&self, decl: &FunctionDecl<'_>) -> CompilationError {
        let unit = Compiler::new(&self.registry, CompilerOptions::default())
            .compile(std::slice::from_ref(decl))
            .unwrap();
        assert!(
            unit.functions.is_empty(),
            "expected {} to fail, but it compiled",
            decl.display_name()
        );
        assert_eq!(unit.errors.len(), 1, "errors: {:?}", unit.errors);
        unit.errors.into_iter().next().unwrap()
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

pub fn int() -> DataType {
    DataType::basic(BasicKind::Int)
}

/// Assert that a unit compiled with no errors
pub fn assert_success(unit: &CompiledUnit) {
    if !unit.is_success() {
        for err in &unit.errors {
            eprintln!("{:?}", err.to_diagnostic());
        }
        panic!(
            "Expected successful compilation, but got {} errors",
            unit.errors.len()
        );
    }
}

/// The `n`-th statement of the function body.
pub fn stmt(function: &BoundFunction, n: usize) -> &BoundStmt {
    &function.body.stmts[n]
}

/// The value of a `return value;` statement.
pub fn returned(stmt: &BoundStmt) -> &BoundExpr {
    match stmt {
        BoundStmt::Return {
            value: Some(value), ..
        } => value,
        other => panic!("expected a return with a value, got {other:?}"),
    }
}

/// The slot of the named local variable.
pub fn local(function: &EmittedFunction, name: &str) -> IrObject {
    function
        .locals
        .iter()
        .find(|(_, slot)| slot.name.as_deref() == Some(name))
        .map(|(id, _)| IrObject::Local(id))
        .unwrap_or_else(|| panic!("no local named {name}"))
}

/// Objects destroyed by the given instructions, in order.
pub fn destroyed(instrs: &[Instr]) -> Vec<IrObject> {
    instrs
        .iter()
        .filter_map(|i| match i {
            Instr::Destroy { object, .. } => Some(object.clone()),
            _ => None,
        })
        .collect()
}

/// Count the instructions matching `pred`.
pub fn count(instrs: &[Instr], pred: impl Fn(&Instr) -> bool) -> usize {
    instrs.iter().filter(|i| pred(i)).count()
}

/// Every branch target is resolved and inside the function.
pub fn assert_targets_resolved(function: &EmittedFunction) {
    for (index, instr) in function.instructions.iter().enumerate() {
        if let Some(target) = instr.target() {
            let to = target
                .index()
                .unwrap_or_else(|| panic!("unresolved target at {index}: {instr:?}"));
            assert!(
                to <= function.instructions.len(),
                "target {to} of instruction {index} is out of range"
            );
        }
    }
}
