//! Performance benchmarks for the bind and emit pipeline.
//!
//! This benchmark suite measures compilation across different workloads:
//! - Size-based: 1 to 500 generated functions
//! - Feature-specific: destructor-heavy scopes, switches, virtual calls
//!
//! ## Profiling with Puffin
//!
//! Run with the `profile-with-puffin` feature to collect per-phase timings:
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- --profile-time 5
//! ```

use bumpalo::Bump;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use ember::compiler::bound::CallSiteId;
use ember::prelude::*;
use std::hint::black_box;

#[cfg(feature = "profile-with-puffin")]
static FRAME_VIEW: std::sync::OnceLock<puffin::GlobalFrameView> = std::sync::OnceLock::new();

#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
    FRAME_VIEW.get_or_init(puffin::GlobalFrameView::default);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

/// Call at the end of each benchmark iteration to flush profiling data.
#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

/// Registry with a destructible class, a small virtual hierarchy and a
/// fallible free function. Also returns the `Circle` class.
fn registry() -> (SymbolRegistry, TypeHash) {
    let mut registry = SymbolRegistry::with_basic_types();
    let res = registry.register_class(ClassEntry::new("Res")).unwrap();
    registry
        .register_function(FunctionEntry::destructor(res))
        .unwrap();

    let shape = registry.register_class(ClassEntry::new("Shape")).unwrap();
    let circle = registry
        .register_class(ClassEntry::new("Circle").with_base(shape))
        .unwrap();
    let area = |owner| FunctionEntry::method(owner, "area", Vec::new(), DataType::basic(BasicKind::Int));
    registry
        .register_function(area(shape).with_traits(FunctionTraits::VIRTUAL))
        .unwrap();
    registry.register_function(area(circle)).unwrap();

    registry
        .register_function(FunctionEntry::free("may_fail", Vec::new(), DataType::void()))
        .unwrap();
    (registry, circle)
}

/// ```text
/// int work(int n, bool go) {
///     Res outer;
///     int total = 0;
///     while (go && n > 0) {
///         Res step;
///         total = total + n;
///         n = n - 1;
///         may_fail();
///     }
///     switch (n) { case 0: break; case 1: case 2: total = total + 1; break; default: break; }
///     return total;
/// }
/// ```
fn work<'ast>(b: &SyntaxBuilder<'ast>, name: &str) -> FunctionDecl<'ast> {
    let int = || b.ty("int");
    let loop_body = b.block_stmt(&[
        b.var(b.ty("Res"), "step", None),
        b.assign(
            b.ident("total"),
            b.binary(BinaryOp::Add, b.ident("total"), b.ident("n")),
        ),
        b.assign(b.ident("n"), b.binary(BinaryOp::Sub, b.ident("n"), b.int(1))),
        b.expr_stmt(b.call(b.ident("may_fail"), &[])),
    ]);
    let condition = b.binary(
        BinaryOp::LogicalAnd,
        b.ident("go"),
        b.binary(BinaryOp::Greater, b.ident("n"), b.int(0)),
    );
    let cases = [
        b.case(&[b.int(0)], &[b.break_()]),
        b.case(
            &[b.int(1), b.int(2)],
            &[
                b.assign(
                    b.ident("total"),
                    b.binary(BinaryOp::Add, b.ident("total"), b.int(1)),
                ),
                b.break_(),
            ],
        ),
        b.default_case(&[b.break_()]),
    ];
    let body = b.block(&[
        b.var(b.ty("Res"), "outer", None),
        b.var(int(), "total", Some(b.int(0))),
        b.while_(condition, loop_body),
        b.switch(b.ident("n"), &cases),
        b.ret(Some(b.ident("total"))),
    ]);
    b.function(name, &[(int(), "n"), (b.ty("bool"), "go")], Some(int()), body)
}

/// `int measure(Shape* s) { return s->area(); }`
fn measure<'ast>(b: &SyntaxBuilder<'ast>) -> FunctionDecl<'ast> {
    let call = b.call(b.arrow(b.ident("s"), "area"), &[]);
    b.function(
        "measure",
        &[(b.ty("Shape").pointer(), "s")],
        Some(b.ty("int")),
        b.block(&[b.ret(Some(call))]),
    )
}

fn compile_generated(registry: &SymbolRegistry, count: usize) -> usize {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let decls: Vec<_> = (0..count).map(|i| work(&b, &format!("work{i}"))).collect();
    let unit = Compiler::new(registry, CompilerOptions::default())
        .compile(black_box(&decls))
        .unwrap();
    end_profiling_frame();
    unit.functions.len()
}

/// Benchmark compilation across unit sizes.
fn size_based_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let (registry, _) = registry();

    let mut group = c.benchmark_group("compile/unit_sizes");
    for count in [1usize, 50, 500] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_function(format!("functions_{count}"), |b| {
            b.iter(|| black_box(compile_generated(&registry, count)));
        });
    }
    group.finish();
}

/// Benchmark the individual phases and devirtualization.
fn feature_specific_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let (registry, circle) = registry();
    let options = CompilerOptions::default();

    let mut group = c.benchmark_group("compile/features");

    group.bench_function("bind_only", |bench| {
        bench.iter(|| {
            let arena = Bump::new();
            let b = SyntaxBuilder::new(&arena);
            let decl = work(&b, "work");
            let bound = bind_function(&registry, &options, black_box(&decl)).unwrap();
            end_profiling_frame();
            black_box(bound.locals.len())
        });
    });

    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let bound = bind_function(&registry, &options, &work(&b, "work")).unwrap();
    group.bench_function("emit_only", |bench| {
        bench.iter(|| {
            let emitted = emit_function(&registry, &options, None, black_box(&bound)).unwrap();
            end_profiling_frame();
            black_box(emitted.instructions.len())
        });
    });

    let mut reaching = ReachingClassMap::default();
    reaching.insert(CallSiteId(0), vec![circle]);
    let decl = measure(&b);
    group.bench_function("devirtualized_call", |bench| {
        bench.iter(|| {
            let unit = Compiler::new(&registry, CompilerOptions::default())
                .with_reaching_classes("measure", reaching.clone())
                .compile(std::slice::from_ref(black_box(&decl)))
                .unwrap();
            end_profiling_frame();
            black_box(unit.functions.len())
        });
    });

    group.finish();
}

criterion_group!(benches, size_based_benchmarks, feature_specific_benchmarks);
criterion_main!(benches);
