//! Integration tests for the expression and statement binder.

mod test_harness;

use bumpalo::Bump;
use ember::compiler::bound::{CallSiteId, Dispatch, ExprFlags, LocalInit};
use ember::core::{EnumEntry, RefKind};
use ember::prelude::*;
use test_harness::*;

/// `bool name(int a, int b) { return <expr>; }`
fn compare_fn<'ast>(
    b: &SyntaxBuilder<'ast>,
    name: &str,
    op: BinaryOp,
    left: &str,
    right: &str,
) -> FunctionDecl<'ast> {
    let body = b.block(&[b.ret(Some(b.binary(op, b.ident(left), b.ident(right))))]);
    b.function(
        name,
        &[(b.ty("int"), "a"), (b.ty("int"), "b")],
        Some(b.ty("bool")),
        body,
    )
}

/// `bool name(int a, int b) { return !(<left> op <right>); }`
fn negated_fn<'ast>(
    b: &SyntaxBuilder<'ast>,
    name: &str,
    op: BinaryOp,
    left: &str,
    right: &str,
) -> FunctionDecl<'ast> {
    let inner = b.paren(b.binary(op, b.ident(left), b.ident(right)));
    let body = b.block(&[b.ret(Some(b.unary(UnaryOp::Not, inner)))]);
    b.function(
        name,
        &[(b.ty("int"), "a"), (b.ty("int"), "b")],
        Some(b.ty("bool")),
        body,
    )
}

fn return_shape(fixture: &Fixture, decl: &FunctionDecl<'_>) -> BoundExpr {
    let bound = fixture.bind(decl);
    returned(stmt(&bound, 0)).without_spans()
}

// ============================================================================
// Comparison Rewrites
// ============================================================================

#[test]
fn greater_binds_as_swapped_less() {
    let fixture = Fixture::new();
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);

    let written = compare_fn(&b, "gt", BinaryOp::Greater, "a", "b");
    let expected = compare_fn(&b, "lt", BinaryOp::Less, "b", "a");
    assert_eq!(
        return_shape(&fixture, &written),
        return_shape(&fixture, &expected)
    );
}

#[test]
fn less_equal_binds_as_negated_swapped_less() {
    let fixture = Fixture::new();
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);

    let written = compare_fn(&b, "le", BinaryOp::LessEqual, "a", "b");
    let expected = negated_fn(&b, "not_lt", BinaryOp::Less, "b", "a");
    assert_eq!(
        return_shape(&fixture, &written),
        return_shape(&fixture, &expected)
    );
}

#[test]
fn greater_equal_binds_as_negated_less() {
    let fixture = Fixture::new();
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);

    let written = compare_fn(&b, "ge", BinaryOp::GreaterEqual, "a", "b");
    let expected = negated_fn(&b, "not_lt", BinaryOp::Less, "a", "b");
    assert_eq!(
        return_shape(&fixture, &written),
        return_shape(&fixture, &expected)
    );
}

#[test]
fn not_equal_binds_as_negated_equal() {
    let fixture = Fixture::new();
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);

    let written = compare_fn(&b, "ne", BinaryOp::NotEqual, "a", "b");
    let expected = negated_fn(&b, "not_eq", BinaryOp::Equal, "a", "b");
    assert_eq!(
        return_shape(&fixture, &written),
        return_shape(&fixture, &expected)
    );
}

#[test]
fn int_equality_uses_basic_operator_without_conversions() {
    let fixture = Fixture::new();
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);

    let bound = fixture.bind(&compare_fn(&b, "eq", BinaryOp::Equal, "a", "b"));
    let value = returned(stmt(&bound, 0));
    assert_eq!(value.ty, DataType::bool());
    let BoundExprKind::Binary {
        function,
        left,
        right,
    } = &value.kind
    else {
        panic!("expected a binary operator, got {:?}", value.kind);
    };
    assert_eq!(function.name, "operator==");
    assert_eq!(function.intrinsic, Some(IntrinsicOp::Equal));
    assert!(matches!(left.kind, BoundExprKind::Parameter(0)));
    assert!(matches!(right.kind, BoundExprKind::Parameter(1)));
}

#[test]
fn int_inequality_wraps_equality_in_not() {
    let fixture = Fixture::new();
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);

    let bound = fixture.bind(&compare_fn(&b, "ne", BinaryOp::NotEqual, "a", "b"));
    let value = returned(stmt(&bound, 0));
    let BoundExprKind::Unary { function, operand } = &value.kind else {
        panic!("expected a unary operator, got {:?}", value.kind);
    };
    assert_eq!(function.intrinsic, Some(IntrinsicOp::Not));
    assert_eq!(value.ty, DataType::bool());
    assert!(matches!(
        &operand.kind,
        BoundExprKind::Binary { function, .. } if function.intrinsic == Some(IntrinsicOp::Equal)
    ));
}

// ============================================================================
// Argument Passing
// ============================================================================

fn call_arg(stmt: &BoundStmt) -> &BoundExpr {
    match stmt {
        BoundStmt::Expr(BoundExpr {
            kind: BoundExprKind::Call { args, .. },
            ..
        }) => &args[0],
        other => panic!("expected a call statement, got {other:?}"),
    }
}

#[test]
fn const_ref_literal_gets_one_temporary_per_call() {
    let fixture = Fixture::new();
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);

    let call = || b.expr_stmt(b.call(b.ident("take"), &[b.int(1)]));
    let body = b.block(&[call(), call()]);
    let bound = fixture.bind(&b.function("twice", &[], None, body));

    assert_eq!(bound.locals.temporary_count(), 2);
    let mut temporaries = Vec::new();
    for n in 0..2 {
        let arg = call_arg(stmt(&bound, n));
        assert!(
            arg.flags
                .contains(ExprFlags::ARG_BY_REF | ExprFlags::ARG_IS_TEMPORARY)
        );
        let BoundExprKind::Temporary { local, init } = &arg.kind else {
            panic!("expected a temporary, got {:?}", arg.kind);
        };
        assert_eq!(init.constant().and_then(ConstantValue::as_i128), Some(1));
        temporaries.push(*local);
    }
    assert_ne!(temporaries[0], temporaries[1]);
}

#[test]
fn const_ref_computed_value_gets_a_temporary() {
    let fixture = Fixture::new();
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);

    let sum = b.binary(BinaryOp::Add, b.ident("x"), b.int(2));
    let body = b.block(&[b.expr_stmt(b.call(b.ident("take"), &[sum]))]);
    let bound = fixture.bind(&b.function("computed", &[(b.ty("int"), "x")], None, body));

    assert_eq!(bound.locals.temporary_count(), 1);
    let arg = call_arg(stmt(&bound, 0));
    let BoundExprKind::Temporary { init, .. } = &arg.kind else {
        panic!("expected a temporary, got {:?}", arg.kind);
    };
    assert!(matches!(init.kind, BoundExprKind::Binary { .. }));
}

#[test]
fn const_ref_lvalue_is_passed_directly() {
    let fixture = Fixture::new();
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);

    let body = b.block(&[b.expr_stmt(b.call(b.ident("take"), &[b.ident("x")]))]);
    let bound = fixture.bind(&b.function("direct", &[(b.ty("int"), "x")], None, body));

    assert_eq!(bound.locals.temporary_count(), 0);
    let arg = call_arg(stmt(&bound, 0));
    assert!(matches!(arg.kind, BoundExprKind::Parameter(0)));
    assert!(arg.flags.contains(ExprFlags::ARG_BY_REF));
}

// ============================================================================
// Calls
// ============================================================================

#[test]
fn virtual_method_through_pointer_dispatches_virtually() {
    let fixture = Fixture::new();
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);

    let call = b.call(b.arrow(b.ident("p"), "f"), &[]);
    let body = b.block(&[b.expr_stmt(call)]);
    let bound = fixture.bind(&b.function("poke", &[(b.ty("A").pointer(), "p")], None, body));

    match stmt(&bound, 0) {
        BoundStmt::Expr(BoundExpr {
            kind:
                BoundExprKind::Call {
                    function,
                    args,
                    site,
                    dispatch,
                },
            ..
        }) => {
            assert_eq!(function.hash, fixture.a_f);
            assert_eq!(*dispatch, Dispatch::Virtual);
            assert_eq!(*site, CallSiteId(0));
            assert_eq!(args.len(), 1);
        }
        other => panic!("expected a call, got {other:?}"),
    }
    assert_eq!(bound.call_sites, 1);
}

#[test]
fn call_sites_are_numbered_in_binding_order() {
    let fixture = Fixture::new();
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);

    let call = || b.expr_stmt(b.call(b.ident("may_fail"), &[]));
    let body = b.block(&[call(), call(), call()]);
    let bound = fixture.bind(&b.function("thrice", &[], None, body));

    let mut sites = Vec::new();
    bound.walk_exprs(&mut |e| {
        if let BoundExprKind::Call { site, .. } = &e.kind {
            sites.push(*site);
        }
    });
    assert_eq!(sites, vec![CallSiteId(0), CallSiteId(1), CallSiteId(2)]);
    assert_eq!(bound.call_sites, 3);
}

// ============================================================================
// Statements
// ============================================================================

#[test]
fn class_local_records_its_destructor() {
    let fixture = Fixture::new();
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);

    let body = b.block(&[b.var(b.ty("Res"), "r", None), b.var(b.ty("int"), "n", None)]);
    let bound = fixture.bind(&b.function("locals", &[], None, body));

    let BoundStmt::LocalInit(r) = stmt(&bound, 0) else {
        panic!("expected a local declaration");
    };
    assert_eq!(r.destructor, Some(fixture.res_dtor));
    assert!(matches!(r.init, LocalInit::Default));

    let BoundStmt::LocalInit(n) = stmt(&bound, 1) else {
        panic!("expected a local declaration");
    };
    assert_eq!(n.destructor, None);
}

#[test]
fn logical_condition_is_marked_for_jumping_code() {
    let fixture = Fixture::new();
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);

    let condition = b.binary(BinaryOp::LogicalAnd, b.ident("x"), b.ident("y"));
    let body = b.block(&[b.if_(condition, b.ret(None), None)]);
    let decl = b.function("both", &[(b.ty("bool"), "x"), (b.ty("bool"), "y")], None, body);
    let bound = fixture.bind(&decl);

    let BoundStmt::If { condition, .. } = stmt(&bound, 0) else {
        panic!("expected an if statement");
    };
    let BoundExprKind::Conjunction { left, right, .. } = &condition.kind else {
        panic!("expected a conjunction, got {:?}", condition.kind);
    };
    for expr in [condition, &**left, &**right] {
        assert!(expr.flags.contains(ExprFlags::GEN_JUMPING_BOOL_CODE));
    }
}

#[test]
fn greater_in_condition_still_binds_to_less() {
    let fixture = Fixture::new();
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);

    let condition = b.binary(BinaryOp::Greater, b.ident("x"), b.int(0));
    let body = b.block(&[b.if_(condition, b.ret(None), None)]);
    let bound = fixture.bind(&b.function("positive", &[(b.ty("int"), "x")], None, body));

    let BoundStmt::If { condition, .. } = stmt(&bound, 0) else {
        panic!("expected an if statement");
    };
    let BoundExprKind::Binary { function, left, .. } = &condition.kind else {
        panic!("expected a binary operator, got {:?}", condition.kind);
    };
    assert_eq!(function.intrinsic, Some(IntrinsicOp::Less));
    assert_eq!(left.constant().and_then(ConstantValue::as_i128), Some(0));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn break_outside_loop_is_rejected() {
    let fixture = Fixture::new();
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);

    let decl = b.function("stray", &[], None, b.block(&[b.break_()]));
    assert!(matches!(
        fixture.compile_err(&decl),
        CompilationError::InvalidControlFlow { .. }
    ));
}

#[test]
fn unknown_name_is_reported() {
    let fixture = Fixture::new();
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);

    let body = b.block(&[b.expr_stmt(b.ident("missing"))]);
    let err = fixture.compile_err(&b.function("lost", &[], None, body));
    assert!(matches!(err, CompilationError::UnknownSymbol { ref name, .. } if name == "missing"));
    assert!(!err.is_fatal());
}

#[test]
fn failed_function_does_not_stop_the_unit() {
    let fixture = Fixture::new();
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);

    let broken = b.function("broken", &[], None, b.block(&[b.continue_()]));
    let fine = b.function("fine", &[], None, b.block(&[]));
    let unit = Compiler::new(&fixture.registry, CompilerOptions::default())
        .compile(&[broken, fine])
        .unwrap();

    assert_eq!(unit.errors.len(), 1);
    assert_eq!(unit.functions.len(), 1);
    assert!(unit.function("fine").is_some());
}

#[test]
fn arrow_through_operator_returning_a_value_is_rejected() {
    let mut fixture = Fixture::new();
    let handle = fixture
        .registry
        .register_class(ClassEntry::new("Handle"))
        .unwrap();
    fixture
        .registry
        .register_function(FunctionEntry::method(handle, "operator->", Vec::new(), int()))
        .unwrap();
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);

    // void peek(Handle h) { h->x; }
    let body = b.block(&[b.expr_stmt(b.arrow(b.ident("h"), "x"))]);
    let err = fixture.compile_err(&b.function("peek", &[(b.ty("Handle"), "h")], None, body));

    let CompilationError::WrongOperandCategory { message, .. } = &err else {
        panic!("expected a wrong operand category, got {err:?}");
    };
    assert!(message.contains("Handle"), "{message}");
    assert!(!err.is_fatal());
}

#[test]
fn postfix_through_user_operator_is_a_located_error() {
    let mut fixture = Fixture::new();
    let color = fixture
        .registry
        .register_enum(&[] as &[&str], EnumEntry::new("Color", BasicKind::Int))
        .unwrap();
    let color_ref = DataType::simple(color).with_reference(RefKind::LValue);
    fixture
        .registry
        .register_function(FunctionEntry::free(
            "operator++",
            vec![Param::new("c", color_ref)],
            color_ref,
        ))
        .unwrap();
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);

    // void bump() { Color c; c++; }
    let body = b.block(&[
        b.var(b.ty("Color"), "c", None),
        b.expr_stmt(b.at(3, 5).postfix(b.ident("c"), PostfixOp::Inc)),
    ]);
    let err = fixture.compile_err(&b.function("bump", &[], None, body));

    assert!(matches!(err, CompilationError::TypeMismatch { .. }), "{err:?}");
    assert!(!err.is_fatal());
    assert_eq!(err.span().line, 3);
}
