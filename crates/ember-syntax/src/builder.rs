//! Programmatic construction of syntax trees.
//!
//! Every node gets a distinct span: the builder hands out consecutive
//! columns on the current line, and [`SyntaxBuilder::at`] moves the cursor
//! when a test needs a specific position.

use std::cell::Cell;

use bumpalo::Bump;
use ember_core::{CONSTRUCTOR_NAME, DESTRUCTOR_NAME, Span};

use crate::ast::*;

/// Builds arena-allocated syntax nodes.
pub struct SyntaxBuilder<'ast> {
    arena: &'ast Bump,
    line: Cell<u32>,
    col: Cell<u32>,
}

impl<'ast> SyntaxBuilder<'ast> {
    pub fn new(arena: &'ast Bump) -> Self {
        Self {
            arena,
            line: Cell::new(1),
            col: Cell::new(1),
        }
    }

    /// The arena nodes are allocated in.
    pub fn arena(&self) -> &'ast Bump {
        self.arena
    }

    /// Move the span cursor.
    pub fn at(&self, line: u32, col: u32) -> &Self {
        self.line.set(line);
        self.col.set(col);
        self
    }

    /// Next span; advances the cursor by one column.
    pub fn span(&self) -> Span {
        let col = self.col.get();
        self.col.set(col + 1);
        Span::new(self.line.get(), col, 1)
    }

    pub fn name(&self, name: &str) -> Ident<'ast> {
        Ident::new(self.arena.alloc_str(name), self.span())
    }

    fn idents(&self, path: &[&str]) -> &'ast [Ident<'ast>] {
        let idents: Vec<Ident<'ast>> = path.iter().map(|p| self.name(p)).collect();
        self.arena.alloc_slice_copy(&idents)
    }

    fn exprs(&self, exprs: &[Expr<'ast>]) -> &'ast [Expr<'ast>] {
        self.arena.alloc_slice_copy(exprs)
    }

    // ========================================================================
    // Literals and Names
    // ========================================================================

    fn literal(&self, kind: LiteralKind<'ast>) -> Expr<'ast> {
        Expr::Literal(LiteralExpr {
            kind,
            span: self.span(),
        })
    }

    pub fn int(&self, value: u64) -> Expr<'ast> {
        self.literal(LiteralKind::Int {
            value,
            unsigned: false,
        })
    }

    /// Integer literal with a `u` suffix.
    pub fn uint(&self, value: u64) -> Expr<'ast> {
        self.literal(LiteralKind::Int {
            value,
            unsigned: true,
        })
    }

    pub fn float(&self, value: f32) -> Expr<'ast> {
        self.literal(LiteralKind::Float(value))
    }

    pub fn double(&self, value: f64) -> Expr<'ast> {
        self.literal(LiteralKind::Double(value))
    }

    pub fn boolean(&self, value: bool) -> Expr<'ast> {
        self.literal(LiteralKind::Bool(value))
    }

    pub fn char_lit(&self, value: u8) -> Expr<'ast> {
        self.literal(LiteralKind::Char(value))
    }

    pub fn string(&self, value: &str) -> Expr<'ast> {
        let bytes = self.arena.alloc_slice_copy(value.as_bytes());
        self.literal(LiteralKind::String(bytes))
    }

    pub fn null(&self) -> Expr<'ast> {
        self.literal(LiteralKind::Null)
    }

    pub fn ident(&self, name: &str) -> Expr<'ast> {
        self.qualified(&[], name)
    }

    /// `a::b::name`
    pub fn qualified(&self, scope: &[&str], name: &str) -> Expr<'ast> {
        let scope = self.idents(scope);
        let ident = self.name(name);
        Expr::Ident(IdentExpr {
            scope,
            ident,
            span: ident.span,
        })
    }

    pub fn this(&self) -> Expr<'ast> {
        Expr::This(self.span())
    }

    pub fn base(&self) -> Expr<'ast> {
        Expr::Base(self.span())
    }

    pub fn exception_code(&self) -> Expr<'ast> {
        Expr::ExceptionCode(self.span())
    }

    // ========================================================================
    // Operators
    // ========================================================================

    pub fn binary(&self, op: BinaryOp, left: Expr<'ast>, right: Expr<'ast>) -> Expr<'ast> {
        Expr::Binary(self.arena.alloc(BinaryExpr {
            left,
            op,
            right,
            span: self.span(),
        }))
    }

    pub fn unary(&self, op: UnaryOp, operand: Expr<'ast>) -> Expr<'ast> {
        Expr::Unary(self.arena.alloc(UnaryExpr {
            op,
            operand,
            span: self.span(),
        }))
    }

    pub fn postfix(&self, operand: Expr<'ast>, op: PostfixOp) -> Expr<'ast> {
        Expr::Postfix(self.arena.alloc(PostfixExpr {
            operand,
            op,
            span: self.span(),
        }))
    }

    pub fn paren(&self, expr: Expr<'ast>) -> Expr<'ast> {
        Expr::Paren(self.arena.alloc(ParenExpr {
            expr,
            span: self.span(),
        }))
    }

    // ========================================================================
    // Postfix Forms
    // ========================================================================

    pub fn call(&self, callee: Expr<'ast>, args: &[Expr<'ast>]) -> Expr<'ast> {
        Expr::Call(self.arena.alloc(CallExpr {
            callee,
            args: self.exprs(args),
            span: self.span(),
        }))
    }

    /// `object.name(args)`
    pub fn method_call(&self, object: Expr<'ast>, name: &str, args: &[Expr<'ast>]) -> Expr<'ast> {
        let callee = self.member(object, name);
        self.call(callee, args)
    }

    pub fn member(&self, object: Expr<'ast>, name: &str) -> Expr<'ast> {
        self.member_access(object, name, false)
    }

    pub fn arrow(&self, object: Expr<'ast>, name: &str) -> Expr<'ast> {
        self.member_access(object, name, true)
    }

    fn member_access(&self, object: Expr<'ast>, name: &str, arrow: bool) -> Expr<'ast> {
        Expr::Member(self.arena.alloc(MemberExpr {
            object,
            member: self.name(name),
            arrow,
            span: self.span(),
        }))
    }

    pub fn index(&self, object: Expr<'ast>, index: Expr<'ast>) -> Expr<'ast> {
        Expr::Index(self.arena.alloc(IndexExpr {
            object,
            index,
            span: self.span(),
        }))
    }

    // ========================================================================
    // Type-directed Forms
    // ========================================================================

    pub fn cast(&self, target: TypeExpr<'ast>, expr: Expr<'ast>) -> Expr<'ast> {
        Expr::Cast(self.arena.alloc(CastExpr {
            target,
            expr,
            span: self.span(),
        }))
    }

    pub fn is(&self, expr: Expr<'ast>, target: TypeExpr<'ast>) -> Expr<'ast> {
        Expr::Is(self.arena.alloc(TypeTestExpr {
            expr,
            target,
            span: self.span(),
        }))
    }

    pub fn as_(&self, expr: Expr<'ast>, target: TypeExpr<'ast>) -> Expr<'ast> {
        Expr::As(self.arena.alloc(TypeTestExpr {
            expr,
            target,
            span: self.span(),
        }))
    }

    pub fn sizeof_type(&self, ty: TypeExpr<'ast>) -> Expr<'ast> {
        Expr::SizeOf(self.arena.alloc(SizeOfExpr {
            operand: SizeOfOperand::Type(ty),
            span: self.span(),
        }))
    }

    pub fn sizeof_expr(&self, expr: Expr<'ast>) -> Expr<'ast> {
        Expr::SizeOf(self.arena.alloc(SizeOfExpr {
            operand: SizeOfOperand::Expr(expr),
            span: self.span(),
        }))
    }

    pub fn construct(&self, ty: TypeExpr<'ast>, args: &[Expr<'ast>]) -> Expr<'ast> {
        Expr::Construct(self.arena.alloc(ConstructExpr {
            ty,
            args: self.exprs(args),
            span: self.span(),
        }))
    }

    pub fn new_object(&self, ty: TypeExpr<'ast>, args: &[Expr<'ast>]) -> Expr<'ast> {
        Expr::New(self.arena.alloc(ConstructExpr {
            ty,
            args: self.exprs(args),
            span: self.span(),
        }))
    }

    // ========================================================================
    // Types
    // ========================================================================

    /// A named type; `"Game::Player"` is split into scope and name.
    pub fn ty(&self, name: &str) -> TypeExpr<'ast> {
        let mut parts: Vec<&str> = name.split("::").collect();
        let last = parts.pop().unwrap_or(name);
        let scope = self.idents(&parts);
        let ident = self.name(last);
        TypeExpr {
            base: TypeBase::Named { scope, name: ident },
            ..TypeExpr::named(ident)
        }
    }

    pub fn array_ty(&self, element: TypeExpr<'ast>, size: u64) -> TypeExpr<'ast> {
        TypeExpr {
            base: TypeBase::Array {
                element: self.arena.alloc(element),
                size,
            },
            is_const: false,
            pointers: 0,
            reference: ember_core::RefKind::None,
            span: self.span(),
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    pub fn expr_stmt(&self, expr: Expr<'ast>) -> Stmt<'ast> {
        Stmt::Expr(ExprStmt {
            expr,
            span: self.span(),
        })
    }

    pub fn assign(&self, target: Expr<'ast>, value: Expr<'ast>) -> Stmt<'ast> {
        Stmt::Assign(self.arena.alloc(AssignStmt {
            target,
            value,
            span: self.span(),
        }))
    }

    /// `T name;` or `T name = init;`
    pub fn var(&self, ty: TypeExpr<'ast>, name: &str, init: Option<Expr<'ast>>) -> Stmt<'ast> {
        let init = match init {
            Some(expr) => VarInit::Expr(expr),
            None => VarInit::None,
        };
        self.var_decl(ty, name, init)
    }

    /// `T name(args);`
    pub fn var_args(&self, ty: TypeExpr<'ast>, name: &str, args: &[Expr<'ast>]) -> Stmt<'ast> {
        let init = VarInit::Args(self.exprs(args));
        self.var_decl(ty, name, init)
    }

    fn var_decl(&self, ty: TypeExpr<'ast>, name: &str, init: VarInit<'ast>) -> Stmt<'ast> {
        Stmt::VarDecl(self.arena.alloc(VarDeclStmt {
            ty,
            name: self.name(name),
            init,
            span: self.span(),
        }))
    }

    pub fn ret(&self, value: Option<Expr<'ast>>) -> Stmt<'ast> {
        Stmt::Return(ReturnStmt {
            value,
            span: self.span(),
        })
    }

    pub fn break_(&self) -> Stmt<'ast> {
        Stmt::Break(self.span())
    }

    pub fn continue_(&self) -> Stmt<'ast> {
        Stmt::Continue(self.span())
    }

    pub fn block(&self, stmts: &[Stmt<'ast>]) -> Block<'ast> {
        Block {
            stmts: self.arena.alloc_slice_copy(stmts),
            span: self.span(),
        }
    }

    pub fn block_stmt(&self, stmts: &[Stmt<'ast>]) -> Stmt<'ast> {
        Stmt::Block(self.block(stmts))
    }

    pub fn if_(
        &self,
        condition: Expr<'ast>,
        then_stmt: Stmt<'ast>,
        else_stmt: Option<Stmt<'ast>>,
    ) -> Stmt<'ast> {
        Stmt::If(self.arena.alloc(IfStmt {
            condition,
            then_stmt,
            else_stmt,
            span: self.span(),
        }))
    }

    pub fn while_(&self, condition: Expr<'ast>, body: Stmt<'ast>) -> Stmt<'ast> {
        Stmt::While(self.arena.alloc(WhileStmt {
            condition,
            body,
            span: self.span(),
        }))
    }

    pub fn do_while(&self, body: Stmt<'ast>, condition: Expr<'ast>) -> Stmt<'ast> {
        Stmt::DoWhile(self.arena.alloc(DoWhileStmt {
            body,
            condition,
            span: self.span(),
        }))
    }

    pub fn for_(
        &self,
        init: Option<Stmt<'ast>>,
        condition: Option<Expr<'ast>>,
        update: &[Expr<'ast>],
        body: Stmt<'ast>,
    ) -> Stmt<'ast> {
        Stmt::For(self.arena.alloc(ForStmt {
            init,
            condition,
            update: self.exprs(update),
            body,
            span: self.span(),
        }))
    }

    pub fn goto(&self, label: &str) -> Stmt<'ast> {
        Stmt::Goto(self.name(label))
    }

    pub fn labeled(&self, label: &str, stmt: Stmt<'ast>) -> Stmt<'ast> {
        Stmt::Labeled(self.arena.alloc(LabeledStmt {
            label: self.name(label),
            stmt,
            span: self.span(),
        }))
    }

    pub fn switch(&self, expr: Expr<'ast>, cases: &[SwitchCase<'ast>]) -> Stmt<'ast> {
        Stmt::Switch(self.arena.alloc(SwitchStmt {
            expr,
            cases: self.arena.alloc_slice_copy(cases),
            span: self.span(),
        }))
    }

    /// A case group with `case v:` labels for each value.
    pub fn case(&self, values: &[Expr<'ast>], stmts: &[Stmt<'ast>]) -> SwitchCase<'ast> {
        let labels: Vec<CaseLabel<'ast>> = values.iter().map(|v| CaseLabel::Case(*v)).collect();
        self.case_group(&labels, stmts)
    }

    /// A `default:` group.
    pub fn default_case(&self, stmts: &[Stmt<'ast>]) -> SwitchCase<'ast> {
        let labels = [CaseLabel::Default(self.span())];
        self.case_group(&labels, stmts)
    }

    pub fn case_group(&self, labels: &[CaseLabel<'ast>], stmts: &[Stmt<'ast>]) -> SwitchCase<'ast> {
        SwitchCase {
            labels: self.arena.alloc_slice_copy(labels),
            stmts: self.arena.alloc_slice_copy(stmts),
            span: self.span(),
        }
    }

    pub fn goto_case(&self, value: Expr<'ast>) -> Stmt<'ast> {
        Stmt::GotoCase(self.arena.alloc(GotoCaseStmt {
            value,
            span: self.span(),
        }))
    }

    pub fn goto_default(&self) -> Stmt<'ast> {
        Stmt::GotoDefault(self.span())
    }

    pub fn try_catch(&self, try_block: Block<'ast>, catches: &[CatchClause<'ast>]) -> Stmt<'ast> {
        Stmt::TryCatch(self.arena.alloc(TryCatchStmt {
            try_block,
            catches: self.arena.alloc_slice_copy(catches),
            span: self.span(),
        }))
    }

    pub fn catch(&self, ty: TypeExpr<'ast>, name: Option<&str>, body: Block<'ast>) -> CatchClause<'ast> {
        CatchClause {
            ty,
            name: name.map(|n| self.name(n)),
            body,
            span: self.span(),
        }
    }

    pub fn throw(&self, value: Expr<'ast>) -> Stmt<'ast> {
        Stmt::Throw(self.arena.alloc(ThrowStmt {
            value,
            span: self.span(),
        }))
    }

    pub fn empty(&self) -> Stmt<'ast> {
        Stmt::Empty(self.span())
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn params(&self, params: &[(TypeExpr<'ast>, &str)]) -> &'ast [FunctionParam<'ast>] {
        let params: Vec<FunctionParam<'ast>> = params
            .iter()
            .map(|(ty, name)| FunctionParam {
                ty: *ty,
                name: Some(self.name(name)),
                span: self.span(),
            })
            .collect();
        self.arena.alloc_slice_copy(&params)
    }

    fn decl(
        &self,
        kind: FunctionKind,
        class: Option<&str>,
        name: &str,
        params: &[(TypeExpr<'ast>, &str)],
        return_type: Option<TypeExpr<'ast>>,
        body: Block<'ast>,
    ) -> FunctionDecl<'ast> {
        FunctionDecl {
            kind,
            namespace: &[],
            class: class.map(|c| self.name(c)),
            name: self.name(name),
            params: self.params(params),
            return_type,
            body,
            span: self.span(),
        }
    }

    /// A free function in the global namespace.
    pub fn function(
        &self,
        name: &str,
        params: &[(TypeExpr<'ast>, &str)],
        return_type: Option<TypeExpr<'ast>>,
        body: Block<'ast>,
    ) -> FunctionDecl<'ast> {
        self.decl(FunctionKind::Free, None, name, params, return_type, body)
    }

    pub fn method(
        &self,
        class: &str,
        name: &str,
        params: &[(TypeExpr<'ast>, &str)],
        return_type: Option<TypeExpr<'ast>>,
        body: Block<'ast>,
    ) -> FunctionDecl<'ast> {
        self.decl(FunctionKind::Method, Some(class), name, params, return_type, body)
    }

    pub fn constructor(
        &self,
        class: &str,
        params: &[(TypeExpr<'ast>, &str)],
        body: Block<'ast>,
    ) -> FunctionDecl<'ast> {
        self.decl(
            FunctionKind::Constructor,
            Some(class),
            CONSTRUCTOR_NAME,
            params,
            None,
            body,
        )
    }

    pub fn destructor(&self, class: &str, body: Block<'ast>) -> FunctionDecl<'ast> {
        self.decl(
            FunctionKind::Destructor,
            Some(class),
            DESTRUCTOR_NAME,
            &[],
            None,
            body,
        )
    }

    /// Place a declaration in a namespace.
    pub fn in_namespace(&self, decl: FunctionDecl<'ast>, path: &[&str]) -> FunctionDecl<'ast> {
        FunctionDecl {
            namespace: self.idents(path),
            ..decl
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_are_distinct() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let x = b.ident("x");
        let y = b.ident("y");
        assert_ne!(x.span(), y.span());
    }

    #[test]
    fn at_moves_cursor() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let e = b.at(7, 3).int(1);
        assert_eq!(e.span(), Span::new(7, 3, 1));
    }

    #[test]
    fn qualified_type_is_split() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let ty = b.ty("Game::Player").pointer();
        match ty.base {
            TypeBase::Named { scope, name } => {
                assert_eq!(scope.len(), 1);
                assert_eq!(scope[0].name, "Game");
                assert_eq!(name.name, "Player");
            }
            TypeBase::Array { .. } => panic!("expected a named type"),
        }
        assert_eq!(ty.display_name(), "Game::Player*");
    }

    #[test]
    fn parens_are_transparent_to_unparenthesized() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let inner = b.int(3);
        let wrapped = b.paren(b.paren(inner));
        assert_eq!(*wrapped.unparenthesized(), inner);
    }

    #[test]
    fn function_decl_display_name() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let body = b.block(&[]);
        let decl = b.method("Player", "heal", &[(b.ty("int"), "amount")], None, body);
        let decl = b.in_namespace(decl, &["Game"]);
        assert_eq!(decl.display_name(), "Game::Player::heal");
        assert_eq!(decl.params.len(), 1);
    }
}
