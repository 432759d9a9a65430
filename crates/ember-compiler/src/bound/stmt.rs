//! Bound statements.

use ember_core::{ConstantValue, Span, TypeHash};

use super::{BoundExpr, CallSiteId, CompoundId, FunctionRef, LocalId};

#[derive(Debug, Clone, PartialEq)]
pub enum BoundStmt {
    Compound(BoundCompound),
    Return {
        value: Option<BoundExpr>,
        span: Span,
    },
    If {
        condition: BoundExpr,
        then_stmt: Box<BoundStmt>,
        else_stmt: Option<Box<BoundStmt>>,
        span: Span,
    },
    While {
        condition: BoundExpr,
        body: Box<BoundStmt>,
        span: Span,
    },
    DoWhile {
        body: Box<BoundStmt>,
        condition: BoundExpr,
        span: Span,
    },
    For(Box<BoundFor>),
    Break(Span),
    Continue(Span),
    /// `goto label`; `compound` is the enclosing compound declaring the label.
    Goto {
        label: String,
        compound: CompoundId,
        span: Span,
    },
    Labeled {
        label: String,
        stmt: Box<BoundStmt>,
        span: Span,
    },
    Switch(Box<BoundSwitch>),
    GotoCase {
        value: ConstantValue,
        span: Span,
    },
    GotoDefault(Span),
    Expr(BoundExpr),
    Assign(BoundAssign),
    LocalInit(BoundLocalInit),
    TryCatch(Box<BoundTryCatch>),
    Throw {
        value: BoundExpr,
        span: Span,
    },
    Empty(Span),
}

/// A lexical block. Objects constructed inside are destroyed when it exits.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundCompound {
    pub id: CompoundId,
    pub stmts: Vec<BoundStmt>,
    pub span: Span,
}

/// `for`; the init statement lives in the loop's own compound.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundFor {
    pub compound: CompoundId,
    pub init: Option<BoundStmt>,
    pub condition: Option<BoundExpr>,
    pub update: Vec<BoundExpr>,
    pub body: BoundStmt,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundSwitch {
    /// Switch value, already converted to an integral type.
    pub value: BoundExpr,
    /// Compound `goto case` unwinds to.
    pub compound: CompoundId,
    pub cases: Vec<BoundCase>,
    pub span: Span,
}

/// One case group; its statements form their own compound.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundCase {
    pub labels: Vec<BoundCaseLabel>,
    pub body: BoundCompound,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundCaseLabel {
    Case { value: ConstantValue, span: Span },
    Default(Span),
}

impl BoundCaseLabel {
    pub fn span(&self) -> Span {
        match self {
            BoundCaseLabel::Case { span, .. } | BoundCaseLabel::Default(span) => *span,
        }
    }
}

/// `target = value`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundAssign {
    pub target: BoundExpr,
    pub value: BoundExpr,
    /// `operator=` of a class target; `None` is a raw store.
    pub operator: Option<AssignOperator>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignOperator {
    pub function: FunctionRef,
    pub site: CallSiteId,
}

/// Declaration of a local variable.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundLocalInit {
    pub local: LocalId,
    pub init: LocalInit,
    /// Registered with the enclosing compound once construction completes.
    pub destructor: Option<TypeHash>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocalInit {
    /// Zero-initialized basic value or trivially constructed object.
    Default,
    /// Store of an already converted value.
    Value(BoundExpr),
    /// Constructor call on the local; `args` exclude the receiver.
    Construct {
        constructor: FunctionRef,
        args: Vec<BoundExpr>,
        site: CallSiteId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundTryCatch {
    pub try_block: BoundCompound,
    pub catches: Vec<BoundCatch>,
    pub span: Span,
}

/// `catch (T* name)`; the variable lives in the body's compound.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundCatch {
    pub class: TypeHash,
    pub variable: Option<LocalId>,
    pub body: BoundCompound,
    pub span: Span,
}

impl BoundStmt {
    pub fn span(&self) -> Span {
        match self {
            BoundStmt::Compound(c) => c.span,
            BoundStmt::Return { span, .. }
            | BoundStmt::If { span, .. }
            | BoundStmt::While { span, .. }
            | BoundStmt::DoWhile { span, .. }
            | BoundStmt::Goto { span, .. }
            | BoundStmt::Labeled { span, .. }
            | BoundStmt::GotoCase { span, .. }
            | BoundStmt::Throw { span, .. } => *span,
            BoundStmt::Break(span)
            | BoundStmt::Continue(span)
            | BoundStmt::GotoDefault(span)
            | BoundStmt::Empty(span) => *span,
            BoundStmt::For(f) => f.span,
            BoundStmt::Switch(s) => s.span,
            BoundStmt::Expr(e) => e.span,
            BoundStmt::Assign(a) => a.span,
            BoundStmt::LocalInit(l) => l.span,
            BoundStmt::TryCatch(t) => t.span,
        }
    }

    /// Expressions directly owned by this statement.
    pub fn exprs(&self) -> Vec<&BoundExpr> {
        match self {
            BoundStmt::Return { value, .. } => value.iter().collect(),
            BoundStmt::If { condition, .. }
            | BoundStmt::While { condition, .. }
            | BoundStmt::DoWhile { condition, .. } => vec![condition],
            BoundStmt::For(f) => f.condition.iter().chain(f.update.iter()).collect(),
            BoundStmt::Switch(s) => vec![&s.value],
            BoundStmt::Expr(e) | BoundStmt::Throw { value: e, .. } => vec![e],
            BoundStmt::Assign(a) => vec![&a.target, &a.value],
            BoundStmt::LocalInit(l) => match &l.init {
                LocalInit::Default => Vec::new(),
                LocalInit::Value(e) => vec![e],
                LocalInit::Construct { args, .. } => args.iter().collect(),
            },
            _ => Vec::new(),
        }
    }

    /// Statements directly nested in this statement.
    pub fn substatements(&self) -> Vec<&BoundStmt> {
        match self {
            BoundStmt::Compound(c) => c.stmts.iter().collect(),
            BoundStmt::If {
                then_stmt,
                else_stmt,
                ..
            } => std::iter::once(&**then_stmt)
                .chain(else_stmt.as_deref())
                .collect(),
            BoundStmt::While { body, .. } | BoundStmt::DoWhile { body, .. } => vec![&**body],
            BoundStmt::For(f) => f.init.iter().chain(std::iter::once(&f.body)).collect(),
            BoundStmt::Labeled { stmt, .. } => vec![&**stmt],
            BoundStmt::Switch(s) => s.cases.iter().flat_map(|c| c.body.stmts.iter()).collect(),
            BoundStmt::TryCatch(t) => t
                .try_block
                .stmts
                .iter()
                .chain(t.catches.iter().flat_map(|c| c.body.stmts.iter()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Visit every expression reachable from this statement.
    pub fn walk_exprs<'a>(&'a self, visit: &mut impl FnMut(&'a BoundExpr)) {
        for expr in self.exprs() {
            expr.walk(visit);
        }
        for stmt in self.substatements() {
            stmt.walk_exprs(visit);
        }
    }
}
