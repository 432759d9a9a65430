//! Operator definitions.

use std::fmt;

/// Binary operators.
///
/// Organized by precedence from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `||`
    LogicalOr,
    /// `&&`
    LogicalAnd,

    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `&`
    BitAnd,

    /// `==`
    Equal,
    /// `!=`
    NotEqual,

    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,

    /// `<<`
    Shl,
    /// `>>`
    Shr,

    /// `+`
    Add,
    /// `-`
    Sub,

    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
}

impl BinaryOp {
    /// Name of the operator function group, `None` for the logical operators
    /// (which are never overloaded) and for the comparisons rewritten in
    /// terms of `<` and `==`.
    pub fn operator_name(self) -> Option<&'static str> {
        Some(match self {
            BinaryOp::BitOr => "operator|",
            BinaryOp::BitXor => "operator^",
            BinaryOp::BitAnd => "operator&",
            BinaryOp::Equal => "operator==",
            BinaryOp::Less => "operator<",
            BinaryOp::Shl => "operator<<",
            BinaryOp::Shr => "operator>>",
            BinaryOp::Add => "operator+",
            BinaryOp::Sub => "operator-",
            BinaryOp::Mul => "operator*",
            BinaryOp::Div => "operator/",
            BinaryOp::Rem => "operator%",
            BinaryOp::LogicalOr
            | BinaryOp::LogicalAnd
            | BinaryOp::NotEqual
            | BinaryOp::LessEqual
            | BinaryOp::Greater
            | BinaryOp::GreaterEqual => return None,
        })
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::LogicalAnd | BinaryOp::LogicalOr)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::Less
                | BinaryOp::LessEqual
                | BinaryOp::Greater
                | BinaryOp::GreaterEqual
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::LogicalOr => "||",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        };
        write!(f, "{s}")
    }
}

/// Prefix unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `-`
    Neg,
    /// `+`
    Plus,
    /// `!`
    Not,
    /// `~`
    BitNot,
    /// `++`
    PreInc,
    /// `--`
    PreDec,
    /// `*`
    Deref,
    /// `&`
    AddressOf,
}

impl UnaryOp {
    /// Name of the operator function group; `None` for `*` and `&`, which
    /// are built in for pointers.
    pub fn operator_name(self) -> Option<&'static str> {
        Some(match self {
            UnaryOp::Neg => "operator-",
            UnaryOp::Plus => "operator+",
            UnaryOp::Not => "operator!",
            UnaryOp::BitNot => "operator~",
            UnaryOp::PreInc => "operator++",
            UnaryOp::PreDec => "operator--",
            UnaryOp::Deref | UnaryOp::AddressOf => return None,
        })
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::PreInc => "++",
            UnaryOp::PreDec => "--",
            UnaryOp::Deref => "*",
            UnaryOp::AddressOf => "&",
        };
        write!(f, "{s}")
    }
}

/// Postfix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostfixOp {
    /// `++`
    Inc,
    /// `--`
    Dec,
}

impl fmt::Display for PostfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostfixOp::Inc => write!(f, "++"),
            PostfixOp::Dec => write!(f, "--"),
        }
    }
}
