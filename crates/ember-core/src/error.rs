//! Error types.
//!
//! ```text
//! CompilationError   - binding and emission failures of one function
//!   ├── binding errors           recoverable: the function is abandoned,
//!   │                            sibling functions still compile
//!   └── Internal                 fatal: a defect in the compiler itself
//! RegistrationError  - failures while populating the registry
//! Diagnostic         - (message, primary span, secondary spans) view of an error
//! ```

use thiserror::Error;

use crate::Span;

/// Errors raised while binding or emitting a function.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilationError {
    /// A name could not be resolved in any visible scope.
    #[error("at {span}: unknown symbol '{name}'")]
    UnknownSymbol { name: String, span: Span },

    /// A type name could not be resolved.
    #[error("at {span}: unknown type '{name}'")]
    UnknownType { name: String, span: Span },

    /// Member access named something the type does not have.
    #[error("at {span}: type '{type_name}' has no member '{name}'")]
    UnknownMember {
        name: String,
        type_name: String,
        span: Span,
    },

    /// No candidate of the group accepts the arguments.
    #[error("at {span}: no overload of '{name}' matches argument types ({args})")]
    NoMatchingOverload {
        name: String,
        args: String,
        span: Span,
    },

    /// Two candidates match equally well.
    #[error("at {span}: call to '{name}' is ambiguous between {first} and {second}")]
    AmbiguousOverload {
        name: String,
        first: String,
        second: String,
        span: Span,
    },

    /// An operand has the wrong kind of type or symbol for the operation.
    #[error("at {span}: {message}")]
    WrongOperandCategory { message: String, span: Span },

    /// A call supplied the wrong number of arguments.
    #[error("at {span}: '{name}' expects {expected} arguments, got {found}")]
    ArgumentCountMismatch {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },

    /// `this` or `base` used where it has no meaning.
    #[error("at {span}: {message}")]
    IllegalThisOrBase { message: String, span: Span },

    /// `is`/`as` applied to a type without a vtable.
    #[error("at {span}: '{type_name}' is not a pointer to a polymorphic class")]
    NotPolymorphic { type_name: String, span: Span },

    /// The expression does not denote an assignable location.
    #[error("at {span}: expression is not an lvalue")]
    NotAnLvalue { span: Span },

    #[error("at {span}: type mismatch: {message}")]
    TypeMismatch { message: String, span: Span },

    /// `break`, `continue`, `goto case` and friends outside their construct.
    #[error("at {span}: {message}")]
    InvalidControlFlow { message: String, span: Span },

    #[error("at {span}: label '{label}' is not visible from this goto")]
    UnknownLabel { label: String, span: Span },

    #[error("at {span}: label '{label}' already defined at {previous}")]
    DuplicateLabel {
        label: String,
        span: Span,
        previous: Span,
    },

    /// Two case labels of one switch carry the same constant.
    #[error("at {span}: duplicate case constant {value} (first used at {previous})")]
    DuplicateCaseConstant {
        value: String,
        span: Span,
        previous: Span,
    },

    /// A case label or array size that is not a compile-time constant.
    #[error("at {span}: expression is not a compile-time constant")]
    NotConstant { span: Span },

    #[error("at {span}: {message}")]
    Other { message: String, span: Span },

    /// A defect in the compiler itself; aborts the whole run.
    #[error("internal compiler error: {message}")]
    Internal { message: String },
}

impl CompilationError {
    /// Convenience constructor for internal-consistency failures.
    pub fn internal(message: impl Into<String>) -> Self {
        CompilationError::Internal {
            message: message.into(),
        }
    }

    /// Primary span of the error.
    pub fn span(&self) -> Span {
        match self {
            CompilationError::UnknownSymbol { span, .. }
            | CompilationError::UnknownType { span, .. }
            | CompilationError::UnknownMember { span, .. }
            | CompilationError::NoMatchingOverload { span, .. }
            | CompilationError::AmbiguousOverload { span, .. }
            | CompilationError::WrongOperandCategory { span, .. }
            | CompilationError::ArgumentCountMismatch { span, .. }
            | CompilationError::IllegalThisOrBase { span, .. }
            | CompilationError::NotPolymorphic { span, .. }
            | CompilationError::NotAnLvalue { span }
            | CompilationError::TypeMismatch { span, .. }
            | CompilationError::InvalidControlFlow { span, .. }
            | CompilationError::UnknownLabel { span, .. }
            | CompilationError::DuplicateLabel { span, .. }
            | CompilationError::DuplicateCaseConstant { span, .. }
            | CompilationError::NotConstant { span }
            | CompilationError::Other { span, .. } => *span,
            CompilationError::Internal { .. } => Span::default(),
        }
    }

    /// Internal-consistency failures stop the compiler; everything else only
    /// abandons the current function.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CompilationError::Internal { .. })
    }

    /// The user-facing form of this error.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let secondary = match self {
            CompilationError::DuplicateCaseConstant { previous, .. }
            | CompilationError::DuplicateLabel { previous, .. } => vec![*previous],
            _ => Vec::new(),
        };
        Diagnostic {
            message: self.to_string(),
            primary: self.span(),
            secondary,
        }
    }
}

/// A reported failure: message, primary span and related spans.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub message: String,
    pub primary: Span,
    pub secondary: Vec<Span>,
}

/// Errors raised while populating the registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    #[error("type '{name}' is already registered")]
    DuplicateType { name: String },

    #[error("function '{name}' with this signature is already registered")]
    DuplicateFunction { name: String },

    #[error("unknown type '{name}'")]
    UnknownType { name: String },

    #[error("class '{name}' inherits from itself")]
    CircularInheritance { name: String },

    #[error("'{name}' is already declared in this namespace")]
    DuplicateSymbol { name: String },

    #[error("invalid namespace")]
    InvalidNamespace,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_and_message() {
        let err = CompilationError::UnknownSymbol {
            name: "x".to_string(),
            span: Span::new(3, 7, 1),
        };
        assert_eq!(err.span(), Span::new(3, 7, 1));
        assert_eq!(err.to_string(), "at 3:7: unknown symbol 'x'");
        assert!(!err.is_fatal());
    }

    #[test]
    fn internal_is_fatal() {
        let err = CompilationError::internal("argument count mismatch");
        assert!(err.is_fatal());
        assert_eq!(err.span(), Span::default());
    }

    #[test]
    fn duplicate_case_diagnostic_has_secondary_span() {
        let err = CompilationError::DuplicateCaseConstant {
            value: "1".to_string(),
            span: Span::new(5, 1, 4),
            previous: Span::new(3, 1, 4),
        };
        let diag = err.to_diagnostic();
        assert_eq!(diag.primary, Span::new(5, 1, 4));
        assert_eq!(diag.secondary, vec![Span::new(3, 1, 4)]);
    }
}
