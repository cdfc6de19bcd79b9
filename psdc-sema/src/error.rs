#![forbid(unsafe_code)]

use psdc_ast::{CallableKind, Span};
use thiserror::Error;

/// Failure to bind a name in a scope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeclareError {
    #[error("{new_kind} `{name}` redefines a {existing_kind} of the same name")]
    Redefined {
        name: String,
        new_kind: &'static str,
        existing_kind: &'static str,
    },
    #[error("this signature of {kind} `{name}` differs from previous signature")]
    SignatureMismatch {
        name: String,
        kind: CallableKind,
        previous: Span,
    },
}

/// Failure to resolve a name to a symbol of the requested kind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("undefined {expected} `{name}`")]
    Undefined { name: String, expected: &'static str },
    #[error("`{name}` is a {actual}, {expected} expected")]
    WrongKind {
        name: String,
        actual: &'static str,
        expected: &'static str,
    },
}
