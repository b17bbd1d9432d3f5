use thiserror::Error;

use crate::ast::{InfixOperator, PrefixOperator};

/// Failures surfaced by evaluation. Messages are part of the language's
/// observable behaviour and are matched by tests and fixtures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("identifier not found: {name}")]
    IdentifierNotFound { name: String },
    #[error("type mismatch: {left} {operator} {right}")]
    TypeMismatch {
        left: &'static str,
        operator: InfixOperator,
        right: &'static str,
    },
    #[error("unknown operator: {operator}{right}")]
    UnknownPrefixOperator {
        operator: PrefixOperator,
        right: &'static str,
    },
    #[error("unknown operator: {left} {operator} {right}")]
    UnknownInfixOperator {
        left: &'static str,
        operator: InfixOperator,
        right: &'static str,
    },
    #[error("not a function: {type_name}")]
    NotAFunction { type_name: &'static str },
    #[error("unusable as map key: {type_name}")]
    UnusableMapKey { type_name: &'static str },
    #[error("index operator not supported: {type_name}")]
    IndexNotSupported { type_name: &'static str },
    #[error("cannot update unbound identifier: {name}")]
    UnboundUpdate { name: String },
    #[error("invalid assignment target: {target}")]
    InvalidAssignmentTarget { target: String },
    #[error("wrong number of arguments: want={want}, got={got}")]
    WrongArgumentCount { want: usize, got: usize },
    #[error("argument to `{builtin}` not supported, got {type_name}")]
    UnsupportedArgument {
        builtin: &'static str,
        type_name: &'static str,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("maximum call depth exceeded: {limit}")]
    CallDepthExceeded { limit: usize },
}
