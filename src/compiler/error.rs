use compact_str::CompactString;
use thiserror::Error;

use crate::lexer::token::Token;

/// Rejections raised while validating a signature or resolving a script
/// against it.
#[derive(Error, Debug, PartialEq)]
pub enum CompileError {
    #[error("{1}")]
    UnsupportedFeature(Token, String),
    #[error("Nested queries are not supported")]
    NestedQuery(Token),
    #[error("Unknown query object `{1}`")]
    QueryNotFound(Token, CompactString),
    #[error("Method not found with {arity} arguments: `{root}.{member}`")]
    MethodNotFound {
        token: Token,
        root: CompactString,
        member: CompactString,
        arity: usize,
    },
    #[error("Signature parameter {0} has no bound names")]
    EmptyParamNames(usize),
    #[error("Duplicate query name `{0}` in signature")]
    DuplicateQueryName(CompactString),
    #[error("Signature declares {expected} generic parameters but {got} concrete types were provided")]
    GenericCountMismatch { expected: usize, got: usize },
}

/// Failures at specialized-callable invocation time.
///
/// These cover only the entry bridge; the compiled body itself performs no
/// name lookup that could fail.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum RuntimeError {
    #[error("Invalid number of query roots, expected {expected}, got {got}")]
    InvalidNumberOfRoots { expected: usize, got: usize },
    #[error("Query root {slot} is not a `{expected}`")]
    RootTypeMismatch { slot: usize, expected: &'static str },
    #[error("Receiver is not a `{expected}`")]
    ReceiverTypeMismatch { expected: &'static str },
}
