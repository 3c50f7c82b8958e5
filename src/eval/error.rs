use compact_str::CompactString;
use thiserror::Error;

use crate::lexer::token::Token;

type ErrorToken = Token;

#[derive(Error, Debug, PartialEq)]
pub enum EvalError {
    #[error("\"{1}\" is not defined")]
    QueryNotFound(ErrorToken, CompactString),
    #[error("Method \"{2}\" not found on \"{1}\"")]
    MemberNotFound(ErrorToken, CompactString, CompactString),
    #[error("\"{1}\" is not callable")]
    NotCallable(ErrorToken, CompactString),
    #[error("Invalid number of arguments in \"{1}\", expected {2}, got {3}")]
    InvalidNumberOfArguments(ErrorToken, CompactString, u8, u8),
    #[error("Invalid types for \"{name}\", got {got}")]
    InvalidTypes {
        token: ErrorToken,
        name: CompactString,
        got: String,
    },
    #[error("Runtime error: {0}")]
    HostFailure(String),
}
