use miette::SourceOffset;

use crate::{
    ast::error::ParseError, compiler::error::CompileError, eval::error::EvalError,
    lexer::error::LexerError, range::Range,
};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InnerError {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Any failure surfaced by `compile` or `evaluate`, annotated with the
/// source it came from so hosts get a labeled diagnostic.
#[derive(PartialEq, Debug, thiserror::Error, miette::Diagnostic)]
#[error("mql error")]
pub struct Error {
    pub cause: InnerError,
    pub span: Range,
    #[source_code]
    source_code: String,
    #[label("{cause}")]
    location: SourceOffset,
}

impl Error {
    pub fn from_error(source_code: impl Into<String>, cause: InnerError) -> Self {
        let source_code = source_code.into();
        let range = match &cause {
            InnerError::Lexer(LexerError::UnexpectedChar(range, _)) => Some(*range),
            InnerError::Lexer(LexerError::UnexpectedEOFDetected) => None,
            InnerError::Parse(err) => match err {
                ParseError::UnexpectedToken(token)
                | ParseError::ExpectedClosingParen(token)
                | ParseError::ExpectedColon(token)
                | ParseError::ExpectedMember(token) => Some(token.range),
                ParseError::UnexpectedEOFDetected => None,
            },
            InnerError::Eval(err) => match err {
                EvalError::QueryNotFound(token, _)
                | EvalError::MemberNotFound(token, _, _)
                | EvalError::NotCallable(token, _)
                | EvalError::InvalidNumberOfArguments(token, _, _, _) => Some(token.range),
                EvalError::InvalidTypes { token, .. } => Some(token.range),
                EvalError::HostFailure(_) => None,
            },
            InnerError::Compile(err) => match err {
                CompileError::UnsupportedFeature(token, _)
                | CompileError::NestedQuery(token)
                | CompileError::QueryNotFound(token, _) => Some(token.range),
                CompileError::MethodNotFound { token, .. } => Some(token.range),
                CompileError::EmptyParamNames(_)
                | CompileError::DuplicateQueryName(_)
                | CompileError::GenericCountMismatch { .. } => None,
            },
        };

        match range {
            Some(range) => {
                let location = SourceOffset::from_location(
                    &source_code,
                    range.start.line as usize,
                    range.start.column,
                );
                Self {
                    cause,
                    span: range,
                    source_code,
                    location,
                }
            }
            None => {
                let is_eof = matches!(
                    cause,
                    InnerError::Lexer(LexerError::UnexpectedEOFDetected)
                        | InnerError::Parse(ParseError::UnexpectedEOFDetected)
                );
                let location = if is_eof {
                    let line = source_code.lines().count().max(1);
                    let column = source_code
                        .lines()
                        .last()
                        .map(|line| line.chars().count() + 1)
                        .unwrap_or(1);
                    SourceOffset::from_location(&source_code, line, column)
                } else {
                    SourceOffset::from_location(&source_code, 1, 1)
                };

                Self {
                    cause,
                    span: Range::default(),
                    source_code,
                    location,
                }
            }
        }
    }
}
