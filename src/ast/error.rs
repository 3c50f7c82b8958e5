use thiserror::Error;

use crate::lexer::token::Token;

#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token `{}`", if .0.is_eof() { "EOF".to_string() } else { .0.to_string() })]
    UnexpectedToken(Token),
    #[error("Unexpected EOF detected")]
    UnexpectedEOFDetected,
    #[error("Expected a closing parenthesis `)` but got `{}`", if .0.is_eof() { "EOF".to_string() } else { .0.to_string() })]
    ExpectedClosingParen(Token),
    #[error("Expected `:` in conditional but got `{}`", if .0.is_eof() { "EOF".to_string() } else { .0.to_string() })]
    ExpectedColon(Token),
    #[error("Expected a member name after `.` but got `{}`", if .0.is_eof() { "EOF".to_string() } else { .0.to_string() })]
    ExpectedMember(Token),
}
