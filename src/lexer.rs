pub mod error;
pub mod token;

use compact_str::CompactString;
use error::LexerError;
use nom::Parser;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{alpha1, alphanumeric1, char, digit1, multispace0};
use nom::combinator::{map, map_res, opt, recognize};
use nom::multi::many0;
use nom::sequence::{pair, preceded, terminated};
use nom::IResult;
use token::{Token, TokenKind};

use crate::number::Number;
use crate::range::{Position, Range, Span};

macro_rules! define_token_parser {
    ($name:ident, $tag:expr, $kind:expr) => {
        fn $name(input: Span) -> IResult<Span, Token> {
            map(tag($tag), |span: Span| Token {
                range: span.into(),
                kind: $kind,
            })
            .parse(input)
        }
    };
}

define_token_parser!(question_question, "??", TokenKind::QuestionQuestion);
define_token_parser!(eq_eq, "==", TokenKind::EqEq);
define_token_parser!(ne_eq, "!=", TokenKind::NeEq);
define_token_parser!(lte, "<=", TokenKind::Lte);
define_token_parser!(gte, ">=", TokenKind::Gte);
define_token_parser!(lt, "<", TokenKind::Lt);
define_token_parser!(gt, ">", TokenKind::Gt);
define_token_parser!(dot, ".", TokenKind::Dot);
define_token_parser!(comma, ",", TokenKind::Comma);
define_token_parser!(l_paren, "(", TokenKind::LParen);
define_token_parser!(r_paren, ")", TokenKind::RParen);
define_token_parser!(question, "?", TokenKind::Question);
define_token_parser!(colon, ":", TokenKind::Colon);
define_token_parser!(plus, "+", TokenKind::Plus);
define_token_parser!(minus, "-", TokenKind::Minus);
define_token_parser!(star, "*", TokenKind::Star);
define_token_parser!(slash, "/", TokenKind::Slash);

// Two-character operators must come before their one-character prefixes so
// that `==`, `!=`, `<=`, `>=` and `??` are matched maximal-munch.
fn punctuations(input: Span) -> IResult<Span, Token> {
    alt((
        question_question,
        eq_eq,
        ne_eq,
        lte,
        gte,
        lt,
        gt,
        dot,
        comma,
        l_paren,
        r_paren,
        question,
        colon,
        plus,
        minus,
        star,
        slash,
    ))
    .parse(input)
}

// `[0-9]+ ( '.' [0-9]+ )?`, no sign and no exponent. A trailing `.` without
// digits is left for the dot parser, so `1.` lexes as NUMBER DOT.
fn number_literal(input: Span) -> IResult<Span, Token> {
    map_res(
        recognize(pair(digit1, opt(preceded(char('.'), digit1)))),
        |span: Span| {
            span.fragment().parse::<f64>().map(|value| Token {
                range: span.into(),
                kind: TokenKind::Number(Number::new(value)),
            })
        },
    )
    .parse(input)
}

// `[A-Za-z_][A-Za-z_0-9]*`
fn ident(input: Span) -> IResult<Span, Token> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_")))),
        )),
        |span: Span| Token {
            range: span.into(),
            kind: TokenKind::Ident(CompactString::new(span.fragment())),
        },
    )
    .parse(input)
}

fn token(input: Span) -> IResult<Span, Token> {
    alt((number_literal, ident, punctuations)).parse(input)
}

fn tokens(input: Span) -> IResult<Span, Vec<Token>> {
    preceded(multispace0, many0(terminated(token, multispace0))).parse(input)
}

/// Scans the whole input into a token sequence ending in [`TokenKind::Eof`].
///
/// Any character no token parser accepts (a lone `!` included) fails with a
/// positional [`LexerError::UnexpectedChar`].
pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, LexerError> {
    match tokens(Span::new(input)) {
        Ok((span, mut tokens)) => match span.fragment().chars().next() {
            None => {
                let eof: Position = span.into();
                tokens.push(Token {
                    range: Range {
                        start: eof,
                        end: eof,
                    },
                    kind: TokenKind::Eof,
                });
                Ok(tokens)
            }
            Some(c) => {
                let start: Position = span.into();
                Err(LexerError::UnexpectedChar(
                    Range {
                        start,
                        end: Position::new(start.line, start.column + 1),
                    },
                    c,
                ))
            }
        },
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let start: Position = e.input.into();
            Err(LexerError::UnexpectedChar(
                Range {
                    start,
                    end: Position::new(start.line, start.column + 1),
                },
                e.input.fragment().chars().next().unwrap_or_default(),
            ))
        }
        Err(nom::Err::Incomplete(_)) => Err(LexerError::UnexpectedEOFDetected),
    }
}
